//! Console host platform
//!
//! Keeps the device registry in memory, logs every change and optionally
//! persists the registry as JSON so devices and learned selector options
//! survive restarts.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use onkyo_engine::{DeviceKind, DeviceSpec, DeviceState, HostPlatform, SelectorOptions, UnitId};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const DATA_DIR: &str = "onkyo-eiscp";
const REGISTRY_FILE: &str = "devices.json";

/// Default registry location under the platform data directory.
pub fn default_state_file() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join(DATA_DIR).join(REGISTRY_FILE))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum StoredKind {
    Switch,
    Dimmer,
    Selector,
}

impl From<DeviceKind> for StoredKind {
    fn from(kind: DeviceKind) -> Self {
        match kind {
            DeviceKind::Switch => StoredKind::Switch,
            DeviceKind::Dimmer => StoredKind::Dimmer,
            DeviceKind::Selector => StoredKind::Selector,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StoredDevice {
    name: String,
    kind: StoredKind,
    n_value: i32,
    s_value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    options: Option<BTreeMap<String, String>>,
}

/// In-memory [`HostPlatform`] that prints device changes.
#[derive(Debug, Default)]
pub struct ConsoleHost {
    devices: BTreeMap<UnitId, StoredDevice>,
    heartbeat: Option<Duration>,
    state_file: Option<PathBuf>,
}

impl ConsoleHost {
    /// A registry that lives only in memory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the registry from `path`, starting empty if it does not exist.
    pub fn with_state_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let devices = if path.exists() {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            BTreeMap::new()
        };

        info!(path = %path.display(), devices = devices.len(), "Device registry loaded");
        Ok(Self {
            devices,
            heartbeat: None,
            state_file: Some(path),
        })
    }

    /// Tick interval last requested by the engine.
    pub fn heartbeat(&self) -> Option<Duration> {
        self.heartbeat
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// One line per device, for the `status` command.
    pub fn summary(&self) -> Vec<String> {
        self.devices
            .iter()
            .map(|(unit, d)| format!("{:>3}  {:<32} {:>3}  {}", unit, d.name, d.n_value, d.s_value))
            .collect()
    }

    fn save(&self) {
        let Some(path) = self.state_file.as_deref() else {
            return;
        };
        if let Err(e) = write_registry(path, &self.devices) {
            warn!(path = %path.display(), error = %e, "Failed to save device registry");
        }
    }
}

fn write_registry(path: &Path, devices: &BTreeMap<UnitId, StoredDevice>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create registry directory")?;
    }
    let json = serde_json::to_string_pretty(devices)?;
    fs::write(path, json).context("Failed to write registry")?;
    Ok(())
}

impl HostPlatform for ConsoleHost {
    fn device_exists(&self, unit: UnitId) -> bool {
        self.devices.contains_key(&unit)
    }

    fn create_device(&mut self, spec: &DeviceSpec) {
        println!("+ {:>3}  {}", spec.unit, spec.name);
        self.devices.insert(
            spec.unit,
            StoredDevice {
                name: spec.name.clone(),
                kind: spec.kind.into(),
                n_value: 0,
                s_value: String::new(),
                options: spec.options.as_ref().map(SelectorOptions::to_host_map),
            },
        );
        self.save();
    }

    fn device_state(&self, unit: UnitId) -> Option<DeviceState> {
        self.devices
            .get(&unit)
            .map(|d| DeviceState::new(d.n_value, d.s_value.clone()))
    }

    fn update_device_state(&mut self, unit: UnitId, n_value: i32, s_value: &str) {
        let Some(device) = self.devices.get_mut(&unit) else {
            warn!(unit, "Update for unknown device");
            return;
        };
        device.n_value = n_value;
        device.s_value = s_value.to_string();
        println!("= {:>3}  {:<32} {:>3}  {}", unit, device.name, n_value, s_value);
        self.save();
    }

    fn read_device_options(&self, unit: UnitId) -> Option<SelectorOptions> {
        let map = self.devices.get(&unit)?.options.as_ref()?;
        SelectorOptions::from_host_map(map)
    }

    fn update_device_options(&mut self, unit: UnitId, options: &SelectorOptions) {
        let Some(device) = self.devices.get_mut(&unit) else {
            return;
        };
        device.options = Some(options.to_host_map());
        println!("~ {:>3}  {}  [{}]", unit, device.name, options.names().join(", "));
        self.save();
    }

    fn set_heartbeat(&mut self, interval: Duration) {
        info!(interval_ms = interval.as_millis() as u64, "Tick interval changed");
        self.heartbeat = Some(interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onkyo_engine::SelectorStyle;

    fn selector_spec() -> DeviceSpec {
        DeviceSpec {
            unit: 4,
            name: "TX-NR509 Main Mode".to_string(),
            kind: DeviceKind::Selector,
            options: Some(SelectorOptions::new(
                vec!["Stereo".to_string(), "Direct".to_string()],
                SelectorStyle::Buttons,
            )),
        }
    }

    #[test]
    fn test_options_round_trip_through_host_map() {
        let mut host = ConsoleHost::new();
        host.create_device(&selector_spec());

        let options = host.read_device_options(4).unwrap();
        assert_eq!(options.names(), ["Stereo", "Direct"]);
        assert_eq!(options.style(), SelectorStyle::Buttons);
        assert_eq!(host.device_state(4), Some(DeviceState::new(0, "")));
    }

    #[test]
    fn test_missing_device_is_ignored() {
        let mut host = ConsoleHost::new();
        host.update_device_state(9, 1, "On");
        assert!(host.device_state(9).is_none());
        assert!(host.read_device_options(9).is_none());
    }

    #[test]
    fn test_registry_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("devices.json");

        {
            let mut host = ConsoleHost::with_state_file(&path).unwrap();
            host.create_device(&selector_spec());
            let mut options = host.read_device_options(4).unwrap();
            options.push("[1F] New");
            host.update_device_options(4, &options);
            host.update_device_state(4, 1, "30");
        }

        let host = ConsoleHost::with_state_file(&path).unwrap();
        assert_eq!(host.device_count(), 1);
        assert_eq!(host.device_state(4), Some(DeviceState::new(1, "30")));
        assert_eq!(
            host.read_device_options(4).unwrap().names(),
            ["Stereo", "Direct", "[1F] New"]
        );
    }

    #[test]
    fn test_corrupt_registry_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(ConsoleHost::with_state_file(&path).is_err());
    }
}
