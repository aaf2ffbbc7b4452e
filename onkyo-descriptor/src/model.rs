//! Capability model built from the receiver's descriptor.
//!
//! The model is rebuilt for every session and is read-only apart from
//! [`CapabilityModel::learn_listening_mode`], which appends entries for
//! listening-mode codes the descriptor did not announce.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::error::{DescriptorError, Result};
use crate::xml::{self, RawDevice, RawResponse};
use crate::zone::ZoneId;

/// Maximum volume assumed when a zone does not declare `volmax`.
pub const DEFAULT_MAX_VOLUME: u8 = 80;

const LISTENING_MODE_PREFIX: &str = "LMD";

/// Descriptive receiver metadata from `device/*`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<String>,
    pub friendly_name: Option<String>,
    pub firmware_version: Option<String>,
    pub destination: Option<String>,
}

/// A zone announced by the descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    pub id: ZoneId,
    pub name: String,
    pub enabled: bool,
    /// Receiver volume step corresponding to 100%
    pub max_volume: u8,
}

/// An input source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    /// Two hex digits, uppercase
    pub id: String,
    pub name: String,
}

/// A surround/DSP listening mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListeningMode {
    /// Two hex digits, uppercase
    pub code: String,
    pub label: String,
    /// Whether this entry was added at runtime rather than parsed
    pub learned: bool,
}

/// A stored tuner preset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunerPreset {
    /// Two hex digits, uppercase
    pub id: String,
    pub band: String,
    pub name: String,
    /// Display label: the preset number in decimal followed by its name
    pub label: String,
}

/// Everything a receiver reported about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityModel {
    info: DeviceInfo,
    zones: Vec<Zone>,
    selectors: Vec<Selector>,
    listening_modes: Vec<ListeningMode>,
    presets: Vec<TunerPreset>,
}

impl CapabilityModel {
    /// Parse a descriptor document.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::MalformedDescriptor`] when the text is not
    /// well-formed XML and [`DescriptorError::MissingElement`] when `device`
    /// or one of its four lists is absent.
    pub fn from_xml(xml: &str) -> Result<Self> {
        Self::from_xml_with(xml, DEFAULT_MAX_VOLUME)
    }

    /// Parse a descriptor, using `default_max_volume` for zones without `volmax`.
    pub fn from_xml_with(xml: &str, default_max_volume: u8) -> Result<Self> {
        let response: RawResponse = xml::parse(xml)?;
        let device = response
            .device
            .ok_or(DescriptorError::MissingElement("device"))?;

        let model = Self::from_raw(device, default_max_volume)?;
        info!(
            model = model.info.model.as_deref().unwrap_or("unknown"),
            zones = model.zones.len(),
            selectors = model.selectors.len(),
            listening_modes = model.listening_modes.len(),
            presets = model.presets.len(),
            "Built capability model"
        );
        Ok(model)
    }

    fn from_raw(device: RawDevice, default_max_volume: u8) -> Result<Self> {
        let zonelist = device
            .zonelist
            .ok_or(DescriptorError::MissingElement("zonelist"))?;
        let selectorlist = device
            .selectorlist
            .ok_or(DescriptorError::MissingElement("selectorlist"))?;
        let presetlist = device
            .presetlist
            .ok_or(DescriptorError::MissingElement("presetlist"))?;
        let controllist = device
            .controllist
            .ok_or(DescriptorError::MissingElement("controllist"))?;

        let mut zones: Vec<Zone> = Vec::new();
        for raw in zonelist.zones {
            let Some(id) = raw.id.trim().parse::<u8>().ok().and_then(ZoneId::from_number) else {
                debug!(id = %raw.id, "Skipping zone with unsupported id");
                continue;
            };
            if zones.iter().any(|z| z.id == id) {
                continue;
            }
            let max_volume = raw
                .volmax
                .as_deref()
                .and_then(|v| v.trim().parse::<u8>().ok())
                .filter(|&v| v > 0)
                .unwrap_or(default_max_volume);
            zones.push(Zone {
                id,
                name: raw.name,
                enabled: raw.value.trim() == "1",
                max_volume,
            });
        }

        let mut seen = HashSet::new();
        let selectors = selectorlist
            .selectors
            .into_iter()
            .map(|s| Selector {
                id: s.id.trim().to_uppercase(),
                name: s.name,
            })
            .filter(|s| seen.insert(s.id.clone()))
            .collect();

        let mut seen = HashSet::new();
        let listening_modes = controllist
            .controls
            .into_iter()
            .filter_map(|c| {
                let label = c.id.strip_prefix(LISTENING_MODE_PREFIX)?.trim_start().to_string();
                let code = c.code?.trim().to_uppercase();
                Some(ListeningMode {
                    code,
                    label,
                    learned: false,
                })
            })
            .filter(|m| seen.insert(m.code.clone()))
            .collect();

        let mut seen = HashSet::new();
        let presets = presetlist
            .presets
            .into_iter()
            .filter(|p| p.band.trim() != "0")
            .filter_map(|p| {
                let id = p.id.trim().to_uppercase();
                let number = u8::from_str_radix(&id, 16).ok()?;
                Some(TunerPreset {
                    label: format!("{} {}", number, p.name),
                    id,
                    band: p.band,
                    name: p.name,
                })
            })
            .filter(|p| seen.insert(p.id.clone()))
            .collect();

        Ok(Self {
            info: DeviceInfo {
                brand: device.brand,
                model: device.model,
                year: device.year,
                friendly_name: device.friendlyname,
                firmware_version: device.firmwareversion,
                destination: device.destination,
            },
            zones,
            selectors,
            listening_modes,
            presets,
        })
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    /// All zones in descriptor order.
    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn enabled_zones(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter().filter(|z| z.enabled)
    }

    pub fn zone(&self, id: ZoneId) -> Option<&Zone> {
        self.zones.iter().find(|z| z.id == id)
    }

    /// The zone if it exists and is enabled.
    pub fn enabled_zone(&self, id: ZoneId) -> Option<&Zone> {
        self.zone(id).filter(|z| z.enabled)
    }

    pub fn selectors(&self) -> &[Selector] {
        &self.selectors
    }

    pub fn selector_by_name(&self, name: &str) -> Option<&Selector> {
        self.selectors.iter().find(|s| s.name == name)
    }

    /// Case-insensitive lookup by wire id.
    pub fn selector_by_id(&self, id: &str) -> Option<&Selector> {
        let id = id.trim();
        self.selectors.iter().find(|s| s.id.eq_ignore_ascii_case(id))
    }

    pub fn listening_modes(&self) -> &[ListeningMode] {
        &self.listening_modes
    }

    pub fn listening_mode_by_code(&self, code: &str) -> Option<&ListeningMode> {
        let code = code.trim();
        self.listening_modes
            .iter()
            .find(|m| m.code.eq_ignore_ascii_case(code))
    }

    pub fn listening_mode_by_label(&self, label: &str) -> Option<&ListeningMode> {
        self.listening_modes.iter().find(|m| m.label == label)
    }

    pub fn presets(&self) -> &[TunerPreset] {
        &self.presets
    }

    pub fn preset_by_code(&self, code: &str) -> Option<&TunerPreset> {
        let code = code.trim();
        self.presets.iter().find(|p| p.id.eq_ignore_ascii_case(code))
    }

    /// Add a synthetic entry for a listening-mode code the descriptor omitted.
    ///
    /// Returns `false` when the code is already known, so learning the same
    /// code repeatedly adds exactly one entry.
    pub fn learn_listening_mode(&mut self, code: &str) -> bool {
        let code = code.trim().to_uppercase();
        if self.listening_mode_by_code(&code).is_some() {
            return false;
        }
        info!(code = %code, "Learning undocumented listening mode");
        self.listening_modes.push(ListeningMode {
            label: learned_label(&code),
            code,
            learned: true,
        });
        true
    }

    pub fn selector_names(&self) -> Vec<String> {
        self.selectors.iter().map(|s| s.name.clone()).collect()
    }

    pub fn listening_mode_labels(&self) -> Vec<String> {
        self.listening_modes.iter().map(|m| m.label.clone()).collect()
    }

    pub fn preset_labels(&self) -> Vec<String> {
        self.presets.iter().map(|p| p.label.clone()).collect()
    }
}

/// Label given to a learned listening mode, e.g. `[1F] New`.
pub fn learned_label(code: &str) -> String {
    format!("[{}] New", code)
}

/// Recover the code embedded in a learned label such as `[1F] New`.
pub fn code_from_learned_label(label: &str) -> Option<&str> {
    let rest = label.trim_start().strip_prefix('[')?;
    let end = rest.find(']')?;
    let code = rest[..end].trim();
    (!code.is_empty()).then_some(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const DESCRIPTOR: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<response status="ok">
  <device id="TX-NR626">
    <brand>ONKYO</brand>
    <category>AV Receiver</category>
    <year>2013</year>
    <model>TX-NR626</model>
    <destination>Dx</destination>
    <friendlyname>Living Room</friendlyname>
    <firmwareversion>1000-1100-0000-0000</firmwareversion>
    <zonelist count="4">
      <zone id="1" value="1" name="Main" volmax="80" volstep="0"/>
      <zone id="2" value="1" name="Zone2" volmax="70" volstep="0"/>
      <zone id="3" value="0" name="Zone3" volmax="80" volstep="0"/>
      <zone id="4" value="1" name="Zone4"/>
    </zonelist>
    <selectorlist count="3">
      <selector id="10" value="1" name="BD/DVD" zone="03"/>
      <selector id="2b" value="1" name="NET" zone="03"/>
      <selector id="24" value="1" name="TUNER" zone="03"/>
    </selectorlist>
    <presetlist count="3">
      <preset id="01" band="1" freq="87.50" name="Radio One"/>
      <preset id="0A" band="2" freq="1008" name="AM News"/>
      <preset id="0B" band="0" freq="0" name=""/>
    </presetlist>
    <controllist>
      <control id="Bass" value="1" zone="1"/>
      <control id="LMD Stereo" value="1" code="00"/>
      <control id="LMD Direct" value="1" code="01"/>
      <control id="LMD All Ch Stereo" value="1" code="0c"/>
    </controllist>
  </device>
</response>"#;

    fn model() -> CapabilityModel {
        CapabilityModel::from_xml(DESCRIPTOR).unwrap()
    }

    #[test]
    fn test_device_info() {
        let model = model();
        assert_eq!(model.info().brand.as_deref(), Some("ONKYO"));
        assert_eq!(model.info().model.as_deref(), Some("TX-NR626"));
        assert_eq!(model.info().friendly_name.as_deref(), Some("Living Room"));
    }

    #[test]
    fn test_zones_keep_order_and_flags() {
        let model = model();
        let ids: Vec<_> = model.zones().iter().map(|z| z.id).collect();
        assert_eq!(ids, vec![ZoneId::Main, ZoneId::Zone2, ZoneId::Zone3, ZoneId::Zone4]);

        let enabled: Vec<_> = model.enabled_zones().map(|z| z.id).collect();
        assert_eq!(enabled, vec![ZoneId::Main, ZoneId::Zone2, ZoneId::Zone4]);

        assert_eq!(model.zone(ZoneId::Zone2).unwrap().max_volume, 70);
        assert_eq!(model.zone(ZoneId::Zone4).unwrap().max_volume, DEFAULT_MAX_VOLUME);
        assert!(model.enabled_zone(ZoneId::Zone3).is_none());
    }

    #[test]
    fn test_default_max_volume_override() {
        let model = CapabilityModel::from_xml_with(DESCRIPTOR, 100).unwrap();
        assert_eq!(model.zone(ZoneId::Zone4).unwrap().max_volume, 100);
        assert_eq!(model.zone(ZoneId::Main).unwrap().max_volume, 80);
    }

    #[rstest]
    #[case("2b")]
    #[case("2B")]
    #[case(" 2B ")]
    fn test_selector_lookup_is_case_insensitive(#[case] id: &str) {
        let model = model();
        assert_eq!(model.selector_by_id(id).unwrap().name, "NET");
    }

    #[test]
    fn test_selector_ids_are_uppercased() {
        let model = model();
        assert_eq!(model.selector_by_name("NET").unwrap().id, "2B");
        assert!(model.selector_by_name("net").is_none());
        assert!(model.selector_by_id("99").is_none());
    }

    #[test]
    fn test_listening_modes() {
        let model = model();
        assert_eq!(model.listening_mode_labels(), vec!["Stereo", "Direct", "All Ch Stereo"]);
        assert_eq!(model.listening_mode_by_code("0C").unwrap().label, "All Ch Stereo");
        assert_eq!(model.listening_mode_by_label("Direct").unwrap().code, "01");
    }

    #[test]
    fn test_presets_skip_unused_band() {
        let model = model();
        assert_eq!(model.preset_labels(), vec!["1 Radio One", "10 AM News"]);
        assert_eq!(model.preset_by_code("0a").unwrap().name, "AM News");
        assert!(model.preset_by_code("0B").is_none());
    }

    #[test]
    fn test_learn_listening_mode_is_idempotent() {
        let mut model = model();
        let before = model.listening_modes().len();

        assert!(model.learn_listening_mode("1f"));
        assert!(!model.learn_listening_mode("1F"));

        assert_eq!(model.listening_modes().len(), before + 1);
        let learned = model.listening_mode_by_code("1F").unwrap();
        assert_eq!(learned.label, "[1F] New");
        assert!(learned.learned);
    }

    #[test]
    fn test_learning_a_known_code_is_a_no_op() {
        let mut model = model();
        assert!(!model.learn_listening_mode("00"));
    }

    #[rstest]
    #[case("[1F] New", Some("1F"))]
    #[case("  [a0] New", Some("a0"))]
    #[case("Stereo", None)]
    #[case("[] New", None)]
    #[case("[1F New", None)]
    fn test_code_from_learned_label(#[case] label: &str, #[case] expected: Option<&str>) {
        assert_eq!(code_from_learned_label(label), expected);
    }

    #[test]
    fn test_malformed_xml() {
        let result = CapabilityModel::from_xml("<response><device>");
        assert!(matches!(result, Err(DescriptorError::MalformedDescriptor(_))));
    }

    #[rstest]
    #[case("<response status=\"ok\"></response>", "device")]
    #[case("<response><device><selectorlist/><presetlist/><controllist/></device></response>", "zonelist")]
    #[case("<response><device><zonelist/><presetlist/><controllist/></device></response>", "selectorlist")]
    #[case("<response><device><zonelist/><selectorlist/><controllist/></device></response>", "presetlist")]
    #[case("<response><device><zonelist/><selectorlist/><presetlist/></device></response>", "controllist")]
    fn test_missing_elements(#[case] xml: &str, #[case] element: &'static str) {
        assert_eq!(
            CapabilityModel::from_xml(xml),
            Err(DescriptorError::MissingElement(element))
        );
    }
}
