//! Zone runtime state kept by the engine.
//!
//! Values are keyed by [`ZoneId`] in a [`StateStore`]; listening mode and
//! tuner preset are only ever set for the main zone.

use onkyo_descriptor::ZoneId;
use state_store::{Property, StateStore};

/// Per-zone runtime state
pub type ZoneState = StateStore<ZoneId>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Power(pub bool);

impl Property for Power {
    const KEY: &'static str = "power";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Muted(pub bool);

impl Property for Muted {
    const KEY: &'static str = "muted";
}

/// Volume as a percentage of the zone's maximum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumePercent(pub u8);

impl Property for VolumePercent {
    const KEY: &'static str = "volume_percent";
}

/// Name of the active input selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSelector(pub String);

impl Property for ActiveSelector {
    const KEY: &'static str = "active_selector";
}

/// Label of the active listening mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveListeningMode(pub String);

impl Property for ActiveListeningMode {
    const KEY: &'static str = "active_listening_mode";
}

/// Label of the active tuner preset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveTunerPreset(pub String);

impl Property for ActiveTunerPreset {
    const KEY: &'static str = "active_tuner_preset";
}
