//! Raw serde mapping of the receiver's XML descriptor.
//!
//! The receiver answers `!1NRIQSTN` with a document shaped like:
//!
//! ```xml
//! <response status="ok">
//!   <device id="TX-NR626">
//!     <brand>ONKYO</brand>
//!     <model>TX-NR626</model>
//!     <zonelist count="2">
//!       <zone id="1" value="1" name="Main" volmax="80"/>
//!     </zonelist>
//!     <selectorlist count="1">
//!       <selector id="10" value="1" name="BD/DVD"/>
//!     </selectorlist>
//!     <presetlist count="1">
//!       <preset id="01" band="1" freq="87.50" name="Radio 1"/>
//!     </presetlist>
//!     <controllist>
//!       <control id="LMD Stereo" value="1" code="00"/>
//!     </controllist>
//!   </device>
//! </response>
//! ```
//!
//! These structs only mirror the document; interpretation happens in
//! [`crate::model`].

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{DescriptorError, Result};

#[derive(Debug, Deserialize)]
pub(crate) struct RawResponse {
    #[serde(default)]
    pub device: Option<RawDevice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawDevice {
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub friendlyname: Option<String>,
    #[serde(default)]
    pub firmwareversion: Option<String>,
    #[serde(default)]
    pub zonelist: Option<RawZoneList>,
    #[serde(default)]
    pub selectorlist: Option<RawSelectorList>,
    #[serde(default)]
    pub presetlist: Option<RawPresetList>,
    #[serde(default)]
    pub controllist: Option<RawControlList>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawZoneList {
    #[serde(rename = "zone", default)]
    pub zones: Vec<RawZone>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawZone {
    #[serde(rename = "@id", default)]
    pub id: String,
    #[serde(rename = "@value", default)]
    pub value: String,
    #[serde(rename = "@name", default)]
    pub name: String,
    #[serde(rename = "@volmax", default)]
    pub volmax: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawSelectorList {
    #[serde(rename = "selector", default)]
    pub selectors: Vec<RawSelector>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawSelector {
    #[serde(rename = "@id", default)]
    pub id: String,
    #[serde(rename = "@name", default)]
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawPresetList {
    #[serde(rename = "preset", default)]
    pub presets: Vec<RawPreset>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawPreset {
    #[serde(rename = "@id", default)]
    pub id: String,
    #[serde(rename = "@band", default)]
    pub band: String,
    #[serde(rename = "@name", default)]
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawControlList {
    #[serde(rename = "control", default)]
    pub controls: Vec<RawControl>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawControl {
    #[serde(rename = "@id", default)]
    pub id: String,
    #[serde(rename = "@code", default)]
    pub code: Option<String>,
}

/// Deserialize an XML string.
pub(crate) fn parse<T: DeserializeOwned>(xml: &str) -> Result<T> {
    quick_xml::de::from_str(xml).map_err(|e| DescriptorError::MalformedDescriptor(e.to_string()))
}

/// Cut the XML document out of an `NRI` payload.
///
/// The document runs from the first `<` to the last `>`; anything around
/// it is framing padding.
pub fn extract_document(payload: &str) -> Result<&str> {
    let start = payload.find('<').ok_or(DescriptorError::NoDocument)?;
    let end = payload.rfind('>').ok_or(DescriptorError::NoDocument)?;
    if end < start {
        return Err(DescriptorError::NoDocument);
    }
    Ok(&payload[start..=end])
}
