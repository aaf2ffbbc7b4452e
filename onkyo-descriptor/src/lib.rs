//! # onkyo-descriptor
//!
//! Capability model for Onkyo/Integra receivers, parsed from the XML
//! document a receiver returns for `!1NRIQSTN`.
//!
//! ## Usage
//!
//! ```rust
//! use onkyo_descriptor::{extract_document, CapabilityModel, ZoneId};
//!
//! let payload = "<response><device><model>TX-8050</model>\
//!     <zonelist><zone id=\"1\" value=\"1\" name=\"Main\" volmax=\"100\"/></zonelist>\
//!     <selectorlist><selector id=\"2b\" name=\"NET\"/></selectorlist>\
//!     <presetlist/><controllist/></device></response>\u{1a}";
//!
//! let model = CapabilityModel::from_xml(extract_document(payload)?)?;
//! assert_eq!(model.zone(ZoneId::Main).unwrap().max_volume, 100);
//! assert_eq!(model.selector_by_id("2B").unwrap().name, "NET");
//! # Ok::<(), onkyo_descriptor::DescriptorError>(())
//! ```

pub mod error;
mod model;
mod xml;
mod zone;

pub use error::{DescriptorError, Result};
pub use model::{
    code_from_learned_label, learned_label, CapabilityModel, DeviceInfo, ListeningMode, Selector,
    TunerPreset, Zone, DEFAULT_MAX_VOLUME,
};
pub use xml::extract_document;
pub use zone::ZoneId;
