//! Typed state storage with change detection
//!
//! Holds strongly-typed properties per entity and reports whether each
//! write actually changed the stored value.
//!
//! # Quick Start
//!
//! ```rust
//! use state_store::{Property, StateStore};
//!
//! #[derive(Clone, PartialEq, Debug)]
//! struct VolumePercent(u8);
//!
//! impl Property for VolumePercent {
//!     const KEY: &'static str = "volume_percent";
//! }
//!
//! let mut store = StateStore::<u8>::new();
//!
//! assert!(store.set(&1, VolumePercent(40)));
//! // Same value again is a no-op
//! assert!(!store.set(&1, VolumePercent(40)));
//! assert_eq!(store.get::<VolumePercent>(&1), Some(VolumePercent(40)));
//! ```
//!
//! # Architecture
//!
//! ```text
//! StateStore<Id>
//!     │
//!     └── entities: HashMap<Id, PropertyBag>
//!             │
//!             └── PropertyBag: HashMap<TypeId, Box<dyn Any>>
//! ```

pub mod property;
pub mod store;

pub use property::Property;
pub use store::{PropertyBag, StateStore};
