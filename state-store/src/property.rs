//! Property trait for typed state values
//!
//! # Example
//!
//! ```rust
//! use state_store::Property;
//!
//! #[derive(Clone, PartialEq, Debug)]
//! pub struct Power(pub bool);
//!
//! impl Property for Power {
//!     const KEY: &'static str = "power";
//! }
//! ```

/// Marker trait for values that can be stored in a [`StateStore`](crate::StateStore).
///
/// `PartialEq` drives change detection: setting a value equal to the stored
/// one is reported as "unchanged".
pub trait Property: Clone + PartialEq + 'static {
    /// Human-readable key used in logs
    const KEY: &'static str;
}
