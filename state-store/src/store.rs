//! Type-erased property storage
//!
//! - `PropertyBag`: all properties of one entity, keyed by type
//! - `StateStore<Id>`: property bags for a set of entities

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use crate::property::Property;

/// Type-erased storage for an entity's properties
///
/// ```rust
/// use state_store::{Property, PropertyBag};
///
/// #[derive(Clone, PartialEq, Debug)]
/// struct Muted(bool);
/// impl Property for Muted {
///     const KEY: &'static str = "muted";
/// }
///
/// let mut bag = PropertyBag::new();
/// assert!(bag.set(Muted(false)));
/// assert!(!bag.set(Muted(false)));
/// assert!(bag.set(Muted(true)));
/// assert_eq!(bag.get::<Muted>(), Some(Muted(true)));
/// ```
#[derive(Default)]
pub struct PropertyBag {
    values: HashMap<TypeId, Box<dyn Any>>,
}

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a property value by type
    pub fn get<P: Property>(&self) -> Option<P> {
        self.values
            .get(&TypeId::of::<P>())
            .and_then(|boxed| boxed.downcast_ref::<P>())
            .cloned()
    }

    /// Set a property value, returning whether the value changed
    pub fn set<P: Property>(&mut self, value: P) -> bool {
        let type_id = TypeId::of::<P>();
        let current = self
            .values
            .get(&type_id)
            .and_then(|boxed| boxed.downcast_ref::<P>());

        if current == Some(&value) {
            return false;
        }
        self.values.insert(type_id, Box::new(value));
        true
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for PropertyBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyBag")
            .field("property_count", &self.values.len())
            .finish()
    }
}

/// Per-entity property storage with change detection
///
/// The store is owned by a single driver and mutated through `&mut self`;
/// [`StateStore::set`] reports whether a write changed anything so callers
/// can skip redundant downstream updates.
pub struct StateStore<Id>
where
    Id: Clone + Eq + Hash,
{
    entities: HashMap<Id, PropertyBag>,
}

impl<Id> StateStore<Id>
where
    Id: Clone + Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            entities: HashMap::new(),
        }
    }

    /// Get a property value for an entity
    pub fn get<P: Property>(&self, entity_id: &Id) -> Option<P> {
        self.entities.get(entity_id)?.get::<P>()
    }

    /// Set a property value, creating the entity if needed.
    ///
    /// Returns `true` when the stored value changed.
    pub fn set<P: Property>(&mut self, entity_id: &Id, value: P) -> bool {
        self.entities
            .entry(entity_id.clone())
            .or_default()
            .set(value)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Clear all entities and properties
    pub fn clear(&mut self) {
        self.entities.clear();
    }
}

impl<Id> Default for StateStore<Id>
where
    Id: Clone + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<Id> fmt::Debug for StateStore<Id>
where
    Id: Clone + Eq + Hash,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateStore")
            .field("entity_count", &self.entity_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, PartialEq, Debug)]
    struct Level(u8);

    impl Property for Level {
        const KEY: &'static str = "level";
    }

    #[derive(Clone, PartialEq, Debug)]
    struct Label(String);

    impl Property for Label {
        const KEY: &'static str = "label";
    }

    #[test]
    fn test_property_bag_multiple_types() {
        let mut bag = PropertyBag::new();

        bag.set(Level(42));
        bag.set(Label("Stereo".to_string()));

        assert_eq!(bag.len(), 2);
        assert_eq!(bag.get::<Level>(), Some(Level(42)));
        assert_eq!(bag.get::<Label>(), Some(Label("Stereo".to_string())));

        assert!(!bag.set(Level(42)));
    }

    #[test]
    fn test_state_store_change_detection() {
        let mut store = StateStore::<u8>::new();

        assert!(store.is_empty());
        assert!(store.set(&1, Level(50)));
        assert!(!store.set(&1, Level(50)));
        assert!(store.set(&1, Level(51)));
        assert!(store.set(&2, Level(51)));

        assert_eq!(store.entity_count(), 2);
        assert_eq!(store.get::<Level>(&1), Some(Level(51)));
        assert_eq!(store.get::<Label>(&1), None);
    }

    #[test]
    fn test_clear_forgets_values() {
        let mut store = StateStore::<&'static str>::new();
        store.set(&"main", Level(10));
        store.set(&"zone2", Level(20));

        store.clear();
        assert!(store.is_empty());
        assert!(store.set(&"main", Level(10)));
    }
}
