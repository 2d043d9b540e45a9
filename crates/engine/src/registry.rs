//! The preference registry.
//!
//! Process-wide mapping from preference key to live entity, created once at
//! engine startup. Re-registration under an existing key overwrites the
//! slot (last writer wins); nothing is removed during the process lifetime.

use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::preference::Preference;

/// Key → entity map shared by the engine and the storage bridge.
#[derive(Default)]
pub struct Registry {
    entries: RefCell<BTreeMap<String, Preference>>,
}

impl Registry {
    pub(crate) fn insert(&self, preference: Preference) {
        self.entries
            .borrow_mut()
            .insert(preference.key().to_string(), preference);
    }

    /// Look up a preference by key.
    pub fn get(&self, key: &str) -> Option<Preference> {
        self.entries.borrow().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.borrow().contains_key(key)
    }

    /// All registered keys, ordered.
    pub fn keys(&self) -> Vec<String> {
        self.entries.borrow().keys().cloned().collect()
    }

    /// All entries as `(key, preference)` pairs, ordered by key.
    pub fn snapshot(&self) -> Vec<(String, Preference)> {
        self.entries
            .borrow()
            .iter()
            .map(|(key, preference)| (key.clone(), preference.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Weak;

    fn entity(key: &str, system: &str) -> Preference {
        Preference::new(key, "system".to_string(), system.to_string(), Weak::new())
    }

    #[test]
    fn test_insert_and_lookup() {
        let registry = Registry::default();
        registry.insert(entity("theme", "light"));
        registry.insert(entity("motion", "full"));

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("theme"));
        assert_eq!(registry.get("motion").unwrap().system(), "full");
        assert!(registry.get("density").is_none());
    }

    #[test]
    fn test_reinsert_overwrites_slot() {
        let registry = Registry::default();
        registry.insert(entity("theme", "light"));
        registry.insert(entity("theme", "dark"));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("theme").unwrap().system(), "dark");
    }

    #[test]
    fn test_keys_are_ordered() {
        let registry = Registry::default();
        registry.insert(entity("motion", "full"));
        registry.insert(entity("density", "comfortable"));
        registry.insert(entity("theme", "light"));

        assert_eq!(registry.keys(), vec!["density", "motion", "theme"]);
    }
}
