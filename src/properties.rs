//! Substitutable property table.
//!
//! A flattened, read-only mapping of property names to string values, built
//! once at assembly start from up to three layers. Later layers win on key
//! collision: environment < process-level properties < explicit overrides.

use std::collections::HashMap;

/// Read-only mapping of substitutable property names to string values.
///
/// Built via [`PropertyTable::builder`]; never mutated afterwards. Absent
/// keys are simply absent, there are no failure modes.
#[derive(Debug, Clone, Default)]
pub struct PropertyTable {
    entries: HashMap<String, String>,
}

impl PropertyTable {
    /// Start building a table from layered sources.
    pub fn builder() -> PropertyTableBuilder {
        PropertyTableBuilder::default()
    }

    /// Look up a property value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Number of entries in the flattened table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builder layering property sources in precedence order.
///
/// Each layer is flattened into the table as it is added, so a later layer
/// overrides an earlier one simply by inserting over it.
#[derive(Debug, Default)]
pub struct PropertyTableBuilder {
    entries: HashMap<String, String>,
}

impl PropertyTableBuilder {
    /// Layer in the process environment (lowest precedence). Reads process
    /// state once; call this first.
    pub fn environment(mut self) -> Self {
        for (key, value) in std::env::vars() {
            self.entries.insert(key, value);
        }
        self
    }

    /// Layer in process-level properties, overriding the environment.
    pub fn properties<K, V>(mut self, properties: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in properties {
            self.entries.insert(key.into(), value.into());
        }
        self
    }

    /// Layer in explicit overrides (highest precedence).
    pub fn overrides<K, V>(self, overrides: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.properties(overrides)
    }

    /// Flatten into the final read-only table.
    pub fn build(self) -> PropertyTable {
        PropertyTable {
            entries: self.entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_layers_win() {
        let table = PropertyTable::builder()
            .properties([("PORT", "8080"), ("HOST", "localhost")])
            .overrides([("PORT", "9999")])
            .build();
        assert_eq!(table.get("PORT"), Some("9999"));
        assert_eq!(table.get("HOST"), Some("localhost"));
    }

    #[test]
    fn absent_keys_are_absent() {
        let table = PropertyTable::builder().build();
        assert!(table.is_empty());
        assert_eq!(table.get("MISSING"), None);
    }

    #[test]
    fn environment_is_lowest_layer() {
        // PATH exists in any test environment; an explicit layer beats it.
        let table = PropertyTable::builder()
            .environment()
            .overrides([("PATH", "overridden")])
            .build();
        assert_eq!(table.get("PATH"), Some("overridden"));
    }

    #[test]
    fn owned_and_borrowed_keys_accepted() {
        let table = PropertyTable::builder()
            .properties([("A".to_string(), "1".to_string())])
            .overrides([("B", "2")])
            .build();
        assert_eq!(table.get("A"), Some("1"));
        assert_eq!(table.get("B"), Some("2"));
    }
}
