//! Entity <-> column mapping
//!
//! Entities are written as a flat [`ColumnMap`] and read back through
//! SeaORM's `FromQueryResult`.

use std::collections::btree_map::{self, BTreeMap};

use convert_case::{Boundary, Case, Casing};
use rk_core::traits::Entity;
use sea_orm::{FromQueryResult, Value};

const WORD_BOUNDARIES: [Boundary; 5] = [
    Boundary::Underscore,
    Boundary::Hyphen,
    Boundary::Space,
    Boundary::LowerUpper,
    Boundary::Acronym,
];

/// Convert an attribute name to its snake_case column name
///
/// `createdAt` becomes `created_at`, `HTTPCode` becomes `http_code`. Digits
/// stay attached to their word, so `line2` is left alone.
pub fn tablize(name: &str) -> String {
    name.with_boundaries(&WORD_BOUNDARIES).to_case(Case::Snake)
}

/// Column name to value mapping, ordered by column name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMap {
    columns: BTreeMap<String, Value>,
}

impl ColumnMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn set(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert a value under the snake_case form of `name`
    pub fn insert(&mut self, name: &str, value: impl Into<Value>) -> Option<Value> {
        self.columns.insert(tablize(name), value.into())
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        self.columns.remove(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.columns.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Keep only the listed columns
    pub fn extract_by_keys<S: AsRef<str>>(&self, keys: &[S]) -> ColumnMap {
        let columns = keys
            .iter()
            .filter_map(|key| {
                let key = key.as_ref();
                self.columns
                    .get(key)
                    .map(|value| (key.to_string(), value.clone()))
            })
            .collect();
        Self { columns }
    }
}

impl IntoIterator for ColumnMap {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.into_iter()
    }
}

impl<K: AsRef<str>, V: Into<Value>> FromIterator<(K, V)> for ColumnMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (name, value) in iter {
            map.insert(name.as_ref(), value);
        }
        map
    }
}

/// An entity a [`TableRepository`](crate::TableRepository) can store
///
/// Rows are hydrated with `FromQueryResult`; writes go through
/// [`to_columns`](CrudEntity::to_columns).
pub trait CrudEntity: Entity + FromQueryResult + 'static {
    /// Current attribute values keyed by column name
    fn to_columns(&self) -> ColumnMap;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tablize() {
        assert_eq!(tablize("createdAt"), "created_at");
        assert_eq!(tablize("HTTPCode"), "http_code");
        assert_eq!(tablize("ownerId2"), "owner_id2");
        assert_eq!(tablize("Price"), "price");
        assert_eq!(tablize("first-name"), "first_name");
        assert_eq!(tablize("already_snake"), "already_snake");
        assert_eq!(tablize("address_line2"), "address_line2");
    }

    #[test]
    fn test_insert_normalizes_keys() {
        let map = ColumnMap::new()
            .set("createdBy", 7i64)
            .set("name", "bolt");

        assert!(map.contains("created_by"));
        assert!(!map.contains("createdBy"));
        assert_eq!(map.get("name"), Some(&Value::from("bolt")));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["created_by", "name"]);
    }

    #[test]
    fn test_extract_by_keys() {
        let map: ColumnMap = [("id", 1i64), ("price", 5), ("stock", 9)]
            .into_iter()
            .collect();

        let writable = map.extract_by_keys(&["price", "stock", "missing"]);
        assert_eq!(writable.len(), 2);
        assert!(!writable.contains("id"));
        assert!(!writable.contains("missing"));
    }

    #[test]
    fn test_remove() {
        let mut map = ColumnMap::new().set("id", 3i64).set("name", "nut");
        assert_eq!(map.remove("id"), Some(Value::from(3i64)));
        assert_eq!(map.remove("id"), None);
        assert_eq!(map.len(), 1);
    }
}
