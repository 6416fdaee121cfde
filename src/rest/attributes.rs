//! The attribute bag and its change tracking.
//!
//! [`Attributes`] stores a resource's values as a JSON object. A key holding
//! `null` is distinct from an absent key, which is what lets a resource tell
//! "the server said there is none" apart from "never asked".
//!
//! # How Tracking Works
//!
//! A snapshot of the bag is taken whenever a resource is loaded from the
//! server or saved. Changes are computed by comparing the live bag to that
//! snapshot, so writing a value equal to the current one never marks a key
//! dirty, and writing a key back to its snapshot value clears it again.
//!
//! # Example
//!
//! ```rust
//! use rest_model::rest::Attributes;
//! use serde_json::json;
//!
//! let mut attributes = Attributes::from_map(
//!     json!({"id": 1, "name": "Tobias"}).as_object().unwrap().clone(),
//! );
//! attributes.mark_clean();
//!
//! attributes.set("name", json!("Tobias"));
//! assert!(!attributes.is_changed("name"));
//!
//! attributes.set("name", json!("Lindsay"));
//! assert_eq!(
//!     attributes.changes().get("name"),
//!     Some(&(json!("Tobias"), json!("Lindsay")))
//! );
//!
//! attributes.changes_applied();
//! assert!(!attributes.is_dirty());
//! assert!(attributes.previous_changes().contains_key("name"));
//! ```

use std::collections::BTreeMap;

use serde::ser::Error as _;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::rest::ResourceError;

/// Old and new value of a changed attribute.
pub type Change = (Value, Value);

/// Returns `true` for values considered blank.
///
/// `null`, `false`, empty or whitespace-only strings and empty arrays or
/// objects are blank. Numbers never are.
#[must_use]
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Number(_) => false,
    }
}

/// Serializes caller-supplied parameters into a JSON object.
///
/// `null` (e.g. `()` or `None`) becomes an empty map.
///
/// # Errors
///
/// Returns [`ResourceError::Serialization`] if `params` does not serialize to
/// an object.
pub fn to_map<P: Serialize + ?Sized>(params: &P) -> Result<Map<String, Value>, ResourceError> {
    match serde_json::to_value(params)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(serde_json::Error::custom(format!(
            "parameters must serialize to a JSON object, got `{other}`"
        ))
        .into()),
    }
}

/// A resource's attribute bag with change tracking.
///
/// Equality compares the live values only; tracking state is ignored.
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    values: Map<String, Value>,
    original: Map<String, Value>,
    previous_changes: BTreeMap<String, Change>,
}

impl PartialEq for Attributes {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl Attributes {
    /// Creates an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a bag whose every key counts as changed.
    #[must_use]
    pub fn from_map(values: Map<String, Value>) -> Self {
        Self {
            values,
            ..Self::default()
        }
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Returns `true` if the bag holds `key`, even when its value is `null`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Returns `true` if the bag holds `key` with a non-blank value.
    #[must_use]
    pub fn is_present(&self, key: &str) -> bool {
        self.values.get(key).is_some_and(|value| !is_blank(value))
    }

    /// Stores a value, returning the previous one.
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(key.into(), value)
    }

    /// Removes a key, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Stores every pair of `other`.
    pub fn merge(&mut self, other: Map<String, Value>) {
        for (key, value) in other {
            self.values.insert(key, value);
        }
    }

    /// Returns the attribute names.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    /// Iterates over all pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Returns the number of stored attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the bag is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the live values.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Consumes the bag, returning the live values.
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.values
    }

    /// Returns `{key: (old, new)}` for every key that differs from the snapshot.
    ///
    /// Keys missing on one side compare as `null`.
    #[must_use]
    pub fn changes(&self) -> BTreeMap<String, Change> {
        let mut changes = BTreeMap::new();

        for (key, value) in &self.values {
            let old = self.original.get(key).unwrap_or(&Value::Null);
            if old != value {
                changes.insert(key.clone(), (old.clone(), value.clone()));
            }
        }

        for (key, old) in &self.original {
            if !self.values.contains_key(key) {
                changes.insert(key.clone(), (old.clone(), Value::Null));
            }
        }

        changes
    }

    /// Returns the names of changed attributes.
    #[must_use]
    pub fn changed(&self) -> Vec<String> {
        self.changes().into_keys().collect()
    }

    /// Returns `true` if `key` differs from the snapshot.
    #[must_use]
    pub fn is_changed(&self, key: &str) -> bool {
        match (self.original.get(key), self.values.get(key)) {
            (Some(old), Some(new)) => old != new,
            (None, Some(new)) => !new.is_null(),
            (Some(_), None) => true,
            (None, None) => false,
        }
    }

    /// Returns `true` if any attribute differs from the snapshot.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.changes().is_empty()
    }

    /// Returns the changes recorded by the last [`changes_applied`](Self::changes_applied).
    #[must_use]
    pub const fn previous_changes(&self) -> &BTreeMap<String, Change> {
        &self.previous_changes
    }

    /// Records the current changes as saved and takes a new snapshot.
    pub fn changes_applied(&mut self) {
        self.previous_changes = self.changes();
        self.original = self.values.clone();
    }

    /// Takes a new snapshot without touching `previous_changes`.
    pub fn mark_clean(&mut self) {
        self.original = self.values.clone();
    }

    /// Drops the snapshot and the recorded previous changes.
    pub fn clear_changes_information(&mut self) {
        self.original = self.values.clone();
        self.previous_changes.clear();
    }

    /// Restores every changed key to its snapshot value.
    pub fn restore(&mut self) {
        self.values = self.original.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn loaded(value: Value) -> Attributes {
        let mut attributes = Attributes::from_map(value.as_object().cloned().unwrap());
        attributes.mark_clean();
        attributes
    }

    #[test]
    fn test_blank_values() {
        for value in [json!(null), json!(""), json!("  "), json!([]), json!({}), json!(false)] {
            assert!(is_blank(&value), "{value} should be blank");
        }
        for value in [json!(0), json!("x"), json!([1]), json!({"a": 1}), json!(true)] {
            assert!(!is_blank(&value), "{value} should not be blank");
        }
    }

    #[test]
    fn test_to_map_accepts_objects_and_null_only() {
        assert_eq!(to_map(&json!({"a": 1})).unwrap().get("a"), Some(&json!(1)));
        assert!(to_map(&()).unwrap().is_empty());
        assert!(matches!(
            to_map(&json!([1, 2])),
            Err(ResourceError::Serialization(_))
        ));
    }

    #[test]
    fn test_null_is_distinct_from_absent() {
        let attributes = loaded(json!({"organization": null}));
        assert!(attributes.contains("organization"));
        assert_eq!(attributes.get("organization"), Some(&Value::Null));
        assert!(!attributes.contains("team"));
        assert!(!attributes.is_present("organization"));
    }

    #[test]
    fn test_new_bag_reports_every_key_as_changed() {
        let attributes = Attributes::from_map(json!({"name": "Maeby"}).as_object().cloned().unwrap());
        assert!(attributes.is_dirty());
        assert_eq!(
            attributes.changes().get("name"),
            Some(&(Value::Null, json!("Maeby")))
        );
    }

    #[test]
    fn test_setting_same_value_is_not_a_change() {
        let mut attributes = loaded(json!({"name": "Tobias"}));
        attributes.set("name", json!("Tobias"));
        assert!(!attributes.is_changed("name"));
        assert!(!attributes.is_dirty());
    }

    #[test]
    fn test_setting_new_value_is_a_change() {
        let mut attributes = loaded(json!({"name": "Tobias"}));
        attributes.set("name", json!("Lindsay"));

        assert!(attributes.is_changed("name"));
        assert_eq!(attributes.changed(), vec!["name".to_string()]);
    }

    #[test]
    fn test_reverting_clears_the_change() {
        let mut attributes = loaded(json!({"name": "Tobias"}));
        attributes.set("name", json!("Lindsay"));
        attributes.set("name", json!("Tobias"));
        assert!(!attributes.is_dirty());
    }

    #[test]
    fn test_changes_applied_moves_changes_to_previous() {
        let mut attributes = loaded(json!({"name": "Tobias"}));
        attributes.set("name", json!("Lindsay"));
        attributes.changes_applied();

        assert!(!attributes.is_dirty());
        assert_eq!(
            attributes.previous_changes().get("name"),
            Some(&(json!("Tobias"), json!("Lindsay")))
        );
    }

    #[test]
    fn test_mark_clean_keeps_previous_changes() {
        let mut attributes = loaded(json!({"name": "Tobias"}));
        attributes.set("name", json!("Lindsay"));
        attributes.changes_applied();
        attributes.set("name", json!("George"));
        attributes.mark_clean();

        assert!(!attributes.is_dirty());
        assert!(attributes.previous_changes().contains_key("name"));

        attributes.clear_changes_information();
        assert!(attributes.previous_changes().is_empty());
    }

    #[test]
    fn test_removed_key_is_a_change() {
        let mut attributes = loaded(json!({"name": "Tobias", "age": 40}));
        attributes.remove("age");
        assert_eq!(attributes.changes().get("age"), Some(&(json!(40), Value::Null)));
    }

    #[test]
    fn test_restore_reverts_to_snapshot() {
        let mut attributes = loaded(json!({"name": "Tobias"}));
        attributes.set("name", json!("Lindsay"));
        attributes.set("email", json!("l@bluth.com"));
        attributes.restore();

        assert_eq!(attributes.get("name"), Some(&json!("Tobias")));
        assert!(!attributes.contains("email"));
    }

    #[test]
    fn test_equality_ignores_tracking_state() {
        let clean = loaded(json!({"name": "Tobias"}));
        let dirty = Attributes::from_map(json!({"name": "Tobias"}).as_object().cloned().unwrap());
        assert_eq!(clean, dirty);
    }
}
