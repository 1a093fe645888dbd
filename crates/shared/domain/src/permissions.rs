//! Per-user permission overrides.
//!
//! The map is stored as a JSON object on the user row. A name is granted
//! while its key is present with a `true` flag; revoking removes the key.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Permission name -> granted flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionMap(BTreeMap<String, bool>);

impl PermissionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map granting exactly the given names.
    pub fn granting<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut map = Self::new();
        map.grant(names);
        map
    }

    /// Set every name to granted. Other keys are left alone.
    pub fn grant<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.0.insert(name.into(), true);
        }
    }

    /// Remove every name from the map. Missing names are ignored.
    pub fn revoke<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.0.remove(name.as_ref());
        }
    }

    pub fn is_granted(&self, name: &str) -> bool {
        self.0.get(name).copied().unwrap_or(false)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.0.iter().map(|(name, granted)| (name.as_str(), *granted))
    }

    /// Names whose flag is set.
    pub fn granted_names(&self) -> Vec<String> {
        self.0
            .iter()
            .filter(|(_, granted)| **granted)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Read the stored JSON column.
    ///
    /// Values are boolean-like: `true`, non-zero numbers and the strings
    /// `"1"`/`"true"` count as granted. Anything other than an object
    /// yields an empty map.
    pub fn from_json(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::new();
        };

        let map = object
            .iter()
            .map(|(name, flag)| (name.clone(), flag_is_set(flag)))
            .collect();
        Self(map)
    }

    pub fn to_json(&self) -> Value {
        // BTreeMap<String, bool> always serializes
        serde_json::to_value(&self.0).unwrap_or_else(|_| Value::Object(Default::default()))
    }
}

fn flag_is_set(flag: &Value) -> bool {
    match flag {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => matches!(s.as_str(), "1" | "true"),
        _ => false,
    }
}

impl<S: Into<String>> FromIterator<S> for PermissionMap {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::granting(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_grant_keeps_existing_keys() {
        let mut map = PermissionMap::granting(["files.view"]);
        map.grant(["files.create"]);

        assert!(map.is_granted("files.view"));
        assert!(map.is_granted("files.create"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_revoke_removes_key() {
        let mut map = PermissionMap::granting(["files.view", "files.delete"]);
        map.revoke(["files.delete"]);

        assert!(!map.contains("files.delete"));
        assert_eq!(map.granted_names(), vec!["files.view".to_string()]);
    }

    #[test]
    fn test_revoke_missing_name_is_noop() {
        let mut map = PermissionMap::granting(["files.view"]);
        let before = map.clone();
        map.revoke(["admin"]);

        assert_eq!(map, before);
    }

    #[test]
    fn test_grant_then_revoke_restores_map() {
        let mut map = PermissionMap::granting(["files.view"]);
        let before = map.clone();

        map.grant(["users.edit", "users.delete"]);
        map.revoke(["users.edit", "users.delete"]);

        assert_eq!(map, before);
    }

    #[test]
    fn test_from_json_boolean_like_values() {
        let map = PermissionMap::from_json(&json!({
            "a": true,
            "b": 1,
            "c": "1",
            "d": 0,
            "e": false,
        }));

        assert_eq!(map.granted_names(), vec!["a", "b", "c"]);
        assert!(map.contains("d"));
        assert!(!map.is_granted("e"));
    }

    #[test]
    fn test_from_json_non_object() {
        assert!(PermissionMap::from_json(&json!(null)).is_empty());
        assert!(PermissionMap::from_json(&json!(["a"])).is_empty());
    }

    #[test]
    fn test_json_column_shape() {
        let map = PermissionMap::granting(["files.view"]);
        assert_eq!(map.to_json(), json!({ "files.view": true }));
        assert_eq!(PermissionMap::from_json(&map.to_json()), map);
    }
}
