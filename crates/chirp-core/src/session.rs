//! Per-conversation session state.
//!
//! A [`Session`] is a JSON object owned by one conversation. Handlers may
//! store anything serializable in it. Two keys are reserved for the scene
//! engine:
//!
//! | Key | Meaning |
//! |-----|---------|
//! | [`SCENE_KEY`] (`__scene`) | name of the active scene, absent when none |
//! | [`STEP_KEY`] (`step`) | step cursor into that scene; ignored without `__scene` |

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Session key holding the active scene name.
pub const SCENE_KEY: &str = "__scene";

/// Session key holding the scene step cursor.
pub const STEP_KEY: &str = "step";

/// Key/value state of a single conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Session(Map<String, Value>);

impl Session {
    /// Creates an empty session.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Returns the raw value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the value under `key` deserialized as `T`.
    ///
    /// Returns `None` when the key is absent or holds a different shape.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.0
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Returns the value under `key` as a string slice.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Stores a value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Serializes `value` and stores it under `key`.
    pub fn set<T: Serialize>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(value)?;
        self.0.insert(key.into(), value);
        Ok(())
    }

    /// Removes a key, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Removes every key, including the reserved scene keys.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    // ─── Scene bookkeeping ────────────────────────────────────────────────────

    /// Returns the active scene name.
    pub fn scene(&self) -> Option<&str> {
        self.get_str(SCENE_KEY)
    }

    /// Returns the step cursor if it holds a non-negative integer.
    pub fn step(&self) -> Option<usize> {
        self.0
            .get(STEP_KEY)
            .and_then(Value::as_u64)
            .and_then(|s| usize::try_from(s).ok())
    }

    pub fn set_scene(&mut self, name: impl Into<String>) {
        self.0.insert(SCENE_KEY.into(), Value::String(name.into()));
    }

    pub fn set_step(&mut self, step: usize) {
        self.0.insert(STEP_KEY.into(), Value::from(step));
    }

    // ─── Conversions ──────────────────────────────────────────────────────────

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Session {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
