//! Writable-state sink that parsers decode responses into.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key/value store owned by a requester and written by its parser.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Blackboard {
    /// Stored values.
    pub data: Map<String, Value>,
}

impl Blackboard {
    /// Create an empty blackboard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Store a value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.data.insert(key.into(), value)
    }

    /// The object stored under `key`, inserting an empty one if the key is absent.
    ///
    /// Returns `None` without touching the entry when it holds a non-object value.
    pub fn object_mut(&mut self, key: &str) -> Option<&mut Map<String, Value>> {
        self.data
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()
    }
}
