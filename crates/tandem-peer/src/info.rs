use std::collections::HashMap;
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Arbitrary key/value data attached to a connection for application use.
///
/// Typical uses: stashing an authenticated user id in a connect hook, or
/// per-connection feature flags a handler wants to read later.
#[derive(Debug, Default)]
pub struct Info {
    values: Mutex<HashMap<String, Value>>,
}

impl Info {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Set the value for `key`, replacing any previous value.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        self.values
            .lock()
            .expect("info lock poisoned")
            .insert(key.to_string(), value.into());
    }

    /// The raw value for `key`, if set.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.values
            .lock()
            .expect("info lock poisoned")
            .get(key)
            .cloned()
    }

    /// Decode the value for `key` into a concrete type.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(key)
            .and_then(|value| serde_json::from_value(value).ok())
    }

    /// The value for `key` as a string, if set and a string.
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key)
            .and_then(|value| value.as_str().map(str::to_string))
    }

    /// Remove and return the value for `key`.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.values
            .lock()
            .expect("info lock poisoned")
            .remove(key)
    }

    /// Whether `key` has a value.
    pub fn contains(&self, key: &str) -> bool {
        self.values
            .lock()
            .expect("info lock poisoned")
            .contains_key(key)
    }
}
