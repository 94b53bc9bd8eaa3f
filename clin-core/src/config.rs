//! # ClinRS Configuration
//!
//! A minimal, framework-agnostic configuration system based on a string
//! key/value store (`app.set()` / `app.get()`). Applications layer
//! environment or file loading on top however they like.
//!
//! Process-wide configuration is read-only after startup: request
//! handlers only ever see an immutable [`ClinConfigSnapshot`].
//!
//! Keys used by the core:
//! - `tenant.default`: opt-in single-tenant-mode fallback, honored only
//!   by the tenant guard (never by the resolver itself).

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct ClinConfig {
    values: HashMap<String, String>,
}

impl ClinConfig {
    /// Create an empty config store.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Set a configuration key to a string value.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    /// Get a configuration value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    /// Check whether a key is present.
    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn snapshot(&self) -> ClinConfigSnapshot {
        ClinConfigSnapshot::new(self.values.clone())
    }
}

/// Immutable view of the configuration, safe to hand to request handlers.
#[derive(Debug, Clone, Default)]
pub struct ClinConfigSnapshot {
    map: HashMap<String, String>,
}

impl ClinConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.parse::<usize>().ok())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.parse::<bool>().ok())
    }
}
