//! # Warden Configuration
//!
//! A minimal string key/value store on the app, mirroring
//! `app.set()` / `app.get()`. Plugins read their options from a
//! snapshot when they are built, and hooks see the snapshot taken at
//! the start of each call through `HookContext::config`.
//!
//! ```rust
//! use warden_core::WardenApp;
//! let app = WardenApp::<()>::new();
//!
//! app.set("tenant.strict", "true");
//!
//! assert_eq!(app.get("tenant.strict"), Some("true".to_string()));
//! assert_eq!(app.config_snapshot().get_bool("tenant.strict"), Some(true));
//! ```
//!
//! Environment overrides use a prefix and `__` as the path separator:
//! `WARDEN__TENANT__STRICT=true` becomes `tenant.strict = "true"`.

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct WardenConfig {
    values: HashMap<String, String>,
}

impl WardenConfig {
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

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Load every `PREFIX__A__B=value` pair from `vars` as `a.b = value`.
    ///
    /// Returns how many keys were set.
    pub fn load_vars<I>(&mut self, prefix: &str, vars: I) -> usize
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let prefix = format!("{prefix}__");
        let mut loaded = 0;
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(&prefix) {
                let normalized = stripped.to_lowercase().replace("__", ".");
                self.set(normalized, value);
                loaded += 1;
            }
        }
        loaded
    }

    /// [`WardenConfig::load_vars`] over the process environment.
    pub fn load_env(&mut self, prefix: &str) -> usize {
        self.load_vars(prefix, std::env::vars())
    }

    pub fn snapshot(&self) -> WardenConfigSnapshot {
        WardenConfigSnapshot::new(self.values.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct WardenConfigSnapshot {
    map: HashMap<String, String>,
}

impl WardenConfigSnapshot {
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
