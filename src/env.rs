//! Defines the [`Environment`] trait, the source of the environment-style
//! settings (`STATIC_GEN_TIME`, `TERM_START`, `TERM_END`). Real runs read the
//! process environment; tests hand in a map.

use std::collections::HashMap;

/// Looks up environment-style settings by name.
pub trait Environment {
    /// Returns the value for `key`, or `None` if it is unset. Empty values are
    /// reported as unset.
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads settings from the process environment.
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        match std::env::var(key) {
            Ok(value) if !value.is_empty() => Some(value),
            _ => None,
        }
    }
}

impl Environment for HashMap<&str, &str> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key)
            .filter(|v| !v.is_empty())
            .map(|v| (*v).to_owned())
    }
}
