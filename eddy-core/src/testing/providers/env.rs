//! Environment variable provider for abstracting environment access.
//!
//! Scripts read settings through `env.get(name)`; tests use [`MockEnv`]
//! so they never touch the real process environment.

use parking_lot::RwLock;
use std::collections::HashMap;

/// Provider trait for environment variable lookups.
pub trait EnvProvider: Send + Sync {
    /// Get an environment variable.
    fn var(&self, key: &str) -> Option<String>;

    /// Get all environment variables.
    fn vars(&self) -> HashMap<String, String>;

    /// Check if this is a mock provider.
    fn is_mock(&self) -> bool;
}

/// Real environment provider that reads the process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealEnv;

impl RealEnv {
    /// Create a new real environment provider.
    pub fn new() -> Self {
        Self
    }
}

impl EnvProvider for RealEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }

    fn vars(&self) -> HashMap<String, String> {
        std::env::vars().collect()
    }

    fn is_mock(&self) -> bool {
        false
    }
}

/// Mock environment provider for testing.
///
/// # Example
///
/// ```
/// use eddy_core::testing::{EnvProvider, MockEnv};
///
/// let env = MockEnv::new()
///     .with_var("API_KEY", "test-key")
///     .with_var("DEBUG", "true");
///
/// assert_eq!(env.var("API_KEY"), Some("test-key".to_string()));
/// assert_eq!(env.var("MISSING"), None);
/// ```
#[derive(Debug, Default)]
pub struct MockEnv {
    vars: RwLock<HashMap<String, String>>,
}

impl MockEnv {
    /// Create a new empty mock environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable to the mock environment.
    pub fn with_var(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.write().insert(key.into(), value.into());
        self
    }

    /// Create a mock environment from key-value pairs.
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            vars: RwLock::new(vars),
        }
    }

    /// Set a variable.
    pub fn set_var(&self, key: &str, value: &str) {
        self.vars.write().insert(key.to_string(), value.to_string());
    }

    /// Remove a variable.
    pub fn remove_var(&self, key: &str) {
        self.vars.write().remove(key);
    }

    /// Get the number of variables.
    pub fn len(&self) -> usize {
        self.vars.read().len()
    }

    /// Check if the environment is empty.
    pub fn is_empty(&self) -> bool {
        self.vars.read().is_empty()
    }
}

impl EnvProvider for MockEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.read().get(key).cloned()
    }

    fn vars(&self) -> HashMap<String, String> {
        self.vars.read().clone()
    }

    fn is_mock(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_env_basic() {
        let env = MockEnv::new().with_var("FOO", "bar").with_var("BAZ", "qux");

        assert_eq!(env.var("FOO"), Some("bar".to_string()));
        assert_eq!(env.var("BAZ"), Some("qux".to_string()));
        assert_eq!(env.var("MISSING"), None);
    }

    #[test]
    fn mock_env_set_and_remove() {
        let env = MockEnv::new();

        env.set_var("KEY", "value");
        assert_eq!(env.var("KEY"), Some("value".to_string()));

        env.remove_var("KEY");
        assert_eq!(env.var("KEY"), None);
        assert!(env.is_empty());
    }

    #[test]
    fn mock_env_from_pairs() {
        let env = MockEnv::from_pairs(&[("A", "1"), ("B", "2")]);
        assert_eq!(env.len(), 2);
        assert_eq!(env.vars().get("B"), Some(&"2".to_string()));
    }

    #[test]
    fn mock_env_isolation() {
        let key = "EDDY_TEST_ISOLATION_KEY";
        let env = MockEnv::new().with_var(key, "mock_value");

        assert_eq!(env.var(key), Some("mock_value".to_string()));
        assert!(RealEnv::new().var(key).is_none());
    }
}
