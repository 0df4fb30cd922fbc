// Configuration management for Courier
//
// A flat, string-keyed store. Nested file sections and `__`-separated
// environment variables both resolve to dotted keys such as `mail.from.address`.

pub mod builder;
pub mod env;
pub mod error;
pub mod loader;
pub mod validation;

pub use builder::ConfigBuilder;
pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use validation::{ConfigValidator, Validate};

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

/// Main configuration manager
#[derive(Clone)]
pub struct ConfigManager {
    config: Arc<RwLock<HashMap<String, Value>>>,
    env_prefix: Option<String>,
}

impl ConfigManager {
    /// Create a new configuration manager
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(HashMap::new())),
            env_prefix: None,
        }
    }

    /// Create with environment variable prefix
    pub fn with_prefix(prefix: String) -> Self {
        Self {
            config: Arc::new(RwLock::new(HashMap::new())),
            env_prefix: Some(prefix),
        }
    }

    /// Builder for layering files, `.env` and the environment
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Load configuration from environment variables
    pub fn load_env(&self) -> Result<()> {
        let loader = EnvLoader::new(self.env_prefix.clone());
        let env_vars = loader.load()?;

        let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
        for (key, value) in env_vars {
            config.insert(key, Value::String(value));
        }

        Ok(())
    }

    /// Load configuration from .env file, then the environment
    pub fn load_dotenv(&self, path: Option<&Path>) -> Result<()> {
        if let Some(path) = path {
            dotenvy::from_path(path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
        } else {
            dotenvy::dotenv().ok(); // Ignore if .env doesn't exist
        }
        self.load_env()
    }

    /// Load configuration from file
    pub fn load_file(&self, path: impl AsRef<Path>, format: FileFormat) -> Result<()> {
        let entries = ConfigLoader::new(format).read(path)?;
        self.extend(entries);
        Ok(())
    }

    /// Load a file whose format is implied by its extension
    pub fn load_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let entries = ConfigLoader::for_path(&path)?.read(&path)?;
        self.extend(entries);
        Ok(())
    }

    fn extend(&self, entries: Vec<(String, Value)>) {
        let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
        config.extend(entries);
    }

    /// Set a configuration value
    pub fn set<T: serde::Serialize>(&self, key: &str, value: T) -> Result<()> {
        let json_value = serde_json::to_value(value)
            .map_err(|e| ConfigError::SerializationError(e.to_string()))?;

        let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
        config.insert(key.to_string(), json_value);

        Ok(())
    }

    /// Get a configuration value
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.get_opt(key)?
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))
    }

    /// Get a configuration value, `None` when the key is absent or null.
    ///
    /// String values are coerced when the target type is not a string, so an
    /// environment variable `"2525"` reads as a port and `"true"` as a bool.
    pub fn get_opt<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let config = self.config.read().unwrap_or_else(PoisonError::into_inner);

        let value = match config.get(key) {
            None | Some(Value::Null) => return Ok(None),
            Some(value) => value.clone(),
        };
        drop(config);

        match serde_json::from_value::<T>(value.clone()) {
            Ok(parsed) => Ok(Some(parsed)),
            Err(err) => coerce_string(&value)
                .and_then(|coerced| serde_json::from_value(coerced).ok())
                .map(Some)
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: err.to_string(),
                }),
        }
    }

    /// Get a configuration value with default
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get_opt(key).ok().flatten().unwrap_or(default)
    }

    /// Get a string value
    pub fn get_string(&self, key: &str) -> Result<String> {
        self.get(key)
    }

    /// Get an integer value
    pub fn get_int(&self, key: &str) -> Result<i64> {
        self.get(key)
    }

    /// Get a boolean value
    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.get(key)
    }

    /// Check if a key exists
    pub fn has(&self, key: &str) -> bool {
        let config = self.config.read().unwrap_or_else(PoisonError::into_inner);
        config.contains_key(key)
    }

    /// Get all configuration keys
    pub fn keys(&self) -> Vec<String> {
        let config = self.config.read().unwrap_or_else(PoisonError::into_inner);
        config.keys().cloned().collect()
    }

    /// Merge configuration from another manager
    pub fn merge(&self, other: &ConfigManager) {
        let other_config = other.config.read().unwrap_or_else(PoisonError::into_inner);
        let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);

        for (key, value) in other_config.iter() {
            config.insert(key.clone(), value.clone());
        }
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

fn coerce_string(value: &Value) -> Option<Value> {
    match value {
        Value::String(s) => serde_json::from_str(s.trim()).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let manager = ConfigManager::new();
        manager.set("mail.driver", "smtp").unwrap();

        let value: String = manager.get("mail.driver").unwrap();
        assert_eq!(value, "smtp");
    }

    #[test]
    fn test_get_or_default() {
        let manager = ConfigManager::new();

        let value: String = manager.get_or("mail.driver", "FileLog".to_string());
        assert_eq!(value, "FileLog");
    }

    #[test]
    fn test_get_opt_missing_and_null() {
        let manager = ConfigManager::new();
        manager.set("mail.logo_src", Value::Null).unwrap();

        assert_eq!(manager.get_opt::<String>("mail.logo_src").unwrap(), None);
        assert_eq!(manager.get_opt::<String>("mail.company_name").unwrap(), None);
    }

    #[test]
    fn test_string_coercion() {
        let manager = ConfigManager::new();
        manager.set("mail.port", "2525").unwrap();
        manager.set("mail.accept_invalid_certs", "true").unwrap();

        assert_eq!(manager.get::<u16>("mail.port").unwrap(), 2525);
        assert!(manager.get::<bool>("mail.accept_invalid_certs").unwrap());
    }

    #[test]
    fn test_invalid_value() {
        let manager = ConfigManager::new();
        manager.set("mail.port", "not-a-port").unwrap();

        let err = manager.get::<u16>("mail.port").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "mail.port"));
    }

    #[test]
    fn test_has_key() {
        let manager = ConfigManager::new();
        manager.set("existing_key", "value").unwrap();

        assert!(manager.has("existing_key"));
        assert!(!manager.has("missing_key"));
    }

    #[test]
    fn test_merge() {
        let base = ConfigManager::new();
        base.set("mail.host", "localhost").unwrap();

        let overrides = ConfigManager::new();
        overrides.set("mail.host", "smtp.example.com").unwrap();

        base.merge(&overrides);
        assert_eq!(base.get_string("mail.host").unwrap(), "smtp.example.com");
    }
}
