// Environment variable loading

use crate::{ConfigError, Result};
use std::collections::HashMap;
use std::env;

/// Separator used in variable names for nested keys (`MAIL__FROM__ADDRESS`).
pub const NESTING_SEPARATOR: &str = "__";

/// Environment variable loader
///
/// Variable names are lowercased and `__` becomes `.`, so with the prefix
/// `COURIER` the variable `COURIER_MAIL__FROM__ADDRESS` is stored under
/// `mail.from.address`.
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    /// Create a new environment loader
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Load all matching environment variables, keyed by their dotted form
    pub fn load(&self) -> Result<HashMap<String, String>> {
        Ok(self.collect(env::vars()))
    }

    fn collect(&self, vars: impl IntoIterator<Item = (String, String)>) -> HashMap<String, String> {
        let mut config = HashMap::new();

        for (key, value) in vars {
            let trimmed = match self.prefix {
                Some(ref prefix) => match key.strip_prefix(prefix.as_str()) {
                    Some(rest) if rest.starts_with('_') => rest.trim_start_matches('_'),
                    _ => continue,
                },
                None => key.as_str(),
            };

            if trimmed.is_empty() {
                continue;
            }
            config.insert(normalize_key(trimmed), value);
        }

        config
    }

    /// Load a specific variable by its dotted key
    pub fn load_var(&self, key: &str) -> Result<String> {
        let var = key.replace('.', NESTING_SEPARATOR).to_uppercase();
        let full_key = match self.prefix {
            Some(ref prefix) => format!("{}_{}", prefix, var),
            None => var,
        };

        env::var(&full_key).map_err(ConfigError::EnvError)
    }

    /// Load with default value
    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Turn `MAIL__FROM__ADDRESS` into `mail.from.address`.
pub fn normalize_key(var: &str) -> String {
    var.to_lowercase().replace(NESTING_SEPARATOR, ".")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("MAIL__FROM__ADDRESS"), "mail.from.address");
        assert_eq!(normalize_key("MAIL__LOG_PATH"), "mail.log_path");
    }

    #[test]
    fn test_collect_with_prefix() {
        let loader = EnvLoader::new(Some("COURIER".to_string()));
        let config = loader.collect(vars(&[
            ("COURIER_MAIL__DRIVER", "smtp"),
            ("COURIERX_OTHER", "ignored"),
            ("PATH", "/usr/bin"),
        ]));

        assert_eq!(config.get("mail.driver").map(String::as_str), Some("smtp"));
        assert_eq!(config.len(), 1);
    }

    #[test]
    fn test_collect_without_prefix() {
        let loader = EnvLoader::default();
        let config = loader.collect(vars(&[("MAIL__HOST", "localhost")]));

        assert_eq!(config.get("mail.host").map(String::as_str), Some("localhost"));
    }

    #[test]
    fn test_env_loader_with_default() {
        let loader = EnvLoader::new(None);
        let value = loader.load_var_or("nonexistent.var_12345", "default");

        assert_eq!(value, "default");
    }

    #[test]
    fn test_env_loader_missing_var() {
        let loader = EnvLoader::new(Some("COURIER_TEST".to_string()));
        assert!(loader.load_var("missing_var_67890").is_err());
    }
}
