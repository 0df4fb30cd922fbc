// Configuration file loaders

use crate::env::normalize_key;
use crate::{ConfigError, Result};
use serde_json::{Map, Value};
use std::io::Cursor;
use std::path::Path;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
    /// `KEY=value` lines; `MAIL__FROM__ADDRESS` becomes `mail.from.address`
    Env,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            "env" => Some(FileFormat::Env),
            _ => None,
        }
    }

    /// Detect the format of `path`; a bare `.env` file counts as Env.
    pub fn from_path(path: &Path) -> Result<Self> {
        if path.file_name().is_some_and(|name| name == ".env") {
            return Ok(FileFormat::Env);
        }

        let ext = path.extension().and_then(|s| s.to_str()).ok_or_else(|| {
            ConfigError::LoadError(format!("{}: no file extension", path.display()))
        })?;

        Self::from_extension(ext)
            .ok_or_else(|| ConfigError::LoadError(format!("{}: unsupported format", path.display())))
    }
}

/// Reads one configuration source into dotted key/value pairs.
pub struct ConfigLoader {
    format: FileFormat,
}

impl ConfigLoader {
    pub fn new(format: FileFormat) -> Self {
        Self { format }
    }

    /// Loader for the format implied by `path`.
    pub fn for_path(path: impl AsRef<Path>) -> Result<Self> {
        FileFormat::from_path(path.as_ref()).map(Self::new)
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    /// Read `path` into flattened entries.
    pub fn read(&self, path: impl AsRef<Path>) -> Result<Vec<(String, Value)>> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadError(format!("{}: {}", path.display(), e)))?;

        self.entries(&content)
    }

    /// Parse `content` into flattened entries.
    pub fn entries(&self, content: &str) -> Result<Vec<(String, Value)>> {
        match self.format {
            FileFormat::Json => {
                let value: Value = serde_json::from_str(content)
                    .map_err(|e| ConfigError::ParseError(format!("JSON: {}", e)))?;
                Ok(flatten(value))
            }
            FileFormat::Toml => {
                let table: toml::Table = toml::from_str(content)
                    .map_err(|e| ConfigError::ParseError(format!("TOML: {}", e)))?;
                let value = serde_json::to_value(table)
                    .map_err(|e| ConfigError::SerializationError(e.to_string()))?;
                Ok(flatten(value))
            }
            FileFormat::Env => env_entries(content),
        }
    }
}

fn env_entries(content: &str) -> Result<Vec<(String, Value)>> {
    dotenvy::from_read_iter(Cursor::new(content))
        .map(|item| {
            item.map(|(key, value)| (normalize_key(&key), Value::String(value)))
                .map_err(|e| ConfigError::ParseError(format!("env: {}", e)))
        })
        .collect()
}

/// Flatten nested objects into dotted keys.
///
/// `{"mail": {"from": {"address": "a@b.c"}}}` yields `("mail.from.address", "a@b.c")`.
/// Arrays and scalars are kept as leaf values.
pub fn flatten(value: Value) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    if let Value::Object(map) = value {
        flatten_into(None, map, &mut out);
    }
    out
}

fn flatten_into(prefix: Option<&str>, map: Map<String, Value>, out: &mut Vec<(String, Value)>) {
    for (key, value) in map {
        let full_key = match prefix {
            Some(prefix) => format!("{}.{}", prefix, key),
            None => key,
        };

        match value {
            Value::Object(nested) => flatten_into(Some(&full_key), nested, out),
            leaf => out.push((full_key, leaf)),
        }
    }
}
