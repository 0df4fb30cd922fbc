// Configuration validation

use crate::{ConfigError, Result};

/// Trait for validating configuration
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Configuration validator with rules
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate that a value is not empty
    pub fn not_empty(value: &str, field: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{} cannot be empty",
                field
            )));
        }
        Ok(())
    }

    /// Validate email format (basic)
    pub fn is_email(value: &str, field: &str) -> Result<()> {
        match value.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
            _ => Err(ConfigError::ValidationError(format!(
                "{} must be a valid email",
                field
            ))),
        }
    }

    /// Validate port number
    pub fn is_port(value: u16, field: &str) -> Result<()> {
        if value == 0 {
            return Err(ConfigError::ValidationError(format!(
                "{} must be a valid port number",
                field
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_empty_validation() {
        assert!(ConfigValidator::not_empty("value", "field").is_ok());
        assert!(ConfigValidator::not_empty("", "field").is_err());
        assert!(ConfigValidator::not_empty("   ", "field").is_err());
    }

    #[test]
    fn test_email_validation() {
        assert!(ConfigValidator::is_email("noreply@example.com", "field").is_ok());
        assert!(ConfigValidator::is_email("noreply@localhost", "field").is_ok());
        assert!(ConfigValidator::is_email("noreply", "field").is_err());
        assert!(ConfigValidator::is_email("@example.com", "field").is_err());
    }

    #[test]
    fn test_port_validation() {
        assert!(ConfigValidator::is_port(2525, "field").is_ok());
        assert!(ConfigValidator::is_port(0, "field").is_err());
    }
}
