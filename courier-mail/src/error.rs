//! Mail error types.

use thiserror::Error;

/// Result type for mail operations.
pub type Result<T> = std::result::Result<T, MailError>;

/// Boxed error used for wrapped transport and callback failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Mail errors.
#[derive(Debug, Error)]
pub enum MailError {
    /// The template path did not resolve.
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// Template syntax, model binding or rendering failed.
    #[error("Template render error: {0}")]
    TemplateRender(String),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// The assembled message is not sendable.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The transport failed to hand off the message.
    #[error("Delivery via {transport} failed: {source}")]
    Delivery {
        /// Transport name (`smtp`, `filelog`).
        transport: &'static str,
        /// Underlying cause.
        #[source]
        source: BoxError,
    },

    /// Missing or unrecognized configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error raised by a custom send callback.
    #[error(transparent)]
    Custom(BoxError),
}

impl MailError {
    /// Wrap a transport failure.
    pub fn delivery(transport: &'static str, source: impl Into<BoxError>) -> Self {
        Self::Delivery {
            transport,
            source: source.into(),
        }
    }

    /// Wrap an arbitrary error raised from a custom send callback.
    pub fn custom(source: impl Into<BoxError>) -> Self {
        Self::Custom(source.into())
    }

    /// Whether the message itself was rejected before reaching a transport.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::InvalidAddress(_))
    }

    /// Whether this is a transport failure.
    pub fn is_delivery(&self) -> bool {
        matches!(self, Self::Delivery { .. })
    }
}

impl From<courier_config::ConfigError> for MailError {
    fn from(err: courier_config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<lettre::address::AddressError> for MailError {
    fn from(err: lettre::address::AddressError) -> Self {
        Self::InvalidAddress(err.to_string())
    }
}

impl From<handlebars::RenderError> for MailError {
    fn from(err: handlebars::RenderError) -> Self {
        Self::TemplateRender(err.to_string())
    }
}

impl From<handlebars::TemplateError> for MailError {
    fn from(err: handlebars::TemplateError) -> Self {
        Self::TemplateRender(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err = MailError::delivery("filelog", io);

        assert!(err.is_delivery());
        assert!(!err.is_validation());
        assert_eq!(err.to_string(), "Delivery via filelog failed: read-only");

        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "read-only");
    }

    #[test]
    fn test_custom_is_transparent() {
        let err = MailError::custom("webhook returned 500");
        assert_eq!(err.to_string(), "webhook returned 500");
    }

    #[test]
    fn test_config_error_conversion() {
        let err: MailError = courier_config::ConfigError::KeyNotFound("mail.host".into()).into();
        assert!(matches!(err, MailError::Config(ref msg) if msg.contains("mail.host")));
    }
}
