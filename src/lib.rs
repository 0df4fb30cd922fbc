// Courier - template-rendered email with pluggable transports
//
// This crate ties the mail and configuration crates together and provides
// the logging setup applications install before sending mail.

pub mod logging;

// Re-export the workspace crates
pub use courier_config as config;
pub use courier_mail as mail;

pub use courier_mail::*;

/// Prelude for common imports.
pub mod prelude {
    pub use crate::logging::{LogConfig, LogFormat, LogLevel, LogOutput};
    pub use courier_config::{ConfigBuilder, ConfigManager, FileFormat};
    pub use courier_mail::prelude::*;
    pub use courier_mail::{MailDriver, MailSettings};
}
