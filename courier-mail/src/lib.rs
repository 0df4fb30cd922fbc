//! # Courier Mail
//!
//! Template-rendered email with pluggable transports.
//!
//! ## Features
//!
//! - **Templates**: Handlebars templates with organization branding injected
//!   into every render
//! - **SMTP Transport**: STARTTLS or implicit TLS via lettre, with an optional
//!   certificate-validation override
//! - **File Log Transport**: Appends messages to a local file for development
//! - **Custom Transport**: Hand messages to your own async function
//! - **Configuration**: Pick the transport from `mail.*` settings
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use courier_mail::prelude::*;
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Welcome { name: String }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let renderer = Renderer::new(
//!         HandlebarsEngine::new("templates"),
//!         Branding::default().company_name("Acme").primary_color("#ff6600"),
//!     );
//!
//!     let mailer = Mailer::smtp(renderer, SmtpConfig::new("smtp.example.com")
//!         .credentials("user@example.com", "password")
//!         .starttls())?
//!         .with_default_from(Address::with_name("noreply@example.com", "Acme")?);
//!
//!     let mail = TemplateMail::template("mail/welcome", Welcome { name: "Ada".into() })
//!         .to("ada@example.com")
//!         .subject("Welcome aboard");
//!
//!     mailer.send(&mail).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## From Configuration
//!
//! ```rust,ignore
//! use courier_config::ConfigManager;
//! use courier_mail::Mailer;
//!
//! // mail.driver = "Smtp" | "FileLog"
//! let config = ConfigManager::builder().with_prefix("COURIER").load_env().build()?;
//! let mailer = Mailer::from_config(&config)?;
//! ```

mod address;
mod attachment;
mod custom;
mod email;
mod error;
mod file_log;
mod mailable;
mod mailer;
mod renderer;
mod settings;
mod template;
mod transport;

pub use address::{Address, IntoAddress};
pub use attachment::Attachment;
pub use custom::{CustomTransport, SendFn};
pub use email::Email;
pub use error::{BoxError, MailError, Result};
pub use file_log::{DEFAULT_LOG_PATH, FileLogTransport, format_record};
pub use mailable::{MailView, Mailable, TemplateMail};
pub use mailer::{MailTransport, Mailer};
pub use renderer::{Branding, Renderer};
pub use settings::{MailDriver, MailSettings};
pub use template::{CompiledTemplate, HandlebarsEngine, TemplateEngine};
pub use transport::{CertificateValidation, SmtpConfig, SmtpSecurity, SmtpTransport, Transport};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        Address, Attachment, Branding, Email, HandlebarsEngine, MailError, MailView, Mailable,
        Mailer, Renderer, SmtpConfig, TemplateMail, Transport,
    };
}
