//! Mail settings read from configuration, and transport selection.

use courier_config::{ConfigManager, ConfigValidator, Validate};
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;

use crate::file_log::DEFAULT_LOG_PATH;
use crate::{
    Address, Branding, CertificateValidation, Email, FileLogTransport, HandlebarsEngine,
    MailError, Mailer, Renderer, Result, SmtpConfig, SmtpSecurity, SmtpTransport, TemplateEngine,
};

/// Which transport a configured mailer uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MailDriver {
    Smtp,
    #[default]
    FileLog,
}

impl FromStr for MailDriver {
    type Err = MailError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "smtp" => Ok(MailDriver::Smtp),
            "filelog" => Ok(MailDriver::FileLog),
            other => Err(MailError::Config(format!(
                "unknown mail driver '{}'; expected Smtp or FileLog",
                other
            ))),
        }
    }
}

impl fmt::Display for MailDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MailDriver::Smtp => f.write_str("Smtp"),
            MailDriver::FileLog => f.write_str("FileLog"),
        }
    }
}

/// Everything under the `mail.` configuration prefix.
#[derive(Debug, Clone)]
pub struct MailSettings {
    pub driver: MailDriver,
    pub smtp: SmtpConfig,
    pub from: Option<Address>,
    pub log_path: PathBuf,
    pub template_root: PathBuf,
    pub branding: Branding,
}

impl MailSettings {
    /// Read and validate the `mail.*` keys.
    pub fn from_config(config: &ConfigManager) -> Result<Self> {
        let driver = match config.get_opt::<String>("mail.driver")? {
            Some(driver) => driver.parse()?,
            None => MailDriver::default(),
        };

        let smtp = match driver {
            MailDriver::Smtp => smtp_config(config)?,
            MailDriver::FileLog => SmtpConfig::new(String::new()),
        };
        let from = default_from(config)?;

        let settings = Self {
            driver,
            smtp,
            from,
            log_path: config
                .get_opt("mail.log_path")?
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_PATH)),
            template_root: config
                .get_opt("mail.template_root")?
                .unwrap_or_else(|| PathBuf::from(".")),
            branding: Branding::from_config(config)?,
        };

        settings.validate()?;
        Ok(settings)
    }
}

/// SMTP keys; only read when the driver is SMTP.
fn smtp_config(config: &ConfigManager) -> Result<SmtpConfig> {
    let security = match config.get_opt::<String>("mail.security")? {
        Some(security) => SmtpSecurity::parse(&security)?,
        None => SmtpSecurity::default(),
    };
    let port = match config.get_opt::<u16>("mail.port")? {
        Some(0) | None => security.default_port(),
        Some(port) => port,
    };

    let mut smtp = SmtpConfig::new(config.get_opt::<String>("mail.host")?.unwrap_or_default());
    smtp.security = security;
    smtp.port = port;
    smtp.username = config.get_opt("mail.username")?;
    smtp.password = config.get_opt("mail.password")?;
    smtp.certificates = certificate_validation(config)?;
    Ok(smtp)
}

/// `mail.from.address` and `mail.from.name`; a bad address is a config error.
fn default_from(config: &ConfigManager) -> Result<Option<Address>> {
    let Some(address) = config.get_opt::<String>("mail.from.address")? else {
        return Ok(None);
    };
    let name = config.get_opt::<String>("mail.from.name")?.unwrap_or_default();

    Address::with_name(address, name)
        .map(Some)
        .map_err(|e| MailError::Config(format!("mail.from.address: {}", e)))
}

fn certificate_validation(config: &ConfigManager) -> Result<CertificateValidation> {
    if config.get_opt::<bool>("mail.accept_invalid_certs")?.unwrap_or(false) {
        return Ok(CertificateValidation::AcceptInvalid);
    }

    match config.get_opt::<PathBuf>("mail.tls_root_cert")? {
        Some(path) => {
            let pem = std::fs::read(&path).map_err(|e| {
                MailError::Config(format!("cannot read {}: {}", path.display(), e))
            })?;
            Ok(CertificateValidation::TrustRoot(pem))
        }
        None => Ok(CertificateValidation::Verify),
    }
}

impl Validate for MailSettings {
    fn validate(&self) -> courier_config::Result<()> {
        if self.driver == MailDriver::Smtp {
            ConfigValidator::not_empty(&self.smtp.host, "mail.host")?;
            ConfigValidator::is_port(self.smtp.port, "mail.port")?;
        }
        if let Some(from) = &self.from {
            ConfigValidator::is_email(from.email(), "mail.from.address")?;
        }
        Ok(())
    }
}

impl Mailer {
    /// Build the mailer selected by `mail.driver`, rendering Handlebars
    /// templates from `mail.template_root`.
    pub fn from_config(config: &ConfigManager) -> Result<Self> {
        let settings = MailSettings::from_config(config)?;
        let engine = HandlebarsEngine::new(settings.template_root.clone());
        Self::from_settings(settings, engine)
    }

    /// Build the mailer selected by `settings` over a caller-chosen engine.
    pub fn from_settings(settings: MailSettings, engine: impl TemplateEngine + 'static) -> Result<Self> {
        let renderer = Renderer::new(engine, settings.branding);

        let mailer = match settings.driver {
            MailDriver::Smtp => Mailer::new(renderer, SmtpTransport::new(settings.smtp)?),
            MailDriver::FileLog => Mailer::new(renderer, FileLogTransport::new(settings.log_path)),
        };
        info!(driver = %settings.driver, "Mailer configured");

        Ok(match settings.from {
            Some(from) => mailer.with_default_from(from),
            None => mailer,
        })
    }

    /// Build a mailer that delivers through `send`, taking branding, default
    /// sender and template root from configuration. `mail.driver` is ignored.
    pub fn custom_from_config<F, Fut>(config: &ConfigManager, send: F) -> Result<Self>
    where
        F: Fn(Email) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let branding = Branding::from_config(config)?;
        let root = config
            .get_opt::<PathBuf>("mail.template_root")?
            .unwrap_or_else(|| PathBuf::from("."));
        let from = default_from(config)?;

        let mailer = Mailer::custom(Renderer::new(HandlebarsEngine::new(root), branding), send);
        info!(driver = "custom", "Mailer configured");

        Ok(match from {
            Some(from) => mailer.with_default_from(from),
            None => mailer,
        })
    }
}
