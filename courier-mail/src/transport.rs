//! Email transport implementations.

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Tokio1Executor,
    transport::smtp::{
        authentication::Credentials,
        client::{Certificate, Tls, TlsParameters},
    },
};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{Email, MailError, Result};

/// Email transport trait.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Hand a fully assembled email to the transport.
    async fn send(&self, email: &Email) -> Result<()>;

    /// Short transport name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Check if the transport is healthy.
    async fn is_healthy(&self) -> bool {
        true
    }
}

/// SMTP security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmtpSecurity {
    /// No encryption.
    None,
    /// STARTTLS upgrade (port 587).
    #[default]
    StartTls,
    /// Implicit TLS (port 465).
    Tls,
}

impl SmtpSecurity {
    /// Conventional port for this mode.
    pub fn default_port(&self) -> u16 {
        match self {
            SmtpSecurity::None => 25,
            SmtpSecurity::StartTls => 587,
            SmtpSecurity::Tls => 465,
        }
    }

    /// Parse `none`, `starttls` or `tls` (case-insensitive).
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" | "plain" => Ok(SmtpSecurity::None),
            "starttls" => Ok(SmtpSecurity::StartTls),
            "tls" | "ssl" => Ok(SmtpSecurity::Tls),
            other => Err(MailError::Config(format!(
                "unknown SMTP security mode '{}'; expected none, starttls or tls",
                other
            ))),
        }
    }
}

/// How the server certificate is checked during the TLS handshake.
#[derive(Clone, Default, PartialEq, Eq)]
pub enum CertificateValidation {
    /// Verify against the platform trust roots.
    #[default]
    Verify,
    /// Accept any certificate, including self-signed or expired ones.
    AcceptInvalid,
    /// Additionally trust the given PEM-encoded root certificate.
    TrustRoot(Vec<u8>),
}

impl fmt::Debug for CertificateValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verify => f.write_str("Verify"),
            Self::AcceptInvalid => f.write_str("AcceptInvalid"),
            Self::TrustRoot(pem) => write!(f, "TrustRoot({} bytes)", pem.len()),
        }
    }
}

/// SMTP configuration.
#[derive(Clone)]
pub struct SmtpConfig {
    /// SMTP server host.
    pub host: String,
    /// SMTP server port.
    pub port: u16,
    /// Security mode.
    pub security: SmtpSecurity,
    /// Username for authentication.
    pub username: Option<String>,
    /// Password for authentication.
    pub password: Option<String>,
    /// Connection timeout.
    pub timeout: Duration,
    /// Certificate check override.
    pub certificates: CertificateValidation,
}

impl SmtpConfig {
    /// Create a new SMTP configuration.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: SmtpSecurity::StartTls.default_port(),
            security: SmtpSecurity::StartTls,
            username: None,
            password: None,
            timeout: Duration::from_secs(30),
            certificates: CertificateValidation::Verify,
        }
    }

    /// Set credentials.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set the port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Use STARTTLS security (port 587).
    pub fn starttls(mut self) -> Self {
        self.security = SmtpSecurity::StartTls;
        self.port = SmtpSecurity::StartTls.default_port();
        self
    }

    /// Use implicit TLS security (port 465).
    pub fn tls(mut self) -> Self {
        self.security = SmtpSecurity::Tls;
        self.port = SmtpSecurity::Tls.default_port();
        self
    }

    /// Use no encryption.
    pub fn insecure(mut self) -> Self {
        self.security = SmtpSecurity::None;
        self.port = SmtpSecurity::None.default_port();
        self
    }

    /// Set the connection timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override certificate validation.
    pub fn certificate_validation(mut self, validation: CertificateValidation) -> Self {
        self.certificates = validation;
        self
    }

    /// Accept invalid server certificates (self-signed test servers).
    pub fn accept_invalid_certs(self) -> Self {
        self.certificate_validation(CertificateValidation::AcceptInvalid)
    }

    /// Credentials when both parts are present and non-empty.
    fn auth(&self) -> Option<Credentials> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => {
                Some(Credentials::new(user.to_string(), pass.to_string()))
            }
            _ => None,
        }
    }

    fn tls_parameters(&self) -> Result<TlsParameters> {
        let mut builder = TlsParameters::builder(self.host.clone());

        match &self.certificates {
            CertificateValidation::Verify => {}
            CertificateValidation::AcceptInvalid => {
                warn!(host = %self.host, "SMTP certificate validation disabled");
                builder = builder.dangerous_accept_invalid_certs(true);
            }
            CertificateValidation::TrustRoot(pem) => {
                let cert = Certificate::from_pem(pem)
                    .map_err(|e| MailError::Config(format!("invalid root certificate: {}", e)))?;
                builder = builder.add_root_certificate(cert);
            }
        }

        builder
            .build()
            .map_err(|e| MailError::Config(format!("TLS configuration error: {}", e)))
    }
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("security", &self.security)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("timeout", &self.timeout)
            .field("certificates", &self.certificates)
            .finish()
    }
}

/// SMTP transport.
///
/// Each send opens its own connection and closes it afterwards; connections
/// are never pooled or shared between sends.
pub struct SmtpTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    config: SmtpConfig,
}

impl SmtpTransport {
    /// Create a new SMTP transport.
    pub fn new(config: SmtpConfig) -> Result<Self> {
        if config.host.trim().is_empty() {
            return Err(MailError::Config("SMTP host is required".to_string()));
        }

        let tls = match config.security {
            SmtpSecurity::None => Tls::None,
            SmtpSecurity::StartTls => Tls::Required(config.tls_parameters()?),
            SmtpSecurity::Tls => Tls::Wrapper(config.tls_parameters()?),
        };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            .port(config.port)
            .tls(tls)
            .timeout(Some(config.timeout));

        if let Some(credentials) = config.auth() {
            builder = builder.credentials(credentials);
        }

        let transport = builder.build();

        info!(
            host = %config.host,
            port = config.port,
            security = ?config.security,
            certificates = ?config.certificates,
            "SMTP transport initialized"
        );

        Ok(Self { transport, config })
    }

    /// Get the configuration.
    pub fn config(&self) -> &SmtpConfig {
        &self.config
    }

    /// Test the SMTP connection.
    pub async fn test_connection(&self) -> Result<bool> {
        self.transport
            .test_connection()
            .await
            .map_err(|e| MailError::delivery("smtp", e))
    }
}

#[async_trait]
impl Transport for SmtpTransport {
    async fn send(&self, email: &Email) -> Result<()> {
        let message = email.to_lettre()?;

        debug!(
            to = ?email.to.iter().map(|a| a.email()).collect::<Vec<_>>(),
            subject = %email.subject,
            "Sending email via SMTP"
        );

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::delivery("smtp", e))?;

        debug!("Email sent successfully");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "smtp"
    }

    async fn is_healthy(&self) -> bool {
        self.test_connection().await.unwrap_or(false)
    }
}
