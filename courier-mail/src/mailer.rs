//! High-level mailer interface.

use async_trait::async_trait;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::{
    Address, CustomTransport, Email, FileLogTransport, MailError, MailView, Mailable, Renderer,
    Result, SmtpConfig, SmtpTransport, Transport,
};

/// The transport a [`Mailer`] delivers through.
///
/// Exactly one variant is active for the lifetime of a mailer.
pub enum MailTransport {
    Smtp(SmtpTransport),
    FileLog(FileLogTransport),
    Custom(CustomTransport),
}

#[async_trait]
impl Transport for MailTransport {
    async fn send(&self, email: &Email) -> Result<()> {
        match self {
            MailTransport::Smtp(t) => t.send(email).await,
            MailTransport::FileLog(t) => t.send(email).await,
            MailTransport::Custom(t) => t.send(email).await,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            MailTransport::Smtp(t) => t.name(),
            MailTransport::FileLog(t) => t.name(),
            MailTransport::Custom(t) => t.name(),
        }
    }

    async fn is_healthy(&self) -> bool {
        match self {
            MailTransport::Smtp(t) => t.is_healthy().await,
            MailTransport::FileLog(t) => t.is_healthy().await,
            MailTransport::Custom(t) => t.is_healthy().await,
        }
    }
}

impl From<SmtpTransport> for MailTransport {
    fn from(transport: SmtpTransport) -> Self {
        MailTransport::Smtp(transport)
    }
}

impl From<FileLogTransport> for MailTransport {
    fn from(transport: FileLogTransport) -> Self {
        MailTransport::FileLog(transport)
    }
}

impl From<CustomTransport> for MailTransport {
    fn from(transport: CustomTransport) -> Self {
        MailTransport::Custom(transport)
    }
}

/// Renders mailables and sends them through the configured transport.
///
/// ```rust,ignore
/// let renderer = Renderer::new(HandlebarsEngine::new("templates"), branding);
/// let mailer = Mailer::file_log(renderer, "mail.log")
///     .with_default_from(Address::with_name("noreply@acme.test", "Acme")?);
///
/// mailer
///     .send(&TemplateMail::template("welcome", &user).to(&user.email).subject("Hi"))
///     .await?;
/// ```
pub struct Mailer {
    renderer: Arc<Renderer>,
    transport: MailTransport,
    default_from: Option<Address>,
}

impl Mailer {
    /// Create a mailer over any transport variant.
    pub fn new(renderer: Renderer, transport: impl Into<MailTransport>) -> Self {
        let transport = transport.into();
        debug!(transport = transport.name(), "Mailer created");
        Self {
            renderer: Arc::new(renderer),
            transport,
            default_from: None,
        }
    }

    /// Create a mailer delivering over SMTP.
    pub fn smtp(renderer: Renderer, config: SmtpConfig) -> Result<Self> {
        Ok(Self::new(renderer, SmtpTransport::new(config)?))
    }

    /// Create a mailer that appends every message to `path`.
    pub fn file_log(renderer: Renderer, path: impl Into<PathBuf>) -> Self {
        Self::new(renderer, FileLogTransport::new(path))
    }

    /// Create a mailer that hands every message to `send`.
    pub fn custom<F, Fut>(renderer: Renderer, send: F) -> Self
    where
        F: Fn(Email) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self::new(renderer, CustomTransport::new(send))
    }

    /// Sender used when a message sets none.
    pub fn with_default_from(mut self, from: Address) -> Self {
        self.default_from = Some(from);
        self
    }

    /// The configured default sender.
    pub fn default_from(&self) -> Option<&Address> {
        self.default_from.as_ref()
    }

    /// The active transport.
    pub fn transport(&self) -> &MailTransport {
        &self.transport
    }

    /// The renderer used for template bodies.
    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Render the body of `mailable` without sending it.
    pub async fn render<M: Mailable>(&self, mailable: &M) -> Result<String> {
        match mailable.view() {
            MailView::Html(html) => Ok(html.to_string()),
            MailView::Template { path, model } => {
                let model = serde_json::to_value(model).map_err(|e| {
                    MailError::TemplateRender(format!("cannot serialize model for {}: {}", path, e))
                })?;
                let renderer = Arc::clone(&self.renderer);
                let path = path.to_string();

                // Handlebars rendering is CPU-bound
                tokio::task::spawn_blocking(move || renderer.render_value(&path, &model))
                    .await
                    .map_err(|e| MailError::TemplateRender(format!("render task failed: {}", e)))?
            }
        }
    }

    /// Render, address and deliver `mailable`.
    pub async fn send<M: Mailable>(&self, mailable: &M) -> Result<()> {
        let html = self.render(mailable).await?;
        let email = mailable.build(Email::new().html(html))?;
        self.send_email(email).await
    }

    /// Deliver an already composed message.
    pub async fn send_email(&self, email: Email) -> Result<()> {
        let email = email.with_default_from(self.default_from.as_ref());
        email.validate()?;

        debug!(
            transport = self.transport.name(),
            to = email.to.len(),
            subject = %email.subject,
            "Sending email"
        );

        self.transport.send(&email).await
    }

    /// Check if the transport is healthy.
    pub async fn is_healthy(&self) -> bool {
        self.transport.is_healthy().await
    }
}
