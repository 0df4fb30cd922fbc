//! Mailables: a view plus the logic that addresses the message.

use serde::Serialize;

use crate::{Address, Attachment, Email, IntoAddress, MailError, Result};

/// What a mailable renders into the HTML body.
#[derive(Debug)]
pub enum MailView<'a, M> {
    /// Render the template at `path` with `model`.
    Template { path: &'a str, model: &'a M },
    /// Use pre-rendered HTML as-is.
    Html(&'a str),
}

/// A message definition consumed by [`Mailer::send`](crate::Mailer::send).
///
/// ```rust,ignore
/// struct Welcome { user: User }
///
/// impl Mailable for Welcome {
///     type Model = User;
///
///     fn view(&self) -> MailView<'_, User> {
///         MailView::Template { path: "mail/welcome", model: &self.user }
///     }
///
///     fn build(&self, email: Email) -> Result<Email> {
///         Ok(email
///             .to(Address::with_name(&self.user.email, &self.user.name)?)
///             .subject("Welcome aboard"))
///     }
/// }
/// ```
pub trait Mailable: Send + Sync {
    /// Model the template binds against.
    type Model: Serialize + Send + Sync;

    /// Body source.
    fn view(&self) -> MailView<'_, Self::Model>;

    /// Populate subject, recipients and attachments. `email` arrives with the
    /// rendered HTML body already set.
    fn build(&self, email: Email) -> Result<Email>;
}

#[derive(Debug, Clone)]
enum Body<M> {
    Empty,
    Template { path: String, model: M },
    Html(String),
}

/// Fluent, ready-made [`Mailable`].
///
/// Address arguments are parsed eagerly but failures are reported by
/// [`Mailable::build`], so a chain never panics and never drops a recipient
/// silently.
#[derive(Debug, Clone)]
pub struct TemplateMail<M = ()> {
    body: Body<M>,
    subject: Option<String>,
    text: Option<String>,
    from: Option<Address>,
    reply_to: Option<Address>,
    to: Vec<Address>,
    cc: Vec<Address>,
    bcc: Vec<Address>,
    attachments: Vec<Attachment>,
    error: Option<String>,
}

impl<M> TemplateMail<M> {
    /// Start a mail rendered from `path` with `model`.
    pub fn template(path: impl Into<String>, model: M) -> Self {
        Self::with_body(Body::Template {
            path: path.into(),
            model,
        })
    }

    fn with_body(body: Body<M>) -> Self {
        Self {
            body,
            subject: None,
            text: None,
            from: None,
            reply_to: None,
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            attachments: Vec::new(),
            error: None,
        }
    }

    fn record(&mut self, address: impl IntoAddress) -> Option<Address> {
        match address.into_address() {
            Ok(address) => Some(address),
            Err(err) => {
                self.error.get_or_insert_with(|| err.to_string());
                None
            }
        }
    }

    /// Add a to recipient.
    pub fn to(mut self, to: impl IntoAddress) -> Self {
        if let Some(address) = self.record(to) {
            self.to.push(address);
        }
        self
    }

    /// Add multiple to recipients.
    pub fn to_many<I, A>(mut self, recipients: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: IntoAddress,
    {
        for recipient in recipients {
            self = self.to(recipient);
        }
        self
    }

    /// Add a CC recipient.
    pub fn cc(mut self, cc: impl IntoAddress) -> Self {
        if let Some(address) = self.record(cc) {
            self.cc.push(address);
        }
        self
    }

    /// Add a BCC recipient.
    pub fn bcc(mut self, bcc: impl IntoAddress) -> Self {
        if let Some(address) = self.record(bcc) {
            self.bcc.push(address);
        }
        self
    }

    /// Set an explicit sender, overriding the mailer's default.
    pub fn from(mut self, from: impl IntoAddress) -> Self {
        self.from = self.record(from);
        self
    }

    /// Set the reply-to address.
    pub fn reply_to(mut self, reply_to: impl IntoAddress) -> Self {
        self.reply_to = self.record(reply_to);
        self
    }

    /// Set the subject.
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Add a plain text alternative.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Add an attachment.
    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }
}

impl TemplateMail<()> {
    /// Start a mail with a pre-rendered HTML body.
    pub fn html(html: impl Into<String>) -> Self {
        Self::with_body(Body::Html(html.into()))
    }

    /// Start a mail with an empty body.
    pub fn new() -> Self {
        Self::with_body(Body::Empty)
    }
}

impl Default for TemplateMail<()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Serialize + Send + Sync> Mailable for TemplateMail<M> {
    type Model = M;

    fn view(&self) -> MailView<'_, M> {
        match &self.body {
            Body::Template { path, model } => MailView::Template {
                path: path.as_str(),
                model,
            },
            Body::Html(html) => MailView::Html(html.as_str()),
            Body::Empty => MailView::Html(""),
        }
    }

    fn build(&self, email: Email) -> Result<Email> {
        if let Some(error) = &self.error {
            return Err(MailError::InvalidAddress(error.clone()));
        }

        let mut email = email;
        email.subject = self.subject.clone().unwrap_or_default();
        email.text = self.text.clone();
        email.from = self.from.clone();
        email.reply_to = self.reply_to.clone();
        email.to.extend(self.to.iter().cloned());
        email.cc.extend(self.cc.iter().cloned());
        email.bcc.extend(self.bcc.iter().cloned());
        email.attachments.extend(self.attachments.iter().cloned());
        Ok(email)
    }
}
