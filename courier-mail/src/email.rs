//! Email message types.

use lettre::message::{MultiPart, SinglePart};
use serde::{Deserialize, Serialize};

use crate::{Address, Attachment, MailError, Result};

/// Email message handed to a transport.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Email {
    /// Sender address.
    pub from: Option<Address>,
    /// Reply-to address.
    pub reply_to: Option<Address>,
    /// To recipients.
    pub to: Vec<Address>,
    /// CC recipients.
    pub cc: Vec<Address>,
    /// BCC recipients.
    pub bcc: Vec<Address>,
    /// Email subject.
    pub subject: String,
    /// HTML body.
    pub html: String,
    /// Optional plain text alternative.
    pub text: Option<String>,
    /// Attachments.
    pub attachments: Vec<Attachment>,
}

impl Email {
    /// Create a new empty email.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the from address.
    pub fn from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    /// Set the reply-to address.
    pub fn reply_to(mut self, reply_to: Address) -> Self {
        self.reply_to = Some(reply_to);
        self
    }

    /// Add a to recipient.
    pub fn to(mut self, to: Address) -> Self {
        self.to.push(to);
        self
    }

    /// Add a CC recipient.
    pub fn cc(mut self, cc: Address) -> Self {
        self.cc.push(cc);
        self
    }

    /// Add a BCC recipient.
    pub fn bcc(mut self, bcc: Address) -> Self {
        self.bcc.push(bcc);
        self
    }

    /// Set the subject.
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Set the HTML body.
    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.html = html.into();
        self
    }

    /// Set the plain text alternative.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Add an attachment.
    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Fill in the sender when none was set.
    pub(crate) fn with_default_from(mut self, default_from: Option<&Address>) -> Self {
        if self.from.is_none() {
            self.from = default_from.cloned();
        }
        self
    }

    /// Validate the email.
    pub fn validate(&self) -> Result<()> {
        if self.to.is_empty() {
            return Err(MailError::Validation(
                "at least one 'to' recipient is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Build a lettre message.
    pub(crate) fn to_lettre(&self) -> Result<lettre::Message> {
        self.validate()?;

        let from = self.from.as_ref().ok_or_else(|| {
            MailError::Validation("a 'from' address is required for SMTP delivery".to_string())
        })?;

        let mut builder = lettre::Message::builder()
            .from(from.to_mailbox()?)
            .subject(self.subject.as_str());

        for addr in &self.to {
            builder = builder.to(addr.to_mailbox()?);
        }
        for addr in &self.cc {
            builder = builder.cc(addr.to_mailbox()?);
        }
        for addr in &self.bcc {
            builder = builder.bcc(addr.to_mailbox()?);
        }

        if let Some(reply_to) = &self.reply_to {
            builder = builder.reply_to(reply_to.to_mailbox()?);
        }

        let body = match &self.text {
            Some(text) => MultiPart::alternative_plain_html(text.clone(), self.html.clone()),
            None => MultiPart::alternative().singlepart(SinglePart::html(self.html.clone())),
        };

        let body = if self.attachments.is_empty() {
            body
        } else {
            self.attachments
                .iter()
                .try_fold(MultiPart::mixed().multipart(body), |mixed, attachment| {
                    attachment.to_lettre().map(|part| mixed.singlepart(part))
                })?
        };

        builder
            .multipart(body)
            .map_err(|e| MailError::Validation(e.to_string()))
    }
}
