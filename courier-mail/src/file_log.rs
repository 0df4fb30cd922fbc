//! Transport that appends messages to a local log file.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::address::join;
use crate::{Address, Email, MailError, Result, Transport};

/// Default log file, relative to the working directory.
pub const DEFAULT_LOG_PATH: &str = "mail.log";

const RULE: &str = "---------------------------------------------";
const NONE: &str = "N/A";

/// Writes every message to an append-only file instead of delivering it.
///
/// Meant for local development and tests. Sends are serialized so records
/// from concurrent sends never interleave.
pub struct FileLogTransport {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileLogTransport {
    /// Log to `path`, creating the file on first send.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Destination file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileLogTransport {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_PATH)
    }
}

#[async_trait]
impl Transport for FileLogTransport {
    async fn send(&self, email: &Email) -> Result<()> {
        email.validate()?;
        let record = format_record(email);

        let _guard = self.write_lock.lock().await;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| MailError::delivery("filelog", e))?;

        file.write_all(record.as_bytes())
            .await
            .map_err(|e| MailError::delivery("filelog", e))?;
        file.flush()
            .await
            .map_err(|e| MailError::delivery("filelog", e))?;

        debug!(path = %self.path.display(), subject = %email.subject, "Email written to log");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "filelog"
    }
}

/// Render one log record for `email`.
pub fn format_record(email: &Email) -> String {
    let attachments = if email.attachments.is_empty() {
        NONE.to_string()
    } else {
        email
            .attachments
            .iter()
            .map(|a| a.filename.as_str())
            .collect::<Vec<_>>()
            .join(";")
    };

    format!(
        "{rule}\nSubject: {subject}\nTo: {to}\nFrom: {from}\nReplyTo: {reply_to}\nCc: {cc}\nBcc: {bcc}\nAttachment: {attachments}\n{rule}\n\n{body}\n\n",
        rule = RULE,
        subject = email.subject,
        to = or_none(join(&email.to)),
        from = display(email.from.as_ref()),
        reply_to = display(email.reply_to.as_ref()),
        cc = or_none(join(&email.cc)),
        bcc = or_none(join(&email.bcc)),
        attachments = attachments,
        body = email.html,
    )
}

fn display(address: Option<&Address>) -> String {
    address.map_or_else(|| NONE.to_string(), ToString::to_string)
}

fn or_none(list: String) -> String {
    if list.is_empty() { NONE.to_string() } else { list }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Attachment;
    use tempfile::TempDir;

    fn sample() -> Email {
        Email::new()
            .from(Address::with_name("noreply@acme.test", "Acme").unwrap())
            .to(Address::new("ada@example.com").unwrap())
            .to(Address::new("grace@example.com").unwrap())
            .subject("Quarterly report")
            .html("<p>Numbers are up.</p>")
            .attach(Attachment::from_bytes("q3.pdf", b"%PDF".to_vec()))
    }

    #[test]
    fn test_format_record() {
        let record = format_record(&sample());

        assert!(record.starts_with(RULE));
        assert!(record.contains("Subject: Quarterly report\n"));
        assert!(record.contains("To: ada@example.com, grace@example.com\n"));
        assert!(record.contains("From: Acme <noreply@acme.test>\n"));
        assert!(record.contains("ReplyTo: N/A\n"));
        assert!(record.contains("Cc: N/A\n"));
        assert!(record.contains("Attachment: q3.pdf\n"));
        assert!(record.contains("<p>Numbers are up.</p>"));
    }

    #[tokio::test]
    async fn test_send_appends() {
        let dir = TempDir::new().unwrap();
        let transport = FileLogTransport::new(dir.path().join("mail.log"));

        transport.send(&sample()).await.unwrap();
        transport
            .send(&sample().subject("Second"))
            .await
            .unwrap();

        let log = std::fs::read_to_string(transport.path()).unwrap();
        assert_eq!(log.matches("Subject: ").count(), 2);
        assert!(log.find("Subject: Quarterly report").unwrap() < log.find("Subject: Second").unwrap());
    }

    #[tokio::test]
    async fn test_write_failure_is_delivery_error() {
        let dir = TempDir::new().unwrap();
        let transport = FileLogTransport::new(dir.path().join("missing-dir").join("mail.log"));

        let err = transport.send(&sample()).await.unwrap_err();
        assert!(err.is_delivery());
    }

    #[tokio::test]
    async fn test_rejects_message_without_recipients() {
        let dir = TempDir::new().unwrap();
        let transport = FileLogTransport::new(dir.path().join("mail.log"));

        let err = transport.send(&Email::new().subject("x")).await.unwrap_err();
        assert!(err.is_validation());
        assert!(!transport.path().exists());
    }
}
