//! Transport backed by a caller-supplied async function.

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

use crate::{Email, Result, Transport};

/// Boxed send function stored by [`CustomTransport`].
pub type SendFn = Arc<dyn Fn(Email) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Hands every message to a user function.
///
/// The function is called exactly once per send. Whatever it returns is
/// passed back to the caller untouched.
#[derive(Clone)]
pub struct CustomTransport {
    send_fn: SendFn,
}

impl CustomTransport {
    /// Wrap an async send function.
    ///
    /// ```rust,ignore
    /// let transport = CustomTransport::new(|email: Email| async move {
    ///     my_api.post(&email).await.map_err(MailError::custom)
    /// });
    /// ```
    pub fn new<F, Fut>(send: F) -> Self
    where
        F: Fn(Email) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            send_fn: Arc::new(move |email| Box::pin(send(email))),
        }
    }
}

#[async_trait]
impl Transport for CustomTransport {
    async fn send(&self, email: &Email) -> Result<()> {
        debug!(subject = %email.subject, "Handing email to custom transport");
        (self.send_fn)(email.clone()).await
    }

    fn name(&self) -> &'static str {
        "custom"
    }
}
