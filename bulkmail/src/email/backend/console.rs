//! Console backend for dry runs
//!
//! Logs each message instead of delivering it. The dispatch loop, ledger and
//! quota behave exactly as with SMTP, which makes this the backend behind
//! `bulkmail run --dry-run`.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::email::{Email, EmailError, EmailSender};

/// Console email backend
///
/// # Examples
///
/// ```rust
/// use bulkmail::email::{Email, EmailSender, ConsoleBackend};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = ConsoleBackend::new();
///
/// let email = Email::new()
///     .to("user@example.com")
///     .from("jobs@example.org")
///     .subject("Hello!")
///     .text("Hello, World!");
///
/// backend.send(email).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConsoleBackend {
    verbose: bool,
}

impl ConsoleBackend {
    /// Create a new console backend
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Console backend that also logs message bodies at debug level
    #[must_use]
    pub const fn verbose() -> Self {
        Self { verbose: true }
    }
}

#[async_trait]
impl EmailSender for ConsoleBackend {
    async fn send(&self, email: Email) -> Result<(), EmailError> {
        email.validate()?;

        let to = email.to.as_deref().ok_or(EmailError::NoRecipient)?;
        let from = email.from.as_deref().ok_or(EmailError::NoSender)?;
        let subject = email.subject.as_deref().ok_or(EmailError::NoSubject)?;

        info!(
            from = %from,
            to = %to,
            subject = %subject,
            has_html = email.html.is_some(),
            has_text = email.text.is_some(),
            "dry run: email not delivered"
        );

        if self.verbose {
            if let Some(text) = &email.text {
                debug!(text = %text, "email text content");
            }
            if let Some(html) = &email.html {
                debug!(html = %html, "email HTML content");
            }
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "console"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_console_backend_accepts_complete_email() {
        let backend = ConsoleBackend::verbose();
        let email = Email::new()
            .to("user@example.com")
            .from("jobs@example.org")
            .subject("Hello")
            .text("Body")
            .html("<p>Body</p>");

        assert!(backend.send(email).await.is_ok());
    }

    #[tokio::test]
    async fn test_console_backend_validates() {
        let backend = ConsoleBackend::new();
        let email = Email::new().from("jobs@example.org").subject("Hello");

        let result = backend.send(email).await;
        assert!(matches!(result, Err(EmailError::NoRecipient)));
    }
}
