//! Email sender trait abstraction
//!
//! The dispatch loop only sees this trait; SMTP delivery, dry-run logging
//! and test doubles all implement it.

use async_trait::async_trait;

use super::{Email, EmailError};

/// Trait for sending emails
///
/// # Examples
///
/// ```rust
/// use bulkmail::email::{ConsoleBackend, Email, EmailSender};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let sender = ConsoleBackend::new();
///
/// let email = Email::new()
///     .to("user@example.com")
///     .from("jobs@example.org")
///     .subject("Hello!")
///     .text("Hello, World!");
///
/// sender.send(email).await?;
/// # Ok(())
/// # }
/// ```
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Deliver one email
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::Authentication`] when the relay rejects the
    /// credentials, and another variant when only this message failed
    async fn send(&self, email: Email) -> Result<(), EmailError>;

    /// Short backend name for logs
    fn name(&self) -> &'static str {
        "custom"
    }
}
