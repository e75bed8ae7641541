//! SMTP backend for sending emails
//!
//! Uses the `lettre` crate to deliver through a STARTTLS relay. The transport
//! is built once and reused, so its connection pool is shared across sends.

use async_trait::async_trait;
use lettre::{
    message::{header, Mailbox, MultiPart},
    transport::smtp::{
        self,
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::fmt;

use crate::config::{SenderSettings, SmtpSettings};
use crate::email::{Email, EmailError, EmailSender};

/// Reply codes meaning the credentials were refused
const AUTH_REJECTED: &[&str] = &["530", "534", "535"];

/// SMTP email backend
///
/// # Examples
///
/// ```rust,no_run
/// use bulkmail::config::BulkmailConfig;
/// use bulkmail::email::{Email, EmailSender, SmtpBackend};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = BulkmailConfig::load()?;
/// let backend = SmtpBackend::new(&config.smtp, &config.sender)?;
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
pub struct SmtpBackend {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    host: String,
}

impl fmt::Debug for SmtpBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpBackend")
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

impl SmtpBackend {
    /// Create a backend authenticating as `sender` against the `smtp` relay
    ///
    /// # Errors
    ///
    /// Returns `EmailError::Config` if the relay cannot be configured
    pub fn new(smtp: &SmtpSettings, sender: &SenderSettings) -> Result<Self, EmailError> {
        let credentials = Credentials::new(sender.address.clone(), sender.password.clone());

        let builder = if smtp.use_tls {
            let tls_parameters = TlsParameters::new(smtp.host.clone())
                .map_err(|e| EmailError::config(format!("TLS parameters error: {e}")))?;

            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)
                .map_err(|e| EmailError::config(e.to_string()))?
                .tls(Tls::Required(tls_parameters))
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&smtp.host)
        };

        let transport = builder
            .credentials(credentials)
            .port(smtp.port)
            .timeout(Some(smtp.timeout()))
            .build();

        Ok(Self {
            transport,
            host: smtp.host.clone(),
        })
    }

    /// Build lettre Message from Email
    fn build_message(email: &Email) -> Result<Message, EmailError> {
        email.validate()?;

        let from_addr = email.from.as_ref().ok_or(EmailError::NoSender)?;
        let from: Mailbox = from_addr
            .parse()
            .map_err(|_| EmailError::InvalidAddress(from_addr.clone()))?;

        let to_addr = email.to.as_ref().ok_or(EmailError::NoRecipient)?;
        let to: Mailbox = to_addr
            .parse()
            .map_err(|_| EmailError::InvalidAddress(to_addr.clone()))?;

        let subject = email.subject.as_ref().ok_or(EmailError::NoSubject)?;
        let builder = Message::builder().from(from).to(to).subject(subject);

        let message = match (&email.html, &email.text) {
            (Some(html), Some(text)) => builder.multipart(MultiPart::alternative_plain_html(
                text.clone(),
                html.clone(),
            )),
            (Some(html), None) => builder
                .header(header::ContentType::TEXT_HTML)
                .body(html.clone()),
            (None, Some(text)) => builder
                .header(header::ContentType::TEXT_PLAIN)
                .body(text.clone()),
            (None, None) => return Err(EmailError::NoContent),
        };

        message.map_err(|e| EmailError::smtp(e.to_string()))
    }

    /// Relay host name
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }
}

/// Separate refused credentials from per-message failures
fn classify(err: &smtp::Error) -> EmailError {
    let rejected = err
        .status()
        .is_some_and(|code| AUTH_REJECTED.contains(&code.to_string().as_str()));

    if rejected {
        EmailError::Authentication(err.to_string())
    } else {
        EmailError::smtp(err.to_string())
    }
}

#[async_trait]
impl EmailSender for SmtpBackend {
    async fn send(&self, email: Email) -> Result<(), EmailError> {
        let message = Self::build_message(&email)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| classify(&e))?;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> Email {
        Email::new()
            .to("recipient@example.com")
            .from("JobFinder Bot <sender@example.com>")
            .subject("Test Email")
    }

    #[test]
    fn test_build_message_text_only() {
        let message = SmtpBackend::build_message(&email().text("plain"));
        assert!(message.is_ok());
    }

    #[test]
    fn test_build_message_with_html_and_text() {
        let message = SmtpBackend::build_message(&email().text("plain").html("<h1>HTML</h1>"))
            .unwrap();
        let formatted = String::from_utf8(message.formatted()).unwrap();
        assert!(formatted.contains("multipart/alternative"));
        assert!(formatted.contains("Subject: Test Email"));
    }

    #[test]
    fn test_build_message_rejects_bad_recipient() {
        let message = SmtpBackend::build_message(&email().to("not an address").text("plain"));
        assert!(matches!(message, Err(EmailError::InvalidAddress(_))));
    }

    #[test]
    fn test_build_message_requires_content() {
        let message = SmtpBackend::build_message(&email());
        assert!(matches!(message, Err(EmailError::NoContent)));
    }

    #[tokio::test]
    async fn test_backend_builds_without_connecting() {
        let smtp = SmtpSettings::default();
        let sender = SenderSettings {
            address: "jobs@example.org".to_string(),
            name: None,
            password: "secret".to_string(),
        };

        let backend = SmtpBackend::new(&smtp, &sender).unwrap();
        assert_eq!(backend.host(), "smtp.gmail.com");
        assert_eq!(backend.name(), "smtp");
    }
}
