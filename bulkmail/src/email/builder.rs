//! Email builder

use super::EmailError;

/// A single outgoing message
///
/// Campaign mail goes to one recipient per message, so there is no CC/BCC.
///
/// # Examples
///
/// ```rust
/// use bulkmail::email::Email;
///
/// let email = Email::new()
///     .to("user@example.com")
///     .from("JobFinder Bot <jobs@example.org>")
///     .subject("You are shortlisted...")
///     .html("<h1>Hello</h1>");
///
/// assert!(email.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Email {
    /// Recipient address
    pub to: Option<String>,

    /// Sender mailbox, optionally with a display name
    pub from: Option<String>,

    /// Subject line
    pub subject: Option<String>,

    /// HTML body
    pub html: Option<String>,

    /// Plain text alternative
    pub text: Option<String>,
}

impl Email {
    /// Empty email
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the recipient
    #[must_use]
    pub fn to(mut self, address: impl Into<String>) -> Self {
        self.to = Some(address.into());
        self
    }

    /// Set the sender mailbox
    #[must_use]
    pub fn from(mut self, mailbox: impl Into<String>) -> Self {
        self.from = Some(mailbox.into());
        self
    }

    /// Set the subject
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set the HTML body
    #[must_use]
    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    /// Set the plain text body
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Recipient address, if set
    #[must_use]
    pub fn recipient(&self) -> Option<&str> {
        self.to.as_deref()
    }

    /// Check that every required part is present
    ///
    /// # Errors
    ///
    /// Returns the first missing part
    pub const fn validate(&self) -> Result<(), EmailError> {
        if self.to.is_none() {
            return Err(EmailError::NoRecipient);
        }
        if self.from.is_none() {
            return Err(EmailError::NoSender);
        }
        if self.subject.is_none() {
            return Err(EmailError::NoSubject);
        }
        if self.html.is_none() && self.text.is_none() {
            return Err(EmailError::NoContent);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> Email {
        Email::new()
            .to("user@example.com")
            .from("jobs@example.org")
            .subject("Hello")
            .text("Body")
    }

    #[test]
    fn test_complete_email_validates() {
        let email = complete();
        assert!(email.validate().is_ok());
        assert_eq!(email.recipient(), Some("user@example.com"));
    }

    #[test]
    fn test_missing_parts() {
        let no_to = Email { to: None, ..complete() };
        assert!(matches!(no_to.validate(), Err(EmailError::NoRecipient)));

        let no_from = Email { from: None, ..complete() };
        assert!(matches!(no_from.validate(), Err(EmailError::NoSender)));

        let no_subject = Email { subject: None, ..complete() };
        assert!(matches!(no_subject.validate(), Err(EmailError::NoSubject)));

        let no_body = Email { text: None, ..complete() };
        assert!(matches!(no_body.validate(), Err(EmailError::NoContent)));
    }

    #[test]
    fn test_html_only_is_enough() {
        let email = Email {
            text: None,
            ..complete()
        }
        .html("<p>Body</p>");
        assert!(email.validate().is_ok());
    }
}
