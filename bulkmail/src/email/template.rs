//! Campaign message rendering
//!
//! The body is the same for every recipient, so it is rendered once when the
//! [`Campaign`] is built and cloned into each outgoing [`Email`].

use askama::Template;
use lettre::message::Mailbox;
use lettre::Address;
use std::fs;

use super::{Email, EmailError};
use crate::config::{MessageSettings, SenderSettings};
use crate::recipients::Recipient;

/// Trait for templates that produce an HTML body and a plain text alternative
pub trait EmailTemplate {
    /// Render the template
    ///
    /// Returns `(html, text)`; either can be `None`.
    ///
    /// # Errors
    ///
    /// Returns `EmailError::Template` if the template fails to render
    fn render_email(&self) -> Result<(Option<String>, Option<String>), EmailError>;
}

/// HTML card with headline, bullet list and a call-to-action button
#[derive(Template)]
#[template(path = "campaign.html")]
pub struct CampaignHtml<'a> {
    /// Card heading
    pub headline: &'a str,
    /// Opening paragraph
    pub intro: &'a str,
    /// Bullet points
    pub highlights: &'a [String],
    /// Button label
    pub cta_label: &'a str,
    /// Button link
    pub cta_url: &'a str,
    /// Footer line
    pub footer: &'a str,
}

#[derive(Template)]
#[template(path = "campaign.txt")]
struct CampaignText<'a> {
    headline: &'a str,
    intro: &'a str,
    highlights: &'a [String],
    cta_label: &'a str,
    cta_url: &'a str,
    footer: &'a str,
}

impl<'a> CampaignHtml<'a> {
    /// Template populated from the `[message]` settings
    #[must_use]
    pub fn new(message: &'a MessageSettings) -> Self {
        Self {
            headline: &message.headline,
            intro: &message.intro,
            highlights: &message.highlights,
            cta_label: &message.cta_label,
            cta_url: &message.cta_url,
            footer: &message.footer,
        }
    }
}

impl EmailTemplate for CampaignHtml<'_> {
    fn render_email(&self) -> Result<(Option<String>, Option<String>), EmailError> {
        let html = self.render()?;
        let text = CampaignText {
            headline: self.headline,
            intro: self.intro,
            highlights: self.highlights,
            cta_label: self.cta_label,
            cta_url: self.cta_url,
            footer: self.footer,
        }
        .render()?;
        Ok((Some(html), Some(text)))
    }
}

/// Pre-rendered campaign message
#[derive(Debug, Clone)]
pub struct Campaign {
    from: Mailbox,
    subject: String,
    html: Option<String>,
    text: Option<String>,
}

impl Campaign {
    /// Render the campaign for `sender`
    ///
    /// When `message.html_path` is set the file is used verbatim as the HTML
    /// body and no plain text part is sent.
    ///
    /// # Errors
    ///
    /// Returns error if the sender address is invalid, the HTML file cannot be
    /// read, or the template fails to render
    pub fn from_settings(
        sender: &SenderSettings,
        message: &MessageSettings,
    ) -> Result<Self, EmailError> {
        let address: Address = sender
            .address
            .parse()
            .map_err(|_| EmailError::InvalidAddress(sender.address.clone()))?;
        let from = Mailbox::new(sender.name.clone(), address);

        let (html, text) = match &message.html_path {
            Some(path) => (Some(fs::read_to_string(path)?), None),
            None => CampaignHtml::new(message).render_email()?,
        };

        Ok(Self {
            from,
            subject: message.subject.clone(),
            html,
            text,
        })
    }

    /// Message addressed to `recipient`
    #[must_use]
    pub fn email_for(&self, recipient: &Recipient) -> Email {
        Email {
            to: Some(recipient.as_str().to_string()),
            from: Some(self.from.to_string()),
            subject: Some(self.subject.clone()),
            html: self.html.clone(),
            text: self.text.clone(),
        }
    }

    /// Sender mailbox
    #[must_use]
    pub const fn from_mailbox(&self) -> &Mailbox {
        &self.from
    }

    /// Subject line
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sender() -> SenderSettings {
        SenderSettings {
            address: "jobs@example.org".to_string(),
            name: Some("JobFinder Bot".to_string()),
            password: String::new(),
        }
    }

    #[test]
    fn test_template_renders_all_parts() {
        let message = MessageSettings {
            highlights: vec!["Remote roles".to_string(), "No fees".to_string()],
            cta_url: "https://example.com/join?ref=mail".to_string(),
            ..MessageSettings::default()
        };

        let (html, text) = CampaignHtml::new(&message).render_email().unwrap();
        let html = html.unwrap();
        let text = text.unwrap();

        assert!(html.contains("<li>Remote roles</li>"));
        assert!(html.contains("Join Now"));
        assert!(text.contains("- No fees"));
        assert!(text.contains("https://example.com/join?ref=mail"));
    }

    #[test]
    fn test_html_content_is_escaped() {
        let message = MessageSettings {
            headline: "<script>alert(1)</script>".to_string(),
            ..MessageSettings::default()
        };

        let (html, _) = CampaignHtml::new(&message).render_email().unwrap();
        assert!(!html.unwrap().contains("<script>"));
    }

    #[test]
    fn test_email_for_recipient() {
        let campaign = Campaign::from_settings(&sender(), &MessageSettings::default()).unwrap();
        let recipient = Recipient::parse("a@x.com").unwrap();

        let email = campaign.email_for(&recipient);
        assert_eq!(email.recipient(), Some("a@x.com"));
        assert_eq!(email.subject.as_deref(), Some("You are shortlisted..."));
        assert!(email.from.unwrap().contains("jobs@example.org"));
        assert!(email.html.is_some());
        assert!(email.text.is_some());
    }

    #[test]
    fn test_html_file_is_used_verbatim() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("body.html");
        fs::write(&path, "<p>custom</p>").unwrap();
        let message = MessageSettings {
            html_path: Some(path),
            ..MessageSettings::default()
        };

        let campaign = Campaign::from_settings(&sender(), &message).unwrap();
        let email = campaign.email_for(&Recipient::parse("a@x.com").unwrap());
        assert_eq!(email.html.as_deref(), Some("<p>custom</p>"));
        assert!(email.text.is_none());
    }

    #[test]
    fn test_invalid_sender_is_rejected() {
        let sender = SenderSettings {
            address: "not an address".to_string(),
            ..sender()
        };
        let result = Campaign::from_settings(&sender, &MessageSettings::default());
        assert!(matches!(result, Err(EmailError::InvalidAddress(_))));
    }
}
