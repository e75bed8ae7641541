//! Email construction, rendering and delivery
//!
//! This module provides:
//! - An [`Email`] builder for single-recipient messages
//! - The [`Campaign`], rendered once from the `[message]` settings
//! - The [`EmailSender`] trait with SMTP and console backends
//!
//! # Examples
//!
//! ```rust,no_run
//! use bulkmail::config::BulkmailConfig;
//! use bulkmail::email::{Campaign, EmailSender, SmtpBackend};
//! use bulkmail::recipients::Recipient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BulkmailConfig::load()?.validated()?;
//! let backend = SmtpBackend::new(&config.smtp, &config.sender)?;
//! let campaign = Campaign::from_settings(&config.sender, &config.message)?;
//!
//! let recipient = Recipient::parse("user@example.com")?;
//! backend.send(campaign.email_for(&recipient)).await?;
//! # Ok(())
//! # }
//! ```

mod backend;
mod builder;
mod error;
mod sender;
mod template;

pub use backend::{console::ConsoleBackend, smtp::SmtpBackend};
pub use builder::Email;
pub use error::EmailError;
pub use sender::EmailSender;
pub use template::{Campaign, CampaignHtml, EmailTemplate};

#[cfg(test)]
pub use sender::MockEmailSender;
