//! Testing utilities
//!
//! [`MockEmailSender`] records every delivery and can be told to fail or
//! panic for specific recipients. A fixed latency applies to every send.
//! That is enough to drive the dispatch loop through all of its paths without
//! a mail server.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::email::{Email, EmailError, EmailSender};

/// Scripted behaviour for one recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// Per-message SMTP error
    Smtp(String),
    /// Credentials refused
    Authentication(String),
    /// The send task panics
    Panic,
}

/// Send lifecycle event, in the order observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendEvent {
    /// `send` was entered for the recipient
    Started(String),
    /// `send` returned for the recipient
    Finished(String),
}

#[derive(Debug, Default)]
struct Recorder {
    sent: Vec<Email>,
    events: Vec<SendEvent>,
    failures: HashMap<String, Failure>,
    in_flight: usize,
    max_in_flight: usize,
}

/// Mock email sender for testing
///
/// Captures delivered emails in memory for assertions.
///
/// # Examples
///
/// ```rust
/// use bulkmail::email::{Email, EmailSender};
/// use bulkmail::testing::{Failure, MockEmailSender};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mock = MockEmailSender::new();
/// mock.fail_for("down@example.com", Failure::Smtp("421 busy".into()));
///
/// let email = Email::new()
///     .to("user@example.com")
///     .from("jobs@example.org")
///     .subject("Test")
///     .text("Hello");
///
/// mock.send(email).await?;
///
/// assert_eq!(mock.sent_count(), 1);
/// assert!(mock.was_sent_to("user@example.com"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockEmailSender {
    recorder: Arc<Mutex<Recorder>>,
    latency: Duration,
}

impl MockEmailSender {
    /// Create a new mock email sender
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send take `latency` of (tokio) time
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Script a failure for sends to `address`
    pub fn fail_for(&self, address: impl Into<String>, failure: Failure) {
        self.recorder.lock().failures.insert(address.into(), failure);
    }

    /// Number of emails delivered
    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.recorder.lock().sent.len()
    }

    /// All delivered emails, in completion order
    #[must_use]
    pub fn sent_emails(&self) -> Vec<Email> {
        self.recorder.lock().sent.clone()
    }

    /// Recipients of delivered emails, in completion order
    #[must_use]
    pub fn sent_to(&self) -> Vec<String> {
        self.recorder
            .lock()
            .sent
            .iter()
            .filter_map(|email| email.to.clone())
            .collect()
    }

    /// Whether an email was delivered to `address`
    #[must_use]
    pub fn was_sent_to(&self, address: &str) -> bool {
        self.recorder
            .lock()
            .sent
            .iter()
            .any(|email| email.recipient() == Some(address))
    }

    /// Every start and finish, delivered or not
    #[must_use]
    pub fn events(&self) -> Vec<SendEvent> {
        self.recorder.lock().events.clone()
    }

    /// Highest number of sends running at the same time
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.recorder.lock().max_in_flight
    }

    /// Forget everything recorded, keeping scripted failures
    pub fn clear(&self) {
        let mut recorder = self.recorder.lock();
        recorder.sent.clear();
        recorder.events.clear();
        recorder.max_in_flight = 0;
    }
}

#[async_trait]
impl EmailSender for MockEmailSender {
    async fn send(&self, email: Email) -> Result<(), EmailError> {
        email.validate()?;
        let to = email.recipient().unwrap_or_default().to_string();

        let failure = {
            let mut recorder = self.recorder.lock();
            recorder.events.push(SendEvent::Started(to.clone()));
            recorder.in_flight += 1;
            recorder.max_in_flight = recorder.max_in_flight.max(recorder.in_flight);
            recorder.failures.get(&to).cloned()
        };

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let mut recorder = self.recorder.lock();
        recorder.in_flight -= 1;
        recorder.events.push(SendEvent::Finished(to.clone()));

        match failure {
            None => {
                recorder.sent.push(email);
                Ok(())
            }
            Some(Failure::Smtp(reason)) => Err(EmailError::smtp(reason)),
            Some(Failure::Authentication(reason)) => Err(EmailError::Authentication(reason)),
            Some(Failure::Panic) => {
                drop(recorder);
                panic!("scripted panic while sending to {to}");
            }
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
