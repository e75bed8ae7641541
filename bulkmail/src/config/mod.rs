//! Configuration management for bulkmail
//!
//! Configuration is loaded once at startup from multiple sources and passed by
//! reference into every component. Sources are merged with clear precedence:
//!
//! 1. Legacy `EMAIL_ADDRESS` / `EMAIL_PASSWORD` variables (highest priority)
//! 2. Environment variables (`BULKMAIL_` prefix, `__` for nesting)
//! 3. `./bulkmail.toml` or the file passed with `--config`
//! 4. Hardcoded defaults (fallback)
//!
//! Environment variable format: `BULKMAIL_SECTION__FIELD_NAME`
//! - Use `__` (double underscore) to separate nested sections
//! - Use `_` (single underscore) within field names
//! - Example: `BULKMAIL_DISPATCH__DAILY_LIMIT=250`
//!
//! # Example Configuration
//!
//! ```toml
//! # bulkmail.toml
//! [sender]
//! address = "jobs@example.org"
//! name = "JobFinder Bot"
//!
//! [smtp]
//! host = "smtp.gmail.com"
//! port = 587
//!
//! [storage]
//! recipients = "jobseekers_email.csv"
//! ledger = "sent_emails.txt"
//! quota = "daily_count.txt"
//!
//! [dispatch]
//! batch_size = 1
//! batch_delay_s = 10
//! daily_limit = 400
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use validator::Validate;

/// Configuration file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "bulkmail.toml";

const ENV_PREFIX: &str = "BULKMAIL_";

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A provider failed or the merged result did not deserialize
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    /// Defaults could not be serialized into the base layer
    #[error("failed to serialize default configuration: {0}")]
    Defaults(#[from] toml::ser::Error),

    /// The merged configuration is not usable
    #[error("invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

/// Sender identity and SMTP credentials
#[derive(Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SenderSettings {
    /// Address messages are sent from, also the SMTP username
    #[validate(email)]
    pub address: String,

    /// Display name shown next to the address
    pub name: Option<String>,

    /// SMTP password or app password
    pub password: String,
}

impl Default for SenderSettings {
    fn default() -> Self {
        Self {
            address: String::new(),
            name: Some("JobFinder Bot".to_string()),
            password: String::new(),
        }
    }
}

impl fmt::Debug for SenderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SenderSettings")
            .field("address", &self.address)
            .field("name", &self.name)
            .field("password", &"[redacted]")
            .finish()
    }
}

/// SMTP relay configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SmtpSettings {
    /// Relay host name
    #[validate(length(min = 1))]
    pub host: String,

    /// Relay port (587 for STARTTLS)
    #[validate(range(min = 1))]
    pub port: u16,

    /// Require STARTTLS
    pub use_tls: bool,

    /// Per-command timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 587,
            use_tls: true,
            timeout_secs: 30,
        }
    }
}

impl SmtpSettings {
    /// Per-command timeout as a [`Duration`]
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Paths of the recipient source and the durable state files
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// CSV file with one address in the first column of each row
    pub recipients: PathBuf,

    /// Append-only record of delivered addresses
    pub ledger: PathBuf,

    /// Single-line `date,count` quota record
    pub quota: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            recipients: PathBuf::from("jobseekers_email.csv"),
            ledger: PathBuf::from("sent_emails.txt"),
            quota: PathBuf::from("daily_count.txt"),
        }
    }
}

/// Pacing and quota settings for the dispatch loop
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DispatchSettings {
    /// Recipients offered per batch, also the worker pool size
    #[validate(range(min = 1, max = 64))]
    pub batch_size: usize,

    /// Pause between batches in seconds
    pub batch_delay_s: u64,

    /// Maximum successful sends per calendar day
    #[validate(range(min = 1))]
    pub daily_limit: u32,

    /// Pause after a batch that had failures, in seconds
    pub retry_delay_s: u64,

    /// Upper bound on a single quota-exhausted wait, in seconds
    #[validate(range(min = 1))]
    pub quota_wait_s: u64,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            batch_size: 1,
            batch_delay_s: 10,
            daily_limit: 400,
            retry_delay_s: 60,
            quota_wait_s: 86400,
        }
    }
}

impl DispatchSettings {
    /// Pause between batches
    #[must_use]
    pub const fn batch_delay(&self) -> Duration {
        Duration::from_secs(self.batch_delay_s)
    }

    /// Pause after a batch with failures
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_s)
    }

    /// Upper bound on a quota-exhausted wait
    #[must_use]
    pub const fn quota_wait(&self) -> Duration {
        Duration::from_secs(self.quota_wait_s)
    }
}

/// Campaign message content
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct MessageSettings {
    /// Subject line
    #[validate(length(min = 1))]
    pub subject: String,

    /// Heading at the top of the card
    pub headline: String,

    /// Opening paragraph
    pub intro: String,

    /// Bullet points listed under the intro
    pub highlights: Vec<String>,

    /// Call-to-action button label
    pub cta_label: String,

    /// Call-to-action link
    pub cta_url: String,

    /// Footer line
    pub footer: String,

    /// Raw HTML body used verbatim instead of the built-in template
    pub html_path: Option<PathBuf>,
}

impl Default for MessageSettings {
    fn default() -> Self {
        Self {
            subject: "You are shortlisted...".to_string(),
            headline: "JobFinder Bot".to_string(),
            intro: "Get the latest job openings delivered straight to you, every day."
                .to_string(),
            highlights: vec![
                "Fresh openings from trusted companies".to_string(),
                "No ads and no spam".to_string(),
                "Completely free".to_string(),
            ],
            cta_label: "Join Now".to_string(),
            cta_url: "https://example.com/join".to_string(),
            footer: "You received this because you registered as a job seeker.".to_string(),
            html_path: None,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Pretty in debug builds, JSON in release builds
    #[default]
    Auto,
    /// Multi-line human readable output
    Pretty,
    /// Single-line human readable output
    Compact,
    /// Newline-delimited JSON
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Output format
    pub format: LogFormat,

    /// `EnvFilter` directives; `RUST_LOG` is used when unset
    pub filter: Option<String>,
}

/// Mail backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Deliver through the configured SMTP relay
    #[default]
    Smtp,
    /// Log messages instead of delivering them
    Console,
}

/// Complete bulkmail configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct BulkmailConfig {
    /// Mail backend
    pub backend: BackendKind,

    /// Sender identity and credentials
    #[validate(nested)]
    pub sender: SenderSettings,

    /// SMTP relay
    #[validate(nested)]
    pub smtp: SmtpSettings,

    /// File locations
    pub storage: StorageSettings,

    /// Pacing and quota
    #[validate(nested)]
    pub dispatch: DispatchSettings,

    /// Message content
    #[validate(nested)]
    pub message: MessageSettings,

    /// Logging
    pub logging: LoggingSettings,
}

impl BulkmailConfig {
    /// Load configuration from `./bulkmail.toml`, the environment and defaults
    ///
    /// # Errors
    ///
    /// Returns error if a provider fails or the merged values do not deserialize
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load configuration from a specific file, the environment and defaults
    ///
    /// A missing file is not an error; defaults and environment still apply.
    ///
    /// # Errors
    ///
    /// Returns error if the file is malformed or the merged values do not deserialize
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = Figment::new()
            .merge(Toml::string(&toml::to_string(&Self::default())?))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__").lowercase(true))
            .merge(legacy_credentials())
            .extract()
            .map_err(Box::new)?;

        Ok(config)
    }

    /// Check every constraint needed before mail can be sent
    ///
    /// # Errors
    ///
    /// Returns the collected validation failures
    pub fn validated(self) -> Result<Self, ConfigError> {
        self.validate()?;
        Ok(self)
    }
}

/// Maps the bare `EMAIL_ADDRESS` / `EMAIL_PASSWORD` variables onto `[sender]`
fn legacy_credentials() -> Env {
    Env::raw()
        .only(&["EMAIL_ADDRESS", "EMAIL_PASSWORD"])
        .map(|key| {
            if key.as_str().eq_ignore_ascii_case("EMAIL_ADDRESS") {
                "sender.address".into()
            } else {
                "sender.password".into()
            }
        })
}
