//! Structured logging
//!
//! Every component logs through `tracing` with structured fields
//! (`recipient`, `daily_count`, `batch`, ...). This module installs the
//! subscriber once at process start.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, LoggingSettings};

/// Initialize the global subscriber
///
/// Filter precedence: `logging.filter`, then `RUST_LOG`, then a build-dependent
/// default. [`LogFormat::Auto`] picks pretty output in debug builds and JSON in
/// release builds.
///
/// # Example
///
/// ```rust,no_run
/// use bulkmail::{config::LoggingSettings, observability};
///
/// # fn main() -> anyhow::Result<()> {
/// observability::init(&LoggingSettings::default())?;
/// tracing::info!("bulkmail started");
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns error if the filter directives are invalid or a global subscriber
/// is already installed
pub fn init(settings: &LoggingSettings) -> anyhow::Result<()> {
    let env_filter = build_filter(settings)?;
    let registry = tracing_subscriber::registry().with(env_filter);

    match resolve_format(settings.format) {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init()?,
        LogFormat::Compact => registry
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init()?,
        LogFormat::Pretty | LogFormat::Auto => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()?,
    }

    Ok(())
}

fn build_filter(settings: &LoggingSettings) -> anyhow::Result<EnvFilter> {
    if let Some(directives) = &settings.filter {
        return Ok(EnvFilter::try_new(directives)?);
    }

    Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            EnvFilter::new("info,bulkmail=debug")
        } else {
            EnvFilter::new("info")
        }
    }))
}

const fn resolve_format(format: LogFormat) -> LogFormat {
    match format {
        LogFormat::Auto if cfg!(debug_assertions) => LogFormat::Pretty,
        LogFormat::Auto => LogFormat::Json,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_resolves_per_build() {
        let resolved = resolve_format(LogFormat::Auto);
        if cfg!(debug_assertions) {
            assert_eq!(resolved, LogFormat::Pretty);
        } else {
            assert_eq!(resolved, LogFormat::Json);
        }
        assert_eq!(resolve_format(LogFormat::Compact), LogFormat::Compact);
    }

    #[test]
    fn test_invalid_filter_is_rejected() {
        let settings = LoggingSettings {
            format: LogFormat::Compact,
            filter: Some("bulkmail=notalevel".to_string()),
        };
        assert!(build_filter(&settings).is_err());
    }
}
