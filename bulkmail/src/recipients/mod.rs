//! Recipients and the pending list
//!
//! A [`Recipient`] is a validated, normalized address. Identity is the
//! normalized form: the address is trimmed and its domain lowercased, the
//! local part keeps its case.

mod loader;
mod source;

use std::fmt;
use thiserror::Error;
use validator::ValidateEmail;

pub use loader::{LoadReport, RecipientLoader};
pub use source::read_candidates;

/// Top-level names that never route on the public internet
const RESERVED_TLDS: &[&str] = &["localhost", "invalid", "test", "example"];

/// Why a candidate address was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRecipient {
    /// Not an email address
    #[error("malformed address")]
    Syntax,

    /// Domain is an IP literal such as `[192.0.2.1]`
    #[error("address literal domains are not accepted")]
    AddressLiteral,

    /// Domain has a single label
    #[error("domain `{0}` has no top-level name")]
    SingleLabel(String),

    /// Domain contains `..` or starts or ends with a dot
    #[error("domain `{0}` has an empty label")]
    EmptyLabel(String),

    /// Domain ends in a reserved or numeric top-level name
    #[error("domain `{0}` is not deliverable")]
    Undeliverable(String),
}

/// A deliverable-looking email address in normalized form
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Recipient(String);

impl Recipient {
    /// Normalize and validate `raw`
    ///
    /// # Errors
    ///
    /// Returns the first rule the address breaks
    pub fn parse(raw: &str) -> Result<Self, InvalidRecipient> {
        let normalized = normalize(raw);

        if !normalized.validate_email() {
            return Err(InvalidRecipient::Syntax);
        }
        let Some((_, domain)) = normalized.rsplit_once('@') else {
            return Err(InvalidRecipient::Syntax);
        };
        check_domain(domain)?;
        if normalized.parse::<lettre::Address>().is_err() {
            return Err(InvalidRecipient::Syntax);
        }

        Ok(Self(normalized))
    }

    /// The normalized address
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the normalized address
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Recipient {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Trim `raw` and lowercase its domain part
#[must_use]
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_ascii_lowercase()),
        None => trimmed.to_string(),
    }
}

fn check_domain(domain: &str) -> Result<(), InvalidRecipient> {
    if domain.starts_with('[') {
        return Err(InvalidRecipient::AddressLiteral);
    }
    if !domain.contains('.') {
        return Err(InvalidRecipient::SingleLabel(domain.to_string()));
    }
    if domain.split('.').any(str::is_empty) {
        return Err(InvalidRecipient::EmptyLabel(domain.to_string()));
    }

    let tld = domain.rsplit('.').next().unwrap_or_default();
    if RESERVED_TLDS.contains(&tld) || tld.bytes().all(|b| b.is_ascii_digit()) {
        return Err(InvalidRecipient::Undeliverable(domain.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lowercases_domain_only() {
        assert_eq!(normalize("  Jane.Doe@Example.ORG \t"), "Jane.Doe@example.org");
        assert_eq!(normalize("no-at-sign"), "no-at-sign");
    }

    #[test]
    fn test_parse_accepts_common_addresses() {
        for raw in [
            "a@x.com",
            "first.last+tag@mail.example.co.uk",
            "USER@GMAIL.COM",
            "o'connor@domain.io",
        ] {
            assert!(Recipient::parse(raw).is_ok(), "{raw} should be valid");
        }
        assert_eq!(
            Recipient::parse(" USER@GMAIL.COM ").unwrap().as_str(),
            "USER@gmail.com"
        );
    }

    #[test]
    fn test_parse_rejects_syntax_errors() {
        for raw in ["plainaddress", "@x.com", "a@", "a b@x.com", "a@@x.com", "email"] {
            assert_eq!(
                Recipient::parse(raw),
                Err(InvalidRecipient::Syntax),
                "{raw} should be malformed"
            );
        }
    }

    #[test]
    fn test_parse_rejects_single_label_domain() {
        assert!(matches!(
            Recipient::parse("root@mailhost"),
            Err(InvalidRecipient::SingleLabel(_))
        ));
    }

    #[test]
    fn test_parse_rejects_reserved_names() {
        for raw in ["a@foo.test", "a@corp.localhost", "a@example.invalid", "a@mail.example"] {
            assert!(
                matches!(Recipient::parse(raw), Err(InvalidRecipient::Undeliverable(_))),
                "{raw} should be undeliverable"
            );
        }
    }

    #[test]
    fn test_only_listed_names_are_reserved() {
        for raw in ["a@host.local", "a@example.com", "a@testing.dev"] {
            assert!(Recipient::parse(raw).is_ok(), "{raw} should be deliverable");
        }
    }

    #[test]
    fn test_display_matches_normalized() {
        let recipient = Recipient::parse("b@X.com").unwrap();
        assert_eq!(recipient.to_string(), "b@x.com");
        assert_eq!(recipient.into_inner(), "b@x.com");
    }
}
