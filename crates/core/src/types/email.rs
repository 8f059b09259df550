//! Email address type used for campus and club administrators.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`Email`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    /// The input string is empty (after trimming).
    #[error("email cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("email must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input does not contain an @ symbol.
    #[error("email must contain an @ symbol: {0}")]
    MissingAtSymbol(String),
    /// The local part (before @) is empty.
    #[error("email local part cannot be empty: {0}")]
    EmptyLocalPart(String),
    /// The domain part (after @) is empty.
    #[error("email domain cannot be empty: {0}")]
    EmptyDomain(String),
    /// The address contains whitespace.
    #[error("email cannot contain whitespace: {0}")]
    Whitespace(String),
}

/// An administrator email address.
///
/// Admin emails arrive from free-text form fields, so parsing trims
/// surrounding whitespace before validating. The stored value is otherwise
/// kept verbatim: account lookup is an exact match on the persisted string.
///
/// ## Constraints
///
/// - Length: 1-254 characters (RFC 5321 limit)
/// - Must contain an @ symbol with a non-empty local part and domain
/// - No interior whitespace
///
/// ## Examples
///
/// ```
/// use campus_hub_core::Email;
///
/// assert!(Email::parse("dean@college.edu").is_ok());
/// assert!(Email::parse("  dean@college.edu ").is_ok());
///
/// assert!(Email::parse("").is_err());
/// assert!(Email::parse("dean at college").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Maximum length of an email address (RFC 5321).
    pub const MAX_LENGTH: usize = 254;

    /// Parse an `Email` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input:
    /// - Is empty
    /// - Is longer than 254 characters
    /// - Contains whitespace
    /// - Does not contain an @ symbol
    /// - Has an empty local part or domain
    pub fn parse(s: &str) -> Result<Self, EmailError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(EmailError::Empty);
        }

        if s.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if s.chars().any(char::is_whitespace) {
            return Err(EmailError::Whitespace(s.to_owned()));
        }

        let (local, domain) = s
            .split_once('@')
            .ok_or_else(|| EmailError::MissingAtSymbol(s.to_owned()))?;

        if local.is_empty() {
            return Err(EmailError::EmptyLocalPart(s.to_owned()));
        }

        if domain.is_empty() {
            return Err(EmailError::EmptyDomain(s.to_owned()));
        }

        Ok(Self(s.to_owned()))
    }

    /// Parse a list of emails, skipping blank entries and duplicates.
    ///
    /// Order of first appearance is preserved.
    ///
    /// # Errors
    ///
    /// Returns the first parse error encountered.
    pub fn parse_list<I, S>(items: I) -> Result<Vec<Self>, EmailError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<Self> = Vec::new();
        for item in items {
            let raw = item.as_ref();
            if raw.trim().is_empty() {
                continue;
            }
            let email = Self::parse(raw)?;
            if !out.contains(&email) {
                out.push(email);
            }
        }
        Ok(out)
    }

    /// Returns the email address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Email` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Returns the domain part of the email (after the @).
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.split_once('@').map_or("", |(_, domain)| domain)
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_input() {
        let email = Email::parse("  ra@dorms.college.edu\n").unwrap();
        assert_eq!(email.as_str(), "ra@dorms.college.edu");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(Email::parse("   "), Err(EmailError::Empty));
        assert!(matches!(
            Email::parse("no-at-symbol"),
            Err(EmailError::MissingAtSymbol(_))
        ));
        assert!(matches!(
            Email::parse("@college.edu"),
            Err(EmailError::EmptyLocalPart(_))
        ));
        assert!(matches!(
            Email::parse("dean@"),
            Err(EmailError::EmptyDomain(_))
        ));
        assert!(matches!(
            Email::parse("dean smith@college.edu"),
            Err(EmailError::Whitespace(_))
        ));
    }

    #[test]
    fn test_parse_too_long() {
        let long = format!("{}@college.edu", "a".repeat(250));
        assert!(matches!(
            Email::parse(&long),
            Err(EmailError::TooLong { .. })
        ));
    }

    #[test]
    fn test_parse_list_skips_blanks_and_duplicates() {
        let list =
            Email::parse_list(["a@x.edu", "", "b@x.edu", " a@x.edu ", "  "]).unwrap();
        let raw: Vec<&str> = list.iter().map(Email::as_str).collect();
        assert_eq!(raw, vec!["a@x.edu", "b@x.edu"]);
    }

    #[test]
    fn test_parse_list_reports_first_error() {
        let err = Email::parse_list(["a@x.edu", "broken"]).unwrap_err();
        assert_eq!(err, EmailError::MissingAtSymbol("broken".to_owned()));
    }

    #[test]
    fn test_domain() {
        let email = Email::parse("dean@college.edu").unwrap();
        assert_eq!(email.domain(), "college.edu");
    }
}
