//! Write-path validation shared by every entity.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static IDENTIFIER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._:\-]*$").expect("valid identifier regex")
});
static SEQUENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z*\-]*$").expect("valid sequence regex"));

/// Domain validation failure raised before SQL mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Identifier is blank or contains characters outside `[A-Za-z0-9._:-]`.
    InvalidIdentifier { field: &'static str, value: String },
    /// Allele sequence contains non-residue characters.
    InvalidSequence(String),
    /// Required display text is blank.
    BlankField(&'static str),
    /// Layout coordinate is non-finite or places a profile twice.
    InvalidCoordinate(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidIdentifier { field, value } => {
                write!(f, "invalid identifier `{value}` for {field}")
            }
            Self::InvalidSequence(value) => write!(f, "invalid allele sequence `{value}`"),
            Self::BlankField(field) => write!(f, "{field} must not be blank"),
            Self::InvalidCoordinate(message) => write!(f, "invalid coordinate: {message}"),
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn validate_identifier(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if IDENTIFIER_RE.is_match(value) {
        return Ok(());
    }
    Err(ValidationError::InvalidIdentifier {
        field,
        value: value.to_string(),
    })
}

pub(crate) fn validate_sequence(value: &str) -> Result<(), ValidationError> {
    if SEQUENCE_RE.is_match(value) {
        return Ok(());
    }
    Err(ValidationError::InvalidSequence(value.to_string()))
}

/// `None`, empty and whitespace-only text all count as "no payload".
pub(crate) fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |text| text.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::{is_blank, validate_identifier, validate_sequence, ValidationError};

    #[test]
    fn identifiers_allow_typing_ids_and_reject_blank_or_spaced() {
        assert!(validate_identifier("allele", "3test").is_ok());
        assert!(validate_identifier("locus", "adk").is_ok());
        assert!(validate_identifier("taxon", "s.aureus").is_ok());

        assert!(matches!(
            validate_identifier("allele", ""),
            Err(ValidationError::InvalidIdentifier { field: "allele", .. })
        ));
        assert!(validate_identifier("allele", "a b").is_err());
        assert!(validate_identifier("allele", "-lead").is_err());
    }

    #[test]
    fn sequences_accept_residues_and_gaps() {
        assert!(validate_sequence("ACGT-N").is_ok());
        assert!(validate_sequence("").is_ok());
        assert!(validate_sequence("ACG T").is_err());
        assert!(validate_sequence("ACGT1").is_err());
    }

    #[test]
    fn blank_covers_none_and_whitespace() {
        assert!(is_blank(None));
        assert!(is_blank(Some("  ")));
        assert!(!is_blank(Some("x")));
    }
}
