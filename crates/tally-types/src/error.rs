//! Error taxonomy shared by every tally crate.
//!
//! None of these errors are retryable: they describe malformed input, a
//! programmer error, or an opaque failure of the record store that the
//! caller decides how to handle.

use core::fmt;

use thiserror::Error;

use crate::types::GroupType;

/// Malformed textual input.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The text is not a valid ISO-8601 timestamp.
    #[error("Invalid timestamp '{input}': {reason}")]
    InvalidTimestamp { input: String, reason: String },

    /// The text is not a valid range step such as `+1 month`.
    #[error("Invalid step '{input}': {reason}")]
    InvalidStep { input: String, reason: String },

    /// The text is not a finite number.
    #[error("Invalid amount '{0}'")]
    InvalidAmount(String),
}

impl ParseError {
    /// Shorthand for [`ParseError::InvalidTimestamp`].
    pub fn timestamp(input: impl Into<String>, reason: impl Into<String>) -> Self {
        ParseError::InvalidTimestamp {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for [`ParseError::InvalidStep`].
    pub fn step(input: impl Into<String>, reason: impl Into<String>) -> Self {
        ParseError::InvalidStep {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

/// An unrecognized granularity value.
///
/// Carries the raw input (or `None` when the value was missing altogether)
/// and the complete set of accepted literals, so front-ends can tell the user
/// what they should have typed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct InvalidGroupTypeError {
    raw: Option<String>,
}

impl InvalidGroupTypeError {
    /// Create an error for the given raw value.
    pub fn new(raw: Option<&str>) -> Self {
        Self {
            raw: raw.map(str::to_string),
        }
    }

    /// The offending raw value, if one was supplied.
    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    /// Every accepted group type literal, coarsest first.
    pub fn allowed(&self) -> &'static [&'static str] {
        GroupType::VALUES
    }
}

impl fmt::Display for InvalidGroupTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid group type")?;
        if let Some(raw) = &self.raw {
            write!(f, ": '{}'", raw)?;
        }
        write!(f, ". Allowed values are: {}", self.allowed().join(", "))
    }
}

/// A value of the wrong shape was handed to an operation.
///
/// These are programmer errors (or a misbehaving store) rather than user
/// input problems.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ContractError {
    /// A timestamp was required but something else was supplied.
    #[error("Expected a timestamp, got {0}")]
    NotATimestamp(String),

    /// Bucket key components are out of range or have the wrong shape.
    #[error("Invalid bucket key: {0}")]
    InvalidBucketKey(String),

    /// The same bucket key was reported more than once.
    #[error("Duplicate bucket for key {0}")]
    DuplicateBucket(String),

    /// A bucket key does not have the cardinality of the requested group type.
    #[error("Bucket key {key} does not match group type '{expected}'")]
    GranularityMismatch { key: String, expected: GroupType },

    /// Dataset and labels would not line up.
    #[error("Dataset has {dataset} entries but labels has {labels}")]
    MisalignedResult { dataset: usize, labels: usize },

    /// Labels are not strictly ascending.
    #[error("Labels are not strictly ascending at index {0}")]
    UnorderedLabels(usize),

    /// A range step that would never reach the end bound.
    #[error("Step '{0}' does not advance time")]
    NonAdvancingStep(String),
}

/// Opaque failure reported by the record store capability.
///
/// The wrapped error is passed through untouched; its `Display` is the
/// store's own message.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct StoreError(Box<dyn std::error::Error + Send + Sync + 'static>);

impl StoreError {
    /// Wrap any store-side error.
    pub fn new(source: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>) -> Self {
        Self(source.into())
    }

    /// Borrow the wrapped error as a concrete type, if it is one.
    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref::<E>()
    }

    /// Unwrap into the boxed store error.
    pub fn into_inner(self) -> Box<dyn std::error::Error + Send + Sync + 'static> {
        self.0
    }
}

/// Result type alias for parsing operations.
pub type ParseResult<T> = std::result::Result<T, ParseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_group_type_message_lists_allowed_values() {
        let err = InvalidGroupTypeError::new(Some("week"));
        assert_eq!(
            err.to_string(),
            "Invalid group type: 'week'. Allowed values are: year, month, day, hour"
        );
        assert_eq!(err.raw(), Some("week"));
    }

    #[test]
    fn test_invalid_group_type_missing_value() {
        let err = InvalidGroupTypeError::new(None);
        assert_eq!(
            err.to_string(),
            "Invalid group type. Allowed values are: year, month, day, hour"
        );
        assert!(err.raw().is_none());
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::timestamp("yesterday", "unrecognized format");
        assert_eq!(
            err.to_string(),
            "Invalid timestamp 'yesterday': unrecognized format"
        );
    }

    #[test]
    fn test_store_error_is_transparent() {
        let io = std::io::Error::other("disk on fire");
        let err = StoreError::new(io);
        assert_eq!(err.to_string(), "disk on fire");
        assert!(err.downcast_ref::<std::io::Error>().is_some());
    }

    #[test]
    fn test_contract_error_display() {
        let err = ContractError::GranularityMismatch {
            key: "2022-09".to_string(),
            expected: GroupType::Day,
        };
        assert_eq!(
            err.to_string(),
            "Bucket key 2022-09 does not match group type 'day'"
        );
    }
}
