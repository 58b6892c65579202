//! Error type for tally-core.
//!
//! # Error Handling
//!
//! Every aggregation either produces a complete
//! [`AggregationResult`](tally_types::AggregationResult) or fails on the first
//! violated precondition. The core never retries.
//!
//! | Error Type | Cause | Retry? |
//! |------------|-------|--------|
//! | [`Error::Parse`] | Malformed timestamp or step text | No, fix the input |
//! | [`Error::InvalidGroupType`] | Unknown granularity literal | No, fix the input |
//! | [`Error::Contract`] | Wrong-shaped value, invalid bucket from the store | No, programmer error |
//! | [`Error::Store`] | Record store failure | Caller's decision |

use thiserror::Error;

use tally_types::{ContractError, InvalidGroupTypeError, ParseError, StoreError};

/// Errors returned by the aggregation core.
///
/// Every variant is transparent: the wrapped error's message is shown
/// unchanged, and store failures in particular are passed through as-is.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed timestamp or step text.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Unknown granularity value.
    #[error(transparent)]
    InvalidGroupType(#[from] InvalidGroupTypeError),

    /// A value of the wrong shape was supplied.
    #[error(transparent)]
    Contract(#[from] ContractError),

    /// The record store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Error {
    /// Returns true if the error was caused by the request rather than by
    /// the store.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Error::Store(_))
    }
}

/// Result type alias using tally-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_are_transparent() {
        let err: Error = InvalidGroupTypeError::new(Some("week")).into();
        assert!(err.to_string().starts_with("Invalid group type: 'week'"));

        let err: Error = StoreError::new(std::io::Error::other("connection reset")).into();
        assert_eq!(err.to_string(), "connection reset");
    }

    #[test]
    fn test_client_error_classification() {
        let parse: Error = ParseError::timestamp("x", "bad").into();
        assert!(parse.is_client_error());

        let store: Error = StoreError::new("offline").into();
        assert!(!store.is_client_error());
    }
}
