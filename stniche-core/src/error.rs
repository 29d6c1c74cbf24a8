//! Structured error types for the stniche toolkit.

use thiserror::Error;

/// Unified error type for all stniche operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NicheError {
    /// Invalid input (malformed spot tables, out-of-range values)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Inconsistent analysis configuration, e.g. a focus group that is not
    /// one of the compared groups
    #[error("configuration error: {0}")]
    Config(String),

    /// A motif group, sample or motif id that no longer resolves
    #[error("missing reference: {0}")]
    MissingReference(String),

    /// Catch-all for other errors
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the stniche crates.
pub type Result<T> = std::result::Result<T, NicheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind() {
        let e = NicheError::Config("focus group 'X' not in (A, B)".into());
        assert_eq!(e.to_string(), "configuration error: focus group 'X' not in (A, B)");
        let e = NicheError::MissingReference("group 7".into());
        assert_eq!(e.to_string(), "missing reference: group 7");
    }

    #[test]
    fn question_mark_propagates() {
        fn inner() -> Result<()> {
            Err(NicheError::InvalidInput("empty".into()))
        }
        fn outer() -> Result<u32> {
            inner()?;
            Ok(1)
        }
        assert!(matches!(outer(), Err(NicheError::InvalidInput(_))));
    }
}
