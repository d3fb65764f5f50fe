//! Error Module - Runtime Error Type
//!
//! Every runtime error carries a single message string; that string is the
//! payload an error trap observes. Errors propagate as `Result` values up to
//! the nearest `trap-error` or, failing that, to the top-level handler.

use thiserror::Error;

/// Main error type for all interpreter operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShiError {
    /// General runtime error: type errors, arity errors, reader errors and
    /// user-raised `(error msg)` all land here.
    #[error("{0}")]
    Message(String),

    /// Symbol lookup failed during evaluation
    #[error("eval: undefined symbol: {0}")]
    UndefinedSymbol(String),

    /// Allocation request could not be satisfied even after a collection.
    /// Fatal: traps must not catch it.
    #[error("Memory exhausted")]
    MemoryExhausted,
}

impl ShiError {
    /// Build a general error from anything string-like
    pub fn msg(m: impl Into<String>) -> Self {
        ShiError::Message(m.into())
    }

    /// Fatal errors bypass `trap-error` and terminate the process
    pub fn is_fatal(&self) -> bool {
        matches!(self, ShiError::MemoryExhausted)
    }
}

/// Result type alias for interpreter operations
pub type Result<T> = std::result::Result<T, ShiError>;

/// Raise a general runtime error with a formatted message
#[macro_export]
macro_rules! raise {
    ($($arg:tt)*) => {
        return Err($crate::ShiError::Message(format!($($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_display_is_payload() {
        let e = ShiError::msg("str-len: 1st arg is not a string");
        assert_eq!(e.to_string(), "str-len: 1st arg is not a string");
    }

    #[test]
    fn test_undefined_symbol_message() {
        let e = ShiError::UndefinedSymbol("frobnicate".to_string());
        assert_eq!(e.to_string(), "eval: undefined symbol: frobnicate");
    }

    #[test]
    fn test_fatality() {
        assert!(ShiError::MemoryExhausted.is_fatal());
        assert!(!ShiError::msg("x").is_fatal());
    }
}
