//! Error taxonomy shared by every OxBit crate.
//!
//! All errors are synchronous: they are returned by the call that triggered
//! them and are never deferred to a later call.

use thiserror::Error;

/// Errors raised by term construction, configuration and solver queries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OxbitError {
    /// Illegal option value, illegal option combination, or an option
    /// changed after it became frozen.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Arity or sort mismatch, or an out-of-range index of an indexed
    /// operator.
    #[error("type error: {0}")]
    Type(String),

    /// Malformed or out-of-range literal representation.
    #[error("value error: {0}")]
    Value(String),

    /// Query or mutation issued in the wrong solver state.
    #[error("state error: {0}")]
    State(String),

    /// Malformed input reported by a format parser.
    #[error("parse error: {0}")]
    Parse(String),

    /// A construct that the selected engine cannot handle.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl OxbitError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a type error.
    pub fn type_error(msg: impl Into<String>) -> Self {
        Self::Type(msg.into())
    }

    /// Create a value error.
    pub fn value(msg: impl Into<String>) -> Self {
        Self::Value(msg.into())
    }

    /// Create a state error.
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Create an unsupported-construct error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Returns true for [`OxbitError::Type`].
    #[must_use]
    pub fn is_type_error(&self) -> bool {
        matches!(self, Self::Type(_))
    }

    /// Returns true for [`OxbitError::State`].
    #[must_use]
    pub fn is_state_error(&self) -> bool {
        matches!(self, Self::State(_))
    }

    /// Returns true for [`OxbitError::Configuration`].
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Returns true for [`OxbitError::Value`].
    #[must_use]
    pub fn is_value_error(&self) -> bool {
        matches!(self, Self::Value(_))
    }
}

/// Result alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, OxbitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OxbitError::type_error("bvadd expects equal widths");
        assert_eq!(err.to_string(), "type error: bvadd expects equal widths");
        assert!(err.is_type_error());
        assert!(!err.is_state_error());
    }
}
