//! Error types and exit codes for kinship
//!
//! Exit codes:
//! - 0: Success
//! - 1: Generic failure
//! - 2: Usage error (bad flags/args, invalid thresholds or weights)
//! - 3: Data error (unknown note id, malformed snapshot)
//! - 130: Cancelled (interrupt or deadline)

mod macros;

use thiserror::Error;

/// Exit codes for the kinship CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Success (0)
    Success = 0,
    /// Generic failure (1)
    Failure = 1,
    /// Usage error - bad flags/args/configuration (2)
    Usage = 2,
    /// Data error - unknown note, malformed snapshot (3)
    Data = 3,
    /// Operation cancelled by signal or deadline (130)
    Cancelled = 130,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

/// Errors that can occur during kinship operations
#[derive(Error, Debug)]
pub enum KinshipError {
    // Usage errors (exit code 2)
    #[error("unknown format: {0} (expected: human or json)")]
    UnknownFormat(String),

    #[error("{0}")]
    UsageError(String),

    #[error("invalid {context}: {value}")]
    InvalidArgument { context: String, value: String },

    // Data errors (exit code 3)
    #[error("note not found: {id}")]
    NotFound { id: String },

    #[error("invalid snapshot: {reason}")]
    InvalidSnapshot { reason: String },

    /// Unusable image input. Recovered locally by the evaluator; only
    /// surfaced directly by [`crate::similarity::ImageHasher`].
    #[error("cannot decode image {reference}: {reason}")]
    ImageDecode { reference: String, reason: String },

    #[error("{operation} cancelled")]
    Cancelled { operation: String },

    // Generic failures (exit code 1)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{0}")]
    Other(String),
}

impl KinshipError {
    /// Create an error for an invalid threshold, weight or option value
    pub fn invalid_argument(context: &str, value: impl std::fmt::Display) -> Self {
        KinshipError::InvalidArgument {
            context: context.to_string(),
            value: value.to_string(),
        }
    }

    /// Create an error for a note id missing from the current snapshot
    pub fn not_found(id: impl Into<String>) -> Self {
        KinshipError::NotFound { id: id.into() }
    }

    /// Create an error for an image that could not be turned into a fingerprint
    pub fn image_decode(reference: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        KinshipError::ImageDecode {
            reference: reference.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an error for an aborted batch operation
    pub fn cancelled(operation: &str) -> Self {
        KinshipError::Cancelled {
            operation: operation.to_string(),
        }
    }

    /// Whether this error reports a cancelled batch rather than a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, KinshipError::Cancelled { .. })
    }

    /// Get the appropriate exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        match self {
            KinshipError::UnknownFormat(_)
            | KinshipError::UsageError(_)
            | KinshipError::InvalidArgument { .. } => ExitCode::Usage,

            KinshipError::NotFound { .. } | KinshipError::InvalidSnapshot { .. } => ExitCode::Data,

            KinshipError::Cancelled { .. } => ExitCode::Cancelled,

            KinshipError::ImageDecode { .. }
            | KinshipError::Io(_)
            | KinshipError::Json(_)
            | KinshipError::Toml(_)
            | KinshipError::Other(_) => ExitCode::Failure,
        }
    }

    /// Get the error type identifier
    fn error_type(&self) -> &'static str {
        match self {
            KinshipError::UnknownFormat(_) => "unknown_format",
            KinshipError::UsageError(_) => "usage_error",
            KinshipError::InvalidArgument { .. } => "invalid_argument",
            KinshipError::NotFound { .. } => "not_found",
            KinshipError::InvalidSnapshot { .. } => "invalid_snapshot",
            KinshipError::ImageDecode { .. } => "image_decode",
            KinshipError::Cancelled { .. } => "cancelled",
            KinshipError::Io(_) => "io_error",
            KinshipError::Json(_) => "json_error",
            KinshipError::Toml(_) => "toml_error",
            KinshipError::Other(_) => "other",
        }
    }

    /// The note id or image reference this error is about, if any
    pub fn subject(&self) -> Option<&str> {
        match self {
            KinshipError::NotFound { id } => Some(id),
            KinshipError::ImageDecode { reference, .. } => Some(reference),
            _ => None,
        }
    }

    /// Convert error to JSON representation for structured error output.
    pub fn to_json(&self) -> serde_json::Value {
        let mut error_obj = serde_json::json!({
            "code": self.exit_code() as i32,
            "type": self.error_type(),
            "message": self.to_string(),
        });

        if let Some(subject) = self.subject() {
            error_obj["id"] = serde_json::json!(subject);
        }

        serde_json::json!({ "error": error_obj })
    }
}

/// Result type alias for kinship operations
pub type Result<T> = std::result::Result<T, KinshipError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            KinshipError::invalid_argument("edge_threshold", 1.5).exit_code(),
            ExitCode::Usage
        );
        assert_eq!(KinshipError::not_found("a").exit_code(), ExitCode::Data);
        assert_eq!(
            KinshipError::cancelled("graph build").exit_code(),
            ExitCode::Cancelled
        );
        assert_eq!(
            KinshipError::Other("boom".to_string()).exit_code(),
            ExitCode::Failure
        );
        assert_eq!(i32::from(ExitCode::Cancelled), 130);
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            KinshipError::not_found("note-7").to_string(),
            "note not found: note-7"
        );
        assert_eq!(
            KinshipError::invalid_argument("dup_threshold", -0.1).to_string(),
            "invalid dup_threshold: -0.1"
        );
        assert_eq!(
            KinshipError::cancelled("duplicate scan").to_string(),
            "duplicate scan cancelled"
        );
    }

    #[test]
    fn test_json_envelope_carries_offending_id() {
        let json = KinshipError::not_found("missing-id").to_json();
        assert_eq!(json["error"]["code"], 3);
        assert_eq!(json["error"]["type"], "not_found");
        assert_eq!(json["error"]["id"], "missing-id");

        let json = KinshipError::cancelled("graph build").to_json();
        assert_eq!(json["error"]["type"], "cancelled");
        assert!(json["error"].get("id").is_none());
    }

    #[test]
    fn test_is_cancelled() {
        assert!(KinshipError::cancelled("x").is_cancelled());
        assert!(!KinshipError::not_found("x").is_cancelled());
    }
}
