use thiserror::Error;

/// Error type covering every failure mode of the configuration client.
///
/// Variants fall into three groups that callers are expected to branch on:
/// transport failures (`Http`, `HttpStatus`), validation failures
/// (`Validation`, `SchemaCompile`) and usage errors (`SchemaNotLoaded`,
/// `Closed`). No error is retried automatically.
#[derive(Error, Debug)]
pub enum SdkError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status error: {status} for {url} - {message}")]
    HttpStatus {
        url: String,
        status: u16,
        message: String,
    },

    #[error("JSON decoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation failed for {name}: {}", violations.join(", "))]
    Validation {
        name: String,
        violations: Vec<String>,
    },

    #[error("Schema compilation failed for {name}: {details}")]
    SchemaCompile { name: String, details: String },

    #[error("Schema {name} not loaded")]
    SchemaNotLoaded { name: String },

    #[error("Client has been destroyed")]
    Closed,
}

impl SdkError {
    /// True for schema-mismatch failures, so callers can distinguish
    /// "invalid input" from "service unreachable".
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SdkError::Validation { .. } | SdkError::SchemaCompile { .. }
        )
    }

    /// True for transport-level failures (connection errors, non-success
    /// statuses, undecodable bodies).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            SdkError::Http(_) | SdkError::HttpStatus { .. } | SdkError::Json(_)
        )
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, SdkError>;
