use thiserror::Error;

/// Failures of a single document-store call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("network error: {0}")]
    Network(String),
    #[error("credential missing, expired or lacking write access")]
    Unauthorized,
    #[error("version token does not match the stored document")]
    Conflict,
    #[error("server error {status}: {message}")]
    Remote { status: u16, message: String },
    #[error("cannot decode document: {0}")]
    Decode(String),
}
