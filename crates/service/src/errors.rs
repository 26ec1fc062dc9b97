use thiserror::Error;

use crate::remote::errors::StoreError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("local cache error: {0}")]
    Cache(String),
    #[error("authorization required to write the shared document")]
    AuthorizationRequired,
    #[error("remote document changed since last pull")]
    VersionConflict,
    #[error("network error: {0}")]
    Network(String),
    #[error("remote store error {status}: {message}")]
    Remote { status: u16, message: String },
    #[error("malformed data: {0}")]
    Malformed(String),
}

impl ServiceError {
    /// Short stable label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "validation",
            ServiceError::Cache(_) => "cache",
            ServiceError::AuthorizationRequired => "unauthorized",
            ServiceError::VersionConflict => "conflict",
            ServiceError::Network(_) => "network",
            ServiceError::Remote { .. } => "remote",
            ServiceError::Malformed(_) => "malformed",
        }
    }
}

impl From<models::ModelError> for ServiceError {
    fn from(e: models::ModelError) -> Self {
        match e {
            models::ModelError::Validation(msg) => ServiceError::Validation(msg),
            models::ModelError::Malformed(msg) => ServiceError::Malformed(msg),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Network(msg) => ServiceError::Network(msg),
            StoreError::Unauthorized => ServiceError::AuthorizationRequired,
            StoreError::Conflict => ServiceError::VersionConflict,
            StoreError::Remote { status, message } => ServiceError::Remote { status, message },
            StoreError::Decode(msg) => ServiceError::Malformed(msg),
        }
    }
}
