//! Domain error types
//!
//! `ClientError` is what the REST layer reports, `StoreError` is what the
//! stores hand back to callers (remote failures plus local checks).

use std::collections::BTreeMap;

use thiserror::Error;

use crate::utils::validation::ValidationErrors;

/// Normalized failure of a REST call
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClientError {
    /// Connection, timeout or transport failure
    #[error("Network error: {0}")]
    Network(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    /// 400 with a field map or message from the server
    #[error("{message}")]
    Validation {
        message: String,
        fields: BTreeMap<String, Vec<String>>,
    },
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },
    /// Body did not match the expected shape
    #[error("Invalid response: {0}")]
    Decode(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClientError::Decode(e.to_string())
        } else {
            ClientError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Decode(e.to_string())
    }
}

impl From<url::ParseError> for ClientError {
    fn from(e: url::ParseError) -> Self {
        ClientError::Config(e.to_string())
    }
}

/// Error type for store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Client(#[from] ClientError),
    /// Local form validation failed; nothing was sent
    #[error("Validation failed: {0}")]
    Invalid(ValidationErrors),
    #[error("{0} not found")]
    NotFound(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    /// Token persistence failed
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<ValidationErrors> for StoreError {
    fn from(errors: ValidationErrors) -> Self {
        StoreError::Invalid(errors)
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
pub type StoreResult<T> = Result<T, StoreError>;
