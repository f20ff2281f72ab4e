//! Errors raised while talking to the video API.
//!
//! `TransportError` describes why a single chunk transmission failed and is
//! wrapped by the upload client. `ApiError` covers the other endpoints.

use crate::models::metadata::InvalidField;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Failure of one chunk transmission.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request never produced a response (connect, DNS, reset, body I/O).
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("endpoint answered {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// No response within the per-chunk timeout.
    #[error("no response within {0:?}")]
    TimedOut(Duration),

    /// The request could not be built, e.g. a header value was rejected.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    /// Response status, when the endpoint got far enough to send one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Network(err) => err.status(),
            _ => None,
        }
    }
}

/// Failure of a call to one of the collaborator endpoints.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error(transparent)]
    InvalidInput(#[from] InvalidField),
}

impl ApiError {
    pub fn status(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// True for 401 responses, which the server uses for a missing or expired session.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status, .. } if *status == StatusCode::UNAUTHORIZED)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
