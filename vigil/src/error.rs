use crate::poll::PollError;
use reqwest::StatusCode;
use thiserror::Error;
use vigil_core::BatchError;

/// Failure of a single call against the target API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request could not be completed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("malformed response: {0}")]
    Decode(#[from] DecodeError),
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Transport(err) => err.status(),
            Self::Status { status, .. } => Some(*status),
            Self::Decode(_) => None,
        }
    }
}

/// Why a successful response could not be turned into the expected value.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("`{0}` is missing or empty")]
    MissingField(&'static str),
}

/// Why one identity was dropped from the prepared batch.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("registration failed: {0}")]
    Register(#[source] ApiError),

    #[error("verification code lookup failed: {0}")]
    Otp(#[source] PollError<sqlx::Error>),

    #[error("verification failed: {0}")]
    Verify(#[source] ApiError),

    #[error("login failed: {0}")]
    Login(#[source] ApiError),
}

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("no users were prepared successfully ({attempted} attempted)")]
    NoUsers { attempted: usize },

    #[error(transparent)]
    Batch(#[from] BatchError),
}

#[derive(Debug, Error, PartialEq)]
pub enum PoolError {
    #[error("credential pool is empty, prepare users before running journeys")]
    Empty,

    #[error("virtual worker indices start at 1")]
    ZeroWorker,
}

#[derive(Debug, Error)]
pub enum LoadTestError {
    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("failed to write run summary `{path}`: {source}")]
    Summary {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to encode run summary: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("failed to encode export: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write export `{path}`: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}
