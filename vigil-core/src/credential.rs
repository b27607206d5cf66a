use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// A prepared, verified test account. This is the handoff between the
/// preparation run and the load-test run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(rename = "email")]
    pub identity: String,
    #[serde(rename = "password")]
    pub secret: String,
    #[serde(rename = "token")]
    pub session_token: String,
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("failed to access credential batch `{path}`: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("credential batch `{path}` is not valid JSON: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },

    #[error("credential for `{0}` has an empty session token")]
    EmptyToken(String),
}

/// Writes the whole batch, replacing any previous file at `path`.
pub fn write_batch(path: &Path, batch: &[Credential]) -> Result<(), BatchError> {
    if let Some(credential) = batch.iter().find(|c| c.session_token.is_empty()) {
        return Err(BatchError::EmptyToken(credential.identity.clone()));
    }

    let json = serde_json::to_string_pretty(batch).map_err(|source| BatchError::Json {
        path: path.display().to_string(),
        source,
    })?;
    fs::write(path, json).map_err(|source| BatchError::Io {
        path: path.display().to_string(),
        source,
    })
}

pub fn read_batch(path: &Path) -> Result<Vec<Credential>, BatchError> {
    let raw = fs::read_to_string(path).map_err(|source| BatchError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| BatchError::Json {
        path: path.display().to_string(),
        source,
    })
}
