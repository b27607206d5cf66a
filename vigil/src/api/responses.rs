//! Typed views of the API's `{ "data": { ... } }` response envelopes.
use crate::error::DecodeError;
use serde::de::DeserializeOwned;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct TokenData {
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResourceData {
    uuid: Option<String>,
}

fn envelope<T: DeserializeOwned>(body: &[u8]) -> Result<Option<T>, DecodeError> {
    let envelope: Envelope<T> = serde_json::from_slice(body)?;
    Ok(envelope.data)
}

fn present(value: Option<String>, field: &'static str) -> Result<String, DecodeError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(DecodeError::MissingField(field))
}

/// Extracts `data.token` from a login response.
pub fn session_token(body: &[u8]) -> Result<String, DecodeError> {
    let data = envelope::<TokenData>(body)?.ok_or(DecodeError::MissingField("data"))?;
    present(data.token, "data.token")
}

/// Extracts `data.uuid` from a create response.
pub fn resource_id(body: &[u8]) -> Result<String, DecodeError> {
    let data = envelope::<ResourceData>(body)?.ok_or(DecodeError::MissingField("data"))?;
    present(data.uuid, "data.uuid")
}
