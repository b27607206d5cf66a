use crate::api::ApiClient;
use crate::error::{ApiError, DecodeError};
use tracing::{error, info};
use vigil_core::JOURNEY_FBM_TOKEN;

/// Exchanges stored credentials for a fresh session token.
///
/// Failures are logged and reported as `None`; the caller skips the rest of
/// its iteration. There is a single attempt per call.
pub async fn login(api: &ApiClient, identity: &str, secret: &str) -> Option<String> {
    if identity.is_empty() || secret.is_empty() {
        error!("Login called with a missing email or password.");
        return None;
    }

    info!("Attempting user login...");
    match api.login(identity, secret, JOURNEY_FBM_TOKEN).await {
        Ok(token) => {
            info!(outcome = "success", "Login successful, token received.");
            Some(token)
        }
        Err(ApiError::Decode(DecodeError::Json(err))) => {
            error!("Failed to parse login response JSON: {err}");
            None
        }
        Err(ApiError::Decode(DecodeError::MissingField(field))) => {
            error!("Login succeeded but `{field}` is missing from the response.");
            None
        }
        Err(err) => {
            error!("Login failed: {err}");
            None
        }
    }
}
