//! HTTP client for the target API.
pub mod responses;

use crate::error::ApiError;
use crate::recorder::Recorder;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Instant;
#[allow(unused_imports)]
use tracing::{debug, error, info, warn};

const ERROR_BODY_LIMIT: usize = 512;

#[derive(Debug, Serialize)]
struct Registration<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct OtpVerification<'a> {
    email: &'a str,
    otp: &'a str,
}

#[derive(Debug, Serialize)]
struct Login<'a> {
    username: &'a str,
    password: &'a str,
    fbmtoken: &'a str,
}

#[derive(Debug, Serialize)]
pub struct NewPrayer {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct NewTestimony<'a> {
    pub prayer_uuid: &'a str,
    pub testimony: String,
}

#[derive(Debug, Serialize)]
pub struct NewComment<'a> {
    pub description: String,
    pub prayer_uuid: &'a str,
    pub testimony_uuid: &'a str,
}

/// Thin wrapper around a shared [`reqwest::Client`] that knows the API's
/// routes and response shapes. Cloning is cheap.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    recorder: Option<Recorder>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("vigil/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            recorder: None,
        }
    }

    /// Time every request into `recorder`.
    pub fn recorder(mut self, recorder: Recorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<(), ApiError> {
        self.post("/api/v1/user", None, &Registration { email, password })
            .await
            .map(drop)
    }

    pub async fn verify_otp(&self, email: &str, otp: &str) -> Result<(), ApiError> {
        self.post("/api/v1/user/verify-otp", None, &OtpVerification { email, otp })
            .await
            .map(drop)
    }

    /// Returns the session token found at `data.token`.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        fbmtoken: &str,
    ) -> Result<String, ApiError> {
        let body = self
            .post(
                "/api/v1/auth/login",
                None,
                &Login {
                    username,
                    password,
                    fbmtoken,
                },
            )
            .await?;
        Ok(responses::session_token(&body)?)
    }

    pub async fn create_prayer(&self, token: &str, prayer: &NewPrayer) -> Result<String, ApiError> {
        let body = self.post("/api/v1/prayer", Some(token), prayer).await?;
        Ok(responses::resource_id(&body)?)
    }

    pub async fn create_testimony(
        &self,
        token: &str,
        testimony: &NewTestimony<'_>,
    ) -> Result<String, ApiError> {
        let body = self.post("/api/v1/testimony", Some(token), testimony).await?;
        Ok(responses::resource_id(&body)?)
    }

    pub async fn add_comment(
        &self,
        token: &str,
        comment: &NewComment<'_>,
    ) -> Result<String, ApiError> {
        let body = self.post("/api/v1/comment", Some(token), comment).await?;
        Ok(responses::resource_id(&body)?)
    }

    /// Sends one JSON POST and returns the body of a 2xx response.
    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        bearer: Option<&str>,
        body: &B,
    ) -> Result<Vec<u8>, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.post(&url).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let start = Instant::now();
        let result = async {
            let response = request.send().await?;
            let status = response.status();
            let bytes = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, bytes))
        }
        .await;
        let elapsed = start.elapsed();

        let (status, bytes) = match result {
            Ok(res) => res,
            Err(err) => {
                self.record(elapsed, true);
                return Err(err.into());
            }
        };
        self.record(elapsed, !counts_as_ok(status));
        debug!("POST {path} -> {status} in {elapsed:?}");

        if status.is_success() {
            Ok(bytes.to_vec())
        } else {
            Err(ApiError::Status {
                status,
                body: truncate(&String::from_utf8_lossy(&bytes)),
            })
        }
    }

    fn record(&self, elapsed: std::time::Duration, failed: bool) {
        if let Some(recorder) = &self.recorder {
            recorder.record_request(elapsed, failed);
        }
    }
}

fn counts_as_ok(status: StatusCode) -> bool {
    status.is_success() || status.is_redirection()
}

fn truncate(body: &str) -> String {
    match body.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
