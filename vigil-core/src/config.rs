use crate::{
    Stage, Thresholds, DEFAULT_EXPORT_FILE, DEFAULT_PREPARED_USERS_FILE, DEFAULT_SUMMARY_FILE,
    OTP_MAX_ATTEMPTS, OTP_POLL_DELAY,
};
use std::fmt;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("`{0}` must be set to a non-empty value")]
    Missing(&'static str),

    #[error("the number of users to prepare must be at least 1")]
    ZeroCount,

    #[error("invalid base url `{0}`, expected an http:// or https:// address")]
    BaseUrl(String),

    #[error("invalid stage `{stage}`: {reason}")]
    Stage { stage: String, reason: String },

    #[error("at least one stage is required")]
    NoStages,

    #[error("failure rate threshold must be within 0..=1, got {0}")]
    FailedRate(f64),
}

/// Connection parameters of the application database.
#[derive(Clone, PartialEq)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub username: String,
    pub password: String,
}

impl DatabaseConfig {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        name: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            host: non_empty("DATABASE_HOST", host.into())?,
            port,
            name: non_empty("DATABASE_NAME", name.into())?,
            username: non_empty("DATABASE_USERNAME", username.into())?,
            password: non_empty("DATABASE_PASSWORD", password.into())?,
        })
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Everything the user preparation pipeline needs, resolved once at startup.
#[derive(Clone, Debug)]
pub struct ProvisionConfig {
    pub database: DatabaseConfig,
    pub base_url: String,
    pub user_password: String,
    pub count: NonZeroUsize,
    pub output: PathBuf,
    pub otp_attempts: u32,
    pub otp_delay: Duration,
}

impl ProvisionConfig {
    pub fn new(
        database: DatabaseConfig,
        base_url: &str,
        user_password: impl Into<String>,
        count: usize,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            database,
            base_url: normalize_base_url(base_url)?,
            user_password: non_empty("USER_PASSWORD", user_password.into())?,
            count: NonZeroUsize::new(count).ok_or(ConfigError::ZeroCount)?,
            output: PathBuf::from(DEFAULT_PREPARED_USERS_FILE),
            otp_attempts: OTP_MAX_ATTEMPTS,
            otp_delay: OTP_POLL_DELAY,
        })
    }

    pub fn output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    pub fn otp_polling(mut self, attempts: u32, delay: Duration) -> Self {
        self.otp_attempts = attempts;
        self.otp_delay = delay;
        self
    }
}

/// Configuration of one load-test run.
#[derive(Clone, Debug)]
pub struct JourneyConfig {
    pub base_url: String,
    pub users: PathBuf,
    pub stages: Vec<Stage>,
    pub thresholds: Thresholds,
    pub summary: PathBuf,
}

impl JourneyConfig {
    pub fn new(base_url: &str, stages: Vec<Stage>) -> Result<Self, ConfigError> {
        if stages.is_empty() {
            return Err(ConfigError::NoStages);
        }

        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            users: PathBuf::from(DEFAULT_PREPARED_USERS_FILE),
            stages,
            thresholds: Thresholds::default(),
            summary: PathBuf::from(DEFAULT_SUMMARY_FILE),
        })
    }

    pub fn users(mut self, users: impl Into<PathBuf>) -> Self {
        self.users = users.into();
        self
    }

    pub fn thresholds(mut self, thresholds: Thresholds) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&thresholds.max_failed_rate) {
            return Err(ConfigError::FailedRate(thresholds.max_failed_rate));
        }
        self.thresholds = thresholds;
        Ok(self)
    }

    pub fn summary(mut self, summary: impl Into<PathBuf>) -> Self {
        self.summary = summary.into();
        self
    }
}

#[derive(Clone, Debug)]
pub struct ExportConfig {
    pub database: DatabaseConfig,
    pub output: PathBuf,
}

impl ExportConfig {
    pub fn new(database: DatabaseConfig) -> Self {
        Self {
            database,
            output: PathBuf::from(DEFAULT_EXPORT_FILE),
        }
    }

    pub fn output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }
}

fn non_empty(name: &'static str, value: String) -> Result<String, ConfigError> {
    if value.trim().is_empty() {
        Err(ConfigError::Missing(name))
    } else {
        Ok(value)
    }
}

fn normalize_base_url(base_url: &str) -> Result<String, ConfigError> {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ConfigError::Missing("BASE_URL"));
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::BaseUrl(base_url.to_string()));
    }
    Ok(trimmed.to_string())
}
