//! Phase A: provisioning authenticated users for the journey runs.
//!
//! Each identity goes through register → wait for the verification code →
//! verify → login. Identities failing any step are logged and dropped; the
//! survivors are written as one batch.
use crate::api::ApiClient;
use crate::error::{IdentityError, ProvisionError};
use crate::faker;
use crate::poll::poll_until;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
#[allow(unused)]
use tracing::{debug, error, info, instrument, trace, warn};
use vigil_core::{write_batch, Credential, DatabaseConfig, ProvisionConfig};

/// Source of the verification codes issued by the target system.
#[trait_variant::make(OtpStore: Send)]
pub trait LocalOtpStore {
    /// Latest code issued to `email`. `None` while no code is present yet.
    async fn latest_otp(&self, email: &str) -> Result<Option<String>, sqlx::Error>;

    /// Releases the underlying connection. Errors are logged, not returned.
    async fn close(&self);
}

/// Reads codes straight from the application's `user` table over a single
/// connection.
#[derive(Clone)]
pub struct MySqlOtpStore {
    pool: MySqlPool,
}

impl MySqlOtpStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .connect_with(connect_options(config))
            .await?;
        info!("Connected to database {} at {}", config.name, config.host);
        Ok(Self { pool })
    }
}

impl OtpStore for MySqlOtpStore {
    async fn latest_otp(&self, email: &str) -> Result<Option<String>, sqlx::Error> {
        let otp: Option<Option<String>> = sqlx::query_scalar(
            "SELECT CAST(otp AS CHAR) FROM `user` WHERE email = ? ORDER BY otp_date DESC LIMIT 1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(otp.flatten().filter(|otp| !otp.trim().is_empty()))
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("Database connection closed.");
    }
}

pub(crate) fn connect_options(config: &DatabaseConfig) -> MySqlConnectOptions {
    MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .database(&config.name)
        .username(&config.username)
        .password(&config.password)
}

pub struct UserProvisioner<S> {
    config: ProvisionConfig,
    api: ApiClient,
    store: S,
}

impl<S: OtpStore> UserProvisioner<S> {
    pub fn new(config: ProvisionConfig, api: ApiClient, store: S) -> Self {
        Self { config, api, store }
    }

    /// Prepares every requested identity, then persists the batch. The store
    /// is closed before this returns, whatever the outcome.
    #[instrument(name = "provision", skip_all, fields(count = self.config.count.get()))]
    pub async fn run(self) -> Result<Vec<Credential>, ProvisionError> {
        let attempted = self.config.count.get();
        let mut credentials = Vec::with_capacity(attempted);

        for index in 0..attempted {
            match self.prepare_identity(index).await {
                Ok(credential) => credentials.push(credential),
                Err(err) => warn!("User {index} skipped: {err}"),
            }
        }

        self.store.close().await;

        info!(
            "{} out of {attempted} users prepared successfully.",
            credentials.len()
        );
        if credentials.is_empty() {
            error!("No users were prepared successfully.");
            return Err(ProvisionError::NoUsers { attempted });
        }

        write_batch(&self.config.output, &credentials)?;
        info!(
            "Wrote {} users to {}",
            credentials.len(),
            self.config.output.display()
        );

        Ok(credentials)
    }

    #[instrument(skip(self))]
    pub async fn prepare_identity(&self, index: usize) -> Result<Credential, IdentityError> {
        let email = faker::identity(index);
        let password = self.config.user_password.as_str();

        info!("Registering user: {email}");
        self.api
            .register(&email, password)
            .await
            .map_err(IdentityError::Register)?;

        let otp = poll_until(
            self.config.otp_attempts,
            self.config.otp_delay,
            |attempt| {
                trace!("Looking up verification code for {email}, attempt {attempt}");
                self.store.latest_otp(&email)
            },
        )
        .await
        .map_err(IdentityError::Otp)?;
        debug!("Verification code found for {email}");

        self.api
            .verify_otp(&email, &otp)
            .await
            .map_err(IdentityError::Verify)?;
        info!("Verified user: {email}");

        let fbmtoken = faker::fbm_token(&mut rand::thread_rng());
        let token = self
            .api
            .login(&email, password, &fbmtoken)
            .await
            .map_err(IdentityError::Login)?;
        info!(outcome = "success", "User prepared: {email}");

        Ok(Credential {
            identity: email,
            secret: password.to_string(),
            session_token: token,
        })
    }
}

/// Connects to the database, prepares `config.count` users against
/// `config.base_url` and writes them to `config.output`.
pub async fn prepare_users(config: &ProvisionConfig) -> Result<Vec<Credential>, ProvisionError> {
    let api = ApiClient::new(&config.base_url)?;
    let store = MySqlOtpStore::connect(&config.database).await?;
    UserProvisioner::new(config.clone(), api, store).run().await
}
