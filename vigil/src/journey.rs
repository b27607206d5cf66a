//! The create-prayer → create-testimony → add-comment journey.
use crate::api::{ApiClient, NewComment, NewPrayer, NewTestimony};
use crate::auth;
use crate::faker;
use crate::pool::CredentialPool;
use crate::recorder::Recorder;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// How far one iteration got.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum JourneyOutcome {
    Completed,
    NoCredential,
    LoginFailed,
    PrayerFailed,
    TestimonyFailed,
    CommentFailed,
}

/// Runs the three dependent journey steps for an authenticated user. Each
/// step validates its own response and turns every failure into a logged
/// `None`/`false`.
#[derive(Clone)]
pub struct JourneyRunner {
    api: ApiClient,
}

impl JourneyRunner {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn create_prayer(&self, token: &str) -> Option<String> {
        let prayer = NewPrayer {
            title: faker::unique_prayer_title(),
            description: faker::prayer_description(&mut rand::thread_rng()),
        };

        match self.api.create_prayer(token, &prayer).await {
            Ok(uuid) => {
                info!(outcome = "success", "Prayer created successfully.");
                Some(uuid)
            }
            Err(err) => {
                error!("Prayer creation failed: {err}");
                None
            }
        }
    }

    pub async fn create_testimony(&self, token: &str, prayer: Option<&str>) -> Option<String> {
        let Some(prayer_uuid) = prayer else {
            error!("Testimony creation skipped: prayer uuid is missing.");
            return None;
        };

        let testimony = NewTestimony {
            prayer_uuid,
            testimony: faker::testimony(&mut rand::thread_rng()),
        };

        match self.api.create_testimony(token, &testimony).await {
            Ok(uuid) => {
                info!(outcome = "success", "Testimony submitted successfully.");
                Some(uuid)
            }
            Err(err) => {
                error!("Testimony submission failed: {err}");
                None
            }
        }
    }

    /// Terminal step, its result is only logged.
    pub async fn add_comment(
        &self,
        token: &str,
        prayer: Option<&str>,
        testimony: Option<&str>,
    ) -> bool {
        let Some(prayer_uuid) = prayer else {
            error!("Comment post skipped: prayer uuid is missing.");
            return false;
        };
        let Some(testimony_uuid) = testimony else {
            error!("Comment post skipped: testimony uuid is missing.");
            return false;
        };

        let comment = NewComment {
            description: faker::comment(&mut rand::thread_rng()),
            prayer_uuid,
            testimony_uuid,
        };

        match self.api.add_comment(token, &comment).await {
            Ok(_) => {
                info!(outcome = "success", "Comment posted successfully.");
                true
            }
            Err(err) => {
                error!("Comment post failed: {err}");
                false
            }
        }
    }

    pub async fn run(&self, token: &str) -> JourneyOutcome {
        let Some(prayer) = self.create_prayer(token).await else {
            error!("Skipping testimony and comment creation due to failed prayer creation.");
            return JourneyOutcome::PrayerFailed;
        };
        info!("Prayer created with uuid: {prayer}");

        let Some(testimony) = self.create_testimony(token, Some(&prayer)).await else {
            error!("Skipping comment creation due to failed testimony creation.");
            return JourneyOutcome::TestimonyFailed;
        };
        info!("Testimony created with uuid: {testimony}");

        if self
            .add_comment(token, Some(&prayer), Some(&testimony))
            .await
        {
            info!("Post-login actions completed.");
            JourneyOutcome::Completed
        } else {
            JourneyOutcome::CommentFailed
        }
    }
}

/// Entry point invoked once per virtual-worker iteration: pick a credential,
/// log in, run the journey. The whole iteration is timed.
#[derive(Clone)]
pub struct JourneyExecutor {
    pool: Arc<CredentialPool>,
    api: ApiClient,
    runner: JourneyRunner,
    recorder: Recorder,
}

impl JourneyExecutor {
    pub fn new(pool: Arc<CredentialPool>, api: ApiClient, recorder: Recorder) -> Self {
        let api = api.recorder(recorder.clone());
        Self {
            pool,
            runner: JourneyRunner::new(api.clone()),
            api,
            recorder,
        }
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    #[instrument(name = "iteration", skip(self))]
    pub async fn iteration(&self, worker: usize, iteration: u64) -> JourneyOutcome {
        let _timer = self.recorder.journey_timer();

        let user = match self.pool.select(worker, iteration) {
            Ok(user) => user,
            Err(err) => {
                error!("No user data for worker {worker}, iteration {iteration}: {err}");
                return JourneyOutcome::NoCredential;
            }
        };
        info!("Starting test iteration for email: {}", user.identity);

        let Some(token) = auth::login(&self.api, &user.identity, &user.secret).await else {
            error!("Login failed, skipping post-login actions.");
            return JourneyOutcome::LoginFailed;
        };
        info!("Login successful for: {}", user.identity);

        self.runner.run(&token).await
    }
}
