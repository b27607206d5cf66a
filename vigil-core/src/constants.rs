use std::time::Duration;

/// Maximum number of verification-code lookups per identity.
pub const OTP_MAX_ATTEMPTS: u32 = 30;

/// Delay between two verification-code lookups.
pub const OTP_POLL_DELAY: Duration = Duration::from_millis(500);

/// Device-binding token sent by journey logins.
pub const JOURNEY_FBM_TOKEN: &str = "vigil_fbmtoken_placeholder";

pub const DEFAULT_PREPARED_USERS_FILE: &str = "prepared_users.json";
pub const DEFAULT_SUMMARY_FILE: &str = "journey_results.json";
pub const DEFAULT_EXPORT_FILE: &str = "usersListWithDetails.json";

/// Default ramp: one worker for a minute, hold five minutes, ramp down over a minute.
pub const DEFAULT_STAGES: &str = "1m:1,5m:1,1m:0";

pub const DEFAULT_MAX_REQ_P95: Duration = Duration::from_secs(2);
pub const DEFAULT_MAX_JOURNEY_P95: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_FAILED_RATE: f64 = 0.01;

/// How long stopped workers may keep running their current iteration.
pub const GRACEFUL_STOP: Duration = Duration::from_secs(30);

/// Exit status used when a run breaches a threshold.
pub const THRESHOLD_EXIT_CODE: u8 = 99;

pub const METRIC_JOURNEY_DURATION: &str = "full_user_journey_duration";
pub const METRIC_REQ_DURATION: &str = "http_req_duration";
pub const METRIC_REQS: &str = "http_reqs";
pub const METRIC_REQ_FAILED: &str = "http_req_failed";
pub const METRIC_ACTIVE_WORKERS: &str = "vus";
