//! Load-testing harness for the prayer/testimony/comment API.
//!
//! * [`provision`] registers, verifies and logs in synthetic users and
//!   persists them as a credential batch.
//! * [`load`] replays the create-prayer → create-testimony → add-comment
//!   journey for those users under a staged virtual-worker ramp
//!   ([`scenario`]), then evaluates latency and failure thresholds.
//! * [`export`] dumps what the runs left behind as one nested document.
pub mod api;
pub mod auth;
pub mod cli;
pub mod error;
pub mod export;
pub mod faker;
pub mod journey;
pub mod load;
pub mod poll;
pub mod pool;
pub mod provision;
pub mod recorder;
pub mod scenario;

pub use scenario::Scenario;

pub mod prelude {
    pub use crate::api::ApiClient;
    pub use crate::journey::{JourneyExecutor, JourneyOutcome, JourneyRunner};
    pub use crate::pool::CredentialPool;
    pub use crate::provision::{MySqlOtpStore, OtpStore, UserProvisioner};
    pub use crate::recorder::Recorder;
    pub use crate::scenario::{Scenario, ScenarioStats, VirtualUser};

    pub use vigil_core::{Credential, RunStatistics, Stage};
}
