use mock_service::{MockService, MockState};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{
    atomic::{AtomicBool, AtomicU32, Ordering},
    Arc, Mutex,
};
use std::time::Duration;
use vigil::provision::OtpStore;
use vigil_core::{write_batch, Credential, DatabaseConfig, ProvisionConfig};

#[allow(unused)]
pub async fn mock() -> MockService {
    MockService::spawn().await.unwrap()
}

#[allow(unused)]
pub fn provision_config(base_url: &str, count: usize, output: &Path) -> ProvisionConfig {
    let database = DatabaseConfig::new("localhost", 3306, "prayers", "root", "secret").unwrap();
    ProvisionConfig::new(database, base_url, "Passw0rd!", count)
        .unwrap()
        .output(output)
        .otp_polling(30, Duration::from_millis(1))
}

#[allow(unused)]
pub fn write_users(path: &Path, count: usize) {
    let users: Vec<_> = (0..count)
        .map(|n| Credential {
            identity: format!("journey{n}@example.com"),
            secret: "Passw0rd!".to_string(),
            session_token: format!("stale-{n}"),
        })
        .collect();
    write_batch(path, &users).unwrap();
}

/// Verification codes served from the mock API's registrations.
#[allow(unused)]
pub struct MockOtpStore {
    state: Arc<MockState>,
    deliver_on: u32,
    withheld: Vec<String>,
    broken: Vec<String>,
    lookups: Mutex<HashMap<String, u32>>,
    total: Arc<AtomicU32>,
    closed: Arc<AtomicBool>,
}

#[allow(unused)]
impl MockOtpStore {
    pub fn new(state: Arc<MockState>) -> Self {
        Self {
            state,
            deliver_on: 1,
            withheld: vec![],
            broken: vec![],
            lookups: Mutex::new(HashMap::new()),
            total: Arc::new(AtomicU32::new(0)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The code only becomes visible on the `attempt`-th lookup of an email.
    pub fn deliver_on(mut self, attempt: u32) -> Self {
        self.deliver_on = attempt;
        self
    }

    /// Emails containing `pattern` never get a code.
    pub fn withhold(mut self, pattern: &str) -> Self {
        self.withheld.push(pattern.to_string());
        self
    }

    /// Lookups for emails containing `pattern` fail with a database error.
    pub fn break_for(mut self, pattern: &str) -> Self {
        self.broken.push(pattern.to_string());
        self
    }

    pub fn closed(&self) -> Arc<AtomicBool> {
        self.closed.clone()
    }

    /// Shared count of every lookup, across all emails.
    pub fn lookups(&self) -> Arc<AtomicU32> {
        self.total.clone()
    }
}

impl OtpStore for MockOtpStore {
    async fn latest_otp(&self, email: &str) -> Result<Option<String>, sqlx::Error> {
        self.total.fetch_add(1, Ordering::Relaxed);
        let attempt = {
            let mut lookups = self.lookups.lock().unwrap();
            let count = lookups.entry(email.to_string()).or_default();
            *count += 1;
            *count
        };

        if self.broken.iter().any(|p| email.contains(p.as_str())) {
            return Err(sqlx::Error::PoolTimedOut);
        }
        if self.withheld.iter().any(|p| email.contains(p.as_str())) || attempt < self.deliver_on {
            return Ok(None);
        }
        Ok(self.state.otp_for(email))
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
    }
}
