use crate::error::PoolError;
use std::path::Path;
use vigil_core::{read_batch, BatchError, Credential};

/// Prepared credentials shared read-only by every virtual worker of a run.
#[derive(Debug, Clone)]
pub struct CredentialPool {
    credentials: Vec<Credential>,
}

impl CredentialPool {
    pub fn new(credentials: Vec<Credential>) -> Self {
        Self { credentials }
    }

    pub fn load(path: &Path) -> Result<Self, BatchError> {
        read_batch(path).map(Self::new)
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// Round-robin pick: `(worker - 1 + iteration) mod len`. Distinct workers
    /// start on distinct credentials and then cycle through the pool.
    /// `worker` is 1-based.
    pub fn select(&self, worker: usize, iteration: u64) -> Result<&Credential, PoolError> {
        if self.credentials.is_empty() {
            return Err(PoolError::Empty);
        }
        if worker == 0 {
            return Err(PoolError::ZeroWorker);
        }

        let len = self.credentials.len() as u64;
        let index = ((worker as u64 - 1) % len + iteration % len) % len;
        Ok(&self.credentials[index as usize])
    }
}
