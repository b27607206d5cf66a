use crate::scenario::VirtualUser;
use futures_util::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{
    atomic::{AtomicU64, AtomicU8, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// One virtual-worker index. The iteration counter outlives the task so a
/// re-activated worker continues where it left off.
struct Slot {
    index: usize,
    iterations: Arc<AtomicU64>,
    running: Option<Running>,
}

const RUNNING: u8 = 0;
const STOPPING: u8 = 1;
const STOPPED: u8 = 2;

/// The task behind a slot. It stays on the slot while retiring, so at most
/// one task ever iterates for a given worker index.
struct Running {
    state: Arc<AtomicU8>,
    handle: JoinHandle<()>,
}

impl Running {
    /// Stop after the current iteration.
    fn retire(&self) {
        let _ = self
            .state
            .compare_exchange(RUNNING, STOPPING, Ordering::AcqRel, Ordering::Acquire);
    }

    /// Cancels a pending retire. Fails once the task has left its loop.
    fn reinstate(&self) -> bool {
        self.state
            .compare_exchange(STOPPING, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// The live set of virtual workers. Workers `1..=active` are running;
/// scaling down stops the highest indices first and lets them finish their
/// current iteration.
pub(crate) struct WorkerSet<T> {
    scenario: T,
    slots: Vec<Slot>,
    active: usize,
    completed: Arc<AtomicU64>,
}

impl<T, F> WorkerSet<T>
where
    T: Fn(VirtualUser) -> F + Send + Sync + 'static + Clone,
    F: Future<Output = ()> + Send + 'static,
{
    pub fn new(scenario: T) -> Self {
        Self {
            scenario,
            slots: vec![],
            active: 0,
            completed: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn set_concurrency(&mut self, concurrency: usize) {
        while self.active < concurrency {
            if self.slots.len() == self.active {
                self.slots.push(Slot {
                    index: self.active + 1,
                    iterations: Arc::new(AtomicU64::new(0)),
                    running: None,
                });
            }
            let slot = &self.slots[self.active];
            if !slot.running.as_ref().is_some_and(Running::reinstate) {
                let running = self.spawn(slot);
                self.slots[self.active].running = Some(running);
            }
            self.active += 1;
        }

        while self.active > concurrency {
            self.active -= 1;
            if let Some(running) = &self.slots[self.active].running {
                running.retire();
            }
        }
    }

    fn spawn(&self, slot: &Slot) -> Running {
        let scenario = self.scenario.clone();
        let state = Arc::new(AtomicU8::new(RUNNING));
        let worker = slot.index;
        let iterations = slot.iterations.clone();
        let completed = self.completed.clone();
        let task_state = state.clone();

        let handle = tokio::spawn(async move {
            loop {
                if task_state
                    .compare_exchange(STOPPING, STOPPED, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    break;
                }

                let iteration = iterations.fetch_add(1, Ordering::Relaxed);
                let vu = VirtualUser { worker, iteration };

                if AssertUnwindSafe(scenario(vu)).catch_unwind().await.is_err() {
                    error!("Iteration {iteration} of worker {worker} panicked.");
                }
                completed.fetch_add(1, Ordering::Relaxed);

                // Keep a tight failing loop from starving the runtime.
                tokio::task::yield_now().await;
            }
            trace!("Worker {worker} stopped.");
        });

        Running { state, handle }
    }

    /// Stops every worker and waits up to `grace` for in-flight iterations;
    /// anything still running afterwards is aborted. Returns the number of
    /// iterations that ran to completion.
    pub async fn shutdown(mut self, grace: Duration) -> u64 {
        self.set_concurrency(0);

        let deadline = Instant::now() + grace;
        let mut aborted = 0;
        for mut running in self.slots.drain(..).filter_map(|slot| slot.running) {
            if tokio::time::timeout_at(deadline, &mut running.handle)
                .await
                .is_err()
            {
                running.handle.abort();
                aborted += 1;
            }
        }

        if aborted > 0 {
            warn!("Aborted {aborted} workers still running after the graceful stop window.");
        }

        self.completed.load(Ordering::Relaxed)
    }
}
