use std::sync::Arc;

use crate::broadcast::{JobProgressBroadcaster, JobProgressEvent};
use crate::job::JobUpdate;
use crate::store::JobStore;

pub trait ProgressReporter: Send + Sync {
    fn report(&self, update: JobUpdate);
}

/// No-op reporter for unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _update: JobUpdate) {}
}

/// Applies updates to the job store, then wakes status subscribers.
///
/// The store write happens before `report` returns, so a stage's state is
/// visible before the next stage starts.
pub struct StoreProgress {
    job_id: String,
    store: Arc<dyn JobStore>,
    broadcaster: JobProgressBroadcaster,
}

impl StoreProgress {
    pub fn new(job_id: &str, store: Arc<dyn JobStore>, broadcaster: JobProgressBroadcaster) -> Self {
        Self {
            job_id: job_id.to_string(),
            store,
            broadcaster,
        }
    }
}

impl ProgressReporter for StoreProgress {
    fn report(&self, update: JobUpdate) {
        match self.store.apply(&self.job_id, update) {
            Ok(job) => self.broadcaster.send(JobProgressEvent::from_job(&job)),
            Err(e) => log::warn!("Dropped progress update for {}: {}", self.job_id, e),
        }
    }
}
