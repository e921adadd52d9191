//! In-process job store.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use thiserror::Error;

use crate::job::{Job, JobStage, JobUpdate};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Job {job_id} already finished in stage {stage}")]
    AlreadyTerminal { job_id: String, stage: JobStage },

    #[error("Job {job_id} cannot move from {from} back to {to}")]
    StageRegression {
        job_id: String,
        from: JobStage,
        to: JobStage,
    },

    #[error("Job already exists: {0}")]
    DuplicateId(String),
}

/// Keyed storage of job records.
///
/// Updates go through [`apply`](JobStore::apply), which enforces the stage
/// order: stages only move forward, `Failed` may follow any non-terminal
/// stage, and nothing is accepted once a job is terminal.
pub trait JobStore: Send + Sync {
    fn insert(&self, job: Job) -> Result<(), StoreError>;

    fn get(&self, job_id: &str) -> Option<Job>;

    /// Applies an update and returns the job as stored afterwards.
    fn apply(&self, job_id: &str, update: JobUpdate) -> Result<Job, StoreError>;

    fn contains(&self, job_id: &str) -> bool {
        self.get(job_id).is_some()
    }

    /// Number of jobs currently held.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Job store for the lifetime of the process.
///
/// Uses `std::sync::RwLock`; critical sections are a map lookup and a few
/// field assignments, so it is safe to call from async code.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<String, Job>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Job>> {
        match self.jobs.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Job>> {
        match self.jobs.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl JobStore for InMemoryJobStore {
    fn insert(&self, job: Job) -> Result<(), StoreError> {
        let mut jobs = self.write();
        if jobs.contains_key(&job.job_id) {
            return Err(StoreError::DuplicateId(job.job_id));
        }
        jobs.insert(job.job_id.clone(), job);
        Ok(())
    }

    fn get(&self, job_id: &str) -> Option<Job> {
        self.read().get(job_id).cloned()
    }

    fn apply(&self, job_id: &str, update: JobUpdate) -> Result<Job, StoreError> {
        let mut jobs = self.write();
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| StoreError::NotFound(job_id.to_string()))?;

        if job.stage.is_terminal() {
            return Err(StoreError::AlreadyTerminal {
                job_id: job_id.to_string(),
                stage: job.stage,
            });
        }

        if update.stage != JobStage::Failed && update.stage < job.stage {
            return Err(StoreError::StageRegression {
                job_id: job_id.to_string(),
                from: job.stage,
                to: update.stage,
            });
        }

        apply_update(job, update);
        Ok(job.clone())
    }

    fn len(&self) -> usize {
        self.read().len()
    }
}

fn apply_update(job: &mut Job, update: JobUpdate) {
    let now = Utc::now();

    job.stage = update.stage;
    job.status = update.stage.status();
    job.message = update.message;

    if update.chapters_text.is_some() {
        job.chapters_text = update.chapters_text;
    }
    if update.narration_script.is_some() {
        job.narration_script = update.narration_script;
    }
    if update.error.is_some() {
        job.error = update.error;
    }

    job.updated_at = now;
    if job.stage.is_terminal() {
        job.completed_at = Some(now);
    }
    job.revision += 1;
}
