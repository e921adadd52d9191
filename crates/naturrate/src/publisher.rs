//! Per-subscriber status streams.
//!
//! A subscription re-reads the job store whenever a progress event is
//! broadcast or the poll interval elapses, and yields a snapshot each time
//! the job's revision changed. It ends after a terminal snapshot.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::broadcast::{JobProgressBroadcaster, JobProgressEvent};
use crate::config::Config;
use crate::job::{Job, JobStatus};
use crate::store::JobStore;

pub const NOT_FOUND_MESSAGE: &str = "Video not found";

/// What a status subscriber sees.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub status: JobStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapters_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narration_script: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusSnapshot {
    pub fn from_job(job: &Job) -> Self {
        Self {
            status: job.status,
            message: job.message.clone(),
            chapters_text: job.chapters_text.clone(),
            narration_script: job.narration_script.clone(),
            error: job.error.clone(),
        }
    }

    /// Terminal snapshot for a job that does not exist.
    pub fn not_found() -> Self {
        Self {
            status: JobStatus::Error,
            message: NOT_FOUND_MESSAGE.to_string(),
            chapters_text: None,
            narration_script: None,
            error: Some(NOT_FOUND_MESSAGE.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[derive(Debug, Clone)]
pub struct PublisherConfig {
    pub poll_interval: Duration,
    pub not_found_grace: Duration,
}

impl PublisherConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.status.poll_interval_ms),
            not_found_grace: Duration::from_secs(config.status.not_found_grace_secs),
        }
    }
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

#[derive(Clone)]
pub struct StatusPublisher {
    store: Arc<dyn JobStore>,
    broadcaster: JobProgressBroadcaster,
    config: PublisherConfig,
}

impl StatusPublisher {
    pub fn new(
        store: Arc<dyn JobStore>,
        broadcaster: JobProgressBroadcaster,
        config: PublisherConfig,
    ) -> Self {
        Self {
            store,
            broadcaster,
            config,
        }
    }

    /// A finite stream of snapshots for `job_id`. Nothing happens until it
    /// is polled.
    pub fn subscribe(&self, job_id: &str) -> BoxStream<'static, StatusSnapshot> {
        let subscription = Subscription {
            job_id: job_id.to_string(),
            store: Arc::clone(&self.store),
            events: Some(self.broadcaster.subscribe()),
            poll_interval: self.config.poll_interval,
            not_found_deadline: Instant::now() + self.config.not_found_grace,
            last_revision: None,
            finished: false,
        };

        stream::unfold(subscription, |mut sub| async move {
            let snapshot = sub.next_snapshot().await?;
            Some((snapshot, sub))
        })
        .boxed()
    }
}

struct Subscription {
    job_id: String,
    store: Arc<dyn JobStore>,
    events: Option<broadcast::Receiver<JobProgressEvent>>,
    poll_interval: Duration,
    not_found_deadline: Instant,
    last_revision: Option<u64>,
    finished: bool,
}

impl Subscription {
    async fn next_snapshot(&mut self) -> Option<StatusSnapshot> {
        if self.finished {
            return None;
        }

        loop {
            match self.store.get(&self.job_id) {
                Some(job) if self.last_revision != Some(job.revision) => {
                    self.last_revision = Some(job.revision);
                    let snapshot = StatusSnapshot::from_job(&job);
                    self.finished = snapshot.is_terminal();
                    return Some(snapshot);
                }
                Some(_) => {}
                None if self.last_revision.is_some()
                    || Instant::now() >= self.not_found_deadline =>
                {
                    log::debug!("Status stream for {}: job not found", self.job_id);
                    self.finished = true;
                    return Some(StatusSnapshot::not_found());
                }
                None => {}
            }

            self.wait().await;
        }
    }

    /// Waits for a progress broadcast or the poll interval, whichever is first.
    async fn wait(&mut self) {
        let tick = tokio::time::sleep(self.poll_interval);
        match self.events.as_mut() {
            Some(events) => {
                tokio::select! {
                    received = events.recv() => {
                        if let Err(broadcast::error::RecvError::Closed) = received {
                            self.events = None;
                        }
                    }
                    _ = tick => {}
                }
            }
            None => tick.await,
        }
    }
}
