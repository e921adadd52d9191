//! Job progress broadcaster for real-time job status streaming.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::job::{Job, JobStage, JobStatus};

/// Progress event for a job, sent after the job store accepted an update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobProgressEvent {
    /// Unique job identifier.
    pub job_id: String,
    /// Stage the job is in.
    pub stage: JobStage,
    /// Overall job status.
    pub status: JobStatus,
    /// Human-readable message describing current activity.
    pub message: String,
    /// Store revision this event reflects.
    pub revision: u64,
    /// Error message (set on failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Timestamp of this event.
    pub timestamp: DateTime<Utc>,
}

impl JobProgressEvent {
    /// Builds the event describing a stored job's current state.
    pub fn from_job(job: &Job) -> Self {
        Self {
            job_id: job.job_id.clone(),
            stage: job.stage,
            status: job.status,
            message: job.message.clone(),
            revision: job.revision,
            error: job.error.clone(),
            timestamp: job.updated_at,
        }
    }
}

/// Broadcasts job progress events for streaming.
///
/// Events are wakeups, not the source of truth: a lagging receiver can
/// always recover by re-reading the job store.
#[derive(Clone)]
pub struct JobProgressBroadcaster {
    sender: Arc<broadcast::Sender<JobProgressEvent>>,
}

impl JobProgressBroadcaster {
    /// Creates a new job progress broadcaster with the specified channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Sends a progress event to all subscribers.
    pub fn send(&self, event: JobProgressEvent) {
        // Ignore errors - no active receivers is fine
        let _ = self.sender.send(event);
    }

    /// Creates a new subscriber for progress events.
    pub fn subscribe(&self) -> broadcast::Receiver<JobProgressEvent> {
        self.sender.subscribe()
    }
}

impl Default for JobProgressBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobStage;

    #[test]
    fn test_send_without_subscribers_is_fine() {
        let broadcaster = JobProgressBroadcaster::new(10);
        let job = Job::new("job-1", "clip.mp4");
        broadcaster.send(JobProgressEvent::from_job(&job));

        // Late subscribers only see later events
        let mut rx = broadcaster.subscribe();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_broadcaster_send_receive() {
        let broadcaster = JobProgressBroadcaster::new(10);
        let mut rx = broadcaster.subscribe();

        let mut job = Job::new("job-1", "clip.mp4");
        job.stage = JobStage::Synthesizing;
        job.message = "Generating audio".to_string();
        job.revision = 4;

        broadcaster.send(JobProgressEvent::from_job(&job));

        let received = rx.try_recv().unwrap();
        assert_eq!(received.job_id, "job-1");
        assert_eq!(received.stage, JobStage::Synthesizing);
        assert_eq!(received.status, JobStatus::Processing);
        assert_eq!(received.revision, 4);
        assert!(!received.status.is_terminal());
    }

    #[test]
    fn test_cloned_broadcasters_share_channel() {
        let broadcaster = JobProgressBroadcaster::default();
        let clone = broadcaster.clone();
        let mut rx = broadcaster.subscribe();

        let mut job = Job::new("job-2", "clip.mp4");
        job.stage = JobStage::Failed;
        job.status = JobStatus::Error;
        job.error = Some("boom".to_string());
        clone.send(JobProgressEvent::from_job(&job));

        let received = rx.try_recv().unwrap();
        assert!(received.status.is_terminal());
        assert_eq!(received.error.as_deref(), Some("boom"));
    }
}
