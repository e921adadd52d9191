//! Accepts uploads, runs one pipeline task per job and answers queries
//! about job state.

use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::BoxStream;
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::broadcast::{JobProgressBroadcaster, JobProgressEvent};
use crate::config::Config;
use crate::error::{NaturrateError, Result, ResultError};
use crate::job::{generate_job_id, Job, JobStatus, JobUpdate};
use crate::pipeline::{
    Collaborators, Pipeline, PipelineConfig, PipelineContext, ProgressReporter, StoreProgress,
};
use crate::publisher::{PublisherConfig, StatusPublisher, StatusSnapshot};
use crate::sanitize::redact_path;
use crate::storage::{artifact_key, BlobStore};
use crate::store::{InMemoryJobStore, JobStore};

/// Recorded when a pipeline task panics.
pub const ABORTED_MESSAGE: &str = "Processing aborted unexpectedly";

/// What `get_video_result` hands back for a completed job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoResult {
    pub video_url: String,
    pub chapter_text: String,
    pub narration_script: String,
}

pub struct OrchestratorSettings {
    pub pipeline: PipelineConfig,
    pub publisher: PublisherConfig,
    pub signed_url_ttl: Duration,
}

impl OrchestratorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            pipeline: PipelineConfig::from_config(config),
            publisher: PublisherConfig::from_config(config),
            signed_url_ttl: Duration::from_secs(config.storage.signed_url_ttl_secs),
        }
    }
}

pub struct Orchestrator {
    store: Arc<dyn JobStore>,
    broadcaster: JobProgressBroadcaster,
    pipeline: Arc<Pipeline>,
    publisher: StatusPublisher,
    blob_store: Arc<dyn BlobStore>,
    signed_url_ttl: Duration,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl Orchestrator {
    pub fn new(settings: OrchestratorSettings, collaborators: Collaborators) -> Self {
        let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
        let broadcaster = JobProgressBroadcaster::default();
        let publisher =
            StatusPublisher::new(Arc::clone(&store), broadcaster.clone(), settings.publisher);
        let blob_store = Arc::clone(&collaborators.blob_store);

        Self {
            store,
            broadcaster,
            pipeline: Arc::new(Pipeline::new(Arc::new(settings.pipeline), collaborators)),
            publisher,
            blob_store,
            signed_url_ttl: settings.signed_url_ttl,
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// Builds the orchestrator and its collaborators from configuration.
    pub fn from_config(config: &Config, blob_store: Arc<dyn BlobStore>) -> Result<Self> {
        let collaborators = Collaborators::from_config(config, blob_store)?;
        Ok(Self::new(OrchestratorSettings::from_config(config), collaborators))
    }

    pub fn store(&self) -> Arc<dyn JobStore> {
        Arc::clone(&self.store)
    }

    /// Stores the upload, records a `processing` job and starts its pipeline
    /// in the background. Returns the new job id.
    pub async fn submit(&self, filename: &str, bytes: &[u8]) -> Result<String> {
        if self.shutdown.is_cancelled() {
            return Err(NaturrateError::ShuttingDown);
        }

        let mut job_id = generate_job_id(filename);
        while self.store.contains(&job_id) {
            job_id = generate_job_id(filename);
        }

        let work_dir = self.pipeline.config().work_dir.clone();
        tokio::fs::create_dir_all(&work_dir)
            .await
            .map_err(|source| NaturrateError::WriteUpload {
                path: work_dir.clone(),
                source,
            })?;

        // Built before the write so a partial upload is removed on error
        let ctx = PipelineContext::new(&job_id, &work_dir);
        tokio::fs::write(&ctx.source_path, bytes)
            .await
            .map_err(|source| NaturrateError::WriteUpload {
                path: ctx.source_path.clone(),
                source,
            })?;

        let job = Job::new(&job_id, filename);
        self.store.insert(job.clone())?;
        self.broadcaster.send(JobProgressEvent::from_job(&job));
        log::info!(
            "Accepted upload {} ({} bytes) as {}",
            redact_path(Path::new(filename)),
            bytes.len(),
            job_id
        );

        self.spawn_pipeline(ctx);
        Ok(job_id)
    }

    fn spawn_pipeline(&self, ctx: PipelineContext) {
        let pipeline = Arc::clone(&self.pipeline);
        let progress = StoreProgress::new(
            &ctx.job_id,
            Arc::clone(&self.store),
            self.broadcaster.clone(),
        );
        let cancel = self.shutdown.child_token();
        let job_id = ctx.job_id.clone();

        self.tracker.spawn(async move {
            let run = AssertUnwindSafe(pipeline.run(ctx, &progress, &cancel))
                .catch_unwind()
                .await;
            if run.is_err() {
                log::error!("Pipeline task for {} panicked", job_id);
                progress.report(JobUpdate::failed(ABORTED_MESSAGE));
            }
        });
    }

    pub fn get_status(&self, job_id: &str) -> Option<Job> {
        self.store.get(job_id)
    }

    /// Mints a fresh download URL for a completed job.
    pub async fn get_result(&self, job_id: &str) -> std::result::Result<VideoResult, ResultError> {
        let job = self.store.get(job_id).ok_or(ResultError::NotFound)?;
        if job.status != JobStatus::Completed {
            return Err(ResultError::NotReady);
        }

        let video_url = self
            .blob_store
            .signed_url(&artifact_key(job_id), self.signed_url_ttl)
            .await?;

        Ok(VideoResult {
            video_url,
            chapter_text: job.chapters_text.unwrap_or_default(),
            narration_script: job.narration_script.unwrap_or_default(),
        })
    }

    pub fn subscribe(&self, job_id: &str) -> BoxStream<'static, StatusSnapshot> {
        self.publisher.subscribe(job_id)
    }

    /// Number of pipeline tasks still running.
    pub fn active_jobs(&self) -> usize {
        self.tracker.len()
    }

    /// Cancels every in-flight pipeline and waits for their tasks to finish.
    /// Later submissions are refused.
    pub async fn shutdown(&self) {
        log::info!("Shutting down, cancelling {} job(s)", self.tracker.len());
        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }
}
