//! Test harness for isolated pipeline execution.
//!
//! Each `TestHarness` owns a temp directory holding the working directory
//! and a local blob store, so runs never touch shared state.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use naturrate::job::{JobStage, JobUpdate};
use naturrate::pipeline::ProgressReporter;
use naturrate::{
    Collaborators, LocalBlobStore, Orchestrator, OrchestratorSettings, Pipeline, PipelineConfig,
    PipelineContext, PipelineError, PublisherConfig,
};

/// Progress reporter that keeps every update.
#[derive(Default)]
pub struct RecordingProgress {
    updates: Mutex<Vec<JobUpdate>>,
}

impl RecordingProgress {
    pub fn updates(&self) -> Vec<JobUpdate> {
        self.updates.lock().unwrap().clone()
    }

    pub fn stages(&self) -> Vec<JobStage> {
        self.updates().iter().map(|u| u.stage).collect()
    }

    pub fn last(&self) -> Option<JobUpdate> {
        self.updates().last().cloned()
    }
}

impl ProgressReporter for RecordingProgress {
    fn report(&self, update: JobUpdate) {
        self.updates.lock().unwrap().push(update);
    }
}

/// Records how many files the working directory holds whenever a terminal
/// update is reported.
pub struct WorkDirAtTerminal {
    work_dir: PathBuf,
    seen: Mutex<Vec<(JobStage, usize)>>,
}

impl WorkDirAtTerminal {
    pub fn new(work_dir: &Path) -> Self {
        Self {
            work_dir: work_dir.to_path_buf(),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn seen(&self) -> Vec<(JobStage, usize)> {
        self.seen.lock().unwrap().clone()
    }
}

impl ProgressReporter for WorkDirAtTerminal {
    fn report(&self, update: JobUpdate) {
        if matches!(update.stage, JobStage::Completed | JobStage::Failed) {
            let files = std::fs::read_dir(&self.work_dir)
                .map(|entries| entries.count())
                .unwrap_or(0);
            self.seen.lock().unwrap().push((update.stage, files));
        }
    }
}

pub struct TestHarness {
    temp_dir: TempDir,
    /// Where uploads and intermediate files are written.
    pub work_dir: PathBuf,
    /// Root of the local blob store.
    pub artifacts_dir: PathBuf,
    pub blob_store: Arc<LocalBlobStore>,
    pub poll_interval: Duration,
    pub indexing_timeout: Duration,
    pub timeout: Option<Duration>,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let work_dir = temp_dir.path().join("work");
        let artifacts_dir = temp_dir.path().join("artifacts");
        std::fs::create_dir_all(&work_dir).expect("Failed to create work dir");

        let blob_store = Arc::new(LocalBlobStore::new(&artifacts_dir, "http://localhost:8000"));

        Self {
            temp_dir,
            work_dir,
            artifacts_dir,
            blob_store,
            poll_interval: Duration::from_millis(5),
            indexing_timeout: Duration::from_secs(10),
            timeout: None,
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            work_dir: self.work_dir.clone(),
            index_id: "test-index".to_string(),
            poll_interval: self.poll_interval,
            indexing_timeout: self.indexing_timeout,
            timeout: self.timeout,
        }
    }

    pub fn pipeline(&self, collaborators: Collaborators) -> Pipeline {
        Pipeline::new(Arc::new(self.pipeline_config()), collaborators)
    }

    pub fn orchestrator(&self, collaborators: Collaborators) -> Orchestrator {
        let settings = OrchestratorSettings {
            pipeline: self.pipeline_config(),
            publisher: PublisherConfig {
                poll_interval: Duration::from_millis(20),
                not_found_grace: Duration::from_millis(100),
            },
            signed_url_ttl: Duration::from_secs(60),
        };
        Orchestrator::new(settings, collaborators)
    }

    /// Writes an upload to the working directory the way `submit` does.
    pub fn write_upload(&self, job_id: &str, bytes: &[u8]) -> PipelineContext {
        let ctx = PipelineContext::new(job_id, &self.work_dir);
        std::fs::write(&ctx.source_path, bytes).expect("Failed to write upload");
        ctx
    }

    /// Runs a pipeline for a fresh upload and returns the recorded progress.
    pub async fn run(
        &self,
        collaborators: Collaborators,
        job_id: &str,
    ) -> (Result<(), PipelineError>, RecordingProgress) {
        let pipeline = self.pipeline(collaborators);
        let ctx = self.write_upload(job_id, b"video-bytes");
        let progress = RecordingProgress::default();
        let outcome = pipeline
            .run(ctx, &progress, &CancellationToken::new())
            .await;
        (outcome, progress)
    }

    /// Files currently in the working directory.
    pub fn work_files(&self) -> Vec<PathBuf> {
        match std::fs::read_dir(&self.work_dir) {
            Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Path a stored artifact would have.
    pub fn artifact_path(&self, key: &str) -> PathBuf {
        self.artifacts_dir.join(key)
    }
}
