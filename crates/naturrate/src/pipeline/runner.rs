use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::error::ServiceError;
use crate::job::{JobStage, JobUpdate};
use crate::media::MuxPlan;
use crate::sanitize::redact_path;
use crate::services::IndexTask;
use crate::storage::artifact_key;

use super::chapters::format_chapters;
use super::collaborators::Collaborators;
use super::config::PipelineConfig;
use super::context::PipelineContext;
use super::error::PipelineError;
use super::progress::ProgressReporter;

pub struct Pipeline {
    config: Arc<PipelineConfig>,
    collaborators: Collaborators,
}

impl Pipeline {
    pub fn new(config: Arc<PipelineConfig>, collaborators: Collaborators) -> Self {
        Self {
            config,
            collaborators,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the full pipeline for a single upload.
    ///
    /// Reports every stage, then exactly one terminal update (completed or
    /// failed). Working files are removed before the terminal update is
    /// reported; `ctx` dropping covers unwinding.
    pub async fn run(
        &self,
        mut ctx: PipelineContext,
        progress: &dyn ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<(), PipelineError> {
        let span = info_span!("pipeline",
            job_id = %ctx.job_id,
            source = %redact_path(&ctx.source_path),
        );

        let outcome = async {
            let work = with_deadline(self.config.timeout, self.execute(&mut ctx, progress));
            tokio::select! {
                _ = cancel.cancelled() => Err(PipelineError::Cancelled),
                result = work => result,
            }
        }
        .instrument(span.clone())
        .await;

        let _entered = span.enter();
        ctx.transient.cleanup();
        match &outcome {
            Ok(()) => {
                info!("Narrated video ready");
                progress.report(JobUpdate::completed());
            }
            Err(e) => {
                warn!("Pipeline failed: {}", e);
                progress.report(JobUpdate::failed(&e.to_string()));
            }
        }
        outcome
    }

    async fn execute(
        &self,
        ctx: &mut PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> Result<(), PipelineError> {
        // Step 1: Index
        progress.report(JobUpdate::stage(JobStage::Indexing));
        self.step_index(ctx).instrument(info_span!("index")).await?;

        // Step 2: Summarize
        progress.report(JobUpdate::stage(JobStage::Summarizing));
        self.step_summarize(ctx)
            .instrument(info_span!("summarize"))
            .await?;

        // Step 3: Narrate
        progress.report(JobUpdate::stage(JobStage::Narrating));
        self.step_narrate(ctx).instrument(info_span!("narrate")).await?;
        progress.report(
            JobUpdate::stage(JobStage::Narrating).with_results(
                ctx.chapters_text.as_deref().unwrap_or_default(),
                ctx.narration_script.as_deref().unwrap_or_default(),
            ),
        );

        // Step 4: Synthesize
        progress.report(JobUpdate::stage(JobStage::Synthesizing));
        self.step_synthesize(ctx)
            .instrument(info_span!("synthesize"))
            .await?;

        // Step 5: Mux
        progress.report(JobUpdate::stage(JobStage::Muxing));
        self.step_mux(ctx).instrument(info_span!("mux")).await?;

        // Step 6: Upload
        progress.report(JobUpdate::stage(JobStage::Uploading));
        self.step_upload(ctx).instrument(info_span!("upload")).await?;

        Ok(())
    }

    async fn step_index(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        let task = self
            .collaborators
            .understanding
            .create_index_task(&self.config.index_id, &ctx.source_path)
            .await?;
        debug!("Index task {} created", task.task_id);

        let limit = self.config.indexing_timeout;
        let task = tokio::time::timeout(limit, self.wait_for_index(task))
            .await
            .map_err(|_| PipelineError::IndexingTimedOut {
                secs: limit.as_secs(),
            })??;

        if !task.is_ready() {
            return Err(PipelineError::IndexingFailed {
                status: task.status,
            });
        }

        let video_id = task.video_id.ok_or(ServiceError::Decode {
            service: "twelvelabs",
            message: format!("task {} is ready but has no video id", task.task_id),
        })?;
        debug!("Indexed as video {}", video_id);
        ctx.video_id = Some(video_id);
        Ok(())
    }

    /// Polls an index task until it reaches a terminal state.
    async fn wait_for_index(&self, mut task: IndexTask) -> Result<IndexTask, PipelineError> {
        while !task.is_terminal() {
            tokio::time::sleep(self.config.poll_interval).await;
            task = self
                .collaborators
                .understanding
                .get_index_task(&task.task_id)
                .await?;
            debug!("Index task {} status: {}", task.task_id, task.status);
        }
        Ok(task)
    }

    async fn step_summarize(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        let video_id = ctx.video_id.as_deref().unwrap_or_default();
        let chapters = self
            .collaborators
            .understanding
            .summarize_chapters(video_id)
            .await?;
        if chapters.is_empty() {
            warn!("Summary returned no chapters");
        }
        ctx.chapters_text = Some(format_chapters(&chapters));
        ctx.chapters = chapters;
        Ok(())
    }

    async fn step_narrate(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        let chapters_text = ctx.chapters_text.as_deref().unwrap_or_default();
        let script = self.collaborators.narrator.generate(chapters_text).await?;
        debug!("Narration script: {} words", script.split_whitespace().count());
        ctx.narration_script = Some(script);
        Ok(())
    }

    async fn step_synthesize(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        let script = ctx.narration_script.as_deref().unwrap_or_default();
        let audio = self.collaborators.synthesizer.synthesize(script).await?;

        tokio::fs::write(&ctx.narration_path, &audio)
            .await
            .map_err(|source| PipelineError::Io {
                path: redact_path(&ctx.narration_path),
                source,
            })?;
        debug!("Wrote {} bytes of narration audio", audio.len());
        Ok(())
    }

    async fn step_mux(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        let transcoder = &self.collaborators.transcoder;
        let video_secs = transcoder.probe_duration(&ctx.source_path).await?;
        let audio_secs = transcoder.probe_duration(&ctx.narration_path).await?;

        let plan = MuxPlan::new(video_secs, audio_secs);
        if let Some(clip) = plan.clip_audio_to {
            debug!("Clipping narration from {:.1}s to {:.1}s", audio_secs, clip);
        }

        transcoder
            .mux(&ctx.source_path, &ctx.narration_path, &ctx.final_path, &plan)
            .await?;
        ctx.mux_plan = Some(plan);
        Ok(())
    }

    async fn step_upload(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        let key = artifact_key(&ctx.job_id);
        self.collaborators
            .blob_store
            .put(&key, &ctx.final_path)
            .await?;
        ctx.artifact_key = Some(key);
        Ok(())
    }
}

async fn with_deadline<F>(limit: Option<Duration>, work: F) -> Result<(), PipelineError>
where
    F: Future<Output = Result<(), PipelineError>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, work)
            .await
            .unwrap_or(Err(PipelineError::TimedOut {
                secs: limit.as_secs(),
            })),
        None => work.await,
    }
}
