use std::path::{Path, PathBuf};

use crate::media::MuxPlan;
use crate::services::Chapter;

use super::transient::TransientFiles;

pub struct PipelineContext {
    // Input
    pub job_id: String,
    pub source_path: PathBuf,

    // Working files, removed when the context is dropped
    pub narration_path: PathBuf,
    pub final_path: PathBuf,
    pub transient: TransientFiles,

    // Index step result
    pub video_id: Option<String>,

    // Summarize step results
    pub chapters: Vec<Chapter>,
    pub chapters_text: Option<String>,

    // Narrate step result
    pub narration_script: Option<String>,

    // Mux step result
    pub mux_plan: Option<MuxPlan>,

    // Upload step result
    pub artifact_key: Option<String>,
}

impl PipelineContext {
    /// Context for a job whose upload was written to `{work_dir}/{job_id}`.
    pub fn new(job_id: &str, work_dir: &Path) -> Self {
        let mut transient = TransientFiles::new();
        let source_path = transient.register(work_dir.join(job_id));
        let narration_path = transient.register(work_dir.join(format!("{}_narration.mp3", job_id)));
        let final_path = transient.register(work_dir.join(format!("{}_final.mp4", job_id)));

        Self {
            job_id: job_id.to_string(),
            source_path,
            narration_path,
            final_path,
            transient,
            video_id: None,
            chapters: Vec::new(),
            chapters_text: None,
            narration_script: None,
            mux_plan: None,
            artifact_key: None,
        }
    }
}
