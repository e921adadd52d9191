use std::path::PathBuf;
use std::time::Duration;

use crate::config::Config;

pub struct PipelineConfig {
    pub work_dir: PathBuf,
    pub index_id: String,
    pub poll_interval: Duration,
    pub indexing_timeout: Duration,
    /// Overall per-job deadline.
    pub timeout: Option<Duration>,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            work_dir: config.pipeline.work_dir.clone(),
            index_id: config.twelvelabs.index_id.clone(),
            poll_interval: Duration::from_secs(config.twelvelabs.poll_interval_secs),
            indexing_timeout: Duration::from_secs(config.twelvelabs.indexing_timeout_secs),
            timeout: config.pipeline.timeout_secs.map(Duration::from_secs),
        }
    }
}
