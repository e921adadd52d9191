pub mod broadcast;
pub mod config;
pub mod error;
pub mod job;
pub mod logging;
pub mod media;
pub mod orchestrator;
pub mod pipeline;
pub mod publisher;
pub mod sanitize;
pub mod secrets;
pub mod services;
pub mod storage;
pub mod store;

pub use broadcast::{JobProgressBroadcaster, JobProgressEvent};
pub use config::{load_config, load_from_env, Config, ServiceMode, StorageBackend};
pub use error::{
    ConfigError, MediaError, NaturrateError, Result, ResultError, ServiceError, StorageError,
};
pub use job::{Job, JobStage, JobStatus, JobUpdate};
pub use orchestrator::{Orchestrator, OrchestratorSettings, VideoResult};
pub use pipeline::{Collaborators, Pipeline, PipelineConfig, PipelineContext, PipelineError};
pub use publisher::{PublisherConfig, StatusPublisher, StatusSnapshot};
pub use secrets::{resolve_secret, SecretError, SecretRef};
pub use storage::{BlobStore, BlobStoreHandle, GcsBlobStore, LocalBlobStore};
pub use store::{InMemoryJobStore, JobStore, StoreError};
