use thiserror::Error;

use crate::error::{MediaError, ServiceError, StorageError};

/// Why a pipeline run ended without a final video. The display string is
/// what the job records as its error.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Indexing failed with status {status}")]
    IndexingFailed { status: String },

    #[error("Indexing did not finish within {secs}s")]
    IndexingTimedOut { secs: u64 },

    #[error("{0}")]
    Service(#[from] ServiceError),

    #[error("{0}")]
    Media(#[from] MediaError),

    #[error("{0}")]
    Storage(#[from] StorageError),

    #[error("Failed to write '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Processing cancelled")]
    Cancelled,

    #[error("Processing timed out after {secs}s")]
    TimedOut { secs: u64 },
}
