//! Shared state handed to every route.

use std::sync::Arc;

use naturrate::{LocalBlobStore, Orchestrator};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,

    /// Set when finished videos are stored on local disk and served by
    /// `/artifacts/{token}`.
    pub artifacts: Option<Arc<LocalBlobStore>>,

    /// Request body limit for uploads.
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        artifacts: Option<Arc<LocalBlobStore>>,
        max_upload_mb: usize,
    ) -> Self {
        Self {
            orchestrator,
            artifacts,
            max_upload_bytes: max_upload_mb.saturating_mul(1024 * 1024),
        }
    }
}
