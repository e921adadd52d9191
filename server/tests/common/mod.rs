//! Running server instance for API tests.
//!
//! Every `TestServer` binds an ephemeral port on 127.0.0.1, stores working
//! files and artifacts in its own temp directory and runs the pipeline with
//! in-process stand-ins for the vendors and ffmpeg.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use naturrate::orchestrator::OrchestratorSettings;
use naturrate::services::StubVideoUnderstanding;
use naturrate::storage::BlobStoreHandle;
use naturrate::{
    Collaborators, LocalBlobStore, Orchestrator, PipelineConfig, PublisherConfig,
};
use naturrate_server::{serve, AppState};

pub struct TestServer {
    pub addr: SocketAddr,
    pub orchestrator: Arc<Orchestrator>,
    pub client: reqwest::Client,
    shutdown: Option<oneshot::Sender<()>>,
    _temp_dir: TempDir,
}

pub struct TestServerOptions {
    /// Indexing never completes when false.
    pub indexing_completes: bool,
    pub max_upload_mb: usize,
}

impl Default for TestServerOptions {
    fn default() -> Self {
        Self {
            indexing_completes: true,
            max_upload_mb: 8,
        }
    }
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(TestServerOptions::default()).await
    }

    pub async fn start_with(options: TestServerOptions) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");

        let blob_store = BlobStoreHandle::local(LocalBlobStore::new(
            temp_dir.path().join("artifacts"),
            &format!("http://{}", addr),
        ));

        let mut collaborators = Collaborators::stub(Arc::clone(&blob_store.store));
        if !options.indexing_completes {
            collaborators.understanding = Arc::new(StubVideoUnderstanding::new().never_ready());
        }

        let settings = OrchestratorSettings {
            pipeline: PipelineConfig {
                work_dir: temp_dir.path().join("work"),
                index_id: "test-index".to_string(),
                poll_interval: Duration::from_millis(5),
                indexing_timeout: Duration::from_secs(10),
                timeout: None,
            },
            publisher: PublisherConfig {
                poll_interval: Duration::from_millis(20),
                not_found_grace: Duration::from_millis(100),
            },
            signed_url_ttl: Duration::from_secs(60),
        };
        let orchestrator = Arc::new(Orchestrator::new(settings, collaborators));

        let state = AppState::new(
            Arc::clone(&orchestrator),
            blob_store.local.clone(),
            options.max_upload_mb,
        );

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let shutdown_orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move {
            let shutdown = async move {
                let _ = shutdown_rx.await;
                shutdown_orchestrator.shutdown().await;
            };
            serve(listener, state, shutdown)
                .await
                .expect("Server failed");
        });

        Self {
            addr,
            orchestrator,
            client: reqwest::Client::new(),
            shutdown: Some(shutdown_tx),
            _temp_dir: temp_dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Uploads `bytes` as the `file` field and returns the response.
    pub async fn upload(&self, filename: &str, bytes: &[u8]) -> reqwest::Response {
        let part = reqwest::multipart::Part::bytes(bytes.to_vec()).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        self.client
            .post(self.url("/upload_video"))
            .multipart(form)
            .send()
            .await
            .expect("Upload request failed")
    }

    /// Uploads and returns the new video id.
    pub async fn upload_ok(&self, filename: &str, bytes: &[u8]) -> String {
        let response = self.upload(filename, bytes).await;
        assert_eq!(response.status(), 200);
        let json: serde_json::Value = response.json().await.expect("Invalid upload JSON");
        json["videoId"]
            .as_str()
            .expect("videoId missing")
            .to_string()
    }

    /// Reads the whole status stream and returns the JSON of every event.
    pub async fn status_events(&self, video_id: &str) -> Vec<serde_json::Value> {
        let body = tokio::time::timeout(
            Duration::from_secs(10),
            self.client
                .get(self.url(&format!("/video_status/{}", video_id)))
                .send()
                .await
                .expect("Status request failed")
                .text(),
        )
        .await
        .expect("Status stream did not end")
        .expect("Failed to read status stream");

        parse_sse_data(&body)
    }

    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.orchestrator.shutdown().await;
    }
}

/// Parses the `data:` payloads of a server-sent events body.
pub fn parse_sse_data(body: &str) -> Vec<serde_json::Value> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| serde_json::from_str(data.trim()).expect("Event data is not JSON"))
        .collect()
}
