//! HTTP routes, organized by concern:
//! - `upload`: accepting videos
//! - `status`: live status stream and job snapshots
//! - `result`: finished video links
//! - `artifacts`: locally stored videos
//! - `health`: liveness

pub mod artifacts;
pub mod health;
pub mod result;
pub mod status;
pub mod upload;

pub use artifacts::download_artifact;
pub use health::health_check;
pub use result::get_video_result;
pub use status::{get_video, video_status};
pub use upload::upload_video;
