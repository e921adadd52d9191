//! Broadcasting of job progress for real-time status streaming.

pub mod job_progress;

pub use job_progress::{JobProgressBroadcaster, JobProgressEvent};
