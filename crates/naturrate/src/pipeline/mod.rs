pub mod chapters;
pub mod collaborators;
pub mod config;
pub mod context;
pub mod error;
pub mod progress;
pub mod runner;
pub mod transient;

pub use chapters::format_chapters;
pub use collaborators::Collaborators;
pub use config::PipelineConfig;
pub use context::PipelineContext;
pub use error::PipelineError;
pub use progress::{NoopProgress, ProgressReporter, StoreProgress};
pub use runner::Pipeline;
pub use transient::TransientFiles;
