//! Shared test utilities for naturrate integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated pipeline and orchestrator runs in temp directories
//! - Builders for stub collaborators and chapter lists

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{RecordingProgress, TestHarness, WorkDirAtTerminal};
