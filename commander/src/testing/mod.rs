//! Testing utilities for command pipelines.
//!
//! This module provides:
//! - Recording, failing and result-publishing steps
//! - A fixture that bootstraps a commander from templates

mod fixtures;
mod mocks;

pub use fixtures::TestFixture;
pub use mocks::{ExecutionLog, FailingStep, PublishResult, RecordingCommand, RecordingStep};
