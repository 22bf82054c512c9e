//! Context management for pipeline execution.
//!
//! This module provides:
//! - The typed, mutable context shared by all states
//! - Field names for declaring state read/write contracts
//! - Compact snapshots for events and logs

#[cfg(test)]
mod context_tests;
mod execution;
mod fields;
mod snapshot;

pub use execution::PipelineContext;
pub use fields::ContextField;
pub use snapshot::ContextSnapshot;
