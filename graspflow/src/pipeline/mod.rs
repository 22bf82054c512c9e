//! Pipeline building and execution.
//!
//! This module provides:
//! - The transition table over the four states
//! - Pipeline builder with config and contract validation
//! - The engine that drives a run to `Finished` or `Failed`
//! - Run reports

mod builder;
mod engine;
mod report;
mod transitions;


pub use builder::{validate_contracts, PipelineBuilder};
pub use engine::Pipeline;
pub use report::PipelineRun;
pub use transitions::{transition, Next};
