//! The pipeline's transition table.

use crate::core::{Outcome, StateId};
use crate::states::StateOutcome;

/// Where the engine goes after a state returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    /// Enter another state.
    State(StateId),
    /// Stop with a terminal outcome.
    Terminal(Outcome),
}

/// Maps a state and its result to the next step.
///
/// Success moves forward one state, or finishes after `ExecuteMotion`; any
/// failure goes straight to `Failed`. No edge points backward.
#[must_use]
pub fn transition(state: StateId, outcome: &StateOutcome) -> Next {
    match (state, outcome) {
        (_, StateOutcome::Failed(_)) => Next::Terminal(Outcome::Failed),
        (StateId::Segment, StateOutcome::Done) => Next::State(StateId::SelectInstance),
        (StateId::SelectInstance, StateOutcome::Done) => Next::State(StateId::SampleGrasps),
        (StateId::SampleGrasps, StateOutcome::Done) => Next::State(StateId::ExecuteMotion),
        (StateId::ExecuteMotion, StateOutcome::Done) => Next::Terminal(Outcome::Finished),
    }
}
