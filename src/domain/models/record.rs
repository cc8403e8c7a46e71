//! Iteration history and quantification outcome types.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::models::composition::Composition;
use crate::domain::models::intensity::KRatio;

/// One pass of the quantification loop: the composition proposed at the end
/// of the pass, the measured k-ratios it was driven by and the k-ratios
/// calculated from this pass's simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub composition: Composition,
    pub measured: BTreeMap<u32, KRatio>,
    pub calculated: BTreeMap<u32, KRatio>,
}

/// Why a quantification loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalState {
    /// The convergor reported a stable estimate.
    Converged,
    /// `max_iterations` exhausted; the last composition is still a valid
    /// best-effort answer.
    MaxIterationsReached,
    /// A simulation failed or the loop was cancelled.
    Failed,
}

/// Per-measurement loop state, exclusively owned by its quantification loop.
#[derive(Debug, Clone)]
pub struct QuantificationState {
    /// Current best composition estimate.
    pub composition: Composition,
    /// Ordered iteration records, oldest first.
    pub history: Vec<IterationRecord>,
    /// Number of completed iterations.
    pub iteration_count: u32,
    /// Wall-clock time spent in the loop.
    pub elapsed: Duration,
    /// Why the loop stopped; `None` while still running.
    pub terminal: Option<TerminalState>,
}

impl QuantificationState {
    pub fn new(initial_composition: Composition) -> Self {
        Self {
            composition: initial_composition,
            history: Vec::new(),
            iteration_count: 0,
            elapsed: Duration::ZERO,
            terminal: None,
        }
    }

    /// Final composition; valid only once the loop reached a terminal state.
    pub fn last_composition(&self) -> Option<&Composition> {
        self.terminal.map(|_| &self.composition)
    }
}

/// What a finished loop reports back to the scheduler, with strategy names
/// for provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantificationReport {
    pub name: String,
    pub composition: Composition,
    pub iterations: u32,
    pub elapsed: Duration,
    pub terminal: TerminalState,
    pub iterator: String,
    pub convergor: String,
    pub completed_at: DateTime<Utc>,
    /// Underlying error message when `terminal` is `Failed`.
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_composition_requires_terminal_state() {
        let mut state = QuantificationState::new(Composition::new());
        assert!(state.last_composition().is_none());

        state.terminal = Some(TerminalState::Converged);
        assert!(state.last_composition().is_some());
    }
}
