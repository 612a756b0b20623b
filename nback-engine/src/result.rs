use crate::config::{PacingMode, SessionConfig};
use crate::score::ModalityScore;
use crate::state::SessionState;
use nback_core::{Modality, TrialRecord};
use serde::{Deserialize, Serialize};

/// Summary of a finished or stopped session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    pub trials_completed: usize,
    pub total_trials: usize,
    /// False when the session was stopped before its last trial resolved.
    pub completed: bool,
    pub position: ModalityScore,
    pub audio: ModalityScore,
    /// Percent over both modalities, one decimal.
    pub accuracy: f64,
    pub effective_difficulty: f64,
    /// Resolved trials times the base interval, not wall-clock time.
    pub elapsed_seconds: f64,
    pub n: usize,
    pub variable_mode: bool,
    pub base_interval_secs: f64,
    pub pacing: PacingMode,
    pub trials: Vec<TrialRecord>,
}

impl SessionResult {
    pub(crate) fn from_state(
        state: &SessionState,
        config: &SessionConfig,
        effective_difficulty: f64,
    ) -> Self {
        let scores = state.scorer().scores();
        let trials_completed = state.resolved_count();
        let total_trials = state.sequence().len();
        Self {
            trials_completed,
            total_trials,
            completed: trials_completed == total_trials,
            position: scores.position,
            audio: scores.audio,
            accuracy: state.scorer().accuracy(),
            effective_difficulty,
            elapsed_seconds: trials_completed as f64 * config.base_interval_secs,
            n: config.n,
            variable_mode: config.variable_mode,
            base_interval_secs: config.base_interval_secs,
            pacing: config.pacing,
            trials: state.records().to_vec(),
        }
    }

    pub fn score(&self, modality: Modality) -> ModalityScore {
        match modality {
            Modality::Position => self.position,
            Modality::Audio => self.audio,
        }
    }
}

/// Downstream consumer of session results (progression, rewards, history).
pub trait ProgressionSink {
    fn submit(&mut self, result: &SessionResult);
}

impl<F: FnMut(&SessionResult)> ProgressionSink for F {
    fn submit(&mut self, result: &SessionResult) {
        self(result)
    }
}
