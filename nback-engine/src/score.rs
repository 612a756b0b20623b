use nback_core::{Modality, Outcome, PerModality};
use serde::{Deserialize, Serialize};

/// Signal-detection counts for one modality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModalityScore {
    pub hits: u32,
    pub misses: u32,
    pub false_alarms: u32,
    pub correct_rejections: u32,
}

impl ModalityScore {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Hit => self.hits += 1,
            Outcome::Miss => self.misses += 1,
            Outcome::FalseAlarm => self.false_alarms += 1,
            Outcome::CorrectRejection => self.correct_rejections += 1,
        }
    }

    pub fn accuracy(&self) -> f64 {
        accuracy(self.hits, self.misses, self.false_alarms)
    }

    pub fn merged(&self, other: &ModalityScore) -> ModalityScore {
        ModalityScore {
            hits: self.hits + other.hits,
            misses: self.misses + other.misses,
            false_alarms: self.false_alarms + other.false_alarms,
            correct_rejections: self.correct_rejections + other.correct_rejections,
        }
    }
}

/// Session accuracy in percent, one decimal.
///
/// False alarms are subtracted from the target-normalised error rate, so a
/// run with few targets and many false alarms bottoms out at 0.
pub fn accuracy(hits: u32, misses: u32, false_alarms: u32) -> f64 {
    let total_targets = hits + misses;
    if total_targets == 0 {
        return if false_alarms == 0 { 100.0 } else { 0.0 };
    }
    let errors = f64::from(misses + false_alarms);
    let score = 1.0 - errors / f64::from(total_targets);
    ((score * 1000.0).round() / 10.0).max(0.0)
}

/// A committed outcome that a late press may still reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Provisional {
    trial_index: usize,
    outcome: Outcome,
}

/// Accumulates per-modality scores as trials resolve.
///
/// Every commit replaces the modality's provisional slot. Only Miss and
/// CorrectRejection leave something amendable, and [`SignalScorer::amend`]
/// consumes it, so one trial can be corrected at most once per modality.
#[derive(Debug, Clone, Default)]
pub struct SignalScorer {
    scores: PerModality<ModalityScore>,
    provisional: PerModality<Option<Provisional>>,
}

impl SignalScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_outcome(
        &mut self,
        modality: Modality,
        is_target: bool,
        was_pressed: bool,
    ) -> Outcome {
        let outcome = Outcome::classify(is_target, was_pressed);
        self.scores[modality].record(outcome);
        outcome
    }

    /// Records the outcome of `trial_index` and opens it for one correction.
    pub fn commit(
        &mut self,
        trial_index: usize,
        modality: Modality,
        is_target: bool,
        was_pressed: bool,
    ) -> Outcome {
        let outcome = self.record_outcome(modality, is_target, was_pressed);
        self.provisional[modality] = (!outcome.was_pressed()).then_some(Provisional {
            trial_index,
            outcome,
        });
        outcome
    }

    /// Closes the correction slot without scoring, for trials below their lag floor.
    pub fn seal(&mut self, modality: Modality) {
        self.provisional[modality] = None;
    }

    /// Reclassifies the provisional outcome of `trial_index` as pressed.
    /// Returns the new outcome, or `None` if there is nothing left to amend.
    pub fn amend(&mut self, modality: Modality, trial_index: usize) -> Option<Outcome> {
        let slot = self.provisional[modality].take_if(|p| p.trial_index == trial_index)?;
        let score = &mut self.scores[modality];
        let amended = match slot.outcome {
            Outcome::Miss => {
                score.misses -= 1;
                score.hits += 1;
                Outcome::Hit
            }
            Outcome::CorrectRejection => {
                score.correct_rejections -= 1;
                score.false_alarms += 1;
                Outcome::FalseAlarm
            }
            Outcome::Hit | Outcome::FalseAlarm => return None,
        };
        Some(amended)
    }

    pub fn score(&self, modality: Modality) -> ModalityScore {
        self.scores[modality]
    }

    pub fn scores(&self) -> PerModality<ModalityScore> {
        self.scores
    }

    pub fn total(&self) -> ModalityScore {
        self.scores.position.merged(&self.scores.audio)
    }

    /// Accuracy over both modalities' summed counts.
    pub fn accuracy(&self) -> f64 {
        self.total().accuracy()
    }
}
