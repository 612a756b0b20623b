use crate::pacing::Pacing;
use crate::score::SignalScorer;
use crate::sequence::Sequence;
use nback_core::{Feedback, Modality, PerModality, TrialRecord};

/// Everything one running session owns.
///
/// `pending` holds presses for the live trial; `previous` is the snapshot of
/// `pending` taken when the next trial began, read by the grace corrector.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub(crate) sequence: Sequence,
    pub(crate) current_index: usize,
    pub(crate) trial_started_at: u64,
    pub(crate) pacing: Pacing,
    pub(crate) pending: PerModality<bool>,
    pub(crate) previous: PerModality<bool>,
    pub(crate) feedback: PerModality<Option<Feedback>>,
    pub(crate) scorer: SignalScorer,
    pub(crate) records: Vec<TrialRecord>,
}

impl SessionState {
    pub fn new(sequence: Sequence, pacing: Pacing) -> Self {
        let capacity = sequence.len();
        Self {
            sequence,
            current_index: 0,
            trial_started_at: 0,
            pacing,
            pending: PerModality::default(),
            previous: PerModality::default(),
            feedback: PerModality::default(),
            scorer: SignalScorer::new(),
            records: Vec::with_capacity(capacity),
        }
    }

    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn pacing(&self) -> Pacing {
        self.pacing
    }

    pub fn pending(&self) -> PerModality<bool> {
        self.pending
    }

    pub fn scorer(&self) -> &SignalScorer {
        &self.scorer
    }

    pub fn records(&self) -> &[TrialRecord] {
        &self.records
    }

    /// Trials whose outcome has been committed.
    pub fn resolved_count(&self) -> usize {
        self.records.len()
    }

    /// Opens trial `index` at `started_at`.
    pub(crate) fn begin_trial(&mut self, index: usize, started_at: u64) {
        self.previous = self.pending;
        self.pending = PerModality::default();
        self.feedback = PerModality::default();
        self.current_index = index;
        self.trial_started_at = started_at;
    }

    /// Commits the live trial's outcome. This is the only place a trial's own
    /// score is written.
    pub(crate) fn resolve_current(&mut self) -> Option<TrialRecord> {
        let index = self.current_index;
        let trial = *self.sequence.get(index)?;
        let reference = self.sequence.reference(index).copied();
        let mut record = TrialRecord::unscored(index, trial);

        for modality in Modality::ALL {
            match reference {
                Some(reference) => {
                    let is_target = trial.repeats(&reference, modality);
                    let pressed = self.pending[modality];
                    let outcome = self.scorer.commit(index, modality, is_target, pressed);
                    record.outcomes[modality] = Some(outcome);
                }
                None => self.scorer.seal(modality),
            }
        }

        self.records.push(record.clone());
        Some(record)
    }
}
