//! Turns a press at an arbitrary timestamp into a scoring decision.
//!
//! A press in the first [`GRACE_PERIOD_MS`] of a trial is first offered to the
//! previous trial. If that trial could have been a target and this modality
//! went unanswered, the press is taken as late and the previous trial's
//! committed outcome is amended. Otherwise the press counts for the live
//! trial, where it is only recorded; scoring waits for resolution.

use crate::state::SessionState;
use nback_core::{Feedback, Modality, Outcome};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const GRACE_PERIOD_MS: u64 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// No trial was live.
    InvalidNoEffect,
    /// Previous trial's miss became a hit.
    ConvertedLateHit,
    /// Previous trial's correct rejection became a false alarm.
    ConvertedLateFalseAlarm,
    /// Recorded on the live trial, which is a target.
    NormalHit,
    /// Recorded on the live trial, which is not a target.
    NormalFalseAlarm,
    /// Below the lag floor, or a repeat press.
    Ignored,
}

impl Resolution {
    pub fn feedback(&self) -> Option<Feedback> {
        match self {
            Resolution::ConvertedLateHit | Resolution::NormalHit => Some(Feedback::Correct),
            Resolution::ConvertedLateFalseAlarm | Resolution::NormalFalseAlarm => {
                Some(Feedback::Wrong)
            }
            Resolution::InvalidNoEffect | Resolution::Ignored => None,
        }
    }

    pub fn is_conversion(&self) -> bool {
        matches!(
            self,
            Resolution::ConvertedLateHit | Resolution::ConvertedLateFalseAlarm
        )
    }
}

/// Resolves a press against the live trial of `state`.
pub fn resolve(state: &mut SessionState, modality: Modality, now: u64) -> Resolution {
    if let Some(resolution) = correct_previous(state, modality, now) {
        return resolution;
    }

    let index = state.current_index;
    let Some(trial) = state.sequence.get(index).copied() else {
        return Resolution::InvalidNoEffect;
    };
    let Some(reference) = state.sequence.reference(index).copied() else {
        debug!(trial = index, %modality, "press below lag floor ignored");
        return Resolution::Ignored;
    };
    if state.pending[modality] {
        return Resolution::Ignored;
    }

    state.pending[modality] = true;
    if trial.repeats(&reference, modality) {
        Resolution::NormalHit
    } else {
        Resolution::NormalFalseAlarm
    }
}

/// Grace-period branch. `None` means the press belongs to the live trial.
fn correct_previous(state: &mut SessionState, modality: Modality, now: u64) -> Option<Resolution> {
    let index = state.current_index;
    if index == 0 || now.saturating_sub(state.trial_started_at) >= GRACE_PERIOD_MS {
        return None;
    }
    let previous = index - 1;
    state.sequence.reference(previous)?;
    if state.previous[modality] {
        return None;
    }

    let amended = state.scorer.amend(modality, previous)?;
    state.previous[modality] = true;
    if let Some(record) = state.records.get_mut(previous) {
        record.outcomes[modality] = Some(amended);
        record.amended[modality] = true;
    }

    let resolution = match amended {
        Outcome::Hit => Resolution::ConvertedLateHit,
        _ => Resolution::ConvertedLateFalseAlarm,
    };
    debug!(trial = previous, %modality, ?resolution, "late press amended previous trial");
    Some(resolution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PacingMode;
    use crate::pacing::Pacing;
    use crate::sequence::Sequence;
    use nback_core::{Cell, Letter, Trial};

    fn trial(cell: u8, letter: char, lag: usize) -> Trial {
        Trial::new(Cell::new(cell).unwrap(), Letter::try_from(letter).unwrap(), lag)
    }

    /// N = 2. Trial 2 repeats trial 0's cell; trial 3 repeats nothing.
    fn state() -> SessionState {
        let sequence = Sequence::from_trials(vec![
            trial(0, 'c', 2),
            trial(1, 'h', 2),
            trial(0, 'k', 2),
            trial(5, 'c', 2),
        ]);
        SessionState::new(sequence, Pacing::new(PacingMode::Standard, 3.0))
    }

    fn run_to(state: &mut SessionState, index: usize, started_at: u64) {
        if index > 0 {
            state.resolve_current();
        }
        state.begin_trial(index, started_at);
    }

    #[test]
    fn presses_below_floor_are_ignored() {
        let mut s = state();
        run_to(&mut s, 0, 0);
        assert_eq!(resolve(&mut s, Modality::Position, 500), Resolution::Ignored);
        run_to(&mut s, 1, 3_000);
        // inside the grace window but trial 0 has no reference either
        assert_eq!(resolve(&mut s, Modality::Position, 3_050), Resolution::Ignored);
        assert_eq!(resolve(&mut s, Modality::Audio, 3_500), Resolution::Ignored);
        run_to(&mut s, 2, 6_000);
        assert_eq!(s.scorer.total(), Default::default());
    }

    #[test]
    fn normal_press_is_recorded_once_without_scoring() {
        let mut s = state();
        run_to(&mut s, 0, 0);
        run_to(&mut s, 1, 3_000);
        run_to(&mut s, 2, 6_000);
        assert_eq!(resolve(&mut s, Modality::Position, 6_400), Resolution::NormalHit);
        assert_eq!(resolve(&mut s, Modality::Position, 6_500), Resolution::Ignored);
        assert_eq!(resolve(&mut s, Modality::Audio, 6_600), Resolution::NormalFalseAlarm);
        assert!(s.pending[Modality::Position] && s.pending[Modality::Audio]);
        assert_eq!(s.scorer.total(), Default::default());
    }

    #[test]
    fn late_press_recovers_missed_target_exactly_once() {
        let mut s = state();
        run_to(&mut s, 0, 0);
        run_to(&mut s, 1, 3_000);
        run_to(&mut s, 2, 6_000);
        run_to(&mut s, 3, 9_000);
        assert_eq!(s.scorer.score(Modality::Position).misses, 1);

        assert_eq!(resolve(&mut s, Modality::Position, 9_100), Resolution::ConvertedLateHit);
        assert!(!s.pending[Modality::Position]);
        // second late press falls through to the live trial (position 5 vs 1: not a target)
        assert_eq!(
            resolve(&mut s, Modality::Position, 9_150),
            Resolution::NormalFalseAlarm
        );

        let position = s.scorer.score(Modality::Position);
        assert_eq!((position.hits, position.misses), (1, 0));
        assert!(s.records[2].amended[Modality::Position]);
        assert_eq!(s.records[2].outcomes[Modality::Position], Some(Outcome::Hit));
    }

    #[test]
    fn late_press_on_non_target_becomes_false_alarm() {
        let mut s = state();
        run_to(&mut s, 0, 0);
        run_to(&mut s, 1, 3_000);
        run_to(&mut s, 2, 6_000);
        run_to(&mut s, 3, 9_000);
        assert_eq!(
            resolve(&mut s, Modality::Audio, 9_199),
            Resolution::ConvertedLateFalseAlarm
        );
        let audio = s.scorer.score(Modality::Audio);
        assert_eq!((audio.false_alarms, audio.correct_rejections), (1, 0));
    }

    #[test]
    fn grace_window_closes_at_200ms() {
        let mut s = state();
        run_to(&mut s, 0, 0);
        run_to(&mut s, 1, 3_000);
        run_to(&mut s, 2, 6_000);
        run_to(&mut s, 3, 9_000);
        assert_eq!(resolve(&mut s, Modality::Position, 9_200), Resolution::NormalFalseAlarm);
        assert_eq!(s.scorer.score(Modality::Position).misses, 1);
    }

    #[test]
    fn answered_previous_trial_is_not_corrected() {
        let mut s = state();
        run_to(&mut s, 0, 0);
        run_to(&mut s, 1, 3_000);
        run_to(&mut s, 2, 6_000);
        resolve(&mut s, Modality::Position, 7_000);
        run_to(&mut s, 3, 9_000);
        assert_eq!(s.scorer.score(Modality::Position).hits, 1);
        assert_eq!(resolve(&mut s, Modality::Position, 9_050), Resolution::NormalFalseAlarm);
        assert_eq!(s.scorer.score(Modality::Position).hits, 1);
    }
}
