use crate::modality::{Modality, PerModality};
use crate::stimulus::{Cell, Letter};
use serde::{Deserialize, Serialize};

/// A single generated trial. `lag` is the N this trial is judged against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trial {
    pub position: Cell,
    pub letter: Letter,
    pub lag: usize,
}

impl Trial {
    pub fn new(position: Cell, letter: Letter, lag: usize) -> Self {
        Self {
            position,
            letter,
            lag,
        }
    }

    /// Whether `self` repeats `other` on the given channel.
    pub fn repeats(&self, other: &Trial, modality: Modality) -> bool {
        match modality {
            Modality::Position => self.position == other.position,
            Modality::Audio => self.letter == other.letter,
        }
    }
}

/// Signal-detection class of one modality on one trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Hit,
    Miss,
    FalseAlarm,
    CorrectRejection,
}

impl Outcome {
    pub fn classify(is_target: bool, was_pressed: bool) -> Self {
        match (is_target, was_pressed) {
            (true, true) => Outcome::Hit,
            (true, false) => Outcome::Miss,
            (false, true) => Outcome::FalseAlarm,
            (false, false) => Outcome::CorrectRejection,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Miss | Outcome::FalseAlarm)
    }

    pub fn was_pressed(&self) -> bool {
        matches!(self, Outcome::Hit | Outcome::FalseAlarm)
    }
}

/// Immediate per-press feedback shown to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feedback {
    Correct,
    Wrong,
}

/// Recorded result per trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub index: usize,
    pub trial: Trial,
    /// `None` for trials below their lag floor, which are never scored.
    pub outcomes: PerModality<Option<Outcome>>,
    /// Set when a grace-period press rewrote the committed outcome.
    pub amended: PerModality<bool>,
}

impl TrialRecord {
    pub fn unscored(index: usize, trial: Trial) -> Self {
        Self {
            index,
            trial,
            outcomes: PerModality::default(),
            amended: PerModality::default(),
        }
    }

    pub fn had_error(&self) -> bool {
        self.outcomes
            .iter()
            .any(|(_, o)| o.is_some_and(|o| o.is_error()))
    }

    pub fn had_hit(&self) -> bool {
        self.outcomes
            .iter()
            .any(|(_, o)| *o == Some(Outcome::Hit))
    }
}
