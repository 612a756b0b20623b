use nback_core::{CENTER_CELL, Cell, Letter, Modality, Stimulus, Trial};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Probability that a channel repeats the stimulus `lag` trials back.
pub const MATCH_RATE: f64 = 0.25;

/// The trials of one session, in presentation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sequence {
    trials: Vec<Trial>,
}

impl Sequence {
    pub fn from_trials(trials: Vec<Trial>) -> Self {
        Self { trials }
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Trial> {
        self.trials.get(index)
    }

    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }

    /// The trial that `index` is compared against, if it has one.
    /// Trials below their own lag floor have no reference.
    pub fn reference(&self, index: usize) -> Option<&Trial> {
        let lag = self.trials.get(index)?.lag;
        if lag == 0 {
            return None;
        }
        index.checked_sub(lag).and_then(|i| self.trials.get(i))
    }

    pub fn is_target(&self, index: usize, modality: Modality) -> bool {
        match (self.trials.get(index), self.reference(index)) {
            (Some(trial), Some(reference)) => trial.repeats(reference, modality),
            _ => false,
        }
    }
}

/// How per-trial lags are drawn once a session is past its first `max_n` trials.
#[derive(Debug, Clone, PartialEq)]
pub enum LagDistribution {
    Fixed(usize),
    /// Cumulative thresholds for lags `1..=len`, plus the expected lag.
    Weighted { thresholds: Vec<f64>, expected: f64 },
    /// All weights were zero: every sampled lag is 1.
    ForcedFirst,
}

impl LagDistribution {
    pub fn from_weights(max_n: usize, weights: &[u32]) -> Self {
        let uniform;
        let weights = if weights.len() == max_n {
            weights
        } else {
            warn!(
                max_n,
                given = weights.len(),
                "lag weights do not match n, using uniform weights"
            );
            uniform = vec![1; max_n];
            &uniform[..]
        };

        let sum: u64 = weights.iter().map(|w| u64::from(*w)).sum();
        if sum == 0 {
            warn!(max_n, "lag weights sum to zero, forcing lag 1");
            return LagDistribution::ForcedFirst;
        }

        let mut acc = 0.0;
        let thresholds = weights
            .iter()
            .map(|w| {
                acc += f64::from(*w) / sum as f64;
                acc
            })
            .collect();
        let weighted: u64 = weights
            .iter()
            .enumerate()
            .map(|(i, w)| (i as u64 + 1) * u64::from(*w))
            .sum();
        LagDistribution::Weighted {
            thresholds,
            expected: weighted as f64 / sum as f64,
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        match self {
            LagDistribution::Fixed(n) => *n,
            LagDistribution::ForcedFirst => 1,
            LagDistribution::Weighted { thresholds, .. } => {
                let r: f64 = rng.random();
                thresholds
                    .iter()
                    .position(|t| r < *t)
                    .map_or(thresholds.len(), |i| i + 1)
            }
        }
    }

    pub fn expected(&self) -> f64 {
        match self {
            LagDistribution::Fixed(n) => *n as f64,
            LagDistribution::ForcedFirst => 1.0,
            LagDistribution::Weighted { expected, .. } => *expected,
        }
    }
}

/// Builds session sequences from difficulty parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceGenerator {
    pub length: usize,
    pub max_n: usize,
    pub exclude_center: bool,
    pub variable: bool,
    pub lags: LagDistribution,
}

impl SequenceGenerator {
    pub fn new(
        length: usize,
        max_n: usize,
        allow_center_cell: bool,
        variable_mode: bool,
        weights: &[u32],
    ) -> Self {
        let max_n = max_n.max(1);
        let lags = if variable_mode {
            LagDistribution::from_weights(max_n, weights)
        } else {
            LagDistribution::Fixed(max_n)
        };
        Self {
            length,
            max_n,
            // the center cell shows the active lag in variable mode
            exclude_center: variable_mode || !allow_center_cell,
            variable: variable_mode,
            lags,
        }
    }

    /// Mean lag the session is played at, rounded to two decimals.
    pub fn effective_difficulty(&self) -> f64 {
        (self.lags.expected() * 100.0).round() / 100.0
    }

    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Sequence {
        let forbidden: &[Cell] = if self.exclude_center {
            &[CENTER_CELL]
        } else {
            &[]
        };
        let mut trials: Vec<Trial> = Vec::with_capacity(self.length);

        for i in 0..self.length {
            if i < self.max_n {
                let position = draw_excluding(rng, forbidden);
                let letter = draw_excluding::<Letter, _>(rng, &[]);
                trials.push(Trial::new(position, letter, self.max_n));
                continue;
            }

            let lag = if self.variable {
                self.lags.sample(rng)
            } else {
                self.max_n
            };
            let reference = trials[i - lag];

            let position = if rng.random_bool(MATCH_RATE) {
                reference.position
            } else {
                let mut excluded = forbidden.to_vec();
                excluded.push(reference.position);
                draw_excluding(rng, excluded.as_slice())
            };
            let letter = if rng.random_bool(MATCH_RATE) {
                reference.letter
            } else {
                draw_excluding(rng, &[reference.letter][..])
            };
            trials.push(Trial::new(position, letter, lag));
        }

        Sequence::from_trials(trials)
    }
}

/// Uniform draw from the alphabet minus `excluded`.
fn draw_excluding<S: Stimulus, R: Rng + ?Sized>(rng: &mut R, excluded: &[S]) -> S {
    let candidates: Vec<S> = S::all().filter(|s| !excluded.contains(s)).collect();
    candidates[rng.random_range(0..candidates.len())]
}
