use crate::error::ConfigError;
use crate::pacing::secs_to_ms;
use crate::sequence::SequenceGenerator;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const MIN_INTERVAL_SECS: f64 = 0.1;
pub const MAX_N: usize = 1_000;
pub const MAX_TRIALS: usize = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PacingMode {
    /// Fixed interval between trials.
    #[default]
    Standard,
    /// Interval widens after errors and tightens after clean hits.
    Dynamic,
    /// No timer; the player advances explicitly.
    SelfPaced,
}

impl FromStr for PacingMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "standard" => Ok(PacingMode::Standard),
            "dynamic" => Ok(PacingMode::Dynamic),
            "self-paced" | "selfpaced" => Ok(PacingMode::SelfPaced),
            _ => Err(ConfigError::UnknownPacing(s.to_string())),
        }
    }
}

/// How many trials a session runs for a given n.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RoundMode {
    /// `20 + n²`
    #[default]
    Standard,
    /// `20 + 4n`
    Linear,
    Custom {
        count: usize,
    },
}

impl RoundMode {
    /// Saturates at `usize::MAX` instead of overflowing.
    pub fn trial_count(&self, n: usize) -> usize {
        match self {
            RoundMode::Standard => n.saturating_mul(n).saturating_add(20),
            RoundMode::Linear => n.saturating_mul(4).saturating_add(20),
            RoundMode::Custom { count } => *count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub n: usize,
    pub rounds: RoundMode,
    pub use_center_cell: bool,
    pub variable_mode: bool,
    /// Relative weight of lag `i + 1` in variable mode.
    pub variable_weights: Vec<u32>,
    pub base_interval_secs: f64,
    /// How long the grid cell stays lit, independent of the interval.
    pub display_secs: f64,
    pub pacing: PacingMode,
    pub show_feedback: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            n: 2,
            rounds: RoundMode::Standard,
            use_center_cell: true,
            variable_mode: false,
            variable_weights: vec![1],
            base_interval_secs: 3.0,
            display_secs: 0.5,
            pacing: PacingMode::Standard,
            show_feedback: false,
        }
    }
}

impl SessionConfig {
    pub fn round_count(&self) -> usize {
        self.rounds.trial_count(self.n)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n == 0 {
            return Err(ConfigError::ZeroN);
        }
        if self.n > MAX_N {
            return Err(ConfigError::NTooLarge(self.n));
        }
        match self.round_count() {
            0 => return Err(ConfigError::NoTrials),
            count if count > MAX_TRIALS => return Err(ConfigError::TooManyTrials(count)),
            _ => {}
        }
        let interval = self.base_interval_secs;
        if !interval.is_finite() || interval < MIN_INTERVAL_SECS {
            return Err(ConfigError::IntervalTooShort(interval));
        }
        if !self.display_secs.is_finite() || self.display_secs < 0.0 {
            return Err(ConfigError::InvalidDisplay(self.display_secs));
        }
        Ok(())
    }

    pub fn generator(&self) -> SequenceGenerator {
        SequenceGenerator::new(
            self.round_count(),
            self.n,
            self.use_center_cell,
            self.variable_mode,
            &self.variable_weights,
        )
    }

    pub fn display_ms(&self) -> u64 {
        secs_to_ms(self.display_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_modes() {
        assert_eq!(RoundMode::Standard.trial_count(2), 24);
        assert_eq!(RoundMode::Linear.trial_count(3), 32);
        assert_eq!(RoundMode::Custom { count: 7 }.trial_count(9), 7);
    }

    #[test]
    fn defaults_are_valid() {
        let config = SessionConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.round_count(), 24);
        assert_eq!(config.display_ms(), 500);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let base = SessionConfig::default();
        let cases = [
            (SessionConfig { n: 0, ..base.clone() }, ConfigError::ZeroN),
            (
                SessionConfig {
                    rounds: RoundMode::Custom { count: 0 },
                    ..base.clone()
                },
                ConfigError::NoTrials,
            ),
            (
                SessionConfig {
                    base_interval_secs: 0.05,
                    ..base.clone()
                },
                ConfigError::IntervalTooShort(0.05),
            ),
            (
                SessionConfig {
                    display_secs: -1.0,
                    ..base.clone()
                },
                ConfigError::InvalidDisplay(-1.0),
            ),
        ];
        for (config, expected) in cases {
            assert_eq!(config.validate(), Err(expected));
        }
    }

    #[test]
    fn huge_sizes_are_rejected_without_overflow() {
        let base = SessionConfig::default();
        assert_eq!(RoundMode::Standard.trial_count(1 << 33), usize::MAX);
        assert_eq!(RoundMode::Linear.trial_count(usize::MAX), usize::MAX);

        let huge_n = SessionConfig {
            n: 1 << 33,
            ..base.clone()
        };
        assert_eq!(huge_n.validate(), Err(ConfigError::NTooLarge(1 << 33)));

        let squared = SessionConfig {
            n: 400,
            ..base.clone()
        };
        assert_eq!(squared.validate(), Err(ConfigError::TooManyTrials(160_020)));

        let custom = SessionConfig {
            rounds: RoundMode::Custom {
                count: MAX_TRIALS + 1,
            },
            ..base.clone()
        };
        assert_eq!(custom.validate(), Err(ConfigError::TooManyTrials(MAX_TRIALS + 1)));

        let largest = SessionConfig {
            n: MAX_N,
            rounds: RoundMode::Linear,
            ..base
        };
        assert_eq!(largest.validate(), Ok(()));
    }

    #[test]
    fn pacing_names_parse() {
        assert_eq!("self_paced".parse(), Ok(PacingMode::SelfPaced));
        assert_eq!(" Dynamic".parse(), Ok(PacingMode::Dynamic));
        assert!(matches!(
            "fast".parse::<PacingMode>(),
            Err(ConfigError::UnknownPacing(_))
        ));
    }

    #[test]
    fn deserializes_partial_json_over_defaults() {
        let raw =
            r#"{ "n": 3, "pacing": "self-paced", "rounds": { "mode": "custom", "count": 10 } }"#;
        let config: SessionConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.n, 3);
        assert_eq!(config.pacing, PacingMode::SelfPaced);
        assert_eq!(config.round_count(), 10);
        assert_eq!(config.base_interval_secs, 3.0);
    }
}
