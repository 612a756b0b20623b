use thiserror::Error;

/// Session configuration outside its accepted ranges.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("n must be at least 1")]
    ZeroN,
    #[error("n = {0} is above the supported maximum of {max}", max = crate::config::MAX_N)]
    NTooLarge(usize),
    #[error("a session needs at least one trial")]
    NoTrials,
    #[error("{0} trials is above the supported maximum of {max}", max = crate::config::MAX_TRIALS)]
    TooManyTrials(usize),
    #[error("base interval {0}s is below the 0.1s minimum")]
    IntervalTooShort(f64),
    #[error("display duration {0}s must be a finite, non-negative number")]
    InvalidDisplay(f64),
    #[error("unknown pacing mode `{0}` (expected standard, dynamic or self-paced)")]
    UnknownPacing(String),
}
