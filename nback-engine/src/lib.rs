pub mod config;
pub mod error;
pub mod pacing;
pub mod resolver;
pub mod result;
pub mod scheduler;
pub mod score;
pub mod sequence;
pub mod state;

pub use config::{MAX_N, MAX_TRIALS, PacingMode, RoundMode, SessionConfig};
pub use error::ConfigError;
pub use pacing::Pacing;
pub use resolver::{GRACE_PERIOD_MS, Resolution};
pub use result::{ProgressionSink, SessionResult};
pub use scheduler::{LiveView, PRE_ROLL_MS, SchedulerEvent, TrialScheduler};
pub use score::{ModalityScore, SignalScorer, accuracy};
pub use sequence::{LagDistribution, MATCH_RATE, Sequence, SequenceGenerator};
pub use state::SessionState;
