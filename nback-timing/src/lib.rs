pub mod deadline;
pub mod timer;

pub use deadline::{Deadlines, TimerToken};
pub use timer::{HighPrecisionTimer, ManualTimer, Timer};
