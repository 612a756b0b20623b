pub mod modality;
pub mod phase;
pub mod stimulus;
pub mod trial;

pub use modality::{Modality, PerModality};
pub use phase::SessionPhase;
pub use stimulus::{CENTER_CELL, Cell, LETTERS, Letter, PlaybackSink, SilentPlayback, Stimulus};
pub use trial::{Feedback, Outcome, Trial, TrialRecord};
