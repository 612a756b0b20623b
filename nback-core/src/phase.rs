/// Lifecycle of one training session.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    /// Fixed delay before the first trial so playback can unlock.
    PreRoll,
    /// Trial `i` is on screen.
    Presenting(usize),
    /// Trial `i` is still open for input but its cell has been cleared.
    AwaitingAdvance(usize),
    Finished,
}

impl SessionPhase {
    pub fn allows_input(&self) -> bool {
        matches!(self, Self::Presenting(_) | Self::AwaitingAdvance(_))
    }

    /// True while a session owns timers and state: pre-roll or any trial.
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            Self::PreRoll | Self::Presenting(_) | Self::AwaitingAdvance(_)
        )
    }

    pub fn trial_index(&self) -> Option<usize> {
        match self {
            Self::Presenting(i) | Self::AwaitingAdvance(i) => Some(*i),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_only_during_trials() {
        assert!(!SessionPhase::Idle.allows_input());
        assert!(!SessionPhase::PreRoll.allows_input());
        assert!(SessionPhase::Presenting(0).allows_input());
        assert!(SessionPhase::AwaitingAdvance(3).allows_input());
        assert!(!SessionPhase::Finished.allows_input());
        assert!(SessionPhase::PreRoll.is_live());
        assert_eq!(SessionPhase::AwaitingAdvance(3).trial_index(), Some(3));
    }
}
