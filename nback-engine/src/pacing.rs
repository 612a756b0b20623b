use crate::config::PacingMode;

const ERROR_STEP_SECS: f64 = 0.1;
const HIT_STEP_SECS: f64 = 0.05;
const MAX_WIDENING_SECS: f64 = 1.0;
const MAX_TIGHTENING_SECS: f64 = 0.5;
const FLOOR_SECS: f64 = 0.1;

pub(crate) fn secs_to_ms(secs: f64) -> u64 {
    (secs * 1000.0).round().max(0.0) as u64
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Active pacing policy of a session, with the state it carries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pacing {
    Standard,
    Dynamic { running_secs: f64 },
    SelfPaced,
}

impl Pacing {
    pub fn new(mode: PacingMode, base_secs: f64) -> Self {
        match mode {
            PacingMode::Standard => Pacing::Standard,
            PacingMode::Dynamic => Pacing::Dynamic {
                running_secs: base_secs,
            },
            PacingMode::SelfPaced => Pacing::SelfPaced,
        }
    }

    /// Interval currently in force, for display.
    pub fn interval_secs(&self, base_secs: f64) -> f64 {
        match self {
            Pacing::Dynamic { running_secs } => *running_secs,
            Pacing::Standard | Pacing::SelfPaced => base_secs,
        }
    }

    /// Delay before the advance timer fires; `None` when advance is manual.
    pub fn advance_delay_ms(&self, base_secs: f64) -> Option<u64> {
        match self {
            Pacing::SelfPaced => None,
            _ => Some(secs_to_ms(self.interval_secs(base_secs))),
        }
    }

    /// Feeds one resolved trial back into the policy. Only dynamic pacing reacts.
    pub fn adjust(&mut self, base_secs: f64, had_error: bool, had_hit: bool) -> f64 {
        if let Pacing::Dynamic { running_secs } = self {
            *running_secs = next_dynamic_interval(*running_secs, base_secs, had_error, had_hit);
        }
        self.interval_secs(base_secs)
    }
}

/// Errors widen the interval by 0.1s up to `base + 1.0`; clean hits tighten it
/// by 0.05s down to `max(0.1, base - 0.5)`. Errors take precedence.
pub fn next_dynamic_interval(
    running_secs: f64,
    base_secs: f64,
    had_error: bool,
    had_hit: bool,
) -> f64 {
    if had_error {
        let raised = round2(running_secs + ERROR_STEP_SECS).max(base_secs);
        raised.min(round2(base_secs + MAX_WIDENING_SECS))
    } else if had_hit {
        let floor = FLOOR_SECS.max(round2(base_secs - MAX_TIGHTENING_SECS));
        round2(running_secs - HIT_STEP_SECS).max(floor)
    } else {
        running_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn one_error_then_hits_stays_clamped() {
        let mut pacing = Pacing::new(PacingMode::Dynamic, 3.0);
        assert_eq!(pacing.advance_delay_ms(3.0), Some(3000));

        let after_error = pacing.adjust(3.0, true, false);
        assert!(close(after_error, 3.1));

        let mut expected = 3.1;
        for _ in 0..9 {
            let next = pacing.adjust(3.0, false, true);
            expected = f64::max(expected - 0.05, 2.5);
            assert!(close(next, expected), "{next} != {expected}");
            assert!((2.5..=4.0).contains(&next));
        }
        assert!(close(pacing.interval_secs(3.0), 2.65));

        for _ in 0..20 {
            pacing.adjust(3.0, false, true);
        }
        assert!(close(pacing.interval_secs(3.0), 2.5));
        assert_eq!(pacing.advance_delay_ms(3.0), Some(2500));
    }

    #[test]
    fn errors_cap_at_one_second_over_base() {
        let mut running = 3.0;
        for _ in 0..15 {
            running = next_dynamic_interval(running, 3.0, true, true);
            assert!((3.0..=4.0).contains(&running));
        }
        assert!(close(running, 4.0));
    }

    #[test]
    fn error_from_below_base_jumps_back_to_base() {
        assert!(close(next_dynamic_interval(2.6, 3.0, true, false), 3.0));
    }

    #[test]
    fn floor_never_below_a_tenth() {
        let mut running = 0.3;
        for _ in 0..10 {
            running = next_dynamic_interval(running, 0.3, false, true);
        }
        assert!(close(running, 0.1));
    }

    #[test]
    fn unscored_trial_leaves_interval_alone() {
        assert!(close(next_dynamic_interval(3.3, 3.0, false, false), 3.3));
    }

    #[test]
    fn static_modes() {
        let mut standard = Pacing::new(PacingMode::Standard, 2.0);
        assert_eq!(standard.adjust(2.0, true, false), 2.0);
        assert_eq!(standard.advance_delay_ms(2.0), Some(2000));
        assert_eq!(Pacing::new(PacingMode::SelfPaced, 2.0).advance_delay_ms(2.0), None);
    }
}
