/// Identity of one armed timer. Cancelling or firing retires the token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(u64);

#[derive(Debug, Clone)]
struct Armed {
    token: TimerToken,
    due_ms: u64,
}

/// Set of pending one-shot timers, addressed only by their tokens.
///
/// Nothing here sleeps. The owner polls [`Deadlines::pop_due`] with the
/// current time and sleeps until [`Deadlines::next_due`] in between. What a
/// timer means is up to the owner, which keeps the token it was handed.
#[derive(Debug, Clone, Default)]
pub struct Deadlines {
    next_token: u64,
    armed: Vec<Armed>,
}

impl Deadlines {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, due_ms: u64) -> TimerToken {
        let token = TimerToken(self.next_token);
        self.next_token += 1;
        self.armed.push(Armed { token, due_ms });
        token
    }

    /// Returns false if `token` already fired or was cancelled.
    pub fn cancel(&mut self, token: TimerToken) -> bool {
        let before = self.armed.len();
        self.armed.retain(|a| a.token != token);
        self.armed.len() != before
    }

    pub fn cancel_all(&mut self) {
        self.armed.clear();
    }

    pub fn next_due(&self) -> Option<u64> {
        self.armed.iter().map(|a| a.due_ms).min()
    }

    /// Removes and returns the earliest timer due at or before `now_ms`.
    /// Timers due at the same instant come out in the order they were armed.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<(TimerToken, u64)> {
        let pos = self
            .armed
            .iter()
            .enumerate()
            .filter(|(_, a)| a.due_ms <= now_ms)
            .min_by_key(|(_, a)| (a.due_ms, a.token))
            .map(|(i, _)| i)?;
        let fired = self.armed.remove(pos);
        Some((fired.token, fired.due_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_due_order_then_arm_order() {
        let mut d = Deadlines::new();
        let late = d.arm(400);
        let first = d.arm(300);
        let second = d.arm(300);
        assert_eq!(d.next_due(), Some(300));
        assert!(d.pop_due(299).is_none());
        assert_eq!(d.pop_due(300), Some((first, 300)));
        assert_eq!(d.pop_due(300), Some((second, 300)));
        assert!(d.pop_due(399).is_none());
        assert_eq!(d.pop_due(u64::MAX), Some((late, 400)));
        assert_eq!(d.next_due(), None);
    }

    #[test]
    fn cancelled_and_fired_tokens_are_stale() {
        let mut d = Deadlines::new();
        let hide = d.arm(100);
        let advance = d.arm(200);
        assert!(d.cancel(hide));
        assert!(!d.cancel(hide));
        assert_eq!(d.pop_due(u64::MAX), Some((advance, 200)));
        assert!(!d.cancel(advance));
        assert_eq!(d.next_due(), None);
    }

    #[test]
    fn cancel_all_drops_every_timer() {
        let mut d = Deadlines::new();
        let a = d.arm(10);
        d.arm(20);
        d.cancel_all();
        assert!(d.pop_due(u64::MAX).is_none());
        assert_eq!(d.next_due(), None);
        assert!(!d.cancel(a));
        assert_ne!(d.arm(5), a);
    }
}
