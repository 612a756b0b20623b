use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Millisecond clock the trial engine runs on.
///
/// Timestamps are milliseconds since the timer was created. The engine never
/// reads wall-clock time directly, so sessions can run on a virtual clock.
pub trait Timer: Clone + Send + Sync {
    fn now(&self) -> u64;

    fn sleep(&self, d: Duration);

    fn elapsed(&self, ts: u64) -> Duration {
        Duration::from_millis(self.now().saturating_sub(ts))
    }

    /// Blocks until `deadline_ms`; returns at once if it has passed.
    fn sleep_until(&self, deadline_ms: u64) {
        let now = self.now();
        if deadline_ms > now {
            self.sleep(Duration::from_millis(deadline_ms - now));
        }
    }
}

/// Monotonic wall-clock timer with platform sleeps tuned for short waits.
#[derive(Debug, Clone)]
pub struct HighPrecisionTimer {
    pub start: Instant,
}

impl Timer for HighPrecisionTimer {
    fn now(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn sleep(&self, d: Duration) {
        self.high_precision_sleep(d)
    }
}

impl HighPrecisionTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn high_precision_sleep(&self, duration: Duration) {
        #[cfg(target_os = "linux")]
        self.linux_sleep(duration);
        #[cfg(not(target_os = "linux"))]
        std::thread::sleep(duration);
    }

    #[cfg(target_os = "linux")]
    fn linux_sleep(&self, duration: Duration) {
        use libc::{clock_nanosleep, timespec, CLOCK_MONOTONIC};

        let req = timespec {
            tv_sec: duration.as_secs() as libc::time_t,
            tv_nsec: duration.subsec_nanos() as libc::c_long,
        };

        unsafe {
            clock_nanosleep(CLOCK_MONOTONIC, 0, &req, std::ptr::null_mut());
        }
    }
}

impl Default for HighPrecisionTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Virtual clock. Clones share the same time; `sleep` advances it instantly.
#[derive(Debug, Clone, Default)]
pub struct ManualTimer {
    now_ms: Arc<AtomicU64>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(ms: u64) -> Self {
        let timer = Self::new();
        timer.set(ms);
        timer
    }

    /// Moves the clock to `ms`. Time never runs backwards.
    pub fn set(&self, ms: u64) {
        self.now_ms.fetch_max(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, d: Duration) {
        self.now_ms
            .fetch_add(d.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Timer for ManualTimer {
    fn now(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }

    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clones_share_time() {
        let timer = ManualTimer::new();
        let view = timer.clone();
        timer.advance(Duration::from_millis(250));
        assert_eq!(view.now(), 250);
        view.sleep_until(1_000);
        assert_eq!(timer.now(), 1_000);
        assert_eq!(timer.elapsed(400), Duration::from_millis(600));
    }

    #[test]
    fn manual_never_runs_backwards() {
        let timer = ManualTimer::starting_at(500);
        timer.set(100);
        assert_eq!(timer.now(), 500);
        timer.sleep_until(200);
        assert_eq!(timer.now(), 500);
    }

    #[test]
    fn high_precision_sleep_waits_at_least_requested() {
        let timer = HighPrecisionTimer::new();
        let before = timer.now();
        timer.sleep(Duration::from_millis(5));
        assert!(timer.now() >= before + 5);
    }
}
