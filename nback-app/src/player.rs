use nback_core::{Cell, Letter, Modality};
use nback_engine::{GRACE_PERIOD_MS, SchedulerEvent};
use rand::Rng;

/// Offset into the next trial at which a late press lands.
const LATE_OFFSET_MS: u64 = GRACE_PERIOD_MS / 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerProfile {
    /// Chance of answering a modality correctly on a scored trial.
    pub accuracy: f64,
    /// Share of target presses that slip into the next trial's grace window.
    pub late_rate: f64,
}

impl PlayerProfile {
    pub fn new(accuracy: f64, late_rate: f64) -> Self {
        Self {
            accuracy: unit(accuracy),
            late_rate: unit(late_rate),
        }
    }

    pub fn perfect() -> Self {
        Self::new(1.0, 0.0)
    }
}

fn unit(p: f64) -> f64 {
    if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Press(Modality),
    Advance,
}

/// Plays a session from the scheduler's events alone: it remembers every
/// stimulus it was shown and plans its presses against that memory.
pub struct SimulatedPlayer<R: Rng> {
    profile: PlayerProfile,
    rng: R,
    self_paced: bool,
    interval_ms: u64,
    seen: Vec<(Cell, Letter)>,
    /// Sorted by due time.
    planned: Vec<(u64, Action)>,
    carried: Vec<Modality>,
}

impl<R: Rng> SimulatedPlayer<R> {
    pub fn new(profile: PlayerProfile, rng: R, interval_ms: u64, self_paced: bool) -> Self {
        Self {
            profile,
            rng,
            self_paced,
            interval_ms,
            seen: Vec::new(),
            planned: Vec::new(),
            carried: Vec::new(),
        }
    }

    pub fn observe(&mut self, event: &SchedulerEvent) {
        match event {
            SchedulerEvent::SessionStarted { total_trials } => {
                self.seen = Vec::with_capacity(*total_trials);
                self.planned.clear();
                self.carried.clear();
            }
            SchedulerEvent::TrialPresented {
                index,
                started_at,
                position,
                letter,
                lag,
                ..
            } => self.on_trial(*index, *started_at, *position, *letter, *lag),
            SchedulerEvent::TrialResolved { interval_secs, .. } => {
                self.interval_ms = (interval_secs * 1000.0).round() as u64;
            }
            SchedulerEvent::Finished(_) => {
                self.planned.clear();
                self.carried.clear();
            }
            SchedulerEvent::StimulusHidden { .. } | SchedulerEvent::ScoreAmended { .. } => {}
        }
    }

    pub fn next_due(&self) -> Option<u64> {
        self.planned.first().map(|(at, _)| *at)
    }

    /// Removes and returns every action due at or before `now`, in order.
    pub fn take_due(&mut self, now: u64) -> Vec<(u64, Action)> {
        let split = self.planned.partition_point(|(at, _)| *at <= now);
        self.planned.drain(..split).collect()
    }

    fn on_trial(
        &mut self,
        index: usize,
        started_at: u64,
        position: Cell,
        letter: Letter,
        lag: usize,
    ) {
        for modality in self.carried.drain(..) {
            self.planned
                .push((started_at + LATE_OFFSET_MS, Action::Press(modality)));
        }

        let reference = index
            .checked_sub(lag)
            .filter(|_| lag > 0)
            .and_then(|i| self.seen.get(i))
            .copied();
        self.seen.truncate(index);
        self.seen.push((position, letter));

        if let Some((ref_position, ref_letter)) = reference {
            for modality in Modality::ALL {
                let is_target = match modality {
                    Modality::Position => ref_position == position,
                    Modality::Audio => ref_letter == letter,
                };
                let correct = self.rng.random_bool(self.profile.accuracy);
                if is_target != correct {
                    continue;
                }
                if is_target && self.rng.random_bool(self.profile.late_rate) {
                    self.carried.push(modality);
                    continue;
                }
                let at = started_at + self.reaction_ms();
                self.planned.push((at, Action::Press(modality)));
            }
        }

        if self.self_paced {
            self.planned
                .push((started_at + self.interval_ms, Action::Advance));
        }
        self.planned.sort_by_key(|(at, _)| *at);
    }

    /// Past the grace window, well before the next trial.
    fn reaction_ms(&mut self) -> u64 {
        let window = self.interval_ms.saturating_sub(GRACE_PERIOD_MS) / 2;
        GRACE_PERIOD_MS + self.rng.random_range(0..=window)
    }
}
