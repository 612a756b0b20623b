use crate::config::{PacingMode, SessionConfig};
use crate::error::ConfigError;
use crate::pacing::Pacing;
use crate::resolver::{self, Resolution};
use crate::result::{ProgressionSink, SessionResult};
use crate::sequence::{Sequence, SequenceGenerator};
use crate::state::SessionState;
use nback_core::{
    Cell, Feedback, Letter, Modality, PerModality, PlaybackSink, SessionPhase, SilentPlayback,
    TrialRecord,
};
use nback_timing::{Deadlines, Timer, TimerToken};
use rand::Rng;
use tracing::{debug, info, warn};

/// Delay between `start()` and the first trial, giving playback time to unlock.
pub const PRE_ROLL_MS: u64 = 2_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    PreRoll,
    HideStimulus,
    Advance,
}

/// Tokens of the timers the scheduler owns, at most one per kind. A fired
/// token that no slot holds is stale and does nothing.
#[derive(Debug, Default, Clone, Copy)]
struct TimerSlots {
    pre_roll: Option<TimerToken>,
    hide: Option<TimerToken>,
    advance: Option<TimerToken>,
}

impl TimerSlots {
    fn slot(&mut self, kind: TimerKind) -> &mut Option<TimerToken> {
        match kind {
            TimerKind::PreRoll => &mut self.pre_roll,
            TimerKind::HideStimulus => &mut self.hide,
            TimerKind::Advance => &mut self.advance,
        }
    }

    /// Releases the slot holding `token` and reports its kind.
    fn claim(&mut self, token: TimerToken) -> Option<TimerKind> {
        [TimerKind::PreRoll, TimerKind::HideStimulus, TimerKind::Advance]
            .into_iter()
            .find(|kind| {
                let slot = self.slot(*kind);
                slot.take_if(|held| *held == token).is_some()
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerEvent {
    SessionStarted {
        total_trials: usize,
    },
    TrialPresented {
        index: usize,
        started_at: u64,
        position: Cell,
        letter: Letter,
        lag: usize,
        lag_display: Option<usize>,
    },
    StimulusHidden {
        index: usize,
    },
    TrialResolved {
        record: TrialRecord,
        /// Interval that will pace the next trial.
        interval_secs: f64,
    },
    ScoreAmended {
        index: usize,
        modality: Modality,
        resolution: Resolution,
    },
    Finished(SessionResult),
}

/// Read-only projection of the live trial for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveView {
    pub phase: SessionPhase,
    pub trial: Option<usize>,
    pub total_trials: usize,
    /// Lit grid cell; `None` once the display duration has passed.
    pub cell: Option<Cell>,
    pub lag_display: Option<usize>,
    pub pressed: PerModality<bool>,
    pub feedback: PerModality<Option<Feedback>>,
    pub interval_secs: f64,
}

/// Walks a generated sequence trial by trial.
///
/// Single-threaded: timer expiry is polled through [`TrialScheduler::update`]
/// and every input first fires the timers due at its timestamp, so trial `i`
/// always resolves before trial `i + 1` is presented.
pub struct TrialScheduler<T, R>
where
    T: Timer,
    R: Rng,
{
    pub timer: T,
    pub rng: R,
    config: SessionConfig,
    generator: SequenceGenerator,
    phase: SessionPhase,
    session: Option<SessionState>,
    deadlines: Deadlines,
    timers: TimerSlots,
    lag_display: Option<usize>,
    playback: Box<dyn PlaybackSink>,
    progression: Option<Box<dyn ProgressionSink>>,
    events: Vec<SchedulerEvent>,
    last_result: Option<SessionResult>,
}

impl<T, R> TrialScheduler<T, R>
where
    T: Timer,
    R: Rng,
{
    pub fn new(config: SessionConfig, timer: T, rng: R) -> Result<Self, ConfigError> {
        config.validate()?;
        let generator = config.generator();
        Ok(Self {
            timer,
            rng,
            config,
            generator,
            phase: SessionPhase::Idle,
            session: None,
            deadlines: Deadlines::new(),
            timers: TimerSlots::default(),
            lag_display: None,
            playback: Box::new(SilentPlayback),
            progression: None,
            events: Vec::new(),
            last_result: None,
        })
    }

    pub fn with_playback(mut self, playback: impl PlaybackSink + 'static) -> Self {
        self.playback = Box::new(playback);
        self
    }

    pub fn with_progression(mut self, progression: impl ProgressionSink + 'static) -> Self {
        self.progression = Some(Box::new(progression));
        self
    }

    /// Generates a fresh sequence and begins the pre-roll.
    pub fn start(&mut self) -> bool {
        if self.phase.is_live() {
            warn!(phase = ?self.phase, "start ignored, a session is already running");
            return false;
        }
        let sequence = self.generator.generate(&mut self.rng);
        self.start_with(sequence)
    }

    /// Begins the pre-roll for a caller-supplied sequence.
    pub fn start_with(&mut self, sequence: Sequence) -> bool {
        if self.phase.is_live() {
            warn!(phase = ?self.phase, "start ignored, a session is already running");
            return false;
        }
        if sequence.is_empty() {
            warn!("start ignored, sequence is empty");
            return false;
        }

        let total_trials = sequence.len();
        let pacing = Pacing::new(self.config.pacing, self.config.base_interval_secs);
        self.session = Some(SessionState::new(sequence, pacing));
        self.last_result = None;
        self.lag_display = None;
        self.disarm_all();

        let now = self.timer.now();
        self.arm(TimerKind::PreRoll, now + PRE_ROLL_MS);
        self.phase = SessionPhase::PreRoll;
        info!(
            total_trials,
            n = self.config.n,
            variable = self.config.variable_mode,
            pacing = ?self.config.pacing,
            "session started"
        );
        self.events.push(SchedulerEvent::SessionStarted { total_trials });
        true
    }

    /// Fires every timer due by now and drains pending events.
    pub fn update(&mut self) -> Vec<SchedulerEvent> {
        let now = self.timer.now();
        self.update_at(now)
    }

    /// Fires only the timers due by `at`. Drivers that fell behind the clock
    /// use it to replay deadlines one instant at a time.
    pub fn update_at(&mut self, at: u64) -> Vec<SchedulerEvent> {
        self.fire_due(at);
        std::mem::take(&mut self.events)
    }

    /// Drains pending events without touching timers.
    pub fn take_events(&mut self) -> Vec<SchedulerEvent> {
        std::mem::take(&mut self.events)
    }

    /// Player pressed `modality` at timestamp `at` (timer milliseconds).
    pub fn press(&mut self, modality: Modality, at: u64) -> Resolution {
        self.fire_due(at);
        if !self.phase.allows_input() {
            debug!(phase = ?self.phase, %modality, "press with no live trial");
            return Resolution::InvalidNoEffect;
        }
        let Some(session) = self.session.as_mut() else {
            return Resolution::InvalidNoEffect;
        };

        let resolution = resolver::resolve(session, modality, at);
        if self.config.show_feedback {
            if let Some(feedback) = resolution.feedback() {
                session.feedback[modality] = Some(feedback);
            }
        }
        if resolution.is_conversion() {
            self.events.push(SchedulerEvent::ScoreAmended {
                index: session.current_index() - 1,
                modality,
                resolution,
            });
        }
        resolution
    }

    pub fn press_now(&mut self, modality: Modality) -> Resolution {
        let now = self.timer.now();
        self.press(modality, now)
    }

    /// Manual advance. Only self-paced sessions accept it.
    pub fn advance(&mut self) -> bool {
        let now = self.timer.now();
        self.advance_at(now)
    }

    /// Manual advance at timestamp `at`; the next trial starts there.
    pub fn advance_at(&mut self, at: u64) -> bool {
        self.fire_due(at);
        if self.config.pacing != PacingMode::SelfPaced {
            debug!(pacing = ?self.config.pacing, "manual advance ignored in timed pacing");
            return false;
        }
        if !self.phase.allows_input() {
            debug!(phase = ?self.phase, "manual advance with no live trial");
            return false;
        }
        self.complete_trial(at);
        true
    }

    /// Ends the session early, scoring only the trials already resolved.
    /// Returns `None` if no session was running.
    pub fn stop(&mut self) -> Option<SessionResult> {
        let now = self.timer.now();
        self.stop_at(now)
    }

    /// Like [`TrialScheduler::stop`], but only timers due by `at` fire first.
    pub fn stop_at(&mut self, at: u64) -> Option<SessionResult> {
        self.fire_due(at);
        if !self.phase.is_live() {
            return None;
        }
        self.disarm_all();
        info!(phase = ?self.phase, "session stopped");
        self.finish()
    }

    /// Earliest pending timer, for drivers that sleep between polls.
    pub fn next_deadline(&self) -> Option<u64> {
        self.deadlines.next_due()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase.is_live()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn session(&self) -> Option<&SessionState> {
        self.session.as_ref()
    }

    pub fn sequence(&self) -> Option<&Sequence> {
        self.session.as_ref().map(|s| s.sequence())
    }

    pub fn last_result(&self) -> Option<&SessionResult> {
        self.last_result.as_ref()
    }

    pub fn effective_difficulty(&self) -> f64 {
        self.generator.effective_difficulty()
    }

    pub fn current_interval_secs(&self) -> f64 {
        let base = self.config.base_interval_secs;
        self.session
            .as_ref()
            .map_or(base, |s| s.pacing().interval_secs(base))
    }

    pub fn view(&self) -> LiveView {
        let session = self.session.as_ref();
        let cell = match (self.phase, session) {
            (SessionPhase::Presenting(i), Some(s)) => s.sequence().get(i).map(|t| t.position),
            _ => None,
        };
        LiveView {
            phase: self.phase,
            trial: self.phase.trial_index(),
            total_trials: session.map_or(0, |s| s.sequence().len()),
            cell,
            lag_display: self.lag_display,
            pressed: session.map(|s| s.pending()).unwrap_or_default(),
            feedback: session.map(|s| s.feedback).unwrap_or_default(),
            interval_secs: self.current_interval_secs(),
        }
    }

    /// Arms `kind`, cancelling the timer that kind held before.
    fn arm(&mut self, kind: TimerKind, due_ms: u64) {
        let token = self.deadlines.arm(due_ms);
        if let Some(previous) = self.timers.slot(kind).replace(token) {
            self.deadlines.cancel(previous);
        }
    }

    fn disarm(&mut self, kind: TimerKind) {
        if let Some(token) = self.timers.slot(kind).take() {
            self.deadlines.cancel(token);
        }
    }

    fn disarm_all(&mut self) {
        self.deadlines.cancel_all();
        self.timers = TimerSlots::default();
    }

    fn fire_due(&mut self, now: u64) {
        while let Some((token, due)) = self.deadlines.pop_due(now) {
            let Some(kind) = self.timers.claim(token) else {
                debug!(?token, due, "stale timer skipped");
                continue;
            };
            match kind {
                TimerKind::PreRoll => self.present(0, due),
                TimerKind::HideStimulus => self.hide_stimulus(),
                TimerKind::Advance => self.complete_trial(due),
            }
        }
    }

    fn present(&mut self, index: usize, at: u64) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(trial) = session.sequence().get(index).copied() else {
            return;
        };

        session.begin_trial(index, at);
        let lag_display =
            (self.config.variable_mode && index >= self.config.n).then_some(trial.lag);
        self.lag_display = lag_display;
        self.phase = SessionPhase::Presenting(index);
        self.playback.play(trial.letter);

        let advance_delay = session
            .pacing()
            .advance_delay_ms(self.config.base_interval_secs);
        self.arm(TimerKind::HideStimulus, at + self.config.display_ms());
        match advance_delay {
            Some(delay) => self.arm(TimerKind::Advance, at + delay),
            None => self.disarm(TimerKind::Advance),
        }

        debug!(
            trial = index,
            cell = %trial.position,
            letter = %trial.letter,
            lag = trial.lag,
            "trial presented"
        );
        self.events.push(SchedulerEvent::TrialPresented {
            index,
            started_at: at,
            position: trial.position,
            letter: trial.letter,
            lag: trial.lag,
            lag_display,
        });
    }

    fn hide_stimulus(&mut self) {
        if let SessionPhase::Presenting(index) = self.phase {
            self.phase = SessionPhase::AwaitingAdvance(index);
            self.lag_display = None;
            self.events.push(SchedulerEvent::StimulusHidden { index });
        }
    }

    fn complete_trial(&mut self, at: u64) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(record) = session.resolve_current() else {
            return;
        };

        let base = self.config.base_interval_secs;
        let interval_secs = session
            .pacing
            .adjust(base, record.had_error(), record.had_hit());
        let next = record.index + 1;
        let has_next = next < session.sequence().len();

        debug!(
            trial = record.index,
            position = ?record.outcomes.position,
            audio = ?record.outcomes.audio,
            interval_secs,
            "trial resolved"
        );
        self.events.push(SchedulerEvent::TrialResolved {
            record,
            interval_secs,
        });

        if has_next {
            self.present(next, at);
        } else {
            self.finish();
        }
    }

    fn finish(&mut self) -> Option<SessionResult> {
        self.disarm_all();
        let session = self.session.take()?;
        let difficulty = self.generator.effective_difficulty();
        let result = SessionResult::from_state(&session, &self.config, difficulty);

        self.phase = SessionPhase::Finished;
        self.lag_display = None;
        info!(
            trials_completed = result.trials_completed,
            total_trials = result.total_trials,
            accuracy = result.accuracy,
            elapsed_seconds = result.elapsed_seconds,
            "session finished"
        );

        if let Some(progression) = self.progression.as_mut() {
            progression.submit(&result);
        }
        self.events.push(SchedulerEvent::Finished(result.clone()));
        self.last_result = Some(result.clone());
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nback_core::Trial;
    use nback_timing::ManualTimer;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn scheduler(config: SessionConfig) -> (TrialScheduler<ManualTimer, StdRng>, ManualTimer) {
        let timer = ManualTimer::new();
        let scheduler =
            TrialScheduler::new(config, timer.clone(), StdRng::seed_from_u64(3)).unwrap();
        (scheduler, timer)
    }

    fn fixed(cells: &[u8], lag: usize) -> Sequence {
        Sequence::from_trials(
            cells
                .iter()
                .map(|c| Trial::new(Cell::new(*c).unwrap(), Letter::try_from('c').unwrap(), lag))
                .collect(),
        )
    }

    #[test]
    fn rejects_invalid_config() {
        let config = SessionConfig {
            base_interval_secs: 0.0,
            ..SessionConfig::default()
        };
        let result = TrialScheduler::new(config, ManualTimer::new(), StdRng::seed_from_u64(0));
        assert!(matches!(result, Err(ConfigError::IntervalTooShort(_))));
    }

    #[test]
    fn pre_roll_then_display_then_awaiting() {
        let (mut s, timer) = scheduler(SessionConfig::default());
        assert!(s.start());
        assert_eq!(s.phase(), SessionPhase::PreRoll);
        assert_eq!(s.next_deadline(), Some(PRE_ROLL_MS));

        timer.set(1_999);
        s.update();
        assert_eq!(s.phase(), SessionPhase::PreRoll);

        timer.set(2_000);
        s.update();
        assert_eq!(s.phase(), SessionPhase::Presenting(0));
        assert!(s.view().cell.is_some());

        timer.set(2_500);
        let events = s.update();
        assert_eq!(events, vec![SchedulerEvent::StimulusHidden { index: 0 }]);
        assert_eq!(s.phase(), SessionPhase::AwaitingAdvance(0));
        assert!(s.view().cell.is_none());

        timer.set(5_000);
        s.update();
        assert_eq!(s.phase(), SessionPhase::Presenting(1));
    }

    #[test]
    fn start_refused_while_running() {
        let (mut s, _timer) = scheduler(SessionConfig::default());
        assert!(s.start());
        assert!(!s.start());
        assert!(!s.start_with(fixed(&[0, 1], 1)));
    }

    #[test]
    fn long_display_is_cut_short_by_next_trial() {
        let config = SessionConfig {
            display_secs: 5.0,
            ..SessionConfig::default()
        };
        let (mut s, timer) = scheduler(config);
        s.start_with(fixed(&[0, 1, 2], 1));
        timer.set(5_000);
        let events = s.update();
        // trial 0's hide at 7000 was cancelled when trial 1 re-armed it
        assert_eq!(s.next_deadline(), Some(8_000));
        timer.set(7_000);
        assert!(s.update().is_empty());
        assert!(
            !events
                .iter()
                .any(|e| matches!(e, SchedulerEvent::StimulusHidden { .. }))
        );
        assert_eq!(s.phase(), SessionPhase::Presenting(1));
    }

    #[test]
    fn lag_display_only_in_variable_mode_after_n() {
        let config = SessionConfig {
            n: 2,
            variable_mode: true,
            variable_weights: vec![1, 1],
            ..SessionConfig::default()
        };
        let (mut s, timer) = scheduler(config);
        s.start_with(Sequence::from_trials(vec![
            Trial::new(Cell::new(0).unwrap(), Letter::try_from('c').unwrap(), 2),
            Trial::new(Cell::new(1).unwrap(), Letter::try_from('h').unwrap(), 2),
            Trial::new(Cell::new(2).unwrap(), Letter::try_from('k').unwrap(), 1),
        ]));
        timer.set(2_000);
        s.update();
        assert_eq!(s.view().lag_display, None);
        timer.set(8_000);
        s.update();
        assert_eq!(s.view().lag_display, Some(1));
        timer.set(8_500);
        s.update();
        assert_eq!(s.view().lag_display, None);
    }

    #[test]
    fn feedback_is_shown_only_when_enabled() {
        let config = SessionConfig {
            show_feedback: true,
            ..SessionConfig::default()
        };
        let (mut s, timer) = scheduler(config);
        s.start_with(fixed(&[0, 1, 0], 2));
        timer.set(8_500);
        assert_eq!(s.press_now(Modality::Position), Resolution::NormalHit);
        let view = s.view();
        assert_eq!(view.feedback[Modality::Position], Some(Feedback::Correct));
        assert!(view.pressed[Modality::Position]);

        let (mut quiet, timer) = scheduler(SessionConfig::default());
        quiet.start_with(fixed(&[0, 1, 0], 2));
        timer.set(8_500);
        quiet.press_now(Modality::Position);
        assert_eq!(quiet.view().feedback[Modality::Position], None);
    }
}
