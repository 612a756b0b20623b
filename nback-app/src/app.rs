use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Context, Result, ensure};
use nback_core::{Letter, PlaybackSink};
use nback_engine::{PacingMode, SchedulerEvent, SessionConfig, SessionResult, TrialScheduler};
use nback_timing::Timer;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};

use crate::player::{Action, PlayerProfile, SimulatedPlayer};

/// Letters go to the log instead of a speaker.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPlayback;

impl PlaybackSink for TracingPlayback {
    fn play(&mut self, letter: Letter) {
        debug!(%letter, "letter played");
    }
}

/// Drives one session against a simulated player.
///
/// The loop sleeps until the earlier of the scheduler's next timer and the
/// player's next action, so it runs unchanged on a real or a virtual clock.
/// Each pass handles a single instant; a sleep that overshoots is caught up
/// deadline by deadline instead of resolving several trials at once.
pub struct App<T: Timer> {
    scheduler: TrialScheduler<T, StdRng>,
    player: SimulatedPlayer<StdRng>,
    stop_after: Option<usize>,
    result: Rc<RefCell<Option<SessionResult>>>,
}

impl<T: Timer> App<T> {
    pub fn new(
        config: SessionConfig,
        timer: T,
        mut rng: StdRng,
        profile: PlayerProfile,
        stop_after: Option<usize>,
    ) -> Result<Self> {
        let player_rng = StdRng::from_rng(&mut rng);
        let interval_ms = (config.base_interval_secs * 1000.0).round() as u64;
        let self_paced = config.pacing == PacingMode::SelfPaced;

        let result = Rc::new(RefCell::new(None));
        let slot = Rc::clone(&result);
        let scheduler = TrialScheduler::new(config, timer, rng)
            .context("invalid session configuration")?
            .with_playback(TracingPlayback)
            .with_progression(move |finished: &SessionResult| {
                *slot.borrow_mut() = Some(finished.clone());
            });

        Ok(Self {
            scheduler,
            player: SimulatedPlayer::new(profile, player_rng, interval_ms, self_paced),
            stop_after,
            result,
        })
    }

    pub fn run(mut self) -> Result<SessionResult> {
        ensure!(self.scheduler.start(), "session could not be started");
        info!(
            effective_difficulty = self.scheduler.effective_difficulty(),
            "simulated player joined"
        );

        let mut resolved = 0;
        let mut instant = self.scheduler.timer.now();
        loop {
            for event in self.scheduler.update_at(instant) {
                self.player.observe(&event);
                match &event {
                    SchedulerEvent::TrialResolved {
                        record,
                        interval_secs,
                    } => {
                        resolved += 1;
                        info!(
                            trial = record.index,
                            position = ?record.outcomes.position,
                            audio = ?record.outcomes.audio,
                            interval_secs,
                            "trial"
                        );
                    }
                    SchedulerEvent::ScoreAmended {
                        index, resolution, ..
                    } => {
                        info!(trial = index, ?resolution, "late press");
                    }
                    _ => {}
                }
            }

            if !self.scheduler.is_running() {
                break;
            }
            if self.stop_after.is_some_and(|limit| resolved >= limit) {
                info!(resolved, "stopping early");
                self.scheduler.stop_at(instant);
                break;
            }

            instant = [self.scheduler.next_deadline(), self.player.next_due()]
                .into_iter()
                .flatten()
                .min()
                .context("session stalled with nothing scheduled")?;
            self.scheduler.timer.sleep_until(instant);

            for (at, action) in self.player.take_due(instant) {
                match action {
                    Action::Press(modality) => {
                        let resolution = self.scheduler.press(modality, at);
                        debug!(%modality, ?resolution, at, "press");
                    }
                    Action::Advance => {
                        self.scheduler.advance_at(at);
                    }
                }
            }
        }

        self.result
            .borrow_mut()
            .take()
            .context("session ended without a result")
    }
}
