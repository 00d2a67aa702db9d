//! Slap sequencer: the guarded state machine behind every slap.
//!
//! A trigger is accepted only while the sequencer is `Idle`. An accepted trigger
//! records the action, bumps the score, reads the current rate and turns it into a
//! per-stage duration. Every stage of the episode then goes to the scheduler as a
//! one-shot callback at `index * stage_duration`. The last stage hands the
//! sequencer back to `Idle`. Triggers that arrive while `Busy` are dropped, never
//! queued: two overlapping episodes would fight over which cheek frame is showing.
//!
//! Stage lists are plain data ([`Stage`]), so the order and timing of an episode can
//! be checked without running anything. The stock lists live in [`tween`] and
//! [`frames`].

use std::cell::RefCell;
use std::rc::Rc;
use core::time::Duration;

use crate::clock::Instant;
use crate::config::GameConfig;
use crate::error::ConfigError;
use crate::pose::{BasePose, Point};
use crate::rate::RateEstimator;
use crate::scheduler::{Scheduler, TimerHandle};
use crate::score::{NullScoreSink, ScoreSink, Scoreboard};

pub mod frames;
pub mod tween;

// --- Duration mapping -------------------------------------------------------

/// Rate → stage duration: `max(min, base - rate * speed_factor)`.
///
/// Non-increasing in `rate` and floored at `min`, which is at least 1 ms so every
/// stage lands on a distinct, schedulable offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DurationCurve {
    base: Duration,
    min: Duration,
    speed_factor: Duration,
}

impl DurationCurve {
    pub fn new(base: Duration, min: Duration, speed_factor: Duration) -> Self {
        Self {
            base,
            min: min.max(Duration::from_millis(1)),
            speed_factor,
        }
    }

    pub fn from_millis(base: u64, min: u64, speed_factor: u64) -> Self {
        Self::new(
            Duration::from_millis(base),
            Duration::from_millis(min),
            Duration::from_millis(speed_factor),
        )
    }

    pub fn duration_for(&self, rate: u32) -> Duration {
        self.base
            .saturating_sub(self.speed_factor.saturating_mul(rate))
            .max(self.min)
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn speed_factor(&self) -> Duration {
        self.speed_factor
    }
}

impl Default for DurationCurve {
    fn default() -> Self {
        Self::from_millis(300, 20, 200)
    }
}

// --- Stages & visual commands -----------------------------------------------

/// One step of an episode. Its offset is `index * stage_duration`.
#[derive(Clone, Debug, PartialEq)]
pub struct Stage<C> {
    pub label: &'static str,
    pub command: C,
}

impl<C> Stage<C> {
    pub fn new(label: &'static str, command: C) -> Self {
        Self { label, command }
    }
}

/// Scheduler offsets for an `count`-stage episode.
pub fn stage_offsets(count: usize, stage_duration: Duration) -> impl Iterator<Item = Duration> {
    (0..count).map(move |i| stage_duration.saturating_mul(u32::try_from(i).unwrap_or(u32::MAX)))
}

/// Timing context handed to the visual sink with each command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StageTiming {
    pub index: usize,
    pub count: usize,
    pub offset: Duration,
    pub stage_duration: Duration,
}

impl StageTiming {
    pub fn is_last(&self) -> bool {
        self.index + 1 == self.count
    }
}

/// Applies visual commands in the order they are emitted.
///
/// Called from scheduler callbacks; implementations must not call back into the
/// sequencer that owns them.
pub trait VisualSink<C> {
    fn apply(&mut self, command: &C, timing: StageTiming);
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HandPose {
    Hidden,
    At(Point),
    /// Move from `from` to `to` over the stage duration.
    Sweep { from: Point, to: Point },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheekFrame {
    Normal,
    Slapped,
}

/// Full visual state for one stage of the slap. Each command describes the whole
/// scene rather than a delta, so a sink never depends on having seen the previous
/// stage.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SlapVisual {
    pub hand: HandPose,
    pub cheek: CheekFrame,
    /// Starts the impact shake.
    pub impact: bool,
}

impl SlapVisual {
    pub const REST: SlapVisual = SlapVisual {
        hand: HandPose::Hidden,
        cheek: CheekFrame::Normal,
        impact: false,
    };
}

/// Which stock stage list an episode plays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SequenceVariant {
    /// Hand approach / impact / retract, interpolated per stage.
    #[default]
    Tween,
    /// Six discrete frame swaps.
    Frames,
}

impl SequenceVariant {
    pub fn stages(self, pose: &BasePose) -> Vec<Stage<SlapVisual>> {
        match self {
            SequenceVariant::Tween => tween::stages(pose),
            SequenceVariant::Frames => frames::stages(pose),
        }
    }
}

// --- State machine ----------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequencerState {
    Idle,
    Busy,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// An episode was already in flight; nothing changed.
    Ignored,
    Accepted {
        score: u64,
        rate: u32,
        stage_duration: Duration,
    },
}

impl Outcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Outcome::Accepted { .. })
    }
}

/// Values for the score / APS overlay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hud {
    pub score: u64,
    pub high_score: u64,
    pub rate: u32,
}

/// State shared with in-flight stage callbacks.
struct Guard {
    state: SequencerState,
    /// Bumped on every accepted trigger and on cancel; callbacks from an older
    /// episode see a mismatch and do nothing.
    episode: u64,
    pending: Vec<TimerHandle>,
}

pub struct SlapSequencer<C: 'static> {
    guard: Rc<RefCell<Guard>>,
    stages: Rc<[Stage<C>]>,
    sink: Rc<RefCell<dyn VisualSink<C>>>,
    scheduler: Rc<dyn Scheduler>,
    curve: DurationCurve,
    rate: RateEstimator,
    scoreboard: Scoreboard,
    score_sink: Box<dyn ScoreSink>,
}

impl<C: 'static> SlapSequencer<C> {
    pub fn new<S>(
        stages: Vec<Stage<C>>,
        curve: DurationCurve,
        scheduler: Rc<dyn Scheduler>,
        sink: Rc<RefCell<S>>,
    ) -> Self
    where
        S: VisualSink<C> + 'static,
    {
        Self {
            guard: Rc::new(RefCell::new(Guard {
                state: SequencerState::Idle,
                episode: 0,
                pending: Vec::new(),
            })),
            stages: stages.into(),
            sink,
            scheduler,
            curve,
            rate: RateEstimator::new(),
            scoreboard: Scoreboard::new(),
            score_sink: Box::new(NullScoreSink),
        }
    }

    pub fn with_rate_estimator(mut self, rate: RateEstimator) -> Self {
        self.rate = rate;
        self
    }

    pub fn with_scoreboard(mut self, scoreboard: Scoreboard) -> Self {
        self.scoreboard = scoreboard;
        self
    }

    pub fn with_score_sink(mut self, sink: impl ScoreSink + 'static) -> Self {
        self.score_sink = Box::new(sink);
        self
    }

    /// Start an episode, or drop the trigger if one is already running.
    pub fn trigger(&mut self, now: Instant) -> Outcome {
        let episode = {
            let mut guard = self.guard.borrow_mut();
            if guard.state == SequencerState::Busy {
                log::trace!("slap ignored at {}ms: episode in flight", now.as_millis());
                return Outcome::Ignored;
            }
            guard.state = SequencerState::Busy;
            guard.episode += 1;
            guard.pending.clear();
            guard.episode
        };

        self.rate.record(now);
        let update = self.scoreboard.increment();
        self.score_sink.on_score(update);
        self.rate.prune(now);
        let rate = self.rate.rate(now);
        let stage_duration = self.curve.duration_for(rate);

        log::debug!(
            "Slap! score={} aps={} stage={}ms",
            update.score,
            rate,
            stage_duration.as_millis()
        );

        self.schedule_episode(episode, stage_duration);

        Outcome::Accepted {
            score: update.score,
            rate,
            stage_duration,
        }
    }

    fn schedule_episode(&mut self, episode: u64, stage_duration: Duration) {
        let count = self.stages.len();
        if count == 0 {
            self.guard.borrow_mut().state = SequencerState::Idle;
            return;
        }
        for (index, offset) in stage_offsets(count, stage_duration).enumerate() {
            let timing = StageTiming {
                index,
                count,
                offset,
                stage_duration,
            };
            let guard = self.guard.clone();
            let sink = self.sink.clone();
            let stages = self.stages.clone();
            let handle = self.scheduler.after(
                offset,
                Box::new(move || run_stage(&guard, &sink, &stages, episode, timing)),
            );
            self.guard.borrow_mut().pending.push(handle);
        }
    }

    /// Abort the running episode: pending stages are cancelled and the sequencer is
    /// forced back to `Idle`. The visual sink is not told; the host resets its scene.
    /// Returns `false` if nothing was running.
    pub fn cancel(&mut self) -> bool {
        let pending = {
            let mut guard = self.guard.borrow_mut();
            if guard.state == SequencerState::Idle {
                return false;
            }
            guard.state = SequencerState::Idle;
            guard.episode += 1;
            std::mem::take(&mut guard.pending)
        };
        for handle in pending {
            self.scheduler.cancel(handle);
        }
        log::debug!("slap episode cancelled");
        true
    }

    /// Prune the rate log and report the overlay values. Call once per frame.
    pub fn hud(&mut self, now: Instant) -> Hud {
        self.rate.prune(now);
        Hud {
            score: self.scoreboard.score(),
            high_score: self.scoreboard.high_score(),
            rate: self.rate.rate(now),
        }
    }

    pub fn state(&self) -> SequencerState {
        self.guard.borrow().state
    }

    pub fn is_busy(&self) -> bool {
        self.state() == SequencerState::Busy
    }

    pub fn score(&self) -> u64 {
        self.scoreboard.score()
    }

    pub fn high_score(&self) -> u64 {
        self.scoreboard.high_score()
    }

    pub fn curve(&self) -> &DurationCurve {
        &self.curve
    }

    pub fn rate_estimator(&self) -> &RateEstimator {
        &self.rate
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn stages(&self) -> &[Stage<C>] {
        &self.stages
    }
}

impl SlapSequencer<SlapVisual> {
    /// Sequencer wired from a validated [`GameConfig`].
    pub fn from_config<S>(
        config: &GameConfig,
        scheduler: Rc<dyn Scheduler>,
        sink: Rc<RefCell<S>>,
    ) -> Result<Self, ConfigError>
    where
        S: VisualSink<SlapVisual> + 'static,
    {
        config.validate()?;
        Ok(Self::new(
            config.variant.stages(&config.pose),
            config.curve(),
            scheduler,
            sink,
        )
        .with_rate_estimator(RateEstimator::with_spans(
            config.rate_window(),
            config.rate_retention(),
        ))
        .with_scoreboard(Scoreboard::with_high_score(config.high_score)))
    }
}

fn run_stage<C>(
    guard: &RefCell<Guard>,
    sink: &RefCell<dyn VisualSink<C>>,
    stages: &[Stage<C>],
    episode: u64,
    timing: StageTiming,
) {
    {
        let guard = guard.borrow();
        if guard.episode != episode || guard.state != SequencerState::Busy {
            return;
        }
    }
    let stage = &stages[timing.index];
    log::trace!("stage {}/{} '{}'", timing.index + 1, timing.count, stage.label);
    sink.borrow_mut().apply(&stage.command, timing);
    if timing.is_last() {
        let mut guard = guard.borrow_mut();
        if guard.episode == episode {
            guard.state = SequencerState::Idle;
            guard.pending.clear();
        }
    }
}
