//! What the canvas shows, as plain state.
//!
//! [`Scene`] is the [`VisualSink`] the shell hands to the sequencer. It remembers the
//! last stage command, when it arrived, and any running impact shake; the renderer
//! asks it for positions each frame. Nothing here touches the DOM.

use std::rc::Rc;
use core::time::Duration;

use crate::clock::{Clock, Instant};
use crate::config::ImpactShakeConfig;
use crate::pose::{ImpactShake, Jitter, Offset, Point, ease_out_cubic};
use crate::sequencer::{CheekFrame, HandPose, SlapVisual, StageTiming, VisualSink};

pub struct Scene {
    clock: Rc<dyn Clock>,
    visual: SlapVisual,
    applied_at: Instant,
    stage_duration: Duration,
    shake: Option<(ImpactShake, Instant)>,
    shake_config: ImpactShakeConfig,
    jitter: Jitter,
}

impl Scene {
    pub fn new(clock: Rc<dyn Clock>, shake_config: ImpactShakeConfig, jitter: Jitter) -> Self {
        let now = clock.now();
        Self {
            clock,
            visual: SlapVisual::REST,
            applied_at: now,
            stage_duration: Duration::ZERO,
            shake: None,
            shake_config,
            jitter,
        }
    }

    pub fn visual(&self) -> SlapVisual {
        self.visual
    }

    pub fn cheek(&self) -> CheekFrame {
        self.visual.cheek
    }

    /// Hand position at `now`, or `None` while hidden. Sweeps ease out over the
    /// stage duration that came with the command.
    pub fn hand_position(&self, now: Instant) -> Option<Point> {
        match self.visual.hand {
            HandPose::Hidden => None,
            HandPose::At(p) => Some(p),
            HandPose::Sweep { from, to } => {
                let span = self.stage_duration.as_millis().max(1) as f64;
                let t = now.saturating_duration_since(self.applied_at).as_millis() as f64 / span;
                Some(from.lerp(to, ease_out_cubic(t)))
            }
        }
    }

    pub fn shake_offset(&self, now: Instant) -> Offset {
        match &self.shake {
            Some((shake, started)) => shake.offset_at(now.saturating_duration_since(*started)),
            None => Offset::ZERO,
        }
    }

    /// Back to the resting frame, e.g. after a cancelled episode.
    pub fn reset(&mut self) {
        self.visual = SlapVisual::REST;
        self.shake = None;
        self.applied_at = self.clock.now();
        self.stage_duration = Duration::ZERO;
    }
}

impl VisualSink<SlapVisual> for Scene {
    fn apply(&mut self, command: &SlapVisual, timing: StageTiming) {
        let now = self.clock.now();
        self.visual = *command;
        self.applied_at = now;
        self.stage_duration = timing.stage_duration;
        if command.impact {
            let cfg = self.shake_config;
            let shake = ImpactShake::roll(
                &mut self.jitter,
                cfg.amplitude_px,
                Duration::from_millis(cfg.half_period_ms),
                cfg.cycles,
            );
            self.shake = Some((shake, now));
        }
    }
}
