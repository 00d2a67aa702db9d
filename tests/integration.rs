// Integration tests (native) for the `slap-rush` crate.
// Everything runs on a VirtualTimeline, so no browser APIs are touched.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use slap_rush::sequencer::CheekFrame;
use slap_rush::{
    Clock, DurationCurve, GameConfig, Instant, Outcome, RateEstimator, SequenceVariant,
    SequencerState, SlapSequencer, SlapVisual, StageTiming, VirtualTimeline, VisualSink,
};

fn ms(v: u64) -> Instant {
    Instant::from_millis(v)
}

/// Sink that stamps each command with the timeline's clock.
struct Stamped {
    timeline: Rc<VirtualTimeline>,
    seen: Vec<(u64, StageTiming, SlapVisual)>,
}

impl VisualSink<SlapVisual> for Stamped {
    fn apply(&mut self, command: &SlapVisual, timing: StageTiming) {
        self.seen
            .push((self.timeline.now().as_millis(), timing, *command));
    }
}

fn rig(
    variant: SequenceVariant,
    curve: DurationCurve,
) -> (Rc<VirtualTimeline>, Rc<RefCell<Stamped>>, SlapSequencer<SlapVisual>) {
    let timeline = Rc::new(VirtualTimeline::new());
    let sink = Rc::new(RefCell::new(Stamped {
        timeline: timeline.clone(),
        seen: Vec::new(),
    }));
    let config = GameConfig::default();
    let seq = SlapSequencer::new(
        variant.stages(&config.pose),
        curve,
        timeline.clone(),
        sink.clone(),
    );
    (timeline, sink, seq)
}

#[test]
fn duration_reference_points() {
    let curve = DurationCurve::from_millis(300, 20, 200);
    assert_eq!(curve.duration_for(0), Duration::from_millis(300));
    assert_eq!(curve.duration_for(2), Duration::from_millis(20));
}

#[test]
fn ten_actions_in_the_first_second() {
    let mut est = RateEstimator::new();
    for i in 0..10 {
        est.record(ms(i * 100));
    }
    assert_eq!(est.rate(ms(900)), 10);
    // (0, 1000]: the t=0 entry falls on the open lower edge
    assert_eq!(est.rate(ms(1_000)), 9);
}

#[test]
fn six_frame_episode_fires_in_order_at_stage_offsets() {
    let (tl, sink, mut seq) = rig(
        SequenceVariant::Frames,
        DurationCurve::from_millis(50, 50, 0),
    );
    assert_eq!(
        seq.trigger(ms(0)),
        Outcome::Accepted {
            score: 1,
            rate: 1,
            stage_duration: Duration::from_millis(50)
        }
    );
    tl.advance_to(ms(1_000));
    let seen = &sink.borrow().seen;
    assert_eq!(seen.len(), 6);
    for (i, (at, timing, _)) in seen.iter().enumerate() {
        assert_eq!(timing.index, i);
        assert!(*at >= i as u64 * 50, "stage {i} fired early at {at}ms");
        if i > 0 {
            assert!(*at > seen[i - 1].0);
        }
    }
    assert_eq!(seen[2].2.cheek, CheekFrame::Slapped);
    assert_eq!(seen[5].2, SlapVisual::REST);
    assert_eq!(seq.state(), SequencerState::Idle);
}

#[test]
fn overlap_guard_accepts_one_of_two_back_to_back_triggers() {
    let (tl, sink, mut seq) = rig(SequenceVariant::Tween, DurationCurve::default());
    let first = seq.trigger(ms(0));
    let second = seq.trigger(ms(0));
    assert!(first.is_accepted());
    assert_eq!(second, Outcome::Ignored);
    assert_eq!(seq.score(), 1);

    let Outcome::Accepted { stage_duration, .. } = first else {
        unreachable!()
    };
    let last_stage = ms(stage_duration.as_millis() as u64 * 2);
    tl.advance_to(last_stage);
    assert_eq!(sink.borrow().seen.len(), 3);

    // Same tick as the final stage: accepted after the Idle transition.
    let third = seq.trigger(last_stage);
    assert!(third.is_accepted());
    assert_eq!(seq.score(), 2);
}

#[test]
fn rapid_slapping_shortens_stages_down_to_the_floor() {
    let (tl, _sink, mut seq) = rig(SequenceVariant::Tween, DurationCurve::default());
    let mut durations = Vec::new();
    // Each slap lands on the tick its predecessor's last stage fires.
    let mut now = 0;
    for _ in 0..3 {
        let Outcome::Accepted { stage_duration, .. } = seq.trigger(ms(now)) else {
            panic!("slap at {now}ms was ignored");
        };
        durations.push(stage_duration.as_millis() as u64);
        now += stage_duration.as_millis() as u64 * 2;
        tl.advance_to(ms(now));
    }
    assert_eq!(durations, vec![100, 20, 20]);
    assert_eq!(seq.score(), 3);
}

#[test]
fn config_built_sequencer_uses_configured_spans() {
    let config = GameConfig {
        variant: SequenceVariant::Frames,
        high_score: 5,
        ..GameConfig::default()
    };
    let tl = Rc::new(VirtualTimeline::new());
    let sink = Rc::new(RefCell::new(Stamped {
        timeline: tl.clone(),
        seen: Vec::new(),
    }));
    let mut seq = SlapSequencer::from_config(&config, tl.clone(), sink.clone()).unwrap();
    assert_eq!(seq.stage_count(), 6);
    assert_eq!(seq.high_score(), 5);
    assert_eq!(seq.rate_estimator().retention(), Duration::from_secs(2));
    seq.trigger(ms(0));
    tl.advance_to(ms(5_000));
    assert_eq!(sink.borrow().seen.len(), 6);
    let hud = seq.hud(ms(5_000));
    assert_eq!(hud.rate, 0);
    assert_eq!(hud.score, 1);
    assert!(seq.rate_estimator().is_empty());
}

#[test]
fn invalid_config_is_rejected_before_wiring() {
    let config = GameConfig {
        retention_ms: 100,
        ..GameConfig::default()
    };
    let tl = Rc::new(VirtualTimeline::new());
    let sink = Rc::new(RefCell::new(Stamped {
        timeline: tl.clone(),
        seen: Vec::new(),
    }));
    assert!(SlapSequencer::from_config(&config, tl, sink).is_err());
}
