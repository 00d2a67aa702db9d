// Property tests for the rate window, the duration curve and the overlap guard.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use proptest::prelude::*;
use slap_rush::{
    DurationCurve, Instant, Outcome, RateEstimator, SequenceVariant, SlapSequencer, SlapVisual,
    StageTiming, VirtualTimeline, VisualSink,
};

fn ms(v: u64) -> Instant {
    Instant::from_millis(v)
}

/// Ascending timestamps built from gaps.
fn timestamps(gaps: &[u64]) -> Vec<u64> {
    gaps.iter()
        .scan(0u64, |t, gap| {
            *t += gap;
            Some(*t)
        })
        .collect()
}

#[derive(Default)]
struct StageLog(Vec<StageTiming>);

impl VisualSink<SlapVisual> for StageLog {
    fn apply(&mut self, _command: &SlapVisual, timing: StageTiming) {
        self.0.push(timing);
    }
}

proptest! {
    #[test]
    fn rate_matches_a_brute_force_count(
        gaps in prop::collection::vec(0u64..400, 0..60),
        probe in 0u64..30_000,
    ) {
        let times = timestamps(&gaps);
        let mut est = RateEstimator::new();
        for &t in &times {
            est.record(ms(t));
        }
        let expected = times
            .iter()
            .filter(|&&t| t <= probe && t + 1_000 > probe)
            .count() as u32;
        prop_assert_eq!(est.rate(ms(probe)), expected);
    }

    #[test]
    fn pruning_drops_only_expired_entries(
        gaps in prop::collection::vec(0u64..400, 1..60),
        prune_at in 0u64..30_000,
        later in 0u64..5_000,
    ) {
        let times = timestamps(&gaps);
        let mut est = RateEstimator::new();
        for &t in &times {
            est.record(ms(t));
        }
        let query = ms(prune_at + later);
        let before = est.rate(query);
        est.prune(ms(prune_at));
        prop_assert_eq!(est.rate(query), before);
        // Exactly the entries newer than `prune_at - 2s` survive.
        let kept = times.iter().filter(|&&t| t + 2_000 > prune_at).count();
        prop_assert_eq!(est.len(), kept);
    }

    #[test]
    fn duration_is_non_increasing_and_floored(
        base in 1u64..2_000,
        min in 1u64..2_000,
        speed in 0u64..1_000,
        rate in 0u32..1_000,
    ) {
        let curve = DurationCurve::from_millis(base, min, speed);
        let here = curve.duration_for(rate);
        let next = curve.duration_for(rate + 1);
        prop_assert!(next <= here);
        prop_assert!(here >= curve.min());
        prop_assert!(here >= Duration::from_millis(1));
        prop_assert!(here <= curve.base().max(curve.min()));
    }

    #[test]
    fn score_counts_exactly_the_accepted_slaps(
        steps in prop::collection::vec((0u64..250, any::<bool>()), 1..80),
        frames in any::<bool>(),
    ) {
        let variant = if frames { SequenceVariant::Frames } else { SequenceVariant::Tween };
        let timeline = Rc::new(VirtualTimeline::new());
        let sink = Rc::new(RefCell::new(StageLog::default()));
        let mut seq = SlapSequencer::new(
            variant.stages(&Default::default()),
            DurationCurve::default(),
            timeline.clone(),
            sink.clone(),
        );

        let mut now = 0;
        let mut accepted = 0u64;
        for (gap, double) in steps {
            now += gap;
            timeline.advance_to(ms(now));
            let was_busy = seq.is_busy();
            let outcome = seq.trigger(ms(now));
            prop_assert_eq!(outcome.is_accepted(), !was_busy);
            if outcome.is_accepted() {
                accepted += 1;
            }
            if double {
                prop_assert_eq!(seq.trigger(ms(now)), Outcome::Ignored);
            }
            prop_assert_eq!(seq.score(), accepted);
        }
        timeline.advance_to(ms(now + 10_000));

        // Episodes never interleave: indices run 0..count, 0..count, ...
        let log = &sink.borrow().0;
        let count = seq.stage_count();
        prop_assert_eq!(log.len() as u64, accepted * count as u64);
        for (i, timing) in log.iter().enumerate() {
            prop_assert_eq!(timing.index, i % count);
        }
        prop_assert!(!seq.is_busy());
    }
}
