// Three-stage tween slap: the hand sweeps in, the cheek swaps on impact while the
// hand follows through, then everything returns to rest.
use super::{CheekFrame, HandPose, SlapVisual, Stage};
use crate::pose::BasePose;

pub fn stages(pose: &BasePose) -> Vec<Stage<SlapVisual>> {
    vec![
        Stage::new(
            "approach",
            SlapVisual {
                hand: HandPose::Sweep {
                    from: pose.hand_start,
                    to: pose.cheek,
                },
                cheek: CheekFrame::Normal,
                impact: false,
            },
        ),
        Stage::new(
            "impact",
            SlapVisual {
                hand: HandPose::Sweep {
                    from: pose.cheek,
                    to: pose.hand_follow_through,
                },
                cheek: CheekFrame::Slapped,
                impact: true,
            },
        ),
        Stage::new("rest", SlapVisual::REST),
    ]
}
