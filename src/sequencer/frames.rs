// Six-frame slap: discrete hand positions swapped in order, no interpolation.
use super::{CheekFrame, HandPose, SlapVisual, Stage};
use crate::pose::BasePose;

pub fn stages(pose: &BasePose) -> Vec<Stage<SlapVisual>> {
    let frame = |label: &'static str, hand: HandPose, cheek: CheekFrame, impact: bool| {
        Stage::new(label, SlapVisual { hand, cheek, impact })
    };
    let swing = pose.hand_start.lerp(pose.cheek, 0.5);
    let follow = pose.cheek.lerp(pose.hand_follow_through, 0.3);
    vec![
        frame("windup", HandPose::At(pose.hand_start), CheekFrame::Normal, false),
        frame("swing", HandPose::At(swing), CheekFrame::Normal, false),
        frame("contact", HandPose::At(pose.cheek), CheekFrame::Slapped, true),
        frame("follow", HandPose::At(follow), CheekFrame::Slapped, false),
        frame("retract", HandPose::At(pose.hand_follow_through), CheekFrame::Slapped, false),
        frame("rest", HandPose::Hidden, CheekFrame::Normal, false),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn six_frames_with_single_impact() {
        let list = stages(&BasePose::default());
        assert_eq!(list.len(), 6);
        assert_eq!(list.iter().filter(|s| s.command.impact).count(), 1);
        assert_eq!(list[2].label, "contact");
        assert_eq!(list[5].command, SlapVisual::REST);
    }

    #[test]
    fn hand_moves_monotonically_toward_cheek_before_contact() {
        let pose = BasePose::default();
        let xs: Vec<f64> = stages(&pose)[..3]
            .iter()
            .map(|s| match s.command.hand {
                HandPose::At(p) => p.x,
                _ => f64::NAN,
            })
            .collect();
        assert!(xs[0] > xs[1] && xs[1] > xs[2]);
    }
}
