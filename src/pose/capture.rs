use chrono::Utc;

use crate::models::{ReferenceKind, ReferencePose, SmoothedPose};

/// Freezes `pose` as a reference of the given kind.
///
/// The joint map is copied, so later smoothing output never leaks into a
/// stored reference.
pub fn capture(pose: &SmoothedPose, kind: ReferenceKind) -> ReferencePose {
    ReferencePose {
        kind,
        pose: pose.frame().clone(),
        captured_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JointName, Keypoint, PoseFrame};

    #[test]
    fn test_capture_is_a_snapshot() {
        let mut frame = PoseFrame::from_keypoints(vec![Keypoint::new(
            JointName::LeftElbow,
            120.0,
            200.0,
            0.9,
        )]);
        let reference = capture(&SmoothedPose::new(frame.clone()), ReferenceKind::Hold);

        frame.insert(Keypoint::new(JointName::LeftElbow, 0.0, 0.0, 0.1));

        assert_eq!(reference.kind, ReferenceKind::Hold);
        let elbow = reference.get(JointName::LeftElbow).unwrap();
        assert_eq!(elbow.position.x, 120.0);
        assert_eq!(elbow.position.y, 200.0);
    }
}
