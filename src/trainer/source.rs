use rand::Rng;

use crate::models::{JointName, Keypoint, PoseFrame};

/// The pose estimator, sampled once per tick. `None` means the camera or
/// model is not ready yet; the tick is skipped.
pub trait PoseSource: Send {
    fn estimate(&mut self) -> Option<PoseFrame>;
}

impl<F> PoseSource for F
where
    F: FnMut() -> Option<PoseFrame> + Send,
{
    fn estimate(&mut self) -> Option<PoseFrame> {
        self()
    }
}

/// Upright stance in 640x480 webcam space, arms down.
pub fn standing_pose() -> PoseFrame {
    let points: [(JointName, f32, f32); 17] = [
        (JointName::Nose, 320.0, 80.0),
        (JointName::LeftEye, 330.0, 70.0),
        (JointName::RightEye, 310.0, 70.0),
        (JointName::LeftEar, 345.0, 75.0),
        (JointName::RightEar, 295.0, 75.0),
        (JointName::LeftShoulder, 370.0, 140.0),
        (JointName::RightShoulder, 270.0, 140.0),
        (JointName::LeftElbow, 385.0, 210.0),
        (JointName::RightElbow, 255.0, 210.0),
        (JointName::LeftWrist, 390.0, 275.0),
        (JointName::RightWrist, 250.0, 275.0),
        (JointName::LeftHip, 350.0, 280.0),
        (JointName::RightHip, 290.0, 280.0),
        (JointName::LeftKnee, 352.0, 370.0),
        (JointName::RightKnee, 288.0, 370.0),
        (JointName::LeftAnkle, 355.0, 455.0),
        (JointName::RightAnkle, 285.0, 455.0),
    ];
    PoseFrame::from_keypoints(
        points
            .iter()
            .map(|&(joint, x, y)| Keypoint::new(joint, x, y, 0.95)),
    )
}

/// Synthetic estimator: a base pose plus uniform per-joint jitter, with the
/// occasional dropped frame. Stands in for the camera in the demo binary.
pub struct JitterPoseSource {
    base: PoseFrame,
    jitter_px: f32,
    drop_rate: f64,
}

impl JitterPoseSource {
    pub fn new(base: PoseFrame, jitter_px: f32, drop_rate: f64) -> Self {
        Self {
            base,
            jitter_px,
            drop_rate: drop_rate.clamp(0.0, 1.0),
        }
    }

    pub fn set_base(&mut self, base: PoseFrame) {
        self.base = base;
    }
}

impl PoseSource for JitterPoseSource {
    fn estimate(&mut self) -> Option<PoseFrame> {
        let mut rng = rand::thread_rng();
        if rng.gen_bool(self.drop_rate) {
            return None;
        }

        let jitter = self.jitter_px.abs();
        Some(PoseFrame::from_keypoints(self.base.keypoints().map(|kp| {
            let dx = if jitter > 0.0 { rng.gen_range(-jitter..=jitter) } else { 0.0 };
            let dy = if jitter > 0.0 { rng.gen_range(-jitter..=jitter) } else { 0.0 };
            let score = (kp.score - rng.gen_range(0.0..0.1)).max(0.0);
            Keypoint::new(kp.part, kp.position.x + dx, kp.position.y + dy, score)
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jitter_stays_within_bounds() {
        let base = standing_pose();
        let mut source = JitterPoseSource::new(base.clone(), 5.0, 0.0);

        for _ in 0..50 {
            let frame = source.estimate().unwrap();
            assert_eq!(frame.len(), base.len());
            for kp in frame.keypoints() {
                let original = base.get(kp.part).unwrap();
                assert!(kp.position.distance_to(&original.position) <= 5.0 * 2f32.sqrt() + 1e-3);
                assert!(kp.score <= original.score);
            }
        }
    }

    #[test]
    fn test_full_drop_rate_never_estimates() {
        let mut source = JitterPoseSource::new(standing_pose(), 1.0, 1.0);
        assert!(source.estimate().is_none());
    }

    #[test]
    fn test_closure_source() {
        let mut calls = 0;
        let mut source = move || {
            calls += 1;
            (calls > 1).then(standing_pose)
        };
        assert!(source.estimate().is_none());
        assert!(source.estimate().is_some());
    }
}
