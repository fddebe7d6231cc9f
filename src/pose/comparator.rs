//! Live-versus-reference pose comparison.
//!
//! Two policies exist side by side. The trainer uses [`StrictTolerance`]:
//! every diagnostic joint must sit inside the tolerance. The pose-check flow
//! uses [`PercentageMatch`]: enough of the reference joints are close.
//! Confidence scores are not consulted by either one.

use serde::{Deserialize, Serialize};

use crate::models::{JointName, ReferencePose, SmoothedPose};

pub const STRICT_THRESHOLD_PX: f32 = 40.0;
pub const PERCENTAGE_THRESHOLD_PX: f32 = 100.0;
pub const PERCENTAGE_MIN_RATIO: f32 = 0.5;

/// Per-joint outcome of a comparison. `distance` is `None` when the joint is
/// missing from either pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointDistance {
    pub joint: JointName,
    pub distance: Option<f32>,
    pub within: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompareReport {
    pub matched: bool,
    pub joints: Vec<JointDistance>,
}

impl CompareReport {
    pub fn matched_count(&self) -> usize {
        self.joints.iter().filter(|j| j.within).count()
    }

    /// Failed joint furthest from its reference; missing joints rank first.
    pub fn worst_offender(&self) -> Option<&JointDistance> {
        self.joints
            .iter()
            .filter(|j| !j.within)
            .max_by(|a, b| {
                let a = a.distance.unwrap_or(f32::INFINITY);
                let b = b.distance.unwrap_or(f32::INFINITY);
                a.total_cmp(&b)
            })
    }
}

pub trait PoseComparator {
    fn compare(&self, live: &SmoothedPose, reference: &ReferencePose) -> CompareReport;

    fn is_match(&self, live: &SmoothedPose, reference: &ReferencePose) -> bool {
        self.compare(live, reference).matched
    }
}

fn joint_distance(
    live: &SmoothedPose,
    reference: &ReferencePose,
    joint: JointName,
    threshold_px: f32,
) -> JointDistance {
    let distance = match (live.get(joint), reference.get(joint)) {
        (Some(l), Some(r)) => Some(l.position.distance_to(&r.position)),
        _ => None,
    };
    JointDistance {
        joint,
        distance,
        within: distance.map(|d| d <= threshold_px).unwrap_or(false),
    }
}

/// Every listed joint must be present in both poses and no further apart
/// than `threshold_px`. One bad joint fails the whole pose.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StrictTolerance {
    pub joints: Vec<JointName>,
    pub threshold_px: f32,
}

impl Default for StrictTolerance {
    fn default() -> Self {
        Self {
            joints: JointName::DIAGNOSTIC.to_vec(),
            threshold_px: STRICT_THRESHOLD_PX,
        }
    }
}

impl PoseComparator for StrictTolerance {
    fn compare(&self, live: &SmoothedPose, reference: &ReferencePose) -> CompareReport {
        let joints: Vec<JointDistance> = self
            .joints
            .iter()
            .map(|&joint| joint_distance(live, reference, joint, self.threshold_px))
            .collect();
        let matched = joints.iter().all(|j| j.within);
        CompareReport { matched, joints }
    }
}

/// Matches when at least `min_ratio` of the reference's joints have a live
/// counterpart within `threshold_px`. An empty reference never matches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PercentageMatch {
    pub threshold_px: f32,
    pub min_ratio: f32,
}

impl Default for PercentageMatch {
    fn default() -> Self {
        Self {
            threshold_px: PERCENTAGE_THRESHOLD_PX,
            min_ratio: PERCENTAGE_MIN_RATIO,
        }
    }
}

impl PoseComparator for PercentageMatch {
    fn compare(&self, live: &SmoothedPose, reference: &ReferencePose) -> CompareReport {
        let joints: Vec<JointDistance> = reference
            .pose
            .joints()
            .map(|joint| joint_distance(live, reference, joint, self.threshold_px))
            .collect();

        let total = joints.len();
        let within = joints.iter().filter(|j| j.within).count();
        let matched = total > 0 && within as f32 >= self.min_ratio * total as f32;
        CompareReport { matched, joints }
    }
}

/// Comparison strategy selected per exercise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ComparisonPolicy {
    Strict(StrictTolerance),
    Percentage(PercentageMatch),
}

impl Default for ComparisonPolicy {
    fn default() -> Self {
        ComparisonPolicy::Strict(StrictTolerance::default())
    }
}

impl ComparisonPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonPolicy::Strict(_) => "strict",
            ComparisonPolicy::Percentage(_) => "percentage",
        }
    }
}

impl PoseComparator for ComparisonPolicy {
    fn compare(&self, live: &SmoothedPose, reference: &ReferencePose) -> CompareReport {
        match self {
            ComparisonPolicy::Strict(strict) => strict.compare(live, reference),
            ComparisonPolicy::Percentage(percentage) => percentage.compare(live, reference),
        }
    }
}

/// Strict check over an explicit joint set.
pub fn is_match(
    live: &SmoothedPose,
    reference: &ReferencePose,
    joints: &[JointName],
    threshold_px: f32,
) -> bool {
    joints
        .iter()
        .all(|&joint| joint_distance(live, reference, joint, threshold_px).within)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Keypoint, PoseFrame, ReferenceKind};
    use crate::pose::capture::capture;

    fn pose_at(offset: f32, joints: &[JointName]) -> SmoothedPose {
        SmoothedPose::new(PoseFrame::from_keypoints(joints.iter().enumerate().map(
            |(i, &joint)| Keypoint::new(joint, 100.0 + i as f32 * 20.0 + offset, 200.0, 0.9),
        )))
    }

    fn reference_of(joints: &[JointName]) -> ReferencePose {
        capture(&pose_at(0.0, joints), ReferenceKind::Hold)
    }

    #[test]
    fn test_strict_matches_within_threshold() {
        let reference = reference_of(&JointName::DIAGNOSTIC);
        let live = pose_at(39.5, &JointName::DIAGNOSTIC);

        assert!(StrictTolerance::default().is_match(&live, &reference));
        assert!(is_match(&live, &reference, &JointName::DIAGNOSTIC, 40.0));
    }

    #[test]
    fn test_strict_single_joint_out_fails_everything() {
        let reference = reference_of(&JointName::DIAGNOSTIC);
        let mut frame = pose_at(1.0, &JointName::DIAGNOSTIC).into_frame();
        let knee = *frame.get(JointName::RightKnee).unwrap();
        frame.insert(Keypoint::new(
            JointName::RightKnee,
            knee.position.x + 40.5,
            knee.position.y,
            knee.score,
        ));
        let live = SmoothedPose::new(frame);

        let report = StrictTolerance::default().compare(&live, &reference);
        assert!(!report.matched);
        assert_eq!(report.matched_count(), JointName::DIAGNOSTIC.len() - 1);
        assert_eq!(report.worst_offender().map(|j| j.joint), Some(JointName::RightKnee));
        assert!(!is_match(&live, &reference, &JointName::DIAGNOSTIC, 40.0));
    }

    #[test]
    fn test_strict_missing_joint_fails_closed() {
        let reference = reference_of(&JointName::DIAGNOSTIC);
        let live_joints: Vec<JointName> = JointName::DIAGNOSTIC
            .iter()
            .copied()
            .filter(|&j| j != JointName::LeftWrist)
            .collect();
        let live = pose_at(0.0, &live_joints);

        let report = StrictTolerance::default().compare(&live, &reference);
        assert!(!report.matched);
        let wrist = report
            .joints
            .iter()
            .find(|j| j.joint == JointName::LeftWrist)
            .unwrap();
        assert_eq!(wrist.distance, None);

        let sparse_reference = reference_of(&[JointName::LeftShoulder]);
        assert!(!StrictTolerance::default().is_match(&pose_at(0.0, &JointName::DIAGNOSTIC), &sparse_reference));
    }

    #[test]
    fn test_strict_ignores_confidence() {
        let reference = reference_of(&JointName::DIAGNOSTIC);
        let live = SmoothedPose::new(PoseFrame::from_keypoints(
            pose_at(0.0, &JointName::DIAGNOSTIC)
                .frame()
                .keypoints()
                .map(|kp| Keypoint { score: 0.01, ..*kp }),
        ));
        assert!(StrictTolerance::default().is_match(&live, &reference));
    }

    fn fifteen_joints() -> Vec<JointName> {
        JointName::ALL[..15].to_vec()
    }

    fn live_with_matches(matching: usize) -> SmoothedPose {
        let joints = fifteen_joints();
        SmoothedPose::new(PoseFrame::from_keypoints(joints.iter().enumerate().map(
            |(i, &joint)| {
                let x = 100.0 + i as f32 * 20.0;
                let offset = if i < matching { 99.0 } else { 101.0 };
                Keypoint::new(joint, x + offset, 200.0, 0.9)
            },
        )))
    }

    #[test]
    fn test_percentage_eight_of_fifteen_matches() {
        let reference = reference_of(&fifteen_joints());
        let policy = PercentageMatch::default();

        let report = policy.compare(&live_with_matches(8), &reference);
        assert!(report.matched);
        assert_eq!(report.matched_count(), 8);

        assert!(!policy.is_match(&live_with_matches(7), &reference));
    }

    #[test]
    fn test_percentage_counts_missing_live_joints_as_unmatched() {
        let reference = reference_of(&fifteen_joints());
        let live = pose_at(0.0, &fifteen_joints()[..7]);
        assert!(!PercentageMatch::default().is_match(&live, &reference));

        let live = pose_at(0.0, &fifteen_joints()[..8]);
        assert!(PercentageMatch::default().is_match(&live, &reference));
    }

    #[test]
    fn test_percentage_empty_reference_never_matches() {
        let empty = capture(&SmoothedPose::default(), ReferenceKind::Straight);
        assert!(!PercentageMatch::default().is_match(&pose_at(0.0, &JointName::ALL), &empty));
    }

    #[test]
    fn test_policy_dispatch_and_serde_tag() {
        let policy: ComparisonPolicy =
            serde_json::from_str(r#"{"kind":"percentage","thresholdPx":100.0,"minRatio":0.5}"#)
                .unwrap();
        assert_eq!(policy, ComparisonPolicy::Percentage(PercentageMatch::default()));
        assert_eq!(ComparisonPolicy::default().as_str(), "strict");

        let reference = reference_of(&fifteen_joints());
        assert!(policy.is_match(&live_with_matches(8), &reference));
        assert!(!ComparisonPolicy::default().is_match(&live_with_matches(8), &reference));
    }
}
