use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body parts reported by the pose estimator (PoseNet's 17 keypoints).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub enum JointName {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl JointName {
    pub const ALL: [JointName; 17] = [
        JointName::Nose,
        JointName::LeftEye,
        JointName::RightEye,
        JointName::LeftEar,
        JointName::RightEar,
        JointName::LeftShoulder,
        JointName::RightShoulder,
        JointName::LeftElbow,
        JointName::RightElbow,
        JointName::LeftWrist,
        JointName::RightWrist,
        JointName::LeftHip,
        JointName::RightHip,
        JointName::LeftKnee,
        JointName::RightKnee,
        JointName::LeftAnkle,
        JointName::RightAnkle,
    ];

    /// Joints that decide whether a hold pose is being reproduced.
    pub const DIAGNOSTIC: [JointName; 7] = [
        JointName::LeftShoulder,
        JointName::RightShoulder,
        JointName::LeftElbow,
        JointName::LeftWrist,
        JointName::RightElbow,
        JointName::LeftKnee,
        JointName::RightKnee,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JointName::Nose => "nose",
            JointName::LeftEye => "leftEye",
            JointName::RightEye => "rightEye",
            JointName::LeftEar => "leftEar",
            JointName::RightEar => "rightEar",
            JointName::LeftShoulder => "leftShoulder",
            JointName::RightShoulder => "rightShoulder",
            JointName::LeftElbow => "leftElbow",
            JointName::RightElbow => "rightElbow",
            JointName::LeftWrist => "leftWrist",
            JointName::RightWrist => "rightWrist",
            JointName::LeftHip => "leftHip",
            JointName::RightHip => "rightHip",
            JointName::LeftKnee => "leftKnee",
            JointName::RightKnee => "rightKnee",
            JointName::LeftAnkle => "leftAnkle",
            JointName::RightAnkle => "rightAnkle",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// One estimated joint location with the estimator's confidence in [0, 1].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Keypoint {
    pub part: JointName,
    pub position: Position,
    pub score: f32,
}

impl Keypoint {
    pub fn new(part: JointName, x: f32, y: f32, score: f32) -> Self {
        Self {
            part,
            position: Position::new(x, y),
            score,
        }
    }

    pub fn is_visible(&self, min_score: f32) -> bool {
        self.score >= min_score
    }
}

/// All keypoints estimated from a single sampling tick, keyed by joint name.
///
/// Lookups are always by name so two frames never need to agree on ordering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(transparent)]
pub struct PoseFrame {
    keypoints: BTreeMap<JointName, Keypoint>,
}

impl PoseFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a frame from estimator output. A later entry for the same joint
    /// replaces an earlier one.
    pub fn from_keypoints<I>(keypoints: I) -> Self
    where
        I: IntoIterator<Item = Keypoint>,
    {
        Self {
            keypoints: keypoints.into_iter().map(|kp| (kp.part, kp)).collect(),
        }
    }

    pub fn insert(&mut self, keypoint: Keypoint) {
        self.keypoints.insert(keypoint.part, keypoint);
    }

    pub fn get(&self, joint: JointName) -> Option<&Keypoint> {
        self.keypoints.get(&joint)
    }

    pub fn contains(&self, joint: JointName) -> bool {
        self.keypoints.contains_key(&joint)
    }

    pub fn joints(&self) -> impl Iterator<Item = JointName> + '_ {
        self.keypoints.keys().copied()
    }

    pub fn keypoints(&self) -> impl Iterator<Item = &Keypoint> {
        self.keypoints.values()
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }
}

/// Window-averaged pose emitted by the frame smoother.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(transparent)]
pub struct SmoothedPose(PoseFrame);

impl SmoothedPose {
    pub fn new(frame: PoseFrame) -> Self {
        Self(frame)
    }

    pub fn frame(&self) -> &PoseFrame {
        &self.0
    }

    pub fn get(&self, joint: JointName) -> Option<&Keypoint> {
        self.0.get(joint)
    }

    pub fn into_frame(self) -> PoseFrame {
        self.0
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ReferenceKind {
    /// Neutral stance captured when the scan countdown ends.
    Straight,
    /// Target pose captured when the hold countdown ends.
    Hold,
}

impl ReferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceKind::Straight => "straight",
            ReferenceKind::Hold => "hold",
        }
    }
}

/// Frozen copy of a smoothed pose used as the comparison baseline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReferencePose {
    pub kind: ReferenceKind,
    pub pose: PoseFrame,
    pub captured_at: DateTime<Utc>,
}

impl ReferencePose {
    pub fn get(&self, joint: JointName) -> Option<&Keypoint> {
        self.pose.get(joint)
    }

    pub fn len(&self) -> usize {
        self.pose.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pose.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_lookup_is_by_name() {
        let a = PoseFrame::from_keypoints(vec![
            Keypoint::new(JointName::LeftKnee, 1.0, 2.0, 0.9),
            Keypoint::new(JointName::Nose, 3.0, 4.0, 0.8),
        ]);
        let b = PoseFrame::from_keypoints(vec![
            Keypoint::new(JointName::Nose, 3.0, 4.0, 0.8),
            Keypoint::new(JointName::LeftKnee, 1.0, 2.0, 0.9),
        ]);

        assert_eq!(a, b);
        assert_eq!(a.get(JointName::Nose).map(|kp| kp.position.x), Some(3.0));
        assert!(a.get(JointName::RightKnee).is_none());
    }

    #[test]
    fn test_keypoint_visibility() {
        let keypoint = Keypoint::new(JointName::LeftWrist, 0.0, 0.0, 0.6);
        assert!(keypoint.is_visible(0.6));
        assert!(!keypoint.is_visible(0.61));
    }

    #[test]
    fn test_joint_names_serialize_camel_case() {
        let json = serde_json::to_string(&JointName::LeftShoulder).unwrap();
        assert_eq!(json, "\"leftShoulder\"");
        for joint in JointName::ALL {
            let encoded = serde_json::to_string(&joint).unwrap();
            assert_eq!(encoded.trim_matches('"'), joint.as_str());
        }
    }

    #[test]
    fn test_position_distance() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(3.0, 4.0);
        assert!((a.distance_to(&b) - 5.0).abs() < f32::EPSILON);
    }
}
