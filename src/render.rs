//! Hand-off to whatever draws the skeleton overlay.
//!
//! Drawing itself is outside this crate. The helpers below carry the overlay
//! rules the UI relies on: which bones exist, which keypoints are confident
//! enough to draw, and how to fit a 640x480 pose into a thumbnail canvas.

use crate::models::{JointName, Keypoint, PoseFrame, Position, ReferencePose};

/// Keypoints and bones below this confidence are not drawn.
pub const DRAW_MIN_SCORE: f32 = 0.6;

/// Webcam frame size the estimator is configured for.
pub const SOURCE_CANVAS: CanvasSize = CanvasSize {
    width: 640.0,
    height: 480.0,
};

pub const SKELETON_CONNECTIONS: [(JointName, JointName); 12] = [
    (JointName::LeftShoulder, JointName::RightShoulder),
    (JointName::LeftShoulder, JointName::LeftElbow),
    (JointName::LeftElbow, JointName::LeftWrist),
    (JointName::RightShoulder, JointName::RightElbow),
    (JointName::RightElbow, JointName::RightWrist),
    (JointName::LeftShoulder, JointName::LeftHip),
    (JointName::RightShoulder, JointName::RightHip),
    (JointName::LeftHip, JointName::RightHip),
    (JointName::LeftHip, JointName::LeftKnee),
    (JointName::LeftKnee, JointName::LeftAnkle),
    (JointName::RightHip, JointName::RightKnee),
    (JointName::RightKnee, JointName::RightAnkle),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasSize {
    pub width: f32,
    pub height: f32,
}

/// Receives every live frame plus the current reference, if any.
/// Fire-and-forget: the trainer never waits on or inspects the result.
pub trait RenderSink: Send + Sync {
    fn render(&self, live: &PoseFrame, reference: Option<&ReferencePose>);
}

pub fn visible_keypoints(frame: &PoseFrame, min_score: f32) -> impl Iterator<Item = &Keypoint> {
    frame.keypoints().filter(move |kp| kp.is_visible(min_score))
}

/// Bones whose two endpoints are both present and confident.
pub fn visible_segments(frame: &PoseFrame, min_score: f32) -> Vec<(Position, Position)> {
    SKELETON_CONNECTIONS
        .iter()
        .filter_map(|&(a, b)| {
            let a = frame.get(a).filter(|kp| kp.is_visible(min_score))?;
            let b = frame.get(b).filter(|kp| kp.is_visible(min_score))?;
            Some((a.position, b.position))
        })
        .collect()
}

/// Rescales every keypoint from `source` space into `target` space.
pub fn scale_to_canvas(frame: &PoseFrame, source: CanvasSize, target: CanvasSize) -> PoseFrame {
    let sx = target.width / source.width;
    let sy = target.height / source.height;
    PoseFrame::from_keypoints(frame.keypoints().map(|kp| Keypoint {
        position: Position::new(kp.position.x * sx, kp.position.y * sy),
        ..*kp
    }))
}

/// Sink that only logs what would be drawn. Used headless and in the demo.
#[derive(Debug, Default)]
pub struct LogRenderSink;

impl RenderSink for LogRenderSink {
    fn render(&self, live: &PoseFrame, reference: Option<&ReferencePose>) {
        log::trace!(
            "render: {} visible keypoints, {} bones, reference={}",
            visible_keypoints(live, DRAW_MIN_SCORE).count(),
            visible_segments(live, DRAW_MIN_SCORE).len(),
            reference.map(|r| r.kind.as_str()).unwrap_or("none")
        );
    }
}
