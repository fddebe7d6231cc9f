//! Short-window averaging of raw estimator output.
//!
//! Frames accumulate until the window is full, then collapse into a single
//! [`SmoothedPose`] and the buffer starts over. Windows do not overlap.

use crate::models::{Keypoint, PoseFrame, Position, SmoothedPose};

pub const DEFAULT_WINDOW: usize = 3;

pub struct FrameSmoother {
    buffer: Vec<PoseFrame>,
    window: usize,
}

impl FrameSmoother {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            buffer: Vec::with_capacity(window),
            window,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Buffers `frame` and returns the window average once the window fills.
    ///
    /// The output carries exactly the joints of the first buffered frame; a
    /// joint that only shows up in later frames is dropped. Scores are
    /// averaged like positions, no confidence filtering happens here.
    pub fn observe(&mut self, frame: PoseFrame) -> Option<SmoothedPose> {
        self.buffer.push(frame);
        if self.buffer.len() < self.window {
            return None;
        }

        let smoothed = average(&self.buffer);
        self.buffer.clear();
        Some(smoothed)
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for FrameSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

fn average(frames: &[PoseFrame]) -> SmoothedPose {
    let Some(first) = frames.first() else {
        return SmoothedPose::default();
    };

    let averaged = first.joints().filter_map(|joint| {
        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        let mut sum_score = 0.0;
        let mut count = 0usize;

        for keypoint in frames.iter().filter_map(|frame| frame.get(joint)) {
            sum_x += keypoint.position.x;
            sum_y += keypoint.position.y;
            sum_score += keypoint.score;
            count += 1;
        }

        if count == 0 {
            return None;
        }

        let n = count as f32;
        Some(Keypoint {
            part: joint,
            position: Position::new(sum_x / n, sum_y / n),
            score: sum_score / n,
        })
    });

    SmoothedPose::new(PoseFrame::from_keypoints(averaged))
}
