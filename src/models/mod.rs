pub mod pose;
pub mod session;

pub use pose::{JointName, Keypoint, PoseFrame, Position, ReferenceKind, ReferencePose, SmoothedPose};
pub use session::{ExercisePhase, ExpiryTarget, SessionSnapshot};
