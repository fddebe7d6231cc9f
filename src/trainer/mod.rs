pub mod controller;
pub mod sampler;
pub mod source;
pub mod state;
pub mod timers;

pub use controller::TrainerController;
pub use source::{standing_pose, JitterPoseSource, PoseSource};
pub use state::{Countdown, CountdownKind, ExerciseSession, ObserveOutcome, TickOutcome};
