pub mod models;
pub mod pose;
pub mod render;
pub mod settings;
pub mod trainer;
mod utils;

pub use models::{
    ExercisePhase, ExpiryTarget, JointName, Keypoint, PoseFrame, Position, ReferenceKind,
    ReferencePose, SessionSnapshot, SmoothedPose,
};
pub use pose::{
    capture, is_match, ComparisonPolicy, FrameSmoother, PercentageMatch, PoseComparator,
    StrictTolerance,
};
pub use render::{LogRenderSink, RenderSink};
pub use settings::{ExerciseConfig, SettingsStore, TrainerSettings};
pub use trainer::{ExerciseSession, PoseSource, TrainerController};

/// Initialises `env_logger` (honours `RUST_LOG`). Safe to call more than once.
pub fn init_logging() {
    let level = if settings::debug_mode() {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    let _ = env_logger::Builder::from_default_env()
        .filter_level(level)
        .try_init();
}
