pub mod capture;
pub mod comparator;
pub mod smoother;

pub use capture::capture;
pub use comparator::{
    is_match, CompareReport, ComparisonPolicy, JointDistance, PercentageMatch, PoseComparator,
    StrictTolerance,
};
pub use smoother::FrameSmoother;
