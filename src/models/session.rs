use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::pose::ReferenceKind;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum ExercisePhase {
    #[default]
    Idle,
    Scanning,
    HoldCapture,
    Repeating,
    Complete,
}

impl ExercisePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExercisePhase::Idle => "Idle",
            ExercisePhase::Scanning => "Scanning",
            ExercisePhase::HoldCapture => "HoldCapture",
            ExercisePhase::Repeating => "Repeating",
            ExercisePhase::Complete => "Complete",
        }
    }

    /// Phases in which a reference pose must exist.
    pub fn holds_reference(&self) -> bool {
        matches!(
            self,
            ExercisePhase::HoldCapture | ExercisePhase::Repeating | ExercisePhase::Complete
        )
    }
}

/// Where the repetition window sends the session when it runs out.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum ExpiryTarget {
    #[default]
    Complete,
    /// Drop the references and run the scan countdown again.
    Scanning,
}

/// Read-only view of the active session handed to UI observers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: Option<String>,
    pub exercise: String,
    pub phase: ExercisePhase,
    pub countdown_remaining: Option<u32>,
    pub repetition_count: u32,
    pub target_repetitions: u32,
    pub reference_kind: Option<ReferenceKind>,
    pub started_at: Option<DateTime<Utc>>,
}
