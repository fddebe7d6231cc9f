//! Exercise protocol: scan countdown, hold capture, timed repetition window.
//!
//! Everything here is synchronous and clock-injected. The controller decides
//! when a second has passed and when a smoothed pose arrived; this module
//! only decides what those events mean for the session.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use crate::models::{
    ExercisePhase, ExpiryTarget, ReferenceKind, ReferencePose, SessionSnapshot, SmoothedPose,
};
use crate::pose::{capture, PoseComparator};
use crate::settings::ExerciseConfig;
use crate::{log_debug, log_info, log_warn};

const ENABLE_LOGS: bool = true;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownKind {
    Scan,
    Hold,
    Repetition,
}

/// A running one-second countdown. `epoch` is unique per countdown start
/// within a session, so a timer can tell whether it still owns the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    pub kind: CountdownKind,
    pub remaining: u32,
    pub epoch: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    NoCountdown,
    Continue { remaining: u32 },
    Expired { kind: CountdownKind, phase: ExercisePhase },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserveOutcome {
    /// Pose recorded as the latest sample; nothing else to do in this phase.
    Stored,
    /// A capture deferred for lack of a pose has now happened.
    Captured(ReferenceKind),
    Mismatch,
    /// Pose matched but the previous repetition is too recent.
    CoolingDown,
    Counted(u32),
    TargetReached(u32),
}

pub struct ExerciseSession {
    config: ExerciseConfig,
    phase: ExercisePhase,
    countdown: Option<Countdown>,
    epochs: u64,
    repetition_count: u32,
    last_repetition_at: Option<Instant>,
    reference: Option<ReferencePose>,
    pending_capture: Option<ReferenceKind>,
    /// Sensor stream state; survives `reset` since the camera keeps running.
    latest_pose: Option<SmoothedPose>,
    session_id: Option<String>,
    started_at: Option<DateTime<Utc>>,
}

impl ExerciseSession {
    pub fn new(config: ExerciseConfig) -> Self {
        Self {
            config,
            phase: ExercisePhase::Idle,
            countdown: None,
            epochs: 0,
            repetition_count: 0,
            last_repetition_at: None,
            reference: None,
            pending_capture: None,
            latest_pose: None,
            session_id: None,
            started_at: None,
        }
    }

    pub fn config(&self) -> &ExerciseConfig {
        &self.config
    }

    pub fn phase(&self) -> ExercisePhase {
        self.phase
    }

    pub fn countdown(&self) -> Option<Countdown> {
        self.countdown
    }

    pub fn countdown_remaining(&self) -> Option<u32> {
        self.countdown.map(|c| c.remaining)
    }

    pub fn repetition_count(&self) -> u32 {
        self.repetition_count
    }

    pub fn last_repetition_at(&self) -> Option<Instant> {
        self.last_repetition_at
    }

    pub fn reference(&self) -> Option<&ReferencePose> {
        self.reference.as_ref()
    }

    pub fn latest_pose(&self) -> Option<&SmoothedPose> {
        self.latest_pose.as_ref()
    }

    pub fn awaiting_capture(&self) -> Option<ReferenceKind> {
        self.pending_capture
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id.clone(),
            exercise: self.config.name.clone(),
            phase: self.phase,
            countdown_remaining: self.countdown_remaining(),
            repetition_count: self.repetition_count,
            target_repetitions: self.config.target_repetitions,
            reference_kind: self.reference.as_ref().map(|r| r.kind),
            started_at: self.started_at,
        }
    }

    /// Idle or Complete → Scanning with a fresh scan countdown.
    pub fn start(&mut self) -> Result<()> {
        if !matches!(self.phase, ExercisePhase::Idle | ExercisePhase::Complete) {
            bail!("exercise session already active ({})", self.phase.as_str());
        }

        self.clear_progress();
        self.session_id = Some(Uuid::new_v4().to_string());
        self.started_at = Some(Utc::now());
        self.phase = ExercisePhase::Scanning;
        self.begin_countdown(CountdownKind::Scan, self.config.scan_countdown_secs);

        log_info!(
            "exercise '{}' started (session {})",
            self.config.name,
            self.session_id.as_deref().unwrap_or("-")
        );
        Ok(())
    }

    /// Starts the hold countdown. Only valid once the neutral reference exists
    /// and no hold countdown is already running.
    pub fn confirm_hold(&mut self) -> Result<()> {
        if self.phase != ExercisePhase::HoldCapture {
            bail!("cannot confirm hold while {}", self.phase.as_str());
        }
        if self.countdown.is_some() || self.pending_capture.is_some() {
            bail!("hold capture already in progress");
        }

        self.begin_countdown(CountdownKind::Hold, self.config.hold_countdown_secs);
        log_info!("hold countdown started ({}s)", self.config.hold_countdown_secs);
        Ok(())
    }

    pub fn reset(&mut self) {
        self.clear_progress();
        self.session_id = None;
        self.started_at = None;
        self.phase = ExercisePhase::Idle;
        log_info!("exercise '{}' reset", self.config.name);
    }

    /// Swaps in another exercise and returns to Idle.
    pub fn load_exercise(&mut self, config: ExerciseConfig) {
        self.reset();
        self.config = config;
    }

    /// Advances the running countdown by one second.
    pub fn tick_countdown(&mut self) -> TickOutcome {
        let Some(mut countdown) = self.countdown else {
            return TickOutcome::NoCountdown;
        };

        countdown.remaining = countdown.remaining.saturating_sub(1);
        if countdown.remaining > 0 {
            self.countdown = Some(countdown);
            return TickOutcome::Continue {
                remaining: countdown.remaining,
            };
        }

        self.countdown = None;
        self.expire(countdown.kind);
        TickOutcome::Expired {
            kind: countdown.kind,
            phase: self.phase,
        }
    }

    /// Feeds one smoothed pose taken at `now`.
    pub fn observe(&mut self, pose: SmoothedPose, now: Instant) -> ObserveOutcome {
        if let Some(kind) = self.pending_capture.take() {
            self.apply_capture(kind, &pose);
            self.latest_pose = Some(pose);
            return ObserveOutcome::Captured(kind);
        }

        let outcome = if self.phase == ExercisePhase::Repeating {
            self.score_repetition(&pose, now)
        } else {
            ObserveOutcome::Stored
        };
        self.latest_pose = Some(pose);
        outcome
    }

    fn score_repetition(&mut self, pose: &SmoothedPose, now: Instant) -> ObserveOutcome {
        let Some(reference) = self.reference.as_ref() else {
            return ObserveOutcome::Mismatch;
        };

        let report = self.config.comparison.compare(pose, reference);
        if !report.matched {
            if let Some(joint) = report.worst_offender() {
                log_debug!(
                    "pose mismatch: {} off by {:?}px",
                    joint.joint.as_str(),
                    joint.distance
                );
            }
            return ObserveOutcome::Mismatch;
        }

        let cooldown = Duration::from_millis(self.config.cooldown_ms);
        if let Some(last) = self.last_repetition_at {
            if now.saturating_duration_since(last) <= cooldown {
                return ObserveOutcome::CoolingDown;
            }
        }

        self.repetition_count += 1;
        self.last_repetition_at = Some(now);
        log_info!(
            "repetition {}/{} counted",
            self.repetition_count,
            self.config.target_repetitions
        );

        if self.repetition_count >= self.config.target_repetitions {
            self.countdown = None;
            self.phase = ExercisePhase::Complete;
            log_info!("exercise '{}' complete", self.config.name);
            return ObserveOutcome::TargetReached(self.repetition_count);
        }
        ObserveOutcome::Counted(self.repetition_count)
    }

    fn expire(&mut self, kind: CountdownKind) {
        match kind {
            CountdownKind::Scan => self.capture_or_defer(ReferenceKind::Straight),
            CountdownKind::Hold => self.capture_or_defer(ReferenceKind::Hold),
            CountdownKind::Repetition => match self.config.expiry_target {
                ExpiryTarget::Complete => {
                    self.phase = ExercisePhase::Complete;
                    log_info!(
                        "repetition window closed with {}/{}",
                        self.repetition_count,
                        self.config.target_repetitions
                    );
                }
                ExpiryTarget::Scanning => {
                    self.reference = None;
                    self.phase = ExercisePhase::Scanning;
                    self.begin_countdown(CountdownKind::Scan, self.config.scan_countdown_secs);
                    log_info!("repetition window closed; rescanning");
                }
            },
        }
    }

    fn capture_or_defer(&mut self, kind: ReferenceKind) {
        match self.latest_pose.take() {
            Some(pose) => {
                self.apply_capture(kind, &pose);
                self.latest_pose = Some(pose);
            }
            None => {
                log_warn!("no pose yet; deferring {} capture", kind.as_str());
                self.pending_capture = Some(kind);
            }
        }
    }

    fn apply_capture(&mut self, kind: ReferenceKind, pose: &SmoothedPose) {
        self.reference = Some(capture(pose, kind));
        match kind {
            ReferenceKind::Straight => {
                self.phase = ExercisePhase::HoldCapture;
            }
            ReferenceKind::Hold => {
                self.phase = ExercisePhase::Repeating;
                self.repetition_count = 0;
                self.last_repetition_at = None;
                self.begin_countdown(
                    CountdownKind::Repetition,
                    self.config.repetition_window_secs,
                );
            }
        }
        log_info!(
            "{} reference captured ({} joints), phase {}",
            kind.as_str(),
            pose.frame().len(),
            self.phase.as_str()
        );
    }

    fn begin_countdown(&mut self, kind: CountdownKind, secs: u32) {
        self.epochs += 1;
        self.countdown = Some(Countdown {
            kind,
            remaining: secs,
            epoch: self.epochs,
        });
    }

    fn clear_progress(&mut self) {
        self.countdown = None;
        self.repetition_count = 0;
        self.last_repetition_at = None;
        self.reference = None;
        self.pending_capture = None;
    }
}
