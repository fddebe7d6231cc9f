use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::models::ExpiryTarget;
use crate::pose::{smoother::DEFAULT_WINDOW, ComparisonPolicy};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ExerciseConfig {
    pub name: String,
    pub scan_countdown_secs: u32,
    pub hold_countdown_secs: u32,
    pub repetition_window_secs: u32,
    pub target_repetitions: u32,
    /// Minimum gap between two counted repetitions.
    pub cooldown_ms: u64,
    pub comparison: ComparisonPolicy,
    pub expiry_target: ExpiryTarget,
}

impl Default for ExerciseConfig {
    fn default() -> Self {
        Self {
            name: "guard-hold".into(),
            scan_countdown_secs: 5,
            hold_countdown_secs: 5,
            repetition_window_secs: 30,
            target_repetitions: 5,
            cooldown_ms: 2000,
            comparison: ComparisonPolicy::default(),
            expiry_target: ExpiryTarget::Complete,
        }
    }
}

impl ExerciseConfig {
    pub fn validate(&self) -> Result<()> {
        if self.scan_countdown_secs == 0 || self.hold_countdown_secs == 0 {
            bail!("exercise '{}': countdowns must be at least one second", self.name);
        }
        if self.repetition_window_secs == 0 {
            bail!("exercise '{}': repetition window must be at least one second", self.name);
        }
        if self.target_repetitions == 0 {
            bail!("exercise '{}': target_repetitions must be greater than zero", self.name);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TrainerSettings {
    pub sampling_period_ms: u64,
    pub smoothing_window: usize,
    pub exercises: Vec<ExerciseConfig>,
}

impl Default for TrainerSettings {
    fn default() -> Self {
        Self {
            sampling_period_ms: 100,
            smoothing_window: DEFAULT_WINDOW,
            exercises: vec![
                ExerciseConfig::default(),
                ExerciseConfig {
                    name: "extended-hold".into(),
                    hold_countdown_secs: 10,
                    ..ExerciseConfig::default()
                },
            ],
        }
    }
}

impl TrainerSettings {
    pub fn validate(&self) -> Result<()> {
        if self.sampling_period_ms == 0 {
            bail!("sampling_period_ms must be greater than zero");
        }
        if self.smoothing_window == 0 {
            bail!("smoothing_window must be greater than zero");
        }
        if self.exercises.is_empty() {
            bail!("exercise plan is empty");
        }
        for exercise in &self.exercises {
            exercise.validate()?;
        }
        Ok(())
    }
}

/// JSON-backed settings file. A missing or unreadable file yields defaults.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<TrainerSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            match serde_json::from_str::<TrainerSettings>(&contents) {
                Ok(settings) if settings.validate().is_ok() => settings,
                _ => {
                    log::warn!(
                        "Ignoring invalid settings at {}; using defaults",
                        path.display()
                    );
                    TrainerSettings::default()
                }
            }
        } else {
            TrainerSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn settings(&self) -> TrainerSettings {
        self.read().clone()
    }

    pub fn update_settings(&self, settings: TrainerSettings) -> Result<()> {
        settings.validate()?;
        let mut guard = self.write();
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: TrainerSettings = serde_json::from_str(&contents)?;
        data.validate()?;
        *self.write() = data;
        Ok(())
    }

    fn persist(&self, data: &TrainerSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, TrainerSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, TrainerSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// `DEFENSE_TRAINER_DEBUG=1` (or `true`) turns on debug-level logging.
pub fn debug_mode() -> bool {
    std::env::var("DEFENSE_TRAINER_DEBUG")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
