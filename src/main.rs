use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use log::info;

use defense_trainer::{
    init_logging,
    trainer::{standing_pose, JitterPoseSource},
    ExercisePhase, LogRenderSink, SessionSnapshot, SettingsStore, TrainerController,
    TrainerSettings,
};

const JITTER_PX: f32 = 6.0;
const DROP_RATE: f64 = 0.05;

/// Runs the first exercise of the plan against a synthetic camera and prints
/// the final session snapshot as JSON.
///
/// Usage: `defense-trainer [settings.json]`
#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let settings = match std::env::args().nth(1) {
        Some(path) => SettingsStore::new(PathBuf::from(path))?.settings(),
        None => TrainerSettings::default(),
    };

    let trainer = TrainerController::new(settings, Arc::new(LogRenderSink))?;
    trainer
        .start_sampling(JitterPoseSource::new(standing_pose(), JITTER_PX, DROP_RATE))
        .await?;

    let mut updates = trainer.subscribe();
    trainer.start().await?;
    info!("hold still for the scan");

    wait_for(&mut updates, |s| s.phase == ExercisePhase::HoldCapture).await?;
    trainer.confirm_hold().await?;
    info!("get into the hold pose");

    let finished = wait_for(&mut updates, |s| s.phase == ExercisePhase::Complete).await?;
    trainer.shutdown().await?;

    println!("{}", serde_json::to_string_pretty(&finished)?);
    Ok(())
}

async fn wait_for<F>(
    updates: &mut tokio::sync::watch::Receiver<SessionSnapshot>,
    done: F,
) -> Result<SessionSnapshot>
where
    F: Fn(&SessionSnapshot) -> bool,
{
    let wait = async {
        loop {
            {
                let snapshot = updates.borrow_and_update();
                if let Some(remaining) = snapshot.countdown_remaining {
                    info!("{} ... {}", snapshot.phase.as_str(), remaining);
                }
                if done(&snapshot) {
                    return Ok::<_, anyhow::Error>(snapshot.clone());
                }
            }
            updates
                .changed()
                .await
                .context("trainer stopped publishing updates")?;
        }
    };

    match tokio::time::timeout(Duration::from_secs(120), wait).await {
        Ok(result) => result,
        Err(_) => bail!("timed out waiting for the exercise to progress"),
    }
}
