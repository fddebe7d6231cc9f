use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use log::info;
use tokio::sync::{watch, Mutex};

use super::sampler::SamplingController;
use super::source::PoseSource;
use super::state::ExerciseSession;
use super::timers::{sync_timer, PhaseTimer};
use crate::models::{ReferencePose, SessionSnapshot};
use crate::render::RenderSink;
use crate::settings::{ExerciseConfig, TrainerSettings};

const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

/// Session state plus the timer currently bound to it. Guarded by one lock so
/// a transition and its timer bookkeeping are never observed apart.
pub(crate) struct TrainerCore {
    pub(crate) session: ExerciseSession,
    pub(crate) timer: Option<PhaseTimer>,
    plan: Vec<ExerciseConfig>,
    exercise_index: usize,
}

pub(crate) struct Shared {
    pub(crate) core: Mutex<TrainerCore>,
    pub(crate) sink: Arc<dyn RenderSink>,
    pub(crate) tick_interval: Duration,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl Shared {
    pub(crate) fn publish(&self, core: &TrainerCore) {
        self.snapshot_tx.send_replace(core.session.snapshot());
    }
}

/// In-process control surface for the trainer UI.
///
/// Cloning is cheap; every clone drives the same session.
#[derive(Clone)]
pub struct TrainerController {
    shared: Arc<Shared>,
    sampling: Arc<Mutex<SamplingController>>,
    sampling_period: Duration,
    smoothing_window: usize,
}

impl TrainerController {
    pub fn new(settings: TrainerSettings, sink: Arc<dyn RenderSink>) -> Result<Self> {
        settings.validate()?;

        let TrainerSettings {
            sampling_period_ms,
            smoothing_window,
            exercises,
        } = settings;

        let session = ExerciseSession::new(exercises[0].clone());
        let (snapshot_tx, _) = watch::channel(session.snapshot());

        let core = TrainerCore {
            session,
            timer: None,
            plan: exercises,
            exercise_index: 0,
        };

        Ok(Self {
            shared: Arc::new(Shared {
                core: Mutex::new(core),
                sink,
                tick_interval: COUNTDOWN_TICK,
                snapshot_tx,
            }),
            sampling: Arc::new(Mutex::new(SamplingController::new())),
            sampling_period: Duration::from_millis(sampling_period_ms),
            smoothing_window,
        })
    }

    /// Begins pulling frames from `source` every sampling period.
    pub async fn start_sampling<S>(&self, source: S) -> Result<()>
    where
        S: PoseSource + 'static,
    {
        self.sampling.lock().await.start_sampling(
            Box::new(source),
            &self.shared,
            self.sampling_period,
            self.smoothing_window,
        )?;
        info!(
            "pose sampling started ({}ms period, window {})",
            self.sampling_period.as_millis(),
            self.smoothing_window
        );
        Ok(())
    }

    pub async fn stop_sampling(&self) -> Result<()> {
        self.sampling.lock().await.stop_sampling().await
    }

    pub async fn is_sampling(&self) -> bool {
        self.sampling.lock().await.is_running()
    }

    pub async fn start(&self) -> Result<SessionSnapshot> {
        self.transition(|session| session.start()).await
    }

    pub async fn confirm_hold(&self) -> Result<SessionSnapshot> {
        self.transition(|session| session.confirm_hold()).await
    }

    pub async fn reset(&self) -> SessionSnapshot {
        let mut core = self.shared.core.lock().await;
        core.session.reset();
        sync_timer(&mut core, &self.shared);
        self.shared.publish(&core);
        core.session.snapshot()
    }

    /// Moves to the next exercise of the plan, back in Idle. Returns `None`
    /// and resets the current exercise when the plan is exhausted.
    pub async fn next_exercise(&self) -> Option<String> {
        let mut core = self.shared.core.lock().await;
        let next = core.exercise_index + 1;

        let name = match core.plan.get(next).cloned() {
            Some(config) => {
                let name = config.name.clone();
                core.exercise_index = next;
                core.session.load_exercise(config);
                info!("advanced to exercise '{}'", name);
                Some(name)
            }
            None => {
                core.session.reset();
                info!("exercise plan finished");
                None
            }
        };

        sync_timer(&mut core, &self.shared);
        self.shared.publish(&core);
        name
    }

    /// Stops sampling and releases every timer. The controller can be
    /// restarted afterwards with `start_sampling` + `start`.
    pub async fn shutdown(&self) -> Result<()> {
        let stopped = self.stop_sampling().await;

        let mut core = self.shared.core.lock().await;
        core.session.reset();
        core.timer = None;
        self.shared.publish(&core);
        drop(core);

        info!("trainer shut down");
        stopped
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.shared.core.lock().await.session.snapshot()
    }

    pub async fn reference(&self) -> Option<ReferencePose> {
        self.shared.core.lock().await.session.reference().cloned()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.shared.snapshot_tx.subscribe()
    }

    #[cfg(test)]
    pub(crate) async fn timer_epoch(&self) -> Option<u64> {
        self.shared.core.lock().await.timer.as_ref().map(PhaseTimer::epoch)
    }

    async fn transition<F>(&self, apply: F) -> Result<SessionSnapshot>
    where
        F: FnOnce(&mut ExerciseSession) -> Result<()>,
    {
        let mut core = self.shared.core.lock().await;
        apply(&mut core.session)?;
        sync_timer(&mut core, &self.shared);
        self.shared.publish(&core);
        Ok(core.session.snapshot())
    }
}
