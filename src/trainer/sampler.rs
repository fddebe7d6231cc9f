use std::sync::{Arc, Weak};

use anyhow::{bail, Context, Result};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::controller::Shared;
use super::source::PoseSource;
use super::state::ObserveOutcome;
use super::timers::sync_timer;
use crate::pose::FrameSmoother;
use crate::{log_debug, log_info};

const ENABLE_LOGS: bool = true;

/// Owns the periodic pose-acquisition task.
pub struct SamplingController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl SamplingController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub(crate) fn start_sampling(
        &mut self,
        source: Box<dyn PoseSource>,
        shared: &Arc<Shared>,
        period: Duration,
        window: usize,
    ) -> Result<()> {
        if self.handle.is_some() {
            bail!("pose sampling already active");
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(sampling_loop(
            source,
            Arc::downgrade(shared),
            period,
            window,
            cancel_token.clone(),
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub async fn stop_sampling(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("sampling loop task failed to join")
        } else {
            Ok(())
        }
    }
}

impl Default for SamplingController {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SamplingController {
    fn drop(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
    }
}

async fn sampling_loop(
    mut source: Box<dyn PoseSource>,
    shared: Weak<Shared>,
    period: Duration,
    window: usize,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut smoother = FrameSmoother::new(window);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(shared) = shared.upgrade() else {
                    break;
                };
                sample_once(source.as_mut(), &mut smoother, &shared).await;
            }
            _ = cancel_token.cancelled() => {
                log_info!("sampling loop shutting down");
                break;
            }
        }
    }
}

async fn sample_once(source: &mut dyn PoseSource, smoother: &mut FrameSmoother, shared: &Arc<Shared>) {
    let Some(frame) = source.estimate() else {
        return;
    };

    let smoothed = smoother.observe(frame.clone());

    let mut core = shared.core.lock().await;
    shared.sink.render(&frame, core.session.reference());

    let Some(pose) = smoothed else {
        return;
    };

    let outcome = core.session.observe(pose, Instant::now());
    match outcome {
        ObserveOutcome::Stored => {}
        ObserveOutcome::Mismatch | ObserveOutcome::CoolingDown => {
            log_debug!("sample not counted: {:?}", outcome);
        }
        ObserveOutcome::Captured(_)
        | ObserveOutcome::Counted(_)
        | ObserveOutcome::TargetReached(_) => {
            sync_timer(&mut core, shared);
            shared.publish(&core);
        }
    }
}
