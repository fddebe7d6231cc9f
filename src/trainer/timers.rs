//! Countdown timers owned by the active exercise session.
//!
//! A [`PhaseTimer`] is acquired when the session starts a countdown and is
//! released by dropping it. Dropping cancels the token and aborts the task,
//! and the task re-checks token and epoch under the session lock before every
//! tick, so a tick that was already queued when the timer was released finds
//! nothing to do.

use std::sync::{Arc, Weak};

use tokio::{
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use super::controller::{Shared, TrainerCore};
use super::state::TickOutcome;
use crate::{log_debug, log_info};

const ENABLE_LOGS: bool = true;

pub struct PhaseTimer {
    epoch: u64,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl PhaseTimer {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

impl Drop for PhaseTimer {
    fn drop(&mut self) {
        self.token.cancel();
        self.handle.abort();
    }
}

/// Makes the running timer match the session's countdown: releases a timer
/// whose countdown is gone or superseded and acquires one for a new countdown.
///
/// Must be called with the core lock held, after every session transition.
pub(crate) fn sync_timer(core: &mut TrainerCore, shared: &Arc<Shared>) {
    let wanted = core.session.countdown().map(|c| c.epoch);
    let current = core.timer.as_ref().map(PhaseTimer::epoch);
    if wanted == current {
        return;
    }

    if let Some(released) = core.timer.take() {
        log_debug!("releasing countdown timer (epoch {})", released.epoch());
    }
    if let Some(epoch) = wanted {
        core.timer = Some(spawn_countdown(Arc::downgrade(shared), shared.tick_interval, epoch));
    }
}

fn spawn_countdown(shared: Weak<Shared>, period: time::Duration, epoch: u64) -> PhaseTimer {
    let token = CancellationToken::new();
    let task_token = token.clone();

    let handle = tokio::spawn(async move {
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = task_token.cancelled() => break,
            }

            let Some(shared) = shared.upgrade() else {
                break;
            };
            let mut core = shared.core.lock().await;
            if task_token.is_cancelled()
                || core.session.countdown().map(|c| c.epoch) != Some(epoch)
            {
                break;
            }

            let outcome = core.session.tick_countdown();
            if let TickOutcome::Expired { kind, phase } = outcome {
                log_info!("{:?} countdown finished, phase now {}", kind, phase.as_str());
            }

            sync_timer(&mut core, &shared);
            shared.publish(&core);

            if !matches!(outcome, TickOutcome::Continue { .. }) {
                break;
            }
        }
    });

    PhaseTimer {
        epoch,
        token,
        handle,
    }
}
