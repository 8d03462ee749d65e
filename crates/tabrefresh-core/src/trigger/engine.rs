//! Recurring per-tab jobs.
//!
//! Each armed trigger is one spawned task driven by a tokio interval. The
//! first tick fires one period after arming; the next tick is scheduled one
//! period after the previous tick finished, so a slow host or a pending
//! prompt never causes back-to-back reloads.

use std::future::Future;
use std::time::Duration;

use tabrefresh_protocol::TabId;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Whether the job keeps running after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickFlow {
    Continue,
    Stop,
}

/// Exclusive handle to an armed trigger. Dropping it disarms the job.
#[derive(Debug)]
pub struct TriggerHandle {
    tab_id: TabId,
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl TriggerHandle {
    /// Cancel the job. Idempotent; an in-flight tick is abandoned at its
    /// next await point.
    pub fn disarm(&self) {
        if !self.token.is_cancelled() {
            debug!(event = "core.trigger.disarm_completed", tab_id = %self.tab_id);
        }
        self.token.cancel();
    }

    pub fn is_armed(&self) -> bool {
        !self.token.is_cancelled() && !self.task.is_finished()
    }

    pub fn tab_id(&self) -> TabId {
        self.tab_id
    }
}

impl Drop for TriggerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Spawn a recurring job calling `on_tick` every `period`.
///
/// Every tick races the cancellation token, so a disarm during an awaited
/// host call abandons the rest of that tick. Must be called from within a
/// tokio runtime.
pub fn arm<F, Fut>(tab_id: TabId, period: Duration, mut on_tick: F) -> TriggerHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = TickFlow> + Send + 'static,
{
    let token = CancellationToken::new();
    let job_token = token.clone();

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = job_token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let flow = tokio::select! {
                _ = job_token.cancelled() => break,
                flow = on_tick() => flow,
            };

            if flow == TickFlow::Stop {
                break;
            }
            ticker.reset();
        }

        debug!(event = "core.trigger.job_ended", tab_id = %tab_id);
    });

    debug!(
        event = "core.trigger.arm_completed",
        tab_id = %tab_id,
        period_ms = period.as_millis() as u64
    );

    TriggerHandle {
        tab_id,
        token,
        task,
    }
}
