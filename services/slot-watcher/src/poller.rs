//! Poller: countdown timer driving relay fetches and alerting
//!
//! Poll cycles are dispatched as independent tasks. The countdown never
//! waits for a cycle to resolve, so cycles may overlap; whichever cycle
//! resolves last owns the published result.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;

use crate::alert::{current_epoch_ms, AlertDispatcher};
use crate::appointment::parse_body;
use crate::config::PollingConfig;
use crate::relay::RelayRequester;
use crate::state::{PollState, SharedState, StateHandle};
use crate::target::PollTarget;

/// Receives every published [`PollState`]
pub type UpdateListener = Arc<dyn Fn(&PollState) + Send + Sync>;

/// Seconds until the next poll, reloaded to the full interval when it runs out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    interval: u32,
    remaining: u32,
}

impl Countdown {
    pub fn new(interval: u32) -> Self {
        let interval = interval.max(1);
        Self {
            interval,
            remaining: interval,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Advance one tick. Returns true when a poll is due; the countdown
    /// is then already reset to the full interval.
    pub fn tick(&mut self) -> bool {
        if self.remaining <= 1 {
            self.remaining = self.interval;
            true
        } else {
            self.remaining -= 1;
            false
        }
    }
}

/// Owns the poll schedule and is the only writer of [`PollState`]
pub struct Poller {
    target: PollTarget,
    requester: RelayRequester,
    alerts: AlertDispatcher,
    state: StateHandle,
    interval_seconds: u32,
    tick: Duration,
    listener: Option<UpdateListener>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("target", &self.target)
            .field("interval_seconds", &self.interval_seconds)
            .field("tick", &self.tick)
            .finish()
    }
}

/// Handle to a started poller
#[derive(Debug)]
pub struct PollerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Stop the timer. In-flight cycles are not aborted; their results are dropped.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!("Poller task ended abnormally: {}", e);
        }
    }

    /// Wait until the poller is cancelled elsewhere
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            tracing::warn!("Poller task ended abnormally: {}", e);
        }
    }
}

impl Poller {
    pub fn new(
        target: PollTarget,
        requester: RelayRequester,
        alerts: AlertDispatcher,
        state: StateHandle,
        polling: &PollingConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            target,
            requester,
            alerts,
            state,
            interval_seconds: polling.interval_seconds.max(1),
            tick: Duration::from_millis(polling.tick_millis.max(1)),
            listener: None,
            cancel,
        }
    }

    pub fn with_listener(mut self, listener: UpdateListener) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn state(&self) -> &StateHandle {
        &self.state
    }

    /// Copy of the poll state for the listener, taken while the guard is held
    fn snapshot(&self, state: &SharedState) -> Option<PollState> {
        self.listener.as_ref().map(|_| state.poll.clone())
    }

    /// Call the listener; the state lock must already be released
    fn publish(&self, snapshot: Option<PollState>) {
        if let (Some(listener), Some(poll)) = (&self.listener, snapshot) {
            listener(&poll);
        }
    }

    /// Dispatch one poll cycle without waiting for it
    pub fn poll_once(self: &Arc<Self>) {
        let poller = Arc::clone(self);
        tokio::spawn(async move { poller.run_cycle().await });
    }

    /// Run one full poll cycle: fetch, classify, publish, alert
    pub async fn run_cycle(&self) {
        let (cycle, snapshot) = {
            let mut state = self.state.write().await;
            let cycle = state.begin_poll();
            (cycle, self.snapshot(&state))
        };
        self.publish(snapshot);
        tracing::debug!("Poll cycle {} dispatched", cycle);

        let outcome = match self.requester.fetch_via_relays(&self.target).await {
            Ok(body) => parse_body(&body),
            Err(e) => Err(e),
        };

        if self.cancel.is_cancelled() {
            tracing::debug!("Dropping poll cycle {} resolved after shutdown", cycle);
            self.state.write().await.abandon_poll();
            return;
        }

        let resolved = match outcome {
            Ok(result) => {
                tracing::info!("Poll cycle {} resolved: {:?}", cycle, result);
                Ok(result)
            }
            Err(e) => {
                tracing::warn!("Poll cycle {} failed: {}", cycle, e);
                Err(e.user_message())
            }
        };
        let for_alert = resolved.as_ref().ok().cloned();

        let snapshot = {
            let mut state = self.state.write().await;
            state.resolve_poll(resolved, current_epoch_ms());
            self.snapshot(&state)
        };
        self.publish(snapshot);

        match for_alert {
            Some(result) => {
                self.alerts.on_result(&result).await;
            }
            None => self.alerts.on_failure(),
        }
    }

    /// Poll immediately, then on every countdown expiry until cancelled
    pub fn start(self: &Arc<Self>) -> PollerHandle {
        let poller = Arc::clone(self);
        let task = tokio::spawn(async move { poller.run().await });
        PollerHandle {
            cancel: self.cancel.clone(),
            task,
        }
    }

    async fn run(self: Arc<Self>) {
        tracing::info!(
            "Polling {} every {}s",
            self.target.url(),
            self.interval_seconds
        );
        let mut countdown = Countdown::new(self.interval_seconds);
        let snapshot = {
            let mut state = self.state.write().await;
            state.poll.seconds_until_next_poll = countdown.remaining();
            self.snapshot(&state)
        };
        self.publish(snapshot);
        self.poll_once();

        let mut ticker = interval_at(Instant::now() + self.tick, self.tick);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let due = countdown.tick();
                    let snapshot = {
                        let mut state = self.state.write().await;
                        state.poll.seconds_until_next_poll = countdown.remaining();
                        self.snapshot(&state)
                    };
                    self.publish(snapshot);
                    if due {
                        self.poll_once();
                    }
                }
                _ = self.cancel.cancelled() => {
                    tracing::debug!("Poller cancelled");
                    break;
                }
            }
        }
    }
}
