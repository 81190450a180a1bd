//! Shared poll state and alert history

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::appointment::AppointmentResult;
use crate::notifier::AlertRecord;

/// Snapshot published after every poll state change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollState {
    pub is_loading: bool,
    pub last_result: Option<AppointmentResult>,
    pub last_error: Option<String>,
    pub seconds_until_next_poll: u32,
    pub last_poll_epoch_ms: Option<u64>,
}

impl PollState {
    pub fn new(interval_seconds: u32) -> Self {
        Self {
            is_loading: false,
            last_result: None,
            last_error: None,
            seconds_until_next_poll: interval_seconds,
            last_poll_epoch_ms: None,
        }
    }
}

/// Shared state accessible by poller, alerting and dashboard
#[derive(Debug)]
pub struct SharedState {
    pub poll: PollState,
    /// Dispatched cycles that have not resolved yet
    pub in_flight: u32,
    pub polls_started: u64,
    /// Set once an alert fired; drives the title marker
    pub alert_active: bool,
    pub history: VecDeque<AlertRecord>,
    pub history_max_size: usize,
    pub started_at: Instant,
}

impl SharedState {
    pub fn new(interval_seconds: u32, history_max_size: usize) -> Self {
        Self {
            poll: PollState::new(interval_seconds),
            in_flight: 0,
            polls_started: 0,
            alert_active: false,
            history: VecDeque::with_capacity(history_max_size),
            history_max_size,
            started_at: Instant::now(),
        }
    }

    /// Enter loading: stale result and error are cleared. Returns the cycle number.
    pub fn begin_poll(&mut self) -> u64 {
        self.in_flight += 1;
        self.polls_started += 1;
        self.poll.is_loading = true;
        self.poll.last_error = None;
        self.poll.last_result = None;
        self.polls_started
    }

    /// Record a resolution; the most recently resolved cycle wins
    pub fn resolve_poll(&mut self, outcome: Result<AppointmentResult, String>, now_ms: u64) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.poll.is_loading = self.in_flight > 0;
        self.poll.last_poll_epoch_ms = Some(now_ms);
        match outcome {
            Ok(result) => {
                self.poll.last_result = Some(result);
                self.poll.last_error = None;
            }
            Err(message) => {
                self.poll.last_result = None;
                self.poll.last_error = Some(message);
            }
        }
    }

    /// Account for a cycle whose resolution is being discarded
    pub fn abandon_poll(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.poll.is_loading = self.in_flight > 0;
    }

    /// Add an alert to history
    pub fn add_alert(&mut self, record: AlertRecord) {
        if self.history_max_size == 0 {
            return;
        }
        if self.history.len() >= self.history_max_size {
            self.history.pop_front();
        }
        self.history.push_back(record);
    }
}

/// Thread-safe shared state handle
pub type StateHandle = Arc<RwLock<SharedState>>;

pub fn new_state_handle(interval_seconds: u32, history_max_size: usize) -> StateHandle {
    Arc::new(RwLock::new(SharedState::new(
        interval_seconds,
        history_max_size,
    )))
}
