//! Alerting when a poll finds appointment slots

use std::io::{IsTerminal, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::appointment::{format_timestamp, AppointmentResult};
use crate::config::{AlertConfig, AlertPolicy};
use crate::notifier::{AlertRecord, Notification, Notifier, Permission};
use crate::state::StateHandle;

const BELL: &str = "\x07";

/// Local, attention-grabbing side effects of an alert
#[cfg_attr(test, mockall::automock)]
pub trait AlertSurface: Send + Sync {
    /// Play the short audio cue
    fn play_sound(&self) -> crate::Result<()>;

    /// Replace the window title with the activity marker
    fn set_title(&self, title: &str) -> crate::Result<()>;
}

/// Terminal bell for sound, OSC 0 escape sequence for the window title
///
/// Writes to stderr, and only when stderr is a terminal.
pub struct TerminalSurface {
    interactive: bool,
    out: Mutex<Box<dyn Write + Send>>,
}

impl Default for TerminalSurface {
    fn default() -> Self {
        Self::new(std::io::stderr().is_terminal(), Box::new(std::io::stderr()))
    }
}

impl TerminalSurface {
    pub fn new(interactive: bool, out: Box<dyn Write + Send>) -> Self {
        Self {
            interactive,
            out: Mutex::new(out),
        }
    }

    fn emit(&self, sequence: &str) -> crate::Result<()> {
        if !self.interactive {
            return Ok(());
        }
        let mut out = self
            .out
            .lock()
            .map_err(|_| crate::WatcherError::Notifier("terminal output poisoned".to_string()))?;
        out.write_all(sequence.as_bytes())?;
        out.flush()?;
        Ok(())
    }
}

impl AlertSurface for TerminalSurface {
    fn play_sound(&self) -> crate::Result<()> {
        self.emit(BELL)
    }

    fn set_title(&self, title: &str) -> crate::Result<()> {
        self.emit(&format!("\x1b]0;{}{}", title, BELL))
    }
}

/// Observes resolved polls and fires alerts for available slots
pub struct AlertDispatcher {
    notifiers: Vec<Arc<dyn Notifier>>,
    surface: Arc<dyn AlertSurface>,
    config: AlertConfig,
    timezone: String,
    state: StateHandle,
    /// Whether the previous resolved poll had slots
    had_slots: AtomicBool,
}

impl std::fmt::Debug for AlertDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertDispatcher")
            .field("notifiers", &self.notifiers)
            .field("policy", &self.config.policy)
            .finish()
    }
}

impl AlertDispatcher {
    pub fn new(
        notifiers: Vec<Arc<dyn Notifier>>,
        surface: Arc<dyn AlertSurface>,
        config: AlertConfig,
        timezone: impl Into<String>,
        state: StateHandle,
    ) -> Self {
        Self {
            notifiers,
            surface,
            config,
            timezone: timezone.into(),
            state,
            had_slots: AtomicBool::new(false),
        }
    }

    /// Decide whether this result raises an alert, updating the latched flag
    pub fn should_fire(&self, result: &AppointmentResult) -> bool {
        let has_slots = result.has_slots();
        let previous = self.had_slots.swap(has_slots, Ordering::SeqCst);
        has_slots
            && match self.config.policy {
                AlertPolicy::EveryPoll => true,
                AlertPolicy::OnTransition => !previous,
            }
    }

    /// A cycle that ended without a result leaves no slots behind
    pub fn on_failure(&self) {
        self.had_slots.store(false, Ordering::SeqCst);
    }

    /// Handle one resolved poll. Returns true when an alert fired.
    ///
    /// Never fails: surface and notifier errors are logged and recorded.
    pub async fn on_result(&self, result: &AppointmentResult) -> bool {
        if !self.should_fire(result) {
            return false;
        }

        let timestamps = result.timestamps();
        tracing::info!("{} appointment slot(s) available, alerting", timestamps.len());

        if self.config.sound {
            if let Err(e) = self.surface.play_sound() {
                tracing::warn!("Failed to play alert sound: {}", e);
            }
        }
        if self.config.set_window_title {
            if let Err(e) = self.surface.set_title(&self.config.window_title) {
                tracing::warn!("Failed to set window title: {}", e);
            }
        }
        self.state.write().await.alert_active = true;

        let notification = Notification {
            title: self.config.notification_title.clone(),
            message: self.compose_message(timestamps),
        };

        for notifier in &self.notifiers {
            self.deliver(notifier.as_ref(), &notification, timestamps.len())
                .await;
        }
        true
    }

    fn compose_message(&self, timestamps: &[String]) -> String {
        let slots: Vec<String> = timestamps
            .iter()
            .map(|raw| format_timestamp(raw, &self.timezone))
            .collect();
        format!(
            "{} appointment slot(s) available: {}",
            slots.len(),
            slots.join(", ")
        )
    }

    async fn deliver(&self, notifier: &dyn Notifier, notification: &Notification, slots: usize) {
        let permission = match notifier.permission().await {
            Permission::Undetermined => notifier.request_permission().await,
            other => other,
        };
        if permission != Permission::Granted {
            tracing::debug!(
                "Skipping '{}' notification: permission {:?}",
                notifier.type_name(),
                permission
            );
            return;
        }

        let result = notifier.notify(notification).await;
        if let Err(e) = &result {
            tracing::warn!("Notification via '{}' failed: {}", notifier.type_name(), e);
        }

        let record = AlertRecord {
            notifier_type: notifier.type_name().to_string(),
            message: notification.message.clone(),
            slot_count: slots,
            delivered: result.is_ok(),
            error: result.as_ref().err().map(|e| e.to_string()),
            timestamp_epoch_ms: current_epoch_ms(),
        };
        self.state.write().await.add_alert(record);
    }
}

pub(crate) fn current_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
