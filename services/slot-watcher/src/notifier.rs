//! Notifier trait for sending alerts

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Whether a notifier may deliver notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Granted,
    Denied,
    /// Not asked yet; call [`Notifier::request_permission`]
    Undetermined,
}

/// A notification to be sent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

/// Record of a dispatched alert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    pub notifier_type: String,
    pub message: String,
    pub slot_count: usize,
    pub delivered: bool,
    pub error: Option<String>,
    pub timestamp_epoch_ms: u64,
}

/// Trait for sending notifications
#[async_trait]
pub trait Notifier: Send + Sync + std::fmt::Debug {
    /// Get the notifier type name (e.g. "pushover")
    fn type_name(&self) -> &str;

    /// Current permission, without prompting
    async fn permission(&self) -> Permission;

    /// Ask for permission; only meaningful while undetermined
    async fn request_permission(&self) -> Permission;

    /// Send a notification
    async fn notify(&self, notification: &Notification) -> crate::Result<()>;
}
