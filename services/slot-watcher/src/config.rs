//! Configuration types for the slot watcher

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default = "default_relays")]
    pub relays: Vec<String>,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub alert: AlertConfig,
    #[serde(default = "default_notifiers")]
    pub notifiers: Vec<NotifierConfig>,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target: TargetConfig::default(),
            relays: default_relays(),
            polling: PollingConfig::default(),
            alert: AlertConfig::default(),
            notifiers: default_notifiers(),
            display: DisplayConfig::default(),
            dashboard: DashboardConfig::default(),
        }
    }
}

/// The upstream availability query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Full target URL; overrides the composed query when set
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_date")]
    pub date: String,
    #[serde(default = "default_office_id")]
    pub office_id: String,
    #[serde(default = "default_service_id")]
    pub service_id: String,
    #[serde(default = "default_service_count")]
    pub service_count: u32,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            url: None,
            base_url: default_base_url(),
            date: default_date(),
            office_id: default_office_id(),
            service_id: default_service_id(),
            service_count: default_service_count(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u32,
    #[serde(default = "default_tick_millis")]
    pub tick_millis: u64,
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval_seconds(),
            tick_millis: default_tick_millis(),
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }
}

/// When to raise an alert while slots are available
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertPolicy {
    /// Alert on every poll that finds slots
    #[default]
    EveryPoll,
    /// Alert only when slots appear after a poll without slots
    OnTransition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    #[serde(default)]
    pub policy: AlertPolicy,
    #[serde(default = "default_notification_title")]
    pub notification_title: String,
    #[serde(default = "default_window_title")]
    pub window_title: String,
    #[serde(default = "default_true")]
    pub sound: bool,
    #[serde(default = "default_true")]
    pub set_window_title: bool,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            policy: AlertPolicy::default(),
            notification_title: default_notification_title(),
            window_title: default_window_title(),
            sound: true,
            set_window_title: true,
        }
    }
}

/// Notifier configuration with tagged enum for extensibility
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NotifierConfig {
    #[serde(rename = "console")]
    Console {},
    #[serde(rename = "pushover")]
    Pushover {
        api_token: String,
        user_key: String,
        #[serde(default)]
        priority: i8,
        #[serde(default = "default_pushover_sound")]
        sound: String,
    },
}

impl NotifierConfig {
    pub fn type_name(&self) -> &str {
        match self {
            NotifierConfig::Console {} => "console",
            NotifierConfig::Pushover { .. } => "pushover",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
        }
    }
}

/// Dashboard configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_dashboard_port")]
    pub port: u16,
    #[serde(default = "default_history_size")]
    pub history_size: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_dashboard_port(),
            history_size: default_history_size(),
        }
    }
}

const ENV_PREFIX: &str = "env:";

impl Config {
    /// Reject values the poller cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.polling.interval_seconds == 0 {
            return Err(crate::WatcherError::Config(
                "polling.interval_seconds must be at least 1".to_string(),
            ));
        }
        if self.polling.tick_millis == 0 {
            return Err(crate::WatcherError::Config(
                "polling.tick_millis must be at least 1".to_string(),
            ));
        }
        if self.display.timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(crate::WatcherError::Config(format!(
                "Unknown display timezone '{}'",
                self.display.timezone
            )));
        }
        Ok(())
    }

    /// Replace `env:NAME` secrets with the value of the environment variable
    pub fn resolve_secrets(&mut self) -> crate::Result<()> {
        for notifier in &mut self.notifiers {
            if let NotifierConfig::Pushover {
                api_token,
                user_key,
                ..
            } = notifier
            {
                *api_token = resolve_secret(api_token)?;
                *user_key = resolve_secret(user_key)?;
            }
        }
        Ok(())
    }
}

fn resolve_secret(value: &str) -> crate::Result<String> {
    match value.strip_prefix(ENV_PREFIX) {
        Some(var) => std::env::var(var).map_err(|_| {
            crate::WatcherError::Config(format!("Environment variable {} is not set", var))
        }),
        None => Ok(value.to_string()),
    }
}

fn default_base_url() -> String {
    "https://www48.muenchen.de/buergeransicht/api/backend/available-appointments".to_string()
}

fn default_date() -> String {
    "Invalid date".to_string()
}

fn default_office_id() -> String {
    "10187259".to_string()
}

fn default_service_id() -> String {
    "10339027".to_string()
}

fn default_service_count() -> u32 {
    1
}

fn default_relays() -> Vec<String> {
    vec![
        "https://corsproxy.io/?".to_string(),
        "https://cors-anywhere.herokuapp.com/".to_string(),
        "https://api.allorigins.win/raw?url=".to_string(),
    ]
}

fn default_interval_seconds() -> u32 {
    180
}

fn default_tick_millis() -> u64 {
    1000
}

fn default_request_timeout_seconds() -> u64 {
    30
}

fn default_notification_title() -> String {
    "You have a new message!".to_string()
}

fn default_window_title() -> String {
    "🔔 New Notification!".to_string()
}

fn default_notifiers() -> Vec<NotifierConfig> {
    vec![NotifierConfig::Console {}]
}

fn default_pushover_sound() -> String {
    "pushover".to_string()
}

fn default_timezone() -> String {
    "Europe/Berlin".to_string()
}

fn default_true() -> bool {
    true
}

fn default_dashboard_port() -> u16 {
    11120
}

fn default_history_size() -> usize {
    100
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::WatcherError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}
