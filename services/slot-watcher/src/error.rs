//! Error types for the slot watcher

/// Errors that can occur in the slot watcher
#[derive(Debug, thiserror::Error)]
pub enum WatcherError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Every relay failed; carries the most recent failure reason only
    #[error("{0}")]
    RelayExhausted(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Notifier error: {0}")]
    Notifier(String),

    #[error("Dashboard error: {0}")]
    Dashboard(String),
}

impl WatcherError {
    /// Message shown to the user when a poll cycle ends without a usable response
    pub fn user_message(&self) -> String {
        format!(
            "Failed to fetch appointments: {}. This might be due to CORS restrictions. Please try again later.",
            self
        )
    }
}

/// Result type alias for slot watcher operations
pub type Result<T> = std::result::Result<T, WatcherError>;
