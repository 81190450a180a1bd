//! Pushover notification client

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::NotifierConfig;
use crate::io::HttpClient;
use crate::notifier::{Notification, Notifier, Permission};

const PUSHOVER_API_URL: &str = "https://api.pushover.net/1/messages.json";

/// Pushover notification sender
pub struct PushoverNotifier {
    api_token: String,
    user_key: String,
    priority: i8,
    sound: String,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for PushoverNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushoverNotifier")
            .field("priority", &self.priority)
            .field("sound", &self.sound)
            .finish()
    }
}

impl PushoverNotifier {
    /// Build from a `pushover` notifier entry; `None` for any other type
    pub fn from_config(config: &NotifierConfig, http: Arc<dyn HttpClient>) -> Option<Self> {
        let NotifierConfig::Pushover {
            api_token,
            user_key,
            priority,
            sound,
        } = config
        else {
            return None;
        };

        tracing::debug!("Created PushoverNotifier with priority {}", priority);

        Some(Self {
            api_token: api_token.clone(),
            user_key: user_key.clone(),
            priority: *priority,
            sound: sound.clone(),
            http,
        })
    }

    fn has_credentials(&self) -> bool {
        !self.api_token.is_empty() && !self.user_key.is_empty()
    }
}

#[async_trait]
impl Notifier for PushoverNotifier {
    fn type_name(&self) -> &str {
        "pushover"
    }

    async fn permission(&self) -> Permission {
        if self.has_credentials() {
            Permission::Granted
        } else {
            Permission::Denied
        }
    }

    async fn request_permission(&self) -> Permission {
        self.permission().await
    }

    async fn notify(&self, notification: &Notification) -> crate::Result<()> {
        let priority = self.priority.to_string();
        let params = vec![
            ("token", self.api_token.as_str()),
            ("user", self.user_key.as_str()),
            ("title", notification.title.as_str()),
            ("message", notification.message.as_str()),
            ("priority", priority.as_str()),
            ("sound", self.sound.as_str()),
        ];

        tracing::debug!(
            "Sending Pushover notification: title='{}', priority={}",
            notification.title,
            priority
        );

        let response = self.http.post_form(PUSHOVER_API_URL, &params).await?;

        if response.status != 200 {
            return Err(crate::WatcherError::Notifier(format!(
                "Pushover API returned status {}: {}",
                response.status, response.body
            )));
        }

        tracing::debug!("Pushover notification sent successfully");
        Ok(())
    }
}
