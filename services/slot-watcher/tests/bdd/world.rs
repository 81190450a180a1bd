//! BDD test world for slot watcher

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cucumber::World;
use slot_watcher::alert::{AlertDispatcher, AlertSurface};
use slot_watcher::config::AlertPolicy;
use slot_watcher::io::{HttpClient, HttpResponse};
use slot_watcher::notifier::{Notification, Notifier, Permission};
use slot_watcher::poller::Countdown;
use slot_watcher::state::{PollState, StateHandle};
use slot_watcher::WatcherError;

#[derive(Debug, Default, World)]
pub struct SlotWorld {
    // Relay testing
    pub relays: Option<Arc<ScriptedRelays>>,
    pub fetch_result: Option<Result<String, String>>,

    // Alert testing
    pub alert_policy: AlertPolicy,
    pub notifier: Option<Arc<RecordingNotifier>>,
    pub surface: Option<Arc<RecordingSurface>>,
    pub dispatcher: Option<AlertDispatcher>,
    pub alert_state: Option<StateHandle>,
    pub last_fired: Option<bool>,

    // Polling testing
    pub upstream_body: Option<String>,
    pub poll_state: Option<PollState>,
    pub countdown: Option<Countdown>,
    pub polls_due: u32,

    // Formatting
    pub formatted: Option<String>,
}

/// One scripted relay: a status code, or `None` for a transport failure
#[derive(Debug, Clone)]
pub struct RelayScript {
    pub host: String,
    pub response: Option<HttpResponse>,
}

/// HTTP client that answers each relay host from a script and records calls
#[derive(Debug, Default)]
pub struct ScriptedRelays {
    pub scripts: Mutex<Vec<RelayScript>>,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedRelays {
    pub fn relay_urls(&self) -> Vec<String> {
        self.scripts
            .lock()
            .unwrap()
            .iter()
            .map(|s| format!("https://{}/?", s.host))
            .collect()
    }

    pub fn tried(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpClient for ScriptedRelays {
    async fn get(&self, url: &str, _headers: &[(&str, &str)]) -> slot_watcher::Result<HttpResponse> {
        self.calls.lock().unwrap().push(url.to_string());
        let script = self
            .scripts
            .lock()
            .unwrap()
            .iter()
            .find(|s| url.starts_with(&format!("https://{}/", s.host)))
            .cloned();
        match script.and_then(|s| s.response) {
            Some(response) => Ok(response),
            None => Err(WatcherError::Http(format!("GET {} failed: connection refused", url))),
        }
    }

    async fn post_form(
        &self,
        _url: &str,
        _params: &[(&str, &str)],
    ) -> slot_watcher::Result<HttpResponse> {
        Ok(HttpResponse {
            status: 200,
            body: String::new(),
        })
    }
}

/// A notifier that records notifications and reports a configurable permission
#[derive(Debug)]
pub struct RecordingNotifier {
    pub permission: Mutex<Permission>,
    pub grants_on_request: bool,
    pub permission_requests: Mutex<u32>,
    pub sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new(permission: Permission, grants_on_request: bool) -> Self {
        Self {
            permission: Mutex::new(permission),
            grants_on_request,
            permission_requests: Mutex::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn type_name(&self) -> &str {
        "recording"
    }

    async fn permission(&self) -> Permission {
        *self.permission.lock().unwrap()
    }

    async fn request_permission(&self) -> Permission {
        *self.permission_requests.lock().unwrap() += 1;
        let mut permission = self.permission.lock().unwrap();
        if *permission == Permission::Undetermined {
            *permission = if self.grants_on_request {
                Permission::Granted
            } else {
                Permission::Denied
            };
        }
        *permission
    }

    async fn notify(&self, notification: &Notification) -> slot_watcher::Result<()> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// Counts sound cues and remembers the last title marker
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub sounds: Mutex<u32>,
    pub title: Mutex<Option<String>>,
}

impl AlertSurface for RecordingSurface {
    fn play_sound(&self) -> slot_watcher::Result<()> {
        *self.sounds.lock().unwrap() += 1;
        Ok(())
    }

    fn set_title(&self, title: &str) -> slot_watcher::Result<()> {
        *self.title.lock().unwrap() = Some(title.to_string());
        Ok(())
    }
}
