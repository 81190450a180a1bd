//! Slot Watcher - appointment availability polling and alerting
//!
//! Polls an appointment availability endpoint through forwarding relays,
//! classifies the response, and alerts as soon as slots appear.

pub mod alert;
pub mod appointment;
pub mod config;
pub mod console;
pub mod dashboard;
pub mod error;
pub mod io;
pub mod notifier;
pub mod poller;
pub mod pushover;
pub mod relay;
pub mod state;
pub mod target;

pub use config::{load_config, Config};
pub use error::{Result, WatcherError};

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::alert::{AlertDispatcher, AlertSurface, TerminalSurface};
use crate::config::NotifierConfig;
use crate::console::ConsoleNotifier;
use crate::dashboard::DashboardState;
use crate::io::{HttpClient, ReqwestHttpClient};
use crate::notifier::Notifier;
use crate::poller::{Poller, UpdateListener};
use crate::pushover::PushoverNotifier;
use crate::relay::RelayRequester;
use crate::state::PollState;
use crate::target::PollTarget;

/// Builder for a [`Watcher`].
///
/// Production collaborators are created from the config unless replaced.
pub struct WatcherBuilder {
    config: Config,
    http: Option<Arc<dyn HttpClient>>,
    surface: Option<Arc<dyn AlertSurface>>,
    notifiers: Option<Vec<Arc<dyn Notifier>>>,
    listener: Option<UpdateListener>,
    cancel: CancellationToken,
}

impl WatcherBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            http: None,
            surface: None,
            notifiers: None,
            listener: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    pub fn with_surface(mut self, surface: Arc<dyn AlertSurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    pub fn with_notifiers(mut self, notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        self.notifiers = Some(notifiers);
        self
    }

    pub fn with_listener(mut self, listener: UpdateListener) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn build(self) -> Result<Watcher> {
        let config = self.config;
        config.validate()?;

        let http: Arc<dyn HttpClient> = match self.http {
            Some(http) => http,
            None => Arc::new(ReqwestHttpClient::new(Duration::from_secs(
                config.polling.request_timeout_seconds,
            ))?),
        };

        let notifiers = match self.notifiers {
            Some(notifiers) => notifiers,
            None => build_notifiers(&config.notifiers, &http),
        };
        let surface: Arc<dyn AlertSurface> = match self.surface {
            Some(surface) => surface,
            None => Arc::new(TerminalSurface::default()),
        };

        let state = state::new_state_handle(
            config.polling.interval_seconds,
            config.dashboard.history_size,
        );
        let alerts = AlertDispatcher::new(
            notifiers,
            surface,
            config.alert.clone(),
            config.display.timezone.clone(),
            Arc::clone(&state),
        );

        let target = PollTarget::from_config(&config)?;
        let mut poller = Poller::new(
            target,
            RelayRequester::new(Arc::clone(&http)),
            alerts,
            state,
            &config.polling,
            self.cancel.clone(),
        );
        if let Some(listener) = self.listener {
            poller = poller.with_listener(listener);
        }

        Ok(Watcher {
            poller: Arc::new(poller),
            config,
            cancel: self.cancel,
        })
    }
}

fn build_notifiers(
    configs: &[NotifierConfig],
    http: &Arc<dyn HttpClient>,
) -> Vec<Arc<dyn Notifier>> {
    configs
        .iter()
        .filter_map(|notifier_config| -> Option<Arc<dyn Notifier>> {
            tracing::debug!("Creating '{}' notifier", notifier_config.type_name());
            match notifier_config {
                NotifierConfig::Console {} => Some(Arc::new(ConsoleNotifier::default())),
                NotifierConfig::Pushover { .. } => {
                    PushoverNotifier::from_config(notifier_config, Arc::clone(http))
                        .map(|n| Arc::new(n) as Arc<dyn Notifier>)
                }
            }
        })
        .collect()
}

/// A fully wired watcher, ready to poll
pub struct Watcher {
    poller: Arc<Poller>,
    config: Config,
    cancel: CancellationToken,
}

impl Watcher {
    pub fn poller(&self) -> &Arc<Poller> {
        &self.poller
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run a single poll cycle to completion and return the resulting state
    pub async fn poll_once(&self) -> PollState {
        self.poller.run_cycle().await;
        self.poller.state().read().await.poll.clone()
    }

    /// Run until ctrl-c or until the cancellation token fires
    pub async fn start(self) -> Result<()> {
        let cancel_for_signal = self.cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Shutdown signal received");
                    cancel_for_signal.cancel();
                }
                Err(e) => tracing::error!("Failed to listen for ctrl-c: {}", e),
            }
        });

        if self.config.dashboard.enabled {
            let dashboard_port = self.config.dashboard.port;
            let router = dashboard::build_router(DashboardState {
                poller: Arc::clone(&self.poller),
                timezone: self.config.display.timezone.clone(),
                alert_title: self.config.alert.window_title.clone(),
            });
            let cancel_for_dashboard = self.cancel.clone();

            tokio::spawn(async move {
                let addr = SocketAddr::from(([0, 0, 0, 0], dashboard_port));
                let listener = match tokio::net::TcpListener::bind(addr).await {
                    Ok(l) => l,
                    Err(e) => {
                        tracing::error!(
                            "Failed to bind dashboard to port {}: {}. Continuing without dashboard.",
                            dashboard_port,
                            e
                        );
                        return;
                    }
                };
                tracing::info!("Dashboard listening on http://{}", addr);

                if let Err(e) = axum::serve(listener, router)
                    .with_graceful_shutdown(async move {
                        cancel_for_dashboard.cancelled().await;
                    })
                    .await
                {
                    tracing::warn!("{}", WatcherError::Dashboard(e.to_string()));
                }

                tracing::debug!("Dashboard stopped");
            });
        }

        tracing::info!("Slot watcher started");
        self.poller.start().join().await;
        tracing::info!("Slot watcher stopped");

        Ok(())
    }
}
