//! Web dashboard with JSON API endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect};
use axum::routing::{get, post};
use axum::Router;

use crate::appointment::{format_countdown, format_timestamp, AppointmentResult};
use crate::poller::Poller;
use crate::state::SharedState;

const PAGE_TITLE: &str = "Slot Watcher";

/// Dashboard application state
#[derive(Clone)]
pub struct DashboardState {
    pub poller: Arc<Poller>,
    pub timezone: String,
    pub alert_title: String,
}

/// Build the dashboard axum router
pub fn build_router(dashboard: DashboardState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/status", get(status_handler))
        .route("/api/history", get(history_handler))
        .route("/api/poll", post(poll_handler))
        .route("/poll", post(poll_form_handler))
        .route("/health", get(health_handler))
        .with_state(dashboard)
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn render_result(state: &SharedState, timezone: &str) -> String {
    if let Some(error) = &state.poll.last_error {
        return format!(
            r#"<div style="padding: 0.75rem; background: #f8d7da; color: #721c24; border-radius: 0.5rem;">{}</div>"#,
            escape_html(error)
        );
    }

    match &state.poll.last_result {
        None => String::new(),
        Some(AppointmentResult::Error {
            message,
            last_modified,
            ..
        }) => {
            let updated = last_modified
                .as_deref()
                .map(|raw| {
                    format!(
                        r#"<p style="font-size: 0.85em; color: #6c757d;">Last updated: {}</p>"#,
                        format_timestamp(raw, timezone)
                    )
                })
                .unwrap_or_default();
            format!(
                "<h3>Error:</h3><p>{}</p>{}",
                escape_html(message.as_deref().unwrap_or_default()),
                updated
            )
        }
        Some(AppointmentResult::Empty) => "<p>No appointments available.</p>".to_string(),
        Some(AppointmentResult::Available { timestamps }) => {
            let items: String = timestamps
                .iter()
                .map(|raw| {
                    format!(
                        r#"<li style="padding: 0.5rem; background: #e2e3e5; border-radius: 0.25rem; margin-bottom: 0.5rem;">{}</li>"#,
                        format_timestamp(raw, timezone)
                    )
                })
                .collect();
            format!(
                r#"<h3>Available appointments:</h3><ul style="list-style: none; padding: 0;">{}</ul>"#,
                items
            )
        }
    }
}

async fn index_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let state = dashboard.poller.state().read().await;

    let title = if state.alert_active {
        escape_html(&dashboard.alert_title)
    } else {
        PAGE_TITLE.to_string()
    };
    let button = if state.poll.is_loading {
        "Loading..."
    } else {
        "Check available appointments"
    };
    let disabled = if state.poll.is_loading { " disabled" } else { "" };

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta http-equiv="refresh" content="5">
    <title>{title}</title>
</head>
<body style="font-family: system-ui, sans-serif; max-width: 768px; margin: 0 auto; padding: 1rem;">
    <h1>{page}</h1>
    <div style="display: flex; align-items: center; gap: 1rem; margin-bottom: 1rem;">
        <form method="post" action="/poll">
            <button type="submit"{disabled}>{button}</button>
        </form>
        <div>Next check in: <strong id="countdown">{countdown}</strong></div>
    </div>
    <section id="result">{result}</section>
</body>
</html>"#,
        title = title,
        page = PAGE_TITLE,
        disabled = disabled,
        button = button,
        countdown = format_countdown(state.poll.seconds_until_next_poll),
        result = render_result(&state, &dashboard.timezone),
    );

    Html(html)
}

async fn status_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let state = dashboard.poller.state().read().await;
    let zone = dashboard.timezone.as_str();

    let slots: Vec<String> = state
        .poll
        .last_result
        .as_ref()
        .map(|result| {
            result
                .timestamps()
                .iter()
                .map(|raw| format_timestamp(raw, zone))
                .collect()
        })
        .unwrap_or_default();
    let last_modified = match &state.poll.last_result {
        Some(AppointmentResult::Error {
            last_modified: Some(raw),
            ..
        }) => Some(format_timestamp(raw, zone)),
        _ => None,
    };

    axum::Json(serde_json::json!({
        "is_loading": state.poll.is_loading,
        "seconds_until_next_poll": state.poll.seconds_until_next_poll,
        "countdown": format_countdown(state.poll.seconds_until_next_poll),
        "last_poll_epoch_ms": state.poll.last_poll_epoch_ms,
        "last_error": state.poll.last_error,
        "result": state.poll.last_result,
        "slots": slots,
        "last_modified": last_modified,
        "alert_active": state.alert_active,
        "polls_started": state.polls_started,
        "uptime_seconds": state.started_at.elapsed().as_secs(),
    }))
}

async fn history_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let state = dashboard.poller.state().read().await;
    let history: Vec<_> = state.history.iter().cloned().collect();
    axum::Json(history)
}

async fn poll_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    tracing::info!("Manual poll requested");
    dashboard.poller.poll_once();
    StatusCode::ACCEPTED
}

async fn poll_form_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    dashboard.poller.poll_once();
    Redirect::to("/")
}

async fn health_handler() -> impl IntoResponse {
    "OK"
}
