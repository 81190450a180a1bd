//! Appointment responses: classification and display formatting

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Returned by [`format_timestamp`] when the input is not a date-time
pub const INVALID_DATE: &str = "Invalid date";

/// Returned by [`format_timestamp`] when rendering itself fails
pub const FORMAT_ERROR: &str = "Error formatting date";

const DISPLAY_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// Upstream JSON body; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentResponse {
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub last_modified: Option<String>,
    #[serde(default)]
    pub appointment_timestamps: Option<Vec<String>>,
}

/// Outcome of one successful fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AppointmentResult {
    Error {
        code: String,
        message: Option<String>,
        last_modified: Option<String>,
    },
    Empty,
    /// Never constructed with an empty list
    Available { timestamps: Vec<String> },
}

impl AppointmentResult {
    pub fn has_slots(&self) -> bool {
        matches!(self, AppointmentResult::Available { .. })
    }

    pub fn timestamps(&self) -> &[String] {
        match self {
            AppointmentResult::Available { timestamps } => timestamps,
            _ => &[],
        }
    }
}

/// Classify a parsed response: error code first, then slot presence
pub fn classify(response: AppointmentResponse) -> AppointmentResult {
    match response.error_code {
        Some(code) if !code.is_empty() => AppointmentResult::Error {
            code,
            message: response.error_message,
            last_modified: response.last_modified,
        },
        _ => match response.appointment_timestamps {
            Some(timestamps) if !timestamps.is_empty() => {
                AppointmentResult::Available { timestamps }
            }
            _ => AppointmentResult::Empty,
        },
    }
}

/// Parse and classify a raw response body.
///
/// Anything that is not a JSON object of the expected shape is a
/// [`crate::WatcherError::MalformedResponse`], never a silent `Empty`.
pub fn parse_body(body: &str) -> crate::Result<AppointmentResult> {
    let response: AppointmentResponse = serde_json::from_str(body)
        .map_err(|e| crate::WatcherError::MalformedResponse(e.to_string()))?;
    Ok(classify(response))
}

fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    // %z accepts both +0200 and +02:00
    for format in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M%z"] {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    // Offset-less forms are read as UTC so the result never depends on the host zone
    for format in [
        "%Y-%m-%dT%H:%M:%S%.fZ",
        "%Y-%m-%dT%H:%MZ",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Render a raw timestamp as `DD.MM.YYYY HH:MM:SS` in the given IANA zone.
///
/// Never fails: unparsable input yields [`INVALID_DATE`], an unknown zone
/// yields [`FORMAT_ERROR`].
pub fn format_timestamp(raw: &str, target_zone: &str) -> String {
    let Some(instant) = parse_instant(raw) else {
        return INVALID_DATE.to_string();
    };
    match target_zone.parse::<Tz>() {
        Ok(zone) => instant.with_timezone(&zone).format(DISPLAY_FORMAT).to_string(),
        Err(e) => {
            tracing::warn!("Error formatting date {}: {}", raw, e);
            FORMAT_ERROR.to_string()
        }
    }
}

/// Render remaining seconds as `M:SS`
pub fn format_countdown(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
