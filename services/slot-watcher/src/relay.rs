//! Relay fallback: fetch the target through forwarding relays in order

use std::sync::Arc;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::io::HttpClient;
use crate::target::PollTarget;

/// Characters left as-is when the target is embedded in a relay URL.
/// Same unreserved set as a URI component encoder.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Headers sent with every relayed request
pub const REQUEST_HEADERS: [(&str, &str); 4] = [
    (
        "User-Agent",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    ),
    ("Accept", "application/json, text/plain, */*"),
    ("Accept-Language", "de,en-US;q=0.7,en;q=0.3"),
    ("X-Requested-With", "XMLHttpRequest"),
];

const NO_RELAYS_REASON: &str = "All relays failed";

/// Build the forwarding URL for one relay
pub fn relay_url(relay: &str, target_url: &str) -> String {
    format!("{}{}", relay, utf8_percent_encode(target_url, COMPONENT))
}

/// Issues GET requests through relays until one answers with a 2xx status
pub struct RelayRequester {
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for RelayRequester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayRequester").finish()
    }
}

impl RelayRequester {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }

    /// Fetch the target body through the first relay that succeeds.
    ///
    /// Relays are tried once each, in order. Only the most recent failure
    /// reason survives into [`crate::WatcherError::RelayExhausted`].
    pub async fn fetch_via_relays(&self, target: &PollTarget) -> crate::Result<String> {
        let mut last_reason: Option<String> = None;

        for relay in target.relays() {
            let url = relay_url(relay, target.url());
            tracing::debug!("Trying relay {}", relay);

            match self.http.get(&url, &REQUEST_HEADERS).await {
                Ok(response) if response.is_success() => {
                    tracing::debug!("Relay {} answered with status {}", relay, response.status);
                    return Ok(response.body);
                }
                Ok(response) => {
                    tracing::debug!("Relay {} returned status {}", relay, response.status);
                    last_reason = Some(format!("Proxy returned status: {}", response.status));
                }
                Err(e) => {
                    tracing::debug!("Error with relay {}: {}", relay, e);
                    last_reason = Some(e.to_string());
                }
            }
        }

        let reason = last_reason.unwrap_or_else(|| NO_RELAYS_REASON.to_string());
        tracing::warn!("All relays failed for {}: {}", target.url(), reason);
        Err(crate::WatcherError::RelayExhausted(reason))
    }
}
