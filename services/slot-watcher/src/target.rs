//! The immutable poll target: upstream URL plus the ordered relay list

use reqwest::Url;

use crate::config::{Config, TargetConfig};

/// What to poll and which relays to route through, fixed at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollTarget {
    url: String,
    relays: Vec<String>,
}

impl PollTarget {
    pub fn new(url: impl Into<String>, relays: Vec<String>) -> Self {
        Self {
            url: url.into(),
            relays,
        }
    }

    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let url = target_url(&config.target)?;
        tracing::debug!(
            "Poll target {} via {} relay(s)",
            url,
            config.relays.len()
        );
        Ok(Self::new(url, config.relays.clone()))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn relays(&self) -> &[String] {
        &self.relays
    }
}

/// Build the upstream availability query URL
pub fn target_url(target: &TargetConfig) -> crate::Result<String> {
    if let Some(url) = &target.url {
        return Url::parse(url)
            .map(String::from)
            .map_err(|e| crate::WatcherError::Config(format!("Invalid target url {}: {}", url, e)));
    }

    let service_count = target.service_count.to_string();
    Url::parse_with_params(
        &target.base_url,
        &[
            ("date", target.date.as_str()),
            ("officeId", target.office_id.as_str()),
            ("serviceId", target.service_id.as_str()),
            ("serviceCount", service_count.as_str()),
        ],
    )
    .map(String::from)
    .map_err(|e| {
        crate::WatcherError::Config(format!("Invalid target base_url {}: {}", target.base_url, e))
    })
}
