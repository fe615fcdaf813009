//! Configuration types.

use std::time::Duration;

use crate::error::ConfigError;

/// Relay prefixes used when a provider only serves browser pages.
///
/// The target URL is percent-encoded and appended to the prefix.
pub const DEFAULT_RELAYS: [&str; 2] = [
    "https://api.allorigins.win/get?url=",
    "https://api.codetabs.com/v1/proxy/?quest=",
];

const DEFAULT_USER_AGENT: &str = concat!("dispo-mail/", env!("CARGO_PKG_VERSION"));

/// Runtime configuration for acquisition and polling.
#[derive(Debug, Clone)]
pub struct MailConfig {
    /// Delay between two automatic polls.
    pub poll_interval: Duration,
    /// Per-request timeout handed to the HTTP client.
    pub request_timeout: Duration,
    /// Relay URL prefixes, tried in order.
    pub relays: Vec<String>,
    /// User agent sent with every request.
    pub user_agent: String,
    /// Domain to synthesize an address on instead of asking providers.
    pub preferred_domain: Option<String>,
    /// Existing address to open instead of generating one.
    pub address: Option<String>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            request_timeout: Duration::from_secs(15),
            relays: DEFAULT_RELAYS.iter().map(|r| r.to_string()).collect(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            preferred_domain: None,
            address: None,
        }
    }
}

impl MailConfig {
    /// Build config from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let poll_interval = std::env::var("DISPO_MAIL_POLL_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.poll_interval);

        let request_timeout = std::env::var("DISPO_MAIL_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        let relays = std::env::var("DISPO_MAIL_RELAYS")
            .ok()
            .map(|s| parse_list(&s))
            .unwrap_or(defaults.relays);

        let user_agent =
            std::env::var("DISPO_MAIL_USER_AGENT").unwrap_or(defaults.user_agent);

        let preferred_domain = std::env::var("DISPO_MAIL_DOMAIN")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let address = std::env::var("DISPO_MAIL_ADDRESS")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let config = Self {
            poll_interval,
            request_timeout,
            relays,
            user_agent,
            preferred_domain,
            address,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would stall the poll loop or the scrape path.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "DISPO_MAIL_POLL_INTERVAL_SECS".into(),
                message: "must be greater than zero".into(),
            });
        }
        if self.relays.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "DISPO_MAIL_RELAYS".into(),
                message: "at least one relay prefix is required".into(),
            });
        }
        Ok(())
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = MailConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.relays.len(), 2);
    }

    #[test]
    fn zero_interval_rejected() {
        let config = MailConfig {
            poll_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn empty_relays_rejected() {
        let config = MailConfig {
            relays: vec![],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn list_parsing_drops_blanks() {
        assert_eq!(parse_list(" a , ,b,"), vec!["a".to_string(), "b".to_string()]);
    }
}
