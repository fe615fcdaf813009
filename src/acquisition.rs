//! Address acquisition and inbox dispatch across providers.
//!
//! Creation walks the providers in priority order and takes the first real
//! address. Fetching picks exactly one provider per address by domain and
//! falls back to the default provider for domains nobody claims.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::MailConfig;
use crate::error::ConfigError;
use crate::extract::{CodeExtractor, VerificationCode};
use crate::http::{HttpClient, RelayEndpoint};
use crate::model::{Address, Message};
use crate::providers::Provider;

pub struct Orchestrator {
    providers: Vec<Provider>,
    default_index: usize,
}

impl Orchestrator {
    /// `providers` are in creation priority order; `default_index` names the
    /// provider used for unclaimed domains.
    pub fn new(providers: Vec<Provider>, default_index: usize) -> Result<Self, ConfigError> {
        if default_index >= providers.len() {
            return Err(ConfigError::InvalidValue {
                key: "default_provider".into(),
                message: format!(
                    "index {default_index} out of range for {} providers",
                    providers.len()
                ),
            });
        }
        Ok(Self {
            providers,
            default_index,
        })
    }

    /// The built-in providers, with GuerrillaMail as the default.
    pub fn from_config(http: Arc<dyn HttpClient>, config: &MailConfig) -> Result<Self, ConfigError> {
        let relays = RelayEndpoint::from_prefixes(&config.relays);
        let providers = Provider::defaults(http, relays);
        let default_index = providers
            .iter()
            .position(|p| matches!(p, Provider::Guerrilla(_)))
            .unwrap_or(providers.len().saturating_sub(1));
        Self::new(providers, default_index)
    }

    pub fn default_provider(&self) -> &Provider {
        &self.providers[self.default_index]
    }

    /// Primary domain of every provider, in priority order.
    pub fn available_domains(&self) -> Vec<&'static str> {
        self.providers.iter().map(Provider::domain).collect()
    }

    /// Get an address to bind.
    ///
    /// With a preferred domain the address is made up locally and no
    /// provider is contacted. Otherwise the first provider that issues a
    /// real address wins; if none does, the top provider's synthetic
    /// address is used.
    pub async fn acquire_address(&self, preferred_domain: Option<&str>) -> Address {
        if let Some(domain) = preferred_domain.map(str::trim).filter(|d| !d.is_empty()) {
            let address = Address::synthetic(domain);
            info!(address = %address, "Using preferred domain");
            return address;
        }

        for provider in &self.providers {
            match provider.try_create_address().await {
                Ok(address) => {
                    info!(provider = provider.name(), address = %address, "Address acquired");
                    return address;
                }
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "Address creation failed, trying next provider");
                }
            }
        }

        let address = self.providers[0].synthetic_address();
        warn!(address = %address, "Every provider failed, using synthetic address");
        address
    }

    /// The provider that serves `address`.
    pub fn provider_for(&self, address: &Address) -> &Provider {
        self.providers
            .iter()
            .find(|p| p.matches_domain(address.domain()))
            .unwrap_or_else(|| {
                debug!(domain = address.domain(), "No provider claims domain, using default");
                self.default_provider()
            })
    }

    /// Current inbox of `address`; empty if the provider can't be reached.
    pub async fn fetch_messages(&self, address: &Address) -> Vec<Message> {
        self.provider_for(address).list_messages(address).await
    }

    /// Codes scraped straight from the inbox pages, for addresses served by
    /// a scraping provider. Empty for everything else or on failure.
    pub async fn scan_codes(
        &self,
        address: &Address,
        extractor: &CodeExtractor,
    ) -> Vec<VerificationCode> {
        let Some(scraper) = self.provider_for(address).as_scraper() else {
            return Vec::new();
        };
        match scraper.scan_codes(address, extractor).await {
            Ok(codes) => codes,
            Err(e) => {
                warn!(address = %address, error = %e, "Inbox page scan failed");
                Vec::new()
            }
        }
    }
}
