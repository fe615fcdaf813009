//! TempMail.io: REST API keyed by the full address.

use std::sync::Arc;

use crate::error::ProviderError;
use crate::http::{HttpClient, HttpRequest};
use crate::model::{Address, Message};
use crate::providers::api::{CreatedMailbox, MessageList};

pub const NAME: &str = "tempmail.io";
pub const DOMAIN: &str = "tempmail.io";
pub const DOMAIN_MATCHERS: &[&str] = &["tempmail.io"];

/// Message ids are prefixed with this rather than the provider name.
const ID_PREFIX: &str = "tmpio";
const BASE_URL: &str = "https://api.tempmail.io";

pub struct TempMailIo {
    http: Arc<dyn HttpClient>,
    base_url: String,
}

impl TempMailIo {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self::with_base_url(http, BASE_URL)
    }

    pub fn with_base_url(http: Arc<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    pub async fn create_address(&self) -> Result<Address, ProviderError> {
        let request =
            HttpRequest::post(format!("{}/v1/email/generate", self.base_url)).json_body(None);
        let created: CreatedMailbox = self
            .http
            .send(request)
            .await?
            .error_for_status(NAME)?
            .json(NAME)?;
        created.into_address(NAME)
    }

    pub async fn list_messages(&self, address: &Address) -> Result<Vec<Message>, ProviderError> {
        let url = format!("{}/v1/email/{}/messages", self.base_url, address);
        let list: MessageList = self
            .http
            .send(HttpRequest::get(url))
            .await?
            .error_for_status(NAME)?
            .json(NAME)?;
        Ok(list.into_messages(ID_PREFIX))
    }
}
