//! GuerrillaMail, the default adapter for domains nobody else claims.
//!
//! Uses the public `ajax.php` API. Its reply shapes differ from the other
//! REST providers (`email_addr`, `list`, `mail_*` fields), so it carries its
//! own serde types.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::ProviderError;
use crate::http::{HttpClient, HttpRequest};
use crate::model::{Address, Message};
use crate::providers::api::{id_string, parse_timestamp};

pub const NAME: &str = "guerrillamail";
pub const DOMAIN: &str = "guerrillamail.com";
pub const DOMAIN_MATCHERS: &[&str] = &["guerrillamail"];

const BASE_URL: &str = "https://api.guerrillamail.com";
const NO_EXCERPT: &str = "Click to view full content";

#[derive(Debug, Deserialize)]
struct EmailAddressReply {
    #[serde(default)]
    email_addr: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct EmailListReply {
    #[serde(default)]
    list: Vec<ListEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct ListEntry {
    #[serde(default)]
    mail_id: Value,
    #[serde(default)]
    mail_from: Option<String>,
    #[serde(default)]
    mail_subject: Option<String>,
    #[serde(default)]
    mail_excerpt: Option<String>,
    #[serde(default)]
    mail_timestamp: Option<Value>,
    #[serde(default)]
    mail_read: Option<Value>,
}

impl ListEntry {
    fn into_message(self) -> Option<Message> {
        let Some(id) = id_string(&self.mail_id) else {
            debug!("Dropping guerrillamail entry without mail_id");
            return None;
        };
        Some(Message {
            id: format!("guerrilla_{id}"),
            sender: self.mail_from.unwrap_or_default(),
            subject: self.mail_subject.unwrap_or_default(),
            body: self
                .mail_excerpt
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| NO_EXCERPT.to_string()),
            received_at: self
                .mail_timestamp
                .as_ref()
                .and_then(parse_timestamp)
                .unwrap_or_else(Utc::now),
            read: is_read_flag(self.mail_read.as_ref()),
        })
    }
}

/// `mail_read` arrives as `"1"`, `1` or `true` depending on the endpoint.
fn is_read_flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::String(s)) => s == "1",
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        Some(Value::Bool(b)) => *b,
        _ => false,
    }
}

pub struct GuerrillaMail {
    http: Arc<dyn HttpClient>,
    base_url: String,
}

impl GuerrillaMail {
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
        let url = format!("{}/ajax.php?f=get_email_address&lang=en", self.base_url);
        let reply: EmailAddressReply = self
            .http
            .send(HttpRequest::get(url))
            .await?
            .error_for_status(NAME)?
            .json(NAME)?;
        let email = reply
            .email_addr
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| ProviderError::malformed(NAME, "reply has no email_addr"))?;
        Address::parse(&email).map_err(|e| ProviderError::malformed(NAME, e.to_string()))
    }

    /// The list endpoint is session-scoped on the provider side; the address
    /// only shows up in logs.
    pub async fn list_messages(&self, address: &Address) -> Result<Vec<Message>, ProviderError> {
        debug!(address = %address, "Listing guerrillamail inbox");
        let url = format!(
            "{}/ajax.php?f=get_email_list&offset=0&seq=1&lang=en",
            self.base_url
        );
        let reply: EmailListReply = self
            .http
            .send(HttpRequest::get(url))
            .await?
            .error_for_status(NAME)?
            .json(NAME)?;
        Ok(reply
            .list
            .into_iter()
            .filter_map(ListEntry::into_message)
            .collect())
    }
}
