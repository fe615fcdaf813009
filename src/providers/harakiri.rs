//! HarakiriMail has no API: any local part on its domain is a live inbox,
//! and the only way to read it is the inbox web page. Pages are fetched
//! through CORS relays and scraped with [`markup`](super::markup).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::extract::{CodeExtractor, VerificationCode};
use crate::http::{HttpClient, HttpRequest, RelayEndpoint};
use crate::model::{Address, Message};
use crate::providers::markup::{self, InboxRow};

pub const NAME: &str = "harakirimail";
pub const DOMAIN: &str = "harakirimail.com";
pub const DOMAIN_MATCHERS: &[&str] = &["harakirimail.com"];

const BASE_URL: &str = "https://harakirimail.com";

const UNKNOWN_SENDER: &str = "Unknown Sender";
const NO_SUBJECT: &str = "(No Subject)";
const JUST_NOW: &str = "Just now";

pub struct HarakiriMail {
    http: Arc<dyn HttpClient>,
    relays: Vec<RelayEndpoint>,
    base_url: String,
}

impl HarakiriMail {
    pub fn new(http: Arc<dyn HttpClient>, relays: Vec<RelayEndpoint>) -> Self {
        Self::with_base_url(http, relays, BASE_URL)
    }

    pub fn with_base_url(
        http: Arc<dyn HttpClient>,
        relays: Vec<RelayEndpoint>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            relays,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Inboxes exist on first use, so creation never leaves the process.
    pub fn create_address(&self) -> Result<Address, ProviderError> {
        Ok(Address::synthetic(DOMAIN))
    }

    /// Scrape the inbox page for `address`.
    ///
    /// Relays are tried in order until one returns a page with at least one
    /// message row. A page with no rows is an empty inbox; an error is only
    /// returned when no relay produced a page at all.
    pub async fn list_messages(&self, address: &Address) -> Result<Vec<Message>, ProviderError> {
        let target = format!("{}/inbox/{}", self.base_url, address.local_part());
        let now = Utc::now();
        let rows = self
            .first_page_match(&target, |page| {
                let rows = markup::inbox_rows(page);
                (!rows.is_empty()).then_some(rows)
            })
            .await?
            .unwrap_or_default();
        Ok(rows_to_messages(rows, now))
    }

    /// Look for verification codes anywhere on the mailbox's pages.
    ///
    /// Catches codes the row scrape misses, such as ones only visible in a
    /// preview pane. Returns the codes of the first page that has any.
    pub async fn scan_codes(
        &self,
        address: &Address,
        extractor: &CodeExtractor,
    ) -> Result<Vec<VerificationCode>, ProviderError> {
        let login = address.local_part();
        let mut last_error = None;
        for path in [format!("inbox/{login}"), login.to_string(), format!("check/{login}")] {
            let target = format!("{}/{}", self.base_url, path);
            let found = self
                .first_page_match(&target, |page| {
                    let codes = extractor.extract(&markup::page_text(page));
                    (!codes.is_empty()).then_some(codes)
                })
                .await;
            match found {
                Ok(Some(codes)) => {
                    debug!(address = %address, path = %path, count = codes.len(), "Codes found on inbox page");
                    return Ok(codes);
                }
                Ok(None) => last_error = None,
                Err(e) => last_error = Some(e),
            }
        }
        match last_error {
            Some(e) => Err(e),
            None => Ok(Vec::new()),
        }
    }

    /// Fetch `target` through each relay in turn and return the first
    /// `Some` that `read` produces from an unwrapped page.
    ///
    /// `Ok(None)` means at least one relay answered but nothing matched.
    async fn first_page_match<T>(
        &self,
        target: &str,
        read: impl Fn(&str) -> Option<T>,
    ) -> Result<Option<T>, ProviderError> {
        let mut answered = false;
        let mut last_error = None;

        for relay in &self.relays {
            let url = relay.rewrite(target);
            let response = match self.http.send(HttpRequest::get(url)).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(relay = relay.prefix(), error = %e, "Relay request failed");
                    last_error = Some(e);
                    continue;
                }
            };
            let response = match response.error_for_status(NAME) {
                Ok(response) => response,
                Err(e) => {
                    warn!(relay = relay.prefix(), error = %e, "Relay returned error status");
                    last_error = Some(e);
                    continue;
                }
            };
            answered = true;

            let Some(page) = RelayEndpoint::unwrap_body(response.text()) else {
                debug!(relay = relay.prefix(), "Relay returned no page");
                continue;
            };
            if let Some(found) = read(&page) {
                return Ok(Some(found));
            }
        }

        match last_error {
            Some(e) if !answered => Err(e),
            _ => Ok(None),
        }
    }
}

fn rows_to_messages(rows: Vec<InboxRow>, now: DateTime<Utc>) -> Vec<Message> {
    rows.into_iter()
        .enumerate()
        .map(|(index, row)| {
            let sender = non_empty_or(row.sender, UNKNOWN_SENDER);
            let subject = non_empty_or(row.subject, NO_SUBJECT);
            let time = non_empty_or(row.time, JUST_NOW);
            let id = match row.href {
                Some(href) => format!("harakiri_{}", href.trim_matches('/')),
                None => format!("harakiri_{}_{}", now.timestamp_millis(), index),
            };
            Message {
                id,
                body: format!("Subject: {subject}. From: {sender}. Received: {time}."),
                received_at: markup::approximate_time(&time, now),
                sender,
                subject,
                read: false,
            }
        })
        .collect()
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value
    }
}
