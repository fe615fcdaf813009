//! CORS relay endpoints for providers that only serve browser pages.
//!
//! A relay fetches a target URL on our behalf. Some answer with the raw page,
//! others wrap it in a JSON envelope (`{"contents": "..."}`); [`RelayEndpoint::unwrap_body`]
//! accepts both.

use url::form_urlencoded;

/// One relay, identified by the prefix the encoded target is appended to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayEndpoint {
    prefix: String,
}

impl RelayEndpoint {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Build relays from configured prefixes, keeping their order.
    pub fn from_prefixes<S: AsRef<str>>(prefixes: &[S]) -> Vec<Self> {
        prefixes.iter().map(|p| Self::new(p.as_ref())).collect()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Rewrite `target` into a URL served by this relay.
    pub fn rewrite(&self, target: &str) -> String {
        let encoded: String = form_urlencoded::byte_serialize(target.as_bytes()).collect();
        format!("{}{}", self.prefix, encoded)
    }

    /// Recover the page markup from a relay response body.
    ///
    /// Returns `None` when the body is empty or is a JSON envelope without
    /// usable `contents`.
    pub fn unwrap_body(body: &str) -> Option<String> {
        let trimmed = body.trim_start();
        if trimmed.is_empty() {
            return None;
        }
        if !(trimmed.starts_with('{') || trimmed.starts_with('"')) {
            return Some(body.to_string());
        }

        match serde_json::from_str::<serde_json::Value>(trimmed) {
            Ok(serde_json::Value::String(page)) => Some(page).filter(|p| !p.is_empty()),
            Ok(serde_json::Value::Object(envelope)) => envelope
                .get("contents")
                .and_then(|c| c.as_str())
                .filter(|c| !c.is_empty())
                .map(str::to_string),
            // Looked like JSON but wasn't; treat as raw text.
            Err(_) => Some(body.to_string()),
            Ok(_) => None,
        }
    }
}
