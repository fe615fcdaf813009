//! Shared mailbox data model.

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::extract::VerificationCode;

static ADDRESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

const LOCAL_PART_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Length of locally generated local parts.
pub const SYNTHETIC_LOCAL_LEN: usize = 8;

/// A mailbox address, rendered as `local@domain`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    local_part: String,
    domain: String,
}

impl Address {
    /// Parse user input such as `abc@mail.cx`.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyAddress);
        }
        if !ADDRESS_RE.is_match(trimmed) {
            return Err(ValidationError::InvalidAddress(trimmed.to_string()));
        }
        // The regex guarantees exactly one '@'.
        let (local, domain) = trimmed
            .split_once('@')
            .ok_or_else(|| ValidationError::InvalidAddress(trimmed.to_string()))?;
        Ok(Self {
            local_part: local.to_string(),
            domain: domain.to_ascii_lowercase(),
        })
    }

    /// A random local part on `domain`, not registered with anybody.
    pub fn synthetic(domain: &str) -> Self {
        Self {
            local_part: random_local_part(SYNTHETIC_LOCAL_LEN),
            domain: domain.to_ascii_lowercase(),
        }
    }

    pub fn local_part(&self) -> &str {
        &self.local_part
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.local_part, self.domain)
    }
}

/// Random `[a-z0-9]` string of the given length.
pub fn random_local_part(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| LOCAL_PART_CHARSET[rng.gen_range(0..LOCAL_PART_CHARSET.len())] as char)
        .collect()
}

/// A normalized message, whatever provider it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Provider-qualified id, e.g. `mailcx_42`.
    pub id: String,
    pub sender: String,
    pub subject: String,
    pub body: String,
    pub received_at: DateTime<Utc>,
    pub read: bool,
}

impl Message {
    /// Text the code extractor runs over.
    pub fn searchable_text(&self) -> String {
        format!("{} {}", self.subject, self.body)
    }
}

/// A message as handed to the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedMessage {
    pub message: Message,
    /// Codes found in subject and body, first-seen order.
    pub codes: Vec<VerificationCode>,
    /// Not present in the previous poll for this address.
    pub is_new: bool,
    /// Synthesized by the session and never stored in history.
    pub ephemeral: bool,
}

/// Everything one poll produced.
#[derive(Debug, Clone, Serialize)]
pub struct PollReport {
    pub address: Address,
    pub messages: Vec<EnrichedMessage>,
}

impl PollReport {
    /// Messages not seen in the previous poll.
    pub fn new_messages(&self) -> impl Iterator<Item = &EnrichedMessage> {
        self.messages.iter().filter(|m| m.is_new)
    }

    pub fn new_count(&self) -> usize {
        self.new_messages().count()
    }
}
