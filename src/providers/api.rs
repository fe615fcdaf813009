//! JSON shapes shared by the REST-style providers, plus lenient field parsing.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::ProviderError;
use crate::model::{Address, Message};

/// Body used when a message has no text at all.
pub const NO_CONTENT: &str = "No content";

/// `{ "email": "..." }` creation reply.
#[derive(Debug, Deserialize)]
pub struct CreatedMailbox {
    #[serde(default)]
    pub email: Option<String>,
}

impl CreatedMailbox {
    /// Validate the issued address.
    pub fn into_address(self, provider: &str) -> Result<Address, ProviderError> {
        let email = self
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| ProviderError::malformed(provider, "reply has no email"))?;
        Address::parse(&email).map_err(|e| ProviderError::malformed(provider, e.to_string()))
    }
}

/// `{ "messages": [...] }` listing reply; a missing list is an empty inbox.
#[derive(Debug, Default, Deserialize)]
pub struct MessageList {
    #[serde(default)]
    pub messages: Vec<ApiMessage>,
}

/// One entry of a [`MessageList`].
#[derive(Debug, Default, Deserialize)]
pub struct ApiMessage {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub date: Option<Value>,
    #[serde(default)]
    pub created_at: Option<Value>,
}

impl ApiMessage {
    /// Normalize into a [`Message`] with ids prefixed by `id_prefix`.
    ///
    /// Entries without an id are dropped since they can't be diffed.
    pub fn into_message(self, id_prefix: &str) -> Option<Message> {
        let Some(id) = id_string(&self.id) else {
            debug!(prefix = id_prefix, "Dropping message without id");
            return None;
        };
        let received_at = self
            .date
            .as_ref()
            .or(self.created_at.as_ref())
            .and_then(parse_timestamp)
            .unwrap_or_else(Utc::now);
        let body = self
            .body
            .filter(|b| !b.is_empty())
            .or(self.text.filter(|t| !t.is_empty()))
            .unwrap_or_else(|| NO_CONTENT.to_string());

        Some(Message {
            id: format!("{id_prefix}_{id}"),
            sender: self.from.unwrap_or_default(),
            subject: self.subject.unwrap_or_default(),
            body,
            received_at,
            read: false,
        })
    }
}

impl MessageList {
    pub fn into_messages(self, id_prefix: &str) -> Vec<Message> {
        self.messages
            .into_iter()
            .filter_map(|m| m.into_message(id_prefix))
            .collect()
    }
}

/// A string or number id as text; null, empty and other shapes are `None`.
pub fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse the timestamp shapes providers use.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` (taken as UTC), and epoch
/// seconds or milliseconds as number or string.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_i64().and_then(from_epoch),
        Value::String(s) => parse_timestamp_str(s.trim()),
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    if let Ok(epoch) = s.parse::<i64>() {
        return from_epoch(epoch);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn from_epoch(epoch: i64) -> Option<DateTime<Utc>> {
    // Anything past year 5138 in seconds is really milliseconds.
    if epoch.abs() >= 100_000_000_000 {
        DateTime::from_timestamp_millis(epoch)
    } else {
        DateTime::from_timestamp(epoch, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn created_mailbox_requires_valid_email() {
        let ok: CreatedMailbox = serde_json::from_value(json!({"email": "x1@mail.cx"})).unwrap();
        assert_eq!(ok.into_address("mailcx").unwrap().to_string(), "x1@mail.cx");

        let empty: CreatedMailbox = serde_json::from_value(json!({"email": ""})).unwrap();
        assert!(empty.into_address("mailcx").is_err());

        let missing: CreatedMailbox = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(
            missing.into_address("mailcx"),
            Err(ProviderError::Malformed { .. })
        ));

        let junk: CreatedMailbox = serde_json::from_value(json!({"email": "not-an-address"})).unwrap();
        assert!(junk.into_address("mailcx").is_err());
    }

    #[test]
    fn message_fields_fall_back() {
        let list: MessageList = serde_json::from_value(json!({
            "messages": [
                {"id": 7, "from": "a@b.co", "subject": "Hi", "text": "body text", "created_at": "2024-05-01T10:00:00Z"},
                {"id": "abc", "subject": "No body"},
                {"from": "dropped@b.co"}
            ]
        }))
        .unwrap();

        let messages = list.into_messages("mailcx");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id, "mailcx_7");
        assert_eq!(messages[0].body, "body text");
        assert_eq!(messages[0].received_at.to_rfc3339(), "2024-05-01T10:00:00+00:00");
        assert_eq!(messages[1].id, "mailcx_abc");
        assert_eq!(messages[1].body, NO_CONTENT);
        assert_eq!(messages[1].sender, "");
    }

    #[test]
    fn body_wins_over_text() {
        let msg = ApiMessage {
            id: json!("1"),
            body: Some("html body".into()),
            text: Some("plain".into()),
            ..Default::default()
        };
        assert_eq!(msg.into_message("tmailor").unwrap().body, "html body");
    }

    #[test]
    fn missing_messages_key_is_empty() {
        let list: MessageList = serde_json::from_value(json!({"status": "ok"})).unwrap();
        assert!(list.into_messages("tmailor").is_empty());
    }

    #[test]
    fn timestamp_shapes() {
        let secs = parse_timestamp(&json!(1_700_000_000)).unwrap();
        let millis = parse_timestamp(&json!(1_700_000_000_000_i64)).unwrap();
        let text = parse_timestamp(&json!("1700000000")).unwrap();
        assert_eq!(secs, millis);
        assert_eq!(secs, text);

        let naive = parse_timestamp(&json!("2024-01-02 03:04:05")).unwrap();
        assert_eq!(naive.to_rfc3339(), "2024-01-02T03:04:05+00:00");

        assert!(parse_timestamp(&json!("yesterday")).is_none());
        assert!(parse_timestamp(&json!(null)).is_none());
    }

    #[test]
    fn id_shapes() {
        assert_eq!(id_string(&json!(" 12 ")), Some("12".into()));
        assert_eq!(id_string(&json!(12)), Some("12".into()));
        assert_eq!(id_string(&json!("")), None);
        assert_eq!(id_string(&json!(null)), None);
        assert_eq!(id_string(&json!({"x": 1})), None);
    }
}
