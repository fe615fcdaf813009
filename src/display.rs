//! Formatting helpers for showing messages in a list.

use chrono::{DateTime, Utc};

/// Longest preview shown before truncation.
pub const PREVIEW_LEN: usize = 100;

/// Short receive time such as `5m ago`; older than a week shows the date.
pub fn relative_time(received_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(received_at);
    let minutes = elapsed.num_minutes();
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();

    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        format!("{minutes}m ago")
    } else if hours < 24 {
        format!("{hours}h ago")
    } else if days < 7 {
        format!("{days}d ago")
    } else {
        received_at.format("%Y-%m-%d").to_string()
    }
}

/// First `max_chars` characters of `text`, with `...` when cut.
pub fn truncate_preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
