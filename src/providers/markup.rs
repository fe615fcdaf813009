//! Best-effort reading of inbox web pages.
//!
//! Inbox pages are usually a table (`<tr>` per message, `<td>` per field) or
//! a list of `.email-item` / `.message-row` elements. None of this is a
//! stable contract; when a page doesn't look like either, nothing is returned.

use std::sync::LazyLock;

use chrono::{DateTime, TimeDelta, Utc};
use regex::Regex;

static TABLE_ROW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<tr\b[^>]*>(.*?)</tr>").unwrap());
static CLASS_ROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<(?:li|div)\b[^>]*class\s*=\s*["'][^"']*\b(?:email-item|message-row)\b[^"']*["'][^>]*>(.*?)</(?:li|div)>"#,
    )
    .unwrap()
});
static CELL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<td\b[^>]*>(.*?)</td>").unwrap());
static HEADER_CELL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<th\b").unwrap());
static HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*\bhref\s*=\s*["']([^"']+)["']"#).unwrap()
});
static SCRIPT_STYLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b.*?</script>|<style\b.*?</style>|<!--.*?-->").unwrap()
});
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static RELATIVE_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d+)\s*(sec|second|min|minute|hr|hour|day)s?\s+ago$").unwrap()
});

/// One message row recovered from an inbox page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxRow {
    pub sender: String,
    pub subject: String,
    /// Time as displayed, e.g. `5 minutes ago`; empty when the row has none.
    pub time: String,
    /// Link to the message, when the row has one.
    pub href: Option<String>,
}

/// Rows of an inbox page, in page order.
///
/// Table rows are preferred; list items are only read when the page has no
/// table rows at all. Header rows and rows with fewer than two cells are
/// skipped.
pub fn inbox_rows(html: &str) -> Vec<InboxRow> {
    let mut fragments: Vec<&str> = TABLE_ROW_RE
        .captures_iter(html)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    if fragments.is_empty() {
        fragments = CLASS_ROW_RE
            .captures_iter(html)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect();
    }

    fragments
        .into_iter()
        .filter(|row| !HEADER_CELL_RE.is_match(row))
        .filter_map(|row| {
            let cells: Vec<String> = CELL_RE
                .captures_iter(row)
                .filter_map(|c| c.get(1).map(|m| text_content(m.as_str())))
                .collect();
            if cells.len() < 2 {
                return None;
            }
            Some(InboxRow {
                sender: cells[0].clone(),
                subject: cells[1].clone(),
                time: cells.get(2).cloned().unwrap_or_default(),
                href: HREF_RE
                    .captures(row)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str().trim().to_string())
                    .filter(|h| !h.is_empty() && !h.starts_with('#')),
            })
        })
        .collect()
}

/// Visible text of a whole page, without scripts, styles or comments.
pub fn page_text(html: &str) -> String {
    text_content(&SCRIPT_STYLE_RE.replace_all(html, " "))
}

/// Text of a markup fragment with entities decoded and whitespace collapsed.
pub fn text_content(fragment: &str) -> String {
    let stripped = TAG_RE.replace_all(fragment, " ");
    decode_entities(&stripped)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

/// Turn a displayed time like `3 min ago` into an absolute time.
///
/// Unrecognized text (including `Just now`) and offsets too large to
/// represent map to `now`.
pub fn approximate_time(displayed: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    let Some(caps) = RELATIVE_TIME_RE.captures(displayed.trim()) else {
        return now;
    };
    let Ok(amount) = caps[1].parse::<i64>() else {
        return now;
    };
    let unit = caps[2].to_ascii_lowercase();
    let ago = match unit.as_str() {
        "sec" | "second" => TimeDelta::try_seconds(amount),
        "min" | "minute" => TimeDelta::try_minutes(amount),
        "hr" | "hour" => TimeDelta::try_hours(amount),
        _ => TimeDelta::try_days(amount),
    };
    ago.and_then(|ago| now.checked_sub_signed(ago))
        .unwrap_or(now)
}
