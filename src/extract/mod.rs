//! Verification-code extraction over free text and raw markup.
//!
//! Two families of rules feed one pool of candidates:
//! - bare rules match generic 4–8 character runs anywhere in the text
//! - anchored rules match a keyword (`code:`, `otp`, `is`, `facebook` ...)
//!   and capture the run that follows it, lowercase included
//!
//! Every candidate is cleaned (separators removed, uppercased), checked for
//! shape and against a denylist of markup words, then deduplicated in
//! first-seen order. Nothing here can fail; no match yields an empty list.

use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::trace;

/// Shortest accepted code.
pub const MIN_CODE_LEN: usize = 4;
/// Longest accepted code.
pub const MAX_CODE_LEN: usize = 8;

/// Words that look like codes in HTML/HTTP text but never are.
pub const DENYLIST: [&str; 10] = [
    "HTML", "HTTP", "HTTPS", "POST", "HEAD", "BODY", "FORM", "EMAIL", "USER", "PASS",
];

static DEFAULT_EXTRACTOR: LazyLock<CodeExtractor> = LazyLock::new(CodeExtractor::default_rules);

/// Run the default rule set over `text`.
pub fn extract_codes(text: &str) -> Vec<VerificationCode> {
    DEFAULT_EXTRACTOR.extract(text)
}

/// An uppercase alphanumeric code of 4–8 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct VerificationCode(String);

impl VerificationCode {
    /// Clean a raw candidate and return it if it has the shape of a code.
    pub fn normalize(raw: &str) -> Option<Self> {
        let cleaned: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect::<String>()
            .to_ascii_uppercase();

        if !(MIN_CODE_LEN..=MAX_CODE_LEN).contains(&cleaned.len()) {
            return None;
        }
        if !cleaned.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        if DENYLIST.contains(&cleaned.as_str()) {
            return None;
        }
        Some(Self(cleaned))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VerificationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a rule's match becomes a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// The whole match is the candidate.
    Bare,
    /// Capture group 1 is the candidate; the anchor in front is dropped.
    Anchored,
    /// Like `Anchored`, but the capture may be any case. A capture with
    /// lowercase letters must also contain a digit, so prose after a keyword
    /// (`confirm your`) is not taken for a code.
    Keyword,
}

/// A single extraction rule with a compiled regex.
#[derive(Debug, Clone)]
pub struct CodeRule {
    /// Human-readable name, used in trace output.
    pub name: String,
    pub regex: Regex,
    pub kind: RuleKind,
}

impl CodeRule {
    fn bare(name: &str, pattern: &str) -> Self {
        Self {
            name: name.into(),
            regex: Regex::new(pattern).unwrap(),
            kind: RuleKind::Bare,
        }
    }

    /// Keyword followed by separators and a run; both match in any case.
    fn keyword(keyword: &str, run: &str) -> Self {
        let pattern = format!(r"(?i)\b{keyword}[:\s]+({run})\b");
        Self {
            name: format!("{keyword}:"),
            regex: Regex::new(&pattern).unwrap(),
            kind: RuleKind::Keyword,
        }
    }

    /// Platform name followed, anywhere before the next tag end, by digits.
    fn platform(platform: &str) -> Self {
        let pattern = format!(r"(?i:{platform})[^>]*?\b([0-9]{{4,8}})\b");
        Self {
            name: format!("{platform} anchor"),
            regex: Regex::new(&pattern).unwrap(),
            kind: RuleKind::Anchored,
        }
    }

    fn candidates<'t>(&'t self, text: &'t str) -> impl Iterator<Item = &'t str> + 't {
        self.regex.captures_iter(text).filter_map(move |caps| {
            let m = match self.kind {
                RuleKind::Bare => caps.get(0),
                RuleKind::Anchored | RuleKind::Keyword => caps.get(1),
            };
            m.map(|m| m.as_str())
                .filter(|run| self.kind != RuleKind::Keyword || looks_like_code(run))
        })
    }
}

fn looks_like_code(run: &str) -> bool {
    !run.chars().any(|c| c.is_ascii_lowercase()) || run.chars().any(|c| c.is_ascii_digit())
}

/// Ordered rule set; generic rules first, anchored rules after.
#[derive(Debug, Clone)]
pub struct CodeExtractor {
    rules: Vec<CodeRule>,
}

impl CodeExtractor {
    /// Create an extractor with the built-in rules.
    pub fn default_rules() -> Self {
        const ALNUM: &str = "[a-z0-9]{4,8}";

        let mut rules = vec![
            CodeRule::bare("numeric run", r"\b[0-9]{4,8}\b"),
            CodeRule::bare("alphanumeric run", r"\b[A-Z0-9]{4,8}\b"),
        ];

        for keyword in [
            "is",
            "code",
            "verification",
            "token",
            "confirm",
            "activate",
            "otp",
            "verify",
            "confirmation",
        ] {
            rules.push(CodeRule::keyword(keyword, ALNUM));
        }
        rules.push(CodeRule::keyword("pin", "[0-9]{4,6}"));

        rules.push(CodeRule {
            name: "split pair".into(),
            regex: Regex::new(r"\b([A-Z0-9]{4}[ \t-]?[A-Z0-9]{4})\b").unwrap(),
            kind: RuleKind::Anchored,
        });

        for platform in ["facebook", "instagram", "twitter", "gmail"] {
            rules.push(CodeRule::platform(platform));
        }

        Self { rules }
    }

    /// Create an extractor with no rules (for testing).
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a custom bare rule.
    pub fn add_bare_rule(&mut self, name: &str, pattern: &str) -> Result<(), regex::Error> {
        self.rules.push(CodeRule {
            name: name.into(),
            regex: Regex::new(pattern)?,
            kind: RuleKind::Bare,
        });
        Ok(())
    }

    /// Append a custom anchored rule; the pattern must have a capture group.
    pub fn add_anchored_rule(&mut self, name: &str, pattern: &str) -> Result<(), regex::Error> {
        self.rules.push(CodeRule {
            name: name.into(),
            regex: Regex::new(pattern)?,
            kind: RuleKind::Anchored,
        });
        Ok(())
    }

    pub fn rules(&self) -> &[CodeRule] {
        &self.rules
    }

    /// All codes in `text`, deduplicated, in first-seen order.
    pub fn extract(&self, text: &str) -> Vec<VerificationCode> {
        let mut seen = HashSet::new();
        let mut codes = Vec::new();

        for rule in &self.rules {
            for raw in rule.candidates(text) {
                let Some(code) = VerificationCode::normalize(raw) else {
                    continue;
                };
                if seen.insert(code.clone()) {
                    trace!(rule = %rule.name, code = %code, "Code candidate accepted");
                    codes.push(code);
                }
            }
        }

        codes
    }
}

impl Default for CodeExtractor {
    fn default() -> Self {
        Self::default_rules()
    }
}
