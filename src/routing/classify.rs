//! Filename classification.
//!
//! # Responsibilities
//! - Extract the `_NNN` sequence suffix from a filename stem
//! - Detect live-stream files (`live`, `*_live`)
//! - Detect method-specific files (`get`, `post`, `put`, `patch`, `delete`)
//!
//! # Examples
//! ```text
//! index.html          → HTML, any method
//! live.html           → live, any method
//! get.html            → HTML, GET
//! post_live.html      → live, POST
//! live_001.html       → live, any method, sequence 1
//! post_live_001.html  → live, POST, sequence 1
//! index_002.html      → HTML, any method, sequence 2
//! ```
//!
//! # Design Decisions
//! - Total function: unknown stems fall back to "any method, HTML"
//! - Method and marker matching is case-insensitive

/// Methods that may appear as a filename stem.
pub const KNOWN_METHODS: [&str; 5] = ["GET", "POST", "PUT", "PATCH", "DELETE"];

const LIVE_MARKER: &str = "live";
const LIVE_SUFFIX: &str = "_live";

/// Response kind served by a template file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResponseKind {
    /// Plain HTML response.
    Html,
    /// Long-lived stream of patches.
    Live,
}

impl ResponseKind {
    /// Stable label used in sequence keys and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseKind::Html => "html",
            ResponseKind::Live => "live",
        }
    }
}

impl std::fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying a filename stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Uppercase method, or empty for "any method".
    pub method: String,
    pub kind: ResponseKind,
    /// Sequence index from the `_NNN` suffix, `-1` when absent.
    pub seq_index: i64,
}

/// Split a trailing `_NNN` sequence suffix off a stem.
///
/// Returns the remaining stem and the index, or the untouched stem and `-1`.
pub fn split_seq_index(stem: &str) -> (&str, i64) {
    let Some(idx) = stem.rfind('_') else {
        return (stem, -1);
    };

    let suffix = &stem[idx + 1..];
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return (stem, -1);
    }

    match suffix.parse::<i64>() {
        Ok(n) => (&stem[..idx], n),
        Err(_) => (stem, -1),
    }
}

/// Classify a filename stem (filename without extension).
pub fn classify(stem: &str) -> Classification {
    let (mut remaining, seq_index) = split_seq_index(stem);

    if remaining.eq_ignore_ascii_case(LIVE_MARKER) {
        return Classification {
            method: String::new(),
            kind: ResponseKind::Live,
            seq_index,
        };
    }

    let mut kind = ResponseKind::Html;
    if has_suffix_ignore_case(remaining, LIVE_SUFFIX) {
        kind = ResponseKind::Live;
        remaining = &remaining[..remaining.len() - LIVE_SUFFIX.len()];
    }

    let upper = remaining.to_ascii_uppercase();
    let method = if KNOWN_METHODS.contains(&upper.as_str()) {
        upper
    } else {
        String::new()
    };

    Classification {
        method,
        kind,
        seq_index,
    }
}

fn has_suffix_ignore_case(s: &str, suffix: &str) -> bool {
    s.len() >= suffix.len()
        && s.is_char_boundary(s.len() - suffix.len())
        && s[s.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}
