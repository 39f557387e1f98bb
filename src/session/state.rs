//! Per-session record carried in the session cookie.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Everything the playground remembers about one visitor.
///
/// Sequence keys have the form `<url>:<kind>:<method>`; see
/// [`crate::sequence::sequence_key`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    pub username: String,
    pub session_id: String,
    /// Visits to each URL by this session.
    pub url_hits: BTreeMap<String, i64>,
    /// Cursor into each flattened section sequence.
    pub seq_positions: BTreeMap<String, usize>,
}

impl SessionState {
    pub fn new(username: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            session_id: session_id.into(),
            ..Self::default()
        }
    }

    /// Count a visit to `url` and return the new per-session total.
    pub fn record_hit(&mut self, url: &str) -> i64 {
        let hits = self.url_hits.entry(url.to_string()).or_insert(0);
        *hits += 1;
        *hits
    }

    pub fn hits(&self, url: &str) -> i64 {
        self.url_hits.get(url).copied().unwrap_or(0)
    }

    /// Stored cursor for a sequence key, 0 when never visited.
    pub fn position(&self, key: &str) -> usize {
        self.seq_positions.get(key).copied().unwrap_or(0)
    }

    pub fn set_position(&mut self, key: &str, position: usize) {
        self.seq_positions.insert(key.to_string(), position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_hit_counts_per_url() {
        let mut state = SessionState::new("calm-owl-4", "s-1");
        assert_eq!(state.record_hit("/a/"), 1);
        assert_eq!(state.record_hit("/a/"), 2);
        assert_eq!(state.record_hit("/b/"), 1);
        assert_eq!(state.hits("/a/"), 2);
        assert_eq!(state.hits("/missing/"), 0);
    }

    #[test]
    fn test_positions_default_to_zero() {
        let mut state = SessionState::default();
        assert_eq!(state.position("/:html:"), 0);
        state.set_position("/:html:", 2);
        assert_eq!(state.position("/:html:"), 2);
    }
}
