//! Data handed to a section when it renders.

use crate::bridge::Signals;
use crate::render::template::TemplateData;
use crate::session::{HitCounters, SessionState};

/// Per-render snapshot of counters, identity and signals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderContext {
    pub global_hits: i64,
    pub url_hits: i64,
    pub session_url_hits: i64,
    pub username: String,
    pub session_id: String,
    pub url: String,
    pub method: String,
    pub signals: Signals,
    /// Patches already sent on this live connection.
    pub message_count: i64,
    /// Completed timer iterations on this live connection.
    pub loop_iteration: i64,
}

impl RenderContext {
    pub fn new(session: &SessionState, url: &str, method: &str, signals: Signals) -> Self {
        Self {
            session_url_hits: session.hits(url),
            username: session.username.clone(),
            session_id: session.session_id.clone(),
            url: url.to_string(),
            method: method.to_string(),
            signals,
            ..Self::default()
        }
    }

    /// Re-read the process-wide counters for this URL.
    pub fn refresh_hits(&mut self, counters: &HitCounters) {
        self.global_hits = counters.global();
        self.url_hits = counters.url_hits(&self.url);
    }

    /// Expose the context under the field names templates use.
    pub fn to_template_data(&self) -> TemplateData {
        TemplateData::new()
            .with("GlobalHits", self.global_hits)
            .with("URLHits", self.url_hits)
            .with("SessionURLHits", self.session_url_hits)
            .with("Username", self.username.as_str())
            .with("SessionID", self.session_id.as_str())
            .with("URL", self.url.as_str())
            .with("Method", self.method.as_str())
            .with("Signals", self.signals.clone())
            .with("SSEMessageCount", self.message_count)
            .with("LoopIteration", self.loop_iteration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::render;

    #[test]
    fn test_template_field_names() {
        let mut session = SessionState::new("bold-wren-3", "s-xyz");
        session.record_hit("/count/");
        session.record_hit("/count/");

        let mut signals = Signals::default();
        signals.insert("tab_id", "t-9");
        let mut ctx = RenderContext::new(&session, "/count/", "POST", signals);

        let counters = HitCounters::new();
        counters.hit("/count/");
        counters.hit("/other/");
        ctx.refresh_hits(&counters);
        ctx.message_count = 4;
        ctx.loop_iteration = 2;

        let out = render(
            "{{.Username}}|{{.SessionID}}|{{.URL}}|{{.Method}}|{{.GlobalHits}}|{{.URLHits}}|\
             {{.SessionURLHits}}|{{.Signals.tab_id}}|{{.SSEMessageCount}}|{{.LoopIteration}}",
            &ctx.to_template_data(),
        )
        .unwrap();
        assert_eq!(out, "bold-wren-3|s-xyz|/count/|POST|2|1|2|t-9|4|2");
    }
}
