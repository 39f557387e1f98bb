//! Subject naming and the publish/subscribe calls the server makes.

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::bridge::bus::{SignalBridge, Subscription};
use crate::bridge::signals::Signals;
use crate::observability::metrics;

/// `<namespace>.session.<session_id>`
pub fn session_subject(namespace: &str, session_id: &str) -> String {
    format!("{namespace}.session.{session_id}")
}

/// `<namespace>.tab.<tab_id>`
pub fn tab_subject(namespace: &str, tab_id: &str) -> String {
    format!("{namespace}.tab.{tab_id}")
}

/// Publish a page's signals to its session subject and, when it names a
/// tab, its tab subject. Failures are logged and otherwise ignored.
pub fn publish_signals(
    bridge: &dyn SignalBridge,
    namespace: &str,
    session_id: &str,
    signals: &Signals,
) {
    let payload = match signals.to_json() {
        Ok(json) => Bytes::from(json),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to encode signals for publish");
            return;
        }
    };

    let mut targets = vec![("session", session_subject(namespace, session_id))];
    if let Some(tab_id) = signals.tab_id() {
        targets.push(("tab", tab_subject(namespace, tab_id)));
    }

    for (scope, subject) in targets {
        match bridge.publish(&subject, payload.clone()) {
            Ok(receivers) => {
                metrics::record_bridge_publish(scope);
                tracing::debug!(subject = %subject, receivers, "Published signals");
            }
            Err(e) => tracing::warn!(subject = %subject, error = %e, "Signal publish failed"),
        }
    }
}

/// Subscribe a live connection to its session subject and, when its signals
/// name a tab, its tab subject. Both feed `sink`.
pub fn subscribe_signals(
    bridge: &dyn SignalBridge,
    namespace: &str,
    session_id: &str,
    signals: &Signals,
    sink: mpsc::Sender<Bytes>,
) -> Vec<Subscription> {
    let mut subjects = vec![session_subject(namespace, session_id)];
    if let Some(tab_id) = signals.tab_id() {
        subjects.push(tab_subject(namespace, tab_id));
    }

    subjects
        .into_iter()
        .filter_map(|subject| match bridge.subscribe(&subject, sink.clone()) {
            Ok(sub) => Some(sub),
            Err(e) => {
                tracing::warn!(subject = %subject, error = %e, "Signal subscribe failed");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::LocalBridge;

    #[tokio::test]
    async fn test_publish_targets_session_and_tab() {
        let bridge = LocalBridge::new(8);
        let (session_tx, mut session_rx) = mpsc::channel(4);
        let (tab_tx, mut tab_rx) = mpsc::channel(4);
        let _s = bridge.subscribe("dspen.session.s-1", session_tx).unwrap();
        let _t = bridge.subscribe("dspen.tab.t-1", tab_tx).unwrap();

        let signals = Signals::from_json(br#"{"tab_id":"t-1","x":1}"#).unwrap();
        publish_signals(&bridge, "dspen", "s-1", &signals);

        let expected = Bytes::from(signals.to_json().unwrap());
        assert_eq!(session_rx.recv().await.unwrap(), expected);
        assert_eq!(tab_rx.recv().await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_subscribe_skips_tab_without_tab_id() {
        let bridge = LocalBridge::new(8);
        let (tx, _rx) = mpsc::channel(4);

        let subs = subscribe_signals(&bridge, "dspen", "s-2", &Signals::default(), tx.clone());
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].subject(), "dspen.session.s-2");

        let with_tab = Signals::from_json(br#"{"tab_id":"t-2"}"#).unwrap();
        let subs = subscribe_signals(&bridge, "dspen", "s-2", &with_tab, tx);
        let subjects: Vec<_> = subs.iter().map(Subscription::subject).collect();
        assert_eq!(subjects, ["dspen.session.s-2", "dspen.tab.t-2"]);
    }

    #[tokio::test]
    async fn test_invalid_tab_id_is_skipped_not_fatal() {
        let bridge = LocalBridge::new(8);
        let (tx, _rx) = mpsc::channel(4);
        let signals = Signals::from_json(br#"{"tab_id":"has space"}"#).unwrap();
        let subs = subscribe_signals(&bridge, "dspen", "s-3", &signals, tx);
        assert_eq!(subs.len(), 1);
    }
}
