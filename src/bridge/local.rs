//! In-process bridge built on broadcast channels.

use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;

use crate::bridge::bus::{validate_subject, BridgeError, SignalBridge, Subscription};

/// [`SignalBridge`] for a single server process.
///
/// One broadcast channel per subject, created on first subscribe and dropped
/// together with its last subscription.
#[derive(Clone)]
pub struct LocalBridge {
    subjects: Arc<DashMap<String, broadcast::Sender<Bytes>>>,
    capacity: usize,
}

impl LocalBridge {
    pub fn new(capacity: usize) -> Self {
        Self {
            subjects: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Subjects with a live channel.
    pub fn subject_count(&self) -> usize {
        self.subjects.len()
    }
}

impl SignalBridge for LocalBridge {
    fn publish(&self, subject: &str, payload: Bytes) -> Result<usize, BridgeError> {
        validate_subject(subject)?;

        let sent = match self.subjects.get(subject) {
            Some(tx) => tx.send(payload).ok(),
            None => return Ok(0),
        };

        match sent {
            Some(receivers) => Ok(receivers),
            None => {
                self.subjects
                    .remove_if(subject, |_, tx| tx.receiver_count() == 0);
                Ok(0)
            }
        }
    }

    fn subscribe(
        &self,
        subject: &str,
        sink: mpsc::Sender<Bytes>,
    ) -> Result<Subscription, BridgeError> {
        validate_subject(subject)?;

        let rx = self
            .subjects
            .entry(subject.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();

        let mut feed = Feed {
            subjects: Arc::clone(&self.subjects),
            subject: subject.to_string(),
            rx: Some(rx),
        };
        let forwarder = tokio::spawn(async move {
            while let Some(payload) = feed.next().await {
                if sink.send(payload).await.is_err() {
                    break;
                }
            }
        });

        Ok(Subscription::new(subject, forwarder))
    }
}

/// Receiving half of one subscription. Dropping it (including when the
/// forwarder is aborted) prunes the subject once nobody else listens.
struct Feed {
    subjects: Arc<DashMap<String, broadcast::Sender<Bytes>>>,
    subject: String,
    rx: Option<broadcast::Receiver<Bytes>>,
}

impl Feed {
    async fn next(&mut self) -> Option<Bytes> {
        let rx = self.rx.as_mut()?;
        loop {
            match rx.recv().await {
                Ok(payload) => return Some(payload),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(subject = %self.subject, skipped, "Subscriber lagged, dropping signals");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for Feed {
    fn drop(&mut self) {
        // The receiver must be gone before the count is checked.
        self.rx.take();
        self.subjects
            .remove_if(&self.subject, |_, tx| tx.receiver_count() == 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_publish_reaches_subscribers_of_that_subject_only() {
        let bridge = LocalBridge::new(8);
        let (tx_a, mut rx_a) = mpsc::channel(4);
        let (tx_b, mut rx_b) = mpsc::channel(4);
        let _a = bridge.subscribe("ns.session.a", tx_a).unwrap();
        let _b = bridge.subscribe("ns.session.b", tx_b).unwrap();

        assert_eq!(bridge.publish("ns.session.a", Bytes::from_static(b"{}")).unwrap(), 1);
        assert_eq!(rx_a.recv().await.unwrap(), Bytes::from_static(b"{}"));

        let nothing = tokio::time::timeout(Duration::from_millis(20), rx_b.recv()).await;
        assert!(nothing.is_err());
    }

    #[tokio::test]
    async fn test_two_subjects_into_one_sink() {
        let bridge = LocalBridge::new(8);
        let (tx, mut rx) = mpsc::channel(4);
        let _s = bridge.subscribe("ns.session.s", tx.clone()).unwrap();
        let _t = bridge.subscribe("ns.tab.t", tx).unwrap();

        bridge.publish("ns.session.s", Bytes::from_static(b"1")).unwrap();
        bridge.publish("ns.tab.t", Bytes::from_static(b"2")).unwrap();

        let mut got = vec![rx.recv().await.unwrap(), rx.recv().await.unwrap()];
        got.sort();
        assert_eq!(got, [Bytes::from_static(b"1"), Bytes::from_static(b"2")]);
    }

    #[tokio::test]
    async fn test_dropping_subscription_unsubscribes() {
        let bridge = LocalBridge::new(8);
        let (tx, mut rx) = mpsc::channel(4);
        let sub = bridge.subscribe("ns.session.x", tx).unwrap();
        assert_eq!(sub.subject(), "ns.session.x");
        drop(sub);
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(bridge.publish("ns.session.x", Bytes::from_static(b"{}")).unwrap(), 0);
        assert_eq!(bridge.subject_count(), 0);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_dropped_subscriptions_release_subjects() {
        let bridge = LocalBridge::new(8);
        for i in 0..100 {
            let (tx, _rx) = mpsc::channel(1);
            drop(bridge.subscribe(&format!("ns.tab.t{i}"), tx).unwrap());
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(bridge.subject_count(), 0);
    }

    #[tokio::test]
    async fn test_subject_survives_while_another_subscriber_remains() {
        let bridge = LocalBridge::new(8);
        let (tx, mut rx) = mpsc::channel(4);
        let keep = bridge.subscribe("ns.session.shared", tx.clone()).unwrap();
        drop(bridge.subscribe("ns.session.shared", tx).unwrap());
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(bridge.subject_count(), 1);
        assert_eq!(bridge.publish("ns.session.shared", Bytes::from_static(b"1")).unwrap(), 1);
        assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(b"1"));

        drop(keep);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(bridge.subject_count(), 0);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let bridge = LocalBridge::new(8);
        assert_eq!(bridge.publish("ns.session.nobody", Bytes::new()).unwrap(), 0);
        assert!(matches!(
            bridge.publish("bad subject", Bytes::new()),
            Err(BridgeError::InvalidSubject(_))
        ));
    }
}
