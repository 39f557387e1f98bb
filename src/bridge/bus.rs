//! Publish/subscribe seam between interactive requests and live streams.

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::bridge::signals::SignalError;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("invalid subject {0:?}")]
    InvalidSubject(String),

    #[error(transparent)]
    Encode(#[from] SignalError),
}

/// A subject-addressed message bus.
///
/// Implementations deliver each published payload to every subscription
/// open on that exact subject at publish time.
pub trait SignalBridge: Send + Sync {
    /// Publish `payload`, returning how many subscriptions will receive it.
    fn publish(&self, subject: &str, payload: Bytes) -> Result<usize, BridgeError>;

    /// Forward every message on `subject` into `sink` until the returned
    /// handle is dropped or `sink` closes.
    fn subscribe(
        &self,
        subject: &str,
        sink: mpsc::Sender<Bytes>,
    ) -> Result<Subscription, BridgeError>;
}

/// An open subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    subject: String,
    forwarder: JoinHandle<()>,
}

impl Subscription {
    pub fn new(subject: impl Into<String>, forwarder: JoinHandle<()>) -> Self {
        Self {
            subject: subject.into(),
            forwarder,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}

/// Subjects are dot-separated tokens without whitespace or empty tokens.
pub fn validate_subject(subject: &str) -> Result<(), BridgeError> {
    let valid = !subject.is_empty()
        && subject
            .split('.')
            .all(|token| !token.is_empty() && !token.contains(char::is_whitespace));
    if valid {
        Ok(())
    } else {
        Err(BridgeError::InvalidSubject(subject.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_subject() {
        assert!(validate_subject("dspen.session.s-1").is_ok());
        assert!(validate_subject("").is_err());
        assert!(validate_subject("dspen..x").is_err());
        assert!(validate_subject("dspen.tab.has space").is_err());
        assert!(validate_subject("dspen.tab.").is_err());
    }
}
