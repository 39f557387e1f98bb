//! Signed-cookie session store.
//!
//! The whole [`SessionState`] travels in the cookie as
//! `base64url(json envelope) "." base64url(hmac-sha256)`. Nothing is kept
//! server-side, so sessions survive restarts as long as the secret does.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::config::SessionConfig;
use crate::session::names::{new_session_id, random_username};
use crate::session::state::SessionState;

type HmacSha256 = Hmac<Sha256>;

const ENVELOPE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session cookie is malformed")]
    Malformed,

    #[error("session cookie signature mismatch")]
    BadSignature,

    #[error("session expired")]
    Expired,

    #[error("unsupported session version {0}")]
    Version(u32),

    #[error("session payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("invalid signing key")]
    Key,

    #[error("cookie header: {0}")]
    Header(#[from] axum::http::header::InvalidHeaderValue),
}

/// Opaque per-session key/value persistence.
pub trait SessionStore: Send + Sync {
    /// Load the session carried by the request, `Ok(None)` when there is none.
    fn get(&self, headers: &HeaderMap) -> Result<Option<SessionState>, SessionError>;

    /// Encode `state` as a `Set-Cookie` header value.
    fn set(&self, state: &SessionState) -> Result<HeaderValue, SessionError>;

    /// A brand-new session with a random identity.
    fn new_session(&self) -> SessionState {
        SessionState::new(random_username(), new_session_id())
    }

    /// Load the request's session, starting fresh on absence or any decode failure.
    fn load_or_new(&self, headers: &HeaderMap) -> SessionState {
        match self.get(headers) {
            Ok(Some(state)) => state,
            Ok(None) => self.new_session(),
            Err(e) => {
                tracing::debug!(error = %e, "Discarding unreadable session cookie");
                self.new_session()
            }
        }
    }
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    v: u32,
    issued_at: u64,
    state: SessionState,
}

/// [`SessionStore`] keeping everything in an HMAC-signed cookie.
#[derive(Clone)]
pub struct CookieSessionStore {
    key: Vec<u8>,
    cookie_name: String,
    max_age: Duration,
}

impl CookieSessionStore {
    pub fn new(secret: impl AsRef<[u8]>, cookie_name: impl Into<String>, max_age: Duration) -> Self {
        Self {
            key: secret.as_ref().to_vec(),
            cookie_name: cookie_name.into(),
            max_age,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(
            config.secret.as_bytes(),
            config.cookie_name.clone(),
            Duration::from_secs(config.max_age_secs),
        )
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    fn mac(&self) -> Result<HmacSha256, SessionError> {
        HmacSha256::new_from_slice(&self.key).map_err(|_| SessionError::Key)
    }

    /// Encode `state` as the cookie value, stamped with `issued_at`.
    fn encode_at(&self, state: &SessionState, issued_at: u64) -> Result<String, SessionError> {
        let envelope = Envelope {
            v: ENVELOPE_VERSION,
            issued_at,
            state: state.clone(),
        };
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&envelope)?);

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{payload}.{signature}"))
    }

    /// Verify and decode a cookie value as seen at time `now`.
    fn decode_at(&self, value: &str, now: u64) -> Result<SessionState, SessionError> {
        let (payload, signature) = value.split_once('.').ok_or(SessionError::Malformed)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| SessionError::Malformed)?;

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| SessionError::BadSignature)?;

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| SessionError::Malformed)?;
        let envelope: Envelope = serde_json::from_slice(&json)?;

        if envelope.v != ENVELOPE_VERSION {
            return Err(SessionError::Version(envelope.v));
        }
        if now.saturating_sub(envelope.issued_at) > self.max_age.as_secs() {
            return Err(SessionError::Expired);
        }
        Ok(envelope.state)
    }

    fn cookie_value<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|h| h.to_str().ok())
            .flat_map(|h| h.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.cookie_name)
            .map(|(_, value)| value)
    }
}

impl SessionStore for CookieSessionStore {
    fn get(&self, headers: &HeaderMap) -> Result<Option<SessionState>, SessionError> {
        match self.cookie_value(headers) {
            Some(value) => self.decode_at(value, unix_now()).map(Some),
            None => Ok(None),
        }
    }

    fn set(&self, state: &SessionState) -> Result<HeaderValue, SessionError> {
        let value = self.encode_at(state, unix_now())?;
        let cookie = format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            self.cookie_name,
            value,
            self.max_age.as_secs()
        );
        Ok(HeaderValue::from_str(&cookie)?)
    }
}

/// Append a `Set-Cookie` header carrying `state`.
pub fn attach_cookie(
    store: &dyn SessionStore,
    state: &SessionState,
    headers: &mut HeaderMap,
) -> Result<(), SessionError> {
    headers.append(SET_COOKIE, store.set(state)?);
    Ok(())
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
