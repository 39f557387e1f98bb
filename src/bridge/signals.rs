//! Client signals: the JSON state a Datastar page sends with each request.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Query parameter carrying signals on requests without a body.
pub const SIGNALS_QUERY_PARAM: &str = "datastar";

/// Signal naming the browser tab a page lives in.
pub const TAB_ID_SIGNAL: &str = "tab_id";

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("signals are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("signals must be a JSON object")]
    NotAnObject,
}

/// A single JSON value inside the signal tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<SignalValue>),
    Object(BTreeMap<String, SignalValue>),
}

impl SignalValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SignalValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Truthiness as templates see it: zero values and empty containers are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            SignalValue::Null => false,
            SignalValue::Bool(b) => *b,
            SignalValue::Int(n) => *n != 0,
            SignalValue::Float(f) => *f != 0.0,
            SignalValue::String(s) => !s.is_empty(),
            SignalValue::Array(a) => !a.is_empty(),
            SignalValue::Object(o) => !o.is_empty(),
        }
    }
}

/// Plain-text rendering. Containers print as JSON, null prints nothing.
impl fmt::Display for SignalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalValue::Null => Ok(()),
            SignalValue::Bool(b) => write!(f, "{b}"),
            SignalValue::Int(n) => write!(f, "{n}"),
            SignalValue::Float(x) => write!(f, "{x}"),
            SignalValue::String(s) => f.write_str(s),
            SignalValue::Array(_) | SignalValue::Object(_) => {
                let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

impl From<&str> for SignalValue {
    fn from(s: &str) -> Self {
        SignalValue::String(s.to_string())
    }
}

impl From<String> for SignalValue {
    fn from(s: String) -> Self {
        SignalValue::String(s)
    }
}

impl From<i64> for SignalValue {
    fn from(n: i64) -> Self {
        SignalValue::Int(n)
    }
}

impl From<bool> for SignalValue {
    fn from(b: bool) -> Self {
        SignalValue::Bool(b)
    }
}

/// The top-level signal object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signals(pub BTreeMap<String, SignalValue>);

impl Signals {
    /// Parse a JSON object. An empty or whitespace-only input is no signals.
    pub fn from_json(bytes: &[u8]) -> Result<Self, SignalError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        match serde_json::from_slice::<SignalValue>(bytes)? {
            SignalValue::Object(map) => Ok(Self(map)),
            SignalValue::Null => Ok(Self::default()),
            _ => Err(SignalError::NotAnObject),
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>, SignalError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Overlay `incoming`: colliding keys take the new value, nothing is removed.
    pub fn merge(&mut self, incoming: Signals) {
        self.0.extend(incoming.0);
    }

    /// The page's tab id, when it is a nonempty string.
    pub fn tab_id(&self) -> Option<&str> {
        self.0
            .get(TAB_ID_SIGNAL)
            .and_then(SignalValue::as_str)
            .filter(|id| !id.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&SignalValue> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<SignalValue>) {
        self.0.insert(key.into(), value.into());
    }
}

impl From<Signals> for SignalValue {
    fn from(signals: Signals) -> Self {
        SignalValue::Object(signals.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signals(json: &str) -> Signals {
        Signals::from_json(json.as_bytes()).unwrap()
    }

    #[test]
    fn test_merge_overwrites_and_keeps() {
        let mut current = signals(r#"{"a":1,"b":2}"#);
        current.merge(signals(r#"{"b":3,"c":4}"#));
        assert_eq!(current, signals(r#"{"a":1,"b":3,"c":4}"#));
    }

    #[test]
    fn test_value_variants() {
        let s = signals(r#"{"n":1,"f":1.5,"s":"x","b":true,"z":null,"a":[1],"o":{"k":"v"}}"#);
        assert_eq!(s.get("n"), Some(&SignalValue::Int(1)));
        assert_eq!(s.get("f"), Some(&SignalValue::Float(1.5)));
        assert_eq!(s.get("s"), Some(&SignalValue::from("x")));
        assert_eq!(s.get("b"), Some(&SignalValue::Bool(true)));
        assert_eq!(s.get("z"), Some(&SignalValue::Null));
        assert_eq!(s.get("a").unwrap().to_string(), "[1]");
        assert_eq!(s.get("o").unwrap().to_string(), r#"{"k":"v"}"#);
    }

    #[test]
    fn test_rejects_non_objects() {
        assert!(matches!(Signals::from_json(b"[1,2]"), Err(SignalError::NotAnObject)));
        assert!(matches!(Signals::from_json(b"{oops"), Err(SignalError::Json(_))));
        assert!(Signals::from_json(b"  ").unwrap().is_empty());
    }

    #[test]
    fn test_tab_id() {
        assert_eq!(signals(r#"{"tab_id":"t1"}"#).tab_id(), Some("t1"));
        assert_eq!(signals(r#"{"tab_id":""}"#).tab_id(), None);
        assert_eq!(signals(r#"{"tab_id":5}"#).tab_id(), None);
    }

    #[test]
    fn test_json_round_trip_keeps_integers() {
        let s = signals(r#"{"count":3}"#);
        assert_eq!(s.to_json().unwrap(), br#"{"count":3}"#);
    }
}
