//! Serialization helpers shared by both store backends.
//!
//! Every persisted value is the `serde_json` text of the item, nothing else.
//! The helpers here never panic: failures come back as
//! [`serde_json::Error`] so the stores can report them to a
//! [`DiagnosticSink`](crate::diagnostics::DiagnosticSink) and carry on.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

/// Encodes `item` as JSON text.
pub fn encode<T: Serialize + ?Sized>(item: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(item)
}

/// Decodes JSON text into an item.
pub fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(raw)
}

/// The argument of a state setter: either the next value itself or a function
/// computing it from the most recently known value.
pub enum SetStateAction<T> {
    Value(T),
    Update(Box<dyn FnOnce(&T) -> T + Send>),
}

impl<T> SetStateAction<T> {
    /// Wraps an updater function.
    pub fn update<F>(f: F) -> Self
    where
        F: FnOnce(&T) -> T + Send + 'static,
    {
        SetStateAction::Update(Box::new(f))
    }

    /// Returns `true` when the action is an updater rather than a literal value.
    pub fn is_updater(&self) -> bool {
        matches!(self, SetStateAction::Update(_))
    }

    /// Resolves the action against `prev`.
    pub fn resolve(self, prev: &T) -> T {
        match self {
            SetStateAction::Value(v) => v,
            SetStateAction::Update(f) => f(prev),
        }
    }
}

impl<T> From<T> for SetStateAction<T> {
    fn from(value: T) -> Self {
        SetStateAction::Value(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for SetStateAction<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetStateAction::Value(v) => f.debug_tuple("Value").field(v).finish(),
            SetStateAction::Update(_) => f.write_str("Update(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::ser::Error as _;
    use serde::{Deserialize, Serializer};
    use std::collections::HashMap;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Counter {
        count: u32,
        label: String,
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: Serializer>(&self, _s: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("cyclic structure"))
        }
    }

    #[test]
    fn encode_matches_json_text() {
        let c = Counter { count: 3, label: "x".into() };
        assert_eq!(encode(&c).unwrap(), r#"{"count":3,"label":"x"}"#);
        assert_eq!(encode("plain").unwrap(), r#""plain""#);
    }

    #[test]
    fn encode_failure_is_an_error_not_a_panic() {
        assert!(encode(&Unserializable).is_err());

        // Non-string map keys are rejected by JSON as well.
        let mut m = HashMap::new();
        m.insert(vec![1u8], 1);
        assert!(encode(&m).is_err());
    }

    #[test]
    fn decode_malformed_is_an_error() {
        assert!(decode::<Counter>("not-json").is_err());
        assert!(decode::<u32>("{").is_err());
        assert_eq!(decode::<u32>("7").unwrap(), 7);
    }

    #[test]
    fn set_state_action_resolves_literal_and_updater() {
        let literal: SetStateAction<i32> = 5.into();
        assert!(!literal.is_updater());
        assert_eq!(literal.resolve(&1), 5);

        let updater = SetStateAction::update(|n: &i32| n + 10);
        assert!(updater.is_updater());
        assert_eq!(updater.resolve(&1), 11);
        assert_eq!(format!("{:?}", SetStateAction::<i32>::update(|n| *n)), "Update(..)");
    }
}
