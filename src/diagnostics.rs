//! Observable side channel for the best-effort failures of the stores.
//!
//! Store writes never return errors to their callers. Instead, every dropped
//! write or unreadable value is handed to a [`DiagnosticSink`]. The default sink
//! ([`LogSink`]) forwards to the `log` facade; tests inject a
//! [`RecordingSink`] and assert on what was reported.

use crate::store::Strategy;
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// A single best-effort failure reported by a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The item could not be encoded; the write was dropped.
    SerializeFailed {
        strategy: Strategy,
        key: String,
        error: String,
    },
    /// Persisted text could not be decoded; the default item is used instead.
    DeserializeFailed {
        strategy: Strategy,
        key: String,
        error: String,
    },
    /// The backing primitive refused the write; nothing changed.
    PersistFailed {
        strategy: Strategy,
        key: String,
        error: String,
    },
    /// A write reached a store whose expiration time has passed.
    WriteAfterExpiry { strategy: Strategy, key: String },
    /// The store's expiration timer fired and the store was reset.
    Expired { strategy: Strategy, key: String },
}

impl Diagnostic {
    pub fn key(&self) -> &str {
        match self {
            Diagnostic::SerializeFailed { key, .. }
            | Diagnostic::DeserializeFailed { key, .. }
            | Diagnostic::PersistFailed { key, .. }
            | Diagnostic::WriteAfterExpiry { key, .. }
            | Diagnostic::Expired { key, .. } => key,
        }
    }

    /// Level [`LogSink`] logs this diagnostic at.
    pub fn level(&self) -> log::Level {
        match self {
            // Both fall back to the default item.
            Diagnostic::DeserializeFailed { .. } | Diagnostic::Expired { .. } => log::Level::Debug,
            Diagnostic::PersistFailed { .. } => log::Level::Error,
            Diagnostic::SerializeFailed { .. } | Diagnostic::WriteAfterExpiry { .. } => {
                log::Level::Warn
            }
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::SerializeFailed { strategy, key, error } => {
                write!(f, "{strategy} store \"{key}\": cannot serialize item: {error}")
            }
            Diagnostic::DeserializeFailed { strategy, key, error } => {
                write!(f, "{strategy} store \"{key}\": cannot parse persisted value: {error}")
            }
            Diagnostic::PersistFailed { strategy, key, error } => {
                write!(f, "{strategy} store \"{key}\": write failed: {error}")
            }
            Diagnostic::WriteAfterExpiry { strategy, key } => {
                write!(f, "{strategy} store \"{key}\" is expired")
            }
            Diagnostic::Expired { strategy, key } => {
                write!(f, "{strategy} store \"{key}\" expired and was reset")
            }
        }
    }
}

/// Receiver of store diagnostics.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Forwards diagnostics to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn report(&self, diagnostic: Diagnostic) {
        log::log!(diagnostic.level(), "{diagnostic}");
    }
}

/// Keeps every diagnostic in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    seen: Mutex<Vec<Diagnostic>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything reported so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Drains everything reported so far.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.seen.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl DiagnosticSink for RecordingSink {
    fn report(&self, diagnostic: Diagnostic) {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(diagnostic);
    }
}
