//! Notification channel for vocabulary change events.
//!
//! # Responsibility
//! - Define the fire-and-forget publish contract used by lifecycle hooks.
//! - Provide a log-backed channel and an in-memory recording channel.
//!
//! # Invariants
//! - `publish` never fails the calling operation; delivery is best effort.

use log::info;
use serde::Serialize;
use std::sync::Mutex;

/// Event published after vocabularies are created.
pub const EVENT_VOCABULARY_CREATED: &str = "vocabularies:created";
/// Event published after vocabularies are updated or replaced.
pub const EVENT_VOCABULARY_UPDATED: &str = "vocabularies:updated";

/// Payload shared by every vocabulary event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VocabularyNotification {
    /// Display name of the vocabulary.
    pub vocabulary: String,
    /// Acting user id, when the request carried one.
    pub user: Option<String>,
    pub vocabulary_id: String,
}

/// Outbound notification transport.
pub trait Notifier: Send + Sync {
    fn publish(&self, event: &str, payload: &VocabularyNotification);
}

/// Writes every notification as a structured log event.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn publish(&self, event: &str, payload: &VocabularyNotification) {
        info!(
            "event=notification_publish module=notify name={} vocabulary_id={} user={}",
            event,
            payload.vocabulary_id,
            payload.user.as_deref().unwrap_or("-")
        );
    }
}

/// Records notifications in memory, in publish order.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    events: Mutex<Vec<(String, VocabularyNotification)>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of recorded `(event, payload)` pairs.
    pub fn events(&self) -> Vec<(String, VocabularyNotification)> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Returns recorded payloads for one event name.
    pub fn events_named(&self, event: &str) -> Vec<VocabularyNotification> {
        self.events()
            .into_iter()
            .filter(|(name, _)| name == event)
            .map(|(_, payload)| payload)
            .collect()
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

impl Notifier for MemoryNotifier {
    fn publish(&self, event: &str, payload: &VocabularyNotification) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((event.to_string(), payload.clone()));
    }
}
