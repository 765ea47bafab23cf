//! Vocabulary domain model.
//!
//! # Responsibility
//! - Define canonical data structures used by the vocabulary engine.
//! - Hold the reserved system-key set that custom vocabularies may not use.
//!
//! # Invariants
//! - Every vocabulary is identified by a stable, pattern-restricted id.
//! - Deletion is represented by soft-delete tombstones, not hard delete.
//!
//! # See also
//! - docs/architecture/vocabularies.md

pub mod system_keys;
pub mod vocabulary;

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|elapsed| i64::try_from(elapsed.as_millis()).ok())
        .unwrap_or(0)
}
