//! Controlled vocabulary engine for newsroom content.
//! This crate is the single source of truth for vocabulary invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod notify;
pub mod repo;
pub mod service;

pub use config::{ConfigError, EngineConfig, LoggingConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::system_keys::SystemKeys;
pub use model::vocabulary::{
    CoercionKind, FieldRule, FieldSpec, Item, SelectionType, ValidationError, Vocabulary,
    VocabularyId, VocabularyType, VocabularyUpdate,
};
pub use notify::{LogNotifier, MemoryNotifier, Notifier, VocabularyNotification};
pub use repo::vocabulary_repo::{
    FieldTypeFilter, RepoError, RepoResult, SqliteVocabularyRepository, VocabularyListQuery,
    VocabularyRepository,
};
pub use service::context::RequestContext;
pub use service::error::{ServiceResult, VocabularyError};
pub use service::locale::{localize_item, localize_items};
pub use service::projection::{ItemQuery, SchemedItem};
pub use service::rightsinfo::{ArticleRef, RightsInfo};
pub use service::validation::{check_uniqueness, VocabularyValidator};
pub use service::vocabulary_service::VocabularyService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
