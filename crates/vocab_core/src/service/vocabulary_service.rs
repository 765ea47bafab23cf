//! Vocabulary lifecycle service.
//!
//! # Responsibility
//! - Run create/replace/update/delete through their lifecycle hooks.
//! - Shape fetched documents for readers (inactive items hidden, requested
//!   language applied, typed casts).
//! - Answer lookup queries used by article editing.
//!
//! # Invariants
//! - A create batch is persisted only when every document passes its hooks.
//! - Only custom vocabularies (`field_type` set) can be deleted.
//! - Notifications are sent after the store write succeeds, never before.
//!
//! # See also
//! - docs/architecture/vocabularies.md

use crate::config::EngineConfig;
use crate::model::now_epoch_ms;
use crate::model::system_keys::SystemKeys;
use crate::model::vocabulary::{SelectionType, Vocabulary, VocabularyId, VocabularyUpdate};
use crate::notify::{
    Notifier, VocabularyNotification, EVENT_VOCABULARY_CREATED, EVENT_VOCABULARY_UPDATED,
};
use crate::repo::vocabulary_repo::{FieldTypeFilter, VocabularyListQuery, VocabularyRepository};
use crate::service::context::RequestContext;
use crate::service::error::{ServiceResult, VocabularyError};
use crate::service::locale::localize_items;
use crate::service::projection::{
    cast_items, filter_inactive, project_items, ItemQuery, SchemedItem,
};
use crate::service::validation::{check_uniqueness, VocabularyValidator};
use log::{info, warn};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Vocabulary service facade over a repository and a notification channel.
pub struct VocabularyService<R: VocabularyRepository> {
    repo: R,
    notifier: Arc<dyn Notifier>,
    config: EngineConfig,
    system_keys: SystemKeys,
}

impl<R: VocabularyRepository> VocabularyService<R> {
    /// Creates a service; reserved ids are the built-in keys plus
    /// `config.extra_system_keys`.
    pub fn new(repo: R, notifier: Arc<dyn Notifier>, config: EngineConfig) -> Self {
        let system_keys = SystemKeys::builtin()
            .with_extra(config.extra_system_keys.iter().cloned());
        Self {
            repo,
            notifier,
            config,
            system_keys,
        }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn system_keys(&self) -> &SystemKeys {
        &self.system_keys
    }

    fn validator(&self) -> VocabularyValidator<'_, R> {
        VocabularyValidator::new(&self.repo, &self.system_keys)
    }

    /// Validates a create batch; the first failing document aborts it.
    ///
    /// Sets `unique_field` to `qcode` where the schema declares `qcode`.
    pub fn on_create(&self, docs: &mut [Vocabulary]) -> ServiceResult<()> {
        let validator = self.validator();
        for doc in docs.iter_mut() {
            doc.apply_unique_field_default();
            validator.validate(doc)?;
            if let Some(unique_field) = doc.unique_field.as_deref() {
                check_uniqueness(&doc.items, unique_field)?;
            }
            validator.check_reserved_id(doc)?;
            if self.repo.find_deleted(&doc.id)?.is_some() {
                return Err(VocabularyError::DeletedIdConflict(doc.id.clone()));
            }
        }
        Ok(())
    }

    pub fn on_created(&self, docs: &[Vocabulary], ctx: &RequestContext) {
        for doc in docs {
            self.notify(EVENT_VOCABULARY_CREATED, doc, ctx);
        }
    }

    /// Creates all documents or none of them.
    pub fn create(
        &self,
        mut docs: Vec<Vocabulary>,
        ctx: &RequestContext,
    ) -> ServiceResult<Vec<VocabularyId>> {
        let ids = self
            .on_create(&mut docs)
            .and_then(|()| self.repo.insert(&docs).map_err(VocabularyError::from));
        let ids = match ids {
            Ok(ids) => ids,
            Err(err) => {
                warn!(
                    "event=vocabulary_create module=service status=error batch={} code={}",
                    docs.len(),
                    err.code()
                );
                return Err(err);
            }
        };

        info!(
            "event=vocabulary_create module=service status=ok batch={} ids={}",
            ids.len(),
            ids.join(",")
        );
        self.on_created(&docs, ctx);
        Ok(ids)
    }

    /// Revalidates a full replacement and stamps its timestamps.
    pub fn on_replace(
        &self,
        document: &mut Vocabulary,
        original: &Vocabulary,
    ) -> ServiceResult<()> {
        if document.id != original.id {
            return Err(VocabularyError::IdMismatch {
                expected: original.id.clone(),
                actual: document.id.clone(),
            });
        }

        document.apply_unique_field_default();
        let validator = self.validator();
        validator.validate(document)?;
        if let Some(unique_field) = document.unique_field.as_deref() {
            check_uniqueness(&document.items, unique_field)?;
        }
        validator.check_reserved_id(document)?;

        let now = now_epoch_ms();
        document.updated_at = Some(now);
        document.created_at = Some(original.created_at.unwrap_or(now));
        info!(
            "event=vocabulary_replace module=service status=validated vocabulary_id={}",
            document.id
        );
        Ok(())
    }

    pub fn on_replaced(&self, document: &Vocabulary, ctx: &RequestContext) {
        self.notify(EVENT_VOCABULARY_UPDATED, document, ctx);
    }

    /// Replaces the active vocabulary `id` with `document`.
    pub fn replace(
        &self,
        id: &str,
        mut document: Vocabulary,
        ctx: &RequestContext,
    ) -> ServiceResult<Vocabulary> {
        let original = self
            .repo
            .find_one(id)?
            .ok_or_else(|| VocabularyError::NotFound(id.to_string()))?;

        self.on_replace(&mut document, &original)?;
        self.repo.replace(&document)?;
        self.on_replaced(&document, ctx);
        Ok(document)
    }

    /// Validates a partial update against the merged document.
    ///
    /// Items are revalidated only when the update carries items. Uniqueness
    /// is checked whenever the merged view has a `unique_field`, over the new
    /// items if present, else over the stored ones. A defaulted
    /// `unique_field` is written back into `update`. The merged view must
    /// not turn a reserved id into a custom vocabulary.
    pub fn on_update(
        &self,
        update: &mut VocabularyUpdate,
        original: &Vocabulary,
    ) -> ServiceResult<()> {
        let mut merged = original.clone();
        merged.apply_update(update);
        let validator = self.validator();
        validator.check_reserved_id(&merged)?;

        if update.touches_items() {
            merged.apply_unique_field_default();
            validator.validate(&merged)?;
            if original.unique_field.is_none() && update.unique_field.is_none() {
                update.unique_field.clone_from(&merged.unique_field);
            }
        }

        if let Some(unique_field) = merged.unique_field.as_deref() {
            let items = update.items.as_deref().unwrap_or(&original.items);
            check_uniqueness(items, unique_field)?;
        }
        Ok(())
    }

    pub fn on_updated(&self, updated: &Vocabulary, ctx: &RequestContext) {
        self.notify(EVENT_VOCABULARY_UPDATED, updated, ctx);
    }

    /// Applies `update` to the active vocabulary `id`.
    pub fn update(
        &self,
        id: &str,
        mut update: VocabularyUpdate,
        ctx: &RequestContext,
    ) -> ServiceResult<Vocabulary> {
        let original = self
            .repo
            .find_one(id)?
            .ok_or_else(|| VocabularyError::NotFound(id.to_string()))?;

        if let Err(err) = self.on_update(&mut update, &original) {
            warn!(
                "event=vocabulary_update module=service status=error vocabulary_id={} code={}",
                id,
                err.code()
            );
            return Err(err);
        }

        let updated = self.repo.patch(id, &update)?;
        info!(
            "event=vocabulary_update module=service status=ok vocabulary_id={} items={}",
            id,
            updated.items.len()
        );
        self.on_updated(&updated, ctx);
        Ok(updated)
    }

    /// Housekeeping write that skips request hooks.
    pub(crate) fn system_update(
        &self,
        id: &str,
        update: &VocabularyUpdate,
    ) -> ServiceResult<Vocabulary> {
        Ok(self.repo.system_update(id, update)?)
    }

    /// Rejects deletion of default vocabularies.
    pub fn on_delete(&self, doc: &Vocabulary) -> ServiceResult<()> {
        if !doc.is_custom() {
            return Err(VocabularyError::ProtectedVocabulary(doc.id.clone()));
        }
        Ok(())
    }

    /// Soft-deletes the custom vocabulary `id`; its id stays reserved.
    pub fn delete(&self, id: &str) -> ServiceResult<()> {
        let doc = self
            .repo
            .find_one(id)?
            .ok_or_else(|| VocabularyError::NotFound(id.to_string()))?;

        if let Err(err) = self.on_delete(&doc) {
            warn!(
                "event=vocabulary_delete module=service status=rejected vocabulary_id={} code={}",
                id,
                err.code()
            );
            return Err(err);
        }

        self.repo.soft_delete(id)?;
        info!("event=vocabulary_delete module=service status=ok vocabulary_id={id}");
        Ok(())
    }

    /// Raw stored document, without read-side shaping.
    pub fn find_one(&self, id: &str) -> ServiceResult<Option<Vocabulary>> {
        Ok(self.repo.find_one(id)?)
    }

    /// Shapes listed documents unless the request is a manageable listing.
    pub fn on_fetched(&self, docs: &mut [Vocabulary], ctx: &RequestContext) {
        if ctx.requests_manageable() {
            return;
        }
        for doc in docs.iter_mut() {
            self.shape_for_reader(doc, ctx);
        }
    }

    pub fn on_fetched_item(&self, doc: &mut Vocabulary, ctx: &RequestContext) {
        if ctx.requests_manageable() {
            return;
        }
        self.shape_for_reader(doc, ctx);
    }

    pub fn fetch(
        &self,
        query: &VocabularyListQuery,
        ctx: &RequestContext,
    ) -> ServiceResult<Vec<Vocabulary>> {
        let mut docs = self.repo.list(query)?;
        self.on_fetched(&mut docs, ctx);
        Ok(docs)
    }

    pub fn fetch_one(&self, id: &str, ctx: &RequestContext) -> ServiceResult<Vocabulary> {
        let mut doc = self
            .repo
            .find_one(id)?
            .ok_or_else(|| VocabularyError::NotFound(id.to_string()))?;
        self.on_fetched_item(&mut doc, ctx);
        Ok(doc)
    }

    /// Items of vocabulary `id` selected by `query`, shaped as article refs.
    pub fn get_items(&self, id: &str, query: &ItemQuery) -> ServiceResult<Vec<SchemedItem>> {
        let vocabulary = self.repo.find_one(id)?;
        Ok(project_items(vocabulary.as_ref(), query))
    }

    /// Active items of the languages vocabulary.
    pub fn get_languages(&self) -> ServiceResult<Vec<SchemedItem>> {
        self.get_items(&self.config.languages_vocabulary, &ItemQuery::default())
    }

    /// Vocabularies backing custom article fields.
    pub fn get_extra_fields(&self) -> ServiceResult<Vec<Vocabulary>> {
        Ok(self.repo.list(&VocabularyListQuery {
            field_type: FieldTypeFilter::Present,
            ..VocabularyListQuery::default()
        })?)
    }

    /// Non-field vocabularies bound to a service configuration.
    pub fn get_custom_vocabularies(&self) -> ServiceResult<Vec<Vocabulary>> {
        Ok(self.repo.list(&VocabularyListQuery {
            field_type: FieldTypeFilter::Absent,
            has_service: Some(true),
            ..VocabularyListQuery::default()
        })?)
    }

    /// Service-bound vocabularies hidden from editors.
    pub fn get_forbidden_custom_vocabularies(&self) -> ServiceResult<Vec<Vocabulary>> {
        Ok(self.repo.list(&VocabularyListQuery {
            field_type: FieldTypeFilter::Absent,
            has_service: Some(true),
            selection_type: Some(SelectionType::DoNotShow),
            ..VocabularyListQuery::default()
        })?)
    }

    /// `field_options` of vocabulary `field`; empty when unset or missing.
    pub fn get_field_options(&self, field: &str) -> ServiceResult<Map<String, Value>> {
        Ok(self
            .repo
            .find_one(field)?
            .and_then(|vocabulary| vocabulary.field_options)
            .unwrap_or_default())
    }

    /// True when `item_name` (up to the first `--`) names a related-content
    /// field vocabulary.
    pub fn is_related_content(&self, item_name: &str) -> ServiceResult<bool> {
        let prefix = item_name.split("--").next().unwrap_or(item_name);
        let related = self.repo.list(&VocabularyListQuery {
            field_type: FieldTypeFilter::Equals(self.config.related_content_field_type.clone()),
            ..VocabularyListQuery::default()
        })?;
        Ok(related.iter().any(|vocabulary| vocabulary.id == prefix))
    }

    fn shape_for_reader(&self, doc: &mut Vocabulary, ctx: &RequestContext) {
        filter_inactive(doc);
        if ctx.language.is_some() {
            doc.items = localize_items(&doc.items, ctx.language.as_deref());
        }
        cast_items(doc, self.config.typed_schema(&doc.id));
    }

    fn notify(&self, event: &str, doc: &Vocabulary, ctx: &RequestContext) {
        self.notifier.publish(
            event,
            &VocabularyNotification {
                vocabulary: doc.display_name.clone(),
                user: ctx.user_id.clone(),
                vocabulary_id: doc.id.clone(),
            },
        );
    }
}
