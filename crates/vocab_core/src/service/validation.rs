//! Vocabulary validation engine.
//!
//! # Responsibility
//! - Interpret each vocabulary's data-driven schema against its items.
//! - Enforce references into other vocabularies.
//! - Enforce case-insensitive uniqueness of the unique field among active
//!   items, and keep custom ids clear of reserved system keys.
//!
//! # Invariants
//! - The first violation wins; errors are never aggregated.
//! - Each referenced vocabulary is read at most once per `validate` call.

use crate::model::system_keys::SystemKeys;
use crate::model::vocabulary::{
    is_empty_value, value_to_text, FieldRule, Item, ValidationError, Vocabulary, VocabularyId,
};
use crate::repo::vocabulary_repo::VocabularyRepository;
use crate::service::error::{ServiceResult, VocabularyError};
use log::debug;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

/// Validates candidate vocabularies against their own schema and the store.
pub struct VocabularyValidator<'a, R: VocabularyRepository> {
    repo: &'a R,
    system_keys: &'a SystemKeys,
}

impl<'a, R: VocabularyRepository> VocabularyValidator<'a, R> {
    pub fn new(repo: &'a R, system_keys: &'a SystemKeys) -> Self {
        Self { repo, system_keys }
    }

    /// Runs document-shape and item-rule checks.
    pub fn validate(&self, candidate: &Vocabulary) -> ServiceResult<()> {
        candidate.validate_shape()?;
        self.validate_items(candidate)
    }

    /// Checks every item against every compiled field rule.
    ///
    /// Items are visited in order, fields in schema declaration order.
    pub fn validate_items(&self, candidate: &Vocabulary) -> ServiceResult<()> {
        if candidate.schema.is_empty() || candidate.items.is_empty() {
            return Ok(());
        }

        let unique_field = candidate.unique_field.as_deref();
        let compiled: Vec<(&str, Vec<FieldRule>)> = candidate
            .schema
            .iter()
            .map(|(field, spec)| (field.as_str(), spec.rules(field, unique_field)))
            .collect();

        let mut references = ReferenceCache::default();
        for (item_index, item) in candidate.items.iter().enumerate() {
            for (field, rules) in &compiled {
                for rule in rules {
                    self.apply_rule(rule, field, item, item_index, &mut references)?;
                }
            }
        }

        debug!(
            "event=vocabulary_validate module=validation status=ok vocabulary_id={} items={} reference_lookups={}",
            candidate.id,
            candidate.items.len(),
            references.lookups
        );
        Ok(())
    }

    /// Rejects custom vocabularies whose id is a reserved system key.
    pub fn check_reserved_id(&self, candidate: &Vocabulary) -> ServiceResult<()> {
        if candidate.is_custom() && self.system_keys.contains(&candidate.id) {
            return Err(VocabularyError::ReservedIdConflict(candidate.id.clone()));
        }
        Ok(())
    }

    fn apply_rule(
        &self,
        rule: &FieldRule,
        field: &str,
        item: &Item,
        item_index: usize,
        references: &mut ReferenceCache,
    ) -> ServiceResult<()> {
        match rule {
            FieldRule::Required | FieldRule::UniqueField => {
                if !item.has_value(field) {
                    return Err(ValidationError::MissingRequiredField {
                        item_index,
                        field: field.to_string(),
                    }
                    .into());
                }
            }
            FieldRule::LinkReference {
                vocabulary,
                field: target_field,
            } => {
                let Some(value) = item.field(field).filter(|value| !is_empty_value(value)) else {
                    return Ok(());
                };
                let targets = references.resolve(self.repo, vocabulary)?;
                let found = targets
                    .iter()
                    .any(|target| target.field(target_field).as_ref() == Some(&value));
                if !found {
                    return Err(ValidationError::UnresolvedReference {
                        vocabulary: vocabulary.clone(),
                        field: field.to_string(),
                        value: value_to_text(&value),
                        item_index,
                    }
                    .into());
                }
            }
            // Coercion is applied on the read path only.
            FieldRule::TypedCoercion(_) => {}
        }
        Ok(())
    }
}

/// Checks uniqueness of `unique_field` among active items.
///
/// Values compare case-insensitively on their text form. An active item
/// without a value fails with `EmptyUniqueValue`.
pub fn check_uniqueness(items: &[Item], unique_field: &str) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for (item_index, item) in items.iter().enumerate() {
        if !item.is_active() {
            continue;
        }

        let Some(value) = item
            .field(unique_field)
            .filter(|value| !is_empty_value(value))
        else {
            return Err(ValidationError::EmptyUniqueValue {
                field: unique_field.to_string(),
                item_index,
            });
        };

        let text = value_to_text(&value);
        if !seen.insert(text.to_uppercase()) {
            return Err(ValidationError::DuplicateValue {
                field: unique_field.to_string(),
                value: text,
                item_index,
            });
        }
    }
    Ok(())
}

/// Items of referenced vocabularies, loaded lazily for one validation call.
#[derive(Default)]
struct ReferenceCache {
    items: HashMap<VocabularyId, Vec<Item>>,
    lookups: usize,
}

impl ReferenceCache {
    /// Returns the items of `vocabulary`; a missing vocabulary has none.
    fn resolve<R: VocabularyRepository>(
        &mut self,
        repo: &R,
        vocabulary: &str,
    ) -> ServiceResult<&[Item]> {
        let items = match self.items.entry(vocabulary.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                self.lookups += 1;
                let loaded = repo
                    .find_one(vocabulary)?
                    .map(|found| found.items)
                    .unwrap_or_default();
                entry.insert(loaded)
            }
        };
        Ok(items.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::check_uniqueness;
    use crate::model::vocabulary::{Item, ValidationError};
    use serde_json::json;

    fn item(raw: serde_json::Value) -> Item {
        serde_json::from_value(raw).expect("item should parse")
    }

    #[test]
    fn uniqueness_is_case_insensitive_among_active_items() {
        let items = vec![
            item(json!({"name": "Paris"})),
            item(json!({"name": "PARIS", "is_active": false})),
            item(json!({"name": "paris"})),
        ];
        let err = check_uniqueness(&items, "name").expect_err("duplicate should fail");
        assert_eq!(
            err,
            ValidationError::DuplicateValue {
                field: "name".to_string(),
                value: "paris".to_string(),
                item_index: 2,
            }
        );
    }

    #[test]
    fn inactive_duplicates_and_blank_inactive_values_are_ignored() {
        let items = vec![
            item(json!({"name": "Paris"})),
            item(json!({"name": "paris", "is_active": false})),
            item(json!({"is_active": false})),
        ];
        check_uniqueness(&items, "name").expect("inactive items should be skipped");
    }

    #[test]
    fn active_item_without_unique_value_is_rejected() {
        let items = vec![item(json!({"name": "Paris"})), item(json!({"qcode": "x"}))];
        let err = check_uniqueness(&items, "name").expect_err("blank value should fail");
        assert_eq!(err.item_index(), Some(1));
        assert_eq!(err.code(), "empty_unique_value");
    }

    #[test]
    fn numeric_values_compare_on_text_form() {
        let items = vec![item(json!({"rank": 1})), item(json!({"rank": "1"}))];
        assert!(matches!(
            check_uniqueness(&items, "rank"),
            Err(ValidationError::DuplicateValue { item_index: 1, .. })
        ));
    }
}
