//! Keyword vocabulary maintenance.
//!
//! # Responsibility
//! - Grow the keywords vocabulary with keywords seen on articles.
//!
//! # Invariants
//! - Existing items are never removed, reordered or duplicated.
//! - Membership is case-insensitive; inserted keywords keep their case.
//! - Repeating a call with the same input changes nothing.

use crate::model::vocabulary::{FieldSpec, Item, Vocabulary, VocabularyType, VocabularyUpdate};
use crate::repo::vocabulary_repo::VocabularyRepository;
use crate::service::context::RequestContext;
use crate::service::error::ServiceResult;
use crate::service::vocabulary_service::VocabularyService;
use log::{debug, info};
use std::collections::HashSet;

const KEYWORDS_DISPLAY_NAME: &str = "Keywords";

impl<R: VocabularyRepository> VocabularyService<R> {
    /// Adds keywords missing from the keywords vocabulary.
    ///
    /// Creates the vocabulary on first use. Returns the keywords that were
    /// added, in input order.
    pub fn add_missing_keywords(
        &self,
        keywords: &[String],
        language: Option<&str>,
        ctx: &RequestContext,
    ) -> ServiceResult<Vec<String>> {
        let candidates = dedupe_keywords(keywords);
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let vocabulary_id = self.config().keywords_vocabulary.clone();
        debug!(
            "event=keywords_merge module=service status=start vocabulary_id={} candidates={} language={}",
            vocabulary_id,
            candidates.len(),
            language.unwrap_or("-")
        );

        let Some(existing) = self.repo().find_one(&vocabulary_id)? else {
            self.create(vec![keywords_vocabulary(&vocabulary_id, &candidates)], ctx)?;
            info!(
                "event=keywords_merge module=service status=created vocabulary_id={} added={}",
                vocabulary_id,
                candidates.len()
            );
            return Ok(candidates);
        };

        let known: HashSet<String> = existing
            .items
            .iter()
            .filter_map(|item| item.name.as_deref())
            .map(str::to_lowercase)
            .collect();
        let missing: Vec<String> = candidates
            .into_iter()
            .filter(|keyword| !known.contains(&keyword.to_lowercase()))
            .collect();
        if missing.is_empty() {
            return Ok(missing);
        }

        let mut items = existing.items.clone();
        items.extend(missing.iter().map(Item::named));
        let mut update = VocabularyUpdate::items(items);

        self.on_update(&mut update, &existing)?;
        let updated = self.system_update(&vocabulary_id, &update)?;
        self.on_updated(&updated, ctx);

        info!(
            "event=keywords_merge module=service status=ok vocabulary_id={} added={}",
            vocabulary_id,
            missing.len()
        );
        Ok(missing)
    }

    /// Publish-time hook; merges keywords only when enabled in config.
    pub fn on_article_published(
        &self,
        keywords: &[String],
        language: Option<&str>,
        ctx: &RequestContext,
    ) -> ServiceResult<Vec<String>> {
        if !self.config().add_missing_keywords_on_publish {
            return Ok(Vec::new());
        }
        self.add_missing_keywords(keywords, language, ctx)
    }
}

/// Trims, drops blanks and removes case-insensitive repeats (first wins).
fn dedupe_keywords(keywords: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    keywords
        .iter()
        .map(|keyword| keyword.trim())
        .filter(|keyword| !keyword.is_empty())
        .filter(|keyword| seen.insert(keyword.to_lowercase()))
        .map(str::to_string)
        .collect()
}

fn keywords_vocabulary(id: &str, keywords: &[String]) -> Vocabulary {
    let mut vocabulary = Vocabulary::new(id, KEYWORDS_DISPLAY_NAME, VocabularyType::Manageable);
    vocabulary.unique_field = Some("name".to_string());
    vocabulary
        .schema
        .insert("name".to_string(), FieldSpec::default());
    vocabulary
        .schema
        .insert("qcode".to_string(), FieldSpec::default());
    vocabulary.items = keywords.iter().map(Item::named).collect();
    vocabulary
}

#[cfg(test)]
mod tests {
    use super::{dedupe_keywords, keywords_vocabulary};

    #[test]
    fn dedupe_keeps_first_seen_case() {
        let input = vec![
            "Paris".to_string(),
            " paris ".to_string(),
            String::new(),
            "London".to_string(),
        ];
        assert_eq!(dedupe_keywords(&input), vec!["Paris", "London"]);
    }

    #[test]
    fn new_keywords_vocabulary_is_unique_by_name() {
        let vocabulary = keywords_vocabulary("keywords", &["Paris".to_string()]);
        assert_eq!(vocabulary.unique_field.as_deref(), Some("name"));
        assert_eq!(vocabulary.items[0].qcode.as_deref(), Some("Paris"));
        assert_eq!(vocabulary.items[0].is_active, Some(true));
        let fields: Vec<&str> = vocabulary.schema.keys().map(String::as_str).collect();
        assert_eq!(fields, vec!["name", "qcode"]);
    }
}
