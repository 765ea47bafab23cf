//! Rights metadata resolution for articles.

use crate::model::vocabulary::{value_to_text, Item};
use crate::repo::vocabulary_repo::VocabularyRepository;
use crate::service::error::ServiceResult;
use crate::service::locale::localize_items;
use crate::service::vocabulary_service::VocabularyService;
use serde::{Deserialize, Serialize};

const DEFAULT_RIGHTS_KEY: &str = "default";

/// Article fields that select rights metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRef {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub original_source: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

impl ArticleRef {
    /// `source`, else `original_source`, else `default`.
    pub fn rights_key(&self) -> &str {
        self.source
            .as_deref()
            .or(self.original_source.as_deref())
            .unwrap_or(DEFAULT_RIGHTS_KEY)
    }
}

/// Copyright and usage terms attached to an article.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RightsInfo {
    pub copyrightholder: Option<String>,
    pub copyrightnotice: Option<String>,
    pub usageterms: Option<String>,
}

impl RightsInfo {
    pub fn is_empty(&self) -> bool {
        self.copyrightholder.is_none() && self.copyrightnotice.is_none() && self.usageterms.is_none()
    }

    fn from_item(item: &Item) -> Self {
        let text = |field: &str| {
            item.field(field)
                .filter(|value| !value.is_null())
                .map(|value| value_to_text(&value))
        };
        Self {
            copyrightholder: text("copyrightHolder"),
            copyrightnotice: text("copyrightNotice"),
            usageterms: text("usageTerms"),
        }
    }
}

impl<R: VocabularyRepository> VocabularyService<R> {
    /// Resolves rights metadata for `article` in its language.
    ///
    /// Falls back to the item named `default`; empty when neither exists.
    pub fn get_rightsinfo(&self, article: &ArticleRef) -> ServiceResult<RightsInfo> {
        let Some(vocabulary) = self.repo().find_one(&self.config().rightsinfo_vocabulary)? else {
            return Ok(RightsInfo::default());
        };
        if vocabulary.items.is_empty() {
            return Ok(RightsInfo::default());
        }

        let items = localize_items(&vocabulary.items, article.language.as_deref());
        let named = |name: &str| {
            items
                .iter()
                .find(|item| item.name.as_deref() == Some(name))
        };

        Ok(named(article.rights_key())
            .or_else(|| named(DEFAULT_RIGHTS_KEY))
            .map(RightsInfo::from_item)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::ArticleRef;

    #[test]
    fn rights_key_prefers_source_then_original_source() {
        let article = ArticleRef {
            source: Some("AAP".to_string()),
            original_source: Some("Reuters".to_string()),
            language: None,
        };
        assert_eq!(article.rights_key(), "AAP");

        let forwarded = ArticleRef {
            original_source: Some("Reuters".to_string()),
            ..ArticleRef::default()
        };
        assert_eq!(forwarded.rights_key(), "Reuters");
        assert_eq!(ArticleRef::default().rights_key(), "default");
    }
}
