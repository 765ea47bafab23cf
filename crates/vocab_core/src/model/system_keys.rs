//! Reserved field names of the built-in article schema and editor.
//!
//! A custom vocabulary becomes an article field named after its id, so its
//! id must not shadow a built-in field.

use once_cell::sync::Lazy;
use std::collections::BTreeSet;

const DEFAULT_SCHEMA_KEYS: &[&str] = &[
    "slugline",
    "keywords",
    "genre",
    "anpa_take_key",
    "place",
    "priority",
    "urgency",
    "anpa_category",
    "subject",
    "company_codes",
    "ednote",
    "authors",
    "headline",
    "sms",
    "abstract",
    "byline",
    "dateline",
    "body_html",
    "footer",
    "body_footer",
    "sign_off",
    "feature_media",
    "media_description",
    "attachments",
    "language",
    "usageterms",
];

const DEFAULT_EDITOR_KEYS: &[&str] = &[
    "slugline",
    "keywords",
    "genre",
    "anpa_take_key",
    "place",
    "priority",
    "urgency",
    "anpa_category",
    "subject",
    "company_codes",
    "ednote",
    "authors",
    "headline",
    "sms",
    "abstract",
    "byline",
    "dateline",
    "body_html",
    "footer",
    "body_footer",
    "sign_off",
    "feature_media",
    "media_description",
    "attachments",
];

static BUILTIN_SYSTEM_KEYS: Lazy<SystemKeys> = Lazy::new(|| {
    SystemKeys::from_keys(
        DEFAULT_SCHEMA_KEYS
            .iter()
            .chain(DEFAULT_EDITOR_KEYS.iter())
            .copied(),
    )
});

/// Immutable set of reserved field names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SystemKeys {
    keys: BTreeSet<String>,
}

impl SystemKeys {
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Union of the default schema and default editor field names.
    ///
    /// Computed once per process.
    pub fn builtin() -> &'static SystemKeys {
        &BUILTIN_SYSTEM_KEYS
    }

    /// Returns a copy extended with deployment-specific keys.
    pub fn with_extra<I, S>(&self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut keys = self.keys.clone();
        keys.extend(extra.into_iter().map(Into::into));
        Self { keys }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::SystemKeys;

    #[test]
    fn builtin_keys_cover_schema_and_editor_fields() {
        let keys = SystemKeys::builtin();
        assert!(keys.contains("headline"));
        assert!(keys.contains("usageterms"));
        assert!(!keys.contains("crop_sizes"));
    }

    #[test]
    fn with_extra_does_not_touch_builtin_set() {
        let extended = SystemKeys::builtin().with_extra(["embargo"]);
        assert!(extended.contains("embargo"));
        assert!(!SystemKeys::builtin().contains("embargo"));
        assert_eq!(extended.len(), SystemKeys::builtin().len() + 1);
    }
}
