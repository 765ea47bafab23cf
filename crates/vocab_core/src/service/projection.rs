//! Read-side projections over stored vocabularies.
//!
//! # Responsibility
//! - Select items for `get_items` lookups.
//! - Strip inactive items and cast typed fields for fetched documents.
//! - Shape items as article references (`scheme` attached).
//!
//! # Invariants
//! - A `qcode`/`name` lookup yields at most one item: the first match.
//! - Uncoercible values are left untouched.

use crate::model::vocabulary::{value_to_text, CoercionKind, FieldRule, Item, Vocabulary};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeMap;

/// Filters accepted by `get_items`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemQuery {
    /// Exact `qcode` match.
    pub qcode: Option<String>,
    /// `None` keeps both active and inactive items.
    pub is_active: Option<bool>,
    /// Case-insensitive full-string match, taken literally.
    pub name: Option<String>,
    /// Matches `name` against `translations.name.<lang>` instead.
    pub lang: Option<String>,
}

impl Default for ItemQuery {
    fn default() -> Self {
        Self {
            qcode: None,
            is_active: Some(true),
            name: None,
            lang: None,
        }
    }
}

impl ItemQuery {
    pub fn qcode(qcode: impl Into<String>) -> Self {
        Self {
            qcode: Some(qcode.into()),
            ..Self::default()
        }
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    pub fn any_state(mut self) -> Self {
        self.is_active = None;
        self
    }

    fn matches(&self, item: &Item) -> bool {
        if let Some(qcode) = self.qcode.as_deref() {
            if item.field_text("qcode").as_deref() != Some(qcode) {
                return false;
            }
        }
        if let Some(name) = self.name.as_deref() {
            let candidate = match self.lang.as_deref() {
                Some(lang) => item.translation("name", lang).map(value_to_text),
                None => item.field_text("name"),
            };
            if !candidate.is_some_and(|value| value.to_lowercase() == name.to_lowercase()) {
                return false;
            }
        }
        true
    }
}

/// Item as referenced from an article: no `is_active`, plus its scheme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemedItem {
    #[serde(flatten)]
    pub item: Item,
    pub scheme: String,
}

/// Projects the items of `vocabulary` selected by `query`.
///
/// A missing vocabulary or one without items yields nothing.
pub fn project_items(vocabulary: Option<&Vocabulary>, query: &ItemQuery) -> Vec<SchemedItem> {
    let Some(vocabulary) = vocabulary else {
        return Vec::new();
    };

    let selected: Vec<&Item> = if query.qcode.is_some() || query.name.is_some() {
        vocabulary
            .items
            .iter()
            .find(|item| query.matches(item))
            .into_iter()
            .collect()
    } else {
        vocabulary.items.iter().collect()
    };

    selected
        .into_iter()
        .filter(|item| query.is_active.map_or(true, |wanted| item.is_active() == wanted))
        .map(|item| to_article_item(item, &vocabulary.id))
        .collect()
}

/// Drops `is_active` from `item` and attaches `scheme`.
pub fn to_article_item(item: &Item, scheme: &str) -> SchemedItem {
    let mut item = item.clone();
    item.is_active = None;
    SchemedItem {
        item,
        scheme: scheme.to_string(),
    }
}

/// Removes inactive items and the `is_active` key from the remaining ones.
pub fn filter_inactive(vocabulary: &mut Vocabulary) {
    vocabulary.items.retain(Item::is_active);
    for item in &mut vocabulary.items {
        item.is_active = None;
    }
}

/// Casts item fields to their declared types.
///
/// Types come from the vocabulary's own schema `type` declarations, then
/// from `registered`, which wins on conflicts.
pub fn cast_items(
    vocabulary: &mut Vocabulary,
    registered: Option<&BTreeMap<String, CoercionKind>>,
) {
    let mut kinds: BTreeMap<String, CoercionKind> = vocabulary
        .schema
        .iter()
        .filter_map(|(field, spec)| {
            spec.rules(field, None).into_iter().find_map(|rule| match rule {
                FieldRule::TypedCoercion(kind) => Some((field.clone(), kind)),
                _ => None,
            })
        })
        .collect();
    if let Some(registered) = registered {
        kinds.extend(registered.iter().map(|(field, kind)| (field.clone(), *kind)));
    }
    if kinds.is_empty() {
        return;
    }

    for item in &mut vocabulary.items {
        for (field, kind) in &kinds {
            let Some(raw) = item.field(field) else {
                continue;
            };
            if let Some(cast) = coerce_value(&raw, *kind) {
                item.set_field(field, cast);
            }
        }
    }
}

/// Converts `value` to `kind`; `None` when no lossless conversion exists.
pub fn coerce_value(value: &Value, kind: CoercionKind) -> Option<Value> {
    match kind {
        CoercionKind::Integer => match value {
            Value::Number(number) if number.is_i64() || number.is_u64() => Some(value.clone()),
            Value::Number(number) => number
                .as_f64()
                .filter(|float| float.fract() == 0.0 && float.abs() < i64::MAX as f64)
                .map(|float| Value::from(float as i64)),
            Value::String(text) => text.trim().parse::<i64>().ok().map(Value::from),
            _ => None,
        },
        CoercionKind::Number => match value {
            Value::Number(_) => Some(value.clone()),
            Value::String(text) => text
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number),
            _ => None,
        },
        CoercionKind::Boolean => match value {
            Value::Bool(_) => Some(value.clone()),
            Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Some(Value::Bool(true)),
                "false" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            Value::Number(number) => match number.as_i64() {
                Some(0) => Some(Value::Bool(false)),
                Some(1) => Some(Value::Bool(true)),
                _ => None,
            },
            _ => None,
        },
        CoercionKind::String => match value {
            Value::String(_) => Some(value.clone()),
            Value::Number(number) => Some(Value::String(number.to_string())),
            Value::Bool(flag) => Some(Value::String(flag.to_string())),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{cast_items, coerce_value, filter_inactive, project_items, ItemQuery};
    use crate::model::vocabulary::{CoercionKind, FieldSpec, Vocabulary, VocabularyType};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn vocabulary(id: &str, items: serde_json::Value) -> Vocabulary {
        let mut vocabulary = Vocabulary::new(id, id, VocabularyType::Manageable);
        vocabulary.items = serde_json::from_value(items).expect("items should parse");
        vocabulary
    }

    #[test]
    fn name_lookup_returns_first_case_insensitive_match_only() {
        let genre = vocabulary(
            "genre",
            json!([
                {"name": "Feature", "qcode": "f1"},
                {"name": "FEATURE", "qcode": "f2"},
                {"name": "Opinion", "qcode": "o"}
            ]),
        );
        let found = project_items(Some(&genre), &ItemQuery::name("feature"));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].item.qcode.as_deref(), Some("f1"));
        assert_eq!(found[0].scheme, "genre");
    }

    #[test]
    fn name_lookup_is_literal_not_a_pattern() {
        let genre = vocabulary("genre", json!([{"name": "Feature"}]));
        assert!(project_items(Some(&genre), &ItemQuery::name("Feat.*")).is_empty());
    }

    #[test]
    fn lang_lookup_uses_translated_name() {
        let genre = vocabulary(
            "genre",
            json!([{"name": "Feature", "translations": {"name": {"fr": "Reportage"}}}]),
        );
        let query = ItemQuery::name("reportage").with_lang("fr");
        assert_eq!(project_items(Some(&genre), &query).len(), 1);
        assert!(project_items(Some(&genre), &ItemQuery::name("feature").with_lang("fr")).is_empty());
    }

    #[test]
    fn first_match_is_filtered_by_state_afterwards() {
        let genre = vocabulary(
            "genre",
            json!([
                {"name": "Feature", "qcode": "x", "is_active": false},
                {"name": "Feature 2", "qcode": "x"}
            ]),
        );
        assert!(project_items(Some(&genre), &ItemQuery::qcode("x")).is_empty());
        assert_eq!(
            project_items(Some(&genre), &ItemQuery::qcode("x").any_state()).len(),
            1
        );
    }

    #[test]
    fn filter_inactive_drops_items_and_state_key() {
        let mut genre = vocabulary(
            "genre",
            json!([
                {"name": "A", "is_active": true},
                {"name": "B", "is_active": false},
                {"name": "C"}
            ]),
        );
        filter_inactive(&mut genre);
        assert_eq!(genre.items.len(), 2);
        assert!(genre.items.iter().all(|item| item.is_active.is_none()));
    }

    #[test]
    fn cast_items_uses_registry_and_schema_types() {
        let mut crops = vocabulary(
            "crop_sizes",
            json!([{"name": "4-3", "width": "800", "height": 600.0, "ratio": "1.5"}]),
        );
        crops.schema.insert(
            "ratio".to_string(),
            FieldSpec {
                value_type: Some("number".to_string()),
                ..FieldSpec::default()
            },
        );
        let registry = BTreeMap::from([
            ("width".to_string(), CoercionKind::Integer),
            ("height".to_string(), CoercionKind::Integer),
        ]);

        cast_items(&mut crops, Some(&registry));
        let item = &crops.items[0];
        assert_eq!(item.extra.get("width"), Some(&json!(800)));
        assert_eq!(item.extra.get("height"), Some(&json!(600)));
        assert_eq!(item.extra.get("ratio"), Some(&json!(1.5)));
    }

    #[test]
    fn schema_integer_type_casts_qcode() {
        let mut urgency = vocabulary("urgency", json!([{"name": "One", "qcode": "1"}]));
        urgency.schema.insert(
            "qcode".to_string(),
            FieldSpec {
                value_type: Some("integer".to_string()),
                ..FieldSpec::default()
            },
        );

        cast_items(&mut urgency, None);
        assert_eq!(
            serde_json::to_value(&urgency.items[0]).expect("item should encode"),
            json!({"name": "One", "qcode": 1})
        );
        assert_eq!(project_items(Some(&urgency), &ItemQuery::qcode("1")).len(), 1);
    }

    #[test]
    fn uncoercible_values_are_left_alone() {
        assert_eq!(coerce_value(&json!("wide"), CoercionKind::Integer), None);
        assert_eq!(coerce_value(&json!(2.5), CoercionKind::Integer), None);
        assert_eq!(
            coerce_value(&json!("0"), CoercionKind::Boolean),
            Some(json!(false))
        );
        assert_eq!(
            coerce_value(&json!(7), CoercionKind::String),
            Some(json!("7"))
        );
    }
}
