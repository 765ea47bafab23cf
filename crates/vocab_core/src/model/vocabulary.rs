//! Vocabulary domain model.
//!
//! # Responsibility
//! - Define the persisted vocabulary document and its free-form items.
//! - Compile data-driven field declarations into typed `FieldRule`s.
//! - Provide merge/soft-delete helpers used by lifecycle hooks.
//!
//! # Invariants
//! - `id` matches `^[a-zA-Z0-9-_]+$` and never changes after creation.
//! - `is_deleted` is the source of truth for tombstone state.
//! - An item without `is_active` is active.
//!
//! # See also
//! - docs/architecture/vocabularies.md

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable vocabulary key, e.g. `languages` or `crop_sizes`.
pub type VocabularyId = String;

/// Per-field, per-language alternate values: `field -> language -> value`.
pub type ItemTranslations = BTreeMap<String, BTreeMap<String, Value>>;

/// Data-driven schema: field name -> declaration, in declaration order.
pub type VocabularySchema = IndexMap<String, FieldSpec>;

/// Maximum length accepted for `helper_text`.
pub const HELPER_TEXT_MAX_CHARS: usize = 120;

static VOCABULARY_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9\-_]+$").expect("valid vocabulary id regex"));

/// Who maintains the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VocabularyType {
    /// Editor-maintained list.
    Manageable,
    /// System list, read-only for editors.
    Unmanageable,
}

impl VocabularyType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manageable => "manageable",
            Self::Unmanageable => "unmanageable",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "manageable" => Some(Self::Manageable),
            "unmanageable" => Some(Self::Unmanageable),
            _ => None,
        }
    }
}

/// How editors pick values from the vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionType {
    #[serde(rename = "single selection")]
    SingleSelection,
    #[serde(rename = "multi selection")]
    MultiSelection,
    /// Hidden from editors.
    #[serde(rename = "do not show")]
    DoNotShow,
}

impl SelectionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SingleSelection => "single selection",
            Self::MultiSelection => "multi selection",
            Self::DoNotShow => "do not show",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "single selection" => Some(Self::SingleSelection),
            "multi selection" => Some(Self::MultiSelection),
            "do not show" => Some(Self::DoNotShow),
            _ => None,
        }
    }
}

/// Target type for read-side value coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoercionKind {
    Integer,
    Number,
    Boolean,
    String,
}

impl CoercionKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "integer" | "int" => Some(Self::Integer),
            "number" | "float" => Some(Self::Number),
            "boolean" | "bool" => Some(Self::Boolean),
            "string" => Some(Self::String),
            _ => None,
        }
    }
}

/// One interpreted rule for a schema field, compiled from `FieldSpec`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldRule {
    /// Every item must carry a non-empty value.
    Required,
    /// Field is the vocabulary's `unique_field`; presence is enforced like
    /// `Required` and active values must be distinct.
    UniqueField,
    /// Present values must exist as `field` in some item of `vocabulary`.
    LinkReference { vocabulary: VocabularyId, field: String },
    /// Values are cast to `kind` on the read path.
    TypedCoercion(CoercionKind),
}

/// Stored declaration for one schema field. Unknown keys are kept.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_vocab: Option<VocabularyId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_field: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FieldSpec {
    pub fn required() -> Self {
        Self {
            required: true,
            ..Self::default()
        }
    }

    pub fn link(vocabulary: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            link_vocab: Some(vocabulary.into()),
            link_field: Some(field.into()),
            ..Self::default()
        }
    }

    /// Compiles this declaration into rules for `field_name`.
    ///
    /// Presence rules come first so a missing value is reported before any
    /// reference lookup happens.
    pub fn rules(&self, field_name: &str, unique_field: Option<&str>) -> Vec<FieldRule> {
        let mut rules = Vec::new();
        if self.required {
            rules.push(FieldRule::Required);
        }
        if unique_field == Some(field_name) {
            rules.push(FieldRule::UniqueField);
        }
        if let (Some(vocabulary), Some(field)) = (&self.link_vocab, &self.link_field) {
            rules.push(FieldRule::LinkReference {
                vocabulary: vocabulary.clone(),
                field: field.clone(),
            });
        }
        if let Some(kind) = self.value_type.as_deref().and_then(CoercionKind::parse) {
            rules.push(FieldRule::TypedCoercion(kind));
        }
        rules
    }
}

/// One vocabulary entry.
///
/// `name`, `qcode`, `is_active` and `translations` are typed when their
/// stored value has the expected JSON type; any other value stays in `extra`
/// under the same key. Fields are addressed through `field`/`set_field`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct Item {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translations: Option<ItemTranslations>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<Map<String, Value>> for Item {
    fn from(extra: Map<String, Value>) -> Self {
        let mut item = Self {
            extra,
            ..Self::default()
        };
        for field in ["name", "qcode", "translations"] {
            if let Some(value) = item.extra.remove(field) {
                item.set_field(field, value);
            }
        }
        if item.extra.get("is_active").is_some_and(Value::is_boolean) {
            if let Some(value) = item.extra.remove("is_active") {
                item.set_field("is_active", value);
            }
        }
        item
    }
}

impl Item {
    /// Creates an active item whose `name` and `qcode` are both `value`.
    pub fn named(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            name: Some(value.clone()),
            qcode: Some(value),
            is_active: Some(true),
            ..Self::default()
        }
    }

    /// Absent `is_active` counts as active.
    pub fn is_active(&self) -> bool {
        self.is_active != Some(false)
    }

    /// Returns a field value by name, typed fields included.
    pub fn field(&self, field: &str) -> Option<Value> {
        let typed = match field {
            "name" => self.name.clone().map(Value::String),
            "qcode" => self.qcode.clone().map(Value::String),
            "is_active" => self.is_active.map(Value::Bool),
            "translations" => self
                .translations
                .as_ref()
                .and_then(|value| serde_json::to_value(value).ok()),
            _ => None,
        };
        typed.or_else(|| self.extra.get(field).cloned())
    }

    /// Returns the field rendered as text, see `value_to_text`.
    pub fn field_text(&self, field: &str) -> Option<String> {
        self.field(field).map(|value| value_to_text(&value))
    }

    /// Returns whether the field carries a non-empty value.
    pub fn has_value(&self, field: &str) -> bool {
        self.field(field).is_some_and(|value| !is_empty_value(&value))
    }

    /// Sets a field value by name, typed fields included.
    ///
    /// A `name`/`qcode`/`translations` value of another JSON type is kept
    /// as is in `extra`. `Null` clears the field. A non-bool `is_active`
    /// leaves the item state unchanged.
    pub fn set_field(&mut self, field: &str, value: Value) {
        match field {
            "name" => self.name = text_or_extra(&mut self.extra, field, value),
            "qcode" => self.qcode = text_or_extra(&mut self.extra, field, value),
            "is_active" => {
                if value.is_null() || value.is_boolean() {
                    self.extra.remove(field);
                    self.is_active = value.as_bool();
                }
            }
            "translations" => {
                self.extra.remove(field);
                self.translations = match value {
                    Value::Null => None,
                    other => match serde_json::from_value(other.clone()) {
                        Ok(translations) => Some(translations),
                        Err(_) => {
                            self.extra.insert(field.to_string(), other);
                            None
                        }
                    },
                };
            }
            other => {
                self.extra.insert(other.to_string(), value);
            }
        }
    }

    /// Returns the translated value for `field` in `language`, if any.
    pub fn translation(&self, field: &str, language: &str) -> Option<&Value> {
        self.translations.as_ref()?.get(field)?.get(language)
    }
}

/// Display-name translations for the vocabulary itself.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VocabularyTranslations {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub display_name: BTreeMap<String, String>,
}

/// Free-text tag attached to a vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyTag {
    pub text: String,
}

/// Relative date preset offered by date-typed custom fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateShortcut {
    pub value: i64,
    pub term: String,
    pub label: String,
}

/// Canonical persisted vocabulary document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    /// Serialized as `_id` to match stored document naming.
    #[serde(rename = "_id")]
    pub id: VocabularyId,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helper_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<VocabularyTag>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popup_width: Option<i64>,
    #[serde(rename = "type")]
    pub kind: VocabularyType,
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_type: Option<SelectionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependent: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<BTreeMap<String, i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_field: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub schema: VocabularySchema,
    /// Presence marks a custom (deletable) vocabulary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_options: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init_version: Option<i64>,
    #[serde(
        rename = "preffered_items",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub preferred_items: Option<bool>,
    #[serde(default)]
    pub disable_entire_category_selection: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_shortcuts: Option<Vec<DateShortcut>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_field_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_field_config: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translations: Option<VocabularyTranslations>,
    /// Soft delete tombstone; blocks id reuse.
    #[serde(rename = "_deleted", default, skip_serializing_if = "is_false")]
    pub is_deleted: bool,
    /// Unix epoch milliseconds.
    #[serde(rename = "_created", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    /// Unix epoch milliseconds.
    #[serde(rename = "_updated", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl Vocabulary {
    /// Creates an empty vocabulary with only the required fields set.
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        kind: VocabularyType,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            description: None,
            helper_text: None,
            tags: None,
            popup_width: None,
            kind,
            items: Vec::new(),
            selection_type: None,
            read_only: None,
            schema_field: None,
            dependent: None,
            service: None,
            priority: None,
            unique_field: None,
            schema: VocabularySchema::new(),
            field_type: None,
            field_options: None,
            init_version: None,
            preferred_items: None,
            disable_entire_category_selection: false,
            date_shortcuts: None,
            custom_field_type: None,
            custom_field_config: None,
            translations: None,
            is_deleted: false,
            created_at: None,
            updated_at: None,
        }
    }

    /// Custom vocabularies carry `field_type` and may be deleted.
    pub fn is_custom(&self) -> bool {
        self.field_type.is_some()
    }

    /// Uses `qcode` as unique field when the schema declares it and no
    /// unique field is set.
    pub fn apply_unique_field_default(&mut self) {
        if self.unique_field.is_none() && self.schema.contains_key("qcode") {
            self.unique_field = Some("qcode".to_string());
        }
    }

    /// Overlays every field present in `update`.
    pub fn apply_update(&mut self, update: &VocabularyUpdate) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(value) = value {
                *target = value.clone();
            }
        }
        fn set_opt<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                target.clone_from(value);
            }
        }

        set(&mut self.display_name, &update.display_name);
        set_opt(&mut self.description, &update.description);
        set_opt(&mut self.helper_text, &update.helper_text);
        set_opt(&mut self.tags, &update.tags);
        set_opt(&mut self.popup_width, &update.popup_width);
        set(&mut self.kind, &update.kind);
        set(&mut self.items, &update.items);
        set_opt(&mut self.selection_type, &update.selection_type);
        set_opt(&mut self.read_only, &update.read_only);
        set_opt(&mut self.schema_field, &update.schema_field);
        set_opt(&mut self.dependent, &update.dependent);
        set_opt(&mut self.service, &update.service);
        set_opt(&mut self.priority, &update.priority);
        set_opt(&mut self.unique_field, &update.unique_field);
        set(&mut self.schema, &update.schema);
        set_opt(&mut self.field_type, &update.field_type);
        set_opt(&mut self.field_options, &update.field_options);
        set_opt(&mut self.init_version, &update.init_version);
        set_opt(&mut self.preferred_items, &update.preferred_items);
        set(
            &mut self.disable_entire_category_selection,
            &update.disable_entire_category_selection,
        );
        set_opt(&mut self.date_shortcuts, &update.date_shortcuts);
        set_opt(&mut self.custom_field_type, &update.custom_field_type);
        set_opt(&mut self.custom_field_config, &update.custom_field_config);
        set_opt(&mut self.translations, &update.translations);
    }

    /// Validates document-level invariants that need no other vocabulary.
    ///
    /// Item rules are checked by the validation engine, which may need store
    /// lookups.
    pub fn validate_shape(&self) -> Result<(), ValidationError> {
        if !is_valid_vocabulary_id(&self.id) {
            return Err(ValidationError::InvalidId(self.id.clone()));
        }
        if let Some(helper_text) = self.helper_text.as_deref() {
            let length = helper_text.chars().count();
            if length > HELPER_TEXT_MAX_CHARS {
                return Err(ValidationError::HelperTextTooLong {
                    length,
                    max: HELPER_TEXT_MAX_CHARS,
                });
            }
        }
        Ok(())
    }

    /// Marks this vocabulary as softly deleted (tombstoned).
    pub fn soft_delete(&mut self) {
        self.is_deleted = true;
    }
}

/// Partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabularyUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub helper_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<VocabularyTag>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub popup_width: Option<i64>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<VocabularyType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<Item>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection_type: Option<SelectionType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependent: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<BTreeMap<String, i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<VocabularySchema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_options: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub init_version: Option<i64>,
    #[serde(rename = "preffered_items", skip_serializing_if = "Option::is_none")]
    pub preferred_items: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_entire_category_selection: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_shortcuts: Option<Vec<DateShortcut>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_field_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_field_config: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translations: Option<VocabularyTranslations>,
}

impl VocabularyUpdate {
    /// Update that replaces the whole item list.
    pub fn items(items: Vec<Item>) -> Self {
        Self {
            items: Some(items),
            ..Self::default()
        }
    }

    pub fn touches_items(&self) -> bool {
        self.items.is_some()
    }
}

/// Field/item-addressed validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    InvalidId(String),
    HelperTextTooLong {
        length: usize,
        max: usize,
    },
    MissingRequiredField {
        item_index: usize,
        field: String,
    },
    UnresolvedReference {
        vocabulary: VocabularyId,
        field: String,
        value: String,
        item_index: usize,
    },
    DuplicateValue {
        field: String,
        value: String,
        item_index: usize,
    },
    EmptyUniqueValue {
        field: String,
        item_index: usize,
    },
}

impl ValidationError {
    /// Stable machine-readable code for error payloads.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidId(_) => "invalid_id",
            Self::HelperTextTooLong { .. } => "helper_text_too_long",
            Self::MissingRequiredField { .. } => "required_field",
            Self::UnresolvedReference { .. } => "unresolved_reference",
            Self::DuplicateValue { .. } => "duplicate_value",
            Self::EmptyUniqueValue { .. } => "empty_unique_value",
        }
    }

    /// Index of the failing item, when the error is item-addressed.
    pub fn item_index(&self) -> Option<usize> {
        match self {
            Self::MissingRequiredField { item_index, .. }
            | Self::UnresolvedReference { item_index, .. }
            | Self::DuplicateValue { item_index, .. }
            | Self::EmptyUniqueValue { item_index, .. } => Some(*item_index),
            Self::InvalidId(_) | Self::HelperTextTooLong { .. } => None,
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidId(id) => write!(
                f,
                "vocabulary id `{id}` must match ^[a-zA-Z0-9-_]+$"
            ),
            Self::HelperTextTooLong { length, max } => {
                write!(f, "helper_text has {length} characters; max is {max}")
            }
            Self::MissingRequiredField { item_index, field } => {
                write!(f, "Required {field} in item {item_index}")
            }
            Self::UnresolvedReference {
                vocabulary,
                field,
                value,
                item_index,
            } => write!(
                f,
                "{vocabulary} \"{field}={value}\" not found (item {item_index})"
            ),
            Self::DuplicateValue {
                field,
                value,
                item_index,
            } => write!(
                f,
                "Value {value} for field {field} is not unique (item {item_index})"
            ),
            Self::EmptyUniqueValue { field, item_index } => {
                write!(f, "{field} cannot be empty (item {item_index})")
            }
        }
    }
}

impl Error for ValidationError {}

/// Returns whether `id` is an acceptable vocabulary key.
pub fn is_valid_vocabulary_id(id: &str) -> bool {
    VOCABULARY_ID_RE.is_match(id)
}

/// `Null`, empty strings and empty containers count as missing.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Array(values) => values.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Plain-text rendering: strings unquoted, everything else as JSON.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn text_or_extra(extra: &mut Map<String, Value>, field: &str, value: Value) -> Option<String> {
    extra.remove(field);
    match value {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => {
            extra.insert(field.to_string(), other);
            None
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[cfg(test)]
mod tests {
    use super::{
        is_empty_value, CoercionKind, FieldRule, FieldSpec, Item, ValidationError, Vocabulary,
        VocabularyType, VocabularyUpdate,
    };
    use serde_json::json;

    #[test]
    fn item_keeps_unknown_keys_through_serde() {
        let raw = json!({
            "name": "Paris",
            "qcode": "paris",
            "country": "FR",
            "translations": {"name": {"de": "Paris"}}
        });
        let item: Item = serde_json::from_value(raw.clone()).expect("item should parse");
        assert_eq!(item.extra.get("country"), Some(&json!("FR")));
        assert!(item.is_active());
        assert_eq!(serde_json::to_value(&item).expect("item should encode"), raw);
    }

    #[test]
    fn non_string_qcode_round_trips_through_extra() {
        let raw = json!({"name": "1", "qcode": 1});
        let item: Item = serde_json::from_value(raw.clone()).expect("item should parse");
        assert_eq!(item.qcode, None);
        assert_eq!(item.field("qcode"), Some(json!(1)));
        assert_eq!(item.field_text("qcode").as_deref(), Some("1"));
        assert_eq!(serde_json::to_value(&item).expect("item should encode"), raw);
    }

    #[test]
    fn set_field_keeps_value_types() {
        let mut item = Item::named("1");
        item.set_field("qcode", json!(1));
        assert_eq!(item.qcode, None);
        assert_eq!(item.field("qcode"), Some(json!(1)));

        item.set_field("qcode", json!("one"));
        assert_eq!(item.qcode.as_deref(), Some("one"));
        assert!(!item.extra.contains_key("qcode"));
    }

    #[test]
    fn non_bool_is_active_leaves_state_unchanged() {
        let mut item = Item::named("Retired");
        item.set_field("is_active", json!(false));
        item.set_field("is_active", json!("yes"));
        assert_eq!(item.is_active, Some(false));
        assert!(!item.is_active());
    }

    #[test]
    fn field_spec_compiles_rules_in_stable_order() {
        let mut spec = FieldSpec::link("countries", "qcode");
        spec.required = true;
        spec.value_type = Some("integer".to_string());

        let rules = spec.rules("country", Some("country"));
        assert_eq!(
            rules,
            vec![
                FieldRule::Required,
                FieldRule::UniqueField,
                FieldRule::LinkReference {
                    vocabulary: "countries".to_string(),
                    field: "qcode".to_string(),
                },
                FieldRule::TypedCoercion(CoercionKind::Integer),
            ]
        );
        assert!(FieldSpec::default().rules("name", None).is_empty());
    }

    #[test]
    fn vocabulary_document_uses_stored_field_names() {
        let raw = json!({
            "_id": "genre",
            "display_name": "Genre",
            "type": "manageable",
            "selection_type": "do not show",
            "preffered_items": true,
            "schema": {"name": {"required": true}, "qcode": {}},
            "items": [{"name": "Feature", "qcode": "feature"}],
            "_deleted": true
        });
        let vocabulary: Vocabulary = serde_json::from_value(raw).expect("vocabulary should parse");
        assert_eq!(vocabulary.id, "genre");
        assert_eq!(vocabulary.preferred_items, Some(true));
        assert!(vocabulary.is_deleted);
        let fields: Vec<&str> = vocabulary.schema.keys().map(String::as_str).collect();
        assert_eq!(fields, vec!["name", "qcode"]);
    }

    #[test]
    fn unique_field_defaults_to_qcode_only_when_declared() {
        let mut with_qcode = Vocabulary::new("genre", "Genre", VocabularyType::Manageable);
        with_qcode
            .schema
            .insert("qcode".to_string(), FieldSpec::default());
        with_qcode.apply_unique_field_default();
        assert_eq!(with_qcode.unique_field.as_deref(), Some("qcode"));

        let mut explicit = with_qcode.clone();
        explicit.unique_field = Some("name".to_string());
        explicit.apply_unique_field_default();
        assert_eq!(explicit.unique_field.as_deref(), Some("name"));

        let mut without = Vocabulary::new("urgency", "Urgency", VocabularyType::Manageable);
        without.apply_unique_field_default();
        assert!(without.unique_field.is_none());
    }

    #[test]
    fn apply_update_only_overwrites_present_fields() {
        let mut vocabulary = Vocabulary::new("genre", "Genre", VocabularyType::Manageable);
        vocabulary.description = Some("kept".to_string());
        let update = VocabularyUpdate {
            display_name: Some("Genres".to_string()),
            items: Some(vec![Item::named("Feature")]),
            ..VocabularyUpdate::default()
        };

        vocabulary.apply_update(&update);
        assert_eq!(vocabulary.display_name, "Genres");
        assert_eq!(vocabulary.description.as_deref(), Some("kept"));
        assert_eq!(vocabulary.items.len(), 1);
    }

    #[test]
    fn validate_shape_rejects_bad_id_and_long_helper_text() {
        let bad_id = Vocabulary::new("has space", "Bad", VocabularyType::Manageable);
        assert!(matches!(
            bad_id.validate_shape(),
            Err(ValidationError::InvalidId(_))
        ));

        let mut long_help = Vocabulary::new("ok-id_1", "Ok", VocabularyType::Manageable);
        long_help.helper_text = Some("x".repeat(121));
        assert!(matches!(
            long_help.validate_shape(),
            Err(ValidationError::HelperTextTooLong { length: 121, .. })
        ));
    }

    #[test]
    fn empty_values_follow_presence_rules() {
        assert!(is_empty_value(&json!(null)));
        assert!(is_empty_value(&json!("")));
        assert!(is_empty_value(&json!([])));
        assert!(!is_empty_value(&json!(0)));
        assert!(!is_empty_value(&json!(false)));
    }
}
