//! Engine configuration.
//!
//! # Responsibility
//! - Name the well-known vocabularies the engine reads and writes.
//! - Hold the typed-schema registry used for read-side coercion.
//! - Load overrides from JSON documents or `VOCAB_*` environment variables.
//!
//! # Invariants
//! - `EngineConfig::default()` matches the built-in newsroom setup.

use crate::logging::default_log_level;
use crate::model::vocabulary::CoercionKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const DEFAULT_KEYWORDS_VOCABULARY: &str = "keywords";
pub const DEFAULT_RIGHTSINFO_VOCABULARY: &str = "rightsinfo";
pub const DEFAULT_LANGUAGES_VOCABULARY: &str = "languages";
pub const DEFAULT_RELATED_CONTENT_FIELD_TYPE: &str = "related_content";

const ENV_KEYWORDS_VOCABULARY: &str = "VOCAB_KEYWORDS_CV";
const ENV_RIGHTSINFO_VOCABULARY: &str = "VOCAB_RIGHTSINFO_CV";
const ENV_LANGUAGES_VOCABULARY: &str = "VOCAB_LANGUAGES_CV";
const ENV_ADD_MISSING_ON_PUBLISH: &str = "VOCAB_KEYWORDS_ADD_MISSING_ON_PUBLISH";
const ENV_LOG_LEVEL: &str = "VOCAB_LOG_LEVEL";
const ENV_LOG_DIR: &str = "VOCAB_LOG_DIR";

/// Field name -> coercion target, per vocabulary id.
pub type TypedSchemaRegistry = BTreeMap<String, BTreeMap<String, CoercionKind>>;

/// Configuration loading error.
#[derive(Debug)]
pub enum ConfigError {
    InvalidValue { key: &'static str, value: String },
    Parse(serde_json::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value } => {
                write!(f, "invalid value `{value}` for `{key}`")
            }
            Self::Parse(err) => write!(f, "invalid engine config: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::InvalidValue { .. } => None,
        }
    }
}

/// Logging bootstrap settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of `trace|debug|info|warn|error`.
    pub level: String,
    /// Absolute directory for rolling log files; `None` leaves logging off.
    pub log_dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

/// Vocabulary engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Vocabulary grown by `add_missing_keywords`.
    pub keywords_vocabulary: String,
    /// Vocabulary holding copyright/usage terms per source.
    pub rightsinfo_vocabulary: String,
    pub languages_vocabulary: String,
    /// `field_type` marking related-content custom fields.
    pub related_content_field_type: String,
    /// Grow the keywords vocabulary when articles are published.
    pub add_missing_keywords_on_publish: bool,
    pub typed_schemas: TypedSchemaRegistry,
    /// Reserved ids on top of the built-in system keys.
    pub extra_system_keys: Vec<String>,
    pub logging: LoggingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            keywords_vocabulary: DEFAULT_KEYWORDS_VOCABULARY.to_string(),
            rightsinfo_vocabulary: DEFAULT_RIGHTSINFO_VOCABULARY.to_string(),
            languages_vocabulary: DEFAULT_LANGUAGES_VOCABULARY.to_string(),
            related_content_field_type: DEFAULT_RELATED_CONTENT_FIELD_TYPE.to_string(),
            add_missing_keywords_on_publish: false,
            typed_schemas: default_typed_schemas(),
            extra_system_keys: Vec::new(),
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parses a JSON config document; missing keys keep their defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(ConfigError::Parse)
    }

    /// Defaults overridden by `VOCAB_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by values from `lookup`.
    ///
    /// Blank values are ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(value) = read(ENV_KEYWORDS_VOCABULARY) {
            config.keywords_vocabulary = value;
        }
        if let Some(value) = read(ENV_RIGHTSINFO_VOCABULARY) {
            config.rightsinfo_vocabulary = value;
        }
        if let Some(value) = read(ENV_LANGUAGES_VOCABULARY) {
            config.languages_vocabulary = value;
        }
        if let Some(value) = read(ENV_ADD_MISSING_ON_PUBLISH) {
            config.add_missing_keywords_on_publish =
                parse_flag(&value).ok_or(ConfigError::InvalidValue {
                    key: ENV_ADD_MISSING_ON_PUBLISH,
                    value,
                })?;
        }
        if let Some(value) = read(ENV_LOG_LEVEL) {
            config.logging.level = value;
        }
        if let Some(value) = read(ENV_LOG_DIR) {
            config.logging.log_dir = Some(value);
        }

        Ok(config)
    }

    /// Returns the registered typed schema for a vocabulary.
    pub fn typed_schema(&self, vocabulary_id: &str) -> Option<&BTreeMap<String, CoercionKind>> {
        self.typed_schemas.get(vocabulary_id)
    }
}

fn default_typed_schemas() -> TypedSchemaRegistry {
    let crop_sizes = BTreeMap::from([
        ("width".to_string(), CoercionKind::Integer),
        ("height".to_string(), CoercionKind::Integer),
    ]);
    BTreeMap::from([("crop_sizes".to_string(), crop_sizes)])
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, EngineConfig};
    use crate::model::vocabulary::CoercionKind;
    use std::collections::HashMap;

    #[test]
    fn defaults_register_crop_size_dimensions() {
        let config = EngineConfig::default();
        let schema = config
            .typed_schema("crop_sizes")
            .expect("crop_sizes should be registered");
        assert_eq!(schema.get("width"), Some(&CoercionKind::Integer));
        assert!(config.typed_schema("genre").is_none());
        assert!(!config.add_missing_keywords_on_publish);
    }

    #[test]
    fn lookup_overrides_defaults_and_ignores_blank_values() {
        let env = HashMap::from([
            ("VOCAB_KEYWORDS_CV", "tags"),
            ("VOCAB_KEYWORDS_ADD_MISSING_ON_PUBLISH", "yes"),
            ("VOCAB_RIGHTSINFO_CV", "   "),
        ]);
        let config = EngineConfig::from_lookup(|key| env.get(key).map(|v| v.to_string()))
            .expect("lookup config should load");
        assert_eq!(config.keywords_vocabulary, "tags");
        assert!(config.add_missing_keywords_on_publish);
        assert_eq!(config.rightsinfo_vocabulary, "rightsinfo");
    }

    #[test]
    fn lookup_rejects_unparseable_flag() {
        let err = EngineConfig::from_lookup(|key| {
            (key == "VOCAB_KEYWORDS_ADD_MISSING_ON_PUBLISH").then(|| "maybe".to_string())
        })
        .expect_err("flag should be rejected");
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn json_config_keeps_defaults_for_missing_keys() {
        let config = EngineConfig::from_json_str(
            r#"{"languages_vocabulary": "locales", "extra_system_keys": ["embargo"]}"#,
        )
        .expect("json config should parse");
        assert_eq!(config.languages_vocabulary, "locales");
        assert_eq!(config.keywords_vocabulary, "keywords");
        assert_eq!(config.extra_system_keys, vec!["embargo".to_string()]);
    }
}
