/// Deployment configuration: template delimiters, placeholder tokens,
/// category tags and the phrase table layout.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::schema::category::{Category, CategoryTag, CategoryTags};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// An opening/closing tag pair for a case-transform region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagPair {
    pub open: String,
    pub close: String,
}

impl TagPair {
    pub fn new(open: &str, close: &str) -> Self {
        Self {
            open: open.to_string(),
            close: close.to_string(),
        }
    }
}

/// Structural characters and tags of the template language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Delimiters {
    pub escape: char,
    pub choose_open: char,
    pub choose_close: char,
    pub choose_split: char,
    pub omit_open: char,
    pub omit_close: char,
    pub upper: TagPair,
    pub lower: TagPair,
    pub sentence: TagPair,
    pub start: TagPair,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            escape: '\\',
            choose_open: '<',
            choose_close: '>',
            choose_split: '|',
            omit_open: '{',
            omit_close: '}',
            upper: TagPair::new("[upper]", "[/upper]"),
            lower: TagPair::new("[lower]", "[/lower]"),
            sentence: TagPair::new("[sencase]", "[/sencase]"),
            start: TagPair::new("[startcase]", "[/startcase]"),
        }
    }
}

impl Delimiters {
    /// Single-character delimiters must be distinct; tags must be non-empty,
    /// distinct, and must not begin with any single-character delimiter
    /// (the parser would take that character first).
    pub fn validate(&self) -> Result<(), ConfigError> {
        let chars = [
            self.escape,
            self.choose_open,
            self.choose_close,
            self.choose_split,
            self.omit_open,
            self.omit_close,
        ];
        for (i, a) in chars.iter().enumerate() {
            if chars[i + 1..].contains(a) {
                return Err(ConfigError::Invalid(format!(
                    "delimiter '{}' is used more than once",
                    a
                )));
            }
        }

        let tags = [
            &self.upper.open,
            &self.upper.close,
            &self.lower.open,
            &self.lower.close,
            &self.sentence.open,
            &self.sentence.close,
            &self.start.open,
            &self.start.close,
        ];
        for (i, tag) in tags.iter().enumerate() {
            if tag.is_empty() {
                return Err(ConfigError::Invalid("case tag is empty".to_string()));
            }
            if let Some(c) = chars.iter().find(|c| tag.starts_with(**c)) {
                return Err(ConfigError::Invalid(format!(
                    "case tag '{}' starts with the delimiter '{}'",
                    tag, c
                )));
            }
            if tags[i + 1..].contains(tag) {
                return Err(ConfigError::Invalid(format!(
                    "case tag '{}' is used more than once",
                    tag
                )));
            }
        }
        Ok(())
    }
}

/// Literal placeholder tokens recognized during substitution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaceholderTokens {
    pub bot_display_name: String,
    pub bot_name: String,
    pub channel_name: String,
    pub display_name: String,
    pub mention: String,
    pub server_name: String,
    pub user_name: String,
    pub action: String,
}

impl Default for PlaceholderTokens {
    fn default() -> Self {
        Self {
            bot_display_name: "%botnick%".to_string(),
            bot_name: "%bot%".to_string(),
            channel_name: "%channel%".to_string(),
            display_name: "%nick%".to_string(),
            mention: "%mention%".to_string(),
            server_name: "%server%".to_string(),
            user_name: "%name%".to_string(),
            action: "[ACT]".to_string(),
        }
    }
}

/// Where phrase lines live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhraseSource {
    pub table: String,
    pub line_column: String,
    pub tag_column: String,
}

impl Default for PhraseSource {
    fn default() -> Self {
        Self {
            table: "phrases".to_string(),
            line_column: "line".to_string(),
            tag_column: "category_id".to_string(),
        }
    }
}

/// Top-level engine configuration. Every section falls back to its default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub delimiters: Delimiters,
    pub placeholders: PlaceholderTokens,
    pub categories: FxHashMap<String, CategoryTags>,
    pub source: PhraseSource,
    /// Drawn from without category filtering when a category matches nothing.
    pub fallback: Option<PhraseSource>,
    /// Substituted for the action token when the context has no marker.
    pub default_action_marker: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            delimiters: Delimiters::default(),
            placeholders: PlaceholderTokens::default(),
            categories: default_categories(),
            source: PhraseSource::default(),
            fallback: None,
            default_action_marker: "/me".to_string(),
        }
    }
}

fn default_categories() -> FxHashMap<String, CategoryTags> {
    let table: [(Category, &[u16]); 5] = [
        (Category::Greeting, &[3]),
        (Category::MemberLeft, &[5]),
        (Category::Mention, &[6, 7]),
        (Category::WentOnline, &[8]),
        (Category::Shutdown, &[9]),
    ];

    let mut categories = FxHashMap::default();
    for (category, tags) in table {
        let tags = tags.iter().filter_map(|t| CategoryTag::new(*t).ok());
        if let Ok(tags) = CategoryTags::new(tags) {
            categories.insert(category.name().to_string(), tags);
        }
    }
    categories
}

impl EngineConfig {
    /// Load a configuration from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<EngineConfig, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config = Self::parse_ron(&contents)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Parse a configuration from a RON string.
    pub fn parse_ron(input: &str) -> Result<EngineConfig, ConfigError> {
        let config: EngineConfig = ron::from_str(input)?;
        config.delimiters.validate()?;
        Ok(config)
    }

    /// Tags configured for `category`, if any.
    pub fn tags_for(&self, category: &Category) -> Option<&CategoryTags> {
        self.categories.get(category.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_categories_present() {
        let config = EngineConfig::default();
        assert_eq!(config.tags_for(&Category::Greeting).unwrap().encode(), "3");
        assert_eq!(config.tags_for(&Category::Mention).unwrap().encode(), "6,7");
        assert_eq!(config.tags_for(&Category::Shutdown).unwrap().encode(), "9");
        assert!(config
            .tags_for(&Category::Custom("unknown".to_string()))
            .is_none());
    }

    #[test]
    fn default_delimiters_valid() {
        assert!(Delimiters::default().validate().is_ok());
    }

    #[test]
    fn duplicate_delimiter_rejected() {
        let delimiters = Delimiters {
            omit_open: '<',
            ..Delimiters::default()
        };
        assert!(matches!(delimiters.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn empty_tag_rejected() {
        let delimiters = Delimiters {
            upper: TagPair::new("", "[/upper]"),
            ..Delimiters::default()
        };
        assert!(delimiters.validate().is_err());
    }

    #[test]
    fn tag_starting_with_delimiter_rejected() {
        let delimiters = Delimiters {
            upper: TagPair::new("<<U>>", "<</U>>"),
            ..Delimiters::default()
        };
        assert!(matches!(delimiters.validate(), Err(ConfigError::Invalid(_))));

        let escaped = Delimiters {
            lower: TagPair::new("\\lo", "\\/lo"),
            ..Delimiters::default()
        };
        assert!(escaped.validate().is_err());

        let result = EngineConfig::parse_ron(r#"(delimiters: (start: (open: "{s}", close: "{/s}")))"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn parse_partial_ron_keeps_defaults() {
        let config = EngineConfig::parse_ron(
            r#"(
                placeholders: (channel_name: "$chan$"),
                categories: { "birthday": [12, 13] },
            )"#,
        )
        .unwrap();
        assert_eq!(config.placeholders.channel_name, "$chan$");
        assert_eq!(config.placeholders.user_name, "%name%");
        assert_eq!(config.delimiters, Delimiters::default());
        assert_eq!(
            config
                .tags_for(&Category::Custom("birthday".to_string()))
                .unwrap()
                .encode(),
            "12,13"
        );
        // An explicit map replaces the defaults.
        assert!(config.tags_for(&Category::Greeting).is_none());
    }

    #[test]
    fn parse_ron_rejects_clashing_delimiters() {
        let result = EngineConfig::parse_ron(r#"(delimiters: (choose_split: '>'))"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}
