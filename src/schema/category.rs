use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    #[error("category tag set is empty")]
    Empty,
    #[error("invalid category tag '{0}': expected an integer >= 1")]
    Invalid(String),
}

/// A single numeric category tag. Always `>= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct CategoryTag(u16);

impl CategoryTag {
    pub fn new(value: u16) -> Result<Self, TagError> {
        if value == 0 {
            return Err(TagError::Invalid(value.to_string()));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u16 {
        self.0
    }
}

impl TryFrom<u16> for CategoryTag {
    type Error = TagError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CategoryTag> for u16 {
    fn from(tag: CategoryTag) -> u16 {
        tag.0
    }
}

/// A non-empty set of category tags.
///
/// Stored as a comma-joined string (`"6,7"`); `encode`/`decode` are only
/// meant to be called at the storage boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<CategoryTag>", into = "Vec<CategoryTag>")]
pub struct CategoryTags(BTreeSet<CategoryTag>);

impl CategoryTags {
    pub fn new(tags: impl IntoIterator<Item = CategoryTag>) -> Result<Self, TagError> {
        let set: BTreeSet<CategoryTag> = tags.into_iter().collect();
        if set.is_empty() {
            return Err(TagError::Empty);
        }
        Ok(Self(set))
    }

    /// Parse the stored comma-joined form. Whitespace around each tag is ignored.
    pub fn decode(raw: &str) -> Result<Self, TagError> {
        let mut set = BTreeSet::new();
        for part in raw.split(',') {
            let part = part.trim();
            let value: u16 = part
                .parse()
                .map_err(|_| TagError::Invalid(part.to_string()))?;
            set.insert(CategoryTag::new(value)?);
        }
        Self::new(set)
    }

    /// The stored comma-joined form, tags in ascending order.
    pub fn encode(&self) -> String {
        self.0
            .iter()
            .map(|t| t.0.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn contains(&self, tag: CategoryTag) -> bool {
        self.0.contains(&tag)
    }

    pub fn intersects(&self, other: &CategoryTags) -> bool {
        self.0.iter().any(|t| other.0.contains(t))
    }

    pub fn iter(&self) -> impl Iterator<Item = CategoryTag> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Vec<CategoryTag>> for CategoryTags {
    type Error = TagError;

    fn try_from(tags: Vec<CategoryTag>) -> Result<Self, Self::Error> {
        Self::new(tags)
    }
}

impl From<CategoryTags> for Vec<CategoryTag> {
    fn from(tags: CategoryTags) -> Vec<CategoryTag> {
        tags.0.into_iter().collect()
    }
}

/// A named conversational event that maps to one or more category tags.
///
/// The tag mapping itself lives in configuration; `Custom` names are looked
/// up there like the built-in ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Greeting,
    MemberLeft,
    Mention,
    WentOnline,
    Shutdown,
    Custom(String),
}

impl Category {
    /// The configuration key for this category.
    pub fn name(&self) -> &str {
        match self {
            Self::Greeting => "greeting",
            Self::MemberLeft => "member-left",
            Self::Mention => "mention",
            Self::WentOnline => "went-online",
            Self::Shutdown => "shutdown",
            Self::Custom(name) => name,
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "greeting" => Self::Greeting,
            "member-left" => Self::MemberLeft,
            "mention" => Self::Mention,
            "went-online" => Self::WentOnline,
            "shutdown" => Self::Shutdown,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
