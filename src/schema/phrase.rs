use serde::{Deserialize, Serialize};

use super::category::CategoryTags;

/// Newtype wrapper for a phrase table's primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PhraseId(pub i64);

impl std::fmt::Display for PhraseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored phrase row: raw template text plus the category tags it answers to.
///
/// `line` is unparsed; rendering happens after selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhraseRecord {
    pub id: PhraseId,
    pub line: String,
    pub category_tags: CategoryTags,
}

impl PhraseRecord {
    /// Whether this record answers to any of `wanted`.
    pub fn matches(&self, wanted: &CategoryTags) -> bool {
        self.category_tags.intersects(wanted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_matches_on_tag_intersection() {
        let record = PhraseRecord {
            id: PhraseId(4),
            line: "Hi %nick%!".to_string(),
            category_tags: CategoryTags::decode("3,6").unwrap(),
        };
        assert!(record.matches(&CategoryTags::decode("6,7").unwrap()));
        assert!(!record.matches(&CategoryTags::decode("9").unwrap()));
    }

    #[test]
    fn phrase_id_display() {
        assert_eq!(PhraseId(17).to_string(), "17");
    }
}
