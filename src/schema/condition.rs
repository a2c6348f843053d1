use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Default separator between acceptable values in a joined condition string.
pub const DEFAULT_SPLITTER: char = ',';

#[derive(Debug, Error)]
pub enum ConditionError {
    #[error("conditions must be a map of column header to joined values: {0}")]
    Shape(#[from] ron::error::SpannedError),
    #[error("condition header is empty")]
    EmptyHeader,
    #[error("condition on '{0}' has no acceptable values")]
    NoValues(String),
}

/// One column constraint: the column must equal any of `values`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub header: String,
    pub values: Vec<String>,
}

/// An ordered set of column constraints, ANDed across headers and ORed
/// within each header's values.
///
/// Headers are raw here; they are sanitized when a query is built. Values
/// are never sanitized, they are always bound as parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionGroup {
    conditions: Vec<Condition>,
}

impl ConditionGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or extend) the constraint on `header`.
    pub fn with<I, V>(mut self, header: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.push(header, values);
        self
    }

    fn push<I, V>(&mut self, header: &str, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let values = values.into_iter().map(Into::into);
        if let Some(existing) = self.conditions.iter_mut().find(|c| c.header == header) {
            existing.values.extend(values);
        } else {
            self.conditions.push(Condition {
                header: header.to_string(),
                values: values.collect(),
            });
        }
    }

    /// Build from `(header, "value1,value2")` pairs, splitting each value
    /// string on `splitter`. Values are kept verbatim (no trimming).
    pub fn from_joined<'a, I>(pairs: I, splitter: char) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut group = Self::new();
        for (header, joined) in pairs {
            group.push(header, joined.split(splitter));
        }
        group
    }

    /// Parse a RON map such as `{"type": "nickname,quip", "by": "Varric"}`.
    ///
    /// Anything that is not a string-to-string map is rejected.
    pub fn parse_ron(input: &str, splitter: char) -> Result<Self, ConditionError> {
        let raw: BTreeMap<String, String> = ron::from_str(input)?;
        let group = Self::from_joined(raw.iter().map(|(k, v)| (k.as_str(), v.as_str())), splitter);
        group.validate()?;
        Ok(group)
    }

    /// Structural checks that do not depend on the target table.
    pub fn validate(&self) -> Result<(), ConditionError> {
        for condition in &self.conditions {
            if condition.header.is_empty() {
                return Err(ConditionError::EmptyHeader);
            }
            if condition.values.is_empty() {
                return Err(ConditionError::NoValues(condition.header.clone()));
            }
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.conditions.iter()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}
