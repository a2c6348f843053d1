/// Conditional random selection: turns joined header constraints or a
/// category's tag set into one uniformly chosen line.

use rand::seq::SliceRandom;
use rand::RngCore;
use tracing::debug;

use crate::core::config::PhraseSource;
use crate::schema::category::CategoryTags;
use crate::schema::condition::ConditionGroup;
use crate::schema::phrase::{PhraseId, PhraseRecord};
use crate::storage::phrase_store::{PhraseStore, StoreError};

/// Selection helpers over any [`PhraseStore`].
pub struct ConditionalSelector<'s> {
    store: &'s dyn PhraseStore,
}

impl<'s> ConditionalSelector<'s> {
    pub fn new(store: &'s dyn PhraseStore) -> Self {
        Self { store }
    }

    /// Ids matching `{header → "v1,v2"}` constraints split on `splitter`.
    ///
    /// ```text
    /// [("type", "nickname,quip"), ("by", "Varric")]
    ///   → (type = 'nickname' OR type = 'quip') AND by = 'Varric'
    /// ```
    pub fn matching_ids(
        &self,
        table: &str,
        conditions: &[(&str, &str)],
        splitter: char,
    ) -> Result<Vec<PhraseId>, StoreError> {
        let group = ConditionGroup::from_joined(conditions.iter().copied(), splitter);
        self.store.get_ids(table, Some(&group))
    }

    /// Uniform choice among `ids`.
    pub fn pick(ids: &[PhraseId], rng: &mut dyn RngCore) -> Option<PhraseId> {
        ids.choose(rng).copied()
    }

    /// A random `header` value among rows matching the joined constraints.
    pub fn random_line(
        &self,
        header: &str,
        table: &str,
        conditions: &[(&str, &str)],
        splitter: char,
        rng: &mut dyn RngCore,
    ) -> Result<Option<String>, StoreError> {
        let group = ConditionGroup::from_joined(conditions.iter().copied(), splitter);
        self.store.random_line(header, table, Some(&group), rng)
    }

    /// A random line from `source` whose tags intersect `tags`.
    ///
    /// Rows are read in one query with their tags decoded, so selection and
    /// resolution see the same snapshot.
    pub fn line_for_tags(
        &self,
        source: &PhraseSource,
        tags: &CategoryTags,
        rng: &mut dyn RngCore,
    ) -> Result<Option<String>, StoreError> {
        let records = self.store.get_records(source, None)?;
        let matching: Vec<&PhraseRecord> = records.iter().filter(|r| r.matches(tags)).collect();
        debug!(
            total = records.len(),
            matching = matching.len(),
            "line_for_tags(): tags {}",
            tags.encode()
        );
        Ok(matching.choose(rng).map(|record| record.line.clone()))
    }

    /// A random line from `source` with no filtering.
    pub fn any_line(
        &self,
        source: &PhraseSource,
        rng: &mut dyn RngCore,
    ) -> Result<Option<String>, StoreError> {
        self.store
            .random_line(&source.line_column, &source.table, None, rng)
    }
}
