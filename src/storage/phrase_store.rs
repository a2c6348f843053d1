//! Read access to phrase tables.
//!
//! Every operation opens its own short-lived, read-only connection. Table and
//! column names pass through [`clean_identifier`] before they reach SQL text;
//! condition values are always bound parameters.

use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::RngCore;
use rusqlite::types::ValueRef;
use rusqlite::{params_from_iter, Connection, ErrorCode, OpenFlags, OptionalExtension};
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::config::PhraseSource;
use crate::schema::category::CategoryTags;
use crate::schema::condition::{ConditionError, ConditionGroup};
use crate::schema::phrase::{PhraseId, PhraseRecord};
use crate::storage::sanitize::clean_identifier;

/// Primary key column every phrase-like table carries.
pub const ID_COLUMN: &str = "id";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("query failed ({statement}): {source}")]
    Query {
        statement: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("malformed conditions: {0}")]
    MalformedConditions(#[from] ConditionError),
    #[error("identifier '{0}' contains no usable characters")]
    InvalidIdentifier(String),
    #[error("database unavailable ({statement}): {source}")]
    Unavailable {
        statement: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("could not open database: {0}")]
    Connection(#[source] rusqlite::Error),
}

impl StoreError {
    /// Wrap a failed statement. A busy, locked or unopenable database is
    /// `Unavailable`; anything else is a broken `Query`.
    pub fn from_query(statement: &str, source: rusqlite::Error) -> Self {
        let transient = matches!(
            &source,
            rusqlite::Error::SqliteFailure(e, _)
                if matches!(
                    e.code,
                    ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked | ErrorCode::CannotOpen
                )
        );
        let statement = statement.trim().to_string();
        if transient {
            Self::Unavailable { statement, source }
        } else {
            Self::Query { statement, source }
        }
    }

    /// Schema and argument defects are fatal; failing to reach the database
    /// is not.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Connection(_) | Self::Unavailable { .. })
    }
}

/// Storage capability the selector and facade are written against.
pub trait PhraseStore {
    /// Up to `limit` values of `header` in `table`; `None` or `Some(0)`
    /// reads them all. NULLs read as empty text.
    fn get_column(
        &self,
        header: &str,
        table: &str,
        limit: Option<usize>,
    ) -> Result<Vec<String>, StoreError>;

    /// Point lookup by primary key. A missing row is `Ok(None)`.
    fn get_field(&self, id: PhraseId, header: &str, table: &str)
        -> Result<Option<String>, StoreError>;

    /// Ids of rows satisfying `conditions`, or every id when there are none.
    fn get_ids(
        &self,
        table: &str,
        conditions: Option<&ConditionGroup>,
    ) -> Result<Vec<PhraseId>, StoreError>;

    /// Full records (id, line, decoded tags) from `source`. Rows whose tags
    /// do not decode are skipped.
    fn get_records(
        &self,
        source: &PhraseSource,
        conditions: Option<&ConditionGroup>,
    ) -> Result<Vec<PhraseRecord>, StoreError>;

    /// One uniformly chosen value of `header` among rows matching
    /// `conditions`. No match is `Ok(None)`.
    fn random_line(
        &self,
        header: &str,
        table: &str,
        conditions: Option<&ConditionGroup>,
        rng: &mut dyn RngCore,
    ) -> Result<Option<String>, StoreError> {
        let ids = self.get_ids(table, conditions)?;
        match ids.choose(rng) {
            Some(id) => self.get_field(*id, header, table),
            None => Ok(None),
        }
    }
}

/// SQLite-backed [`PhraseStore`].
#[derive(Debug, Clone)]
pub struct SqlitePhraseStore {
    path: PathBuf,
}

impl SqlitePhraseStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(StoreError::Connection)
    }
}

impl PhraseStore for SqlitePhraseStore {
    fn get_column(
        &self,
        header: &str,
        table: &str,
        limit: Option<usize>,
    ) -> Result<Vec<String>, StoreError> {
        let header = identifier(header)?;
        let table = identifier(table)?;
        let conn = self.connect()?;

        let mut statement = format!("SELECT {header} FROM {table}");
        let mut params: Vec<i64> = Vec::new();
        if let Some(limit) = limit.filter(|&limit| limit > 0) {
            statement.push_str(" LIMIT ?");
            params.push(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        debug!("get_column(): {}", statement);

        let mut stmt = conn.prepare(&statement).map_err(query_err(&statement))?;
        let rows = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                Ok(value_to_string(row.get_ref(0)?).unwrap_or_default())
            })
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(query_err(&statement))?;
        Ok(rows)
    }

    fn get_field(
        &self,
        id: PhraseId,
        header: &str,
        table: &str,
    ) -> Result<Option<String>, StoreError> {
        let header = identifier(header)?;
        let table = identifier(table)?;
        let conn = self.connect()?;
        select_field(&conn, id, &header, &table)
    }

    fn get_ids(
        &self,
        table: &str,
        conditions: Option<&ConditionGroup>,
    ) -> Result<Vec<PhraseId>, StoreError> {
        let table = identifier(table)?;
        let conn = self.connect()?;
        select_ids(&conn, &table, conditions)
    }

    fn get_records(
        &self,
        source: &PhraseSource,
        conditions: Option<&ConditionGroup>,
    ) -> Result<Vec<PhraseRecord>, StoreError> {
        let table = identifier(&source.table)?;
        let line = identifier(&source.line_column)?;
        let tags = identifier(&source.tag_column)?;
        let (clause, params) = where_clause(conditions)?;
        let statement = format!("SELECT {ID_COLUMN}, {line}, {tags} FROM {table}{clause}");
        debug!(?params, "get_records(): {}", statement);

        let conn = self.connect()?;
        let mut stmt = conn.prepare(&statement).map_err(query_err(&statement))?;
        let raw_rows = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                Ok((
                    PhraseId(row.get(0)?),
                    value_to_string(row.get_ref(1)?).unwrap_or_default(),
                    value_to_string(row.get_ref(2)?).unwrap_or_default(),
                ))
            })
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(query_err(&statement))?;

        let records = raw_rows
            .into_iter()
            .filter_map(|(id, line, raw_tags)| match CategoryTags::decode(&raw_tags) {
                Ok(category_tags) => Some(PhraseRecord {
                    id,
                    line,
                    category_tags,
                }),
                Err(e) => {
                    warn!("get_records(): skipping row {} in '{}': {}", id, table, e);
                    None
                }
            })
            .collect();
        Ok(records)
    }

    /// Without conditions the row is picked by SQLite itself. With
    /// conditions, id enumeration and the field fetch share one read
    /// transaction, so the chosen id cannot vanish in between.
    fn random_line(
        &self,
        header: &str,
        table: &str,
        conditions: Option<&ConditionGroup>,
        rng: &mut dyn RngCore,
    ) -> Result<Option<String>, StoreError> {
        let header = identifier(header)?;
        let table = identifier(table)?;
        let mut conn = self.connect()?;

        let conditions = match conditions.filter(|c| !c.is_empty()) {
            Some(conditions) => conditions,
            None => {
                let statement = format!("SELECT {header} FROM {table} ORDER BY RANDOM() LIMIT 1");
                debug!("random_line(): {}", statement);
                let line = conn
                    .query_row(&statement, [], |row| {
                        Ok(value_to_string(row.get_ref(0)?))
                    })
                    .optional()
                    .map_err(query_err(&statement))?;
                return Ok(line.flatten());
            }
        };

        let tx = conn
            .transaction()
            .map_err(query_err("BEGIN DEFERRED"))?;
        let ids = select_ids(&tx, &table, Some(conditions))?;
        let Some(id) = ids.choose(rng) else {
            debug!("random_line(): no ids in '{}' match {:?}", table, conditions);
            return Ok(None);
        };
        select_field(&tx, *id, &header, &table)
    }
}

fn identifier(raw: &str) -> Result<String, StoreError> {
    let clean = clean_identifier(raw);
    if clean.is_empty() {
        return Err(StoreError::InvalidIdentifier(raw.to_string()));
    }
    Ok(clean)
}

fn query_err(statement: &str) -> impl FnOnce(rusqlite::Error) -> StoreError + '_ {
    move |source| StoreError::from_query(statement, source)
}

fn value_to_string(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

/// ` WHERE (h1 = ? OR h1 = ?) AND (h2 = ?)` plus its bound values, in order.
/// Empty for no (or empty) conditions.
fn where_clause(conditions: Option<&ConditionGroup>) -> Result<(String, Vec<String>), StoreError> {
    let Some(conditions) = conditions.filter(|c| !c.is_empty()) else {
        return Ok((String::new(), Vec::new()));
    };
    conditions.validate()?;

    let mut groups = Vec::with_capacity(conditions.len());
    let mut params = Vec::new();
    for condition in conditions.iter() {
        let header = identifier(&condition.header)?;
        let terms: Vec<String> = condition
            .values
            .iter()
            .map(|value| {
                params.push(value.clone());
                format!("{header} = ?")
            })
            .collect();
        groups.push(format!("({})", terms.join(" OR ")));
    }
    Ok((format!(" WHERE {}", groups.join(" AND ")), params))
}

/// `table` must already be clean.
fn select_ids(
    conn: &Connection,
    table: &str,
    conditions: Option<&ConditionGroup>,
) -> Result<Vec<PhraseId>, StoreError> {
    let (clause, params) = where_clause(conditions)?;
    let statement = format!("SELECT {ID_COLUMN} FROM {table}{clause}");
    debug!(?params, "get_ids(): {}", statement);

    let mut stmt = conn.prepare(&statement).map_err(query_err(&statement))?;
    let ids = stmt
        .query_map(params_from_iter(params.iter()), |row| row.get(0).map(PhraseId))
        .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
        .map_err(query_err(&statement))?;
    Ok(ids)
}

/// `header` and `table` must already be clean.
fn select_field(
    conn: &Connection,
    id: PhraseId,
    header: &str,
    table: &str,
) -> Result<Option<String>, StoreError> {
    let statement = format!("SELECT {header} FROM {table} WHERE {ID_COLUMN} = ?1");
    debug!("get_field(): {} [{}]", statement, id);

    let field = conn
        .query_row(&statement, [id.0], |row| Ok(value_to_string(row.get_ref(0)?)))
        .optional()
        .map_err(query_err(&statement))?;

    match field {
        Some(value) => Ok(value),
        None => {
            debug!("ID '{}' was not in table '{}'", id, table);
            Ok(None)
        }
    }
}
