/// Data structures shared across the execution core
///
/// Rows as the store hands them back, hashable map keys extracted from rows, pagination
/// bounds, and the small enums selected through configuration.
use libsql::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// One result row: column names shared across the result set plus this row's values.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Row { columns, values }
    }

    /// Build a standalone row from `(column, value)` pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let (columns, values): (Vec<String>, Vec<Value>) =
            pairs.into_iter().map(|(c, v)| (c.into(), v)).unzip();
        Row {
            columns: columns.into(),
            values,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Look up a column by name. Exact matches win over case-insensitive ones.
    pub fn get(&self, column: &str) -> Option<&Value> {
        let idx = self
            .columns
            .iter()
            .position(|c| c == column)
            .or_else(|| {
                self.columns
                    .iter()
                    .position(|c| c.eq_ignore_ascii_case(column))
            })?;
        self.values.get(idx)
    }

    pub fn get_index(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// Hashable projection of a [`Value`], used as the key of map-shaped results and
/// inside cache keys.
///
/// Reals are keyed by their bit pattern, so `0.0` and `-0.0` are distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapKey {
    Null,
    Integer(i64),
    Real(u64),
    Text(String),
    Blob(Vec<u8>),
}

impl From<&Value> for MapKey {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => MapKey::Null,
            Value::Integer(i) => MapKey::Integer(*i),
            Value::Real(r) => MapKey::Real(r.to_bits()),
            Value::Text(s) => MapKey::Text(s.clone()),
            Value::Blob(b) => MapKey::Blob(b.clone()),
        }
    }
}

impl From<i64> for MapKey {
    fn from(value: i64) -> Self {
        MapKey::Integer(value)
    }
}

impl From<&str> for MapKey {
    fn from(value: &str) -> Self {
        MapKey::Text(value.to_string())
    }
}

impl From<String> for MapKey {
    fn from(value: String) -> Self {
        MapKey::Text(value)
    }
}

impl MapKey {
    pub fn to_value(&self) -> Value {
        match self {
            MapKey::Null => Value::Null,
            MapKey::Integer(i) => Value::Integer(*i),
            MapKey::Real(bits) => Value::Real(f64::from_bits(*bits)),
            MapKey::Text(s) => Value::Text(s.clone()),
            MapKey::Blob(b) => Value::Blob(b.clone()),
        }
    }
}

/// Map-shaped select result keyed by one column of each row.
pub type RowMap = HashMap<MapKey, Row>;

/// Pagination bounds applied while reading rows: skip `offset`, then keep at most `limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowBounds {
    pub offset: usize,
    pub limit: Option<usize>,
}

impl RowBounds {
    pub const DEFAULT: RowBounds = RowBounds {
        offset: 0,
        limit: None,
    };

    pub fn new(offset: usize, limit: usize) -> Self {
        RowBounds {
            offset,
            limit: Some(limit),
        }
    }

    pub fn is_default(&self) -> bool {
        *self == Self::DEFAULT
    }

    /// Whether the row at position `idx` of the raw stream is past the limit.
    pub fn exhausted_at(&self, idx: usize) -> bool {
        self.limit
            .is_some_and(|limit| idx >= self.offset.saturating_add(limit))
    }
}

impl Default for RowBounds {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Callback receiving the rows of a select one at a time, in row order.
pub trait ResultHandler {
    fn handle_row(&mut self, row: Row);
}

impl<F: FnMut(Row)> ResultHandler for F {
    fn handle_row(&mut self, row: Row) {
        self(row);
    }
}

/// Which statement-handling strategy a session's executor uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorType {
    /// Reuse one prepared statement per distinct SQL text within a transaction.
    #[default]
    Reuse,
    /// Queue mutations and run them on flush.
    Batch,
}

/// Connection mode enumeration
///
/// Determines how the data source is established and what capabilities are available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Local SQLite database file
    Local,
    /// Direct connection to remote LibSQL/Turso server
    Remote,
    /// Local replica with remote sync
    RemoteReplica,
}
