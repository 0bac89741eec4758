/// Lazy, forward-only row cursors.
///
/// A [`RowCursor`] fetches rows from the store only as it is iterated, and applies
/// [`RowBounds`] on the way. It is single-pass: once exhausted or closed it yields
/// nothing more, and it cannot be restarted.
///
/// The cursor streams from a statement that may be shared with later calls over the same
/// SQL text in the same transaction. Running that SQL again (or ending the transaction)
/// invalidates the cursor, and its next fetch fails with
/// [`MapperError::CursorInvalidated`]. Exhaust or close a cursor before issuing the same
/// select again.
use crate::error::{MapperError, Result};
use crate::executor::{with_resource, SharedResource};
use crate::models::{Row, RowBounds};
use crate::store::RowSource;
use std::sync::Arc;
use tracing::debug;

pub struct RowCursor {
    sql: String,
    resource: Option<SharedResource>,
    generation: u64,
    source: Option<Box<dyn RowSource>>,
    columns: Arc<[String]>,
    bounds: RowBounds,
    /// Rows read from the store so far, skipped ones included.
    fetched: usize,
    /// Rows handed to the caller so far.
    delivered: usize,
    consumed: bool,
}

impl std::fmt::Debug for RowCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowCursor")
            .field("sql", &self.sql)
            .field("generation", &self.generation)
            .field("delivered", &self.delivered)
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

impl RowCursor {
    pub fn new(
        resource: SharedResource,
        generation: u64,
        source: Box<dyn RowSource>,
        sql: impl Into<String>,
        bounds: RowBounds,
    ) -> Self {
        RowCursor {
            sql: sql.into(),
            resource: Some(resource),
            generation,
            columns: source.columns(),
            source: Some(source),
            bounds,
            fetched: 0,
            delivered: 0,
            consumed: false,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn is_open(&self) -> bool {
        self.source.is_some()
    }

    /// Whether every row within the bounds has been read.
    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// Number of rows handed out so far.
    pub fn current_index(&self) -> usize {
        self.delivered
    }

    /// Stop reading and release the statement the rows came from, unless a later
    /// execution already took it over. Unread rows are never fetched.
    pub fn close(&mut self) {
        self.source = None;
        let Some(resource) = self.resource.take() else {
            return;
        };
        let generation = self.generation;
        let released = with_resource(&resource, "close cursor", |res| {
            if res.generation() == generation {
                res.release();
            }
            Ok(())
        });
        if let Err(e) = released {
            debug!(sql = %self.sql, error = %e, "could not release cursor statement");
        }
    }

    fn check_generation(&self) -> Result<()> {
        let Some(resource) = &self.resource else {
            return Ok(());
        };
        let current = with_resource(resource, "cursor generation", |res| {
            Ok((res.is_released(), res.generation()))
        })?;
        match current {
            (false, generation) if generation == self.generation => Ok(()),
            _ => Err(MapperError::CursorInvalidated {
                sql: self.sql.clone(),
            }),
        }
    }

    fn fetch(&mut self) -> Result<Option<Row>> {
        loop {
            if self.bounds.exhausted_at(self.fetched) {
                return Ok(None);
            }
            self.check_generation()?;
            let Some(source) = self.source.as_mut() else {
                return Ok(None);
            };
            let Some(row) = source.next_row()? else {
                return Ok(None);
            };
            self.fetched += 1;
            if self.fetched > self.bounds.offset {
                return Ok(Some(row));
            }
        }
    }
}

impl Iterator for RowCursor {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.is_open() {
            return None;
        }
        match self.fetch() {
            Ok(Some(row)) => {
                self.delivered += 1;
                Some(Ok(row))
            }
            Ok(None) => {
                self.consumed = true;
                self.close();
                None
            }
            Err(e) => {
                self.close();
                Some(Err(e))
            }
        }
    }
}
