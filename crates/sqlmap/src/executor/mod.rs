/// Statement executors
///
/// An executor runs mapped statements on behalf of one session and owns that session's
/// transaction. Three strategies are provided:
///
/// - [`ReuseExecutor`]: keeps one prepared statement per distinct SQL text for the
///   lifetime of the store transaction
/// - [`BatchExecutor`]: queues mutations and runs them on flush
/// - [`CachingExecutor`]: decorates either of the above with the namespace result caches
///
/// Executors are used by exactly one session and are not meant for concurrent use.
pub mod batch;
pub mod caching;
pub mod reuse;

pub use batch::BatchExecutor;
pub use caching::{CachingExecutor, TransactionalCache, TransactionalCacheManager};
pub use reuse::ReuseExecutor;

use crate::cursor::RowCursor;
use crate::error::{MapperError, Result};
use crate::mapping::{MappedStatement, ParameterObject};
use crate::models::{ResultHandler, Row, RowBounds};
use crate::store::{Connection, RowSource, StatementHandle, Transaction};
use crate::utils;
use libsql::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

/// Outcome of one flushed batch: every parameter set run against one SQL text.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    pub statement_id: String,
    pub sql: String,
    pub parameter_sets: Vec<Vec<Value>>,
    pub update_counts: Vec<u64>,
}

/// Statement bookkeeping counters, mostly useful in tests and logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutorStats {
    /// Statements prepared against the store.
    pub prepared: u64,
    /// Executions served by an already prepared statement.
    pub reused: u64,
    /// Statements currently held open by the executor.
    pub cached_statements: usize,
}

pub trait Executor: Send {
    /// Run a mutation. Returns the affected row count, or
    /// [`BATCH_UPDATE_RETURN_VALUE`](crate::constants::BATCH_UPDATE_RETURN_VALUE) when
    /// the mutation was only queued.
    fn update(&mut self, ms: &MappedStatement, parameter: &ParameterObject) -> Result<i64>;

    /// Run a select. With a handler every row goes to the handler and the returned
    /// list is empty.
    fn query(
        &mut self,
        ms: &MappedStatement,
        parameter: &ParameterObject,
        bounds: RowBounds,
        handler: Option<&mut dyn ResultHandler>,
    ) -> Result<Vec<Row>>;

    /// Run a select and return a lazy cursor over its rows.
    fn query_cursor(
        &mut self,
        ms: &MappedStatement,
        parameter: &ParameterObject,
        bounds: RowBounds,
    ) -> Result<RowCursor>;

    /// Execute queued work and release held statements.
    fn flush_statements(&mut self) -> Result<Vec<BatchResult>>;

    fn commit(&mut self, required: bool) -> Result<()>;

    fn rollback(&mut self, required: bool) -> Result<()>;

    /// Roll back when `force_rollback`, then close the transaction.
    fn close(&mut self, force_rollback: bool) -> Result<()>;

    fn is_closed(&self) -> bool;

    fn stats(&self) -> ExecutorStats;
}

/// A prepared statement shared between an executor and the cursors it handed out.
///
/// Every execution bumps `generation`; a cursor remembers the generation it was opened
/// at and refuses to fetch once the statement has moved on or was released.
pub struct PreparedResource {
    handle: Box<dyn StatementHandle>,
    generation: u64,
    released: bool,
}

pub type SharedResource = Arc<Mutex<PreparedResource>>;

impl PreparedResource {
    pub fn new(handle: Box<dyn StatementHandle>) -> Self {
        PreparedResource {
            handle,
            generation: 0,
            released: false,
        }
    }

    pub fn shared(handle: Box<dyn StatementHandle>) -> SharedResource {
        Arc::new(Mutex::new(Self::new(handle)))
    }

    pub fn sql(&self) -> &str {
        self.handle.sql()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Usable for another execution: not released and its connection is alive.
    pub fn is_reusable(&self) -> bool {
        !self.released && self.handle.is_connection_alive()
    }

    pub fn handle_mut(&mut self) -> &mut dyn StatementHandle {
        self.handle.as_mut()
    }

    fn ensure_live(&self) -> Result<()> {
        if self.released {
            return Err(MapperError::executor(format!(
                "statement '{}' was already released",
                self.handle.sql()
            )));
        }
        Ok(())
    }

    pub fn execute_update(&mut self) -> Result<u64> {
        self.ensure_live()?;
        self.generation += 1;
        self.handle.execute_update()
    }

    /// Execute the query, returning the row stream and the generation it belongs to.
    pub fn execute_query(&mut self) -> Result<(Box<dyn RowSource>, u64)> {
        self.ensure_live()?;
        self.generation += 1;
        let source = self.handle.execute_query()?;
        Ok((source, self.generation))
    }

    pub fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.handle.close();
        }
    }
}

/// State every executor strategy shares: the transaction and the closed flag.
pub struct ExecutorCore {
    transaction: Box<dyn Transaction>,
    default_timeout: Option<Duration>,
    closed: bool,
}

impl ExecutorCore {
    pub fn new(transaction: Box<dyn Transaction>, default_timeout: Option<Duration>) -> Self {
        ExecutorCore {
            transaction,
            default_timeout,
            closed: false,
        }
    }

    pub fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(MapperError::executor("executor was closed"));
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn connection(&mut self) -> Result<Arc<dyn Connection>> {
        self.ensure_open()?;
        self.transaction.connection()
    }

    /// The transaction's remaining time, if it has a deadline.
    pub fn transaction_timeout(&self) -> Option<Duration> {
        self.transaction.timeout()
    }

    /// The statement's own timeout, else the configured default.
    pub fn statement_timeout(&self, ms: &MappedStatement) -> Option<Duration> {
        ms.timeout().or(self.default_timeout)
    }

    pub fn commit(&mut self, required: bool) -> Result<()> {
        if self.closed {
            return Err(MapperError::executor(
                "cannot commit, transaction is already closed",
            ));
        }
        if required {
            self.transaction.commit()?;
        }
        Ok(())
    }

    pub fn rollback(&mut self, required: bool) -> Result<()> {
        if !self.closed && required {
            self.transaction.rollback()?;
        }
        Ok(())
    }

    /// Close the transaction. Further use of the executor fails.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.transaction.close()
    }
}

/// Common close sequence: roll back if asked, close the transaction, and report the
/// first failure after finishing both steps.
pub fn close_with(
    core: &mut ExecutorCore,
    force_rollback: bool,
    rollback: impl FnOnce(&mut ExecutorCore) -> Result<()>,
) -> Result<()> {
    if core.is_closed() {
        return Ok(());
    }
    let rolled_back = if force_rollback {
        rollback(core)
    } else {
        Ok(())
    };
    if let Err(e) = &rolled_back {
        warn!(error = %e, "unexpected exception on closing transaction");
    }
    let closed = core.close();
    debug!("executor closed");
    rolled_back.and(closed)
}

/// Drain `source`, skipping `bounds.offset` rows and stopping after `bounds.limit`.
///
/// With a handler the rows are handed over one by one and nothing is collected.
pub fn collect_rows(
    source: &mut dyn RowSource,
    bounds: RowBounds,
    mut handler: Option<&mut dyn ResultHandler>,
) -> Result<Vec<Row>> {
    let mut rows = Vec::new();
    let mut idx = 0usize;
    while !bounds.exhausted_at(idx) {
        let Some(row) = source.next_row()? else {
            break;
        };
        idx += 1;
        if idx <= bounds.offset {
            continue;
        }
        match handler.as_deref_mut() {
            Some(handler) => handler.handle_row(row),
            None => rows.push(row),
        }
    }
    Ok(rows)
}

/// Run `f` with the resource locked.
pub fn with_resource<T>(
    resource: &SharedResource,
    context: &str,
    f: impl FnOnce(&mut PreparedResource) -> Result<T>,
) -> Result<T> {
    let mut guard = utils::safe_lock_arc(resource, context)?;
    f(&mut guard)
}
