/// Batch executor for LibSQL databases
///
/// Mutations are not run when issued. Consecutive mutations of the same statement with
/// the same SQL text are grouped into one batch that shares a prepared statement; a
/// different statement or text starts a new batch. `flush_statements` runs every batch in
/// order, one execution per queued parameter set, and reports a [`BatchResult`] per batch.
///
/// Any select flushes first, so it observes every queued mutation. Rolling back discards
/// the queue without running it.
use super::{
    close_with, collect_rows, BatchResult, Executor, ExecutorCore, ExecutorStats,
    PreparedResource,
};
use crate::constants::BATCH_UPDATE_RETURN_VALUE;
use crate::cursor::RowCursor;
use crate::error::Result;
use crate::mapping::{BoundSql, MappedStatement, ParameterObject};
use crate::models::{ResultHandler, Row, RowBounds};
use crate::store::{apply_transaction_timeout, tighter_timeout, StatementHandle, Transaction};
use libsql::Value;
use std::time::Duration;
use tracing::debug;

struct QueuedBatch {
    statement_id: String,
    sql: String,
    handle: Box<dyn StatementHandle>,
    parameter_sets: Vec<Vec<Value>>,
}

pub struct BatchExecutor {
    core: ExecutorCore,
    batches: Vec<QueuedBatch>,
    prepared: u64,
    reused: u64,
}

impl BatchExecutor {
    pub fn new(transaction: Box<dyn Transaction>, default_timeout: Option<Duration>) -> Self {
        BatchExecutor {
            core: ExecutorCore::new(transaction, default_timeout),
            batches: Vec::new(),
            prepared: 0,
            reused: 0,
        }
    }

    /// Number of queued batches.
    pub fn pending_batches(&self) -> usize {
        self.batches.len()
    }

    fn prepare(&mut self, bound: &BoundSql, ms: &MappedStatement) -> Result<Box<dyn StatementHandle>> {
        let connection = self.core.connection()?;
        let mut handle = connection.prepare(bound.sql())?;
        handle.set_query_timeout(tighter_timeout(
            self.core.statement_timeout(ms),
            self.core.transaction_timeout(),
        ));
        handle.bind(bound.values());
        self.prepared += 1;
        Ok(handle)
    }

    fn discard(&mut self) {
        for mut batch in self.batches.drain(..) {
            batch.handle.close();
        }
    }

    fn run_batches(&mut self) -> Result<Vec<BatchResult>> {
        let transaction_timeout = self.core.transaction_timeout();
        let mut results = Vec::with_capacity(self.batches.len());
        let mut batches = std::mem::take(&mut self.batches).into_iter();

        while let Some(mut batch) = batches.next() {
            apply_transaction_timeout(batch.handle.as_mut(), transaction_timeout);
            let mut update_counts = Vec::with_capacity(batch.parameter_sets.len());
            for values in &batch.parameter_sets {
                batch.handle.bind(values);
                match batch.handle.execute_update() {
                    Ok(count) => update_counts.push(count),
                    Err(e) => {
                        batch.handle.close();
                        for mut rest in batches {
                            rest.handle.close();
                        }
                        return Err(e);
                    }
                }
            }
            batch.handle.close();
            debug!(
                statement = %batch.statement_id,
                executions = update_counts.len(),
                "batch flushed"
            );
            results.push(BatchResult {
                statement_id: batch.statement_id,
                sql: batch.sql,
                parameter_sets: batch.parameter_sets,
                update_counts,
            });
        }
        Ok(results)
    }
}

impl Executor for BatchExecutor {
    fn update(&mut self, ms: &MappedStatement, parameter: &ParameterObject) -> Result<i64> {
        self.core.ensure_open()?;
        let bound = ms.bound_sql(parameter)?;

        let appended = match self.batches.last_mut() {
            Some(last) if last.sql == bound.sql() && last.statement_id == ms.id() => {
                last.parameter_sets.push(bound.values().to_vec());
                true
            }
            _ => false,
        };
        if appended {
            self.reused += 1;
        } else {
            let handle = self.prepare(&bound, ms)?;
            self.batches.push(QueuedBatch {
                statement_id: ms.id().to_string(),
                sql: bound.sql().to_string(),
                handle,
                parameter_sets: vec![bound.values().to_vec()],
            });
        }
        Ok(i64::from(BATCH_UPDATE_RETURN_VALUE))
    }

    fn query(
        &mut self,
        ms: &MappedStatement,
        parameter: &ParameterObject,
        bounds: RowBounds,
        handler: Option<&mut dyn ResultHandler>,
    ) -> Result<Vec<Row>> {
        self.flush_statements()?;
        let bound = ms.bound_sql(parameter)?;
        let mut handle = self.prepare(&bound, ms)?;
        let rows = handle
            .execute_query()
            .and_then(|mut source| collect_rows(source.as_mut(), bounds, handler));
        handle.close();
        rows
    }

    fn query_cursor(
        &mut self,
        ms: &MappedStatement,
        parameter: &ParameterObject,
        bounds: RowBounds,
    ) -> Result<RowCursor> {
        self.flush_statements()?;
        let bound = ms.bound_sql(parameter)?;
        let handle = self.prepare(&bound, ms)?;
        let resource = PreparedResource::shared(handle);
        let (source, generation) =
            super::with_resource(&resource, "open cursor", PreparedResource::execute_query)?;
        Ok(RowCursor::new(
            resource,
            generation,
            source,
            bound.sql(),
            bounds,
        ))
    }

    fn flush_statements(&mut self) -> Result<Vec<BatchResult>> {
        self.core.ensure_open()?;
        self.run_batches()
    }

    fn commit(&mut self, required: bool) -> Result<()> {
        self.flush_statements()?;
        self.core.commit(required)
    }

    fn rollback(&mut self, required: bool) -> Result<()> {
        if self.core.is_closed() {
            return Ok(());
        }
        self.discard();
        self.core.rollback(required)
    }

    fn close(&mut self, force_rollback: bool) -> Result<()> {
        self.discard();
        close_with(&mut self.core, force_rollback, |core| core.rollback(true))
    }

    fn is_closed(&self) -> bool {
        self.core.is_closed()
    }

    fn stats(&self) -> ExecutorStats {
        ExecutorStats {
            prepared: self.prepared,
            reused: self.reused,
            cached_statements: self.batches.len(),
        }
    }
}
