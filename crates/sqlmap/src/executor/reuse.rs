/// Statement-reusing executor
///
/// Within one store transaction, every distinct SQL text is prepared once and the
/// prepared statement is rebound for later executions. Reuse is keyed by the exact
/// rendered text; two texts that differ only in whitespace are different statements.
///
/// A cached statement whose connection has been closed is silently dropped and prepared
/// again. Commit, rollback and flush release every cached statement, so nothing
/// prepared before the transaction ended is ever reused after it.
use super::{
    close_with, collect_rows, with_resource, BatchResult, Executor, ExecutorCore,
    ExecutorStats, PreparedResource, SharedResource,
};
use crate::cursor::RowCursor;
use crate::error::Result;
use crate::mapping::{BoundSql, MappedStatement, ParameterObject};
use crate::models::{ResultHandler, Row, RowBounds};
use crate::store::{apply_transaction_timeout, tighter_timeout, Transaction};
use crate::utils;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct ReuseExecutor {
    core: ExecutorCore,
    statements: HashMap<String, SharedResource>,
    prepared: u64,
    reused: u64,
}

impl ReuseExecutor {
    pub fn new(transaction: Box<dyn Transaction>, default_timeout: Option<Duration>) -> Self {
        ReuseExecutor {
            core: ExecutorCore::new(transaction, default_timeout),
            statements: HashMap::new(),
            prepared: 0,
            reused: 0,
        }
    }

    /// Fetch the statement for `bound.sql()`, preparing it if needed, and bind the values.
    ///
    /// Only the prepare path acquires the transaction's connection; cached statements are
    /// released on commit and rollback, so a reusable one always belongs to the open
    /// store transaction.
    pub fn prepare_and_bind(
        &mut self,
        bound: &BoundSql,
        statement_timeout: Option<Duration>,
    ) -> Result<SharedResource> {
        if let Some(existing) = self.statements.get(bound.sql()).map(Arc::clone) {
            let transaction_timeout = self.core.transaction_timeout();
            let reused = with_resource(&existing, "reuse statement", |res| {
                if !res.is_reusable() {
                    res.release();
                    return Ok(false);
                }
                apply_transaction_timeout(res.handle_mut(), transaction_timeout);
                res.handle_mut().bind(bound.values());
                Ok(true)
            })?;
            if reused {
                self.reused += 1;
                return Ok(existing);
            }
            debug!(sql = bound.sql(), "cached statement is no longer usable, preparing again");
            self.statements.remove(bound.sql());
        }

        let connection = self.core.connection()?;
        let mut handle = connection.prepare(bound.sql())?;
        let transaction_timeout = self.core.transaction_timeout();
        handle.set_query_timeout(tighter_timeout(statement_timeout, transaction_timeout));
        handle.bind(bound.values());
        let resource = PreparedResource::shared(handle);
        self.statements
            .insert(bound.sql().to_string(), Arc::clone(&resource));
        self.prepared += 1;
        debug!(connection = connection.id(), sql = bound.sql(), "statement prepared for reuse");
        Ok(resource)
    }

    fn release_all(&mut self) {
        for (sql, resource) in self.statements.drain() {
            match utils::safe_lock_arc(&resource, "release statement") {
                Ok(mut res) => res.release(),
                Err(e) => debug!(sql = %sql, error = %e, "could not release statement"),
            }
        }
    }
}

impl Executor for ReuseExecutor {
    fn update(&mut self, ms: &MappedStatement, parameter: &ParameterObject) -> Result<i64> {
        self.core.ensure_open()?;
        let bound = ms.bound_sql(parameter)?;
        let resource = self.prepare_and_bind(&bound, self.core.statement_timeout(ms))?;
        let count = with_resource(&resource, "execute update", PreparedResource::execute_update)?;
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    fn query(
        &mut self,
        ms: &MappedStatement,
        parameter: &ParameterObject,
        bounds: RowBounds,
        handler: Option<&mut dyn ResultHandler>,
    ) -> Result<Vec<Row>> {
        self.core.ensure_open()?;
        let bound = ms.bound_sql(parameter)?;
        let resource = self.prepare_and_bind(&bound, self.core.statement_timeout(ms))?;
        let (mut source, _) =
            with_resource(&resource, "execute query", PreparedResource::execute_query)?;
        collect_rows(source.as_mut(), bounds, handler)
    }

    fn query_cursor(
        &mut self,
        ms: &MappedStatement,
        parameter: &ParameterObject,
        bounds: RowBounds,
    ) -> Result<RowCursor> {
        self.core.ensure_open()?;
        let bound = ms.bound_sql(parameter)?;
        let resource = self.prepare_and_bind(&bound, self.core.statement_timeout(ms))?;
        let (source, generation) =
            with_resource(&resource, "open cursor", PreparedResource::execute_query)?;
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
        self.release_all();
        Ok(Vec::new())
    }

    fn commit(&mut self, required: bool) -> Result<()> {
        self.core.ensure_open()?;
        self.release_all();
        self.core.commit(required)
    }

    fn rollback(&mut self, required: bool) -> Result<()> {
        if self.core.is_closed() {
            return Ok(());
        }
        self.release_all();
        self.core.rollback(required)
    }

    fn close(&mut self, force_rollback: bool) -> Result<()> {
        self.release_all();
        close_with(&mut self.core, force_rollback, |core| core.rollback(true))
    }

    fn is_closed(&self) -> bool {
        self.core.is_closed()
    }

    fn stats(&self) -> ExecutorStats {
        ExecutorStats {
            prepared: self.prepared,
            reused: self.reused,
            cached_statements: self.statements.len(),
        }
    }
}
