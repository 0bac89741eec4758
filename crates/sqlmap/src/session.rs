/// Sessions: the per-transaction call surface
///
/// A [`SqlSessionFactory`] holds the shared [`Configuration`] and a transaction factory.
/// Each [`SqlSession`] it opens owns one executor, and through it one store
/// transaction. Sessions are single-threaded and must be committed or rolled back
/// explicitly; closing a session with uncommitted writes rolls them back.
///
/// ```ignore
/// let factory = SqlSessionFactory::build(configuration)?;
/// let mut session = factory.open_session()?;
/// let inserted = session.insert("app.User.insert", ParamMap::new().with("name", name))?;
/// session.commit(false)?;
/// session.close()?;
/// ```
use crate::binding::method::MapperResult;
use crate::binding::registry::MapperProxy;
use crate::binding::signature::Argument;
use crate::configuration::Configuration;
use crate::connection::DataSource;
use crate::cursor::RowCursor;
use crate::error::{MapperError, Result};
use crate::executor::{
    BatchExecutor, BatchResult, CachingExecutor, Executor, ExecutorStats, ReuseExecutor,
};
use crate::mapping::ParameterObject;
use crate::models::{ExecutorType, MapKey, ResultHandler, Row, RowBounds, RowMap};
use crate::store::TransactionFactory;
use crate::transaction::LibsqlTransactionFactory;
use std::sync::Arc;
use tracing::debug;

pub struct SqlSessionFactory {
    configuration: Arc<Configuration>,
    transaction_factory: Arc<dyn TransactionFactory>,
}

impl SqlSessionFactory {
    pub fn new(
        configuration: Arc<Configuration>,
        transaction_factory: Arc<dyn TransactionFactory>,
    ) -> Self {
        SqlSessionFactory {
            configuration,
            transaction_factory,
        }
    }

    /// Open the data source described by the configuration's settings and build a
    /// factory on top of it.
    pub fn build(configuration: Configuration) -> Result<Self> {
        let settings = configuration.settings();
        let data_source = Arc::new(DataSource::open(&settings.database)?);
        let transactions = LibsqlTransactionFactory::from_settings(data_source, settings)?;
        Ok(SqlSessionFactory::new(
            Arc::new(configuration),
            Arc::new(transactions),
        ))
    }

    pub fn configuration(&self) -> &Arc<Configuration> {
        &self.configuration
    }

    /// Open a session with the configured default executor type.
    pub fn open_session(&self) -> Result<SqlSession> {
        self.open_session_with(self.configuration.settings().executor.default_executor_type)
    }

    pub fn open_session_with(&self, executor_type: ExecutorType) -> Result<SqlSession> {
        let transaction = self.transaction_factory.new_transaction()?;
        let default_timeout = self.configuration.settings().default_statement_timeout();
        let mut executor: Box<dyn Executor> = match executor_type {
            ExecutorType::Reuse => Box::new(ReuseExecutor::new(transaction, default_timeout)),
            ExecutorType::Batch => Box::new(BatchExecutor::new(transaction, default_timeout)),
        };
        if self.configuration.settings().executor.cache_enabled {
            executor = Box::new(CachingExecutor::new(executor));
        }
        debug!(executor = ?executor_type, "Opened session");
        Ok(SqlSession {
            configuration: Arc::clone(&self.configuration),
            executor,
            dirty: false,
        })
    }
}

pub struct SqlSession {
    configuration: Arc<Configuration>,
    executor: Box<dyn Executor>,
    /// Writes were issued since the last commit or rollback.
    dirty: bool,
}

impl std::fmt::Debug for SqlSessionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlSessionFactory")
            .field("statements", &self.configuration.statement_ids().len())
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for SqlSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlSession")
            .field("dirty", &self.dirty)
            .field("closed", &self.executor.is_closed())
            .finish()
    }
}

impl SqlSession {
    pub fn configuration(&self) -> &Arc<Configuration> {
        &self.configuration
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_closed(&self) -> bool {
        self.executor.is_closed()
    }

    pub fn executor_stats(&self) -> ExecutorStats {
        self.executor.stats()
    }

    /// Zero or one row. More than one row is a result shape error.
    pub fn select_one(
        &mut self,
        statement: &str,
        parameter: impl Into<ParameterObject>,
    ) -> Result<Option<Row>> {
        let mut rows = self.select_list(statement, parameter)?;
        if rows.len() > 1 {
            return Err(MapperError::result_shape(format!(
                "too many results: expected one result (or none) from {statement}, but found {}",
                rows.len()
            )));
        }
        Ok(rows.pop())
    }

    pub fn select_list(
        &mut self,
        statement: &str,
        parameter: impl Into<ParameterObject>,
    ) -> Result<Vec<Row>> {
        self.select_list_bounded(statement, parameter, RowBounds::DEFAULT)
    }

    pub fn select_list_bounded(
        &mut self,
        statement: &str,
        parameter: impl Into<ParameterObject>,
        bounds: RowBounds,
    ) -> Result<Vec<Row>> {
        let ms = self.configuration.statement(statement)?;
        self.executor
            .query(&ms, &parameter.into(), bounds, None)
    }

    /// Rows keyed by the value of `map_key` in each row.
    ///
    /// Rows are inserted in row order, so a later row replaces an earlier one with the
    /// same key.
    pub fn select_map(
        &mut self,
        statement: &str,
        parameter: impl Into<ParameterObject>,
        map_key: &str,
        bounds: RowBounds,
    ) -> Result<RowMap> {
        let rows = self.select_list_bounded(statement, parameter, bounds)?;
        let mut map = RowMap::with_capacity(rows.len());
        for row in rows {
            let key = row.get(map_key).map(MapKey::from).ok_or_else(|| {
                MapperError::result_shape(format!(
                    "map key column '{map_key}' is not part of the rows returned by {statement}"
                ))
            })?;
            map.insert(key, row);
        }
        Ok(map)
    }

    /// A lazy cursor. It stays valid until the same SQL is executed again in this
    /// session or the transaction ends.
    pub fn select_cursor(
        &mut self,
        statement: &str,
        parameter: impl Into<ParameterObject>,
        bounds: RowBounds,
    ) -> Result<RowCursor> {
        let ms = self.configuration.statement(statement)?;
        self.executor.query_cursor(&ms, &parameter.into(), bounds)
    }

    /// Hand every row to `handler` as it is read.
    pub fn select_with_handler(
        &mut self,
        statement: &str,
        parameter: impl Into<ParameterObject>,
        bounds: RowBounds,
        handler: &mut dyn ResultHandler,
    ) -> Result<()> {
        let ms = self.configuration.statement(statement)?;
        self.executor
            .query(&ms, &parameter.into(), bounds, Some(handler))?;
        Ok(())
    }

    pub fn insert(&mut self, statement: &str, parameter: impl Into<ParameterObject>) -> Result<i64> {
        self.update(statement, parameter)
    }

    /// Run a mutation and return its affected row count.
    pub fn update(&mut self, statement: &str, parameter: impl Into<ParameterObject>) -> Result<i64> {
        let ms = self.configuration.statement(statement)?;
        self.dirty = true;
        self.executor.update(&ms, &parameter.into())
    }

    pub fn delete(&mut self, statement: &str, parameter: impl Into<ParameterObject>) -> Result<i64> {
        self.update(statement, parameter)
    }

    pub fn flush_statements(&mut self) -> Result<Vec<BatchResult>> {
        self.executor.flush_statements()
    }

    /// Commit. Without `force` the store is only asked to commit when writes were made.
    pub fn commit(&mut self, force: bool) -> Result<()> {
        let required = self.commit_or_rollback_required(force);
        self.executor.commit(required)?;
        self.dirty = false;
        Ok(())
    }

    pub fn rollback(&mut self, force: bool) -> Result<()> {
        let required = self.commit_or_rollback_required(force);
        self.executor.rollback(required)?;
        self.dirty = false;
        Ok(())
    }

    /// Close the session, rolling back uncommitted writes. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        let required = self.commit_or_rollback_required(false);
        let closed = self.executor.close(required);
        self.dirty = false;
        closed
    }

    /// A registered mapper interface bound to this session.
    pub fn get_mapper(&mut self, interface: &str) -> Result<MapperProxy<'_>> {
        let table = self.configuration.mapper(interface)?;
        Ok(MapperProxy::new(self, table))
    }

    /// Call `method` of a registered interface.
    pub fn execute(
        &mut self,
        interface: &str,
        method: &str,
        args: Vec<Argument<'_>>,
    ) -> Result<MapperResult> {
        self.get_mapper(interface)?.invoke(method, args)
    }

    fn commit_or_rollback_required(&self, force: bool) -> bool {
        self.dirty || force
    }
}

impl Drop for SqlSession {
    fn drop(&mut self) {
        if !self.executor.is_closed() {
            if let Err(e) = self.close() {
                debug!(error = %e, "Failed to close session on drop");
            }
        }
    }
}
