/// Prepared statement handles for LibSQL databases.
///
/// This module wraps a `libsql::Statement` as a [`StatementHandle`]:
/// - Binding positional parameters ahead of each execution
/// - Executing mutations and queries under the statement's query timeout
/// - Streaming query rows through [`LibsqlRows`]
///
/// A handle remembers the connection it was prepared on, so the reuse executor can tell
/// whether it is still usable. Statements with a `RETURNING` clause are always run
/// through the query path, and their affected count is the number of returned rows.
use crate::connection::ConnectionLiveness;
use crate::error::{MapperError, Result};
use crate::models::Row;
use crate::store::{RowSource, StatementHandle};
use crate::utils;
use libsql::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

pub struct LibsqlStatement {
    sql: String,
    stmt: Option<libsql::Statement>,
    liveness: ConnectionLiveness,
    params: Vec<Value>,
    timeout: Option<Duration>,
}

impl LibsqlStatement {
    pub fn new(sql: String, stmt: libsql::Statement, liveness: ConnectionLiveness) -> Self {
        LibsqlStatement {
            sql,
            stmt: Some(stmt),
            liveness,
            params: Vec::new(),
            timeout: None,
        }
    }

    fn statement(&mut self) -> Result<&mut libsql::Statement> {
        self.stmt
            .as_mut()
            .ok_or_else(|| MapperError::resource(self.sql.clone(), "statement is closed"))
    }

    fn run_query(&mut self) -> Result<LibsqlRows> {
        let timeout = self.timeout;
        let params = self.params.clone();
        let sql = self.sql.clone();
        let stmt = self.statement()?;

        // Reset clears any previous bindings and cursor state
        stmt.reset();
        let rows = utils::block_on_with_timeout(&sql, timeout, async {
            stmt.query(params)
                .await
                .map_err(|e| MapperError::resource(format!("query '{sql}'"), e))
        })?;
        Ok(LibsqlRows::new(sql, rows, timeout))
    }
}

impl StatementHandle for LibsqlStatement {
    fn sql(&self) -> &str {
        &self.sql
    }

    fn is_connection_alive(&self) -> bool {
        self.stmt.is_some() && self.liveness.is_alive()
    }

    fn query_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn set_query_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    fn bind(&mut self, values: &[Value]) {
        self.params.clear();
        self.params.extend_from_slice(values);
    }

    fn execute_update(&mut self) -> Result<u64> {
        if utils::should_use_query(&self.sql) {
            let mut rows = self.run_query()?;
            let mut count = 0u64;
            while rows.next_row()?.is_some() {
                count += 1;
            }
            return Ok(count);
        }

        let timeout = self.timeout;
        let params = self.params.clone();
        let sql = self.sql.clone();
        let stmt = self.statement()?;

        stmt.reset();
        let affected = utils::block_on_with_timeout(&sql, timeout, async {
            stmt.execute(params)
                .await
                .map_err(|e| MapperError::resource(format!("execute '{sql}'"), e))
        })?;
        trace!(sql = %sql, affected, "executed statement");
        Ok(affected as u64)
    }

    fn execute_query(&mut self) -> Result<Box<dyn RowSource>> {
        Ok(Box::new(self.run_query()?))
    }

    fn close(&mut self) {
        self.stmt = None;
        self.params.clear();
    }
}

/// Forward-only stream over the rows of one query execution.
pub struct LibsqlRows {
    sql: String,
    rows: libsql::Rows,
    columns: Arc<[String]>,
    timeout: Option<Duration>,
}

impl LibsqlRows {
    fn new(sql: String, rows: libsql::Rows, timeout: Option<Duration>) -> Self {
        let columns: Vec<String> = (0..rows.column_count())
            .map(|i| {
                rows.column_name(i)
                    .map_or_else(|| format!("col{i}"), str::to_string)
            })
            .collect();
        LibsqlRows {
            sql,
            rows,
            columns: columns.into(),
            timeout,
        }
    }
}

impl RowSource for LibsqlRows {
    fn columns(&self) -> Arc<[String]> {
        Arc::clone(&self.columns)
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        let width = self.columns.len();
        let sql = &self.sql;
        let rows = &mut self.rows;
        let fetched = utils::block_on_with_timeout(sql, self.timeout, async {
            rows.next()
                .await
                .map_err(|e| MapperError::resource(format!("fetch '{sql}'"), e))
        })?;

        let Some(row) = fetched else {
            return Ok(None);
        };
        let values = (0..width)
            .map(|i| {
                row.get_value(i as i32).map_err(|e| {
                    MapperError::resource(
                        format!("read column '{}' (index {i})", self.columns[i]),
                        e,
                    )
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(Row::new(Arc::clone(&self.columns), values)))
    }
}
