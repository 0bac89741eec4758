/// Transaction management for LibSQL databases.
///
/// This module implements the [`Transaction`] store contract:
/// - Acquiring the transaction's connection lazily, on the first statement
/// - Starting the store transaction with the configured locking behavior
/// - Committing or rolling back, after which the next statement begins a new one
/// - Tracking the deadline that statement timeouts are shrunk to
///
/// **Note on Locking**: transaction control is issued as plain SQL (`BEGIN IMMEDIATE`,
/// `COMMIT`, `ROLLBACK`) on the transaction's own connection. Statements prepared on that
/// connection therefore run inside the store transaction without borrowing a
/// `libsql::Transaction` guard across calls.
use crate::config::Settings;
use crate::connection::{DataSource, LibsqlConnection};
use crate::decode;
use crate::error::{MapperError, Result};
use crate::store::{Connection, Transaction, TransactionFactory};
use libsql::TransactionBehavior;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Hands out one [`LibsqlTransaction`] per session.
#[derive(Debug, Clone)]
pub struct LibsqlTransactionFactory {
    data_source: Arc<DataSource>,
    begin_sql: &'static str,
    timeout: Option<Duration>,
}

impl LibsqlTransactionFactory {
    pub fn new(
        data_source: Arc<DataSource>,
        behavior: TransactionBehavior,
        timeout: Option<Duration>,
    ) -> Self {
        LibsqlTransactionFactory {
            data_source,
            begin_sql: decode::begin_statement(behavior),
            timeout,
        }
    }

    /// Build a factory from the `database.transaction_behavior` and
    /// `executor.transaction_timeout_secs` settings.
    pub fn from_settings(data_source: Arc<DataSource>, settings: &Settings) -> Result<Self> {
        let behavior = decode::require_transaction_behavior(&settings.database.transaction_behavior)?;
        Ok(Self::new(
            data_source,
            behavior,
            settings.transaction_timeout(),
        ))
    }
}

impl TransactionFactory for LibsqlTransactionFactory {
    fn new_transaction(&self) -> Result<Box<dyn Transaction>> {
        Ok(Box::new(LibsqlTransaction {
            data_source: Arc::clone(&self.data_source),
            begin_sql: self.begin_sql,
            timeout: self.timeout,
            connection: None,
            started: None,
            closed: false,
        }))
    }
}

/// A unit of work over one LibSQL connection.
pub struct LibsqlTransaction {
    data_source: Arc<DataSource>,
    begin_sql: &'static str,
    timeout: Option<Duration>,
    connection: Option<Arc<LibsqlConnection>>,
    /// When the current store transaction began; `None` while none is open.
    started: Option<Instant>,
    closed: bool,
}

impl LibsqlTransaction {
    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(MapperError::executor("transaction is closed"));
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.started.is_some()
    }

    fn finish(&mut self, sql: &str) -> Result<()> {
        self.ensure_open()?;
        let Some(conn) = self.connection.as_ref() else {
            return Ok(());
        };
        if !self.is_active() {
            return Ok(());
        }
        let finished = conn.execute_raw(sql);
        // A failed COMMIT leaves the store transaction open; only ROLLBACK always ends it
        if finished.is_ok() || sql == "ROLLBACK" {
            self.started = None;
        }
        finished?;
        debug!(connection = conn.id(), sql, "transaction finished");
        Ok(())
    }
}

impl Transaction for LibsqlTransaction {
    fn connection(&mut self) -> Result<Arc<dyn Connection>> {
        self.ensure_open()?;
        let conn = match &self.connection {
            Some(conn) => Arc::clone(conn),
            None => {
                let conn = Arc::new(self.data_source.connect()?);
                self.connection = Some(Arc::clone(&conn));
                conn
            }
        };
        if !self.is_active() {
            conn.execute_raw(self.begin_sql)?;
            self.started = Some(Instant::now());
            debug!(connection = conn.id(), begin = self.begin_sql, "transaction started");
        }
        Ok(conn)
    }

    fn commit(&mut self) -> Result<()> {
        self.finish("COMMIT")
    }

    fn rollback(&mut self) -> Result<()> {
        self.finish("ROLLBACK")
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        let rolled_back = self.finish("ROLLBACK");
        if let Err(e) = &rolled_back {
            warn!(error = %e, "rollback on close failed");
        }
        if let Some(conn) = self.connection.take() {
            conn.close();
        }
        self.closed = true;
        rolled_back
    }

    fn timeout(&self) -> Option<Duration> {
        let limit = self.timeout?;
        match self.started {
            Some(started) => Some(limit.saturating_sub(started.elapsed())),
            None => Some(limit),
        }
    }
}
