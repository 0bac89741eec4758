/// Store-facing contracts consumed by the executors
///
/// The execution core never talks to LibSQL directly; it goes through these traits so
/// that the statement-reuse and cursor logic can be reasoned about independently of the
/// driver. `connection`, `statement` and `transaction` provide the LibSQL implementation.
use crate::error::Result;
use crate::models::Row;
use libsql::Value;
use std::sync::Arc;
use std::time::Duration;

/// A live connection able to prepare statements.
pub trait Connection: Send + Sync {
    /// Identifier used in logs.
    fn id(&self) -> &str;

    fn is_closed(&self) -> bool;

    fn prepare(&self, sql: &str) -> Result<Box<dyn StatementHandle>>;
}

/// A prepared statement bound to one SQL text.
pub trait StatementHandle: Send {
    fn sql(&self) -> &str;

    /// Whether the connection this statement was prepared on is still usable.
    fn is_connection_alive(&self) -> bool;

    fn query_timeout(&self) -> Option<Duration>;

    fn set_query_timeout(&mut self, timeout: Option<Duration>);

    /// Replace the positional parameter values used by the next execution.
    fn bind(&mut self, values: &[Value]);

    /// Run a mutation and return the affected row count.
    fn execute_update(&mut self) -> Result<u64>;

    /// Run a query and return a forward-only stream over its rows.
    fn execute_query(&mut self) -> Result<Box<dyn RowSource>>;

    fn close(&mut self);
}

/// Forward-only row stream produced by one query execution.
pub trait RowSource: Send {
    fn columns(&self) -> Arc<[String]>;

    /// Fetch the next row, `None` once the stream is exhausted.
    fn next_row(&mut self) -> Result<Option<Row>>;
}

/// Unit of work owning one connection.
pub trait Transaction: Send {
    /// The transaction's connection, acquired and begun on first use.
    fn connection(&mut self) -> Result<Arc<dyn Connection>>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;

    fn close(&mut self) -> Result<()>;

    /// Time left before the transaction's deadline, if it has one.
    fn timeout(&self) -> Option<Duration>;
}

/// Source of fresh transactions, one per session.
pub trait TransactionFactory: Send + Sync {
    fn new_transaction(&self) -> Result<Box<dyn Transaction>>;
}

/// Shrink (never extend) a statement's timeout to the transaction's remaining time.
pub fn apply_transaction_timeout(
    statement: &mut dyn StatementHandle,
    transaction_timeout: Option<Duration>,
) {
    let Some(remaining) = transaction_timeout else {
        return;
    };
    match statement.query_timeout() {
        Some(current) if current <= remaining => {}
        _ => statement.set_query_timeout(Some(remaining)),
    }
}

/// The tighter of two optional deadlines.
pub fn tighter_timeout(a: Option<Duration>, b: Option<Duration>) -> Option<Duration> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, None) => a,
        (None, b) => b,
    }
}
