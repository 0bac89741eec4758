/// Connection lifecycle management for LibSQL/Turso databases
///
/// This module handles data source establishment, connection acquisition and health
/// checking. A [`DataSource`] owns the LibSQL database; every [`LibsqlConnection`] it
/// hands out tracks whether it has been closed so that statements prepared on it can
/// tell a dead connection apart from a live one.
use crate::config::DatabaseSettings;
use crate::constants::TOKIO_RUNTIME;
use crate::decode;
use crate::error::{MapperError, Result};
use crate::models::Mode;
use crate::statement::LibsqlStatement;
use crate::store::{Connection, StatementHandle};
use crate::utils;
use libsql::{Builder, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Opened LibSQL database handing out connections.
pub struct DataSource {
    db: libsql::Database,
    mode: Mode,
}

impl std::fmt::Debug for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSource")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl DataSource {
    /// Open a database in local, remote, or remote replica mode.
    ///
    /// - **local**: requires `path`
    /// - **remote**: requires `url` and `auth_token`
    /// - **remote_replica**: requires `path`, `url` and `auth_token`
    ///
    /// Opening is bounded by `connect_timeout_secs`.
    pub fn open(settings: &DatabaseSettings) -> Result<Self> {
        let mode = decode::require_mode(&settings.mode)?;
        let timeout = Duration::from_secs(settings.connect_timeout_secs);

        let require = |value: &Option<String>, name: &str| {
            value.clone().ok_or_else(|| {
                MapperError::configuration(format!("{name} is required for {mode:?} mode"))
            })
        };

        let db = utils::block_on_with_timeout("open database", Some(timeout), async {
            let built = match mode {
                Mode::Local => Builder::new_local(require(&settings.path, "path")?)
                    .build()
                    .await,
                Mode::Remote => Builder::new_remote(
                    require(&settings.url, "url")?,
                    require(&settings.auth_token, "auth_token")?,
                )
                .build()
                .await,
                Mode::RemoteReplica => Builder::new_remote_replica(
                    require(&settings.path, "path")?,
                    require(&settings.url, "url")?,
                    require(&settings.auth_token, "auth_token")?,
                )
                .build()
                .await,
            };
            built.map_err(|e| MapperError::resource("open database", e))
        })?;

        debug!(?mode, "opened data source");
        Ok(DataSource { db, mode })
    }

    /// Open a local database file.
    pub fn local(path: impl Into<String>) -> Result<Self> {
        Self::open(&DatabaseSettings {
            path: Some(path.into()),
            ..DatabaseSettings::default()
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Acquire a new connection. Remote connections are pinged before being returned.
    pub fn connect(&self) -> Result<LibsqlConnection> {
        let conn = self
            .db
            .connect()
            .map_err(|e| MapperError::resource("acquire connection", e))?;

        if self.mode != Mode::Local {
            TOKIO_RUNTIME.block_on(async {
                conn.query("SELECT 1", ())
                    .await
                    .map(|_| ())
                    .map_err(|e| MapperError::resource("ping connection", e))
            })?;
        }

        Ok(LibsqlConnection::new(conn))
    }
}

struct ConnectionInner {
    id: String,
    conn: libsql::Connection,
    closed: AtomicBool,
}

/// A LibSQL connection with an explicit closed flag.
#[derive(Clone)]
pub struct LibsqlConnection {
    inner: Arc<ConnectionInner>,
}

impl LibsqlConnection {
    pub fn new(conn: libsql::Connection) -> Self {
        LibsqlConnection {
            inner: Arc::new(ConnectionInner {
                id: Uuid::new_v4().to_string(),
                conn,
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Execute SQL outside any prepared statement, e.g. transaction control.
    pub fn execute_raw(&self, sql: &str) -> Result<u64> {
        if self.is_closed() {
            return Err(MapperError::resource(sql, "connection is closed"));
        }
        TOKIO_RUNTIME.block_on(async {
            self.inner
                .conn
                .execute(sql, Vec::<Value>::new())
                .await
                .map(|n| n as u64)
                .map_err(|e| MapperError::resource(format!("execute '{sql}'"), e))
        })
    }

    /// Mark the connection closed. Statements prepared on it stop being reusable.
    pub fn close(&self) {
        if !self.inner.closed.swap(true, Ordering::SeqCst) {
            debug!(connection = %self.inner.id, "connection closed");
        }
    }

    pub(crate) fn alive_flag(&self) -> ConnectionLiveness {
        ConnectionLiveness {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Connection for LibsqlConnection {
    fn id(&self) -> &str {
        &self.inner.id
    }

    fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    fn prepare(&self, sql: &str) -> Result<Box<dyn StatementHandle>> {
        if self.is_closed() {
            return Err(MapperError::resource("prepare", "connection is closed"));
        }
        let stmt = TOKIO_RUNTIME.block_on(async {
            self.inner
                .conn
                .prepare(sql)
                .await
                .map_err(|e| MapperError::resource("prepare", e))
        })?;
        debug!(connection = %self.inner.id, sql, "prepared statement");
        Ok(Box::new(LibsqlStatement::new(
            sql.to_string(),
            stmt,
            self.alive_flag(),
        )))
    }
}

/// Read-only view on a connection's closed flag, held by its statements.
#[derive(Clone)]
pub struct ConnectionLiveness {
    inner: Arc<ConnectionInner>,
}

impl ConnectionLiveness {
    pub fn is_alive(&self) -> bool {
        !self.inner.closed.load(Ordering::SeqCst)
    }
}
