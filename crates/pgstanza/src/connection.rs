//! Connection facade over one lazily opened database handle.
//!
//! A [`Connection`] is built once per request from a
//! [`ConnectionConfig`](crate::ConnectionConfig), opened on first use, and
//! closed explicitly at the end. It is not meant to be shared: every method
//! takes `&mut self` and there is no pooling. Each call resolves the
//! statement's `{prefix}` token, rewrites its placeholders to positional
//! form, prepares, binds, and executes; there is no statement or result
//! caching, so repeated fetches re-run the query.

use crate::config::ConnectionConfig;
use crate::error::{StanzaError, StanzaResult};
use crate::row::{FromRow, RowExt};
use crate::stmt::Statement;
use tokio_postgres::types::{FromSqlOwned, ToSql};
use tokio_postgres::{Client, NoTls, Row};

enum State {
    Unconnected,
    Connected(Handle),
    Closed,
}

struct Handle {
    client: Client,
    /// Driver task for the underlying connection; ends when the client drops.
    _driver: tokio::task::JoinHandle<()>,
}

/// One logical database connection.
///
/// States: unconnected until the first call, connected afterwards, closed
/// after [`Connection::close`]. Closed is terminal.
pub struct Connection {
    config: ConnectionConfig,
    state: State,
}

impl Connection {
    /// Create an unconnected facade; nothing is opened until first use.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            state: State::Unconnected,
        }
    }

    /// Create an unconnected facade for a database URL with no table prefix.
    pub fn from_url(url: &str) -> Self {
        Self::new(ConnectionConfig::new(url))
    }

    /// The configuration this facade was built with.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Whether the underlying handle is currently open.
    pub fn is_connected(&self) -> bool {
        matches!(self.state, State::Connected(_))
    }

    /// Whether the facade has been closed.
    pub fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed)
    }

    /// Open the underlying handle. Idempotent: a second call on an open
    /// connection does nothing. Using a closed facade is an error.
    pub async fn connect(&mut self) -> StanzaResult<()> {
        match self.state {
            State::Connected(_) => Ok(()),
            State::Closed => Err(StanzaError::Connection(
                "connection has been closed".into(),
            )),
            State::Unconnected => {
                let pg_config = self.config.pg_config()?;
                let (client, connection) = pg_config
                    .connect(NoTls)
                    .await
                    .map_err(StanzaError::from_db_error)?;
                let driver = tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        tracing::error!(error = %e, "database connection task ended with error");
                    }
                });
                tracing::debug!(prefix = %self.config.prefix(), "database connection opened");
                self.state = State::Connected(Handle {
                    client,
                    _driver: driver,
                });
                Ok(())
            }
        }
    }

    /// Close the connection. Terminal: the facade cannot be reopened.
    pub fn close(&mut self) {
        let previous = std::mem::replace(&mut self.state, State::Closed);
        if matches!(previous, State::Connected(_)) {
            tracing::debug!("database connection closed");
        }
    }

    async fn client(&mut self) -> StanzaResult<&Client> {
        self.connect().await?;
        match &self.state {
            State::Connected(handle) => Ok(&handle.client),
            _ => Err(StanzaError::Connection("connection is not open".into())),
        }
    }

    // ==================== Execution ====================

    /// Execute a write statement and return the affected row count.
    pub async fn execute(&mut self, statement: &Statement) -> StanzaResult<u64> {
        let (sql, values) = statement.for_execution(self.config.prefix())?;
        let client = self.client().await?;
        tracing::debug!(sql = %sql, params = values.len(), "execute");
        let prepared = client
            .prepare(&sql)
            .await
            .map_err(StanzaError::from_db_error)?;
        let refs: Vec<&(dyn ToSql + Sync)> =
            values.iter().map(|v| *v as &(dyn ToSql + Sync)).collect();
        client
            .execute(&prepared, &refs)
            .await
            .map_err(StanzaError::from_db_error)
    }

    async fn run_query(&mut self, statement: &Statement) -> StanzaResult<Vec<Row>> {
        let (sql, values) = statement.for_execution(self.config.prefix())?;
        let client = self.client().await?;
        tracing::debug!(sql = %sql, params = values.len(), "query");
        let prepared = client
            .prepare(&sql)
            .await
            .map_err(StanzaError::from_db_error)?;
        let refs: Vec<&(dyn ToSql + Sync)> =
            values.iter().map(|v| *v as &(dyn ToSql + Sync)).collect();
        client
            .query(&prepared, &refs)
            .await
            .map_err(StanzaError::from_db_error)
    }

    // ==================== Readers ====================

    /// Execute and return all rows.
    pub async fn fetch_all(&mut self, statement: &Statement) -> StanzaResult<Vec<Row>> {
        self.run_query(statement).await
    }

    /// Execute and return the first row; [`StanzaError::NotFound`] on none.
    pub async fn fetch_single(&mut self, statement: &Statement) -> StanzaResult<Row> {
        let rows = self.run_query(statement).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StanzaError::not_found("expected one row, got none"))
    }

    /// Execute and return the first row, if any.
    pub async fn fetch_opt(&mut self, statement: &Statement) -> StanzaResult<Option<Row>> {
        let rows = self.run_query(statement).await?;
        Ok(rows.into_iter().next())
    }

    /// Execute and return the first column of every row.
    pub async fn fetch_column<T: FromSqlOwned>(
        &mut self,
        statement: &Statement,
    ) -> StanzaResult<Vec<T>> {
        let rows = self.run_query(statement).await?;
        rows.iter().map(|row| row.try_column(0)).collect()
    }

    /// Execute and return a single scalar from the first row's first column.
    pub async fn fetch_value<T: FromSqlOwned>(
        &mut self,
        statement: &Statement,
    ) -> StanzaResult<T> {
        let row = self.fetch_single(statement).await?;
        row.try_column(0)
    }

    /// Execute and map all rows to `T`.
    pub async fn fetch_all_as<T: FromRow>(
        &mut self,
        statement: &Statement,
    ) -> StanzaResult<Vec<T>> {
        let rows = self.run_query(statement).await?;
        rows.iter().map(T::from_row).collect()
    }

    /// Execute and map the first row to `T`; [`StanzaError::NotFound`] on none.
    pub async fn fetch_single_as<T: FromRow>(
        &mut self,
        statement: &Statement,
    ) -> StanzaResult<T> {
        let row = self.fetch_single(statement).await?;
        T::from_row(&row)
    }

    // ==================== Transactions ====================

    /// Begin a transaction. No savepoints, no nesting: boundaries delegate
    /// directly to the driver.
    pub async fn begin_transaction(&mut self) -> StanzaResult<()> {
        let client = self.client().await?;
        tracing::debug!("BEGIN");
        client
            .batch_execute("BEGIN")
            .await
            .map_err(StanzaError::from_db_error)
    }

    /// Commit the open transaction.
    pub async fn commit_transaction(&mut self) -> StanzaResult<()> {
        let client = self.client().await?;
        tracing::debug!("COMMIT");
        client
            .batch_execute("COMMIT")
            .await
            .map_err(StanzaError::from_db_error)
    }

    /// Roll back the open transaction.
    pub async fn rollback_transaction(&mut self) -> StanzaResult<()> {
        let client = self.client().await?;
        tracing::debug!("ROLLBACK");
        client
            .batch_execute("ROLLBACK")
            .await
            .map_err(StanzaError::from_db_error)
    }
}
