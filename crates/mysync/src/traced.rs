//! Traced database connection wrapper.
//!
//! Wraps a [`Connection`] and logs every statement via tracing.

use sqlx::mysql::MySqlRow;
use sqlx::{Executor, MySqlPool, Row};
use std::future::Future;
use std::pin::Pin;
use tracing::Instrument;

/// Boxed future returned by [`Connection`] methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait for database connections mysync can run statements on.
///
/// Implemented for `sqlx::MySqlPool`. Statements carry no parameters, so they
/// are sent over the text protocol.
pub trait Connection: Send + Sync {
    /// Execute a statement, returning the number of rows affected.
    fn execute<'a>(&'a self, sql: &'a str) -> BoxFuture<'a, Result<u64, sqlx::Error>>;

    /// Run a query and return every row with each column decoded as text.
    fn fetch_text<'a>(&'a self, sql: &'a str)
    -> BoxFuture<'a, Result<Vec<Vec<String>>, sqlx::Error>>;
}

impl Connection for MySqlPool {
    fn execute<'a>(&'a self, sql: &'a str) -> BoxFuture<'a, Result<u64, sqlx::Error>> {
        Box::pin(async move {
            let result = Executor::execute(self, sql).await?;
            Ok(result.rows_affected())
        })
    }

    fn fetch_text<'a>(
        &'a self,
        sql: &'a str,
    ) -> BoxFuture<'a, Result<Vec<Vec<String>>, sqlx::Error>> {
        Box::pin(async move {
            let rows = Executor::fetch_all(self, sql).await?;
            rows.iter()
                .map(|row| {
                    (0..row.len())
                        .map(|i| decode_text(row, i))
                        .collect::<Result<Vec<_>, _>>()
                })
                .collect()
        })
    }
}

// `SHOW CREATE TABLE` comes back as binary under some collations.
fn decode_text(row: &MySqlRow, index: usize) -> Result<String, sqlx::Error> {
    match row.try_get::<String, _>(index) {
        Ok(text) => Ok(text),
        Err(_) => {
            let bytes: Vec<u8> = row.try_get(index)?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
    }
}

/// A wrapper around a connection that logs all statements via tracing.
///
/// # Example
///
/// ```ignore
/// use mysync::ConnectionExt;
///
/// let traced = pool.traced();
/// traced.execute("ALTER TABLE student DROP COLUMN name").await?;
/// ```
pub struct TracedConn<'a, C: Connection + ?Sized> {
    conn: &'a C,
}

impl<'a, C: Connection + ?Sized> TracedConn<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Execute a statement, returning the number of rows affected.
    pub async fn execute(&self, sql: &str) -> Result<u64, sqlx::Error> {
        let span = tracing::debug_span!(
            "db.execute",
            sql = %sql,
            affected = tracing::field::Empty,
        );
        let affected = self.conn.execute(sql).instrument(span.clone()).await?;
        span.record("affected", affected);
        Ok(affected)
    }

    /// Run a query, returning all rows as text.
    pub async fn fetch_text(&self, sql: &str) -> Result<Vec<Vec<String>>, sqlx::Error> {
        let span = tracing::debug_span!(
            "db.query",
            sql = %sql,
            rows = tracing::field::Empty,
        );
        let rows = self.conn.fetch_text(sql).instrument(span.clone()).await?;
        span.record("rows", rows.len());
        Ok(rows)
    }
}

/// Extension trait to get a traced wrapper from a connection.
pub trait ConnectionExt: Connection {
    /// Wrap this connection in a `TracedConn` for statement logging.
    fn traced(&self) -> TracedConn<'_, Self> {
        TracedConn::new(self)
    }
}

impl<C: Connection + ?Sized> ConnectionExt for C {}
