//! Statement execution.
//!
//! Runs a [`TableDiff`] against the database: every `CREATE TABLE`, then every
//! `DROP TABLE`, then each table's `ALTER TABLE` sequence. Statements run one
//! at a time. The first failure stops the run and is returned with the
//! statement attached.
//!
//! DDL is not transactional in MySQL. Statements that already ran stay
//! applied when a later one fails.

use crate::diff::{Change, TableDiff};
use crate::schema::create_table_sql;
use crate::{Connection, ConnectionExt, Error, Result, TracedConn};

/// Applies diffs on a connection.
///
/// # Example
///
/// ```ignore
/// let runner = MigrationRunner::new(&pool, "utf8mb4");
/// let executed = runner.apply(&diff).await?;
/// ```
pub struct MigrationRunner<'a, C: Connection + ?Sized> {
    conn: &'a C,
    charset: String,
}

impl<'a, C: Connection + ?Sized> MigrationRunner<'a, C> {
    pub fn new(conn: &'a C, charset: impl Into<String>) -> Self {
        Self {
            conn,
            charset: charset.into(),
        }
    }

    /// Apply every change in `diff`. Returns the number of statements executed.
    pub async fn apply(&self, diff: &TableDiff) -> Result<usize> {
        let conn = self.conn.traced();
        let mut executed = 0;

        for table in &diff.tables_to_create {
            tracing::info!(table = %table.name, "creating table");
            let sql = create_table_sql(table, &self.charset);
            self.run(&conn, &sql, &mut executed).await?;
        }

        for name in &diff.tables_to_drop {
            tracing::info!(table = %name, "dropping table");
            let sql = Change::DropTable(name.clone()).to_sql(name, &self.charset);
            self.run(&conn, &sql, &mut executed).await?;
        }

        for column_diff in diff.column_diffs.iter().filter(|d| !d.is_empty()) {
            let statements = column_diff.to_sql();
            tracing::info!(
                table = %column_diff.table_name,
                statements = statements.len(),
                "altering table"
            );
            for sql in &statements {
                self.run(&conn, sql, &mut executed).await?;
            }
            tracing::info!(table = %column_diff.table_name, "table altered");
        }

        tracing::info!(executed, "schema changes applied");
        Ok(executed)
    }

    async fn run(&self, conn: &TracedConn<'_, C>, sql: &str, executed: &mut usize) -> Result<()> {
        tracing::info!(sql = %sql, "executing");
        match conn.execute(sql).await {
            Ok(_) => {
                *executed += 1;
                Ok(())
            }
            Err(source) => {
                tracing::error!(sql = %sql, error = %source, "statement failed");
                if *executed > 0 {
                    tracing::warn!(
                        executed = *executed,
                        "earlier statements of this run stay applied; there is no rollback"
                    );
                }
                Err(Error::Execution {
                    statement: sql.to_string(),
                    source,
                })
            }
        }
    }
}
