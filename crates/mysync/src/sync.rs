//! The two entry points a deploy step uses: [`SchemaSync::plan`] to review
//! and [`SchemaSync::reconcile_and_apply`] to force the database into shape.
//!
//! Each call reads the live schema afresh. Nothing is cached between runs,
//! and concurrent runs against the same database must be prevented by the
//! caller.

use crate::diff::{TableDiff, compute_diff};
use crate::introspect::live_schema;
use crate::migrate::MigrationRunner;
use crate::{Config, Connection, Result};
use mysync_schema::{ModelDef, Schema};

/// Synchronizes a database with a declared schema.
///
/// # Example
///
/// ```ignore
/// let config = Config::from_env()?;
/// let pool = mysync::connect(&config).await?;
/// let sync = SchemaSync::new(&pool, config)?;
///
/// let desired = Schema::collect()?;
/// for statement in sync.plan(&desired).await? {
///     println!("{statement};");
/// }
/// ```
pub struct SchemaSync<'a, C: Connection + ?Sized> {
    conn: &'a C,
    config: Config,
}

impl<'a, C: Connection + ?Sized> SchemaSync<'a, C> {
    pub fn new(conn: &'a C, config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { conn, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Compare `desired` with the live schema without writing anything.
    pub async fn diff(&self, desired: &Schema) -> Result<TableDiff> {
        let actual = live_schema(self.conn).await?;
        Ok(compute_diff(desired, &actual))
    }

    /// The statements [`SchemaSync::reconcile_and_apply`] would run, in order.
    pub async fn plan(&self, desired: &Schema) -> Result<Vec<String>> {
        let diff = self.diff(desired).await?;
        Ok(diff.statements(&self.config.charset))
    }

    /// Bring the database in line with `desired` and return what was applied.
    pub async fn reconcile_and_apply(&self, desired: &Schema) -> Result<TableDiff> {
        let diff = self.diff(desired).await?;
        if diff.is_empty() {
            tracing::info!("schema is up to date");
            return Ok(diff);
        }

        tracing::info!(changes = diff.change_count(), "applying schema changes");
        MigrationRunner::new(self.conn, self.config.charset.as_str())
            .apply(&diff)
            .await?;
        Ok(diff)
    }

    /// Resolve `models` and reconcile. Model errors surface before the
    /// database is touched.
    pub async fn reconcile_models<'m>(
        &self,
        models: impl IntoIterator<Item = &'m ModelDef>,
    ) -> Result<TableDiff> {
        let desired = Schema::from_models(models)?;
        self.reconcile_and_apply(&desired).await
    }

    /// Reconcile every model registered with `inventory::submit!`.
    pub async fn reconcile_registered(&self) -> Result<TableDiff> {
        let desired = Schema::collect()?;
        self.reconcile_and_apply(&desired).await
    }
}
