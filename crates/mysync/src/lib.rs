//! MySQL schema reconciliation.
//!
//! This crate provides:
//! - Declarative table models, registered with `inventory`
//! - Live schema introspection from `SHOW CREATE TABLE`
//! - A diff between the two, rendered as an ordered list of DDL statements
//! - Sequential execution of those statements
//!
//! # Models
//!
//! ```ignore
//! use mysync::{FieldDef, ModelDef, ScalarKind};
//!
//! mysync::inventory::submit! {
//!     ModelDef::new("Student", &[
//!         FieldDef::new("ID", ScalarKind::Varchar, "length:45 primary key"),
//!         FieldDef::new("Name", ScalarKind::Varchar, "length:50"),
//!         FieldDef::new("Score", ScalarKind::Decimal, "length:10_2"),
//!     ])
//! }
//! ```
//!
//! # Syncing
//!
//! ```ignore
//! let config = Config::from_env()?;
//! let pool = mysync::connect(&config).await?;
//! let sync = SchemaSync::new(&pool, config)?;
//!
//! // Review first...
//! for statement in sync.plan(&Schema::collect()?).await? {
//!     println!("{statement};");
//! }
//!
//! // ...or force the database into shape.
//! sync.reconcile_registered().await?;
//! ```
//!
//! Changed columns are dropped and re-added, losing their data. Review the
//! plan before running against anything that matters.

pub mod config;
mod diff;
mod error;
pub mod introspect;
mod migrate;
pub mod schema;
mod sync;
mod traced;

pub use config::{Config, connect};
pub use diff::{
    Change, ColumnChange, ColumnDiff, IndexRef, PrimaryKeyReplacement, TableDiff, compute_diff,
};
pub use error::Error;
pub use migrate::MigrationRunner;
pub use schema::{
    Column, ColumnConstraint, ColumnType, ConfigurationError, FieldDef, ModelDef, ResolvedField,
    ScalarKind, Schema, SchemaCodegen, TableDescriptor, create_table_sql,
};
pub use sync::SchemaSync;
pub use traced::{BoxFuture, Connection, ConnectionExt, TracedConn};

// Re-export inventory for model registration
pub use inventory;

pub type Result<T> = std::result::Result<T, Error>;
