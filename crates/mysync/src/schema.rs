//! Schema definition and DDL rendering.
//!
//! ## Example
//!
//! ```ignore
//! use mysync::{FieldDef, ModelDef, ScalarKind};
//!
//! mysync::inventory::submit! {
//!     ModelDef::new("Student", &[
//!         FieldDef::new("ID", ScalarKind::Varchar, "length:45 primary key"),
//!         FieldDef::new("Name", ScalarKind::Varchar, "length:50"),
//!         FieldDef::new("State", ScalarKind::Bool, "index default 1"),
//!     ])
//! }
//! ```

pub mod codegen;

pub use mysync_schema::{
    Column, ColumnConstraint, ColumnType, ConfigurationError, FieldDef, ModelDef, ResolvedField,
    ScalarKind, Schema, TableDescriptor, index_name, primary_key_name, snake_case,
};

/// Extension trait for Schema to add SQL generation.
pub trait SchemaCodegen {
    /// Generate `CREATE TABLE` statements for every table.
    fn to_sql(&self, charset: &str) -> String;
}

impl SchemaCodegen for Schema {
    fn to_sql(&self, charset: &str) -> String {
        codegen::schema_to_sql(self, charset)
    }
}

/// Generate the CREATE TABLE statement for a table.
///
/// The layout mirrors what `SHOW CREATE TABLE` prints, so the live parser
/// reads it back unchanged.
pub fn create_table_sql(table: &TableDescriptor, charset: &str) -> String {
    let mut parts: Vec<String> = table
        .columns
        .values()
        .map(|col| format!("\t`{}` {}", col.name, col))
        .collect();

    if !table.primary_keys.is_empty() {
        let keys: Vec<String> = table
            .primary_keys
            .iter()
            .map(|k| format!("`{}`", k))
            .collect();
        parts.push(format!("\tPRIMARY KEY ({})", keys.join(",")));
    }

    for (name, columns) in &table.indexes {
        let quoted: Vec<String> = columns.split(',').map(|c| format!("`{}`", c)).collect();
        parts.push(format!("\tKEY `{}` ({})", name, quoted.join(",")));
    }

    format!(
        "CREATE TABLE IF NOT EXISTS `{}` (\n{}\n) ENGINE=InnoDB DEFAULT CHARSET={}",
        table.name,
        parts.join(",\n"),
        charset
    )
}
