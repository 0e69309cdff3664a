//! Type catalog: declared scalar kinds and their annotations.
//!
//! A model field is a scalar kind plus an annotation string such as
//! `"length:45 primary key"` or `"index default 1 not null"`. Resolving a
//! field folds the structural tokens (`length:`, `index`, `primary key`) into
//! the type and the table's key/index sets, and leaves the rest as the
//! column's constraint text.

use crate::{Column, ColumnConstraint, ColumnType, TableDescriptor, snake_case};

/// Error raised while turning declared models into descriptors.
///
/// Always raised before any database access.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", describe(.table, .column.as_deref(), .reason))]
pub struct ConfigurationError {
    pub table: String,
    pub column: Option<String>,
    pub reason: String,
}

fn describe(table: &str, column: Option<&str>, reason: &str) -> String {
    match column {
        Some(column) => format!("table `{}`, column `{}`: {}", table, column, reason),
        None => format!("table `{}`: {}", table, reason),
    }
}

impl ConfigurationError {
    pub fn table(table: &str, reason: impl Into<String>) -> Self {
        Self {
            table: table.to_string(),
            column: None,
            reason: reason.into(),
        }
    }

    pub fn column(table: &str, column: &str, reason: impl Into<String>) -> Self {
        Self {
            table: table.to_string(),
            column: Some(column.to_string()),
            reason: reason.into(),
        }
    }
}

/// Declared scalar kinds a model field can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Varchar,
    Text,
    Blob,
    Tinyint,
    Smallint,
    Int,
    Bigint,
    Float,
    Double,
    Decimal,
    Datetime,
    Bool,
}

/// Result of resolving one field against the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedField {
    pub ty: ColumnType,
    pub constraint: ColumnConstraint,
    pub primary_key: bool,
    pub indexed: bool,
}

impl ScalarKind {
    /// Resolve this kind with its annotation.
    ///
    /// Recognized tokens: `length:<n>`, `length:<p>_<s>`, `index`,
    /// `primary key`, `not null`, `default <value>`. Everything that is not
    /// structural stays in the constraint. When neither `default` nor `null`
    /// is present, `default null` is appended, except for text/blob columns.
    /// Primary-key columns get `not null` instead, matching the server.
    ///
    /// The error is a bare reason; [`ModelDef::to_descriptor`] attaches the
    /// table and column.
    pub fn resolve(self, annotation: &str) -> Result<ResolvedField, String> {
        let lowered = annotation.to_lowercase();
        let words: Vec<&str> = lowered.split_whitespace().collect();

        let mut length = None;
        let mut primary_key = false;
        let mut indexed = false;
        let mut rest: Vec<&str> = Vec::with_capacity(words.len() + 2);

        let mut i = 0;
        while i < words.len() {
            let word = words[i];
            if let Some(value) = word.strip_prefix("length:") {
                if length.replace(value).is_some() {
                    return Err("`length:` given more than once".to_string());
                }
            } else if word == "index" {
                indexed = true;
            } else if word == "primary" && words.get(i + 1) == Some(&"key") {
                primary_key = true;
                i += 1;
            } else {
                rest.push(word);
            }
            i += 1;
        }

        let ty = self.column_type(length)?;

        let states_nullability = rest.iter().any(|w| *w == "default" || *w == "null");
        if primary_key {
            // The server forces key columns to not null.
            if !rest.contains(&"null") {
                rest.extend(["not", "null"]);
            }
        } else if !states_nullability && !ty.is_default_exempt() {
            rest.extend(["default", "null"]);
        }

        Ok(ResolvedField {
            ty,
            constraint: ColumnConstraint::new(&rest.join(" ")),
            primary_key,
            indexed,
        })
    }

    fn column_type(self, length: Option<&str>) -> Result<ColumnType, String> {
        Ok(match self {
            ScalarKind::Varchar => {
                let length = length.ok_or("varchar requires a `length:<n>` annotation")?;
                let len = length
                    .parse()
                    .map_err(|_| format!("invalid varchar length `{}`", length))?;
                ColumnType::Varchar(len)
            }
            ScalarKind::Decimal => {
                let length = length.ok_or("decimal requires a `length:<p>_<s>` annotation")?;
                let invalid = || format!("invalid decimal length `{}`", length);
                let (precision, scale) = match length.split_once('_') {
                    Some((p, s)) => (
                        p.parse::<u32>().map_err(|_| invalid())?,
                        s.parse::<u32>().map_err(|_| invalid())?,
                    ),
                    None => (length.parse::<u32>().map_err(|_| invalid())?, 0),
                };
                if !(1..=65).contains(&precision) {
                    return Err(format!("decimal precision {} is outside 1..=65", precision));
                }
                if scale > 30 || scale > precision {
                    return Err(format!(
                        "decimal scale {} must be at most 30 and at most the precision",
                        scale
                    ));
                }
                ColumnType::Decimal { precision, scale }
            }
            ScalarKind::Text => ColumnType::Text,
            ScalarKind::Blob => ColumnType::Blob,
            ScalarKind::Tinyint => ColumnType::Tinyint,
            ScalarKind::Smallint => ColumnType::Smallint,
            ScalarKind::Int => ColumnType::Int,
            ScalarKind::Bigint => ColumnType::Bigint,
            ScalarKind::Float => ColumnType::Float,
            ScalarKind::Double => ColumnType::Double,
            ScalarKind::Datetime => ColumnType::Datetime,
            ScalarKind::Bool => ColumnType::Boolean,
        })
    }
}

/// One declared field of a model.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    /// Field name; CamelCase is converted to snake_case
    pub name: &'static str,
    pub kind: ScalarKind,
    /// Annotation tokens, e.g. `"length:45 primary key"`
    pub annotation: &'static str,
}

impl FieldDef {
    pub const fn new(name: &'static str, kind: ScalarKind, annotation: &'static str) -> Self {
        Self {
            name,
            kind,
            annotation,
        }
    }
}

/// A declared table model.
///
/// Register one for [`Schema::collect`](crate::Schema::collect) with:
///
/// ```ignore
/// use mysync_schema::{FieldDef, ModelDef, ScalarKind};
///
/// inventory::submit! {
///     ModelDef::new("Student", &[
///         FieldDef::new("ID", ScalarKind::Varchar, "length:45 primary key"),
///         FieldDef::new("Name", ScalarKind::Varchar, "length:50"),
///         FieldDef::new("Score", ScalarKind::Decimal, "length:10_2"),
///     ])
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ModelDef {
    /// Table name; CamelCase is converted to snake_case
    pub table: &'static str,
    pub fields: &'static [FieldDef],
}

impl ModelDef {
    pub const fn new(table: &'static str, fields: &'static [FieldDef]) -> Self {
        Self { table, fields }
    }

    /// Turn this model into its canonical descriptor.
    pub fn to_descriptor(&self) -> Result<TableDescriptor, ConfigurationError> {
        let table_name = snake_case(self.table.trim());
        if table_name.is_empty() {
            return Err(ConfigurationError::table(self.table, "empty table name"));
        }

        let mut table = TableDescriptor::new(&table_name);
        for field in self.fields {
            let column_name = snake_case(field.name.trim());
            if column_name.is_empty() {
                return Err(ConfigurationError::column(
                    &table_name,
                    field.name,
                    "empty column name",
                ));
            }

            let resolved = field
                .kind
                .resolve(field.annotation)
                .map_err(|reason| ConfigurationError::column(&table_name, &column_name, reason))?;

            let column = Column::new(&column_name, resolved.ty, resolved.constraint);
            if !table.push_column(column) {
                return Err(ConfigurationError::column(
                    &table_name,
                    &column_name,
                    "declared more than once",
                ));
            }
            if resolved.primary_key {
                table.add_primary_key(&column_name);
            }
            if resolved.indexed {
                table.add_index(&column_name);
            }
        }
        Ok(table)
    }
}
