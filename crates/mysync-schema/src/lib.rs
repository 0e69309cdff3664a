//! Canonical MySQL schema types for mysync.
//!
//! Both sides of a reconciliation run end up in the same shape: the desired
//! schema (declared through [`ModelDef`]s) and the live schema (parsed from
//! `SHOW CREATE TABLE` output) are each turned into [`TableDescriptor`]s,
//! grouped into a [`Schema`], and only then compared.
//!
//! Descriptors are plain values. They are built fresh for every run and never
//! mutated once handed to the differ.

mod catalog;

pub use catalog::{ConfigurationError, FieldDef, ModelDef, ResolvedField, ScalarKind};

use indexmap::{IndexMap, IndexSet};
use std::fmt;

/// Canonical MySQL column types.
///
/// Equality is defined on the canonical rendering, so [`ColumnType::Boolean`]
/// and [`ColumnType::Tinyint`] compare equal: they are the same thing on disk.
#[derive(Debug, Clone)]
pub enum ColumnType {
    /// VARCHAR(n)
    Varchar(u32),
    /// TEXT
    Text,
    /// BLOB
    Blob,
    /// TINYINT
    Tinyint,
    /// SMALLINT
    Smallint,
    /// INT
    Int,
    /// BIGINT
    Bigint,
    /// FLOAT
    Float,
    /// DOUBLE
    Double,
    /// DECIMAL(precision, scale)
    Decimal { precision: u32, scale: u32 },
    /// DATETIME
    Datetime,
    /// Stored as TINYINT
    Boolean,
    /// A live type outside the catalog, kept verbatim (length qualifier stripped).
    Other(String),
}

impl ColumnType {
    /// Parse a raw type as rendered by the server (`varchar(45)`, `int(11)`, ...).
    ///
    /// Length qualifiers are only meaningful for `varchar` and `decimal`; on
    /// every other type they are display widths and get dropped.
    pub fn from_sql(raw: &str) -> Self {
        let raw = raw.trim().to_ascii_lowercase();
        let (base, args) = match raw.find('(') {
            Some(open) => {
                let args = raw[open + 1..]
                    .rfind(')')
                    .map(|close| &raw[open + 1..open + 1 + close]);
                (raw[..open].trim(), args)
            }
            None => (raw.as_str(), None),
        };

        match base {
            "varchar" => match args.and_then(|a| a.trim().parse().ok()) {
                Some(len) => ColumnType::Varchar(len),
                None => ColumnType::Other(raw.clone()),
            },
            "decimal" => match args.and_then(parse_precision_scale) {
                Some((precision, scale)) => ColumnType::Decimal { precision, scale },
                None => ColumnType::Other(raw.clone()),
            },
            "text" => ColumnType::Text,
            "blob" => ColumnType::Blob,
            "tinyint" => ColumnType::Tinyint,
            "bool" | "boolean" => ColumnType::Boolean,
            "smallint" => ColumnType::Smallint,
            "int" | "integer" => ColumnType::Int,
            "bigint" => ColumnType::Bigint,
            "float" => ColumnType::Float,
            "double" => ColumnType::Double,
            "datetime" => ColumnType::Datetime,
            other => ColumnType::Other(other.to_string()),
        }
    }

    /// Whether the type is exempt from the implicit `default null`.
    pub fn is_default_exempt(&self) -> bool {
        matches!(self, ColumnType::Text | ColumnType::Blob)
    }
}

fn parse_precision_scale(args: &str) -> Option<(u32, u32)> {
    match args.split_once(',') {
        Some((p, s)) => Some((p.trim().parse().ok()?, s.trim().parse().ok()?)),
        None => Some((args.trim().parse().ok()?, 0)),
    }
}

impl PartialEq for ColumnType {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for ColumnType {}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Varchar(len) => write!(f, "varchar({})", len),
            ColumnType::Text => write!(f, "text"),
            ColumnType::Blob => write!(f, "blob"),
            ColumnType::Tinyint | ColumnType::Boolean => write!(f, "tinyint"),
            ColumnType::Smallint => write!(f, "smallint"),
            ColumnType::Int => write!(f, "int"),
            ColumnType::Bigint => write!(f, "bigint"),
            ColumnType::Float => write!(f, "float"),
            ColumnType::Double => write!(f, "double"),
            ColumnType::Decimal { precision, scale } => {
                write!(f, "decimal({},{})", precision, scale)
            }
            ColumnType::Datetime => write!(f, "datetime"),
            ColumnType::Other(name) => write!(f, "{}", name),
        }
    }
}

/// Normalized constraint text of a column: nullability, default, and anything
/// else that follows the type.
///
/// Lower-cased, trimmed, whitespace runs collapsed to a single space, and a
/// trailing comma removed. The text is also brought into the shape the server
/// renders it in: `not null` moves to the front and bare default literals are
/// single-quoted, so `default 1 not null` reads `not null default '1'`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnConstraint(String);

impl ColumnConstraint {
    /// Normalize raw constraint text.
    pub fn new(raw: &str) -> Self {
        let lowered = raw.trim().trim_end_matches(',').to_lowercase();
        let mut words: Vec<String> = lowered.split_whitespace().map(str::to_string).collect();

        if let Some(at) = words.windows(2).position(|w| w[0] == "not" && w[1] == "null") {
            words.drain(at..at + 2);
            words.insert(0, "null".to_string());
            words.insert(0, "not".to_string());
        }
        for i in 1..words.len() {
            if words[i - 1] == "default" {
                words[i] = quote_default(&words[i]);
            }
        }

        Self(words.join(" "))
    }

    /// An empty constraint.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `word` appears as a whole token.
    pub fn has_token(&self, word: &str) -> bool {
        self.0.split(' ').any(|t| t == word)
    }
}

impl fmt::Display for ColumnConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Quote a bare default literal (`1`, `-0.5`, `abc`) the way the server
/// prints it. Keywords and parenthesized expressions pass through.
fn quote_default(value: &str) -> String {
    match value {
        "true" => return "'1'".to_string(),
        "false" => return "'0'".to_string(),
        _ => {}
    }
    if let Some(inner) = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .filter(|v| !v.contains('\''))
    {
        return format!("'{}'", inner);
    }
    let bare = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '.' | '_'));
    let keyword = value == "null"
        || value.starts_with("current_timestamp")
        || value.starts_with("localtimestamp");
    if bare && !keyword {
        format!("'{}'", value)
    } else {
        value.to_string()
    }
}

/// A column: name, canonical type, normalized constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
    pub constraint: ColumnConstraint,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: ColumnType, constraint: ColumnConstraint) -> Self {
        Self {
            name: name.into(),
            ty,
            constraint,
        }
    }
}

/// Renders the column definition without its name: `varchar(45) default null`.
impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.constraint.is_empty() {
            write!(f, "{}", self.ty)
        } else {
            write!(f, "{} {}", self.ty, self.constraint)
        }
    }
}

/// Canonical description of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    /// Table name
    pub name: String,
    /// Columns in declaration order, keyed by name
    pub columns: IndexMap<String, Column>,
    /// Primary-key columns
    pub primary_keys: IndexSet<String>,
    /// Index name mapped to its column list (e.g. `state`, or `a,b` for a
    /// composite live key). Two indexes may cover the same columns.
    pub indexes: IndexMap<String, String>,
}

impl TableDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: IndexMap::new(),
            primary_keys: IndexSet::new(),
            indexes: IndexMap::new(),
        }
    }

    /// Append a column. Returns `false` (and leaves the table untouched) if a
    /// column with the same name already exists.
    pub fn push_column(&mut self, column: Column) -> bool {
        if self.columns.contains_key(&column.name) {
            return false;
        }
        self.columns.insert(column.name.clone(), column);
        true
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn add_primary_key(&mut self, column: impl Into<String>) {
        self.primary_keys.insert(column.into());
    }

    /// Index a column under the conventional name `idx_<table>_<column>`.
    pub fn add_index(&mut self, column: impl Into<String>) {
        let column = column.into();
        let name = index_name(&self.name, &column);
        self.indexes.insert(name, column);
    }

    /// Index a column list under an explicit name. Returns `false` (and leaves
    /// the table untouched) if an index with that name already exists.
    pub fn add_named_index(
        &mut self,
        columns: impl Into<String>,
        name: impl Into<String>,
    ) -> bool {
        let name = name.into();
        if self.indexes.contains_key(&name) {
            return false;
        }
        self.indexes.insert(name, columns.into());
        true
    }

    /// Name of the first index over exactly `columns`.
    pub fn index_on(&self, columns: &str) -> Option<&str> {
        self.indexes
            .iter()
            .find(|(_, indexed)| indexed.as_str() == columns)
            .map(|(name, _)| name.as_str())
    }

    /// Whether some index covers exactly `columns`.
    pub fn has_index_on(&self, columns: &str) -> bool {
        self.index_on(columns).is_some()
    }
}

/// A set of tables, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    pub tables: IndexMap<String, TableDescriptor>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a table, replacing any previous table with the same name.
    pub fn insert(&mut self, table: TableDescriptor) {
        self.tables.insert(table.name.clone(), table);
    }

    pub fn get_table(&self, name: &str) -> Option<&TableDescriptor> {
        self.tables.get(name)
    }

    pub fn iter_tables(&self) -> impl Iterator<Item = &TableDescriptor> {
        self.tables.values()
    }

    /// Build the desired schema from an explicit list of models.
    pub fn from_models<'a>(
        models: impl IntoIterator<Item = &'a ModelDef>,
    ) -> Result<Self, ConfigurationError> {
        let mut schema = Schema::new();
        for model in models {
            let table = model.to_descriptor()?;
            if schema.tables.contains_key(&table.name) {
                return Err(ConfigurationError::table(
                    &table.name,
                    "declared by more than one model",
                ));
            }
            schema.insert(table);
        }
        Ok(schema)
    }

    /// Build the desired schema from every model registered with
    /// `inventory::submit!`.
    pub fn collect() -> Result<Self, ConfigurationError> {
        Self::from_models(inventory::iter::<ModelDef>)
    }
}

inventory::collect!(ModelDef);

/// Conventional index name: `idx_<table>_<column>`.
pub fn index_name(table: &str, column: &str) -> String {
    format!("idx_{}_{}", table, column)
}

/// Conventional primary-key constraint name: `PK_<table>`.
pub fn primary_key_name(table: &str) -> String {
    format!("PK_{}", table)
}

/// Convert a CamelCase identifier to snake_case.
///
/// Acronym runs stay together: `OwnerID` → `owner_id`, `HTTPServer` →
/// `http_server`. Names that are already snake_case come back unchanged.
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let boundary = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower);
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }
    out
}
