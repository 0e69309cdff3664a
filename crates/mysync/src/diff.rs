//! Schema diffing - compare the declared schema against the live one.
//!
//! [`compute_diff`] classifies every table as *create*, *drop* or *compare*.
//! Tables on both sides get a [`ColumnDiff`], which the DDL layer turns into
//! an ordered `ALTER TABLE` sequence.
//!
//! ## Changed columns
//!
//! A column whose canonical type or constraint differs between the two sides
//! is never altered in place. It is dropped and added back with the declared
//! definition, which discards the data it held. Dropping the column also takes
//! it out of every key it was part of, so the primary key and the indexes over
//! it are rebuilt around it.
//!
//! ## Primary keys
//!
//! MySQL can only drop a primary key as a whole. As soon as the live key
//! contains a column the declared key does not, the whole key is dropped and
//! the declared set is added back:
//!
//! ```text
//! declared {a}     live {a, b}  ->  DROP PRIMARY KEY, ADD PRIMARY KEY (a)
//! declared {a, b}  live {a}     ->  ADD PRIMARY KEY (a, b)
//! ```

use crate::schema::create_table_sql;
use mysync_schema::{Column, Schema, TableDescriptor, primary_key_name};
use std::collections::HashSet;
use std::fmt;

/// Result of comparing a declared schema with a live one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableDiff {
    /// Declared tables missing from the database, sorted by name.
    pub tables_to_create: Vec<TableDescriptor>,
    /// Live tables no model declares, sorted by name.
    pub tables_to_drop: Vec<String>,
    /// One entry per table present on both sides, sorted by table name.
    /// Entries with no changes are kept.
    pub column_diffs: Vec<ColumnDiff>,
}

/// Differences within one table present on both sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDiff {
    pub table_name: String,
    /// Declared columns missing from the database, in declaration order.
    pub columns_to_add: Vec<Column>,
    /// Live columns no longer declared, in live order.
    pub columns_to_drop: Vec<String>,
    pub indexes_to_add: Vec<IndexRef>,
    /// Carries the live index name, whatever it is.
    pub indexes_to_drop: Vec<IndexRef>,
    pub primary_key_replacement: Option<PrimaryKeyReplacement>,
    pub columns_changed: Vec<ColumnChange>,
}

/// An index, identified by the column list it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRef {
    /// Indexed column list, comma-separated for composite live indexes.
    pub columns: String,
    pub name: String,
}

impl IndexRef {
    pub fn new(columns: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            columns: columns.into(),
            name: name.into(),
        }
    }
}

/// How the primary key has to be rebuilt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKeyReplacement {
    /// The full declared key. Added back only when non-empty.
    pub new_keys: Vec<String>,
    /// Whether the live key must be dropped first.
    pub must_drop_existing: bool,
}

/// A column whose definition differs between the two sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnChange {
    pub name: String,
    /// Live definition.
    pub before: Column,
    /// Declared definition.
    pub after: Column,
}

/// A single DDL statement, in structured form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// Create a missing table.
    CreateTable(TableDescriptor),
    /// Drop an undeclared table.
    DropTable(String),
    /// Drop an index by its live name.
    DropIndex(String),
    /// Drop the whole primary key.
    DropPrimaryKey,
    /// Drop a column.
    DropColumn(String),
    /// Add a column with its full definition.
    AddColumn(Column),
    /// Add a primary key over these columns.
    AddPrimaryKey(Vec<String>),
    /// Add an index.
    AddIndex(IndexRef),
}

impl Change {
    /// Render this change as a single statement, without a terminator.
    ///
    /// `charset` is only used by [`Change::CreateTable`].
    pub fn to_sql(&self, table_name: &str, charset: &str) -> String {
        match self {
            Change::CreateTable(table) => create_table_sql(table, charset),
            Change::DropTable(name) => format!("DROP TABLE {}", name),
            Change::DropIndex(name) => {
                format!("ALTER TABLE {} DROP INDEX {}", table_name, name)
            }
            Change::DropPrimaryKey => format!("ALTER TABLE {} DROP PRIMARY KEY", table_name),
            Change::DropColumn(name) => {
                format!("ALTER TABLE {} DROP COLUMN {}", table_name, name)
            }
            Change::AddColumn(col) => {
                format!("ALTER TABLE {} ADD COLUMN {} {}", table_name, col.name, col)
            }
            Change::AddPrimaryKey(keys) => format!(
                "ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY ({})",
                table_name,
                primary_key_name(table_name),
                keys.join(", ")
            ),
            Change::AddIndex(index) => format!(
                "ALTER TABLE {} ADD INDEX {} ({})",
                table_name,
                index.name,
                quote_column_list(&index.columns)
            ),
        }
    }
}

/// `a,b` -> `` `a`, `b` ``
fn quote_column_list(columns: &str) -> String {
    columns
        .split(',')
        .map(|c| format!("`{}`", c))
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::CreateTable(t) => write!(f, "+ table {}", t.name),
            Change::DropTable(name) => write!(f, "- table {}", name),
            Change::DropIndex(name) => write!(f, "- INDEX {}", name),
            Change::DropPrimaryKey => write!(f, "- PRIMARY KEY"),
            Change::DropColumn(name) => write!(f, "- {}", name),
            Change::AddColumn(col) => write!(f, "+ {}: {}", col.name, col),
            Change::AddPrimaryKey(keys) => write!(f, "+ PRIMARY KEY ({})", keys.join(", ")),
            Change::AddIndex(index) => write!(f, "+ INDEX {} ({})", index.name, index.columns),
        }
    }
}

/// Compare the declared schema against the live one.
///
/// Pure: no database access, and the result does not depend on the order
/// tables were inserted into either schema.
///
/// # Example
///
/// ```ignore
/// let desired = Schema::collect()?;
/// let actual = mysync::introspect::live_schema(&pool).await?;
/// let diff = mysync::compute_diff(&desired, &actual);
///
/// if diff.is_empty() {
///     println!("Schemas match!");
/// } else {
///     print!("{}", diff);
/// }
/// ```
pub fn compute_diff(desired: &Schema, actual: &Schema) -> TableDiff {
    let mut diff = TableDiff::default();

    for table in desired.iter_tables() {
        match actual.get_table(&table.name) {
            Some(live) => diff.column_diffs.push(ColumnDiff::between(table, live)),
            None => diff.tables_to_create.push(table.clone()),
        }
    }

    for table in actual.iter_tables() {
        if desired.get_table(&table.name).is_none() {
            diff.tables_to_drop.push(table.name.clone());
        }
    }

    // Sort by table name for consistent output
    diff.tables_to_create.sort_by(|a, b| a.name.cmp(&b.name));
    diff.tables_to_drop.sort();
    diff.column_diffs
        .sort_by(|a, b| a.table_name.cmp(&b.table_name));

    diff
}

impl TableDiff {
    /// Returns true if applying this diff would change nothing.
    pub fn is_empty(&self) -> bool {
        self.tables_to_create.is_empty()
            && self.tables_to_drop.is_empty()
            && self.column_diffs.iter().all(ColumnDiff::is_empty)
    }

    /// Count total number of changes.
    pub fn change_count(&self) -> usize {
        self.tables_to_create.len()
            + self.tables_to_drop.len()
            + self
                .column_diffs
                .iter()
                .map(ColumnDiff::change_count)
                .sum::<usize>()
    }

    /// Changes grouped by table, sorted by table name. Tables without
    /// changes are left out.
    pub fn changes_by_table(&self) -> Vec<(String, Vec<Change>)> {
        let mut grouped: Vec<(String, Vec<Change>)> = self
            .tables_to_create
            .iter()
            .map(|t| (t.name.clone(), vec![Change::CreateTable(t.clone())]))
            .chain(
                self.tables_to_drop
                    .iter()
                    .map(|name| (name.clone(), vec![Change::DropTable(name.clone())])),
            )
            .chain(
                self.column_diffs
                    .iter()
                    .filter(|d| !d.is_empty())
                    .map(|d| (d.table_name.clone(), d.changes())),
            )
            .collect();
        grouped.sort_by(|a, b| a.0.cmp(&b.0));
        grouped
    }

    /// Every statement, in execution order: creates, then drops, then each
    /// table's ALTER sequence.
    pub fn statements(&self, charset: &str) -> Vec<String> {
        let creates = self
            .tables_to_create
            .iter()
            .map(|t| create_table_sql(t, charset));
        let drops = self
            .tables_to_drop
            .iter()
            .map(|name| Change::DropTable(name.clone()).to_sql(name, charset));
        let alters = self.column_diffs.iter().flat_map(ColumnDiff::to_sql);
        creates.chain(drops).chain(alters).collect()
    }

    /// Render the diff as a reviewable SQL script, in execution order.
    pub fn to_sql_script(&self, charset: &str) -> String {
        let mut sql = String::new();
        for table in &self.tables_to_create {
            sql.push_str(&format!("-- Table: {}\n", table.name));
            sql.push_str(&create_table_sql(table, charset));
            sql.push_str(";\n\n");
        }
        for name in &self.tables_to_drop {
            sql.push_str(&format!("-- Table: {}\n", name));
            sql.push_str(&Change::DropTable(name.clone()).to_sql(name, charset));
            sql.push_str(";\n\n");
        }
        for diff in self.column_diffs.iter().filter(|d| !d.is_empty()) {
            sql.push_str(&format!("-- Table: {}\n", diff.table_name));
            for statement in diff.to_sql() {
                sql.push_str(&statement);
                sql.push_str(";\n");
            }
            sql.push('\n');
        }
        sql
    }
}

impl ColumnDiff {
    /// Compute the differences between the declared and the live version of
    /// one table.
    ///
    /// # Panics
    ///
    /// Panics if the two descriptors do not describe the same table. Callers
    /// pair tables by name, so a mismatch is a bug.
    pub fn between(desired: &TableDescriptor, actual: &TableDescriptor) -> Self {
        assert_eq!(
            desired.name, actual.name,
            "column diff between two different tables"
        );

        let (columns_to_add, columns_to_drop) = diff_column_names(desired, actual);
        let columns_changed = diff_definitions(desired, actual);

        let changed: HashSet<&str> = columns_changed.iter().map(|c| c.name.as_str()).collect();
        let (indexes_to_add, indexes_to_drop) = diff_indexes(desired, actual, &changed);

        ColumnDiff {
            table_name: desired.name.clone(),
            columns_to_add,
            columns_to_drop,
            indexes_to_add,
            indexes_to_drop,
            primary_key_replacement: diff_primary_key(desired, actual, &changed),
            columns_changed,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns_to_add.is_empty()
            && self.columns_to_drop.is_empty()
            && self.indexes_to_add.is_empty()
            && self.indexes_to_drop.is_empty()
            && self.primary_key_replacement.is_none()
            && self.columns_changed.is_empty()
    }

    pub fn change_count(&self) -> usize {
        self.columns_to_add.len()
            + self.columns_to_drop.len()
            + self.indexes_to_add.len()
            + self.indexes_to_drop.len()
            + self.columns_changed.len()
            + usize::from(self.primary_key_replacement.is_some())
    }

    /// The ALTER sequence for this table, in the only order MySQL accepts
    /// for every combination:
    ///
    /// 1. drop indexes
    /// 2. drop the primary key, if it must go
    /// 3. drop columns
    /// 4. drop then re-add each changed column
    /// 5. add columns
    /// 6. add the primary key, if the declared key is non-empty
    /// 7. add indexes
    pub fn changes(&self) -> Vec<Change> {
        let mut changes = Vec::new();

        for index in &self.indexes_to_drop {
            changes.push(Change::DropIndex(index.name.clone()));
        }

        if self.must_drop_primary_key() {
            changes.push(Change::DropPrimaryKey);
        }

        for name in &self.columns_to_drop {
            changes.push(Change::DropColumn(name.clone()));
        }

        for change in &self.columns_changed {
            changes.push(Change::DropColumn(change.name.clone()));
            changes.push(Change::AddColumn(change.after.clone()));
        }

        for column in &self.columns_to_add {
            changes.push(Change::AddColumn(column.clone()));
        }

        if let Some(keys) = self.primary_key_to_add() {
            changes.push(Change::AddPrimaryKey(keys.to_vec()));
        }

        for index in &self.indexes_to_add {
            changes.push(Change::AddIndex(index.clone()));
        }

        changes
    }

    fn must_drop_primary_key(&self) -> bool {
        self.primary_key_replacement
            .as_ref()
            .is_some_and(|pk| pk.must_drop_existing)
    }

    fn primary_key_to_add(&self) -> Option<&[String]> {
        self.primary_key_replacement
            .as_ref()
            .map(|pk| pk.new_keys.as_slice())
            .filter(|keys| !keys.is_empty())
    }

    /// Render [`ColumnDiff::changes`] as statements.
    pub fn to_sql(&self) -> Vec<String> {
        self.changes()
            .iter()
            .map(|change| change.to_sql(&self.table_name, ""))
            .collect()
    }
}

/// Added columns in declared order, dropped columns in live order.
fn diff_column_names(
    desired: &TableDescriptor,
    actual: &TableDescriptor,
) -> (Vec<Column>, Vec<String>) {
    let desired_names: HashSet<&str> = desired.column_names().collect();
    let actual_names: HashSet<&str> = actual.column_names().collect();

    let to_add = desired
        .columns
        .values()
        .filter(|c| !actual_names.contains(c.name.as_str()))
        .cloned()
        .collect();

    let to_drop = actual
        .column_names()
        .filter(|name| !desired_names.contains(name))
        .map(str::to_string)
        .collect();

    (to_add, to_drop)
}

/// Indexes are compared by the column list they cover, not by name. An index
/// over a changed column is dropped and added back.
fn diff_indexes(
    desired: &TableDescriptor,
    actual: &TableDescriptor,
    changed: &HashSet<&str>,
) -> (Vec<IndexRef>, Vec<IndexRef>) {
    let touches_changed = |columns: &str| columns.split(',').any(|c| changed.contains(c));

    let to_add = desired
        .indexes
        .iter()
        .filter(|(_, columns)| {
            !actual.has_index_on(columns.as_str()) || touches_changed(columns.as_str())
        })
        .map(|(name, columns)| IndexRef::new(columns.as_str(), name.as_str()))
        .collect();

    let to_drop = actual
        .indexes
        .iter()
        .filter(|(_, columns)| {
            !desired.has_index_on(columns.as_str()) || touches_changed(columns.as_str())
        })
        .map(|(name, columns)| IndexRef::new(columns.as_str(), name.as_str()))
        .collect();

    (to_add, to_drop)
}

/// A live key that loses a column, either because the declared key no longer
/// has it or because the column is changed, has to be dropped as a whole.
fn diff_primary_key(
    desired: &TableDescriptor,
    actual: &TableDescriptor,
    changed: &HashSet<&str>,
) -> Option<PrimaryKeyReplacement> {
    let removed = actual
        .primary_keys
        .iter()
        .any(|k| !desired.primary_keys.contains(k) || changed.contains(k.as_str()));
    let added = desired
        .primary_keys
        .iter()
        .any(|k| !actual.primary_keys.contains(k));

    if !removed && !added {
        return None;
    }

    Some(PrimaryKeyReplacement {
        new_keys: desired.primary_keys.iter().cloned().collect(),
        must_drop_existing: removed,
    })
}

/// Columns on both sides whose canonical type or constraint differ.
fn diff_definitions(desired: &TableDescriptor, actual: &TableDescriptor) -> Vec<ColumnChange> {
    desired
        .columns
        .values()
        .filter_map(|declared| {
            let live = actual.column(&declared.name)?;
            let differs = declared.ty.to_string() != live.ty.to_string()
                || declared.constraint != live.constraint;
            differs.then(|| ColumnChange {
                name: declared.name.clone(),
                before: live.clone(),
                after: declared.clone(),
            })
        })
        .collect()
}

impl fmt::Display for ColumnDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  {}:", self.table_name)?;
        for index in &self.indexes_to_drop {
            writeln!(f, "    - INDEX {} ({})", index.name, index.columns)?;
        }
        if self.must_drop_primary_key() {
            writeln!(f, "    - PRIMARY KEY")?;
        }
        for name in &self.columns_to_drop {
            writeln!(f, "    - {}", name)?;
        }
        for change in &self.columns_changed {
            writeln!(f, "    ~ {}: {} -> {}", change.name, change.before, change.after)?;
        }
        for column in &self.columns_to_add {
            writeln!(f, "    + {}: {}", column.name, column)?;
        }
        if let Some(keys) = self.primary_key_to_add() {
            writeln!(f, "    + PRIMARY KEY ({})", keys.join(", "))?;
        }
        for index in &self.indexes_to_add {
            writeln!(f, "    + INDEX {} ({})", index.name, index.columns)?;
        }
        Ok(())
    }
}

impl fmt::Display for TableDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "No changes detected.");
        }

        writeln!(f, "Changes detected:\n")?;
        for table in &self.tables_to_create {
            writeln!(f, "  {}:", table.name)?;
            writeln!(f, "    + table")?;
        }
        for name in &self.tables_to_drop {
            writeln!(f, "  {}:", name)?;
            writeln!(f, "    - table")?;
        }
        for diff in self.column_diffs.iter().filter(|d| !d.is_empty()) {
            write!(f, "{}", diff)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mysync_schema::{ColumnConstraint, ColumnType};

    fn make_column(name: &str, ty: ColumnType, constraint: &str) -> Column {
        Column::new(name, ty, ColumnConstraint::new(constraint))
    }

    fn make_table(name: &str, columns: Vec<Column>, keys: &[&str]) -> TableDescriptor {
        let mut table = TableDescriptor::new(name);
        for column in columns {
            table.push_column(column);
        }
        for key in keys {
            table.add_primary_key(*key);
        }
        table
    }

    fn schema(tables: Vec<TableDescriptor>) -> Schema {
        let mut schema = Schema::new();
        for table in tables {
            schema.insert(table);
        }
        schema
    }

    fn keyed(name: &str, keys: &[&str]) -> TableDescriptor {
        let columns = ["a", "b", "c"]
            .iter()
            .map(|c| make_column(c, ColumnType::Int, "not null"))
            .collect();
        make_table(name, columns, keys)
    }

    fn student_desired() -> TableDescriptor {
        make_table(
            "student",
            vec![
                make_column("id", ColumnType::Varchar(45), "not null"),
                make_column("name", ColumnType::Varchar(50), "default null"),
                make_column(
                    "score",
                    ColumnType::Decimal {
                        precision: 10,
                        scale: 2,
                    },
                    "default null",
                ),
            ],
            &["id"],
        )
    }

    fn student_actual() -> TableDescriptor {
        make_table(
            "student",
            vec![
                make_column("id", ColumnType::Varchar(45), "not null"),
                make_column("name", ColumnType::Varchar(45), "default null"),
            ],
            &["id"],
        )
    }

    #[test]
    fn test_diff_empty_schemas() {
        let diff = compute_diff(&Schema::new(), &Schema::new());
        assert!(diff.is_empty());
        assert_eq!(diff.change_count(), 0);
        assert_eq!(diff.to_string(), "No changes detected.\n");
    }

    #[test]
    fn test_diff_create_and_drop_table() {
        let desired = schema(vec![student_desired()]);
        let actual = schema(vec![keyed("legacy", &["a"])]);
        let diff = compute_diff(&desired, &actual);

        assert_eq!(diff.tables_to_create.len(), 1);
        assert_eq!(diff.tables_to_create[0].name, "student");
        assert_eq!(diff.tables_to_drop, vec!["legacy"]);
        assert!(diff.column_diffs.is_empty());
        assert_eq!(diff.change_count(), 2);
    }

    #[test]
    fn test_student_end_to_end() {
        let diff = ColumnDiff::between(&student_desired(), &student_actual());

        assert_eq!(
            diff.columns_to_add,
            vec![make_column(
                "score",
                ColumnType::Decimal {
                    precision: 10,
                    scale: 2
                },
                "default null"
            )]
        );
        assert_eq!(diff.columns_changed.len(), 1);
        assert_eq!(diff.columns_changed[0].name, "name");
        assert_eq!(diff.columns_changed[0].before.to_string(), "varchar(45) default null");
        assert_eq!(diff.columns_changed[0].after.to_string(), "varchar(50) default null");
        assert!(diff.columns_to_drop.is_empty());
        assert!(diff.indexes_to_add.is_empty());
        assert!(diff.indexes_to_drop.is_empty());
        assert!(diff.primary_key_replacement.is_none());

        assert_eq!(
            diff.to_sql(),
            vec![
                "ALTER TABLE student DROP COLUMN name",
                "ALTER TABLE student ADD COLUMN name varchar(50) default null",
                "ALTER TABLE student ADD COLUMN score decimal(10,2) default null",
            ]
        );
    }

    #[test]
    fn test_primary_key_superset_adds_without_drop() {
        let diff = ColumnDiff::between(&keyed("t", &["a", "b"]), &keyed("t", &["a"]));
        assert_eq!(
            diff.primary_key_replacement,
            Some(PrimaryKeyReplacement {
                new_keys: vec!["a".to_string(), "b".to_string()],
                must_drop_existing: false,
            })
        );
        assert_eq!(
            diff.to_sql(),
            vec!["ALTER TABLE t ADD CONSTRAINT PK_t PRIMARY KEY (a, b)"]
        );
    }

    #[test]
    fn test_primary_key_shrink_drops_whole_key() {
        let diff = ColumnDiff::between(&keyed("t", &["a"]), &keyed("t", &["a", "b"]));
        assert_eq!(
            diff.primary_key_replacement,
            Some(PrimaryKeyReplacement {
                new_keys: vec!["a".to_string()],
                must_drop_existing: true,
            })
        );
        assert_eq!(
            diff.to_sql(),
            vec![
                "ALTER TABLE t DROP PRIMARY KEY",
                "ALTER TABLE t ADD CONSTRAINT PK_t PRIMARY KEY (a)",
            ]
        );
    }

    #[test]
    fn test_primary_key_removed_entirely() {
        let diff = ColumnDiff::between(&keyed("t", &[]), &keyed("t", &["a"]));
        let pk = diff.primary_key_replacement.clone().unwrap();
        assert!(pk.must_drop_existing);
        assert!(pk.new_keys.is_empty());
        assert_eq!(diff.to_sql(), vec!["ALTER TABLE t DROP PRIMARY KEY"]);
    }

    #[test]
    fn test_primary_key_rename_drops_and_re_adds() {
        let diff = ColumnDiff::between(&keyed("t", &["b"]), &keyed("t", &["a"]));
        let pk = diff.primary_key_replacement.unwrap();
        assert!(pk.must_drop_existing);
        assert_eq!(pk.new_keys, vec!["b"]);
    }

    #[test]
    fn test_index_diff_uses_live_names() {
        let mut desired = keyed("t", &[]);
        desired.add_index("b");
        let mut actual = keyed("t", &[]);
        actual.add_named_index("a", "legacy_a");

        let diff = ColumnDiff::between(&desired, &actual);
        assert_eq!(diff.indexes_to_add, vec![IndexRef::new("b", "idx_t_b")]);
        assert_eq!(diff.indexes_to_drop, vec![IndexRef::new("a", "legacy_a")]);
        assert_eq!(
            diff.to_sql(),
            vec![
                "ALTER TABLE t DROP INDEX legacy_a",
                "ALTER TABLE t ADD INDEX idx_t_b (`b`)",
            ]
        );
    }

    #[test]
    fn test_changed_key_column_rebuilds_primary_key() {
        let desired = make_table(
            "t",
            vec![make_column("id", ColumnType::Bigint, "not null")],
            &["id"],
        );
        let actual = make_table(
            "t",
            vec![make_column("id", ColumnType::Int, "not null")],
            &["id"],
        );

        let diff = ColumnDiff::between(&desired, &actual);
        assert_eq!(
            diff.primary_key_replacement,
            Some(PrimaryKeyReplacement {
                new_keys: vec!["id".to_string()],
                must_drop_existing: true,
            })
        );
        assert_eq!(
            diff.to_sql(),
            vec![
                "ALTER TABLE t DROP PRIMARY KEY",
                "ALTER TABLE t DROP COLUMN id",
                "ALTER TABLE t ADD COLUMN id bigint not null",
                "ALTER TABLE t ADD CONSTRAINT PK_t PRIMARY KEY (id)",
            ]
        );
    }

    #[test]
    fn test_changed_indexed_column_rebuilds_its_indexes() {
        let mut desired = make_table(
            "t",
            vec![
                make_column("a", ColumnType::Int, "not null"),
                make_column("b", ColumnType::Varchar(20), "default null"),
            ],
            &[],
        );
        desired.add_index("a");
        desired.add_index("b");

        let mut actual = make_table(
            "t",
            vec![
                make_column("a", ColumnType::Int, "not null"),
                make_column("b", ColumnType::Varchar(10), "default null"),
            ],
            &[],
        );
        actual.add_index("a");
        actual.add_named_index("b", "k_b");
        actual.add_named_index("a,b", "k_ab");

        let diff = ColumnDiff::between(&desired, &actual);
        assert_eq!(
            diff.to_sql(),
            vec![
                "ALTER TABLE t DROP INDEX k_b",
                "ALTER TABLE t DROP INDEX k_ab",
                "ALTER TABLE t DROP COLUMN b",
                "ALTER TABLE t ADD COLUMN b varchar(20) default null",
                "ALTER TABLE t ADD INDEX idx_t_b (`b`)",
            ]
        );
    }

    #[test]
    fn test_duplicate_live_indexes_are_all_dropped() {
        let desired = keyed("t", &[]);
        let mut actual = keyed("t", &[]);
        actual.add_named_index("a", "k1");
        actual.add_named_index("a", "k2");

        let diff = ColumnDiff::between(&desired, &actual);
        assert_eq!(
            diff.to_sql(),
            vec!["ALTER TABLE t DROP INDEX k1", "ALTER TABLE t DROP INDEX k2"]
        );
    }

    #[test]
    fn test_full_ordering() {
        let mut desired = make_table(
            "t",
            vec![
                make_column("a", ColumnType::Int, "not null"),
                make_column("c", ColumnType::Bigint, "not null"),
                make_column("d", ColumnType::Text, ""),
            ],
            &["a", "d"],
        );
        desired.add_index("d");

        let mut actual = make_table(
            "t",
            vec![
                make_column("a", ColumnType::Int, "not null"),
                make_column("b", ColumnType::Int, "not null"),
                make_column("c", ColumnType::Int, "not null"),
            ],
            &["a", "b"],
        );
        actual.add_index("b");

        let diff = ColumnDiff::between(&desired, &actual);
        assert_eq!(
            diff.to_sql(),
            vec![
                "ALTER TABLE t DROP INDEX idx_t_b",
                "ALTER TABLE t DROP PRIMARY KEY",
                "ALTER TABLE t DROP COLUMN b",
                "ALTER TABLE t DROP COLUMN c",
                "ALTER TABLE t ADD COLUMN c bigint not null",
                "ALTER TABLE t ADD COLUMN d text",
                "ALTER TABLE t ADD CONSTRAINT PK_t PRIMARY KEY (a, d)",
                "ALTER TABLE t ADD INDEX idx_t_d (`d`)",
            ]
        );
        assert_eq!(diff.change_count(), 6);
    }

    #[test]
    fn test_constraint_change_is_detected() {
        let desired = make_table("t", vec![make_column("a", ColumnType::Int, "not null")], &[]);
        let actual = make_table("t", vec![make_column("a", ColumnType::Int, "default null")], &[]);
        let diff = ColumnDiff::between(&desired, &actual);
        assert_eq!(diff.columns_changed.len(), 1);
        assert_eq!(diff.columns_changed[0].before.constraint.as_str(), "default null");
    }

    #[test]
    fn test_boolean_matches_live_tinyint() {
        let desired = make_table("t", vec![make_column("a", ColumnType::Boolean, "default 1")], &[]);
        let actual = make_table("t", vec![make_column("a", ColumnType::Tinyint, "default 1")], &[]);
        assert!(ColumnDiff::between(&desired, &actual).is_empty());
    }

    #[test]
    #[should_panic(expected = "column diff between two different tables")]
    fn test_mismatched_tables_panic() {
        ColumnDiff::between(&keyed("a", &[]), &keyed("b", &[]));
    }

    #[test]
    fn test_identical_schemas_keep_empty_column_diffs() {
        let s = schema(vec![student_desired(), keyed("other", &["a"])]);
        let diff = compute_diff(&s, &s);
        assert!(diff.is_empty());
        assert_eq!(diff.column_diffs.len(), 2);
        assert!(diff.statements("utf8mb4").is_empty());
        assert_eq!(diff.to_sql_script("utf8mb4"), "");
    }

    #[test]
    fn test_result_is_sorted_and_order_independent() {
        let forward = schema(vec![keyed("b", &[]), keyed("a", &[]), keyed("c", &[])]);
        let backward = schema(vec![keyed("c", &[]), keyed("a", &[]), keyed("b", &[])]);
        let live = schema(vec![keyed("z", &[]), keyed("c", &["a"]), keyed("y", &[])]);

        let diff = compute_diff(&forward, &live);
        assert_eq!(diff, compute_diff(&backward, &live));
        assert_eq!(
            diff.tables_to_create
                .iter()
                .map(|t| t.name.as_str())
                .collect::<Vec<_>>(),
            vec!["a", "b"]
        );
        assert_eq!(diff.tables_to_drop, vec!["y", "z"]);
    }

    #[test]
    fn test_statements_execution_order() {
        let desired = schema(vec![student_desired(), keyed("fresh", &["a"])]);
        let actual = schema(vec![student_actual(), keyed("old", &[])]);
        let statements = compute_diff(&desired, &actual).statements("utf8mb4");

        assert_eq!(statements.len(), 5);
        assert!(statements[0].starts_with("CREATE TABLE IF NOT EXISTS `fresh`"));
        assert_eq!(statements[1], "DROP TABLE old");
        assert_eq!(statements[2], "ALTER TABLE student DROP COLUMN name");
    }

    #[test]
    fn snapshot_diff_report() {
        let desired = schema(vec![student_desired(), keyed("fresh", &["a"])]);
        let actual = schema(vec![student_actual(), keyed("old", &[])]);
        let diff = compute_diff(&desired, &actual);

        insta::assert_snapshot!(diff.to_string(), @r"
        Changes detected:

          fresh:
            + table
          old:
            - table
          student:
            ~ name: varchar(45) default null -> varchar(50) default null
            + score: decimal(10,2) default null
        ");
    }

    #[test]
    fn snapshot_sql_script() {
        let desired = schema(vec![student_desired()]);
        let actual = schema(vec![student_actual(), keyed("old", &[])]);
        let diff = compute_diff(&desired, &actual);

        insta::assert_snapshot!(diff.to_sql_script("utf8mb4"), @r"
        -- Table: old
        DROP TABLE old;

        -- Table: student
        ALTER TABLE student DROP COLUMN name;
        ALTER TABLE student ADD COLUMN name varchar(50) default null;
        ALTER TABLE student ADD COLUMN score decimal(10,2) default null;
        ");
    }

    #[test]
    fn test_changes_by_table() {
        let desired = schema(vec![student_desired(), keyed("fresh", &["a"])]);
        let actual = schema(vec![student_actual(), keyed("old", &[])]);
        let grouped = compute_diff(&desired, &actual).changes_by_table();

        let names: Vec<_> = grouped.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["fresh", "old", "student"]);
        assert_eq!(grouped[1].1, vec![Change::DropTable("old".to_string())]);
        assert_eq!(
            grouped[2].1.iter().map(|c| c.to_string()).collect::<Vec<_>>(),
            vec![
                "- name",
                "+ name: varchar(50) default null",
                "+ score: decimal(10,2) default null",
            ]
        );
    }
}
