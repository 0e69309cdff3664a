//! Live schema introspection.
//!
//! Reads `SHOW CREATE TABLE` output and turns it into [`TableDescriptor`]s.
//! The grammar is the server's own rendering:
//!
//! ```text
//! CREATE TABLE `student` (
//!   `id` varchar(45) NOT NULL,
//!   `name` varchar(50) DEFAULT NULL,
//!   `score` decimal(10,2) DEFAULT NULL,
//!   PRIMARY KEY (`id`),
//!   KEY `idx_student_name` (`name`)
//! ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4
//! ```
//!
//! Anything the parser does not understand is an error. Silently skipping a
//! line could hide a column or index and turn into a destructive drop later.

use crate::{Connection, ConnectionExt, Error, Result};
use mysync_schema::{Column, ColumnConstraint, ColumnType, Schema, TableDescriptor};

/// Constraint lines the engine does not manage. They are recognized and skipped.
const UNMANAGED_PREFIXES: &[&str] = &[
    "UNIQUE KEY",
    "UNIQUE INDEX",
    "FULLTEXT KEY",
    "SPATIAL KEY",
    "CONSTRAINT",
    "FOREIGN KEY",
    "CHECK",
];

/// Parse one `SHOW CREATE TABLE` rendering.
pub fn parse_create_table(text: &str) -> Result<TableDescriptor> {
    let mut parser = LiveParser::default();
    for (idx, raw) in text.lines().enumerate() {
        parser.line = idx + 1;
        parser.feed(raw.trim())?;
    }
    parser.finish()
}

/// Parse several renderings into one schema.
pub fn parse_schema<'a>(texts: impl IntoIterator<Item = &'a str>) -> Result<Schema> {
    let mut schema = Schema::new();
    for text in texts {
        schema.insert(parse_create_table(text)?);
    }
    Ok(schema)
}

/// Fetch `(table name, CREATE TABLE text)` for every base table of the
/// current database.
pub async fn fetch_create_statements<C: Connection + ?Sized>(
    conn: &C,
) -> Result<Vec<(String, String)>> {
    let conn = conn.traced();
    let tables = conn
        .fetch_text("SHOW FULL TABLES WHERE Table_type = 'BASE TABLE'")
        .await?;

    let mut statements = Vec::with_capacity(tables.len());
    for row in tables {
        let Some(name) = row.into_iter().next() else {
            continue;
        };
        let rows = conn
            .fetch_text(&format!("SHOW CREATE TABLE `{}`", name))
            .await?;
        let text = rows
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().nth(1))
            .ok_or_else(|| Error::Parse {
                table: Some(name.clone()),
                line: 0,
                reason: "SHOW CREATE TABLE returned no definition".to_string(),
            })?;
        tracing::debug!(table = %name, "fetched live table definition");
        statements.push((name, text));
    }
    Ok(statements)
}

/// Fetch and parse the live schema.
pub async fn live_schema<C: Connection + ?Sized>(conn: &C) -> Result<Schema> {
    let statements = fetch_create_statements(conn).await?;
    parse_schema(statements.iter().map(|(_, text)| text.as_str()))
}

#[derive(Default)]
struct LiveParser {
    table: Option<TableDescriptor>,
    closed: bool,
    line: usize,
}

impl LiveParser {
    fn fail(&self, reason: impl Into<String>) -> Error {
        Error::Parse {
            table: self.table.as_ref().map(|t| t.name.clone()),
            line: self.line,
            reason: reason.into(),
        }
    }

    fn feed(&mut self, line: &str) -> Result<()> {
        // Table options and partition clauses follow the closing parenthesis.
        if line.is_empty() || self.closed {
            return Ok(());
        }

        let upper = line.to_ascii_uppercase();
        if upper.starts_with("CREATE TABLE") {
            return self.header(line);
        }
        if self.table.is_none() {
            return Err(self.fail("expected a CREATE TABLE header"));
        }

        if line.starts_with('`') {
            self.column(line)
        } else if upper.starts_with("PRIMARY KEY") {
            self.primary_key(line)
        } else if upper.starts_with("KEY ") || upper.starts_with("INDEX ") {
            self.index(line)
        } else if line.starts_with(')') {
            self.closed = true;
            Ok(())
        } else if UNMANAGED_PREFIXES.iter().any(|p| upper.starts_with(p)) {
            tracing::debug!(line = %line, "skipping unmanaged constraint");
            Ok(())
        } else {
            Err(self.fail(format!("unrecognized line `{}`", line)))
        }
    }

    fn header(&mut self, line: &str) -> Result<()> {
        if self.table.is_some() {
            return Err(self.fail("second CREATE TABLE header"));
        }
        let (Some(start), Some(end)) = (line.find('`'), line.rfind('`')) else {
            return Err(self.fail("table name is not backtick-quoted"));
        };
        if end <= start + 1 {
            return Err(self.fail("empty table name"));
        }
        self.table = Some(TableDescriptor::new(&line[start + 1..end]));
        Ok(())
    }

    fn column(&mut self, line: &str) -> Result<()> {
        let rest = &line[1..];
        let Some(close) = rest.find('`') else {
            return Err(self.fail("unterminated column name"));
        };
        let name = &rest[..close];
        if name.is_empty() {
            return Err(self.fail("empty column name"));
        }

        let (raw_type, constraint) = split_type(rest[close + 1..].trim_start());
        if raw_type.is_empty() {
            return Err(self.fail(format!("column `{}` has no type", name)));
        }

        let column = Column::new(
            name,
            ColumnType::from_sql(raw_type),
            ColumnConstraint::new(constraint),
        );
        let pushed = self.table.as_mut().is_some_and(|t| t.push_column(column));
        if !pushed {
            return Err(self.fail(format!("duplicate column `{}`", name)));
        }
        Ok(())
    }

    fn primary_key(&mut self, line: &str) -> Result<()> {
        let Some(list) = paren_list(line) else {
            return Err(self.fail("PRIMARY KEY without a column list"));
        };
        let keys: Vec<String> = list
            .split(',')
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        if keys.is_empty() {
            return Err(self.fail("empty PRIMARY KEY column list"));
        }

        let unknown = self
            .table
            .as_ref()
            .and_then(|t| keys.iter().find(|k| t.column(k).is_none()).cloned());
        if let Some(key) = unknown {
            return Err(self.fail(format!("primary key column `{}` is not declared", key)));
        }

        if let Some(table) = self.table.as_mut() {
            for key in keys {
                table.add_primary_key(key);
            }
        }
        Ok(())
    }

    fn index(&mut self, line: &str) -> Result<()> {
        let Some(open) = line.find('(') else {
            return Err(self.fail("KEY without a column list"));
        };
        let name = line[..open]
            .split_once(char::is_whitespace)
            .map(|(_, name)| name.trim().trim_matches('`'))
            .unwrap_or_default();
        if name.is_empty() {
            return Err(self.fail("KEY without a name"));
        }
        let columns: String = paren_list(line)
            .unwrap_or_default()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        if columns.is_empty() {
            return Err(self.fail(format!("index `{}` has no columns", name)));
        }

        let added = self
            .table
            .as_mut()
            .is_some_and(|t| t.add_named_index(columns, name));
        if !added {
            return Err(self.fail(format!("duplicate index `{}`", name)));
        }
        Ok(())
    }

    fn finish(self) -> Result<TableDescriptor> {
        match self.table {
            Some(table) => Ok(table),
            None => Err(self.fail("no CREATE TABLE header found")),
        }
    }
}

/// Split a column definition into the raw type and the remaining constraint
/// text. The type ends at the first whitespace or comma outside parentheses.
fn split_type(def: &str) -> (&str, &str) {
    let mut depth = 0i32;
    for (i, c) in def.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            c if depth <= 0 && (c.is_whitespace() || c == ',') => return (&def[..i], &def[i..]),
            _ => {}
        }
    }
    (def, "")
}

/// Contents between the first `(` and the last `)`, backticks removed.
fn paren_list(line: &str) -> Option<String> {
    let start = line.find('(')?;
    let end = line.rfind(')')?;
    (end > start).then(|| line[start + 1..end].replace('`', ""))
}
