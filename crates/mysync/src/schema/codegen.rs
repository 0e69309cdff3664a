use super::{Schema, create_table_sql};

/// Generate a script creating every table of the schema, in schema order.
///
/// Useful to bootstrap an empty database by hand or to review what the
/// declared models amount to.
pub fn schema_to_sql(schema: &Schema, charset: &str) -> String {
    let mut sql = String::new();
    for table in schema.iter_tables() {
        sql.push_str(&create_table_sql(table, charset));
        sql.push_str(";\n\n");
    }
    sql.trim_end().to_string()
}
