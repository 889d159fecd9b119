//! Target DDL emission: `CREATE TABLE`, `CREATE INDEX`, `ADD CONSTRAINT`.
//!
//! All statements are built for the MariaDB/MySQL dialect (backtick
//! quoting). Index and FK statements are emitted separately from table
//! creation so the orchestrator can defer them until after the bulk load.

use crate::dialect::Dialect;
use crate::error::FerryError;
use crate::schema::{ForeignKeyDescriptor, IndexDescriptor, TableSchema};
use crate::typemap::{target_type, translate_default};

/// Access methods the target cannot express; mapped to BTREE.
const UNSUPPORTED_ACCESS_METHODS: &[&str] = &["gin", "gist", "spgist", "brin"];

const TABLE_TRAILER: &str =
    "ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci";

/// Emit `CREATE TABLE IF NOT EXISTS` for one extracted table.
pub fn emit_create_table(schema: &TableSchema) -> Result<String, FerryError> {
    if schema.columns.is_empty() {
        return Err(FerryError::EmptySchema(schema.table.to_string()));
    }
    let d = Dialect::MySql;
    let mut lines: Vec<String> = Vec::with_capacity(schema.columns.len() + 1);

    for col in &schema.columns {
        let mut line = format!("  {} {}", d.quote_ident(&col.name), target_type(col));
        if !col.is_nullable {
            line.push_str(" NOT NULL");
        }
        // AUTO_INCREMENT columns get their value from the counter, and
        // the sequence default was dropped by translate_default anyway.
        if !col.pg_type.is_serial() {
            if let Some(default) = col.default_expr.as_deref().and_then(translate_default) {
                line.push_str(" DEFAULT ");
                line.push_str(&default);
            }
        }
        lines.push(line);
    }

    if let Some(pk) = &schema.primary_key {
        lines.push(format!("  PRIMARY KEY ({})", d.column_list(pk)));
    }

    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n) {}",
        d.qualify(&schema.table.schema_name, &schema.table.table_name),
        lines.join(",\n"),
        TABLE_TRAILER
    ))
}

/// Emit `CREATE [UNIQUE] INDEX … USING <method>` for one index.
pub fn emit_create_index(schema: &TableSchema, index: &IndexDescriptor) -> String {
    let d = Dialect::MySql;
    let method = if UNSUPPORTED_ACCESS_METHODS.contains(&index.access_method.as_str()) {
        "BTREE".to_string()
    } else {
        index.access_method.to_uppercase()
    };
    let columns = index
        .ordered_columns
        .iter()
        .map(|(name, dir)| format!("{} {}", d.quote_ident(name), dir.as_sql()))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "CREATE {}INDEX {} ON {} ({}) USING {}",
        if index.is_unique { "UNIQUE " } else { "" },
        d.quote_ident(&index.name),
        d.qualify(&schema.table.schema_name, &schema.table.table_name),
        columns,
        method
    )
}

/// Emit `ALTER TABLE … ADD CONSTRAINT … FOREIGN KEY` for one FK.
pub fn emit_add_foreign_key(schema: &TableSchema, fk: &ForeignKeyDescriptor) -> String {
    let d = Dialect::MySql;
    format!(
        "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON UPDATE {} ON DELETE {}",
        d.qualify(&schema.table.schema_name, &schema.table.table_name),
        d.quote_ident(&fk.name),
        d.column_list(&fk.local_columns),
        d.quote_ident(&fk.referenced_table),
        d.column_list(&fk.referenced_columns),
        fk.on_update.as_sql(),
        fk.on_delete.as_sql()
    )
}
