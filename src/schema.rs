//! Schema extraction from PostgreSQL catalogs.
//!
//! Everything the rest of the engine knows about a source table comes out
//! of this module: columns, primary key, secondary indexes, and foreign
//! keys, all as plain descriptor structs. The [`PgType`] tag on each
//! column is resolved here, once, so downstream row conversion never
//! inspects type names.
//!
//! The emitted [`TableSchema`] is self-consistent: every column name
//! referenced by the primary key, an index, or a foreign key appears in
//! the column list ([`TableSchema::validate`]).

use tokio_postgres::Client;
use tracing::debug;

use crate::dialect::Dialect;
use crate::error::FerryError;
use crate::typemap::PgType;

/// Identifies a source table for the duration of the run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableDescriptor {
    pub schema_name: String,
    pub table_name: String,
}

impl TableDescriptor {
    pub fn new(schema_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            schema_name: schema_name.into(),
            table_name: table_name.into(),
        }
    }

    /// Source-side qualified, quoted name.
    pub fn qualified(&self) -> String {
        Dialect::Postgres.qualify(&self.schema_name, &self.table_name)
    }
}

impl std::fmt::Display for TableDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.schema_name, self.table_name)
    }
}

/// One column, immutable once extracted.
#[derive(Debug, Clone)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Raw catalog type name (`character varying`, `ARRAY`, …).
    pub source_type_name: String,
    /// Resolved tag; the only thing the hot loop dispatches on.
    pub pg_type: PgType,
    pub character_max_length: Option<i32>,
    pub numeric_precision: Option<i32>,
    pub numeric_scale: Option<i32>,
    pub is_nullable: bool,
    /// Raw PostgreSQL-rendered default; the DDL emitter interprets it.
    pub default_expr: Option<String>,
    pub ordinal: i32,
}

/// Sort direction of one index column, from `indoption` bit 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// A secondary index (primary-key indexes are excluded at read time).
#[derive(Debug, Clone)]
pub struct IndexDescriptor {
    pub name: String,
    pub is_unique: bool,
    pub access_method: String,
    pub ordered_columns: Vec<(String, SortDirection)>,
}

/// Referential actions, normalized. Anything unrecognized becomes
/// RESTRICT, matching both engines' default behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferentialAction {
    Cascade,
    SetNull,
    SetDefault,
    Restrict,
    NoAction,
}

impl ReferentialAction {
    pub fn from_catalog(rule: &str) -> Self {
        match rule.to_uppercase().as_str() {
            "CASCADE" => ReferentialAction::Cascade,
            "SET NULL" => ReferentialAction::SetNull,
            "SET DEFAULT" => ReferentialAction::SetDefault,
            "RESTRICT" => ReferentialAction::Restrict,
            "NO ACTION" => ReferentialAction::NoAction,
            other => {
                debug!(rule = other, "unknown referential action normalized to RESTRICT");
                ReferentialAction::Restrict
            }
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::SetDefault => "SET DEFAULT",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::NoAction => "NO ACTION",
        }
    }
}

/// A foreign key constraint.
#[derive(Debug, Clone)]
pub struct ForeignKeyDescriptor {
    pub name: String,
    pub local_columns: Vec<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
    pub on_update: ReferentialAction,
    pub on_delete: ReferentialAction,
}

/// Everything known about one table.
#[derive(Debug, Clone)]
pub struct TableSchema {
    pub table: TableDescriptor,
    pub columns: Vec<ColumnDescriptor>,
    /// Ordered primary-key column names, when one exists.
    pub primary_key: Option<Vec<String>>,
    pub indexes: Vec<IndexDescriptor>,
    pub foreign_keys: Vec<ForeignKeyDescriptor>,
}

impl TableSchema {
    /// The single-column PK name, when cursor pagination is possible.
    pub fn single_column_pk(&self) -> Option<&str> {
        match &self.primary_key {
            Some(cols) if cols.len() == 1 => Some(cols[0].as_str()),
            _ => None,
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Check self-consistency: PK, index, and FK columns must all exist
    /// in the column list.
    pub fn validate(&self) -> Result<(), FerryError> {
        let missing = |name: &str| {
            FerryError::SchemaRead {
                table: self.table.to_string(),
                message: format!("referenced column {} not in column list", name),
            }
        };
        if let Some(pk) = &self.primary_key {
            for col in pk {
                if self.column(col).is_none() {
                    return Err(missing(col));
                }
            }
        }
        for idx in &self.indexes {
            for (col, _) in &idx.ordered_columns {
                if self.column(col).is_none() {
                    return Err(missing(col));
                }
            }
        }
        for fk in &self.foreign_keys {
            for col in &fk.local_columns {
                if self.column(col).is_none() {
                    return Err(missing(col));
                }
            }
        }
        Ok(())
    }
}

/// Include/exclude filtering: included-minus-excluded, exclude wins.
pub fn filter_tables(
    tables: Vec<TableDescriptor>,
    include: &[String],
    exclude: &[String],
) -> Vec<TableDescriptor> {
    tables
        .into_iter()
        .filter(|t| include.is_empty() || include.iter().any(|i| i == &t.table_name))
        .filter(|t| !exclude.iter().any(|e| e == &t.table_name))
        .collect()
}

// ── Catalog readers ────────────────────────────────────────────────────────

/// List user tables, optionally restricted to one schema, applying the
/// include/exclude rule. Falls back to `information_schema.tables` when
/// the `pg_tables` query returns nothing.
pub async fn list_tables(
    client: &Client,
    include: &[String],
    exclude: &[String],
    schema: Option<&str>,
) -> Result<Vec<TableDescriptor>, FerryError> {
    let map_err = |e: tokio_postgres::Error| FerryError::SchemaRead {
        table: "<table list>".into(),
        message: e.to_string(),
    };

    let mut sql = String::from(
        "SELECT schemaname::text, tablename::text FROM pg_catalog.pg_tables \
         WHERE schemaname NOT IN ('pg_catalog', 'information_schema') \
           AND schemaname NOT LIKE 'pg_toast%' \
           AND schemaname NOT LIKE 'pg_temp%'",
    );
    if schema.is_some() {
        sql.push_str(" AND schemaname = $1::text");
    }
    sql.push_str(" ORDER BY schemaname, tablename");

    let rows = match schema {
        Some(s) => client.query(sql.as_str(), &[&s]).await.map_err(map_err)?,
        None => client.query(sql.as_str(), &[]).await.map_err(map_err)?,
    };

    let mut tables: Vec<TableDescriptor> = rows
        .iter()
        .map(|r| TableDescriptor::new(r.get::<_, String>(0), r.get::<_, String>(1)))
        .collect();

    if tables.is_empty() {
        tables = list_tables_fallback(client, schema).await?;
    }

    Ok(filter_tables(tables, include, exclude))
}

async fn list_tables_fallback(
    client: &Client,
    schema: Option<&str>,
) -> Result<Vec<TableDescriptor>, FerryError> {
    let map_err = |e: tokio_postgres::Error| FerryError::SchemaRead {
        table: "<table list>".into(),
        message: e.to_string(),
    };

    let mut sql = String::from(
        "SELECT table_schema::text, table_name::text FROM information_schema.tables \
         WHERE table_type = 'BASE TABLE' \
           AND table_schema NOT IN ('pg_catalog', 'information_schema') \
           AND table_schema NOT LIKE 'pg_toast%' \
           AND table_schema NOT LIKE 'pg_temp%'",
    );
    if schema.is_some() {
        sql.push_str(" AND table_schema = $1::text");
    }
    sql.push_str(" ORDER BY table_schema, table_name");

    let rows = match schema {
        Some(s) => client.query(sql.as_str(), &[&s]).await.map_err(map_err)?,
        None => client.query(sql.as_str(), &[]).await.map_err(map_err)?,
    };

    Ok(rows
        .iter()
        .map(|r| TableDescriptor::new(r.get::<_, String>(0), r.get::<_, String>(1)))
        .collect())
}

/// Read the full schema of one table: columns, PK, indexes, FKs.
pub async fn read_table_schema(
    client: &Client,
    table: &TableDescriptor,
) -> Result<TableSchema, FerryError> {
    let columns = read_columns(client, table).await?;
    if columns.is_empty() {
        return Err(FerryError::EmptySchema(table.to_string()));
    }
    let primary_key = read_primary_key(client, table).await?;
    let indexes = read_indexes(client, table).await?;
    let foreign_keys = read_foreign_keys(client, table).await?;

    let schema = TableSchema {
        table: table.clone(),
        columns,
        primary_key,
        indexes,
        foreign_keys,
    };
    schema.validate()?;
    Ok(schema)
}

/// Columns from `information_schema.columns`, in ordinal order.
pub async fn read_columns(
    client: &Client,
    table: &TableDescriptor,
) -> Result<Vec<ColumnDescriptor>, FerryError> {
    let map_err = |e: tokio_postgres::Error| FerryError::SchemaRead {
        table: table.to_string(),
        message: e.to_string(),
    };

    let rows = client
        .query(
            "SELECT column_name::text, data_type::text, \
                    character_maximum_length::int4, \
                    numeric_precision::int4, numeric_scale::int4, \
                    is_nullable::text, column_default::text, \
                    ordinal_position::int4, udt_name::text \
             FROM information_schema.columns \
             WHERE table_schema = $1::text AND table_name = $2::text \
             ORDER BY ordinal_position",
            &[&table.schema_name, &table.table_name],
        )
        .await
        .map_err(map_err)?;

    let mut columns = Vec::with_capacity(rows.len());
    for row in &rows {
        let name: String = row.get(0);
        let data_type: String = row.get(1);
        let udt_name: String = row.get(8);
        let default_expr: Option<String> = row.get(6);

        // `data_type` says just "ARRAY" for arrays and "USER-DEFINED" for
        // domains/enums; the udt name is more specific in those cases.
        let pg_type = match PgType::resolve(&data_type) {
            PgType::Other => PgType::resolve(&udt_name),
            resolved => resolved,
        };
        // Serials surface as integer + nextval default in the catalog.
        let pg_type = promote_serial(pg_type, default_expr.as_deref());

        columns.push(ColumnDescriptor {
            name,
            source_type_name: data_type,
            pg_type,
            character_max_length: row.get(2),
            numeric_precision: row.get(3),
            numeric_scale: row.get(4),
            is_nullable: row.get::<_, String>(5) == "YES",
            default_expr,
            ordinal: row.get(7),
        });
    }
    Ok(columns)
}

/// An integer column defaulting to `nextval('…')` is a serial in disguise.
fn promote_serial(pg_type: PgType, default_expr: Option<&str>) -> PgType {
    let is_sequence_default = default_expr
        .map(|d| d.trim_start().to_lowercase().starts_with("nextval("))
        .unwrap_or(false);
    if !is_sequence_default {
        return pg_type;
    }
    match pg_type {
        PgType::SmallInt => PgType::SmallSerial,
        PgType::Integer => PgType::Serial,
        PgType::BigInt => PgType::BigSerial,
        other => other,
    }
}

/// Ordered primary-key column names, or `None`.
pub async fn read_primary_key(
    client: &Client,
    table: &TableDescriptor,
) -> Result<Option<Vec<String>>, FerryError> {
    let map_err = |e: tokio_postgres::Error| FerryError::SchemaRead {
        table: table.to_string(),
        message: e.to_string(),
    };

    let rows = client
        .query(
            "SELECT kcu.column_name::text \
             FROM information_schema.table_constraints tc \
             JOIN information_schema.key_column_usage kcu \
               ON kcu.constraint_name = tc.constraint_name \
              AND kcu.table_schema = tc.table_schema \
             WHERE tc.constraint_type = 'PRIMARY KEY' \
               AND tc.table_schema = $1::text AND tc.table_name = $2::text \
             ORDER BY kcu.ordinal_position",
            &[&table.schema_name, &table.table_name],
        )
        .await
        .map_err(map_err)?;

    if rows.is_empty() {
        return Ok(None);
    }
    Ok(Some(rows.iter().map(|r| r.get::<_, String>(0)).collect()))
}

/// Secondary indexes, with per-column direction from `indoption` bit 0.
///
/// `indkey` is unnested WITH ORDINALITY so column order is stable, and
/// the matching `indoption` element is picked by position (`int2vector`
/// subscripts are zero-based).
pub async fn read_indexes(
    client: &Client,
    table: &TableDescriptor,
) -> Result<Vec<IndexDescriptor>, FerryError> {
    let map_err = |e: tokio_postgres::Error| FerryError::SchemaRead {
        table: table.to_string(),
        message: e.to_string(),
    };

    let rows = client
        .query(
            "SELECT i.relname::text AS index_name, \
                    ix.indisunique, \
                    am.amname::text, \
                    a.attname::text, \
                    (ix.indoption[k.ord - 1] & 1) <> 0 AS is_desc, \
                    k.ord::int4 \
             FROM pg_catalog.pg_index ix \
             JOIN pg_catalog.pg_class t ON t.oid = ix.indrelid \
             JOIN pg_catalog.pg_class i ON i.oid = ix.indexrelid \
             JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace \
             JOIN pg_catalog.pg_am am ON am.oid = i.relam \
             JOIN LATERAL unnest(ix.indkey) WITH ORDINALITY AS k(attnum, ord) ON true \
             JOIN pg_catalog.pg_attribute a \
               ON a.attrelid = t.oid AND a.attnum = k.attnum \
             WHERE n.nspname = $1::text AND t.relname = $2::text \
               AND NOT ix.indisprimary \
             ORDER BY i.relname, k.ord",
            &[&table.schema_name, &table.table_name],
        )
        .await
        .map_err(map_err)?;

    let mut indexes: Vec<IndexDescriptor> = Vec::new();
    for row in &rows {
        let name: String = row.get(0);
        let is_unique: bool = row.get(1);
        let access_method: String = row.get(2);
        let column: String = row.get(3);
        let direction = if row.get::<_, bool>(4) {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };

        match indexes.last_mut() {
            Some(last) if last.name == name => {
                last.ordered_columns.push((column, direction));
            }
            _ => indexes.push(IndexDescriptor {
                name,
                is_unique,
                access_method,
                ordered_columns: vec![(column, direction)],
            }),
        }
    }
    Ok(indexes)
}

/// Foreign keys, grouped by constraint name with column order preserved.
pub async fn read_foreign_keys(
    client: &Client,
    table: &TableDescriptor,
) -> Result<Vec<ForeignKeyDescriptor>, FerryError> {
    let map_err = |e: tokio_postgres::Error| FerryError::SchemaRead {
        table: table.to_string(),
        message: e.to_string(),
    };

    let rows = client
        .query(
            "SELECT tc.constraint_name::text, \
                    kcu.column_name::text, \
                    ccu.table_name::text AS referenced_table, \
                    ccu.column_name::text AS referenced_column, \
                    rc.update_rule::text, \
                    rc.delete_rule::text \
             FROM information_schema.table_constraints tc \
             JOIN information_schema.key_column_usage kcu \
               ON kcu.constraint_name = tc.constraint_name \
              AND kcu.table_schema = tc.table_schema \
             JOIN information_schema.constraint_column_usage ccu \
               ON ccu.constraint_name = tc.constraint_name \
              AND ccu.table_schema = tc.table_schema \
             JOIN information_schema.referential_constraints rc \
               ON rc.constraint_name = tc.constraint_name \
              AND rc.constraint_schema = tc.table_schema \
             WHERE tc.constraint_type = 'FOREIGN KEY' \
               AND tc.table_schema = $1::text AND tc.table_name = $2::text \
             ORDER BY tc.constraint_name, kcu.ordinal_position",
            &[&table.schema_name, &table.table_name],
        )
        .await
        .map_err(map_err)?;

    let mut fks: Vec<ForeignKeyDescriptor> = Vec::new();
    for row in &rows {
        let name: String = row.get(0);
        let local_column: String = row.get(1);
        let referenced_table: String = row.get(2);
        let referenced_column: String = row.get(3);
        let on_update = ReferentialAction::from_catalog(row.get(4));
        let on_delete = ReferentialAction::from_catalog(row.get(5));

        match fks.last_mut() {
            Some(last) if last.name == name => {
                if !last.local_columns.contains(&local_column) {
                    last.local_columns.push(local_column);
                }
                if !last.referenced_columns.contains(&referenced_column) {
                    last.referenced_columns.push(referenced_column);
                }
            }
            _ => fks.push(ForeignKeyDescriptor {
                name,
                local_columns: vec![local_column],
                referenced_table,
                referenced_columns: vec![referenced_column],
                on_update,
                on_delete,
            }),
        }
    }
    Ok(fks)
}

/// Estimated on-disk size in bytes (`pg_total_relation_size`), used to
/// order the data phase smallest-first.
pub async fn estimate_table_size(
    client: &Client,
    table: &TableDescriptor,
) -> Result<i64, FerryError> {
    let map_err = |e: tokio_postgres::Error| FerryError::SchemaRead {
        table: table.to_string(),
        message: e.to_string(),
    };

    let row = client
        .query_one(
            "SELECT pg_total_relation_size(c.oid) \
             FROM pg_catalog.pg_class c \
             JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace \
             WHERE n.nspname = $1::text AND c.relname = $2::text",
            &[&table.schema_name, &table.table_name],
        )
        .await
        .map_err(map_err)?;
    Ok(row.get(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn td(name: &str) -> TableDescriptor {
        TableDescriptor::new("public", name)
    }

    #[test]
    fn test_filter_include_exclude() {
        let tables = vec![td("a"), td("b"), td("c")];
        let all = filter_tables(tables.clone(), &[], &[]);
        assert_eq!(all.len(), 3);

        let only = filter_tables(tables.clone(), &["a".into(), "b".into()], &[]);
        assert_eq!(only.len(), 2);

        // exclude wins over include
        let minus = filter_tables(tables, &["a".into(), "b".into()], &["b".into()]);
        assert_eq!(minus.len(), 1);
        assert_eq!(minus[0].table_name, "a");
    }

    #[test]
    fn test_referential_action_normalization() {
        assert_eq!(
            ReferentialAction::from_catalog("CASCADE"),
            ReferentialAction::Cascade
        );
        assert_eq!(
            ReferentialAction::from_catalog("set null"),
            ReferentialAction::SetNull
        );
        assert_eq!(
            ReferentialAction::from_catalog("SOMETHING CUSTOM"),
            ReferentialAction::Restrict
        );
    }

    #[test]
    fn test_promote_serial() {
        assert_eq!(
            promote_serial(PgType::Integer, Some("nextval('users_id_seq'::regclass)")),
            PgType::Serial
        );
        assert_eq!(
            promote_serial(PgType::BigInt, Some("nextval('s')")),
            PgType::BigSerial
        );
        assert_eq!(promote_serial(PgType::Integer, Some("42")), PgType::Integer);
        assert_eq!(promote_serial(PgType::Integer, None), PgType::Integer);
        assert_eq!(
            promote_serial(PgType::Text, Some("nextval('s')")),
            PgType::Text
        );
    }

    #[test]
    fn test_schema_validation_catches_phantom_columns() {
        let schema = TableSchema {
            table: td("users"),
            columns: vec![ColumnDescriptor {
                name: "id".into(),
                source_type_name: "integer".into(),
                pg_type: PgType::Integer,
                character_max_length: None,
                numeric_precision: None,
                numeric_scale: None,
                is_nullable: false,
                default_expr: None,
                ordinal: 1,
            }],
            primary_key: Some(vec!["id".into()]),
            indexes: vec![IndexDescriptor {
                name: "idx".into(),
                is_unique: false,
                access_method: "btree".into(),
                ordered_columns: vec![("ghost".into(), SortDirection::Asc)],
            }],
            foreign_keys: vec![],
        };
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_single_column_pk() {
        let mut schema = TableSchema {
            table: td("t"),
            columns: vec![],
            primary_key: Some(vec!["id".into()]),
            indexes: vec![],
            foreign_keys: vec![],
        };
        assert_eq!(schema.single_column_pk(), Some("id"));

        schema.primary_key = Some(vec!["a".into(), "b".into()]);
        assert_eq!(schema.single_column_pk(), None);

        schema.primary_key = None;
        assert_eq!(schema.single_column_pk(), None);
    }

    #[test]
    fn test_table_descriptor_display_and_qualify() {
        let t = td("users");
        assert_eq!(t.to_string(), "public.users");
        assert_eq!(t.qualified(), "\"public\".\"users\"");
    }
}
