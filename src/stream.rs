//! Chunked reads from the source.
//!
//! Given a table, a chunk size, and a cursor, this module returns up to
//! `chunk_size` rows in a stable order. Two pagination modes:
//!
//! - **Cursor mode** (preferred, single-column PK known):
//!   `WHERE pk > cursor ORDER BY pk LIMIT n`. The very first call omits
//!   the cursor predicate entirely; [`Cursor::Start`] is a real variant,
//!   not a magic sentinel value, so tables with non-positive or string
//!   PKs resume correctly.
//! - **Offset mode** (fallback, no PK): `ORDER BY first_column LIMIT n
//!   OFFSET k`. Slower for large tables.
//!
//! The optional [`RowFilter`] is applied to every fetch and to the total
//! row count, so the count a progress bar shows is the count the stream
//! will deliver.

use serde::{Deserialize, Serialize};
use tokio_postgres::Client;

use crate::convert::CellValue;
use crate::dialect::Dialect;
use crate::error::FerryError;
use crate::schema::{ColumnDescriptor, TableSchema};
use crate::typemap::PgType;

/// Streaming position within a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cursor {
    /// Before the first row; the WHERE clause is omitted.
    Start,
    /// After the row whose PK equals the carried value.
    At(CellValue),
}

/// Optional half-open row window: `col >= after AND col < before`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowFilter {
    pub column: String,
    pub after_inclusive: Option<String>,
    pub before_exclusive: Option<String>,
}

impl RowFilter {
    /// Render the filter conditions for the source dialect, or `None`
    /// when both bounds are absent.
    pub fn to_sql(&self, dialect: Dialect) -> Option<String> {
        let col = dialect.quote_ident(&self.column);
        let mut parts = Vec::new();
        if let Some(after) = &self.after_inclusive {
            parts.push(format!("{} >= {}", col, dialect.quote_literal(after)));
        }
        if let Some(before) = &self.before_exclusive {
            parts.push(format!("{} < {}", col, dialect.quote_literal(before)));
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" AND "))
        }
    }
}

/// How a table is paged.
#[derive(Debug, Clone, PartialEq)]
pub enum Pagination {
    /// Keyset pagination on a single-column primary key.
    Cursor { pk_column: String },
    /// LIMIT/OFFSET on the first column's order.
    Offset { order_column: String },
}

impl Pagination {
    /// Pick the mode for a table: cursor when a single-column PK exists,
    /// offset on the first column otherwise.
    pub fn for_table(schema: &TableSchema) -> Pagination {
        match schema.single_column_pk() {
            Some(pk) => Pagination::Cursor {
                pk_column: pk.to_string(),
            },
            None => Pagination::Offset {
                order_column: schema.columns[0].name.clone(),
            },
        }
    }
}

/// One fetched chunk, already in closed [`CellValue`] form.
#[derive(Debug)]
pub struct Chunk {
    pub rows: Vec<Vec<CellValue>>,
    /// Cursor for the next fetch (cursor mode only).
    pub next_cursor: Option<Cursor>,
}

impl Chunk {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

// ── SQL builders ───────────────────────────────────────────────────────────

/// Per-column SELECT expression.
///
/// Types without a native wire mapping on the fetch path are cast to
/// text in SQL so the corrupted-value paths (timestamps above all) reach
/// the normalizer as raw strings instead of failing inside the driver.
/// Must stay in lockstep with [`extract_cell`].
pub fn select_expr(column: &ColumnDescriptor, dialect: Dialect) -> String {
    let ident = dialect.quote_ident(&column.name);
    match column.pg_type {
        PgType::Boolean
        | PgType::SmallInt
        | PgType::Integer
        | PgType::BigInt
        | PgType::SmallSerial
        | PgType::Serial
        | PgType::BigSerial
        | PgType::Real
        | PgType::DoublePrecision
        | PgType::Bytea => ident,
        _ => format!("{}::text", ident),
    }
}

/// `COUNT(*)` over the table under the filter.
pub fn build_count_query(schema: &TableSchema, filter: Option<&RowFilter>) -> String {
    let d = Dialect::Postgres;
    let mut sql = format!("SELECT COUNT(*) FROM {}", schema.table.qualified());
    if let Some(cond) = filter.and_then(|f| f.to_sql(d)) {
        sql.push_str(" WHERE ");
        sql.push_str(&cond);
    }
    sql
}

/// Build the fetch query for one chunk.
pub fn build_chunk_query(
    schema: &TableSchema,
    pagination: &Pagination,
    cursor: &Cursor,
    offset: u64,
    filter: Option<&RowFilter>,
    chunk_size: usize,
) -> String {
    let d = Dialect::Postgres;
    let select_list = schema
        .columns
        .iter()
        .map(|c| select_expr(c, d))
        .collect::<Vec<_>>()
        .join(", ");

    let mut conditions: Vec<String> = Vec::new();
    if let Pagination::Cursor { pk_column } = pagination {
        if let Cursor::At(value) = cursor {
            conditions.push(format!(
                "{} > {}",
                d.quote_ident(pk_column),
                value.to_sql_literal(d)
            ));
        }
    }
    if let Some(cond) = filter.and_then(|f| f.to_sql(d)) {
        conditions.push(cond);
    }

    let mut sql = format!("SELECT {} FROM {}", select_list, schema.table.qualified());
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }

    match pagination {
        Pagination::Cursor { pk_column } => {
            sql.push_str(&format!(
                " ORDER BY {} LIMIT {}",
                d.quote_ident(pk_column),
                chunk_size
            ));
        }
        Pagination::Offset { order_column } => {
            let mut order = d.quote_ident(order_column);
            if let Some(f) = filter {
                if f.column != *order_column {
                    order.push_str(", ");
                    order.push_str(&d.quote_ident(&f.column));
                }
            }
            sql.push_str(&format!(
                " ORDER BY {} LIMIT {} OFFSET {}",
                order, chunk_size, offset
            ));
        }
    }
    sql
}

// ── Execution ──────────────────────────────────────────────────────────────

/// Count rows under the filter.
pub async fn count_rows(
    client: &Client,
    schema: &TableSchema,
    filter: Option<&RowFilter>,
) -> Result<i64, FerryError> {
    let sql = build_count_query(schema, filter);
    let row = client
        .query_one(sql.as_str(), &[])
        .await
        .map_err(|e| FerryError::SourceQuery(e.to_string()))?;
    Ok(row.get(0))
}

/// Fetch one chunk and compute the next cursor.
pub async fn fetch_chunk(
    client: &Client,
    schema: &TableSchema,
    pagination: &Pagination,
    cursor: &Cursor,
    offset: u64,
    filter: Option<&RowFilter>,
    chunk_size: usize,
) -> Result<Chunk, FerryError> {
    let sql = build_chunk_query(schema, pagination, cursor, offset, filter, chunk_size);
    let rows = client
        .query(sql.as_str(), &[])
        .await
        .map_err(|e| FerryError::SourceQuery(e.to_string()))?;

    let mut out: Vec<Vec<CellValue>> = Vec::with_capacity(rows.len());
    for row in &rows {
        let mut cells = Vec::with_capacity(schema.columns.len());
        for (idx, col) in schema.columns.iter().enumerate() {
            cells.push(extract_cell(row, idx, col)?);
        }
        out.push(cells);
    }

    let next_cursor = match pagination {
        Pagination::Cursor { pk_column } => {
            let pk_idx = schema
                .columns
                .iter()
                .position(|c| &c.name == pk_column)
                .ok_or_else(|| {
                    FerryError::InternalError(format!(
                        "cursor column {} missing from {}",
                        pk_column, schema.table
                    ))
                })?;
            out.last().map(|last| Cursor::At(last[pk_idx].clone()))
        }
        Pagination::Offset { .. } => None,
    };

    Ok(Chunk {
        rows: out,
        next_cursor,
    })
}

/// Pull one cell out of a driver row, per the column's resolved tag.
/// The grouping mirrors [`select_expr`]: natively-fetched types first,
/// everything else arrives as text.
fn extract_cell(
    row: &tokio_postgres::Row,
    idx: usize,
    column: &ColumnDescriptor,
) -> Result<CellValue, FerryError> {
    let map_err = |e: tokio_postgres::Error| {
        FerryError::SourceQuery(format!("column {}: {}", column.name, e))
    };
    let cell = match column.pg_type {
        PgType::Boolean => row
            .try_get::<_, Option<bool>>(idx)
            .map_err(map_err)?
            .map(CellValue::Bool),
        PgType::SmallInt | PgType::SmallSerial => row
            .try_get::<_, Option<i16>>(idx)
            .map_err(map_err)?
            .map(CellValue::SmallInt),
        PgType::Integer | PgType::Serial => row
            .try_get::<_, Option<i32>>(idx)
            .map_err(map_err)?
            .map(CellValue::Int),
        PgType::BigInt | PgType::BigSerial => row
            .try_get::<_, Option<i64>>(idx)
            .map_err(map_err)?
            .map(CellValue::BigInt),
        PgType::Real => row
            .try_get::<_, Option<f32>>(idx)
            .map_err(map_err)?
            .map(CellValue::Float),
        PgType::DoublePrecision => row
            .try_get::<_, Option<f64>>(idx)
            .map_err(map_err)?
            .map(CellValue::Double),
        PgType::Bytea => row
            .try_get::<_, Option<Vec<u8>>>(idx)
            .map_err(map_err)?
            .map(CellValue::Bytes),
        _ => row
            .try_get::<_, Option<String>>(idx)
            .map_err(map_err)?
            .map(CellValue::Text),
    };
    Ok(cell.unwrap_or(CellValue::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TableDescriptor;

    fn column(name: &str, type_name: &str) -> ColumnDescriptor {
        ColumnDescriptor {
            name: name.into(),
            source_type_name: type_name.into(),
            pg_type: PgType::resolve(type_name),
            character_max_length: None,
            numeric_precision: None,
            numeric_scale: None,
            is_nullable: true,
            default_expr: None,
            ordinal: 0,
        }
    }

    fn users_schema(pk: Option<Vec<String>>) -> TableSchema {
        TableSchema {
            table: TableDescriptor::new("public", "users"),
            columns: vec![
                column("id", "integer"),
                column("name", "character varying"),
                column("created_at", "timestamp without time zone"),
            ],
            primary_key: pk,
            indexes: vec![],
            foreign_keys: vec![],
        }
    }

    #[test]
    fn test_pagination_mode_selection() {
        let with_pk = users_schema(Some(vec!["id".into()]));
        assert_eq!(
            Pagination::for_table(&with_pk),
            Pagination::Cursor {
                pk_column: "id".into()
            }
        );

        let composite = users_schema(Some(vec!["id".into(), "name".into()]));
        assert_eq!(
            Pagination::for_table(&composite),
            Pagination::Offset {
                order_column: "id".into()
            }
        );

        let without = users_schema(None);
        assert_eq!(
            Pagination::for_table(&without),
            Pagination::Offset {
                order_column: "id".into()
            }
        );
    }

    #[test]
    fn test_first_fetch_omits_cursor_predicate() {
        let schema = users_schema(Some(vec!["id".into()]));
        let pagination = Pagination::for_table(&schema);
        let sql = build_chunk_query(&schema, &pagination, &Cursor::Start, 0, None, 1000);
        assert!(!sql.contains("WHERE"));
        assert!(sql.ends_with("ORDER BY \"id\" LIMIT 1000"));
    }

    #[test]
    fn test_subsequent_fetch_carries_cursor() {
        let schema = users_schema(Some(vec!["id".into()]));
        let pagination = Pagination::for_table(&schema);
        let cursor = Cursor::At(CellValue::Int(42));
        let sql = build_chunk_query(&schema, &pagination, &cursor, 0, None, 1000);
        assert!(sql.contains("WHERE \"id\" > 42"));
    }

    #[test]
    fn test_string_cursor_is_quoted() {
        let schema = users_schema(Some(vec!["id".into()]));
        let pagination = Pagination::for_table(&schema);
        let cursor = Cursor::At(CellValue::Text("abc'def".into()));
        let sql = build_chunk_query(&schema, &pagination, &cursor, 0, None, 10);
        assert!(sql.contains("WHERE \"id\" > 'abc''def'"));
    }

    #[test]
    fn test_text_casts_in_select_list() {
        let schema = users_schema(Some(vec!["id".into()]));
        let pagination = Pagination::for_table(&schema);
        let sql = build_chunk_query(&schema, &pagination, &Cursor::Start, 0, None, 10);
        // native fetch for the int, text casts for varchar and timestamp
        assert!(sql.contains("SELECT \"id\", \"name\"::text, \"created_at\"::text"));
    }

    #[test]
    fn test_offset_mode() {
        let schema = users_schema(None);
        let pagination = Pagination::for_table(&schema);
        let sql = build_chunk_query(&schema, &pagination, &Cursor::Start, 3000, None, 1000);
        assert!(sql.ends_with("ORDER BY \"id\" LIMIT 1000 OFFSET 3000"));
    }

    #[test]
    fn test_filter_in_count_and_fetch() {
        let schema = users_schema(Some(vec!["id".into()]));
        let filter = RowFilter {
            column: "created_at".into(),
            after_inclusive: Some("2024-01-01".into()),
            before_exclusive: Some("2024-02-01".into()),
        };

        let count = build_count_query(&schema, Some(&filter));
        assert_eq!(
            count,
            "SELECT COUNT(*) FROM \"public\".\"users\" WHERE \
             \"created_at\" >= '2024-01-01' AND \"created_at\" < '2024-02-01'"
        );

        let pagination = Pagination::for_table(&schema);
        let fetch = build_chunk_query(&schema, &pagination, &Cursor::Start, 0, Some(&filter), 500);
        assert!(fetch.contains("\"created_at\" >= '2024-01-01' AND \"created_at\" < '2024-02-01'"));

        // cursor predicate and filter compose with AND
        let fetch2 = build_chunk_query(
            &schema,
            &pagination,
            &Cursor::At(CellValue::Int(7)),
            0,
            Some(&filter),
            500,
        );
        assert!(fetch2.contains("\"id\" > 7 AND \"created_at\" >= '2024-01-01'"));
    }

    #[test]
    fn test_filter_with_single_bound() {
        let filter = RowFilter {
            column: "created_at".into(),
            after_inclusive: Some("2024-01-01".into()),
            before_exclusive: None,
        };
        assert_eq!(
            filter.to_sql(Dialect::Postgres),
            Some("\"created_at\" >= '2024-01-01'".into())
        );

        let empty = RowFilter {
            column: "created_at".into(),
            after_inclusive: None,
            before_exclusive: None,
        };
        assert_eq!(empty.to_sql(Dialect::Postgres), None);
    }

    #[test]
    fn test_offset_order_appends_filter_column() {
        let schema = users_schema(None);
        let pagination = Pagination::for_table(&schema);
        let filter = RowFilter {
            column: "created_at".into(),
            after_inclusive: Some("2024-01-01".into()),
            before_exclusive: None,
        };
        let sql = build_chunk_query(&schema, &pagination, &Cursor::Start, 0, Some(&filter), 10);
        assert!(sql.contains("ORDER BY \"id\", \"created_at\""));
    }

    #[test]
    fn test_cursor_serde_roundtrip() {
        for cursor in [
            Cursor::Start,
            Cursor::At(CellValue::Int(5)),
            Cursor::At(CellValue::Text("k-9".into())),
        ] {
            let json = serde_json::to_string(&cursor).unwrap();
            let back: Cursor = serde_json::from_str(&json).unwrap();
            assert_eq!(back, cursor);
        }
    }
}
