//! PostgreSQL → MariaDB/MySQL type mapping and default-expression
//! translation.
//!
//! Both functions here are pure. The type map is total: every input
//! produces a valid target type string, with `LONGTEXT` as the defensive
//! fallback for anything unrecognized.
//!
//! The per-row converter never sees type names: [`PgType`] is resolved
//! once per column during schema read, so the hot path is a closed match
//! over a small enum.

use crate::schema::ColumnDescriptor;

/// Tagged base type of a source column, resolved once at schema read.
///
/// Serial variants are kept distinct from their integer bases because they
/// carry `AUTO_INCREMENT` semantics into the emitted DDL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PgType {
    SmallInt,
    Integer,
    BigInt,
    SmallSerial,
    Serial,
    BigSerial,
    Numeric,
    Real,
    DoublePrecision,
    Varchar,
    Char,
    Text,
    Bytea,
    Date,
    Time,
    Timestamp,
    Interval,
    Boolean,
    Json,
    Uuid,
    Array,
    /// Anything unrecognized. Mapped to LONGTEXT and passed through as text.
    Other,
}

impl PgType {
    /// Resolve a catalog-rendered type name to a tag.
    ///
    /// The name is normalized first: trailing parenthesized arguments are
    /// stripped and the rest lower-cased, so `VARCHAR(255)` and
    /// `character varying` both resolve to [`PgType::Varchar`].
    pub fn resolve(type_name: &str) -> PgType {
        let base = normalize_base_type(type_name);
        if base.ends_with("[]") || base == "array" || base.starts_with('_') {
            return PgType::Array;
        }
        match base.as_str() {
            "smallint" | "int2" => PgType::SmallInt,
            "integer" | "int" | "int4" => PgType::Integer,
            "bigint" | "int8" => PgType::BigInt,
            "smallserial" | "serial2" => PgType::SmallSerial,
            "serial" | "serial4" => PgType::Serial,
            "bigserial" | "serial8" => PgType::BigSerial,
            "numeric" | "decimal" => PgType::Numeric,
            "real" | "float4" => PgType::Real,
            "double precision" | "float8" => PgType::DoublePrecision,
            "character varying" | "varchar" => PgType::Varchar,
            "character" | "char" | "bpchar" => PgType::Char,
            "text" | "citext" => PgType::Text,
            "bytea" => PgType::Bytea,
            "date" => PgType::Date,
            "interval" => PgType::Interval,
            "boolean" | "bool" => PgType::Boolean,
            "json" | "jsonb" => PgType::Json,
            "uuid" => PgType::Uuid,
            _ if base.starts_with("time without")
                || base.starts_with("time with")
                || base == "time" =>
            {
                PgType::Time
            }
            _ if base.starts_with("timestamp") => PgType::Timestamp,
            _ => PgType::Other,
        }
    }

    /// Whether values of this type carry a calendar date that must pass
    /// through timestamp normalization.
    pub fn is_datelike(&self) -> bool {
        matches!(self, PgType::Date | PgType::Timestamp)
    }

    /// Whether this type is one of the serial (auto-increment) family.
    pub fn is_serial(&self) -> bool {
        matches!(
            self,
            PgType::SmallSerial | PgType::Serial | PgType::BigSerial
        )
    }

    /// Whether this type is integral (including serials).
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            PgType::SmallInt | PgType::Integer | PgType::BigInt
        ) || self.is_serial()
    }
}

/// Strip a trailing parenthesized argument list and lower-case the rest.
fn normalize_base_type(type_name: &str) -> String {
    let trimmed = type_name.trim();
    let without_args = match trimmed.find('(') {
        Some(open) => {
            // keep anything after the closing paren ("timestamp(3) with time zone")
            let tail = trimmed[open..]
                .find(')')
                .map(|close| &trimmed[open + close + 1..])
                .unwrap_or("");
            format!("{}{}", &trimmed[..open], tail)
        }
        None => trimmed.to_string(),
    };
    without_args.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Map a source column to its target type string.
///
/// Total over all inputs. Known lossy bounds, by design:
/// - `numeric`/`decimal` always become `DECIMAL(20,10)` regardless of the
///   declared precision/scale. Source systems are observed to declare
///   `NUMERIC` with no scale (catalog scale = 0) while storing fractional
///   values, so carrying the catalog declaration would truncate.
/// - timestamps lose their timezone.
pub fn target_type(column: &ColumnDescriptor) -> String {
    match column.pg_type {
        PgType::SmallInt => "SMALLINT".into(),
        PgType::Integer => "INT".into(),
        PgType::BigInt => "BIGINT".into(),
        PgType::SmallSerial => "SMALLINT AUTO_INCREMENT".into(),
        PgType::Serial => "INT AUTO_INCREMENT".into(),
        PgType::BigSerial => "BIGINT AUTO_INCREMENT".into(),
        PgType::Numeric => "DECIMAL(20,10)".into(),
        PgType::Real => "FLOAT".into(),
        PgType::DoublePrecision => "DOUBLE".into(),
        PgType::Varchar => match column.character_max_length {
            Some(n) if n <= 65_535 => format!("VARCHAR({})", n),
            Some(_) => "LONGTEXT".into(),
            None => "LONGTEXT".into(),
        },
        PgType::Char => match column.character_max_length {
            Some(n) if n <= 255 => format!("CHAR({})", n),
            Some(n) => format!("VARCHAR({})", n.min(65_535)),
            None => "CHAR(1)".into(),
        },
        PgType::Text => "LONGTEXT".into(),
        PgType::Bytea => "LONGBLOB".into(),
        PgType::Date => "DATE".into(),
        PgType::Time => "TIME".into(),
        PgType::Timestamp => "DATETIME".into(),
        PgType::Interval => "TIME".into(),
        PgType::Boolean => "BOOLEAN".into(),
        PgType::Json => "JSON".into(),
        PgType::Uuid => "CHAR(36)".into(),
        PgType::Array => "JSON".into(),
        PgType::Other => "LONGTEXT".into(),
    }
}

/// Translate a PostgreSQL-rendered default expression into one the target
/// accepts, or `None` when the default must be dropped.
///
/// Rules are checked in order; dropping is always safer than emitting
/// invalid target SQL.
pub fn translate_default(default_expr: &str) -> Option<String> {
    let expr = default_expr.trim();
    if expr.is_empty() {
        return None;
    }

    // 1. Sequence references are handled by AUTO_INCREMENT.
    if expr.ends_with("::regclass") {
        return None;
    }
    // 2. nextval('…') likewise.
    if expr.to_lowercase().starts_with("nextval(") {
        return None;
    }
    // 3. 'literal'::type — unwrap and re-escape the literal.
    if let Some((literal, rest)) = scan_quoted_literal(expr) {
        if rest.starts_with("::") && !rest.ends_with("regclass") {
            return Some(format!("'{}'", literal.replace('\'', "''")));
        }
        // 4. Bare string literal: the quoted part is the whole expression.
        if rest.is_empty() {
            return Some(expr.to_string());
        }
    }

    let lowered = expr.to_lowercase();
    // 5. now() / current_timestamp.
    if lowered == "now()" || lowered == "current_timestamp" || lowered == "current_timestamp()" {
        return Some("CURRENT_TIMESTAMP".into());
    }
    // 6. current_date.
    if lowered == "current_date" {
        return Some("CURRENT_DATE".into());
    }
    // 7. Boolean literals.
    if lowered == "true" {
        return Some("TRUE".into());
    }
    if lowered == "false" {
        return Some("FALSE".into());
    }
    // 8. Signed integer or decimal literal.
    if is_numeric_literal(expr) {
        return Some(expr.to_string());
    }
    // 9. Anything else is dropped.
    None
}

/// Scan a leading `'…'` literal, honoring `''` escapes. Returns the
/// un-escaped inner text and whatever follows the closing quote, or
/// `None` when the expression does not open with a terminated literal.
fn scan_quoted_literal(expr: &str) -> Option<(String, &str)> {
    let mut chars = expr.char_indices();
    match chars.next() {
        Some((_, '\'')) => {}
        _ => return None,
    }
    let mut literal = String::new();
    while let Some((i, c)) = chars.next() {
        if c != '\'' {
            literal.push(c);
            continue;
        }
        // '' is an escaped quote; a lone ' closes the literal
        if expr[i + 1..].starts_with('\'') {
            literal.push('\'');
            chars.next();
        } else {
            return Some((literal, &expr[i + 1..]));
        }
    }
    None
}

fn is_numeric_literal(expr: &str) -> bool {
    let body = expr.strip_prefix('-').or_else(|| expr.strip_prefix('+')).unwrap_or(expr);
    if body.is_empty() {
        return false;
    }
    let mut seen_dot = false;
    let mut seen_digit = false;
    for ch in body.chars() {
        match ch {
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => return false,
        }
    }
    seen_digit
}
