//! Per-row value conversion.
//!
//! Every source value is cast into a target-acceptable form before it is
//! handed to the bulk writer. Dispatch is a closed match over the
//! [`PgType`] tag resolved at schema read, never a per-row string
//! comparison.
//!
//! # Timestamp normalization
//!
//! The single most error-prone path in a large migration is malformed
//! timestamps. An invalid timestamp on a billion-row table must not abort
//! the run, so irrecoverable values are replaced with the epoch sentinel
//! `1970-01-01 00:00:00`, a documented, greppable marker. The observed
//! corruption pattern is an extra year digit (`202511-11-13 …`), caught by
//! the leading-digit-run check before anything else.

use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::typemap::PgType;

/// Replacement for irrecoverably corrupt timestamps.
pub const EPOCH_SENTINEL: &str = "1970-01-01 00:00:00";

/// Replacement for irrecoverably corrupt dates.
pub const EPOCH_DATE_SENTINEL: &str = "1970-01-01";

/// A single cell fetched from the source, in its closed wire form.
///
/// Types without a native representation on the fetch path (numeric,
/// json, uuid, temporal, arrays, unknown) arrive as [`CellValue::Text`]
/// via an explicit `::text` cast in the chunk query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Null,
    Bool(bool),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    Float(f32),
    Double(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl CellValue {
    /// Render as a SQL literal for cursor predicates on the source.
    pub fn to_sql_literal(&self, dialect: Dialect) -> String {
        match self {
            CellValue::Null => "NULL".into(),
            CellValue::Bool(b) => if *b { "TRUE" } else { "FALSE" }.into(),
            CellValue::SmallInt(v) => v.to_string(),
            CellValue::Int(v) => v.to_string(),
            CellValue::BigInt(v) => v.to_string(),
            CellValue::Float(v) => v.to_string(),
            CellValue::Double(v) => v.to_string(),
            CellValue::Text(s) => dialect.quote_literal(s),
            CellValue::Bytes(b) => match dialect {
                Dialect::Postgres => format!("'\\x{}'", hex_encode(b)),
                Dialect::MySql => format!("X'{}'", hex_encode(b)),
            },
        }
    }

    /// Text rendering for canonical row encoding. `None` for NULL.
    pub fn render_text(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            CellValue::Bool(b) => Some(if *b { "1" } else { "0" }.into()),
            CellValue::SmallInt(v) => Some(v.to_string()),
            CellValue::Int(v) => Some(v.to_string()),
            CellValue::BigInt(v) => Some(v.to_string()),
            CellValue::Float(v) => Some(v.to_string()),
            CellValue::Double(v) => Some(v.to_string()),
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Bytes(b) => Some(hex_encode(b)),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

/// Convert one cell for the target, per its resolved type tag.
///
/// Returns the converted value and an optional warning. Warnings never
/// abort: the policy for unconvertible values is sentinel replacement
/// (epoch for timestamps, NULL for times, re-encoding for JSON).
pub fn convert_cell(ty: PgType, value: CellValue) -> (CellValue, Option<String>) {
    if value.is_null() {
        return (CellValue::Null, None);
    }
    match ty {
        PgType::Boolean => (convert_boolean(value), None),
        PgType::Json => convert_json(value),
        PgType::Timestamp => convert_timestamp(value),
        PgType::Date => convert_date(value),
        PgType::Time => convert_time(value),
        PgType::Numeric => convert_numeric(value),
        PgType::Array => convert_array(value),
        // uuid, bytea, text, integers, floats, interval, unknown: verbatim
        _ => (value, None),
    }
}

fn convert_boolean(value: CellValue) -> CellValue {
    match value {
        CellValue::Bool(b) => CellValue::BigInt(if b { 1 } else { 0 }),
        CellValue::Text(s) => {
            let truthy = matches!(
                s.to_lowercase().as_str(),
                "t" | "true" | "1" | "yes" | "on"
            );
            CellValue::BigInt(if truthy { 1 } else { 0 })
        }
        CellValue::SmallInt(v) => CellValue::BigInt(if v != 0 { 1 } else { 0 }),
        CellValue::Int(v) => CellValue::BigInt(if v != 0 { 1 } else { 0 }),
        CellValue::BigInt(v) => CellValue::BigInt(if v != 0 { 1 } else { 0 }),
        other => other,
    }
}

fn convert_json(value: CellValue) -> (CellValue, Option<String>) {
    match value {
        CellValue::Text(s) => {
            if serde_json::from_str::<serde_json::Value>(&s).is_ok() {
                (CellValue::Text(s), None)
            } else {
                let reencoded = serde_json::Value::String(s).to_string();
                (
                    CellValue::Text(reencoded),
                    Some("json value did not parse, re-encoded as string".into()),
                )
            }
        }
        other => (other, None),
    }
}

fn convert_timestamp(value: CellValue) -> (CellValue, Option<String>) {
    match value {
        CellValue::Text(s) => {
            let normalized = normalize_timestamp(&s);
            let warning = if normalized == EPOCH_SENTINEL && s.trim() != EPOCH_SENTINEL {
                Some(format!("corrupt timestamp {:?} replaced with epoch", s))
            } else {
                None
            };
            (CellValue::Text(normalized), warning)
        }
        other => (other, None),
    }
}

fn convert_date(value: CellValue) -> (CellValue, Option<String>) {
    match value {
        CellValue::Text(s) => {
            let normalized = normalize_date(&s);
            let warning = if normalized == EPOCH_DATE_SENTINEL && s.trim() != EPOCH_DATE_SENTINEL {
                Some(format!("corrupt date {:?} replaced with epoch", s))
            } else {
                None
            };
            (CellValue::Text(normalized), warning)
        }
        other => (other, None),
    }
}

fn convert_time(value: CellValue) -> (CellValue, Option<String>) {
    match value {
        CellValue::Text(s) => match normalize_time(&s) {
            Some(t) => (CellValue::Text(t), None),
            None => (
                CellValue::Null,
                Some(format!("invalid time {:?} replaced with NULL", s)),
            ),
        },
        other => (other, None),
    }
}

/// Numeric passthrough with an overflow warning when the integral part
/// exceeds what DECIMAL(20,10) can hold. The value is still sent; the
/// target's own rounding applies.
fn convert_numeric(value: CellValue) -> (CellValue, Option<String>) {
    match value {
        CellValue::Text(s) => {
            let integral_digits = s
                .trim()
                .trim_start_matches(['-', '+'])
                .split('.')
                .next()
                .map(|p| p.chars().filter(|c| c.is_ascii_digit()).count())
                .unwrap_or(0);
            let warning = if integral_digits > 10 {
                Some(format!("numeric {:?} exceeds DECIMAL(20,10) capacity", s))
            } else {
                None
            };
            (CellValue::Text(s), warning)
        }
        other => (other, None),
    }
}

fn convert_array(value: CellValue) -> (CellValue, Option<String>) {
    match value {
        CellValue::Text(s) => match pg_array_to_json(&s) {
            Some(json) => (CellValue::Text(json.to_string()), None),
            None => (
                CellValue::Text(serde_json::Value::String(s).to_string()),
                Some("array literal did not parse, re-encoded as string".into()),
            ),
        },
        other => (other, None),
    }
}

// ── Timestamp normalization ────────────────────────────────────────────────

/// Normalize a timestamp string, replacing irrecoverable values with the
/// epoch sentinel. Idempotent: `normalize(normalize(x)) == normalize(x)`.
pub fn normalize_timestamp(raw: &str) -> String {
    let trimmed = raw.trim();

    // An extra year digit is the observed corruption pattern; a leading
    // run of 5+ digits can never begin a valid YYYY- timestamp.
    if leading_digit_run(trimmed) >= 5 {
        return EPOCH_SENTINEL.to_string();
    }

    let stripped = strip_utc_offset(trimmed);

    let candidate = if matches_timestamp_shape(stripped) {
        stripped.to_string()
    } else {
        match parse_calendar(stripped) {
            Some(reformatted) => reformatted,
            None => return EPOCH_SENTINEL.to_string(),
        }
    };

    match extract_year(&candidate) {
        Some(year) if (1900..=2100).contains(&year) => candidate,
        _ => EPOCH_SENTINEL.to_string(),
    }
}

/// Date normalization: same pipeline, reduced to `YYYY-MM-DD`.
pub fn normalize_date(raw: &str) -> String {
    let normalized = normalize_timestamp(raw);
    if normalized == EPOCH_SENTINEL {
        return EPOCH_DATE_SENTINEL.to_string();
    }
    normalized.chars().take(10).collect()
}

/// Validate `HH:MM:SS[.fraction]`; one reformat attempt; else None.
pub fn normalize_time(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if matches_time_shape(trimmed) {
        return Some(trimmed.to_string());
    }
    chrono::NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| chrono::NaiveTime::parse_from_str(trimmed, "%H.%M.%S"))
        .ok()
        .map(|t| t.format("%H:%M:%S").to_string())
}

fn leading_digit_run(s: &str) -> usize {
    s.bytes().take_while(|b| b.is_ascii_digit()).count()
}

/// Whether a date-ish string starts with the 5+ digit year corruption
/// pattern. Used by the writer's rejected-row diagnostics.
pub fn has_corrupt_year(s: &str) -> bool {
    leading_digit_run(s.trim()) >= 5
}

/// Strip a trailing `±HH:MM` or `±HH` UTC offset, but only when what
/// remains still looks like it carries a time component (so a bare
/// `YYYY-MM-DD` never loses its day).
fn strip_utc_offset(s: &str) -> &str {
    for offset_len in [6usize, 3] {
        if s.len() <= offset_len {
            continue;
        }
        let (head, tail) = s.split_at(s.len() - offset_len);
        let tail_bytes = tail.as_bytes();
        let shape_ok = match offset_len {
            6 => {
                (tail_bytes[0] == b'+' || tail_bytes[0] == b'-')
                    && tail_bytes[1].is_ascii_digit()
                    && tail_bytes[2].is_ascii_digit()
                    && tail_bytes[3] == b':'
                    && tail_bytes[4].is_ascii_digit()
                    && tail_bytes[5].is_ascii_digit()
            }
            _ => {
                (tail_bytes[0] == b'+' || tail_bytes[0] == b'-')
                    && tail_bytes[1].is_ascii_digit()
                    && tail_bytes[2].is_ascii_digit()
            }
        };
        if shape_ok && head.len() > 10 && head[10..].contains(':') {
            return head;
        }
    }
    s
}

/// `^\d{4}-\d{2}-\d{2}( \d{2}:\d{2}:\d{2}(\.\d+)?)?$`, hand-rolled because
/// the shape check sits on the per-row hot path.
fn matches_timestamp_shape(s: &str) -> bool {
    let b = s.as_bytes();
    if b.len() < 10 || !is_date_shape(&b[..10]) {
        return false;
    }
    if b.len() == 10 {
        return true;
    }
    if b.len() < 19 || b[10] != b' ' {
        return false;
    }
    if !is_time_digits(&b[11..19]) {
        return false;
    }
    if b.len() == 19 {
        return true;
    }
    // optional fraction
    if b[19] != b'.' || b.len() == 20 {
        return false;
    }
    b[20..].iter().all(|c| c.is_ascii_digit())
}

fn is_date_shape(b: &[u8]) -> bool {
    b.len() == 10
        && b[..4].iter().all(|c| c.is_ascii_digit())
        && b[4] == b'-'
        && b[5].is_ascii_digit()
        && b[6].is_ascii_digit()
        && b[7] == b'-'
        && b[8].is_ascii_digit()
        && b[9].is_ascii_digit()
}

fn is_time_digits(b: &[u8]) -> bool {
    b.len() == 8
        && b[0].is_ascii_digit()
        && b[1].is_ascii_digit()
        && b[2] == b':'
        && b[3].is_ascii_digit()
        && b[4].is_ascii_digit()
        && b[5] == b':'
        && b[6].is_ascii_digit()
        && b[7].is_ascii_digit()
}

fn matches_time_shape(s: &str) -> bool {
    let b = s.as_bytes();
    if b.len() < 8 || !is_time_digits(&b[..8]) {
        return false;
    }
    if b.len() == 8 {
        return true;
    }
    if b[8] != b'.' || b.len() == 9 {
        return false;
    }
    b[9..].iter().all(|c| c.is_ascii_digit())
}

/// Last-resort calendar parsing for values that fail the shape check.
fn parse_calendar(s: &str) -> Option<String> {
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
    ];
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.format("%Y-%m-%d %H:%M:%S").to_string());
        }
    }
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];
    for fmt in DATE_FORMATS {
        if let Ok(d) = chrono::NaiveDate::parse_from_str(s, fmt) {
            return Some(d.format("%Y-%m-%d").to_string());
        }
    }
    None
}

fn extract_year(s: &str) -> Option<i32> {
    s.get(..4)?.parse().ok()
}

// ── PostgreSQL array literal → JSON ────────────────────────────────────────

/// Parse a PostgreSQL array literal (`{1,2,NULL,4}`) into a JSON array.
/// Handles quoted elements, backslash escapes, NULLs, and nesting.
/// Returns `None` when the literal is malformed.
pub fn pg_array_to_json(literal: &str) -> Option<serde_json::Value> {
    let trimmed = literal.trim();
    let mut chars = trimmed.chars().peekable();
    if chars.next()? != '{' {
        return None;
    }
    let (value, rest_empty) = parse_array_body(&mut chars)?;
    if !rest_empty {
        return None;
    }
    Some(value)
}

/// Parse the body after an opening `{`. Returns the array and whether the
/// input was fully consumed.
fn parse_array_body(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
) -> Option<(serde_json::Value, bool)> {
    let mut elements = Vec::new();
    let mut current = String::new();
    let mut current_quoted = false;

    loop {
        match chars.next()? {
            '}' => {
                if !current.is_empty() || current_quoted {
                    elements.push(element_to_json(&current, current_quoted));
                } else if !elements.is_empty() {
                    // trailing comma, malformed
                    return None;
                }
                let fully_consumed = chars.peek().is_none();
                return Some((serde_json::Value::Array(elements), fully_consumed));
            }
            ',' => {
                elements.push(element_to_json(&current, current_quoted));
                current.clear();
                current_quoted = false;
            }
            '{' => {
                let (nested, _) = parse_array_body(chars)?;
                elements.push(nested);
                // consume the separator after the nested close, if any
                match chars.peek() {
                    Some(',') => {
                        chars.next();
                    }
                    Some('}') | None => {}
                    _ => return None,
                }
                if chars.peek() == Some(&'}') {
                    chars.next();
                    let fully_consumed = chars.peek().is_none();
                    return Some((serde_json::Value::Array(elements), fully_consumed));
                }
            }
            '"' => {
                current_quoted = true;
                loop {
                    match chars.next()? {
                        '"' => break,
                        '\\' => current.push(chars.next()?),
                        c => current.push(c),
                    }
                }
            }
            c => current.push(c),
        }
    }
}

fn element_to_json(raw: &str, quoted: bool) -> serde_json::Value {
    if !quoted {
        if raw.eq_ignore_ascii_case("null") {
            return serde_json::Value::Null;
        }
        if let Ok(i) = raw.parse::<i64>() {
            return serde_json::Value::Number(i.into());
        }
        if let Ok(f) = raw.parse::<f64>() {
            if let Some(n) = serde_json::Number::from_f64(f) {
                return serde_json::Value::Number(n);
            }
        }
        if raw == "t" || raw == "true" {
            return serde_json::Value::Bool(true);
        }
        if raw == "f" || raw == "false" {
            return serde_json::Value::Bool(false);
        }
    }
    serde_json::Value::String(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Timestamp normalization ────────────────────────────────────────

    #[test]
    fn test_valid_timestamp_passes_through() {
        assert_eq!(
            normalize_timestamp("2024-01-02 10:00:00"),
            "2024-01-02 10:00:00"
        );
        assert_eq!(
            normalize_timestamp("2024-01-02 10:00:00.123456"),
            "2024-01-02 10:00:00.123456"
        );
        assert_eq!(normalize_timestamp("2024-01-02"), "2024-01-02");
    }

    #[test]
    fn test_extra_year_digit_hits_sentinel() {
        assert_eq!(normalize_timestamp("202511-11-13 02:39:00"), EPOCH_SENTINEL);
        assert_eq!(normalize_timestamp("99999-01-01"), EPOCH_SENTINEL);
    }

    #[test]
    fn test_offset_stripping() {
        assert_eq!(
            normalize_timestamp("2024-01-02 10:00:00+05:30"),
            "2024-01-02 10:00:00"
        );
        assert_eq!(
            normalize_timestamp("2024-01-02 10:00:00+00"),
            "2024-01-02 10:00:00"
        );
        assert_eq!(
            normalize_timestamp("2024-01-02 10:00:00-08"),
            "2024-01-02 10:00:00"
        );
        // A bare date must never lose its day to offset stripping.
        assert_eq!(normalize_timestamp("2024-01-02"), "2024-01-02");
    }

    #[test]
    fn test_year_bounds() {
        assert_eq!(normalize_timestamp("1899-12-31 23:59:59"), EPOCH_SENTINEL);
        assert_eq!(normalize_timestamp("2101-01-01 00:00:00"), EPOCH_SENTINEL);
        assert_eq!(
            normalize_timestamp("1900-01-01 00:00:00"),
            "1900-01-01 00:00:00"
        );
        assert_eq!(
            normalize_timestamp("2100-12-31 23:59:59"),
            "2100-12-31 23:59:59"
        );
    }

    #[test]
    fn test_calendar_fallback() {
        assert_eq!(
            normalize_timestamp("2024-01-02T10:00:00"),
            "2024-01-02 10:00:00"
        );
        assert_eq!(
            normalize_timestamp("2024/01/02 10:00:00"),
            "2024-01-02 10:00:00"
        );
        assert_eq!(normalize_timestamp("garbage"), EPOCH_SENTINEL);
        assert_eq!(normalize_timestamp(""), EPOCH_SENTINEL);
    }

    #[test]
    fn test_normalization_idempotent() {
        for input in [
            "2024-01-02 10:00:00",
            "202511-11-13 02:39:00",
            "2024-01-02T10:00:00",
            "garbage",
            "2024-01-02 10:00:00+05:30",
        ] {
            let once = normalize_timestamp(input);
            assert_eq!(normalize_timestamp(&once), once, "input {:?}", input);
        }
    }

    #[test]
    fn test_date_normalization() {
        assert_eq!(normalize_date("2024-01-02"), "2024-01-02");
        assert_eq!(normalize_date("2024-01-02 10:00:00"), "2024-01-02");
        assert_eq!(normalize_date("202411-01-02"), EPOCH_DATE_SENTINEL);
    }

    #[test]
    fn test_time_normalization() {
        assert_eq!(normalize_time("10:30:00"), Some("10:30:00".into()));
        assert_eq!(normalize_time("10:30:00.5"), Some("10:30:00.5".into()));
        assert_eq!(normalize_time("10:30"), Some("10:30:00".into()));
        assert_eq!(normalize_time("not a time"), None);
    }

    // ── Value conversion ───────────────────────────────────────────────

    #[test]
    fn test_boolean_conversion() {
        let (v, _) = convert_cell(PgType::Boolean, CellValue::Bool(true));
        assert_eq!(v, CellValue::BigInt(1));
        for s in ["t", "TRUE", "1", "yes", "ON"] {
            let (v, _) = convert_cell(PgType::Boolean, CellValue::Text(s.into()));
            assert_eq!(v, CellValue::BigInt(1), "truthy {:?}", s);
        }
        let (v, _) = convert_cell(PgType::Boolean, CellValue::Text("f".into()));
        assert_eq!(v, CellValue::BigInt(0));
    }

    #[test]
    fn test_json_passthrough_and_reencode() {
        let (v, w) = convert_cell(PgType::Json, CellValue::Text("{\"a\":1}".into()));
        assert_eq!(v, CellValue::Text("{\"a\":1}".into()));
        assert!(w.is_none());

        let (v, w) = convert_cell(PgType::Json, CellValue::Text("not json".into()));
        assert_eq!(v, CellValue::Text("\"not json\"".into()));
        assert!(w.is_some());
    }

    #[test]
    fn test_null_is_always_null() {
        for ty in [PgType::Boolean, PgType::Json, PgType::Timestamp, PgType::Array] {
            let (v, w) = convert_cell(ty, CellValue::Null);
            assert_eq!(v, CellValue::Null);
            assert!(w.is_none());
        }
    }

    #[test]
    fn test_corrupt_timestamp_warns() {
        let (v, w) = convert_cell(
            PgType::Timestamp,
            CellValue::Text("202511-11-13 02:39:00".into()),
        );
        assert_eq!(v, CellValue::Text(EPOCH_SENTINEL.into()));
        assert!(w.unwrap().contains("epoch"));
    }

    #[test]
    fn test_numeric_overflow_warns_but_passes() {
        let (v, w) = convert_cell(PgType::Numeric, CellValue::Text("12345678901.5".into()));
        assert_eq!(v, CellValue::Text("12345678901.5".into()));
        assert!(w.unwrap().contains("DECIMAL(20,10)"));

        let (_, w) = convert_cell(PgType::Numeric, CellValue::Text("1234567890.5".into()));
        assert!(w.is_none());
    }

    #[test]
    fn test_invalid_time_becomes_null() {
        let (v, w) = convert_cell(PgType::Time, CellValue::Text("25 o'clock".into()));
        assert_eq!(v, CellValue::Null);
        assert!(w.is_some());
    }

    // ── Array parsing ──────────────────────────────────────────────────

    #[test]
    fn test_array_with_null() {
        let json = pg_array_to_json("{1,2,NULL,4}").unwrap();
        assert_eq!(json, serde_json::json!([1, 2, null, 4]));
    }

    #[test]
    fn test_array_of_strings() {
        let json = pg_array_to_json("{\"a b\",\"c,d\",plain}").unwrap();
        assert_eq!(json, serde_json::json!(["a b", "c,d", "plain"]));
    }

    #[test]
    fn test_array_quoted_escapes() {
        let json = pg_array_to_json(r#"{"he said \"hi\"","back\\slash"}"#).unwrap();
        assert_eq!(json, serde_json::json!(["he said \"hi\"", "back\\slash"]));
    }

    #[test]
    fn test_empty_array() {
        assert_eq!(pg_array_to_json("{}").unwrap(), serde_json::json!([]));
    }

    #[test]
    fn test_nested_array() {
        let json = pg_array_to_json("{{1,2},{3,4}}").unwrap();
        assert_eq!(json, serde_json::json!([[1, 2], [3, 4]]));
    }

    #[test]
    fn test_malformed_array_is_none() {
        assert!(pg_array_to_json("1,2,3").is_none());
        assert!(pg_array_to_json("{1,2").is_none());
        assert!(pg_array_to_json("{1,2}trailing").is_none());
    }

    #[test]
    fn test_array_conversion_end_to_end() {
        let (v, w) = convert_cell(PgType::Array, CellValue::Text("{1,2,NULL,4}".into()));
        assert_eq!(v, CellValue::Text("[1,2,null,4]".into()));
        assert!(w.is_none());
    }

    // ── Literals ───────────────────────────────────────────────────────

    #[test]
    fn test_sql_literal_rendering() {
        assert_eq!(
            CellValue::BigInt(42).to_sql_literal(Dialect::Postgres),
            "42"
        );
        assert_eq!(
            CellValue::Text("o'brien".into()).to_sql_literal(Dialect::Postgres),
            "'o''brien'"
        );
        assert_eq!(CellValue::Null.to_sql_literal(Dialect::MySql), "NULL");
    }
}
