//! Property-based tests using proptest.
//!
//! Tests the key invariants of the engine:
//! - Type mapping totality (every input yields a valid target type)
//! - Default-expression translation safety (drop classes never leak)
//! - Timestamp normalization idempotence and sentinel behavior
//! - Year-bound sentinel
//! - Sample-content verdict invariance under row order
//! - Identifier quoting round trips
//! - Cursor / checkpoint JSON round trips

use pg_ferry::convert::{
    CellValue, EPOCH_SENTINEL, normalize_timestamp, pg_array_to_json,
};
use pg_ferry::dialect::Dialect;
use pg_ferry::schema::ColumnDescriptor;
use pg_ferry::typemap::{PgType, target_type, translate_default};
use pg_ferry::validate::{canonical_row, multisets_equal, row_digest};
use pg_ferry::stream::Cursor;
use proptest::prelude::*;

fn column_of(type_name: &str, max_len: Option<i32>) -> ColumnDescriptor {
    ColumnDescriptor {
        name: "c".into(),
        source_type_name: type_name.into(),
        pg_type: PgType::resolve(type_name),
        character_max_length: max_len,
        numeric_precision: None,
        numeric_scale: None,
        is_nullable: true,
        default_expr: None,
        ordinal: 1,
    }
}

/// The enumerated base types the mapping is specified over.
const KNOWN_TYPES: &[&str] = &[
    "smallint",
    "integer",
    "int",
    "bigint",
    "serial",
    "bigserial",
    "smallserial",
    "numeric",
    "decimal",
    "real",
    "double precision",
    "character varying",
    "varchar",
    "character",
    "char",
    "text",
    "bytea",
    "date",
    "time without time zone",
    "time with time zone",
    "timestamp without time zone",
    "timestamp with time zone",
    "interval",
    "boolean",
    "json",
    "jsonb",
    "uuid",
    "integer[]",
    "text[]",
];

/// Strategy: a well-formed timestamp with arbitrary (possibly absurd) year.
fn arb_timestamp() -> impl Strategy<Value = (i32, String)> {
    (1000i32..=9999, 1u32..=12, 1u32..=28, 0u32..24, 0u32..60, 0u32..60).prop_map(
        |(y, mo, d, h, mi, s)| {
            (
                y,
                format!("{:04}-{:02}-{:02} {:02}:{:02}:{:02}", y, mo, d, h, mi, s),
            )
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // ── Type mapping totality ──────────────────────────────────────

    #[test]
    fn prop_known_types_map_to_valid_target(idx in 0usize..KNOWN_TYPES.len(), len in proptest::option::of(1i32..100_000)) {
        let col = column_of(KNOWN_TYPES[idx], len);
        let mapped = target_type(&col);
        prop_assert!(!mapped.is_empty());
        // a target type never carries PG-only spellings
        prop_assert!(!mapped.to_lowercase().contains("without time zone"));
        prop_assert!(!mapped.to_lowercase().contains("bytea"));
    }

    #[test]
    fn prop_unknown_types_fall_back_to_longtext(name in "[a-z_][a-z0-9_]{0,20}") {
        // skip names that happen to be real types
        prop_assume!(PgType::resolve(&name) == PgType::Other);
        let col = column_of(&name, None);
        prop_assert_eq!(target_type(&col), "LONGTEXT");
    }

    #[test]
    fn prop_varchar_never_exceeds_inline_limit(len in 1i32..1_000_000) {
        let col = column_of("character varying", Some(len));
        let mapped = target_type(&col);
        if len <= 65_535 {
            prop_assert_eq!(mapped, format!("VARCHAR({})", len));
        } else {
            prop_assert_eq!(mapped, "LONGTEXT");
        }
    }

    // ── Default translation safety ─────────────────────────────────

    #[test]
    fn prop_regclass_defaults_always_dropped(seq in "[a-z_]{1,20}") {
        let expr = format!("nextval('{}_id_seq'::regclass)", seq);
        prop_assert_eq!(translate_default(&expr), None);
        let expr = format!("'{}'::regclass", seq);
        prop_assert_eq!(translate_default(&expr), None);
    }

    #[test]
    fn prop_translated_defaults_are_well_formed(expr in ".{0,40}") {
        // whatever comes out must be one of the emittable shapes;
        // dropping is always legal, emitting garbage never is
        if let Some(out) = translate_default(&expr) {
            let ok = out == "CURRENT_TIMESTAMP"
                || out == "CURRENT_DATE"
                || out == "TRUE"
                || out == "FALSE"
                || (out.starts_with('\'') && out.ends_with('\'') && out.len() >= 2)
                || out.parse::<f64>().is_ok();
            prop_assert!(ok, "unexpected default shape: {:?}", out);
        }
    }

    #[test]
    fn prop_literal_defaults_roundtrip(inner in "[a-zA-Z0-9 _-]{0,20}") {
        let expr = format!("'{}'::character varying", inner);
        prop_assert_eq!(translate_default(&expr), Some(format!("'{}'", inner)));
    }

    // ── Timestamp normalization ────────────────────────────────────

    #[test]
    fn prop_normalize_idempotent(input in ".{0,40}") {
        let once = normalize_timestamp(&input);
        prop_assert_eq!(normalize_timestamp(&once), once);
    }

    #[test]
    fn prop_leading_digit_run_hits_sentinel(
        digits in "[0-9]{5,10}",
        tail in ".{0,20}",
    ) {
        let input = format!("{}{}", digits, tail);
        prop_assert_eq!(normalize_timestamp(&input), EPOCH_SENTINEL);
    }

    #[test]
    fn prop_year_bound_sentinel((year, ts) in arb_timestamp()) {
        let normalized = normalize_timestamp(&ts);
        if (1900..=2100).contains(&year) {
            prop_assert_eq!(normalized, ts);
        } else {
            prop_assert_eq!(normalized, EPOCH_SENTINEL);
        }
    }

    #[test]
    fn prop_normalized_output_shape(input in ".{0,40}") {
        // whatever comes in, what comes out is epoch or starts with a
        // 4-digit year and a dash
        let out = normalize_timestamp(&input);
        let bytes = out.as_bytes();
        prop_assert!(out == EPOCH_SENTINEL
            || (bytes.len() >= 10
                && bytes[..4].iter().all(|b| b.is_ascii_digit())
                && bytes[4] == b'-'));
    }

    // ── Sample verdict order invariance ────────────────────────────

    #[test]
    fn prop_sample_verdict_order_invariant(rows in proptest::collection::vec("[a-z0-9]{1,12}", 1..30)) {
        let forward: Vec<u128> = rows.iter().map(|r| row_digest(r)).collect();
        let mut shuffled = rows.clone();
        shuffled.reverse();
        shuffled.rotate_left(rows.len() / 2);
        let permuted: Vec<u128> = shuffled.iter().map(|r| row_digest(r)).collect();
        prop_assert!(multisets_equal(forward, permuted));
    }

    #[test]
    fn prop_canonical_row_column_order_invariant(
        a in "[a-z0-9]{0,10}",
        b in "[a-z0-9]{0,10}",
    ) {
        let forward = canonical_row(
            &["alpha".into(), "beta".into()],
            &[Some(a.clone()), Some(b.clone())],
        );
        let reversed = canonical_row(
            &["beta".into(), "alpha".into()],
            &[Some(b), Some(a)],
        );
        prop_assert_eq!(forward, reversed);
    }

    // ── Identifier quoting ─────────────────────────────────────────

    #[test]
    fn prop_pg_quoting_escapes_all_quotes(ident in ".{0,24}") {
        let quoted = Dialect::Postgres.quote_ident(&ident);
        prop_assert!(quoted.starts_with('"') && quoted.ends_with('"'));
        // interior is the original with quotes doubled
        let interior = &quoted[1..quoted.len() - 1];
        prop_assert_eq!(interior.replace("\"\"", "\""), ident);
    }

    #[test]
    fn prop_mysql_quoting_escapes_all_backticks(ident in ".{0,24}") {
        let quoted = Dialect::MySql.quote_ident(&ident);
        prop_assert!(quoted.starts_with('`') && quoted.ends_with('`'));
        let interior = &quoted[1..quoted.len() - 1];
        prop_assert_eq!(interior.replace("``", "`"), ident);
    }

    // ── Cursor JSON round trips ────────────────────────────────────

    #[test]
    fn prop_int_cursor_roundtrips(v in any::<i64>()) {
        let cursor = Cursor::At(CellValue::BigInt(v));
        let json = serde_json::to_string(&cursor).unwrap();
        let back: Cursor = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, cursor);
    }

    #[test]
    fn prop_text_cursor_roundtrips(s in ".{0,32}") {
        let cursor = Cursor::At(CellValue::Text(s));
        let json = serde_json::to_string(&cursor).unwrap();
        let back: Cursor = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, cursor);
    }

    // ── Array conversion ───────────────────────────────────────────

    #[test]
    fn prop_int_array_roundtrips(values in proptest::collection::vec(any::<i32>(), 0..20)) {
        let literal = format!(
            "{{{}}}",
            values.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(",")
        );
        let json = pg_array_to_json(&literal).unwrap();
        let expected: Vec<serde_json::Value> =
            values.iter().map(|v| serde_json::json!(*v)).collect();
        prop_assert_eq!(json, serde_json::Value::Array(expected));
    }
}
