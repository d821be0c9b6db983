//! Selector Translation Tests
//!
//! Tests for selector compilation:
//! - Empty selectors match everything
//! - Placeholders are unique and contiguous from the given offset
//! - Nested $or/$and thread their offsets
//! - Compilation is deterministic
//! - Field names can never inject SQL

use docsql::schema::{CollectionSchema, FieldType, Schemaless};
use docsql::translate::{compile_field, compile_selector, Param, TranslateErrorCode};
use serde_json::json;

// =============================================================================
// Helper Functions
// =============================================================================

fn posts() -> CollectionSchema {
    CollectionSchema::new("posts")
        .with_field("title", FieldType::String)
        .with_field("baseScore", FieldType::Int)
        .with_field("postedAt", FieldType::Date)
        .with_field("draft", FieldType::Bool)
}

/// Placeholders must run $offset, $offset+1, ... with one arg each
fn assert_contiguous(sql_placeholders: &[usize], args: usize, offset: usize) {
    let expected: Vec<usize> = (offset..offset + args).collect();
    assert_eq!(sql_placeholders, expected.as_slice());
}

// =============================================================================
// Trivial Selectors
// =============================================================================

/// Empty selector is the trivial true predicate with no args.
#[test]
fn test_empty_selector_is_true() {
    for offset in [1, 5, 100] {
        let fragment = compile_selector(&posts(), &json!({}), offset).unwrap();
        assert_eq!(fragment.sql, "TRUE");
        assert!(fragment.args.is_empty());
    }
}

/// `$in: []` never matches, on any field.
#[test]
fn test_empty_in_matches_nothing() {
    for field in ["title", "baseScore", "unknownField", "_id"] {
        let fragment = compile_selector(&posts(), &json!({ field: {"$in": []} }), 1).unwrap();
        assert_eq!(fragment.sql, "FALSE");
        assert!(fragment.args.is_empty());
    }
}

/// Empty boolean lists contribute no constraint.
#[test]
fn test_empty_boolean_lists_are_null() {
    assert_eq!(compile_field(&Schemaless, "$or", &json!([]), 1).unwrap(), None);
    assert_eq!(compile_field(&Schemaless, "$and", &json!([]), 1).unwrap(), None);
}

// =============================================================================
// Placeholder Numbering
// =============================================================================

/// `$in` with n values binds n contiguous placeholders.
#[test]
fn test_in_binds_n_contiguous_params() {
    for n in 1..=6 {
        let values: Vec<String> = (0..n).map(|i| format!("id{}", i)).collect();
        let fragment = compile_selector(&posts(), &json!({"userId": {"$in": values}}), 3).unwrap();
        assert_eq!(fragment.args.len(), n);
        assert_contiguous(&fragment.placeholders(), n, 3);
    }
}

/// `{$or: [{a:1},{b:2}]}` from offset 1 gets $1 and $2.
#[test]
fn test_or_subselectors_do_not_collide() {
    let fragment = compile_selector(&Schemaless, &json!({"$or": [{"a": 1}, {"b": 2}]}), 1).unwrap();
    assert_eq!(fragment.sql, "(json @> $1::jsonb OR json @> $2::jsonb)");
    assert_eq!(
        fragment.args,
        vec![Param::Json(json!({"a": 1})), Param::Json(json!({"b": 2}))]
    );
}

/// Deeply nested selectors keep one unbroken placeholder sequence.
#[test]
fn test_deep_nesting_offsets() {
    let selector = json!({
        "title": "x",
        "$or": [
            {"baseScore": {"$gte": 10}},
            {"$and": [
                {"_id": {"$in": ["a", "b"]}},
                {"$or": [{"c": {"$ne": "z"}}, {"d": {"$lt": 3}}]}
            ]}
        ],
        "postedAt": {"$gt": {"$date": "2020-01-01T00:00:00Z"}}
    });
    let fragment = compile_selector(&posts(), &selector, 7).unwrap();
    assert_eq!(fragment.args.len(), 7);
    assert_contiguous(&fragment.placeholders(), 7, 7);
}

// =============================================================================
// Determinism
// =============================================================================

/// Same selector and offset give byte-identical output.
#[test]
fn test_compilation_is_idempotent() {
    let selector = json!({
        "userId": "u1",
        "$or": [{"draft": false}, {"baseScore": {"$in": [1, 2, 3]}}],
        "af": {"$exists": true}
    });
    let first = compile_selector(&posts(), &selector, 2).unwrap();
    for _ in 0..50 {
        assert_eq!(compile_selector(&posts(), &selector, 2).unwrap(), first);
    }
}

// =============================================================================
// Operator Semantics
// =============================================================================

/// `$exists` true and false are complementary and bind nothing.
#[test]
fn test_exists_complementary() {
    let yes = compile_selector(&Schemaless, &json!({"a": {"$exists": true}}), 1).unwrap();
    let no = compile_selector(&Schemaless, &json!({"a": {"$exists": false}}), 1).unwrap();
    assert_eq!(no.sql, format!("NOT ({})", yes.sql));
    assert!(yes.args.is_empty());
    assert!(no.args.is_empty());
}

/// Declared string fields in `$in` use text extraction.
#[test]
fn test_declared_type_drives_extraction() {
    let fragment = compile_selector(&posts(), &json!({"baseScore": {"$in": [1, 2]}}), 1).unwrap();
    assert_eq!(fragment.sql, "(json->'baseScore')::bigint IN ($1, $2)");

    let err = compile_selector(&posts(), &json!({"baseScore": {"$in": ["1"]}}), 1).unwrap_err();
    assert_eq!(err.code(), TranslateErrorCode::InvalidOperandType);
}

/// Unsupported operators are rejected, never silently dropped.
#[test]
fn test_unsupported_operators() {
    for selector in [
        json!({"$not": {"a": 1}}),
        json!({"$nor": [{"a": 1}]}),
        json!({"a": {"$regex": "x"}}),
        json!({"a": {"$gt": 1, "$elemMatch": {}}}),
        json!({"_id": {"$ne": "x"}}),
    ] {
        let err = compile_selector(&Schemaless, &selector, 1).unwrap_err();
        assert_eq!(err.code(), TranslateErrorCode::UnsupportedOperator, "{}", selector);
    }
}

/// Operand shape errors.
#[test]
fn test_invalid_operands() {
    for selector in [
        json!({"a": {"$in": "x"}}),
        json!({"a": {"$in": [1, "x"]}}),
        json!({"a": {"$in": [{"b": 1}]}}),
        json!({"a": [1, 2]}),
        json!({"$or": {"a": 1}}),
        json!({"_id": {"$in": [1]}}),
        json!({"a": {"$gt": null}}),
    ] {
        let err = compile_selector(&Schemaless, &selector, 1).unwrap_err();
        assert_eq!(err.code(), TranslateErrorCode::InvalidOperandType, "{}", selector);
    }
}

/// `$ne` against an object has no inferable type.
#[test]
fn test_ne_object_type_inference_fails() {
    let err = compile_selector(&Schemaless, &json!({"a": {"$ne": {"b": 1}}}), 1).unwrap_err();
    assert_eq!(err.code(), TranslateErrorCode::TypeInferenceFailed);
}

// =============================================================================
// Containment Batching Edge Cases
// =============================================================================

/// Numbers are batched by JSON value; jsonb containment compares numerically,
/// so 1 and 1.0 match the same documents. The bound payload keeps the
/// caller's number unchanged.
#[test]
fn test_containment_numbers_kept_verbatim() {
    let int = compile_selector(&Schemaless, &json!({"n": 1}), 1).unwrap();
    let float = compile_selector(&Schemaless, &json!({"n": 1.5}), 1).unwrap();
    assert_eq!(int.args, vec![Param::Json(json!({"n": 1}))]);
    assert_eq!(float.args, vec![Param::Json(json!({"n": 1.5}))]);
}

/// Large integers survive batching without precision loss.
#[test]
fn test_containment_large_integer() {
    let fragment = compile_selector(&Schemaless, &json!({"n": 9007199254740993_i64}), 1).unwrap();
    assert_eq!(fragment.args, vec![Param::Json(json!({"n": 9007199254740993_i64}))]);
}

/// Unsigned integers above i64::MAX are rejected rather than rounded.
#[test]
fn test_integer_beyond_i64_rejected() {
    for selector in [
        json!({"n": 18446744073709551615_u64}),
        json!({"n": {"$gt": 18446744073709551615_u64}}),
        json!({"n": {"$in": [18446744073709551615_u64, 1]}}),
    ] {
        let err = compile_selector(&Schemaless, &selector, 1).unwrap_err();
        assert_eq!(err.code(), TranslateErrorCode::InvalidOperandType, "{}", selector);
    }
}

/// An offset at the end of the placeholder range is an error, not a wrap.
#[test]
fn test_offset_overflow_rejected() {
    let err = compile_selector(&Schemaless, &json!({"a": 1}), usize::MAX).unwrap_err();
    assert_eq!(err.code(), TranslateErrorCode::InvalidOperandType);

    let empty = compile_selector(&Schemaless, &json!({}), usize::MAX).unwrap();
    assert_eq!(empty.sql, "TRUE");
}

/// Nested paths and dates are never batched; containment would compare
/// the wrong shape for them.
#[test]
fn test_containment_excludes_nested_and_dates() {
    let fragment = compile_selector(
        &Schemaless,
        &json!({"a.b": 1, "at": {"$date": 1000}}),
        1,
    )
    .unwrap();
    assert!(!fragment.sql.contains("@>"));
    assert_eq!(fragment.args.len(), 2);
}

/// Booleans and strings share one containment parameter.
#[test]
fn test_containment_batches_all_simple_fields() {
    let fragment =
        compile_selector(&Schemaless, &json!({"a": "x", "b": true, "c": 2}), 1).unwrap();
    assert_eq!(fragment.sql, "json @> $1::jsonb");
    assert_eq!(fragment.args.len(), 1);
}

// =============================================================================
// Injection Resistance
// =============================================================================

/// Hostile field names are rejected before any SQL is produced.
#[test]
fn test_field_name_injection_rejected() {
    for field in [
        "a') OR TRUE --",
        "a'b",
        "a b",
        "a..b",
        ".a",
        "1a",
        "a\u{0}",
    ] {
        let err = compile_selector(&Schemaless, &json!({ field: {"$exists": true} }), 1).unwrap_err();
        assert_eq!(err.code(), TranslateErrorCode::InvalidFieldName, "{:?}", field);
    }
}

/// Hostile values are always bound, never spliced.
#[test]
fn test_values_never_spliced() {
    let hostile = "x' OR '1'='1";
    for selector in [
        json!({"a": hostile}),
        json!({"a.b": hostile}),
        json!({"a": {"$ne": hostile}}),
        json!({"a": {"$in": [hostile]}}),
        json!({"a": {"$gt": hostile}}),
        json!({"_id": hostile}),
    ] {
        let fragment = compile_selector(&Schemaless, &selector, 1).unwrap();
        assert!(!fragment.sql.contains(hostile), "{}", fragment.sql);
        assert!(!fragment.args.is_empty());
    }
}
