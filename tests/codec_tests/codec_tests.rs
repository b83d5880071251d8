//! Codec Tests
//!
//! Tests for value encoding/decoding and the type registry.

use std::collections::BTreeMap;

use prefstore::codec::MAX_DEPTH;
use prefstore::{Codec, StoreError, Value};
use serde::{Deserialize, Serialize};

// =============================================================================
// Helper Functions
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Point {
    x: i64,
    y: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Profile {
    name: String,
    tags: Vec<String>,
    origin: Point,
    avatar: Option<Vec<u8>>,
}

fn nested_list(levels: usize) -> Value {
    let mut value = Value::I32(0);
    for _ in 0..levels {
        value = Value::List(vec![value]);
    }
    value
}

fn round_trip(codec: &Codec, value: Value) {
    let encoded = codec.encode(&value).unwrap();
    let decoded = codec.decode(&encoded).unwrap();
    assert_eq!(decoded, value, "round trip changed {:?}", value);
}

// =============================================================================
// Scalar Round Trip Tests
// =============================================================================

#[test]
fn test_round_trip_integers() {
    let codec = Codec::new();

    for value in [
        Value::I8(0),
        Value::I8(i8::MIN),
        Value::I16(-300),
        Value::I32(i32::MAX),
        Value::I64(-1),
        Value::I64(i64::MIN),
        Value::U8(255),
        Value::U16(0),
        Value::U32(70_000),
        Value::U64(u64::MAX),
    ] {
        round_trip(&codec, value);
    }
}

#[test]
fn test_round_trip_floats_and_bools() {
    let codec = Codec::new();

    round_trip(&codec, Value::F32(-0.5));
    round_trip(&codec, Value::F64(std::f64::consts::PI));
    round_trip(&codec, Value::F64(0.0));
    round_trip(&codec, Value::Bool(true));
    round_trip(&codec, Value::Bool(false));
}

#[test]
fn test_round_trip_strings() {
    let codec = Codec::new();

    round_trip(&codec, Value::from(""));
    round_trip(&codec, Value::from("hello"));
    round_trip(&codec, Value::from("héllo wörld ✓ 日本語 🦀"));
}

#[test]
fn test_round_trip_bytes() {
    let codec = Codec::new();

    round_trip(&codec, Value::Bytes(Vec::new()));
    round_trip(&codec, Value::from(&b"\x00\xff\x10binary"[..]));
    round_trip(&codec, Value::Bytes(vec![0xAB; 4096]));
}

#[test]
fn test_types_are_preserved() {
    let codec = Codec::new();

    // Same numeric value, different width: must not collapse
    let small = codec.decode(&codec.encode(&Value::U8(7)).unwrap()).unwrap();
    let wide = codec.decode(&codec.encode(&Value::I64(7)).unwrap()).unwrap();

    assert_eq!(small, Value::U8(7));
    assert_eq!(wide, Value::I64(7));
    assert_ne!(small, wide);
}

// =============================================================================
// Container Round Trip Tests
// =============================================================================

#[test]
fn test_round_trip_nested_containers() {
    let codec = Codec::new();

    let mut inner = BTreeMap::new();
    inner.insert("enabled".to_string(), Value::Bool(true));
    inner.insert("ratio".to_string(), Value::F64(0.25));

    let mut outer = BTreeMap::new();
    outer.insert("inner".to_string(), Value::Map(inner));
    outer.insert(
        "list".to_string(),
        Value::List(vec![Value::I32(1), Value::from("two"), Value::List(vec![])]),
    );
    outer.insert("empty".to_string(), Value::Map(BTreeMap::new()));

    round_trip(&codec, Value::Map(outer));
}

#[test]
fn test_nesting_up_to_limit_round_trips() {
    let codec = Codec::new();

    round_trip(&codec, nested_list(MAX_DEPTH));

    let mut map = BTreeMap::new();
    map.insert("leaf".to_string(), Value::Bool(true));
    let mut value = Value::Map(map);
    for _ in 1..MAX_DEPTH {
        let mut outer = BTreeMap::new();
        outer.insert("child".to_string(), value);
        value = Value::Map(outer);
    }
    round_trip(&codec, value);
}

#[test]
fn test_encode_too_deep_fails() {
    let codec = Codec::new();

    assert!(matches!(
        codec.encode(&nested_list(MAX_DEPTH + 1)),
        Err(StoreError::Encoding(_))
    ));
}

#[test]
fn test_round_trip_nan() {
    let codec = Codec::new();

    round_trip(&codec, Value::F32(f32::NAN));
    round_trip(&codec, Value::F64(f64::NAN));
    round_trip(&codec, Value::List(vec![Value::F64(f64::NAN)]));
    assert_ne!(Value::F64(0.0), Value::F64(-0.0));
}

// =============================================================================
// Custom Type Tests
// =============================================================================

#[test]
fn test_round_trip_custom() {
    let codec = Codec::new();
    codec.register::<Point>("point").unwrap();
    codec.register::<Profile>("profile").unwrap();

    round_trip(&codec, Value::custom(Point { x: -3, y: 0 }));
    round_trip(
        &codec,
        Value::custom(Profile {
            name: "ünïcode".to_string(),
            tags: vec![],
            origin: Point { x: i64::MIN, y: i64::MAX },
            avatar: Some(Vec::new()),
        }),
    );
}

#[test]
fn test_custom_inside_containers() {
    let codec = Codec::new();
    codec.register::<Point>("point").unwrap();

    let value = Value::List(vec![
        Value::custom(Point { x: 1, y: 2 }),
        Value::custom(Point { x: 3, y: 4 }),
    ]);
    let decoded = codec.decode(&codec.encode(&value).unwrap()).unwrap();

    let items = decoded.as_list().unwrap();
    assert_eq!(items[1].downcast_ref::<Point>(), Some(&Point { x: 3, y: 4 }));
    assert_eq!(decoded, value);
}

#[test]
fn test_custom_values_compare_by_type() {
    #[derive(Debug, PartialEq)]
    struct Other {
        x: i64,
        y: i64,
    }

    let a = Value::custom(Point { x: 1, y: 2 });
    let b = Value::custom(Other { x: 1, y: 2 });

    assert_ne!(a, b);
    assert_eq!(a, Value::custom(Point { x: 1, y: 2 }));
    assert!(b.downcast_ref::<Point>().is_none());
}

#[test]
fn test_encode_unregistered_custom_fails() {
    let codec = Codec::new();

    let result = codec.encode(&Value::custom(Point { x: 1, y: 1 }));
    assert!(matches!(result, Err(StoreError::Encoding(_))));

    // Also when nested
    let nested = Value::List(vec![Value::I8(1), Value::custom(Point { x: 1, y: 1 })]);
    assert!(matches!(codec.encode(&nested), Err(StoreError::Encoding(_))));
}

#[test]
fn test_decode_unregistered_custom_fails() {
    let writer = Codec::new();
    writer.register::<Point>("point").unwrap();
    let encoded = writer.encode(&Value::custom(Point { x: 5, y: 6 })).unwrap();

    let reader = Codec::new();
    assert!(matches!(reader.decode(&encoded), Err(StoreError::Decoding(_))));

    reader.register::<Point>("point").unwrap();
    assert_eq!(
        reader.decode(&encoded).unwrap().downcast_ref::<Point>(),
        Some(&Point { x: 5, y: 6 })
    );
}

#[test]
fn test_decode_name_bound_to_other_type_fails() {
    let writer = Codec::new();
    writer.register::<Profile>("shape").unwrap();
    let encoded = writer
        .encode(&Value::custom(Profile {
            name: "p".to_string(),
            tags: vec!["a".to_string()],
            origin: Point { x: 0, y: 0 },
            avatar: None,
        }))
        .unwrap();

    // Same name, incompatible layout
    let reader = Codec::new();
    reader.register::<Point>("shape").unwrap();
    assert!(matches!(reader.decode(&encoded), Err(StoreError::Decoding(_))));
}

// =============================================================================
// Registry Tests
// =============================================================================

#[test]
fn test_register_is_idempotent() {
    let codec = Codec::new();

    codec.register::<Point>("point").unwrap();
    codec.register::<Point>("point").unwrap();

    assert!(codec.is_registered("point"));
    assert!(!codec.is_registered("profile"));
}

#[test]
fn test_register_conflicts() {
    let codec = Codec::new();
    codec.register::<Point>("point").unwrap();

    // Name already taken by another type
    assert!(matches!(
        codec.register::<Profile>("point"),
        Err(StoreError::Registration(_))
    ));

    // Type already registered under another name
    assert!(matches!(
        codec.register::<Point>("point2"),
        Err(StoreError::Registration(_))
    ));
}

// =============================================================================
// Malformed Input Tests
// =============================================================================

#[test]
fn test_decode_empty_input() {
    let codec = Codec::new();

    assert!(matches!(codec.decode(&[]), Err(StoreError::Decoding(_))));
}

#[test]
fn test_decode_truncated_input() {
    let codec = Codec::new();
    let encoded = codec.encode(&Value::from("a reasonably long string")).unwrap();

    for len in [1, 4, 8, encoded.len() - 1] {
        assert!(
            matches!(codec.decode(&encoded[..len]), Err(StoreError::Decoding(_))),
            "truncation to {} bytes was accepted",
            len
        );
    }
}

#[test]
fn test_decode_trailing_garbage() {
    let codec = Codec::new();
    let mut encoded = codec.encode(&Value::U32(1)).unwrap();
    encoded.push(0);

    assert!(matches!(codec.decode(&encoded), Err(StoreError::Decoding(_))));
}

#[test]
fn test_decode_unknown_tag() {
    let codec = Codec::new();

    let bytes = 0xFFFF_FFFFu32.to_le_bytes();
    assert!(matches!(codec.decode(&bytes), Err(StoreError::Decoding(_))));
}

#[test]
fn test_decode_deeply_nested_list() {
    let codec = Codec::new();

    // List tag followed by a count of one, over and over
    let mut bytes = Vec::new();
    for _ in 0..200_000 {
        bytes.extend_from_slice(&13u32.to_le_bytes());
        bytes.extend_from_slice(&1u64.to_le_bytes());
    }

    assert!(matches!(codec.decode(&bytes), Err(StoreError::Decoding(_))));
}

#[test]
fn test_decode_deeply_nested_map() {
    let codec = Codec::new();

    // Map tag, one entry, key "k", then the next map as its value
    let mut bytes = Vec::new();
    for _ in 0..200_000 {
        bytes.extend_from_slice(&14u32.to_le_bytes());
        bytes.extend_from_slice(&1u64.to_le_bytes());
        bytes.extend_from_slice(&1u64.to_le_bytes());
        bytes.push(b'k');
    }

    assert!(matches!(codec.decode(&bytes), Err(StoreError::Decoding(_))));
}

#[test]
fn test_decode_one_level_past_limit() {
    let codec = Codec::new();
    let mut bytes = codec.encode(&nested_list(MAX_DEPTH)).unwrap();

    // Wrap the encoded value in one more single-element list
    let mut deeper = Vec::new();
    deeper.extend_from_slice(&13u32.to_le_bytes());
    deeper.extend_from_slice(&1u64.to_le_bytes());
    deeper.append(&mut bytes);

    assert!(matches!(codec.decode(&deeper), Err(StoreError::Decoding(_))));
}

#[test]
fn test_decode_invalid_utf8() {
    let codec = Codec::new();
    let mut encoded = codec.encode(&Value::from("ok")).unwrap();
    let last = encoded.len() - 1;
    encoded[last] = 0xFF;

    assert!(matches!(codec.decode(&encoded), Err(StoreError::Decoding(_))));
}

// =============================================================================
// Accessor Tests
// =============================================================================

#[test]
fn test_value_accessors() {
    assert_eq!(Value::I8(-5).as_i64(), Some(-5));
    assert_eq!(Value::U64(u64::MAX).as_i64(), None);
    assert_eq!(Value::I32(-1).as_u64(), None);
    assert_eq!(Value::U16(9).as_u64(), Some(9));
    assert_eq!(Value::F32(1.5).as_f64(), Some(1.5));
    assert_eq!(Value::from("s").as_str(), Some("s"));
    assert_eq!(Value::from(vec![1u8, 2]).as_bytes(), Some(&[1u8, 2][..]));
    assert_eq!(Value::Bool(true).as_bool(), Some(true));
    assert_eq!(Value::Bool(true).as_str(), None);
    assert_eq!(Value::List(vec![]).kind(), "list");
    assert_eq!(Value::List(vec![Value::U8(1)]).as_list(), Some(&[Value::U8(1)][..]));

    let mut map = BTreeMap::new();
    map.insert("k".to_string(), Value::from("v"));
    let value = Value::Map(map.clone());
    assert_eq!(value.as_map(), Some(&map));
    assert_eq!(Value::from("s").as_map(), None);
}
