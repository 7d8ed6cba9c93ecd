use super::*;

#[test]
fn text_literal_escapes_quotes() {
    assert_eq!(Value::text("it's").to_cql_literal(), "'it''s'");
}

#[test]
fn collection_literals_use_cql_brackets() {
    let list = Value::List(vec![Value::Int(1), Value::Int(2)]);
    let set = Value::Set(vec![Value::text("a")]);
    let map = Value::Map(vec![(Value::text("k"), Value::BigInt(7))]);

    assert_eq!(list.to_cql_literal(), "[1, 2]");
    assert_eq!(set.to_cql_literal(), "{'a'}");
    assert_eq!(map.to_cql_literal(), "{'k': 7}");
}

#[test]
fn blob_and_null_literals() {
    assert_eq!(Value::Blob(vec![0, 0xab]).to_cql_literal(), "0x00ab");
    assert_eq!(Value::Null.to_cql_literal(), "NULL");
}

#[test]
fn uuid_literal_uses_hyphenated_layout() {
    let id = Ulid::from(0x0123_4567_89ab_cdef_0123_4567_89ab_cdef_u128);
    let literal = Value::Uuid(id).to_cql_literal();

    assert_eq!(literal, "01234567-89ab-cdef-0123-456789abcdef");
}

#[test]
fn udt_literal_keeps_field_order() {
    let udt = UdtValue::new("geo_point").with("lat", 1.5).with("lon", -2.0);

    assert_eq!(Value::Udt(udt).to_cql_literal(), "{lat: 1.5, lon: -2}");
}

#[test]
fn udt_set_replaces_existing_field() {
    let mut udt = UdtValue::new("address").with("city", "Paris");
    udt.set("city", "Lyon");
    udt.set("street", "Rue 1");

    assert_eq!(udt.fields.len(), 2);
    assert_eq!(udt.get("city"), Some(&Value::text("Lyon")));
    assert_eq!(udt.get("missing"), None);
}

#[test]
fn labels_name_the_value_kind() {
    assert_eq!(Value::Null.label(), "null");
    assert_eq!(Value::Set(Vec::new()).label(), "set");
    assert_eq!(Value::Udt(UdtValue::default()).tag(), ValueTag::Udt);
}

#[test]
fn values_serialize_through_serde_json() {
    let value = Value::List(vec![
        Value::text("x"),
        Value::Udt(UdtValue::new("t").with("n", 3)),
        Value::Null,
    ]);

    let json = serde_json::to_string(&value).expect("serialize value");
    let back: Value = serde_json::from_str(&json).expect("deserialize value");

    assert_eq!(back, value);
}
