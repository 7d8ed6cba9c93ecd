use super::*;
use crate::{
    test_fixtures::{Address, GeoPoint, Person},
    value::{UdtValue, Value},
};

///
/// FixedSource
///

struct FixedSource(UserType);

impl SchemaSource for FixedSource {
    fn user_type(&self, keyspace: &str, name: &str) -> Option<UserType> {
        (self.0.keyspace == keyspace && self.0.name == name).then(|| self.0.clone())
    }
}

fn geo() -> Arc<ClassDescriptor> {
    resolve::descriptor::<GeoPoint>().expect("resolve geo point")
}

fn point(lat: f64, lon: f64) -> UdtValue {
    UdtValue::new("geo_point").with("lat", lat).with("lon", lon)
}

#[test]
fn default_codec_is_synthesized_and_cached() {
    let registry = CodecRegistry::new();
    let geo = geo();

    let codec = registry.get_codec(&geo, "k").expect("default codec");
    assert_eq!(codec.source(), CodecSource::Default);
    assert_eq!(
        codec.definition().fields,
        [
            ("lat".to_string(), "double".to_string()),
            ("lon".to_string(), "double".to_string())
        ]
    );

    let again = registry.get_codec(&geo, "k").expect("cached codec");
    assert!(Arc::ptr_eq(&codec, &again));
    assert_eq!(registry.len(), 1);

    // codecs are per physical keyspace
    registry.get_codec(&geo, "k_other").expect("second keyspace");
    assert_eq!(registry.len(), 2);
}

#[test]
fn nested_udt_columns_are_frozen_in_default_definition() {
    let registry = CodecRegistry::new();
    let address = resolve::descriptor::<Address>().expect("resolve address");

    let codec = registry.get_codec(&address, "k").expect("address codec");
    let location = codec
        .definition()
        .fields
        .iter()
        .find(|(name, _)| name == "location")
        .map(|(_, cql)| cql.as_str());

    assert_eq!(location, Some("frozen<geo_point>"));
}

#[test]
fn live_definition_orders_encoded_fields() {
    let live = UserType::new("k", "geo_point")
        .field("lon", "double")
        .field("lat", "double")
        .field("alt", "double");
    let registry = CodecRegistry::with_source(Arc::new(FixedSource(live)));

    let codec = registry.get_codec(&geo(), "k").expect("live codec");
    assert_eq!(codec.source(), CodecSource::Live);

    let encoded = codec.encode(&point(1.0, 2.0));
    let names: Vec<_> = encoded.fields.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, ["lon", "lat", "alt"]);
    assert_eq!(encoded.get("alt"), Some(&Value::Null));
}

#[test]
fn registering_a_definition_replaces_the_cached_codec() {
    let registry = CodecRegistry::new();
    let geo = geo();
    let before = registry.get_codec(&geo, "k").expect("default codec");

    let replaced = registry.register(&UserType::new("k", "geo_point").field("lon", "double"));
    assert_eq!(replaced, 1);

    let after = registry.get_codec(&geo, "k").expect("live codec");
    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(after.source(), CodecSource::Live);

    // fields missing from the live definition read back as null
    let decoded = after.decode(&point(3.0, 4.0)).expect("decode");
    assert_eq!(decoded.get("lat"), Some(&Value::Null));
    assert_eq!(decoded.get("lon"), Some(&Value::Double(4.0)));
}

#[test]
fn deregistering_falls_back_to_default() {
    let registry = CodecRegistry::new();
    let geo = geo();
    let definition = UserType::new("k", "geo_point").field("lat", "double");

    registry.register(&definition);
    assert_eq!(registry.deregister(&definition), 1);
    assert!(registry.is_empty());

    let codec = registry.get_codec(&geo, "k").expect("default codec");
    assert_eq!(codec.source(), CodecSource::Default);
}

#[test]
fn decode_rejects_mistyped_fields() {
    let registry = CodecRegistry::new();
    let codec = registry.get_codec(&geo(), "k").expect("default codec");

    let stored = UdtValue::new("geo_point").with("lat", "north").with("lon", 1.0);
    let err = codec.decode(&stored).expect_err("text is not a double");

    assert!(err.to_string().contains("lat"));
}

#[test]
fn table_entities_have_no_codec() {
    let registry = CodecRegistry::new();
    let person = resolve::descriptor::<Person>().expect("resolve person");

    assert!(registry.get_codec(&person, "k").is_err());
}
