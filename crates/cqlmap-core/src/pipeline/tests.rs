use super::*;
use crate::{
    declare::{Declaration, Entity, Field, JsonPersister, Keyspace, Persisted, Table},
    error::MissingKind,
    model::ClassDescriptor,
    test_fixtures::{Account, Animal, Cat, Dog, PageViews, Person},
    types::{Blob, DataType, Scalar, Varint},
};
use chrono::{DateTime, NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::{collections::BTreeMap, sync::Arc};
use ulid::Ulid;

///
/// Scalars
///
/// One column per scalar type, plus a list kept as JSON text.
///

#[derive(Clone, Debug, Default, PartialEq)]
struct Scalars {
    id: String,
    flag: bool,
    tiny: i8,
    small: i16,
    int: i32,
    big: i64,
    float: f32,
    double: f64,
    decimal: Decimal,
    varint: Varint,
    day: NaiveDate,
    at: DateTime<Utc>,
    blob: Blob,
    uuid: Ulid,
    labels: Vec<String>,
}

impl Entity for Scalars {
    fn declare() -> Declaration<Self> {
        Declaration::new()
            .entity()
            .keyspace(Keyspace::new("k"))
            .table(Table::new("scalars"))
            .field(
                Field::new("id")
                    .column("id")
                    .partition_key()
                    .direct(|s: &Self| &s.id, |s| &mut s.id),
            )
            .field(Field::new("flag").column("flag").direct(|s: &Self| &s.flag, |s| &mut s.flag))
            .field(Field::new("tiny").column("tiny").direct(|s: &Self| &s.tiny, |s| &mut s.tiny))
            .field(
                Field::new("small")
                    .column("small")
                    .direct(|s: &Self| &s.small, |s| &mut s.small),
            )
            .field(Field::new("int").column("int").direct(|s: &Self| &s.int, |s| &mut s.int))
            .field(Field::new("big").column("big").direct(|s: &Self| &s.big, |s| &mut s.big))
            .field(
                Field::new("float")
                    .column("float")
                    .direct(|s: &Self| &s.float, |s| &mut s.float),
            )
            .field(
                Field::new("double")
                    .column("double")
                    .direct(|s: &Self| &s.double, |s| &mut s.double),
            )
            .field(
                Field::new("decimal")
                    .column("decimal")
                    .direct(|s: &Self| &s.decimal, |s| &mut s.decimal),
            )
            .field(
                Field::new("varint")
                    .column("varint")
                    .direct(|s: &Self| &s.varint, |s| &mut s.varint),
            )
            .field(Field::new("day").column("day").direct(|s: &Self| &s.day, |s| &mut s.day))
            .field(Field::new("at").column("at").direct(|s: &Self| &s.at, |s| &mut s.at))
            .field(Field::new("blob").column("blob").direct(|s: &Self| &s.blob, |s| &mut s.blob))
            .field(Field::new("uuid").column("uuid").direct(|s: &Self| &s.uuid, |s| &mut s.uuid))
            .field(
                Field::new("labels")
                    .column("labels")
                    .persisted(Persisted::new(
                        DataType::Scalar(Scalar::Text),
                        JsonPersister::of::<Vec<String>>(),
                    ))
                    .direct(|s: &Self| &s.labels, |s| &mut s.labels),
            )
    }
}

prop_compose! {
    fn scalars()(
        (id, flag, tiny, small, int, big) in (
            "[a-z0-9]{1,12}",
            any::<bool>(),
            any::<i8>(),
            any::<i16>(),
            any::<i32>(),
            any::<i64>(),
        ),
        (float, double, mantissa, scale, varint) in (
            prop::num::f32::NORMAL | prop::num::f32::ZERO,
            prop::num::f64::NORMAL | prop::num::f64::ZERO,
            any::<i64>(),
            0_u32..=28,
            any::<i128>(),
        ),
        (day, millis, blob, uuid, labels) in (
            1_i32..=3_652_059,
            0_i64..=4_102_444_800_000,
            prop::collection::vec(any::<u8>(), 0..32),
            any::<u128>(),
            prop::collection::vec(".*", 0..4),
        ),
    ) -> Scalars {
        Scalars {
            id,
            flag,
            tiny,
            small,
            int,
            big,
            float,
            double,
            decimal: Decimal::new(mantissa, scale),
            varint: Varint::from(varint),
            day: NaiveDate::from_num_days_from_ce_opt(day).expect("day in range"),
            at: DateTime::from_timestamp_millis(millis).expect("instant in range"),
            blob: Blob(blob),
            uuid: Ulid::from(uuid),
            labels,
        }
    }
}

proptest! {
    #[test]
    fn every_scalar_survives_the_column_pipeline(sample in scalars()) {
        let codecs = CodecRegistry::new();
        let descriptor = resolve::descriptor::<Scalars>().expect("resolve scalars");
        let columns = descriptor.tables()[0].columns();

        let mut read = Vec::new();
        let mut row = Row::new();
        for column in columns {
            let value = column.peek_value(&sample).expect("read column");
            column.validate_value(&value).expect("valid column value");
            let stored = column.encode_value(value.clone(), "k", &codecs).expect("encode");
            row = row.with(column.column_or_name(), stored);
            read.push(value);
        }

        for (column, value) in columns.iter().zip(read) {
            let decoded = column.decode_value(&row, "k", &codecs).expect("decode");
            prop_assert_eq!(decoded, Some(value));
        }

        let object = descriptor
            .decode_object("scalars", &row, "k", &BTreeMap::new(), &codecs)
            .expect("decode row");
        prop_assert_eq!(object.downcast::<Scalars>().expect("scalars"), Box::new(sample));
    }
}

fn person() -> Arc<ClassDescriptor> {
    resolve::descriptor::<Person>().expect("resolve person")
}

fn animal() -> Arc<ClassDescriptor> {
    resolve::descriptor::<Animal>().expect("resolve animal")
}

fn field(descriptor: &ClassDescriptor, name: &str) -> Arc<FieldDescriptor> {
    descriptor.field(name).cloned().expect("field exists")
}

// Row holding every column of an instance, encoded for the given keyspace.
fn encoded_row(descriptor: &ClassDescriptor, object: &dyn Any, codecs: &CodecRegistry) -> Row {
    descriptor.tables()[0]
        .columns()
        .iter()
        .map(|c| {
            let value = c.peek_value(object).expect("read column");
            let value = c.encode_value(value, "k", codecs).expect("encode column");
            (c.column_or_name().to_string(), value)
        })
        .collect()
}

#[test]
fn null_values_are_checked_by_role() {
    let person = person();
    let animal = animal();

    let null = |d: &ClassDescriptor, name: &str| field(d, name).validate_value(&Value::Null);

    assert!(matches!(
        null(&person, "name"),
        Err(Error::Validation(ValidationError::NullMandatory { column })) if column == "name"
    ));
    assert!(matches!(
        null(&person, "age"),
        Err(Error::Validation(ValidationError::NullMandatory { .. }))
    ));
    assert!(matches!(
        null(&person, "id"),
        Err(Error::Validation(ValidationError::NullPrimaryKey { .. }))
    ));
    assert!(matches!(
        null(&animal, "kind"),
        Err(Error::Validation(ValidationError::NullTypeKey { .. }))
    ));
    assert!(null(&person, "nickname").is_ok());
}

#[test]
fn mistyped_value_names_the_column() {
    let err = field(&person(), "age")
        .validate_value(&Value::text("old"))
        .expect_err("text is not an int");

    let message = err.to_string();
    assert!(message.contains("'age'"), "{message}");
    assert!(message.contains("int"), "{message}");
}

#[test]
fn multi_key_accepts_a_single_element() {
    let user = resolve::descriptor::<crate::test_fixtures::User>().expect("resolve user");
    let roles = user.field("roles").expect("roles field");

    assert!(roles.validate_value(&Value::text("admin")).is_ok());
    assert!(roles.validate_value(&Value::Set(vec![Value::text("admin")])).is_ok());
    assert!(roles.validate_value(&Value::Int(1)).is_err());
}

#[test]
fn excluded_keyspace_key_is_rejected() {
    let account = resolve::descriptor::<Account>().expect("resolve account");
    let tenant = field(&account, "tenant");

    let err = tenant
        .validate_value(&Value::text("system"))
        .expect_err("system is excluded");
    assert!(err.is_excluded_key());
    assert!(tenant.validate_value(&Value::text("acme")).is_ok());

    assert!(account.check_keyspace_key("tenant", "system").is_err());
    assert!(account.check_keyspace_key("region", "eu").is_err());
}

#[test]
fn keyspace_values_name_the_physical_keyspace() {
    let account = resolve::descriptor::<Account>().expect("resolve account");
    let mut object = Account {
        tenant: "Acme".to_string(),
        id: "a1".to_string(),
        balance: 10,
    };

    let values = account.keyspace_values(&mut object).expect("keyspace values");
    assert_eq!(values.get("tenant").map(String::as_str), Some("Acme"));
    assert_eq!(account.keyspace_name(&values).expect("name"), "bank_acme");

    assert!(matches!(
        account.keyspace_name(&BTreeMap::new()),
        Err(Error::Validation(ValidationError::MissingKeyspaceKey { .. }))
    ));
}

#[test]
fn inherited_field_is_read_through_the_ancestor() {
    let dog = Dog::named("d1", "Rex");

    // the root's accessor walks from the variant to the embedded ancestor
    let name = field(&animal(), "name");
    assert_eq!(name.peek_value(&dog).expect("read name"), Value::text("Rex"));

    let mut dog = dog;
    name.set_value(&mut dog, Value::text("Max")).expect("write name");
    assert_eq!(dog.base.name, "Max");
}

#[test]
fn type_key_is_derived_and_written_back() {
    let dog_descriptor = resolve::descriptor::<Dog>().expect("resolve dog");
    let kind = field(&dog_descriptor, "kind");

    let mut dog = Dog::named("d1", "Rex");
    dog.base.kind = "wolf".to_string();
    assert_eq!(kind.peek_value(&dog).expect("peek"), Value::text("dog"));
    assert_eq!(dog.base.kind, "wolf");

    assert_eq!(kind.get_value(&mut dog).expect("get"), Value::text("dog"));
    assert_eq!(dog.base.kind, "dog");

    // the root's type key looks the runtime type up in the registry
    let cat = Cat::default();
    let root_kind = field(&animal(), "kind");
    assert_eq!(root_kind.peek_value(&cat).expect("peek"), Value::text("cat"));
}

#[test]
fn root_row_decodes_into_the_named_variant() {
    let codecs = CodecRegistry::new();
    let row = Row::new()
        .with("kind", "dog")
        .with("id", "d1")
        .with("name", "Rex")
        .with("breed", "pug")
        .with("lives", Value::Null);

    let object = animal()
        .decode_object("animal", &row, "zoo", &BTreeMap::new(), &codecs)
        .expect("decode dog");
    let dog = object.downcast::<Dog>().expect("a dog");

    assert_eq!(dog.base.id, "d1");
    assert_eq!(dog.base.name, "Rex");
    assert_eq!(dog.base.kind, "dog");
    assert_eq!(dog.breed, "pug");
}

#[test]
fn root_row_with_unusable_type_key_fails() {
    let codecs = CodecRegistry::new();
    let animal = animal();
    let keys = BTreeMap::new();

    let unknown = Row::new().with("kind", "fish").with("id", "f1");
    assert!(matches!(
        animal.decode_object("animal", &unknown, "zoo", &keys, &codecs),
        Err(Error::Validation(ValidationError::UnknownVariant { variant, .. })) if variant == "fish"
    ));

    let missing = Row::new().with("id", "f1");
    assert!(matches!(
        animal.decode_object("animal", &missing, "zoo", &keys, &codecs),
        Err(Error::MissingValue(MissingValueError {
            kind: MissingKind::TypeKey,
            ..
        }))
    ));
}

#[test]
fn missing_key_and_mandatory_columns_fail_decoding() {
    let codecs = CodecRegistry::new();
    let person = person();
    let keys = BTreeMap::new();

    let no_id = Row::new().with("name", "Ada").with("age", 36);
    assert!(matches!(
        person.decode_object("person", &no_id, "k", &keys, &codecs),
        Err(Error::MissingValue(MissingValueError {
            kind: MissingKind::PartitionKey,
            ..
        }))
    ));

    let no_name = Row::new().with("id", "p1").with("age", 36);
    assert!(matches!(
        person.decode_object("person", &no_name, "k", &keys, &codecs),
        Err(Error::MissingValue(MissingValueError {
            kind: MissingKind::MandatoryColumn,
            field,
            ..
        })) if field == "name"
    ));

    // optional columns may be left out of the selection
    let partial = Row::new().with("id", "p1").with("name", "Ada").with("age", 36);
    let object = person
        .decode_object("person", &partial, "k", &keys, &codecs)
        .expect("decode partial row");
    let decoded = object.downcast::<Person>().expect("a person");
    assert_eq!(decoded.nickname, None);
    assert!(decoded.tags.is_empty());
}

#[test]
fn persisted_field_is_stored_as_json_text() {
    let codecs = CodecRegistry::new();
    let attributes = field(&person(), "attributes");
    let value = Value::Map(vec![(Value::text("lang"), Value::text("en"))]);

    let stored = attributes
        .encode_value(value.clone(), "k", &codecs)
        .expect("encode attributes");
    assert!(matches!(&stored, Value::Text(json) if json.contains("lang")));

    let row = Row::new().with("attributes", stored);
    let decoded = attributes.decode_value(&row, "k", &codecs).expect("decode attributes");
    assert_eq!(decoded, Some(value));

    let garbage = Row::new().with("attributes", "{not json");
    assert!(matches!(
        attributes.decode_value(&garbage, "k", &codecs),
        Err(Error::Conversion(_))
    ));
}

#[test]
fn instance_survives_a_trip_through_a_row() {
    let codecs = CodecRegistry::new();
    let person = person();
    let mut sample = Person::sample();
    sample.attributes.insert("lang".to_string(), "en".to_string());

    let row = encoded_row(&person, &sample, &codecs);
    assert!(matches!(row.get("address"), Some(Value::Udt(udt)) if udt.name == "address"));

    let object = person
        .decode_object("person", &row, "k", &BTreeMap::new(), &codecs)
        .expect("decode row");
    assert_eq!(*object.downcast::<Person>().expect("a person"), sample);
}

#[test]
fn missing_counter_reads_as_zero() {
    let codecs = CodecRegistry::new();
    let views = field(
        &resolve::descriptor::<PageViews>().expect("resolve page views"),
        "views",
    );

    let row = Row::new().with("page", "/");
    assert_eq!(
        views.decode_value(&row, "k", &codecs).expect("decode"),
        Some(Value::BigInt(0))
    );
}

#[test]
fn keyspace_keys_are_restored_from_the_bound_values() {
    let codecs = CodecRegistry::new();
    let account = resolve::descriptor::<Account>().expect("resolve account");
    let keys = BTreeMap::from([("tenant".to_string(), "acme".to_string())]);
    let row = Row::new().with("id", "a1").with("balance", 5_i64);

    let object = account
        .decode_object("account", &row, "bank_acme", &keys, &codecs)
        .expect("decode account");
    let decoded = object.downcast::<Account>().expect("an account");

    assert_eq!(decoded.tenant, "acme");
    assert_eq!(decoded.balance, 5);
}
