use super::*;
use crate::{
    declare::{Declaration, Field, Keyspace, KeyspaceKey, Table},
    error::FieldRule,
    model::{ClusteringOrder, EntityKind},
    test_fixtures::{Account, Address, Animal, Cat, Dog, GeoPoint, Person, Unmapped, User},
    types::{DataType, Scalar},
    value::Value,
};

fn config_error<T: Entity>() -> ConfigurationError {
    descriptor::<T>().expect_err("declaration should be rejected")
}

fn field_rule<T: Entity>() -> FieldRule {
    match config_error::<T>() {
        ConfigurationError::Field { rule, .. } => rule,
        other => panic!("expected a field rule violation, got {other:?}"),
    }
}

// invalid
// Small declarations that each break one rule.
macro_rules! invalid {
    ($name:ident { $($field:ident: $ty:ty),* } => $declare:expr) => {
        #[derive(Default)]
        struct $name {
            $($field: $ty,)*
        }

        impl Entity for $name {
            fn declare() -> Declaration<Self> {
                $declare
            }
        }
    };
}

#[test]
fn descriptors_are_memoized() {
    let first = descriptor::<Person>().expect("resolve person");
    let second = resolve(TypeRef::of::<Person>()).expect("resolve person again");

    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn standalone_entity_resolves_columns_in_declaration_order() {
    let person = descriptor::<Person>().expect("resolve person");
    let table = person.table("person").expect("person table");

    assert_eq!(person.kind(), EntityKind::Standalone);
    assert_eq!(person.keyspace().name(), "k");
    let columns: Vec<_> = table.columns().iter().map(|c| c.column_or_name()).collect();
    assert_eq!(
        columns,
        ["id", "name", "age", "nickname", "address", "tags", "attributes"]
    );
    assert!(table.column("id").is_some_and(|c| c.is_partition_key()));
    assert_eq!(
        table.column("name").and_then(|c| c.index()).map(|i| i.name.as_str()),
        Some("person_name_idx")
    );
}

#[test]
fn primitive_and_marked_fields_are_mandatory() {
    let person = descriptor::<Person>().expect("resolve person");

    assert!(person.field("age").is_some_and(|f| f.is_mandatory()));
    assert!(person.field("name").is_some_and(|f| f.is_mandatory()));
    assert!(person.field("nickname").is_some_and(|f| f.is_optional() && !f.is_mandatory()));
}

#[test]
fn udt_dependencies_are_collected_from_fields() {
    let person = descriptor::<Person>().expect("resolve person");
    let address = descriptor::<Address>().expect("resolve address");

    assert_eq!(person.udt_dependencies(), [TypeRef::of::<Address>()]);
    assert_eq!(address.udt_dependencies(), [TypeRef::of::<GeoPoint>()]);
    assert_eq!(address.kind(), EntityKind::UdtStandalone);
    assert_eq!(address.udt_name(), Some("address"));
    assert!(address.tables().is_empty());
}

#[test]
fn root_lists_static_variants_and_shares_their_columns() {
    let animal = descriptor::<Animal>().expect("resolve animal");
    let registry = animal.variants().expect("root registry");

    // variants registered at runtime by other tests are skipped
    let discriminators: Vec<_> = registry
        .all()
        .into_iter()
        .filter(|v| !v.dynamic)
        .map(|v| v.discriminator)
        .collect();
    assert_eq!(discriminators, ["cat", "dog"]);
    assert_eq!(
        registry.discriminator_of(TypeRef::of::<Dog>().type_id()).as_deref(),
        Some("dog")
    );

    let table = animal.table("animal").expect("animal table");
    assert!(table.column("breed").is_some());
    assert!(table.column("lives").is_some());
    assert!(table.columns().iter().any(|c| c.is_type_key()));
}

#[test]
fn type_variant_inherits_keyspace_tables_and_fields() {
    let dog = descriptor::<Dog>().expect("resolve dog");

    assert_eq!(dog.kind(), EntityKind::Type);
    assert_eq!(dog.discriminator(), Some("dog"));
    assert_eq!(dog.root(), Some(TypeRef::of::<Animal>()));
    assert_eq!(dog.keyspace().name(), "zoo");
    assert_eq!(dog.tables()[0].name(), "animal");
    assert!(dog.field("name").is_some_and(|f| f.declaring_type().ends_with("Animal")));
    assert!(!dog.is_dynamic());
    assert!(descriptor::<Cat>().is_ok());
}

#[test]
fn multi_key_field_stores_set_elements() {
    let user = descriptor::<User>().expect("resolve user");
    let by_role = user.table("users_by_role").expect("by-role table");
    let role = by_role.column("role").expect("role column");

    assert_eq!(
        role.multi_key_type(),
        Some(&DataType::Scalar(Scalar::Text))
    );
    assert!(user.table("users_by_id").is_some_and(|t| t.column("role").is_none()));
    assert_eq!(
        by_role.clustering_keys().map(|(f, o)| (f.name(), o)).collect::<Vec<_>>(),
        [("id", ClusteringOrder::Asc)]
    );
}

#[test]
fn keyspace_key_field_is_not_a_column() {
    let account = descriptor::<Account>().expect("resolve account");

    assert_eq!(account.keyspace().keys(), ["tenant"]);
    let tenant = account.keyspace_key_fields().next().expect("tenant field");
    assert_eq!(tenant.name(), "tenant");
    assert!(tenant.column().is_none());
}

#[test]
fn unmarked_type_is_not_mapped() {
    assert!(matches!(
        config_error::<Unmapped>(),
        ConfigurationError::MissingEntityMarker { .. }
    ));
}

invalid!(TwoMarkers { id: String } => Declaration::new()
    .entity()
    .udt_entity("two")
    .keyspace(Keyspace::new("k"))
    .field(Field::new("id").column("id").direct(|s: &Self| &s.id, |s| &mut s.id)));

invalid!(NoKeyspace { id: String } => Declaration::new()
    .entity()
    .table(Table::new("t"))
    .field(Field::new("id").column("id").partition_key().direct(|s: &Self| &s.id, |s| &mut s.id)));

invalid!(NoTable { id: String } => Declaration::new()
    .entity()
    .keyspace(Keyspace::new("k"))
    .field(Field::new("id").column("id").direct(|s: &Self| &s.id, |s| &mut s.id)));

invalid!(NoPartitionKey { id: String } => Declaration::new()
    .entity()
    .keyspace(Keyspace::new("k"))
    .table(Table::new("t"))
    .field(Field::new("id").column("id").direct(|s: &Self| &s.id, |s| &mut s.id)));

#[test]
fn incomplete_or_contradictory_class_markers_are_rejected() {
    assert!(matches!(
        config_error::<TwoMarkers>(),
        ConfigurationError::ConflictingMarkers { .. }
    ));
    assert!(matches!(
        config_error::<NoKeyspace>(),
        ConfigurationError::MissingKeyspace { .. }
    ));
    assert!(matches!(config_error::<NoTable>(), ConfigurationError::MissingTable { .. }));
    assert!(matches!(
        config_error::<NoPartitionKey>(),
        ConfigurationError::MissingPartitionKey { table, .. } if table == "t"
    ));
}

invalid!(BothKeys { id: String } => Declaration::new()
    .entity()
    .keyspace(Keyspace::new("k"))
    .table(Table::new("t"))
    .field(
        Field::new("id")
            .column("id")
            .partition_key()
            .clustering_key(ClusteringOrder::Asc)
            .direct(|s: &Self| &s.id, |s| &mut s.id),
    ));

invalid!(KeyWithoutColumn { id: String } => Declaration::new()
    .entity()
    .keyspace(Keyspace::new("k"))
    .table(Table::new("t"))
    .field(Field::new("id").partition_key().direct(|s: &Self| &s.id, |s| &mut s.id)));

invalid!(OptionalMandatory { id: String, note: Option<String> } => Declaration::new()
    .entity()
    .keyspace(Keyspace::new("k"))
    .table(Table::new("t"))
    .field(Field::new("id").column("id").partition_key().direct(|s: &Self| &s.id, |s| &mut s.id))
    .field(
        Field::new("note")
            .column("note")
            .mandatory()
            .direct(|s: &Self| &s.note, |s| &mut s.note),
    ));

invalid!(StrayTypeKey { id: String, kind: String } => Declaration::new()
    .entity()
    .keyspace(Keyspace::new("k"))
    .table(Table::new("t"))
    .field(Field::new("id").column("id").partition_key().direct(|s: &Self| &s.id, |s| &mut s.id))
    .field(
        Field::new("kind")
            .column("kind")
            .type_key()
            .direct(|s: &Self| &s.kind, |s| &mut s.kind),
    ));

invalid!(KeyspaceKeyColumn { id: String, tenant: String } => Declaration::new()
    .entity()
    .keyspace(Keyspace::new("k").keys(["tenant"]))
    .table(Table::new("t"))
    .field(Field::new("id").column("id").partition_key().direct(|s: &Self| &s.id, |s| &mut s.id))
    .field(
        Field::new("tenant")
            .column("tenant")
            .keyspace_key(KeyspaceKey::new("tenant"))
            .direct(|s: &Self| &s.tenant, |s| &mut s.tenant),
    ));

invalid!(ListKey { ids: Vec<String> } => Declaration::new()
    .entity()
    .keyspace(Keyspace::new("k"))
    .table(Table::new("t"))
    .field(
        Field::new("ids")
            .column("ids")
            .partition_key()
            .direct(|s: &Self| &s.ids, |s| &mut s.ids),
    ));

invalid!(NoAccess { id: String } => Declaration::new()
    .entity()
    .keyspace(Keyspace::new("k"))
    .table(Table::new("t"))
    .field(Field::<Self, String>::new("id").column("id").partition_key()));

invalid!(CaselessNumber { id: i32 } => Declaration::new()
    .entity()
    .keyspace(Keyspace::new("k"))
    .table(Table::new("t"))
    .field(
        Field::new("id")
            .column("id")
            .partition_key()
            .ignore_case()
            .direct(|s: &Self| &s.id, |s| &mut s.id),
    ));

invalid!(StaticPartition { id: String, bucket: String } => Declaration::new()
    .entity()
    .keyspace(Keyspace::new("k"))
    .table(Table::new("t"))
    .field(Field::new("id").column("id").partition_key().direct(|s: &Self| &s.id, |s| &mut s.id))
    .field(
        Field::new("bucket")
            .static_column("bucket")
            .partition_key()
            .direct(|s: &Self| &s.bucket, |s| &mut s.bucket),
    ));

invalid!(NumericTypeKey { id: String, kind: i32 } => Declaration::new()
    .root_entity([])
    .keyspace(Keyspace::new("k"))
    .table(Table::new("t"))
    .field(Field::new("id").column("id").partition_key().direct(|s: &Self| &s.id, |s| &mut s.id))
    .field(
        Field::new("kind")
            .column("kind")
            .type_key()
            .direct(|s: &Self| &s.kind, |s| &mut s.kind),
    ));

invalid!(FrozenTypeKey { id: String, kind: String } => Declaration::new()
    .root_entity([])
    .keyspace(Keyspace::new("k"))
    .table(Table::new("t"))
    .field(Field::new("id").column("id").partition_key().direct(|s: &Self| &s.id, |s| &mut s.id))
    .field(
        Field::new("kind")
            .column("kind")
            .type_key()
            .immutable("fixed".to_string())
            .direct(|s: &Self| &s.kind, |s| &mut s.kind),
    ));

invalid!(IndexedAddress { id: String, home: Option<Address> } => Declaration::new()
    .entity()
    .keyspace(Keyspace::new("k"))
    .table(Table::new("t"))
    .field(Field::new("id").column("id").partition_key().direct(|s: &Self| &s.id, |s| &mut s.id))
    .field(
        Field::new("home")
            .column("home")
            .index()
            .direct(|s: &Self| &s.home, |s| &mut s.home),
    ));

invalid!(KeyedUdt { x: i32 } => Declaration::new()
    .udt_entity("keyed")
    .keyspace(Keyspace::new("k"))
    .field(Field::new("x").column("x").partition_key().direct(|s: &Self| &s.x, |s| &mut s.x)));

invalid!(IndexWithoutColumn { id: String, name: String } => Declaration::new()
    .entity()
    .keyspace(Keyspace::new("k"))
    .table(Table::new("t"))
    .field(Field::new("id").column("id").partition_key().direct(|s: &Self| &s.id, |s| &mut s.id))
    .field(Field::new("name").index().direct(|s: &Self| &s.name, |s| &mut s.name)));

#[test]
fn field_rules_are_enforced() {
    assert_eq!(field_rule::<BothKeys>(), FieldRule::PartitionAndClustering);
    assert_eq!(
        field_rule::<KeyWithoutColumn>(),
        FieldRule::ColumnRequired {
            marker: "partition key"
        }
    );
    assert_eq!(field_rule::<OptionalMandatory>(), FieldRule::OptionalAndMandatory);
    assert_eq!(field_rule::<StrayTypeKey>(), FieldRule::TypeKeyOutsideHierarchy);
    assert_eq!(field_rule::<KeyspaceKeyColumn>(), FieldRule::KeyspaceKeyColumn);
    assert!(matches!(
        field_rule::<ListKey>(),
        FieldRule::MultiKeyRequiresSet { .. }
    ));
    assert_eq!(field_rule::<NoAccess>(), FieldRule::NoGetter);
}

#[test]
fn key_roles_constrain_types_and_markers() {
    assert_eq!(
        field_rule::<CaselessNumber>(),
        FieldRule::CaseInsensitiveRequiresText {
            data_type: "int".to_string()
        }
    );
    assert_eq!(field_rule::<StaticPartition>(), FieldRule::StaticKey);
    assert_eq!(
        field_rule::<NumericTypeKey>(),
        FieldRule::TypeKeyNotText {
            data_type: "int".to_string()
        }
    );
    assert_eq!(field_rule::<FrozenTypeKey>(), FieldRule::TypeKeyImmutable);
    assert_eq!(
        field_rule::<IndexedAddress>(),
        FieldRule::UdtMarker { marker: "index" }
    );
    assert_eq!(
        field_rule::<KeyedUdt>(),
        FieldRule::UdtMarker {
            marker: "partition key"
        }
    );
    assert_eq!(
        field_rule::<IndexWithoutColumn>(),
        FieldRule::ColumnRequired { marker: "index" }
    );
}

invalid!(ReservedName { x: i32 } => Declaration::new()
    .udt_entity("date")
    .keyspace(Keyspace::new("k"))
    .field(Field::new("x").column("x").direct(|s: &Self| &s.x, |s| &mut s.x)));

#[test]
fn reserved_type_name_is_rejected() {
    assert!(matches!(
        config_error::<ReservedName>(),
        ConfigurationError::ReservedTypeName { name, .. } if name == "date"
    ));
}

invalid!(Scored { id: String, score: i32 } => Declaration::new()
    .entity()
    .keyspace(Keyspace::new("k"))
    .table(Table::new("scores"))
    .field(Field::new("id").column("id").partition_key().direct(|s: &Self| &s.id, |s| &mut s.id))
    .field(Field::<Self, i32>::new("score").column("score"))
    .getter("get_score", |s: &Self| s.score * 10)
    .setter("set_score", |s: &mut Self, v: i32| s.score = v / 10));

#[test]
fn named_accessors_follow_naming_convention() {
    let scored = descriptor::<Scored>().expect("resolve scored");
    let field = scored.field("score").expect("score field");

    let mut object = Scored {
        id: "a".to_string(),
        score: 4,
    };
    assert_eq!(field.peek_value(&object).expect("get score"), Value::Int(40));

    field.set_value(&mut object, Value::Int(70)).expect("set score");
    assert_eq!(object.score, 7);
}

#[derive(Clone, Debug, Default)]
struct Parrot {
    base: Animal,
    words: i32,
}

impl Entity for Parrot {
    fn declare() -> Declaration<Self> {
        Declaration::new()
            .type_entity(TypeRef::of::<Animal>(), "parrot")
            .extends(|p: &Self| &p.base, |p| &mut p.base)
            .field(
                Field::new("words")
                    .column("words")
                    .direct(|p: &Self| &p.words, |p| &mut p.words),
            )
    }
}

#[test]
fn runtime_registration_flags_variant_dynamic() {
    let parrot = register_type::<Parrot>().expect("register parrot");
    let animal = descriptor::<Animal>().expect("resolve animal");
    let registry = animal.variants().expect("root registry");

    let variant = registry.by_discriminator("parrot").expect("parrot variant");
    assert!(variant.dynamic);
    assert!(parrot.is_dynamic());

    // registering again is a no-op
    assert!(register_type::<Parrot>().is_ok());
    assert!(register_type::<Person>().is_err());
}
