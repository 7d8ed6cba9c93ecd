use super::*;
use crate::{
    declare::{Declaration, Entity, Field, Keyspace, KeyspaceKey, Table, TypeRef},
    error::{ConfigurationError, Error},
    statement::{PrimitiveStatement, Statement, StatementKind},
    test_fixtures::{Account, Country, Dog, NodeA, Person, Unmapped, mapper},
};
use cqlmap_config::{ExcludedKeyPolicy, Replication};
use std::sync::Arc;

fn texts(primitives: &[PrimitiveStatement]) -> Vec<&str> {
    primitives.iter().map(|p| p.cql.as_str()).collect()
}

fn of_kind(primitives: &[PrimitiveStatement], kind: StatementKind) -> Vec<&PrimitiveStatement> {
    primitives.iter().filter(|p| p.operation == kind).collect()
}

///
/// Left / Right
///
/// Two declarations of keyspace `shared` that disagree on durable writes.
///

#[derive(Clone, Debug, Default)]
struct Left {
    id: String,
}

impl Entity for Left {
    fn declare() -> Declaration<Self> {
        Declaration::new()
            .entity()
            .keyspace(Keyspace::new("shared").durable_writes(false))
            .table(Table::new("left_side"))
            .field(
                Field::new("id")
                    .column("id")
                    .partition_key()
                    .direct(|l: &Self| &l.id, |l| &mut l.id),
            )
    }
}

#[derive(Clone, Debug, Default)]
struct Right {
    id: String,
}

impl Entity for Right {
    fn declare() -> Declaration<Self> {
        Declaration::new()
            .entity()
            .keyspace(Keyspace::new("shared").durable_writes(true))
            .table(Table::new("right_side"))
            .field(
                Field::new("id")
                    .column("id")
                    .partition_key()
                    .direct(|r: &Self| &r.id, |r| &mut r.id),
            )
    }
}

///
/// Solo / Tenanted
///
/// Keyspace `pk` declared with different replication, once with a
/// keyspace key, so the two never share a physical keyspace.
///

#[derive(Clone, Debug, Default)]
struct Solo {
    id: String,
}

impl Entity for Solo {
    fn declare() -> Declaration<Self> {
        Declaration::new()
            .entity()
            .keyspace(Keyspace::new("pk").replication(Replication::simple(1)))
            .table(Table::new("solo"))
            .field(
                Field::new("id")
                    .column("id")
                    .partition_key()
                    .direct(|s: &Self| &s.id, |s| &mut s.id),
            )
    }
}

#[derive(Clone, Debug, Default)]
struct Tenanted {
    org: String,
    id: String,
}

impl Entity for Tenanted {
    fn declare() -> Declaration<Self> {
        Declaration::new()
            .entity()
            .keyspace(
                Keyspace::new("pk")
                    .replication(Replication::simple(3))
                    .keys(["org"]),
            )
            .table(Table::new("tenanted"))
            .field(
                Field::new("org")
                    .keyspace_key(KeyspaceKey::new("org"))
                    .direct(|t: &Self| &t.org, |t| &mut t.org),
            )
            .field(
                Field::new("id")
                    .column("id")
                    .partition_key()
                    .direct(|t: &Self| &t.id, |t| &mut t.id),
            )
    }
}

#[test]
fn person_plan_creates_types_before_the_table() {
    let mut plan = mapper().create_schema::<Person>();
    let compiled = plan.build().expect("plan person");

    let staged: Vec<_> = compiled.iter().map(|p| (p.operation, p.stage)).collect();
    assert_eq!(
        staged,
        [
            (StatementKind::CreateKeyspace, 0),
            (StatementKind::CreateType, 1),
            (StatementKind::CreateType, 2),
            (StatementKind::CreateTable, 3),
            (StatementKind::CreateIndex, 4),
        ]
    );

    let cql = texts(&compiled);
    assert_eq!(
        cql[1],
        "CREATE TYPE IF NOT EXISTS k.geo_point (lat double, lon double)"
    );
    assert!(cql[2].starts_with("CREATE TYPE IF NOT EXISTS k.address ("), "{}", cql[2]);
    assert!(cql[2].contains("location frozen<geo_point>"), "{}", cql[2]);
    assert!(cql[3].starts_with("CREATE TABLE IF NOT EXISTS k.person (id text, "), "{}", cql[3]);
}

#[test]
fn plan_is_cached_until_an_option_changes() {
    let mut plan = mapper().create_schema::<Person>();
    let first = plan.build().expect("plan");
    let second = plan.build().expect("plan again");
    assert!(Arc::ptr_eq(&first, &second));

    plan.if_not_exists(false);
    assert!(plan.is_dirty());
    let third = plan.build().expect("replan");
    assert!(third.iter().all(|p| !p.cql.contains("IF NOT EXISTS")));
}

#[test]
fn mutually_embedded_types_are_a_cycle() {
    let err = mapper()
        .create_schema::<NodeA>()
        .build()
        .expect_err("node types embed each other");

    let Error::Cycle(cycle) = err else {
        panic!("expected a cycle error, got {err:?}");
    };
    assert_eq!(cycle.keyspace, "graph");
    assert_eq!(cycle.types.len(), 2);
}

#[test]
fn variants_are_planned_into_the_root_table() {
    let mut plan = mapper().create_schema::<Dog>();
    let compiled = plan.build().expect("plan dog");

    let tables = of_kind(&compiled, StatementKind::CreateTable);
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].table.as_deref(), Some("animal"));
    assert!(tables[0].cql.contains("breed text"), "{}", tables[0].cql);
    assert!(tables[0].cql.contains("lives int"), "{}", tables[0].cql);
}

#[test]
fn keyed_keyspace_needs_a_filter() {
    let mapper = mapper();

    let unfiltered = mapper.create_schema::<Account>().build().expect("plan account");
    assert!(unfiltered.is_empty());

    let mut excluded = mapper.create_schema::<Account>();
    excluded.filter("tenant", "system");
    assert!(excluded.build().expect("excluded key skipped").is_empty());

    let mut acme = mapper.create_schema::<Account>();
    acme.filter("tenant", "Acme");
    let compiled = acme.build().expect("plan acme");
    assert_eq!(
        texts(&compiled),
        [
            "CREATE KEYSPACE IF NOT EXISTS bank_acme WITH replication = {'class': 'SimpleStrategy', 'replication_factor': 1} AND durable_writes = true",
            "CREATE TABLE IF NOT EXISTS bank_acme.account (id text, balance bigint, PRIMARY KEY (id))",
        ]
    );
}

#[test]
fn excluded_key_fails_under_the_fail_policy() {
    let mut plan = mapper().create_schema::<Account>();
    plan.filter("tenant", "system")
        .excluded_keys(ExcludedKeyPolicy::Fail);

    let err = plan.build().expect_err("system is excluded");
    assert!(err.is_excluded_key());
}

#[test]
fn matching_keeps_only_types_with_the_filtered_keys() {
    let classes = ClassSet::of([TypeRef::of::<Person>(), TypeRef::of::<Account>()]);
    let mapper = mapper();

    let mut all = mapper.create_schemas(classes.clone());
    all.filter("tenant", "acme");
    let keyspaces: Vec<_> = all
        .build()
        .expect("plan all")
        .iter()
        .filter(|p| p.operation == StatementKind::CreateKeyspace)
        .filter_map(|p| p.keyspace.clone())
        .collect();
    assert_eq!(keyspaces, ["bank_acme", "k"]);

    let mut matching = mapper.create_schemas(classes);
    matching.filter("tenant", "acme").matching();
    let compiled = matching.build().expect("plan matching");
    assert!(compiled.iter().all(|p| p.keyspace.as_deref() == Some("bank_acme")));
    assert_eq!(of_kind(&compiled, StatementKind::CreateTable).len(), 1);
}

#[test]
fn seed_rows_are_inserted_last() {
    let mapper = mapper();

    let mut plan = mapper.create_schema::<Country>();
    let compiled = plan.build().expect("plan country");
    let inserts = of_kind(&compiled, StatementKind::Insert);
    assert_eq!(inserts.len(), 2);

    let last_stage = compiled.iter().map(|p| p.stage).max();
    assert!(inserts.iter().all(|p| Some(p.stage) == last_stage));
    assert_eq!(
        inserts[0].to_inline_cql(),
        "INSERT INTO k.country (code, name) VALUES ('fr', 'France')"
    );

    plan.seed_data(false);
    let unseeded = plan.build().expect("plan without seeds");
    assert!(of_kind(&unseeded, StatementKind::Insert).is_empty());
}

#[test]
fn conflicting_keyspace_declarations_fail() {
    let classes = ClassSet::of([TypeRef::of::<Left>(), TypeRef::of::<Right>()]);

    let err = mapper()
        .create_schemas(classes)
        .build()
        .expect_err("durable writes disagree");

    let Error::Configuration(ConfigurationError::ConflictingKeyspace { keyspace, .. }) = err else {
        panic!("expected a keyspace conflict, got {err:?}");
    };
    assert_eq!(keyspace, "shared");
}

#[test]
fn conflicting_declarations_fail_across_physical_keyspaces() {
    let classes = ClassSet::of([TypeRef::of::<Solo>(), TypeRef::of::<Tenanted>()]);

    let mut plan = mapper().create_schemas(classes);
    plan.filter("org", "acme");
    let err = plan.build().expect_err("replication and keys disagree");

    let Error::Configuration(ConfigurationError::ConflictingKeyspace { keyspace, .. }) = err else {
        panic!("expected a keyspace conflict, got {err:?}");
    };
    assert_eq!(keyspace, "pk");
}

#[test]
fn unmapped_types_are_skipped_by_the_scan() {
    let classes = ClassSet::of([TypeRef::of::<Unmapped>()]).with(TypeRef::of::<Person>());

    let mut plan = mapper().create_schemas(classes);
    let compiled = plan.build().expect("plan");

    assert_eq!(of_kind(&compiled, StatementKind::CreateTable).len(), 1);
    assert!(of_kind(&compiled, StatementKind::CreateType).len() == 2);
}
