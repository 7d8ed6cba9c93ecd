//! Mapped types shared by the unit tests.

use crate::{
    declare::{
        Declaration, Entity, Field, JsonPersister, Keyspace, KeyspaceKey, Persisted, Table,
        TypeRef,
    },
    mapper::Mapper,
    model::ClusteringOrder,
    types::{Counter, DataType, Scalar},
};
use std::collections::{BTreeMap, BTreeSet};

pub(crate) fn mapper() -> Mapper {
    Mapper::default()
}

///
/// GeoPoint
///

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct GeoPoint {
    pub(crate) lat: f64,
    pub(crate) lon: f64,
}

impl Entity for GeoPoint {
    fn declare() -> Declaration<Self> {
        Declaration::new()
            .udt_entity("geo_point")
            .keyspace(Keyspace::new("k"))
            .field(Field::new("lat").column("lat").direct(|g: &Self| &g.lat, |g| &mut g.lat))
            .field(Field::new("lon").column("lon").direct(|g: &Self| &g.lon, |g| &mut g.lon))
    }
}

///
/// Address
///

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Address {
    pub(crate) street: String,
    pub(crate) city: String,
    pub(crate) location: Option<GeoPoint>,
}

impl Entity for Address {
    fn declare() -> Declaration<Self> {
        Declaration::new()
            .udt_entity("address")
            .keyspace(Keyspace::new("k"))
            .field(
                Field::new("street")
                    .column("street")
                    .direct(|a: &Self| &a.street, |a| &mut a.street),
            )
            .field(Field::new("city").column("city").direct(|a: &Self| &a.city, |a| &mut a.city))
            .field(
                Field::new("location")
                    .column("location")
                    .direct(|a: &Self| &a.location, |a| &mut a.location),
            )
    }
}

udt_field_value!(GeoPoint, Address);

///
/// Person
///

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Person {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) age: i32,
    pub(crate) nickname: Option<String>,
    pub(crate) address: Option<Address>,
    pub(crate) tags: BTreeSet<String>,
    pub(crate) attributes: BTreeMap<String, String>,
}

impl Entity for Person {
    fn declare() -> Declaration<Self> {
        Declaration::new()
            .entity()
            .keyspace(Keyspace::new("k"))
            .table(Table::new("person"))
            .field(
                Field::new("id")
                    .column("id")
                    .partition_key()
                    .direct(|p: &Self| &p.id, |p| &mut p.id),
            )
            .field(
                Field::new("name")
                    .column("name")
                    .mandatory()
                    .index()
                    .direct(|p: &Self| &p.name, |p| &mut p.name),
            )
            .field(Field::new("age").column("age").direct(|p: &Self| &p.age, |p| &mut p.age))
            .field(
                Field::new("nickname")
                    .column("nickname")
                    .direct(|p: &Self| &p.nickname, |p| &mut p.nickname),
            )
            .field(
                Field::new("address")
                    .column("address")
                    .direct(|p: &Self| &p.address, |p| &mut p.address),
            )
            .field(Field::new("tags").column("tags").direct(|p: &Self| &p.tags, |p| &mut p.tags))
            .field(
                Field::new("attributes")
                    .column("attributes")
                    .persisted(Persisted::new(
                        DataType::Scalar(Scalar::Text),
                        JsonPersister::of::<BTreeMap<String, String>>(),
                    ))
                    .direct(|p: &Self| &p.attributes, |p| &mut p.attributes),
            )
    }
}

impl Person {
    pub(crate) fn sample() -> Self {
        Self {
            id: "p1".to_string(),
            name: "Ada".to_string(),
            age: 36,
            nickname: None,
            address: Some(Address {
                street: "1 Loop Rd".to_string(),
                city: "London".to_string(),
                location: Some(GeoPoint { lat: 51.5, lon: -0.1 }),
            }),
            tags: BTreeSet::from(["math".to_string()]),
            attributes: BTreeMap::new(),
        }
    }
}

///
/// Animal
///
/// Root of a hierarchy sharing the `animal` table.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Animal {
    pub(crate) kind: String,
    pub(crate) id: String,
    pub(crate) name: String,
}

impl Entity for Animal {
    fn declare() -> Declaration<Self> {
        Declaration::new()
            .root_entity([TypeRef::of::<Dog>(), TypeRef::of::<Cat>()])
            .keyspace(Keyspace::new("zoo"))
            .table(Table::new("animal"))
            .field(
                Field::new("kind")
                    .column("kind")
                    .type_key()
                    .direct(|a: &Self| &a.kind, |a| &mut a.kind),
            )
            .field(
                Field::new("id")
                    .column("id")
                    .partition_key()
                    .direct(|a: &Self| &a.id, |a| &mut a.id),
            )
            .field(Field::new("name").column("name").direct(|a: &Self| &a.name, |a| &mut a.name))
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Dog {
    pub(crate) base: Animal,
    pub(crate) breed: String,
}

impl Entity for Dog {
    fn declare() -> Declaration<Self> {
        Declaration::new()
            .type_entity(TypeRef::of::<Animal>(), "dog")
            .extends(|d: &Self| &d.base, |d| &mut d.base)
            .field(
                Field::new("breed")
                    .column("breed")
                    .direct(|d: &Self| &d.breed, |d| &mut d.breed),
            )
    }
}

impl Dog {
    pub(crate) fn named(id: &str, name: &str) -> Self {
        Self {
            base: Animal {
                kind: String::new(),
                id: id.to_string(),
                name: name.to_string(),
            },
            breed: "collie".to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Cat {
    pub(crate) base: Animal,
    pub(crate) lives: i32,
}

impl Entity for Cat {
    fn declare() -> Declaration<Self> {
        Declaration::new()
            .type_entity(TypeRef::of::<Animal>(), "cat")
            .extends(|c: &Self| &c.base, |c| &mut c.base)
            .field(
                Field::new("lives")
                    .column("lives")
                    .direct(|c: &Self| &c.lives, |c| &mut c.lives),
            )
    }
}

///
/// Account
///
/// Lives in one keyspace per tenant; `system` is never a tenant.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Account {
    pub(crate) tenant: String,
    pub(crate) id: String,
    pub(crate) balance: i64,
}

impl Entity for Account {
    fn declare() -> Declaration<Self> {
        Declaration::new()
            .entity()
            .keyspace(Keyspace::new("bank").keys(["tenant"]))
            .table(Table::new("account"))
            .field(
                Field::new("tenant")
                    .keyspace_key(KeyspaceKey::new("tenant").exclude(["system"]))
                    .direct(|a: &Self| &a.tenant, |a| &mut a.tenant),
            )
            .field(
                Field::new("id")
                    .column("id")
                    .partition_key()
                    .direct(|a: &Self| &a.id, |a| &mut a.id),
            )
            .field(
                Field::new("balance")
                    .column("balance")
                    .direct(|a: &Self| &a.balance, |a| &mut a.balance),
            )
    }
}

///
/// PageViews
///

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct PageViews {
    pub(crate) page: String,
    pub(crate) views: Counter,
}

impl Entity for PageViews {
    fn declare() -> Declaration<Self> {
        Declaration::new()
            .entity()
            .keyspace(Keyspace::new("k"))
            .table(Table::new("page_views"))
            .field(
                Field::new("page")
                    .column("page")
                    .partition_key()
                    .direct(|p: &Self| &p.page, |p| &mut p.page),
            )
            .field(
                Field::new("views")
                    .column("views")
                    .direct(|p: &Self| &p.views, |p| &mut p.views),
            )
    }
}

///
/// User
///
/// Stored twice: by id and by e-mail. Roles are a multi-key clustering
/// column of the by-role table.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) name: String,
    pub(crate) roles: BTreeSet<String>,
}

impl Entity for User {
    fn declare() -> Declaration<Self> {
        Declaration::new()
            .entity()
            .keyspace(Keyspace::new("k"))
            .table(Table::new("users_by_id"))
            .table(Table::new("users_by_role"))
            .field(
                Field::new("id")
                    .column("id")
                    .partition_key_in("users_by_id")
                    .clustering_key_in("users_by_role", ClusteringOrder::Asc)
                    .direct(|u: &Self| &u.id, |u| &mut u.id),
            )
            .field(
                Field::new("email")
                    .column("email")
                    .direct(|u: &Self| &u.email, |u| &mut u.email),
            )
            .field(Field::new("name").column("name").direct(|u: &Self| &u.name, |u| &mut u.name))
            .field(
                Field::new("roles")
                    .column_in("users_by_role", "role")
                    .partition_key_in("users_by_role")
                    .direct(|u: &Self| &u.roles, |u| &mut u.roles),
            )
    }
}

impl User {
    pub(crate) fn sample() -> Self {
        Self {
            id: "u1".to_string(),
            email: "ada@example.com".to_string(),
            name: "Ada".to_string(),
            roles: BTreeSet::from(["admin".to_string(), "dev".to_string()]),
        }
    }
}

///
/// Country
///
/// Reference table with seed rows.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Country {
    pub(crate) code: String,
    pub(crate) name: String,
}

impl Entity for Country {
    fn declare() -> Declaration<Self> {
        Declaration::new()
            .entity()
            .keyspace(Keyspace::new("k"))
            .table(Table::new("country"))
            .field(
                Field::new("code")
                    .column("code")
                    .partition_key()
                    .direct(|c: &Self| &c.code, |c| &mut c.code),
            )
            .field(Field::new("name").column("name").direct(|c: &Self| &c.name, |c| &mut c.name))
            .initial_objects(|| {
                vec![
                    Self {
                        code: "fr".to_string(),
                        name: "France".to_string(),
                    },
                    Self {
                        code: "nz".to_string(),
                        name: "New Zealand".to_string(),
                    },
                ]
            })
    }
}

///
/// NodeA / NodeB
///
/// User-defined types embedding each other.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct NodeA {
    pub(crate) next: Vec<NodeB>,
}

impl Entity for NodeA {
    fn declare() -> Declaration<Self> {
        Declaration::new()
            .udt_entity("node_a")
            .keyspace(Keyspace::new("graph"))
            .field(Field::new("next").column("next").direct(|n: &Self| &n.next, |n| &mut n.next))
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct NodeB {
    pub(crate) next: Vec<NodeA>,
}

impl Entity for NodeB {
    fn declare() -> Declaration<Self> {
        Declaration::new()
            .udt_entity("node_b")
            .keyspace(Keyspace::new("graph"))
            .field(Field::new("next").column("next").direct(|n: &Self| &n.next, |n| &mut n.next))
    }
}

udt_field_value!(NodeA, NodeB);

///
/// Unmapped
///
/// Implements `Entity` without any class marker.
///

#[derive(Clone, Debug, Default)]
pub(crate) struct Unmapped;

impl Entity for Unmapped {
    fn declare() -> Declaration<Self> {
        Declaration::new()
    }
}
