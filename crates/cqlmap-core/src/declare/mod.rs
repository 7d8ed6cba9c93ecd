//! Declarative registration of mapped types.
//!
//! A mapped type implements [`Entity`] and returns a [`Declaration`] listing
//! its class markers, keyspace, tables, fields and accessors. The resolver
//! validates a declaration once, on first use, and turns it into an
//! immutable [`ClassDescriptor`](crate::model::ClassDescriptor).

pub(crate) mod access;
mod field;
mod persist;

use crate::{
    declare::access::{GetterFn, MethodGetter, MethodSetter, ParentProjection, Projection, SetterFn},
    types::FieldValue,
};
use cqlmap_config::Replication;
use std::{
    any::{Any, TypeId, type_name},
    collections::BTreeMap,
    fmt,
    hash::{Hash, Hasher},
    marker::PhantomData,
    sync::Arc,
};

// re-exports
pub use field::{Field, FieldDecl, FieldMarker, KeyspaceKey};
pub use persist::{JsonPersister, Persisted, Persister};

/// Boxed instance of a mapped type.
pub type Object = Box<dyn Any + Send + Sync>;

///
/// Entity
///
/// A Rust type mapped onto the store.
///

pub trait Entity: Any + Default + Send + Sync {
    fn declare() -> Declaration<Self>;
}

///
/// TypeRef
///
/// Lazy, copyable reference to a mapped type. Resolving it never recurses
/// into the types it references.
///

#[derive(Clone, Copy)]
pub struct TypeRef {
    id: fn() -> TypeId,
    name: fn() -> &'static str,
    declare: fn() -> ClassDeclaration,
}

impl TypeRef {
    #[must_use]
    pub fn of<T: Entity>() -> Self {
        Self {
            id: TypeId::of::<T>,
            name: type_name::<T>,
            declare: declare_erased::<T>,
        }
    }

    #[must_use]
    pub fn type_id(&self) -> TypeId {
        (self.id)()
    }

    /// Fully-qualified type name.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        (self.name)()
    }

    #[must_use]
    pub fn declaration(&self) -> ClassDeclaration {
        (self.declare)()
    }
}

fn declare_erased<T: Entity>() -> ClassDeclaration {
    T::declare().decl
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.type_id() == other.type_id()
    }
}

impl Eq for TypeRef {}

impl Hash for TypeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id().hash(state);
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeRef({})", self.type_name())
    }
}

///
/// ClassMarker
///
/// Entity-kind marker declared on a type. Exactly one must be present.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ClassMarker {
    Entity,
    RootEntity { types: Vec<TypeRef> },
    TypeEntity { root: TypeRef, discriminator: String },
    UdtEntity { name: String },
    UdtRootEntity { name: String, types: Vec<TypeRef> },
    UdtTypeEntity { root: TypeRef, discriminator: String },
}

impl ClassMarker {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Entity => "entity",
            Self::RootEntity { .. } => "root entity",
            Self::TypeEntity { .. } => "type entity",
            Self::UdtEntity { .. } => "udt entity",
            Self::UdtRootEntity { .. } => "udt root entity",
            Self::UdtTypeEntity { .. } => "udt type entity",
        }
    }
}

///
/// Keyspace
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Keyspace {
    pub(crate) name: String,
    pub(crate) replication: Option<Replication>,
    pub(crate) durable_writes: Option<bool>,
    pub(crate) keys: Vec<String>,
}

impl Keyspace {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            replication: None,
            durable_writes: None,
            keys: Vec::new(),
        }
    }

    #[must_use]
    pub fn replication(mut self, replication: Replication) -> Self {
        self.replication = Some(replication);
        self
    }

    #[must_use]
    pub const fn durable_writes(mut self, durable: bool) -> Self {
        self.durable_writes = Some(durable);
        self
    }

    /// Keyspace keys, in the order their values are appended to the name.
    #[must_use]
    pub fn keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keys = keys.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

///
/// Table
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Table {
    pub(crate) name: String,
}

impl Table {
    /// Scope that applies a field marker to every table of a type.
    pub const ALL: &'static str = "*";

    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

///
/// ParentDecl
///

#[derive(Clone)]
pub(crate) struct ParentDecl {
    pub(crate) parent: TypeRef,
    pub(crate) projection: Arc<dyn Projection>,
}

pub(crate) type SeedFn = Arc<dyn Fn() -> Vec<Object> + Send + Sync>;

///
/// ClassDeclaration
///
/// Type-erased declaration consumed by the resolver.
///

pub struct ClassDeclaration {
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
    pub(crate) markers: Vec<ClassMarker>,
    pub(crate) keyspaces: Vec<Keyspace>,
    pub(crate) tables: Vec<Table>,
    pub(crate) fields: Vec<FieldDecl>,
    pub(crate) getters: BTreeMap<String, Arc<dyn GetterFn>>,
    pub(crate) setters: BTreeMap<String, Arc<dyn SetterFn>>,
    pub(crate) parent: Option<ParentDecl>,
    pub(crate) factory: fn() -> Object,
    pub(crate) seed: Option<SeedFn>,
}

impl ClassDeclaration {
    #[must_use]
    pub fn markers(&self) -> &[ClassMarker] {
        &self.markers
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldDecl] {
        &self.fields
    }

    /// Whether the type carries any entity-kind marker.
    #[must_use]
    pub fn is_mapped(&self) -> bool {
        !self.markers.is_empty()
    }
}

fn new_instance<T: Entity>() -> Object {
    Box::new(T::default())
}

///
/// Declaration
///
/// Typed builder for a [`ClassDeclaration`].
///

pub struct Declaration<T> {
    decl: ClassDeclaration,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Entity> Declaration<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            decl: ClassDeclaration {
                type_id: TypeId::of::<T>(),
                type_name: type_name::<T>(),
                markers: Vec::new(),
                keyspaces: Vec::new(),
                tables: Vec::new(),
                fields: Vec::new(),
                getters: BTreeMap::new(),
                setters: BTreeMap::new(),
                parent: None,
                factory: new_instance::<T>,
                seed: None,
            },
            _marker: PhantomData,
        }
    }

    fn marker(mut self, marker: ClassMarker) -> Self {
        self.decl.markers.push(marker);
        self
    }

    /// Standalone table-backed entity.
    #[must_use]
    pub fn entity(self) -> Self {
        self.marker(ClassMarker::Entity)
    }

    /// Root of a hierarchy sharing the root's tables, with its statically
    /// known type variants.
    #[must_use]
    pub fn root_entity(self, types: impl IntoIterator<Item = TypeRef>) -> Self {
        self.marker(ClassMarker::RootEntity {
            types: types.into_iter().collect(),
        })
    }

    #[must_use]
    pub fn type_entity(self, root: TypeRef, discriminator: impl Into<String>) -> Self {
        self.marker(ClassMarker::TypeEntity {
            root,
            discriminator: discriminator.into(),
        })
    }

    #[must_use]
    pub fn udt_entity(self, name: impl Into<String>) -> Self {
        self.marker(ClassMarker::UdtEntity { name: name.into() })
    }

    #[must_use]
    pub fn udt_root_entity(
        self,
        name: impl Into<String>,
        types: impl IntoIterator<Item = TypeRef>,
    ) -> Self {
        self.marker(ClassMarker::UdtRootEntity {
            name: name.into(),
            types: types.into_iter().collect(),
        })
    }

    #[must_use]
    pub fn udt_type_entity(self, root: TypeRef, discriminator: impl Into<String>) -> Self {
        self.marker(ClassMarker::UdtTypeEntity {
            root,
            discriminator: discriminator.into(),
        })
    }

    #[must_use]
    pub fn keyspace(mut self, keyspace: Keyspace) -> Self {
        self.decl.keyspaces.push(keyspace);
        self
    }

    #[must_use]
    pub fn table(mut self, table: Table) -> Self {
        self.decl.tables.push(table);
        self
    }

    #[must_use]
    pub fn field<V: FieldValue>(mut self, field: Field<T, V>) -> Self {
        self.decl.fields.push(field.erase());
        self
    }

    /// Named read method, matched to fields by the `get_`/`is_` convention.
    #[must_use]
    pub fn getter<V: FieldValue>(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&T) -> V + Send + Sync + 'static,
    ) -> Self {
        self.decl
            .getters
            .insert(name.into(), Arc::new(MethodGetter { f: Box::new(f) }));
        self
    }

    /// Named write method, matched to fields by the `set_` convention.
    #[must_use]
    pub fn setter<V: FieldValue>(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&mut T, V) + Send + Sync + 'static,
    ) -> Self {
        self.decl
            .setters
            .insert(name.into(), Arc::new(MethodSetter { f: Box::new(f) }));
        self
    }

    /// Declare the ancestor this type embeds. Fields of the ancestor are
    /// inherited and reached through the projection.
    #[must_use]
    pub fn extends<P: Entity>(mut self, up: fn(&T) -> &P, up_mut: fn(&mut T) -> &mut P) -> Self {
        self.decl.parent = Some(ParentDecl {
            parent: TypeRef::of::<P>(),
            projection: Arc::new(ParentProjection { up, up_mut }),
        });
        self
    }

    /// Seed objects inserted after the schema is created.
    #[must_use]
    pub fn initial_objects(mut self, f: fn() -> Vec<T>) -> Self {
        self.decl.seed = Some(Arc::new(move || {
            f().into_iter().map(|object| Box::new(object) as Object).collect()
        }));
        self
    }

    #[must_use]
    pub fn into_declaration(self) -> ClassDeclaration {
        self.decl
    }
}

impl<T: Entity> Default for Declaration<T> {
    fn default() -> Self {
        Self::new()
    }
}
