use crate::{
    declare::{Object, SeedFn, TypeRef},
    error::ConfigurationError,
    model::{FieldDescriptor, KeyspaceDescriptor, TableDescriptor},
};
use std::{
    any::TypeId,
    collections::BTreeMap,
    fmt,
    sync::{Arc, PoisonError, RwLock},
};

///
/// EntityKind
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum EntityKind {
    Standalone,
    Root,
    Type,
    UdtStandalone,
    UdtRoot,
    UdtType,
}

impl EntityKind {
    #[must_use]
    pub const fn is_udt(self) -> bool {
        matches!(self, Self::UdtStandalone | Self::UdtRoot | Self::UdtType)
    }

    #[must_use]
    pub const fn is_root(self) -> bool {
        matches!(self, Self::Root | Self::UdtRoot)
    }

    #[must_use]
    pub const fn is_type(self) -> bool {
        matches!(self, Self::Type | Self::UdtType)
    }

    /// Root or type member of a hierarchy.
    #[must_use]
    pub const fn is_hierarchy(self) -> bool {
        self.is_root() || self.is_type()
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Standalone => "entity",
            Self::Root => "root entity",
            Self::Type => "type entity",
            Self::UdtStandalone => "udt entity",
            Self::UdtRoot => "udt root entity",
            Self::UdtType => "udt type entity",
        }
    }
}

///
/// TypeVariant
///

#[derive(Clone, Debug)]
pub struct TypeVariant {
    pub discriminator: String,
    pub type_ref: TypeRef,
    /// Registered at runtime rather than listed by the root.
    pub dynamic: bool,
}

///
/// VariantRegistry
///
/// Type variants of one root keyed by discriminator. Append-only: static
/// variants are added when the root resolves, dynamic ones on registration.
///

#[derive(Default)]
pub struct VariantRegistry {
    variants: RwLock<BTreeMap<String, TypeVariant>>,
}

impl VariantRegistry {
    /// Discriminator of the variant with the given runtime type.
    #[must_use]
    pub fn discriminator_of(&self, id: TypeId) -> Option<String> {
        self.read()
            .values()
            .find(|v| v.type_ref.type_id() == id)
            .map(|v| v.discriminator.clone())
    }

    #[must_use]
    pub fn by_discriminator(&self, discriminator: &str) -> Option<TypeVariant> {
        self.read().get(discriminator).cloned()
    }

    #[must_use]
    pub fn by_type(&self, id: TypeId) -> Option<TypeVariant> {
        self.read()
            .values()
            .find(|v| v.type_ref.type_id() == id)
            .cloned()
    }

    /// Add a variant. Re-adding the same type under the same discriminator is
    /// a no-op and returns `false`.
    pub(crate) fn insert(
        &self,
        root: &'static str,
        variant: TypeVariant,
    ) -> Result<bool, ConfigurationError> {
        let mut variants = self
            .variants
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = variants.get(&variant.discriminator) {
            if existing.type_ref == variant.type_ref {
                return Ok(false);
            }

            return Err(ConfigurationError::hierarchy(
                root,
                format!(
                    "discriminator '{}' is claimed by both '{}' and '{}'",
                    variant.discriminator,
                    existing.type_ref.type_name(),
                    variant.type_ref.type_name()
                ),
            ));
        }

        if let Some(existing) = variants.values().find(|v| v.type_ref == variant.type_ref) {
            return Err(ConfigurationError::hierarchy(
                root,
                format!(
                    "type '{}' is already registered as '{}'",
                    variant.type_ref.type_name(),
                    existing.discriminator
                ),
            ));
        }

        variants.insert(variant.discriminator.clone(), variant);

        Ok(true)
    }

    /// All variants ordered by discriminator.
    #[must_use]
    pub fn all(&self) -> Vec<TypeVariant> {
        self.read().values().cloned().collect()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, TypeVariant>> {
        self.variants.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for VariantRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.read().keys()).finish()
    }
}

///
/// UdtDescriptor
///

#[derive(Clone, Debug)]
pub struct UdtDescriptor {
    pub(crate) name: String,
    pub(crate) columns: Vec<Arc<FieldDescriptor>>,
}

impl UdtDescriptor {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn columns(&self) -> &[Arc<FieldDescriptor>] {
        &self.columns
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Arc<FieldDescriptor>> {
        self.columns.iter().find(|f| f.column_or_name() == name)
    }
}

///
/// ClassDescriptor
///
/// Resolved, immutable metadata of one mapped type. One instance per type
/// lives in the process-wide descriptor cache.
///

pub struct ClassDescriptor {
    pub(crate) type_ref: TypeRef,
    pub(crate) kind: EntityKind,
    pub(crate) keyspace: KeyspaceDescriptor,
    pub(crate) tables: Vec<TableDescriptor>,
    pub(crate) udt: Option<UdtDescriptor>,
    pub(crate) fields: Vec<Arc<FieldDescriptor>>,
    pub(crate) discriminator: Option<String>,
    pub(crate) root: Option<TypeRef>,
    pub(crate) variants: Option<Arc<VariantRegistry>>,
    pub(crate) factory: fn() -> Object,
    pub(crate) seed: Option<SeedFn>,
    pub(crate) udt_dependencies: Vec<TypeRef>,
}

impl ClassDescriptor {
    #[must_use]
    pub const fn type_ref(&self) -> TypeRef {
        self.type_ref
    }

    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_ref.type_id()
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_ref.type_name()
    }

    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.kind
    }

    #[must_use]
    pub const fn keyspace(&self) -> &KeyspaceDescriptor {
        &self.keyspace
    }

    #[must_use]
    pub fn tables(&self) -> &[TableDescriptor] {
        &self.tables
    }

    #[must_use]
    pub fn table(&self, name: &str) -> Option<&TableDescriptor> {
        self.tables.iter().find(|t| t.name() == name)
    }

    #[must_use]
    pub const fn udt(&self) -> Option<&UdtDescriptor> {
        self.udt.as_ref()
    }

    /// Name of the user-defined type, for UDT kinds.
    #[must_use]
    pub fn udt_name(&self) -> Option<&str> {
        self.udt.as_ref().map(UdtDescriptor::name)
    }

    /// Every field of the type once, in declaration order with inherited
    /// fields first.
    #[must_use]
    pub fn fields(&self) -> &[Arc<FieldDescriptor>] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Arc<FieldDescriptor>> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn keyspace_key_fields(&self) -> impl Iterator<Item = &Arc<FieldDescriptor>> {
        self.fields.iter().filter(|f| f.keyspace_key().is_some())
    }

    #[must_use]
    pub fn discriminator(&self) -> Option<&str> {
        self.discriminator.as_deref()
    }

    #[must_use]
    pub const fn root(&self) -> Option<TypeRef> {
        self.root
    }

    /// Variant registry shared by a root and its type variants.
    #[must_use]
    pub fn variants(&self) -> Option<&Arc<VariantRegistry>> {
        self.variants.as_ref()
    }

    /// Whether this type variant was registered at runtime.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.kind.is_type()
            && self
                .variants
                .as_ref()
                .and_then(|v| v.by_type(self.type_id()))
                .is_some_and(|v| v.dynamic)
    }

    #[must_use]
    pub fn new_instance(&self) -> Object {
        (self.factory)()
    }

    #[must_use]
    pub fn has_seed_objects(&self) -> bool {
        self.seed.is_some()
    }

    #[must_use]
    pub fn seed_objects(&self) -> Vec<Object> {
        self.seed.as_ref().map(|f| f()).unwrap_or_default()
    }

    /// User-defined types embedded by this type's fields, directly or as
    /// collection elements.
    #[must_use]
    pub fn udt_dependencies(&self) -> &[TypeRef] {
        &self.udt_dependencies
    }
}

impl fmt::Debug for ClassDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDescriptor")
            .field("type", &self.type_name())
            .field("kind", &self.kind)
            .field("keyspace", &self.keyspace.name())
            .field("tables", &self.tables.iter().map(TableDescriptor::name).collect::<Vec<_>>())
            .field("udt", &self.udt_name())
            .field("discriminator", &self.discriminator)
            .finish_non_exhaustive()
    }
}
