use crate::{
    codec::{CodecRegistry, SchemaSource, UserType},
    declare::{Entity, Object, TypeRef},
    error::{Error, ValidationError},
    model::ClassDescriptor,
    pipeline::Row,
    resolve,
    schema::{ClassSet, CreateSchema, CreateSchemas},
    statement::{
        Batch, CreateIndex, CreateKeyspace, CreateTable, CreateType, Delete, Group, Insert,
        Select, Sequence, Target, Truncate, Update,
    },
};
use cqlmap_config::MapperConfig;
use std::{collections::BTreeMap, sync::Arc};

///
/// Mapper
///
/// Shared handle over the configuration and the codec registry, and the
/// entry point of every statement builder. Clones share state.
///

#[derive(Clone, Debug, Default)]
pub struct Mapper {
    inner: Arc<MapperInner>,
}

#[derive(Debug, Default)]
struct MapperInner {
    config: MapperConfig,
    codecs: CodecRegistry,
}

impl Mapper {
    #[must_use]
    pub fn new(config: MapperConfig) -> Self {
        Self::with_codecs(config, CodecRegistry::new())
    }

    /// Mapper whose UDT codecs follow the definitions of a live schema.
    #[must_use]
    pub fn with_schema_source(config: MapperConfig, source: Arc<dyn SchemaSource>) -> Self {
        Self::with_codecs(config, CodecRegistry::with_source(source))
    }

    fn with_codecs(config: MapperConfig, codecs: CodecRegistry) -> Self {
        Self {
            inner: Arc::new(MapperInner { config, codecs }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &MapperConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn codecs(&self) -> &CodecRegistry {
        &self.inner.codecs
    }

    fn class<T: Entity>(&self) -> Result<Target, Error> {
        Ok(Target::class(self.clone(), resolve::descriptor::<T>()?))
    }

    fn object<T: Entity>(&self, object: T) -> Result<Target, Error> {
        let descriptor = resolve::descriptor::<T>()?;

        Target::object(self.clone(), &descriptor, Box::new(object))
    }

    //
    // data statements
    //

    pub fn select<T: Entity>(&self) -> Result<Select, Error> {
        Ok(Select::new(self.class::<T>()?))
    }

    pub fn insert<T: Entity>(&self, object: T) -> Result<Insert, Error> {
        Ok(Insert::new(self.object(object)?))
    }

    /// Update of every non-key column of an instance.
    pub fn update<T: Entity>(&self, object: T) -> Result<Update, Error> {
        Ok(Update::new(self.object(object)?))
    }

    /// Update driven by assignments and filters alone.
    pub fn update_class<T: Entity>(&self) -> Result<Update, Error> {
        Ok(Update::new(self.class::<T>()?))
    }

    pub fn delete<T: Entity>(&self, object: T) -> Result<Delete, Error> {
        Ok(Delete::new(self.object(object)?))
    }

    pub fn delete_class<T: Entity>(&self) -> Result<Delete, Error> {
        Ok(Delete::new(self.class::<T>()?))
    }

    //
    // composites
    //

    #[must_use]
    pub fn batch(&self) -> Batch {
        Batch::new(self.clone())
    }

    #[must_use]
    pub fn sequence(&self) -> Sequence {
        Sequence::new()
    }

    #[must_use]
    pub fn group(&self) -> Group {
        Group::new()
    }

    //
    // schema statements
    //

    pub fn create_keyspace<T: Entity>(&self) -> Result<CreateKeyspace, Error> {
        Ok(CreateKeyspace::new(self.class::<T>()?))
    }

    pub fn create_type<T: Entity>(&self) -> Result<CreateType, Error> {
        Ok(CreateType::new(self.class::<T>()?))
    }

    pub fn create_table<T: Entity>(&self) -> Result<CreateTable, Error> {
        Ok(CreateTable::new(self.class::<T>()?))
    }

    pub fn create_index<T: Entity>(&self) -> Result<CreateIndex, Error> {
        Ok(CreateIndex::new(self.class::<T>()?))
    }

    pub fn truncate<T: Entity>(&self) -> Result<Truncate, Error> {
        Ok(Truncate::new(self.class::<T>()?))
    }

    /// Schema plan of `T` and every type it reaches.
    #[must_use]
    pub fn create_schema<T: Entity>(&self) -> CreateSchema {
        CreateSchema::new(self.clone(), TypeRef::of::<T>())
    }

    #[must_use]
    pub fn create_schemas(&self, classes: ClassSet) -> CreateSchemas {
        CreateSchemas::new(self.clone(), classes)
    }

    //
    // rows
    //

    /// Build an instance from a row of `table`. Rows of a root table
    /// produce the variant named by their type key.
    pub fn decode<T: Entity>(
        &self,
        table: &str,
        row: &Row,
        keyspace: &str,
        keys: &BTreeMap<String, String>,
    ) -> Result<Object, Error> {
        resolve::descriptor::<T>()?.decode_object(table, row, keyspace, keys, self.codecs())
    }

    /// Like [`Self::decode`], for rows known to hold exactly a `T`.
    pub fn decode_as<T: Entity>(
        &self,
        table: &str,
        row: &Row,
        keyspace: &str,
        keys: &BTreeMap<String, String>,
    ) -> Result<T, Error> {
        let object = self.decode::<T>(table, row, keyspace, keys)?;

        object.downcast::<T>().map(|object| *object).map_err(|_| {
            ValidationError::statement(
                std::any::type_name::<T>(),
                format!("a row of table '{table}' decodes to another type"),
            )
            .into()
        })
    }

    //
    // registration
    //

    /// Register a type variant with its root at runtime.
    pub fn register_type<T: Entity>(&self) -> Result<Arc<ClassDescriptor>, Error> {
        Ok(resolve::register_type::<T>()?)
    }

    /// Install a live user-defined type definition. Returns the number of
    /// codecs replaced or added.
    pub fn register_user_type(&self, definition: &UserType) -> usize {
        self.codecs().register(definition)
    }

    pub fn deregister_user_type(&self, definition: &UserType) -> usize {
        self.codecs().deregister(definition)
    }
}
