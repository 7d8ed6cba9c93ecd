use crate::{
    declare::{KeyspaceKey, Persisted},
    model::{AccessorTable, ClusteringOrder, VariantRegistry},
    types::DataType,
    value::Value,
};
use std::sync::Arc;

///
/// FieldRole
///
/// The single semantic role a field plays in one table.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FieldRole {
    Column,
    PartitionKey,
    ClusteringKey(ClusteringOrder),
    TypeKey,
    KeyspaceKey(KeyspaceKey),
    StaticColumn,
    None,
}

impl FieldRole {
    #[must_use]
    pub const fn is_primary_key(&self) -> bool {
        matches!(self, Self::PartitionKey | Self::ClusteringKey(_))
    }

    #[must_use]
    pub const fn is_column(&self) -> bool {
        !matches!(self, Self::KeyspaceKey(_) | Self::None)
    }
}

///
/// IndexDescriptor
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IndexDescriptor {
    pub name: String,
}

///
/// TypeKeySource
///
/// Where a type-key field takes its discriminator from: the fixed value of
/// a type variant, or the variant registry of a root.
///

#[derive(Clone, Debug)]
pub enum TypeKeySource {
    Fixed(String),
    Variants(Arc<VariantRegistry>),
}

///
/// FieldDescriptor
///
/// Resolved metadata of one field within one table (or within the type
/// itself for table-less fields). Never mutated after resolution.
///

#[derive(Clone, Debug)]
pub struct FieldDescriptor {
    pub(crate) name: String,
    pub(crate) declaring_type: &'static str,
    pub(crate) class_type: &'static str,
    pub(crate) table: Option<String>,
    pub(crate) column: Option<String>,
    pub(crate) role: FieldRole,
    pub(crate) index: Option<IndexDescriptor>,
    pub(crate) data_type: DataType,
    pub(crate) value_type_name: &'static str,
    pub(crate) mandatory: bool,
    pub(crate) optional: bool,
    pub(crate) ignore_case: bool,
    pub(crate) multi_key: Option<DataType>,
    pub(crate) persisted: Option<Persisted>,
    pub(crate) persist_elements: bool,
    pub(crate) frozen: Option<Value>,
    pub(crate) accessors: AccessorTable,
    pub(crate) type_key: Option<TypeKeySource>,
}

impl FieldDescriptor {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type whose declaration introduced the field.
    #[must_use]
    pub const fn declaring_type(&self) -> &'static str {
        self.declaring_type
    }

    /// Type whose descriptor owns this field descriptor.
    #[must_use]
    pub const fn class_type(&self) -> &'static str {
        self.class_type
    }

    #[must_use]
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    #[must_use]
    pub fn column(&self) -> Option<&str> {
        self.column.as_deref()
    }

    /// Column name, falling back to the field name for table-less fields.
    #[must_use]
    pub fn column_or_name(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.name)
    }

    #[must_use]
    pub const fn role(&self) -> &FieldRole {
        &self.role
    }

    #[must_use]
    pub const fn index(&self) -> Option<&IndexDescriptor> {
        self.index.as_ref()
    }

    #[must_use]
    pub const fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// CQL storage type: the persisted type when a persister is bound.
    #[must_use]
    pub fn storage_type(&self) -> DataType {
        let Some(persisted) = &self.persisted else {
            return self.data_type.clone();
        };
        let scalar = persisted.as_type.clone();

        if !self.persist_elements {
            return scalar;
        }
        match &self.data_type {
            DataType::List(_) => DataType::List(Box::new(scalar)),
            DataType::Set(_) => DataType::Set(Box::new(scalar)),
            DataType::OrderedSet(_) => DataType::OrderedSet(Box::new(scalar)),
            DataType::SortedSet(_) => DataType::SortedSet(Box::new(scalar)),
            DataType::Map(k, _) => DataType::Map(k.clone(), Box::new(scalar)),
            DataType::SortedMap(k, _) => DataType::SortedMap(k.clone(), Box::new(scalar)),
            other => other.clone(),
        }
    }

    #[must_use]
    pub const fn value_type_name(&self) -> &'static str {
        self.value_type_name
    }

    #[must_use]
    pub const fn is_mandatory(&self) -> bool {
        self.mandatory
    }

    #[must_use]
    pub const fn is_optional(&self) -> bool {
        self.optional
    }

    #[must_use]
    pub const fn is_case_insensitive(&self) -> bool {
        self.ignore_case
    }

    #[must_use]
    pub const fn multi_key_type(&self) -> Option<&DataType> {
        self.multi_key.as_ref()
    }

    #[must_use]
    pub const fn persisted(&self) -> Option<&Persisted> {
        self.persisted.as_ref()
    }

    #[must_use]
    pub const fn frozen_value(&self) -> Option<&Value> {
        self.frozen.as_ref()
    }

    #[must_use]
    pub const fn accessors(&self) -> &AccessorTable {
        &self.accessors
    }

    #[must_use]
    pub const fn is_partition_key(&self) -> bool {
        matches!(self.role, FieldRole::PartitionKey)
    }

    #[must_use]
    pub const fn is_clustering_key(&self) -> bool {
        matches!(self.role, FieldRole::ClusteringKey(_))
    }

    #[must_use]
    pub const fn is_type_key(&self) -> bool {
        matches!(self.role, FieldRole::TypeKey)
    }

    #[must_use]
    pub const fn is_static(&self) -> bool {
        matches!(self.role, FieldRole::StaticColumn)
    }

    #[must_use]
    pub const fn keyspace_key(&self) -> Option<&KeyspaceKey> {
        match &self.role {
            FieldRole::KeyspaceKey(key) => Some(key),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_counter(&self) -> bool {
        self.data_type.is_counter()
    }
}
