use crate::{
    declare::{
        Persisted, Table,
        access::{DirectGetter, DirectSetter, GetterFn, SetterFn},
    },
    error::ValueError,
    model::ClusteringOrder,
    types::{DataType, FieldValue},
    value::Value,
};
use std::{
    any::{TypeId, type_name},
    marker::PhantomData,
    sync::Arc,
};

///
/// KeyspaceKey
///
/// Marks a field whose value selects the keyspace an instance lives in.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeyspaceKey {
    pub(crate) name: String,
    pub(crate) excluded: Vec<String>,
}

impl KeyspaceKey {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            excluded: Vec::new(),
        }
    }

    /// Values that may never be used for this key.
    #[must_use]
    pub fn exclude<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded.extend(values.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_excluded(&self, value: &str) -> bool {
        self.excluded.iter().any(|v| v == value)
    }
}

///
/// FieldMarker
///
/// One role marker attached to a field. Table-scoped markers carry the
/// table name or [`Table::ALL`].
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FieldMarker {
    Column {
        table: String,
        name: String,
        is_static: bool,
    },
    Index {
        table: String,
    },
    PartitionKey {
        table: String,
    },
    ClusteringKey {
        table: String,
        order: ClusteringOrder,
    },
    TypeKey {
        table: String,
    },
    KeyspaceKey(KeyspaceKey),
    Mandatory,
}

impl FieldMarker {
    /// Table scope of a table-scoped marker.
    #[must_use]
    pub fn table(&self) -> Option<&str> {
        match self {
            Self::Column { table, .. }
            | Self::Index { table }
            | Self::PartitionKey { table }
            | Self::ClusteringKey { table, .. }
            | Self::TypeKey { table } => Some(table),
            Self::KeyspaceKey(_) | Self::Mandatory => None,
        }
    }
}

///
/// Field
///
/// Typed field declaration for owner `T` holding a `V`.
///

pub struct Field<T, V> {
    name: String,
    markers: Vec<FieldMarker>,
    ignore_case: bool,
    persisted: Option<Persisted>,
    frozen: Option<V>,
    getter: Option<Arc<dyn GetterFn>>,
    setter: Option<Arc<dyn SetterFn>>,
    _marker: PhantomData<fn(&T) -> V>,
}

impl<T: 'static, V: FieldValue> Field<T, V> {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            markers: Vec::new(),
            ignore_case: false,
            persisted: None,
            frozen: None,
            getter: None,
            setter: None,
            _marker: PhantomData,
        }
    }

    /// Direct field access, used when no named getter/setter is declared.
    #[must_use]
    pub fn direct(mut self, get: fn(&T) -> &V, get_mut: fn(&mut T) -> &mut V) -> Self {
        self.getter = Some(Arc::new(DirectGetter { get }));
        self.setter = Some(Arc::new(DirectSetter { get_mut }));
        self
    }

    /// Read-only direct field access.
    #[must_use]
    pub fn direct_ref(mut self, get: fn(&T) -> &V) -> Self {
        self.getter = Some(Arc::new(DirectGetter { get }));
        self
    }

    #[must_use]
    pub fn column(self, name: impl Into<String>) -> Self {
        self.column_in(Table::ALL, name)
    }

    #[must_use]
    pub fn column_in(mut self, table: impl Into<String>, name: impl Into<String>) -> Self {
        self.markers.push(FieldMarker::Column {
            table: table.into(),
            name: name.into(),
            is_static: false,
        });
        self
    }

    #[must_use]
    pub fn static_column(mut self, name: impl Into<String>) -> Self {
        self.markers.push(FieldMarker::Column {
            table: Table::ALL.to_string(),
            name: name.into(),
            is_static: true,
        });
        self
    }

    #[must_use]
    pub fn partition_key(self) -> Self {
        self.partition_key_in(Table::ALL)
    }

    #[must_use]
    pub fn partition_key_in(mut self, table: impl Into<String>) -> Self {
        self.markers.push(FieldMarker::PartitionKey {
            table: table.into(),
        });
        self
    }

    #[must_use]
    pub fn clustering_key(self, order: ClusteringOrder) -> Self {
        self.clustering_key_in(Table::ALL, order)
    }

    #[must_use]
    pub fn clustering_key_in(mut self, table: impl Into<String>, order: ClusteringOrder) -> Self {
        self.markers.push(FieldMarker::ClusteringKey {
            table: table.into(),
            order,
        });
        self
    }

    /// Keys compare case-insensitively; values are lower-cased on encode.
    #[must_use]
    pub const fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    #[must_use]
    pub fn type_key(mut self) -> Self {
        self.markers.push(FieldMarker::TypeKey {
            table: Table::ALL.to_string(),
        });
        self
    }

    #[must_use]
    pub fn index(self) -> Self {
        self.index_in(Table::ALL)
    }

    #[must_use]
    pub fn index_in(mut self, table: impl Into<String>) -> Self {
        self.markers.push(FieldMarker::Index {
            table: table.into(),
        });
        self
    }

    #[must_use]
    pub fn keyspace_key(mut self, key: KeyspaceKey) -> Self {
        self.markers.push(FieldMarker::KeyspaceKey(key));
        self
    }

    #[must_use]
    pub fn mandatory(mut self) -> Self {
        self.markers.push(FieldMarker::Mandatory);
        self
    }

    #[must_use]
    pub fn persisted(mut self, persisted: Persisted) -> Self {
        self.persisted = Some(persisted);
        self
    }

    /// Immutable field with a fixed value; it never gets a setter.
    #[must_use]
    pub fn immutable(mut self, value: V) -> Self {
        self.frozen = Some(value);
        self
    }

    pub(crate) fn erase(self) -> FieldDecl {
        let frozen = self.frozen.as_ref().map(FieldValue::to_value);
        let setter = if frozen.is_some() { None } else { self.setter };

        FieldDecl {
            name: self.name,
            owner: TypeId::of::<T>(),
            owner_name: type_name::<T>(),
            value_type: TypeId::of::<V>(),
            value_type_name: type_name::<V>(),
            data_type: V::data_type(),
            optional: V::is_optional(),
            primitive: V::is_primitive(),
            markers: self.markers,
            ignore_case: self.ignore_case,
            persisted: self.persisted,
            frozen,
            getter: self.getter,
            setter,
        }
    }
}

///
/// FieldDecl
///
/// Type-erased field declaration consumed by the resolver.
///

pub struct FieldDecl {
    pub(crate) name: String,
    pub(crate) owner: TypeId,
    pub(crate) owner_name: &'static str,
    pub(crate) value_type: TypeId,
    pub(crate) value_type_name: &'static str,
    pub(crate) data_type: DataType,
    pub(crate) optional: bool,
    pub(crate) primitive: bool,
    pub(crate) markers: Vec<FieldMarker>,
    pub(crate) ignore_case: bool,
    pub(crate) persisted: Option<Persisted>,
    pub(crate) frozen: Option<Result<Value, ValueError>>,
    pub(crate) getter: Option<Arc<dyn GetterFn>>,
    pub(crate) setter: Option<Arc<dyn SetterFn>>,
}

impl FieldDecl {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn markers(&self) -> &[FieldMarker] {
        &self.markers
    }

    #[must_use]
    pub const fn data_type(&self) -> &DataType {
        &self.data_type
    }

    pub(crate) fn is_mandatory_marked(&self) -> bool {
        self.markers.contains(&FieldMarker::Mandatory)
    }

    pub(crate) fn keyspace_key(&self) -> Option<&KeyspaceKey> {
        self.markers.iter().find_map(|m| match m {
            FieldMarker::KeyspaceKey(key) => Some(key),
            _ => None,
        })
    }
}
