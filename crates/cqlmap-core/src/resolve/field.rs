use crate::{
    declare::{
        FieldDecl, FieldMarker, Keyspace, Persisted, Table,
        access::{GetterFn, SetterFn},
    },
    error::{ConfigurationError, FieldRule},
    model::{
        Accessor, AccessorTable, EntityKind, FieldDescriptor, FieldRole, IndexDescriptor, Lineage,
        TypeKeySource,
    },
    resolve::{chain::Chain, naming},
    types::{DataType, Scalar},
    value::Value,
};
use std::{any::TypeId, collections::HashMap, sync::Arc};

///
/// FieldContext
///
/// What a field needs to know about the type being resolved.
///

pub(crate) struct FieldContext<'a> {
    pub(crate) class: &'static str,
    pub(crate) kind: EntityKind,
    pub(crate) keyspace: &'a Keyspace,
    pub(crate) tables: &'a [String],
    pub(crate) type_key: Option<&'a TypeKeySource>,
}

impl FieldContext<'_> {
    fn error(&self, decl: &FieldDecl, scope: &str, rule: FieldRule) -> ConfigurationError {
        ConfigurationError::field(self.class, &decl.name, scope, rule)
    }
}

/// Reject markers scoped to undeclared tables and repeated keyspace keys.
pub(crate) fn check_markers(
    ctx: &FieldContext<'_>,
    decl: &FieldDecl,
) -> Result<(), ConfigurationError> {
    for marker in &decl.markers {
        if let Some(table) = marker.table()
            && table != Table::ALL
            && !ctx.tables.iter().any(|t| t == table)
        {
            return Err(ConfigurationError::UnknownTable {
                class: ctx.class,
                table: table.to_string(),
            });
        }
    }

    let keyspace_keys = decl
        .markers
        .iter()
        .filter(|m| matches!(m, FieldMarker::KeyspaceKey(_)))
        .count();
    if keyspace_keys > 1 {
        return Err(ctx.error(
            decl,
            Table::ALL,
            FieldRule::DuplicateMarker {
                what: "keyspace key",
            },
        ));
    }

    Ok(())
}

/// Bind the accessors of a field for every type of the chain at or below
/// the declaring type. Named methods win over direct access.
pub(crate) fn bind_accessors(
    class: &'static str,
    decl: &FieldDecl,
    chain: &Chain,
    lineage: Arc<Lineage>,
) -> Result<AccessorTable, ConfigurationError> {
    let boolean = decl.data_type == DataType::Scalar(Scalar::Boolean);
    let getter_names = naming::getter_names(&decl.name, boolean);
    let setter_name = naming::setter_name(&decl.name);
    let immutable = decl.frozen.is_some();
    let mut bindings = HashMap::new();

    for member in chain.members_from(decl.owner) {
        let mut accessor = Accessor::default();

        if let Some((name, getter)) = getter_names
            .iter()
            .find_map(|name| member.getters.get(name).map(|g| (name, g)))
        {
            check_value_type(class, decl, name, getter.value_type().0)?;
            accessor.getter = Some(getter.clone());
        }

        if !immutable && let Some(setter) = member.setters.get(&setter_name) {
            check_value_type(class, decl, &setter_name, setter.value_type().0)?;
            accessor.setter = Some(setter.clone());
        }

        if member.type_id == decl.owner {
            if accessor.getter.is_none() {
                accessor.getter.clone_from(&decl.getter);
            }
            if accessor.setter.is_none() {
                accessor.setter.clone_from(&decl.setter);
            }
        }

        if accessor.getter.is_some() || accessor.setter.is_some() {
            bindings.insert(member.type_id, accessor);
        }
    }

    if bindings.values().all(|a| a.getter.is_none()) {
        return Err(ConfigurationError::field(
            class,
            &decl.name,
            Table::ALL,
            FieldRule::NoGetter,
        ));
    }

    Ok(AccessorTable::new(bindings, lineage))
}

fn check_value_type(
    class: &'static str,
    decl: &FieldDecl,
    accessor: &str,
    found: TypeId,
) -> Result<(), ConfigurationError> {
    if found == decl.value_type {
        return Ok(());
    }

    Err(ConfigurationError::field(
        class,
        &decl.name,
        Table::ALL,
        FieldRule::AccessorMismatch {
            accessor: accessor.to_string(),
            expected: decl.value_type_name,
        },
    ))
}

// Effective marker of one kind for a table: a marker scoped to the table
// wins over one scoped to every table.
fn scoped<'a>(
    markers: &'a [FieldMarker],
    table: &str,
    what: &'static str,
    pick: impl Fn(&FieldMarker) -> bool,
) -> Result<Option<&'a FieldMarker>, FieldRule> {
    let mut specific = None;
    let mut all = None;

    for marker in markers.iter().filter(|m| pick(m)) {
        let slot = match marker.table() {
            Some(t) if t == table => &mut specific,
            Some(t) if t == Table::ALL => &mut all,
            _ => continue,
        };
        if slot.replace(marker).is_some() {
            return Err(FieldRule::DuplicateMarker { what });
        }
    }

    Ok(specific.or(all))
}

/// Resolve a field as a column of `table`; `None` when the field is not
/// mapped to that table.
pub(crate) fn resolve_column(
    ctx: &FieldContext<'_>,
    decl: &FieldDecl,
    table: &str,
    accessors: &AccessorTable,
) -> Result<Option<FieldDescriptor>, ConfigurationError> {
    let err = |rule| ctx.error(decl, table, rule);
    let markers = &decl.markers;

    let column = scoped(markers, table, "column", |m| {
        matches!(m, FieldMarker::Column { .. })
    })
    .map_err(err)?;
    let partition = scoped(markers, table, "partition key", |m| {
        matches!(m, FieldMarker::PartitionKey { .. })
    })
    .map_err(err)?;
    let clustering = scoped(markers, table, "clustering key", |m| {
        matches!(m, FieldMarker::ClusteringKey { .. })
    })
    .map_err(err)?;
    let type_key = scoped(markers, table, "type key", |m| {
        matches!(m, FieldMarker::TypeKey { .. })
    })
    .map_err(err)?;
    let index = scoped(markers, table, "index", |m| {
        matches!(m, FieldMarker::Index { .. })
    })
    .map_err(err)?;

    let Some(FieldMarker::Column {
        name, is_static, ..
    }) = column
    else {
        let marker = if partition.is_some() {
            Some("partition key")
        } else if clustering.is_some() {
            Some("clustering key")
        } else if type_key.is_some() {
            Some("type key")
        } else if index.is_some() {
            Some("index")
        } else {
            None
        };

        return match marker {
            Some(marker) => Err(err(FieldRule::ColumnRequired { marker })),
            None => Ok(None),
        };
    };
    let is_static = *is_static;

    if decl.keyspace_key().is_some() {
        return Err(err(if is_static {
            FieldRule::StaticKey
        } else {
            FieldRule::KeyspaceKeyColumn
        }));
    }
    if partition.is_some() && clustering.is_some() {
        return Err(err(FieldRule::PartitionAndClustering));
    }
    if is_static && (partition.is_some() || clustering.is_some()) {
        return Err(err(FieldRule::StaticKey));
    }
    if type_key.is_some() && (partition.is_some() || clustering.is_some()) {
        return Err(err(FieldRule::DuplicateMarker { what: "key role" }));
    }

    let role = match (type_key, partition, clustering) {
        (Some(_), _, _) => FieldRole::TypeKey,
        (None, Some(_), _) => FieldRole::PartitionKey,
        (None, None, Some(FieldMarker::ClusteringKey { order, .. })) => {
            FieldRole::ClusteringKey(*order)
        }
        _ if is_static => FieldRole::StaticColumn,
        _ => FieldRole::Column,
    };

    naming::validate_ident(ctx.class, "column", name)?;
    let index = index.map(|_| IndexDescriptor {
        name: format!("{table}_{name}_idx"),
    });

    finish(
        ctx,
        decl,
        table,
        Some(table.to_string()),
        Some(name.clone()),
        role,
        index,
        accessors,
    )
    .map(Some)
}

/// Resolve a field as a column of a user-defined type.
pub(crate) fn resolve_udt_column(
    ctx: &FieldContext<'_>,
    decl: &FieldDecl,
    udt: &str,
    accessors: &AccessorTable,
) -> Result<Option<FieldDescriptor>, ConfigurationError> {
    let err = |rule| ctx.error(decl, udt, rule);
    let mut column = None;
    let mut type_key = false;

    for marker in &decl.markers {
        let forbidden = match marker {
            FieldMarker::PartitionKey { .. } => Some("partition key"),
            FieldMarker::ClusteringKey { .. } => Some("clustering key"),
            FieldMarker::Index { .. } => Some("index"),
            FieldMarker::Column {
                is_static: true, ..
            } => Some("static"),
            FieldMarker::Column { name, .. } => {
                if column.replace(name).is_some() {
                    return Err(err(FieldRule::DuplicateMarker { what: "column" }));
                }
                None
            }
            FieldMarker::TypeKey { .. } => {
                type_key = true;
                None
            }
            FieldMarker::KeyspaceKey(_) | FieldMarker::Mandatory => None,
        };
        if let Some(marker) = forbidden {
            return Err(err(FieldRule::UdtMarker { marker }));
        }
    }

    let Some(name) = column else {
        if type_key {
            return Err(err(FieldRule::ColumnRequired { marker: "type key" }));
        }
        return Ok(None);
    };
    if decl.keyspace_key().is_some() {
        return Err(err(FieldRule::KeyspaceKeyColumn));
    }

    naming::validate_ident(ctx.class, "column", name)?;
    let role = if type_key {
        FieldRole::TypeKey
    } else {
        FieldRole::Column
    };

    finish(
        ctx,
        decl,
        udt,
        None,
        Some(name.clone()),
        role,
        None,
        accessors,
    )
    .map(Some)
}

/// Resolve a field that is not a column anywhere: a keyspace key or a plain
/// in-memory field.
pub(crate) fn resolve_unmapped(
    ctx: &FieldContext<'_>,
    decl: &FieldDecl,
    accessors: &AccessorTable,
) -> Result<FieldDescriptor, ConfigurationError> {
    let role = match decl.keyspace_key() {
        Some(key) => FieldRole::KeyspaceKey(key.clone()),
        None => FieldRole::None,
    };

    finish(ctx, decl, Table::ALL, None, None, role, None, accessors)
}

#[expect(clippy::too_many_arguments)]
#[expect(clippy::too_many_lines)]
fn finish(
    ctx: &FieldContext<'_>,
    decl: &FieldDecl,
    scope: &str,
    table: Option<String>,
    column: Option<String>,
    role: FieldRole,
    index: Option<IndexDescriptor>,
    accessors: &AccessorTable,
) -> Result<FieldDescriptor, ConfigurationError> {
    let err = |rule| ctx.error(decl, scope, rule);
    let data_type = &decl.data_type;
    let is_type_key = matches!(role, FieldRole::TypeKey);
    let is_key = role.is_primary_key();
    let marked = decl.is_mandatory_marked();

    if decl.optional && (marked || is_type_key) {
        return Err(err(FieldRule::OptionalAndMandatory));
    }

    if is_type_key {
        if !ctx.kind.is_hierarchy() {
            return Err(err(FieldRule::TypeKeyOutsideHierarchy));
        }
        if !data_type.is_text() {
            return Err(err(FieldRule::TypeKeyNotText {
                data_type: data_type.label(),
            }));
        }
        if decl.frozen.is_some() {
            return Err(err(FieldRule::TypeKeyImmutable));
        }
    }

    let multi_key = if is_key && data_type.is_collection() {
        match data_type.set_element() {
            Some(element) => Some(element.clone()),
            None => {
                return Err(err(FieldRule::MultiKeyRequiresSet {
                    data_type: data_type.label(),
                }));
            }
        }
    } else {
        None
    };

    if decl.ignore_case && is_key {
        let key_type = multi_key.as_ref().unwrap_or(data_type);
        if !key_type.is_text() {
            return Err(err(FieldRule::CaseInsensitiveRequiresText {
                data_type: key_type.label(),
            }));
        }
    }

    if matches!(data_type, DataType::Udt(_)) {
        let marker = match &role {
            FieldRole::PartitionKey => Some("partition key"),
            FieldRole::ClusteringKey(_) => Some("clustering key"),
            FieldRole::StaticColumn => Some("static"),
            _ if index.is_some() => Some("index"),
            _ => None,
        };
        if let Some(marker) = marker {
            return Err(err(FieldRule::UdtMarker { marker }));
        }
    }

    if data_type.is_counter() {
        let misuse = if is_key {
            Some("keys")
        } else if index.is_some() {
            Some("indexed")
        } else if ctx.kind.is_udt() && column.is_some() {
            Some("user-defined type fields")
        } else if decl.persisted.is_some() {
            Some("persisted")
        } else {
            None
        };
        if let Some(what) = misuse {
            return Err(err(FieldRule::CounterMisuse { what }));
        }
    }

    if let FieldRole::KeyspaceKey(key) = &role {
        if !data_type.is_text() {
            return Err(err(FieldRule::KeyspaceKeyNotText {
                data_type: data_type.label(),
            }));
        }
        if !ctx.keyspace.keys.iter().any(|k| k == key.name()) {
            return Err(err(FieldRule::UnknownKeyspaceKey {
                name: key.name().to_string(),
            }));
        }
    }

    let persist_elements = match &decl.persisted {
        Some(persisted) => check_persisted(persisted, data_type).map_err(err)?,
        None => false,
    };

    let frozen = match &decl.frozen {
        Some(Ok(value)) => Some(value.clone()),
        Some(Err(e)) => {
            return Err(err(FieldRule::InvalidImmutable {
                message: e.to_string(),
            }));
        }
        None => None,
    };
    if let Some(value) = &frozen {
        check_frozen(value, data_type).map_err(err)?;
    }

    Ok(FieldDescriptor {
        name: decl.name.clone(),
        declaring_type: decl.owner_name,
        class_type: ctx.class,
        table,
        column,
        index,
        data_type: data_type.clone(),
        value_type_name: decl.value_type_name,
        mandatory: marked || decl.primitive || is_type_key,
        optional: decl.optional,
        ignore_case: decl.ignore_case,
        multi_key,
        persisted: decl.persisted.clone(),
        persist_elements,
        frozen,
        accessors: accessors.clone(),
        type_key: if is_type_key {
            ctx.type_key.cloned()
        } else {
            None
        },
        role,
    })
}

// Returns whether the persister applies to each element of a collection
// rather than to the whole value.
fn check_persisted(persisted: &Persisted, data_type: &DataType) -> Result<bool, FieldRule> {
    let persister = persisted.persister();

    let Some(scalar) = persisted.as_type().as_scalar() else {
        return Err(FieldRule::Persister {
            message: format!(
                "persisted type '{}' must be a scalar type",
                persisted.as_type().label()
            ),
        });
    };
    if persister.persisted_type() != scalar {
        return Err(FieldRule::Persister {
            message: format!(
                "persister '{}' encodes to '{}' but the column is declared as '{scalar}'",
                persister.name(),
                persister.persisted_type()
            ),
        });
    }

    let decoded = persister.decoded_type();
    if decoded == *data_type {
        return Ok(false);
    }

    let element = match data_type {
        DataType::List(e)
        | DataType::Set(e)
        | DataType::OrderedSet(e)
        | DataType::SortedSet(e)
        | DataType::Map(_, e)
        | DataType::SortedMap(_, e) => Some(e.as_ref()),
        DataType::Scalar(_) | DataType::Udt(_) => None,
    };
    if element == Some(&decoded) {
        return Ok(true);
    }

    Err(FieldRule::Persister {
        message: format!(
            "persister '{}' decodes '{}' but the field holds '{}'",
            persister.name(),
            decoded.label(),
            data_type.label()
        ),
    })
}

fn check_frozen(value: &Value, data_type: &DataType) -> Result<(), FieldRule> {
    if value.is_null() || data_type.accepts(value) {
        return Ok(());
    }

    Err(FieldRule::InvalidImmutable {
        message: format!("expected {} but found {}", data_type.label(), value.label()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        declare::{Declaration, Entity, Field, JsonPersister},
        model::ClusteringOrder,
    };

    #[derive(Default)]
    struct Probe {
        id: String,
        tags: Vec<String>,
    }

    impl Entity for Probe {
        fn declare() -> Declaration<Self> {
            Declaration::new()
        }
    }

    fn field<V: crate::types::FieldValue>(f: Field<Probe, V>) -> FieldDecl {
        f.erase()
    }

    #[test]
    fn table_scoped_marker_overrides_all_scope() {
        let decl = field(
            Field::<Probe, String>::new("id")
                .direct(|p| &p.id, |p| &mut p.id)
                .column("id")
                .column_in("by_name", "person_id"),
        );
        let markers = &decl.markers;

        let pick = |m: &FieldMarker| matches!(m, FieldMarker::Column { .. });
        let by_name = scoped(markers, "by_name", "column", pick).unwrap();
        let people = scoped(markers, "people", "column", pick).unwrap();

        assert!(matches!(by_name, Some(FieldMarker::Column { name, .. }) if name == "person_id"));
        assert!(matches!(people, Some(FieldMarker::Column { name, .. }) if name == "id"));
    }

    #[test]
    fn repeated_marker_in_one_scope_is_rejected() {
        let decl = field(
            Field::<Probe, String>::new("id")
                .direct(|p| &p.id, |p| &mut p.id)
                .clustering_key(ClusteringOrder::Asc)
                .clustering_key(ClusteringOrder::Desc),
        );

        let result = scoped(&decl.markers, "people", "clustering key", |m| {
            matches!(m, FieldMarker::ClusteringKey { .. })
        });
        assert_eq!(
            result.unwrap_err(),
            FieldRule::DuplicateMarker {
                what: "clustering key"
            }
        );
    }

    #[test]
    fn element_persister_is_detected() {
        let decl = field(
            Field::<Probe, Vec<String>>::new("tags")
                .direct(|p| &p.tags, |p| &mut p.tags)
                .persisted(Persisted::new(
                    DataType::Scalar(Scalar::Text),
                    JsonPersister::of::<String>(),
                )),
        );
        let persisted = decl.persisted.as_ref().unwrap();

        assert_eq!(check_persisted(persisted, &decl.data_type), Ok(true));
    }

    #[test]
    fn persister_type_disagreement_is_rejected() {
        let persisted = Persisted::new(
            DataType::Scalar(Scalar::Blob),
            JsonPersister::of::<String>(),
        );

        assert!(matches!(
            check_persisted(&persisted, &DataType::Scalar(Scalar::Text)),
            Err(FieldRule::Persister { .. })
        ));
    }

    #[test]
    fn non_scalar_persisted_type_is_rejected() {
        let persisted = Persisted::new(
            DataType::List(Box::new(DataType::Scalar(Scalar::Text))),
            JsonPersister::of::<String>(),
        );

        assert!(matches!(
            check_persisted(&persisted, &DataType::Scalar(Scalar::Text)),
            Err(FieldRule::Persister { message }) if message.contains("scalar")
        ));
    }
}
