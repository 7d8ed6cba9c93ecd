use crate::{
    declare::{ClassDeclaration, ClassMarker, FieldDecl, FieldMarker, Keyspace, TypeRef},
    error::{ConfigurationError, FieldRule},
    model::{
        AccessorTable, ClassDescriptor, EntityKind, FieldDescriptor, KeyspaceDescriptor,
        TableDescriptor, TypeKeySource, TypeVariant, UdtDescriptor, VariantRegistry,
    },
    resolve::{
        self,
        chain::Chain,
        field::{self, FieldContext},
        naming,
    },
};
use std::sync::Arc;

///
/// Shape
///
/// Kind-specific facts settled before fields are resolved.
///

struct Shape {
    kind: EntityKind,
    keyspace: Keyspace,
    tables: Vec<String>,
    udt_name: Option<String>,
    discriminator: Option<String>,
    root: Option<TypeRef>,
    variants: Option<Arc<VariantRegistry>>,
    type_key: Option<TypeKeySource>,
    // chains of static variants whose own fields join the root's columns
    extra: Vec<Chain>,
}

impl Shape {
    fn new(kind: EntityKind, keyspace: Keyspace) -> Self {
        Self {
            kind,
            keyspace,
            tables: Vec::new(),
            udt_name: None,
            discriminator: None,
            root: None,
            variants: None,
            type_key: None,
            extra: Vec::new(),
        }
    }
}

/// Resolve a declared type into its descriptor.
pub(crate) fn build(type_ref: TypeRef) -> Result<ClassDescriptor, ConfigurationError> {
    let chain = Chain::load(type_ref.declaration())?;
    let this = chain.this();
    let marker = single_marker(this)?.clone();

    let shape = match marker {
        ClassMarker::Entity => {
            let mut shape = Shape::new(EntityKind::Standalone, one_keyspace(this)?);
            shape.tables = table_names(this, true)?;
            shape
        }
        ClassMarker::RootEntity { types } => root_shape(type_ref, &chain, &types, false)?,
        ClassMarker::TypeEntity {
            root,
            discriminator,
        } => variant_shape(type_ref, &chain, root, discriminator, false)?,
        ClassMarker::UdtEntity { name } => {
            let mut shape = Shape::new(EntityKind::UdtStandalone, one_keyspace(this)?);
            table_names(this, false)?;
            naming::validate_type_name(this.type_name, &name)?;
            shape.udt_name = Some(name);
            shape
        }
        ClassMarker::UdtRootEntity { name, types } => {
            let mut shape = root_shape(type_ref, &chain, &types, true)?;
            naming::validate_type_name(this.type_name, &name)?;
            shape.udt_name = Some(name);
            shape
        }
        ClassMarker::UdtTypeEntity {
            root,
            discriminator,
        } => variant_shape(type_ref, &chain, root, discriminator, true)?,
    };

    assemble(type_ref, &chain, shape)
}

fn single_marker(decl: &ClassDeclaration) -> Result<&ClassMarker, ConfigurationError> {
    match decl.markers.as_slice() {
        [] => Err(ConfigurationError::MissingEntityMarker {
            class: decl.type_name,
        }),
        [marker] => Ok(marker),
        markers => Err(ConfigurationError::ConflictingMarkers {
            class: decl.type_name,
            detail: markers
                .iter()
                .map(ClassMarker::label)
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}

fn one_keyspace(decl: &ClassDeclaration) -> Result<Keyspace, ConfigurationError> {
    let class = decl.type_name;

    let keyspace = match decl.keyspaces.as_slice() {
        [] => return Err(ConfigurationError::MissingKeyspace { class }),
        [keyspace] => keyspace.clone(),
        _ => {
            return Err(ConfigurationError::ConflictingMarkers {
                class,
                detail: "more than one keyspace declared".to_string(),
            });
        }
    };

    naming::validate_ident(class, "keyspace", &keyspace.name)?;
    for key in &keyspace.keys {
        naming::validate_ident(class, "keyspace key", key)?;
    }

    Ok(keyspace)
}

// Table names of a table-backed kind, or a check that a UDT declares none.
fn table_names(
    decl: &ClassDeclaration,
    table_backed: bool,
) -> Result<Vec<String>, ConfigurationError> {
    let class = decl.type_name;

    if !table_backed {
        if decl.tables.is_empty() {
            return Ok(Vec::new());
        }
        return Err(ConfigurationError::ConflictingMarkers {
            class,
            detail: "user-defined types cannot declare tables".to_string(),
        });
    }
    if decl.tables.is_empty() {
        return Err(ConfigurationError::MissingTable { class });
    }

    let mut names: Vec<String> = Vec::with_capacity(decl.tables.len());
    for table in &decl.tables {
        naming::validate_ident(class, "table", &table.name)?;
        if names.contains(&table.name) {
            return Err(ConfigurationError::ConflictingMarkers {
                class,
                detail: format!("table '{}' declared more than once", table.name),
            });
        }
        names.push(table.name.clone());
    }

    Ok(names)
}

fn root_shape(
    type_ref: TypeRef,
    chain: &Chain,
    types: &[TypeRef],
    udt: bool,
) -> Result<Shape, ConfigurationError> {
    let this = chain.this();
    let class = this.type_name;
    let kind = if udt {
        EntityKind::UdtRoot
    } else {
        EntityKind::Root
    };

    let mut shape = Shape::new(kind, one_keyspace(this)?);
    shape.tables = table_names(this, !udt)?;

    if !chain.fields().any(declares_type_key) {
        return Err(ConfigurationError::MissingTypeKey { class });
    }

    let registry = Arc::new(VariantRegistry::default());
    for variant in types {
        let variant_chain = Chain::load(variant.declaration())?;
        let decl = variant_chain.this();

        let discriminator = decl.markers.iter().find_map(|m| match m {
            ClassMarker::TypeEntity {
                root,
                discriminator,
            } if !udt && *root == type_ref => Some(discriminator.clone()),
            ClassMarker::UdtTypeEntity {
                root,
                discriminator,
            } if udt && *root == type_ref => Some(discriminator.clone()),
            _ => None,
        });
        let Some(discriminator) = discriminator else {
            return Err(ConfigurationError::hierarchy(
                class,
                format!(
                    "'{}' is listed as a type but does not declare this root",
                    decl.type_name
                ),
            ));
        };
        if !variant_chain.contains(type_ref.type_id()) {
            return Err(ConfigurationError::hierarchy(
                class,
                format!("type '{}' does not extend this root", decl.type_name),
            ));
        }

        registry.insert(
            class,
            TypeVariant {
                discriminator,
                type_ref: *variant,
                dynamic: false,
            },
        )?;
        shape.extra.push(variant_chain);
    }

    shape.type_key = Some(TypeKeySource::Variants(registry.clone()));
    shape.variants = Some(registry);

    Ok(shape)
}

fn variant_shape(
    type_ref: TypeRef,
    chain: &Chain,
    root: TypeRef,
    discriminator: String,
    udt: bool,
) -> Result<Shape, ConfigurationError> {
    let this = chain.this();
    let class = this.type_name;

    if !this.keyspaces.is_empty() || !this.tables.is_empty() {
        return Err(ConfigurationError::ConflictingMarkers {
            class,
            detail: "type entities inherit keyspace and tables from their root".to_string(),
        });
    }
    if discriminator.is_empty() {
        return Err(ConfigurationError::hierarchy(class, "type discriminator is empty"));
    }
    if !chain.contains(root.type_id()) {
        return Err(ConfigurationError::hierarchy(
            class,
            format!("type must extend its root '{}'", root.type_name()),
        ));
    }

    let root_descriptor = resolve::resolve(root)?;
    let expected = if udt {
        EntityKind::UdtRoot
    } else {
        EntityKind::Root
    };
    if root_descriptor.kind() != expected {
        return Err(ConfigurationError::hierarchy(
            class,
            format!(
                "'{}' is a {}, expected a {}",
                root.type_name(),
                root_descriptor.kind().label(),
                expected.label()
            ),
        ));
    }

    if let Some(registry) = root_descriptor.variants()
        && let Some(claimed) = registry.by_discriminator(&discriminator)
        && claimed.type_ref != type_ref
    {
        return Err(ConfigurationError::hierarchy(
            class,
            format!(
                "discriminator '{discriminator}' is already used by '{}'",
                claimed.type_ref.type_name()
            ),
        ));
    }

    let kind = if udt {
        EntityKind::UdtType
    } else {
        EntityKind::Type
    };
    let mut shape = Shape::new(kind, root_descriptor.keyspace().declared().clone());
    shape.tables = root_descriptor
        .tables()
        .iter()
        .map(|t| t.name().to_string())
        .collect();
    shape.udt_name = root_descriptor.udt_name().map(str::to_string);
    shape.type_key = Some(TypeKeySource::Fixed(discriminator.clone()));
    shape.discriminator = Some(discriminator);
    shape.root = Some(root);
    shape.variants = root_descriptor.variants().cloned();

    Ok(shape)
}

fn declares_type_key(decl: &FieldDecl) -> bool {
    decl.markers
        .iter()
        .any(|m| matches!(m, FieldMarker::TypeKey { .. }))
}

struct Resolved<'a> {
    decl: &'a FieldDecl,
    accessors: AccessorTable,
    from_variant: bool,
}

#[expect(clippy::too_many_lines)]
fn assemble(
    type_ref: TypeRef,
    chain: &Chain,
    shape: Shape,
) -> Result<ClassDescriptor, ConfigurationError> {
    let this = chain.this();
    let class = this.type_name;

    let mut lineage = chain.lineage().clone();
    for extra in &shape.extra {
        lineage.extend(extra.lineage());
    }
    let lineage = Arc::new(lineage);

    let ctx = FieldContext {
        class,
        kind: shape.kind,
        keyspace: &shape.keyspace,
        tables: &shape.tables,
        type_key: shape.type_key.as_ref(),
    };

    let mut names: Vec<&str> = Vec::new();
    let mut resolved = Vec::new();
    for decl in chain.fields() {
        if names.contains(&decl.name.as_str()) {
            return Err(ConfigurationError::field(
                class,
                &decl.name,
                decl.owner_name,
                FieldRule::DuplicateMarker {
                    what: "declaration of this field",
                },
            ));
        }
        names.push(&decl.name);

        field::check_markers(&ctx, decl)?;
        resolved.push(Resolved {
            decl,
            accessors: field::bind_accessors(class, decl, chain, lineage.clone())?,
            from_variant: false,
        });
    }
    let own = resolved.len();
    for extra in &shape.extra {
        for decl in extra.fields_below(type_ref.type_id()) {
            field::check_markers(&ctx, decl)?;
            resolved.push(Resolved {
                decl,
                accessors: field::bind_accessors(
                    extra.this().type_name,
                    decl,
                    extra,
                    lineage.clone(),
                )?,
                from_variant: true,
            });
        }
    }

    let mut tables = Vec::with_capacity(shape.tables.len());
    for table in &shape.tables {
        let mut columns: Vec<Arc<FieldDescriptor>> = Vec::new();

        for r in &resolved {
            let Some(column) = field::resolve_column(&ctx, r.decl, table, &r.accessors)? else {
                continue;
            };
            if !merge_column(class, table, &columns, &column, r.from_variant)? {
                columns.push(Arc::new(column));
            }
        }

        if !columns.iter().any(|c| c.is_partition_key()) {
            return Err(ConfigurationError::MissingPartitionKey {
                class,
                table: table.clone(),
            });
        }
        check_counters(class, table, &columns)?;

        tables.push(TableDescriptor {
            name: table.clone(),
            columns,
        });
    }

    let udt = match &shape.udt_name {
        Some(name) => {
            let mut columns: Vec<Arc<FieldDescriptor>> = Vec::new();
            for r in &resolved {
                let Some(column) = field::resolve_udt_column(&ctx, r.decl, name, &r.accessors)?
                else {
                    continue;
                };
                if !merge_column(class, name, &columns, &column, r.from_variant)? {
                    columns.push(Arc::new(column));
                }
            }

            Some(UdtDescriptor {
                name: name.clone(),
                columns,
            })
        }
        None => None,
    };

    let mut fields = Vec::with_capacity(own);
    for r in &resolved[..own] {
        let mapped = tables
            .iter()
            .flat_map(|t| t.columns.iter())
            .chain(udt.iter().flat_map(|u| u.columns.iter()))
            .find(|c| c.name() == r.decl.name && c.declaring_type() == r.decl.owner_name);

        fields.push(match mapped {
            Some(column) => column.clone(),
            None => Arc::new(field::resolve_unmapped(&ctx, r.decl, &r.accessors)?),
        });
    }

    let mut udt_dependencies = Vec::new();
    for f in fields
        .iter()
        .chain(tables.iter().flat_map(|t| t.columns.iter()))
        .chain(udt.iter().flat_map(|u| u.columns.iter()))
    {
        f.storage_type().collect_udts(&mut udt_dependencies);
    }

    Ok(ClassDescriptor {
        type_ref,
        kind: shape.kind,
        keyspace: KeyspaceDescriptor {
            declared: shape.keyspace,
        },
        tables,
        udt,
        fields,
        discriminator: shape.discriminator,
        root: shape.root,
        variants: shape.variants,
        factory: this.factory,
        seed: this.seed.clone(),
        udt_dependencies,
    })
}

// A column already present under the same name is shared when a sibling
// variant declares it with the same type. Returns whether it was merged.
fn merge_column(
    class: &'static str,
    scope: &str,
    columns: &[Arc<FieldDescriptor>],
    column: &FieldDescriptor,
    from_variant: bool,
) -> Result<bool, ConfigurationError> {
    let Some(existing) = columns.iter().find(|c| c.column() == column.column()) else {
        return Ok(false);
    };

    if !from_variant {
        return Err(ConfigurationError::DuplicateColumn {
            class,
            table: scope.to_string(),
            column: column.column_or_name().to_string(),
        });
    }

    let (existing_type, found_type) = (existing.storage_type(), column.storage_type());
    if existing_type != found_type || existing.role() != column.role() {
        return Err(ConfigurationError::field(
            class,
            column.name(),
            scope,
            FieldRule::ColumnTypeConflict {
                existing: existing_type.label(),
                found: found_type.label(),
            },
        ));
    }

    Ok(true)
}

// Counter tables hold nothing but keys and counters.
fn check_counters(
    class: &'static str,
    table: &str,
    columns: &[Arc<FieldDescriptor>],
) -> Result<(), ConfigurationError> {
    if !columns.iter().any(|c| c.is_counter()) {
        return Ok(());
    }

    match columns
        .iter()
        .find(|c| !c.role().is_primary_key() && !c.is_counter())
    {
        Some(column) => Err(ConfigurationError::field(
            class,
            column.name(),
            table,
            FieldRule::CounterMisuse {
                what: "mixed with regular columns",
            },
        )),
        None => Ok(()),
    }
}
