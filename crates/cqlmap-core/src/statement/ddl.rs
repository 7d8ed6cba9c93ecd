//! Schema statements for one mapped type.
//!
//! Keyspace-keyed types need their key values bound before these compile.
//! A key value on an exclusion list skips the statement under the schema
//! excluded-key policy.

use crate::{
    error::{Error, ValidationError},
    model::{ClassDescriptor, FieldDescriptor, TableDescriptor},
    resolve,
    statement::{BuildCache, PrimitiveStatement, Statement, StatementKind, Target, cql, excluded},
};
use std::sync::Arc;

// ddl_statement
// Builder surface shared by every schema statement.
macro_rules! ddl_statement {
    ($name:ident, $kind:expr) => {
        impl $name {
            pub(crate) fn new(target: Target) -> Self {
                Self {
                    target,
                    if_not_exists: None,
                    cache: BuildCache::default(),
                }
            }

            /// Override the configured `IF NOT EXISTS` default.
            pub fn if_not_exists(&mut self, enabled: bool) -> &mut Self {
                self.if_not_exists = Some(enabled);
                self.cache.invalidate();
                self
            }

            pub fn keyspace_key(
                &mut self,
                name: impl Into<String>,
                value: impl Into<String>,
            ) -> &mut Self {
                self.target.bind_keyspace_key(name, value);
                self.cache.invalidate();
                self
            }

            fn guarded(&self) -> bool {
                self.if_not_exists
                    .unwrap_or(self.target.config().schema.if_not_exists)
            }
        }

        impl Statement for $name {
            fn kind(&self) -> StatementKind {
                $kind
            }

            fn build(&mut self) -> Result<Arc<[PrimitiveStatement]>, Error> {
                let type_name = Some(self.target.type_name());
                if let Some(hit) = self.cache.hit(self.kind(), type_name) {
                    return Ok(hit);
                }

                let compiled = self.compile();
                let compiled = excluded(
                    self.target.config().schema.excluded_keys,
                    self.kind(),
                    self.target.type_name(),
                    compiled,
                )?;

                Ok(self.cache.store(self.kind(), type_name, compiled))
            }

            fn is_dirty(&self) -> bool {
                self.cache.is_dirty()
            }
        }
    };
}

///
/// CreateKeyspace
///

#[derive(Debug)]
pub struct CreateKeyspace {
    target: Target,
    if_not_exists: Option<bool>,
    cache: BuildCache,
}

ddl_statement!(CreateKeyspace, StatementKind::CreateKeyspace);

impl CreateKeyspace {
    fn compile(&mut self) -> Result<Vec<PrimitiveStatement>, Error> {
        let keyspace = self.target.keyspace(&[])?;
        let declared = self.target.descriptor().keyspace();
        let defaults = &self.target.config().keyspace;

        let replication = declared
            .replication()
            .cloned()
            .unwrap_or_else(|| defaults.replication.clone());
        let durable_writes = declared.durable_writes().unwrap_or(defaults.durable_writes);

        let text = format!(
            "CREATE KEYSPACE {}{keyspace} WITH replication = {} AND durable_writes = {durable_writes}",
            cql::if_not_exists(self.guarded()),
            replication.to_cql(),
        );

        Ok(vec![
            PrimitiveStatement::new(StatementKind::CreateKeyspace, text).on(&keyspace, None),
        ])
    }
}

///
/// CreateType
///
/// Type variants create the type of their root, which holds every
/// variant's columns.
///

#[derive(Debug)]
pub struct CreateType {
    target: Target,
    if_not_exists: Option<bool>,
    cache: BuildCache,
}

ddl_statement!(CreateType, StatementKind::CreateType);

impl CreateType {
    fn compile(&mut self) -> Result<Vec<PrimitiveStatement>, Error> {
        let keyspace = self.target.keyspace(&[])?;
        let owner = hierarchy_owner(self.target.descriptor())?;
        let Some(udt) = owner.udt() else {
            return Err(ValidationError::statement(
                owner.type_name(),
                format!("a {} has no user-defined type", owner.kind().label()),
            )
            .into());
        };

        let mut fields = Vec::with_capacity(udt.columns().len());
        for column in udt.columns() {
            fields.push(format!(
                "{} {}",
                column.column_or_name(),
                column.storage_type().to_cql()?
            ));
        }

        let text = format!(
            "CREATE TYPE {}{} ({})",
            cql::if_not_exists(self.guarded()),
            cql::qualified(&keyspace, udt.name()),
            fields.join(", "),
        );

        Ok(vec![
            PrimitiveStatement::new(StatementKind::CreateType, text).on(&keyspace, None),
        ])
    }
}

///
/// CreateTable
///
/// One statement per table. Type variants create the tables of their root.
///

#[derive(Debug)]
pub struct CreateTable {
    target: Target,
    if_not_exists: Option<bool>,
    cache: BuildCache,
}

ddl_statement!(CreateTable, StatementKind::CreateTable);

impl CreateTable {
    fn compile(&mut self) -> Result<Vec<PrimitiveStatement>, Error> {
        let keyspace = self.target.keyspace(&[])?;
        let owner = hierarchy_owner(self.target.descriptor())?;
        let guarded = self.guarded();

        owner
            .tables()
            .iter()
            .map(|table| {
                let text = create_table_cql(table, &keyspace, guarded)?;
                Ok(PrimitiveStatement::new(StatementKind::CreateTable, text)
                    .on(&keyspace, Some(table.name())))
            })
            .collect()
    }
}

fn create_table_cql(
    table: &TableDescriptor,
    keyspace: &str,
    guarded: bool,
) -> Result<String, Error> {
    let partition: Vec<&str> = table.partition_keys().map(|f| f.column_or_name()).collect();
    let clustering: Vec<_> = table.clustering_keys().collect();

    let mut columns = Vec::new();
    let ordered = table
        .primary_keys()
        .chain(table.non_primary_columns().filter(|f| f.role().is_column()));
    for field in ordered {
        let name = field.column_or_name();
        if columns.iter().any(|(c, _)| c == name) {
            continue;
        }
        columns.push((name.to_string(), column_cql(field)?));
    }

    let partition_key = if partition.len() == 1 {
        partition.join("")
    } else {
        format!("({})", partition.join(", "))
    };
    let primary_key = std::iter::once(partition_key)
        .chain(clustering.iter().map(|(f, _)| f.column_or_name().to_string()))
        .collect::<Vec<_>>()
        .join(", ");

    let mut text = format!(
        "CREATE TABLE {}{} (",
        cql::if_not_exists(guarded),
        cql::qualified(keyspace, table.name())
    );
    for (name, data_type) in &columns {
        text.push_str(&format!("{name} {data_type}, "));
    }
    text.push_str(&format!("PRIMARY KEY ({primary_key}))"));

    if !clustering.is_empty() {
        let order = clustering
            .iter()
            .map(|(f, order)| format!("{} {}", f.column_or_name(), order.cql()))
            .collect::<Vec<_>>()
            .join(", ");
        text.push_str(&format!(" WITH CLUSTERING ORDER BY ({order})"));
    }

    Ok(text)
}

// Column type; a multi-key column stores one element of the key set.
fn column_cql(field: &FieldDescriptor) -> Result<String, Error> {
    let data_type = match field.multi_key_type() {
        Some(element) => element.to_cql()?,
        None => field.storage_type().to_cql()?,
    };

    Ok(if field.is_static() {
        format!("{data_type} STATIC")
    } else {
        data_type
    })
}

///
/// CreateIndex
///

#[derive(Debug)]
pub struct CreateIndex {
    target: Target,
    if_not_exists: Option<bool>,
    cache: BuildCache,
}

ddl_statement!(CreateIndex, StatementKind::CreateIndex);

impl CreateIndex {
    fn compile(&mut self) -> Result<Vec<PrimitiveStatement>, Error> {
        let keyspace = self.target.keyspace(&[])?;
        let owner = hierarchy_owner(self.target.descriptor())?;
        let guarded = self.guarded();
        let mut out = Vec::new();

        for table in owner.tables() {
            for field in table.indexes() {
                let Some(index) = field.index() else {
                    continue;
                };
                let text = format!(
                    "CREATE INDEX {}{} ON {} ({})",
                    cql::if_not_exists(guarded),
                    index.name,
                    cql::qualified(&keyspace, table.name()),
                    field.column_or_name(),
                );
                out.push(
                    PrimitiveStatement::new(StatementKind::CreateIndex, text)
                        .on(&keyspace, Some(table.name())),
                );
            }
        }

        Ok(out)
    }
}

///
/// Truncate
///

#[derive(Debug)]
pub struct Truncate {
    target: Target,
    cache: BuildCache,
}

impl Truncate {
    pub(crate) fn new(target: Target) -> Self {
        Self {
            target,
            cache: BuildCache::default(),
        }
    }

    pub fn keyspace_key(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.target.bind_keyspace_key(name, value);
        self.cache.invalidate();
        self
    }

    pub fn table(&mut self, name: impl Into<String>) -> &mut Self {
        self.target.restrict_table(name);
        self.cache.invalidate();
        self
    }

    fn compile(&mut self) -> Result<Vec<PrimitiveStatement>, Error> {
        let keyspace = self.target.keyspace(&[])?;

        Ok(self
            .target
            .tables()?
            .iter()
            .map(|table| {
                let text = format!("TRUNCATE {}", cql::qualified(&keyspace, table.name()));
                PrimitiveStatement::new(StatementKind::Truncate, text)
                    .on(&keyspace, Some(table.name()))
            })
            .collect())
    }
}

impl Statement for Truncate {
    fn kind(&self) -> StatementKind {
        StatementKind::Truncate
    }

    fn build(&mut self) -> Result<Arc<[PrimitiveStatement]>, Error> {
        let type_name = Some(self.target.type_name());
        if let Some(hit) = self.cache.hit(self.kind(), type_name) {
            return Ok(hit);
        }

        let compiled = self.compile();
        let compiled = excluded(
            self.target.config().schema.excluded_keys,
            self.kind(),
            self.target.type_name(),
            compiled,
        )?;

        Ok(self.cache.store(self.kind(), type_name, compiled))
    }

    fn is_dirty(&self) -> bool {
        self.cache.is_dirty()
    }
}

// Root of a type variant, or the descriptor itself.
pub(crate) fn hierarchy_owner(
    descriptor: &Arc<ClassDescriptor>,
) -> Result<Arc<ClassDescriptor>, Error> {
    match descriptor.root() {
        Some(root) if descriptor.kind().is_type() => Ok(resolve::resolve(root)?),
        _ => Ok(descriptor.clone()),
    }
}
