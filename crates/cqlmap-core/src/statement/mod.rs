//! Statement builders.
//!
//! Every builder holds mutable state plus a cache of its compiled form. A
//! mutator clears the cache; `build()` recompiles only when the cache is
//! empty and otherwise hands back the same `Arc`. Composites own their
//! children, so reaching a child mutably goes through the composite and
//! clears its cache too.

mod batch;
mod clause;
mod composite;
mod cql;
mod ddl;
mod delete;
mod insert;
mod select;
mod target;
mod update;


use crate::{
    error::Error,
    obs::sink::{self, MetricsEvent},
    schema::{CreateSchema, CreateSchemas},
    value::Value,
};
use cqlmap_config::{Consistency, StatementConfig};
use derive_more::From;
use std::sync::Arc;
use tracing::trace;

// re-exports
pub use crate::obs::sink::StatementKind;
pub use batch::{Batch, BatchStatement, BatchType};
pub use clause::{Clause, Relation};
pub use composite::{Group, Sequence};
pub use ddl::{CreateIndex, CreateKeyspace, CreateTable, CreateType, Truncate};
pub use delete::Delete;
pub use insert::Insert;
pub use select::{Select, Selector};
pub use update::{Assignment, Update};

pub(crate) use ddl::hierarchy_owner;
pub(crate) use target::Target;

///
/// Statement
///

pub trait Statement {
    fn kind(&self) -> StatementKind;

    /// Compile into primitives, reusing the cached form while clean.
    fn build(&mut self) -> Result<Arc<[PrimitiveStatement]>, Error>;

    /// Whether the next `build()` recompiles.
    fn is_dirty(&self) -> bool;
}

///
/// Binding
///
/// A value bound to one `?` marker of the CQL text.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Binding {
    pub column: String,
    pub value: Value,
}

impl Binding {
    pub(crate) fn new(column: impl Into<String>, value: Value) -> Self {
        Self {
            column: column.into(),
            value,
        }
    }
}

///
/// Condition
///
/// Compare-and-set guard of a conditional statement.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Condition {
    IfExists,
    IfNotExists,
    /// Rendered predicates, their values bound after the statement's own.
    If(Vec<String>),
}

///
/// Using
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Using {
    pub ttl: Option<u32>,
    pub timestamp: Option<i64>,
}

impl Using {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.ttl.is_none() && self.timestamp.is_none()
    }
}

///
/// StatementOptions
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatementOptions {
    pub consistency: Option<Consistency>,
    pub serial_consistency: Option<Consistency>,
    pub ttl: Option<u32>,
    pub timestamp: Option<i64>,
    pub condition: Option<Condition>,
}

///
/// Consistencies
///
/// Per-statement consistency overrides, falling back to the mapper
/// configuration.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct Consistencies {
    pub(crate) consistency: Option<Consistency>,
    pub(crate) serial: Option<Consistency>,
}

impl Consistencies {
    pub(crate) fn options(&self, config: &StatementConfig, conditional: bool) -> StatementOptions {
        StatementOptions {
            consistency: self.consistency.or(config.consistency),
            serial_consistency: if conditional {
                self.serial.or(config.serial_consistency)
            } else {
                None
            },
            ..StatementOptions::default()
        }
    }
}

///
/// PrimitiveStatement
///
/// One executable CQL statement. Primitives with the same `stage` may run
/// concurrently; stages run in ascending order.
///

#[derive(Clone, Debug, PartialEq)]
pub struct PrimitiveStatement {
    pub operation: StatementKind,
    pub keyspace: Option<String>,
    pub table: Option<String>,
    pub cql: String,
    pub bindings: Vec<Binding>,
    pub options: StatementOptions,
    pub stage: u32,
    pub batched: Vec<PrimitiveStatement>,
}

impl PrimitiveStatement {
    pub(crate) fn new(operation: StatementKind, cql: String) -> Self {
        Self {
            operation,
            keyspace: None,
            table: None,
            cql,
            bindings: Vec::new(),
            options: StatementOptions::default(),
            stage: 0,
            batched: Vec::new(),
        }
    }

    pub(crate) fn on(mut self, keyspace: &str, table: Option<&str>) -> Self {
        self.keyspace = Some(keyspace.to_string());
        self.table = table.map(str::to_string);
        self
    }

    #[must_use]
    pub const fn is_conditional(&self) -> bool {
        self.options.condition.is_some()
    }

    /// Bound values in marker order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.bindings.iter().map(|b| &b.value)
    }

    /// CQL text with each `?` marker replaced by its bound literal.
    #[must_use]
    pub fn to_inline_cql(&self) -> String {
        let mut out = String::with_capacity(self.cql.len());
        let mut values = self.values();
        let mut quoted = false;

        for c in self.cql.chars() {
            match c {
                '\'' => {
                    quoted = !quoted;
                    out.push(c);
                }
                '?' if !quoted => match values.next() {
                    Some(value) => out.push_str(&value.to_cql_literal()),
                    None => out.push(c),
                },
                _ => out.push(c),
            }
        }

        out
    }
}

///
/// BuildCache
///
/// Compiled form of a builder. Empty means dirty.
///

#[derive(Debug, Default)]
pub(crate) struct BuildCache {
    compiled: Option<Arc<[PrimitiveStatement]>>,
}

impl BuildCache {
    pub(crate) fn invalidate(&mut self) {
        self.compiled = None;
    }

    pub(crate) const fn is_dirty(&self) -> bool {
        self.compiled.is_none()
    }

    pub(crate) fn hit(
        &self,
        kind: StatementKind,
        type_name: Option<&'static str>,
    ) -> Option<Arc<[PrimitiveStatement]>> {
        let compiled = self.compiled.clone()?;
        sink::record(MetricsEvent::StatementCacheHit { kind, type_name });

        Some(compiled)
    }

    pub(crate) fn store(
        &mut self,
        kind: StatementKind,
        type_name: Option<&'static str>,
        compiled: Vec<PrimitiveStatement>,
    ) -> Arc<[PrimitiveStatement]> {
        trace!(
            kind = kind.label(),
            type_name,
            primitives = compiled.len(),
            "compiled statement"
        );
        sink::record(MetricsEvent::StatementCompiled {
            kind,
            type_name,
            primitives: compiled.len() as u64,
        });

        let compiled: Arc<[PrimitiveStatement]> = compiled.into();
        self.compiled = Some(compiled.clone());

        compiled
    }
}

///
/// StatementNode
///
/// Any statement, as held by a composite.
///

#[derive(Debug, From)]
pub enum StatementNode {
    Select(Select),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
    Batch(Batch),
    Sequence(Sequence),
    Group(Group),
    CreateKeyspace(CreateKeyspace),
    CreateTable(CreateTable),
    CreateType(CreateType),
    CreateIndex(CreateIndex),
    CreateSchema(CreateSchema),
    CreateSchemas(CreateSchemas),
    Truncate(Truncate),
}

///
/// NodeVariant
///
/// Typed access to the statement held by a node.
///

pub trait NodeVariant: Sized {
    fn from_node(node: &StatementNode) -> Option<&Self>;

    fn from_node_mut(node: &mut StatementNode) -> Option<&mut Self>;
}

macro_rules! statement_nodes {
    ($($variant:ident),* $(,)?) => {
        impl Statement for StatementNode {
            fn kind(&self) -> StatementKind {
                match self {
                    $(Self::$variant(s) => s.kind(),)*
                }
            }

            fn build(&mut self) -> Result<Arc<[PrimitiveStatement]>, Error> {
                match self {
                    $(Self::$variant(s) => s.build(),)*
                }
            }

            fn is_dirty(&self) -> bool {
                match self {
                    $(Self::$variant(s) => s.is_dirty(),)*
                }
            }
        }

        $(
            impl NodeVariant for $variant {
                fn from_node(node: &StatementNode) -> Option<&Self> {
                    match node {
                        StatementNode::$variant(s) => Some(s),
                        _ => None,
                    }
                }

                fn from_node_mut(node: &mut StatementNode) -> Option<&mut Self> {
                    match node {
                        StatementNode::$variant(s) => Some(s),
                        _ => None,
                    }
                }
            }
        )*
    };
}

statement_nodes!(
    Select,
    Insert,
    Update,
    Delete,
    Batch,
    Sequence,
    Group,
    CreateKeyspace,
    CreateTable,
    CreateType,
    CreateIndex,
    CreateSchema,
    CreateSchemas,
    Truncate,
);

impl StatementNode {
    #[must_use]
    pub fn downcast_ref<S: NodeVariant>(&self) -> Option<&S> {
        S::from_node(self)
    }

    pub fn downcast_mut<S: NodeVariant>(&mut self) -> Option<&mut S> {
        S::from_node_mut(self)
    }

    /// Children of a composite; empty for leaves.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        match self {
            Self::Batch(s) => s.children(),
            Self::Sequence(s) => s.children(),
            Self::Group(s) => s.children(),
            _ => &[],
        }
    }

    #[must_use]
    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Batch(_) | Self::Sequence(_) | Self::Group(_))
    }

    /// Leaf statements in order, flattening nested composites.
    #[must_use]
    pub fn leaves(&self) -> Vec<&Self> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Self>) {
        if self.is_composite() {
            for child in self.children() {
                child.collect_leaves(out);
            }
        } else {
            out.push(self);
        }
    }
}

// Shift every primitive by `offset` stages.
pub(crate) fn offset_stages(
    primitives: &[PrimitiveStatement],
    offset: u32,
) -> Vec<PrimitiveStatement> {
    primitives
        .iter()
        .cloned()
        .map(|mut p| {
            p.stage += offset;
            p
        })
        .collect()
}

// Skip a statement blocked by an excluded keyspace key when the policy says so.
pub(crate) fn excluded(
    policy: cqlmap_config::ExcludedKeyPolicy,
    kind: StatementKind,
    type_name: &'static str,
    result: Result<Vec<PrimitiveStatement>, Error>,
) -> Result<Vec<PrimitiveStatement>, Error> {
    match result {
        Err(err) if err.is_excluded_key() && policy == cqlmap_config::ExcludedKeyPolicy::Skip => {
            tracing::debug!(
                kind = kind.label(),
                type_name,
                error = %err,
                "statement skipped for excluded keyspace key"
            );
            Ok(Vec::new())
        }
        other => other,
    }
}
