use crate::{
    error::Error,
    mapper::Mapper,
    statement::{
        BuildCache, Consistencies, Delete, Insert, PrimitiveStatement, Statement, StatementKind,
        StatementNode, Update,
    },
};
use cqlmap_config::Consistency;
use std::sync::Arc;

///
/// BatchStatement
///
/// Statements that may join a batch.
///

pub trait BatchStatement: Statement + Into<StatementNode> {}

impl BatchStatement for Insert {}
impl BatchStatement for Update {}
impl BatchStatement for Delete {}

///
/// BatchType
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum BatchType {
    #[default]
    Logged,
    Unlogged,
    Counter,
}

impl BatchType {
    const fn cql(self) -> &'static str {
        match self {
            Self::Logged => "BEGIN BATCH",
            Self::Unlogged => "BEGIN UNLOGGED BATCH",
            Self::Counter => "BEGIN COUNTER BATCH",
        }
    }
}

///
/// Batch
///
/// Compiles its children into a single primitive that carries the leaf
/// primitives in `batched`.
///

#[derive(Debug)]
pub struct Batch {
    mapper: Mapper,
    children: Vec<StatementNode>,
    batch_type: BatchType,
    timestamp: Option<i64>,
    consistency: Consistencies,
    cache: BuildCache,
}

impl Batch {
    pub(crate) fn new(mapper: Mapper) -> Self {
        Self {
            mapper,
            children: Vec::new(),
            batch_type: BatchType::Logged,
            timestamp: None,
            consistency: Consistencies::default(),
            cache: BuildCache::default(),
        }
    }

    pub fn add(&mut self, statement: impl BatchStatement) -> &mut Self {
        self.children.push(statement.into());
        self.cache.invalidate();
        self
    }

    pub fn unlogged(&mut self) -> &mut Self {
        self.batch_type = BatchType::Unlogged;
        self.cache.invalidate();
        self
    }

    pub fn counter(&mut self) -> &mut Self {
        self.batch_type = BatchType::Counter;
        self.cache.invalidate();
        self
    }

    pub fn timestamp(&mut self, micros: i64) -> &mut Self {
        self.timestamp = Some(micros);
        self.cache.invalidate();
        self
    }

    pub fn consistency(&mut self, consistency: Consistency) -> &mut Self {
        self.consistency.consistency = Some(consistency);
        self.cache.invalidate();
        self
    }

    pub fn serial_consistency(&mut self, consistency: Consistency) -> &mut Self {
        self.consistency.serial = Some(consistency);
        self.cache.invalidate();
        self
    }

    #[must_use]
    pub const fn batch_type(&self) -> BatchType {
        self.batch_type
    }

    #[must_use]
    pub fn children(&self) -> &[StatementNode] {
        &self.children
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&StatementNode> {
        self.children.get(index)
    }

    /// Mutable access to a child; the batch recompiles.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut StatementNode> {
        self.cache.invalidate();
        self.children.get_mut(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    fn compile(&mut self) -> Result<Vec<PrimitiveStatement>, Error> {
        let mut leaves = Vec::new();
        for child in &mut self.children {
            leaves.extend(child.build()?.iter().cloned());
        }
        if leaves.is_empty() {
            return Ok(Vec::new());
        }

        let mut text = String::from(self.batch_type.cql());
        if let Some(timestamp) = self.timestamp {
            text.push_str(&format!(" USING TIMESTAMP {timestamp}"));
        }
        for leaf in &leaves {
            text.push_str("\n  ");
            text.push_str(&leaf.cql);
            text.push(';');
        }
        text.push_str("\nAPPLY BATCH");

        let keyspace = leaves[0].keyspace.clone();
        let conditional = leaves.iter().any(PrimitiveStatement::is_conditional);

        let mut primitive = PrimitiveStatement::new(StatementKind::Batch, text);
        if leaves.iter().all(|l| l.keyspace == keyspace) {
            primitive.keyspace = keyspace;
        }
        primitive.bindings = leaves.iter().flat_map(|l| l.bindings.iter().cloned()).collect();
        primitive.options = self
            .consistency
            .options(&self.mapper.config().statements, conditional);
        primitive.options.timestamp = self.timestamp;
        primitive.batched = leaves;

        Ok(vec![primitive])
    }
}

impl Statement for Batch {
    fn kind(&self) -> StatementKind {
        StatementKind::Batch
    }

    fn build(&mut self) -> Result<Arc<[PrimitiveStatement]>, Error> {
        if !self.children.iter().any(Statement::is_dirty)
            && let Some(hit) = self.cache.hit(self.kind(), None)
        {
            return Ok(hit);
        }

        let compiled = self.compile()?;

        Ok(self.cache.store(self.kind(), None, compiled))
    }

    fn is_dirty(&self) -> bool {
        self.cache.is_dirty() || self.children.iter().any(Statement::is_dirty)
    }
}
