use crate::{
    error::{Error, ValidationError},
    model::{ClusteringOrder, TableDescriptor},
    statement::{
        BuildCache, Clause, Consistencies, PrimitiveStatement, Statement, StatementKind, Target,
        clause::{Expansion, render_all},
        cql, excluded,
    },
};
use cqlmap_config::Consistency;
use std::sync::Arc;

///
/// Selector
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum Selector {
    #[default]
    All,
    Columns(Vec<String>),
    Count,
}

///
/// Select
///
/// Reads from one table of a type. Unless a table is named, the first table
/// holding every referenced column is used.
///

#[derive(Debug)]
pub struct Select {
    target: Target,
    selector: Selector,
    clauses: Vec<Clause>,
    order_by: Vec<(String, ClusteringOrder)>,
    limit: Option<u32>,
    allow_filtering: bool,
    consistency: Consistencies,
    cache: BuildCache,
}

impl Select {
    pub(crate) fn new(target: Target) -> Self {
        Self {
            target,
            selector: Selector::All,
            clauses: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            allow_filtering: false,
            consistency: Consistencies::default(),
            cache: BuildCache::default(),
        }
    }

    pub fn column(&mut self, column: impl Into<String>) -> &mut Self {
        match &mut self.selector {
            Selector::Columns(columns) => columns.push(column.into()),
            selector => *selector = Selector::Columns(vec![column.into()]),
        }
        self.cache.invalidate();
        self
    }

    pub fn count(&mut self) -> &mut Self {
        self.selector = Selector::Count;
        self.cache.invalidate();
        self
    }

    pub fn filter(&mut self, clause: Clause) -> &mut Self {
        self.clauses.push(clause);
        self.cache.invalidate();
        self
    }

    pub fn order_by(&mut self, column: impl Into<String>, order: ClusteringOrder) -> &mut Self {
        self.order_by.push((column.into(), order));
        self.cache.invalidate();
        self
    }

    pub fn limit(&mut self, limit: u32) -> &mut Self {
        self.limit = Some(limit);
        self.cache.invalidate();
        self
    }

    pub fn allow_filtering(&mut self) -> &mut Self {
        self.allow_filtering = true;
        self.cache.invalidate();
        self
    }

    pub fn from_table(&mut self, name: impl Into<String>) -> &mut Self {
        self.target.restrict_table(name);
        self.cache.invalidate();
        self
    }

    pub fn consistency(&mut self, consistency: Consistency) -> &mut Self {
        self.consistency.consistency = Some(consistency);
        self.cache.invalidate();
        self
    }

    pub fn keyspace_key(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.target.bind_keyspace_key(name, value);
        self.cache.invalidate();
        self
    }

    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    // Columns named by the selector, the relations and the ordering.
    fn referenced(&self) -> Vec<&str> {
        let mut names: Vec<&str> = match &self.selector {
            Selector::Columns(columns) => columns.iter().map(String::as_str).collect(),
            Selector::All | Selector::Count => Vec::new(),
        };
        names.extend(self.clauses.iter().filter_map(Clause::column_name));
        names.extend(self.order_by.iter().map(|(c, _)| c.as_str()));

        names
    }

    fn choose_table(&self) -> Result<TableDescriptor, Error> {
        let tables = self.target.tables()?;
        let referenced = self.referenced();
        let holds = |table: &TableDescriptor, name: &str| {
            table.field(name).or_else(|| table.column(name)).is_some()
        };

        if let Some(table) = tables
            .iter()
            .find(|t| referenced.iter().all(|name| holds(t, name)))
        {
            return Ok(table.clone());
        }

        let missing = tables
            .first()
            .and_then(|t| referenced.iter().find(|name| !holds(t, name)))
            .map_or_else(String::new, |name| (*name).to_string());

        Err(ValidationError::UnknownColumn {
            class: self.target.type_name(),
            column: missing,
        }
        .into())
    }

    fn compile(&mut self) -> Result<Vec<PrimitiveStatement>, Error> {
        let keyspace = self.target.keyspace(&self.clauses)?;
        let descriptor = self.target.descriptor().clone();
        let table = self.choose_table()?;
        let class = descriptor.type_name();

        let selection = match &self.selector {
            Selector::All => "*".to_string(),
            Selector::Count => "COUNT(*)".to_string(),
            Selector::Columns(columns) => columns
                .iter()
                .filter_map(|c| table.field(c).or_else(|| table.column(c)))
                .map(|f| f.column_or_name().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        };

        let mut text = format!(
            "SELECT {selection} FROM {}",
            cql::qualified(&keyspace, table.name())
        );
        let mut bindings = Vec::new();

        let expansion = Expansion::of(&self.clauses, &descriptor, &table)?;
        if !expansion.restrictions.is_empty() {
            let restrictions =
                render_all(&expansion.restrictions, &self.target, &keyspace, &mut bindings)?;
            text.push_str(" WHERE ");
            text.push_str(&restrictions);
        }

        if !self.order_by.is_empty() {
            let mut orders = Vec::with_capacity(self.order_by.len());
            for (name, order) in &self.order_by {
                let Some((field, _)) = table
                    .clustering_keys()
                    .find(|(f, _)| f.name() == name.as_str() || f.column() == Some(name.as_str()))
                else {
                    return Err(ValidationError::statement(
                        class,
                        format!("cannot order by '{name}'; only clustering keys are ordered"),
                    )
                    .into());
                };
                orders.push(format!("{} {}", field.column_or_name(), order.cql()));
            }
            text.push_str(" ORDER BY ");
            text.push_str(&orders.join(", "));
        }

        if let Some(limit) = self.limit {
            text.push_str(&format!(" LIMIT {limit}"));
        }
        if self.allow_filtering {
            text.push_str(" ALLOW FILTERING");
        }

        let mut primitive =
            PrimitiveStatement::new(StatementKind::Select, text).on(&keyspace, Some(table.name()));
        primitive.bindings = bindings;
        primitive.options = self
            .consistency
            .options(&self.target.config().statements, false);

        Ok(vec![primitive])
    }
}

impl Statement for Select {
    fn kind(&self) -> StatementKind {
        StatementKind::Select
    }

    fn build(&mut self) -> Result<Arc<[PrimitiveStatement]>, Error> {
        let type_name = Some(self.target.type_name());
        if let Some(hit) = self.cache.hit(self.kind(), type_name) {
            return Ok(hit);
        }

        let compiled = self.compile();
        let compiled = excluded(
            self.target.excluded_keys(),
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
