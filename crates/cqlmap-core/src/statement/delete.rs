use crate::{
    error::{Error, ValidationError},
    model::TableDescriptor,
    statement::{
        Binding, BuildCache, Clause, Condition, Consistencies, PrimitiveStatement, Statement,
        StatementKind, Target, Using,
        clause::{Expansion, render_all},
        cql, excluded,
        update::key_restriction,
    },
};
use cqlmap_config::Consistency;
use std::{any::Any, sync::Arc};

///
/// Delete
///
/// Deletes whole rows, or the named columns only. A bound instance deletes
/// its own rows in every table; otherwise the filter clauses select them.
///

#[derive(Debug)]
pub struct Delete {
    target: Target,
    columns: Vec<String>,
    clauses: Vec<Clause>,
    if_exists: bool,
    predicates: Vec<Clause>,
    timestamp: Option<i64>,
    consistency: Consistencies,
    cache: BuildCache,
}

impl Delete {
    pub(crate) fn new(target: Target) -> Self {
        Self {
            target,
            columns: Vec::new(),
            clauses: Vec::new(),
            if_exists: false,
            predicates: Vec::new(),
            timestamp: None,
            consistency: Consistencies::default(),
            cache: BuildCache::default(),
        }
    }

    pub fn column(&mut self, column: impl Into<String>) -> &mut Self {
        self.columns.push(column.into());
        self.cache.invalidate();
        self
    }

    pub fn filter(&mut self, clause: Clause) -> &mut Self {
        self.clauses.push(clause);
        self.cache.invalidate();
        self
    }

    pub fn if_exists(&mut self) -> &mut Self {
        self.if_exists = true;
        self.cache.invalidate();
        self
    }

    pub fn only_if(&mut self, clause: Clause) -> &mut Self {
        self.predicates.push(clause);
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

    #[must_use]
    pub fn object<T: Any>(&self) -> Option<&T> {
        self.target.object_ref()
    }

    pub fn object_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.cache.invalidate();
        self.target.object_mut()
    }

    fn compile(&mut self) -> Result<Vec<PrimitiveStatement>, Error> {
        let keyspace = self.target.keyspace(&self.clauses)?;
        let descriptor = self.target.descriptor().clone();
        let conditional = self.if_exists || !self.predicates.is_empty();
        let using = Using {
            ttl: None,
            timestamp: self.timestamp,
        };
        let mut out = Vec::new();

        for table in self.target.tables()? {
            let Some(columns) = self.columns_in(&table)? else {
                continue;
            };

            let mut if_bindings = Vec::new();
            let condition = if self.predicates.is_empty() {
                self.if_exists.then_some(Condition::IfExists)
            } else {
                let expansion = Expansion::of(&self.predicates, &descriptor, &table)?;
                let mut parts = Vec::new();
                for restriction in &expansion.restrictions {
                    parts.push(restriction.render(&self.target, &keyspace, &mut if_bindings)?);
                }
                Some(Condition::If(parts))
            };

            for (where_text, where_bindings) in self.restrictions_for(&table, &keyspace)? {
                let selection = if columns.is_empty() {
                    String::new()
                } else {
                    format!("{} ", columns.join(", "))
                };
                let text = format!(
                    "DELETE {selection}FROM {}{} WHERE {where_text}{}",
                    cql::qualified(&keyspace, table.name()),
                    cql::using(&using),
                    cql::condition(condition.as_ref()),
                );

                let mut primitive = PrimitiveStatement::new(StatementKind::Delete, text)
                    .on(&keyspace, Some(table.name()));
                primitive.bindings = where_bindings;
                primitive.bindings.extend(if_bindings.iter().cloned());
                primitive.options = self
                    .consistency
                    .options(&self.target.config().statements, conditional);
                primitive.options.timestamp = self.timestamp;
                primitive.options.condition = condition.clone();
                out.push(primitive);
            }
        }

        if out.is_empty()
            && let Some(column) = self.columns.first()
        {
            return Err(ValidationError::UnknownColumn {
                class: descriptor.type_name(),
                column: column.clone(),
            }
            .into());
        }

        Ok(out)
    }

    // Column names to delete in a table: empty for the whole row, `None` when
    // the table holds none of the requested columns.
    fn columns_in(&self, table: &TableDescriptor) -> Result<Option<Vec<String>>, Error> {
        if self.columns.is_empty() {
            return Ok(Some(Vec::new()));
        }

        let mut columns = Vec::new();
        for name in &self.columns {
            let Some(field) = table.field(name).or_else(|| table.column(name)) else {
                continue;
            };
            if field.role().is_primary_key() {
                return Err(ValidationError::statement(
                    field.class_type(),
                    format!("primary key column '{}' cannot be deleted", field.column_or_name()),
                )
                .into());
            }
            columns.push(field.column_or_name().to_string());
        }

        Ok((!columns.is_empty()).then_some(columns))
    }

    fn restrictions_for(
        &mut self,
        table: &TableDescriptor,
        keyspace: &str,
    ) -> Result<Vec<(String, Vec<Binding>)>, Error> {
        if self.target.has_object() {
            return Ok(self
                .target
                .key_bindings(table, keyspace)?
                .into_iter()
                .map(|key| (key_restriction(&key), key))
                .collect());
        }

        let descriptor = self.target.descriptor().clone();
        let expansion = Expansion::of(&self.clauses, &descriptor, table)?;
        if expansion.restrictions.is_empty() {
            return Err(ValidationError::statement(
                descriptor.type_name(),
                "delete requires a where clause; use truncate to empty a table",
            )
            .into());
        }

        let mut bindings = Vec::new();
        let text = render_all(&expansion.restrictions, &self.target, keyspace, &mut bindings)?;

        Ok(vec![(text, bindings)])
    }
}

impl Statement for Delete {
    fn kind(&self) -> StatementKind {
        StatementKind::Delete
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
