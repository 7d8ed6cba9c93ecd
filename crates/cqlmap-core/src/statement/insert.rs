use crate::{
    error::{Error, ValidationError},
    statement::{
        Binding, BuildCache, Condition, Consistencies, PrimitiveStatement, Statement,
        StatementKind, Target, Using, cql, excluded,
    },
};
use cqlmap_config::Consistency;
use std::{any::Any, sync::Arc};

///
/// Insert
///
/// Inserts one instance into every table of its type. Null non-key columns
/// are left out of the statement; multi-key columns insert one row per
/// element.
///

#[derive(Debug)]
pub struct Insert {
    target: Target,
    if_not_exists: bool,
    using: Using,
    consistency: Consistencies,
    cache: BuildCache,
}

impl Insert {
    pub(crate) fn new(target: Target) -> Self {
        Self {
            target,
            if_not_exists: false,
            using: Using::default(),
            consistency: Consistencies::default(),
            cache: BuildCache::default(),
        }
    }

    pub fn if_not_exists(&mut self) -> &mut Self {
        self.if_not_exists = true;
        self.cache.invalidate();
        self
    }

    pub fn ttl(&mut self, seconds: u32) -> &mut Self {
        self.using.ttl = Some(seconds);
        self.cache.invalidate();
        self
    }

    pub fn timestamp(&mut self, micros: i64) -> &mut Self {
        self.using.timestamp = Some(micros);
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

    /// Insert into the named table only; repeat to add tables.
    pub fn table(&mut self, name: impl Into<String>) -> &mut Self {
        self.target.restrict_table(name);
        self.cache.invalidate();
        self
    }

    #[must_use]
    pub fn object<T: Any>(&self) -> Option<&T> {
        self.target.object_ref()
    }

    /// Mutable access to the bound instance; the statement recompiles.
    pub fn object_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.cache.invalidate();
        self.target.object_mut()
    }

    fn compile(&mut self) -> Result<Vec<PrimitiveStatement>, Error> {
        let keyspace = self.target.keyspace(&[])?;
        let descriptor = self.target.descriptor().clone();
        let conditional = self.if_not_exists;
        let mut out = Vec::new();

        for table in self.target.tables()? {
            if table.has_counters() {
                return Err(ValidationError::statement(
                    descriptor.type_name(),
                    format!("counter table '{}' cannot be inserted into", table.name()),
                )
                .into());
            }

            let keys = self.target.key_bindings(&table, &keyspace)?;
            let mut columns = Vec::new();
            for field in table.non_primary_columns() {
                let value = self.target.column_value(field, &keyspace)?;
                if !value.is_null() {
                    columns.push((field.column_or_name().to_string(), value));
                }
            }

            for key in keys {
                let names: Vec<&str> = key
                    .iter()
                    .map(|b| b.column.as_str())
                    .chain(columns.iter().map(|(c, _)| c.as_str()))
                    .collect();
                let condition = conditional.then_some(Condition::IfNotExists);

                let text = format!(
                    "INSERT INTO {} ({}) VALUES ({}){}{}",
                    cql::qualified(&keyspace, table.name()),
                    names.join(", "),
                    cql::markers(names.len()),
                    cql::condition(condition.as_ref()),
                    cql::using(&self.using),
                );

                let mut primitive = PrimitiveStatement::new(StatementKind::Insert, text)
                    .on(&keyspace, Some(table.name()));
                primitive.bindings = key;
                primitive
                    .bindings
                    .extend(columns.iter().map(|(c, v)| Binding::new(c.as_str(), v.clone())));
                primitive.options = self
                    .consistency
                    .options(&self.target.config().statements, conditional);
                primitive.options.ttl = self.using.ttl;
                primitive.options.timestamp = self.using.timestamp;
                primitive.options.condition = condition;
                out.push(primitive);
            }
        }

        Ok(out)
    }
}

impl Statement for Insert {
    fn kind(&self) -> StatementKind {
        StatementKind::Insert
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
