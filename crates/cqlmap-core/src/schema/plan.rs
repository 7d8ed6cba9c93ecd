use crate::{
    declare::{Keyspace, TypeRef},
    error::{ConfigurationError, CycleError, Error},
    mapper::Mapper,
    model::ClassDescriptor,
    obs::sink::{self, MetricsEvent},
    resolve,
    schema::{ClassSet, DirectedGraph},
    statement::{
        BuildCache, CreateIndex, CreateKeyspace, CreateTable, CreateType, Group, Insert,
        PrimitiveStatement, Sequence, Statement, StatementKind, StatementNode, Target,
        hierarchy_owner,
    },
};
use cqlmap_config::ExcludedKeyPolicy;
use derive_more::{Deref, DerefMut};
use std::{
    collections::{BTreeMap, BTreeSet, btree_map::Entry},
    sync::Arc,
};
use tracing::debug;

type Scanned = Arc<BTreeMap<&'static str, Arc<ClassDescriptor>>>;

///
/// CreateSchemas
///
/// Plans the creation of every keyspace, user-defined type, table, index
/// and seed row of a class set, as one sequence:
/// keyspaces, then types in dependency order, then tables, indexes and
/// seed inserts.
///

#[derive(Debug)]
pub struct CreateSchemas {
    mapper: Mapper,
    classes: ClassSet,
    kind: StatementKind,
    label: Option<&'static str>,
    keys: BTreeMap<String, String>,
    matching: bool,
    if_not_exists: Option<bool>,
    seed_data: Option<bool>,
    excluded_keys: Option<ExcludedKeyPolicy>,
    scanned: Option<Scanned>,
    cache: BuildCache,
}

impl CreateSchemas {
    pub(crate) fn new(mapper: Mapper, classes: ClassSet) -> Self {
        Self {
            mapper,
            classes,
            kind: StatementKind::CreateSchemas,
            label: None,
            keys: BTreeMap::new(),
            matching: false,
            if_not_exists: None,
            seed_data: None,
            excluded_keys: None,
            scanned: None,
            cache: BuildCache::default(),
        }
    }

    /// Supply a keyspace-key value. Types whose keyspace needs a key that
    /// was not supplied are skipped.
    pub fn filter(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.keys.insert(key.into(), value.into());
        self.cache.invalidate();
        self
    }

    /// Only plan types whose keyspace keys are exactly the filtered keys.
    pub fn matching(&mut self) -> &mut Self {
        self.matching = true;
        self.cache.invalidate();
        self
    }

    pub fn if_not_exists(&mut self, enabled: bool) -> &mut Self {
        self.if_not_exists = Some(enabled);
        self.cache.invalidate();
        self
    }

    pub fn seed_data(&mut self, enabled: bool) -> &mut Self {
        self.seed_data = Some(enabled);
        self.cache.invalidate();
        self
    }

    pub fn excluded_keys(&mut self, policy: ExcludedKeyPolicy) -> &mut Self {
        self.excluded_keys = Some(policy);
        self.cache.invalidate();
        self
    }

    #[must_use]
    pub const fn classes(&self) -> &ClassSet {
        &self.classes
    }

    // The class scan runs once per planner.
    fn scanned(&mut self) -> Result<Scanned, Error> {
        if let Some(scanned) = &self.scanned {
            return Ok(scanned.clone());
        }

        let scanned = Arc::new(self.classes.scan()?);
        self.scanned = Some(scanned.clone());

        Ok(scanned)
    }

    // Physical keyspace of a type under the filter, or `None` to skip it.
    fn keyspace_for(
        &self,
        descriptor: &ClassDescriptor,
        policy: ExcludedKeyPolicy,
    ) -> Result<Option<String>, Error> {
        let declared = descriptor.keyspace().keys();
        let type_name = descriptor.type_name();

        if self.matching {
            let wanted: BTreeSet<&str> = self.keys.keys().map(String::as_str).collect();
            let have: BTreeSet<&str> = declared.iter().map(String::as_str).collect();
            if wanted != have {
                debug!(type_name, "skipped type with non-matching keyspace keys");
                return Ok(None);
            }
        }

        let mut values = BTreeMap::new();
        for key in declared {
            let Some(value) = self.keys.get(key) else {
                debug!(type_name, key = %key, "skipped type with unbound keyspace key");
                return Ok(None);
            };

            match descriptor.check_keyspace_key(key, value) {
                Ok(()) => {}
                Err(err) if err.is_excluded_key() && policy == ExcludedKeyPolicy::Skip => {
                    debug!(type_name, error = %err, "skipped type for excluded keyspace key");
                    return Ok(None);
                }
                Err(err) => return Err(err),
            }
            values.insert(key.clone(), value.clone());
        }

        descriptor.keyspace_name(&values).map(Some)
    }

    fn compile(&mut self) -> Result<Vec<PrimitiveStatement>, Error> {
        let scanned = self.scanned()?;
        let config = self.mapper.config();
        let policy = self.excluded_keys.unwrap_or(config.schema.excluded_keys);
        let seed = self.seed_data.unwrap_or(config.schema.seed_data);
        check_declarations(&scanned)?;

        let mut buckets: BTreeMap<String, Bucket> = BTreeMap::new();
        for descriptor in scanned.values() {
            let Some(keyspace) = self.keyspace_for(descriptor, policy)? else {
                sink::record(MetricsEvent::ClassSkipped {
                    type_name: descriptor.type_name(),
                });
                continue;
            };

            match buckets.entry(keyspace) {
                Entry::Vacant(entry) => {
                    entry.insert(Bucket::new(descriptor.clone()));
                }
                Entry::Occupied(mut entry) => {
                    let keyspace = entry.key().clone();
                    entry.get_mut().add(&keyspace, descriptor.clone())?;
                }
            }
        }

        let mut keyspaces = Group::new();
        let mut types = Sequence::new();
        let mut tables = Group::new();
        let mut indexes = Group::new();
        let mut seeds = Group::new();
        let (mut type_count, mut table_count) = (0u64, 0u64);

        for (keyspace, bucket) in &buckets {
            keyspaces.add(self.ddl(CreateKeyspace::new, &bucket.representative, keyspace));

            for owner in bucket.type_order(keyspace)? {
                types.add(self.ddl(CreateType::new, &owner, keyspace));
                type_count += 1;
            }

            for descriptor in bucket.table_classes() {
                tables.add(self.ddl(CreateTable::new, descriptor, keyspace));
                table_count += descriptor.tables().len() as u64;

                if descriptor.tables().iter().any(|t| t.indexes().next().is_some()) {
                    indexes.add(self.ddl(CreateIndex::new, descriptor, keyspace));
                }
            }

            if seed {
                for descriptor in bucket.classes.iter().filter(|d| d.has_seed_objects()) {
                    for object in descriptor.seed_objects() {
                        let mut target = Target::object(self.mapper.clone(), descriptor, object)?;
                        target.pin_keyspace(keyspace.as_str());
                        seeds.add(Insert::new(target));
                    }
                }
            }
        }

        let mut plan: Sequence = [
            StatementNode::from(keyspaces),
            StatementNode::from(types),
            StatementNode::from(tables),
            StatementNode::from(indexes),
            StatementNode::from(seeds),
        ]
        .into_iter()
        .collect();
        let compiled = plan.build()?;

        debug!(
            keyspaces = buckets.len(),
            types = type_count,
            tables = table_count,
            statements = compiled.len(),
            "planned schema"
        );
        sink::record(MetricsEvent::SchemaPlanned {
            keyspaces: buckets.len() as u64,
            types: type_count,
            tables: table_count,
        });

        Ok(compiled.to_vec())
    }

    // A schema statement pinned to the planned keyspace.
    fn ddl<S: Ddl>(
        &self,
        new: fn(Target) -> S,
        descriptor: &Arc<ClassDescriptor>,
        keyspace: &str,
    ) -> S {
        let mut target = Target::class(self.mapper.clone(), descriptor.clone());
        target.pin_keyspace(keyspace);

        let mut statement = new(target);
        if let Some(enabled) = self.if_not_exists {
            statement.set_if_not_exists(enabled);
        }

        statement
    }
}

// Schema statements that take an `IF NOT EXISTS` override.
trait Ddl {
    fn set_if_not_exists(&mut self, enabled: bool);
}

macro_rules! ddl {
    ($($ty:ty),*) => {
        $(
            impl Ddl for $ty {
                fn set_if_not_exists(&mut self, enabled: bool) {
                    self.if_not_exists(enabled);
                }
            }
        )*
    };
}

ddl!(CreateKeyspace, CreateType, CreateTable, CreateIndex);

impl Statement for CreateSchemas {
    fn kind(&self) -> StatementKind {
        self.kind
    }

    fn build(&mut self) -> Result<Arc<[PrimitiveStatement]>, Error> {
        if let Some(hit) = self.cache.hit(self.kind, self.label) {
            return Ok(hit);
        }

        let compiled = self.compile()?;

        Ok(self.cache.store(self.kind, self.label, compiled))
    }

    fn is_dirty(&self) -> bool {
        self.cache.is_dirty()
    }
}

///
/// CreateSchema
///
/// Schema plan of a single type and what it reaches.
///

#[derive(Debug, Deref, DerefMut)]
pub struct CreateSchema(CreateSchemas);

impl CreateSchema {
    pub(crate) fn new(mapper: Mapper, type_ref: TypeRef) -> Self {
        let mut inner = CreateSchemas::new(mapper, ClassSet::of([type_ref]));
        inner.kind = StatementKind::CreateSchema;
        inner.label = Some(type_ref.type_name());

        Self(inner)
    }
}

impl Statement for CreateSchema {
    fn kind(&self) -> StatementKind {
        self.0.kind()
    }

    fn build(&mut self) -> Result<Arc<[PrimitiveStatement]>, Error> {
        self.0.build()
    }

    fn is_dirty(&self) -> bool {
        self.0.is_dirty()
    }
}

///
/// Bucket
///
/// Types planned into one physical keyspace.
///

struct Bucket {
    representative: Arc<ClassDescriptor>,
    classes: Vec<Arc<ClassDescriptor>>,
}

impl Bucket {
    fn new(descriptor: Arc<ClassDescriptor>) -> Self {
        Self {
            representative: descriptor.clone(),
            classes: vec![descriptor],
        }
    }

    fn add(&mut self, keyspace: &str, descriptor: Arc<ClassDescriptor>) -> Result<(), Error> {
        let current = self.representative.keyspace().declared();
        let other = descriptor.keyspace().declared();

        if conflicts(current, other) {
            return Err(ConfigurationError::ConflictingKeyspace {
                keyspace: keyspace.to_string(),
                first: self.representative.type_name(),
                second: descriptor.type_name(),
            }
            .into());
        }

        // prefer the declaration that carries keyspace options
        if current.replication.is_none() && other.replication.is_some() {
            self.representative = descriptor.clone();
        }
        self.classes.push(descriptor);

        Ok(())
    }

    // Table-backed types; type variants are covered by their root.
    fn table_classes(&self) -> impl Iterator<Item = &Arc<ClassDescriptor>> {
        self.classes
            .iter()
            .filter(|d| !d.kind().is_udt() && !d.kind().is_type())
    }

    // User-defined types needed in this keyspace, dependencies first.
    fn type_order(&self, keyspace: &str) -> Result<Vec<Arc<ClassDescriptor>>, Error> {
        let mut graph = DirectedGraph::new();
        let mut owners: BTreeMap<&'static str, Arc<ClassDescriptor>> = BTreeMap::new();
        let mut queue: Vec<Arc<ClassDescriptor>> = self.classes.clone();
        let mut seen: BTreeSet<&'static str> = BTreeSet::new();

        while let Some(descriptor) = queue.pop() {
            if !seen.insert(descriptor.type_name()) {
                continue;
            }

            let from = if descriptor.kind().is_udt() {
                let owner = hierarchy_owner(&descriptor)?;
                graph.add_node(owner.type_name());
                let name = owner.type_name();
                if owner.type_name() != descriptor.type_name() {
                    queue.push(owner.clone());
                }
                owners.insert(name, owner);
                Some(name)
            } else {
                None
            };

            for dependency in descriptor.udt_dependencies() {
                let dependency = resolve::resolve(*dependency)?;
                let owner = hierarchy_owner(&dependency)?;
                match from {
                    Some(from) => graph.add_edge(from, owner.type_name()),
                    None => graph.add_node(owner.type_name()),
                }
                queue.push(dependency);
            }
        }

        let order = graph.sort().map_err(|types| CycleError {
            keyspace: keyspace.to_string(),
            types: types.into_iter().map(str::to_string).collect(),
        })?;

        Ok(order
            .into_iter()
            .filter_map(|name| owners.get(name).cloned())
            .collect())
    }
}

// Every declaration of a keyspace name must agree, whatever physical
// keyspaces its key values later produce.
fn check_declarations(scanned: &Scanned) -> Result<(), Error> {
    let mut declared: BTreeMap<&str, &ClassDescriptor> = BTreeMap::new();

    for descriptor in scanned.values() {
        let keyspace = descriptor.keyspace();
        match declared.entry(keyspace.name()) {
            Entry::Vacant(entry) => {
                entry.insert(descriptor.as_ref());
            }
            Entry::Occupied(entry) => {
                let first = *entry.get();
                if conflicts(first.keyspace().declared(), keyspace.declared()) {
                    return Err(ConfigurationError::ConflictingKeyspace {
                        keyspace: keyspace.name().to_string(),
                        first: first.type_name(),
                        second: descriptor.type_name(),
                    }
                    .into());
                }
            }
        }
    }

    Ok(())
}

// Two declarations of one keyspace conflict on differing keys, or on an
// option both of them set differently.
fn conflicts(a: &Keyspace, b: &Keyspace) -> bool {
    a.keys != b.keys
        || differs(a.replication.as_ref(), b.replication.as_ref())
        || differs(a.durable_writes, b.durable_writes)
}

fn differs<T: PartialEq>(a: Option<T>, b: Option<T>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a != b)
}
