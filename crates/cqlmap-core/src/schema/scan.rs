use crate::{
    declare::TypeRef,
    error::{ConfigurationError, Error},
    model::ClassDescriptor,
    obs::sink::{self, MetricsEvent},
    resolve,
};
use std::{
    collections::{BTreeMap, VecDeque},
    sync::Arc,
};
use tracing::debug;

///
/// EntityRegistration
///
/// Link-time registration of a mapped type, submitted by
/// `register_entity!` and collected with `inventory`.
///

pub struct EntityRegistration {
    module: &'static str,
    type_ref: fn() -> TypeRef,
}

impl EntityRegistration {
    #[must_use]
    pub const fn new(module: &'static str, type_ref: fn() -> TypeRef) -> Self {
        Self { module, type_ref }
    }

    #[must_use]
    pub const fn module(&self) -> &'static str {
        self.module
    }

    #[must_use]
    pub fn type_ref(&self) -> TypeRef {
        (self.type_ref)()
    }

    fn in_module(&self, prefix: &str) -> bool {
        self.module == prefix
            || self
                .module
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with("::"))
    }
}

inventory::collect!(EntityRegistration);

///
/// ClassSet
///
/// The starting types of a schema plan. Planning also covers every type
/// reachable from them through static variants and user-defined types.
///

#[derive(Clone, Debug)]
pub struct ClassSet {
    types: Vec<TypeRef>,
    modules: Option<Vec<String>>,
}

impl ClassSet {
    pub fn of(types: impl IntoIterator<Item = TypeRef>) -> Self {
        Self {
            types: types.into_iter().collect(),
            modules: None,
        }
    }

    /// Registered types whose module path starts with one of the prefixes.
    pub fn modules<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            types: Vec::new(),
            modules: Some(prefixes.into_iter().map(Into::into).collect()),
        }
    }

    /// Every registered type.
    #[must_use]
    pub const fn registered() -> Self {
        Self {
            types: Vec::new(),
            modules: Some(Vec::new()),
        }
    }

    #[must_use]
    pub fn with(mut self, type_ref: TypeRef) -> Self {
        self.types.push(type_ref);
        self
    }

    fn seeds(&self) -> Vec<TypeRef> {
        let mut seeds = self.types.clone();

        if let Some(prefixes) = &self.modules {
            for registration in inventory::iter::<EntityRegistration> {
                if prefixes.is_empty() || prefixes.iter().any(|p| registration.in_module(p)) {
                    seeds.push(registration.type_ref());
                }
            }
        }

        seeds
    }

    /// Resolve the set and everything reachable from it, keyed by type
    /// name. Types that are not mapped are skipped.
    pub(crate) fn scan(&self) -> Result<BTreeMap<&'static str, Arc<ClassDescriptor>>, Error> {
        let mut found = BTreeMap::new();
        let mut queue: VecDeque<TypeRef> = self.seeds().into();

        while let Some(type_ref) = queue.pop_front() {
            if found.contains_key(type_ref.type_name()) {
                continue;
            }

            let descriptor = match resolve::resolve(type_ref) {
                Ok(descriptor) => descriptor,
                Err(ConfigurationError::MissingEntityMarker { class }) => {
                    debug!(type_name = class, "skipped unmapped type");
                    sink::record(MetricsEvent::ClassSkipped { type_name: class });
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            if let Some(root) = descriptor.root() {
                queue.push_back(root);
            }
            if descriptor.kind().is_root()
                && let Some(registry) = descriptor.variants()
            {
                queue.extend(
                    registry
                        .all()
                        .into_iter()
                        .filter(|v| !v.dynamic)
                        .map(|v| v.type_ref),
                );
            }
            queue.extend(descriptor.udt_dependencies().iter().copied());

            found.insert(type_ref.type_name(), descriptor);
        }

        Ok(found)
    }
}
