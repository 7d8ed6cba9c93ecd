//! Metadata resolution: turns declarations into memoized class descriptors.
//!
//! Descriptors are computed outside the cache lock and inserted if absent,
//! so a losing concurrent resolution is discarded and every caller observes
//! the same `Arc`.

mod chain;
mod class;
mod field;
mod naming;

#[cfg(test)]
mod tests;

use crate::{
    declare::{Entity, TypeRef},
    error::ConfigurationError,
    model::{ClassDescriptor, TypeVariant},
    obs::sink::{self, MetricsEvent},
};
use std::{
    any::TypeId,
    collections::{HashMap, hash_map::Entry},
    sync::{Arc, LazyLock, PoisonError, RwLock},
};
use tracing::{debug, warn};

// re-exports
pub use naming::{MAX_IDENT_LEN, RESERVED_TYPE_NAMES};

static DESCRIPTORS: LazyLock<RwLock<HashMap<TypeId, Arc<ClassDescriptor>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

fn cached(id: TypeId) -> Option<Arc<ClassDescriptor>> {
    DESCRIPTORS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&id)
        .cloned()
}

/// Resolve (or fetch) the descriptor of a mapped type.
pub fn resolve(type_ref: TypeRef) -> Result<Arc<ClassDescriptor>, ConfigurationError> {
    let id = type_ref.type_id();
    if let Some(descriptor) = cached(id) {
        return Ok(descriptor);
    }

    let built = match class::build(type_ref) {
        Ok(built) => Arc::new(built),
        Err(err) => {
            warn!(type_name = type_ref.type_name(), error = %err, "descriptor resolution failed");
            sink::record(MetricsEvent::ResolutionFailed {
                type_name: type_ref.type_name(),
            });
            return Err(err);
        }
    };

    let mut cache = DESCRIPTORS.write().unwrap_or_else(PoisonError::into_inner);
    let descriptor = match cache.entry(id) {
        Entry::Occupied(entry) => entry.get().clone(),
        Entry::Vacant(entry) => {
            debug!(
                type_name = built.type_name(),
                kind = built.kind().label(),
                keyspace = built.keyspace().name(),
                tables = built.tables().len(),
                "resolved descriptor"
            );
            sink::record(MetricsEvent::DescriptorResolved {
                type_name: built.type_name(),
            });
            entry.insert(built).clone()
        }
    };

    Ok(descriptor)
}

/// Resolved user-defined type descriptors owning the given type name.
/// Type variants share their root's definition and are not listed.
pub(crate) fn udt_descriptors(name: &str) -> Vec<Arc<ClassDescriptor>> {
    DESCRIPTORS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .values()
        .filter(|d| d.kind().is_udt() && !d.kind().is_type() && d.udt_name() == Some(name))
        .cloned()
        .collect()
}

/// Descriptor of `T`.
pub fn descriptor<T: Entity>() -> Result<Arc<ClassDescriptor>, ConfigurationError> {
    resolve(TypeRef::of::<T>())
}

/// Register a type variant with its root at runtime. Variants the root
/// already lists are left flagged as static.
pub fn register_type<T: Entity>() -> Result<Arc<ClassDescriptor>, ConfigurationError> {
    let descriptor = descriptor::<T>()?;
    let class = descriptor.type_name();

    let (Some(registry), Some(discriminator), Some(root)) = (
        descriptor.variants(),
        descriptor.discriminator(),
        descriptor.root(),
    ) else {
        return Err(ConfigurationError::hierarchy(
            class,
            format!(
                "only type entities can be registered, found a {}",
                descriptor.kind().label()
            ),
        ));
    };

    let inserted = registry.insert(
        root.type_name(),
        TypeVariant {
            discriminator: discriminator.to_string(),
            type_ref: descriptor.type_ref(),
            dynamic: true,
        },
    )?;

    if inserted {
        debug!(
            root = root.type_name(),
            variant = class,
            discriminator,
            "registered dynamic type variant"
        );
        sink::record(MetricsEvent::VariantRegistered {
            root: root.type_name(),
            variant: class,
        });
    }

    Ok(descriptor)
}
