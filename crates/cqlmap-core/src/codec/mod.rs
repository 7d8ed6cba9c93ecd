//! User-defined type codecs, cached per (type, keyspace).
//!
//! A codec shapes structured UDT values against one definition of the type:
//! the live definition reported by a [`SchemaSource`] when one is attached,
//! or a default synthesized from the descriptor otherwise.

mod udt;

#[cfg(test)]
mod tests;

use crate::{
    error::{Error, ValidationError},
    model::ClassDescriptor,
    obs::sink::{self, MetricsEvent},
    resolve,
};
use std::{
    any::TypeId,
    collections::{HashMap, hash_map::Entry},
    fmt,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};
use tracing::debug;

// re-exports
pub use udt::{CodecSource, UdtCodec, UserType};

///
/// SchemaSource
///
/// Live schema collaborator answering with the store's current definition
/// of a user-defined type.
///

pub trait SchemaSource: Send + Sync {
    fn user_type(&self, keyspace: &str, name: &str) -> Option<UserType>;
}

type CodecKey = (TypeId, String);

///
/// CodecRegistry
///

#[derive(Default)]
pub struct CodecRegistry {
    codecs: RwLock<HashMap<CodecKey, Arc<UdtCodec>>>,
    source: Option<Arc<dyn SchemaSource>>,
}

impl CodecRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_source(source: Arc<dyn SchemaSource>) -> Self {
        Self {
            codecs: RwLock::default(),
            source: Some(source),
        }
    }

    /// Codec of a user-defined type in the given physical keyspace. Type
    /// variants share the codec of their root.
    pub fn get_codec(
        &self,
        descriptor: &ClassDescriptor,
        keyspace: &str,
    ) -> Result<Arc<UdtCodec>, Error> {
        let owner = codec_owner(descriptor)?;
        let key = (owner.type_id(), keyspace.to_string());

        if let Some(codec) = self.read().get(&key) {
            return Ok(codec.clone());
        }

        let codec = Arc::new(self.load(&owner, keyspace)?);

        Ok(match self.write().entry(key) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                record_load(&codec, keyspace);
                entry.insert(codec).clone()
            }
        })
    }

    /// Install a live definition for every resolved type that owns its name.
    /// Returns the number of codecs replaced or added.
    pub fn register(&self, definition: &UserType) -> usize {
        let owners = resolve::udt_descriptors(&definition.name);
        let mut codecs = self.write();

        for owner in &owners {
            let codec = UdtCodec::new(owner, definition.clone(), CodecSource::Live);

            debug!(
                type_name = owner.type_name(),
                keyspace = %definition.keyspace,
                udt = %definition.name,
                "registered live codec"
            );
            sink::record(MetricsEvent::CodecRegistered {
                type_name: owner.type_name(),
            });
            codecs.insert(
                (owner.type_id(), definition.keyspace.clone()),
                Arc::new(codec),
            );
        }

        owners.len()
    }

    /// Drop the codecs of a definition; the next lookup rebuilds them.
    /// Returns the number of codecs removed.
    pub fn deregister(&self, definition: &UserType) -> usize {
        let mut codecs = self.write();
        let before = codecs.len();

        codecs.retain(|(_, keyspace), codec| {
            let matched =
                *keyspace == definition.keyspace && codec.definition().name == definition.name;
            if matched {
                debug!(
                    type_name = codec.type_name(),
                    keyspace = %keyspace,
                    udt = %definition.name,
                    "deregistered codec"
                );
                sink::record(MetricsEvent::CodecDeregistered {
                    type_name: codec.type_name(),
                });
            }
            !matched
        });

        before - codecs.len()
    }

    /// Number of cached codecs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn load(&self, owner: &ClassDescriptor, keyspace: &str) -> Result<UdtCodec, Error> {
        let name = owner.udt_name().unwrap_or_default();

        if let Some(definition) = self
            .source
            .as_ref()
            .and_then(|source| source.user_type(keyspace, name))
        {
            return Ok(UdtCodec::new(owner, definition, CodecSource::Live));
        }

        let definition = UserType::synthesize(owner, keyspace)?;

        Ok(UdtCodec::new(owner, definition, CodecSource::Default))
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<CodecKey, Arc<UdtCodec>>> {
        self.codecs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<CodecKey, Arc<UdtCodec>>> {
        self.codecs.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("codecs", &self.len())
            .field("live_source", &self.source.is_some())
            .finish()
    }
}

// The descriptor whose columns define the codec: the root for type variants.
fn codec_owner(descriptor: &ClassDescriptor) -> Result<Arc<ClassDescriptor>, Error> {
    if !descriptor.kind().is_udt() {
        return Err(ValidationError::statement(
            descriptor.type_name(),
            "codecs exist only for user-defined types",
        )
        .into());
    }

    let owner = match descriptor.root() {
        Some(root) if descriptor.kind().is_type() => root,
        _ => descriptor.type_ref(),
    };

    Ok(resolve::resolve(owner)?)
}

fn record_load(codec: &UdtCodec, keyspace: &str) {
    let type_name = codec.type_name();

    match codec.source() {
        CodecSource::Live => {
            debug!(type_name, keyspace, "loaded live codec");
            sink::record(MetricsEvent::CodecLoaded { type_name });
        }
        CodecSource::Default => {
            debug!(type_name, keyspace, "synthesized default codec");
            sink::record(MetricsEvent::CodecSynthesized { type_name });
        }
    }
}
