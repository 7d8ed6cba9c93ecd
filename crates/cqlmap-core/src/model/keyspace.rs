use crate::declare::Keyspace;
use cqlmap_config::Replication;
use std::collections::BTreeMap;

/// Longest keyspace name the store accepts.
pub const MAX_KEYSPACE_NAME_LEN: usize = 48;

///
/// KeyspaceDescriptor
///
/// Keyspace a type lives in. With keyspace keys, the physical name is the
/// declared name followed by each key value, joined with `_`.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeyspaceDescriptor {
    pub(crate) declared: Keyspace,
}

impl KeyspaceDescriptor {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.declared.name
    }

    #[must_use]
    pub fn keys(&self) -> &[String] {
        &self.declared.keys
    }

    /// Declared replication; `None` falls back to the mapper configuration.
    #[must_use]
    pub const fn replication(&self) -> Option<&Replication> {
        self.declared.replication.as_ref()
    }

    #[must_use]
    pub const fn durable_writes(&self) -> Option<bool> {
        self.declared.durable_writes
    }

    /// The declaration this descriptor came from, compared when two types
    /// name the same keyspace.
    #[must_use]
    pub const fn declared(&self) -> &Keyspace {
        &self.declared
    }

    /// Physical keyspace name for the given key values. Returns the first
    /// missing key on failure.
    pub fn physical_name(&self, values: &BTreeMap<String, String>) -> Result<String, String> {
        let mut name = self.declared.name.clone();

        for key in &self.declared.keys {
            let value = values.get(key).ok_or_else(|| key.clone())?;
            name.push('_');
            name.push_str(value);
        }

        Ok(sanitize(&name))
    }
}

// Keyspace names are case-insensitive alphanumerics and underscores.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}
