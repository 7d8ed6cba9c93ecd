use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

///
/// Replication
///
/// Keyspace replication strategy. Rendered verbatim into
/// `CREATE KEYSPACE ... WITH replication = {...}`.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(tag = "class", rename_all = "snake_case", deny_unknown_fields)]
pub enum Replication {
    Simple { factor: u32 },
    NetworkTopology { datacenters: BTreeMap<String, u32> },
}

impl Replication {
    #[must_use]
    pub const fn simple(factor: u32) -> Self {
        Self::Simple { factor }
    }

    #[must_use]
    pub fn network_topology<I, S>(datacenters: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        Self::NetworkTopology {
            datacenters: datacenters
                .into_iter()
                .map(|(dc, factor)| (dc.into(), factor))
                .collect(),
        }
    }

    /// Render the replication map in CQL map-literal form.
    #[must_use]
    pub fn to_cql(&self) -> String {
        match self {
            Self::Simple { factor } => {
                format!("{{'class': 'SimpleStrategy', 'replication_factor': {factor}}}")
            }
            Self::NetworkTopology { datacenters } => {
                let mut out = String::from("{'class': 'NetworkTopologyStrategy'");
                for (dc, factor) in datacenters {
                    out.push_str(&format!(", '{}': {factor}", dc.replace('\'', "''")));
                }
                out.push('}');
                out
            }
        }
    }
}

impl Default for Replication {
    fn default() -> Self {
        Self::Simple { factor: 1 }
    }
}

impl fmt::Display for Replication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_cql())
    }
}

///
/// Consistency
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
#[remain::sorted]
pub enum Consistency {
    All,
    Any,
    EachQuorum,
    LocalOne,
    LocalQuorum,
    LocalSerial,
    One,
    Quorum,
    Serial,
    Three,
    Two,
}

impl Consistency {
    /// Serial levels are only valid as the serial consistency of a
    /// conditional statement.
    #[must_use]
    pub const fn is_serial(self) -> bool {
        matches!(self, Self::Serial | Self::LocalSerial)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Any => "ANY",
            Self::EachQuorum => "EACH_QUORUM",
            Self::LocalOne => "LOCAL_ONE",
            Self::LocalQuorum => "LOCAL_QUORUM",
            Self::LocalSerial => "LOCAL_SERIAL",
            Self::One => "ONE",
            Self::Quorum => "QUORUM",
            Self::Serial => "SERIAL",
            Self::Three => "THREE",
            Self::Two => "TWO",
        }
    }
}

impl fmt::Display for Consistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

///
/// ExcludedKeyPolicy
///
/// What to do when a keyspace-key value appears in the key's exclusion
/// list.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExcludedKeyPolicy {
    /// Raise an `ExcludedKeyError`.
    #[default]
    Fail,
    /// Drop the affected class or statement and continue.
    Skip,
}
