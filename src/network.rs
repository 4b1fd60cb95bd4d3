//! References to pre-existing network and cluster infrastructure
//!
//! Neither the network nor the cluster is created by this stack. A network is
//! found by tag lookup; its attributes come from a [`NetworkLookup`] so the
//! builder never talks to a cloud API. A cluster is referenced by name only.

use construct::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

static CLUSTER_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,255}$").expect("valid regex"));

/// A pre-existing virtual network, identified by its tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkRef {
    tags: BTreeMap<String, String>,
}

impl NetworkRef {
    /// Reference the network carrying all of the given tags
    pub fn tagged(tags: BTreeMap<String, String>) -> Result<Self> {
        if tags.is_empty() {
            return Err(Error::validation("network", "network lookup needs at least one tag"));
        }
        if let Some((key, _)) = tags
            .iter()
            .find(|(k, v)| k.trim().is_empty() || v.trim().is_empty())
        {
            return Err(Error::validation(
                "network",
                format!("network tag '{key}' has an empty key or value"),
            ));
        }
        Ok(Self { tags })
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    /// Stable key identifying this lookup, e.g. `vpc-provider:tag:name=prod`
    pub fn lookup_key(&self) -> String {
        let filters: Vec<String> = self
            .tags
            .iter()
            .map(|(k, v)| format!("tag:{k}={v}"))
            .collect();
        format!("vpc-provider:{}", filters.join(":"))
    }
}

/// A pre-existing container cluster, referenced by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterRef {
    name: String,
}

impl ClusterRef {
    pub fn named(name: &str) -> Result<Self> {
        if !CLUSTER_NAME.is_match(name) {
            return Err(Error::validation(
                format!("cluster '{name}'"),
                "cluster name must be 1-255 letters, digits, hyphens or underscores",
            ));
        }
        Ok(Self {
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Attributes of a network, as recorded by an earlier lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkRecord {
    /// Tags the network carries
    pub tags: BTreeMap<String, String>,
    pub vpc_id: String,
    #[serde(default)]
    pub private_subnets: Vec<String>,
    #[serde(default)]
    pub public_subnets: Vec<String>,
    #[serde(default)]
    pub availability_zones: Vec<String>,
}

impl NetworkRecord {
    /// Whether this record carries every tag of the reference
    fn matches(&self, network: &NetworkRef) -> bool {
        network
            .tags()
            .iter()
            .all(|(k, v)| self.tags.get(k) == Some(v))
    }
}

/// A network whose attributes are known
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedNetwork {
    pub vpc_id: String,
    pub private_subnets: Vec<String>,
    pub public_subnets: Vec<String>,
    pub availability_zones: Vec<String>,
}

impl ResolvedNetwork {
    /// Stand-in attributes used until the deployment engine records the real ones
    pub fn placeholder() -> Self {
        Self {
            vpc_id: "vpc-12345".to_string(),
            private_subnets: vec!["p-12345".to_string(), "p-67890".to_string()],
            public_subnets: vec!["s-12345".to_string(), "s-67890".to_string()],
            availability_zones: vec!["dummy1a".to_string(), "dummy1b".to_string()],
        }
    }

    /// Subnets tasks are placed in
    ///
    /// Tasks without a public address go to private subnets; the network
    /// must have some.
    pub fn task_subnets(&self, public: bool) -> Result<&[String]> {
        let (subnets, kind) = if public {
            (&self.public_subnets, "public")
        } else {
            (&self.private_subnets, "private")
        };
        if subnets.is_empty() {
            return Err(Error::lookup(
                self.vpc_id.clone(),
                format!("network has no {kind} subnets"),
            ));
        }
        Ok(subnets)
    }
}

impl From<NetworkRecord> for ResolvedNetwork {
    fn from(record: NetworkRecord) -> Self {
        Self {
            vpc_id: record.vpc_id,
            private_subnets: record.private_subnets,
            public_subnets: record.public_subnets,
            availability_zones: record.availability_zones,
        }
    }
}

/// Provider of network attributes
///
/// Implement this trait to resolve networks from a different source.
pub trait NetworkLookup {
    /// Find the network matching the reference, or None if it is unknown
    fn find(&self, network: &NetworkRef) -> Result<Option<ResolvedNetwork>>;
}

/// Resolves networks from lookup results recorded in configuration
#[derive(Debug, Clone, Default)]
pub struct ContextLookup {
    records: Vec<NetworkRecord>,
}

impl ContextLookup {
    pub fn new(records: Vec<NetworkRecord>) -> Self {
        Self { records }
    }
}

impl NetworkLookup for ContextLookup {
    fn find(&self, network: &NetworkRef) -> Result<Option<ResolvedNetwork>> {
        let matches: Vec<&NetworkRecord> =
            self.records.iter().filter(|r| r.matches(network)).collect();
        match matches.as_slice() {
            [] => Ok(None),
            [record] => Ok(Some((*record).clone().into())),
            many => Err(Error::lookup(
                network.lookup_key(),
                format!("{} networks match; add tags to narrow the lookup", many.len()),
            )),
        }
    }
}

/// Outcome of resolving a network reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkResolution {
    pub network: ResolvedNetwork,
    /// Set when placeholder attributes stand in for an unknown network
    pub missing_key: Option<String>,
}

/// Resolve a network reference
///
/// An unknown network is an error in strict mode. Otherwise placeholder
/// attributes are returned and the lookup key is reported as missing.
pub fn resolve_network<L: NetworkLookup + ?Sized>(
    lookup: &L,
    network: &NetworkRef,
    strict: bool,
) -> Result<NetworkResolution> {
    let key = network.lookup_key();
    match lookup.find(network)? {
        Some(resolved) => {
            log::debug!("Resolved {} to {}", key, resolved.vpc_id);
            Ok(NetworkResolution {
                network: resolved,
                missing_key: None,
            })
        }
        None if strict => Err(Error::lookup(key, "no recorded network matches")),
        None => {
            log::warn!("No recorded network matches {key}; using placeholder attributes");
            Ok(NetworkResolution {
                network: ResolvedNetwork::placeholder(),
                missing_key: Some(key),
            })
        }
    }
}
