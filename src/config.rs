//! Configuration file
//!
//! Loaded from `<config dir>/config.toml` unless a path is given. A missing
//! file yields the defaults, which describe the example service.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::api_service::ApiServiceProps;
use crate::api_service::props::{SERVICE_NAME, TASK_CPU, TASK_MEMORY_MIB};
use crate::network::{ClusterRef, ContextLookup, NetworkRecord, NetworkRef};
use crate::paths;
use crate::stack::{DEFAULT_STACK_NAME, StackInputs};

// ============================================================================
// Schema
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub stack: StackSection,

    #[serde(default)]
    pub network: NetworkSection,

    #[serde(default)]
    pub cluster: ClusterSection,

    #[serde(default)]
    pub task: TaskSection,

    #[serde(default)]
    pub service: ServiceSection,

    /// Recorded lookup results
    #[serde(default)]
    pub lookups: LookupsSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackSection {
    #[serde(default = "default_stack_name")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Default for StackSection {
    fn default() -> Self {
        Self {
            name: default_stack_name(),
            description: None,
        }
    }
}

fn default_stack_name() -> String {
    DEFAULT_STACK_NAME.to_string()
}

/// Tags identifying the pre-existing network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSection {
    #[serde(default = "default_network_tags")]
    pub tags: BTreeMap<String, String>,
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self {
            tags: default_network_tags(),
        }
    }
}

fn default_network_tags() -> BTreeMap<String, String> {
    BTreeMap::from([("name".to_string(), "XXXXXXXXX".to_string())])
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSection {
    #[serde(default = "default_cluster_name")]
    pub name: String,
}

impl Default for ClusterSection {
    fn default() -> Self {
        Self {
            name: default_cluster_name(),
        }
    }
}

fn default_cluster_name() -> String {
    "YYYYYYY".to_string()
}

/// Task size in CPU units and MiB
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSection {
    #[serde(default = "default_cpu")]
    pub cpu: u32,

    #[serde(default = "default_memory")]
    pub memory: u32,
}

impl Default for TaskSection {
    fn default() -> Self {
        Self {
            cpu: TASK_CPU,
            memory: TASK_MEMORY_MIB,
        }
    }
}

const fn default_cpu() -> u32 {
    TASK_CPU
}

const fn default_memory() -> u32 {
    TASK_MEMORY_MIB
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSection {
    #[serde(default = "default_service_name")]
    pub name: String,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            name: default_service_name(),
        }
    }
}

fn default_service_name() -> String {
    SERVICE_NAME.to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LookupsSection {
    /// Fail when the network has no recorded lookup
    #[serde(default)]
    pub strict: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<NetworkRecord>,
}

// ============================================================================
// Load / Validate
// ============================================================================

impl AppConfig {
    /// Load from `path`, or from the default location when `None`
    ///
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => paths::config_file()?,
        };

        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Could not read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid TOML in {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Check the shape of the configuration before composing
    ///
    /// Resource-level rules (task size table, name formats) are checked
    /// again during composition.
    pub fn validate(&self) -> Result<()> {
        if self.stack.name.trim().is_empty() {
            bail!("[stack] name must not be empty");
        }
        if self.service.name.trim().is_empty() {
            bail!("[service] name must not be empty");
        }
        if self.task.cpu == 0 || self.task.memory == 0 {
            bail!(
                "[task] cpu and memory must be positive (got {} / {})",
                self.task.cpu,
                self.task.memory
            );
        }
        self.network_ref().context("Invalid [network] section")?;
        self.cluster_ref().context("Invalid [cluster] section")?;

        for (i, record) in self.lookups.networks.iter().enumerate() {
            if record.tags.is_empty() {
                bail!("[[lookups.networks]] entry {} has no tags", i + 1);
            }
            if record.vpc_id.trim().is_empty() {
                bail!("[[lookups.networks]] entry {} has no vpc_id", i + 1);
            }
        }
        Ok(())
    }

    pub fn network_ref(&self) -> Result<NetworkRef> {
        Ok(NetworkRef::tagged(self.network.tags.clone())?)
    }

    pub fn cluster_ref(&self) -> Result<ClusterRef> {
        Ok(ClusterRef::named(&self.cluster.name)?)
    }

    /// Lookup backed by the recorded network entries
    pub fn lookup(&self) -> ContextLookup {
        ContextLookup::new(self.lookups.networks.clone())
    }

    /// Composition inputs; `strict` forces strict lookups on top of the file setting
    pub fn stack_inputs(&self, strict: bool) -> Result<StackInputs> {
        Ok(StackInputs {
            stack_name: self.stack.name.clone(),
            description: self.stack.description.clone(),
            network: self.network_ref()?,
            cluster: self.cluster_ref()?,
            props: ApiServiceProps {
                service_name: self.service.name.clone(),
                cpu: self.task.cpu,
                memory: self.task.memory,
            },
            strict: strict || self.lookups.strict,
        })
    }
}

/// Starter configuration written by `config init`
pub fn default_toml() -> String {
    format!(
        r#"# fargate-otel configuration

[stack]
name = "{DEFAULT_STACK_NAME}"
# description = "API service with an OpenTelemetry collector sidecar"

# Tags of the existing network to deploy into
[network]
tags = {{ name = "XXXXXXXXX" }}

# Name of the existing cluster
[cluster]
name = "YYYYYYY"

# Fargate task size (CPU units / MiB)
[task]
cpu = {TASK_CPU}
memory = {TASK_MEMORY_MIB}

[service]
name = "{SERVICE_NAME}"

# Recorded network lookups. Without a matching entry, synthesis uses
# placeholder ids unless strict is set.
[lookups]
strict = false

# [[lookups.networks]]
# tags = {{ name = "XXXXXXXXX" }}
# vpc_id = "vpc-0123456789abcdef0"
# private_subnets = ["subnet-0aaa", "subnet-0bbb"]
# public_subnets = []
# availability_zones = ["us-east-1a", "us-east-1b"]
"#
    )
}

// ============================================================================
// Tests
// ============================================================================
