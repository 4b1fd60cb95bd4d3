//! Stack - the ordered resource registry that synthesis renders

use crate::error::{Error, Result};
use crate::resource::{BoxedResource, Resource, ResourceExt};
use crate::types::{LogicalId, Token};

/// A named value exposed to the deployment engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub id: LogicalId,
    pub description: String,
    pub value: Token,
}

/// A collection of declared resources, in declaration order
#[derive(Debug)]
pub struct Stack {
    /// Stack name, used by the deployment engine
    pub name: String,
    /// Optional template description
    pub description: Option<String>,
    resources: Vec<BoxedResource>,
    outputs: Vec<Output>,
    missing_lookups: Vec<String>,
}

impl Stack {
    /// Create a new empty stack
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            resources: Vec::new(),
            outputs: Vec::new(),
            missing_lookups: Vec::new(),
        }
    }

    /// Set the template description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declare a resource
    ///
    /// Fails if the logical id is malformed or already declared.
    pub fn add<R: Resource + 'static>(&mut self, resource: R) -> Result<()> {
        self.add_boxed(Box::new(resource))
    }

    /// Declare an already boxed resource
    pub fn add_boxed(&mut self, resource: BoxedResource) -> Result<()> {
        let id = resource.logical_id();
        if !id.is_valid() {
            return Err(Error::InvalidLogicalId {
                id: id.to_string(),
            });
        }
        if self.get(id).is_some() {
            return Err(Error::DuplicateLogicalId {
                id: id.to_string(),
            });
        }
        log::debug!("Declared {} {}", resource.resource_type(), id);
        self.resources.push(resource);
        Ok(())
    }

    /// Expose a value to the deployment engine
    pub fn add_output(&mut self, id: &str, description: &str, value: Token) -> Result<()> {
        let id = LogicalId::new(id);
        if !id.is_valid() {
            return Err(Error::InvalidLogicalId {
                id: id.to_string(),
            });
        }
        if self.outputs.iter().any(|o| o.id == id) {
            return Err(Error::DuplicateLogicalId {
                id: id.to_string(),
            });
        }
        self.outputs.push(Output {
            id,
            description: description.to_string(),
            value,
        });
        Ok(())
    }

    /// Record a lookup the deployment engine still has to resolve
    pub fn report_missing_lookup(&mut self, key: impl Into<String>) {
        let key = key.into();
        if !self.missing_lookups.contains(&key) {
            self.missing_lookups.push(key);
        }
    }

    /// Find a resource by logical id
    pub fn get(&self, id: &LogicalId) -> Option<&dyn Resource> {
        self.resources
            .iter()
            .find(|r| r.logical_id() == id)
            .map(AsRef::as_ref)
    }

    /// All resources in declaration order
    pub fn resources(&self) -> impl Iterator<Item = &dyn Resource> {
        self.resources.iter().map(AsRef::as_ref)
    }

    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    pub fn missing_lookups(&self) -> &[String] {
        &self.missing_lookups
    }

    /// Resources matching a predicate, in declaration order
    pub fn filter<F>(&self, predicate: F) -> Vec<&dyn Resource>
    where
        F: Fn(&dyn Resource) -> bool,
    {
        self.resources().filter(|r| predicate(*r)).collect()
    }

    /// Resources matching a target pattern
    ///
    /// Target format: "type" or "type.name"
    pub fn filter_by_target(&self, target: Option<&str>) -> Vec<&dyn Resource> {
        match target {
            None => self.resources().collect(),
            Some(t) => {
                let (resource_type, name) = parse_target(t);
                self.filter(|r| matches_filter(r, resource_type.as_deref(), name.as_deref()))
            }
        }
    }

    /// Validate every resource and check that each reference is declared
    ///
    /// Stops at the first error.
    pub fn validate(&self) -> Result<()> {
        for resource in self.resources() {
            let id = resource.logical_id();
            resource.validate()?;

            for target in resource.references() {
                if self.get(&target).is_none() {
                    return Err(Error::DanglingReference {
                        from: id.to_string(),
                        to: target.to_string(),
                    });
                }
            }
        }

        for output in &self.outputs {
            if let Some(target) = output.value.target()
                && self.get(target).is_none()
            {
                return Err(Error::DanglingReference {
                    from: format!("output {}", output.id),
                    to: target.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Total number of declared resources
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Check if no resources are declared
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Parse a target string like "type.name" into (type, name)
fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    let parts: Vec<&str> = target.split('.').collect();
    match parts.len() {
        1 => (Some(parts[0].to_string()), None),
        2 => (Some(parts[0].to_string()), Some(parts[1].to_string())),
        _ => (None, Some(target.to_string())),
    }
}

/// Check if a resource matches the filter criteria
fn matches_filter(resource: &dyn Resource, resource_type: Option<&str>, name: Option<&str>) -> bool {
    if let Some(rt) = resource_type {
        let rt = rt.to_lowercase();
        // Allow common aliases
        let matches_type = match rt.as_str() {
            "network" | "networking" => resource.service_name() == "ec2",
            "identity" => resource.service_name() == "iam",
            "logging" => resource.service_name() == "logs",
            _ => {
                resource.service_name() == rt
                    || resource.kind() == rt
                    || resource.resource_type().eq_ignore_ascii_case(&rt)
            }
        };
        if !matches_type {
            return false;
        }
    }

    if let Some(n) = name
        && !resource
            .logical_id()
            .as_str()
            .to_lowercase()
            .contains(&n.to_lowercase())
    {
        return false;
    }

    true
}
