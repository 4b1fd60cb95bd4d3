//! Resource trait for declarative resource graphs
//!
//! A Resource is one declared piece of infrastructure. It knows its own
//! identity, renders its properties, names the resources it points at,
//! and checks its own parameters.

use crate::error::Result;
use crate::types::LogicalId;
use serde_json::Value;
use std::fmt;

/// Core trait for declared resources
///
/// Every resource in a stack implements this trait, which provides:
/// - Identity (logical id, type, description)
/// - Rendering (properties)
/// - Wiring (references to other resources)
/// - Local validation
///
/// # Example
///
/// ```ignore
/// use construct::{LogicalId, Resource, Result, Error};
/// use serde_json::{Value, json};
///
/// #[derive(Debug)]
/// struct Queue {
///     id: LogicalId,
///     retention_secs: u32,
/// }
///
/// impl Resource for Queue {
///     fn logical_id(&self) -> &LogicalId {
///         &self.id
///     }
///
///     fn resource_type(&self) -> &'static str {
///         "AWS::SQS::Queue"
///     }
///
///     fn description(&self) -> String {
///         format!("Queue {}", self.id)
///     }
///
///     fn properties(&self) -> Value {
///         json!({ "MessageRetentionPeriod": self.retention_secs })
///     }
///
///     fn validate(&self) -> Result<()> {
///         if self.retention_secs < 60 {
///             return Err(Error::validation(self.id.as_str(), "retention below 60s"));
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Resource: Send + Sync + fmt::Debug {
    /// Template-unique identifier for this resource
    fn logical_id(&self) -> &LogicalId;

    /// Resource type as understood by the deployment engine
    ///
    /// Examples:
    /// - "AWS::ECS::Service"
    /// - "AWS::IAM::Role"
    fn resource_type(&self) -> &'static str;

    /// Human-readable description of what this resource is
    fn description(&self) -> String;

    /// Render the resource properties
    fn properties(&self) -> Value;

    /// Other declared resources this one points at
    ///
    /// Every id returned here must be declared in the same stack.
    fn references(&self) -> Vec<LogicalId> {
        Vec::new()
    }

    /// Check the resource parameters
    ///
    /// Called during synthesis. Errors are configuration errors and are
    /// never retried.
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// A boxed resource for type-erased storage
pub type BoxedResource = Box<dyn Resource>;

/// Extension trait for working with boxed resources
pub trait ResourceExt {
    /// Short service name of the resource type, e.g. `ecs` for `AWS::ECS::Service`
    fn service_name(&self) -> String;

    /// Short kind of the resource type, e.g. `service` for `AWS::ECS::Service`
    fn kind(&self) -> String;
}

impl<R: Resource + ?Sized> ResourceExt for R {
    fn service_name(&self) -> String {
        self.resource_type()
            .split("::")
            .nth(1)
            .unwrap_or_default()
            .to_lowercase()
    }

    fn kind(&self) -> String {
        self.resource_type()
            .rsplit("::")
            .next()
            .unwrap_or_default()
            .to_lowercase()
    }
}
