//! Cloud resource declarations for the API service
//!
//! Every declared piece of infrastructure is modeled as a
//! [`construct::Resource`] with:
//! - A stable logical id
//! - Rendered template properties
//! - The logical ids it references
//! - Local validation of its parameters

pub mod container;
pub mod log_group;
pub mod role;
pub mod security_group;
pub mod service;
pub mod task_definition;

pub use container::{ContainerSpec, HealthCheck, PortMapping, Protocol};
pub use log_group::RetentionDays;
pub use role::{PolicyStatement, Role};
pub use security_group::SecurityGroupSpec;
pub use service::{CapacityProviderStrategy, DeploymentBounds, ServiceSpec};
pub use task_definition::TaskDefinition;
