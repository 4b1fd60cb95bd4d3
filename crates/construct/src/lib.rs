//! # Construct
//!
//! A framework for declaring cloud resource graphs.
//!
//! This crate provides the core abstractions for declaring resources,
//! wiring references between them, and synthesizing the finished graph
//! into a template that an external deployment engine can realize.
//!
//! ## Core Concepts
//!
//! - **Resource**: A declared piece of infrastructure with typed properties
//! - **LogicalId**: The template-unique name of a resource
//! - **Token**: A property value that is either literal or resolved at deploy time
//! - **Stack**: An ordered collection of resources and outputs
//! - **Template**: The synthesized, reference-checked rendering of a stack
//!
//! ## Example
//!
//! ```ignore
//! use construct::{LogicalId, Resource, Stack, Token, synthesize};
//! use serde_json::{Value, json};
//!
//! #[derive(Debug)]
//! struct Bucket { id: LogicalId, name: String }
//!
//! impl Resource for Bucket {
//!     fn logical_id(&self) -> &LogicalId { &self.id }
//!     fn resource_type(&self) -> &'static str { "AWS::S3::Bucket" }
//!     fn description(&self) -> String { format!("Bucket {}", self.name) }
//!     fn properties(&self) -> Value { json!({ "BucketName": self.name }) }
//! }
//!
//! let mut stack = Stack::new("Storage");
//! stack.add(Bucket { id: LogicalId::new("Assets"), name: "assets".into() })?;
//! stack.add_output("AssetsBucket", "Bucket name", Token::reference("Assets"))?;
//!
//! let template = synthesize(&stack)?;
//! println!("{}", template.to_json_pretty()?);
//! ```
//!
//! ## Scope
//!
//! The crate never talks to a cloud provider. Ordering, diffing and
//! deployment belong to the engine that consumes the template; this crate
//! only guarantees that every reference in the graph points at a declared
//! resource and that each resource passes its own validation.

pub mod error;
pub mod resource;
pub mod stack;
pub mod summary;
pub mod synth;
pub mod types;

// Re-export main types at crate root
pub use error::{Error, ErrorCategory, Result};
pub use resource::{BoxedResource, Resource, ResourceExt};
pub use stack::{Output, Stack};
pub use summary::{StackSummary, group_by_type, summarize};
pub use synth::{FINGERPRINT_KEY, MISSING_LOOKUPS_KEY, Template, synthesize};
pub use types::{LogicalId, Pseudo, Token};
