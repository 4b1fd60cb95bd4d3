//! Synthesis - renders a stack into a deployable template
//!
//! Synthesis validates every resource and checks that each reference points
//! at a declared resource. It does not order resources or compute a
//! dependency graph; the deployment engine owns that.

use crate::error::Result;
use crate::stack::Stack;
use serde_json::{Map, Value, json};
use std::fs;
use std::path::Path;

/// Metadata key holding the blake3 fingerprint of the rendered resources
pub const FINGERPRINT_KEY: &str = "construct:fingerprint";

/// Metadata key listing lookups the deployment engine must still resolve
pub const MISSING_LOOKUPS_KEY: &str = "construct:missingLookups";

/// A synthesized template
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub description: Option<String>,
    pub resources: Map<String, Value>,
    pub outputs: Map<String, Value>,
    pub fingerprint: String,
    pub missing_lookups: Vec<String>,
}

impl Template {
    /// Render the full template document
    pub fn to_value(&self) -> Value {
        let mut doc = Map::new();
        if let Some(description) = &self.description {
            doc.insert("Description".to_string(), json!(description));
        }

        let mut metadata = Map::new();
        metadata.insert(FINGERPRINT_KEY.to_string(), json!(self.fingerprint));
        if !self.missing_lookups.is_empty() {
            metadata.insert(MISSING_LOOKUPS_KEY.to_string(), json!(self.missing_lookups));
        }
        doc.insert("Metadata".to_string(), Value::Object(metadata));

        doc.insert("Resources".to_string(), Value::Object(self.resources.clone()));
        if !self.outputs.is_empty() {
            doc.insert("Outputs".to_string(), Value::Object(self.outputs.clone()));
        }
        Value::Object(doc)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_value())?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_value())?)
    }

    /// Write the template to a file, creating parent directories
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json_pretty()?)?;
        log::debug!("Wrote template to {}", path.display());
        Ok(())
    }

    /// Get a rendered resource by logical id
    pub fn resource(&self, id: &str) -> Option<&Value> {
        self.resources.get(id)
    }

    /// Get the properties of a rendered resource
    pub fn properties(&self, id: &str) -> Option<&Value> {
        self.resource(id).and_then(|r| r.get("Properties"))
    }

    /// Logical ids of every rendered resource of the given type
    pub fn ids_of_type(&self, resource_type: &str) -> Vec<&str> {
        self.resources
            .iter()
            .filter(|(_, r)| r.get("Type").and_then(Value::as_str) == Some(resource_type))
            .map(|(id, _)| id.as_str())
            .collect()
    }
}

/// Synthesize a stack into a template
///
/// Fails on the first resource that does not validate or that references
/// an undeclared resource.
pub fn synthesize(stack: &Stack) -> Result<Template> {
    stack.validate()?;

    let mut resources = Map::new();
    for resource in stack.resources() {
        resources.insert(
            resource.logical_id().to_string(),
            json!({
                "Type": resource.resource_type(),
                "Properties": resource.properties(),
            }),
        );
    }

    let mut outputs = Map::new();
    for output in stack.outputs() {
        outputs.insert(
            output.id.to_string(),
            json!({
                "Description": output.description,
                "Value": output.value,
            }),
        );
    }

    for key in stack.missing_lookups() {
        log::warn!("Lookup {key} is unresolved; template uses placeholder values");
    }

    let rendered = serde_json::to_vec(&resources)?;
    let fingerprint = blake3::hash(&rendered).to_hex().to_string();
    log::debug!(
        "Synthesized stack {} ({} resources, fingerprint {})",
        stack.name,
        resources.len(),
        &fingerprint[..12]
    );

    Ok(Template {
        description: stack.description.clone(),
        resources,
        outputs,
        fingerprint,
        missing_lookups: stack.missing_lookups().to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::resource::Resource;
    use crate::types::{LogicalId, Token};

    #[derive(Debug)]
    struct Node {
        id: LogicalId,
        points_at: Option<LogicalId>,
        valid: bool,
    }

    impl Node {
        fn new(id: &str, points_at: Option<&str>) -> Self {
            Self {
                id: LogicalId::new(id),
                points_at: points_at.map(LogicalId::new),
                valid: true,
            }
        }
    }

    impl Resource for Node {
        fn logical_id(&self) -> &LogicalId {
            &self.id
        }

        fn resource_type(&self) -> &'static str {
            "Test::Node"
        }

        fn description(&self) -> String {
            self.id.to_string()
        }

        fn properties(&self) -> Value {
            match &self.points_at {
                Some(target) => json!({ "Next": Token::Ref(target.clone()) }),
                None => json!({}),
            }
        }

        fn references(&self) -> Vec<LogicalId> {
            self.points_at.iter().cloned().collect()
        }

        fn validate(&self) -> Result<()> {
            if self.valid {
                Ok(())
            } else {
                Err(Error::validation(self.id.as_str(), "marked invalid"))
            }
        }
    }

    #[test]
    fn test_synthesize_renders_resources_and_outputs() {
        let mut stack = Stack::new("Test").with_description("test stack");
        stack.add(Node::new("First", None)).unwrap();
        stack.add(Node::new("Second", Some("First"))).unwrap();
        stack
            .add_output("FirstId", "first", Token::reference("First"))
            .unwrap();

        let template = synthesize(&stack).unwrap();
        assert_eq!(template.resources.len(), 2);
        assert_eq!(
            template.properties("Second").unwrap(),
            &json!({ "Next": { "Ref": "First" } })
        );
        assert_eq!(template.ids_of_type("Test::Node").len(), 2);

        let doc = template.to_value();
        assert_eq!(doc["Description"], "test stack");
        assert_eq!(doc["Outputs"]["FirstId"]["Value"], json!({ "Ref": "First" }));
        assert_eq!(doc["Metadata"][FINGERPRINT_KEY], json!(template.fingerprint));
        assert!(doc["Metadata"].get(MISSING_LOOKUPS_KEY).is_none());
    }

    #[test]
    fn test_dangling_reference_rejected() {
        let mut stack = Stack::new("Test");
        stack.add(Node::new("Orphan", Some("Missing"))).unwrap();

        let err = synthesize(&stack).unwrap_err();
        assert!(matches!(err, Error::DanglingReference { ref to, .. } if to == "Missing"));
    }

    #[test]
    fn test_dangling_output_rejected() {
        let mut stack = Stack::new("Test");
        stack.add(Node::new("First", None)).unwrap();
        stack
            .add_output("Gone", "gone", Token::attribute("Nope", "Arn"))
            .unwrap();

        assert!(matches!(
            synthesize(&stack),
            Err(Error::DanglingReference { .. })
        ));
    }

    #[test]
    fn test_validation_failure_propagates() {
        let mut stack = Stack::new("Test");
        let mut node = Node::new("Broken", None);
        node.valid = false;
        stack.add(node).unwrap();

        let err = synthesize(&stack).unwrap_err();
        assert_eq!(err.to_string(), "invalid Broken: marked invalid");
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let build = || {
            let mut stack = Stack::new("Test");
            stack.add(Node::new("First", None)).unwrap();
            synthesize(&stack).unwrap()
        };
        assert_eq!(build().fingerprint, build().fingerprint);

        let mut other = Stack::new("Test");
        other.add(Node::new("Other", None)).unwrap();
        assert_ne!(build().fingerprint, synthesize(&other).unwrap().fingerprint);
    }

    #[test]
    fn test_missing_lookups_in_metadata() {
        let mut stack = Stack::new("Test");
        stack.add(Node::new("First", None)).unwrap();
        stack.report_missing_lookup("vpc-provider:tag:name=X");

        let doc = synthesize(&stack).unwrap().to_value();
        assert_eq!(
            doc["Metadata"][MISSING_LOOKUPS_KEY],
            json!(["vpc-provider:tag:name=X"])
        );
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("stack.template.json");

        let mut stack = Stack::new("Test");
        stack.add(Node::new("First", None)).unwrap();
        synthesize(&stack).unwrap().write_to(&path).unwrap();

        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["Resources"]["First"]["Type"], "Test::Node");
    }
}
