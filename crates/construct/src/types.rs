//! Core types for resource graphs

use regex::Regex;
use serde::{Serialize, Serializer};
use serde_json::{Value, json};
use std::fmt;
use std::sync::LazyLock;

static LOGICAL_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9]{0,254}$").expect("valid regex"));

/// Template-unique identifier of a declared resource
///
/// Construction never fails; the id is checked when the resource is added
/// to a [`Stack`](crate::Stack).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogicalId(String);

impl LogicalId {
    /// Create a logical id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build an id from an arbitrary label, e.g. `apiSvc-task` -> `ApiSvcTask`
    ///
    /// Non-alphanumeric characters split words; each word is capitalized.
    pub fn from_label(label: &str) -> Self {
        let id = label
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|part| !part.is_empty())
            .map(|part| {
                let mut chars = part.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<String>();
        Self(id)
    }

    /// Append a suffix, e.g. `Role` + `DefaultPolicy`
    pub fn child(&self, suffix: &str) -> Self {
        Self(format!("{}{}", self.0, suffix))
    }

    /// Whether the id satisfies the template naming rules
    pub fn is_valid(&self) -> bool {
        LOGICAL_ID.is_match(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LogicalId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Deploy-time parameters supplied by the deployment engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pseudo {
    Region,
    AccountId,
    Partition,
    StackName,
}

impl Pseudo {
    /// Name of the pseudo parameter in a template
    pub fn name(&self) -> &'static str {
        match self {
            Self::Region => "AWS::Region",
            Self::AccountId => "AWS::AccountId",
            Self::Partition => "AWS::Partition",
            Self::StackName => "AWS::StackName",
        }
    }
}

/// A property value that may only be known at deploy time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Plain value known at synthesis time
    Literal(String),
    /// The primary identifier of another declared resource
    Ref(LogicalId),
    /// A named attribute of another declared resource
    GetAtt { id: LogicalId, attribute: String },
    /// A pseudo parameter such as the deployment region
    Pseudo(Pseudo),
}

impl Token {
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    pub fn reference(id: impl Into<LogicalId>) -> Self {
        Self::Ref(id.into())
    }

    pub fn attribute(id: impl Into<LogicalId>, attribute: &str) -> Self {
        Self::GetAtt {
            id: id.into(),
            attribute: attribute.to_string(),
        }
    }

    /// The declared resource this token points at, if any
    pub fn target(&self) -> Option<&LogicalId> {
        match self {
            Self::Ref(id) | Self::GetAtt { id, .. } => Some(id),
            Self::Literal(_) | Self::Pseudo(_) => None,
        }
    }

    /// Render the token as a template value
    pub fn to_json(&self) -> Value {
        match self {
            Self::Literal(value) => Value::String(value.clone()),
            Self::Ref(id) => json!({ "Ref": id.as_str() }),
            Self::GetAtt { id, attribute } => json!({ "Fn::GetAtt": [id.as_str(), attribute] }),
            Self::Pseudo(pseudo) => json!({ "Ref": pseudo.name() }),
        }
    }
}

impl Serialize for Token {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.write_str(value),
            Self::Ref(id) => write!(f, "${{{id}}}"),
            Self::GetAtt { id, attribute } => write!(f, "${{{id}.{attribute}}}"),
            Self::Pseudo(pseudo) => write!(f, "${{{}}}", pseudo.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logical_id_validation() {
        assert!(LogicalId::new("ApiSvcSecurityGroup").is_valid());
        assert!(LogicalId::new("Role2").is_valid());
        assert!(!LogicalId::new("").is_valid());
        assert!(!LogicalId::new("2Role").is_valid());
        assert!(!LogicalId::new("api-svc").is_valid());
        assert!(!LogicalId::new("A".repeat(256)).is_valid());
    }

    #[test]
    fn test_logical_id_from_label() {
        assert_eq!(
            LogicalId::from_label("apiSvcTaskDefinition"),
            LogicalId::new("ApiSvcTaskDefinition")
        );
        assert_eq!(
            LogicalId::from_label("/ecs/otel-sidecar"),
            LogicalId::new("EcsOtelSidecar")
        );
        assert_eq!(LogicalId::new("Role").child("DefaultPolicy").as_str(), "RoleDefaultPolicy");
    }

    #[test]
    fn test_token_rendering() {
        assert_eq!(Token::literal("vpc-1").to_json(), json!("vpc-1"));
        assert_eq!(Token::reference("TaskDef").to_json(), json!({ "Ref": "TaskDef" }));
        assert_eq!(
            Token::attribute("Role", "Arn").to_json(),
            json!({ "Fn::GetAtt": ["Role", "Arn"] })
        );
        assert_eq!(
            Token::Pseudo(Pseudo::Region).to_json(),
            json!({ "Ref": "AWS::Region" })
        );
    }

    #[test]
    fn test_token_target() {
        assert_eq!(Token::reference("A").target(), Some(&LogicalId::new("A")));
        assert_eq!(Token::attribute("B", "Arn").target(), Some(&LogicalId::new("B")));
        assert_eq!(Token::literal("x").target(), None);
        assert_eq!(Token::Pseudo(Pseudo::StackName).target(), None);
    }

    #[test]
    fn test_token_display() {
        assert_eq!(Token::attribute("Role", "Arn").to_string(), "${Role.Arn}");
        assert_eq!(Token::reference("Sg").to_string(), "${Sg}");
        assert_eq!(Token::literal("x").to_string(), "x");
    }
}
