//! IAM role resource and its permission statements
//!
//! A role carries two kinds of grants: managed policies attached by ARN,
//! and inline statements collected in a [`PermissionSet`]. The statements
//! render as a separate default policy resource attached to the role.

use construct::{Error, LogicalId, Resource, Result, Token};
use regex::Regex;
use serde_json::{Value, json};
use std::sync::LazyLock;

static IAM_ACTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-z0-9-]+:[A-Za-z0-9*]+|\*)$").expect("valid regex"));

const POLICY_VERSION: &str = "2012-10-17";

/// Whether a statement grants or denies
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Allow,
    Deny,
}

impl Effect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "Allow",
            Self::Deny => "Deny",
        }
    }
}

/// One permission statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyStatement {
    pub effect: Effect,
    pub actions: Vec<String>,
    pub resources: Vec<String>,
}

impl PolicyStatement {
    /// Allow the given actions on the given resource patterns
    pub fn allow<A, R>(actions: A, resources: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            effect: Effect::Allow,
            actions: actions.into_iter().map(Into::into).collect(),
            resources: resources.into_iter().map(Into::into).collect(),
        }
    }

    fn validate(&self, owner: &str) -> Result<()> {
        if self.actions.is_empty() {
            return Err(Error::validation(owner, "policy statement has no actions"));
        }
        if self.resources.is_empty() {
            return Err(Error::validation(owner, "policy statement has no resources"));
        }
        if let Some(bad) = self.actions.iter().find(|a| !IAM_ACTION.is_match(a)) {
            return Err(Error::validation(
                owner,
                format!("'{bad}' is not a service:Action pattern"),
            ));
        }
        Ok(())
    }

    fn to_json(&self) -> Value {
        let one_or_many = |items: &[String]| match items {
            [single] => json!(single),
            many => json!(many),
        };
        json!({
            "Action": one_or_many(&self.actions),
            "Effect": self.effect.as_str(),
            "Resource": one_or_many(&self.resources),
        })
    }
}

/// Append-only, ordered set of permission statements
///
/// Adding a statement that is already present is a no-op; nothing is ever
/// removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    statements: Vec<PolicyStatement>,
}

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a statement, returning whether it was new
    pub fn add(&mut self, statement: PolicyStatement) -> bool {
        if self.statements.contains(&statement) {
            return false;
        }
        self.statements.push(statement);
        true
    }

    pub fn statements(&self) -> &[PolicyStatement] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Whether some Allow statement grants this exact action
    #[cfg(test)]
    pub fn allows(&self, action: &str) -> bool {
        self.statements
            .iter()
            .any(|s| s.effect == Effect::Allow && s.actions.iter().any(|a| a == action))
    }
}

/// An identity assumed by a service principal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: LogicalId,
    /// Service principal allowed to assume the role, e.g. `ecs-tasks.amazonaws.com`
    pub assumed_by: String,
    managed_policies: Vec<String>,
    permissions: PermissionSet,
}

impl Role {
    pub fn new(id: LogicalId, assumed_by: &str) -> Self {
        Self {
            id,
            assumed_by: assumed_by.to_string(),
            managed_policies: Vec::new(),
            permissions: PermissionSet::new(),
        }
    }

    /// Attach a managed policy by ARN; attaching twice is a no-op
    pub fn add_managed_policy(&mut self, arn: &str) {
        if !self.managed_policies.iter().any(|p| p == arn) {
            self.managed_policies.push(arn.to_string());
        }
    }

    /// Grant an additional statement
    pub fn add_to_policy(&mut self, statement: PolicyStatement) -> bool {
        let added = self.permissions.add(statement);
        if added {
            log::debug!("Granted statement #{} on {}", self.permissions.len(), self.id);
        }
        added
    }

    pub fn managed_policies(&self) -> &[String] {
        &self.managed_policies
    }

    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    /// ARN of the role, known at deploy time
    pub fn arn(&self) -> Token {
        Token::attribute(self.id.clone(), "Arn")
    }

    /// The policy resource carrying the inline statements, if there are any
    pub fn default_policy(&self) -> Option<RolePolicy> {
        if self.permissions.is_empty() {
            return None;
        }
        Some(RolePolicy {
            id: self.id.child("DefaultPolicy"),
            role: self.id.clone(),
            permissions: self.permissions.clone(),
        })
    }
}

impl Resource for Role {
    fn logical_id(&self) -> &LogicalId {
        &self.id
    }

    fn resource_type(&self) -> &'static str {
        "AWS::IAM::Role"
    }

    fn description(&self) -> String {
        format!(
            "Role assumed by {} ({} managed, {} inline statements)",
            self.assumed_by,
            self.managed_policies.len(),
            self.permissions.len()
        )
    }

    fn properties(&self) -> Value {
        json!({
            "AssumeRolePolicyDocument": {
                "Statement": [{
                    "Action": "sts:AssumeRole",
                    "Effect": "Allow",
                    "Principal": { "Service": self.assumed_by },
                }],
                "Version": POLICY_VERSION,
            },
            "ManagedPolicyArns": self.managed_policies,
        })
    }

    fn validate(&self) -> Result<()> {
        if self.assumed_by.trim().is_empty() {
            return Err(Error::validation(self.id.as_str(), "role has no principal"));
        }
        if let Some(bad) = self
            .managed_policies
            .iter()
            .find(|arn| !arn.starts_with("arn:"))
        {
            return Err(Error::validation(
                self.id.as_str(),
                format!("'{bad}' is not a policy ARN"),
            ));
        }
        for statement in self.permissions.statements() {
            statement.validate(self.id.as_str())?;
        }
        Ok(())
    }
}

/// Inline statements of a role, rendered as their own policy resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolePolicy {
    pub id: LogicalId,
    pub role: LogicalId,
    pub permissions: PermissionSet,
}

impl Resource for RolePolicy {
    fn logical_id(&self) -> &LogicalId {
        &self.id
    }

    fn resource_type(&self) -> &'static str {
        "AWS::IAM::Policy"
    }

    fn description(&self) -> String {
        format!(
            "{} statements attached to {}",
            self.permissions.len(),
            self.role
        )
    }

    fn properties(&self) -> Value {
        let statements: Vec<Value> = self
            .permissions
            .statements()
            .iter()
            .map(PolicyStatement::to_json)
            .collect();
        json!({
            "PolicyDocument": {
                "Statement": statements,
                "Version": POLICY_VERSION,
            },
            "PolicyName": self.id.as_str(),
            "Roles": [Token::Ref(self.role.clone())],
        })
    }

    fn references(&self) -> Vec<LogicalId> {
        vec![self.role.clone()]
    }

    fn validate(&self) -> Result<()> {
        for statement in self.permissions.statements() {
            statement.validate(self.id.as_str())?;
        }
        Ok(())
    }
}
