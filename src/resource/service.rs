//! Service resource - keeps a task definition running on a cluster

use construct::{Error, LogicalId, Resource, Result, Token};
use regex::Regex;
use serde_json::{Map, Value, json};
use std::sync::LazyLock;

static SERVICE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,255}$").expect("valid regex"));

/// Share of tasks placed on one capacity provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityProviderStrategy {
    pub capacity_provider: String,
    /// Relative share of tasks beyond the base
    pub weight: u32,
    /// Tasks always placed on this provider before weights apply
    pub base: Option<u32>,
}

impl CapacityProviderStrategy {
    pub fn new(capacity_provider: &str, weight: u32) -> Self {
        Self {
            capacity_provider: capacity_provider.to_string(),
            weight,
            base: None,
        }
    }

    pub fn with_base(mut self, base: u32) -> Self {
        self.base = Some(base);
        self
    }

    fn to_json(&self) -> Value {
        let mut strategy = Map::new();
        strategy.insert("CapacityProvider".to_string(), json!(self.capacity_provider));
        strategy.insert("Weight".to_string(), json!(self.weight));
        if let Some(base) = self.base {
            strategy.insert("Base".to_string(), json!(base));
        }
        Value::Object(strategy)
    }
}

/// Healthy-percent bounds applied while tasks are replaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeploymentBounds {
    /// Lower limit on running tasks, as a percent of the desired count
    pub min_healthy_percent: u32,
    /// Upper limit on running tasks, as a percent of the desired count
    pub max_healthy_percent: u32,
}

/// A long-running service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    pub id: LogicalId,
    pub service_name: String,
    /// Name of the pre-existing cluster
    pub cluster: String,
    pub task_definition: LogicalId,
    pub security_groups: Vec<LogicalId>,
    pub subnets: Vec<String>,
    pub assign_public_ip: bool,
    pub deployment: DeploymentBounds,
    pub capacity_providers: Vec<CapacityProviderStrategy>,
    pub enable_managed_tags: bool,
}

impl ServiceSpec {
    /// Service name as resolved at deploy time
    pub fn name_token(&self) -> Token {
        Token::attribute(self.id.clone(), "Name")
    }

    #[cfg(test)]
    pub fn capacity_provider(&self, name: &str) -> Option<&CapacityProviderStrategy> {
        self.capacity_providers
            .iter()
            .find(|c| c.capacity_provider == name)
    }

    fn validate_capacity_providers(&self) -> Result<()> {
        let id = self.id.as_str();
        if self.capacity_providers.is_empty() {
            return Err(Error::validation(id, "no capacity providers"));
        }
        if self.capacity_providers.iter().all(|c| c.weight == 0) {
            return Err(Error::validation(
                id,
                "at least one capacity provider needs a positive weight",
            ));
        }
        if let Some(heavy) = self.capacity_providers.iter().find(|c| c.weight > 1000) {
            return Err(Error::validation(
                id,
                format!("{} weight {} exceeds 1000", heavy.capacity_provider, heavy.weight),
            ));
        }
        let with_base: Vec<_> = self
            .capacity_providers
            .iter()
            .filter(|c| c.base.is_some())
            .collect();
        match with_base.as_slice() {
            [] => Err(Error::validation(
                id,
                "one capacity provider must define a base",
            )),
            [single] if single.base.unwrap_or(0) > 100_000 => Err(Error::validation(
                id,
                format!("{} base exceeds 100000", single.capacity_provider),
            )),
            [_] => Ok(()),
            _ => Err(Error::validation(
                id,
                "only one capacity provider may define a base",
            )),
        }
    }
}

impl Resource for ServiceSpec {
    fn logical_id(&self) -> &LogicalId {
        &self.id
    }

    fn resource_type(&self) -> &'static str {
        "AWS::ECS::Service"
    }

    fn description(&self) -> String {
        let providers: Vec<String> = self
            .capacity_providers
            .iter()
            .map(|c| format!("{}×{}", c.capacity_provider, c.weight))
            .collect();
        format!(
            "Service {} on cluster {} ({})",
            self.service_name,
            self.cluster,
            providers.join(", ")
        )
    }

    fn properties(&self) -> Value {
        let strategies: Vec<Value> = self
            .capacity_providers
            .iter()
            .map(CapacityProviderStrategy::to_json)
            .collect();
        let security_groups: Vec<Token> = self
            .security_groups
            .iter()
            .map(|sg| Token::attribute(sg.clone(), "GroupId"))
            .collect();
        let assign_public_ip = if self.assign_public_ip {
            "ENABLED"
        } else {
            "DISABLED"
        };
        json!({
            "CapacityProviderStrategy": strategies,
            "Cluster": self.cluster,
            "DeploymentConfiguration": {
                "MaximumPercent": self.deployment.max_healthy_percent,
                "MinimumHealthyPercent": self.deployment.min_healthy_percent,
            },
            "EnableECSManagedTags": self.enable_managed_tags,
            "NetworkConfiguration": {
                "AwsvpcConfiguration": {
                    "AssignPublicIp": assign_public_ip,
                    "SecurityGroups": security_groups,
                    "Subnets": self.subnets,
                },
            },
            "ServiceName": self.service_name,
            "TaskDefinition": Token::Ref(self.task_definition.clone()),
        })
    }

    fn references(&self) -> Vec<LogicalId> {
        let mut refs = vec![self.task_definition.clone()];
        refs.extend(self.security_groups.iter().cloned());
        refs
    }

    fn validate(&self) -> Result<()> {
        let id = self.id.as_str();
        if !SERVICE_NAME.is_match(&self.service_name) {
            return Err(Error::validation(
                id,
                format!(
                    "service name '{}' must be 1-255 letters, digits, hyphens or underscores",
                    self.service_name
                ),
            ));
        }
        if self.cluster.trim().is_empty() {
            return Err(Error::validation(id, "service has no cluster"));
        }
        if self.security_groups.is_empty() {
            return Err(Error::validation(id, "service needs at least one security group"));
        }
        if self.subnets.is_empty() {
            return Err(Error::validation(id, "service has no subnets to place tasks in"));
        }

        let bounds = self.deployment;
        if bounds.min_healthy_percent > 100 || bounds.max_healthy_percent < 100 {
            return Err(Error::validation(
                id,
                format!(
                    "healthy percent bounds {}..{} must satisfy min <= 100 <= max",
                    bounds.min_healthy_percent, bounds.max_healthy_percent
                ),
            ));
        }

        self.validate_capacity_providers()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> ServiceSpec {
        ServiceSpec {
            id: LogicalId::new("ApiService"),
            service_name: "ExampleService".to_string(),
            cluster: "YYYYYYY".to_string(),
            task_definition: LogicalId::new("TaskDef"),
            security_groups: vec![LogicalId::new("Sg")],
            subnets: vec!["subnet-1".to_string()],
            assign_public_ip: false,
            deployment: DeploymentBounds {
                min_healthy_percent: 100,
                max_healthy_percent: 200,
            },
            capacity_providers: vec![
                CapacityProviderStrategy::new("FARGATE_SPOT", 2),
                CapacityProviderStrategy::new("FARGATE", 1).with_base(1),
            ],
            enable_managed_tags: true,
        }
    }

    #[test]
    fn test_valid_service() {
        assert!(service().validate().is_ok());
    }

    #[test]
    fn test_render_service() {
        let props = service().properties();
        assert_eq!(props["ServiceName"], "ExampleService");
        assert_eq!(props["Cluster"], "YYYYYYY");
        assert_eq!(props["TaskDefinition"], json!({ "Ref": "TaskDef" }));
        assert_eq!(
            props["NetworkConfiguration"]["AwsvpcConfiguration"]["AssignPublicIp"],
            "DISABLED"
        );
        assert_eq!(
            props["NetworkConfiguration"]["AwsvpcConfiguration"]["SecurityGroups"],
            json!([{ "Fn::GetAtt": ["Sg", "GroupId"] }])
        );
        assert_eq!(
            props["CapacityProviderStrategy"],
            json!([
                { "CapacityProvider": "FARGATE_SPOT", "Weight": 2 },
                { "CapacityProvider": "FARGATE", "Weight": 1, "Base": 1 },
            ])
        );
        assert_eq!(props["DeploymentConfiguration"]["MinimumHealthyPercent"], 100);
        assert_eq!(props["DeploymentConfiguration"]["MaximumPercent"], 200);
    }

    #[test]
    fn test_references() {
        assert_eq!(
            service().references(),
            vec![LogicalId::new("TaskDef"), LogicalId::new("Sg")]
        );
    }

    #[test]
    fn test_requires_security_group_and_subnets() {
        let mut svc = service();
        svc.security_groups.clear();
        assert!(svc.validate().is_err());

        let mut svc = service();
        svc.subnets.clear();
        assert!(svc.validate().is_err());
    }

    #[test]
    fn test_healthy_percent_bounds() {
        let mut svc = service();
        svc.deployment.min_healthy_percent = 101;
        assert!(svc.validate().is_err());

        let mut svc = service();
        svc.deployment.max_healthy_percent = 99;
        assert!(svc.validate().is_err());
    }

    #[test]
    fn test_capacity_provider_rules() {
        let mut svc = service();
        svc.capacity_providers[1].base = None;
        assert!(svc.validate().is_err());

        let mut svc = service();
        svc.capacity_providers[0].base = Some(1);
        assert!(svc.validate().is_err());

        let mut svc = service();
        for strategy in &mut svc.capacity_providers {
            strategy.weight = 0;
        }
        assert!(svc.validate().is_err());

        let mut svc = service();
        svc.capacity_providers.clear();
        assert!(svc.validate().is_err());
    }

    #[test]
    fn test_bad_service_name() {
        let mut svc = service();
        svc.service_name = "Example Service".to_string();
        assert!(svc.validate().is_err());
    }
}
