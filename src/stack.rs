//! Composition root
//!
//! Runs the builder steps in dependency order and collects the result into a
//! [`Stack`] ready for synthesis:
//!
//! 1. resolve the network (lenient or strict)
//! 2. security group and role, which depend on nothing else
//! 3. task definition, which runs as the role
//! 4. API container, then the collector sidecar (which extends the role)
//! 5. service, bound to the cluster, task definition and security group
//!
//! Any failure is a configuration error and is returned immediately.

use construct::{Result, Stack};

use crate::api_service::{ApiServiceBuilder, ApiServiceProps};
use crate::network::{ClusterRef, NetworkLookup, NetworkRef, ResolvedNetwork, resolve_network};
use crate::resource::{Role, SecurityGroupSpec, ServiceSpec, TaskDefinition};

/// Default stack name used when none is configured
pub const DEFAULT_STACK_NAME: &str = "FargateOtelExampleStack";

/// Everything composition needs from the outside
#[derive(Debug, Clone)]
pub struct StackInputs {
    pub stack_name: String,
    pub description: Option<String>,
    pub network: NetworkRef,
    pub cluster: ClusterRef,
    pub props: ApiServiceProps,
    /// Fail instead of using placeholders when the network is unknown
    pub strict: bool,
}

/// The typed declarations of the API service
#[derive(Debug, Clone)]
pub struct ApiService {
    security_group: SecurityGroupSpec,
    role: Role,
    task_definition: TaskDefinition,
    service: ServiceSpec,
}

impl ApiService {
    pub fn security_group(&self) -> &SecurityGroupSpec {
        &self.security_group
    }

    /// The task role with its final permission set
    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn task_definition(&self) -> &TaskDefinition {
        &self.task_definition
    }

    pub fn service(&self) -> &ServiceSpec {
        &self.service
    }
}

/// Result of a composition pass
#[derive(Debug)]
pub struct Composition {
    pub api: ApiService,
    /// Network attributes the service was placed with
    pub network: ResolvedNetwork,
    pub stack: Stack,
}

/// Build the API service and register it on a new stack
pub fn compose<L: NetworkLookup + ?Sized>(inputs: &StackInputs, lookup: &L) -> Result<Composition> {
    let resolution = resolve_network(lookup, &inputs.network, inputs.strict)?;
    let network = &resolution.network;
    let builder = ApiServiceBuilder::new(inputs.props.clone());

    let security_group = builder.build_security_boundary(network);
    let mut role = builder.build_execution_role();

    let props = builder.props();
    let mut task_definition = builder.build_task_definition(&role, props.cpu, props.memory);
    task_definition.add_container(builder.build_primary_container())?;
    task_definition.add_container(builder.build_observability_sidecar(&mut role))?;

    let service = builder.build_service(&inputs.cluster, network, &task_definition, &security_group)?;
    log::debug!(
        "Composed service {} with {} containers in {}",
        service.service_name,
        task_definition.containers().len(),
        network.vpc_id
    );

    let api = ApiService {
        security_group,
        role,
        task_definition,
        service,
    };
    let stack = register(inputs, &api, resolution.missing_key)?;
    stack.validate()?;

    Ok(Composition {
        api,
        network: resolution.network,
        stack,
    })
}

fn register(inputs: &StackInputs, api: &ApiService, missing_key: Option<String>) -> Result<Stack> {
    let mut stack = Stack::new(&inputs.stack_name);
    if let Some(description) = &inputs.description {
        stack = stack.with_description(description);
    }

    stack.add(api.security_group.clone())?;
    stack.add(api.role.clone())?;
    if let Some(policy) = api.role.default_policy() {
        stack.add(policy)?;
    }
    for log_group in api.task_definition.log_groups() {
        stack.add(log_group)?;
    }
    stack.add(api.task_definition.clone())?;
    stack.add(api.service.clone())?;

    stack.add_output("ServiceName", "Name of the API service", api.service.name_token())?;
    stack.add_output("TaskRoleArn", "ARN of the task role", api.role.arn())?;

    if let Some(key) = missing_key {
        stack.report_missing_lookup(key);
    }
    Ok(stack)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_service::props::{
        EXECUTION_POLICY_ARN, PRIMARY_CONTAINER, SIDECAR_CONTAINER, TELEMETRY_ACTIONS,
    };
    use crate::api_service::telemetry_statement;
    use crate::network::{ContextLookup, NetworkRecord};
    use construct::{ErrorCategory, synthesize};
    use std::collections::BTreeMap;

    fn inputs(strict: bool) -> StackInputs {
        StackInputs {
            stack_name: DEFAULT_STACK_NAME.to_string(),
            description: None,
            network: NetworkRef::tagged(BTreeMap::from([("name".to_string(), "X".to_string())]))
                .unwrap(),
            cluster: ClusterRef::named("Y").unwrap(),
            props: ApiServiceProps::default(),
            strict,
        }
    }

    fn recorded() -> ContextLookup {
        ContextLookup::new(vec![NetworkRecord {
            tags: BTreeMap::from([("name".to_string(), "X".to_string())]),
            vpc_id: "vpc-0abc".to_string(),
            private_subnets: vec!["subnet-a".to_string(), "subnet-b".to_string()],
            public_subnets: vec![],
            availability_zones: vec![],
        }])
    }

    #[test]
    fn test_compose_example_service() {
        let composition = compose(&inputs(true), &recorded()).unwrap();
        let api = &composition.api;

        assert_eq!(api.service().service_name, "ExampleService");
        assert_eq!(api.service().cluster, "Y");
        assert_eq!(api.service().task_definition, api.task_definition().id);
        assert_eq!(api.service().subnets, ["subnet-a", "subnet-b"]);
        assert_eq!(api.security_group().vpc_id, "vpc-0abc");

        let names: Vec<_> = api
            .task_definition()
            .containers()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, [PRIMARY_CONTAINER, SIDECAR_CONTAINER]);
        assert!(composition.stack.missing_lookups().is_empty());
    }

    #[test]
    fn test_exactly_one_service_and_task_definition() {
        let composition = compose(&inputs(false), &recorded()).unwrap();
        let stack = &composition.stack;

        assert_eq!(stack.filter_by_target(Some("AWS::ECS::Service")).len(), 1);
        assert_eq!(stack.filter_by_target(Some("taskdefinition")).len(), 1);
        assert_eq!(stack.filter_by_target(Some("logs")).len(), 2);
    }

    #[test]
    fn test_role_is_union_of_baseline_and_telemetry() {
        let api = compose(&inputs(true), &recorded()).unwrap().api;
        let role = api.role();

        assert_eq!(role.managed_policies(), [EXECUTION_POLICY_ARN]);
        assert_eq!(role.permissions().statements(), [telemetry_statement()]);
        for action in TELEMETRY_ACTIONS {
            assert!(role.permissions().allows(action));
        }
        assert_eq!(api.task_definition().role, role.id);
    }

    #[test]
    fn test_lenient_lookup_uses_placeholders() {
        let composition = compose(&inputs(false), &ContextLookup::default()).unwrap();

        assert_eq!(composition.api.security_group().vpc_id, "vpc-12345");
        assert_eq!(composition.api.service().subnets, ["p-12345", "p-67890"]);
        assert_eq!(
            composition.stack.missing_lookups(),
            ["vpc-provider:tag:name=X"]
        );
    }

    #[test]
    fn test_strict_lookup_fails() {
        let err = compose(&inputs(true), &ContextLookup::default()).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Lookup);
    }

    #[test]
    fn test_invalid_task_size_is_configuration_error() {
        let mut inputs = inputs(true);
        inputs.props.memory = 3000;

        let err = compose(&inputs, &recorded()).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    #[test]
    fn test_synthesized_template() {
        let mut inputs = inputs(true);
        inputs.description = Some("API service with collector sidecar".to_string());
        let composition = compose(&inputs, &recorded()).unwrap();
        let template = synthesize(&composition.stack).unwrap();

        assert_eq!(template.ids_of_type("AWS::ECS::Service").len(), 1);
        assert_eq!(template.ids_of_type("AWS::IAM::Policy").len(), 1);

        let doc = template.to_value();
        assert_eq!(doc["Description"], "API service with collector sidecar");
        assert_eq!(
            doc["Outputs"]["ServiceName"]["Value"],
            serde_json::json!({ "Fn::GetAtt": ["ExampleSvcApiService", "Name"] })
        );
        assert_eq!(
            doc["Outputs"]["TaskRoleArn"]["Value"],
            serde_json::json!({ "Fn::GetAtt": ["ExampleSvcRoleSvc", "Arn"] })
        );

        let service = template.properties("ExampleSvcApiService").unwrap();
        assert_eq!(service["ServiceName"], "ExampleService");
        assert_eq!(service["DeploymentConfiguration"]["MinimumHealthyPercent"], 100);
        assert_eq!(service["DeploymentConfiguration"]["MaximumPercent"], 200);
    }
}
