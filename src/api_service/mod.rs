//! Resource model builder for the API service
//!
//! Turns a resolved network and a cluster reference into the declarations
//! that make up the service: a security group, a task role, a Fargate task
//! definition with the API container and an OpenTelemetry collector
//! sidecar, and the service itself.
//!
//! Only two values are mutated after they are built: the role gains the
//! collector's permission statements, and the task definition gains its
//! containers. Both are passed by exclusive reference.

pub mod props;

use construct::{LogicalId, Result};

use crate::network::{ClusterRef, ResolvedNetwork};
use crate::resource::{
    CapacityProviderStrategy, ContainerSpec, DeploymentBounds, HealthCheck, PolicyStatement,
    PortMapping, Role, SecurityGroupSpec, ServiceSpec, TaskDefinition,
};
pub use props::ApiServiceProps;
use props::{
    EXECUTION_POLICY_ARN, HEALTH_START_PERIOD, HEALTH_TIMEOUT, LOG_RETENTION, MAX_HEALTHY_PERCENT,
    MIN_HEALTHY_PERCENT, ON_DEMAND_BASE, ON_DEMAND_PROVIDER, ON_DEMAND_WEIGHT,
    PRIMARY_CONTAINER, PRIMARY_HEALTH_COMMAND, PRIMARY_IMAGE, PRIMARY_PORT,
    PRIMARY_STREAM_PREFIX, SECURITY_GROUP_NAME, SERVICE_SCOPE, SIDECAR_CONFIG_ARG,
    SIDECAR_CONTAINER, SIDECAR_HEALTH_COMMAND, SIDECAR_IMAGE, SIDECAR_PORTS,
    SIDECAR_STREAM_PREFIX, SPOT_PROVIDER, SPOT_WEIGHT, TASK_PRINCIPAL, TELEMETRY_ACTIONS,
};

/// Logical id of a construct inside the service scope
fn scoped(id: &str) -> LogicalId {
    LogicalId::new(format!("{SERVICE_SCOPE}{id}"))
}

/// The statement granting the collector its log, trace and parameter access
pub fn telemetry_statement() -> PolicyStatement {
    PolicyStatement::allow(TELEMETRY_ACTIONS, ["*"])
}

/// Builds the declarations of the API service
#[derive(Debug, Clone, Default)]
pub struct ApiServiceBuilder {
    props: ApiServiceProps,
}

impl ApiServiceBuilder {
    pub fn new(props: ApiServiceProps) -> Self {
        Self { props }
    }

    pub fn props(&self) -> &ApiServiceProps {
        &self.props
    }

    /// Security group in the given network: all outbound, no inbound
    pub fn build_security_boundary(&self, network: &ResolvedNetwork) -> SecurityGroupSpec {
        SecurityGroupSpec {
            id: scoped("ApiSvcSecurityGroup"),
            name: SECURITY_GROUP_NAME.to_string(),
            description: format!("{SERVICE_SCOPE}/ApiSvcSecurityGroup"),
            vpc_id: network.vpc_id.clone(),
            allow_all_outbound: true,
        }
    }

    /// Role assumable only by the task principal, with the execution baseline
    pub fn build_execution_role(&self) -> Role {
        let mut role = Role::new(scoped("RoleSvc"), TASK_PRINCIPAL);
        role.add_managed_policy(EXECUTION_POLICY_ARN);
        role
    }

    /// Fargate task definition running as the given role
    pub fn build_task_definition(&self, role: &Role, cpu: u32, memory: u32) -> TaskDefinition {
        TaskDefinition::new(scoped("ApiSvcDefinition"), role.id.clone(), cpu, memory)
    }

    /// The API container
    pub fn build_primary_container(&self) -> ContainerSpec {
        ContainerSpec::new(PRIMARY_CONTAINER, PRIMARY_IMAGE)
            .essential(true)
            .port(PortMapping::tcp(PRIMARY_PORT))
            .logging(LOG_RETENTION, PRIMARY_STREAM_PREFIX)
            .health_check(
                HealthCheck::shell(PRIMARY_HEALTH_COMMAND)
                    .with_timeout(HEALTH_TIMEOUT)
                    .with_start_period(HEALTH_START_PERIOD),
            )
    }

    /// Grant the collector's permissions on `role` and return the collector container
    ///
    /// Statements already on the role are kept.
    pub fn build_observability_sidecar(&self, role: &mut Role) -> ContainerSpec {
        role.add_to_policy(telemetry_statement());

        let container = ContainerSpec::new(SIDECAR_CONTAINER, SIDECAR_IMAGE)
            .command([SIDECAR_CONFIG_ARG])
            .essential(true);
        SIDECAR_PORTS
            .into_iter()
            .fold(container, ContainerSpec::port)
            .health_check(
                HealthCheck::shell(SIDECAR_HEALTH_COMMAND)
                    .with_timeout(HEALTH_TIMEOUT)
                    .with_start_period(HEALTH_START_PERIOD),
            )
            .logging(LOG_RETENTION, SIDECAR_STREAM_PREFIX)
    }

    /// Service keeping the task definition running on the cluster
    ///
    /// Tasks get no public address and are placed in the network's private
    /// subnets, which must exist.
    pub fn build_service(
        &self,
        cluster: &ClusterRef,
        network: &ResolvedNetwork,
        task_definition: &TaskDefinition,
        security_group: &SecurityGroupSpec,
    ) -> Result<ServiceSpec> {
        let assign_public_ip = false;
        let subnets = network.task_subnets(assign_public_ip)?.to_vec();

        Ok(ServiceSpec {
            id: scoped("ApiService"),
            service_name: self.props.service_name.clone(),
            cluster: cluster.name().to_string(),
            task_definition: task_definition.id.clone(),
            security_groups: vec![security_group.id.clone()],
            subnets,
            assign_public_ip,
            deployment: DeploymentBounds {
                min_healthy_percent: MIN_HEALTHY_PERCENT,
                max_healthy_percent: MAX_HEALTHY_PERCENT,
            },
            capacity_providers: vec![
                CapacityProviderStrategy::new(SPOT_PROVIDER, SPOT_WEIGHT),
                CapacityProviderStrategy::new(ON_DEMAND_PROVIDER, ON_DEMAND_WEIGHT)
                    .with_base(ON_DEMAND_BASE),
            ],
            enable_managed_tags: true,
        })
    }
}
