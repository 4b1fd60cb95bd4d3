//! Fixed policy for the API service
//!
//! Every literal the builder uses lives here so the values are auditable in
//! one place and tests can assert against the same names.

use std::time::Duration;

use crate::resource::{PortMapping, Protocol, RetentionDays};

/// Construct path prefix, used in generated descriptions
pub const SERVICE_SCOPE: &str = "ExampleSvc";

pub const SERVICE_NAME: &str = "ExampleService";
pub const SECURITY_GROUP_NAME: &str = "ExampleApiSecurityGroup";

pub const TASK_PRINCIPAL: &str = "ecs-tasks.amazonaws.com";
pub const EXECUTION_POLICY_ARN: &str =
    "arn:aws:iam::aws:policy/service-role/AmazonECSTaskExecutionRolePolicy";

/// Default task size: half a vCPU, 1 GiB
pub const TASK_CPU: u32 = 512;
pub const TASK_MEMORY_MIB: u32 = 1024;

pub const PRIMARY_CONTAINER: &str = "apiSvcTaskDefinition";
pub const PRIMARY_IMAGE: &str = "amazon/amazon-ecs-sample";
pub const PRIMARY_PORT: u16 = 80;
pub const PRIMARY_HEALTH_COMMAND: &str = "curl -f http://127.0.0.1/ || exit 1";
pub const PRIMARY_STREAM_PREFIX: &str = "/ecs/api-svc";

pub const SIDECAR_CONTAINER: &str = "otelContainer";
pub const SIDECAR_IMAGE: &str = "public.ecr.aws/aws-observability/aws-otel-collector:latest";
pub const SIDECAR_CONFIG_ARG: &str =
    "--config=/etc/ecs/container-insights/otel-task-metrics-config.yaml";
pub const SIDECAR_HEALTH_COMMAND: &str = "curl -f http://127.0.0.1:13133/ || exit 1";
pub const SIDECAR_STREAM_PREFIX: &str = "/ecs/otel-sidecar-collector";

pub const OTLP_GRPC_PORT: u16 = 4317;
pub const OTLP_HTTP_PORT: u16 = 4318;
pub const XRAY_PORT: u16 = 2000;
pub const COLLECTOR_HEALTH_PORT: u16 = 13133;

/// Ports the collector sidecar exposes
pub const SIDECAR_PORTS: [PortMapping; 4] = [
    PortMapping {
        container_port: OTLP_GRPC_PORT,
        host_port: OTLP_GRPC_PORT,
        protocol: Protocol::Udp,
    },
    PortMapping {
        container_port: OTLP_HTTP_PORT,
        host_port: OTLP_HTTP_PORT,
        protocol: Protocol::Udp,
    },
    PortMapping {
        container_port: XRAY_PORT,
        host_port: XRAY_PORT,
        protocol: Protocol::Udp,
    },
    PortMapping {
        container_port: COLLECTOR_HEALTH_PORT,
        host_port: COLLECTOR_HEALTH_PORT,
        protocol: Protocol::Tcp,
    },
];

pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(10);
pub const HEALTH_START_PERIOD: Duration = Duration::from_secs(10);
pub const LOG_RETENTION: RetentionDays = RetentionDays::OneWeek;

/// Actions the collector needs to ship logs and traces and read its config
pub const TELEMETRY_ACTIONS: [&str; 11] = [
    "logs:PutLogEvents",
    "logs:CreateLogGroup",
    "logs:CreateLogStream",
    "logs:DescribeLogStreams",
    "logs:DescribeLogGroups",
    "xray:PutTraceSegments",
    "xray:PutTelemetryRecords",
    "xray:GetSamplingRules",
    "xray:GetSamplingTargets",
    "xray:GetSamplingStatisticSummaries",
    "ssm:GetParameters",
];

pub const SPOT_PROVIDER: &str = "FARGATE_SPOT";
pub const ON_DEMAND_PROVIDER: &str = "FARGATE";
pub const SPOT_WEIGHT: u32 = 2;
pub const ON_DEMAND_WEIGHT: u32 = 1;
/// On-demand tasks kept running even when no spot capacity is available
pub const ON_DEMAND_BASE: u32 = 1;

pub const MIN_HEALTHY_PERCENT: u32 = 100;
pub const MAX_HEALTHY_PERCENT: u32 = 200;

/// Inputs the builder accepts from configuration
///
/// Capacity-provider weights and healthy-percent bounds are fixed policy
/// and cannot be configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiServiceProps {
    pub service_name: String,
    pub cpu: u32,
    pub memory: u32,
}

impl Default for ApiServiceProps {
    fn default() -> Self {
        Self {
            service_name: SERVICE_NAME.to_string(),
            cpu: TASK_CPU,
            memory: TASK_MEMORY_MIB,
        }
    }
}
