//! Task definition resource - compute shape plus the containers that run together

use construct::{Error, LogicalId, Resource, Result, Token};
use serde_json::{Value, json};
use std::collections::BTreeMap;

use super::container::{ContainerSpec, Protocol};
use super::log_group::LogGroup;

/// Networking mode of the task's containers
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkMode {
    /// Each task gets its own elastic network interface
    AwsVpc,
    Bridge,
    Host,
}

impl NetworkMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwsVpc => "awsvpc",
            Self::Bridge => "bridge",
            Self::Host => "host",
        }
    }
}

/// Memory sizes (MiB) allowed for a Fargate cpu size, or None for an unknown cpu
fn fargate_memory_options(cpu: u32) -> Option<Vec<u32>> {
    let range = |from: u32, to: u32, step: u32| -> Vec<u32> {
        (from..=to).step_by(step as usize).collect()
    };
    match cpu {
        256 => Some(vec![512, 1024, 2048]),
        512 => Some(range(1024, 4096, 1024)),
        1024 => Some(range(2048, 8192, 1024)),
        2048 => Some(range(4096, 16384, 1024)),
        4096 => Some(range(8192, 30720, 1024)),
        8192 => Some(range(16384, 61440, 4096)),
        16384 => Some(range(32768, 122_880, 8192)),
        _ => None,
    }
}

/// A Fargate task definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDefinition {
    pub id: LogicalId,
    /// CPU units (1024 = one vCPU)
    pub cpu: u32,
    /// Memory in MiB
    pub memory: u32,
    pub network_mode: NetworkMode,
    /// Identity assumed by the containers and by the agent pulling images and shipping logs
    pub role: LogicalId,
    containers: Vec<ContainerSpec>,
}

impl TaskDefinition {
    pub fn new(id: LogicalId, role: LogicalId, cpu: u32, memory: u32) -> Self {
        Self {
            id,
            cpu,
            memory,
            network_mode: NetworkMode::AwsVpc,
            role,
            containers: Vec::new(),
        }
    }

    /// Register a container
    ///
    /// Containers keep registration order. A container whose name is taken,
    /// that maps a port/protocol already mapped (by another container or by
    /// itself), or whose log group id collides with another container's, is
    /// rejected and the task definition is left unchanged.
    pub fn add_container(&mut self, container: ContainerSpec) -> Result<()> {
        if self.containers.iter().any(|c| c.name == container.name) {
            return Err(Error::validation(
                self.id.as_str(),
                format!("container '{}' is already registered", container.name),
            ));
        }
        check_containers(&self.id, self.containers.iter().chain([&container]))?;
        log::debug!("Registered container {} in {}", container.name, self.id);
        self.containers.push(container);
        Ok(())
    }

    /// Containers in registration order
    pub fn containers(&self) -> &[ContainerSpec] {
        &self.containers
    }

    #[cfg(test)]
    pub fn container(&self, name: &str) -> Option<&ContainerSpec> {
        self.containers.iter().find(|c| c.name == name)
    }

    /// Log groups the containers write to
    pub fn log_groups(&self) -> Vec<LogGroup> {
        self.containers
            .iter()
            .filter_map(|c| c.logging.as_ref())
            .map(super::container::LogSink::log_group)
            .collect()
    }
}

impl Resource for TaskDefinition {
    fn logical_id(&self) -> &LogicalId {
        &self.id
    }

    fn resource_type(&self) -> &'static str {
        "AWS::ECS::TaskDefinition"
    }

    fn description(&self) -> String {
        let names: Vec<&str> = self.containers.iter().map(|c| c.name.as_str()).collect();
        format!(
            "Fargate task {} cpu / {} MiB running [{}]",
            self.cpu,
            self.memory,
            names.join(", ")
        )
    }

    fn properties(&self) -> Value {
        let containers: Vec<Value> = self.containers.iter().map(ContainerSpec::to_json).collect();
        let role_arn = Token::attribute(self.role.clone(), "Arn");
        json!({
            "ContainerDefinitions": containers,
            "Cpu": self.cpu.to_string(),
            "Memory": self.memory.to_string(),
            "NetworkMode": self.network_mode.as_str(),
            "RequiresCompatibilities": ["FARGATE"],
            "TaskRoleArn": role_arn,
            "ExecutionRoleArn": role_arn,
        })
    }

    fn references(&self) -> Vec<LogicalId> {
        let mut refs = vec![self.role.clone()];
        refs.extend(self.containers.iter().flat_map(ContainerSpec::references));
        refs
    }

    fn validate(&self) -> Result<()> {
        let id = self.id.as_str();

        let Some(memory_options) = fargate_memory_options(self.cpu) else {
            return Err(Error::validation(
                id,
                format!("cpu {} is not a Fargate cpu size", self.cpu),
            ));
        };
        if !memory_options.contains(&self.memory) {
            return Err(Error::validation(
                id,
                format!(
                    "memory {} MiB is not allowed with cpu {}",
                    self.memory, self.cpu
                ),
            ));
        }
        if self.network_mode != NetworkMode::AwsVpc {
            return Err(Error::validation(id, "Fargate tasks require awsvpc network mode"));
        }
        if self.containers.is_empty() {
            return Err(Error::validation(id, "task definition has no containers"));
        }
        if !self.containers.iter().any(|c| c.essential) {
            return Err(Error::validation(id, "at least one container must be essential"));
        }
        for container in &self.containers {
            container.validate(self.network_mode)?;
        }
        check_containers(&self.id, &self.containers)
    }
}

/// Check that no port/protocol pair and no log group id is used twice
fn check_containers<'a>(
    task: &LogicalId,
    containers: impl IntoIterator<Item = &'a ContainerSpec>,
) -> Result<()> {
    let mut ports: BTreeMap<(u16, Protocol), &str> = BTreeMap::new();
    let mut log_groups: BTreeMap<&LogicalId, &str> = BTreeMap::new();

    for container in containers {
        for mapping in &container.port_mappings {
            let key = (mapping.container_port, mapping.protocol);
            if let Some(owner) = ports.insert(key, container.name.as_str()) {
                let message = if owner == container.name {
                    format!(
                        "port {}/{} is mapped twice by '{}'",
                        mapping.container_port,
                        mapping.protocol.as_str(),
                        container.name
                    )
                } else {
                    format!(
                        "port {}/{} of '{}' is already mapped by '{}'",
                        mapping.container_port,
                        mapping.protocol.as_str(),
                        container.name,
                        owner
                    )
                };
                return Err(Error::validation(task.as_str(), message));
            }
        }

        if let Some(sink) = &container.logging
            && let Some(owner) = log_groups.insert(&sink.log_group, container.name.as_str())
        {
            return Err(Error::validation(
                task.as_str(),
                format!(
                    "containers '{}' and '{}' both log to {}",
                    owner, container.name, sink.log_group
                ),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::container::PortMapping;
    use crate::resource::log_group::RetentionDays;

    fn task(cpu: u32, memory: u32) -> TaskDefinition {
        let mut task = TaskDefinition::new(LogicalId::new("Task"), LogicalId::new("Role"), cpu, memory);
        task.add_container(ContainerSpec::new("web", "nginx").port(PortMapping::tcp(80)))
            .unwrap();
        task
    }

    #[test]
    fn test_fargate_sizes() {
        assert!(task(512, 1024).validate().is_ok());
        assert!(task(256, 512).validate().is_ok());
        assert!(task(8192, 20480).validate().is_ok());
        assert!(task(16384, 122_880).validate().is_ok());
        assert!(task(512, 512).validate().is_err());
        assert!(task(256, 4096).validate().is_err());
        assert!(task(8192, 17408).validate().is_err());
        assert!(task(300, 1024).validate().is_err());
    }

    #[test]
    fn test_duplicate_container_rejected() {
        let mut task = task(512, 1024);
        let err = task
            .add_container(ContainerSpec::new("web", "other"))
            .unwrap_err();
        assert!(err.to_string().contains("already registered"));
        assert_eq!(task.containers().len(), 1);
    }

    #[test]
    fn test_port_clash_rejected() {
        let mut task = task(512, 1024);
        let err = task
            .add_container(ContainerSpec::new("proxy", "envoy").port(PortMapping::tcp(80)))
            .unwrap_err();
        assert!(err.to_string().contains("already mapped by 'web'"));

        // Same number on the other protocol is a different mapping
        task.add_container(ContainerSpec::new("dns", "coredns").port(PortMapping::udp(80)))
            .unwrap();
        assert_eq!(task.containers().len(), 2);
    }

    #[test]
    fn test_port_mapped_twice_by_one_container_rejected() {
        let mut web = ContainerSpec::new("api", "nginx");
        web.port_mappings.push(PortMapping::tcp(8080));
        web.port_mappings.push(PortMapping::tcp(8080));

        let mut task = task(512, 1024);
        let err = task.add_container(web.clone()).unwrap_err();
        assert!(err.to_string().contains("mapped twice by 'api'"));
        assert_eq!(task.containers().len(), 1);

        // Mappings edited after registration are caught by validation
        let mut task = TaskDefinition::new(LogicalId::new("Task"), LogicalId::new("Role"), 512, 1024);
        web.port_mappings.pop();
        task.add_container(web).unwrap();
        task.containers[0].port_mappings.push(PortMapping::tcp(8080));
        assert!(task.validate().is_err());
    }

    #[test]
    fn test_log_group_collision_rejected() {
        let mut task = TaskDefinition::new(LogicalId::new("Task"), LogicalId::new("Role"), 512, 1024);
        let logged = |name: &str, prefix: &str| {
            ContainerSpec::new(name, "nginx").logging(RetentionDays::OneWeek, prefix)
        };
        task.add_container(logged("web-app", "/ecs/a")).unwrap();

        let err = task
            .add_container(logged("web_app", "/ecs/b"))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid Task: containers 'web-app' and 'web_app' both log to WebAppLogGroup"
        );

        let err = task
            .add_container(logged("WebApp", "/ecs/c"))
            .unwrap_err();
        assert!(err.to_string().contains("both log to WebAppLogGroup"));
        assert_eq!(task.log_groups().len(), 1);

        // Without a log sink the name alone does not collide
        task.add_container(ContainerSpec::new("WebApp", "nginx")).unwrap();
        assert!(task.validate().is_ok());
    }

    #[test]
    fn test_invalid_container_name_fails_validation() {
        let mut task = TaskDefinition::new(LogicalId::new("Task"), LogicalId::new("Role"), 512, 1024);
        task.add_container(ContainerSpec::new("web app", "nginx")).unwrap();
        let err = task.validate().unwrap_err();
        assert!(err.to_string().contains("container name must be"));
    }

    #[test]
    fn test_registration_order_and_lookup() {
        let mut task = task(512, 1024);
        task.add_container(ContainerSpec::new("sidecar", "collector")).unwrap();
        let names: Vec<_> = task.containers().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["web", "sidecar"]);
        assert!(task.container("sidecar").is_some());
        assert!(task.container("missing").is_none());
    }

    #[test]
    fn test_requires_containers_and_essential() {
        let empty = TaskDefinition::new(LogicalId::new("Task"), LogicalId::new("Role"), 512, 1024);
        assert!(empty.validate().is_err());

        let mut optional = TaskDefinition::new(LogicalId::new("Task"), LogicalId::new("Role"), 512, 1024);
        optional
            .add_container(ContainerSpec::new("web", "nginx").essential(false))
            .unwrap();
        assert!(optional.validate().is_err());
    }

    #[test]
    fn test_render_and_references() {
        let mut task = task(512, 1024);
        task.add_container(
            ContainerSpec::new("sidecar", "collector").logging(RetentionDays::OneWeek, "/ecs/side"),
        )
        .unwrap();

        let props = task.properties();
        assert_eq!(props["Cpu"], "512");
        assert_eq!(props["Memory"], "1024");
        assert_eq!(props["NetworkMode"], "awsvpc");
        assert_eq!(props["RequiresCompatibilities"], json!(["FARGATE"]));
        assert_eq!(props["TaskRoleArn"], json!({ "Fn::GetAtt": ["Role", "Arn"] }));
        assert_eq!(props["ContainerDefinitions"].as_array().unwrap().len(), 2);

        assert_eq!(
            task.references(),
            vec![LogicalId::new("Role"), LogicalId::new("SidecarLogGroup")]
        );
        assert_eq!(task.log_groups().len(), 1);
    }
}
