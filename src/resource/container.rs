//! Container specification - one container inside a task definition
//!
//! Containers are not standalone resources; they are rendered into their
//! task definition's `ContainerDefinitions`. A container's log sink does
//! produce a standalone [`LogGroup`].

use construct::{Error, LogicalId, Pseudo, Result, Token};
use regex::Regex;
use serde_json::{Map, Value, json};
use std::sync::LazyLock;
use std::time::Duration;

use super::log_group::{LogGroup, RetentionDays};
use super::task_definition::NetworkMode;

static CONTAINER_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,255}$").expect("valid regex"));

/// Transport protocol of a port mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
        }
    }
}

/// A port exposed by a container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortMapping {
    pub container_port: u16,
    pub host_port: u16,
    pub protocol: Protocol,
}

impl PortMapping {
    /// Map a port to the same host port
    pub fn new(port: u16, protocol: Protocol) -> Self {
        Self {
            container_port: port,
            host_port: port,
            protocol,
        }
    }

    pub fn tcp(port: u16) -> Self {
        Self::new(port, Protocol::Tcp)
    }

    pub fn udp(port: u16) -> Self {
        Self::new(port, Protocol::Udp)
    }

    fn to_json(self) -> Value {
        json!({
            "ContainerPort": self.container_port,
            "HostPort": self.host_port,
            "Protocol": self.protocol.as_str(),
        })
    }
}

/// Container liveness probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheck {
    /// Probe command, starting with `CMD` or `CMD-SHELL`
    pub command: Vec<String>,
    pub timeout: Duration,
    pub start_period: Duration,
    pub interval: Duration,
    pub retries: u32,
}

impl HealthCheck {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
    pub const DEFAULT_RETRIES: u32 = 3;

    /// Probe that runs a command through the container's shell
    pub fn shell(command: &str) -> Self {
        Self {
            command: vec!["CMD-SHELL".to_string(), command.to_string()],
            timeout: Self::DEFAULT_TIMEOUT,
            start_period: Duration::ZERO,
            interval: Self::DEFAULT_INTERVAL,
            retries: Self::DEFAULT_RETRIES,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_start_period(mut self, start_period: Duration) -> Self {
        self.start_period = start_period;
        self
    }

    fn validate(&self, container: &str) -> Result<()> {
        let invalid = |message: String| Err(Error::validation(container, message));

        match self.command.first().map(String::as_str) {
            Some("CMD" | "CMD-SHELL") if self.command.len() > 1 => {}
            _ => {
                return invalid(
                    "health check command must start with CMD or CMD-SHELL followed by a command"
                        .to_string(),
                );
            }
        }
        let bounds = [
            ("timeout", self.timeout, 2, 120),
            ("start period", self.start_period, 0, 300),
            ("interval", self.interval, 5, 300),
        ];
        for (field, value, min, max) in bounds {
            if value.subsec_nanos() != 0 {
                return invalid(format!(
                    "health check {field} {value:?} is not a whole number of seconds"
                ));
            }
            if !(min..=max).contains(&value.as_secs()) {
                return invalid(format!(
                    "health check {field} {}s outside {min}-{max}s",
                    value.as_secs()
                ));
            }
        }
        if !(1..=10).contains(&self.retries) {
            return invalid(format!("health check retries {} outside 1-10", self.retries));
        }
        Ok(())
    }

    fn to_json(&self) -> Value {
        json!({
            "Command": self.command,
            "Interval": self.interval.as_secs(),
            "Retries": self.retries,
            "StartPeriod": self.start_period.as_secs(),
            "Timeout": self.timeout.as_secs(),
        })
    }
}

/// Log driver configuration writing to a stack-owned log group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSink {
    pub log_group: LogicalId,
    pub retention: RetentionDays,
    pub stream_prefix: String,
}

impl LogSink {
    /// The log group this sink writes to
    pub fn log_group(&self) -> LogGroup {
        LogGroup {
            id: self.log_group.clone(),
            retention: self.retention,
        }
    }

    fn to_json(&self) -> Value {
        json!({
            "LogDriver": "awslogs",
            "Options": {
                "awslogs-group": Token::Ref(self.log_group.clone()),
                "awslogs-stream-prefix": self.stream_prefix,
                "awslogs-region": Token::Pseudo(Pseudo::Region),
            },
        })
    }
}

/// A container running inside a task definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub essential: bool,
    pub command: Vec<String>,
    pub port_mappings: Vec<PortMapping>,
    pub health_check: Option<HealthCheck>,
    pub logging: Option<LogSink>,
}

impl ContainerSpec {
    /// Create an essential container with no ports, probe or log sink
    pub fn new(name: &str, image: &str) -> Self {
        Self {
            name: name.to_string(),
            image: image.to_string(),
            essential: true,
            command: Vec::new(),
            port_mappings: Vec::new(),
            health_check: None,
            logging: None,
        }
    }

    pub fn essential(mut self, essential: bool) -> Self {
        self.essential = essential;
        self
    }

    pub fn command<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = args.into_iter().map(Into::into).collect();
        self
    }

    /// Add a port mapping; an identical mapping is only kept once
    pub fn port(mut self, mapping: PortMapping) -> Self {
        if !self.port_mappings.contains(&mapping) {
            self.port_mappings.push(mapping);
        }
        self
    }

    pub fn health_check(mut self, health_check: HealthCheck) -> Self {
        self.health_check = Some(health_check);
        self
    }

    /// Send container logs to a log group derived from the container name
    pub fn logging(mut self, retention: RetentionDays, stream_prefix: &str) -> Self {
        self.logging = Some(LogSink {
            log_group: LogicalId::from_label(&self.name).child("LogGroup"),
            retention,
            stream_prefix: stream_prefix.to_string(),
        });
        self
    }

    /// Logical ids this container points at
    pub fn references(&self) -> Vec<LogicalId> {
        self.logging
            .iter()
            .map(|sink| sink.log_group.clone())
            .collect()
    }

    /// Check the container parameters under the given network mode
    pub fn validate(&self, network_mode: NetworkMode) -> Result<()> {
        if !CONTAINER_NAME.is_match(&self.name) {
            return Err(Error::validation(
                &self.name,
                "container name must be 1-255 letters, digits, hyphens or underscores",
            ));
        }
        if self.image.trim().is_empty() {
            return Err(Error::validation(&self.name, "container image is empty"));
        }

        for mapping in &self.port_mappings {
            if mapping.container_port == 0 {
                return Err(Error::validation(&self.name, "container port must be non-zero"));
            }
            if network_mode == NetworkMode::AwsVpc && mapping.host_port != mapping.container_port
            {
                return Err(Error::validation(
                    &self.name,
                    format!(
                        "host port {} must equal container port {} in awsvpc mode",
                        mapping.host_port, mapping.container_port
                    ),
                ));
            }
        }

        if let Some(health_check) = &self.health_check {
            health_check.validate(&self.name)?;
        }

        if let Some(sink) = &self.logging
            && sink.stream_prefix.trim().is_empty()
        {
            return Err(Error::validation(&self.name, "log stream prefix is empty"));
        }

        Ok(())
    }

    /// Render the container definition
    pub fn to_json(&self) -> Value {
        let mut def = Map::new();
        def.insert("Name".to_string(), json!(self.name));
        def.insert("Image".to_string(), json!(self.image));
        def.insert("Essential".to_string(), json!(self.essential));
        if !self.command.is_empty() {
            def.insert("Command".to_string(), json!(self.command));
        }
        if !self.port_mappings.is_empty() {
            let mappings: Vec<Value> = self.port_mappings.iter().map(|m| m.to_json()).collect();
            def.insert("PortMappings".to_string(), Value::Array(mappings));
        }
        if let Some(health_check) = &self.health_check {
            def.insert("HealthCheck".to_string(), health_check.to_json());
        }
        if let Some(sink) = &self.logging {
            def.insert("LogConfiguration".to_string(), sink.to_json());
        }
        Value::Object(def)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn web() -> ContainerSpec {
        ContainerSpec::new("web", "nginx:latest")
            .port(PortMapping::tcp(80))
            .health_check(
                HealthCheck::shell("curl -f http://127.0.0.1/ || exit 1")
                    .with_timeout(Duration::from_secs(10))
                    .with_start_period(Duration::from_secs(10)),
            )
            .logging(RetentionDays::OneWeek, "/ecs/web")
    }

    #[test]
    fn test_valid_container() {
        assert!(web().validate(NetworkMode::AwsVpc).is_ok());
    }

    #[test]
    fn test_duplicate_port_kept_once() {
        let container = web().port(PortMapping::tcp(80)).port(PortMapping::udp(80));
        assert_eq!(container.port_mappings.len(), 2);
    }

    #[test]
    fn test_log_group_derived_from_name() {
        let container = ContainerSpec::new("otelContainer", "collector")
            .logging(RetentionDays::OneWeek, "/ecs/otel");
        assert_eq!(
            container.references(),
            vec![LogicalId::new("OtelContainerLogGroup")]
        );
        let group = container.logging.unwrap().log_group();
        assert_eq!(group.retention, RetentionDays::OneWeek);
    }

    #[test]
    fn test_host_port_must_match_in_awsvpc() {
        let mut container = web();
        container.port_mappings[0].host_port = 8080;
        assert!(container.validate(NetworkMode::AwsVpc).is_err());
        assert!(container.validate(NetworkMode::Bridge).is_ok());
    }

    #[test]
    fn test_zero_port_rejected() {
        let container = ContainerSpec::new("web", "nginx").port(PortMapping::tcp(0));
        assert!(container.validate(NetworkMode::AwsVpc).is_err());
    }

    #[test]
    fn test_bad_name_and_image_rejected() {
        assert!(
            ContainerSpec::new("web app", "nginx")
                .validate(NetworkMode::AwsVpc)
                .is_err()
        );
        assert!(
            ContainerSpec::new("web", " ")
                .validate(NetworkMode::AwsVpc)
                .is_err()
        );
    }

    #[test]
    fn test_health_check_bounds() {
        let checked = |hc: HealthCheck| ContainerSpec::new("web", "nginx").health_check(hc);

        let too_fast = HealthCheck::shell("true").with_timeout(Duration::from_secs(1));
        assert!(checked(too_fast).validate(NetworkMode::AwsVpc).is_err());

        let too_slow = HealthCheck::shell("true").with_start_period(Duration::from_secs(301));
        assert!(checked(too_slow).validate(NetworkMode::AwsVpc).is_err());

        let mut no_prefix = HealthCheck::shell("true");
        no_prefix.command = vec!["curl".to_string(), "localhost".to_string()];
        assert!(checked(no_prefix).validate(NetworkMode::AwsVpc).is_err());

        let mut bare = HealthCheck::shell("true");
        bare.command.truncate(1);
        assert!(checked(bare).validate(NetworkMode::AwsVpc).is_err());

        let mut retries = HealthCheck::shell("true");
        retries.retries = 0;
        assert!(checked(retries).validate(NetworkMode::AwsVpc).is_err());

        let longest = HealthCheck::shell("true").with_timeout(Duration::from_secs(120));
        assert!(checked(longest).validate(NetworkMode::AwsVpc).is_ok());

        let too_long = HealthCheck::shell("true").with_timeout(Duration::from_secs(121));
        assert!(checked(too_long).validate(NetworkMode::AwsVpc).is_err());
    }

    #[test]
    fn test_health_check_interval_bounds() {
        let with_interval = |secs: u64| {
            let mut hc = HealthCheck::shell("true");
            hc.interval = Duration::from_secs(secs);
            ContainerSpec::new("web", "nginx").health_check(hc)
        };

        assert!(with_interval(5).validate(NetworkMode::AwsVpc).is_ok());
        assert!(with_interval(300).validate(NetworkMode::AwsVpc).is_ok());
        assert!(with_interval(4).validate(NetworkMode::AwsVpc).is_err());
        assert!(with_interval(301).validate(NetworkMode::AwsVpc).is_err());
    }

    #[test]
    fn test_health_check_rejects_fractional_seconds() {
        let fractional = HealthCheck::shell("true").with_timeout(Duration::from_millis(120_900));
        let err = ContainerSpec::new("web", "nginx")
            .health_check(fractional)
            .validate(NetworkMode::AwsVpc)
            .unwrap_err();
        assert!(err.to_string().contains("whole number of seconds"));

        let fractional = HealthCheck::shell("true").with_start_period(Duration::from_millis(1500));
        assert!(
            ContainerSpec::new("web", "nginx")
                .health_check(fractional)
                .validate(NetworkMode::AwsVpc)
                .is_err()
        );
    }

    #[test]
    fn test_empty_stream_prefix_rejected() {
        let container = ContainerSpec::new("web", "nginx").logging(RetentionDays::OneDay, "");
        assert!(container.validate(NetworkMode::AwsVpc).is_err());
    }

    #[test]
    fn test_render_container() {
        let rendered = web().command(["--flag"]).to_json();
        assert_eq!(rendered["Name"], "web");
        assert_eq!(rendered["Essential"], true);
        assert_eq!(rendered["Command"], json!(["--flag"]));
        assert_eq!(
            rendered["PortMappings"],
            json!([{ "ContainerPort": 80, "HostPort": 80, "Protocol": "tcp" }])
        );
        assert_eq!(rendered["HealthCheck"]["Timeout"], 10);
        assert_eq!(rendered["HealthCheck"]["StartPeriod"], 10);
        assert_eq!(
            rendered["LogConfiguration"]["Options"]["awslogs-group"],
            json!({ "Ref": "WebLogGroup" })
        );
        assert_eq!(
            rendered["LogConfiguration"]["Options"]["awslogs-region"],
            json!({ "Ref": "AWS::Region" })
        );
    }
}
