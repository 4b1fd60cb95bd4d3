//! Security group resource - the traffic boundary around the service's tasks

use construct::{Error, LogicalId, Resource, Result};
use serde_json::{Value, json};

/// A security group scoped to an existing network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityGroupSpec {
    pub id: LogicalId,
    pub name: String,
    pub description: String,
    /// Id of the pre-existing network the group lives in
    pub vpc_id: String,
    pub allow_all_outbound: bool,
}

impl Resource for SecurityGroupSpec {
    fn logical_id(&self) -> &LogicalId {
        &self.id
    }

    fn resource_type(&self) -> &'static str {
        "AWS::EC2::SecurityGroup"
    }

    fn description(&self) -> String {
        format!("Security group {} in {}", self.name, self.vpc_id)
    }

    fn properties(&self) -> Value {
        let egress = if self.allow_all_outbound {
            json!([{
                "CidrIp": "0.0.0.0/0",
                "Description": "Allow all outbound traffic by default",
                "IpProtocol": "-1",
            }])
        } else {
            json!([])
        };
        json!({
            "GroupDescription": self.description,
            "GroupName": self.name,
            "SecurityGroupEgress": egress,
            "VpcId": self.vpc_id,
        })
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() || self.name.len() > 255 {
            return Err(Error::validation(
                self.id.as_str(),
                "group name must be 1-255 characters",
            ));
        }
        if self.name.to_lowercase().starts_with("sg-") {
            return Err(Error::validation(
                self.id.as_str(),
                "group name cannot start with sg-",
            ));
        }
        if self.vpc_id.trim().is_empty() {
            return Err(Error::validation(self.id.as_str(), "group has no network"));
        }
        Ok(())
    }
}
