//! Log group resource - the sink a container's log driver writes to

use construct::{LogicalId, Resource};
use serde_json::{Value, json};

/// Retention periods accepted by the logging service
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionDays {
    OneDay,
    ThreeDays,
    FiveDays,
    OneWeek,
    TwoWeeks,
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
}

impl RetentionDays {
    pub fn days(&self) -> u32 {
        match self {
            Self::OneDay => 1,
            Self::ThreeDays => 3,
            Self::FiveDays => 5,
            Self::OneWeek => 7,
            Self::TwoWeeks => 14,
            Self::OneMonth => 30,
            Self::ThreeMonths => 90,
            Self::SixMonths => 180,
            Self::OneYear => 365,
        }
    }
}

/// A log group owned by the stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogGroup {
    pub id: LogicalId,
    pub retention: RetentionDays,
}

impl Resource for LogGroup {
    fn logical_id(&self) -> &LogicalId {
        &self.id
    }

    fn resource_type(&self) -> &'static str {
        "AWS::Logs::LogGroup"
    }

    fn description(&self) -> String {
        format!("Log group retained {} days", self.retention.days())
    }

    fn properties(&self) -> Value {
        json!({ "RetentionInDays": self.retention.days() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_group_properties() {
        let group = LogGroup {
            id: LogicalId::new("ApiLogGroup"),
            retention: RetentionDays::OneWeek,
        };
        assert_eq!(group.properties(), json!({ "RetentionInDays": 7 }));
        assert!(group.references().is_empty());
    }
}
