//! Summaries of a declared stack

use crate::resource::Resource;
use crate::stack::Stack;
use std::collections::BTreeMap;

/// Resource counts for a stack
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackSummary {
    /// Number of resources per resource type
    pub by_type: BTreeMap<String, usize>,
    /// Number of outputs
    pub outputs: usize,
    /// Number of unresolved lookups
    pub missing_lookups: usize,
}

impl StackSummary {
    /// Total number of resources
    pub fn total(&self) -> usize {
        self.by_type.values().sum()
    }

    /// Count of a single resource type
    pub fn count(&self, resource_type: &str) -> usize {
        self.by_type.get(resource_type).copied().unwrap_or(0)
    }

    /// Whether every lookup was resolved
    pub fn is_resolved(&self) -> bool {
        self.missing_lookups == 0
    }
}

/// Count the resources of a stack by type
pub fn summarize(stack: &Stack) -> StackSummary {
    let mut summary = StackSummary {
        outputs: stack.outputs().len(),
        missing_lookups: stack.missing_lookups().len(),
        ..Default::default()
    };
    for resource in stack.resources() {
        *summary
            .by_type
            .entry(resource.resource_type().to_string())
            .or_default() += 1;
    }
    summary
}

/// Group resources by type, keeping declaration order within each group
pub fn group_by_type<'a>(
    resources: &[&'a dyn Resource],
) -> BTreeMap<&'static str, Vec<&'a dyn Resource>> {
    let mut groups: BTreeMap<&'static str, Vec<&'a dyn Resource>> = BTreeMap::new();
    for resource in resources {
        groups.entry(resource.resource_type()).or_default().push(*resource);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LogicalId;
    use serde_json::{Value, json};

    #[derive(Debug)]
    struct Fake(LogicalId, &'static str);

    impl Resource for Fake {
        fn logical_id(&self) -> &LogicalId {
            &self.0
        }

        fn resource_type(&self) -> &'static str {
            self.1
        }

        fn description(&self) -> String {
            String::new()
        }

        fn properties(&self) -> Value {
            json!({})
        }
    }

    #[test]
    fn test_summarize_and_group() {
        let mut stack = Stack::new("Test");
        stack.add(Fake(LogicalId::new("A"), "AWS::Logs::LogGroup")).unwrap();
        stack.add(Fake(LogicalId::new("B"), "AWS::Logs::LogGroup")).unwrap();
        stack.add(Fake(LogicalId::new("C"), "AWS::ECS::Service")).unwrap();
        stack.report_missing_lookup("vpc");

        let summary = summarize(&stack);
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.count("AWS::Logs::LogGroup"), 2);
        assert_eq!(summary.count("AWS::IAM::Role"), 0);
        assert!(!summary.is_resolved());

        let all = stack.filter_by_target(None);
        let groups = group_by_type(&all);
        assert_eq!(groups.len(), 2);
        let logs: Vec<_> = groups["AWS::Logs::LogGroup"]
            .iter()
            .map(|r| r.logical_id().as_str())
            .collect();
        assert_eq!(logs, ["A", "B"]);
    }
}
