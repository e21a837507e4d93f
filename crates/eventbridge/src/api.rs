//! EventBridge API surface.
//!
//! The [`EventBridgeApi`] trait lists the remote calls the reconciler needs,
//! allowing for different implementations (the service, an in-memory
//! sandbox for the CLI and tests).

use crate::error::Result;
use crate::kinds::archive::{ArchiveDescription, CreateArchiveInput, UpdateArchiveInput};
use crate::kinds::endpoint::{EndpointDescription, EndpointInput};
use crate::kinds::event_bus::{CreateEventBusInput, EventBusDescription};
use crate::kinds::rule::{PutRuleInput, RuleDescription};
use crate::types::{Tag, Target};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Remote calls, as recorded in call logs and error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    DescribeEventBus,
    CreateEventBus,
    DeleteEventBus,
    DescribeRule,
    PutRule,
    DeleteRule,
    ListTargetsByRule,
    PutTargets,
    RemoveTargets,
    DescribeArchive,
    CreateArchive,
    UpdateArchive,
    DeleteArchive,
    DescribeEndpoint,
    CreateEndpoint,
    UpdateEndpoint,
    DeleteEndpoint,
    ListTagsForResource,
    TagResource,
    UntagResource,
}

impl Operation {
    /// Whether the call only reads.
    pub fn is_read(&self) -> bool {
        matches!(
            self,
            Self::DescribeEventBus
                | Self::DescribeRule
                | Self::ListTargetsByRule
                | Self::DescribeArchive
                | Self::DescribeEndpoint
                | Self::ListTagsForResource
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Synchronous EventBridge client.
///
/// `describe_*` calls return `Ok(None)` for a missing resource; every
/// other call reports a missing resource as a `ResourceNotFoundException`.
pub trait EventBridgeApi: Send + Sync {
    // Event buses

    fn describe_event_bus(&self, name: &str) -> Result<Option<EventBusDescription>>;

    /// Create a bus and return its ARN.
    fn create_event_bus(&self, input: &CreateEventBusInput) -> Result<String>;

    fn delete_event_bus(&self, name: &str) -> Result<()>;

    // Rules

    fn describe_rule(&self, name: &str, event_bus: &str) -> Result<Option<RuleDescription>>;

    /// Create or replace a rule and return its ARN.
    fn put_rule(&self, input: &PutRuleInput) -> Result<String>;

    fn delete_rule(&self, name: &str, event_bus: &str) -> Result<()>;

    fn list_targets_by_rule(&self, rule: &str, event_bus: &str) -> Result<Vec<Target>>;

    /// Add targets, replacing any with the same id.
    fn put_targets(&self, rule: &str, event_bus: &str, targets: &[Target]) -> Result<()>;

    fn remove_targets(&self, rule: &str, event_bus: &str, ids: &[String]) -> Result<()>;

    // Archives

    fn describe_archive(&self, name: &str) -> Result<Option<ArchiveDescription>>;

    /// Start creating an archive and return its ARN.
    fn create_archive(&self, input: &CreateArchiveInput) -> Result<String>;

    fn update_archive(&self, input: &UpdateArchiveInput) -> Result<()>;

    fn delete_archive(&self, name: &str) -> Result<()>;

    // Endpoints

    fn describe_endpoint(&self, name: &str) -> Result<Option<EndpointDescription>>;

    /// Start creating an endpoint and return its ARN.
    fn create_endpoint(&self, input: &EndpointInput) -> Result<String>;

    fn update_endpoint(&self, input: &EndpointInput) -> Result<()>;

    fn delete_endpoint(&self, name: &str) -> Result<()>;

    // Tags

    fn list_tags_for_resource(&self, arn: &str) -> Result<Vec<Tag>>;

    /// Add tags, overwriting the values of existing keys.
    fn tag_resource(&self, arn: &str, tags: &[Tag]) -> Result<()>;

    fn untag_resource(&self, arn: &str, keys: &[String]) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_display() {
        assert_eq!(Operation::PutTargets.to_string(), "PutTargets");
    }

    #[test]
    fn test_reads() {
        assert!(Operation::ListTagsForResource.is_read());
        assert!(!Operation::UntagResource.is_read());
    }
}
