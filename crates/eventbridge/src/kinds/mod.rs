//! Resource kinds
//!
//! One module per resource type. Each defines the spec and status types,
//! the request payloads of its API calls, and a zero-sized strategy type
//! implementing [`declarative::ResourceKind`].

pub mod archive;
pub mod endpoint;
pub mod event_bus;
pub mod rule;

pub use archive::{ArchiveKind, ArchiveSpec, ArchiveStatus};
pub use endpoint::{EndpointKind, EndpointSpec, EndpointStatus};
pub use event_bus::{EventBusKind, EventBusSpec, EventBusStatus};
pub use rule::{RuleKind, RuleSpec, RuleStatus};

use crate::types::Tag;
use declarative::collection::duplicate_key;
use declarative::{ResourceKind, ValidationError, normalize_kind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The managed resource types, in dependency order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceType {
    EventBus,
    Rule,
    Archive,
    Endpoint,
}

impl ResourceType {
    /// Every type, in the order they are reconciled
    pub const ALL: [Self; 4] = [Self::EventBus, Self::Rule, Self::Archive, Self::Endpoint];

    /// Kind name
    pub fn name(&self) -> &'static str {
        match self {
            Self::EventBus => EventBusKind::KIND,
            Self::Rule => RuleKind::KIND,
            Self::Archive => ArchiveKind::KIND,
            Self::Endpoint => EndpointKind::KIND,
        }
    }

    /// Execution stage; rules and archives reference buses, so buses go
    /// first.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::EventBus => "event buses",
            Self::Rule | Self::Archive => "rules and archives",
            Self::Endpoint => "endpoints",
        }
    }

    /// Look a type up by name or alias (`bus`, `event-buses`, `rules`, ...).
    pub fn parse(name: &str) -> Option<Self> {
        let wanted = normalize_kind(name);
        Self::ALL
            .into_iter()
            .find(|t| normalize_kind(t.name()) == wanted)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

pub(crate) fn require_name(field: &str, name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::field(field, "must be set"));
    }
    Ok(())
}

pub(crate) fn validate_tags(tags: &[Tag]) -> Result<(), ValidationError> {
    if tags.iter().any(|t| t.key.as_deref().is_none_or(str::is_empty)) {
        return Err(ValidationError::field("spec.tags", "tag key must be set"));
    }
    if let Some(key) = duplicate_key(tags) {
        return Err(ValidationError::field(
            "spec.tags",
            format!("duplicate tag key {key:?}"),
        ));
    }
    Ok(())
}
