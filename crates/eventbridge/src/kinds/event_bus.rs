//! Event buses
//!
//! A bus has no update call: everything but its tags is fixed at creation.

use super::{require_name, validate_tags};
use crate::types::{ResourceMetadata, Tag};
use declarative::{Delta, Equivalence, Field, ResourceKind, Schema, ValidationError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBusSpec {
    pub name: String,
    /// Partner event source the bus is matched with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_source_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventBusStatus {
    #[serde(rename = "ackResourceMetadata", default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResourceMetadata>,
}

impl EventBusStatus {
    pub fn arn(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.arn.as_deref())
    }
}

/// Placeholder request; buses never issue an update call
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NoUpdate {}

/// `CreateEventBus` input
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventBusInput {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_source_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

impl From<&EventBusSpec> for CreateEventBusInput {
    fn from(spec: &EventBusSpec) -> Self {
        Self {
            name: spec.name.clone(),
            event_source_name: crate::types::non_empty(spec.event_source_name.as_deref()),
            tags: spec.tags.clone(),
        }
    }
}

/// `DescribeEventBus` output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBusDescription {
    pub arn: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_source_name: Option<String>,
}

const FIELDS: &[Field] = &[
    Field::scalar("Name", "name", Equivalence::Strict),
    Field::scalar("EventSourceName", "eventSourceName", Equivalence::NilEmpty),
    Field::keyed("Tags", "tags", "key", Equivalence::NilEmpty),
];

static SCHEMA: Schema = Schema::new("Spec", FIELDS);

#[derive(Debug, Clone, Copy, Default)]
pub struct EventBusKind;

impl ResourceKind for EventBusKind {
    type Spec = EventBusSpec;
    type Status = EventBusStatus;
    type Request = NoUpdate;

    const KIND: &'static str = "EventBus";
    const SUPPORTS_UPDATE: bool = false;

    fn schema() -> &'static Schema {
        &SCHEMA
    }

    fn immutable_fields() -> &'static [&'static str] {
        &["Spec.Name", "Spec.EventSourceName"]
    }

    fn sub_collections() -> &'static [&'static str] {
        &["Spec.Tags"]
    }

    fn validate(spec: &EventBusSpec, _delta: Option<&Delta>) -> Result<(), ValidationError> {
        require_name("spec.name", &spec.name)?;
        validate_tags(&spec.tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{Snapshot, Step, UpdatePlan, plan};

    fn bus(tags: Vec<Tag>) -> Snapshot<EventBusSpec, EventBusStatus> {
        Snapshot::new(
            "orders",
            EventBusSpec {
                name: "orders".into(),
                event_source_name: None,
                tags,
            },
        )
    }

    #[test]
    fn test_empty_source_name_is_in_sync() {
        let desired = bus(vec![]);
        let mut latest = bus(vec![]);
        latest.spec.event_source_name = Some(String::new());
        assert_eq!(
            plan::<EventBusKind>(Some(&desired), Some(&latest)).unwrap(),
            Step::Done(declarative::Outcome::InSync)
        );
    }

    #[test]
    fn test_tag_change_syncs_without_update_call() {
        let desired = bus(vec![Tag::new("team", "payments")]);
        let latest = bus(vec![]);
        match plan::<EventBusKind>(Some(&desired), Some(&latest)).unwrap() {
            Step::Update {
                plan: UpdatePlan {
                    request, collections, ..
                },
                ..
            } => {
                assert!(request.is_none());
                assert_eq!(collections, vec!["Spec.Tags"]);
            }
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn test_source_name_is_immutable() {
        let mut desired = bus(vec![]);
        desired.spec.event_source_name = Some("aws.partner/saas/orders".into());
        let latest = bus(vec![]);
        match plan::<EventBusKind>(Some(&desired), Some(&latest)).unwrap() {
            Step::Done(outcome) => assert!(outcome.is_terminal()),
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn test_validate_requires_name() {
        let spec = EventBusSpec::default();
        assert!(EventBusKind::validate(&spec, None).is_err());
    }
}
