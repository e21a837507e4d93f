//! Archives
//!
//! Archives keep a copy of the events sent to a bus. Creation and updates
//! are asynchronous: the archive sits in `CREATING`/`UPDATING` until the
//! service finishes, and no change may be applied meanwhile.

use super::require_name;
use crate::arn::Arn;
use crate::types::ResourceMetadata;
use chrono::{DateTime, Utc};
use declarative::{
    CompareHook, Delta, Equivalence, Field, ResourceKind, ResourceReference, Schema, StateTable,
    ValidationError,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveSpec {
    pub archive_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_pattern: Option<String>,
    /// ARN of the archived bus
    #[serde(rename = "eventSourceARN", default, skip_serializing_if = "Option::is_none")]
    pub event_source_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_source_ref: Option<ResourceReference>,
    /// Zero or absent keeps events indefinitely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_days: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveStatus {
    #[serde(rename = "ackResourceMetadata", default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResourceMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_reason: Option<String>,
}

impl ArchiveStatus {
    pub fn arn(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.arn.as_deref())
    }
}

/// `CreateArchive` input
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateArchiveInput {
    pub archive_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_pattern: Option<String>,
    #[serde(rename = "eventSourceARN")]
    pub event_source_arn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_days: Option<i64>,
}

impl From<&ArchiveSpec> for CreateArchiveInput {
    fn from(spec: &ArchiveSpec) -> Self {
        Self {
            archive_name: spec.archive_name.clone(),
            description: spec.description.clone(),
            event_pattern: crate::types::non_empty(spec.event_pattern.as_deref()),
            event_source_arn: spec.event_source_arn.clone().unwrap_or_default(),
            retention_days: spec.retention_days,
        }
    }
}

/// `UpdateArchive` input; absent fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateArchiveInput {
    pub archive_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_days: Option<i64>,
}

/// `DescribeArchive` output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveDescription {
    #[serde(rename = "archiveARN")]
    pub archive_arn: String,
    pub archive_name: String,
    pub description: String,
    pub event_pattern: String,
    #[serde(rename = "eventSourceARN")]
    pub event_source_arn: String,
    pub retention_days: i64,
    pub state: String,
    pub state_reason: String,
    pub creation_time: DateTime<Utc>,
}

const FIELDS: &[Field] = &[
    Field::scalar("ArchiveName", "archiveName", Equivalence::Strict),
    Field::scalar("Description", "description", Equivalence::NilEmpty),
    Field::scalar("EventPattern", "eventPattern", Equivalence::NilEmpty),
    Field::scalar("EventSourceARN", "eventSourceARN", Equivalence::Strict),
    Field::opaque("EventSourceRef", "eventSourceRef"),
    Field::scalar("RetentionDays", "retentionDays", Equivalence::Strict),
];

static SCHEMA: Schema = Schema::new("Spec", FIELDS);

static STATES: StateTable = StateTable::new(
    &["CREATING", "UPDATING"],
    &["ENABLED", "DISABLED"],
    &["CREATE_FAILED", "UPDATE_FAILED"],
);

/// Absent retention and zero retention both mean "keep forever".
fn compare_retention(desired: &ArchiveSpec, latest: &ArchiveSpec, delta: &mut Delta) {
    let desired_days = desired.retention_days.unwrap_or(0);
    let latest_days = latest.retention_days.unwrap_or(0);
    if desired_days != latest_days {
        delta.add(
            "Spec.RetentionDays",
            desired.retention_days.into(),
            latest.retention_days.into(),
        );
    }
}

static HOOKS: [CompareHook<ArchiveSpec>; 1] = [CompareHook {
    paths: &["Spec.RetentionDays"],
    compare: compare_retention,
}];

#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveKind;

impl ResourceKind for ArchiveKind {
    type Spec = ArchiveSpec;
    type Status = ArchiveStatus;
    type Request = UpdateArchiveInput;

    const KIND: &'static str = "Archive";

    fn schema() -> &'static Schema {
        &SCHEMA
    }

    fn compare_hooks() -> &'static [CompareHook<ArchiveSpec>] {
        &HOOKS
    }

    fn immutable_fields() -> &'static [&'static str] {
        &["Spec.ArchiveName", "Spec.EventSourceARN"]
    }

    fn lifecycle() -> Option<&'static StateTable> {
        Some(&STATES)
    }

    fn lifecycle_state(status: &ArchiveStatus) -> Option<&str> {
        status.state.as_deref()
    }

    fn validate(spec: &ArchiveSpec, _delta: Option<&Delta>) -> Result<(), ValidationError> {
        require_name("spec.archiveName", &spec.archive_name)?;
        if let Some(arn) = spec.event_source_arn.as_deref().filter(|s| !s.is_empty())
            && Arn::parse(arn).is_err()
        {
            return Err(ValidationError::field(
                "spec.eventSourceARN",
                format!("invalid arn {arn:?}"),
            ));
        }
        if spec.retention_days.is_some_and(|days| days < 0) {
            return Err(ValidationError::field(
                "spec.retentionDays",
                "must not be negative",
            ));
        }
        Ok(())
    }
}
