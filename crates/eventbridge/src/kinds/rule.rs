//! Rules
//!
//! Rule fields are written with `PutRule`, which replaces the whole rule.
//! Tags and targets have their own calls and are synced separately.

use super::{require_name, validate_tags};
use crate::arn::Arn;
use crate::types::{ResourceMetadata, Tag, Target, non_empty};
use declarative::collection::duplicate_key;
use declarative::{
    Delta, Equivalence, Field, ResourceKind, ResourceReference, Schema, UnsetRule,
    ValidationError,
};
use serde::{Deserialize, Serialize};

/// Values accepted for `state`
pub const RULE_STATES: &[&str] = &[
    "ENABLED",
    "DISABLED",
    "ENABLED_WITH_ALL_CLOUDTRAIL_MANAGEMENT_EVENTS",
];

/// Bus used when a rule names none
pub const DEFAULT_EVENT_BUS: &str = "default";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_bus_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_bus_ref: Option<ResourceReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_pattern: Option<String>,
    pub name: String,
    #[serde(rename = "roleARN", default, skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_expression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<Target>,
}

impl RuleSpec {
    /// Bus the rule lives on
    pub fn bus(&self) -> &str {
        self.event_bus_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_EVENT_BUS)
    }
}

/// `(bus, name)` of a rule ARN: `rule/<name>` on the default bus,
/// `rule/<bus>/<name>` otherwise.
pub fn rule_location(arn: &str) -> Option<(String, String)> {
    let parsed = Arn::parse(arn).ok()?;
    let path = parsed.resource.strip_prefix("rule/")?;
    match path.split_once('/') {
        Some((bus, name)) if !bus.is_empty() && !name.is_empty() => {
            Some((bus.to_string(), name.to_string()))
        }
        Some(_) => None,
        None if path.is_empty() => None,
        None => Some((DEFAULT_EVENT_BUS.to_string(), path.to_string())),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleStatus {
    #[serde(rename = "ackResourceMetadata", default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResourceMetadata>,
}

impl RuleStatus {
    pub fn arn(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.arn.as_deref())
    }
}

/// `PutRule` input, used both to create a rule and to update it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutRuleInput {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_bus_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_pattern: Option<String>,
    #[serde(rename = "roleARN", default, skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_expression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Applied on creation only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

impl From<&RuleSpec> for PutRuleInput {
    fn from(spec: &RuleSpec) -> Self {
        Self {
            name: spec.name.clone(),
            description: spec.description.clone(),
            event_bus_name: spec.event_bus_name.clone(),
            event_pattern: non_empty(spec.event_pattern.as_deref()),
            role_arn: spec.role_arn.clone(),
            schedule_expression: non_empty(spec.schedule_expression.as_deref()),
            state: spec.state.clone(),
            tags: spec.tags.clone(),
        }
    }
}

/// `DescribeRule` output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDescription {
    pub arn: String,
    pub name: String,
    pub event_bus_name: String,
    pub description: String,
    pub event_pattern: String,
    #[serde(rename = "roleARN")]
    pub role_arn: String,
    pub schedule_expression: String,
    pub state: String,
}

const FIELDS: &[Field] = &[
    Field::scalar("Description", "description", Equivalence::NilEmpty),
    Field::scalar(
        "EventBusName",
        "eventBusName",
        Equivalence::Default(DEFAULT_EVENT_BUS),
    ),
    Field::opaque("EventBusRef", "eventBusRef"),
    Field::scalar("EventPattern", "eventPattern", Equivalence::NilEmpty),
    Field::scalar("Name", "name", Equivalence::Strict),
    Field::scalar("RoleARN", "roleARN", Equivalence::NilEmpty),
    Field::scalar("ScheduleExpression", "scheduleExpression", Equivalence::NilEmpty),
    Field::scalar("State", "state", Equivalence::Default("ENABLED")),
    Field::keyed("Tags", "tags", "key", Equivalence::NilEmpty),
    Field::keyed("Targets", "targets", "id", Equivalence::Strict),
];

static SCHEMA: Schema = Schema::new("Spec", FIELDS);

const UNSET_RULES: &[UnsetRule] = &[UnsetRule {
    path: "Spec.ScheduleExpression",
    cleared: None,
}];

#[derive(Debug, Clone, Copy, Default)]
pub struct RuleKind;

impl ResourceKind for RuleKind {
    type Spec = RuleSpec;
    type Status = RuleStatus;
    type Request = PutRuleInput;

    const KIND: &'static str = "Rule";

    fn schema() -> &'static Schema {
        &SCHEMA
    }

    fn immutable_fields() -> &'static [&'static str] {
        &["Spec.Name", "Spec.EventBusName"]
    }

    fn sub_collections() -> &'static [&'static str] {
        &["Spec.Tags", "Spec.Targets"]
    }

    fn unset_rules() -> &'static [UnsetRule] {
        UNSET_RULES
    }

    fn validate(spec: &RuleSpec, _delta: Option<&Delta>) -> Result<(), ValidationError> {
        require_name("spec.name", &spec.name)?;

        if let Some(state) = spec.state.as_deref()
            && !RULE_STATES.iter().any(|s| *s == state)
        {
            return Err(ValidationError::field(
                "spec.state",
                format!("supported states: {}", RULE_STATES.join(", ")),
            ));
        }

        let empty_pattern = spec.event_pattern.as_deref().is_none_or(str::is_empty);
        let empty_schedule = spec.schedule_expression.as_deref().is_none_or(str::is_empty);
        if empty_pattern && empty_schedule {
            return Err(ValidationError::field(
                "spec",
                "at least one of \"spec.eventPattern\" or \"spec.scheduleExpression\" must be specified",
            ));
        }

        validate_targets(&spec.targets)?;
        validate_tags(&spec.tags)
    }
}

/// Every target needs an id and an ARN, and ids are unique within a rule.
pub fn validate_targets(targets: &[Target]) -> Result<(), ValidationError> {
    let missing = |s: &Option<String>| s.as_deref().is_none_or(str::is_empty);
    if targets.iter().any(|t| missing(&t.id) || missing(&t.arn)) {
        return Err(ValidationError::message(
            "invalid target: target ID and ARN must be specified",
        ));
    }
    if duplicate_key(targets).is_some() {
        return Err(ValidationError::message(
            "invalid target: unique target ID is already used",
        ));
    }
    Ok(())
}
