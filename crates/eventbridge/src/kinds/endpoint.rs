//! Global endpoints
//!
//! An endpoint fails events over between two buses of the same name in two
//! regions. Like archives, endpoints change state asynchronously.

use super::require_name;
use crate::arn::Arn;
use crate::types::ResourceMetadata;
use declarative::collection::duplicate_key;
use declarative::{
    CompareHook, Delta, Equivalence, Field, Keyed, ResourceKind, Schema, StateTable, UnsetRule,
    ValidationError,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointEventBus {
    #[serde(rename = "eventBusARN", default, skip_serializing_if = "Option::is_none")]
    pub event_bus_arn: Option<String>,
}

impl EndpointEventBus {
    pub fn new(arn: impl Into<String>) -> Self {
        Self {
            event_bus_arn: Some(arn.into()),
        }
    }
}

impl Keyed for EndpointEventBus {
    fn key(&self) -> Option<&str> {
        self.event_bus_arn.as_deref()
    }

    fn same_payload(&self, _other: &Self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Primary {
    /// ARN of the Route 53 health check watching the primary region
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secondary {
    /// Region events fail over to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailoverConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<Primary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<Secondary>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failover_config: Option<FailoverConfig>,
}

impl RoutingConfig {
    /// Failover between a health-checked primary and a secondary region.
    pub fn failover(health_check: impl Into<String>, route: impl Into<String>) -> Self {
        Self {
            failover_config: Some(FailoverConfig {
                primary: Some(Primary {
                    health_check: Some(health_check.into()),
                }),
                secondary: Some(Secondary {
                    route: Some(route.into()),
                }),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event_buses: Vec<EndpointEventBus>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_config: Option<ReplicationConfig>,
    #[serde(rename = "roleARN", default, skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing_config: Option<RoutingConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointStatus {
    #[serde(rename = "ackResourceMetadata", default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResourceMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_reason: Option<String>,
}

impl EndpointStatus {
    pub fn arn(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.arn.as_deref())
    }
}

/// `CreateEndpoint` and `UpdateEndpoint` input
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointInput {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event_buses: Vec<EndpointEventBus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_config: Option<ReplicationConfig>,
    #[serde(rename = "roleARN", default, skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing_config: Option<RoutingConfig>,
}

impl From<&EndpointSpec> for EndpointInput {
    fn from(spec: &EndpointSpec) -> Self {
        Self {
            name: spec.name.clone(),
            description: spec.description.clone(),
            event_buses: spec.event_buses.clone(),
            replication_config: spec.replication_config.clone(),
            role_arn: spec.role_arn.clone(),
            routing_config: spec.routing_config.clone(),
        }
    }
}

/// `DescribeEndpoint` output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointDescription {
    pub arn: String,
    pub name: String,
    pub description: String,
    pub event_buses: Vec<EndpointEventBus>,
    pub replication_config: ReplicationConfig,
    #[serde(rename = "roleARN")]
    pub role_arn: String,
    pub routing_config: RoutingConfig,
    #[serde(rename = "endpointID")]
    pub endpoint_id: String,
    #[serde(rename = "endpointURL")]
    pub endpoint_url: String,
    pub state: String,
    pub state_reason: String,
}

const PRIMARY: &[Field] = &[Field::scalar("HealthCheck", "healthCheck", Equivalence::Strict)];
const SECONDARY: &[Field] = &[Field::scalar("Route", "route", Equivalence::Strict)];
const FAILOVER: &[Field] = &[
    Field::object("Primary", "primary", PRIMARY),
    Field::object("Secondary", "secondary", SECONDARY),
];
const ROUTING: &[Field] = &[Field::object("FailoverConfig", "failoverConfig", FAILOVER)];
const REPLICATION: &[Field] = &[Field::scalar("State", "state", Equivalence::Default("ENABLED"))];

const FIELDS: &[Field] = &[
    Field::scalar("Description", "description", Equivalence::NilEmpty),
    Field::keyed("EventBuses", "eventBuses", "eventBusARN", Equivalence::Strict),
    Field::scalar("Name", "name", Equivalence::Strict),
    Field::object("ReplicationConfig", "replicationConfig", REPLICATION),
    Field::scalar("RoleARN", "roleARN", Equivalence::NilEmpty),
    Field::object("RoutingConfig", "routingConfig", ROUTING),
];

static SCHEMA: Schema = Schema::new("Spec", FIELDS);

static STATES: StateTable = StateTable::new(
    &["CREATING", "UPDATING", "DELETING"],
    &["ACTIVE", "UPDATE_FAILED"],
    &["CREATE_FAILED", "DELETE_FAILED"],
);

fn replication_state(config: Option<&ReplicationConfig>) -> String {
    config
        .and_then(|c| c.state.as_deref())
        .filter(|s| !s.is_empty())
        .unwrap_or("ENABLED")
        .to_ascii_uppercase()
}

/// Replication is on unless explicitly disabled; absent, empty and
/// `ENABLED` in any case are one value.
fn compare_replication(desired: &EndpointSpec, latest: &EndpointSpec, delta: &mut Delta) {
    let wanted = replication_state(desired.replication_config.as_ref());
    let current = replication_state(latest.replication_config.as_ref());
    if wanted != current {
        delta.add(
            "Spec.ReplicationConfig",
            serde_json::to_value(&desired.replication_config).unwrap_or_default(),
            serde_json::to_value(&latest.replication_config).unwrap_or_default(),
        );
    }
}

static HOOKS: [CompareHook<EndpointSpec>; 1] = [CompareHook {
    paths: &["Spec.ReplicationConfig"],
    compare: compare_replication,
}];

fn replication_enabled() -> Value {
    json!({ "state": "ENABLED" })
}

const UNSET_RULES: &[UnsetRule] = &[UnsetRule {
    path: "Spec.ReplicationConfig",
    cleared: Some(replication_enabled),
}];

#[derive(Debug, Clone, Copy, Default)]
pub struct EndpointKind;

impl ResourceKind for EndpointKind {
    type Spec = EndpointSpec;
    type Status = EndpointStatus;
    type Request = EndpointInput;

    const KIND: &'static str = "Endpoint";

    fn schema() -> &'static Schema {
        &SCHEMA
    }

    fn compare_hooks() -> &'static [CompareHook<EndpointSpec>] {
        &HOOKS
    }

    fn immutable_fields() -> &'static [&'static str] {
        &["Spec.Name"]
    }

    fn unset_rules() -> &'static [UnsetRule] {
        UNSET_RULES
    }

    fn lifecycle() -> Option<&'static StateTable> {
        Some(&STATES)
    }

    fn lifecycle_state(status: &EndpointStatus) -> Option<&str> {
        status.state.as_deref()
    }

    fn validate(spec: &EndpointSpec, delta: Option<&Delta>) -> Result<(), ValidationError> {
        require_name("spec.name", &spec.name)?;
        validate_event_buses(&spec.event_buses)?;

        if spec
            .routing_config
            .as_ref()
            .and_then(|r| r.failover_config.as_ref())
            .is_none()
        {
            return Err(ValidationError::field(
                "spec.routingConfig.failoverConfig",
                "must be set",
            ));
        }

        if delta.is_some_and(|d| d.different_at("Spec.RoleARN"))
            && spec.role_arn.as_deref().is_none_or(str::is_empty)
        {
            return Err(ValidationError::field(
                "spec.roleARN",
                "unsetting this field is not supported",
            ));
        }

        Ok(())
    }
}

/// Exactly two buses, with parseable ARNs naming the same bus.
fn validate_event_buses(buses: &[EndpointEventBus]) -> Result<(), ValidationError> {
    const FIELD: &str = "spec.eventBuses";

    if buses.len() != 2 {
        return Err(ValidationError::field(
            FIELD,
            "must contain exactly two event buses",
        ));
    }

    let mut resources = Vec::with_capacity(2);
    for bus in buses {
        let arn = bus
            .event_bus_arn
            .as_deref()
            .ok_or_else(|| ValidationError::field(FIELD, "event bus arn must be set"))?;
        let parsed = Arn::parse(arn)
            .map_err(|_| ValidationError::field(FIELD, format!("invalid arn {arn:?}")))?;
        resources.push(parsed.resource);
    }

    if duplicate_key(buses).is_some() {
        return Err(ValidationError::field(
            FIELD,
            "event bus arns must be unique",
        ));
    }

    if resources[0] != resources[1] {
        return Err(ValidationError::field(
            FIELD,
            "event bus names must be identical",
        ));
    }
    Ok(())
}
