//! In-memory EventBridge sandbox.
//!
//! Behaves like the service where the reconciler can tell the difference:
//! unset strings are described as `""`, archives and endpoints pass through
//! `CREATING`/`UPDATING`/`DELETING` until [`MemoryBackend::settle`] is
//! called, and conflicting calls fail with the service's error codes.
//! Every call is logged, and any operation can be made to fail.

use crate::api::{EventBridgeApi, Operation};
use crate::arn::Arn;
use crate::error::{Error, Result};
use crate::kinds::archive::{ArchiveDescription, CreateArchiveInput, UpdateArchiveInput};
use crate::kinds::endpoint::{EndpointDescription, EndpointInput, ReplicationConfig};
use crate::kinds::event_bus::{CreateEventBusInput, EventBusDescription};
use crate::kinds::rule::{DEFAULT_EVENT_BUS, PutRuleInput, RuleDescription};
use crate::types::{Tag, Target};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

const DEFAULT_ACCOUNT: &str = "123456789012";
const DEFAULT_REGION: &str = "us-east-1";

/// A rule with its targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRule {
    pub rule: RuleDescription,
    #[serde(default)]
    pub targets: Vec<Target>,
}

/// Everything the sandbox knows; serializable so the CLI can persist it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryState {
    pub account_id: String,
    pub region: String,
    #[serde(default)]
    pub event_buses: BTreeMap<String, EventBusDescription>,
    /// Keyed by `bus/name`
    #[serde(default)]
    pub rules: BTreeMap<String, StoredRule>,
    #[serde(default)]
    pub archives: BTreeMap<String, ArchiveDescription>,
    #[serde(default)]
    pub endpoints: BTreeMap<String, EndpointDescription>,
    /// Tags by resource ARN
    #[serde(default)]
    pub tags: BTreeMap<String, BTreeMap<String, String>>,
    #[serde(default)]
    pub sequence: u64,
}

impl MemoryState {
    /// Empty account holding only the default bus.
    pub fn new(account_id: impl Into<String>, region: impl Into<String>) -> Self {
        let mut state = Self {
            account_id: account_id.into(),
            region: region.into(),
            event_buses: BTreeMap::new(),
            rules: BTreeMap::new(),
            archives: BTreeMap::new(),
            endpoints: BTreeMap::new(),
            tags: BTreeMap::new(),
            sequence: 0,
        };
        let arn = state.arn(format!("event-bus/{DEFAULT_EVENT_BUS}"));
        state.event_buses.insert(
            DEFAULT_EVENT_BUS.to_string(),
            EventBusDescription {
                arn,
                name: DEFAULT_EVENT_BUS.to_string(),
                event_source_name: None,
            },
        );
        state
    }

    fn arn(&self, resource: String) -> String {
        Arn::events(&self.region, &self.account_id, resource).to_string()
    }

    fn rule_arn(&self, name: &str, bus: &str) -> String {
        if bus == DEFAULT_EVENT_BUS {
            self.arn(format!("rule/{name}"))
        } else {
            self.arn(format!("rule/{bus}/{name}"))
        }
    }

    fn has_resource(&self, arn: &str) -> bool {
        self.event_buses.values().any(|b| b.arn == arn)
            || self.rules.values().any(|r| r.rule.arn == arn)
            || self.archives.values().any(|a| a.archive_arn == arn)
            || self.endpoints.values().any(|e| e.arn == arn)
    }

    fn set_tags(&mut self, arn: &str, tags: &[Tag]) {
        let entry = self.tags.entry(arn.to_string()).or_default();
        for tag in tags {
            if let Some(key) = tag.key.as_deref() {
                entry.insert(key.to_string(), tag.value.clone().unwrap_or_default());
            }
        }
    }

    /// Number of archives and endpoints still changing state
    pub fn pending(&self) -> usize {
        let archives = self
            .archives
            .values()
            .filter(|a| matches!(a.state.as_str(), "CREATING" | "UPDATING"))
            .count();
        let endpoints = self
            .endpoints
            .values()
            .filter(|e| matches!(e.state.as_str(), "CREATING" | "UPDATING" | "DELETING"))
            .count();
        archives + endpoints
    }
}

impl Default for MemoryState {
    fn default() -> Self {
        Self::new(DEFAULT_ACCOUNT, DEFAULT_REGION)
    }
}

/// One logged call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCall {
    pub operation: Operation,
    /// Name, `bus/rule` or ARN the call addressed
    pub resource: String,
}

#[derive(Debug, Clone)]
struct Fault {
    code: String,
    message: String,
}

/// In-memory implementation of [`EventBridgeApi`]
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    calls: Mutex<Vec<ApiCall>>,
    faults: Mutex<HashMap<Operation, Fault>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn already_exists(operation: Operation, what: &str) -> Error {
    Error::api(
        operation.to_string(),
        "ResourceAlreadyExistsException",
        format!("{what} already exists."),
    )
}

fn concurrent(operation: Operation, what: &str, state: &str) -> Error {
    Error::api(
        operation.to_string(),
        "ConcurrentModificationException",
        format!("{what} is in state {state}."),
    )
}

fn validation(operation: Operation, message: &str) -> Error {
    Error::api(operation.to_string(), "ValidationException", message)
}

fn rule_key(name: &str, bus: &str) -> String {
    format!("{bus}/{name}")
}

fn bus_or_default(bus: Option<&str>) -> &str {
    bus.filter(|b| !b.is_empty()).unwrap_or(DEFAULT_EVENT_BUS)
}

impl MemoryBackend {
    /// Sandbox for an account and region.
    pub fn new(account_id: &str, region: &str) -> Self {
        Self::from_state(MemoryState::new(account_id, region))
    }

    /// Sandbox resuming from saved state.
    pub fn from_state(state: MemoryState) -> Self {
        Self {
            state: Mutex::new(state),
            calls: Mutex::new(Vec::new()),
            faults: Mutex::new(HashMap::new()),
        }
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> MemoryState {
        lock(&self.state).clone()
    }

    /// Make every call to `operation` fail with the given service error.
    pub fn fail(&self, operation: Operation, code: &str, message: &str) {
        lock(&self.faults).insert(
            operation,
            Fault {
                code: code.to_string(),
                message: message.to_string(),
            },
        );
    }

    pub fn clear_faults(&self) {
        lock(&self.faults).clear();
    }

    /// Calls made so far, in order
    pub fn calls(&self) -> Vec<ApiCall> {
        lock(&self.calls).clone()
    }

    /// Number of calls made to `operation`
    pub fn count(&self, operation: Operation) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    /// Calls that changed something (or tried to)
    pub fn mutations(&self) -> Vec<ApiCall> {
        lock(&self.calls)
            .iter()
            .filter(|c| !c.operation.is_read())
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    /// Finish every pending transition. Returns how many resources changed.
    pub fn settle(&self) -> usize {
        let mut state = lock(&self.state);
        let mut settled = 0;

        for archive in state.archives.values_mut() {
            if matches!(archive.state.as_str(), "CREATING" | "UPDATING") {
                archive.state = "ENABLED".to_string();
                settled += 1;
            }
        }

        let mut deleted = Vec::new();
        for endpoint in state.endpoints.values_mut() {
            match endpoint.state.as_str() {
                "CREATING" | "UPDATING" => {
                    endpoint.state = "ACTIVE".to_string();
                    settled += 1;
                }
                "DELETING" => deleted.push((endpoint.name.clone(), endpoint.arn.clone())),
                _ => {}
            }
        }
        for (name, arn) in deleted {
            state.endpoints.remove(&name);
            state.tags.remove(&arn);
            settled += 1;
        }

        if settled > 0 {
            log::debug!("settled {settled} resource(s)");
        }
        settled
    }

    /// Force an archive into a state, as the service does on failure.
    pub fn set_archive_state(&self, name: &str, state: &str, reason: &str) -> bool {
        let mut guard = lock(&self.state);
        match guard.archives.get_mut(name) {
            Some(archive) => {
                archive.state = state.to_string();
                archive.state_reason = reason.to_string();
                true
            }
            None => false,
        }
    }

    /// Force an endpoint into a state, as the service does on failure.
    pub fn set_endpoint_state(&self, name: &str, state: &str, reason: &str) -> bool {
        let mut guard = lock(&self.state);
        match guard.endpoints.get_mut(name) {
            Some(endpoint) => {
                endpoint.state = state.to_string();
                endpoint.state_reason = reason.to_string();
                true
            }
            None => false,
        }
    }

    fn record(&self, operation: Operation, resource: impl Into<String>) -> Result<()> {
        let resource = resource.into();
        log::trace!("{operation} {resource}");
        lock(&self.calls).push(ApiCall {
            operation,
            resource,
        });
        match lock(&self.faults).get(&operation) {
            Some(fault) => Err(Error::api(
                operation.to_string(),
                fault.code.clone(),
                fault.message.clone(),
            )),
            None => Ok(()),
        }
    }
}

impl EventBridgeApi for MemoryBackend {
    fn describe_event_bus(&self, name: &str) -> Result<Option<EventBusDescription>> {
        self.record(Operation::DescribeEventBus, name)?;
        Ok(lock(&self.state).event_buses.get(name).cloned())
    }

    fn create_event_bus(&self, input: &CreateEventBusInput) -> Result<String> {
        const OP: Operation = Operation::CreateEventBus;
        self.record(OP, &input.name)?;
        let mut state = lock(&self.state);
        if state.event_buses.contains_key(&input.name) {
            return Err(already_exists(OP, &format!("Event bus {}", input.name)));
        }
        let arn = state.arn(format!("event-bus/{}", input.name));
        state.event_buses.insert(
            input.name.clone(),
            EventBusDescription {
                arn: arn.clone(),
                name: input.name.clone(),
                event_source_name: input.event_source_name.clone(),
            },
        );
        state.set_tags(&arn, &input.tags);
        Ok(arn)
    }

    fn delete_event_bus(&self, name: &str) -> Result<()> {
        const OP: Operation = Operation::DeleteEventBus;
        self.record(OP, name)?;
        if name == DEFAULT_EVENT_BUS {
            return Err(validation(OP, "Cannot delete event bus default."));
        }
        let mut state = lock(&self.state);
        if state.rules.values().any(|r| r.rule.event_bus_name == name) {
            return Err(validation(
                OP,
                &format!("Cannot delete event bus {name} because it still has rules."),
            ));
        }
        if let Some(bus) = state.event_buses.remove(name) {
            state.tags.remove(&bus.arn);
        }
        Ok(())
    }

    fn describe_rule(&self, name: &str, event_bus: &str) -> Result<Option<RuleDescription>> {
        let key = rule_key(name, event_bus);
        self.record(Operation::DescribeRule, &key)?;
        Ok(lock(&self.state).rules.get(&key).map(|r| r.rule.clone()))
    }

    fn put_rule(&self, input: &PutRuleInput) -> Result<String> {
        const OP: Operation = Operation::PutRule;
        let bus = bus_or_default(input.event_bus_name.as_deref()).to_string();
        let key = rule_key(&input.name, &bus);
        self.record(OP, &key)?;

        let pattern = input.event_pattern.clone().unwrap_or_default();
        let schedule = input.schedule_expression.clone().unwrap_or_default();
        if pattern.is_empty() && schedule.is_empty() {
            return Err(validation(
                OP,
                "Parameter(s) EventPattern or ScheduleExpression must be specified.",
            ));
        }
        if !schedule.is_empty() && bus != DEFAULT_EVENT_BUS {
            return Err(validation(
                OP,
                "ScheduleExpression is supported only on the default event bus.",
            ));
        }

        let mut state = lock(&self.state);
        if !state.event_buses.contains_key(&bus) {
            return Err(Error::not_found(
                OP.to_string(),
                format!("Event bus {bus} does not exist."),
            ));
        }
        let arn = state.rule_arn(&input.name, &bus);
        let rule = RuleDescription {
            arn: arn.clone(),
            name: input.name.clone(),
            event_bus_name: bus,
            description: input.description.clone().unwrap_or_default(),
            event_pattern: pattern,
            role_arn: input.role_arn.clone().unwrap_or_default(),
            schedule_expression: schedule,
            state: input
                .state
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "ENABLED".to_string()),
        };
        if let Some(existing) = state.rules.get_mut(&key) {
            existing.rule = rule;
            return Ok(arn);
        }
        state.rules.insert(
            key,
            StoredRule {
                rule,
                targets: Vec::new(),
            },
        );
        state.set_tags(&arn, &input.tags);
        Ok(arn)
    }

    fn delete_rule(&self, name: &str, event_bus: &str) -> Result<()> {
        const OP: Operation = Operation::DeleteRule;
        let key = rule_key(name, event_bus);
        self.record(OP, &key)?;
        let mut state = lock(&self.state);
        if state.rules.get(&key).is_some_and(|r| !r.targets.is_empty()) {
            return Err(validation(OP, "Rule can't be deleted since it has targets."));
        }
        if let Some(stored) = state.rules.remove(&key) {
            state.tags.remove(&stored.rule.arn);
        }
        Ok(())
    }

    fn list_targets_by_rule(&self, rule: &str, event_bus: &str) -> Result<Vec<Target>> {
        const OP: Operation = Operation::ListTargetsByRule;
        let key = rule_key(rule, event_bus);
        self.record(OP, &key)?;
        lock(&self.state)
            .rules
            .get(&key)
            .map(|r| r.targets.clone())
            .ok_or_else(|| rule_not_found(OP, rule, event_bus))
    }

    fn put_targets(&self, rule: &str, event_bus: &str, targets: &[Target]) -> Result<()> {
        const OP: Operation = Operation::PutTargets;
        let key = rule_key(rule, event_bus);
        self.record(OP, &key)?;
        let mut state = lock(&self.state);
        let stored = state
            .rules
            .get_mut(&key)
            .ok_or_else(|| rule_not_found(OP, rule, event_bus))?;
        for target in targets {
            match stored.targets.iter_mut().find(|t| t.id == target.id) {
                Some(existing) => *existing = target.clone(),
                None => stored.targets.push(target.clone()),
            }
        }
        Ok(())
    }

    fn remove_targets(&self, rule: &str, event_bus: &str, ids: &[String]) -> Result<()> {
        const OP: Operation = Operation::RemoveTargets;
        let key = rule_key(rule, event_bus);
        self.record(OP, &key)?;
        let mut state = lock(&self.state);
        let stored = state
            .rules
            .get_mut(&key)
            .ok_or_else(|| rule_not_found(OP, rule, event_bus))?;
        stored
            .targets
            .retain(|t| !ids.iter().any(|id| t.id.as_deref() == Some(id.as_str())));
        Ok(())
    }

    fn describe_archive(&self, name: &str) -> Result<Option<ArchiveDescription>> {
        self.record(Operation::DescribeArchive, name)?;
        Ok(lock(&self.state).archives.get(name).cloned())
    }

    fn create_archive(&self, input: &CreateArchiveInput) -> Result<String> {
        const OP: Operation = Operation::CreateArchive;
        self.record(OP, &input.archive_name)?;
        let mut state = lock(&self.state);
        if state.archives.contains_key(&input.archive_name) {
            return Err(already_exists(OP, &format!("Archive {}", input.archive_name)));
        }
        if !state
            .event_buses
            .values()
            .any(|b| b.arn == input.event_source_arn)
        {
            return Err(Error::not_found(
                OP.to_string(),
                format!("Event bus {} does not exist.", input.event_source_arn),
            ));
        }
        let arn = state.arn(format!("archive/{}", input.archive_name));
        state.archives.insert(
            input.archive_name.clone(),
            ArchiveDescription {
                archive_arn: arn.clone(),
                archive_name: input.archive_name.clone(),
                description: input.description.clone().unwrap_or_default(),
                event_pattern: input.event_pattern.clone().unwrap_or_default(),
                event_source_arn: input.event_source_arn.clone(),
                retention_days: input.retention_days.unwrap_or(0),
                state: "CREATING".to_string(),
                state_reason: String::new(),
                creation_time: Utc::now(),
            },
        );
        Ok(arn)
    }

    fn update_archive(&self, input: &UpdateArchiveInput) -> Result<()> {
        const OP: Operation = Operation::UpdateArchive;
        self.record(OP, &input.archive_name)?;
        let mut state = lock(&self.state);
        let archive = state.archives.get_mut(&input.archive_name).ok_or_else(|| {
            Error::not_found(
                OP.to_string(),
                format!("Archive {} does not exist.", input.archive_name),
            )
        })?;
        if matches!(archive.state.as_str(), "CREATING" | "UPDATING") {
            return Err(concurrent(
                OP,
                &format!("Archive {}", input.archive_name),
                &archive.state,
            ));
        }
        if let Some(description) = &input.description {
            archive.description = description.clone();
        }
        if let Some(pattern) = &input.event_pattern {
            archive.event_pattern = pattern.clone();
        }
        if let Some(days) = input.retention_days {
            archive.retention_days = days;
        }
        archive.state = "UPDATING".to_string();
        archive.state_reason = String::new();
        Ok(())
    }

    fn delete_archive(&self, name: &str) -> Result<()> {
        const OP: Operation = Operation::DeleteArchive;
        self.record(OP, name)?;
        let mut state = lock(&self.state);
        match state.archives.remove(name) {
            Some(archive) => {
                state.tags.remove(&archive.archive_arn);
                Ok(())
            }
            None => Err(Error::not_found(
                OP.to_string(),
                format!("Archive {name} does not exist."),
            )),
        }
    }

    fn describe_endpoint(&self, name: &str) -> Result<Option<EndpointDescription>> {
        self.record(Operation::DescribeEndpoint, name)?;
        Ok(lock(&self.state).endpoints.get(name).cloned())
    }

    fn create_endpoint(&self, input: &EndpointInput) -> Result<String> {
        const OP: Operation = Operation::CreateEndpoint;
        self.record(OP, &input.name)?;
        let mut state = lock(&self.state);
        if state.endpoints.contains_key(&input.name) {
            return Err(already_exists(OP, &format!("Endpoint {}", input.name)));
        }
        state.sequence += 1;
        let endpoint_id = format!("ep{:06}.veo", state.sequence);
        let arn = state.arn(format!("endpoint/{}", input.name));
        state.endpoints.insert(
            input.name.clone(),
            EndpointDescription {
                arn: arn.clone(),
                name: input.name.clone(),
                description: input.description.clone().unwrap_or_default(),
                event_buses: input.event_buses.clone(),
                replication_config: input
                    .replication_config
                    .clone()
                    .unwrap_or_else(|| ReplicationConfig {
                        state: Some("ENABLED".to_string()),
                    }),
                role_arn: input.role_arn.clone().unwrap_or_default(),
                routing_config: input.routing_config.clone().unwrap_or_default(),
                endpoint_url: format!("https://{endpoint_id}.endpoint.events.amazonaws.com"),
                endpoint_id,
                state: "CREATING".to_string(),
                state_reason: String::new(),
            },
        );
        Ok(arn)
    }

    fn update_endpoint(&self, input: &EndpointInput) -> Result<()> {
        const OP: Operation = Operation::UpdateEndpoint;
        self.record(OP, &input.name)?;
        let mut state = lock(&self.state);
        let endpoint = state.endpoints.get_mut(&input.name).ok_or_else(|| {
            Error::not_found(
                OP.to_string(),
                format!("Endpoint {} does not exist.", input.name),
            )
        })?;
        if !matches!(endpoint.state.as_str(), "ACTIVE" | "UPDATE_FAILED") {
            return Err(concurrent(
                OP,
                &format!("Endpoint {}", input.name),
                &endpoint.state,
            ));
        }
        if let Some(description) = &input.description {
            endpoint.description = description.clone();
        }
        if !input.event_buses.is_empty() {
            endpoint.event_buses = input.event_buses.clone();
        }
        if let Some(replication) = &input.replication_config {
            endpoint.replication_config = replication.clone();
        }
        if let Some(role) = &input.role_arn {
            endpoint.role_arn = role.clone();
        }
        if let Some(routing) = &input.routing_config {
            endpoint.routing_config = routing.clone();
        }
        endpoint.state = "UPDATING".to_string();
        endpoint.state_reason = String::new();
        Ok(())
    }

    fn delete_endpoint(&self, name: &str) -> Result<()> {
        const OP: Operation = Operation::DeleteEndpoint;
        self.record(OP, name)?;
        let mut state = lock(&self.state);
        let endpoint = state.endpoints.get_mut(name).ok_or_else(|| {
            Error::not_found(OP.to_string(), format!("Endpoint {name} does not exist."))
        })?;
        if matches!(endpoint.state.as_str(), "CREATING" | "UPDATING" | "DELETING") {
            return Err(concurrent(OP, &format!("Endpoint {name}"), &endpoint.state));
        }
        endpoint.state = "DELETING".to_string();
        Ok(())
    }

    fn list_tags_for_resource(&self, arn: &str) -> Result<Vec<Tag>> {
        const OP: Operation = Operation::ListTagsForResource;
        self.record(OP, arn)?;
        let state = lock(&self.state);
        if !state.has_resource(arn) {
            return Err(resource_not_found(OP, arn));
        }
        Ok(state
            .tags
            .get(arn)
            .map(|tags| tags.iter().map(|(k, v)| Tag::new(k, v)).collect())
            .unwrap_or_default())
    }

    fn tag_resource(&self, arn: &str, tags: &[Tag]) -> Result<()> {
        const OP: Operation = Operation::TagResource;
        self.record(OP, arn)?;
        let mut state = lock(&self.state);
        if !state.has_resource(arn) {
            return Err(resource_not_found(OP, arn));
        }
        state.set_tags(arn, tags);
        Ok(())
    }

    fn untag_resource(&self, arn: &str, keys: &[String]) -> Result<()> {
        const OP: Operation = Operation::UntagResource;
        self.record(OP, arn)?;
        let mut state = lock(&self.state);
        if !state.has_resource(arn) {
            return Err(resource_not_found(OP, arn));
        }
        if let Some(existing) = state.tags.get_mut(arn) {
            for key in keys {
                existing.remove(key);
            }
        }
        Ok(())
    }
}

fn rule_not_found(operation: Operation, rule: &str, bus: &str) -> Error {
    Error::not_found(
        operation.to_string(),
        format!("Rule {rule} does not exist on EventBus {bus}."),
    )
}

fn resource_not_found(operation: Operation, arn: &str) -> Error {
    Error::not_found(operation.to_string(), format!("Resource {arn} not found."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::endpoint::{EndpointEventBus, RoutingConfig};

    fn bus(backend: &MemoryBackend, name: &str) -> String {
        backend
            .create_event_bus(&CreateEventBusInput {
                name: name.into(),
                ..Default::default()
            })
            .unwrap()
    }

    fn rule(name: &str, bus: &str) -> PutRuleInput {
        PutRuleInput {
            name: name.into(),
            event_bus_name: Some(bus.into()),
            event_pattern: Some(r#"{"source":["orders"]}"#.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_bus_exists() {
        let backend = MemoryBackend::default();
        let bus = backend.describe_event_bus("default").unwrap().unwrap();
        assert_eq!(bus.arn, "arn:aws:events:us-east-1:123456789012:event-bus/default");
    }

    #[test]
    fn test_rule_describes_unset_strings_as_empty() {
        let backend = MemoryBackend::default();
        bus(&backend, "orders");
        let arn = backend.put_rule(&rule("ship", "orders")).unwrap();
        assert_eq!(arn, "arn:aws:events:us-east-1:123456789012:rule/orders/ship");

        let described = backend.describe_rule("ship", "orders").unwrap().unwrap();
        assert_eq!(described.description, "");
        assert_eq!(described.schedule_expression, "");
        assert_eq!(described.state, "ENABLED");
    }

    #[test]
    fn test_put_rule_on_missing_bus() {
        let backend = MemoryBackend::default();
        let err = backend.put_rule(&rule("ship", "orders")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_rule_with_targets_cannot_be_deleted() {
        let backend = MemoryBackend::default();
        backend.put_rule(&rule("ship", "default")).unwrap();
        backend
            .put_targets("ship", "default", &[Target::new("q", "arn:q")])
            .unwrap();
        assert!(backend.delete_rule("ship", "default").is_err());

        backend
            .remove_targets("ship", "default", &["q".to_string()])
            .unwrap();
        backend.delete_rule("ship", "default").unwrap();
        assert!(backend.describe_rule("ship", "default").unwrap().is_none());
    }

    #[test]
    fn test_put_targets_upserts_by_id() {
        let backend = MemoryBackend::default();
        backend.put_rule(&rule("ship", "default")).unwrap();
        backend
            .put_targets("ship", "default", &[Target::new("q", "arn:q1")])
            .unwrap();
        backend
            .put_targets("ship", "default", &[Target::new("q", "arn:q2")])
            .unwrap();
        let targets = backend.list_targets_by_rule("ship", "default").unwrap();
        assert_eq!(targets, vec![Target::new("q", "arn:q2")]);
    }

    #[test]
    fn test_archive_lifecycle() {
        let backend = MemoryBackend::default();
        let source = bus(&backend, "orders");
        backend
            .create_archive(&CreateArchiveInput {
                archive_name: "orders-archive".into(),
                event_source_arn: source,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(
            backend.describe_archive("orders-archive").unwrap().unwrap().state,
            "CREATING"
        );

        let update = UpdateArchiveInput {
            archive_name: "orders-archive".into(),
            retention_days: Some(7),
            ..Default::default()
        };
        let err = backend.update_archive(&update).unwrap_err();
        assert!(err.is_retryable());

        assert_eq!(backend.settle(), 1);
        backend.update_archive(&update).unwrap();
        let archive = backend.describe_archive("orders-archive").unwrap().unwrap();
        assert_eq!(archive.state, "UPDATING");
        assert_eq!(archive.retention_days, 7);
    }

    #[test]
    fn test_archive_needs_existing_bus() {
        let backend = MemoryBackend::default();
        let err = backend
            .create_archive(&CreateArchiveInput {
                archive_name: "orders-archive".into(),
                event_source_arn: "arn:aws:events:us-east-1:123456789012:event-bus/nope".into(),
                ..Default::default()
            })
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_endpoint_deletion_settles() {
        let backend = MemoryBackend::default();
        backend
            .create_endpoint(&EndpointInput {
                name: "global".into(),
                event_buses: vec![EndpointEventBus::new("arn:a"), EndpointEventBus::new("arn:b")],
                routing_config: Some(RoutingConfig::failover("hc", "us-west-2")),
                ..Default::default()
            })
            .unwrap();
        let endpoint = backend.describe_endpoint("global").unwrap().unwrap();
        assert_eq!(endpoint.replication_config.state.as_deref(), Some("ENABLED"));
        assert!(backend.delete_endpoint("global").is_err());

        backend.settle();
        backend.delete_endpoint("global").unwrap();
        assert_eq!(backend.snapshot().pending(), 1);
        backend.settle();
        assert!(backend.describe_endpoint("global").unwrap().is_none());
    }

    #[test]
    fn test_tags() {
        let backend = MemoryBackend::default();
        let arn = bus(&backend, "orders");
        backend
            .tag_resource(&arn, &[Tag::new("team", "payments"), Tag::new("env", "dev")])
            .unwrap();
        backend.untag_resource(&arn, &["env".to_string()]).unwrap();
        assert_eq!(
            backend.list_tags_for_resource(&arn).unwrap(),
            vec![Tag::new("team", "payments")]
        );
        assert!(backend.list_tags_for_resource("arn:missing").is_err());
    }

    #[test]
    fn test_fault_injection_and_call_log() {
        let backend = MemoryBackend::default();
        backend.fail(Operation::CreateEventBus, "ThrottlingException", "Rate exceeded");
        let err = backend
            .create_event_bus(&CreateEventBusInput {
                name: "orders".into(),
                ..Default::default()
            })
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(backend.count(Operation::CreateEventBus), 1);
        assert!(backend.describe_event_bus("orders").unwrap().is_none());

        backend.clear_faults();
        bus(&backend, "orders");
        assert_eq!(backend.mutations().len(), 2);
    }

    #[test]
    fn test_state_roundtrip() {
        let backend = MemoryBackend::new("210987654321", "eu-west-1");
        bus(&backend, "orders");
        let json = serde_json::to_string(&backend.snapshot()).unwrap();
        let restored = MemoryBackend::from_state(serde_json::from_str(&json).unwrap());
        let bus = restored.describe_event_bus("orders").unwrap().unwrap();
        assert_eq!(bus.arn, "arn:aws:events:eu-west-1:210987654321:event-bus/orders");
    }
}
