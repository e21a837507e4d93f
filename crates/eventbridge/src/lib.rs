//! # eventbridge
//!
//! EventBridge resource kinds for the `declarative` reconciliation engine.
//!
//! This crate provides:
//! - Spec and status types for event buses, rules, archives and endpoints
//! - One [`ResourceKind`](declarative::ResourceKind) strategy per type
//! - The [`EventBridgeApi`](api::EventBridgeApi) surface and an in-memory
//!   backend implementing it
//! - A [`Client`] that observes latest snapshots and applies remote calls
//!
//! ## Example
//!
//! ```no_run
//! use declarative::{Snapshot, reconcile};
//! use eventbridge::kinds::{EventBusKind, EventBusSpec};
//! use eventbridge::Client;
//!
//! let client = Client::new();
//! let spec = EventBusSpec {
//!     name: "orders".into(),
//!     ..Default::default()
//! };
//! let desired = Snapshot::new("orders", spec.clone());
//! let latest = client.observe_event_bus(&spec).unwrap();
//! let outcome = reconcile::<EventBusKind, _>(&client, Some(&desired), latest.as_ref()).unwrap();
//! println!("{outcome}");
//! ```

#![warn(clippy::all)]

pub mod api;
pub mod arn;
pub mod backend;
pub mod error;
pub mod kinds;
pub mod managed;
pub mod references;
mod remote;
pub mod types;

pub use error::{Error, ErrorCategory, Result};
pub use kinds::ResourceType;
pub use managed::ManagedKind;
pub use types::{ResourceMetadata, Tag, Target};

use api::EventBridgeApi;
use declarative::Snapshot;
use kinds::archive::{ArchiveSpec, ArchiveStatus};
use kinds::endpoint::{EndpointSpec, EndpointStatus};
use kinds::event_bus::{EventBusSpec, EventBusStatus};
use kinds::rule::{RuleSpec, RuleStatus, rule_location};
use std::sync::Arc;
use types::non_empty;

/// High-level client for EventBridge resources.
///
/// The client wraps an API implementation. It builds latest snapshots by
/// combining describe output with the fields describe leaves out (tags,
/// targets), and implements [`declarative::RemoteResource`] for every kind.
#[derive(Clone)]
pub struct Client {
    api: Arc<dyn EventBridgeApi>,
}

impl Client {
    /// Create a client backed by an empty in-memory sandbox.
    pub fn new() -> Self {
        Self::with_backend(Arc::new(backend::default_backend()))
    }

    /// Create a client with a custom backend.
    pub fn with_backend(api: Arc<dyn EventBridgeApi>) -> Self {
        Self { api }
    }

    /// The underlying API.
    pub fn api(&self) -> &dyn EventBridgeApi {
        self.api.as_ref()
    }

    // =========================================================================
    // Observation
    // =========================================================================

    /// Latest snapshot of the bus named in `desired`, if it exists.
    pub fn observe_event_bus(
        &self,
        desired: &EventBusSpec,
    ) -> Result<Option<Snapshot<EventBusSpec, EventBusStatus>>> {
        let Some(bus) = self.api.describe_event_bus(&desired.name)? else {
            return Ok(None);
        };
        let spec = EventBusSpec {
            name: bus.name,
            event_source_name: bus.event_source_name,
            tags: self.api.list_tags_for_resource(&bus.arn)?,
        };
        let status = EventBusStatus {
            metadata: Some(ResourceMetadata::from_arn(&bus.arn)),
        };
        Ok(Some(Snapshot::with_status(&desired.name, spec, status)))
    }

    /// Latest snapshot of a rule.
    ///
    /// The rule is looked up at `recorded_arn` when one is known, so a rule
    /// whose bus changed in the manifest is still found where it lives.
    pub fn observe_rule(
        &self,
        desired: &RuleSpec,
        recorded_arn: Option<&str>,
    ) -> Result<Option<Snapshot<RuleSpec, RuleStatus>>> {
        let (bus, name) = recorded_arn
            .and_then(rule_location)
            .unwrap_or_else(|| (desired.bus().to_string(), desired.name.clone()));
        let Some(rule) = self.api.describe_rule(&name, &bus)? else {
            return Ok(None);
        };
        let spec = RuleSpec {
            description: Some(rule.description),
            event_bus_name: Some(rule.event_bus_name),
            event_bus_ref: desired.event_bus_ref.clone(),
            event_pattern: Some(rule.event_pattern),
            role_arn: Some(rule.role_arn),
            schedule_expression: Some(rule.schedule_expression),
            state: Some(rule.state),
            tags: self.api.list_tags_for_resource(&rule.arn)?,
            targets: self.api.list_targets_by_rule(&rule.name, &bus)?,
            name: rule.name,
        };
        let status = RuleStatus {
            metadata: Some(ResourceMetadata::from_arn(&rule.arn)),
        };
        Ok(Some(Snapshot::with_status(&desired.name, spec, status)))
    }

    /// Latest snapshot of an archive.
    pub fn observe_archive(
        &self,
        desired: &ArchiveSpec,
    ) -> Result<Option<Snapshot<ArchiveSpec, ArchiveStatus>>> {
        let Some(archive) = self.api.describe_archive(&desired.archive_name)? else {
            return Ok(None);
        };
        let spec = ArchiveSpec {
            archive_name: archive.archive_name,
            description: Some(archive.description),
            event_pattern: Some(archive.event_pattern),
            event_source_arn: Some(archive.event_source_arn),
            event_source_ref: desired.event_source_ref.clone(),
            retention_days: Some(archive.retention_days),
        };
        let status = ArchiveStatus {
            metadata: Some(ResourceMetadata::from_arn(&archive.archive_arn)),
            creation_time: Some(archive.creation_time),
            state: Some(archive.state),
            state_reason: non_empty(Some(&archive.state_reason)),
        };
        Ok(Some(Snapshot::with_status(&desired.archive_name, spec, status)))
    }

    /// Latest snapshot of an endpoint.
    pub fn observe_endpoint(
        &self,
        desired: &EndpointSpec,
    ) -> Result<Option<Snapshot<EndpointSpec, EndpointStatus>>> {
        let Some(endpoint) = self.api.describe_endpoint(&desired.name)? else {
            return Ok(None);
        };
        let spec = EndpointSpec {
            description: Some(endpoint.description),
            event_buses: endpoint.event_buses,
            name: endpoint.name,
            replication_config: Some(endpoint.replication_config),
            role_arn: Some(endpoint.role_arn),
            routing_config: Some(endpoint.routing_config),
        };
        let status = EndpointStatus {
            metadata: Some(ResourceMetadata::from_arn(&endpoint.arn)),
            state: Some(endpoint.state),
            state_reason: non_empty(Some(&endpoint.state_reason)),
        };
        Ok(Some(Snapshot::with_status(&desired.name, spec, status)))
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}
