//! Kind-generic glue for driving passes
//!
//! [`ManagedKind`] extends [`ResourceKind`] with what a driver needs that
//! the engine does not: identity, ARN, reference handling, observation and
//! the remote binding. [`run_pass`] strings them together for one identity.

use crate::Client;
use crate::error::Result;
use crate::kinds::{
    ArchiveKind, ArchiveSpec, ArchiveStatus, EndpointKind, EndpointSpec, EndpointStatus,
    EventBusKind, EventBusSpec, EventBusStatus, ResourceType, RuleKind, RuleSpec, RuleStatus,
};
use crate::references;
use declarative::{
    Outcome, ReferenceError, ReferenceReader, ResourceKind, Snapshot, SnapshotOf, reconcile,
};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// A kind the CLI can manage end to end
pub trait ManagedKind:
    ResourceKind<
        Spec: DeserializeOwned + Send + Sync,
        Status: Serialize + Send + Sync,
    > + Sized
    + Send
    + Sync
    + 'static
{
    const TYPE: ResourceType;

    /// Identity of a desired spec (its name)
    fn identity(spec: &Self::Spec) -> &str;

    /// ARN recorded in a status
    fn arn(status: &Self::Status) -> Option<&str>;

    /// Minimal spec for an identity, used to observe resources that are no
    /// longer declared
    fn named(identity: &str) -> Self::Spec;

    /// Check the identifier/reference combinations of a spec.
    fn check_references(_spec: &Self::Spec) -> std::result::Result<(), ReferenceError> {
        Ok(())
    }

    /// Copy of `spec` with references replaced by resolved values.
    fn resolve(
        spec: &Self::Spec,
        _reader: &dyn ReferenceReader,
    ) -> std::result::Result<Self::Spec, ReferenceError> {
        Ok(spec.clone())
    }

    fn observe(
        client: &Client,
        spec: &Self::Spec,
        recorded_arn: Option<&str>,
    ) -> Result<Option<SnapshotOf<Self>>>;

    /// One engine pass against the client
    fn reconcile(
        client: &Client,
        desired: Option<&SnapshotOf<Self>>,
        latest: Option<&SnapshotOf<Self>>,
    ) -> Result<Outcome>;
}

/// Result of [`run_pass`]
#[derive(Debug, Clone)]
pub struct Pass<K: ManagedKind> {
    pub outcome: Outcome,
    /// Latest snapshot observed before any call was made
    pub latest: Option<SnapshotOf<K>>,
}

/// Resolve references, observe, then run one pass.
///
/// `desired` is `None` to delete the resource recorded under `identity`. A
/// reference that cannot be resolved ends the pass without observing: a
/// transient failure defers, anything else rejects.
pub fn run_pass<K: ManagedKind>(
    client: &Client,
    identity: &str,
    desired: Option<&K::Spec>,
    reader: &dyn ReferenceReader,
    recorded_arn: Option<&str>,
) -> Result<Pass<K>> {
    let resolved = match desired.map(|spec| K::resolve(spec, reader)).transpose() {
        Ok(resolved) => resolved,
        Err(err) => {
            log::debug!("{} {identity}: {err}", K::KIND);
            return Ok(Pass {
                outcome: err.into_outcome(K::REQUEUE_AFTER),
                latest: None,
            });
        }
    };

    let lookup = match &resolved {
        Some(spec) => spec.clone(),
        None => K::named(identity),
    };
    let latest = K::observe(client, &lookup, recorded_arn)?;
    let desired = resolved.map(|spec| Snapshot::new(identity, spec));
    let outcome = K::reconcile(client, desired.as_ref(), latest.as_ref())?;
    Ok(Pass { outcome, latest })
}

impl ManagedKind for EventBusKind {
    const TYPE: ResourceType = ResourceType::EventBus;

    fn identity(spec: &EventBusSpec) -> &str {
        &spec.name
    }

    fn arn(status: &EventBusStatus) -> Option<&str> {
        status.arn()
    }

    fn named(identity: &str) -> EventBusSpec {
        EventBusSpec {
            name: identity.to_string(),
            ..Default::default()
        }
    }

    fn observe(
        client: &Client,
        spec: &EventBusSpec,
        _recorded_arn: Option<&str>,
    ) -> Result<Option<SnapshotOf<Self>>> {
        client.observe_event_bus(spec)
    }

    fn reconcile(
        client: &Client,
        desired: Option<&SnapshotOf<Self>>,
        latest: Option<&SnapshotOf<Self>>,
    ) -> Result<Outcome> {
        reconcile::<Self, _>(client, desired, latest)
    }
}

impl ManagedKind for RuleKind {
    const TYPE: ResourceType = ResourceType::Rule;

    fn identity(spec: &RuleSpec) -> &str {
        &spec.name
    }

    fn arn(status: &RuleStatus) -> Option<&str> {
        status.arn()
    }

    fn named(identity: &str) -> RuleSpec {
        RuleSpec {
            name: identity.to_string(),
            ..Default::default()
        }
    }

    fn check_references(spec: &RuleSpec) -> std::result::Result<(), ReferenceError> {
        references::check_rule(spec)
    }

    fn resolve(
        spec: &RuleSpec,
        reader: &dyn ReferenceReader,
    ) -> std::result::Result<RuleSpec, ReferenceError> {
        references::resolve_rule(spec, reader)
    }

    fn observe(
        client: &Client,
        spec: &RuleSpec,
        recorded_arn: Option<&str>,
    ) -> Result<Option<SnapshotOf<Self>>> {
        client.observe_rule(spec, recorded_arn)
    }

    fn reconcile(
        client: &Client,
        desired: Option<&SnapshotOf<Self>>,
        latest: Option<&SnapshotOf<Self>>,
    ) -> Result<Outcome> {
        reconcile::<Self, _>(client, desired, latest)
    }
}

impl ManagedKind for ArchiveKind {
    const TYPE: ResourceType = ResourceType::Archive;

    fn identity(spec: &ArchiveSpec) -> &str {
        &spec.archive_name
    }

    fn arn(status: &ArchiveStatus) -> Option<&str> {
        status.arn()
    }

    fn named(identity: &str) -> ArchiveSpec {
        ArchiveSpec {
            archive_name: identity.to_string(),
            ..Default::default()
        }
    }

    fn check_references(spec: &ArchiveSpec) -> std::result::Result<(), ReferenceError> {
        references::check_archive(spec)
    }

    fn resolve(
        spec: &ArchiveSpec,
        reader: &dyn ReferenceReader,
    ) -> std::result::Result<ArchiveSpec, ReferenceError> {
        references::resolve_archive(spec, reader)
    }

    fn observe(
        client: &Client,
        spec: &ArchiveSpec,
        _recorded_arn: Option<&str>,
    ) -> Result<Option<SnapshotOf<Self>>> {
        client.observe_archive(spec)
    }

    fn reconcile(
        client: &Client,
        desired: Option<&SnapshotOf<Self>>,
        latest: Option<&SnapshotOf<Self>>,
    ) -> Result<Outcome> {
        reconcile::<Self, _>(client, desired, latest)
    }
}

impl ManagedKind for EndpointKind {
    const TYPE: ResourceType = ResourceType::Endpoint;

    fn identity(spec: &EndpointSpec) -> &str {
        &spec.name
    }

    fn arn(status: &EndpointStatus) -> Option<&str> {
        status.arn()
    }

    fn named(identity: &str) -> EndpointSpec {
        EndpointSpec {
            name: identity.to_string(),
            ..Default::default()
        }
    }

    fn observe(
        client: &Client,
        spec: &EndpointSpec,
        _recorded_arn: Option<&str>,
    ) -> Result<Option<SnapshotOf<Self>>> {
        client.observe_endpoint(spec)
    }

    fn reconcile(
        client: &Client,
        desired: Option<&SnapshotOf<Self>>,
        latest: Option<&SnapshotOf<Self>>,
    ) -> Result<Outcome> {
        reconcile::<Self, _>(client, desired, latest)
    }
}
