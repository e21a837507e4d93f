//! Per-kind reconciliation strategy
//!
//! Every resource kind implements [`ResourceKind`] once. The trait is a
//! static table of what differs between kinds: field schema, comparison
//! hooks, immutable fields, separately synced sub-collections, unset rules,
//! lifecycle states and validation. The orchestrator and reconcile flow are
//! written once against it.

use crate::delta::{self, CompareHook, Delta};
use crate::error::{Result, ValidationError};
use crate::lifecycle::{Movement, StateTable};
use crate::schema::Schema;
use crate::types::{DEFAULT_REQUEUE_AFTER, Snapshot};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Snapshot type of a kind
pub type SnapshotOf<K> = Snapshot<<K as ResourceKind>::Spec, <K as ResourceKind>::Status>;

/// How a field is written to the update request when removed from the spec
#[derive(Debug, Clone, Copy)]
pub struct UnsetRule {
    /// Field path the rule applies to
    pub path: &'static str,
    /// Value to send; `None` drops the field from the request
    pub cleared: Option<fn() -> Value>,
}

/// Strategy for one resource kind
pub trait ResourceKind {
    /// Desired configuration; serializes to a JSON object without null members
    type Spec: Serialize + Clone + fmt::Debug + 'static;
    /// Remote-reported status
    type Status: Clone + fmt::Debug + Default;
    /// Payload of the kind's update call
    type Request: DeserializeOwned + fmt::Debug;

    /// Kind name used in logs and messages
    const KIND: &'static str;

    /// Delay before the next pass after a mutation or a lifecycle wait
    const REQUEUE_AFTER: Duration = DEFAULT_REQUEUE_AFTER;

    /// Whether the remote offers an update call for non-collection fields
    const SUPPORTS_UPDATE: bool = true;

    fn schema() -> &'static Schema;

    fn compare_hooks() -> &'static [CompareHook<Self::Spec>] {
        &[]
    }

    /// Paths that cannot change after creation
    fn immutable_fields() -> &'static [&'static str] {
        &[]
    }

    /// Keyed collections synced through their own remote calls
    fn sub_collections() -> &'static [&'static str] {
        &[]
    }

    fn unset_rules() -> &'static [UnsetRule] {
        &[]
    }

    /// Lifecycle table; kinds without one are always available
    fn lifecycle() -> Option<&'static StateTable> {
        None
    }

    fn lifecycle_state(_status: &Self::Status) -> Option<&str> {
        None
    }

    /// Shape validation of a desired spec.
    ///
    /// `delta` is absent when validating for creation.
    fn validate(_spec: &Self::Spec, _delta: Option<&Delta>) -> std::result::Result<(), ValidationError> {
        Ok(())
    }

    /// Lifecycle movement of a latest status
    fn movement(status: &Self::Status) -> Movement {
        match Self::lifecycle() {
            Some(table) => table.classify(Self::lifecycle_state(status)),
            None => Movement::Stable,
        }
    }

    /// Field-level delta between two snapshots
    fn delta(desired: &SnapshotOf<Self>, latest: &SnapshotOf<Self>) -> Result<Delta>
    where
        Self: Sized,
    {
        delta::diff(
            Self::schema(),
            Self::compare_hooks(),
            Some(&desired.spec),
            Some(&latest.spec),
        )
    }
}
