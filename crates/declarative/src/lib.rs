//! # Declarative
//!
//! A framework for reconciling declared resources against the state a remote
//! service reports for them.
//!
//! ## Core Concepts
//!
//! - **Snapshot**: desired or latest view of one resource (spec + status)
//! - **Delta**: field-level differences, computed along a static [`Schema`]
//! - **ResourceKind**: per-kind strategy (immutable fields, comparison hooks,
//!   lifecycle states, unset rules, validation)
//! - **UpdateDecision**: reject, defer or apply a pending change
//! - **ExecutionPlan**: identities grouped into ordered stages
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{reconcile, Outcome, Snapshot};
//!
//! let desired = Snapshot::new("orders", spec);
//! let latest = client.observe("orders")?;
//! match reconcile::<EventBusKind, _>(&client, Some(&desired), latest.as_ref())? {
//!     Outcome::InSync => {}
//!     Outcome::Deferred(requeue) => println!("retry in {:?}", requeue.after),
//!     other => println!("{other}"),
//! }
//! ```
//!
//! ## Provider Traits
//!
//! - [`RemoteResource`]: create/update/sync/delete calls for one kind
//! - [`ReferenceReader`]: read access to other managed resources
//! - [`ProgressCallback`] / [`ConfirmCallback`]: execution UI hooks

pub mod collection;
pub mod context;
pub mod delta;
pub mod equivalence;
pub mod error;
pub mod executor;
pub mod kind;
pub mod lifecycle;
pub mod orchestrator;
pub mod planner;
pub mod reconciler;
pub mod reference;
pub mod resource;
pub mod schema;
pub mod types;

// Re-export main types at crate root
pub use collection::{CollectionDiff, KeyValue, Keyed, sync_collection};
pub use context::{AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback};
pub use delta::{CompareHook, Delta, Difference, FieldPath, diff};
pub use equivalence::{Equivalence, equal_strings, equal_with_default, is_zero};
pub use error::{Error, Result, ValidationError};
pub use executor::{ExecuteReport, execute, execute_simple};
pub use kind::{ResourceKind, SnapshotOf, UnsetRule};
pub use lifecycle::{Movement, StateTable};
pub use orchestrator::{UpdateDecision, UpdatePlan, plan_update};
pub use planner::{ExecutionPlan, Stage, normalize_kind, parse_target};
pub use reconciler::{RemoteResource, Step, plan, reconcile};
pub use reference::{
    ReferenceError, ReferenceName, ReferenceReader, ReferenceTarget, ReferencedObject,
    ResourceReference,
};
pub use resource::{BoxedReconcilable, Reconcilable};
pub use schema::{Field, FieldKind, Schema};
pub use types::{
    DEFAULT_REQUEUE_AFTER, ExecuteOptions, Outcome, ReconcileSummary, Rejection, Requeue,
    ResourceReport, Snapshot,
};
