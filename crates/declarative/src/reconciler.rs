//! One reconcile pass for one identity
//!
//! [`plan`] is pure: it looks at the desired and latest snapshots and says
//! which remote calls a pass would make. [`reconcile`] runs that plan
//! against a [`RemoteResource`] and stops at the first remote error.

use crate::error::Error;
use crate::delta::FieldPath;
use crate::kind::{ResourceKind, SnapshotOf};
use crate::lifecycle::Movement;
use crate::orchestrator::{UpdateDecision, UpdatePlan, plan_update};
use crate::types::{Outcome, Rejection, Requeue};

/// Remote operations for one kind
pub trait RemoteResource<K: ResourceKind> {
    type Error: From<Error>;

    fn create(&self, desired: &SnapshotOf<K>) -> Result<(), Self::Error>;

    fn update(&self, latest: &SnapshotOf<K>, request: &K::Request) -> Result<(), Self::Error>;

    /// Converge the sub-collection at `path` from `latest` to `desired`
    fn sync_collection(
        &self,
        path: &str,
        desired: &SnapshotOf<K>,
        latest: &SnapshotOf<K>,
    ) -> Result<(), Self::Error>;

    fn delete(&self, latest: &SnapshotOf<K>) -> Result<(), Self::Error>;
}

/// Remote calls a pass would make
#[derive(Debug, Clone, PartialEq)]
pub enum Step<R> {
    /// No remote call; the pass ends with this outcome
    Done(Outcome),
    Create,
    Delete,
    Update {
        changed: Vec<FieldPath>,
        plan: UpdatePlan<R>,
    },
}

/// Decide what a pass would do without touching the remote.
pub fn plan<K: ResourceKind>(
    desired: Option<&SnapshotOf<K>>,
    latest: Option<&SnapshotOf<K>>,
) -> crate::Result<Step<K::Request>> {
    let step = match (desired, latest) {
        (None, None) => Step::Done(Outcome::InSync),
        (None, Some(latest)) => match K::movement(&latest.status) {
            Movement::Transitional | Movement::Unknown => {
                Step::Done(Outcome::Deferred(wait::<K>(latest)))
            }
            Movement::Stable | Movement::Terminal => Step::Delete,
        },
        (Some(desired), None) => match K::validate(&desired.spec, None) {
            Ok(()) => Step::Create,
            Err(err) => Step::Done(Outcome::Rejected(Rejection::new(err.to_string()))),
        },
        (Some(desired), Some(latest)) => {
            let delta = K::delta(desired, latest)?;
            if delta.is_empty() {
                Step::Done(match K::movement(&latest.status) {
                    Movement::Stable => Outcome::InSync,
                    Movement::Terminal => Outcome::Rejected(Rejection::new(format!(
                        "{} is in terminal state {}",
                        K::KIND,
                        K::lifecycle_state(&latest.status).unwrap_or("<none>")
                    ))),
                    Movement::Transitional | Movement::Unknown => {
                        Outcome::Deferred(wait::<K>(latest))
                    }
                })
            } else {
                match plan_update::<K>(desired, latest, &delta)? {
                    UpdateDecision::Reject(rejection) => Step::Done(Outcome::Rejected(rejection)),
                    UpdateDecision::Defer(requeue) => Step::Done(Outcome::Deferred(requeue)),
                    UpdateDecision::Apply(plan) => Step::Update {
                        changed: delta.paths(),
                        plan,
                    },
                }
            }
        }
    };
    Ok(step)
}

fn wait<K: ResourceKind>(latest: &SnapshotOf<K>) -> Requeue {
    Requeue::new(
        K::REQUEUE_AFTER,
        format!(
            "{} is in state {}",
            K::KIND,
            K::lifecycle_state(&latest.status).unwrap_or("<none>")
        ),
    )
}

/// Run one pass: plan, then issue the remote calls in order.
///
/// A remote error aborts the remaining calls and is returned unchanged.
pub fn reconcile<K, R>(
    remote: &R,
    desired: Option<&SnapshotOf<K>>,
    latest: Option<&SnapshotOf<K>>,
) -> Result<Outcome, R::Error>
where
    K: ResourceKind,
    R: RemoteResource<K>,
{
    let step = plan::<K>(desired, latest)?;
    let outcome = run_step::<K, R>(remote, step, desired, latest)?;
    log::info!(
        "{} {}: {outcome}",
        K::KIND,
        desired.or(latest).map_or("", |s| s.identity.as_str())
    );
    Ok(outcome)
}

/// Issue the remote calls of `step`.
///
/// The step must come from [`plan`] over the same snapshots; any other
/// pairing is an error and makes no remote call.
fn run_step<K, R>(
    remote: &R,
    step: Step<K::Request>,
    desired: Option<&SnapshotOf<K>>,
    latest: Option<&SnapshotOf<K>>,
) -> Result<Outcome, R::Error>
where
    K: ResourceKind,
    R: RemoteResource<K>,
{
    let outcome = match (step, desired, latest) {
        (Step::Done(outcome), _, _) => outcome,
        (Step::Create, Some(desired), None) => {
            log::debug!("creating {} {}", K::KIND, desired.identity);
            remote.create(desired)?;
            Outcome::Created {
                requeue_after: K::REQUEUE_AFTER,
            }
        }
        (Step::Delete, None, Some(latest)) => {
            log::debug!("deleting {} {}", K::KIND, latest.identity);
            remote.delete(latest)?;
            Outcome::Deleted
        }
        (Step::Update { changed, plan }, Some(desired), Some(latest)) => {
            if let Some(request) = &plan.request {
                log::debug!("updating {} {}", K::KIND, latest.identity);
                remote.update(latest, request)?;
            }
            for path in &plan.collections {
                log::debug!("syncing {path} for {} {}", K::KIND, latest.identity);
                remote.sync_collection(path, desired, latest)?;
            }
            Outcome::Updated {
                changed,
                requeue_after: plan.requeue_after,
            }
        }
        (Step::Create, None, _) | (Step::Create, Some(_), Some(_)) => {
            return Err(mismatch::<K>("create", desired, latest).into());
        }
        (Step::Delete, Some(_), _) | (Step::Delete, None, None) => {
            return Err(mismatch::<K>("delete", desired, latest).into());
        }
        (Step::Update { .. }, None, _) | (Step::Update { .. }, Some(_), None) => {
            return Err(mismatch::<K>("update", desired, latest).into());
        }
    };
    Ok(outcome)
}

fn mismatch<K: ResourceKind>(
    step: &'static str,
    desired: Option<&SnapshotOf<K>>,
    latest: Option<&SnapshotOf<K>>,
) -> Error {
    let presence = |present: bool| if present { "present" } else { "absent" };
    Error::StepMismatch {
        kind: K::KIND,
        step,
        desired: presence(desired.is_some()),
        latest: presence(latest.is_some()),
    }
}
