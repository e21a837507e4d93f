//! Core types for reconciliation passes

use crate::delta::FieldPath;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Requeue delay used when a kind does not choose its own
pub const DEFAULT_REQUEUE_AFTER: Duration = Duration::from_secs(5);

/// A resource as seen at one point in time
///
/// Snapshots are built fresh for every pass and never mutated by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot<S, St> {
    /// Stable identity of the resource within its kind
    pub identity: String,
    pub spec: S,
    #[serde(default)]
    pub status: St,
}

impl<S, St: Default> Snapshot<S, St> {
    /// Snapshot with an empty status, as used for desired state
    pub fn new(identity: impl Into<String>, spec: S) -> Self {
        Self {
            identity: identity.into(),
            spec,
            status: St::default(),
        }
    }
}

impl<S, St> Snapshot<S, St> {
    pub fn with_status(identity: impl Into<String>, spec: S, status: St) -> Self {
        Self {
            identity: identity.into(),
            spec,
            status,
        }
    }
}

/// A caller error that retrying will not fix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub reason: String,
}

impl Rejection {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason)
    }
}

/// A request to run the pass again later
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requeue {
    pub after: Duration,
    pub reason: String,
}

impl Requeue {
    pub fn new(after: Duration, reason: impl Into<String>) -> Self {
        Self {
            after,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Requeue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (retry in {}s)", self.reason, self.after.as_secs())
    }
}

/// Result of one reconcile pass for one identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Desired and latest agree
    InSync,
    /// The resource was created; read back after `requeue_after`
    Created { requeue_after: Duration },
    /// Changes were sent; read back after `requeue_after`
    Updated {
        changed: Vec<FieldPath>,
        requeue_after: Duration,
    },
    /// The resource was deleted
    Deleted,
    /// Nothing was done; try again later
    Deferred(Requeue),
    /// Nothing was done; the desired state must change first
    Rejected(Rejection),
}

impl Outcome {
    /// Whether the pass ended in a caller error
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    /// Whether the pass sent a mutation to the remote
    pub fn is_change(&self) -> bool {
        matches!(
            self,
            Self::Created { .. } | Self::Updated { .. } | Self::Deleted
        )
    }

    /// When the identity should be looked at again, if at all
    pub fn requeue_after(&self) -> Option<Duration> {
        match self {
            Self::Created { requeue_after } | Self::Updated { requeue_after, .. } => {
                Some(*requeue_after)
            }
            Self::Deferred(requeue) => Some(requeue.after),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::InSync => "in sync",
            Self::Created { .. } => "created",
            Self::Updated { .. } => "updated",
            Self::Deleted => "deleted",
            Self::Deferred(_) => "deferred",
            Self::Rejected(_) => "rejected",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Updated { changed, .. } => {
                let paths: Vec<String> = changed.iter().map(ToString::to_string).collect();
                write!(f, "updated ({})", paths.join(", "))
            }
            Self::Deferred(requeue) => write!(f, "deferred: {requeue}"),
            Self::Rejected(rejection) => write!(f, "rejected: {rejection}"),
            other => write!(f, "{}", other.label()),
        }
    }
}

/// Result of reconciling one resource inside an execution plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceReport {
    pub id: String,
    pub kind: &'static str,
    /// The outcome, or the remote error that aborted the pass
    pub result: Result<Outcome, String>,
}

/// Summary of execution results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileSummary {
    pub in_sync: usize,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub deferred: usize,
    pub rejected: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl ReconcileSummary {
    /// Total number of mutations sent
    pub fn total_changes(&self) -> usize {
        self.created + self.updated + self.deleted
    }

    /// No remote failures and no rejections
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.rejected == 0
    }

    /// Total number of resources processed
    pub fn total(&self) -> usize {
        self.in_sync
            + self.created
            + self.updated
            + self.deleted
            + self.deferred
            + self.rejected
            + self.failed
            + self.skipped
    }

    pub fn add_result(&mut self, result: &Result<Outcome, String>) {
        match result {
            Ok(Outcome::InSync) => self.in_sync += 1,
            Ok(Outcome::Created { .. }) => self.created += 1,
            Ok(Outcome::Updated { .. }) => self.updated += 1,
            Ok(Outcome::Deleted) => self.deleted += 1,
            Ok(Outcome::Deferred(_)) => self.deferred += 1,
            Ok(Outcome::Rejected(_)) => self.rejected += 1,
            Err(_) => self.failed += 1,
        }
    }
}

/// Options for execution
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Number of identities reconciled in parallel within a stage
    pub jobs: usize,
    /// Verbose output
    pub verbose: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            jobs: 4,
            verbose: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_requeue() {
        let updated = Outcome::Updated {
            changed: vec![FieldPath::new("Spec.Description")],
            requeue_after: DEFAULT_REQUEUE_AFTER,
        };
        assert_eq!(updated.requeue_after(), Some(Duration::from_secs(5)));
        assert!(updated.is_change());
        assert_eq!(Outcome::InSync.requeue_after(), None);
        assert!(Outcome::Rejected(Rejection::new("bad")).is_terminal());
    }

    #[test]
    fn test_outcome_display() {
        let updated = Outcome::Updated {
            changed: vec![FieldPath::new("Spec.Tags"), FieldPath::new("Spec.Targets")],
            requeue_after: DEFAULT_REQUEUE_AFTER,
        };
        assert_eq!(updated.to_string(), "updated (Spec.Tags, Spec.Targets)");
        let deferred = Outcome::Deferred(Requeue::new(DEFAULT_REQUEUE_AFTER, "archive is CREATING"));
        assert_eq!(deferred.to_string(), "deferred: archive is CREATING (retry in 5s)");
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = ReconcileSummary::default();
        summary.add_result(&Ok(Outcome::InSync));
        summary.add_result(&Ok(Outcome::Deleted));
        summary.add_result(&Ok(Outcome::Rejected(Rejection::new("immutable"))));
        summary.add_result(&Err("throttled".into()));
        assert_eq!(summary.total(), 4);
        assert_eq!(summary.total_changes(), 1);
        assert!(!summary.is_success());
    }
}
