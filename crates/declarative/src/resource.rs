//! Type-erased reconcilable resources
//!
//! The typed engine works on one [`ResourceKind`](crate::ResourceKind) at a
//! time. A [`Reconcilable`] wraps one identity of any kind, with whatever it
//! needs to read its latest state, so an execution plan can hold a mix.

use crate::types::Outcome;
use anyhow::Result;
use std::fmt;

/// One identity that can be driven through a reconcile pass
pub trait Reconcilable: Send + Sync + fmt::Debug {
    /// Unique identifier within its kind
    fn id(&self) -> String;

    /// Kind name, used for grouping and target filters
    fn kind(&self) -> &'static str;

    /// Human-readable description
    fn description(&self) -> String {
        format!("{} {}", self.kind(), self.id())
    }

    /// Read latest state, then run one pass
    fn reconcile(&self) -> Result<Outcome>;
}

/// A boxed reconcilable for type-erased storage
pub type BoxedReconcilable = Box<dyn Reconcilable>;
