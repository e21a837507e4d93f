//! Manifest resources as executor work items
//!
//! Every declared (or pruned) resource becomes a [`Managed`] item. Items of
//! one run share a [`Shared`] table of conditions, which also backs the
//! reference reader: a reference resolves only against a resource whose last
//! recorded pass left it synced.

use crate::config::Manifest;
use crate::state::{Condition, condition_key, split_key};
use anyhow::Result;
use declarative::{ExecutionPlan, Outcome, Reconcilable, ReferenceReader, ReferencedObject};
use eventbridge::kinds::{ArchiveKind, EndpointKind, EventBusKind, RuleKind};
use eventbridge::managed::{ManagedKind, run_pass};
use eventbridge::{Client, ResourceType};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

// ============================================================================
// Shared State
// ============================================================================

/// Client and conditions shared by every item of a run
pub struct Shared {
    pub client: Client,
    conditions: Mutex<BTreeMap<String, Condition>>,
}

impl Shared {
    pub fn new(client: Client, conditions: BTreeMap<String, Condition>) -> Self {
        Self {
            client,
            conditions: Mutex::new(conditions),
        }
    }

    fn table(&self) -> MutexGuard<'_, BTreeMap<String, Condition>> {
        match self.conditions.lock() {
            Ok(locked) => locked,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn condition(&self, kind: &str, identity: &str) -> Option<Condition> {
        self.table().get(&condition_key(kind, identity)).cloned()
    }

    /// Record the condition of a resource; `None` forgets it.
    pub fn record(&self, kind: &str, identity: &str, condition: Option<Condition>) {
        let key = condition_key(kind, identity);
        let mut table = self.table();
        match condition {
            Some(condition) => {
                table.insert(key, condition);
            }
            None => {
                table.remove(&key);
            }
        }
    }

    /// Identities with a recorded condition for a kind
    pub fn recorded(&self, kind: &str) -> Vec<String> {
        self.table()
            .keys()
            .filter_map(|key| split_key(key))
            .filter(|(k, _)| *k == kind)
            .map(|(_, identity)| identity.to_string())
            .collect()
    }

    /// Copy of the condition table, for persisting
    pub fn conditions(&self) -> BTreeMap<String, Condition> {
        self.table().clone()
    }
}

impl fmt::Debug for Shared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shared")
            .field("conditions", &self.table().len())
            .finish_non_exhaustive()
    }
}

/// Serialized latest snapshot of a resource, if it exists
fn document<K: ManagedKind>(
    client: &Client,
    identity: &str,
    arn: Option<&str>,
) -> Option<serde_json::Value> {
    match K::observe(client, &K::named(identity), arn) {
        Ok(latest) => latest.and_then(|snapshot| serde_json::to_value(&snapshot).ok()),
        Err(err) => {
            log::debug!("reading referenced {} {identity} failed: {err}", K::KIND);
            None
        }
    }
}

impl ReferenceReader for Shared {
    fn read(&self, kind: &str, name: &str) -> Option<ReferencedObject> {
        let condition = self.condition(kind, name)?;
        let arn = condition.arn.as_deref();
        let document = match ResourceType::parse(kind)? {
            ResourceType::EventBus => document::<EventBusKind>(&self.client, name, arn),
            ResourceType::Rule => document::<RuleKind>(&self.client, name, arn),
            ResourceType::Archive => document::<ArchiveKind>(&self.client, name, arn),
            ResourceType::Endpoint => document::<EndpointKind>(&self.client, name, arn),
        }?;
        Some(ReferencedObject {
            synced: condition.synced,
            terminal: condition.terminal,
            document,
        })
    }
}

// ============================================================================
// Declared Kinds
// ============================================================================

/// A kind that can be declared in a manifest
pub trait Declared: ManagedKind {
    fn declared(manifest: &Manifest) -> &[Self::Spec];
}

impl Declared for EventBusKind {
    fn declared(manifest: &Manifest) -> &[Self::Spec] {
        &manifest.event_buses
    }
}

impl Declared for RuleKind {
    fn declared(manifest: &Manifest) -> &[Self::Spec] {
        &manifest.rules
    }
}

impl Declared for ArchiveKind {
    fn declared(manifest: &Manifest) -> &[Self::Spec] {
        &manifest.archives
    }
}

impl Declared for EndpointKind {
    fn declared(manifest: &Manifest) -> &[Self::Spec] {
        &manifest.endpoints
    }
}

/// Recorded identities of a kind that the manifest no longer declares
pub fn undeclared<K: Declared>(manifest: &Manifest, recorded: Vec<String>) -> Vec<String> {
    let declared: HashSet<&str> = K::declared(manifest).iter().map(K::identity).collect();
    recorded
        .into_iter()
        .filter(|identity| !declared.contains(identity.as_str()))
        .collect()
}

// ============================================================================
// Managed Resource
// ============================================================================

/// One identity's pass, runnable by the executor
pub struct Managed<K: ManagedKind> {
    identity: String,
    /// `None` deletes the resource
    desired: Option<K::Spec>,
    shared: Arc<Shared>,
}

impl<K: ManagedKind> Managed<K> {
    pub fn new(identity: impl Into<String>, desired: Option<K::Spec>, shared: Arc<Shared>) -> Self {
        Self {
            identity: identity.into(),
            desired,
            shared,
        }
    }
}

impl<K: ManagedKind> fmt::Debug for Managed<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Managed")
            .field("kind", &K::KIND)
            .field("identity", &self.identity)
            .field("desired", &self.desired)
            .finish()
    }
}

impl<K: ManagedKind> Reconcilable for Managed<K> {
    fn id(&self) -> String {
        self.identity.clone()
    }

    fn kind(&self) -> &'static str {
        K::KIND
    }

    fn description(&self) -> String {
        match self.desired {
            Some(_) => format!("{} {}", K::KIND, self.identity),
            None => format!("{} {} (undeclared)", K::KIND, self.identity),
        }
    }

    fn reconcile(&self) -> Result<Outcome> {
        let recorded = self
            .shared
            .condition(K::KIND, &self.identity)
            .and_then(|c| c.arn);

        let pass = match run_pass::<K>(
            &self.shared.client,
            &self.identity,
            self.desired.as_ref(),
            self.shared.as_ref(),
            recorded.as_deref(),
        ) {
            Ok(pass) => pass,
            Err(err) => {
                self.shared.record(
                    K::KIND,
                    &self.identity,
                    Some(Condition::from_error(err.to_string(), recorded)),
                );
                return Err(anyhow::Error::new(err)
                    .context(format!("{} {}", K::KIND, self.identity)));
            }
        };

        if pass.outcome.is_change() {
            log::info!("{} {}: {}", K::KIND, self.identity, pass.outcome);
        } else {
            log::debug!("{} {}: {}", K::KIND, self.identity, pass.outcome);
        }
        let gone = self.desired.is_none() && pass.outcome == Outcome::InSync;
        let condition = if gone {
            None
        } else {
            let arn = pass
                .latest
                .as_ref()
                .and_then(|latest| K::arn(&latest.status))
                .map(String::from)
                .or(recorded);
            Some(Condition::from_outcome(&pass.outcome, arn))
        };
        self.shared.record(K::KIND, &self.identity, condition);
        Ok(pass.outcome)
    }
}

// ============================================================================
// Plan Building
// ============================================================================

fn add_declared<K: Declared>(plan: &mut ExecutionPlan, manifest: &Manifest, shared: &Arc<Shared>) {
    for spec in K::declared(manifest) {
        let item = Managed::<K>::new(K::identity(spec), Some(spec.clone()), shared.clone());
        plan.add(K::TYPE.stage(), Box::new(item));
    }
}

fn add_pruned<K: Declared>(plan: &mut ExecutionPlan, manifest: &Manifest, shared: &Arc<Shared>) {
    let stage = format!("prune {}", K::TYPE.stage());
    for identity in undeclared::<K>(manifest, shared.recorded(K::KIND)) {
        plan.add(&stage, Box::new(Managed::<K>::new(identity, None, shared.clone())));
    }
}

/// Plan one pass for every declared resource, in dependency order.
///
/// With `prune`, recorded resources that are no longer declared are deleted
/// afterwards, dependents first.
pub fn build_plan(manifest: &Manifest, shared: &Arc<Shared>, prune: bool) -> ExecutionPlan {
    let mut plan = ExecutionPlan::new();
    add_declared::<EventBusKind>(&mut plan, manifest, shared);
    add_declared::<RuleKind>(&mut plan, manifest, shared);
    add_declared::<ArchiveKind>(&mut plan, manifest, shared);
    add_declared::<EndpointKind>(&mut plan, manifest, shared);
    if prune {
        add_pruned::<EndpointKind>(&mut plan, manifest, shared);
        add_pruned::<RuleKind>(&mut plan, manifest, shared);
        add_pruned::<ArchiveKind>(&mut plan, manifest, shared);
        add_pruned::<EventBusKind>(&mut plan, manifest, shared);
    }
    plan
}

// ============================================================================
// Tests
// ============================================================================
