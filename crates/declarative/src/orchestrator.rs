//! Update orchestration
//!
//! Given a desired snapshot, the latest snapshot and their delta,
//! [`plan_update`] decides whether the change is rejected, deferred or
//! applied, and for applied changes builds the typed update request.
//!
//! Checks run in this order: immutable fields, validation, terminal state,
//! transitional or unknown state. Only a stable resource reaches `Apply`.

use crate::delta::Delta;
use crate::error::{Error, Result};
use crate::kind::{ResourceKind, SnapshotOf};
use crate::lifecycle::Movement;
use crate::schema::{FieldKind, lookup};
use crate::types::{Rejection, Requeue};
use serde_json::{Map, Value};
use std::time::Duration;

/// What to do with a pending change
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateDecision<R> {
    Reject(Rejection),
    Defer(Requeue),
    Apply(UpdatePlan<R>),
}

/// Remote calls needed to apply a change
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatePlan<R> {
    /// Update call for non-collection fields, if any changed
    pub request: Option<R>,
    /// Sub-collection paths to sync, in declaration order
    pub collections: Vec<&'static str>,
    /// Read-back delay; success is confirmed on the next pass
    pub requeue_after: Duration,
}

/// Decide how to handle `delta` for a kind.
pub fn plan_update<K: ResourceKind>(
    desired: &SnapshotOf<K>,
    latest: &SnapshotOf<K>,
    delta: &Delta,
) -> Result<UpdateDecision<K::Request>> {
    let touched = delta.touched(K::immutable_fields());
    if !touched.is_empty() {
        log::warn!("{} {}: immutable fields changed", K::KIND, desired.identity);
        return Ok(UpdateDecision::Reject(Rejection::new(format!(
            "immutable fields have been modified: {}",
            touched.join(", ")
        ))));
    }

    if let Err(err) = K::validate(&desired.spec, Some(delta)) {
        return Ok(UpdateDecision::Reject(Rejection::new(err.to_string())));
    }

    let state = K::lifecycle_state(&latest.status).unwrap_or("<none>");
    match K::movement(&latest.status) {
        Movement::Terminal => {
            return Ok(UpdateDecision::Reject(Rejection::new(format!(
                "{} is in terminal state {state}",
                K::KIND
            ))));
        }
        Movement::Transitional | Movement::Unknown => {
            log::debug!("{} {} is {state}, deferring", K::KIND, desired.identity);
            return Ok(UpdateDecision::Defer(Requeue::new(
                K::REQUEUE_AFTER,
                format!("{} is in state {state}, cannot be modified", K::KIND),
            )));
        }
        Movement::Stable => {}
    }

    let collections = delta.touched(K::sub_collections());
    let request = if K::SUPPORTS_UPDATE && delta.differs_outside(K::sub_collections()) {
        Some(build_request::<K>(&desired.spec, &latest.spec, delta)?)
    } else {
        None
    };

    Ok(UpdateDecision::Apply(UpdatePlan {
        request,
        collections,
        requeue_after: K::REQUEUE_AFTER,
    }))
}

/// Build the update request for `desired`.
///
/// Every field that is set in `latest`, absent from `desired` and reported
/// by the delta is written with its cleared value so the remote drops it.
/// Fields with an [`UnsetRule`](crate::kind::UnsetRule) use the rule's value
/// instead whenever the desired value is empty. Sub-collections are never
/// part of the request.
pub fn build_request<K: ResourceKind>(
    desired: &K::Spec,
    latest: &K::Spec,
    delta: &Delta,
) -> Result<K::Request> {
    let mut payload = serde_json::to_value(desired)?;
    if !payload.is_object() {
        return Err(Error::NotAnObject { kind: K::KIND });
    }
    let latest = serde_json::to_value(latest)?;
    let rules = K::unset_rules();
    let collections = K::sub_collections();
    let entries = K::schema().entries();

    for entry in &entries {
        if collections.iter().any(|c| *c == entry.path) {
            remove_path(&mut payload, &entry.keys);
            continue;
        }
        if rules.iter().any(|r| r.path == entry.path) || !delta.different_at(&entry.path) {
            continue;
        }
        let current = lookup(&latest, &entry.keys);
        if lookup(&payload, &entry.keys).is_null() && !current.is_null() {
            log::trace!("clearing {}", entry.path);
            let cleared = match entry.field.kind {
                FieldKind::Object(_) => Value::Object(Map::new()),
                _ => cleared_value(current),
            };
            set_path(&mut payload, &entry.keys, cleared);
        }
    }

    for rule in rules {
        let Some(entry) = entries.iter().find(|e| e.path == rule.path) else {
            continue;
        };
        if !is_empty_value(lookup(&payload, &entry.keys)) {
            continue;
        }
        match rule.cleared {
            Some(value) => set_path(&mut payload, &entry.keys, value()),
            None => remove_path(&mut payload, &entry.keys),
        }
    }

    Ok(serde_json::from_value(payload)?)
}

/// Zero value of the same JSON type as `value`
fn cleared_value(value: &Value) -> Value {
    match value {
        Value::String(_) => Value::String(String::new()),
        Value::Number(_) => Value::from(0),
        Value::Bool(_) => Value::Bool(false),
        Value::Array(_) => Value::Array(Vec::new()),
        Value::Object(_) => Value::Object(Map::new()),
        Value::Null => Value::Null,
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn set_path(root: &mut Value, keys: &[&str], value: Value) {
    let Some((last, parents)) = keys.split_last() else {
        return;
    };
    let mut current = root;
    for key in parents {
        if current.is_null() {
            *current = Value::Object(Map::new());
        }
        let Value::Object(map) = current else {
            return;
        };
        current = map
            .entry((*key).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    if current.is_null() {
        *current = Value::Object(Map::new());
    }
    if let Value::Object(map) = current {
        map.insert((*last).to_string(), value);
    }
}

fn remove_path(root: &mut Value, keys: &[&str]) {
    let Some((last, parents)) = keys.split_last() else {
        return;
    };
    let mut current = root;
    for key in parents {
        match current.get_mut(*key) {
            Some(next) => current = next,
            None => return,
        }
    }
    if let Value::Object(map) = current {
        map.remove(*last);
    }
}
