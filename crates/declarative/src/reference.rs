//! Cross-resource reference resolution
//!
//! Some spec fields can be given either as a literal identifier or as a
//! reference to another managed resource. Before a pass, the reference is
//! replaced with a value read from the referenced resource, provided that
//! resource is synced and not terminal.

use crate::types::{Outcome, Rejection, Requeue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Name of a referenced resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceName {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// Reference wrapper as it appears in a spec: `{ from = { name = "orders" } }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceReference {
    pub from: ReferenceName,
}

impl ResourceReference {
    pub fn to(name: impl Into<String>) -> Self {
        Self {
            from: ReferenceName {
                name: Some(name.into()),
                namespace: None,
            },
        }
    }
}

/// What a reader knows about a referenced resource
#[derive(Debug, Clone, PartialEq)]
pub struct ReferencedObject {
    pub synced: bool,
    pub terminal: bool,
    /// Serialized resource; looked up with a dotted path
    pub document: Value,
}

/// Read access to other managed resources
pub trait ReferenceReader {
    fn read(&self, kind: &str, name: &str) -> Option<ReferencedObject>;
}

/// Description of one resolvable field
#[derive(Debug, Clone, Copy)]
pub struct ReferenceTarget {
    /// Identifier field name in the spec (`eventSourceARN`)
    pub field: &'static str,
    /// Reference field name in the spec (`eventSourceRef`)
    pub reference: &'static str,
    /// Kind of the referenced resource
    pub kind: &'static str,
    /// Dotted path of the value inside the referenced document
    pub path: &'static str,
    /// Whether one of identifier or reference must be present
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("{field} and {reference} cannot both be set")]
    BothSet {
        field: &'static str,
        reference: &'static str,
    },

    #[error("one of {field} or {reference} must be set")]
    Required {
        field: &'static str,
        reference: &'static str,
    },

    #[error("{reference} has an empty name")]
    EmptyName { reference: &'static str },

    #[error("referenced {kind} {name} not found")]
    NotFound { kind: &'static str, name: String },

    #[error("referenced {kind} {name} is in a terminal state")]
    Terminal { kind: &'static str, name: String },

    #[error("referenced {kind} {name} is not synced yet")]
    NotSynced { kind: &'static str, name: String },

    #[error("referenced {kind} {name} has no value at {path}")]
    MissingField {
        kind: &'static str,
        name: String,
        path: &'static str,
    },
}

impl ReferenceError {
    /// Whether waiting may resolve the error
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NotSynced { .. } | Self::NotFound { .. })
    }

    /// Map the error onto a pass outcome.
    pub fn into_outcome(self, requeue_after: Duration) -> Outcome {
        if self.is_transient() {
            Outcome::Deferred(Requeue::new(requeue_after, self.to_string()))
        } else {
            Outcome::Rejected(Rejection::new(self.to_string()))
        }
    }
}

/// Check that exactly the allowed combination of identifier and reference is
/// present.
pub fn validate(
    identifier: Option<&str>,
    reference: Option<&ResourceReference>,
    target: &ReferenceTarget,
) -> Result<(), ReferenceError> {
    let has_identifier = identifier.is_some_and(|s| !s.is_empty());
    match (has_identifier, reference.is_some()) {
        (true, true) => Err(ReferenceError::BothSet {
            field: target.field,
            reference: target.reference,
        }),
        (false, false) if target.required => Err(ReferenceError::Required {
            field: target.field,
            reference: target.reference,
        }),
        _ => Ok(()),
    }
}

/// Resolve a field.
///
/// Returns the literal identifier when no reference is set, the value read
/// from the referenced resource otherwise, and `None` when neither is set on
/// an optional field.
pub fn resolve(
    identifier: Option<&str>,
    reference: Option<&ResourceReference>,
    target: &ReferenceTarget,
    reader: &dyn ReferenceReader,
) -> Result<Option<String>, ReferenceError> {
    validate(identifier, reference, target)?;
    let Some(reference) = reference else {
        return Ok(identifier.map(str::to_string));
    };
    let name = match reference.from.name.as_deref() {
        Some(name) if !name.is_empty() => name,
        _ => {
            return Err(ReferenceError::EmptyName {
                reference: target.reference,
            });
        }
    };

    let object = reader
        .read(target.kind, name)
        .ok_or_else(|| ReferenceError::NotFound {
            kind: target.kind,
            name: name.to_string(),
        })?;
    if object.terminal {
        return Err(ReferenceError::Terminal {
            kind: target.kind,
            name: name.to_string(),
        });
    }
    if !object.synced {
        return Err(ReferenceError::NotSynced {
            kind: target.kind,
            name: name.to_string(),
        });
    }

    let value = target
        .path
        .split('.')
        .try_fold(&object.document, |v, key| v.get(key))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ReferenceError::MissingField {
            kind: target.kind,
            name: name.to_string(),
            path: target.path,
        })?;
    log::debug!("resolved {} via {} {name}", target.field, target.kind);
    Ok(Some(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    const SOURCE: ReferenceTarget = ReferenceTarget {
        field: "eventSourceARN",
        reference: "eventSourceRef",
        kind: "EventBus",
        path: "status.arn",
        required: true,
    };

    #[derive(Default)]
    struct Store(HashMap<String, ReferencedObject>);

    impl ReferenceReader for Store {
        fn read(&self, _kind: &str, name: &str) -> Option<ReferencedObject> {
            self.0.get(name).cloned()
        }
    }

    fn store(synced: bool, terminal: bool, document: Value) -> Store {
        let mut s = Store::default();
        s.0.insert(
            "orders".into(),
            ReferencedObject {
                synced,
                terminal,
                document,
            },
        );
        s
    }

    fn bus_ref() -> ResourceReference {
        ResourceReference::to("orders")
    }

    #[test]
    fn test_both_set() {
        let err = resolve(Some("arn"), Some(&bus_ref()), &SOURCE, &Store::default()).unwrap_err();
        assert!(matches!(err, ReferenceError::BothSet { .. }));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_required() {
        let err = resolve(None, None, &SOURCE, &Store::default()).unwrap_err();
        assert!(matches!(err, ReferenceError::Required { .. }));

        let optional = ReferenceTarget {
            required: false,
            ..SOURCE
        };
        assert_eq!(resolve(None, None, &optional, &Store::default()).unwrap(), None);
    }

    #[test]
    fn test_identifier_passes_through() {
        let value = resolve(Some("arn:x"), None, &SOURCE, &Store::default()).unwrap();
        assert_eq!(value.as_deref(), Some("arn:x"));
    }

    #[test]
    fn test_resolves_from_synced_resource() {
        let reader = store(true, false, json!({ "status": { "arn": "arn:bus" } }));
        let value = resolve(None, Some(&bus_ref()), &SOURCE, &reader).unwrap();
        assert_eq!(value.as_deref(), Some("arn:bus"));
    }

    #[test]
    fn test_not_synced_is_transient() {
        let reader = store(false, false, json!({}));
        let err = resolve(None, Some(&bus_ref()), &SOURCE, &reader).unwrap_err();
        assert!(err.is_transient());
        assert!(matches!(
            err.into_outcome(Duration::from_secs(5)),
            Outcome::Deferred(_)
        ));
    }

    #[test]
    fn test_terminal_and_missing_field() {
        let reader = store(true, true, json!({}));
        let err = resolve(None, Some(&bus_ref()), &SOURCE, &reader).unwrap_err();
        assert!(matches!(err, ReferenceError::Terminal { .. }));

        let reader = store(true, false, json!({ "status": {} }));
        let err = resolve(None, Some(&bus_ref()), &SOURCE, &reader).unwrap_err();
        assert!(matches!(err, ReferenceError::MissingField { .. }));
        assert!(err.into_outcome(Duration::from_secs(5)).is_terminal());
    }

    #[test]
    fn test_missing_resource_is_transient() {
        let err = resolve(None, Some(&bus_ref()), &SOURCE, &Store::default()).unwrap_err();
        assert!(matches!(err, ReferenceError::NotFound { .. }));
        assert!(err.is_transient());
    }

    #[test]
    fn test_empty_reference_name() {
        let reference = ResourceReference::default();
        let err = resolve(None, Some(&reference), &SOURCE, &Store::default()).unwrap_err();
        assert_eq!(err, ReferenceError::EmptyName {
            reference: "eventSourceRef"
        });
    }
}
