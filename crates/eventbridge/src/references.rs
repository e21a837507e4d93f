//! Cross-resource references
//!
//! Rules may name their bus through `eventBusRef`, and archives their event
//! source through `eventSourceRef`. Both point at a managed event bus.

use crate::kinds::archive::ArchiveSpec;
use crate::kinds::event_bus::EventBusKind;
use crate::kinds::rule::RuleSpec;
use declarative::reference::{self, ReferenceError, ReferenceReader, ReferenceTarget};
use declarative::ResourceKind;

/// `eventSourceARN` of an archive, read from the bus status
pub const ARCHIVE_EVENT_SOURCE: ReferenceTarget = ReferenceTarget {
    field: "eventSourceARN",
    reference: "eventSourceRef",
    kind: EventBusKind::KIND,
    path: "status.ackResourceMetadata.arn",
    required: true,
};

/// `eventBusName` of a rule, read from the bus spec
pub const RULE_EVENT_BUS: ReferenceTarget = ReferenceTarget {
    field: "eventBusName",
    reference: "eventBusRef",
    kind: EventBusKind::KIND,
    path: "spec.name",
    required: false,
};

/// Check the identifier/reference combination of a rule.
pub fn check_rule(spec: &RuleSpec) -> Result<(), ReferenceError> {
    reference::validate(
        spec.event_bus_name.as_deref(),
        spec.event_bus_ref.as_ref(),
        &RULE_EVENT_BUS,
    )
}

/// Check the identifier/reference combination of an archive.
pub fn check_archive(spec: &ArchiveSpec) -> Result<(), ReferenceError> {
    reference::validate(
        spec.event_source_arn.as_deref(),
        spec.event_source_ref.as_ref(),
        &ARCHIVE_EVENT_SOURCE,
    )
}

/// Copy of `spec` with `eventBusName` filled from its reference.
pub fn resolve_rule(spec: &RuleSpec, reader: &dyn ReferenceReader) -> Result<RuleSpec, ReferenceError> {
    let bus = reference::resolve(
        spec.event_bus_name.as_deref(),
        spec.event_bus_ref.as_ref(),
        &RULE_EVENT_BUS,
        reader,
    )?;
    Ok(RuleSpec {
        event_bus_name: bus,
        ..spec.clone()
    })
}

/// Copy of `spec` with `eventSourceARN` filled from its reference.
pub fn resolve_archive(
    spec: &ArchiveSpec,
    reader: &dyn ReferenceReader,
) -> Result<ArchiveSpec, ReferenceError> {
    let source = reference::resolve(
        spec.event_source_arn.as_deref(),
        spec.event_source_ref.as_ref(),
        &ARCHIVE_EVENT_SOURCE,
        reader,
    )?;
    Ok(ArchiveSpec {
        event_source_arn: source,
        ..spec.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{ReferencedObject, ResourceReference};
    use serde_json::json;

    struct Buses(Option<ReferencedObject>);

    impl ReferenceReader for Buses {
        fn read(&self, kind: &str, _name: &str) -> Option<ReferencedObject> {
            assert_eq!(kind, "EventBus");
            self.0.clone()
        }
    }

    fn synced_bus() -> Buses {
        Buses(Some(ReferencedObject {
            synced: true,
            terminal: false,
            document: json!({
                "identity": "orders",
                "spec": {"name": "orders"},
                "status": {"ackResourceMetadata": {
                    "arn": "arn:aws:events:us-east-1:123456789012:event-bus/orders"
                }}
            }),
        }))
    }

    #[test]
    fn test_resolve_rule_bus() {
        let spec = RuleSpec {
            name: "ship".into(),
            event_bus_ref: Some(ResourceReference::to("orders")),
            ..Default::default()
        };
        let resolved = resolve_rule(&spec, &synced_bus()).unwrap();
        assert_eq!(resolved.event_bus_name.as_deref(), Some("orders"));
        assert_eq!(resolved.event_bus_ref, spec.event_bus_ref);
    }

    #[test]
    fn test_rule_without_bus_stays_default() {
        let spec = RuleSpec {
            name: "ship".into(),
            ..Default::default()
        };
        let resolved = resolve_rule(&spec, &Buses(None)).unwrap();
        assert_eq!(resolved.event_bus_name, None);
        assert_eq!(resolved.bus(), "default");
    }

    #[test]
    fn test_resolve_archive_source() {
        let spec = ArchiveSpec {
            archive_name: "audit".into(),
            event_source_ref: Some(ResourceReference::to("orders")),
            ..Default::default()
        };
        let resolved = resolve_archive(&spec, &synced_bus()).unwrap();
        assert_eq!(
            resolved.event_source_arn.as_deref(),
            Some("arn:aws:events:us-east-1:123456789012:event-bus/orders")
        );
    }

    #[test]
    fn test_archive_source_required() {
        let spec = ArchiveSpec {
            archive_name: "audit".into(),
            ..Default::default()
        };
        let err = check_archive(&spec).unwrap_err();
        assert_eq!(
            err.to_string(),
            "one of eventSourceARN or eventSourceRef must be set"
        );
    }

    #[test]
    fn test_unsynced_bus_is_transient() {
        let spec = ArchiveSpec {
            archive_name: "audit".into(),
            event_source_ref: Some(ResourceReference::to("orders")),
            ..Default::default()
        };
        let reader = Buses(Some(ReferencedObject {
            synced: false,
            terminal: false,
            document: json!({}),
        }));
        let err = resolve_archive(&spec, &reader).unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn test_rule_both_set() {
        let spec = RuleSpec {
            name: "ship".into(),
            event_bus_name: Some("orders".into()),
            event_bus_ref: Some(ResourceReference::to("orders")),
            ..Default::default()
        };
        assert!(matches!(
            check_rule(&spec),
            Err(ReferenceError::BothSet { .. })
        ));
    }
}
