//! Reconcile passes against the in-memory backend.

use declarative::{FieldPath, Outcome, ReferenceReader, ReferencedObject, ResourceReference};
use eventbridge::api::Operation;
use eventbridge::backend::MemoryBackend;
use eventbridge::kinds::endpoint::{EndpointEventBus, RoutingConfig};
use eventbridge::kinds::{
    ArchiveKind, ArchiveSpec, EndpointKind, EndpointSpec, EventBusKind, EventBusSpec, RuleKind,
    RuleSpec,
};
use eventbridge::managed::{ManagedKind, run_pass};
use eventbridge::{Client, Tag, Target};
use std::collections::HashMap;
use std::sync::Arc;

const BUS_ARN: &str = "arn:aws:events:us-east-1:123456789012:event-bus/orders";

/// Reader over snapshots recorded by earlier passes
#[derive(Default)]
struct Synced(HashMap<String, serde_json::Value>);

impl Synced {
    fn record<K: ManagedKind>(&mut self, client: &Client, identity: &str) {
        let latest = K::observe(client, &K::named(identity), None)
            .unwrap()
            .expect("resource exists");
        self.0.insert(
            format!("{}/{identity}", K::KIND),
            serde_json::to_value(&latest).unwrap(),
        );
    }
}

impl ReferenceReader for Synced {
    fn read(&self, kind: &str, name: &str) -> Option<ReferencedObject> {
        self.0
            .get(&format!("{kind}/{name}"))
            .map(|document| ReferencedObject {
                synced: true,
                terminal: false,
                document: document.clone(),
            })
    }
}

fn setup() -> (Arc<MemoryBackend>, Client) {
    let backend = Arc::new(MemoryBackend::default());
    (backend.clone(), Client::with_backend(backend))
}

fn pass<K: ManagedKind>(client: &Client, reader: &Synced, spec: &K::Spec) -> Outcome {
    run_pass::<K>(client, K::identity(spec), Some(spec), reader, None)
        .unwrap()
        .outcome
}

fn orders_bus() -> EventBusSpec {
    EventBusSpec {
        name: "orders".into(),
        tags: vec![Tag::new("team", "payments")],
        ..Default::default()
    }
}

fn ship_rule(targets: Vec<Target>) -> RuleSpec {
    RuleSpec {
        name: "ship".into(),
        event_bus_ref: Some(ResourceReference::to("orders")),
        event_pattern: Some(r#"{"source":["orders"]}"#.into()),
        targets,
        ..Default::default()
    }
}

fn created(outcome: &Outcome) -> bool {
    matches!(outcome, Outcome::Created { .. })
}

#[test]
fn test_rule_converges_through_bus_reference() {
    let (backend, client) = setup();
    let mut reader = Synced::default();

    let rule = ship_rule(vec![Target::new("queue", "arn:aws:sqs:us-east-1:123456789012:ship")]);
    assert!(matches!(
        pass::<RuleKind>(&client, &reader, &rule),
        Outcome::Deferred(_)
    ));
    assert!(backend.mutations().is_empty());

    assert!(created(&pass::<EventBusKind>(&client, &reader, &orders_bus())));
    assert_eq!(pass::<EventBusKind>(&client, &reader, &orders_bus()), Outcome::InSync);
    reader.record::<EventBusKind>(&client, "orders");

    assert!(created(&pass::<RuleKind>(&client, &reader, &rule)));
    assert_eq!(backend.count(Operation::PutTargets), 1);

    backend.clear_calls();
    assert_eq!(pass::<RuleKind>(&client, &reader, &rule), Outcome::InSync);
    assert!(backend.mutations().is_empty());
}

#[test]
fn test_target_change_only_syncs_targets() {
    let (backend, client) = setup();
    let mut reader = Synced::default();
    pass::<EventBusKind>(&client, &reader, &orders_bus());
    reader.record::<EventBusKind>(&client, "orders");
    pass::<RuleKind>(&client, &reader, &ship_rule(vec![Target::new("a", "arn:a")]));

    backend.clear_calls();
    let outcome = pass::<RuleKind>(&client, &reader, &ship_rule(vec![Target::new("b", "arn:b")]));
    match outcome {
        Outcome::Updated { changed, .. } => assert_eq!(changed, vec![FieldPath::from("Spec.Targets")]),
        other => panic!("expected an update, got {other:?}"),
    }
    let operations: Vec<Operation> = backend.mutations().iter().map(|c| c.operation).collect();
    assert_eq!(operations, vec![Operation::RemoveTargets, Operation::PutTargets]);
}

#[test]
fn test_rule_delete_removes_targets_first() {
    let (backend, client) = setup();
    let mut reader = Synced::default();
    pass::<EventBusKind>(&client, &reader, &orders_bus());
    reader.record::<EventBusKind>(&client, "orders");
    pass::<RuleKind>(&client, &reader, &ship_rule(vec![Target::new("a", "arn:a")]));
    let arn = "arn:aws:events:us-east-1:123456789012:rule/orders/ship";

    backend.clear_calls();
    let deleted = run_pass::<RuleKind>(&client, "ship", None, &reader, Some(arn)).unwrap();
    assert_eq!(deleted.outcome, Outcome::Deleted);
    let operations: Vec<Operation> = backend.mutations().iter().map(|c| c.operation).collect();
    assert_eq!(operations, vec![Operation::RemoveTargets, Operation::DeleteRule]);
}

#[test]
fn test_failed_tag_call_aborts_remaining_steps() {
    let (backend, client) = setup();
    let mut reader = Synced::default();
    pass::<EventBusKind>(&client, &reader, &orders_bus());
    reader.record::<EventBusKind>(&client, "orders");
    pass::<RuleKind>(&client, &reader, &ship_rule(Vec::new()));

    backend.fail(Operation::TagResource, "ThrottlingException", "Rate exceeded");
    backend.clear_calls();
    let mut rule = ship_rule(vec![Target::new("a", "arn:a")]);
    rule.tags = vec![Tag::new("env", "prod")];
    let err = run_pass::<RuleKind>(&client, "ship", Some(&rule), &reader, None).unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(backend.count(Operation::PutTargets), 0);

    backend.clear_faults();
    assert!(matches!(
        pass::<RuleKind>(&client, &reader, &rule),
        Outcome::Updated { .. }
    ));
    assert_eq!(pass::<RuleKind>(&client, &reader, &rule), Outcome::InSync);
}

#[test]
fn test_bus_source_change_is_rejected() {
    let (backend, client) = setup();
    let reader = Synced::default();
    pass::<EventBusKind>(&client, &reader, &orders_bus());

    backend.clear_calls();
    let mut bus = orders_bus();
    bus.event_source_name = Some("aws.partner/example.com/orders".into());
    match pass::<EventBusKind>(&client, &reader, &bus) {
        Outcome::Rejected(rejection) => assert_eq!(
            rejection.reason,
            "immutable fields have been modified: Spec.EventSourceName"
        ),
        other => panic!("expected a rejection, got {other:?}"),
    }
    assert!(backend.mutations().is_empty());
}

#[test]
fn test_archive_waits_for_lifecycle() {
    let (backend, client) = setup();
    let mut reader = Synced::default();
    pass::<EventBusKind>(&client, &reader, &orders_bus());
    reader.record::<EventBusKind>(&client, "orders");

    let mut archive = ArchiveSpec {
        archive_name: "audit".into(),
        event_source_ref: Some(ResourceReference::to("orders")),
        retention_days: Some(30),
        ..Default::default()
    };
    assert!(created(&pass::<ArchiveKind>(&client, &reader, &archive)));
    let stored = client.observe_archive(&archive).unwrap().unwrap();
    assert_eq!(stored.spec.event_source_arn.as_deref(), Some(BUS_ARN));

    // still CREATING
    assert!(matches!(
        pass::<ArchiveKind>(&client, &reader, &archive),
        Outcome::Deferred(_)
    ));
    backend.settle();
    assert_eq!(pass::<ArchiveKind>(&client, &reader, &archive), Outcome::InSync);

    archive.description = Some("all order events".into());
    assert!(matches!(
        pass::<ArchiveKind>(&client, &reader, &archive),
        Outcome::Updated { .. }
    ));
    backend.clear_calls();
    archive.retention_days = None;
    match pass::<ArchiveKind>(&client, &reader, &archive) {
        Outcome::Deferred(requeue) => {
            assert_eq!(requeue.reason, "Archive is in state UPDATING, cannot be modified");
        }
        other => panic!("expected a deferral, got {other:?}"),
    }
    assert!(backend.mutations().is_empty());

    backend.settle();
    assert!(matches!(
        pass::<ArchiveKind>(&client, &reader, &archive),
        Outcome::Updated { .. }
    ));
    backend.settle();
    let stored = client.observe_archive(&archive).unwrap().unwrap();
    assert_eq!(stored.spec.retention_days, Some(0));
    assert_eq!(pass::<ArchiveKind>(&client, &reader, &archive), Outcome::InSync);
}

#[test]
fn test_failed_archive_is_terminal() {
    let (backend, client) = setup();
    let mut reader = Synced::default();
    pass::<EventBusKind>(&client, &reader, &orders_bus());
    reader.record::<EventBusKind>(&client, "orders");
    let archive = ArchiveSpec {
        archive_name: "audit".into(),
        event_source_arn: Some(BUS_ARN.into()),
        ..Default::default()
    };
    pass::<ArchiveKind>(&client, &reader, &archive);
    backend.set_archive_state("audit", "CREATE_FAILED", "bus deleted");

    let outcome = pass::<ArchiveKind>(&client, &reader, &archive);
    assert!(outcome.is_terminal());

    // terminal resources can still be deleted
    let deleted = run_pass::<ArchiveKind>(&client, "audit", None, &reader, None).unwrap();
    assert_eq!(deleted.outcome, Outcome::Deleted);
}

fn endpoint() -> EndpointSpec {
    EndpointSpec {
        name: "orders-global".into(),
        event_buses: vec![
            EndpointEventBus::new(BUS_ARN),
            EndpointEventBus::new("arn:aws:events:us-west-2:123456789012:event-bus/orders"),
        ],
        role_arn: Some("arn:aws:iam::123456789012:role/replication".into()),
        routing_config: Some(RoutingConfig::failover(
            "arn:aws:route53:::healthcheck/abc",
            "us-west-2",
        )),
        ..Default::default()
    }
}

#[test]
fn test_endpoint_lifecycle() {
    let (backend, client) = setup();
    let reader = Synced::default();
    let mut spec = endpoint();

    assert!(created(&pass::<EndpointKind>(&client, &reader, &spec)));
    assert!(matches!(
        pass::<EndpointKind>(&client, &reader, &spec),
        Outcome::Deferred(_)
    ));
    backend.settle();
    assert_eq!(pass::<EndpointKind>(&client, &reader, &spec), Outcome::InSync);

    spec.description = Some("orders failover".into());
    assert!(matches!(
        pass::<EndpointKind>(&client, &reader, &spec),
        Outcome::Updated { .. }
    ));
    backend.settle();

    // a failed update leaves the endpoint usable
    backend.set_endpoint_state("orders-global", "UPDATE_FAILED", "health check missing");
    assert_eq!(pass::<EndpointKind>(&client, &reader, &spec), Outcome::InSync);

    let deleted = run_pass::<EndpointKind>(&client, "orders-global", None, &reader, None).unwrap();
    assert_eq!(deleted.outcome, Outcome::Deleted);
    let deleting = run_pass::<EndpointKind>(&client, "orders-global", None, &reader, None).unwrap();
    assert!(matches!(deleting.outcome, Outcome::Deferred(_)));
    backend.settle();
    assert!(client.observe_endpoint(&spec).unwrap().is_none());
}
