//! Remote calls per kind
//!
//! [`Client`] implements [`RemoteResource`] once per kind, mapping the
//! engine's create/update/sync/delete steps onto EventBridge API calls.

use crate::Client;
use crate::error::{Error, Result};
use crate::kinds::archive::{ArchiveKind, CreateArchiveInput, UpdateArchiveInput};
use crate::kinds::endpoint::{EndpointInput, EndpointKind};
use crate::kinds::event_bus::{CreateEventBusInput, EventBusKind, NoUpdate};
use crate::kinds::rule::{PutRuleInput, RuleKind};
use crate::types::Tag;
use declarative::{RemoteResource, SnapshotOf, sync_collection};

const TAGS: &str = "Spec.Tags";
const TARGETS: &str = "Spec.Targets";

fn unknown_collection(kind: &str, path: &str) -> Error {
    Error::Other(format!("{kind} has no collection {path}"))
}

fn missing_arn(kind: &str, identity: &str) -> Error {
    Error::Other(format!("{kind} {identity} has no ARN yet"))
}

impl Client {
    /// Converge the tags on `arn`: untag removed keys, then tag the rest.
    fn sync_tags(&self, arn: &str, desired: &[Tag], latest: &[Tag]) -> Result<()> {
        sync_collection(
            desired,
            latest,
            |keys| self.api().untag_resource(arn, keys),
            |tags| self.api().tag_resource(arn, tags),
        )?;
        Ok(())
    }
}

impl RemoteResource<EventBusKind> for Client {
    type Error = Error;

    fn create(&self, desired: &SnapshotOf<EventBusKind>) -> Result<()> {
        self.api()
            .create_event_bus(&CreateEventBusInput::from(&desired.spec))?;
        Ok(())
    }

    fn update(&self, latest: &SnapshotOf<EventBusKind>, _request: &NoUpdate) -> Result<()> {
        Err(Error::Other(format!(
            "event bus {} cannot be updated",
            latest.identity
        )))
    }

    fn sync_collection(
        &self,
        path: &str,
        desired: &SnapshotOf<EventBusKind>,
        latest: &SnapshotOf<EventBusKind>,
    ) -> Result<()> {
        if path != TAGS {
            return Err(unknown_collection("EventBus", path));
        }
        let arn = latest
            .status
            .arn()
            .ok_or_else(|| missing_arn("EventBus", &latest.identity))?;
        self.sync_tags(arn, &desired.spec.tags, &latest.spec.tags)
    }

    fn delete(&self, latest: &SnapshotOf<EventBusKind>) -> Result<()> {
        self.api().delete_event_bus(&latest.spec.name)
    }
}

impl RemoteResource<RuleKind> for Client {
    type Error = Error;

    fn create(&self, desired: &SnapshotOf<RuleKind>) -> Result<()> {
        let spec = &desired.spec;
        self.api().put_rule(&PutRuleInput::from(spec))?;
        if !spec.targets.is_empty() {
            self.api().put_targets(&spec.name, spec.bus(), &spec.targets)?;
        }
        Ok(())
    }

    fn update(&self, latest: &SnapshotOf<RuleKind>, request: &PutRuleInput) -> Result<()> {
        let mut request = request.clone();
        // PutRule replaces the whole rule; aim it at the bus the rule lives on
        if request.event_bus_name.as_deref().is_none_or(str::is_empty) {
            request.event_bus_name = Some(latest.spec.bus().to_string());
        }
        self.api().put_rule(&request)?;
        Ok(())
    }

    fn sync_collection(
        &self,
        path: &str,
        desired: &SnapshotOf<RuleKind>,
        latest: &SnapshotOf<RuleKind>,
    ) -> Result<()> {
        match path {
            TAGS => {
                let arn = latest
                    .status
                    .arn()
                    .ok_or_else(|| missing_arn("Rule", &latest.identity))?;
                self.sync_tags(arn, &desired.spec.tags, &latest.spec.tags)
            }
            TARGETS => {
                let (rule, bus) = (&latest.spec.name, latest.spec.bus());
                sync_collection(
                    &desired.spec.targets,
                    &latest.spec.targets,
                    |ids| self.api().remove_targets(rule, bus, ids),
                    |targets| self.api().put_targets(rule, bus, targets),
                )?;
                Ok(())
            }
            other => Err(unknown_collection("Rule", other)),
        }
    }

    fn delete(&self, latest: &SnapshotOf<RuleKind>) -> Result<()> {
        let spec = &latest.spec;
        if !spec.targets.is_empty() {
            let ids: Vec<String> = spec.targets.iter().filter_map(|t| t.id.clone()).collect();
            self.api().remove_targets(&spec.name, spec.bus(), &ids)?;
        }
        self.api().delete_rule(&spec.name, spec.bus())
    }
}

impl RemoteResource<ArchiveKind> for Client {
    type Error = Error;

    fn create(&self, desired: &SnapshotOf<ArchiveKind>) -> Result<()> {
        let input = CreateArchiveInput::from(&desired.spec);
        if input.event_source_arn.is_empty() {
            return Err(Error::Other(format!(
                "archive {} has no event source ARN",
                desired.identity
            )));
        }
        self.api().create_archive(&input)?;
        Ok(())
    }

    fn update(&self, _latest: &SnapshotOf<ArchiveKind>, request: &UpdateArchiveInput) -> Result<()> {
        self.api().update_archive(request)
    }

    fn sync_collection(
        &self,
        path: &str,
        _desired: &SnapshotOf<ArchiveKind>,
        _latest: &SnapshotOf<ArchiveKind>,
    ) -> Result<()> {
        Err(unknown_collection("Archive", path))
    }

    fn delete(&self, latest: &SnapshotOf<ArchiveKind>) -> Result<()> {
        self.api().delete_archive(&latest.spec.archive_name)
    }
}

impl RemoteResource<EndpointKind> for Client {
    type Error = Error;

    fn create(&self, desired: &SnapshotOf<EndpointKind>) -> Result<()> {
        self.api().create_endpoint(&EndpointInput::from(&desired.spec))?;
        Ok(())
    }

    fn update(&self, _latest: &SnapshotOf<EndpointKind>, request: &EndpointInput) -> Result<()> {
        self.api().update_endpoint(request)
    }

    fn sync_collection(
        &self,
        path: &str,
        _desired: &SnapshotOf<EndpointKind>,
        _latest: &SnapshotOf<EndpointKind>,
    ) -> Result<()> {
        Err(unknown_collection("Endpoint", path))
    }

    fn delete(&self, latest: &SnapshotOf<EndpointKind>) -> Result<()> {
        self.api().delete_endpoint(&latest.spec.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Operation;
    use crate::backend::MemoryBackend;
    use crate::kinds::EventBusSpec;
    use declarative::{Outcome, Snapshot, reconcile};
    use std::sync::Arc;

    fn setup() -> (Arc<MemoryBackend>, Client) {
        let backend = Arc::new(MemoryBackend::default());
        (backend.clone(), Client::with_backend(backend))
    }

    fn bus(tags: Vec<Tag>) -> EventBusSpec {
        EventBusSpec {
            name: "orders".into(),
            tags,
            ..Default::default()
        }
    }

    fn pass(client: &Client, spec: &EventBusSpec) -> Outcome {
        let desired = Snapshot::new(&spec.name, spec.clone());
        let latest = client.observe_event_bus(spec).unwrap();
        reconcile::<EventBusKind, _>(client, Some(&desired), latest.as_ref()).unwrap()
    }

    #[test]
    fn test_bus_tags_sync_with_minimal_calls() {
        let (backend, client) = setup();
        let created = pass(&client, &bus(vec![Tag::new("a", "1")]));
        assert!(matches!(created, Outcome::Created { .. }));

        backend.clear_calls();
        let updated = pass(&client, &bus(vec![Tag::new("a", "2")]));
        assert!(matches!(updated, Outcome::Updated { .. }));
        assert_eq!(backend.count(Operation::TagResource), 1);
        assert_eq!(backend.count(Operation::UntagResource), 0);

        backend.clear_calls();
        assert_eq!(pass(&client, &bus(vec![Tag::new("a", "2")])), Outcome::InSync);
        assert!(backend.mutations().is_empty());
    }

    #[test]
    fn test_bus_tag_removed() {
        let (backend, client) = setup();
        pass(&client, &bus(vec![Tag::new("a", "1"), Tag::new("b", "1")]));
        backend.clear_calls();
        pass(&client, &bus(vec![Tag::new("a", "1")]));
        assert_eq!(backend.count(Operation::UntagResource), 1);
        assert_eq!(backend.count(Operation::TagResource), 0);
    }

    #[test]
    fn test_bus_all_tags_removed() {
        let (backend, client) = setup();
        pass(&client, &bus(vec![Tag::new("k1", "v1")]));
        backend.clear_calls();

        let removed = pass(&client, &bus(Vec::new()));
        assert!(matches!(removed, Outcome::Updated { .. }));
        assert_eq!(backend.count(Operation::UntagResource), 1);
        assert_eq!(backend.count(Operation::TagResource), 0);

        backend.clear_calls();
        assert_eq!(pass(&client, &bus(Vec::new())), Outcome::InSync);
        assert!(backend.mutations().is_empty());
    }

    #[test]
    fn test_unknown_collection() {
        let (_, client) = setup();
        let snapshot = Snapshot::new("orders", bus(Vec::new()));
        let err = RemoteResource::<EventBusKind>::sync_collection(
            &client,
            "Spec.Targets",
            &snapshot,
            &snapshot,
        )
        .unwrap_err();
        assert!(err.to_string().contains("no collection Spec.Targets"));
    }
}
