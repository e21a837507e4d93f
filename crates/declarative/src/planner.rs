//! Execution planner - orders resources into dependency stages

use crate::resource::{BoxedReconcilable, Reconcilable};

/// A group of resources with no ordering constraints between them
#[derive(Debug)]
pub struct Stage {
    pub name: String,
    pub resources: Vec<BoxedReconcilable>,
}

/// An execution plan: stages run in order, resources within a stage run
/// in parallel
#[derive(Debug, Default)]
pub struct ExecutionPlan {
    pub stages: Vec<Stage>,
}

impl ExecutionPlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource to the named stage, creating the stage at the end of
    /// the plan if it does not exist yet.
    ///
    /// An identity that is already planned for the same kind is ignored, so
    /// one identity never has two passes in flight.
    pub fn add(&mut self, stage: &str, resource: BoxedReconcilable) {
        let duplicate = self
            .stages
            .iter()
            .flat_map(|s| &s.resources)
            .any(|r| r.kind() == resource.kind() && r.id() == resource.id());
        if duplicate {
            log::warn!("{} already planned, skipping", resource.description());
            return;
        }
        match self.stages.iter_mut().find(|s| s.name == stage) {
            Some(existing) => existing.resources.push(resource),
            None => self.stages.push(Stage {
                name: stage.to_string(),
                resources: vec![resource],
            }),
        }
    }

    /// Filter plan to only include resources matching a predicate
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&dyn Reconcilable) -> bool,
    {
        let stages = self
            .stages
            .into_iter()
            .map(|stage| Stage {
                name: stage.name,
                resources: stage
                    .resources
                    .into_iter()
                    .filter(|r| predicate(r.as_ref()))
                    .collect(),
            })
            .filter(|stage| !stage.resources.is_empty())
            .collect();
        Self { stages }
    }

    /// Filter plan to only include resources matching a target pattern
    ///
    /// Target format: "kind" or "kind.name"
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                let (kind, name) = parse_target(t);
                self.filter(|r| matches_filter(r, kind.as_deref(), name.as_deref()))
            }
        }
    }

    /// Total number of resources in the plan
    pub fn total_resources(&self) -> usize {
        self.stages.iter().map(|s| s.resources.len()).sum()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.total_resources() == 0
    }
}

/// Parse a target string like "kind.name" into (kind, name)
pub fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    match target.split_once('.') {
        None => (Some(target.to_string()), None),
        Some((kind, name)) if !name.contains('.') => {
            (Some(kind.to_string()), Some(name.to_string()))
        }
        Some(_) => (None, Some(target.to_string())),
    }
}

/// Canonical kind name for a user-supplied alias
pub fn normalize_kind(kind: &str) -> String {
    match kind.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
        "bus" | "buses" | "eventbus" | "eventbuses" => "eventbus".to_string(),
        "rules" => "rule".to_string(),
        "archives" => "archive".to_string(),
        "endpoints" => "endpoint".to_string(),
        other => other.to_string(),
    }
}

/// Check if a resource matches the filter criteria
fn matches_filter(resource: &dyn Reconcilable, kind: Option<&str>, name: Option<&str>) -> bool {
    if let Some(k) = kind
        && normalize_kind(k) != normalize_kind(resource.kind())
    {
        return false;
    }

    if let Some(n) = name
        && !resource.id().contains(n)
    {
        return false;
    }

    true
}
