//! Field-level delta computation
//!
//! [`diff`] compares a desired and a latest spec and reports every field
//! path where they disagree. Specs are serialized with serde and walked
//! along a static [`Schema`], so the comparison order is fixed and each
//! field gets exactly one equivalence rule.
//!
//! Per-kind [`CompareHook`]s run before the walk. A hook owns one or more
//! paths; the walk never revisits an owned path or anything below it.

use crate::collection::{Keyed, reconcile};
use crate::equivalence::Equivalence;
use crate::error::Result;
use crate::schema::{Field, FieldKind, Schema, join_path, member};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Dotted path to a field, e.g. `Spec.RoutingConfig.FailoverConfig`
///
/// The empty path is the root and stands for the whole resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldPath(String);

impl FieldPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn root() -> Self {
        Self(String::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this path is `subject` or nested below it.
    pub fn contains(&self, subject: &str) -> bool {
        path_within(&self.0, subject)
    }
}

fn path_within(path: &str, subject: &str) -> bool {
    subject.is_empty()
        || path == subject
        || path
            .strip_prefix(subject)
            .is_some_and(|rest| rest.starts_with('.'))
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "<resource>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl From<&str> for FieldPath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for FieldPath {
    fn from(path: String) -> Self {
        Self(path)
    }
}

/// One differing field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Difference {
    pub path: FieldPath,
    pub desired: Value,
    pub latest: Value,
}

/// Ordered list of differences between two snapshots
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Delta {
    differences: Vec<Difference>,
}

impl Delta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a difference. A path that is already recorded is kept as is.
    pub fn add(&mut self, path: impl Into<FieldPath>, desired: Value, latest: Value) {
        let path = path.into();
        if self.differences.iter().any(|d| d.path == path) {
            return;
        }
        log::trace!("delta at {path}");
        self.differences.push(Difference {
            path,
            desired,
            latest,
        });
    }

    /// Whether any difference sits at `path` or below it.
    pub fn different_at(&self, path: &str) -> bool {
        self.differences.iter().any(|d| d.path.contains(path))
    }

    pub fn is_empty(&self) -> bool {
        self.differences.is_empty()
    }

    pub fn len(&self) -> usize {
        self.differences.len()
    }

    pub fn differences(&self) -> &[Difference] {
        &self.differences
    }

    pub fn paths(&self) -> Vec<FieldPath> {
        self.differences.iter().map(|d| d.path.clone()).collect()
    }

    /// The subset of `candidates` touched by this delta, in candidate order.
    pub fn touched<'a>(&self, candidates: &[&'a str]) -> Vec<&'a str> {
        candidates
            .iter()
            .copied()
            .filter(|c| self.different_at(c))
            .collect()
    }

    /// Whether any difference lies outside every path in `excluded`.
    pub fn differs_outside(&self, excluded: &[&str]) -> bool {
        self.differences
            .iter()
            .any(|d| !excluded.iter().any(|e| d.path.contains(e)))
    }
}

/// A per-kind comparison that takes ownership of some field paths
pub struct CompareHook<S> {
    /// Paths adjudicated by this hook, including everything below them
    pub paths: &'static [&'static str],
    pub compare: fn(desired: &S, latest: &S, delta: &mut Delta),
}

impl<S> fmt::Debug for CompareHook<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompareHook")
            .field("paths", &self.paths)
            .finish_non_exhaustive()
    }
}

/// Compute the delta between `desired` and `latest`.
///
/// When exactly one side is absent the result is a single difference at the
/// root path. Two absent sides are equal.
pub fn diff<S: Serialize>(
    schema: &Schema,
    hooks: &[CompareHook<S>],
    desired: Option<&S>,
    latest: Option<&S>,
) -> Result<Delta> {
    let mut delta = Delta::new();
    let (desired, latest) = match (desired, latest) {
        (None, None) => return Ok(delta),
        (Some(d), Some(l)) => (d, l),
        (d, l) => {
            delta.add(
                FieldPath::root(),
                d.map(serde_json::to_value).transpose()?.unwrap_or(Value::Null),
                l.map(serde_json::to_value).transpose()?.unwrap_or(Value::Null),
            );
            return Ok(delta);
        }
    };

    let mut owned: Vec<&str> = Vec::new();
    for hook in hooks {
        (hook.compare)(desired, latest, &mut delta);
        owned.extend_from_slice(hook.paths);
    }

    let a = serde_json::to_value(desired)?;
    let b = serde_json::to_value(latest)?;
    walk(schema.fields, schema.root, &a, &b, &owned, &mut delta);
    Ok(delta)
}

fn walk(fields: &[Field], parent: &str, a: &Value, b: &Value, owned: &[&str], delta: &mut Delta) {
    for field in fields {
        let path = join_path(parent, field.name);
        if owned.iter().any(|o| path_within(&path, o)) {
            continue;
        }
        let (av, bv) = (member(a, field.key), member(b, field.key));
        let equal = match field.kind {
            FieldKind::Scalar(rule) => rule.values(av, bv),
            FieldKind::Opaque => av == bv,
            FieldKind::Keyed { key, payload } => keyed_equal(av, bv, key, payload),
            FieldKind::Object(children) => match (av.is_null(), bv.is_null()) {
                (true, true) => true,
                (false, false) => {
                    walk(children, &path, av, bv, owned, delta);
                    true
                }
                _ => false,
            },
        };
        if !equal {
            delta.add(path, av.clone(), bv.clone());
        }
    }
}

/// Borrowed JSON element of a keyed collection
#[derive(Clone, Copy)]
struct Element<'a> {
    key_field: &'a str,
    rule: Equivalence,
    value: &'a Value,
}

impl Keyed for Element<'_> {
    fn key(&self) -> Option<&str> {
        self.value.get(self.key_field).and_then(Value::as_str)
    }

    fn same_payload(&self, other: &Self) -> bool {
        payload_equal(self.value, other.value, self.rule)
    }
}

fn payload_equal(a: &Value, b: &Value, rule: Equivalence) -> bool {
    match (rule, a, b) {
        (Equivalence::Strict, _, _) => a == b,
        (_, Value::Object(ao), Value::Object(bo)) => ao
            .keys()
            .chain(bo.keys())
            .all(|k| rule.values(member(a, k), member(b, k))),
        _ => rule.values(a, b),
    }
}

fn elements<'a>(value: &'a Value, key_field: &'a str, rule: Equivalence) -> Vec<Element<'a>> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|value| Element {
                    key_field,
                    rule,
                    value,
                })
                .collect()
        })
        .unwrap_or_default()
}

fn keyed_equal(a: &Value, b: &Value, key_field: &str, rule: Equivalence) -> bool {
    reconcile(&elements(a, key_field, rule), &elements(b, key_field, rule)).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, Default, Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Probe {
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        bus: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        routing: Option<Routing>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        tags: Vec<Tag>,
        #[serde(skip_serializing_if = "Option::is_none")]
        mode: Option<String>,
    }

    #[derive(Debug, Clone, Default, Serialize)]
    struct Routing {
        #[serde(skip_serializing_if = "Option::is_none")]
        primary: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        secondary: Option<String>,
    }

    #[derive(Debug, Clone, Serialize)]
    struct Tag {
        key: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    }

    const ROUTING: &[Field] = &[
        Field::scalar("Primary", "primary", Equivalence::Strict),
        Field::scalar("Secondary", "secondary", Equivalence::Strict),
    ];
    const FIELDS: &[Field] = &[
        Field::scalar("Name", "name", Equivalence::Strict),
        Field::scalar("Description", "description", Equivalence::NilEmpty),
        Field::scalar("Bus", "bus", Equivalence::Default("default")),
        Field::object("Routing", "routing", ROUTING),
        Field::keyed("Tags", "tags", "key", Equivalence::NilEmpty),
        Field::scalar("Mode", "mode", Equivalence::Strict),
    ];
    static SCHEMA: Schema = Schema::new("Spec", FIELDS);

    fn mode_hook(desired: &Probe, latest: &Probe, delta: &mut Delta) {
        let norm = |m: &Option<String>| m.as_deref().unwrap_or("on").to_ascii_lowercase();
        if norm(&desired.mode) != norm(&latest.mode) {
            delta.add("Spec.Mode", json!(desired.mode), json!(latest.mode));
        }
    }

    static HOOKS: &[CompareHook<Probe>] = &[CompareHook {
        paths: &["Spec.Mode"],
        compare: mode_hook,
    }];

    fn probe() -> Probe {
        Probe {
            name: Some("orders".into()),
            description: Some("order events".into()),
            bus: None,
            routing: Some(Routing {
                primary: Some("a".into()),
                secondary: Some("b".into()),
            }),
            tags: vec![
                Tag {
                    key: "env".into(),
                    value: Some("prod".into()),
                },
                Tag {
                    key: "team".into(),
                    value: None,
                },
            ],
            mode: None,
        }
    }

    fn paths(delta: &Delta) -> Vec<String> {
        delta.paths().iter().map(|p| p.as_str().to_string()).collect()
    }

    #[test]
    fn test_field_path_contains() {
        let path = FieldPath::new("Spec.RoutingConfig.FailoverConfig");
        assert!(path.contains("Spec.RoutingConfig"));
        assert!(path.contains("Spec.RoutingConfig.FailoverConfig"));
        assert!(!path.contains("Spec.Routing"));
        assert!(!path.contains("Spec.RoutingConfig.FailoverConfig.Primary"));
        assert!(path.contains(""));
    }

    #[test]
    fn test_reflexive() {
        let a = probe();
        assert!(diff(&SCHEMA, HOOKS, Some(&a), Some(&a)).unwrap().is_empty());
        let empty = Probe::default();
        assert!(diff(&SCHEMA, HOOKS, Some(&empty), Some(&empty)).unwrap().is_empty());
    }

    #[test]
    fn test_one_side_absent_is_root_difference() {
        let a = probe();
        let delta = diff(&SCHEMA, HOOKS, Some(&a), None).unwrap();
        assert_eq!(delta.len(), 1);
        assert!(delta.differences()[0].path.is_root());
        assert!(diff::<Probe>(&SCHEMA, HOOKS, None, None).unwrap().is_empty());
    }

    #[test]
    fn test_nil_empty_and_default_rules() {
        let mut a = probe();
        let mut b = probe();
        a.description = None;
        b.description = Some(String::new());
        a.bus = Some("default".into());
        b.bus = None;
        assert!(diff(&SCHEMA, HOOKS, Some(&a), Some(&b)).unwrap().is_empty());

        b.bus = Some("orders".into());
        let delta = diff(&SCHEMA, HOOKS, Some(&a), Some(&b)).unwrap();
        assert_eq!(paths(&delta), vec!["Spec.Bus"]);
    }

    #[test]
    fn test_nested_leaf_difference() {
        let a = probe();
        let mut b = probe();
        b.routing.as_mut().unwrap().secondary = Some("c".into());
        let delta = diff(&SCHEMA, HOOKS, Some(&a), Some(&b)).unwrap();
        assert_eq!(paths(&delta), vec!["Spec.Routing.Secondary"]);
        assert!(delta.different_at("Spec.Routing"));
    }

    #[test]
    fn test_nested_nil_difference_reported_at_parent() {
        let a = probe();
        let mut b = probe();
        b.routing = None;
        let delta = diff(&SCHEMA, HOOKS, Some(&a), Some(&b)).unwrap();
        assert_eq!(paths(&delta), vec!["Spec.Routing"]);
    }

    #[test]
    fn test_keyed_collection_ignores_order() {
        let a = probe();
        let mut b = probe();
        b.tags.reverse();
        b.tags[0].value = Some(String::new());
        assert!(diff(&SCHEMA, HOOKS, Some(&a), Some(&b)).unwrap().is_empty());

        b.tags.pop();
        let delta = diff(&SCHEMA, HOOKS, Some(&a), Some(&b)).unwrap();
        assert_eq!(paths(&delta), vec!["Spec.Tags"]);
    }

    #[test]
    fn test_hook_owns_its_path() {
        let mut a = probe();
        let mut b = probe();
        a.mode = Some("ON".into());
        b.mode = None;
        assert!(diff(&SCHEMA, HOOKS, Some(&a), Some(&b)).unwrap().is_empty());

        b.mode = Some("off".into());
        let delta = diff(&SCHEMA, HOOKS, Some(&a), Some(&b)).unwrap();
        assert_eq!(paths(&delta), vec!["Spec.Mode"]);
    }

    #[test]
    fn test_symmetric_paths() {
        let a = probe();
        let mut b = probe();
        b.name = Some("payments".into());
        b.description = None;
        b.routing = None;
        b.tags.clear();
        b.mode = Some("off".into());
        let forward = diff(&SCHEMA, HOOKS, Some(&a), Some(&b)).unwrap();
        let backward = diff(&SCHEMA, HOOKS, Some(&b), Some(&a)).unwrap();
        let mut f = paths(&forward);
        let mut r = paths(&backward);
        f.sort();
        r.sort();
        assert_eq!(f, r);
        assert_eq!(forward.len(), 5);
    }

    #[test]
    fn test_touched_and_differs_outside() {
        let mut delta = Delta::new();
        delta.add("Spec.Tags", Value::Null, json!([]));
        assert_eq!(delta.touched(&["Spec.Name", "Spec.Tags"]), vec!["Spec.Tags"]);
        assert!(!delta.differs_outside(&["Spec.Tags"]));
        delta.add("Spec.Description", json!("a"), json!("b"));
        assert!(delta.differs_outside(&["Spec.Tags"]));
    }

    #[test]
    fn test_add_keeps_first_entry() {
        let mut delta = Delta::new();
        delta.add("Spec.Tags", json!(1), json!(2));
        delta.add("Spec.Tags", json!(3), json!(4));
        assert_eq!(delta.len(), 1);
        assert_eq!(delta.differences()[0].desired, json!(1));
    }
}
