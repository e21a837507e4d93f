//! Static field schemas
//!
//! A [`Schema`] lists the fields of a resource spec in comparison order. It
//! is declared once per resource kind as a set of `const` slices so that the
//! delta engine and the update orchestrator walk the same tree.

use crate::equivalence::Equivalence;
use serde_json::Value;

/// How a single field is compared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A leaf value compared with an equivalence rule
    Scalar(Equivalence),
    /// A nested object; compared child by child
    Object(&'static [Field]),
    /// An unordered collection of objects identified by `key`
    Keyed {
        /// JSON key that identifies an element
        key: &'static str,
        /// Rule applied to string members when comparing element payloads
        payload: Equivalence,
    },
    /// Compared by full structural equality
    Opaque,
}

/// A field in a resource spec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Path segment used in field paths (`RoutingConfig`)
    pub name: &'static str,
    /// Serialized JSON key (`routingConfig`)
    pub key: &'static str,
    pub kind: FieldKind,
}

impl Field {
    pub const fn scalar(name: &'static str, key: &'static str, rule: Equivalence) -> Self {
        Self {
            name,
            key,
            kind: FieldKind::Scalar(rule),
        }
    }

    pub const fn object(name: &'static str, key: &'static str, fields: &'static [Field]) -> Self {
        Self {
            name,
            key,
            kind: FieldKind::Object(fields),
        }
    }

    pub const fn keyed(
        name: &'static str,
        key: &'static str,
        element_key: &'static str,
        payload: Equivalence,
    ) -> Self {
        Self {
            name,
            key,
            kind: FieldKind::Keyed {
                key: element_key,
                payload,
            },
        }
    }

    pub const fn opaque(name: &'static str, key: &'static str) -> Self {
        Self {
            name,
            key,
            kind: FieldKind::Opaque,
        }
    }
}

/// Ordered field tree for one resource spec
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    /// Root path segment, usually `Spec`
    pub root: &'static str,
    pub fields: &'static [Field],
}

/// A field together with its dotted path and JSON key chain
#[derive(Debug, Clone)]
pub struct FieldEntry {
    pub path: String,
    pub keys: Vec<&'static str>,
    pub field: &'static Field,
}

impl Schema {
    pub const fn new(root: &'static str, fields: &'static [Field]) -> Self {
        Self { root, fields }
    }

    /// Every field in the tree, depth first, in schema order.
    pub fn entries(&self) -> Vec<FieldEntry> {
        let mut out = Vec::new();
        collect_entries(self.fields, self.root, &[], &mut out);
        out
    }

    /// Whether `path` names a field in this schema.
    pub fn contains(&self, path: &str) -> bool {
        self.entries().iter().any(|e| e.path == path)
    }
}

fn collect_entries(
    fields: &'static [Field],
    parent: &str,
    parent_keys: &[&'static str],
    out: &mut Vec<FieldEntry>,
) {
    for field in fields {
        let path = join_path(parent, field.name);
        let mut keys = parent_keys.to_vec();
        keys.push(field.key);
        out.push(FieldEntry {
            path: path.clone(),
            keys: keys.clone(),
            field,
        });
        if let FieldKind::Object(children) = field.kind {
            collect_entries(children, &path, &keys, out);
        }
    }
}

/// Join a parent path and a segment with a dot.
pub fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

/// Look up a member of a JSON object, treating anything missing as null.
pub fn member<'a>(value: &'a Value, key: &str) -> &'a Value {
    value.get(key).unwrap_or(&Value::Null)
}

/// Follow a chain of keys through nested objects.
pub fn lookup<'a>(value: &'a Value, keys: &[&str]) -> &'a Value {
    keys.iter().fold(value, |v, k| member(v, k))
}

#[cfg(test)]
mod tests {
    use super::*;

    const INNER: &[Field] = &[Field::scalar("HealthCheck", "healthCheck", Equivalence::Strict)];
    const FIELDS: &[Field] = &[
        Field::scalar("Name", "name", Equivalence::Strict),
        Field::object("Primary", "primary", INNER),
        Field::keyed("Tags", "tags", "key", Equivalence::NilEmpty),
    ];
    static SCHEMA: Schema = Schema::new("Spec", FIELDS);

    #[test]
    fn test_entries_are_depth_first() {
        let paths: Vec<String> = SCHEMA.entries().into_iter().map(|e| e.path).collect();
        assert_eq!(
            paths,
            vec![
                "Spec.Name",
                "Spec.Primary",
                "Spec.Primary.HealthCheck",
                "Spec.Tags"
            ]
        );
    }

    #[test]
    fn test_entry_keys_follow_json_names() {
        let entries = SCHEMA.entries();
        let health = entries
            .iter()
            .find(|e| e.path == "Spec.Primary.HealthCheck")
            .unwrap();
        assert_eq!(health.keys, vec!["primary", "healthCheck"]);
    }

    #[test]
    fn test_contains() {
        assert!(SCHEMA.contains("Spec.Primary.HealthCheck"));
        assert!(!SCHEMA.contains("Spec.Missing"));
    }

    #[test]
    fn test_lookup_missing_is_null() {
        let value = serde_json::json!({ "primary": { "healthCheck": "arn" } });
        assert_eq!(lookup(&value, &["primary", "healthCheck"]), "arn");
        assert!(lookup(&value, &["secondary", "route"]).is_null());
    }
}
