//! Keyed collection reconciliation
//!
//! Tags and targets are unordered sets of records identified by a key. The
//! reconciler turns a desired and a latest list into the two remote calls
//! needed to converge them: one removal by key, one upsert of full records.

use crate::equivalence::equal_strings;
use std::collections::{HashMap, HashSet};

/// An element of a keyed collection
pub trait Keyed {
    /// Identifying key; absent keys compare as the empty string
    fn key(&self) -> Option<&str>;

    /// Whether two elements with the same key carry the same payload
    fn same_payload(&self, other: &Self) -> bool;
}

/// Plan to converge a collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionDiff<T> {
    /// Elements to upsert: new keys, and existing keys whose payload changed
    pub to_add: Vec<T>,
    /// Keys present remotely but absent from the desired list
    pub to_remove: Vec<String>,
}

impl<T> CollectionDiff<T> {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

impl<T> Default for CollectionDiff<T> {
    fn default() -> Self {
        Self {
            to_add: Vec::new(),
            to_remove: Vec::new(),
        }
    }
}

fn key_of<T: Keyed>(item: &T) -> &str {
    item.key().unwrap_or("")
}

/// Compute the add/remove plan for a keyed collection.
///
/// `latest` is scanned first so removals and payload updates come out in
/// remote order, followed by brand-new keys in desired order. Keys are
/// assumed unique on both sides; see [`duplicate_key`].
pub fn reconcile<T: Keyed + Clone>(desired: &[T], latest: &[T]) -> CollectionDiff<T> {
    let by_key: HashMap<&str, &T> = desired.iter().rev().map(|d| (key_of(d), d)).collect();
    let mut visited: HashSet<&str> = HashSet::with_capacity(latest.len());
    let mut diff = CollectionDiff::default();

    for current in latest {
        let key = key_of(current);
        visited.insert(key);
        match by_key.get(key) {
            None => diff.to_remove.push(key.to_string()),
            Some(wanted) if !wanted.same_payload(current) => diff.to_add.push((*wanted).clone()),
            Some(_) => {}
        }
    }

    for wanted in desired {
        if !visited.contains(key_of(wanted)) {
            diff.to_add.push(wanted.clone());
        }
    }

    diff
}

/// Whether two collections are equivalent regardless of order.
pub fn equivalent<T: Keyed + Clone>(desired: &[T], latest: &[T]) -> bool {
    reconcile(desired, latest).is_empty()
}

/// First key that appears more than once.
pub fn duplicate_key<T: Keyed>(items: &[T]) -> Option<String> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .iter()
        .map(key_of)
        .find(|key| !seen.insert(*key))
        .map(str::to_string)
}

/// Converge a collection through two remote calls.
///
/// `remove` runs only when there are keys to remove, then `add` only when
/// there are elements to add. An error from `remove` skips `add`.
pub fn sync_collection<T, E>(
    desired: &[T],
    latest: &[T],
    remove: impl FnOnce(&[String]) -> Result<(), E>,
    add: impl FnOnce(&[T]) -> Result<(), E>,
) -> Result<CollectionDiff<T>, E>
where
    T: Keyed + Clone,
{
    let diff = reconcile(desired, latest);
    if !diff.to_remove.is_empty() {
        log::debug!("removing {} collection element(s)", diff.to_remove.len());
        remove(&diff.to_remove)?;
    }
    if !diff.to_add.is_empty() {
        log::debug!("adding {} collection element(s)", diff.to_add.len());
        add(&diff.to_add)?;
    }
    Ok(diff)
}

/// Key/value pair with nil-empty value comparison, as used for resource tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: Option<String>,
    pub value: Option<String>,
}

impl Keyed for KeyValue {
    fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    fn same_payload(&self, other: &Self) -> bool {
        equal_strings(self.value.as_deref(), other.value.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn kv(key: &str, value: &str) -> KeyValue {
        KeyValue {
            key: Some(key.to_string()),
            value: Some(value.to_string()),
        }
    }

    #[test]
    fn test_equal_collections() {
        let a = vec![kv("env", "prod"), kv("team", "core")];
        let diff = reconcile(&a, &a);
        assert!(diff.is_empty());
    }

    #[test]
    fn test_permutation_is_equivalent() {
        let a = vec![kv("a", "1"), kv("b", "2"), kv("c", "3")];
        let b = vec![kv("c", "3"), kv("a", "1"), kv("b", "2")];
        assert!(equivalent(&a, &b));
        assert!(equivalent(&b, &a));
    }

    #[test]
    fn test_empty_and_absent_collections_are_equal() {
        let empty: Vec<KeyValue> = Vec::new();
        assert!(equivalent(&empty, &empty));
    }

    #[test]
    fn test_value_changed_is_added_not_removed() {
        let desired = vec![kv("env", "prod")];
        let latest = vec![kv("env", "dev")];
        let diff = reconcile(&desired, &latest);
        assert_eq!(diff.to_add, vec![kv("env", "prod")]);
        assert!(diff.to_remove.is_empty());
    }

    #[test]
    fn test_add_and_remove() {
        let desired = vec![kv("k2", "b"), kv("k3", "c")];
        let latest = vec![kv("k1", "a")];
        let diff = reconcile(&desired, &latest);
        assert_eq!(diff.to_add, vec![kv("k2", "b"), kv("k3", "c")]);
        assert_eq!(diff.to_remove, vec!["k1".to_string()]);
    }

    #[test]
    fn test_unchanged_elements_are_not_readded() {
        let desired = vec![kv("keep", "x"), kv("new", "y")];
        let latest = vec![kv("keep", "x")];
        let diff = reconcile(&desired, &latest);
        assert_eq!(diff.to_add, vec![kv("new", "y")]);
    }

    #[test]
    fn test_nil_value_matches_empty_value() {
        let desired = vec![KeyValue {
            key: Some("k".into()),
            value: None,
        }];
        let latest = vec![kv("k", "")];
        assert!(equivalent(&desired, &latest));
    }

    #[test]
    fn test_duplicate_key() {
        assert_eq!(duplicate_key(&[kv("a", "1"), kv("b", "2")]), None);
        assert_eq!(
            duplicate_key(&[kv("a", "1"), kv("b", "2"), kv("a", "3")]),
            Some("a".to_string())
        );
    }

    #[test]
    fn test_sync_skips_empty_calls() {
        let calls = RefCell::new(Vec::new());
        let desired = vec![kv("a", "1")];
        let latest = vec![kv("a", "1")];
        let diff = sync_collection(
            &desired,
            &latest,
            |_| -> Result<(), ()> {
                calls.borrow_mut().push("remove");
                Ok(())
            },
            |_| {
                calls.borrow_mut().push("add");
                Ok(())
            },
        )
        .unwrap();
        assert!(diff.is_empty());
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_sync_remove_all_makes_one_remove_call() {
        let calls = RefCell::new(Vec::new());
        let desired: Vec<KeyValue> = Vec::new();
        let latest = vec![kv("k1", "v1")];
        let diff = sync_collection(
            &desired,
            &latest,
            |keys| -> Result<(), ()> {
                calls.borrow_mut().push(format!("remove {}", keys.join(",")));
                Ok(())
            },
            |items| {
                calls.borrow_mut().push(format!("add {}", items.len()));
                Ok(())
            },
        )
        .unwrap();
        assert!(diff.to_add.is_empty());
        assert_eq!(diff.to_remove, vec!["k1".to_string()]);
        assert_eq!(*calls.borrow(), vec!["remove k1".to_string()]);
    }

    #[test]
    fn test_sync_remove_failure_skips_add() {
        let added = RefCell::new(false);
        let desired = vec![kv("b", "2")];
        let latest = vec![kv("a", "1")];
        let result = sync_collection(
            &desired,
            &latest,
            |_| Err("boom"),
            |_| {
                *added.borrow_mut() = true;
                Ok(())
            },
        );
        assert_eq!(result.unwrap_err(), "boom");
        assert!(!*added.borrow());
    }
}
