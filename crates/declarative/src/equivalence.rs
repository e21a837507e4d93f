//! Field equivalence rules
//!
//! Remote APIs often echo an unset optional string back as `""`, and some
//! fields carry a server-side default that is indistinguishable from "not
//! set". Every compared field is assigned exactly one rule from this module.

use serde_json::Value;

/// True when the value is absent or the empty string.
pub fn is_zero(value: Option<&str>) -> bool {
    value.is_none_or(str::is_empty)
}

/// Compare two optional strings treating absent and `""` as the same value.
pub fn equal_strings(a: Option<&str>, b: Option<&str>) -> bool {
    match (is_zero(a), is_zero(b)) {
        (true, true) => true,
        (false, false) => a == b,
        _ => false,
    }
}

/// Compare two optional strings where absent, `""` and `default` are all
/// the same value.
///
/// ```ignore
/// assert!(equal_with_default(None, Some("default"), "default"));
/// assert!(!equal_with_default(Some("orders"), None, "default"));
/// ```
pub fn equal_with_default(a: Option<&str>, b: Option<&str>, default: &str) -> bool {
    normalize(a, default) == normalize(b, default)
}

fn normalize<'a>(value: Option<&'a str>, default: &'a str) -> &'a str {
    value.filter(|s| !s.is_empty()).unwrap_or(default)
}

/// Equivalence rule assigned to a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Equivalence {
    /// Values must be identical; absent only equals absent
    Strict,
    /// Absent equals the empty string
    NilEmpty,
    /// Absent, the empty string and the given sentinel are all equal
    Default(&'static str),
}

impl Equivalence {
    /// Apply the rule to two optional strings.
    pub fn strings(&self, a: Option<&str>, b: Option<&str>) -> bool {
        match self {
            Self::Strict => a == b,
            Self::NilEmpty => equal_strings(a, b),
            Self::Default(default) => equal_with_default(a, b, default),
        }
    }

    /// Apply the rule to two JSON values.
    ///
    /// A missing field is passed as [`Value::Null`]. Only string values get
    /// the relaxed treatment; numbers, booleans, arrays and objects are
    /// compared structurally under every rule.
    pub fn values(&self, a: &Value, b: &Value) -> bool {
        match (as_optional_str(a), as_optional_str(b)) {
            (Some(a), Some(b)) => self.strings(a, b),
            _ => a == b,
        }
    }
}

/// `Some(None)` for null, `Some(Some(s))` for a string, `None` otherwise.
fn as_optional_str(value: &Value) -> Option<Option<&str>> {
    match value {
        Value::Null => Some(None),
        Value::String(s) => Some(Some(s.as_str())),
        _ => None,
    }
}
