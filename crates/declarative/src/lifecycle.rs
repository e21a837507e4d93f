//! Lifecycle classification of remote resource states
//!
//! The remote owns the state machine; this module only sorts the state
//! string it reports into buckets that gate mutation.

use serde::Serialize;
use std::fmt;

/// Where a resource sits in its remote lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Movement {
    /// The remote is working on the resource; mutation must wait
    Transitional,
    /// Ready for mutation
    Stable,
    /// Failed permanently; only recreation helps
    Terminal,
    /// Absent or unrecognised state
    Unknown,
}

impl fmt::Display for Movement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Transitional => "transitional",
            Self::Stable => "stable",
            Self::Terminal => "terminal",
            Self::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// State names grouped by movement for one resource kind
#[derive(Debug, Clone, Copy)]
pub struct StateTable {
    pub transitional: &'static [&'static str],
    pub stable: &'static [&'static str],
    pub terminal: &'static [&'static str],
}

impl StateTable {
    pub const fn new(
        transitional: &'static [&'static str],
        stable: &'static [&'static str],
        terminal: &'static [&'static str],
    ) -> Self {
        Self {
            transitional,
            stable,
            terminal,
        }
    }

    pub fn classify(&self, state: Option<&str>) -> Movement {
        let Some(state) = state else {
            return Movement::Unknown;
        };
        if self.transitional.iter().any(|s| *s == state) {
            Movement::Transitional
        } else if self.stable.iter().any(|s| *s == state) {
            Movement::Stable
        } else if self.terminal.iter().any(|s| *s == state) {
            Movement::Terminal
        } else {
            Movement::Unknown
        }
    }

    pub fn is_available_for_mutation(&self, state: Option<&str>) -> bool {
        self.classify(state) == Movement::Stable
    }

    pub fn is_in_terminal_state(&self, state: Option<&str>) -> bool {
        self.classify(state) == Movement::Terminal
    }

    pub fn is_in_transitional_state(&self, state: Option<&str>) -> bool {
        self.classify(state) == Movement::Transitional
    }
}
