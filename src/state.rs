use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use declarative::Outcome;
use eventbridge::backend::MemoryState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

// ============================================================================
// State Structures
// ============================================================================

/// Everything bridgeward keeps between runs
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SandboxState {
    /// Contents of the in-memory remote
    #[serde(default)]
    pub backend: MemoryState,

    /// Conditions recorded per resource, keyed by `Kind/identity`
    #[serde(default)]
    pub conditions: BTreeMap<String, Condition>,

    /// Last time the state was updated
    pub last_updated: DateTime<Utc>,
}

/// Conditions of one resource after its latest pass
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Condition {
    /// The resource matched its declaration
    #[serde(default)]
    pub synced: bool,

    /// The last pass was rejected; retrying without a manifest change won't help
    #[serde(default)]
    pub terminal: bool,

    /// Outcome or error of the last pass
    #[serde(default)]
    pub message: String,

    /// ARN observed for the resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,

    pub updated_at: DateTime<Utc>,
}

impl Condition {
    /// Condition after a pass that ended with `outcome`.
    pub fn from_outcome(outcome: &Outcome, arn: Option<String>) -> Self {
        Self {
            synced: matches!(outcome, Outcome::InSync),
            terminal: outcome.is_terminal(),
            message: outcome.to_string(),
            arn,
            updated_at: Utc::now(),
        }
    }

    /// Condition after a pass that failed with a remote error.
    pub fn from_error(message: impl Into<String>, arn: Option<String>) -> Self {
        Self {
            synced: false,
            terminal: false,
            message: message.into(),
            arn,
            updated_at: Utc::now(),
        }
    }
}

/// Key of a resource in [`SandboxState::conditions`]
pub fn condition_key(kind: &str, identity: &str) -> String {
    format!("{kind}/{identity}")
}

/// Split a condition key into kind and identity.
pub fn split_key(key: &str) -> Option<(&str, &str)> {
    key.split_once('/')
}

// ============================================================================
// SandboxState Implementation
// ============================================================================

impl Default for SandboxState {
    fn default() -> Self {
        Self {
            backend: MemoryState::default(),
            conditions: BTreeMap::new(),
            last_updated: Utc::now(),
        }
    }
}

impl SandboxState {
    /// Fresh state for an account and region
    pub fn new(account_id: &str, region: &str) -> Self {
        Self {
            backend: MemoryState::new(account_id, region),
            ..Default::default()
        }
    }

    /// Load state from disk, or a fresh state if the file doesn't exist
    pub fn load_or(path: &Path, account_id: &str, region: &str) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file does not exist, starting from an empty sandbox");
            return Ok(Self::new(account_id, region));
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        let state: SandboxState = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        log::debug!("Loaded state from {}", path.display());
        Ok(state)
    }

    /// Save state to disk
    pub fn save(&mut self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        self.last_updated = Utc::now();
        let content = serde_json::to_string_pretty(self).context("Failed to serialize state")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write state file: {}", path.display()))?;

        log::debug!("Saved state to {}", path.display());
        Ok(())
    }

    /// Recorded ARN of a resource
    pub fn recorded_arn(&self, kind: &str, identity: &str) -> Option<&str> {
        self.conditions
            .get(&condition_key(kind, identity))
            .and_then(|c| c.arn.as_deref())
    }
}

// ============================================================================
// Tests
// ============================================================================
