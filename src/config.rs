use crate::paths;
use anyhow::{Context, Result};
use eventbridge::ResourceType;
use eventbridge::kinds::{ArchiveSpec, EndpointSpec, EventBusSpec, RuleSpec};
use eventbridge::managed::ManagedKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ============================================================================
// Settings
// ============================================================================

/// User settings from `config.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Account the sandbox pretends to be
    pub account_id: String,
    /// Region the sandbox pretends to be in
    pub region: String,
    /// Default manifest path
    pub manifest: String,
    /// Default sandbox state file
    pub state_file: Option<String>,
    /// Resources reconciled in parallel within a stage
    pub jobs: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            account_id: "123456789012".to_string(),
            region: "us-east-1".to_string(),
            manifest: "bridgeward.toml".to_string(),
            state_file: None,
            jobs: 4,
        }
    }
}

impl Settings {
    /// Load settings from the config directory, or defaults if there is no
    /// config file.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_dir()?.join("config.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Invalid TOML format in {}", path.display()))
    }

    /// Manifest path, unless overridden on the command line
    pub fn manifest_path(&self, overridden: Option<&Path>) -> PathBuf {
        match overridden {
            Some(path) => path.to_path_buf(),
            None => paths::expand(&self.manifest),
        }
    }

    /// State file path, unless overridden on the command line
    pub fn state_path(&self, overridden: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = overridden {
            return Ok(path.to_path_buf());
        }
        match &self.state_file {
            Some(file) => Ok(paths::expand(file)),
            None => Ok(paths::state_dir()?.join("state.json")),
        }
    }
}

// ============================================================================
// Manifest
// ============================================================================

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ManifestError {
    #[error("duplicate {kind} {identity:?}")]
    Duplicate { kind: ResourceType, identity: String },

    #[error("{kind} at position {index} has no name")]
    Unnamed { kind: ResourceType, index: usize },
}

/// Desired resources, grouped by kind
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "eventBuses", default)]
    pub event_buses: Vec<EventBusSpec>,
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
    #[serde(default)]
    pub archives: Vec<ArchiveSpec>,
    #[serde(default)]
    pub endpoints: Vec<EndpointSpec>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read manifest: {}", path.display()))?;
        let manifest: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid manifest: {}", path.display()))?;
        log::debug!(
            "Loaded {} resource(s) from {}",
            manifest.len(),
            path.display()
        );
        Ok(manifest)
    }

    /// Total number of declared resources
    pub fn len(&self) -> usize {
        self.event_buses.len() + self.rules.len() + self.archives.len() + self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check that every identity is set and declared once per kind.
    pub fn validate(&self) -> Vec<ManifestError> {
        let mut errors = Vec::new();
        check_identities::<eventbridge::kinds::EventBusKind>(&self.event_buses, &mut errors);
        check_identities::<eventbridge::kinds::RuleKind>(&self.rules, &mut errors);
        check_identities::<eventbridge::kinds::ArchiveKind>(&self.archives, &mut errors);
        check_identities::<eventbridge::kinds::EndpointKind>(&self.endpoints, &mut errors);
        errors
    }
}

fn check_identities<K: ManagedKind>(specs: &[K::Spec], errors: &mut Vec<ManifestError>) {
    let mut seen = HashSet::new();
    for (index, spec) in specs.iter().enumerate() {
        let identity = K::identity(spec);
        if identity.trim().is_empty() {
            errors.push(ManifestError::Unnamed {
                kind: K::TYPE,
                index,
            });
        } else if !seen.insert(identity) {
            errors.push(ManifestError::Duplicate {
                kind: K::TYPE,
                identity: identity.to_string(),
            });
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
