pub mod apply;
pub mod diff;
pub mod plan;
pub mod settle;
pub mod status;
pub mod validate;

use crate::Context;
use crate::config::{Manifest, Settings};
use crate::resource::Shared;
use crate::state::SandboxState;
use anyhow::Result;
use declarative::{normalize_kind, parse_target};
use eventbridge::Client;
use eventbridge::backend::MemoryBackend;
use std::path::PathBuf;
use std::sync::Arc;

/// Everything a command works on: settings, the manifest and the sandbox
pub struct Session {
    pub settings: Settings,
    pub manifest: Manifest,
    pub state_path: PathBuf,
    pub state: SandboxState,
    pub backend: Arc<MemoryBackend>,
    pub shared: Arc<Shared>,
}

impl Session {
    /// Load settings, the manifest and the sandbox state.
    pub fn open(ctx: &Context) -> Result<Self> {
        let settings = Settings::load()?;
        let manifest = Manifest::load(&settings.manifest_path(ctx.manifest.as_deref()))?;
        Self::with_manifest(ctx, settings, manifest)
    }

    /// Load settings and the sandbox state, without a manifest.
    pub fn sandbox(ctx: &Context) -> Result<Self> {
        let settings = Settings::load()?;
        Self::with_manifest(ctx, settings, Manifest::default())
    }

    fn with_manifest(ctx: &Context, settings: Settings, manifest: Manifest) -> Result<Self> {
        let state_path = settings.state_path(ctx.state.as_deref())?;
        let state = SandboxState::load_or(&state_path, &settings.account_id, &settings.region)?;
        let backend = Arc::new(MemoryBackend::from_state(state.backend.clone()));
        let client = Client::with_backend(backend.clone());
        let shared = Arc::new(Shared::new(client, state.conditions.clone()));
        Ok(Self {
            settings,
            manifest,
            state_path,
            state,
            backend,
            shared,
        })
    }

    pub fn client(&self) -> &Client {
        &self.shared.client
    }

    /// Persist the sandbox contents and the recorded conditions.
    pub fn save(&mut self) -> Result<()> {
        self.state.backend = self.backend.snapshot();
        self.state.conditions = self.shared.conditions();
        self.state.save(&self.state_path)
    }
}

/// Target filter: `kind` or `kind.name`
#[derive(Debug, Default)]
pub struct Filter {
    kind: Option<String>,
    name: Option<String>,
}

impl Filter {
    pub fn new(target: Option<&str>) -> Self {
        match target.map(parse_target) {
            Some((kind, name)) => Self { kind, name },
            None => Self::default(),
        }
    }

    /// Whether any resource of `kind` can match
    pub fn includes_kind(&self, kind: &str) -> bool {
        self.kind
            .as_deref()
            .is_none_or(|k| normalize_kind(k) == normalize_kind(kind))
    }

    pub fn matches(&self, kind: &str, identity: &str) -> bool {
        self.includes_kind(kind) && self.name.as_deref().is_none_or(|n| identity.contains(n))
    }
}
