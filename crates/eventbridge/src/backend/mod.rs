//! Backends implementing [`EventBridgeApi`](crate::api::EventBridgeApi).

pub mod memory;

pub use memory::{ApiCall, MemoryBackend, MemoryState};

/// Get the default backend (an empty in-memory sandbox).
pub fn default_backend() -> MemoryBackend {
    MemoryBackend::default()
}
