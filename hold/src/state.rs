//! Shared daemon state handed to every connection task.

use std::path::PathBuf;
use std::sync::Arc;

use hold_engine::Engine;

/// Everything a request handler needs: the lifecycle engine (which in turn
/// owns the registry, catalog, and layer store) plus the state root, needed
/// separately for build staging directories.
#[derive(Clone)]
pub struct AppState {
    /// The container registry and lifecycle engine.
    pub engine: Arc<Engine>,
    /// Root directory for all persistent state.
    pub state_root: PathBuf,
}

impl AppState {
    /// Opens the engine against `state_root` and bootstraps its
    /// subdirectories.
    pub fn open(state_root: PathBuf, shim_path: PathBuf) -> hold_engine::Result<Self> {
        let engine = Engine::open(&state_root, shim_path)?;
        Ok(Self {
            engine: Arc::new(engine),
            state_root,
        })
    }
}
