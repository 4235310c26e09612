pub mod artifacts;
pub mod explain;
pub mod filter;
pub mod gat;
pub mod graph;
pub mod model;
pub mod recommend;
pub mod tensor;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;

use crate::error::{AppError, AppResult};

pub use recommend::{Engine, Recommendation, DEFAULT_TOP_K};

/// Engine readiness as observed by request handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    Loading,
    Ready,
    Failed,
}

impl EngineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineStatus::Loading => "loading",
            EngineStatus::Ready => "ready",
            EngineStatus::Failed => "failed",
        }
    }
}

enum EngineState {
    Loading,
    Ready(Arc<Engine>),
    Failed(String),
}

/// One-shot holder for the loaded engine.
///
/// Starts in `Loading` and transitions exactly once to `Ready` or `Failed`;
/// a failed load is terminal for the process lifetime. Handlers treat
/// anything other than `Ready` as "no recommendations yet".
#[derive(Clone)]
pub struct EngineCell {
    inner: Arc<RwLock<EngineState>>,
}

impl EngineCell {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(EngineState::Loading)),
        }
    }

    /// The engine, if the load has completed successfully
    pub async fn ready(&self) -> Option<Arc<Engine>> {
        match &*self.inner.read().await {
            EngineState::Ready(engine) => Some(Arc::clone(engine)),
            _ => None,
        }
    }

    pub async fn status(&self) -> EngineStatus {
        match &*self.inner.read().await {
            EngineState::Loading => EngineStatus::Loading,
            EngineState::Ready(_) => EngineStatus::Ready,
            EngineState::Failed(_) => EngineStatus::Failed,
        }
    }

    /// Publishes the load outcome. Only the first call takes effect; the
    /// cell never leaves `Ready` or `Failed` once entered.
    pub async fn publish(&self, result: AppResult<Engine>) {
        let mut state = self.inner.write().await;
        if !matches!(*state, EngineState::Loading) {
            tracing::warn!("Engine load result published twice; ignoring");
            return;
        }
        *state = match result {
            Ok(engine) => EngineState::Ready(Arc::new(engine)),
            Err(e) => EngineState::Failed(e.to_string()),
        };
    }
}

impl Default for EngineCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Loads and cross-validates the model and graph artifacts
pub fn load_engine(model_dir: &Path) -> AppResult<Engine> {
    let start = Instant::now();
    let model = artifacts::load_model(&model_dir.join(artifacts::MODEL_FILE))?;
    let graph = artifacts::load_graph(&model_dir.join(artifacts::GRAPH_FILE))?;
    let engine = Engine::new(model.into_model()?, graph)?;
    tracing::info!(
        dir = %model_dir.display(),
        items = engine.item_count(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Model artifacts loaded"
    );
    Ok(engine)
}

/// Background load task spawned at startup. Failures are logged and leave
/// the cell in `Failed`; no caller ever observes them as a request error.
pub async fn load_engine_background(cell: EngineCell, model_dir: PathBuf) {
    tracing::info!(dir = %model_dir.display(), "Starting background model loading");
    let result = tokio::task::spawn_blocking(move || load_engine(&model_dir))
        .await
        .unwrap_or_else(|e| Err(AppError::Internal(format!("model load task failed: {}", e))));
    if let Err(e) = &result {
        tracing::error!(error = %e, "Model loading failed; serving without recommendations");
    }
    cell.publish(result).await;
}
