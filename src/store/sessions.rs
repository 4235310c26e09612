use std::collections::HashMap;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::engine::EngineCell;
use crate::error::{AppError, AppResult};
use crate::models::{Item, RecommendedItem, Session, SessionUpdate};

use super::Catalog;

/// How many recommendations are cached per session; the UI pages through
/// them without further engine calls
const SESSION_TOP_K: usize = 50;

struct SessionEntry {
    session: Session,
    query_item: Option<Item>,
    recommendations: Vec<RecommendedItem>,
    generated: bool,
}

impl SessionEntry {
    fn new(session: Session) -> Self {
        Self {
            session,
            query_item: None,
            recommendations: Vec::new(),
            generated: false,
        }
    }
}

/// In-memory session store.
///
/// Recommendations are computed eagerly when a session's query item is set,
/// so subsequent reads return the cached list immediately. An unavailable
/// engine degrades to an empty cached list rather than failing the request.
pub struct SessionStore {
    entries: RwLock<HashMap<Uuid, SessionEntry>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn create(&self) -> Session {
        let session = Session::new();
        let mut entries = self.entries.write().await;
        entries.insert(session.session_id, SessionEntry::new(session.clone()));
        tracing::info!(session_id = %session.session_id, "Session created");
        session
    }

    pub async fn get(&self, session_id: Uuid) -> Option<Session> {
        let entries = self.entries.read().await;
        entries.get(&session_id).map(|e| e.session.clone())
    }

    pub async fn update(&self, session_id: Uuid, update: SessionUpdate) -> Option<Session> {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(&session_id)?;
        entry.session.apply(update);
        Some(entry.session.clone())
    }

    /// Deletes the session and all per-session cached data
    pub async fn delete(&self, session_id: Uuid) -> bool {
        let mut entries = self.entries.write().await;
        let removed = entries.remove(&session_id).is_some();
        if removed {
            tracing::info!(session_id = %session_id, "Session deleted");
        }
        removed
    }

    /// Sets the session's query item and eagerly generates its
    /// recommendation cache.
    ///
    /// Unknown sessions and unknown articles are `NotFound`; any engine
    /// failure (including "not loaded yet") leaves an empty cache instead.
    pub async fn set_query_item(
        &self,
        engine: &EngineCell,
        catalog: &Catalog,
        session_id: Uuid,
        article_id: u64,
    ) -> AppResult<()> {
        {
            let entries = self.entries.read().await;
            if !entries.contains_key(&session_id) {
                return Err(AppError::NotFound("Session not found".to_string()));
            }
        }
        let item = catalog
            .get(article_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Item {} not found", article_id)))?;

        let (recommendations, generated) = match engine.ready().await {
            None => {
                tracing::info!(
                    session_id = %session_id,
                    article_id,
                    "Engine not ready; caching empty recommendation list"
                );
                (Vec::new(), false)
            }
            Some(engine) => match engine.recommend(article_id, SESSION_TOP_K) {
                Ok(results) => {
                    let items: Vec<RecommendedItem> = results
                        .into_iter()
                        .filter_map(|rec| {
                            catalog.get(rec.item_id).cloned().map(|metadata| {
                                RecommendedItem::new(
                                    metadata,
                                    rec.score,
                                    &rec.explanation.attribute_importance,
                                )
                            })
                        })
                        .collect();
                    (items, true)
                }
                Err(e) => {
                    tracing::warn!(
                        session_id = %session_id,
                        article_id,
                        error = %e,
                        "Recommendation generation failed; caching empty list"
                    );
                    (Vec::new(), false)
                }
            },
        };

        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(&session_id)
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;
        tracing::info!(
            session_id = %session_id,
            article_id,
            recommendations = recommendations.len(),
            "Query item set"
        );
        entry.query_item = Some(item);
        entry.recommendations = recommendations;
        entry.generated = generated;
        Ok(())
    }

    pub async fn query_item(&self, session_id: Uuid) -> Option<Item> {
        let entries = self.entries.read().await;
        entries.get(&session_id).and_then(|e| e.query_item.clone())
    }

    /// Cached recommendations; empty when the session is unknown or no
    /// recommendations have been generated yet
    pub async fn recommendations(&self, session_id: Uuid) -> Vec<RecommendedItem> {
        let entries = self.entries.read().await;
        match entries.get(&session_id) {
            Some(entry) if entry.generated => entry.recommendations.clone(),
            _ => Vec::new(),
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
