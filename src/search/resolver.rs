//! Course name resolution.

use crate::embedding::Embedder;
use crate::error::Result;
use crate::store::CourseStore;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Resolves a free-text course name to a canonical catalog title.
///
/// The baseline policy is permissive: the single best catalog match wins
/// regardless of absolute score, trading precision for recall. Callers that
/// need a hard failure set `min_score` above zero.
pub struct CourseResolver {
    store: Arc<dyn CourseStore>,
    embedder: Arc<dyn Embedder>,
    min_score: f32,
}

impl CourseResolver {
    pub fn new(store: Arc<dyn CourseStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            store,
            embedder,
            min_score: 0.0,
        }
    }

    /// Set the minimum similarity required to accept a match.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    /// Resolve a partial course name. Returns None when the catalog is empty
    /// or the best match falls below the configured threshold.
    #[instrument(skip(self), fields(name = %partial_name))]
    pub async fn resolve(&self, partial_name: &str) -> Result<Option<String>> {
        let embedding = self.embedder.embed(partial_name).await?;

        match self.store.best_title_match(&embedding).await? {
            Some(m) if m.score >= self.min_score => {
                debug!("Resolved to '{}' (score {:.3})", m.title, m.score);
                Ok(Some(m.title))
            }
            Some(m) => {
                debug!("Best match '{}' below threshold ({:.3})", m.title, m.score);
                Ok(None)
            }
            None => Ok(None),
        }
    }
}
