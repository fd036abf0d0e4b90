//! Semantic retrieval over the course index.

mod resolver;
mod sources;

pub use resolver::CourseResolver;
pub use sources::{Citation, SourceTracker};

use crate::embedding::Embedder;
use crate::error::Result;
use crate::store::{CourseStore, ScoredChunk, SearchFilter};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Filtered top-K search over the chunk index.
///
/// Each call is a fresh computation; an empty result set is valid and left
/// for the caller to phrase. Backend failures surface as `IndexUnavailable`
/// so they are never mistaken for an empty corpus.
pub struct ContentSearch {
    store: Arc<dyn CourseStore>,
    embedder: Arc<dyn Embedder>,
}

impl ContentSearch {
    pub fn new(store: Arc<dyn CourseStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    /// Embed the query and return the top `k` chunks satisfying `filter`,
    /// ordered by descending similarity with ties broken by chunk ordinal.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn search(
        &self,
        query: &str,
        filter: &SearchFilter,
        k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let query_embedding = self.embedder.embed(query).await?;
        let results = self.store.search_chunks(&query_embedding, filter, k).await?;
        debug!("Retrieved {} chunks", results.len());
        Ok(results)
    }
}
