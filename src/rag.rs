//! Top-level orchestration: ingestion, querying, sessions, analytics.

use crate::config::Settings;
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{PensumError, Result};
use crate::generation::{AnswerGenerator, ChatModel, OpenAIChatModel};
use crate::ingest::DocumentProcessor;
use crate::search::{Citation, ContentSearch, CourseResolver, SourceTracker};
use crate::session::SessionStore;
use crate::store::{CourseStore, SqliteCourseStore};
use crate::tools::{OutlineTool, SearchTool, ToolRegistry};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// The answer to one query, with its provenance and conversation handle.
#[derive(Debug, Serialize)]
pub struct QueryOutcome {
    pub answer: String,
    pub citations: Vec<Citation>,
    pub session_id: String,
}

/// Index statistics for the catalog view.
#[derive(Debug, Serialize)]
pub struct CourseAnalytics {
    pub total_courses: usize,
    pub course_titles: Vec<String>,
}

/// What a folder ingest actually added.
#[derive(Debug, Default)]
pub struct IngestSummary {
    pub courses_added: usize,
    pub chunks_added: usize,
    pub courses_skipped: usize,
}

/// Wires the index, tools, model, and sessions together.
pub struct RagSystem {
    store: Arc<dyn CourseStore>,
    embedder: Arc<dyn Embedder>,
    registry: ToolRegistry,
    generator: AnswerGenerator,
    sessions: SessionStore,
    processor: DocumentProcessor,
}

impl RagSystem {
    /// Production wiring: SQLite index under the data directory, OpenAI
    /// embeddings and chat.
    pub fn new(settings: &Settings) -> Result<Self> {
        fs::create_dir_all(settings.data_dir())?;
        let store: Arc<dyn CourseStore> =
            Arc::new(SqliteCourseStore::new(&settings.sqlite_path())?);

        let timeout = Duration::from_secs(settings.generation.timeout_seconds);
        let embedder: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::new(
            &settings.embedding.model,
            settings.embedding.dimensions as usize,
            timeout,
        ));

        let client = crate::openai::create_client(timeout);
        let model: Arc<dyn ChatModel> = Arc::new(OpenAIChatModel::new(
            client,
            &settings.generation.model,
            settings.generation.max_tokens,
            settings.generation.temperature,
        ));

        Ok(Self::with_components(settings, store, embedder, model))
    }

    /// Assemble from explicit components. Tests use this with an in-memory
    /// store, a deterministic embedder, and a scripted model.
    pub fn with_components(
        settings: &Settings,
        store: Arc<dyn CourseStore>,
        embedder: Arc<dyn Embedder>,
        model: Arc<dyn ChatModel>,
    ) -> Self {
        let resolver = || {
            CourseResolver::new(store.clone(), embedder.clone())
                .with_min_score(settings.search.resolver_min_score)
        };

        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(SearchTool::new(
            resolver(),
            ContentSearch::new(store.clone(), embedder.clone()),
            store.clone(),
            settings.search.max_results,
        )));
        registry.register(Arc::new(OutlineTool::new(resolver(), store.clone())));

        Self {
            store,
            embedder,
            registry,
            generator: AnswerGenerator::new(model),
            sessions: SessionStore::new(settings.search.max_history),
            processor: DocumentProcessor::new(
                settings.ingest.chunk_size,
                settings.ingest.chunk_overlap,
            ),
        }
    }

    /// Answer a query. A missing session id starts a fresh conversation;
    /// the outcome carries the id to pass back on the follow-up.
    pub async fn query(&self, text: &str, session_id: Option<&str>) -> Result<QueryOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PensumError::InvalidInput(
                "Query must not be empty".to_string(),
            ));
        }

        let session_id = match session_id {
            Some(id) => id.to_string(),
            None => self.sessions.create_session(),
        };
        let history = self.sessions.render(&session_id);

        // The tracker lives for exactly one query, so citations can never
        // leak across turns.
        let mut sources = SourceTracker::new();
        let answer = self
            .generator
            .generate(text, history.as_deref(), &self.registry, &mut sources)
            .await?;
        let citations = sources.drain();

        self.sessions.append(&session_id, text, &answer);

        Ok(QueryOutcome {
            answer,
            citations,
            session_id,
        })
    }

    /// Ingest a single course document. Returns the course title and the
    /// number of chunks indexed.
    pub async fn add_course_document(&self, path: &Path) -> Result<(String, usize)> {
        let (course, chunks) = self.processor.process_course_document(path)?;

        let title_embedding = self.embedder.embed(&course.title).await?;
        let contents: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let chunk_embeddings = self.embedder.embed_batch(&contents).await?;

        self.store.add_course(&course, &title_embedding).await?;
        let added = self.store.add_chunks(&chunks, &chunk_embeddings).await?;

        info!("Indexed '{}' ({} chunks)", course.title, added);
        Ok((course.title, added))
    }

    /// Ingest every course document in a folder.
    ///
    /// Titles already in the catalog are skipped so re-runs are cheap;
    /// `clear_existing` wipes the index first instead.
    pub async fn add_course_folder(
        &self,
        dir: &Path,
        clear_existing: bool,
    ) -> Result<IngestSummary> {
        if clear_existing {
            info!("Clearing existing index");
            self.store.clear().await?;
        }

        let mut existing: HashSet<String> = self.store.course_titles().await?.into_iter().collect();

        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| {
                matches!(
                    p.extension().and_then(|e| e.to_str()),
                    Some("txt") | Some("md")
                )
            })
            .collect();
        paths.sort();

        let mut summary = IngestSummary::default();
        for path in &paths {
            let (course, chunks) = self.processor.process_course_document(path)?;
            if existing.contains(&course.title) {
                debug!("Skipping already indexed course '{}'", course.title);
                summary.courses_skipped += 1;
                continue;
            }

            let title_embedding = self.embedder.embed(&course.title).await?;
            let contents: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
            let chunk_embeddings = self.embedder.embed_batch(&contents).await?;

            self.store.add_course(&course, &title_embedding).await?;
            summary.chunks_added += self.store.add_chunks(&chunks, &chunk_embeddings).await?;
            summary.courses_added += 1;
            existing.insert(course.title);
        }

        info!(
            "Folder ingest: {} added, {} skipped, {} chunks",
            summary.courses_added, summary.courses_skipped, summary.chunks_added
        );
        Ok(summary)
    }

    /// Catalog statistics.
    pub async fn analytics(&self) -> Result<CourseAnalytics> {
        Ok(CourseAnalytics {
            total_courses: self.store.course_count().await?,
            course_titles: self.store.course_titles().await?,
        })
    }

    /// Drop everything from the index.
    pub async fn clear_index(&self) -> Result<()> {
        self.store.clear().await
    }

    /// Forget one conversation's history.
    pub fn clear_session(&self, session_id: &str) {
        self.sessions.clear(session_id);
    }
}
