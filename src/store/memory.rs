//! In-memory course store.
//!
//! Useful for tests and small corpora; chunks keep insertion order so tie
//! breaking is deterministic.

use super::{
    cosine_similarity, rank_chunks, Course, CourseChunk, CourseStore, ScoredChunk, SearchFilter,
    TitleMatch,
};
use crate::error::{PensumError, Result};
use async_trait::async_trait;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Inner {
    courses: Vec<(Course, Vec<f32>)>,
    chunks: Vec<(CourseChunk, Vec<f32>)>,
}

/// In-memory course store.
#[derive(Default)]
pub struct MemoryCourseStore {
    inner: RwLock<Inner>,
}

impl MemoryCourseStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|e| PensumError::IndexUnavailable(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|e| PensumError::IndexUnavailable(format!("Failed to acquire lock: {}", e)))
    }
}

#[async_trait]
impl CourseStore for MemoryCourseStore {
    async fn add_course(&self, course: &Course, embedding: &[f32]) -> Result<()> {
        let mut inner = self.write()?;
        // Title acts as primary key
        inner.courses.retain(|(c, _)| c.title != course.title);
        inner.courses.push((course.clone(), embedding.to_vec()));
        Ok(())
    }

    async fn add_chunks(&self, chunks: &[CourseChunk], embeddings: &[Vec<f32>]) -> Result<usize> {
        if chunks.len() != embeddings.len() {
            return Err(PensumError::InvalidInput(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }

        let mut inner = self.write()?;
        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            inner.chunks.push((chunk.clone(), embedding.clone()));
        }
        Ok(chunks.len())
    }

    async fn search_chunks(
        &self,
        query_embedding: &[f32],
        filter: &SearchFilter,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let inner = self.read()?;

        let results: Vec<ScoredChunk> = inner
            .chunks
            .iter()
            .filter(|(chunk, _)| filter.matches(chunk))
            .map(|(chunk, embedding)| ScoredChunk {
                chunk: chunk.clone(),
                score: cosine_similarity(query_embedding, embedding),
            })
            .collect();

        Ok(rank_chunks(results, limit))
    }

    async fn best_title_match(&self, query_embedding: &[f32]) -> Result<Option<TitleMatch>> {
        let inner = self.read()?;

        let best = inner
            .courses
            .iter()
            .map(|(course, embedding)| TitleMatch {
                title: course.title.clone(),
                score: cosine_similarity(query_embedding, embedding),
            })
            .max_by(|a, b| {
                a.score
                    .partial_cmp(&b.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

        Ok(best)
    }

    async fn get_course(&self, title: &str) -> Result<Option<Course>> {
        let inner = self.read()?;
        Ok(inner
            .courses
            .iter()
            .find(|(c, _)| c.title == title)
            .map(|(c, _)| c.clone()))
    }

    async fn course_titles(&self) -> Result<Vec<String>> {
        let inner = self.read()?;
        Ok(inner.courses.iter().map(|(c, _)| c.title.clone()).collect())
    }

    async fn course_count(&self) -> Result<usize> {
        Ok(self.read()?.courses.len())
    }

    async fn chunk_count(&self) -> Result<usize> {
        Ok(self.read()?.chunks.len())
    }

    async fn clear(&self) -> Result<()> {
        let mut inner = self.write()?;
        inner.courses.clear();
        inner.chunks.clear();
        Ok(())
    }
}
