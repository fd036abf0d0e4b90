//! Course index abstraction.
//!
//! Two logical indexes live behind one trait: a course catalog keyed by
//! canonical title (used for name resolution and outlines) and a chunk index
//! holding the course content itself. Both store caller-provided embeddings;
//! the store never talks to an embedding service.

mod memory;
mod sqlite;

pub use memory::MemoryCourseStore;
pub use sqlite::SqliteCourseStore;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A course as stored in the catalog. The title is the primary key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub title: String,
    pub course_link: Option<String>,
    pub instructor: Option<String>,
    pub lessons: Vec<Lesson>,
}

impl Course {
    /// Look up a lesson's link by number.
    pub fn lesson_link(&self, lesson_number: u32) -> Option<&str> {
        self.lessons
            .iter()
            .find(|l| l.lesson_number == lesson_number)
            .and_then(|l| l.lesson_link.as_deref())
    }
}

/// A lesson within a course. Numbers are unique per course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    pub lesson_number: u32,
    pub title: String,
    pub lesson_link: Option<String>,
}

/// A bounded span of course text with provenance metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseChunk {
    pub content: String,
    pub course_title: String,
    pub lesson_number: Option<u32>,
    /// Ordinal of this chunk within its course.
    pub chunk_index: u32,
}

/// Structured metadata filter over the chunk index.
///
/// Both fields absent means unrestricted search. A lesson number without a
/// course title is accepted and degrades to a cross-course lesson filter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchFilter {
    pub course_title: Option<String>,
    pub lesson_number: Option<u32>,
}

impl SearchFilter {
    /// Build a filter from an optional resolved title and lesson number.
    ///
    /// Pure; no validation that the pair co-occurs in the corpus. An
    /// impossible combination yields zero results downstream, not an error.
    pub fn from_parts(course_title: Option<String>, lesson_number: Option<u32>) -> Self {
        Self {
            course_title,
            lesson_number,
        }
    }

    /// Whether a chunk's metadata satisfies this filter.
    pub fn matches(&self, chunk: &CourseChunk) -> bool {
        if let Some(title) = &self.course_title {
            if chunk.course_title != *title {
                return false;
            }
        }
        if let Some(lesson) = self.lesson_number {
            if chunk.lesson_number != Some(lesson) {
                return false;
            }
        }
        true
    }

    /// True when no constraint is set.
    pub fn is_unrestricted(&self) -> bool {
        self.course_title.is_none() && self.lesson_number.is_none()
    }
}

/// A chunk matched by a search, with its similarity score.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: CourseChunk,
    pub score: f32,
}

/// Best catalog match for a free-text course name.
#[derive(Debug, Clone)]
pub struct TitleMatch {
    pub title: String,
    pub score: f32,
}

/// Trait for course index implementations.
#[async_trait]
pub trait CourseStore: Send + Sync {
    /// Add a course to the catalog with its title embedding.
    async fn add_course(&self, course: &Course, embedding: &[f32]) -> Result<()>;

    /// Add content chunks with their embeddings. Lengths must match.
    async fn add_chunks(&self, chunks: &[CourseChunk], embeddings: &[Vec<f32>]) -> Result<usize>;

    /// Filtered top-`limit` cosine search over the chunk index.
    ///
    /// Results are ordered by non-increasing score; ties break by ascending
    /// chunk ordinal. An empty result is valid, not an error.
    async fn search_chunks(
        &self,
        query_embedding: &[f32],
        filter: &SearchFilter,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>>;

    /// Single best catalog match for an embedded course name, or None when
    /// the catalog is empty.
    async fn best_title_match(&self, query_embedding: &[f32]) -> Result<Option<TitleMatch>>;

    /// Fetch a course by exact canonical title.
    async fn get_course(&self, title: &str) -> Result<Option<Course>>;

    /// All canonical course titles.
    async fn course_titles(&self) -> Result<Vec<String>>;

    /// Number of courses in the catalog.
    async fn course_count(&self) -> Result<usize>;

    /// Number of chunks in the content index.
    async fn chunk_count(&self) -> Result<usize>;

    /// Remove all courses and chunks.
    async fn clear(&self) -> Result<()>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Rank scored chunks: score descending, ties by ascending chunk ordinal.
pub(crate) fn rank_chunks(mut results: Vec<ScoredChunk>, limit: usize) -> Vec<ScoredChunk> {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.chunk.chunk_index.cmp(&b.chunk.chunk_index))
    });
    results.truncate(limit);
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(course: &str, lesson: Option<u32>, index: u32) -> CourseChunk {
        CourseChunk {
            content: format!("chunk {}", index),
            course_title: course.to_string(),
            lesson_number: lesson,
            chunk_index: index,
        }
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &[1.0, 0.0, 0.0]) - 1.0).abs() < 0.001);
        assert!(cosine_similarity(&a, &[0.0, 1.0, 0.0]).abs() < 0.001);
        assert!((cosine_similarity(&a, &[-1.0, 0.0, 0.0]) + 1.0).abs() < 0.001);
        assert_eq!(cosine_similarity(&a, &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_filter_from_parts_cases() {
        assert!(SearchFilter::from_parts(None, None).is_unrestricted());

        let title_only = SearchFilter::from_parts(Some("Rust 101".to_string()), None);
        assert_eq!(title_only.course_title.as_deref(), Some("Rust 101"));
        assert_eq!(title_only.lesson_number, None);

        let lesson_only = SearchFilter::from_parts(None, Some(3));
        assert_eq!(lesson_only.lesson_number, Some(3));

        let both = SearchFilter::from_parts(Some("Rust 101".to_string()), Some(3));
        assert!(!both.is_unrestricted());
    }

    #[test]
    fn test_filter_from_parts_idempotent() {
        let a = SearchFilter::from_parts(Some("Course".to_string()), Some(2));
        let b = SearchFilter::from_parts(Some("Course".to_string()), Some(2));
        assert_eq!(a, b);
    }

    #[test]
    fn test_filter_matching() {
        let c = chunk("Rust 101", Some(2), 0);

        assert!(SearchFilter::from_parts(None, None).matches(&c));
        assert!(SearchFilter::from_parts(Some("Rust 101".to_string()), None).matches(&c));
        assert!(SearchFilter::from_parts(None, Some(2)).matches(&c));
        assert!(!SearchFilter::from_parts(Some("Other".to_string()), None).matches(&c));
        assert!(!SearchFilter::from_parts(None, Some(9)).matches(&c));

        // Lesson filter never matches chunks outside any lesson
        let preamble = chunk("Rust 101", None, 1);
        assert!(!SearchFilter::from_parts(None, Some(2)).matches(&preamble));
    }

    #[test]
    fn test_rank_chunks_tie_break_by_ordinal() {
        let results = vec![
            ScoredChunk { chunk: chunk("A", None, 5), score: 0.9 },
            ScoredChunk { chunk: chunk("A", None, 1), score: 0.9 },
            ScoredChunk { chunk: chunk("A", None, 3), score: 0.95 },
        ];

        let ranked = rank_chunks(results, 10);
        assert_eq!(ranked[0].chunk.chunk_index, 3);
        assert_eq!(ranked[1].chunk.chunk_index, 1);
        assert_eq!(ranked[2].chunk.chunk_index, 5);
    }

    #[test]
    fn test_rank_chunks_caps_at_limit() {
        let results = (0..10)
            .map(|i| ScoredChunk { chunk: chunk("A", None, i), score: 1.0 - i as f32 * 0.01 })
            .collect();

        let ranked = rank_chunks(results, 5);
        assert_eq!(ranked.len(), 5);
        for window in ranked.windows(2) {
            assert!(window[0].score >= window[1].score);
        }
    }

    #[test]
    fn test_course_lesson_link() {
        let course = Course {
            title: "Rust 101".to_string(),
            course_link: None,
            instructor: None,
            lessons: vec![Lesson {
                lesson_number: 1,
                title: "Ownership".to_string(),
                lesson_link: Some("https://example.com/l1".to_string()),
            }],
        };

        assert_eq!(course.lesson_link(1), Some("https://example.com/l1"));
        assert_eq!(course.lesson_link(2), None);
    }
}
