//! Citation tracking for answered queries.

use serde::Serialize;

/// A human-readable reference to the course/lesson a chunk came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Citation {
    /// Display label, e.g. `"Intro to RAG - Lesson 2"`.
    pub label: String,
    /// Link to the lesson (or course) when the catalog has one.
    pub link: Option<String>,
}

impl Citation {
    /// Build the display label from a course title and optional lesson.
    pub fn new(course_title: &str, lesson_number: Option<u32>, link: Option<String>) -> Self {
        let label = match lesson_number {
            Some(n) => format!("{} - Lesson {}", course_title, n),
            None => course_title.to_string(),
        };
        Self { label, link }
    }
}

/// Records which sources the most recent search touched.
///
/// Scoped to a single query: `record` overwrites rather than appends, and
/// `drain` hands the citations out exactly once. Draining before the next
/// query is what prevents citation leakage across turns.
#[derive(Debug, Default)]
pub struct SourceTracker {
    citations: Vec<Citation>,
}

impl SourceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace any previously recorded citations with this search's.
    pub fn record(&mut self, citations: Vec<Citation>) {
        self.citations = citations;
    }

    /// Return and clear the recorded citations.
    pub fn drain(&mut self) -> Vec<Citation> {
        std::mem::take(&mut self.citations)
    }

    pub fn is_empty(&self) -> bool {
        self.citations.is_empty()
    }
}
