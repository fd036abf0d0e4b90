//! Course document ingestion: parsing, chunking, and chunk metadata.

mod chunker;
mod parser;

use crate::error::{PensumError, Result};
use crate::store::{Course, CourseChunk};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Turns a course document into a catalog entry plus embedded-ready chunks.
pub struct DocumentProcessor {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl DocumentProcessor {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    /// Read a document, replacing invalid UTF-8 rather than failing.
    pub fn read_file(&self, path: &Path) -> Result<String> {
        let bytes = fs::read(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Sentence-aware chunking of raw text.
    pub fn chunk_text(&self, text: &str) -> Vec<String> {
        chunker::pack_sentences(text, self.chunk_size, self.chunk_overlap)
    }

    /// Parse and chunk one course document.
    ///
    /// Chunk content is prefixed with its course and lesson context so the
    /// provenance survives embedding. Chunk indices are sequential across
    /// the whole document.
    pub fn process_course_document(&self, path: &Path) -> Result<(Course, Vec<CourseChunk>)> {
        let content = self.read_file(path)?;
        if content.trim().is_empty() {
            return Err(PensumError::Ingest(format!(
                "Document is empty: {}",
                path.display()
            )));
        }

        let fallback_title = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Untitled Course");
        let (course, blocks) = parser::parse_document(&content, fallback_title);

        let mut chunks = Vec::new();
        let mut chunk_index: u32 = 0;
        for block in &blocks {
            for text in self.chunk_text(&block.text) {
                let content = match block.lesson_number {
                    Some(n) => format!("Course {} Lesson {} content: {}", course.title, n, text),
                    None => format!("Course {} content: {}", course.title, text),
                };
                chunks.push(CourseChunk {
                    content,
                    course_title: course.title.clone(),
                    lesson_number: block.lesson_number,
                    chunk_index,
                });
                chunk_index += 1;
            }
        }

        debug!(
            "Processed '{}': {} lessons, {} chunks",
            course.title,
            course.lessons.len(),
            chunks.len()
        );
        Ok((course, chunks))
    }
}
