//! SQLite-backed course store.
//!
//! Embeddings are stored as little-endian f32 blobs and cosine similarity is
//! computed in Rust after metadata filtering in SQL. Good enough for corpora
//! of a few thousand chunks; larger deployments want a dedicated vector
//! database.

use super::{
    cosine_similarity, rank_chunks, Course, CourseChunk, CourseStore, Lesson, ScoredChunk,
    SearchFilter, TitleMatch,
};
use crate::error::{PensumError, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS courses (
    title TEXT PRIMARY KEY,
    course_link TEXT,
    instructor TEXT,
    lessons_json TEXT NOT NULL,
    embedding BLOB NOT NULL,
    indexed_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS chunks (
    course_title TEXT NOT NULL,
    chunk_index INTEGER NOT NULL,
    lesson_number INTEGER,
    content TEXT NOT NULL,
    embedding BLOB NOT NULL,
    PRIMARY KEY (course_title, chunk_index)
);

CREATE INDEX IF NOT EXISTS idx_chunks_course ON chunks(course_title);
CREATE INDEX IF NOT EXISTS idx_chunks_lesson ON chunks(lesson_number);
"#;

/// SQLite-backed course store.
pub struct SqliteCourseStore {
    conn: Mutex<Connection>,
}

impl SqliteCourseStore {
    /// Open (or create) a store at the given path.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized course store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| PensumError::IndexUnavailable(format!("Failed to acquire lock: {}", e)))
    }

    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|b| {
                let arr: [u8; 4] = b.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }
}

#[async_trait]
impl CourseStore for SqliteCourseStore {
    #[instrument(skip(self, course, embedding), fields(title = %course.title))]
    async fn add_course(&self, course: &Course, embedding: &[f32]) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            r#"
            INSERT OR REPLACE INTO courses
            (title, course_link, instructor, lessons_json, embedding, indexed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                course.title,
                course.course_link,
                course.instructor,
                serde_json::to_string(&course.lessons)?,
                Self::embedding_to_bytes(embedding),
                Utc::now().to_rfc3339(),
            ],
        )?;

        debug!("Stored course metadata");
        Ok(())
    }

    #[instrument(skip_all, fields(count = chunks.len()))]
    async fn add_chunks(&self, chunks: &[CourseChunk], embeddings: &[Vec<f32>]) -> Result<usize> {
        if chunks.len() != embeddings.len() {
            return Err(PensumError::InvalidInput(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }
        if chunks.is_empty() {
            return Ok(0);
        }

        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            tx.execute(
                r#"
                INSERT OR REPLACE INTO chunks
                (course_title, chunk_index, lesson_number, content, embedding)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    chunk.course_title,
                    chunk.chunk_index,
                    chunk.lesson_number,
                    chunk.content,
                    Self::embedding_to_bytes(embedding),
                ],
            )?;
        }

        tx.commit()?;
        info!("Indexed {} chunks", chunks.len());
        Ok(chunks.len())
    }

    #[instrument(skip(self, query_embedding))]
    async fn search_chunks(
        &self,
        query_embedding: &[f32],
        filter: &SearchFilter,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let conn = self.lock()?;

        // Metadata filtering happens in SQL, ranking in Rust.
        let mut sql = String::from(
            "SELECT course_title, chunk_index, lesson_number, content, embedding FROM chunks",
        );
        let mut clauses = Vec::new();
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(title) = &filter.course_title {
            clauses.push(format!("course_title = ?{}", args.len() + 1));
            args.push(Box::new(title.clone()));
        }
        if let Some(lesson) = filter.lesson_number {
            clauses.push(format!("lesson_number = ?{}", args.len() + 1));
            args.push(Box::new(lesson));
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| PensumError::IndexUnavailable(e.to_string()))?;

        let rows = stmt
            .query_map(rusqlite::params_from_iter(args.iter().map(|a| a.as_ref())), |row| {
                let embedding_bytes: Vec<u8> = row.get(4)?;
                Ok((
                    CourseChunk {
                        course_title: row.get(0)?,
                        chunk_index: row.get(1)?,
                        lesson_number: row.get(2)?,
                        content: row.get(3)?,
                    },
                    Self::bytes_to_embedding(&embedding_bytes),
                ))
            })
            .map_err(|e| PensumError::IndexUnavailable(e.to_string()))?;

        let results: Vec<ScoredChunk> = rows
            .filter_map(|r| r.ok())
            .map(|(chunk, embedding)| ScoredChunk {
                score: cosine_similarity(query_embedding, &embedding),
                chunk,
            })
            .collect();

        let ranked = rank_chunks(results, limit);
        debug!("Search matched {} chunks", ranked.len());
        Ok(ranked)
    }

    #[instrument(skip(self, query_embedding))]
    async fn best_title_match(&self, query_embedding: &[f32]) -> Result<Option<TitleMatch>> {
        let conn = self.lock()?;

        let mut stmt = conn
            .prepare("SELECT title, embedding FROM courses")
            .map_err(|e| PensumError::IndexUnavailable(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| {
                let embedding_bytes: Vec<u8> = row.get(1)?;
                Ok((row.get::<_, String>(0)?, Self::bytes_to_embedding(&embedding_bytes)))
            })
            .map_err(|e| PensumError::IndexUnavailable(e.to_string()))?;

        let best = rows
            .filter_map(|r| r.ok())
            .map(|(title, embedding)| TitleMatch {
                title,
                score: cosine_similarity(query_embedding, &embedding),
            })
            .max_by(|a, b| {
                a.score
                    .partial_cmp(&b.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

        Ok(best)
    }

    async fn get_course(&self, title: &str) -> Result<Option<Course>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT title, course_link, instructor, lessons_json FROM courses WHERE title = ?1",
        )?;

        let mut rows = stmt.query(params![title])?;
        match rows.next()? {
            Some(row) => {
                let lessons_json: String = row.get(3)?;
                let lessons: Vec<Lesson> = serde_json::from_str(&lessons_json)?;
                Ok(Some(Course {
                    title: row.get(0)?,
                    course_link: row.get(1)?,
                    instructor: row.get(2)?,
                    lessons,
                }))
            }
            None => Ok(None),
        }
    }

    async fn course_titles(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT title FROM courses ORDER BY title")?;
        let titles = stmt
            .query_map([], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(titles)
    }

    async fn course_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: usize = conn.query_row("SELECT COUNT(*) FROM courses", [], |row| row.get(0))?;
        Ok(count)
    }

    async fn chunk_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: usize = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count)
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM chunks", [])?;
        conn.execute("DELETE FROM courses", [])?;
        info!("Cleared course index");
        Ok(())
    }
}
