//! Pensum - Course Material Q&A
//!
//! A CLI tool and library for indexing course transcripts and answering
//! questions about them with citations.
//!
//! The name "Pensum" comes from the Norwegian word for a course's assigned
//! reading list.
//!
//! # Overview
//!
//! Pensum allows you to:
//! - Index plain-text course documents into a searchable vector database
//! - Ask questions answered by a model with tool access to the index
//! - Get citations pointing back to the course and lesson used
//! - Hold short conversations that remember recent exchanges
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `ingest` - Course document parsing and chunking
//! - `embedding` - Embedding generation
//! - `store` - Course catalog and chunk index abstraction
//! - `search` - Semantic retrieval, course name resolution, citations
//! - `tools` - Tools exposed to the generative model
//! - `generation` - Answer generation with a bounded tool round
//! - `session` - Conversation history
//! - `rag` - Top-level orchestration
//!
//! # Example
//!
//! ```rust,no_run
//! use pensum::config::Settings;
//! use pensum::rag::RagSystem;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let system = RagSystem::new(&settings)?;
//!
//!     let outcome = system.query("What is covered in lesson one?", None).await?;
//!     println!("{}", outcome.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod ingest;
pub mod openai;
pub mod rag;
pub mod search;
pub mod session;
pub mod store;
pub mod tools;

pub use error::{PensumError, Result};
