//! CLI module for Pensum.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Pensum - Course Material Q&A
///
/// A CLI tool for indexing course transcripts and asking questions about them.
/// The name "Pensum" comes from the Norwegian word for a course's assigned
/// reading list.
#[derive(Parser, Debug)]
#[command(name = "pensum")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index a course document or a folder of documents
    Index {
        /// Path to a course document, or a folder containing them
        path: String,

        /// Clear the existing index before adding
        #[arg(long)]
        clear: bool,
    },

    /// Ask a question about the indexed courses
    Ask {
        /// The question to ask
        question: String,
    },

    /// Start an interactive chat session
    Chat,

    /// List indexed courses
    List,

    /// Start HTTP API server for integration with other systems
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}
