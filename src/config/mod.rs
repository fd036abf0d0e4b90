//! Configuration module for Pensum.
//!
//! Handles loading and saving application settings.

mod settings;

pub use settings::{
    EmbeddingSettings, GeneralSettings, GenerationSettings, IngestSettings, SearchSettings,
    ServerSettings, Settings,
};
