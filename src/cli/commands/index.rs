//! Course document indexing.

use crate::cli::Output;
use crate::config::Settings;
use crate::rag::RagSystem;
use std::path::Path;

pub async fn run_index(path: &str, clear: bool, settings: Settings) -> anyhow::Result<()> {
    let system = RagSystem::new(&settings)?;
    let path = Path::new(path);

    if path.is_dir() {
        let spinner = Output::spinner("Indexing course folder...");
        let summary = system.add_course_folder(path, clear).await;
        spinner.finish_and_clear();

        let summary = summary?;
        Output::success(&format!(
            "Indexed {} course(s), {} chunks",
            summary.courses_added, summary.chunks_added
        ));
        if summary.courses_skipped > 0 {
            Output::info(&format!(
                "Skipped {} already indexed course(s)",
                summary.courses_skipped
            ));
        }
    } else {
        if clear {
            system.clear_index().await?;
        }
        let spinner = Output::spinner("Indexing course document...");
        let result = system.add_course_document(path).await;
        spinner.finish_and_clear();

        let (title, chunks) = result?;
        Output::success(&format!("Indexed '{}' ({} chunks)", title, chunks));
    }

    Ok(())
}
