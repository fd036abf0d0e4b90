//! One-shot question answering.

use crate::cli::Output;
use crate::config::Settings;
use crate::rag::RagSystem;

pub async fn run_ask(question: &str, settings: Settings) -> anyhow::Result<()> {
    let system = RagSystem::new(&settings)?;

    let spinner = Output::spinner("Thinking...");
    let outcome = system.query(question, None).await;
    spinner.finish_and_clear();

    let outcome = outcome?;
    Output::answer(&outcome.answer, &outcome.citations);

    Ok(())
}
