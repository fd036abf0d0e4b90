//! Interactive chat session with conversation history.

use crate::cli::Output;
use crate::config::Settings;
use crate::rag::RagSystem;
use console::style;
use std::io::{self, BufRead, Write};

pub async fn run_chat(settings: Settings) -> anyhow::Result<()> {
    let system = RagSystem::new(&settings)?;

    Output::header("Pensum Chat");
    Output::info("Ask about your indexed courses. Type 'clear' to reset, 'exit' to quit.");
    println!();

    let stdin = io::stdin();
    let mut session_id: Option<String> = None;

    loop {
        print!("{} ", style(">").cyan().bold());
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();

        match input {
            "" => continue,
            "exit" | "quit" => break,
            "clear" => {
                if let Some(id) = session_id.take() {
                    system.clear_session(&id);
                }
                Output::info("Conversation cleared.");
                continue;
            }
            _ => {}
        }

        let spinner = Output::spinner("Thinking...");
        let outcome = system.query(input, session_id.as_deref()).await;
        spinner.finish_and_clear();

        match outcome {
            Ok(outcome) => {
                Output::answer(&outcome.answer, &outcome.citations);
                println!();
                session_id = Some(outcome.session_id);
            }
            Err(e) => Output::error(&e.to_string()),
        }
    }

    Ok(())
}
