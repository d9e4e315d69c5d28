//! Interactive chat command.

use super::require_api_key;
use crate::cli::Output;
use crate::config::Settings;
use crate::extract::SourceKind;
use crate::rag::Provenance;
use crate::session::Session;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};

/// Run the interactive chat command.
pub async fn run_chat(
    source: Option<String>,
    model: Option<String>,
    mut settings: Settings,
) -> Result<()> {
    require_api_key()?;

    if let Some(model) = model {
        settings.generation.model = model;
    }

    let mut session = Session::new(&settings)?;

    println!("\n{}", style("Svara Chat").bold().cyan());
    println!(
        "{}\n",
        style("Type a question, 'open <url-or-file>' to switch sources, 'clear' to reset the conversation, or 'exit' to quit.").dim()
    );

    if let Some(source) = source {
        open_source(&mut session, &source).await;
    } else {
        Output::info("No source loaded yet. Use 'open <url-or-file>' to start.");
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            session.clear_history();
            Output::info("Conversation history cleared.");
            continue;
        }

        if let Some(source) = input.strip_prefix("open ") {
            open_source(&mut session, source.trim()).await;
            continue;
        }

        answer_question(&mut session, input).await;
    }

    Ok(())
}

/// Ingest a new source, replacing the active one.
async fn open_source(session: &mut Session, source: &str) {
    let kind = match SourceKind::from_input(source) {
        Ok(kind) => kind,
        Err(e) => {
            Output::error(&format!("{}", e));
            return;
        }
    };

    let spinner = Output::spinner(&format!("Processing {}...", kind.label()));
    match session.ingest(&kind).await {
        Ok(report) => {
            spinner.finish_and_clear();
            Output::success(&format!(
                "Ready to chat with {} ({} chunks indexed)",
                report.label, report.chunks
            ));
            show_suggestions(session);
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Could not process source: {}", e));
        }
    }
}

/// Show pending suggested questions, if any.
fn show_suggestions(session: &Session) {
    let suggestions = session.suggestions();
    if suggestions.is_empty() {
        return;
    }
    println!("\n{}", style("Suggested questions").bold());
    for (i, question) in suggestions.iter().enumerate() {
        Output::suggestion(i + 1, question);
    }
    println!();
}

/// Stream one answer to the terminal.
async fn answer_question(session: &mut Session, question: &str) {
    if !session.has_source() {
        Output::warning("No source loaded. Use 'open <url-or-file>' first.");
        return;
    }

    print!("\n{} ", style("Svara:").cyan().bold());
    let _ = io::stdout().flush();

    let result = {
        let mut stdout = io::stdout();
        session
            .ask(question, |delta| {
                print!("{}", delta);
                let _ = stdout.flush();
            })
            .await
    };

    match result {
        Ok(outcome) => {
            println!("\n");
            if outcome.provenance == Provenance::ContextBased {
                println!("{}", style("Sources").bold());
                for chunk in &outcome.citations {
                    Output::citation(&chunk.locator(), &chunk.text);
                }
                println!();
            }
        }
        Err(e) => {
            println!();
            Output::error(&format!("Error: {}", e));
        }
    }
}
