//! Ask command implementation.

use super::require_api_key;
use crate::cli::Output;
use crate::config::Settings;
use crate::extract::SourceKind;
use crate::rag::Provenance;
use crate::session::Session;
use anyhow::Result;
use std::io::Write;

/// Run the ask command: ingest the source, then answer one question.
pub async fn run_ask(
    question: &str,
    source: &str,
    model: Option<String>,
    top_k: Option<usize>,
    mut settings: Settings,
) -> Result<()> {
    require_api_key()?;

    if let Some(model) = model {
        settings.generation.model = model;
    }
    if let Some(top_k) = top_k {
        settings.retrieval.top_k = top_k;
    }
    // One-shot asks never display suggestions; skip generating them.
    settings.suggestions.enabled = false;

    let kind = SourceKind::from_input(source)?;
    let mut session = Session::new(&settings)?;

    let spinner = Output::spinner(&format!("Processing {}...", kind.label()));
    let report = match session.ingest(&kind).await {
        Ok(report) => report,
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to process source: {}", e));
            return Err(e.into());
        }
    };
    spinner.finish_and_clear();
    Output::success(&format!(
        "Indexed {} ({} chunks)",
        report.label, report.chunks
    ));

    println!();
    let outcome = {
        let mut stdout = std::io::stdout();
        session
            .ask(question, |delta| {
                print!("{}", delta);
                let _ = stdout.flush();
            })
            .await
    };

    match outcome {
        Ok(outcome) => {
            println!();
            if outcome.provenance == Provenance::ContextBased {
                Output::header("Sources");
                for chunk in &outcome.citations {
                    Output::citation(&chunk.locator(), &chunk.text);
                }
            }
            Ok(())
        }
        Err(e) => {
            println!();
            Output::error(&format!("Failed to generate answer: {}", e));
            Err(e.into())
        }
    }
}
