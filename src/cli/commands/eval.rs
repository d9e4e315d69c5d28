//! Evaluation command implementation.

use super::require_api_key;
use crate::cli::Output;
use crate::config::Settings;
use crate::eval::{load_dataset, sample_dataset, EvalReport, EvalRunner};
use crate::extract::SourceKind;
use crate::llm::{ChatModel, OpenAiChat};
use crate::session::Session;
use anyhow::Result;
use console::style;
use std::path::PathBuf;
use std::sync::Arc;

/// Run the eval command: ingest once, ask every dataset question, judge.
pub async fn run_eval(
    source: &str,
    dataset: Option<String>,
    model: Option<String>,
    mut settings: Settings,
) -> Result<()> {
    require_api_key()?;

    if let Some(model) = model {
        settings.generation.model = model;
    }
    // The harness never displays suggestions; skip generating them.
    settings.suggestions.enabled = false;

    let items = match dataset {
        Some(path) => load_dataset(&PathBuf::from(path))?,
        None => {
            Output::info("No dataset given, using the built-in sample set.");
            sample_dataset()
        }
    };

    let kind = SourceKind::from_input(source)?;
    let mut session = Session::new(&settings)?;

    let spinner = Output::spinner(&format!("Processing {}...", kind.label()));
    let report = session.ingest(&kind).await?;
    spinner.finish_and_clear();
    Output::success(&format!(
        "Indexed {} ({} chunks)",
        report.label, report.chunks
    ));

    // Judging reads best at temperature zero.
    let judge: Arc<dyn ChatModel> = Arc::new(OpenAiChat::new(&settings.generation.model, 0.0));
    let runner = EvalRunner::new(judge, session_prompts(&settings)?);

    let spinner = Output::spinner(&format!("Evaluating {} questions...", items.len()));
    let report = runner.run(&mut session, &items).await?;
    spinner.finish_and_clear();

    print_report(&report);
    Ok(())
}

fn session_prompts(settings: &Settings) -> crate::error::Result<crate::config::Prompts> {
    crate::config::Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    )
}

/// Print the evaluation report.
fn print_report(report: &EvalReport) {
    Output::header("Evaluation Report");
    println!("{}", style("Higher is better (max 1.0).").dim());

    println!();
    print_metric("Faithfulness", report.mean_faithfulness());
    print_metric("Answer Relevancy", report.mean_answer_relevancy());
    print_metric("Context Precision", report.mean_context_precision());
    print_metric("Context Recall", report.mean_context_recall());

    Output::header("Per-Question Details");
    for scores in &report.per_question {
        println!("\n{}", style(&scores.question).bold());
        println!("  {}", scores.answer.replace('\n', "\n  "));
        print!("  ");
        print_inline_metric("faith", scores.faithfulness);
        print_inline_metric("rel", scores.answer_relevancy);
        print_inline_metric("prec", scores.context_precision);
        print_inline_metric("recall", scores.context_recall);
        println!();
    }
}

fn print_metric(name: &str, value: Option<f32>) {
    match value {
        Some(v) => Output::kv(name, &format!("{:.4}", v)),
        None => Output::kv(name, "n/a"),
    }
}

fn print_inline_metric(name: &str, value: Option<f32>) {
    match value {
        Some(v) => print!("{}={:.2} ", name, v),
        None => print!("{}=n/a ", name),
    }
}
