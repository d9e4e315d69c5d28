//! Offline evaluation harness.
//!
//! Feeds fixed question/ground-truth pairs through the pipeline (ingest
//! once, then ask each question non-conversationally) and scores the
//! outputs with model-judged metrics: faithfulness, answer relevancy,
//! context precision, and context recall.

use crate::config::Prompts;
use crate::error::{Result, SvaraError};
use crate::llm::{ChatMessage, ChatModel};
use crate::session::Session;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// One evaluation question with its reference answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalItem {
    pub question: String,
    pub ground_truth: String,
}

/// Load a dataset from a JSON file: an array of {question, ground_truth}.
pub fn load_dataset(path: &Path) -> Result<Vec<EvalItem>> {
    let content = std::fs::read_to_string(path)?;
    let items: Vec<EvalItem> = serde_json::from_str(&content)?;
    if items.is_empty() {
        return Err(SvaraError::InvalidInput(format!(
            "Evaluation dataset {} is empty",
            path.display()
        )));
    }
    Ok(items)
}

/// Built-in dataset for the classic Paul Graham essay.
pub fn sample_dataset() -> Vec<EvalItem> {
    let pairs = [
        (
            "What were the two main things the author worked on before college?",
            "Before college, the author mainly worked on writing and programming.",
        ),
        (
            "What kind of stories did the author write, and what was his opinion of them?",
            "He wrote awful short stories that had hardly any plot, just characters with strong feelings.",
        ),
        (
            "What did the author learn from Russian writers?",
            "From the Russian writers, he learned that it was possible to be serious in writing.",
        ),
        (
            "How did the author's experience with programming influence his writing?",
            "Programming taught him that, like fixing bugs in code, he could fix clunky sentences in his writing and improve by working at it.",
        ),
        (
            "What are the main lessons the author learned from writing and programming?",
            "The main lessons he learned were: to get good at something, you must do it a lot; it is important to be willing to fail; and you must be willing to work hard.",
        ),
    ];

    pairs
        .iter()
        .map(|(question, ground_truth)| EvalItem {
            question: (*question).to_string(),
            ground_truth: (*ground_truth).to_string(),
        })
        .collect()
}

/// Scores for one evaluated question. Metrics the judge could not score
/// are left as None and excluded from the averages.
#[derive(Debug, Clone)]
pub struct QuestionScores {
    pub question: String,
    pub answer: String,
    pub faithfulness: Option<f32>,
    pub answer_relevancy: Option<f32>,
    pub context_precision: Option<f32>,
    pub context_recall: Option<f32>,
}

/// Aggregated evaluation results.
#[derive(Debug)]
pub struct EvalReport {
    pub per_question: Vec<QuestionScores>,
}

impl EvalReport {
    pub fn mean_faithfulness(&self) -> Option<f32> {
        mean(self.per_question.iter().filter_map(|q| q.faithfulness))
    }

    pub fn mean_answer_relevancy(&self) -> Option<f32> {
        mean(self.per_question.iter().filter_map(|q| q.answer_relevancy))
    }

    pub fn mean_context_precision(&self) -> Option<f32> {
        mean(self.per_question.iter().filter_map(|q| q.context_precision))
    }

    pub fn mean_context_recall(&self) -> Option<f32> {
        mean(self.per_question.iter().filter_map(|q| q.context_recall))
    }
}

fn mean(values: impl Iterator<Item = f32>) -> Option<f32> {
    let collected: Vec<f32> = values.collect();
    if collected.is_empty() {
        None
    } else {
        Some(collected.iter().sum::<f32>() / collected.len() as f32)
    }
}

/// Drives the pipeline over a dataset and judges the outputs.
pub struct EvalRunner {
    judge: Arc<dyn ChatModel>,
    prompts: Prompts,
}

impl EvalRunner {
    /// Create a runner using the given model as judge.
    pub fn new(judge: Arc<dyn ChatModel>, prompts: Prompts) -> Self {
        Self { judge, prompts }
    }

    /// Evaluate every dataset item against an already-ingested session.
    ///
    /// History is cleared before each question so every ask is
    /// non-conversational, matching how the harness consumes the
    /// ingest/ask contract.
    #[instrument(skip_all, fields(questions = dataset.len()))]
    pub async fn run(&self, session: &mut Session, dataset: &[EvalItem]) -> Result<EvalReport> {
        let mut per_question = Vec::with_capacity(dataset.len());

        for item in dataset {
            session.clear_history();
            info!("Evaluating: {}", item.question);

            let result = session.ask_detailed(&item.question, |_| {}).await?;

            let context = result
                .retrieved
                .iter()
                .map(|h| h.chunk.text.as_str())
                .collect::<Vec<_>>()
                .join("\n---\n");

            let templates = self.prompts.eval.clone();
            let scores = QuestionScores {
                faithfulness: self
                    .judge_metric(
                        &templates.faithfulness,
                        &item.question,
                        &result.outcome.text,
                        &context,
                        &item.ground_truth,
                    )
                    .await,
                answer_relevancy: self
                    .judge_metric(
                        &templates.answer_relevancy,
                        &item.question,
                        &result.outcome.text,
                        &context,
                        &item.ground_truth,
                    )
                    .await,
                context_precision: self
                    .judge_metric(
                        &templates.context_precision,
                        &item.question,
                        &result.outcome.text,
                        &context,
                        &item.ground_truth,
                    )
                    .await,
                context_recall: self
                    .judge_metric(
                        &templates.context_recall,
                        &item.question,
                        &result.outcome.text,
                        &context,
                        &item.ground_truth,
                    )
                    .await,
                question: item.question.clone(),
                answer: result.outcome.text,
            };

            per_question.push(scores);
        }

        Ok(EvalReport { per_question })
    }

    /// Ask the judge for a 0..1 score; unparsable replies score None.
    async fn judge_metric(
        &self,
        template: &str,
        question: &str,
        answer: &str,
        context: &str,
        ground_truth: &str,
    ) -> Option<f32> {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        vars.insert("answer".to_string(), answer.to_string());
        vars.insert("context".to_string(), context.to_string());
        vars.insert("ground_truth".to_string(), ground_truth.to_string());
        let prompt = self.prompts.render_with_custom(template, &vars);

        let response = match self.judge.complete(&[ChatMessage::user(prompt)]).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Judge call failed: {}", e);
                return None;
            }
        };

        match parse_score(&response) {
            Some(score) => Some(score),
            None => {
                warn!("Could not parse judge score from: {}", response);
                None
            }
        }
    }
}

/// Pull the first number out of a judge reply and clamp it to 0..1.
fn parse_score(text: &str) -> Option<f32> {
    text.split(|c: char| !(c.is_ascii_digit() || c == '.'))
        .filter(|token| !token.is_empty())
        .find_map(|token| token.parse::<f32>().ok())
        .map(|score| score.clamp(0.0, 1.0))
}
