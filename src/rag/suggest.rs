//! Suggested follow-up questions after ingesting a source.

use crate::config::{Prompts, SuggestionSettings};
use crate::error::Result;
use crate::extract::Segment;
use crate::llm::{ChatMessage, ChatModel};
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Generate suggested questions from the leading segments of a source.
///
/// Callers treat failure as non-fatal: the session logs and falls back to
/// an empty list.
#[instrument(skip_all, fields(segments = segments.len()))]
pub async fn suggested_questions(
    chat: &Arc<dyn ChatModel>,
    prompts: &Prompts,
    settings: &SuggestionSettings,
    segments: &[Segment],
) -> Result<Vec<String>> {
    if !settings.enabled || segments.is_empty() {
        return Ok(Vec::new());
    }

    let combined = segments
        .iter()
        .take(settings.segment_sample)
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let sample = truncate_chars(&combined, settings.max_source_chars);

    let mut vars = HashMap::new();
    vars.insert("count".to_string(), settings.max_questions.to_string());
    vars.insert("content".to_string(), sample);
    let prompt = prompts.render_with_custom(&prompts.suggestions.user, &vars);

    let response = chat.complete(&[ChatMessage::user(prompt)]).await?;

    let questions = parse_numbered_questions(&response, settings.max_questions);
    debug!("Parsed {} suggested questions", questions.len());
    Ok(questions)
}

/// Truncate to at most `max` characters without splitting a codepoint.
fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Pull questions out of a numbered list ("1. ..." or "1) ...").
fn parse_numbered_questions(text: &str, max: usize) -> Vec<String> {
    let re = Regex::new(r"^\s*\d+[.)]\s*(.+)$").expect("Invalid regex");

    text.lines()
        .filter_map(|line| {
            re.captures(line)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim().to_string())
        })
        .filter(|q| !q.is_empty())
        .take(max)
        .collect()
}
