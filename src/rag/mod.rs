//! Retrieval-augmented answering.
//!
//! The pipeline per question: reformulate against chat history, search the
//! active index, stream a grounded answer, and classify its provenance
//! from the answer's marker prefix.

mod generator;
mod retriever;
pub mod suggest;

pub use generator::{AnswerGenerator, AnswerStream};
pub use retriever::HistoryAwareRetriever;

pub use crate::config::{CONTEXT_MARKER, GENERAL_MARKER, UNKNOWN_ANSWER};

use crate::index::{Chunk, SearchHit};
use crate::llm::ChatMessage;
use serde::{Deserialize, Serialize};

/// Where an answer's content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Derived from the retrieved context; carries citations.
    ContextBased,
    /// Answered from the model's general knowledge.
    GeneralKnowledge,
    /// The model declined to answer.
    Unknown,
}

/// A completed answer with its provenance and citation set.
#[derive(Debug, Clone)]
pub struct AnswerOutcome {
    pub provenance: Provenance,
    pub text: String,
    /// Chunks the answer is grounded in; empty unless context-based.
    pub citations: Vec<Chunk>,
}

impl AnswerOutcome {
    /// Classify the finished answer text and attach citations only when
    /// the context marker confirms the grounded branch was taken.
    ///
    /// The marker prefix is the model's own signal and a paraphrase
    /// defeats it; such answers classify as Unknown with no citations.
    pub fn from_text(text: String, retrieved: &[SearchHit]) -> Self {
        let provenance = classify(&text);
        let citations = match provenance {
            Provenance::ContextBased => retrieved.iter().map(|h| h.chunk.clone()).collect(),
            Provenance::GeneralKnowledge | Provenance::Unknown => Vec::new(),
        };
        Self {
            provenance,
            text,
            citations,
        }
    }
}

/// Classify answer text by its marker prefix.
pub fn classify(text: &str) -> Provenance {
    let trimmed = text.trim_start();
    if trimmed.starts_with(CONTEXT_MARKER) {
        Provenance::ContextBased
    } else if trimmed.starts_with(GENERAL_MARKER) {
        Provenance::GeneralKnowledge
    } else {
        Provenance::Unknown
    }
}

/// Incremental answer delivery.
#[derive(Debug)]
pub enum AnswerEvent {
    /// The next fragment of answer text.
    Delta(String),
    /// The stream finished normally.
    Done(AnswerOutcome),
    /// The model failed mid-stream; terminal, distinct from completion.
    Failed(String),
}

/// One conversation turn.
#[derive(Debug, Clone)]
pub enum Turn {
    /// A user question.
    User(String),
    /// An assistant answer with its citation set.
    Assistant(AnswerOutcome),
}

impl Turn {
    /// The plain text of this turn.
    pub fn text(&self) -> &str {
        match self {
            Turn::User(text) => text,
            Turn::Assistant(outcome) => &outcome.text,
        }
    }
}

/// Map conversation turns to chat messages for the model.
pub(crate) fn history_messages(history: &[Turn]) -> Vec<ChatMessage> {
    history
        .iter()
        .map(|turn| match turn {
            Turn::User(text) => ChatMessage::user(text.clone()),
            Turn::Assistant(outcome) => ChatMessage::assistant(outcome.text.clone()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(text: &str) -> SearchHit {
        SearchHit {
            chunk: Chunk::new(text.to_string(), "doc".to_string(), None, 0, 0),
            score: 0.9,
        }
    }

    #[test]
    fn classify_marker_prefixes() {
        assert_eq!(
            classify("Based on the provided context: Paris."),
            Provenance::ContextBased
        );
        assert_eq!(
            classify("Based on general knowledge: Paris."),
            Provenance::GeneralKnowledge
        );
        assert_eq!(classify("I don't know."), Provenance::Unknown);
        assert_eq!(classify("Paris is the capital."), Provenance::Unknown);
        // Leading whitespace does not defeat the marker.
        assert_eq!(
            classify("  Based on the provided context: yes"),
            Provenance::ContextBased
        );
    }

    #[test]
    fn citations_only_for_context_based_answers() {
        let retrieved = vec![hit("Paris is the capital of France.")];

        let grounded =
            AnswerOutcome::from_text("Based on the provided context: Paris.".into(), &retrieved);
        assert_eq!(grounded.provenance, Provenance::ContextBased);
        assert_eq!(grounded.citations.len(), 1);

        let general =
            AnswerOutcome::from_text("Based on general knowledge: Paris.".into(), &retrieved);
        assert_eq!(general.provenance, Provenance::GeneralKnowledge);
        assert!(general.citations.is_empty());

        let unknown = AnswerOutcome::from_text("I don't know.".into(), &retrieved);
        assert_eq!(unknown.provenance, Provenance::Unknown);
        assert!(unknown.citations.is_empty());
    }

    #[test]
    fn paraphrased_marker_gets_no_citations() {
        let retrieved = vec![hit("some context")];
        let outcome = AnswerOutcome::from_text(
            "According to the provided context: Paris.".into(),
            &retrieved,
        );
        assert_eq!(outcome.provenance, Provenance::Unknown);
        assert!(outcome.citations.is_empty());
    }
}
