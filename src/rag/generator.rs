//! Streamed answer generation.

use super::{history_messages, AnswerEvent, AnswerOutcome, Turn};
use crate::config::Prompts;
use crate::error::Result;
use crate::index::SearchHit;
use crate::llm::{ChatMessage, ChatModel, TokenStream};
use futures::Stream;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::instrument;

/// Generates grounded answers as a cancellable event stream.
pub struct AnswerGenerator {
    chat: Arc<dyn ChatModel>,
    prompts: Prompts,
}

impl AnswerGenerator {
    /// Create a new generator.
    pub fn new(chat: Arc<dyn ChatModel>, prompts: Prompts) -> Self {
        Self { chat, prompts }
    }

    /// Start answering. The retrieved chunks are stuffed into the system
    /// prompt; the history and the original (not reformulated) question
    /// follow as chat messages.
    #[instrument(skip(self, hits, history), fields(question = %question, chunks = hits.len()))]
    pub async fn generate(
        &self,
        question: &str,
        hits: &[SearchHit],
        history: &[Turn],
    ) -> Result<AnswerStream> {
        let context = format_context(hits);

        let mut vars = HashMap::new();
        vars.insert("context".to_string(), context);
        let system = self
            .prompts
            .render_with_custom(&self.prompts.answer.system, &vars);

        let mut messages = vec![ChatMessage::system(system)];
        messages.extend(history_messages(history));
        messages.push(ChatMessage::user(question.to_string()));

        let inner = self.chat.complete_stream(&messages).await?;

        Ok(AnswerStream::new(inner, hits.to_vec()))
    }
}

/// Join retrieved chunk texts for prompt stuffing.
fn format_context(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|h| h.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Event stream for one answer.
///
/// Yields `Delta` fragments, then exactly one terminal event: `Done` with
/// the classified outcome, or `Failed` if the model errored mid-stream.
/// Dropping the stream cancels generation.
pub struct AnswerStream {
    inner: Option<TokenStream>,
    retrieved: Vec<SearchHit>,
    text: String,
}

impl AnswerStream {
    fn new(inner: TokenStream, retrieved: Vec<SearchHit>) -> Self {
        Self {
            inner: Some(inner),
            retrieved,
            text: String::new(),
        }
    }
}

impl Stream for AnswerStream {
    type Item = AnswerEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        let Some(inner) = this.inner.as_mut() else {
            return Poll::Ready(None);
        };

        loop {
            match inner.as_mut().poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(Ok(delta))) => {
                    if delta.is_empty() {
                        continue;
                    }
                    this.text.push_str(&delta);
                    return Poll::Ready(Some(AnswerEvent::Delta(delta)));
                }
                Poll::Ready(Some(Err(e))) => {
                    this.inner = None;
                    return Poll::Ready(Some(AnswerEvent::Failed(e.to_string())));
                }
                Poll::Ready(None) => {
                    this.inner = None;
                    let outcome =
                        AnswerOutcome::from_text(std::mem::take(&mut this.text), &this.retrieved);
                    return Poll::Ready(Some(AnswerEvent::Done(outcome)));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Chunk;
    use crate::rag::Provenance;
    use crate::testing::{ScriptedChat, ScriptedReply};
    use futures::StreamExt;

    fn hits() -> Vec<SearchHit> {
        vec![SearchHit {
            chunk: Chunk::new(
                "Paris is the capital of France.".to_string(),
                "essay.txt".to_string(),
                None,
                0,
                0,
            ),
            score: 0.92,
        }]
    }

    async fn drain(mut stream: AnswerStream) -> (String, Vec<AnswerEvent>) {
        let mut streamed = String::new();
        let mut terminal = Vec::new();
        while let Some(event) = stream.next().await {
            match event {
                AnswerEvent::Delta(d) => streamed.push_str(&d),
                other => terminal.push(other),
            }
        }
        (streamed, terminal)
    }

    #[tokio::test]
    async fn streams_deltas_then_done() {
        let chat = Arc::new(ScriptedChat::single(
            "Based on the provided context: Paris.",
        ));
        let generator = AnswerGenerator::new(chat, Prompts::default());

        let stream = generator.generate("capital?", &hits(), &[]).await.unwrap();
        let (streamed, terminal) = drain(stream).await;

        assert_eq!(streamed, "Based on the provided context: Paris.");
        assert_eq!(terminal.len(), 1);
        match &terminal[0] {
            AnswerEvent::Done(outcome) => {
                assert_eq!(outcome.provenance, Provenance::ContextBased);
                assert_eq!(outcome.text, streamed);
                assert_eq!(outcome.citations.len(), 1);
            }
            other => panic!("expected Done, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn mid_stream_failure_is_terminal_and_distinct() {
        let chat = Arc::new(ScriptedChat::new(vec![ScriptedReply::PartialThenFailure(
            vec!["Based on ".to_string(), "the provided".to_string()],
            "connection reset".to_string(),
        )]));
        let generator = AnswerGenerator::new(chat, Prompts::default());

        let stream = generator.generate("capital?", &hits(), &[]).await.unwrap();
        let (streamed, terminal) = drain(stream).await;

        assert_eq!(streamed, "Based on the provided");
        assert_eq!(terminal.len(), 1);
        assert!(matches!(&terminal[0], AnswerEvent::Failed(msg) if msg.contains("connection reset")));
    }

    #[tokio::test]
    async fn stream_ends_after_terminal_event() {
        let chat = Arc::new(ScriptedChat::single("I don't know."));
        let generator = AnswerGenerator::new(chat, Prompts::default());

        let mut stream = generator.generate("capital?", &hits(), &[]).await.unwrap();
        let mut saw_done = false;
        while let Some(event) = stream.next().await {
            if matches!(event, AnswerEvent::Done(_)) {
                saw_done = true;
            }
        }
        assert!(saw_done);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn context_is_stuffed_into_system_prompt() {
        let chat = Arc::new(ScriptedChat::single("Based on the provided context: yes."));
        let generator = AnswerGenerator::new(chat.clone(), Prompts::default());

        let history = vec![Turn::User("earlier".to_string())];
        let stream = generator
            .generate("capital?", &hits(), &history)
            .await
            .unwrap();
        drain(stream).await;

        let calls = chat.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let messages = &calls[0];
        // system prompt carries the chunk text, history sits between
        // system and the final user question.
        assert!(messages[0].content.contains("Paris is the capital of France."));
        assert_eq!(messages[1].content, "earlier");
        assert_eq!(messages.last().unwrap().content, "capital?");
    }
}
