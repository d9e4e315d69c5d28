//! Deterministic test doubles shared across unit tests.

use crate::embedding::Embedder;
use crate::error::{Result, SvaraError};
use crate::llm::{ChatMessage, ChatModel, TokenStream};
use async_trait::async_trait;
use futures::stream;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Bag-of-words embedder: deterministic, no network, and texts sharing
/// vocabulary land near each other so retrieval behaves realistically.
pub struct MockEmbedder {
    dimensions: usize,
}

impl MockEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for word in text.to_lowercase().split_whitespace() {
            let normalized: String = word.chars().filter(|c| c.is_alphanumeric()).collect();
            if normalized.is_empty() {
                continue;
            }
            let mut bucket: usize = 0;
            for byte in normalized.bytes() {
                bucket = bucket.wrapping_mul(31).wrapping_add(byte as usize);
            }
            vector[bucket % self.dimensions] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// One scripted model response.
pub enum ScriptedReply {
    /// Completes with this text; streams it in small fragments.
    Text(String),
    /// Fails immediately.
    Failure(String),
    /// Streams the given fragments, then fails mid-stream.
    PartialThenFailure(Vec<String>, String),
}

/// Chat model that replays a scripted queue of replies and records every
/// request for assertions.
pub struct ScriptedChat {
    replies: Mutex<VecDeque<ScriptedReply>>,
    pub calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedChat {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Convenience constructor for a single full-text reply.
    pub fn single(text: &str) -> Self {
        Self::new(vec![ScriptedReply::Text(text.to_string())])
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn next_reply(&self, messages: &[ChatMessage]) -> Result<ScriptedReply> {
        self.calls.lock().unwrap().push(messages.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| SvaraError::Generation("ScriptedChat exhausted".to_string()))
    }
}

#[async_trait]
impl ChatModel for ScriptedChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        match self.next_reply(messages)? {
            ScriptedReply::Text(text) => Ok(text),
            ScriptedReply::Failure(e) | ScriptedReply::PartialThenFailure(_, e) => {
                Err(SvaraError::Generation(e))
            }
        }
    }

    async fn complete_stream(&self, messages: &[ChatMessage]) -> Result<TokenStream> {
        match self.next_reply(messages)? {
            ScriptedReply::Text(text) => {
                let fragments: Vec<Result<String>> = split_into_fragments(&text)
                    .into_iter()
                    .map(Ok)
                    .collect();
                Ok(stream::iter(fragments).boxed())
            }
            ScriptedReply::Failure(e) => {
                Ok(stream::iter(vec![Err(SvaraError::Generation(e))]).boxed())
            }
            ScriptedReply::PartialThenFailure(fragments, e) => {
                let mut items: Vec<Result<String>> = fragments.into_iter().map(Ok).collect();
                items.push(Err(SvaraError::Generation(e)));
                Ok(stream::iter(items).boxed())
            }
        }
    }
}

/// Split text into word-sized fragments, preserving whitespace, so tests
/// observe genuinely incremental delivery.
fn split_into_fragments(text: &str) -> Vec<String> {
    let mut fragments = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        current.push(ch);
        if ch == ' ' {
            fragments.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        fragments.push(current);
    }
    fragments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragments_reassemble_exactly() {
        let text = "Based on the provided context: Paris.";
        assert_eq!(split_into_fragments(text).concat(), text);
    }

    #[tokio::test]
    async fn mock_embedder_is_deterministic_and_semantic() {
        let embedder = MockEmbedder::new(32);
        let a = embedder.embed("the capital of France").await.unwrap();
        let b = embedder.embed("the capital of France").await.unwrap();
        assert_eq!(a, b);

        let question = embedder.embed("What is the capital of France?").await.unwrap();
        let relevant = embedder.embed("Paris is the capital of France.").await.unwrap();
        let irrelevant = embedder.embed("Rust borrow checker semantics").await.unwrap();

        let close = crate::index::cosine_similarity(&question, &relevant);
        let far = crate::index::cosine_similarity(&question, &irrelevant);
        assert!(close > far);
    }
}
