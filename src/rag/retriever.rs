//! History-aware retrieval.

use super::{history_messages, Turn};
use crate::config::Prompts;
use crate::embedding::Embedder;
use crate::error::Result;
use crate::index::{SearchHit, VectorIndex};
use crate::llm::{ChatMessage, ChatModel};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Rewrites follow-up questions into standalone form, then searches the
/// active index.
pub struct HistoryAwareRetriever {
    chat: Arc<dyn ChatModel>,
    embedder: Arc<dyn Embedder>,
    prompts: Prompts,
    top_k: usize,
}

impl HistoryAwareRetriever {
    /// Create a new retriever.
    pub fn new(
        chat: Arc<dyn ChatModel>,
        embedder: Arc<dyn Embedder>,
        prompts: Prompts,
        top_k: usize,
    ) -> Self {
        Self {
            chat,
            embedder,
            prompts,
            top_k,
        }
    }

    /// Resolve the question against chat history and fetch the top-k
    /// matching chunks. Returns the standalone question actually used for
    /// the search alongside the hits.
    #[instrument(skip(self, history, index), fields(question = %question))]
    pub async fn retrieve(
        &self,
        question: &str,
        history: &[Turn],
        index: &VectorIndex,
    ) -> Result<(String, Vec<SearchHit>)> {
        let standalone = if history.is_empty() {
            question.to_string()
        } else {
            // Reformulation failure is non-fatal: fall back to the raw question.
            match self.reformulate(question, history).await {
                Ok(rewritten) if !rewritten.trim().is_empty() => {
                    debug!("Reformulated question: {}", rewritten);
                    rewritten
                }
                Ok(_) => question.to_string(),
                Err(e) => {
                    warn!("Query reformulation failed, using question verbatim: {}", e);
                    question.to_string()
                }
            }
        };

        let query_embedding = self.embedder.embed(&standalone).await?;
        let hits = index.search(&query_embedding, self.top_k);

        debug!("Retrieved {} chunks", hits.len());
        Ok((standalone, hits))
    }

    /// Ask the model to rewrite the question so it stands alone.
    async fn reformulate(&self, question: &str, history: &[Turn]) -> Result<String> {
        let mut messages = vec![ChatMessage::system(
            self.prompts.contextualize.system.clone(),
        )];
        messages.extend(history_messages(history));
        messages.push(ChatMessage::user(question.to_string()));

        let rewritten = self.chat.complete(&messages).await?;
        Ok(rewritten.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{Chunk, VectorIndex};
    use crate::rag::AnswerOutcome;
    use crate::testing::{MockEmbedder, ScriptedChat, ScriptedReply};
    use futures::executor;

    fn build_index(embedder: &MockEmbedder, texts: &[&str]) -> VectorIndex {
        let mut index = VectorIndex::new(embedder.dimensions());
        for (i, text) in texts.iter().enumerate() {
            let embedding = executor::block_on(embedder.embed(text)).unwrap();
            index
                .insert(
                    Chunk::new(text.to_string(), "doc".to_string(), None, 0, i as i32),
                    embedding,
                )
                .unwrap();
        }
        index
    }

    fn retriever_with(chat: ScriptedChat) -> (HistoryAwareRetriever, Arc<MockEmbedder>) {
        let embedder = Arc::new(MockEmbedder::new(64));
        let retriever = HistoryAwareRetriever::new(
            Arc::new(chat),
            embedder.clone(),
            Prompts::default(),
            4,
        );
        (retriever, embedder)
    }

    #[tokio::test]
    async fn empty_history_skips_reformulation() {
        let chat = ScriptedChat::new(vec![]);
        let embedder = Arc::new(MockEmbedder::new(64));
        let chat = Arc::new(chat);
        let retriever =
            HistoryAwareRetriever::new(chat.clone(), embedder.clone(), Prompts::default(), 4);
        let index = build_index(&embedder, &["Paris is the capital of France."]);

        let (standalone, hits) = retriever
            .retrieve("What is the capital of France?", &[], &index)
            .await
            .unwrap();

        assert_eq!(standalone, "What is the capital of France?");
        assert_eq!(hits.len(), 1);
        // No model call was made at all.
        assert_eq!(chat.call_count(), 0);
    }

    #[tokio::test]
    async fn history_triggers_reformulation() {
        let (retriever, embedder) = retriever_with(ScriptedChat::new(vec![ScriptedReply::Text(
            "What is the population of Paris?".to_string(),
        )]));
        let index = build_index(&embedder, &["Paris has about two million residents."]);

        let history = vec![
            Turn::User("Tell me about Paris.".to_string()),
            Turn::Assistant(AnswerOutcome::from_text(
                "Based on general knowledge: it is the capital of France.".to_string(),
                &[],
            )),
        ];

        let (standalone, _) = retriever
            .retrieve("And its population?", &history, &index)
            .await
            .unwrap();

        assert_eq!(standalone, "What is the population of Paris?");
    }

    #[tokio::test]
    async fn reformulation_failure_degrades_to_verbatim() {
        let (retriever, embedder) = retriever_with(ScriptedChat::new(vec![
            ScriptedReply::Failure("model unavailable".to_string()),
        ]));
        let index = build_index(&embedder, &["Paris is the capital of France."]);

        let history = vec![Turn::User("Earlier question".to_string())];

        let (standalone, hits) = retriever
            .retrieve("What is the capital of France?", &history, &index)
            .await
            .unwrap();

        assert_eq!(standalone, "What is the capital of France?");
        assert!(!hits.is_empty());
    }

    #[tokio::test]
    async fn top_k_bounds_results() {
        let (retriever, embedder) = retriever_with(ScriptedChat::new(vec![]));
        let texts: Vec<String> = (0..10)
            .map(|i| format!("France fact number {} about the capital", i))
            .collect();
        let refs: Vec<&str> = texts.iter().map(|s| s.as_str()).collect();
        let index = build_index(&embedder, &refs);

        let (_, hits) = retriever
            .retrieve("capital of France", &[], &index)
            .await
            .unwrap();

        assert_eq!(hits.len(), 4);
    }
}
