//! Session coordination.
//!
//! A session holds the active vector index, the chat history, the source
//! label and any pending suggested questions. Ingesting a new source
//! replaces index and history together in a single assignment; a failed
//! ingest leaves the previous state untouched.

use crate::config::{Prompts, Settings, SuggestionSettings};
use crate::embedding::{Embedder, OpenAiEmbedder};
use crate::error::{Result, SvaraError};
use crate::extract::{ContentCache, Extractor, Segment, SourceKind};
use crate::index::{Indexer, SearchHit, VectorIndex};
use crate::llm::{ChatModel, OpenAiChat};
use crate::rag::{
    suggest, AnswerEvent, AnswerGenerator, AnswerOutcome, HistoryAwareRetriever, Turn,
};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// State tied to the currently active source.
struct ActiveSource {
    index: VectorIndex,
    label: String,
    history: Vec<Turn>,
    suggestions: Vec<String>,
}

/// Result of a successful ingestion.
#[derive(Debug)]
pub struct IngestReport {
    /// Display label of the new source.
    pub label: String,
    /// Number of extracted segments.
    pub segments: usize,
    /// Number of indexed chunks.
    pub chunks: usize,
}

/// Detailed result of one question.
pub struct AskResult {
    /// The classified answer.
    pub outcome: AnswerOutcome,
    /// Everything retrieval supplied, regardless of provenance.
    pub retrieved: Vec<SearchHit>,
    /// The question actually used for the search.
    pub standalone_question: String,
}

/// A single-source conversational session.
pub struct Session {
    extractor: Extractor,
    indexer: Indexer,
    retriever: HistoryAwareRetriever,
    generator: AnswerGenerator,
    chat: Arc<dyn ChatModel>,
    prompts: Prompts,
    suggestion_settings: SuggestionSettings,
    cache: ContentCache,
    active: Option<ActiveSource>,
}

impl Session {
    /// Create a session wired to the OpenAI backends.
    pub fn new(settings: &Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let embedder: Arc<dyn Embedder> = Arc::new(OpenAiEmbedder::with_config(
            &settings.embedding.model,
            settings.embedding.dimensions as usize,
        ));
        let chat: Arc<dyn ChatModel> = Arc::new(OpenAiChat::new(
            &settings.generation.model,
            settings.generation.temperature,
        ));

        Self::with_components(settings, prompts, embedder, chat)
    }

    /// Create a session with custom model backends.
    pub fn with_components(
        settings: &Settings,
        prompts: Prompts,
        embedder: Arc<dyn Embedder>,
        chat: Arc<dyn ChatModel>,
    ) -> Result<Self> {
        let extractor = Extractor::new(settings.extraction.clone())?;
        let indexer = Indexer::new(embedder.clone(), settings.indexing.clone());
        let retriever = HistoryAwareRetriever::new(
            chat.clone(),
            embedder,
            prompts.clone(),
            settings.retrieval.top_k,
        );
        let generator = AnswerGenerator::new(chat.clone(), prompts.clone());

        Ok(Self {
            extractor,
            indexer,
            retriever,
            generator,
            chat,
            prompts,
            suggestion_settings: settings.suggestions.clone(),
            cache: ContentCache::new(),
            active: None,
        })
    }

    /// Extract a source and replace the active index and history.
    #[instrument(skip(self, kind), fields(source = %kind.label()))]
    pub async fn ingest(&mut self, kind: &SourceKind) -> Result<IngestReport> {
        let key = kind.cache_key();

        let segments = match self.cache.get(&key) {
            Some(cached) => {
                info!("Extraction cache hit for {}", kind.label());
                cached.clone()
            }
            None => {
                let segments = self.extractor.extract(kind).await?;
                self.cache.insert(key.clone(), segments.clone());
                segments
            }
        };

        let report = self
            .ingest_segments(segments, kind.label().to_string())
            .await?;

        // Entries for the replaced source must never be served again.
        self.cache.retain_only(&key);

        Ok(report)
    }

    /// Index pre-extracted segments and replace the active source state.
    ///
    /// The new index is built completely before any existing state is
    /// touched, so a failure here leaves the session exactly as it was.
    pub async fn ingest_segments(
        &mut self,
        segments: Vec<Segment>,
        label: String,
    ) -> Result<IngestReport> {
        let index = self.indexer.build(&segments).await?;
        let chunks = index.len();

        // Best-effort: a suggestion failure never fails the ingest.
        let suggestions = match suggest::suggested_questions(
            &self.chat,
            &self.prompts,
            &self.suggestion_settings,
            &segments,
        )
        .await
        {
            Ok(questions) => questions,
            Err(e) => {
                warn!("Failed to generate suggested questions: {}", e);
                Vec::new()
            }
        };

        info!(
            "Activating source '{}' with {} chunks (built at {})",
            label,
            chunks,
            index.ingested_at()
        );
        self.active = Some(ActiveSource {
            index,
            label: label.clone(),
            history: Vec::new(),
            suggestions,
        });

        Ok(IngestReport {
            label,
            segments: segments.len(),
            chunks,
        })
    }

    /// Answer a question, streaming text fragments through `on_delta`.
    ///
    /// History gains exactly one user turn and one answer turn, appended
    /// only after the stream completes; a failed or cancelled stream
    /// leaves history untouched.
    pub async fn ask<F>(&mut self, question: &str, on_delta: F) -> Result<AnswerOutcome>
    where
        F: FnMut(&str),
    {
        self.ask_detailed(question, on_delta)
            .await
            .map(|result| result.outcome)
    }

    /// Like [`ask`](Self::ask), additionally exposing the retrieved chunks
    /// and the standalone question (used by the evaluation harness).
    #[instrument(skip(self, on_delta), fields(question = %question))]
    pub async fn ask_detailed<F>(&mut self, question: &str, mut on_delta: F) -> Result<AskResult>
    where
        F: FnMut(&str),
    {
        let active = self.active.as_ref().ok_or_else(|| {
            SvaraError::Retrieval("No source has been ingested yet".to_string())
        })?;

        let (standalone_question, retrieved) = self
            .retriever
            .retrieve(question, &active.history, &active.index)
            .await?;

        let mut stream = self
            .generator
            .generate(question, &retrieved, &active.history)
            .await?;

        let outcome = loop {
            match stream.next().await {
                Some(AnswerEvent::Delta(delta)) => on_delta(&delta),
                Some(AnswerEvent::Done(outcome)) => break outcome,
                Some(AnswerEvent::Failed(message)) => {
                    return Err(SvaraError::Generation(message));
                }
                None => {
                    return Err(SvaraError::Generation(
                        "Answer stream ended without completing".to_string(),
                    ));
                }
            }
        };

        if let Some(active) = self.active.as_mut() {
            active.history.push(Turn::User(question.to_string()));
            active.history.push(Turn::Assistant(outcome.clone()));
            // Suggestions only describe the state right after ingestion.
            active.suggestions.clear();
        }

        Ok(AskResult {
            outcome,
            retrieved,
            standalone_question,
        })
    }

    /// Reset the conversation, keeping the active index.
    pub fn clear_history(&mut self) {
        if let Some(active) = self.active.as_mut() {
            active.history.clear();
        }
    }

    /// Whether a source is active.
    pub fn has_source(&self) -> bool {
        self.active.is_some()
    }

    /// Label of the active source.
    pub fn source_label(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.label.as_str())
    }

    /// Conversation so far (empty before the first ingest).
    pub fn history(&self) -> &[Turn] {
        self.active.as_ref().map_or(&[], |a| a.history.as_slice())
    }

    /// Pending suggested questions.
    pub fn suggestions(&self) -> &[String] {
        self.active
            .as_ref()
            .map_or(&[], |a| a.suggestions.as_slice())
    }

    /// Number of chunks in the active index.
    pub fn indexed_chunks(&self) -> usize {
        self.active.as_ref().map_or(0, |a| a.index.len())
    }
}
