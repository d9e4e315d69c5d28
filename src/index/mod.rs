//! Vector indexing for Svara.
//!
//! One index exists per active source. It is created fresh on ingestion
//! and discarded wholesale when a new source replaces it; there is no
//! incremental update path.

pub mod chunker;

use crate::config::IndexingSettings;
use crate::embedding::Embedder;
use crate::error::{Result, SvaraError};
use crate::extract::Segment;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// A bounded-length text fragment stored in the vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk ID.
    pub id: Uuid,
    /// Text content of this chunk.
    pub text: String,
    /// Source locator carried over from the originating segment.
    pub source: String,
    /// Page number carried over from the originating segment.
    pub page: Option<u32>,
    /// Index of the originating segment.
    pub segment_index: usize,
    /// Order of this chunk across the whole source.
    pub order: i32,
}

impl Chunk {
    /// Create a new chunk.
    pub fn new(
        text: String,
        source: String,
        page: Option<u32>,
        segment_index: usize,
        order: i32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            source,
            page,
            segment_index,
            order,
        }
    }

    /// Short display locator, e.g. "report.pdf p.3".
    pub fn locator(&self) -> String {
        match self.page {
            Some(page) => format!("{} p.{}", self.source, page),
            None => self.source.clone(),
        }
    }
}

/// A search result with similarity score.
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// The matched chunk.
    pub chunk: Chunk,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// In-memory vector index over the chunks of a single source.
pub struct VectorIndex {
    entries: Vec<(Vec<f32>, Chunk)>,
    dimensions: usize,
    ingested_at: DateTime<Utc>,
}

impl VectorIndex {
    /// Create an empty index for embeddings of the given dimensionality.
    pub fn new(dimensions: usize) -> Self {
        Self {
            entries: Vec::new(),
            dimensions,
            ingested_at: Utc::now(),
        }
    }

    /// Store a chunk with its embedding.
    pub fn insert(&mut self, chunk: Chunk, embedding: Vec<f32>) -> Result<()> {
        if embedding.len() != self.dimensions {
            return Err(SvaraError::Indexing(format!(
                "Embedding dimensionality mismatch: expected {}, got {}",
                self.dimensions,
                embedding.len()
            )));
        }
        self.entries.push((embedding, chunk));
        Ok(())
    }

    /// Return the top `k` chunks most similar to the query embedding.
    pub fn search(&self, query_embedding: &[f32], k: usize) -> Vec<SearchHit> {
        let mut hits: Vec<SearchHit> = self
            .entries
            .iter()
            .map(|(embedding, chunk)| SearchHit {
                chunk: chunk.clone(),
                score: cosine_similarity(query_embedding, embedding),
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        hits
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// When this index was built.
    pub fn ingested_at(&self) -> DateTime<Utc> {
        self.ingested_at
    }
}

/// Builds a fresh vector index from extracted segments.
pub struct Indexer {
    embedder: Arc<dyn Embedder>,
    settings: IndexingSettings,
}

impl Indexer {
    /// Create a new indexer.
    pub fn new(embedder: Arc<dyn Embedder>, settings: IndexingSettings) -> Self {
        Self { embedder, settings }
    }

    /// Chunk the segments, embed every chunk, and build a fresh index.
    #[instrument(skip(self, segments), fields(segments = segments.len()))]
    pub async fn build(&self, segments: &[Segment]) -> Result<VectorIndex> {
        if segments.is_empty() {
            return Err(SvaraError::Indexing(
                "Cannot build an index from an empty segment list".to_string(),
            ));
        }

        let chunks = chunker::split_segments(segments, &self.settings);
        if chunks.is_empty() {
            return Err(SvaraError::Indexing(
                "Chunking produced no chunks".to_string(),
            ));
        }

        info!("Embedding {} chunks", chunks.len());
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        if embeddings.len() != chunks.len() {
            return Err(SvaraError::Embedding(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let mut index = VectorIndex::new(self.embedder.dimensions());
        for (chunk, embedding) in chunks.into_iter().zip(embeddings) {
            index.insert(chunk, embedding)?;
        }

        debug!("Built index with {} entries", index.len());
        Ok(index)
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockEmbedder;

    #[test]
    fn cosine_similarity_basics() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &c).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);

        assert_eq!(cosine_similarity(&a, &[1.0]), 0.0);
    }

    #[test]
    fn search_ranks_by_similarity() {
        let mut index = VectorIndex::new(3);
        index
            .insert(
                Chunk::new("north".into(), "doc".into(), None, 0, 0),
                vec![1.0, 0.0, 0.0],
            )
            .unwrap();
        index
            .insert(
                Chunk::new("east".into(), "doc".into(), None, 0, 1),
                vec![0.0, 1.0, 0.0],
            )
            .unwrap();

        let hits = index.search(&[0.9, 0.1, 0.0], 10);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.text, "north");
        assert!(hits[0].score > hits[1].score);

        let hits = index.search(&[0.9, 0.1, 0.0], 1);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn insert_rejects_wrong_dimensions() {
        let mut index = VectorIndex::new(3);
        let result = index.insert(
            Chunk::new("x".into(), "doc".into(), None, 0, 0),
            vec![1.0, 0.0],
        );
        assert!(matches!(result, Err(SvaraError::Indexing(_))));
    }

    #[tokio::test]
    async fn build_rejects_empty_segments() {
        let indexer = Indexer::new(Arc::new(MockEmbedder::new(8)), IndexingSettings::default());
        let result = indexer.build(&[]).await;
        assert!(matches!(result, Err(SvaraError::Indexing(_))));
    }

    #[tokio::test]
    async fn build_rejects_whitespace_only_segments() {
        let indexer = Indexer::new(Arc::new(MockEmbedder::new(8)), IndexingSettings::default());
        let segments = vec![Segment::new("   \n  ", "blank")];
        let result = indexer.build(&segments).await;
        assert!(matches!(result, Err(SvaraError::Indexing(_))));
    }

    #[tokio::test]
    async fn build_indexes_every_chunk() {
        let indexer = Indexer::new(Arc::new(MockEmbedder::new(8)), IndexingSettings::default());
        let segments = vec![
            Segment::new("a".repeat(2500), "doc").with_page(1),
            Segment::new("short tail", "doc").with_page(2),
        ];

        let index = indexer.build(&segments).await.unwrap();
        // 2500 chars at 1000/200 -> 3 windows, plus one for the short segment.
        assert_eq!(index.len(), 4);
    }
}
