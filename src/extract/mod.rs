//! Source extraction for Svara.
//!
//! Converts a raw source (web page, video, PDF or DOCX document) into an
//! ordered list of text segments ready for indexing.

mod document;
mod video;
mod web;

use crate::config::ExtractionSettings;
use crate::error::{Result, SvaraError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, instrument};

/// A unit of extracted text, immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Extracted text content.
    pub text: String,
    /// Human-readable source locator (URL, title, or file name).
    pub source: String,
    /// Page number within the source document, when meaningful.
    pub page: Option<u32>,
}

impl Segment {
    /// Create a new segment.
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            page: None,
        }
    }

    /// Attach a page number.
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }
}

/// A source reference together with its kind.
#[derive(Debug, Clone)]
pub enum SourceKind {
    /// A web page URL.
    Web(String),
    /// A video URL or bare video ID.
    Video(String),
    /// PDF file contents.
    Pdf { name: String, bytes: Vec<u8> },
    /// DOCX file contents.
    Docx { name: String, bytes: Vec<u8> },
}

impl SourceKind {
    /// Classify a CLI input: a URL becomes a web or video source, a path
    /// to a .pdf/.docx file is read into memory.
    pub fn from_input(input: &str) -> Result<Self> {
        if input.starts_with("http://") || input.starts_with("https://") {
            if video::is_video_url(input) {
                return Ok(SourceKind::Video(input.to_string()));
            }
            return Ok(SourceKind::Web(input.to_string()));
        }

        let path = Path::new(input);
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(input)
            .to_string();

        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("pdf") => {
                let bytes = std::fs::read(path)?;
                Ok(SourceKind::Pdf { name, bytes })
            }
            Some(ext) if ext.eq_ignore_ascii_case("docx") => {
                let bytes = std::fs::read(path)?;
                Ok(SourceKind::Docx { name, bytes })
            }
            _ => Err(SvaraError::InvalidInput(format!(
                "Unsupported source: {} (expected a URL or a .pdf/.docx file)",
                input
            ))),
        }
    }

    /// Display label for this source.
    pub fn label(&self) -> &str {
        match self {
            SourceKind::Web(url) | SourceKind::Video(url) => url,
            SourceKind::Pdf { name, .. } | SourceKind::Docx { name, .. } => name,
        }
    }

    /// Content-identity cache key: hash of the bytes for uploads, hash of
    /// the locator for remote sources.
    pub fn cache_key(&self) -> String {
        match self {
            SourceKind::Web(url) | SourceKind::Video(url) => hash_text(url),
            SourceKind::Pdf { bytes, .. } | SourceKind::Docx { bytes, .. } => hash_bytes(bytes),
        }
    }
}

/// Hex digest of raw bytes.
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Hex digest of a text key.
pub fn hash_text(text: &str) -> String {
    hash_bytes(text.as_bytes())
}

/// Content-addressed cache of extraction results.
///
/// Keys are content hashes, so an entry can never go stale for its key;
/// entries for replaced sources are dropped on source change.
#[derive(Default)]
pub struct ContentCache {
    entries: HashMap<String, Vec<Segment>>,
}

impl ContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Vec<Segment>> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: String, segments: Vec<Segment>) {
        self.entries.insert(key, segments);
    }

    /// Drop every entry except the one for the active source.
    pub fn retain_only(&mut self, key: &str) {
        self.entries.retain(|k, _| k == key);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Source extractor, dispatching to per-kind backends.
pub struct Extractor {
    http: reqwest::Client,
    settings: ExtractionSettings,
}

impl Extractor {
    /// Create an extractor from settings.
    pub fn new(settings: ExtractionSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(std::time::Duration::from_secs(settings.http_timeout_seconds))
            .build()
            .map_err(|e| SvaraError::Extraction(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, settings })
    }

    /// Extract ordered segments from a source.
    #[instrument(skip(self, kind), fields(source = %kind.label()))]
    pub async fn extract(&self, kind: &SourceKind) -> Result<Vec<Segment>> {
        info!("Extracting content from {}", kind.label());

        let segments = match kind {
            SourceKind::Web(url) => web::extract_web(&self.http, url).await?,
            SourceKind::Video(input) => {
                video::extract_video(&self.http, &self.settings, input).await?
            }
            SourceKind::Pdf { name, bytes } => document::extract_pdf(name, bytes)?,
            SourceKind::Docx { name, bytes } => document::extract_docx(name, bytes)?,
        };

        if segments.iter().all(|s| s.text.trim().is_empty()) {
            return Err(SvaraError::Extraction(format!(
                "Source {} produced no readable text",
                kind.label()
            )));
        }

        info!("Extracted {} segments", segments.len());
        Ok(segments)
    }
}
