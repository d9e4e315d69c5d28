//! Svara - Conversational QA over your sources
//!
//! A CLI tool for asking questions about web pages, videos, and documents.
//!
//! The name "Svara" comes from the Scandinavian word for "answer."
//!
//! # Overview
//!
//! Svara allows you to:
//! - Ingest a web page, a YouTube video, or a PDF/DOCX document
//! - Ask questions and get streamed, grounded answers with citations
//! - Hold a conversation where follow-up questions resolve against history
//! - Evaluate answer quality against a reference dataset
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration and prompt management
//! - `extract` - Source extraction (web, video, documents)
//! - `index` - Chunking and the in-memory vector index
//! - `embedding` - Embedding generation
//! - `llm` - Chat model abstraction
//! - `rag` - History-aware retrieval and streamed answer generation
//! - `session` - Per-session coordination of index, history, suggestions
//! - `eval` - Offline evaluation harness
//!
//! # Example
//!
//! ```rust,no_run
//! use svara::config::Settings;
//! use svara::extract::SourceKind;
//! use svara::session::Session;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let mut session = Session::new(&settings)?;
//!
//!     let source = SourceKind::from_input("https://example.com/article")?;
//!     let report = session.ingest(&source).await?;
//!     println!("Indexed {} chunks", report.chunks);
//!
//!     let outcome = session
//!         .ask("What is this article about?", |delta| print!("{}", delta))
//!         .await?;
//!     println!("\n{} citations", outcome.citations.len());
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod eval;
pub mod extract;
pub mod index;
pub mod llm;
pub mod openai;
pub mod rag;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Result, SvaraError};
