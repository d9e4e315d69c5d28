//! CLI module for Svara.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Svara - Conversational QA over your sources
///
/// Ask questions about web pages, videos, and documents.
/// The name "Svara" comes from the Scandinavian word for "answer."
#[derive(Parser, Debug)]
#[command(name = "svara")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a single question about a source
    Ask {
        /// The question to ask
        question: String,

        /// Source to ingest: URL (web page or video) or path to a .pdf/.docx file
        #[arg(short, long)]
        source: String,

        /// LLM model to use for answer generation
        #[arg(short, long)]
        model: Option<String>,

        /// Number of context chunks to retrieve
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Start an interactive chat session over a source
    Chat {
        /// Source to ingest on startup (can also use `open <source>` inside the chat)
        #[arg(short, long)]
        source: Option<String>,

        /// LLM model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Evaluate answer quality against a reference dataset
    Eval {
        /// Source to ingest for the evaluation
        #[arg(short, long)]
        source: String,

        /// JSON dataset of {question, ground_truth} pairs
        /// (defaults to the built-in Paul Graham essay set)
        #[arg(short, long)]
        dataset: Option<String>,

        /// LLM model to use for answering and judging
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Check system requirements and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}
