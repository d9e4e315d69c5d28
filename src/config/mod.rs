//! Configuration management for Svara.

mod prompts;
mod settings;

pub use prompts::{
    AnswerPrompts, ContextualizePrompts, EvalPrompts, Prompts, SuggestionPrompts, CONTEXT_MARKER,
    GENERAL_MARKER, UNKNOWN_ANSWER,
};
pub use settings::{
    EmbeddingSettings, ExtractionSettings, GeneralSettings, GenerationSettings, IndexingSettings,
    PromptSettings, RetrievalSettings, Settings, SuggestionSettings,
};
