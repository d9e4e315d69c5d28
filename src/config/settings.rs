//! Configuration settings for Svara.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub extraction: ExtractionSettings,
    pub embedding: EmbeddingSettings,
    pub indexing: IndexingSettings,
    pub retrieval: RetrievalSettings,
    pub generation: GenerationSettings,
    pub suggestions: SuggestionSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Directory for temporary files.
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.svara".to_string(),
            temp_dir: "/tmp/svara".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Source extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSettings {
    /// User agent sent with web page fetches.
    pub user_agent: String,
    /// HTTP request timeout in seconds.
    pub http_timeout_seconds: u64,
    /// Preferred caption languages, in order, for video transcripts.
    pub caption_languages: Vec<String>,
    /// Speech-to-text model for the audio transcription fallback.
    pub transcription_model: String,
    /// Maximum video duration to transcribe (in seconds).
    pub max_transcribe_seconds: u32,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            user_agent: format!("svara/{}", env!("CARGO_PKG_VERSION")),
            http_timeout_seconds: 30,
            caption_languages: vec!["en".to_string()],
            transcription_model: "whisper-1".to_string(),
            max_transcribe_seconds: 7200, // 2 hours
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding provider (openai).
    pub provider: String,
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
        }
    }
}

/// Chunking and index construction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexingSettings {
    /// Target chunk length in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters.
    pub chunk_overlap: usize,
}

impl Default for IndexingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Number of chunks fetched per query.
    pub top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 4 }
    }
}

/// Answer generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// LLM model for answers and query reformulation.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
        }
    }
}

/// Suggested-question generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionSettings {
    /// Enable suggested questions after ingesting a source.
    pub enabled: bool,
    /// Number of questions to request.
    pub max_questions: usize,
    /// Number of leading segments sampled for the prompt.
    pub segment_sample: usize,
    /// Cap on sampled text length in characters.
    pub max_source_chars: usize,
}

impl Default for SuggestionSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_questions: 3,
            segment_sample: 3,
            max_source_chars: 4000,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::SvaraError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("svara")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_pipeline_constants() {
        let settings = Settings::default();
        assert_eq!(settings.indexing.chunk_size, 1000);
        assert_eq!(settings.indexing.chunk_overlap, 200);
        assert_eq!(settings.retrieval.top_k, 4);
        assert_eq!(settings.embedding.dimensions, 1536);
    }

    #[test]
    fn roundtrip_through_toml() {
        let settings = Settings::default();
        let serialized = toml::to_string(&settings).unwrap();
        let parsed: Settings = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.generation.model, settings.generation.model);
        assert_eq!(parsed.indexing.chunk_size, settings.indexing.chunk_size);
    }

    #[test]
    fn partial_config_uses_defaults() {
        let parsed: Settings = toml::from_str("[retrieval]\ntop_k = 8\n").unwrap();
        assert_eq!(parsed.retrieval.top_k, 8);
        assert_eq!(parsed.indexing.chunk_size, 1000);
    }
}
