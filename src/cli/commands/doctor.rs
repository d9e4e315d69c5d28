//! Doctor command: check system requirements and configuration.

use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;
use std::process::Command;

/// Run the doctor command.
pub fn run_doctor(settings: &Settings) -> Result<()> {
    Output::header("Svara Doctor");

    let mut all_ok = true;

    if crate::openai::is_api_key_configured() {
        Output::success("OPENAI_API_KEY is set");
    } else {
        Output::error("OPENAI_API_KEY is not set (required for asking questions)");
        all_ok = false;
    }

    // yt-dlp is only needed for video sources.
    match Command::new("yt-dlp").arg("--version").output() {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout);
            Output::success(&format!("yt-dlp found ({})", version.trim()));
        }
        _ => {
            Output::warning("yt-dlp not found: video sources will not work");
        }
    }

    Output::header("Configuration");
    Output::kv(
        "Config file",
        &Settings::default_config_path().display().to_string(),
    );
    Output::kv("Generation model", &settings.generation.model);
    Output::kv("Embedding model", &settings.embedding.model);
    Output::kv(
        "Chunking",
        &format!(
            "{} chars, {} overlap",
            settings.indexing.chunk_size, settings.indexing.chunk_overlap
        ),
    );
    Output::kv("Top-k", &settings.retrieval.top_k.to_string());

    if all_ok {
        Output::success("All required checks passed.");
    } else {
        Output::warning("Some checks failed; see above.");
    }

    Ok(())
}
