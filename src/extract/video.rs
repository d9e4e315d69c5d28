//! Video extraction: existing captions first, audio transcription as fallback.
//!
//! Metadata and audio come from yt-dlp. When the video carries a caption
//! track we fetch and parse it directly; only a video with no track at all
//! falls back to downloading the audio and transcribing it.

use super::Segment;
use crate::config::ExtractionSettings;
use crate::error::{Result, SvaraError};
use crate::openai::create_client;
use async_openai::types::{AudioInput, CreateTranscriptionRequestArgs};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use tokio::process::Command;
use tracing::{debug, info, warn};

fn video_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Matches various YouTube URL formats and bare video IDs
        Regex::new(
            r"(?x)
            (?:
                (?:https?://)?
                (?:www\.)?
                (?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/v/)
                ([a-zA-Z0-9_-]{11})
            )
            |
            ^([a-zA-Z0-9_-]{11})$
        ",
        )
        .expect("Invalid regex")
    })
}

/// Extract the video ID from a URL or bare ID.
pub fn extract_video_id(input: &str) -> Option<String> {
    let caps = video_id_regex().captures(input.trim())?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// Whether the input looks like a video URL we can handle.
pub fn is_video_url(input: &str) -> bool {
    (input.contains("youtube.com") || input.contains("youtu.be")) && extract_video_id(input).is_some()
}

/// A caption track advertised in the video metadata.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CaptionTrack {
    pub url: String,
    pub language: String,
    pub auto_generated: bool,
}

/// Extract a video into a single transcript segment.
pub async fn extract_video(
    http: &reqwest::Client,
    settings: &ExtractionSettings,
    input: &str,
) -> Result<Vec<Segment>> {
    let video_id = extract_video_id(input).ok_or_else(|| {
        SvaraError::InvalidInput(format!("Invalid video URL or ID: {}", input))
    })?;
    let url = format!("https://www.youtube.com/watch?v={}", video_id);

    let metadata = fetch_metadata(&url, &video_id).await?;
    let title = metadata["title"]
        .as_str()
        .unwrap_or(&video_id)
        .to_string();

    if let Some(track) = select_caption_track(&metadata, &settings.caption_languages) {
        info!(
            "Using existing {} caption track ({})",
            track.language,
            if track.auto_generated { "auto" } else { "manual" }
        );

        // A fetch error on an existing track is terminal; only the absence
        // of any track triggers the transcription fallback.
        let body = http
            .get(&track.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| SvaraError::Extraction(format!("Failed to fetch caption track: {}", e)))?
            .text()
            .await
            .map_err(|e| SvaraError::Extraction(format!("Failed to read caption track: {}", e)))?;

        let transcript = parse_json3_captions(&body)?;
        return Ok(vec![Segment::new(transcript, title)]);
    }

    warn!("No caption track for {}, falling back to audio transcription", video_id);

    if let Some(duration) = metadata["duration"].as_f64() {
        if duration as u32 > settings.max_transcribe_seconds {
            return Err(SvaraError::TranscriptFallback(format!(
                "Video duration ({:.0}s) exceeds the transcription limit ({}s)",
                duration, settings.max_transcribe_seconds
            )));
        }
    }

    let transcript = transcribe_audio(&url, &video_id, settings)
        .await
        .map_err(|e| SvaraError::TranscriptFallback(e.to_string()))?;

    Ok(vec![Segment::new(transcript, title)])
}

/// Fetch video metadata as JSON using yt-dlp.
async fn fetch_metadata(url: &str, video_id: &str) -> Result<serde_json::Value> {
    let output = Command::new("yt-dlp")
        .args(["--dump-json", "--no-download", "--no-warnings", url])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SvaraError::ToolNotFound("yt-dlp".to_string())
            } else {
                SvaraError::Extraction(format!("Failed to run yt-dlp: {}", e))
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SvaraError::Extraction(format!(
            "Video {} not found or unavailable: {}",
            video_id, stderr
        )));
    }

    let json_str = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&json_str)
        .map_err(|e| SvaraError::Extraction(format!("Failed to parse yt-dlp output: {}", e)))
}

/// Pick the best caption track: manual subtitles over auto-captions, the
/// first configured language that exists, json3 format preferred.
pub(crate) fn select_caption_track(
    metadata: &serde_json::Value,
    languages: &[String],
) -> Option<CaptionTrack> {
    for (field, auto_generated) in [("subtitles", false), ("automatic_captions", true)] {
        let tracks = match metadata[field].as_object() {
            Some(t) if !t.is_empty() => t,
            _ => continue,
        };

        for language in languages {
            if let Some(entries) = tracks.get(language).and_then(|v| v.as_array()) {
                let entry = match entries
                    .iter()
                    .find(|e| e["ext"].as_str() == Some("json3"))
                    .or_else(|| entries.first())
                {
                    Some(entry) => entry,
                    None => continue,
                };

                if let Some(url) = entry["url"].as_str() {
                    return Some(CaptionTrack {
                        url: url.to_string(),
                        language: language.clone(),
                        auto_generated,
                    });
                }
            }
        }
    }

    None
}

/// Join the text runs of a json3 caption document into one transcript.
fn parse_json3_captions(body: &str) -> Result<String> {
    let parsed: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| SvaraError::Extraction(format!("Invalid caption data: {}", e)))?;

    let events = parsed["events"]
        .as_array()
        .ok_or_else(|| SvaraError::Extraction("Caption data has no events".to_string()))?;

    let mut transcript = String::new();
    for event in events {
        if let Some(segs) = event["segs"].as_array() {
            for seg in segs {
                if let Some(text) = seg["utf8"].as_str() {
                    transcript.push_str(text);
                }
            }
        }
    }

    let transcript = transcript.split_whitespace().collect::<Vec<_>>().join(" ");

    if transcript.is_empty() {
        return Err(SvaraError::Extraction(
            "Caption track contained no text".to_string(),
        ));
    }

    Ok(transcript)
}

/// Download the audio track and transcribe it with the speech-to-text model.
///
/// All intermediate audio lives in a scoped temp directory so cleanup is
/// guaranteed whether transcription succeeds or fails.
async fn transcribe_audio(
    url: &str,
    video_id: &str,
    settings: &ExtractionSettings,
) -> Result<String> {
    let temp_dir = tempfile::tempdir()?;

    let audio_path = download_audio(url, video_id, temp_dir.path()).await?;

    info!("Transcribing downloaded audio with {}", settings.transcription_model);
    let file_bytes = tokio::fs::read(&audio_path).await?;

    let request = CreateTranscriptionRequestArgs::default()
        .file(AudioInput::from_vec_u8(
            format!("{}.mp3", video_id),
            file_bytes,
        ))
        .model(&settings.transcription_model)
        .build()
        .map_err(|e| SvaraError::Extraction(format!("Failed to build request: {}", e)))?;

    let result = create_client()
        .audio()
        .transcribe(request)
        .await
        .map_err(|e| SvaraError::OpenAI(format!("Transcription API error: {}", e)));

    // Never let a cleanup failure mask the transcription outcome.
    if let Err(e) = temp_dir.close() {
        warn!("Failed to clean up audio temp dir: {}", e);
    }

    let text = result?.text.trim().to_string();
    debug!("Transcription produced {} characters", text.len());
    Ok(text)
}

/// Download audio as MP3 via yt-dlp into the given directory.
async fn download_audio(url: &str, video_id: &str, output_dir: &Path) -> Result<PathBuf> {
    info!("Downloading audio from {}", url);

    let template = output_dir.join(format!("{}.%(ext)s", video_id));

    let result = Command::new("yt-dlp")
        .arg("--extract-audio")
        .arg("--audio-format")
        .arg("mp3")
        .arg("--audio-quality")
        .arg("0")
        .arg("--output")
        .arg(template.to_str().unwrap_or_default())
        .arg("--no-playlist")
        .arg("--quiet")
        .arg("--no-warnings")
        .arg(url)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SvaraError::ToolNotFound("yt-dlp".into()));
        }
        Err(e) => {
            return Err(SvaraError::Extraction(format!("yt-dlp execution failed: {e}")));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SvaraError::Extraction(format!("yt-dlp failed: {stderr}")));
    }

    let target = output_dir.join(format!("{}.mp3", video_id));
    if target.exists() {
        return Ok(target);
    }

    // yt-dlp occasionally keeps the original container extension
    let entries = std::fs::read_dir(output_dir)?;
    for entry in entries.flatten() {
        if entry.file_name().to_string_lossy().starts_with(video_id) {
            return Ok(entry.path());
        }
    }

    Err(SvaraError::Extraction(
        "Audio file not found after download".into(),
    ))
}
