//! Web page extraction.

use super::Segment;
use crate::error::{Result, SvaraError};
use scraper::{Html, Selector};
use tracing::debug;

/// Fetch a web page and extract its readable text as a single segment.
pub async fn extract_web(http: &reqwest::Client, url: &str) -> Result<Vec<Segment>> {
    let parsed = url::Url::parse(url)
        .map_err(|e| SvaraError::InvalidInput(format!("Invalid URL {}: {}", url, e)))?;

    let response = http
        .get(parsed)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| SvaraError::Extraction(format!("Failed to fetch {}: {}", url, e)))?;

    let html = response
        .text()
        .await
        .map_err(|e| SvaraError::Extraction(format!("Failed to read {}: {}", url, e)))?;

    let text = html2text::from_read(html.as_bytes(), 80);
    let source = page_title(&html).unwrap_or_else(|| url.to_string());

    debug!("Extracted {} characters from {}", text.len(), url);

    Ok(vec![Segment::new(text, source)])
}

/// Pull the document title out of the raw HTML, if present.
fn page_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("title").ok()?;

    let title = document
        .select(&selector)
        .next()?
        .text()
        .collect::<String>()
        .trim()
        .to_string();

    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}
