//! Sliding-window character chunking.
//!
//! Segments are split independently: the overlap window never crosses a
//! segment boundary, and an all-whitespace segment yields no chunks.

use super::Chunk;
use crate::config::IndexingSettings;
use crate::extract::Segment;

/// Split segments into overlapping chunks, preserving per-segment origin
/// metadata and a global chunk order.
pub fn split_segments(segments: &[Segment], settings: &IndexingSettings) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut order = 0i32;

    for (segment_index, segment) in segments.iter().enumerate() {
        if segment.text.trim().is_empty() {
            continue;
        }

        for window in split_text(&segment.text, settings.chunk_size, settings.chunk_overlap) {
            chunks.push(Chunk::new(
                window,
                segment.source.clone(),
                segment.page,
                segment_index,
                order,
            ));
            order += 1;
        }
    }

    chunks
}

/// Split text into windows of `size` characters overlapping by `overlap`
/// characters. Counts are in characters, not bytes, so multi-byte text is
/// never split mid-codepoint.
pub fn split_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    if text.is_empty() || size == 0 {
        return Vec::new();
    }

    // An overlap as large as the window would never advance.
    let step = size.saturating_sub(overlap).max(1);

    let offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    let char_count = offsets.len();

    let mut windows = Vec::new();
    let mut start = 0;

    loop {
        let end = (start + size).min(char_count);
        let byte_start = offsets[start];
        let byte_end = if end == char_count {
            text.len()
        } else {
            offsets[end]
        };

        windows.push(text[byte_start..byte_end].to_string());

        if end == char_count {
            break;
        }
        start += step;
    }

    windows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(size: usize, overlap: usize) -> IndexingSettings {
        IndexingSettings {
            chunk_size: size,
            chunk_overlap: overlap,
        }
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let windows = split_text("hello world", 1000, 200);
        assert_eq!(windows, vec!["hello world".to_string()]);
    }

    #[test]
    fn overlap_removal_reconstructs_original() {
        let text: String = (0..5000).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let windows = split_text(&text, 1000, 200);

        let mut reconstructed = windows[0].clone();
        for window in &windows[1..] {
            reconstructed.extend(window.chars().skip(200));
        }
        assert_eq!(reconstructed, text);
    }

    #[test]
    fn no_window_is_empty_or_oversized() {
        let text = "x".repeat(3456);
        for window in split_text(&text, 1000, 200) {
            let len = window.chars().count();
            assert!(len > 0);
            assert!(len <= 1000);
        }
    }

    #[test]
    fn window_count_matches_estimate() {
        let len = 10_000;
        let text = "y".repeat(len);
        let windows = split_text(&text, 1000, 200);

        // ceil((L - overlap) / (size - overlap))
        let expected = (len - 200).div_ceil(800);
        assert_eq!(windows.len(), expected);
    }

    #[test]
    fn multibyte_text_splits_on_char_boundaries() {
        let text = "é".repeat(2500);
        let windows = split_text(&text, 1000, 200);
        assert!(windows.len() > 1);
        assert_eq!(windows[0].chars().count(), 1000);

        let mut reconstructed = windows[0].clone();
        for window in &windows[1..] {
            reconstructed.extend(window.chars().skip(200));
        }
        assert_eq!(reconstructed, text);
    }

    #[test]
    fn pathological_overlap_still_advances() {
        let text = "z".repeat(50);
        let windows = split_text(&text, 10, 10);
        assert!(windows.len() <= 50);
        assert!(!windows.is_empty());
    }

    #[test]
    fn whitespace_segments_yield_no_chunks() {
        let segments = vec![
            Segment::new("   \n\t  ", "blank"),
            Segment::new("real content", "doc"),
        ];
        let chunks = split_segments(&segments, &settings(1000, 200));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "real content");
        assert_eq!(chunks[0].segment_index, 1);
    }

    #[test]
    fn overlap_never_crosses_segment_boundaries() {
        let segments = vec![
            Segment::new("a".repeat(1500), "doc").with_page(1),
            Segment::new("b".repeat(100), "doc").with_page(2),
        ];
        let chunks = split_segments(&segments, &settings(1000, 200));

        // Second segment's chunk starts fresh, no carried-over 'a' text.
        let page_two: Vec<_> = chunks.iter().filter(|c| c.page == Some(2)).collect();
        assert_eq!(page_two.len(), 1);
        assert!(page_two[0].text.chars().all(|c| c == 'b'));
    }

    #[test]
    fn chunk_order_is_global_and_sequential() {
        let segments = vec![
            Segment::new("a".repeat(2000), "doc"),
            Segment::new("b".repeat(2000), "doc"),
        ];
        let chunks = split_segments(&segments, &settings(1000, 200));
        let orders: Vec<i32> = chunks.iter().map(|c| c.order).collect();
        assert_eq!(orders, (0..chunks.len() as i32).collect::<Vec<_>>());
    }
}
