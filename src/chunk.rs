//! Overlap-aware text chunker and chunk reassembly.
//!
//! Long text is split along natural boundaries (paragraph breaks, sentence
//! ends, line breaks) into chunks of at most `size` characters, each seeded
//! with a segment-aligned tail of its predecessor so neighboring chunks share
//! up to `overlap` characters of context. Text with no natural boundaries
//! falls back to fixed-stride slicing.
//!
//! [`assemble`] is the display-time counterpart: it concatenates a sorted run
//! of chunks while stripping the duplicated boundary text, reconstructing a
//! continuous snippet from whichever subset of a document's chunks recall
//! selected.

/// Shortest suffix/prefix match [`assemble`] will treat as chunk overlap.
/// Anything shorter is assumed to be coincidence and left duplicated.
const MIN_OVERLAP_MATCH: usize = 10;

/// Split `text` into an ordered sequence of chunks of at most `size`
/// characters, overlapping by roughly `overlap` characters.
///
/// Pure and deterministic: identical input and parameters always produce an
/// identical sequence. Assumes `overlap < size`; config validation enforces
/// that before any pipeline runs.
pub fn chunk(text: &str, size: usize, overlap: usize) -> Vec<String> {
    if char_len(text) <= size {
        return vec![text.to_string()];
    }

    let segments = split_segments(text);

    if segments.len() <= 1 {
        return force_split(text, size, overlap);
    }

    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0usize;

    for seg in segments {
        let seg_len = char_len(seg);

        if current_len + seg_len > size && !current.is_empty() {
            chunks.push(current.concat().trim().to_string());

            // Retain trailing segments as the next chunk's overlap seed,
            // segment-aligned rather than cut mid-segment.
            let mut overlap_len = 0usize;
            let mut keep = 0usize;
            for s in current.iter().rev() {
                let len = char_len(s);
                if overlap_len + len > overlap {
                    break;
                }
                overlap_len += len;
                keep += 1;
            }

            if keep > 0 {
                current.drain(..current.len() - keep);
            } else {
                current.clear();
            }
            current_len = overlap_len;
        }

        current.push(seg);
        current_len += seg_len;
    }

    if !current.is_empty() {
        let last = current.concat().trim().to_string();
        if !last.is_empty() {
            chunks.push(last);
        }
    }

    chunks
}

/// Reconstruct continuous text from an index-sorted run of chunks.
///
/// Each subsequent chunk is appended after stripping the longest prefix that
/// matches a suffix of the accumulated result, searched from
/// `2 × overlap` characters down to [`MIN_OVERLAP_MATCH`]. Heuristic only:
/// naturally repeating text at a boundary can over- or under-strip, which is
/// acceptable for display and ranking.
pub fn assemble(chunks: &[String], overlap: usize) -> String {
    let mut out = match chunks.first() {
        Some(first) => first.clone(),
        None => return String::new(),
    };

    for next in &chunks[1..] {
        let shared = shared_boundary_chars(&out, next, overlap * 2);
        out.push_str(skip_chars(next, shared));
    }

    out
}

/// Number of characters, as opposed to bytes, in `s`.
fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Slice off the first `n` characters of `s`.
fn skip_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[idx..],
        None => "",
    }
}

/// Longest `n` in `[MIN_OVERLAP_MATCH, max_chars]` such that the last `n`
/// characters of `result` equal the first `n` characters of `next`, or 0.
fn shared_boundary_chars(result: &str, next: &str, max_chars: usize) -> usize {
    if max_chars < MIN_OVERLAP_MATCH {
        return 0;
    }

    // Reversed tail of the running result; tail[k] is the k-th char from
    // the end.
    let tail: Vec<char> = result.chars().rev().take(max_chars).collect();
    let head: Vec<char> = next.chars().take(max_chars).collect();
    let upper = tail.len().min(head.len());

    for n in (MIN_OVERLAP_MATCH..=upper).rev() {
        if (0..n).all(|k| tail[n - 1 - k] == head[k]) {
            return n;
        }
    }

    0
}

/// Split text into natural segments, each ending after a paragraph break,
/// a sentence-ending punctuation mark plus whitespace, or a line break.
fn split_segments(text: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0usize;
    let mut prev: Option<char> = None;

    for (i, c) in text.char_indices() {
        let end = i + c.len_utf8();
        let after_sentence =
            c.is_whitespace() && matches!(prev, Some('.') | Some('!') | Some('?'));

        if c == '\n' || after_sentence {
            if end > start {
                segments.push(&text[start..end]);
            }
            start = end;
        }

        prev = Some(c);
    }

    if start < text.len() {
        segments.push(&text[start..]);
    }

    segments
}

/// Fixed-stride fallback for text with no natural boundaries: chunks of
/// exactly `size` characters advancing by `size - overlap`, with a trailing
/// partial chunk when a remainder is left.
fn force_split(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let step = size.saturating_sub(overlap).max(1);

    let mut chunks = Vec::new();
    let mut pos = 0usize;

    while pos < chars.len() {
        let end = (pos + size).min(chars.len());
        chunks.push(chars[pos..end].iter().collect());
        pos += step;

        if pos + step > chars.len() && pos < chars.len() {
            let last: String = chars[pos..].iter().collect::<String>().trim().to_string();
            if !last.is_empty() {
                chunks.push(last);
            }
            break;
        }
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Aperiodic boundary-free text: a run of fixed-width counters with no
    /// newlines or sentence punctuation.
    fn counter_text(chars: usize) -> String {
        let mut out = String::new();
        let mut i = 0usize;
        while out.len() < chars {
            out.push_str(&format!("{i:05}"));
            i += 1;
        }
        out.truncate(chars);
        out
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunk("Hello, world!", 1600, 200);
        assert_eq!(chunks, vec!["Hello, world!".to_string()]);
    }

    #[test]
    fn test_deterministic() {
        let text = "Alpha beta. Gamma delta. Epsilon zeta. ".repeat(100);
        let a = chunk(&text, 300, 60);
        let b = chunk(&text, 300, 60);
        assert_eq!(a, b);
    }

    #[test]
    fn test_natural_boundaries_respect_size() {
        let text = "This is a sentence. ".repeat(200);
        let chunks = chunk(&text, 400, 80);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.chars().count() <= 400, "chunk exceeded size: {}", c.len());
            assert!(!c.trim().is_empty());
        }
    }

    #[test]
    fn test_natural_boundary_chunks_share_overlap() {
        let text = "One sentence here. ".repeat(100);
        let chunks = chunk(&text, 200, 60);
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            // The next chunk starts with segments retained from the
            // previous chunk's tail.
            let head: String = pair[1].chars().take(15).collect();
            assert!(
                pair[0].contains(head.trim()),
                "no shared boundary between {:?} and {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_force_split_strides() {
        // 304 = 240 + 64, so every stride-aligned chunk is exactly full and
        // a 16-char remainder is appended as the final partial chunk.
        let text = counter_text(304);
        let chunks = chunk(&text, 64, 16);
        assert_eq!(chunks.len(), 7);
        for c in &chunks[..6] {
            assert_eq!(c.chars().count(), 64);
        }
        assert_eq!(chunks[6].chars().count(), 16);
        for pair in chunks.windows(2) {
            let tail: String = pair[0].chars().skip(48).collect();
            assert!(pair[1].starts_with(&tail) || pair[0].ends_with(pair[1].as_str()));
        }
    }

    #[test]
    fn test_five_thousand_chars_yield_four_chunks() {
        let text = counter_text(5000);
        let chunks = chunk(&text, 1600, 200);
        assert_eq!(chunks.len(), 4);
        for c in &chunks {
            assert!(c.chars().count() <= 1600);
        }
        for pair in chunks.windows(2) {
            let shared = shared_boundary_chars(&pair[0], &pair[1], 400);
            assert!(shared > 0, "adjacent chunks share no boundary text");
        }
    }

    #[test]
    fn test_assemble_inverts_fixed_stride_chunking() {
        let text = counter_text(5000);
        let chunks = chunk(&text, 1600, 200);
        assert_eq!(assemble(&chunks, 200), text);

        let small = counter_text(300);
        let chunks = chunk(&small, 64, 16);
        assert_eq!(assemble(&chunks, 16), small);
    }

    #[test]
    fn test_assemble_empty_and_single() {
        assert_eq!(assemble(&[], 200), "");
        assert_eq!(assemble(&["only chunk".to_string()], 200), "only chunk");
    }

    #[test]
    fn test_assemble_no_overlap_concatenates() {
        let chunks = vec![
            "entirely distinct first part".to_string(),
            "unrelated second part text".to_string(),
        ];
        assert_eq!(
            assemble(&chunks, 20),
            "entirely distinct first partunrelated second part text"
        );
    }

    #[test]
    fn test_assemble_full_overlap_appends_nothing() {
        let chunks = vec![
            "prefix text shared boundary region".to_string(),
            "shared boundary region".to_string(),
        ];
        assert_eq!(assemble(&chunks, 20), "prefix text shared boundary region");
    }

    #[test]
    fn test_assemble_ignores_matches_below_minimum() {
        // 6-char coincidence is below MIN_OVERLAP_MATCH, so it stays
        // duplicated.
        let chunks = vec!["alpha ending".to_string(), "endingbeta".to_string()];
        assert_eq!(assemble(&chunks, 20), "alpha endingendingbeta");
    }

    #[test]
    fn test_segments_cover_text() {
        let text = "First paragraph.\n\nSecond line.\nThird sentence. And a tail";
        let segments = split_segments(text);
        assert_eq!(segments.concat(), text);
        assert!(segments.len() > 3);
    }
}
