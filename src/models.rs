//! Core data models for the memory store.
//!
//! A [`Document`] is the unit of retrieval visible to callers; its text lives
//! in the vector index as one or more chunks carrying [`ChunkAttrs`]. The
//! registry owns all document-level state, the index owns only chunk-level
//! state.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of characters retained in a document preview.
pub const PREVIEW_CHARS: usize = 200;

/// Distinguishes short atomic notes from long-form chunked sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Memory,
    Document,
}

/// Registry entry for one stored document.
///
/// Immutable after creation except for registry-level bookkeeping;
/// `updated_at` changes only on content mutation, which is modeled as
/// delete-and-reingest rather than in-place edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: DocumentKind,
    pub preview: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub chunk_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Any-intersection tag match. An empty filter matches everything.
    pub fn matches_tags(&self, filter: &[String]) -> bool {
        filter.is_empty() || self.tags.iter().any(|t| filter.contains(t))
    }
}

/// Chunk-level attributes stored alongside each vector in the index.
///
/// `chunk_index` values for a document form the contiguous set
/// `{0 .. total_chunks - 1}`; `total_chunks` equals the owning document's
/// `chunk_count`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkAttrs {
    pub document_id: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub content: String,
}

/// Tag input accepted by the tool surface: a single delimited string or an
/// explicit list. Both normalize to the same sorted set.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TagSpec {
    One(String),
    Many(Vec<String>),
}

impl TagSpec {
    pub fn normalize(self) -> Vec<String> {
        match self {
            TagSpec::One(s) => normalize_tags([s]),
            TagSpec::Many(v) => normalize_tags(v),
        }
    }
}

/// Split raw tag entries on commas and whitespace, drop empties, and return
/// a sorted, deduplicated list.
pub fn normalize_tags<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut set = BTreeSet::new();
    for entry in raw {
        for tag in entry
            .as_ref()
            .split(|c: char| c == ',' || c.is_whitespace())
        {
            let tag = tag.trim();
            if !tag.is_empty() {
                set.insert(tag.to_string());
            }
        }
    }
    set.into_iter().collect()
}

/// First [`PREVIEW_CHARS`] characters of the full text, with an ellipsis
/// marker when truncated. Derived once at creation, never recomputed.
pub fn make_preview(text: &str) -> String {
    let mut chars = text.chars();
    let preview: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{preview}...")
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_string_and_list_forms_agree() {
        let from_string = TagSpec::One("a,b c".to_string()).normalize();
        let from_list =
            TagSpec::Many(vec!["a".to_string(), "b".to_string(), "c".to_string()]).normalize();
        assert_eq!(from_string, from_list);
        assert_eq!(from_string, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_tags_dedup_and_sort() {
        let tags = normalize_tags(["rust, tooling", "rust", "  ", ""]);
        assert_eq!(tags, vec!["rust", "tooling"]);
    }

    #[test]
    fn test_preview_short_text_verbatim() {
        assert_eq!(make_preview("hello"), "hello");
    }

    #[test]
    fn test_preview_truncates_with_marker() {
        let text = "x".repeat(PREVIEW_CHARS + 50);
        let preview = make_preview(&text);
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), PREVIEW_CHARS + 3);
    }

    #[test]
    fn test_tag_match_any_intersection() {
        let doc = Document {
            id: "d1".to_string(),
            kind: DocumentKind::Memory,
            preview: String::new(),
            tags: vec!["color".to_string(), "sky".to_string()],
            source: None,
            chunk_count: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(doc.matches_tags(&[]));
        assert!(doc.matches_tags(&["color".to_string(), "absent".to_string()]));
        assert!(!doc.matches_tags(&["absent".to_string()]));
    }
}
