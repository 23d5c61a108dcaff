//! Recall pipeline: semantic query in, ranked whole-document snippets out.
//!
//! The query (or, with HyDE, a generated hypothetical answer to it) is
//! embedded and matched against the index with a `limit × overfetch`
//! candidate pool. Surviving chunks are grouped per document with max-score
//! aggregation, each group is widened to the matched chunks' immediate
//! neighbors, and the widened run is reassembled into one continuous snippet
//! so callers see surrounding context rather than isolated fragments.
//!
//! Recall never mutates the index or registry, but runs under the exclusive
//! guard so it cannot observe a half-committed ingestion.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use tracing::debug;

use crate::backend::ChatMessage;
use crate::chunk::assemble;
use crate::error::StoreError;
use crate::store::MemoryStore;

const HYDE_SYSTEM_PROMPT: &str = "You write a short hypothetical passage that directly answers \
the user's question, phrased as a factual statement. Respond with the answer text only: no \
explanations, no meta-commentary, no greetings.";

/// One ranked recall result: a whole document represented by its
/// best-matching chunk score and a reassembled snippet around the matches.
#[derive(Debug, Clone, Serialize)]
pub struct RecallHit {
    pub id: String,
    pub content: String,
    pub score: f32,
}

struct DocGroup {
    score: f32,
    matched: BTreeSet<usize>,
    total_chunks: usize,
}

impl MemoryStore {
    /// Retrieve up to `limit` documents relevant to `query`, best first.
    ///
    /// `threshold` drops weak chunk matches before grouping; `tags` keeps
    /// only documents with at least one matching tag; `hyde` embeds a
    /// generated hypothetical answer instead of the literal query, which
    /// helps question-phrased queries match statement-phrased content.
    pub async fn recall(
        &self,
        query: &str,
        limit: usize,
        threshold: f32,
        tags: Vec<String>,
        hyde: bool,
    ) -> Result<Vec<RecallHit>, StoreError> {
        if query.trim().is_empty() {
            return Err(StoreError::input("query must not be empty"));
        }

        // Embedding (and HyDE generation) happen before the guard is taken.
        let query_text = if hyde {
            let hypothetical = self.hypothetical_answer(query).await?;
            debug!(%hypothetical, "hyde expansion");
            hypothetical
        } else {
            query.to_string()
        };

        let vectors = self.backend.embed(&[query_text]).await?;
        let query_vector = vectors
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Backend("empty embedding response".to_string()))?;

        let _permit = self.guard.acquire().await;

        let candidate_k = limit * self.config.retrieval.overfetch_factor;
        let mut candidates = self.index.query(&query_vector, candidate_k).await?;
        candidates.retain(|c| c.score >= threshold);

        if !tags.is_empty() {
            candidates.retain(|c| {
                match self.registry.get(&c.attrs.document_id) {
                    Some(doc) => doc.matches_tags(&tags),
                    // Orphaned chunk: its document is gone from the
                    // registry. Dropped silently.
                    None => false,
                }
            });
        }

        // Group by document; the best-matching fragment determines the
        // document's relevance.
        let mut groups: HashMap<String, DocGroup> = HashMap::new();
        for c in &candidates {
            let group = groups
                .entry(c.attrs.document_id.clone())
                .or_insert_with(|| DocGroup {
                    score: c.score,
                    matched: BTreeSet::new(),
                    total_chunks: c.attrs.total_chunks,
                });
            group.score = group.score.max(c.score);
            group.matched.insert(c.attrs.chunk_index);
        }

        let mut hits = Vec::with_capacity(groups.len());
        for (document_id, group) in groups {
            let content = self.expand_and_assemble(&document_id, &group).await?;
            hits.push(RecallHit {
                id: document_id,
                content,
                score: group.score,
            });
        }

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(limit);

        debug!(hits = hits.len(), "recall completed");

        Ok(hits)
    }

    /// Widen the matched chunk set to immediate neighbors, fetch those
    /// chunks by attribute, and reassemble them into one snippet.
    async fn expand_and_assemble(
        &self,
        document_id: &str,
        group: &DocGroup,
    ) -> Result<String, StoreError> {
        let mut needed: BTreeSet<usize> = BTreeSet::new();
        for &index in &group.matched {
            if index > 0 {
                needed.insert(index - 1);
            }
            needed.insert(index);
            if index + 1 < group.total_chunks {
                needed.insert(index + 1);
            }
        }

        let mut items = self.index.list_by_document(document_id).await?;
        items.retain(|item| needed.contains(&item.attrs.chunk_index));
        items.sort_by_key(|item| item.attrs.chunk_index);

        let contents: Vec<String> = items.into_iter().map(|i| i.attrs.content).collect();

        Ok(assemble(&contents, self.config.chunking.overlap))
    }

    /// Ask the generation backend for a hypothetical direct answer to embed
    /// in place of the query.
    async fn hypothetical_answer(&self, query: &str) -> Result<String, StoreError> {
        let messages = [
            ChatMessage::system(HYDE_SYSTEM_PROMPT),
            ChatMessage::user(query),
        ];

        let answer = self.backend.generate(&messages).await?;

        if answer.is_empty() {
            return Err(StoreError::Backend(
                "generation returned an empty hypothetical answer".to_string(),
            ));
        }

        Ok(answer)
    }
}
