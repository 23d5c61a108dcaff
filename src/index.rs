//! Vector index collaborator.
//!
//! The pipelines consume the index through the [`VectorIndex`] trait:
//! batched insert and delete, nearest-neighbor query, and exact-match fetch
//! of all chunks belonging to one document (the attribute lookup that
//! neighbor expansion and cascade deletion rely on).
//!
//! [`LocalIndex`] is the bundled implementation: a single JSON file under the
//! data directory, loaded at open and rewritten wholesale on mutation, with
//! brute-force cosine similarity over all stored vectors. Good enough for a
//! personal memory store; a real ANN backend can replace it behind the same
//! trait.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::models::ChunkAttrs;

/// One embedded chunk as stored in the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexItem {
    pub id: String,
    pub vector: Vec<f32>,
    pub attrs: ChunkAttrs,
}

/// A nearest-neighbor hit. Higher score means more similar.
#[derive(Debug, Clone)]
pub struct ScoredItem {
    pub id: String,
    pub attrs: ChunkAttrs,
    pub score: f32,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert a batch of items as one durable write.
    async fn insert_batch(&self, items: Vec<IndexItem>) -> Result<(), StoreError>;

    /// Delete the given ids as one durable write. Unknown ids are ignored;
    /// returns the number actually removed.
    async fn delete_batch(&self, ids: &[String]) -> Result<usize, StoreError>;

    /// The `k` nearest items to `vector` by similarity, best first.
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredItem>, StoreError>;

    /// All items whose `document_id` attribute matches, in insertion order.
    async fn list_by_document(&self, document_id: &str) -> Result<Vec<IndexItem>, StoreError>;
}

/// File-backed brute-force index.
pub struct LocalIndex {
    path: PathBuf,
    items: RwLock<Vec<IndexItem>>,
}

impl LocalIndex {
    /// Open (or create) the index file inside `dir`.
    pub async fn open(dir: &Path) -> Result<Self, StoreError> {
        let path = dir.join("index.json");

        let items = match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                serde_json::from_str(&content).map_err(StoreError::persistence)?
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(StoreError::persistence(err)),
        };

        Ok(Self {
            path,
            items: RwLock::new(items),
        })
    }

    async fn persist(&self) -> Result<(), StoreError> {
        let json = {
            let items = self.items.read().unwrap();
            serde_json::to_string(&*items).map_err(StoreError::persistence)?
        };

        tokio::fs::write(&self.path, json)
            .await
            .map_err(StoreError::persistence)
    }
}

#[async_trait]
impl VectorIndex for LocalIndex {
    async fn insert_batch(&self, new_items: Vec<IndexItem>) -> Result<(), StoreError> {
        self.items.write().unwrap().extend(new_items);
        self.persist().await
    }

    async fn delete_batch(&self, ids: &[String]) -> Result<usize, StoreError> {
        let removed = {
            let mut items = self.items.write().unwrap();
            let before = items.len();
            items.retain(|item| !ids.contains(&item.id));
            before - items.len()
        };

        if removed > 0 {
            self.persist().await?;
        }

        Ok(removed)
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredItem>, StoreError> {
        let mut scored: Vec<ScoredItem> = {
            let items = self.items.read().unwrap();
            items
                .iter()
                .map(|item| ScoredItem {
                    id: item.id.clone(),
                    attrs: item.attrs.clone(),
                    score: cosine_similarity(vector, &item.vector),
                })
                .collect()
        };

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        scored.truncate(k);

        Ok(scored)
    }

    async fn list_by_document(&self, document_id: &str) -> Result<Vec<IndexItem>, StoreError> {
        let items = self.items.read().unwrap();
        Ok(items
            .iter()
            .filter(|item| item.attrs.document_id == document_id)
            .cloned()
            .collect())
    }
}

/// Cosine similarity between two vectors, in `[-1.0, 1.0]`.
///
/// Returns `0.0` for empty vectors or vectors of different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
