//! Ingestion pipeline: raw text in, searchable document out.
//!
//! `remember` stores a short note as a single chunk, skipping the chunker.
//! `ingest` handles long-form content: chunk, embed all chunks in one
//! batched backend call, then — inside the exclusive guard — insert the
//! chunk batch into the index and persist the document record. Everything
//! that can fail slowly (file reads, embedding) happens before the guard is
//! taken, so the lock is held only for the local writes.
//!
//! Failure before the guarded section commits leaves no trace: chunks and
//! the registry entry appear together or not at all, as far as any other
//! operation can observe.

use std::path::Path;

use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::chunk::chunk;
use crate::error::StoreError;
use crate::index::IndexItem;
use crate::models::{make_preview, ChunkAttrs, Document, DocumentKind};
use crate::store::MemoryStore;

#[derive(Debug, Serialize)]
pub struct RememberOutcome {
    pub document_id: String,
    pub chunk_id: String,
}

#[derive(Debug, Serialize)]
pub struct IngestOutcome {
    pub document_id: String,
    pub chunk_count: usize,
    pub preview: String,
}

impl MemoryStore {
    /// Store a short note as a single-chunk document of kind `memory`.
    pub async fn remember(
        &self,
        content: &str,
        tags: Vec<String>,
    ) -> Result<RememberOutcome, StoreError> {
        if content.trim().is_empty() {
            return Err(StoreError::input("content must not be empty"));
        }

        let vectors = self.backend.embed(&[content.to_string()]).await?;
        let vector = vectors
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Backend("empty embedding response".to_string()))?;

        let _permit = self.guard.acquire().await;

        let document_id = Uuid::new_v4().to_string();
        let chunk_id = Uuid::new_v4().to_string();

        self.index
            .insert_batch(vec![IndexItem {
                id: chunk_id.clone(),
                vector,
                attrs: ChunkAttrs {
                    document_id: document_id.clone(),
                    chunk_index: 0,
                    total_chunks: 1,
                    content: content.to_string(),
                },
            }])
            .await?;

        let now = Utc::now();
        self.registry
            .put(Document {
                id: document_id.clone(),
                kind: DocumentKind::Memory,
                preview: make_preview(content),
                tags,
                source: None,
                chunk_count: 1,
                created_at: now,
                updated_at: now,
            })
            .await?;

        info!(document = %document_id, "memory stored");

        Ok(RememberOutcome {
            document_id,
            chunk_id,
        })
    }

    /// Ingest long-form content, supplied inline or as a file path.
    ///
    /// Exactly one text source must be given; the file path, when used, is
    /// recorded as the document's `source`.
    pub async fn ingest(
        &self,
        content: Option<String>,
        filename: Option<&Path>,
        tags: Vec<String>,
    ) -> Result<IngestOutcome, StoreError> {
        let (text, source) = match (content, filename) {
            (Some(text), None) => (text, None),
            (None, Some(path)) => {
                let text = tokio::fs::read_to_string(path).await.map_err(|e| {
                    StoreError::input(format!("failed to read {}: {e}", path.display()))
                })?;
                (text, Some(path.display().to_string()))
            }
            _ => {
                return Err(StoreError::input(
                    "provide exactly one of content or filename",
                ));
            }
        };

        if text.trim().is_empty() {
            return Err(StoreError::input("content must not be empty"));
        }

        let chunks = chunk(
            &text,
            self.config.chunking.size,
            self.config.chunking.overlap,
        );
        let vectors = self.backend.embed(&chunks).await?;

        if vectors.len() != chunks.len() {
            return Err(StoreError::Backend(format!(
                "embedding count mismatch: {} chunks, {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }

        let _permit = self.guard.acquire().await;

        let document_id = Uuid::new_v4().to_string();
        let total_chunks = chunks.len();

        let items: Vec<IndexItem> = chunks
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(chunk_index, (chunk_text, vector))| IndexItem {
                id: Uuid::new_v4().to_string(),
                vector,
                attrs: ChunkAttrs {
                    document_id: document_id.clone(),
                    chunk_index,
                    total_chunks,
                    content: chunk_text,
                },
            })
            .collect();

        self.index.insert_batch(items).await?;

        let now = Utc::now();
        let preview = make_preview(&text);
        self.registry
            .put(Document {
                id: document_id.clone(),
                kind: DocumentKind::Document,
                preview: preview.clone(),
                tags,
                source,
                chunk_count: total_chunks,
                created_at: now,
                updated_at: now,
            })
            .await?;

        info!(document = %document_id, chunks = total_chunks, "document ingested");

        Ok(IngestOutcome {
            document_id,
            chunk_count: total_chunks,
            preview,
        })
    }
}
