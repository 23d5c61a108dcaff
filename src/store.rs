//! The memory store owner object.
//!
//! [`MemoryStore`] owns the document registry, the vector index, the text
//! backend, and the exclusive guard that serializes every operation touching
//! the registry + index pair. It is created once at process start and passed
//! explicitly to the CLI and server layers; there is no ambient global state.
//!
//! The ingestion and recall pipelines live in their own modules
//! ([`crate::ingest`], [`crate::recall`], [`crate::transfer`]) as further
//! `impl MemoryStore` blocks.

use serde::Serialize;
use tracing::{debug, info};

use crate::backend::TextBackend;
use crate::config::Config;
use crate::error::StoreError;
use crate::guard::ExclusiveGuard;
use crate::index::{LocalIndex, VectorIndex};
use crate::models::Document;
use crate::registry::DocumentRegistry;

pub struct MemoryStore {
    pub(crate) config: Config,
    pub(crate) registry: DocumentRegistry,
    pub(crate) index: Box<dyn VectorIndex>,
    pub(crate) backend: Box<dyn TextBackend>,
    pub(crate) guard: ExclusiveGuard,
}

/// One page of registry entries plus pagination bookkeeping.
#[derive(Debug, Serialize)]
pub struct ListPage {
    pub entries: Vec<Document>,
    pub count: usize,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}

/// Result of a batch delete. Missing ids are reported, not fatal.
#[derive(Debug, Serialize)]
pub struct ForgetOutcome {
    pub deleted: Vec<String>,
    pub not_found: Vec<String>,
    pub chunks_removed: usize,
}

impl MemoryStore {
    /// Open the store rooted at `config.store.data_dir`, creating the
    /// directory, index file, and registry snapshot on first run.
    pub async fn open(
        config: Config,
        backend: Box<dyn TextBackend>,
    ) -> Result<Self, StoreError> {
        tokio::fs::create_dir_all(&config.store.data_dir)
            .await
            .map_err(StoreError::persistence)?;

        let index = LocalIndex::open(&config.store.data_dir).await?;
        let registry =
            DocumentRegistry::load(config.store.data_dir.join("registry.json")).await?;

        info!(
            data_dir = %config.store.data_dir.display(),
            documents = registry.len(),
            "memory store opened"
        );

        Ok(Self {
            config,
            registry,
            index: Box::new(index),
            backend,
            guard: ExclusiveGuard::new(),
        })
    }

    /// List stored documents, newest first, optionally filtered by tags.
    ///
    /// Read-only, but still serialized behind the guard so a page never
    /// reflects a half-committed ingestion.
    pub async fn list(
        &self,
        tags: Vec<String>,
        offset: usize,
        limit: usize,
    ) -> Result<ListPage, StoreError> {
        let _permit = self.guard.acquire().await;

        let (entries, total) = self.registry.list(&tags, offset, limit);

        Ok(ListPage {
            count: entries.len(),
            entries,
            total,
            offset,
            limit,
        })
    }

    /// Delete documents and cascade to their chunks.
    ///
    /// Idempotent per id: unknown ids are reported in `not_found` and the
    /// batch continues. The registry snapshot is rewritten once, and only if
    /// something was actually deleted.
    pub async fn forget(&self, ids: &[String]) -> Result<ForgetOutcome, StoreError> {
        let _permit = self.guard.acquire().await;

        let mut deleted = Vec::new();
        let mut not_found = Vec::new();
        let mut chunks_removed = 0usize;

        for id in ids {
            if self.registry.get(id).is_none() {
                not_found.push(id.clone());
                continue;
            }

            let chunk_ids: Vec<String> = self
                .index
                .list_by_document(id)
                .await?
                .into_iter()
                .map(|item| item.id)
                .collect();

            chunks_removed += self.index.delete_batch(&chunk_ids).await?;
            self.registry.remove(id);
            deleted.push(id.clone());
        }

        if !deleted.is_empty() {
            self.registry.persist().await?;
        }

        debug!(
            deleted = deleted.len(),
            not_found = not_found.len(),
            chunks_removed,
            "forget completed"
        );

        Ok(ForgetOutcome {
            deleted,
            not_found,
            chunks_removed,
        })
    }
}
