//! Bulk transfer of store contents as line-delimited JSON.
//!
//! `download` emits one record per document — its kind, reassembled full
//! content, tags, and optional source — honoring the same tag filter and
//! pagination as `list`. `upload` replays records through `remember` or
//! `ingest` according to their declared type, re-embedding everything; the
//! original document and chunk ids are not restored.
//!
//! Upload is resilient per line: a malformed or invalid line is recorded
//! with its line number and reason, and processing continues.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::chunk::assemble;
use crate::error::StoreError;
use crate::models::{normalize_tags, DocumentKind};
use crate::store::MemoryStore;

/// One JSONL record: `{"type": ..., "content": ..., "tags": [...], "source": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRecord {
    #[serde(rename = "type")]
    pub kind: DocumentKind,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadError {
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct UploadReport {
    pub imported: usize,
    pub failed: usize,
    pub errors: Vec<UploadError>,
}

impl MemoryStore {
    /// Export documents as transfer records, newest first.
    pub async fn download(
        &self,
        tags: Vec<String>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<TransferRecord>, StoreError> {
        let _permit = self.guard.acquire().await;

        let (page, _) = self.registry.list(&tags, offset, limit);

        let mut records = Vec::with_capacity(page.len());
        for doc in page {
            let mut items = self.index.list_by_document(&doc.id).await?;
            items.sort_by_key(|item| item.attrs.chunk_index);

            let contents: Vec<String> = items.into_iter().map(|i| i.attrs.content).collect();
            let content = assemble(&contents, self.config.chunking.overlap);

            records.push(TransferRecord {
                kind: doc.kind,
                content,
                tags: doc.tags,
                source: doc.source,
            });
        }

        Ok(records)
    }

    /// Import transfer records from a JSONL payload.
    ///
    /// Each line is parsed and replayed independently; blank lines are
    /// skipped. The per-line `remember`/`ingest` calls take the guard
    /// themselves, so this method must not hold it across the loop.
    pub async fn upload(&self, jsonl: &str) -> Result<UploadReport, StoreError> {
        let mut imported = 0usize;
        let mut errors = Vec::new();

        for (line_no, line) in jsonl.lines().enumerate() {
            let line_no = line_no + 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match self.upload_line(line).await {
                Ok(()) => imported += 1,
                Err(err) => errors.push(UploadError {
                    line: line_no,
                    reason: err.to_string(),
                }),
            }
        }

        info!(imported, failed = errors.len(), "upload completed");

        Ok(UploadReport {
            imported,
            failed: errors.len(),
            errors,
        })
    }

    async fn upload_line(&self, line: &str) -> Result<(), StoreError> {
        let record: TransferRecord = serde_json::from_str(line)
            .map_err(|e| StoreError::input(format!("malformed record: {e}")))?;

        let tags = normalize_tags(record.tags);

        match record.kind {
            DocumentKind::Memory => {
                self.remember(&record.content, tags).await?;
            }
            DocumentKind::Document => {
                self.ingest(Some(record.content), None, tags).await?;
            }
        }

        Ok(())
    }
}
