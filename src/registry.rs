//! Durable document registry.
//!
//! An in-memory map from document id to [`Document`], backed by whole-file
//! JSON persistence: loaded once at open, rewritten wholesale after every
//! mutating operation. There is no write-ahead log or incremental patching;
//! a crash mid-write can leave the on-disk snapshot stale relative to the
//! vector index, which is an accepted gap of the single-writer design.
//!
//! Mutations are only ever triggered while the caller holds the exclusive
//! guard; the internal lock exists for interior mutability, not for
//! concurrent writers.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::StoreError;
use crate::models::Document;

pub struct DocumentRegistry {
    path: PathBuf,
    docs: RwLock<HashMap<String, Document>>,
}

impl DocumentRegistry {
    /// Load the persisted snapshot. An absent file means a first run and an
    /// empty registry.
    pub async fn load(path: PathBuf) -> Result<Self, StoreError> {
        let docs = match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                serde_json::from_str(&content).map_err(StoreError::persistence)?
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => return Err(StoreError::persistence(err)),
        };

        Ok(Self {
            path,
            docs: RwLock::new(docs),
        })
    }

    /// Insert or replace a document and immediately rewrite the snapshot.
    pub async fn put(&self, doc: Document) -> Result<(), StoreError> {
        self.docs.write().unwrap().insert(doc.id.clone(), doc);
        self.persist().await
    }

    /// Remove a document from the in-memory map without persisting.
    ///
    /// Batch deletion removes several documents and then calls
    /// [`persist`](Self::persist) once.
    pub fn remove(&self, id: &str) -> Option<Document> {
        self.docs.write().unwrap().remove(id)
    }

    pub fn get(&self, id: &str) -> Option<Document> {
        self.docs.read().unwrap().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.docs.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Documents sorted by `created_at` descending (id ascending on ties),
    /// optionally restricted to any-intersection tag matches, then paginated.
    pub fn list(&self, tags: &[String], offset: usize, limit: usize) -> (Vec<Document>, usize) {
        let docs = self.docs.read().unwrap();

        let mut matching: Vec<Document> = docs
            .values()
            .filter(|d| d.matches_tags(tags))
            .cloned()
            .collect();

        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        let total = matching.len();
        let page = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect();

        (page, total)
    }

    /// Rewrite the whole snapshot file from the in-memory map.
    pub async fn persist(&self) -> Result<(), StoreError> {
        let json = {
            let docs = self.docs.read().unwrap();
            serde_json::to_string_pretty(&*docs).map_err(StoreError::persistence)?
        };

        tokio::fs::write(&self.path, json)
            .await
            .map_err(StoreError::persistence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentKind;
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn doc(id: &str, tags: &[&str], age_secs: i64) -> Document {
        let created = Utc::now() - Duration::seconds(age_secs);
        Document {
            id: id.to_string(),
            kind: DocumentKind::Memory,
            preview: format!("preview of {id}"),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            source: None,
            chunk_count: 1,
            created_at: created,
            updated_at: created,
        }
    }

    #[tokio::test]
    async fn test_absent_file_means_empty_registry() {
        let tmp = TempDir::new().unwrap();
        let registry = DocumentRegistry::load(tmp.path().join("registry.json"))
            .await
            .unwrap();
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_put_persists_and_reloads() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("registry.json");

        let registry = DocumentRegistry::load(path.clone()).await.unwrap();
        registry.put(doc("d1", &["alpha"], 0)).await.unwrap();
        registry.put(doc("d2", &[], 0)).await.unwrap();

        let reloaded = DocumentRegistry::load(path).await.unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get("d1").unwrap().tags, vec!["alpha"]);
    }

    #[tokio::test]
    async fn test_remove_then_persist() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("registry.json");

        let registry = DocumentRegistry::load(path.clone()).await.unwrap();
        registry.put(doc("d1", &[], 0)).await.unwrap();

        assert!(registry.remove("d1").is_some());
        assert!(registry.remove("d1").is_none());
        registry.persist().await.unwrap();

        let reloaded = DocumentRegistry::load(path).await.unwrap();
        assert!(reloaded.is_empty());
    }

    #[tokio::test]
    async fn test_list_sorts_newest_first() {
        let tmp = TempDir::new().unwrap();
        let registry = DocumentRegistry::load(tmp.path().join("registry.json"))
            .await
            .unwrap();

        registry.put(doc("oldest", &[], 300)).await.unwrap();
        registry.put(doc("newest", &[], 0)).await.unwrap();
        registry.put(doc("middle", &[], 150)).await.unwrap();

        let (page, total) = registry.list(&[], 0, 10);
        assert_eq!(total, 3);
        let ids: Vec<&str> = page.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["newest", "middle", "oldest"]);
    }

    #[tokio::test]
    async fn test_list_tag_filter_any_intersection() {
        let tmp = TempDir::new().unwrap();
        let registry = DocumentRegistry::load(tmp.path().join("registry.json"))
            .await
            .unwrap();

        registry.put(doc("a", &["rust", "cli"], 0)).await.unwrap();
        registry.put(doc("b", &["python"], 10)).await.unwrap();
        registry.put(doc("c", &[], 20)).await.unwrap();

        let (page, total) = registry.list(&["rust".to_string(), "go".to_string()], 0, 10);
        assert_eq!(total, 1);
        assert_eq!(page[0].id, "a");
    }

    #[tokio::test]
    async fn test_pagination_covers_disjoint_contiguous_slices() {
        let tmp = TempDir::new().unwrap();
        let registry = DocumentRegistry::load(tmp.path().join("registry.json"))
            .await
            .unwrap();

        for i in 0..7 {
            registry.put(doc(&format!("d{i}"), &[], i * 10)).await.unwrap();
        }

        let (first, _) = registry.list(&[], 0, 3);
        let (second, _) = registry.list(&[], 3, 3);
        let (third, _) = registry.list(&[], 6, 3);

        let mut seen: Vec<String> = first
            .iter()
            .chain(second.iter())
            .chain(third.iter())
            .map(|d| d.id.clone())
            .collect();
        assert_eq!(seen.len(), 7);
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 7, "pages overlap");
    }
}
