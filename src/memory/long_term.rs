use crate::db::{Database, LongTermMemoryRecord, MemoryRepository};
use crate::errors::Error;
use crate::llm::Embedder;
use crate::memory::VectorIndex;
use crate::utils::atomic_write;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// A long-term memory matched by a search, with its distance to the query
#[derive(Debug, Clone, Serialize)]
pub struct MemoryHit {
    pub record: LongTermMemoryRecord,
    /// Squared L2 distance, smaller is more similar
    pub distance: f32,
}

/// Durable semantic memory shared by every task
///
/// Each relational row in `long_term_memory` has exactly one vector in the
/// index under the same `embedding_id`. Additions are serialized behind the
/// index write lock, from id allocation through persisting the index file;
/// searches share the read lock.
#[derive(Debug)]
pub struct LongTermMemoryStore {
    database: Database,
    embedder: Arc<dyn Embedder>,
    index: RwLock<VectorIndex>,
    index_path: PathBuf,
}

impl LongTermMemoryStore {
    /// Opens the store, loading the index file at `index_path` when it exists
    ///
    /// # Errors
    /// `IndexInconsistency` if the stored index has a different dimension than the embedder
    pub fn open(
        database: Database,
        embedder: Arc<dyn Embedder>,
        index_path: impl Into<PathBuf>,
    ) -> Result<Self, Error> {
        let index_path = index_path.into();
        let index = if index_path.exists() {
            let index = VectorIndex::load(&index_path)?;
            if index.dimension() != embedder.dimension() {
                return Err(Error::IndexInconsistency(format!(
                    "index at {} has dimension {}, embedder produces {}",
                    index_path.display(),
                    index.dimension(),
                    embedder.dimension()
                )));
            }
            info!(
                "Loaded vector index from {} ({} entries)",
                index_path.display(),
                index.len()
            );
            index
        } else {
            debug!("No vector index at {}, starting empty", index_path.display());
            VectorIndex::new(embedder.dimension())
        };

        Ok(Self {
            database,
            embedder,
            index: RwLock::new(index),
            index_path,
        })
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Number of vectors currently in the index
    pub async fn len(&self) -> usize {
        self.index.read().await.len()
    }

    /// Stores `content` and returns its newly allocated embedding id
    ///
    /// If persisting the index fails, the relational row and the in-memory
    /// vector stay in place and the file lags behind until the next
    /// successful add; `check_consistency` on a fresh process reports it.
    pub async fn add_text(&self, content: &str, metadata: &Value) -> Result<i64, Error> {
        let vector = self.embedder.embed_text(content).await?;
        let metadata = serde_json::to_string(metadata)?;

        let mut index = self.index.write().await;

        let owned_content = content.to_string();
        let embedding_id = self
            .database
            .run(move |conn| MemoryRepository::new(conn).insert_memory(&owned_content, &metadata))
            .await?;
        index.add(embedding_id, &vector)?;

        let bytes = index.to_bytes();
        let path = self.index_path.clone();
        let persisted = tokio::task::spawn_blocking(move || atomic_write(&path, &bytes)).await?;
        if let Err(e) = persisted {
            warn!(
                "Memory {} stored but index file {} not updated: {}",
                embedding_id,
                self.index_path.display(),
                e
            );
            return Err(e.into());
        }

        debug!("Stored long-term memory {}", embedding_id);
        Ok(embedding_id)
    }

    /// Up to `k` memories nearest to `query`, nearest first
    ///
    /// Index hits without a relational row are dropped.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<MemoryHit>, Error> {
        if k == 0 || self.index.read().await.is_empty() {
            return Ok(Vec::new());
        }

        let vector = self.embedder.embed_text(query).await?;
        let hits = self.index.read().await.search(&vector, k)?;
        if hits.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = hits.iter().map(|(id, _)| *id).collect();
        let mut records: HashMap<i64, LongTermMemoryRecord> = self
            .database
            .run(move |conn| MemoryRepository::new(conn).find_memories(&ids))
            .await?
            .into_iter()
            .map(|r| (r.embedding_id, r))
            .collect();

        let results: Vec<MemoryHit> = hits
            .into_iter()
            .filter_map(|(id, distance)| {
                let record = records.remove(&id);
                if record.is_none() {
                    warn!("Vector {} has no long-term memory row, skipping", id);
                }
                record.map(|record| MemoryHit { record, distance })
            })
            .collect();
        Ok(results)
    }

    /// Compares index ids against relational embedding ids
    ///
    /// # Returns
    /// The number of memories when both sides agree
    ///
    /// # Errors
    /// `IndexInconsistency` naming the ids missing on either side; nothing is repaired
    pub async fn check_consistency(&self) -> Result<usize, Error> {
        let index = self.index.read().await;
        let db_ids: BTreeSet<i64> = self
            .database
            .run(|conn| MemoryRepository::new(conn).embedding_ids())
            .await?
            .into_iter()
            .collect();
        let index_ids: BTreeSet<i64> = index.ids().iter().copied().collect();

        let missing_from_index: Vec<i64> = db_ids.difference(&index_ids).copied().collect();
        let missing_from_db: Vec<i64> = index_ids.difference(&db_ids).copied().collect();
        if missing_from_index.is_empty() && missing_from_db.is_empty() {
            return Ok(db_ids.len());
        }

        Err(Error::IndexInconsistency(format!(
            "ids missing from index: {:?}; ids missing from database: {:?}",
            missing_from_index, missing_from_db
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::temp_database;
    use crate::llm::HashingEmbedder;
    use async_trait::async_trait;
    use serde_json::json;
    use tempfile::TempDir;

    fn open_store(database: &Database, dir: &TempDir) -> LongTermMemoryStore {
        let embedder = Arc::new(HashingEmbedder::new(64).unwrap());
        LongTermMemoryStore::open(database.clone(), embedder, dir.path().join("memory.index"))
            .unwrap()
    }

    #[derive(Debug)]
    struct BrokenEmbedder;

    #[async_trait]
    impl Embedder for BrokenEmbedder {
        fn dimension(&self) -> usize {
            4
        }

        async fn embed_texts(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, Error> {
            Err(Error::Embedding("offline".to_string()))
        }
    }

    #[tokio::test]
    async fn add_then_search_returns_the_same_content_first() {
        let (dir, database) = temp_database();
        let store = open_store(&database, &dir);

        store.add_text("the sky is blue", &json!({})).await.unwrap();
        store
            .add_text("remember to water the plants", &json!({"task_id": "t1"}))
            .await
            .unwrap();
        store.add_text("rust borrow checker", &json!({})).await.unwrap();

        let hits = store.search("remember to water the plants", 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.content, "remember to water the plants");
        assert_eq!(hits[0].distance, 0.0);
        assert_eq!(
            hits[0].record.metadata_json().unwrap(),
            json!({"task_id": "t1"})
        );

        let all = store.search("the sky is blue", 10).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[tokio::test]
    async fn empty_store_search_is_empty() {
        let (dir, database) = temp_database();
        let store = open_store(&database, &dir);
        assert!(store.search("anything", 5).await.unwrap().is_empty());
        assert!(store.search("", 0).await.unwrap().is_empty());

        let broken =
            LongTermMemoryStore::open(database, Arc::new(BrokenEmbedder), dir.path().join("b"))
                .unwrap();
        assert!(broken.search("anything", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_adds_get_unique_contiguous_ids() {
        let (dir, database) = temp_database();
        let store = Arc::new(open_store(&database, &dir));

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.add_text(&format!("note {}", i), &json!({})).await })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap());
        }
        ids.sort();
        assert_eq!(ids, (1..=16).collect::<Vec<i64>>());
        assert_eq!(store.check_consistency().await.unwrap(), 16);
    }

    #[tokio::test]
    async fn reopened_store_serves_the_same_ids() {
        let (dir, database) = temp_database();
        let before = {
            let store = open_store(&database, &dir);
            store.add_text("alpha", &json!({})).await.unwrap();
            store.add_text("beta", &json!({})).await.unwrap();
            let bytes = store.index.read().await.to_bytes();
            bytes
        };

        let reopened = open_store(&database, &dir);
        assert_eq!(reopened.index.read().await.to_bytes(), before);
        assert_eq!(reopened.len().await, 2);
        let hits = reopened.search("beta", 1).await.unwrap();
        assert_eq!(hits[0].record.embedding_id, 2);
        assert_eq!(reopened.add_text("gamma", &json!({})).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn missing_index_file_is_reported_not_repaired() {
        let (dir, database) = temp_database();
        {
            let store = open_store(&database, &dir);
            store.add_text("alpha", &json!({})).await.unwrap();
        }
        std::fs::remove_file(dir.path().join("memory.index")).unwrap();

        let store = open_store(&database, &dir);
        assert!(matches!(
            store.check_consistency().await,
            Err(Error::IndexInconsistency(msg)) if msg.contains("[1]")
        ));
        assert!(store.search("alpha", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_index_write_keeps_the_row_and_next_add_catches_up() {
        let (dir, database) = temp_database();
        let index_path = dir.path().join("memory.index");
        let store = open_store(&database, &dir);

        // a directory in place of the index file makes the rename fail
        std::fs::create_dir(&index_path).unwrap();
        assert!(matches!(
            store.add_text("alpha", &json!({})).await,
            Err(Error::IoError(_))
        ));
        let ids = database
            .run(|conn| MemoryRepository::new(conn).embedding_ids())
            .await
            .unwrap();
        assert_eq!(ids, vec![1]);

        std::fs::remove_dir(&index_path).unwrap();
        assert_eq!(store.add_text("beta", &json!({})).await.unwrap(), 2);

        let reopened = open_store(&database, &dir);
        assert_eq!(reopened.len().await, 2);
        assert_eq!(reopened.check_consistency().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn dimension_mismatch_on_open_is_rejected() {
        let (dir, database) = temp_database();
        {
            let store = open_store(&database, &dir);
            store.add_text("alpha", &json!({})).await.unwrap();
        }
        let other = Arc::new(HashingEmbedder::new(8).unwrap());
        let result = LongTermMemoryStore::open(database, other, dir.path().join("memory.index"));
        assert!(matches!(result, Err(Error::IndexInconsistency(_))));
    }

    #[tokio::test]
    async fn embedding_failure_writes_nothing() {
        let (dir, database) = temp_database();
        let store =
            LongTermMemoryStore::open(database, Arc::new(BrokenEmbedder), dir.path().join("b"))
                .unwrap();
        assert!(matches!(
            store.add_text("x", &json!({})).await,
            Err(Error::Embedding(_))
        ));
        assert_eq!(store.check_consistency().await.unwrap(), 0);
    }
}
