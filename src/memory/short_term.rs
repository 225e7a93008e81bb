use crate::db::{Database, MemoryRepository, ShortTermMemoryRecord};
use crate::errors::Error;

/// Per-task keyed notes; writes append, reads see the latest value
#[derive(Debug, Clone)]
pub struct ShortTermMemoryStore {
    database: Database,
}

impl ShortTermMemoryStore {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Appends a note; previous notes under the same key are kept
    pub async fn write(&self, task_id: &str, key: &str, value: &str) -> Result<(), Error> {
        let (task_id, key, value) = (task_id.to_string(), key.to_string(), value.to_string());
        self.database
            .run(move |conn| MemoryRepository::new(conn).insert_note(&task_id, &key, &value))
            .await
    }

    /// Most recently written value for `key`, if any
    pub async fn read(&self, task_id: &str, key: &str) -> Result<Option<String>, Error> {
        let (task_id, key) = (task_id.to_string(), key.to_string());
        self.database
            .run(move |conn| MemoryRepository::new(conn).latest_note(&task_id, &key))
            .await
    }

    /// Every note of the task in the order it was written
    pub async fn list(&self, task_id: &str) -> Result<Vec<ShortTermMemoryRecord>, Error> {
        let task_id = task_id.to_string();
        self.database
            .run(move |conn| MemoryRepository::new(conn).list_notes(&task_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TaskStatus;
    use crate::db::{test_support::temp_database, TaskRecord, TaskRepository};
    use chrono::Utc;

    async fn store_with_task(database: &Database) -> ShortTermMemoryStore {
        database
            .run(|conn| {
                let now = Utc::now().to_rfc3339();
                TaskRepository::new(conn).insert_task_with_steps(
                    &TaskRecord {
                        id: "t1".to_string(),
                        owner_id: "u".to_string(),
                        description: "d".to_string(),
                        status: TaskStatus::Pending.to_string(),
                        cost: 0.0,
                        metadata: "{}".to_string(),
                        created_at: now.clone(),
                        updated_at: now,
                    },
                    &[],
                )
            })
            .await
            .unwrap();
        ShortTermMemoryStore::new(database.clone())
    }

    #[tokio::test]
    async fn read_returns_most_recent_write() {
        let (_dir, database) = temp_database();
        let store = store_with_task(&database).await;

        assert_eq!(store.read("t1", "k").await.unwrap(), None);
        store.write("t1", "k", "one").await.unwrap();
        store.write("t1", "k", "two").await.unwrap();
        store.write("t1", "other", "x").await.unwrap();

        assert_eq!(store.read("t1", "k").await.unwrap().as_deref(), Some("two"));
        let keys: Vec<String> = store
            .list("t1")
            .await
            .unwrap()
            .into_iter()
            .map(|r| format!("{}={}", r.key, r.value))
            .collect();
        assert_eq!(keys, vec!["k=one", "k=two", "other=x"]);
    }

    #[tokio::test]
    async fn list_of_unknown_task_is_empty() {
        let (_dir, database) = temp_database();
        let store = ShortTermMemoryStore::new(database);
        assert!(store.list("nope").await.unwrap().is_empty());
    }
}
