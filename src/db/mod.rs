mod memory_repository;
mod models;
mod task_repository;
mod tool_call_repository;

use crate::errors::Error;
use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::sqlite::SqliteConnection;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub use memory_repository::*;
pub use models::*;
pub use task_repository::*;
pub use tool_call_repository::*;

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const CREATE_TABLES: &str = "
CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY NOT NULL,
    owner_id TEXT NOT NULL,
    description TEXT NOT NULL,
    status TEXT NOT NULL,
    cost DOUBLE NOT NULL DEFAULT 0,
    metadata TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_tasks_owner_id ON tasks (owner_id);

CREATE TABLE IF NOT EXISTS task_steps (
    id TEXT PRIMARY KEY NOT NULL,
    task_id TEXT NOT NULL REFERENCES tasks (id) ON DELETE CASCADE,
    step_index INTEGER NOT NULL,
    instruction TEXT NOT NULL,
    agent_type TEXT NOT NULL,
    status TEXT NOT NULL,
    cost DOUBLE NOT NULL DEFAULT 0,
    UNIQUE (task_id, step_index)
);

CREATE TABLE IF NOT EXISTS tool_calls (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    task_id TEXT NOT NULL REFERENCES tasks (id) ON DELETE CASCADE,
    agent_type TEXT NOT NULL,
    tool_name TEXT NOT NULL,
    arguments TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_tool_calls_task_id ON tool_calls (task_id);

CREATE TABLE IF NOT EXISTS short_term_memory (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    task_id TEXT NOT NULL REFERENCES tasks (id) ON DELETE CASCADE,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_short_term_memory_task_key ON short_term_memory (task_id, key);

CREATE TABLE IF NOT EXISTS long_term_memory (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    embedding_id BIGINT NOT NULL UNIQUE,
    content TEXT NOT NULL,
    metadata TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL
);
";

/// Per-connection pragmas applied whenever the pool hands out a connection
#[derive(Debug)]
struct ConnectionOptions {
    busy_timeout: Duration,
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute(&format!(
            "PRAGMA busy_timeout = {}; PRAGMA foreign_keys = ON;",
            self.busy_timeout.as_millis()
        ))
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Cloneable handle over the SQLite connection pool
#[derive(Clone, Debug)]
pub struct Database {
    pool: Arc<Pool<ConnectionManager<SqliteConnection>>>,
}

impl Database {
    /// Opens (or creates) the database at `db_path` and ensures the schema exists
    ///
    /// # Arguments
    /// * `db_path` - Path of the SQLite database file
    ///
    /// # Returns
    /// * `Result<Database, Error>` - Ready-to-use database handle
    pub fn new(db_path: &str) -> Result<Self, Error> {
        let manager = ConnectionManager::<SqliteConnection>::new(db_path);
        let pool = Pool::builder()
            .connection_customizer(Box::new(ConnectionOptions {
                busy_timeout: DEFAULT_BUSY_TIMEOUT,
            }))
            .build(manager)?;

        let database = Database {
            pool: Arc::new(pool),
        };
        database.init_schema()?;
        debug!("Database ready at {}", db_path);
        Ok(database)
    }

    fn init_schema(&self) -> Result<(), Error> {
        let mut conn = self.pool.get()?;
        conn.batch_execute("PRAGMA journal_mode = WAL;")?;
        conn.batch_execute(CREATE_TABLES)?;
        Ok(())
    }

    /// Runs `f` with a pooled connection on the blocking thread pool
    ///
    /// All relational access from async code goes through here.
    pub async fn run<F, T>(&self, f: F) -> Result<T, Error>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T, Error> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut *conn)
        })
        .await?
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Database;
    use tempfile::TempDir;

    /// Fresh on-disk database inside a temp dir that lives as long as the guard
    pub fn temp_database() -> (TempDir, Database) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        let database = Database::new(path.to_str().unwrap()).unwrap();
        (dir, database)
    }
}
