mod create;
mod run;

use crate::agents::AgentDispatcher;
use crate::config::AppConfig;
use crate::core::{KeywordPlanner, Planner, Task, TaskDetail, TaskStep};
use crate::db::{
    Database, MemoryRepository, ShortTermMemoryRecord, TaskRepository, ToolCallRecord,
    ToolCallRepository,
};
use crate::errors::Error;
use crate::llm::embedder_from_config;
use crate::memory::{LongTermMemoryStore, MemoryHit};
use crate::tools::ToolRegistry;
use std::sync::Arc;
use tracing::info;

/// Owns the task and step state machine
///
/// Cheap to clone; clones share the database pool, tools and memory stores.
#[derive(Debug, Clone)]
pub struct TaskExecutionEngine {
    database: Database,
    planner: Arc<dyn Planner>,
    dispatcher: AgentDispatcher,
    long_term: Arc<LongTermMemoryStore>,
    step_cost: f64,
}

impl TaskExecutionEngine {
    /// Assembles an engine from already constructed collaborators
    ///
    /// # Arguments
    /// * `database` - Relational store shared by every component
    /// * `planner` - Decomposes descriptions and classifies steps
    /// * `tools` - Registry the agents invoke tools through
    /// * `long_term` - Global semantic memory
    /// * `step_cost` - Cost charged per completed step
    pub fn new(
        database: Database,
        planner: Arc<dyn Planner>,
        tools: Arc<ToolRegistry>,
        long_term: Arc<LongTermMemoryStore>,
        step_cost: f64,
    ) -> Self {
        let dispatcher = AgentDispatcher::new(database.clone(), tools, long_term.clone());
        Self {
            database,
            planner,
            dispatcher,
            long_term,
            step_cost,
        }
    }

    /// Opens the database and vector index named in `config` and wires the default collaborators
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        config.validate()?;
        let database = Database::new(&config.database_path)?;
        let embedder = embedder_from_config(&config.embedder)?;
        let long_term = LongTermMemoryStore::open(database.clone(), embedder, &config.index_path)?;
        let tools = ToolRegistry::with_builtin_tools()?;

        info!(
            "Engine ready (database: {}, index: {}, step cost: {})",
            config.database_path, config.index_path, config.step_cost
        );
        Ok(Self::new(
            database,
            Arc::new(KeywordPlanner),
            Arc::new(tools),
            Arc::new(long_term),
            config.step_cost,
        ))
    }

    pub fn long_term(&self) -> &Arc<LongTermMemoryStore> {
        &self.long_term
    }

    /// Fetches a task without its steps
    pub async fn get_task(&self, task_id: &str) -> Result<Task, Error> {
        let id = task_id.to_string();
        let record = self
            .database
            .run(move |conn| {
                TaskRepository::new(conn)
                    .get_task(&id)?
                    .ok_or_else(|| Error::not_found("task", id))
            })
            .await?;
        Task::try_from(record)
    }

    /// Steps of a task in execution order
    pub async fn list_steps(&self, task_id: &str) -> Result<Vec<TaskStep>, Error> {
        Ok(self.get_task_detail(task_id).await?.steps)
    }

    /// A task and its ordered steps, read in one transaction
    pub async fn get_task_detail(&self, task_id: &str) -> Result<TaskDetail, Error> {
        let id = task_id.to_string();
        let (record, step_records) = self
            .database
            .run(move |conn| {
                use diesel::Connection;
                conn.transaction(|conn| {
                    let mut repo = TaskRepository::new(conn);
                    let record = repo
                        .get_task(&id)?
                        .ok_or_else(|| Error::not_found("task", id.clone()))?;
                    Ok((record, repo.list_steps(&id)?))
                })
            })
            .await?;

        let steps = step_records
            .into_iter()
            .map(TaskStep::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TaskDetail {
            task: Task::try_from(record)?,
            steps,
        })
    }

    /// Short-term notes of a task in write order
    pub async fn list_short_term_memory(
        &self,
        task_id: &str,
    ) -> Result<Vec<ShortTermMemoryRecord>, Error> {
        let id = task_id.to_string();
        self.database
            .run(move |conn| {
                if TaskRepository::new(conn).get_task(&id)?.is_none() {
                    return Err(Error::not_found("task", id));
                }
                MemoryRepository::new(conn).list_notes(&id)
            })
            .await
    }

    /// Tool calls recorded for a task, oldest first
    pub async fn list_tool_calls(&self, task_id: &str) -> Result<Vec<ToolCallRecord>, Error> {
        let id = task_id.to_string();
        self.database
            .run(move |conn| {
                if TaskRepository::new(conn).get_task(&id)?.is_none() {
                    return Err(Error::not_found("task", id));
                }
                ToolCallRepository::new(conn).list_for_task(&id)
            })
            .await
    }

    /// Deletes a task together with its steps, tool calls and short-term notes
    ///
    /// Long-term memories the task produced are global and stay.
    pub async fn delete_task(&self, task_id: &str) -> Result<(), Error> {
        let id = task_id.to_string();
        self.database
            .run(move |conn| {
                if TaskRepository::new(conn).delete_task(&id)? {
                    Ok(())
                } else {
                    Err(Error::not_found("task", id))
                }
            })
            .await?;
        info!("Deleted task {}", task_id);
        Ok(())
    }

    /// Nearest long-term memories to `query`, nearest first
    pub async fn search_long_term_memory(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<MemoryHit>, Error> {
        self.long_term.search(query, k).await
    }
}
