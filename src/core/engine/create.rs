use super::TaskExecutionEngine;
use crate::core::{Task, TaskStatus};
use crate::db::{StepRecord, TaskRecord, TaskRepository};
use crate::errors::Error;
use chrono::Utc;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

impl TaskExecutionEngine {
    /// Creates a pending task with one pending step per planned instruction
    ///
    /// The task row and all step rows are written in a single transaction, so
    /// a task is never observable without its complete step list.
    ///
    /// # Arguments
    ///
    /// * `owner_id` - Submitting user
    /// * `description` - Free text handed to the planner
    /// * `metadata` - JSON object stored with the task; `null` is stored as `{}`
    ///
    /// # Errors
    ///
    /// * `InvalidArgument` if `metadata` is neither an object nor `null`
    /// * `EmptyDecomposition` if the planner returns no instruction
    /// * Any persistence error; nothing is written in that case
    pub async fn create_task(
        &self,
        owner_id: &str,
        description: &str,
        metadata: Value,
    ) -> Result<Task, Error> {
        let metadata = match metadata {
            Value::Null => Value::Object(Default::default()),
            Value::Object(_) => metadata,
            other => {
                return Err(Error::InvalidArgument(format!(
                    "task metadata must be a JSON object, got {}",
                    other
                )))
            }
        };

        let instructions = self.planner.decompose(description);
        if instructions.is_empty() {
            return Err(Error::EmptyDecomposition);
        }

        let now = Utc::now().to_rfc3339();
        let task_id = Uuid::new_v4().to_string();
        let record = TaskRecord {
            id: task_id.clone(),
            owner_id: owner_id.to_string(),
            description: description.to_string(),
            status: TaskStatus::Pending.to_string(),
            cost: 0.0,
            metadata: serde_json::to_string(&metadata)?,
            created_at: now.clone(),
            updated_at: now,
        };

        let steps = instructions
            .iter()
            .enumerate()
            .map(|(index, instruction)| -> Result<StepRecord, Error> {
                let step_index = i32::try_from(index).map_err(|_| {
                    Error::InvalidArgument(format!("too many steps ({})", instructions.len()))
                })?;
                Ok(StepRecord {
                    id: Uuid::new_v4().to_string(),
                    task_id: task_id.clone(),
                    step_index,
                    instruction: instruction.clone(),
                    agent_type: self.planner.classify(instruction).as_str().to_string(),
                    status: TaskStatus::Pending.to_string(),
                    cost: 0.0,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let step_count = steps.len();
        let record = self
            .database
            .run(move |conn| {
                TaskRepository::new(conn).insert_task_with_steps(&record, &steps)?;
                Ok(record)
            })
            .await?;

        info!(
            "Created task {} for {} with {} step(s)",
            record.id, record.owner_id, step_count
        );
        Task::try_from(record)
    }
}
