use crate::errors::Error;
use crate::schema::{long_term_memory, short_term_memory, task_steps, tasks, tool_calls};
use diesel::{Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Represents a task row in the database
#[derive(
    Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable, Insertable,
)]
#[diesel(table_name = tasks)]
pub struct TaskRecord {
    /// UUID of the task
    pub id: String,
    /// Identifier of the submitting user
    pub owner_id: String,
    /// Free-text description the task was created from
    pub description: String,
    /// Serialized `TaskStatus`
    pub status: String,
    /// Accumulated cost of all completed steps
    pub cost: f64,
    /// JSON serialized metadata object
    pub metadata: String,
    /// Timestamp when the task was created
    pub created_at: String,
    /// Timestamp when the task was last updated
    pub updated_at: String,
}

/// Represents a single step row of a task
#[derive(
    Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable, Insertable,
)]
#[diesel(table_name = task_steps)]
pub struct StepRecord {
    pub id: String,
    pub task_id: String,
    /// Zero-based execution order within the task
    pub step_index: i32,
    pub instruction: String,
    /// Agent-type tag assigned by the planner
    pub agent_type: String,
    pub status: String,
    pub cost: f64,
}

/// Audit entry written after every successful tool invocation
#[derive(Debug, Clone, Serialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = tool_calls)]
pub struct ToolCallRecord {
    pub id: i32,
    pub task_id: String,
    pub agent_type: String,
    pub tool_name: String,
    /// JSON serialized arguments passed to the tool
    pub arguments: String,
    pub created_at: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = tool_calls)]
pub struct NewToolCall<'a> {
    pub task_id: &'a str,
    pub agent_type: &'a str,
    pub tool_name: &'a str,
    pub arguments: &'a str,
    pub created_at: &'a str,
}

/// A scratch note written by an agent while a task runs
#[derive(Debug, Clone, Serialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = short_term_memory)]
pub struct ShortTermMemoryRecord {
    pub id: i32,
    pub task_id: String,
    pub key: String,
    pub value: String,
    pub created_at: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = short_term_memory)]
pub struct NewShortTermMemory<'a> {
    pub task_id: &'a str,
    pub key: &'a str,
    pub value: &'a str,
    pub created_at: &'a str,
}

/// Relational half of a long-term memory; the vector lives in the index under `embedding_id`
#[derive(Debug, Clone, Serialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = long_term_memory)]
pub struct LongTermMemoryRecord {
    pub id: i32,
    /// Key of the matching entry in the vector index
    pub embedding_id: i64,
    pub content: String,
    /// JSON serialized metadata object
    pub metadata: String,
    pub created_at: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = long_term_memory)]
pub struct NewLongTermMemory<'a> {
    pub embedding_id: i64,
    pub content: &'a str,
    pub metadata: &'a str,
    pub created_at: &'a str,
}

impl ToolCallRecord {
    pub fn arguments_json(&self) -> Result<Value, Error> {
        Ok(serde_json::from_str(&self.arguments)?)
    }
}

impl LongTermMemoryRecord {
    pub fn metadata_json(&self) -> Result<Value, Error> {
        Ok(serde_json::from_str(&self.metadata)?)
    }
}
