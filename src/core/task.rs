use super::task_state::TaskStatus;
use crate::db::{StepRecord, TaskRecord};
use crate::errors::Error;
use serde::Serialize;
use serde_json::Value;

/// A user-submitted unit of work, decomposed into ordered steps
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub id: String,
    pub owner_id: String,
    pub description: String,
    pub status: TaskStatus,
    /// Sum of the costs of all completed steps
    pub cost: f64,
    pub metadata: Value,
    pub created_at: String,
    pub updated_at: String,
}

/// One instruction of a task, executed by a single agent
#[derive(Debug, Clone, Serialize)]
pub struct TaskStep {
    pub id: String,
    pub task_id: String,
    pub step_index: usize,
    pub instruction: String,
    pub agent_type: String,
    pub status: TaskStatus,
    pub cost: f64,
}

/// A task together with its steps in execution order
#[derive(Debug, Clone, Serialize)]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: Task,
    pub steps: Vec<TaskStep>,
}

fn parse_status(raw: &str) -> Result<TaskStatus, Error> {
    raw.parse::<TaskStatus>().map_err(Error::InvalidArgument)
}

impl TryFrom<TaskRecord> for Task {
    type Error = Error;

    fn try_from(record: TaskRecord) -> Result<Self, Self::Error> {
        Ok(Task {
            status: parse_status(&record.status)?,
            metadata: serde_json::from_str(&record.metadata)?,
            id: record.id,
            owner_id: record.owner_id,
            description: record.description,
            cost: record.cost,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

impl TryFrom<StepRecord> for TaskStep {
    type Error = Error;

    fn try_from(record: StepRecord) -> Result<Self, Self::Error> {
        let step_index = usize::try_from(record.step_index).map_err(|_| {
            Error::InvalidArgument(format!("negative step index {}", record.step_index))
        })?;
        Ok(TaskStep {
            status: parse_status(&record.status)?,
            step_index,
            id: record.id,
            task_id: record.task_id,
            instruction: record.instruction,
            agent_type: record.agent_type,
            cost: record.cost,
        })
    }
}
