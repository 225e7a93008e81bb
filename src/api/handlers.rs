use crate::api::errors::{api_error, ApiError};
use crate::api::AppState;
use crate::constants::DEFAULT_SEARCH_LIMIT;
use crate::core::{Task, TaskDetail, TaskStatus, TaskStep};
use crate::db::{ShortTermMemoryRecord, ToolCallRecord};
use crate::errors::Error;
use axum::http::StatusCode;
use axum::{
    extract::{Extension, Path},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

/// Largest `limit` a memory search may ask for
const MAX_SEARCH_LIMIT: usize = 100;

/// Represents the request payload for creating a new task
#[derive(Deserialize)]
pub struct CreateTaskRequest {
    pub user_id: String,
    pub description: String,
    #[serde(default)]
    pub metadata: Value,
}

/// Task as returned by the API
#[derive(Serialize)]
pub struct TaskResponse {
    pub id: String,
    pub user_id: String,
    pub description: String,
    pub status: TaskStatus,
    pub created_at: String,
    pub updated_at: String,
    pub cost: f64,
    pub metadata: Value,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        TaskResponse {
            id: task.id,
            user_id: task.owner_id,
            description: task.description,
            status: task.status,
            created_at: task.created_at,
            updated_at: task.updated_at,
            cost: task.cost,
            metadata: task.metadata,
        }
    }
}

/// Data transfer object representing one step of a task
#[derive(Serialize)]
pub struct TaskStepResponse {
    pub id: String,
    pub step_index: usize,
    pub instruction: String,
    pub status: TaskStatus,
    pub agent_type: String,
    pub cost: f64,
}

impl From<TaskStep> for TaskStepResponse {
    fn from(step: TaskStep) -> Self {
        TaskStepResponse {
            id: step.id,
            step_index: step.step_index,
            instruction: step.instruction,
            status: step.status,
            agent_type: step.agent_type,
            cost: step.cost,
        }
    }
}

#[derive(Serialize)]
pub struct TaskDetailResponse {
    #[serde(flatten)]
    pub task: TaskResponse,
    pub steps: Vec<TaskStepResponse>,
}

impl From<TaskDetail> for TaskDetailResponse {
    fn from(detail: TaskDetail) -> Self {
        TaskDetailResponse {
            task: detail.task.into(),
            steps: detail.steps.into_iter().map(Into::into).collect(),
        }
    }
}

fn default_search_limit() -> usize {
    DEFAULT_SEARCH_LIMIT
}

#[derive(Deserialize)]
pub struct MemorySearchRequest {
    pub query: String,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

#[derive(Serialize)]
pub struct MemorySearchResult {
    /// Embedding id of the memory
    pub id: i64,
    pub content: String,
    pub metadata: Value,
    pub distance: f32,
}

#[derive(Serialize)]
pub struct MemorySearchResponse {
    pub results: Vec<MemorySearchResult>,
}

async fn enforce_rate_limit(state: &AppState, key: &str, limit: u32) -> Result<(), ApiError> {
    if state
        .rate_limiter
        .hit(key, limit, state.limits.window)
        .await
    {
        Ok(())
    } else {
        Err(api_error(StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded"))
    }
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Creates a task and schedules its execution
///
/// # Arguments
/// * `state` - Shared application state
/// * `payload` - JSON payload containing the task creation request
///
/// # Returns
/// * `Result<Json<TaskResponse>, ApiError>` - The pending task, before any step ran
#[axum::debug_handler]
pub async fn create_task(
    Extension(state): Extension<AppState>,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<Json<TaskResponse>, ApiError> {
    enforce_rate_limit(
        &state,
        &format!("user:{}", payload.user_id),
        state.limits.per_user,
    )
    .await?;

    let task = state
        .engine
        .create_task(&payload.user_id, &payload.description, payload.metadata)
        .await?;
    state.engine.schedule_run(&task.id);
    info!("Task {} submitted by {}", task.id, payload.user_id);

    Ok(Json(task.into()))
}

/// Retrieves a task and its steps by id
#[axum::debug_handler]
pub async fn get_task(
    Path(id): Path<String>,
    Extension(state): Extension<AppState>,
) -> Result<Json<TaskDetailResponse>, ApiError> {
    let detail = state.engine.get_task_detail(&id).await?;
    Ok(Json(detail.into()))
}

#[axum::debug_handler]
pub async fn delete_task(
    Path(id): Path<String>,
    Extension(state): Extension<AppState>,
) -> Result<StatusCode, ApiError> {
    state.engine.delete_task(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Short-term notes the agents wrote for a task
#[axum::debug_handler]
pub async fn list_task_memory(
    Path(id): Path<String>,
    Extension(state): Extension<AppState>,
) -> Result<Json<Vec<ShortTermMemoryRecord>>, ApiError> {
    Ok(Json(state.engine.list_short_term_memory(&id).await?))
}

#[axum::debug_handler]
pub async fn list_task_tool_calls(
    Path(id): Path<String>,
    Extension(state): Extension<AppState>,
) -> Result<Json<Vec<ToolCallRecord>>, ApiError> {
    Ok(Json(state.engine.list_tool_calls(&id).await?))
}

/// Semantic search over long-term memory
#[axum::debug_handler]
pub async fn search_memory(
    Extension(state): Extension<AppState>,
    Json(payload): Json<MemorySearchRequest>,
) -> Result<Json<MemorySearchResponse>, ApiError> {
    enforce_rate_limit(&state, "memory:search", state.limits.per_task).await?;

    if payload.limit > MAX_SEARCH_LIMIT {
        return Err(Error::InvalidArgument(format!(
            "limit must be at most {}",
            MAX_SEARCH_LIMIT
        ))
        .into());
    }

    let hits = state
        .engine
        .search_long_term_memory(&payload.query, payload.limit)
        .await?;
    let results = hits
        .into_iter()
        .map(|hit| -> Result<MemorySearchResult, Error> {
            Ok(MemorySearchResult {
                metadata: hit.record.metadata_json()?,
                id: hit.record.embedding_id,
                content: hit.record.content,
                distance: hit.distance,
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;

    Ok(Json(MemorySearchResponse { results }))
}
