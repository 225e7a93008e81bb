//! API routes configuration module

use crate::api::handlers::{
    create_task, delete_task, get_task, health, list_task_memory, list_task_tool_calls,
    search_memory,
};
use crate::api::AppState;
use axum::{
    routing::{get, post},
    Extension, Router,
};

/// Creates and configures the API router with all routes
///
/// # Arguments
/// * `state` - Engine and rate limiter shared across handlers
///
/// # Returns
/// * `Router` - Configured router with all API endpoints
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tasks", post(create_task))
        .route("/tasks/:id", get(get_task).delete(delete_task))
        .route("/tasks/:id/memory", get(list_task_memory))
        .route("/tasks/:id/tool-calls", get(list_task_tool_calls))
        .route("/memory/search", post(search_memory))
        .layer(Extension(state))
}
