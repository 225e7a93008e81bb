/// API error types and handling
pub mod errors;
/// API module containing HTTP handlers, routes, server setup and error handling
pub mod handlers;
/// Routes configuration and setup
pub mod routes;
/// HTTP server implementation
pub mod server;

use crate::config::RateLimitConfig;
use crate::core::TaskExecutionEngine;
use crate::errors::Error;
use crate::rate_limit::RateLimiter;
use std::sync::Arc;
use std::time::Duration;

/// Everything a handler needs, shared through an axum `Extension`
#[derive(Debug, Clone)]
pub struct AppState {
    pub engine: TaskExecutionEngine,
    pub rate_limiter: Arc<dyn RateLimiter>,
    pub limits: RateLimits,
}

/// Parsed admission limits
#[derive(Debug, Clone, Copy)]
pub struct RateLimits {
    pub per_user: u32,
    pub per_task: u32,
    pub window: Duration,
}

impl RateLimits {
    pub fn from_config(config: &RateLimitConfig) -> Result<Self, Error> {
        Ok(Self {
            per_user: config.per_user,
            per_task: config.per_task,
            window: config.window_duration()?,
        })
    }
}
