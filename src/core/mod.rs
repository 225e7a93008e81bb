//! Core module containing the task execution system
//!
//! This module contains:
//! - The task/step state machine and its execution engine
//! - The planner contract and the default keyword planner
//! - Task and step domain types

mod engine;
mod planner;
mod task;
mod task_state;

pub use engine::*;
pub use planner::*;
pub use task::*;
pub use task_state::*;
