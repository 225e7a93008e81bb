//! Task orchestration engine.
//!
//! A natural-language task is decomposed into ordered steps, each step is
//! executed by an agent kind, and cost, tool usage, scratch notes and
//! long-term semantic memories are recorded along the way.

pub mod agents;
pub mod api;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod db;
pub mod errors;
pub mod llm;
pub mod memory;
pub mod rate_limit;
pub mod schema;
pub mod tools;
pub mod utils;
