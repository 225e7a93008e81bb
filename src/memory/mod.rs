//! Task-scoped scratch notes and the global semantic memory
//!
//! - [`ShortTermMemoryStore`] is an append-only key/value log per task
//! - [`LongTermMemoryStore`] correlates relational rows with a persisted [`VectorIndex`]

mod long_term;
mod short_term;
mod vector_index;

pub use long_term::*;
pub use short_term::*;
pub use vector_index::*;
