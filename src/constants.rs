/// Cost charged to a step, and its task, when the step completes
pub const DEFAULT_STEP_COST: f64 = 0.01;

/// Expression the calculator is invoked with when an instruction asks to calculate
pub const DEMO_CALCULATOR_EXPRESSION: &str = "1 + 1";

/// Short-term note holding the instruction of the step that ran last
pub const LAST_INSTRUCTION_KEY: &str = "last_instruction";

/// Short-term note written once an agent finished its step
pub const LAST_STATUS_KEY: &str = "last_status";

/// Instruction substring (case-insensitive) that stores the instruction in long-term memory
pub const REMEMBER_TRIGGER: &str = "remember";

/// Instruction substring (case-insensitive) that invokes the calculator
pub const CALCULATE_TRIGGER: &str = "calculate";

pub const DEFAULT_DATABASE_PATH: &str = "orchestrator.db";
pub const DEFAULT_INDEX_PATH: &str = "data/memory.index";
pub const DEFAULT_EMBEDDING_DIM: usize = 384;
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_API_PORT: u16 = 3000;

/// Requests a user may make within one rate-limit window
pub const DEFAULT_RATE_LIMIT_PER_USER: u32 = 60;
/// Requests allowed per window on shared, non-user keys such as memory search
pub const DEFAULT_RATE_LIMIT_PER_TASK: u32 = 30;
pub const DEFAULT_RATE_LIMIT_WINDOW: &str = "60s";

pub const DEFAULT_SEARCH_LIMIT: usize = 5;
