use diesel::result::Error as DieselError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Diesel error: {0}")]
    DieselError(#[from] DieselError),
    #[error("Connection pool error: {0}")]
    PoolError(#[from] r2d2::Error),
    #[error("Serde error: {0}")]
    SerdeError(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Background job failed: {0}")]
    JoinError(#[from] tokio::task::JoinError),
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },
    #[error("Tool '{0}' is not registered")]
    UnknownTool(String),
    #[error("Invalid expression '{expression}': {reason}")]
    InvalidExpression { expression: String, reason: String },
    #[error("Invalid arguments for tool '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },
    #[error("Planner produced no steps for the description")]
    EmptyDecomposition,
    #[error("Vector index inconsistency: {0}")]
    IndexInconsistency(String),
    #[error("Invalid transition for {entity} '{id}': {from} -> {to}")]
    InvalidTransition {
        entity: &'static str,
        id: String,
        from: String,
        to: String,
    },
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Embedding error: {0}")]
    Embedding(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound {
            entity,
            id: id.into(),
        }
    }
}
