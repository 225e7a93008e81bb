mod calculator_tool;
mod echo_tool;
mod tool_registry;

use crate::errors::Error;
use serde_json::Value;

pub use calculator_tool::*;
pub use echo_tool::*;
pub use tool_registry::*;

/// A named capability agents can invoke through the [`ToolRegistry`]
pub trait Tool: std::fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON-Schema the arguments object must satisfy
    fn parameters_schema(&self) -> Value {
        serde_json::json!({ "type": "object" })
    }

    fn call(&self, arguments: &Value) -> Result<String, Error>;
}
