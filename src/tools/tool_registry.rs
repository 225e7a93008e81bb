use crate::errors::Error;
use crate::tools::{CalculatorTool, EchoTool, Tool};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

struct RegisteredTool {
    tool: Arc<dyn Tool>,
    /// Compiled from `Tool::parameters_schema` at registration
    validator: jsonschema::Validator,
}

/// Name-keyed dispatch table of the tools agents may invoke
///
/// Built once at startup and shared behind an `Arc`; there is no global instance.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tool_names())
            .finish()
    }
}

impl ToolRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in `echo` and `calculator` tools
    ///
    /// # Returns
    /// * `Result<ToolRegistry, Error>` - Registry with every built-in tool loaded
    pub fn with_builtin_tools() -> Result<Self, Error> {
        let mut registry = Self::new();
        registry.register(Arc::new(EchoTool))?;
        registry.register(Arc::new(CalculatorTool))?;
        debug!("Loaded tools: {:?}", registry.tool_names());
        Ok(registry)
    }

    /// Adds a tool, replacing any tool previously registered under the same name
    ///
    /// # Arguments
    /// * `tool` - The tool to register
    ///
    /// # Errors
    /// Returns `InvalidArguments` if the tool's parameter schema does not compile
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), Error> {
        let validator = jsonschema::validator_for(&tool.parameters_schema()).map_err(|e| {
            Error::InvalidArguments {
                tool: tool.name().to_string(),
                reason: format!("invalid parameter schema: {}", e),
            }
        })?;
        self.tools
            .insert(tool.name().to_string(), RegisteredTool { tool, validator });
        Ok(())
    }

    /// Fails with `UnknownTool` unless `name` is registered
    pub fn validate(&self, name: &str) -> Result<(), Error> {
        self.lookup(name).map(|_| ())
    }

    fn lookup(&self, name: &str) -> Result<&RegisteredTool, Error> {
        self.tools
            .get(name)
            .ok_or_else(|| Error::UnknownTool(name.to_string()))
    }

    /// Invokes a tool after checking its name and arguments
    ///
    /// Nothing runs unless both checks pass.
    ///
    /// # Arguments
    /// * `name` - Registered tool name
    /// * `arguments` - Arguments object handed to the tool
    ///
    /// # Returns
    /// * `Result<String, Error>` - The tool's textual result
    pub fn call(&self, name: &str, arguments: &Value) -> Result<String, Error> {
        let registered = self.lookup(name)?;

        let violations: Vec<String> = registered
            .validator
            .iter_errors(arguments)
            .map(|e| e.to_string())
            .collect();
        if !violations.is_empty() {
            return Err(Error::InvalidArguments {
                tool: name.to_string(),
                reason: violations.join("; "),
            });
        }

        debug!("Calling tool {} with {}", name, arguments);
        registered.tool.call(arguments)
    }

    /// Registered tool names, sorted
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// `name - description` lines for every tool, sorted by name
    pub fn descriptions(&self) -> Vec<String> {
        self.tool_names()
            .into_iter()
            .filter_map(|name| {
                self.tools
                    .get(&name)
                    .map(|t| format!("{} - {}", name, t.tool.description()))
            })
            .collect()
    }
}
