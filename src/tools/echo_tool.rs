use crate::errors::Error;
use crate::tools::Tool;
use serde_json::{json, Value};

/// Returns its `text` argument prefixed with `echo:`
#[derive(Debug)]
pub struct EchoTool;

impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echo text back. Args: {\"text\": \"message\"}"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": { "type": "string" }
            }
        })
    }

    fn call(&self, arguments: &Value) -> Result<String, Error> {
        let text = arguments
            .get("text")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        Ok(format!("echo:{}", text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echoes_text_with_prefix() {
        assert_eq!(EchoTool.call(&json!({"text": "hi"})).unwrap(), "echo:hi");
        assert_eq!(EchoTool.call(&json!({})).unwrap(), "echo:");
    }
}
