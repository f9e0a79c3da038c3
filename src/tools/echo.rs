//! Echo 工具（测试用）

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::tools::{PropertySpec, Tool, ToolContract, ToolSchema, ValueType};

/// Echo 工具：回显文本
pub struct EchoTool;

impl EchoTool {
    pub fn contract() -> ToolContract {
        ToolContract::new("echo", "Echo text back (for testing)")
            .tags(&["testing"])
            .input(ToolSchema::new(vec![PropertySpec::new(
                "text",
                ValueType::String,
                "Text to echo",
            )]))
            .output(ToolSchema::new(vec![PropertySpec::new(
                "text",
                ValueType::String,
                "Echoed text",
            )]))
    }
}

#[async_trait]
impl Tool for EchoTool {
    async fn execute(&self, inputs: Value) -> Result<Value, String> {
        let text = inputs
            .get("text")
            .and_then(|v| v.as_str())
            .unwrap_or("(empty)");
        Ok(json!({ "text": text }))
    }
}
