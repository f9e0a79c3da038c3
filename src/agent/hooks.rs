//! 生命周期钩子
//!
//! 两类观察者：工具选择后通知、工具执行前后通知。均为纯副作用，返回值被引擎丢弃，
//! 不能否决或改变控制流；未挂钩子等价于无操作。

use async_trait::async_trait;
use serde_json::Value;

use crate::agent::context::ToolContext;

/// 工具执行生命周期钩子
#[async_trait]
pub trait ToolHooks: Send + Sync {
    /// 工具执行前调用，携带完整上下文
    async fn before_execution(&self, context: &ToolContext);

    /// 工具执行后调用；成功携带结果，失败携带错误文本（二者必有其一）
    async fn after_execution(&self, context: &ToolContext, result: Option<&Value>, error: Option<&str>);
}

/// 工具选择生命周期钩子
///
/// 选择已在规划阶段完成，此钩子在执行时事后通知（confidence 恒为 1.0，
/// reasoning 为计划步骤给出的理由）。
#[async_trait]
pub trait ToolSelectionHooks: Send + Sync {
    async fn after_selection(
        &self,
        context: &ToolContext,
        selected_tool: &str,
        confidence: f64,
        reasoning: &[String],
    );
}

/// 委托给 tracing 的执行钩子：每次调用输出结构化审计事件
#[derive(Debug, Default)]
pub struct LoggingToolHooks;

#[async_trait]
impl ToolHooks for LoggingToolHooks {
    async fn before_execution(&self, context: &ToolContext) {
        let audit = serde_json::json!({
            "event": "tool_before",
            "tool": context.tool_name,
            "task_id": context.task_id,
            "inputs": context.inputs,
        });
        tracing::info!(audit = %audit.to_string(), "tool");
    }

    async fn after_execution(&self, context: &ToolContext, result: Option<&Value>, error: Option<&str>) {
        let audit = serde_json::json!({
            "event": "tool_after",
            "tool": context.tool_name,
            "task_id": context.task_id,
            "ok": error.is_none(),
            "result": result,
            "error": error,
        });
        if error.is_some() {
            tracing::error!(audit = %audit.to_string(), "tool");
        } else {
            tracing::info!(audit = %audit.to_string(), "tool");
        }
    }
}

/// 委托给 tracing 的选择钩子
#[derive(Debug, Default)]
pub struct LoggingSelectionHooks;

#[async_trait]
impl ToolSelectionHooks for LoggingSelectionHooks {
    async fn after_selection(
        &self,
        context: &ToolContext,
        selected_tool: &str,
        confidence: f64,
        reasoning: &[String],
    ) {
        tracing::info!(
            tool = selected_tool,
            confidence,
            task_id = %context.task_id,
            reasoning = ?reasoning,
            "tool selected"
        );
    }
}
