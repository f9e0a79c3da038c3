//! 任务规划器
//!
//! 把任务文本与注册表投影成一次结构化输出请求：system 指令枚举全部工具的
//! 名称 / 描述 / 标签 / Schema，并要求返回与 TaskAnalysis 完全一致的 JSON。
//! 响应校验失败即 Planning 错误，任何工具都不会执行；规划器自身不做重试。

use std::collections::HashMap;
use std::sync::Arc;

use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use crate::core::AgentError;
use crate::llm::{ChatMessage, LlmClient};
use crate::tools::ToolRegistry;

/// 计划中的一个步骤
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct PlanStep {
    /// 要调用的工具名
    pub tool: String,
    /// 选择该工具的理由
    pub reasoning: String,
    /// 可选的显式输入映射：输入名 -> 值引用（`工具名.字段` / 工具名 / 字面值）
    #[serde(default)]
    pub input_mapping: Option<HashMap<String, String>>,
}

/// 规划器的结构化输出
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct TaskAnalysis {
    /// 对任务要求与约束的分析
    pub input_analysis: String,
    /// 规划时考虑过的工具
    pub available_tools: Vec<String>,
    /// 工具 -> 能力标签
    pub tool_capabilities: HashMap<String, Vec<String>>,
    /// 权威执行序列，引擎按数组顺序执行
    pub execution_plan: Vec<PlanStep>,
    /// 需求 -> 满足它的工具（信息性）
    pub requirements_coverage: HashMap<String, Vec<String>>,
    /// 逐步推理过程
    pub chain_of_thought: Vec<String>,
}

/// 任务规划器：持有 LLM 客户端
pub struct TaskPlanner {
    llm: Arc<dyn LlmClient>,
}

impl TaskPlanner {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// 生成执行计划；结构校验失败返回 Planning 错误
    pub async fn plan(&self, task: &str, registry: &ToolRegistry) -> Result<TaskAnalysis, AgentError> {
        let messages = build_planning_messages(task, registry);
        let schema = serde_json::to_value(schema_for!(TaskAnalysis))
            .map_err(|e| AgentError::Planning(e.to_string()))?;

        let response = self
            .llm
            .complete_structured(&messages, "task_analysis", &schema)
            .await
            .map_err(AgentError::Planning)?;

        serde_json::from_value(response)
            .map_err(|e| AgentError::Planning(format!("invalid TaskAnalysis: {}", e)))
    }
}

/// 构建规划消息（独立函数便于测试 prompt 内容）
pub fn build_planning_messages(task: &str, registry: &ToolRegistry) -> Vec<ChatMessage> {
    let tools_description = registry
        .contracts()
        .map(|c| {
            format!(
                "Tool: {}\nDescription: {}\nTags: {}\nInput Schema: {}\nOutput Schema: {}\n",
                c.name,
                c.description,
                c.tags.join(", "),
                c.input.to_parameters(),
                c.output.to_parameters(),
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let system_prompt = format!(
        "You are an intelligent task planning system. Your role is to analyze tasks and create detailed execution plans.\n\n\
         You MUST provide a complete response with ALL of the following components:\n\n\
         1. input_analysis: A thorough analysis of the task requirements and constraints\n\
         2. available_tools: List of all tools that could potentially be used\n\
         3. tool_capabilities: A mapping of each available tool to its key capabilities\n\
         4. execution_plan: A list of steps, where each step has:\n\
            - tool: The name of the tool to use\n\
            - reasoning: Why this tool was chosen for this step\n\
            - input_mapping (optional): input name -> value reference ('tool.field', a tool name, or a literal)\n\
         5. requirements_coverage: How each requirement is covered by which tools\n\
         6. chain_of_thought: Your step-by-step reasoning process\n\n\
         Available Tools:\n{}\n\n\
         Ensure ALL fields are present and properly formatted. Missing fields will cause errors.",
        tools_description
    );

    vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user(format!(
            "Task: {}\n\nAnalyze this task and create a complete execution plan with ALL required fields.",
            task
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::tools::CalculateTool;
    use serde_json::json;

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry
            .register(CalculateTool::contract(), || CalculateTool)
            .unwrap();
        registry
    }

    #[test]
    fn test_planning_prompt_enumerates_tools() {
        let messages = build_planning_messages("add numbers", &registry());

        assert_eq!(messages.len(), 2);
        let system = &messages[0].content;
        assert!(system.contains("Tool: calculate"));
        assert!(system.contains("Tags: math, arithmetic"));
        assert!(system.contains("execution_plan"));
        assert!(messages[1].content.contains("Task: add numbers"));
    }

    #[tokio::test]
    async fn test_plan_parses_structured_response() {
        let llm = Arc::new(MockLlmClient::new().push_structured(json!({
            "input_analysis": "simple arithmetic",
            "available_tools": ["calculate"],
            "tool_capabilities": {"calculate": ["math"]},
            "execution_plan": [
                {"tool": "calculate", "reasoning": "evaluate the expression"}
            ],
            "requirements_coverage": {"arithmetic": ["calculate"]},
            "chain_of_thought": ["use calculate"]
        })));

        let plan = TaskPlanner::new(llm)
            .plan("what is 1 + 1", &registry())
            .await
            .unwrap();
        assert_eq!(plan.execution_plan.len(), 1);
        assert_eq!(plan.execution_plan[0].tool, "calculate");
        assert!(plan.execution_plan[0].input_mapping.is_none());
    }

    #[tokio::test]
    async fn test_invalid_response_is_planning_error() {
        let llm = Arc::new(MockLlmClient::new().push_structured(json!({
            "input_analysis": "missing the rest"
        })));

        let err = TaskPlanner::new(llm)
            .plan("task", &registry())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Planning(_)));
    }
}
