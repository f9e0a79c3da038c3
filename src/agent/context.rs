//! 工具执行上下文
//!
//! 每个步骤执行前即时构建的只读快照，传给生命周期钩子做观测；步骤之间不缓存。

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::agent::planner::TaskAnalysis;
use crate::agent::task::{HistoryEntry, TaskExecution};

/// 单次工具调用的只读上下文
#[derive(Clone, Debug)]
pub struct ToolContext {
    /// 当前任务文本
    pub task: String,
    /// 本步骤要执行的工具名
    pub tool_name: String,
    /// 已解析的输入
    pub inputs: Value,
    /// 注册表全部工具的函数调用投影（{name, description, parameters}）
    pub available_tools: Vec<Value>,
    /// 之前已执行的工具名（按执行顺序）
    pub previous_tools: Vec<String>,
    /// 之前步骤的结果
    pub previous_results: Vec<Value>,
    /// 之前步骤的错误（任务在首次失败时即中止，通常为空）
    pub previous_errors: Vec<String>,
    /// 到目前为止的消息 / 工具调用历史
    pub message_history: Vec<HistoryEntry>,
    pub agent_id: String,
    pub task_id: String,
    pub start_time: DateTime<Utc>,
    /// Agent 配置附带的元数据
    pub metadata: HashMap<String, Value>,
    /// 当前执行计划（供钩子观测）
    pub plan: Option<TaskAnalysis>,
}

impl ToolContext {
    /// 从当前任务记录与历史构建快照
    pub fn build(
        execution: &TaskExecution,
        tool_name: &str,
        inputs: &Value,
        available_tools: Vec<Value>,
        message_history: &[HistoryEntry],
        metadata: &HashMap<String, Value>,
        plan: Option<&TaskAnalysis>,
    ) -> Self {
        Self {
            task: execution.input.clone(),
            tool_name: tool_name.to_string(),
            inputs: inputs.clone(),
            available_tools,
            previous_tools: execution.steps.iter().map(|s| s.tool_name.clone()).collect(),
            previous_results: execution.steps.iter().map(|s| s.output.clone()).collect(),
            previous_errors: Vec::new(),
            message_history: message_history.to_vec(),
            agent_id: execution.agent_id.clone(),
            task_id: execution.task_id.clone(),
            start_time: execution.start_time,
            metadata: metadata.clone(),
            plan: plan.cloned(),
        }
    }
}
