//! Agent 错误类型
//!
//! 按错误种类分为带标签的枚举（注册冲突 / 工具缺失 / 输入解析 / 工具执行 / 规划 / 配置 / LLM），
//! 调用方通过 match 变体区分「配置错误」「规划失败」「工具失败」，而不是解析错误消息文本。

use thiserror::Error;

/// Agent 运行过程中可能出现的错误
#[derive(Error, Debug)]
pub enum AgentError {
    /// 注册阶段的致命配置错误：同名工具重复注册
    #[error("Tool {0} is already registered")]
    DuplicateTool(String),

    /// 计划引用了注册表中不存在的工具，任务中止
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// 必填输入无法从映射 / 状态 / 任务文本中解析出值
    #[error("Could not resolve input `{property}` for tool {tool}")]
    InputResolution { tool: String, property: String },

    /// 工具 execute 返回失败，携带工具名与原始原因
    #[error("Tool {tool} execution failed: {message}")]
    ToolExecution { tool: String, message: String },

    /// 规划响应无法通过 TaskAnalysis 结构校验
    #[error("Planning failed: {0}")]
    Planning(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// LLM 协作方调用失败（规划请求之外的补全，如结果格式化）
    #[error("LLM error: {0}")]
    Llm(String),
}
