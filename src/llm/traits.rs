//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / Mock）实现 LlmClient：complete（普通补全，可携带工具列表）、
//! complete_structured（结构化输出，强制函数调用并返回 JSON）。引擎中只有 Planner 与
//! 结果格式化器会调用它，其余部分与具体 API 无关。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Assistant,
    System,
}

/// 单条消息
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// 模型请求执行的一次工具调用
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: Value,
}

/// 普通补全的结果：自由文本或工具调用请求（二者可同时存在）
#[derive(Clone, Debug, Default)]
pub struct ChatOutcome {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolInvocation>,
}

/// LLM 客户端 trait
///
/// 错误以 String 形式返回，由调用方（Planner / Formatter）映射为 AgentError；
/// 重试策略（若有）属于具体实现，核心不做重试。
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 普通补全；tools 为函数调用格式的工具描述列表（可选）
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[Value]>,
    ) -> Result<ChatOutcome, String>;

    /// 结构化补全：强制模型输出符合 schema 的 JSON 对象
    async fn complete_structured(
        &self,
        messages: &[ChatMessage],
        name: &str,
        schema: &Value,
    ) -> Result<Value, String>;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}

impl std::fmt::Debug for dyn LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("LlmClient")
    }
}
