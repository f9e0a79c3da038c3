//! Mock LLM 客户端（用于测试与无 Key 运行）
//!
//! 预置脚本化回复队列：complete 按序弹出文本回复，complete_structured 按序弹出 JSON 对象，
//! 队列耗尽时返回回显文本 / 错误，便于离线跑通「规划 → 执行 → 格式化」全流程。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::llm::{ChatMessage, ChatOutcome, LlmClient, Role};

/// Mock 客户端：脚本化回复
#[derive(Debug, Default)]
pub struct MockLlmClient {
    replies: Mutex<VecDeque<String>>,
    structured: Mutex<VecDeque<Value>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条普通补全回复
    pub fn push_reply(self, reply: impl Into<String>) -> Self {
        self.replies.lock().unwrap().push_back(reply.into());
        self
    }

    /// 追加一条结构化补全回复
    pub fn push_structured(self, value: Value) -> Self {
        self.structured.lock().unwrap().push_back(value);
        self
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _tools: Option<&[Value]>,
    ) -> Result<ChatOutcome, String> {
        if let Some(reply) = self.replies.lock().unwrap().pop_front() {
            return Ok(ChatOutcome {
                content: Some(reply),
                tool_calls: Vec::new(),
            });
        }

        // 队列耗尽时回显最后一条 User 消息，保持无 Key 场景可用
        let last_user = messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, Role::User))
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");

        Ok(ChatOutcome {
            content: Some(format!("Echo from Mock: {}", last_user)),
            tool_calls: Vec::new(),
        })
    }

    async fn complete_structured(
        &self,
        _messages: &[ChatMessage],
        name: &str,
        _schema: &Value,
    ) -> Result<Value, String> {
        self.structured
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| format!("MockLlmClient: no scripted structured reply for {}", name))
    }
}
