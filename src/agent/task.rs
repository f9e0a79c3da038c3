//! 任务执行记录
//!
//! TaskExecution 是一次任务运行的完整档案：输入、按序步骤、最终输出、起止时间与终态。
//! 引擎在步骤完成时追加记录，收尾块无论成败都会盖章 end_time 并定稿状态。

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// 任务状态
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    InProgress,
    Completed,
    Failed,
}

/// 单个已执行步骤的记录
#[derive(Clone, Debug, Serialize)]
pub struct StepRecord {
    pub tool_name: String,
    pub inputs: Value,
    pub output: Value,
    /// 计划中该步骤的选择理由
    pub reasoning: String,
    pub timestamp: DateTime<Utc>,
}

/// 一次任务运行的完整记录
#[derive(Clone, Debug, Serialize)]
pub struct TaskExecution {
    pub task_id: String,
    pub agent_id: String,
    /// 原始任务文本
    pub input: String,
    /// 已完成步骤（失败步骤不计入，失败前的历史保留）
    pub steps: Vec<StepRecord>,
    pub output: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: TaskStatus,
    pub error: Option<String>,
}

impl TaskExecution {
    pub fn new(agent_id: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            task_id: Uuid::new_v4().to_string(),
            agent_id: agent_id.into(),
            input: input.into(),
            steps: Vec::new(),
            output: None,
            start_time: Utc::now(),
            end_time: None,
            status: TaskStatus::InProgress,
            error: None,
        }
    }
}

/// 消息 / 工具调用历史条目（跨任务保留在 Agent 上，供上下文快照使用）
#[derive(Clone, Debug, Serialize)]
pub struct HistoryEntry {
    pub tool_name: String,
    pub inputs: Value,
    pub result: Value,
    pub reasoning: String,
    pub timestamp: DateTime<Utc>,
}
