//! Maestro - 工具编排智能体引擎
//!
//! 模块划分：
//! - **agent**: 状态存储、任务记录、生命周期钩子、输入解析、规划器与执行引擎
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **observability**: 日志初始化与遥测句柄
//! - **tools**: 工具契约、注册表与内置工具（convert / calculate / echo）

pub mod agent;
pub mod config;
pub mod core;
pub mod llm;
pub mod observability;
pub mod tools;

pub use agent::{Agent, AgentBuilder};
pub use core::AgentError;
