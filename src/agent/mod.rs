//! Agent 层：状态、任务记录、钩子、上下文、输入解析、规划与执行引擎

pub mod context;
pub mod engine;
pub mod hooks;
pub mod planner;
pub mod resolver;
pub mod state;
pub mod task;

pub use context::ToolContext;
pub use engine::{Agent, AgentBuilder, AgentConfig, LlmFormatter, ResultFormatter};
pub use hooks::{LoggingSelectionHooks, LoggingToolHooks, ToolHooks, ToolSelectionHooks};
pub use planner::{build_planning_messages, PlanStep, TaskAnalysis, TaskPlanner};
pub use resolver::{resolve_inputs, ResolverHints};
pub use state::AgentState;
pub use task::{HistoryEntry, StepRecord, TaskExecution, TaskStatus};
