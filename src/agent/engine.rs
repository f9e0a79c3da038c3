//! 执行引擎
//!
//! 单任务状态机：Created -> Planning -> Executing(i) -> Formatting -> Completed | Failed。
//! 步骤严格按计划数组顺序执行，绝不重排 / 去重 / 并行；步骤 i+1 必须等 i 的工具调用、
//! 钩子与状态写入全部完成。收尾块在每条退出路径上执行终态记账。

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::agent::context::ToolContext;
use crate::agent::hooks::{ToolHooks, ToolSelectionHooks};
use crate::agent::planner::{PlanStep, TaskAnalysis, TaskPlanner};
use crate::agent::resolver::{resolve_inputs, ResolverHints};
use crate::agent::state::AgentState;
use crate::agent::task::{HistoryEntry, StepRecord, TaskExecution, TaskStatus};
use crate::core::AgentError;
use crate::llm::{ChatMessage, LlmClient};
use crate::observability::Telemetry;
use crate::tools::{ToolContract, ToolRegistry};

/// Agent 配置：元数据与解析提示
#[derive(Clone, Debug, Default)]
pub struct AgentConfig {
    /// 附加元数据，原样进入每个 ToolContext
    pub metadata: HashMap<String, Value>,
    /// 输入解析兜底提示
    pub hints: ResolverHints,
}

/// 结果格式化器：把 (工具名, 结果) 序列组合为最终回答
#[async_trait::async_trait]
pub trait ResultFormatter: Send + Sync {
    async fn format(&self, task: &str, results: &[(String, Value)]) -> Result<String, String>;
}

/// 默认格式化器：再做一次补全，把工具输出汇总成面向用户的回答
pub struct LlmFormatter {
    llm: Arc<dyn LlmClient>,
}

impl LlmFormatter {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait::async_trait]
impl ResultFormatter for LlmFormatter {
    async fn format(&self, task: &str, results: &[(String, Value)]) -> Result<String, String> {
        let results_text = results
            .iter()
            .map(|(name, value)| format!("{}: {}", name, value))
            .collect::<Vec<_>>()
            .join("\n");

        let messages = vec![
            ChatMessage::system(
                "You are a helpful assistant. Compose a concise final answer to the user's task \
                 from the tool results below. Answer directly; do not describe the tools.",
            ),
            ChatMessage::user(format!("Task: {}\n\nTool results:\n{}", task, results_text)),
        ];

        let outcome = self.llm.complete(&messages, None).await?;
        outcome
            .content
            .ok_or_else(|| "formatter completion returned no content".to_string())
    }
}

/// Agent 构建器：注册工具、注入 LLM / 钩子 / 遥测，一次性完成装配
pub struct AgentBuilder {
    agent_id: Option<String>,
    llm: Option<Arc<dyn LlmClient>>,
    registry: ToolRegistry,
    shared_registry: Option<Arc<ToolRegistry>>,
    formatter: Option<Arc<dyn ResultFormatter>>,
    tool_hooks: Option<Arc<dyn ToolHooks>>,
    selection_hooks: Option<Arc<dyn ToolSelectionHooks>>,
    telemetry: Option<Arc<dyn Telemetry>>,
    config: AgentConfig,
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            agent_id: None,
            llm: None,
            registry: ToolRegistry::new(),
            shared_registry: None,
            formatter: None,
            tool_hooks: None,
            selection_hooks: None,
            telemetry: None,
            config: AgentConfig::default(),
        }
    }

    pub fn agent_id(mut self, id: impl Into<String>) -> Self {
        self.agent_id = Some(id.into());
        self
    }

    pub fn llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// 注册工具契约与实现工厂；同名重复注册立即报错（致命配置错误）
    pub fn register<F, T>(mut self, contract: ToolContract, factory: F) -> Result<Self, AgentError>
    where
        F: Fn() -> T + Send + Sync + 'static,
        T: crate::tools::Tool + 'static,
    {
        self.registry.register(contract, factory)?;
        Ok(self)
    }

    /// 复用已构建的注册表（多个 Agent 并发执行独立任务时共享，注册表构造后只读）；
    /// 与 register 互斥
    pub fn registry(mut self, registry: Arc<ToolRegistry>) -> Self {
        self.shared_registry = Some(registry);
        self
    }

    pub fn formatter(mut self, formatter: Arc<dyn ResultFormatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// 注册表填充完毕后挂接执行钩子（所有工具共享）
    pub fn tool_hooks(mut self, hooks: Arc<dyn ToolHooks>) -> Self {
        self.tool_hooks = Some(hooks);
        self
    }

    pub fn selection_hooks(mut self, hooks: Arc<dyn ToolSelectionHooks>) -> Self {
        self.selection_hooks = Some(hooks);
        self
    }

    pub fn telemetry(mut self, telemetry: Arc<dyn Telemetry>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.config.metadata.insert(key.into(), value);
        self
    }

    /// 设置解析器的保留上下文串
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.config.hints.context = Some(context.into());
        self
    }

    /// 允许绑定到上下文串的属性名
    pub fn context_keys(mut self, keys: &[&str]) -> Self {
        self.config.hints.context_keys = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    /// 任务级调用方参数
    pub fn parameter(mut self, name: impl Into<String>, value: Value) -> Self {
        self.config.hints.parameters.insert(name.into(), value);
        self
    }

    pub fn build(self) -> Result<Agent, AgentError> {
        let llm = self
            .llm
            .ok_or_else(|| AgentError::Configuration("LLM provider not configured".to_string()))?;
        let formatter = self
            .formatter
            .unwrap_or_else(|| Arc::new(LlmFormatter::new(llm.clone())));
        let registry = match self.shared_registry {
            Some(shared) => {
                if !self.registry.is_empty() {
                    return Err(AgentError::Configuration(
                        "cannot combine a shared registry with builder-registered tools"
                            .to_string(),
                    ));
                }
                shared
            }
            None => Arc::new(self.registry),
        };

        Ok(Agent {
            agent_id: self.agent_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            config: self.config,
            registry,
            planner: TaskPlanner::new(llm),
            formatter,
            tool_hooks: self.tool_hooks,
            selection_hooks: self.selection_hooks,
            telemetry: self.telemetry,
            state: AgentState::new(),
            message_history: Vec::new(),
            current_plan: None,
            last_execution: None,
        })
    }
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 工具编排 Agent
pub struct Agent {
    agent_id: String,
    config: AgentConfig,
    registry: Arc<ToolRegistry>,
    planner: TaskPlanner,
    formatter: Arc<dyn ResultFormatter>,
    tool_hooks: Option<Arc<dyn ToolHooks>>,
    selection_hooks: Option<Arc<dyn ToolSelectionHooks>>,
    telemetry: Option<Arc<dyn Telemetry>>,
    state: AgentState,
    message_history: Vec<HistoryEntry>,
    current_plan: Option<TaskAnalysis>,
    last_execution: Option<TaskExecution>,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("agent_id", &self.agent_id)
            .finish_non_exhaustive()
    }
}

impl Agent {
    pub fn builder() -> AgentBuilder {
        AgentBuilder::new()
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// 只读注册表（构造后不再变更，可与其他 Agent 共享）
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// 任务开始前可由调用方预置状态变量
    pub fn state_mut(&mut self) -> &mut AgentState {
        &mut self.state
    }

    /// 最近一次任务的完整记录
    pub fn last_execution(&self) -> Option<&TaskExecution> {
        self.last_execution.as_ref()
    }

    /// 在途计划（任务收尾时清空）
    pub fn current_plan(&self) -> Option<&TaskAnalysis> {
        self.current_plan.as_ref()
    }

    /// 执行一次任务：规划 -> 顺序执行 -> 格式化；返回最终回答或首个失败
    pub async fn run(&mut self, task: &str) -> Result<String, AgentError> {
        let mut execution = TaskExecution::new(self.agent_id.clone(), task);
        tracing::info!(agent_id = %self.agent_id, task_id = %execution.task_id, task, "task started");
        if let Some(telemetry) = &self.telemetry {
            telemetry.start_trace("agent_task");
        }

        let result = self.run_inner(task, &mut execution).await;

        // 收尾：每条退出路径都要经过这里（end_time、状态定稿、清理在途计划与状态）
        execution.end_time = Some(Utc::now());
        match &result {
            Ok(output) => {
                execution.output = Some(output.clone());
                if execution.status == TaskStatus::InProgress {
                    execution.status = TaskStatus::Completed;
                }
                tracing::info!(task_id = %execution.task_id, "task completed");
            }
            Err(e) => {
                execution.error = Some(e.to_string());
                execution.status = TaskStatus::Failed;
                tracing::error!(task_id = %execution.task_id, error = %e, "task failed");
            }
        }
        self.current_plan = None;
        self.state.clear();
        if let Some(telemetry) = &self.telemetry {
            telemetry.conclude(execution.output.as_deref(), execution.error.as_deref());
            telemetry.flush();
        }
        self.last_execution = Some(execution);

        result
    }

    async fn run_inner(
        &mut self,
        task: &str,
        execution: &mut TaskExecution,
    ) -> Result<String, AgentError> {
        let plan = self.planner.plan(task, &self.registry).await?;
        if let Some(telemetry) = &self.telemetry {
            telemetry.add_span(
                "planner",
                task,
                &plan.input_analysis,
                &json!({"steps": plan.execution_plan.len()}),
            );
        }
        tracing::debug!(steps = plan.execution_plan.len(), "plan ready");
        self.current_plan = Some(plan.clone());

        // 空计划合法：直接进入格式化，结果列表为空
        let mut results: Vec<(String, Value)> = Vec::new();
        for step in &plan.execution_plan {
            let output = self.execute_step(step, task, &plan, execution).await?;
            results.push((step.tool.clone(), output));
        }

        self.formatter
            .format(task, &results)
            .await
            .map_err(AgentError::Llm)
    }

    /// 执行计划中的一个步骤
    async fn execute_step(
        &mut self,
        step: &PlanStep,
        task: &str,
        plan: &TaskAnalysis,
        execution: &mut TaskExecution,
    ) -> Result<Value, AgentError> {
        // 未注册的工具立即失败，不做任何输入解析
        let contract = self
            .registry
            .get(&step.tool)
            .ok_or_else(|| AgentError::ToolNotFound(step.tool.clone()))?;

        let inputs = resolve_inputs(
            contract,
            task,
            step.input_mapping.as_ref(),
            &self.state,
            &self.config.hints,
        )?;

        let context = ToolContext::build(
            execution,
            &step.tool,
            &inputs,
            self.registry.call_specs(),
            &self.message_history,
            &self.config.metadata,
            Some(plan),
        );

        // 选择已在规划时完成，这里事后通知
        if let Some(hooks) = &self.selection_hooks {
            hooks
                .after_selection(&context, &step.tool, 1.0, std::slice::from_ref(&step.reasoning))
                .await;
        }
        if let Some(hooks) = &self.tool_hooks {
            hooks.before_execution(&context).await;
        }

        let factory = self
            .registry
            .implementation(&step.tool)
            .ok_or_else(|| AgentError::ToolNotFound(step.tool.clone()))?;
        let tool = factory();

        match tool.execute(inputs.clone()).await {
            Ok(output) => {
                self.state.set_tool_result(&step.tool, output.clone());
                self.message_history.push(HistoryEntry {
                    tool_name: step.tool.clone(),
                    inputs: inputs.clone(),
                    result: output.clone(),
                    reasoning: step.reasoning.clone(),
                    timestamp: Utc::now(),
                });
                if let Some(hooks) = &self.tool_hooks {
                    hooks.after_execution(&context, Some(&output), None).await;
                }
                execution.steps.push(StepRecord {
                    tool_name: step.tool.clone(),
                    inputs,
                    output: output.clone(),
                    reasoning: step.reasoning.clone(),
                    timestamp: Utc::now(),
                });
                if let Some(telemetry) = &self.telemetry {
                    telemetry.add_span(
                        "tool",
                        &context.inputs.to_string(),
                        &output.to_string(),
                        &json!({"tool": step.tool}),
                    );
                }
                Ok(output)
            }
            Err(message) => {
                // 失败的步骤也要成对触发 before/after 钩子
                if let Some(hooks) = &self.tool_hooks {
                    hooks.after_execution(&context, None, Some(&message)).await;
                }
                if let Some(telemetry) = &self.telemetry {
                    telemetry.add_span(
                        "tool",
                        &context.inputs.to_string(),
                        "",
                        &json!({"tool": step.tool, "error": message}),
                    );
                }
                Err(AgentError::ToolExecution {
                    tool: step.tool.clone(),
                    message,
                })
            }
        }
    }
}
