//! 引擎集成测试
//!
//! 用脚本化 Mock LLM 驱动完整的「规划 -> 顺序执行 -> 格式化」流程，
//! 覆盖顺序性、未知工具、失败收尾、空计划与端到端算术场景。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use maestro::agent::{
    AgentBuilder, ResultFormatter, TaskStatus, ToolContext, ToolHooks,
};
use maestro::core::AgentError;
use maestro::llm::MockLlmClient;
use maestro::tools::{
    CalculateTool, PropertySpec, TextToNumberTool, Tool, ToolContract, ToolSchema, ValueType,
};

/// 返回一份最小合法 TaskAnalysis，steps 为 (tool, input_mapping) 列表
fn plan_json(steps: &[(&str, Value)]) -> Value {
    let plan_steps: Vec<Value> = steps
        .iter()
        .map(|(tool, mapping)| {
            let mut step = json!({
                "tool": tool,
                "reasoning": format!("use {}", tool),
            });
            if !mapping.is_null() {
                step["input_mapping"] = mapping.clone();
            }
            step
        })
        .collect();

    json!({
        "input_analysis": "analysis",
        "available_tools": steps.iter().map(|(t, _)| *t).collect::<Vec<_>>(),
        "tool_capabilities": {},
        "execution_plan": plan_steps,
        "requirements_coverage": {},
        "chain_of_thought": ["step by step"]
    })
}

/// 简单格式化器：拼接各工具结果，避免依赖 LLM 回复
struct JoinFormatter;

#[async_trait]
impl ResultFormatter for JoinFormatter {
    async fn format(&self, _task: &str, results: &[(String, Value)]) -> Result<String, String> {
        Ok(results
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; "))
    }
}

/// 断言调用时上下文中已有 expected 个前序结果的探针工具
struct ContextProbeTool;

impl ContextProbeTool {
    fn contract(name: &str) -> ToolContract {
        ToolContract::new(name, "Probe that records how many results precede it")
            .tags(&["testing"])
            .input(ToolSchema::empty())
            .output(ToolSchema::new(vec![PropertySpec::new(
                "ok",
                ValueType::Boolean,
                "Whether the probe ran",
            )]))
    }
}

#[async_trait]
impl Tool for ContextProbeTool {
    async fn execute(&self, _inputs: Value) -> Result<Value, String> {
        Ok(json!({ "ok": true }))
    }
}

/// 记录每次调用时 previous_results 长度的钩子
#[derive(Default)]
struct RecordingHooks {
    observed: Mutex<Vec<usize>>,
    available: Mutex<Vec<usize>>,
    before_count: AtomicUsize,
    after_count: AtomicUsize,
    errors: Mutex<Vec<String>>,
}

#[async_trait]
impl ToolHooks for RecordingHooks {
    async fn before_execution(&self, context: &ToolContext) {
        self.before_count.fetch_add(1, Ordering::SeqCst);
        self.observed
            .lock()
            .unwrap()
            .push(context.previous_results.len());
        self.available
            .lock()
            .unwrap()
            .push(context.available_tools.len());
    }

    async fn after_execution(&self, _context: &ToolContext, _result: Option<&Value>, error: Option<&str>) {
        self.after_count.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = error {
            self.errors.lock().unwrap().push(e.to_string());
        }
    }
}

/// 总是失败的工具
struct FailingTool;

impl FailingTool {
    fn contract() -> ToolContract {
        ToolContract::new("failing", "Always fails")
            .tags(&["testing"])
            .input(ToolSchema::empty())
    }
}

#[async_trait]
impl Tool for FailingTool {
    async fn execute(&self, _inputs: Value) -> Result<Value, String> {
        Err("simulated failure".to_string())
    }
}

#[tokio::test]
async fn test_end_to_end_four_plus_seven() {
    let llm = Arc::new(
        MockLlmClient::new()
            .push_structured(plan_json(&[
                ("convert_text_to_number", json!({"text": "seven"})),
                ("calculate", json!({"expression": "4 + 7"})),
            ]))
            .push_reply("The result of 4 + 7 is 11"),
    );

    let mut agent = AgentBuilder::new()
        .llm(llm)
        .register(TextToNumberTool::contract(), || TextToNumberTool)
        .unwrap()
        .register(CalculateTool::contract(), || CalculateTool)
        .unwrap()
        .build()
        .unwrap();

    let output = agent.run("What's 4 + seven?").await.unwrap();
    assert!(output.contains("11"));

    // 收尾后在途计划已清空
    assert!(agent.current_plan().is_none());

    let execution = agent.last_execution().unwrap();
    assert_eq!(execution.status, TaskStatus::Completed);
    assert!(execution.end_time.is_some());
    assert_eq!(execution.steps.len(), 2);
    assert_eq!(execution.steps[0].tool_name, "convert_text_to_number");
    assert_eq!(execution.steps[0].output["expression"], "7");
    assert_eq!(execution.steps[1].tool_name, "calculate");
    assert_eq!(execution.steps[1].output["result"], 11.0);
}

#[tokio::test]
async fn test_steps_run_sequentially_and_observe_prior_results() {
    let llm = Arc::new(MockLlmClient::new().push_structured(plan_json(&[
        ("probe_a", Value::Null),
        ("probe_b", Value::Null),
        ("probe_c", Value::Null),
    ])));
    let hooks = Arc::new(RecordingHooks::default());

    let mut agent = AgentBuilder::new()
        .llm(llm)
        .register(ContextProbeTool::contract("probe_a"), || ContextProbeTool)
        .unwrap()
        .register(ContextProbeTool::contract("probe_b"), || ContextProbeTool)
        .unwrap()
        .register(ContextProbeTool::contract("probe_c"), || ContextProbeTool)
        .unwrap()
        .tool_hooks(hooks.clone())
        .formatter(Arc::new(JoinFormatter))
        .build()
        .unwrap();

    agent.run("probe the pipeline").await.unwrap();

    // 第 1/2/3 个步骤调用时分别能看到 0/1/2 个前序结果
    assert_eq!(*hooks.observed.lock().unwrap(), vec![0, 1, 2]);
    assert_eq!(hooks.before_count.load(Ordering::SeqCst), 3);
    assert_eq!(hooks.after_count.load(Ordering::SeqCst), 3);
    // 每个步骤的上下文都携带全部 3 个工具的函数调用投影
    assert_eq!(*hooks.available.lock().unwrap(), vec![3, 3, 3]);
}

#[tokio::test]
async fn test_unknown_tool_fails_task_with_zero_tool_calls() {
    let llm = Arc::new(
        MockLlmClient::new().push_structured(plan_json(&[("does_not_exist", Value::Null)])),
    );
    let hooks = Arc::new(RecordingHooks::default());

    let mut agent = AgentBuilder::new()
        .llm(llm)
        .register(CalculateTool::contract(), || CalculateTool)
        .unwrap()
        .tool_hooks(hooks.clone())
        .build()
        .unwrap();

    let err = agent.run("use a ghost tool").await.unwrap_err();
    assert!(matches!(err, AgentError::ToolNotFound(ref name) if name == "does_not_exist"));

    let execution = agent.last_execution().unwrap();
    assert_eq!(execution.status, TaskStatus::Failed);
    assert!(execution.error.as_deref().unwrap().contains("Tool not found"));
    assert!(execution.steps.is_empty());
    // 任何工具钩子都没有触发
    assert_eq!(hooks.before_count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_failure_finalization_preserves_partial_history() {
    let llm = Arc::new(MockLlmClient::new().push_structured(plan_json(&[
        ("convert_text_to_number", json!({"text": "seven"})),
        ("failing", Value::Null),
    ])));
    let hooks = Arc::new(RecordingHooks::default());

    let mut agent = AgentBuilder::new()
        .llm(llm)
        .register(TextToNumberTool::contract(), || TextToNumberTool)
        .unwrap()
        .register(FailingTool::contract(), || FailingTool)
        .unwrap()
        .tool_hooks(hooks.clone())
        .build()
        .unwrap();

    let err = agent.run("convert then fail").await.unwrap_err();
    assert!(matches!(err, AgentError::ToolExecution { ref tool, .. } if tool == "failing"));

    let execution = agent.last_execution().unwrap();
    assert_eq!(execution.status, TaskStatus::Failed);
    assert!(execution.end_time.is_some());
    assert!(execution
        .error
        .as_deref()
        .unwrap()
        .contains("simulated failure"));
    // 只保留失败之前已完成的步骤
    assert_eq!(execution.steps.len(), 1);
    assert_eq!(execution.steps[0].tool_name, "convert_text_to_number");

    // 失败步骤的钩子成对触发：2 次 before（convert、failing），2 次 after，其中 1 次带错误
    assert_eq!(hooks.before_count.load(Ordering::SeqCst), 2);
    assert_eq!(hooks.after_count.load(Ordering::SeqCst), 2);
    assert_eq!(*hooks.errors.lock().unwrap(), vec!["simulated failure"]);
}

#[tokio::test]
async fn test_planning_error_aborts_before_any_tool_runs() {
    // 响应缺字段，无法通过 TaskAnalysis 校验
    let llm = Arc::new(MockLlmClient::new().push_structured(json!({"input_analysis": "partial"})));
    let hooks = Arc::new(RecordingHooks::default());

    let mut agent = AgentBuilder::new()
        .llm(llm)
        .register(CalculateTool::contract(), || CalculateTool)
        .unwrap()
        .tool_hooks(hooks.clone())
        .build()
        .unwrap();

    let err = agent.run("plan badly").await.unwrap_err();
    assert!(matches!(err, AgentError::Planning(_)));

    let execution = agent.last_execution().unwrap();
    assert_eq!(execution.status, TaskStatus::Failed);
    assert!(execution.steps.is_empty());
    assert_eq!(hooks.before_count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_empty_plan_goes_straight_to_formatting() {
    let llm = Arc::new(MockLlmClient::new().push_structured(plan_json(&[])));

    let mut agent = AgentBuilder::new()
        .llm(llm)
        .register(CalculateTool::contract(), || CalculateTool)
        .unwrap()
        .formatter(Arc::new(JoinFormatter))
        .build()
        .unwrap();

    let output = agent.run("nothing to do").await.unwrap();
    assert_eq!(output, "");

    let execution = agent.last_execution().unwrap();
    assert_eq!(execution.status, TaskStatus::Completed);
    assert!(execution.steps.is_empty());
}

#[tokio::test]
async fn test_unresolved_required_input_fails_the_task() {
    // 工具要求 Object 类型的必填输入，状态中没有可绑定的值
    struct NeedyTool;

    #[async_trait]
    impl Tool for NeedyTool {
        async fn execute(&self, _inputs: Value) -> Result<Value, String> {
            Ok(json!({}))
        }
    }

    let contract = ToolContract::new("needy", "Needs a payload")
        .input(ToolSchema::new(vec![PropertySpec::new(
            "payload",
            ValueType::Object,
            "Payload object",
        )
        .required()]));

    let llm = Arc::new(MockLlmClient::new().push_structured(plan_json(&[("needy", Value::Null)])));

    let mut agent = AgentBuilder::new()
        .llm(llm)
        .register(contract, || NeedyTool)
        .unwrap()
        .build()
        .unwrap();

    let err = agent.run("feed the needy tool").await.unwrap_err();
    match err {
        AgentError::InputResolution { tool, property } => {
            assert_eq!(tool, "needy");
            assert_eq!(property, "payload");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(
        agent.last_execution().unwrap().status,
        TaskStatus::Failed
    );
}

#[tokio::test]
async fn test_independent_agents_share_one_registry() {
    let mut registry = maestro::tools::ToolRegistry::new();
    registry
        .register(CalculateTool::contract(), || CalculateTool)
        .unwrap();
    let registry = Arc::new(registry);

    let make_agent = |expr: &str, reply: &str| {
        let llm = Arc::new(
            MockLlmClient::new()
                .push_structured(plan_json(&[(
                    "calculate",
                    json!({"expression": expr}),
                )]))
                .push_reply(reply),
        );
        AgentBuilder::new()
            .llm(llm)
            .registry(registry.clone())
            .build()
            .unwrap()
    };

    let mut first = make_agent("1 + 2", "3");
    let mut second = make_agent("10 * 4", "40");

    // 注册表只读共享；每个任务各自持有状态与任务记录
    let (a, b) = tokio::join!(first.run("add"), second.run("multiply"));
    assert_eq!(a.unwrap(), "3");
    assert_eq!(b.unwrap(), "40");
    assert_eq!(
        first.last_execution().unwrap().steps[0].output["result"],
        3.0
    );
    assert_eq!(
        second.last_execution().unwrap().steps[0].output["result"],
        40.0
    );
}

#[tokio::test]
async fn test_explicit_mapping_projects_prior_tool_output() {
    // calculate 的 expression 通过点引用取自 convert 的输出字段
    let llm = Arc::new(
        MockLlmClient::new()
            .push_structured(plan_json(&[
                ("convert_text_to_number", json!({"text": "4 + seven"})),
                (
                    "calculate",
                    json!({"expression": "convert_text_to_number.expression"}),
                ),
            ]))
            .push_reply("The result of 4 + 7 is 11"),
    );

    let mut agent = AgentBuilder::new()
        .llm(llm)
        .register(TextToNumberTool::contract(), || TextToNumberTool)
        .unwrap()
        .register(CalculateTool::contract(), || CalculateTool)
        .unwrap()
        .build()
        .unwrap();

    let output = agent.run("What's 4 + seven?").await.unwrap();
    assert!(output.contains("11"));

    let execution = agent.last_execution().unwrap();
    assert_eq!(execution.steps[1].inputs["expression"], "4 + 7");
}
