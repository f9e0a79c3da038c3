//! Maestro - 工具编排智能体引擎
//!
//! 入口：初始化日志、装配 Agent（内置工具），执行命令行给出的任务并打印结果。
//! 引擎核心不含 CLI 逻辑，这里只是一个薄调用方。

use std::sync::Arc;

use anyhow::Context;
use maestro::agent::{AgentBuilder, LoggingSelectionHooks, LoggingToolHooks};
use maestro::config::{create_llm_from_config, load_config, AppConfig};
use maestro::observability::TracingTelemetry;
use maestro::tools::{CalculateTool, EchoTool, TextToNumberTool};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    maestro::observability::init();

    let cfg = load_config(None).unwrap_or_else(|_| AppConfig::default());
    let llm = create_llm_from_config(&cfg).context("Failed to create LLM client")?;

    let task = std::env::args()
        .skip(1)
        .collect::<Vec<_>>()
        .join(" ");
    let task = if task.is_empty() {
        "What's 4 + seven?".to_string()
    } else {
        task
    };

    let mut builder = AgentBuilder::new()
        .llm(llm)
        .register(TextToNumberTool::contract(), || TextToNumberTool)?
        .register(CalculateTool::contract(), || CalculateTool)?
        .register(EchoTool::contract(), || EchoTool)?
        .tool_hooks(Arc::new(LoggingToolHooks))
        .selection_hooks(Arc::new(LoggingSelectionHooks))
        .context_keys(&cfg.agent.context_keys.iter().map(String::as_str).collect::<Vec<_>>());
    if cfg.telemetry.enabled {
        builder = builder.telemetry(Arc::new(TracingTelemetry));
    }
    let mut agent = builder.build().context("Failed to build agent")?;

    let output = agent.run(&task).await.context("Task failed")?;
    println!("{}", output);

    Ok(())
}
