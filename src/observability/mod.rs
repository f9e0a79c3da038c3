//! 可观测性
//!
//! tracing 初始化 + 可选遥测句柄。遥测是构造时显式注入的依赖（没有全局单例）；
//! 未配置时引擎行为完全不变，所有调用都是机会性的、不在成功路径上。

use serde_json::Value;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 初始化日志：默认 info，可通过 RUST_LOG 覆盖
pub fn init() {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .with(fmt::layer())
        .init();
}

/// 遥测句柄：记录 trace 与 span，只写不读
pub trait Telemetry: Send + Sync {
    fn start_trace(&self, name: &str);

    fn add_span(&self, kind: &str, input: &str, output: &str, metadata: &Value);

    fn conclude(&self, output: Option<&str>, error: Option<&str>);

    fn flush(&self);
}

/// 基于 tracing 的遥测实现：span 以结构化事件形式输出
#[derive(Debug, Default)]
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
    fn start_trace(&self, name: &str) {
        tracing::info!(trace = name, "trace started");
    }

    fn add_span(&self, kind: &str, input: &str, output: &str, metadata: &Value) {
        let span = serde_json::json!({
            "event": "span",
            "kind": kind,
            "input": input,
            "output": output,
            "metadata": metadata,
        });
        tracing::info!(span = %span.to_string(), "telemetry");
    }

    fn conclude(&self, output: Option<&str>, error: Option<&str>) {
        tracing::info!(output, error, "trace concluded");
    }

    fn flush(&self) {}
}
