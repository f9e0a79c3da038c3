//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `MAESTRO__*` 覆盖（双下划线表示嵌套，
//! 如 `MAESTRO__LLM__MODEL=gpt-4o`）。

use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;

use crate::core::AgentError;
use crate::llm::{LlmClient, MockLlmClient, OpenAiClient};

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub agent: AgentSection,
    #[serde(default)]
    pub telemetry: TelemetrySection,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmSection::default(),
            agent: AgentSection::default(),
            telemetry: TelemetrySection::default(),
        }
    }
}

/// [llm] 段：后端与模型
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：openai（兼容端点）/ mock
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

/// [agent] 段：解析器的具名上下文键（可绑定到调用方上下文串的属性名）
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AgentSection {
    #[serde(default)]
    pub context_keys: Vec<String>,
}

/// [telemetry] 段
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySection {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,
}

impl Default for TelemetrySection {
    fn default() -> Self {
        Self {
            enabled: default_telemetry_enabled(),
        }
    }
}

fn default_telemetry_enabled() -> bool {
    false
}

/// 从 config 目录加载配置，环境变量 MAESTRO__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 MAESTRO__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("MAESTRO")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

/// 根据配置与环境变量选择 LLM 后端（OpenAI 兼容 / Mock）
///
/// provider=mock 或未设置 OPENAI_API_KEY 时回落到 Mock 客户端；
/// 未知 provider 是配置错误。
pub fn create_llm_from_config(cfg: &AppConfig) -> Result<Arc<dyn LlmClient>, AgentError> {
    let provider = cfg.llm.provider.to_lowercase();
    match provider.as_str() {
        "openai" => {
            if std::env::var("OPENAI_API_KEY").is_ok() {
                tracing::info!("Using OpenAI-compatible LLM ({})", cfg.llm.model);
                Ok(Arc::new(OpenAiClient::new(
                    cfg.llm.base_url.as_deref(),
                    &cfg.llm.model,
                    std::env::var("OPENAI_API_KEY").ok().as_deref(),
                )))
            } else {
                tracing::warn!("OPENAI_API_KEY not set, using Mock LLM");
                Ok(Arc::new(MockLlmClient::new()))
            }
        }
        "mock" => Ok(Arc::new(MockLlmClient::new())),
        other => Err(AgentError::Configuration(format!(
            "unknown llm provider: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.llm.provider, "openai");
        assert_eq!(cfg.llm.model, "gpt-4o-mini");
        assert!(cfg.agent.context_keys.is_empty());
        assert!(!cfg.telemetry.enabled);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("maestro.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[llm]\nprovider = \"mock\"\nmodel = \"test-model\"\n\n[agent]\ncontext_keys = [\"news_context\"]"
        )
        .unwrap();

        let cfg = load_config(Some(path)).unwrap();
        assert_eq!(cfg.llm.provider, "mock");
        assert_eq!(cfg.llm.model, "test-model");
        assert_eq!(cfg.agent.context_keys, vec!["news_context"]);
    }

    #[test]
    fn test_unknown_provider_is_configuration_error() {
        let mut cfg = AppConfig::default();
        cfg.llm.provider = "galileo".to_string();

        let err = create_llm_from_config(&cfg).unwrap_err();
        assert!(matches!(err, AgentError::Configuration(_)));
    }
}
