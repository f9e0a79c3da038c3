//! 工具注册表
//!
//! 按名称维护两张并行映射：契约（元数据）与实现工厂（零参构造，产出实现 Tool trait 的实例）。
//! Agent 构造期间一次性填充，之后只读；同名重复注册是致命配置错误而非可恢复错误。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::AgentError;
use crate::tools::ToolContract;

/// 工具实现 trait：异步执行，输入输出均为 JSON
///
/// 实现方不携带元数据；名称 / 描述 / Schema 在注册时由 ToolContract 提供。
#[async_trait]
pub trait Tool: Send + Sync {
    /// 执行工具；失败时返回原因文本，由引擎包装为 ToolExecution 错误
    async fn execute(&self, inputs: Value) -> Result<Value, String>;
}

/// 零参实现工厂：每次调用产出一个新的工具实例
pub type ToolFactory = Arc<dyn Fn() -> Box<dyn Tool> + Send + Sync>;

/// 工具注册表
#[derive(Default)]
pub struct ToolRegistry {
    contracts: HashMap<String, ToolContract>,
    factories: HashMap<String, ToolFactory>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册契约与实现工厂；同名已存在时返回 DuplicateTool 且注册表保持不变
    pub fn register<F, T>(&mut self, contract: ToolContract, factory: F) -> Result<(), AgentError>
    where
        F: Fn() -> T + Send + Sync + 'static,
        T: Tool + 'static,
    {
        if self.contracts.contains_key(&contract.name) {
            return Err(AgentError::DuplicateTool(contract.name.clone()));
        }
        let name = contract.name.clone();
        self.contracts.insert(name.clone(), contract);
        self.factories
            .insert(name, Arc::new(move || Box::new(factory())));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ToolContract> {
        self.contracts.get(name)
    }

    pub fn implementation(&self, name: &str) -> Option<ToolFactory> {
        self.factories.get(name).cloned()
    }

    pub fn contracts(&self) -> impl Iterator<Item = &ToolContract> {
        self.contracts.values()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.contracts.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    /// 带有查询全部标签的契约列表（AND 语义）
    pub fn by_tags(&self, tags: &[String]) -> Vec<&ToolContract> {
        self.contracts
            .values()
            .filter(|c| c.has_all_tags(tags))
            .collect()
    }

    /// 投影为函数调用格式的工具描述列表：{name, description, parameters}
    ///
    /// 这是契约形状与外部聊天 API 函数调用形状唯一的耦合点。
    pub fn call_specs(&self) -> Vec<Value> {
        self.contracts
            .values()
            .map(|c| {
                json!({
                    "name": c.name,
                    "description": c.description,
                    "parameters": c.input.to_parameters(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{PropertySpec, ToolSchema, ValueType};

    struct NoopTool;

    #[async_trait]
    impl Tool for NoopTool {
        async fn execute(&self, _inputs: Value) -> Result<Value, String> {
            Ok(json!({}))
        }
    }

    fn contract(name: &str, tags: &[&str]) -> ToolContract {
        ToolContract::new(name, format!("{} tool", name)).tags(tags)
    }

    #[test]
    fn test_duplicate_registration_fails_and_leaves_registry_unchanged() {
        let mut registry = ToolRegistry::new();
        registry
            .register(contract("calculate", &["math"]), || NoopTool)
            .unwrap();

        let err = registry
            .register(contract("calculate", &["other"]), || NoopTool)
            .unwrap_err();
        assert!(matches!(err, AgentError::DuplicateTool(name) if name == "calculate"));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("calculate").unwrap().tags, vec!["math"]);
    }

    #[test]
    fn test_by_tags_requires_all_tags() {
        let mut registry = ToolRegistry::new();
        registry
            .register(contract("a", &["math", "arithmetic"]), || NoopTool)
            .unwrap();
        registry
            .register(contract("b", &["math"]), || NoopTool)
            .unwrap();

        let both = registry.by_tags(&["math".to_string(), "arithmetic".to_string()]);
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].name, "a");

        let math_only = registry.by_tags(&["math".to_string()]);
        assert_eq!(math_only.len(), 2);
    }

    #[test]
    fn test_call_specs_shape() {
        let mut registry = ToolRegistry::new();
        let c = ToolContract::new("calculate", "Evaluate an expression").input(ToolSchema::new(
            vec![PropertySpec::new("expression", ValueType::String, "Expression").required()],
        ));
        registry.register(c, || NoopTool).unwrap();

        let specs = registry.call_specs();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0]["name"], "calculate");
        assert_eq!(specs[0]["parameters"]["type"], "object");
        assert_eq!(specs[0]["parameters"]["required"][0], "expression");
    }

    #[tokio::test]
    async fn test_factory_produces_fresh_instances() {
        let mut registry = ToolRegistry::new();
        registry
            .register(contract("noop", &[]), || NoopTool)
            .unwrap();

        let factory = registry.implementation("noop").unwrap();
        let tool = factory();
        assert_eq!(tool.execute(json!({})).await.unwrap(), json!({}));
    }
}
