//! 输入解析器
//!
//! 为一次工具调用计算具体参数对象。解析层级是严格的确定性顺序：
//! 计划给出的显式映射 > 按 Schema 从状态推断 > 字符串属性的兜底（上下文提示 /
//! 调用方参数 / 任务原文）。必填属性最终仍未绑定时报 InputResolution 错误。

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::agent::state::AgentState;
use crate::core::AgentError;
use crate::tools::{PropertySpec, ToolContract, ValueType};

/// 解析兜底提示：具名上下文键为可配置约定，而非隐藏内建
#[derive(Clone, Debug, Default)]
pub struct ResolverHints {
    /// 调用方设置的保留上下文串
    pub context: Option<String>,
    /// 允许绑定到上下文串的属性名
    pub context_keys: Vec<String>,
    /// 任务级调用方参数（按属性名匹配）
    pub parameters: HashMap<String, Value>,
}

/// 解析一次工具调用的输入
///
/// mapping 为计划步骤的 input_mapping；值含 `.` 时按 `工具名.字段` 投影读取状态，
/// 否则先当工具名整体取结果，取不到再按字面值使用。
pub fn resolve_inputs(
    contract: &ToolContract,
    task: &str,
    mapping: Option<&HashMap<String, String>>,
    state: &AgentState,
    hints: &ResolverHints,
) -> Result<Value, AgentError> {
    let mut bound = Map::new();

    match mapping {
        Some(mapping) if !mapping.is_empty() => {
            for (input_name, value_ref) in mapping {
                if let Some(value) = resolve_reference(value_ref, state) {
                    bound.insert(input_name.clone(), value);
                }
            }
        }
        _ => {
            // 无显式映射：按 Schema 与状态推断
            for prop in &contract.input.properties {
                if let Some(value) = resolve_from_schema(prop, task, state, hints) {
                    bound.insert(prop.name.clone(), value);
                }
            }
        }
    }

    // 必填属性必须全部绑定；零必填且无绑定时以空对象调用
    for prop in &contract.input.properties {
        if prop.required && !bound.contains_key(&prop.name) {
            return Err(AgentError::InputResolution {
                tool: contract.name.clone(),
                property: prop.name.clone(),
            });
        }
    }

    Ok(Value::Object(bound))
}

/// 显式映射值的解析
fn resolve_reference(value_ref: &str, state: &AgentState) -> Option<Value> {
    if let Some((tool_name, field)) = value_ref.split_once('.') {
        // 点引用：读取工具结果并投影字段
        return state
            .get_tool_result(tool_name)
            .and_then(|result| result.get(field))
            .cloned();
    }
    if let Some(result) = state.get_tool_result(value_ref) {
        return Some(result.clone());
    }
    // 没有同名工具结果：按字面值使用
    Some(Value::String(value_ref.to_string()))
}

/// Schema 引导的默认映射
fn resolve_from_schema(
    prop: &PropertySpec,
    task: &str,
    state: &AgentState,
    hints: &ResolverHints,
) -> Option<Value> {
    if prop.reference.is_some() {
        // 类型引用：按执行顺序取首个对象形状的结果
        return state
            .results_in_order()
            .find(|(_, v)| v.is_object())
            .map(|(_, v)| v.clone());
    }
    if let Some(result) = state.get_tool_result(&prop.name) {
        return Some(result.clone());
    }
    if let Some(variable) = state.get_variable(&prop.name) {
        return Some(variable.clone());
    }
    if prop.value_type == ValueType::String {
        if hints.context_keys.iter().any(|k| k == &prop.name) {
            if let Some(context) = &hints.context {
                return Some(Value::String(context.clone()));
            }
        }
        if let Some(param) = hints.parameters.get(&prop.name) {
            return Some(param.clone());
        }
        return Some(Value::String(task.to_string()));
    }
    None
}
