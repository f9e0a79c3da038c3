//! 任务级共享状态
//!
//! 单次任务内的可变键值存储：调用方 / 工具写入的变量、按工具名保存的最近一次结果、
//! 最近完成的工具名。每次任务运行新建，任务收尾时清空；同一实例只被一条控制流访问，无需加锁。

use std::collections::HashMap;

use serde_json::Value;

/// Agent 任务状态
#[derive(Debug, Default)]
pub struct AgentState {
    variables: HashMap<String, Value>,
    tool_results: HashMap<String, Value>,
    /// 工具结果的首次写入顺序，供「按序扫描首个匹配结果」使用（HashMap 迭代顺序不确定）
    executed: Vec<String>,
    last_tool: Option<String>,
}

impl AgentState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    pub fn get_variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// 保存工具结果并更新 last_tool；同名覆盖（不追加），首次写入位置保留
    pub fn set_tool_result(&mut self, tool_name: impl Into<String>, result: Value) {
        let name = tool_name.into();
        if !self.tool_results.contains_key(&name) {
            self.executed.push(name.clone());
        }
        self.tool_results.insert(name.clone(), result);
        self.last_tool = Some(name);
    }

    pub fn get_tool_result(&self, tool_name: &str) -> Option<&Value> {
        self.tool_results.get(tool_name)
    }

    pub fn has_tool_result(&self, tool_name: &str) -> bool {
        self.tool_results.contains_key(tool_name)
    }

    pub fn get_last_tool_result(&self) -> Option<&Value> {
        self.last_tool
            .as_deref()
            .and_then(|name| self.tool_results.get(name))
    }

    pub fn last_tool(&self) -> Option<&str> {
        self.last_tool.as_deref()
    }

    /// 按首次写入顺序遍历 (工具名, 结果)
    pub fn results_in_order(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.executed
            .iter()
            .filter_map(|name| self.tool_results.get(name).map(|v| (name.as_str(), v)))
    }

    /// 清空全部状态
    pub fn clear(&mut self) {
        self.variables.clear();
        self.tool_results.clear();
        self.executed.clear();
        self.last_tool = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_overwrite_keeps_single_result_and_updates_last_tool() {
        let mut state = AgentState::new();
        state.set_tool_result("calc", json!(5));
        state.set_tool_result("calc", json!(7));

        assert_eq!(state.get_tool_result("calc"), Some(&json!(7)));
        assert_eq!(state.last_tool(), Some("calc"));
        assert_eq!(state.results_in_order().count(), 1);
    }

    #[test]
    fn test_results_in_order_preserves_first_insertion() {
        let mut state = AgentState::new();
        state.set_tool_result("a", json!(1));
        state.set_tool_result("b", json!(2));
        state.set_tool_result("a", json!(3));

        let order: Vec<&str> = state.results_in_order().map(|(n, _)| n).collect();
        assert_eq!(order, vec!["a", "b"]);
        assert_eq!(state.last_tool(), Some("a"));
    }

    #[test]
    fn test_last_tool_result() {
        let mut state = AgentState::new();
        assert!(state.get_last_tool_result().is_none());

        state.set_tool_result("first", json!("x"));
        state.set_tool_result("second", json!("y"));
        assert_eq!(state.get_last_tool_result(), Some(&json!("y")));
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut state = AgentState::new();
        state.set_variable("k", json!(1));
        state.set_tool_result("t", json!(2));
        state.clear();

        assert!(!state.has_variable("k"));
        assert!(!state.has_tool_result("t"));
        assert!(state.last_tool().is_none());
        assert_eq!(state.results_in_order().count(), 0);
    }
}
