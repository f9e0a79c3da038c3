//! 工具契约：名称、描述、标签与输入输出 Schema
//!
//! Schema 是注册时一次性编译好的封闭结构（属性名 / 类型 / 是否必填 / 类型引用），
//! 输入解析器与函数调用投影共用同一份，不再各自解析嵌套 JSON 字典。

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// 属性类型（与 JSON Schema 的 type 对应）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Number => "number",
            ValueType::Integer => "integer",
            ValueType::Boolean => "boolean",
            ValueType::Object => "object",
            ValueType::Array => "array",
        }
    }
}

/// 单个属性的描述
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PropertySpec {
    pub name: String,
    pub value_type: ValueType,
    pub description: String,
    pub required: bool,
    /// 引用其他工具输出类型的名字（$ref 风格）；解析时绑定到首个形状匹配的前序结果
    pub reference: Option<String>,
}

impl PropertySpec {
    pub fn new(name: impl Into<String>, value_type: ValueType, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value_type,
            description: description.into(),
            required: false,
            reference: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn reference(mut self, type_name: impl Into<String>) -> Self {
        self.reference = Some(type_name.into());
        self
    }
}

/// 工具输入 / 输出 Schema：有序属性列表
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ToolSchema {
    pub properties: Vec<PropertySpec>,
}

impl ToolSchema {
    pub fn new(properties: Vec<PropertySpec>) -> Self {
        Self { properties }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// 必填属性名列表
    pub fn required_names(&self) -> Vec<&str> {
        self.properties
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect()
    }

    /// 投影为函数调用参数格式 {type: object, properties, required}
    pub fn to_parameters(&self) -> Value {
        let mut properties = serde_json::Map::new();
        for prop in &self.properties {
            let mut entry = serde_json::Map::new();
            entry.insert("type".into(), json!(prop.value_type.as_str()));
            entry.insert("description".into(), json!(prop.description));
            if let Some(reference) = &prop.reference {
                entry.insert("$ref".into(), json!(format!("#/definitions/{}", reference)));
            }
            properties.insert(prop.name.clone(), Value::Object(entry));
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": self.required_names(),
        })
    }
}

/// 工具契约：注册表中的不可变元数据
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolContract {
    /// 工具名（注册表内唯一）
    pub name: String,
    /// 工具描述（供 LLM 理解功能）
    pub description: String,
    /// 能力标签
    pub tags: Vec<String>,
    pub input: ToolSchema,
    pub output: ToolSchema,
}

impl ToolContract {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            tags: Vec::new(),
            input: ToolSchema::empty(),
            output: ToolSchema::empty(),
        }
    }

    pub fn tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn input(mut self, schema: ToolSchema) -> Self {
        self.input = schema;
        self
    }

    pub fn output(mut self, schema: ToolSchema) -> Self {
        self.output = schema;
        self
    }

    /// 是否带有查询要求的全部标签（AND 语义）
    pub fn has_all_tags(&self, tags: &[String]) -> bool {
        tags.iter().all(|t| self.tags.contains(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameters_projection() {
        let schema = ToolSchema::new(vec![
            PropertySpec::new("expression", ValueType::String, "Arithmetic expression").required(),
            PropertySpec::new("precision", ValueType::Integer, "Digits after the point"),
        ]);

        let params = schema.to_parameters();
        assert_eq!(params["type"], "object");
        assert_eq!(params["properties"]["expression"]["type"], "string");
        assert_eq!(params["required"], json!(["expression"]));
    }

    #[test]
    fn test_reference_projection() {
        let schema = ToolSchema::new(vec![PropertySpec::new(
            "events",
            ValueType::Object,
            "Events payload",
        )
        .reference("EventList")
        .required()]);

        let params = schema.to_parameters();
        assert_eq!(
            params["properties"]["events"]["$ref"],
            "#/definitions/EventList"
        );
    }

    #[test]
    fn test_has_all_tags() {
        let contract = ToolContract::new("calculate", "Evaluate expressions")
            .tags(&["math", "arithmetic"]);

        assert!(contract.has_all_tags(&["math".to_string()]));
        assert!(contract.has_all_tags(&["math".to_string(), "arithmetic".to_string()]));
        assert!(!contract.has_all_tags(&["math".to_string(), "text".to_string()]));
    }
}
