//! 文本数字转换工具
//!
//! 把含有英文数字词的文本（如 "4 + seven"）转换为可计算的算术表达式（"4 + 7"），
//! 供 calculate 工具消费。

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::tools::{PropertySpec, Tool, ToolContract, ToolSchema, ValueType};

/// 数字词与运算符词的转换表
const WORD_NUMBERS: &[(&str, &str)] = &[
    ("zero", "0"),
    ("one", "1"),
    ("two", "2"),
    ("three", "3"),
    ("four", "4"),
    ("five", "5"),
    ("six", "6"),
    ("seven", "7"),
    ("eight", "8"),
    ("nine", "9"),
    ("ten", "10"),
    ("eleven", "11"),
    ("twelve", "12"),
    ("thirteen", "13"),
    ("fourteen", "14"),
    ("fifteen", "15"),
    ("sixteen", "16"),
    ("seventeen", "17"),
    ("eighteen", "18"),
    ("nineteen", "19"),
    ("twenty", "20"),
    ("thirty", "30"),
    ("forty", "40"),
    ("fifty", "50"),
    ("sixty", "60"),
    ("seventy", "70"),
    ("eighty", "80"),
    ("ninety", "90"),
    ("hundred", "100"),
];

const WORD_OPERATORS: &[(&str, &str)] = &[
    ("plus", "+"),
    ("minus", "-"),
    ("times", "*"),
    ("divided", "/"),
];

/// 文本数字转换工具
pub struct TextToNumberTool;

impl TextToNumberTool {
    pub fn contract() -> ToolContract {
        ToolContract::new(
            "convert_text_to_number",
            "Convert text numbers (like 'seven') in an expression to numeric digits",
        )
        .tags(&["conversion", "text"])
        .input(ToolSchema::new(vec![PropertySpec::new(
            "text",
            ValueType::String,
            "Text containing number words",
        )
        .required()]))
        .output(ToolSchema::new(vec![PropertySpec::new(
            "expression",
            ValueType::String,
            "Expression with number words replaced by digits",
        )]))
    }
}

/// 按词转换：数字词换为数字，运算符词换为符号，表达式无关的词（by 等）丢弃
fn convert_text(text: &str) -> String {
    let mut parts: Vec<String> = Vec::new();
    for raw in text.split_whitespace() {
        let token = raw.trim_matches(|c: char| !c.is_alphanumeric() && !"+-*/().".contains(c));
        if token.is_empty() {
            continue;
        }
        let lower = token.to_lowercase();
        if let Some((_, digits)) = WORD_NUMBERS.iter().find(|(w, _)| *w == lower) {
            parts.push((*digits).to_string());
        } else if let Some((_, op)) = WORD_OPERATORS.iter().find(|(w, _)| *w == lower) {
            parts.push((*op).to_string());
        } else if token
            .chars()
            .all(|c| c.is_ascii_digit() || "+-*/().".contains(c))
        {
            parts.push(token.to_string());
        }
        // 其余词（what's、is、by 等）与表达式无关，丢弃
    }
    parts.join(" ")
}

#[async_trait]
impl Tool for TextToNumberTool {
    async fn execute(&self, inputs: Value) -> Result<Value, String> {
        let text = inputs
            .get("text")
            .and_then(|v| v.as_str())
            .ok_or_else(|| "missing input `text`".to_string())?;

        let expression = convert_text(text);
        if expression.is_empty() {
            return Err(format!("no numeric content found in: {}", text));
        }
        Ok(json!({ "expression": expression }))
    }
}
