//! 算术计算工具
//!
//! 递归下降解析 + - * / 括号与一元负号，f64 运算；解析失败或除零时返回错误文本。

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::tools::{PropertySpec, Tool, ToolContract, ToolSchema, ValueType};

/// 算术计算工具
pub struct CalculateTool;

impl CalculateTool {
    pub fn contract() -> ToolContract {
        ToolContract::new("calculate", "Evaluate an arithmetic expression like '4 + 7'")
            .tags(&["math", "arithmetic"])
            .input(ToolSchema::new(vec![PropertySpec::new(
                "expression",
                ValueType::String,
                "Arithmetic expression to evaluate",
            )
            .required()]))
            .output(ToolSchema::new(vec![
                PropertySpec::new("expression", ValueType::String, "Evaluated expression"),
                PropertySpec::new("result", ValueType::Number, "Numeric result"),
                PropertySpec::new("formatted", ValueType::String, "Human-readable summary"),
            ]))
    }
}

#[async_trait]
impl Tool for CalculateTool {
    async fn execute(&self, inputs: Value) -> Result<Value, String> {
        let expression = inputs
            .get("expression")
            .and_then(|v| v.as_str())
            .ok_or_else(|| "missing input `expression`".to_string())?;

        let result = evaluate(expression)?;
        // 整数结果不带小数点展示
        let display = if result.fract() == 0.0 && result.abs() < 1e15 {
            format!("{}", result as i64)
        } else {
            format!("{}", result)
        };
        Ok(json!({
            "expression": expression,
            "result": result,
            "formatted": format!("The result of {} is {}", expression, display),
        }))
    }
}

/// 求值入口：tokenize 后递归下降
pub fn evaluate(expression: &str) -> Result<f64, String> {
    let tokens = tokenize(expression)?;
    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(format!("unexpected trailing input in: {}", expression));
    }
    Ok(value)
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' => {
                chars.next();
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '0'..='9' | '.' => {
                let mut literal = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        literal.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value: f64 = literal
                    .parse()
                    .map_err(|_| format!("invalid number: {}", literal))?;
                tokens.push(Token::Number(value));
            }
            _ => return Err(format!("unexpected character '{}' in expression", c)),
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    /// expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<f64, String> {
        let mut value = self.term()?;
        while let Some(op) = self.peek().cloned() {
            match op {
                Token::Plus => {
                    self.next();
                    value += self.term()?;
                }
                Token::Minus => {
                    self.next();
                    value -= self.term()?;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    /// term := factor (('*' | '/') factor)*
    fn term(&mut self) -> Result<f64, String> {
        let mut value = self.factor()?;
        while let Some(op) = self.peek().cloned() {
            match op {
                Token::Star => {
                    self.next();
                    value *= self.factor()?;
                }
                Token::Slash => {
                    self.next();
                    let divisor = self.factor()?;
                    if divisor == 0.0 {
                        return Err("division by zero".to_string());
                    }
                    value /= divisor;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    /// factor := number | '-' factor | '(' expr ')'
    fn factor(&mut self) -> Result<f64, String> {
        match self.next() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::Minus) => Ok(-self.factor()?),
            Some(Token::LParen) => {
                let value = self.expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err("missing closing parenthesis".to_string()),
                }
            }
            other => Err(format!("unexpected token: {:?}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_arithmetic() {
        assert_eq!(evaluate("4 + 7").unwrap(), 11.0);
        assert_eq!(evaluate("2 * 3 + 4").unwrap(), 10.0);
        assert_eq!(evaluate("2 * (3 + 4)").unwrap(), 14.0);
        assert_eq!(evaluate("-5 + 3").unwrap(), -2.0);
        assert_eq!(evaluate("10 / 4").unwrap(), 2.5);
    }

    #[test]
    fn test_division_by_zero() {
        assert!(evaluate("1 / 0").unwrap_err().contains("division by zero"));
    }

    #[test]
    fn test_invalid_expression() {
        assert!(evaluate("4 +").is_err());
        assert!(evaluate("4 $ 2").is_err());
        assert!(evaluate("(4 + 2").is_err());
    }

    #[tokio::test]
    async fn test_execute_formats_result() {
        let out = CalculateTool
            .execute(serde_json::json!({"expression": "4 + 7"}))
            .await
            .unwrap();
        assert_eq!(out["result"], 11.0);
        assert_eq!(out["formatted"], "The result of 4 + 7 is 11");
    }

    #[tokio::test]
    async fn test_execute_rejects_missing_input() {
        let err = CalculateTool
            .execute(serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(err.contains("expression"));
    }
}
