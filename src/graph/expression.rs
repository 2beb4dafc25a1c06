// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use once_cell::sync::Lazy;
use regex::Regex;

use crate::tree::{Path, Value};

static WRAPPER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\(\(\s*(.*?)\s*\)\)$").expect("valid regex"));
static BARE_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+(\.[A-Za-z0-9_]+)*$").expect("valid regex"));

/// True if a scalar string value is an operator expression like
/// `(( grab meta.owner ))` rather than a plain literal.
pub fn looks_like_expression(s: &str) -> bool {
    WRAPPER.is_match(s.trim())
}

/// One argument to an operator call: a reference into the document, a
/// literal scalar, or a nested operator call whose result feeds the
/// outer operator.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Reference(Path),
    Literal(Value),
    Nested(Box<OperatorExpression>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperatorExpression {
    pub operator: String,
    pub args: Vec<Arg>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExpressionParseError {
    #[error("'{0}' is not an operator expression")]
    NotAnExpression(String),
    #[error("operator expression has no operator name")]
    MissingOperator,
    #[error("unbalanced quotes or parentheses in '{0}'")]
    Unbalanced(String),
}

impl OperatorExpression {
    pub fn parse(raw: &str) -> Result<OperatorExpression, ExpressionParseError> {
        let trimmed = raw.trim();
        let inner = WRAPPER
            .captures(trimmed)
            .and_then(|c| c.get(1))
            .ok_or_else(|| ExpressionParseError::NotAnExpression(raw.to_string()))?
            .as_str();

        let tokens = tokenize(inner)?;
        let mut it = tokens.into_iter();
        let operator = it.next().ok_or(ExpressionParseError::MissingOperator)?;
        let args = it.map(parse_arg).collect();
        Ok(OperatorExpression { operator, args })
    }
}

fn parse_arg(token: String) -> Arg {
    if looks_like_expression(&token) {
        if let Ok(nested) = OperatorExpression::parse(&token) {
            return Arg::Nested(Box::new(nested));
        }
    }
    if let Some(unquoted) = strip_quotes(&token) {
        return Arg::Literal(Value::String(unquoted));
    }
    if let Ok(i) = token.parse::<i64>() {
        return Arg::Literal(Value::Int(i));
    }
    if let Ok(f) = token.parse::<f64>() {
        return Arg::Literal(Value::Float(f));
    }
    if token == "true" || token == "false" {
        return Arg::Literal(Value::Bool(token == "true"));
    }
    if BARE_REFERENCE.is_match(&token) {
        if let Ok(path) = Path::parse(&token) {
            return Arg::Reference(path);
        }
    }
    Arg::Literal(Value::String(token))
}

fn strip_quotes(token: &str) -> Option<String> {
    if token.len() >= 2 && token.starts_with('"') && token.ends_with('"') {
        Some(token[1..token.len() - 1].to_string())
    } else {
        None
    }
}

/// Split an expression body into whitespace-separated tokens, treating
/// `"..."` as an atomic token and `(( ... ))` as an atomic nested
/// token regardless of the whitespace inside it.
fn tokenize(body: &str) -> Result<Vec<String>, ExpressionParseError> {
    let mut tokens = Vec::new();
    let mut chars = body.chars().peekable();
    let mut current = String::new();
    let mut paren_depth = 0i32;
    let mut in_quotes = false;

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            '(' if !in_quotes => {
                paren_depth += 1;
                current.push(c);
            }
            ')' if !in_quotes => {
                paren_depth -= 1;
                current.push(c);
            }
            c if c.is_whitespace() && !in_quotes && paren_depth == 0 => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if in_quotes || paren_depth != 0 {
        return Err(ExpressionParseError::Unbalanced(body.to_string()));
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}
