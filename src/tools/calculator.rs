//! Calculator Tool Implementation
//!
//! Arithmetic-only evaluator: a tokenizer plus a recursive-descent parser over
//! `+ - * / ( )` and decimal literals. Nothing outside that grammar is ever
//! interpreted.
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := unary (('*' | '/') unary)*
//! unary  := ('+' | '-') unary | primary
//! primary:= NUMBER | '(' expr ')'
//! ```

use serde::Deserialize;
use serde_json::{Map, Number, Value, json};

use super::{ToolOutput, into_map, parse_args, require, timestamp};
use crate::core::error::ToolError;
use crate::core::registry::{ToolDescriptor, ToolKind, ToolRegistry};

/// Deepest nesting of parentheses and unary signs accepted.
const MAX_DEPTH: usize = 64;

/// Largest magnitude at which every integer is exactly representable in f64.
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

pub fn register(registry: &mut ToolRegistry) {
    registry.register(ToolDescriptor {
        kind: ToolKind::Calculator,
        name: ToolKind::Calculator.name(),
        title: "Calculator",
        description: "Perform mathematical calculations",
        input_schema: json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "Mathematical expression to evaluate (e.g., '2 + 2', '10 * 5')"
                }
            },
            "required": ["expression"]
        }),
        invoking: "Calculating...",
        invoked: "Calculation completed.",
    });
}

#[derive(Debug, Deserialize)]
struct CalculatorArgs {
    expression: Option<String>,
}

pub fn run(arguments: &Map<String, Value>) -> Result<ToolOutput, ToolError> {
    let args: CalculatorArgs = parse_args(arguments)?;
    let expression = require(args.expression, "expression")?;

    let value = evaluate(&expression)?;
    let result = to_json_number(value);

    Ok(ToolOutput {
        text: format!("{expression} = {result}"),
        structured: into_map(json!({
            "expression": expression,
            "result": result,
            "timestamp": timestamp(),
        })),
    })
}

/// Evaluate an arithmetic expression.
///
/// Any character other than digits, `+ - * / . ( )` and space, or any
/// syntactically invalid input, is `InvalidArgument`. Division by zero and
/// results that overflow to infinity are `Computation` errors.
pub fn evaluate(expression: &str) -> Result<f64, ToolError> {
    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        return Err(ToolError::invalid("Expression is empty"));
    }

    let mut parser = Parser { tokens: &tokens, pos: 0, depth: 0 };
    let value = parser.expr()?;
    if let Some(tok) = parser.peek() {
        return Err(ToolError::invalid(format!(
            "Invalid expression: unexpected '{tok}' at token {}",
            parser.pos + 1
        )));
    }

    if !value.is_finite() {
        return Err(ToolError::Computation("Result is not a finite number".into()));
    }
    Ok(value)
}

/// Integral results become JSON integers, everything else a float.
fn to_json_number(value: f64) -> Number {
    if value.fract() == 0.0 && value.abs() < MAX_EXACT_INT {
        Number::from(value as i64)
    } else {
        // evaluate() guarantees finiteness
        Number::from_f64(value).unwrap_or_else(|| Number::from(0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Num(n) => write!(f, "{n}"),
            Token::Plus => f.write_str("+"),
            Token::Minus => f.write_str("-"),
            Token::Star => f.write_str("*"),
            Token::Slash => f.write_str("/"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
        }
    }
}

fn tokenize(expression: &str) -> Result<Vec<Token>, ToolError> {
    if let Some(bad) = expression
        .chars()
        .find(|c| !(c.is_ascii_digit() || "+-*/.() ".contains(*c)))
    {
        return Err(ToolError::invalid(format!(
            "Invalid character '{bad}' in expression"
        )));
    }

    let bytes = expression.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let tok = match bytes[i] {
            b' ' => {
                i += 1;
                continue;
            }
            b'+' => Token::Plus,
            b'-' => Token::Minus,
            b'*' => Token::Star,
            b'/' => Token::Slash,
            b'(' => Token::LParen,
            b')' => Token::RParen,
            _ => {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                    i += 1;
                }
                let literal = &expression[start..i];
                let n = literal.parse::<f64>().map_err(|_| {
                    ToolError::invalid(format!("Invalid number literal '{literal}'"))
                })?;
                tokens.push(Token::Num(n));
                continue;
            }
        };
        tokens.push(tok);
        i += 1;
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<Token> {
        let tok = self.peek();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn descend(&mut self) -> Result<(), ToolError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ToolError::invalid("Expression is nested too deeply"));
        }
        Ok(())
    }

    fn expr(&mut self) -> Result<f64, ToolError> {
        let mut acc = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            acc = if op == Token::Plus { acc + rhs } else { acc - rhs };
        }
        Ok(acc)
    }

    fn term(&mut self) -> Result<f64, ToolError> {
        let mut acc = self.unary()?;
        while let Some(op @ (Token::Star | Token::Slash)) = self.peek() {
            self.pos += 1;
            let rhs = self.unary()?;
            acc = if op == Token::Star {
                acc * rhs
            } else {
                if rhs == 0.0 {
                    return Err(ToolError::Computation("Division by zero".into()));
                }
                acc / rhs
            };
        }
        Ok(acc)
    }

    fn unary(&mut self) -> Result<f64, ToolError> {
        match self.peek() {
            Some(Token::Plus) | Some(Token::Minus) => {
                let negate = self.bump() == Some(Token::Minus);
                self.descend()?;
                let v = self.unary()?;
                self.depth -= 1;
                Ok(if negate { -v } else { v })
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<f64, ToolError> {
        match self.bump() {
            Some(Token::Num(n)) => Ok(n),
            Some(Token::LParen) => {
                self.descend()?;
                let v = self.expr()?;
                self.depth -= 1;
                match self.bump() {
                    Some(Token::RParen) => Ok(v),
                    Some(tok) => Err(ToolError::invalid(format!(
                        "Invalid expression: expected ')' but found '{tok}'"
                    ))),
                    None => Err(ToolError::invalid("Invalid expression: missing ')'")),
                }
            }
            Some(tok) => Err(ToolError::invalid(format!(
                "Invalid expression: unexpected '{tok}'"
            ))),
            None => Err(ToolError::invalid("Invalid expression: unexpected end of input")),
        }
    }
}
