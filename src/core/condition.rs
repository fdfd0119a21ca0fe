//! When-clause conditions
//!
//! A stage's `when` clause is a small boolean expression over the run
//! context, for example `branch == 'main' && status == 'succeeded'`.
//! Expressions are compiled once into an [`Expr`] tree and evaluated
//! against a [`RunContext`] without side effects.
//!
//! Supported operators, loosest binding first:
//!
//! - `||`, `&&`, prefix `!`
//! - `==`, `!=`, `<`, `<=`, `>`, `>=`
//! - `=~`, `!~` (regular expression match, pattern must be a string literal)
//! - `in` with a parenthesized list, e.g. `branch in ('main', 'release')`
//!
//! `!` negates a whole comparison: `!branch == 'x'` reads as
//! `!(branch == 'x')`. Nesting is capped at [`MAX_DEPTH`] levels.

use crate::core::context::{ContextVariable, RunContext};
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Deepest nesting of parentheses, negations and chained operators
pub const MAX_DEPTH: usize = 256;

/// Errors raised while compiling or evaluating a condition
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConditionError {
    #[error("when expression is empty")]
    Empty,

    #[error("failed to parse when expression at offset {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("type error in when expression: {0}")]
    Type(String),

    #[error("invalid regular expression '{pattern}': {message}")]
    Pattern { pattern: String, message: String },
}

/// A runtime value inside an expression
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Num(f64),
    Bool(bool),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Num(_) => "number",
            Value::Bool(_) => "boolean",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "'{}'", s),
            Value::Num(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// Compiled expression tree
#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Value),
    Variable(ContextVariable),
    Not(Box<Expr>),
    Logical {
        op: LogicalOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Compare {
        op: CompareOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Matches {
        subject: Box<Expr>,
        pattern: Regex,
        negated: bool,
    },
    In {
        needle: Box<Expr>,
        haystack: Vec<Expr>,
    },
}

impl Expr {
    /// Evaluate to a boolean, failing if the result has another type
    pub fn evaluate(&self, ctx: &RunContext) -> Result<bool, ConditionError> {
        match self.value(ctx)? {
            Value::Bool(b) => Ok(b),
            other => Err(ConditionError::Type(format!(
                "expression evaluates to a {} ({}), not a boolean",
                other.type_name(),
                other
            ))),
        }
    }

    fn value(&self, ctx: &RunContext) -> Result<Value, ConditionError> {
        match self {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Variable(var) => Ok(Value::Str(ctx.get(*var).to_string())),
            Expr::Not(inner) => Ok(Value::Bool(!inner.boolean(ctx, "!")?)),
            Expr::Logical { op, lhs, rhs } => {
                let symbol = match op {
                    LogicalOp::And => "&&",
                    LogicalOp::Or => "||",
                };
                let left = lhs.boolean(ctx, symbol)?;
                let result = match op {
                    LogicalOp::And => left && rhs.boolean(ctx, symbol)?,
                    LogicalOp::Or => left || rhs.boolean(ctx, symbol)?,
                };
                Ok(Value::Bool(result))
            }
            Expr::Compare { op, lhs, rhs } => {
                let left = lhs.value(ctx)?;
                let right = rhs.value(ctx)?;
                compare(*op, &left, &right).map(Value::Bool)
            }
            Expr::Matches {
                subject,
                pattern,
                negated,
            } => match subject.value(ctx)? {
                Value::Str(s) => Ok(Value::Bool(pattern.is_match(&s) != *negated)),
                other => Err(ConditionError::Type(format!(
                    "cannot match a {} against a regular expression",
                    other.type_name()
                ))),
            },
            Expr::In { needle, haystack } => {
                let needle = needle.value(ctx)?;
                for item in haystack {
                    if item.value(ctx)? == needle {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
        }
    }

    fn boolean(&self, ctx: &RunContext, operator: &str) -> Result<bool, ConditionError> {
        match self.value(ctx)? {
            Value::Bool(b) => Ok(b),
            other => Err(ConditionError::Type(format!(
                "operator {} expects a boolean, got a {}",
                operator,
                other.type_name()
            ))),
        }
    }
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> Result<bool, ConditionError> {
    match op {
        CompareOp::Eq => return Ok(left == right),
        CompareOp::Ne => return Ok(left != right),
        _ => {}
    }

    let ordering = match (left, right) {
        (Value::Num(a), Value::Num(b)) => a.partial_cmp(b),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => {
            return Err(ConditionError::Type(format!(
                "cannot compare a {} with a {} using {}",
                left.type_name(),
                right.type_name(),
                op.symbol()
            )))
        }
    };

    let Some(ordering) = ordering else {
        return Ok(false);
    };

    Ok(match op {
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Le => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Ge => ordering != Ordering::Less,
        CompareOp::Eq | CompareOp::Ne => unreachable!("equality handled above"),
    })
}

/// A compiled when-clause, keeping its source for diagnostics
#[derive(Debug, Clone)]
pub struct Condition {
    source: String,
    expr: Expr,
}

impl Condition {
    /// Compile an expression
    pub fn compile(source: &str) -> Result<Self, ConditionError> {
        if source.trim().is_empty() {
            return Err(ConditionError::Empty);
        }

        let tokens = tokenize(source)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            end: source.len(),
            depth: 0,
        };
        let expr = parser.parse_or()?;
        if let Some((offset, token)) = parser.tokens.get(parser.pos) {
            return Err(ConditionError::Parse {
                position: *offset,
                message: format!("unexpected {}", token),
            });
        }

        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn evaluate(&self, ctx: &RunContext) -> Result<bool, ConditionError> {
        self.expr.evaluate(ctx)
    }
}

/// Compile and evaluate an expression in one go
pub fn evaluate(expression: &str, ctx: &RunContext) -> Result<bool, ConditionError> {
    Condition::compile(expression)?.evaluate(ctx)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Str(String),
    Num(f64),
    Ident(String),
    True,
    False,
    In,
    LParen,
    RParen,
    Comma,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Match,
    NotMatch,
    And,
    Or,
    Not,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Str(s) => write!(f, "string '{}'", s),
            Token::Num(n) => write!(f, "number {}", n),
            Token::Ident(name) => write!(f, "identifier '{}'", name),
            Token::True => f.write_str("'true'"),
            Token::False => f.write_str("'false'"),
            Token::In => f.write_str("'in'"),
            Token::LParen => f.write_str("'('"),
            Token::RParen => f.write_str("')'"),
            Token::Comma => f.write_str("','"),
            Token::Eq => f.write_str("'=='"),
            Token::Ne => f.write_str("'!='"),
            Token::Lt => f.write_str("'<'"),
            Token::Le => f.write_str("'<='"),
            Token::Gt => f.write_str("'>'"),
            Token::Ge => f.write_str("'>='"),
            Token::Match => f.write_str("'=~'"),
            Token::NotMatch => f.write_str("'!~'"),
            Token::And => f.write_str("'&&'"),
            Token::Or => f.write_str("'||'"),
            Token::Not => f.write_str("'!'"),
        }
    }
}

fn parse_error(position: usize, message: impl Into<String>) -> ConditionError {
    ConditionError::Parse {
        position,
        message: message.into(),
    }
}

fn tokenize(source: &str) -> Result<Vec<(usize, Token)>, ConditionError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        // Two-character operators first
        let next = source[start + c.len_utf8()..].chars().next();
        let pair = match (c, next) {
            ('=', Some('=')) => Some(Token::Eq),
            ('=', Some('~')) => Some(Token::Match),
            ('!', Some('=')) => Some(Token::Ne),
            ('!', Some('~')) => Some(Token::NotMatch),
            ('<', Some('=')) => Some(Token::Le),
            ('>', Some('=')) => Some(Token::Ge),
            ('&', Some('&')) => Some(Token::And),
            ('|', Some('|')) => Some(Token::Or),
            _ => None,
        };
        if let Some(token) = pair {
            chars.next();
            chars.next();
            tokens.push((start, token));
            continue;
        }

        match c {
            '(' | ')' | ',' | '<' | '>' | '!' => {
                chars.next();
                let token = match c {
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    ',' => Token::Comma,
                    '<' => Token::Lt,
                    '>' => Token::Gt,
                    _ => Token::Not,
                };
                tokens.push((start, token));
            }
            '\'' | '"' => {
                chars.next();
                let mut value = String::new();
                let mut closed = false;
                while let Some((_, ch)) = chars.next() {
                    match ch {
                        // Only quotes and backslashes are escapes; `\d` stays for regexes
                        '\\' => match chars.peek() {
                            Some(&(_, escaped)) if escaped == c || escaped == '\\' => {
                                value.push(escaped);
                                chars.next();
                            }
                            _ => value.push('\\'),
                        },
                        ch if ch == c => {
                            closed = true;
                            break;
                        }
                        ch => value.push(ch),
                    }
                }
                if !closed {
                    return Err(parse_error(start, "unterminated string literal"));
                }
                tokens.push((start, Token::Str(value)));
            }
            c if c.is_ascii_digit() => {
                let mut end = start;
                while let Some(&(i, ch)) = chars.peek() {
                    if ch.is_ascii_digit() || ch == '.' {
                        end = i + ch.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let literal = &source[start..end];
                let number = literal
                    .parse::<f64>()
                    .map_err(|_| parse_error(start, format!("invalid number '{}'", literal)))?;
                tokens.push((start, Token::Num(number)));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut end = start;
                while let Some(&(i, ch)) = chars.peek() {
                    if ch.is_alphanumeric() || ch == '_' {
                        end = i + ch.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let token = match &source[start..end] {
                    "true" => Token::True,
                    "false" => Token::False,
                    "in" => Token::In,
                    word => Token::Ident(word.to_string()),
                };
                tokens.push((start, token));
            }
            other => {
                return Err(parse_error(start, format!("unexpected character '{}'", other)));
            }
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    /// Offset reported for errors at end of input
    end: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(offset, _)| *offset)
            .unwrap_or(self.end)
    }

    fn advance(&mut self) -> Option<(usize, Token)> {
        let item = self.tokens.get(self.pos).cloned();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }

    fn expect(&mut self, expected: Token) -> Result<(), ConditionError> {
        let offset = self.offset();
        match self.advance() {
            Some((_, token)) if token == expected => Ok(()),
            Some((_, token)) => Err(parse_error(
                offset,
                format!("expected {}, found {}", expected, token),
            )),
            None => Err(parse_error(
                offset,
                format!("expected {}, found end of expression", expected),
            )),
        }
    }

    fn descend(&mut self) -> Result<(), ConditionError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(parse_error(
                self.offset(),
                format!("expression nests deeper than {} levels", MAX_DEPTH),
            ));
        }
        Ok(())
    }

    // Each chained operator deepens the left-leaning tree by one level
    fn parse_or(&mut self) -> Result<Expr, ConditionError> {
        let depth = self.depth;
        let mut lhs = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.advance();
            self.descend()?;
            let rhs = self.parse_and()?;
            lhs = Expr::Logical {
                op: LogicalOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        self.depth = depth;
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ConditionError> {
        let depth = self.depth;
        let mut lhs = self.parse_not()?;
        while self.peek() == Some(&Token::And) {
            self.advance();
            self.descend()?;
            let rhs = self.parse_not()?;
            lhs = Expr::Logical {
                op: LogicalOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        self.depth = depth;
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr, ConditionError> {
        if self.peek() == Some(&Token::Not) {
            self.advance();
            self.descend()?;
            let inner = self.parse_not()?;
            self.depth -= 1;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_compare()
    }

    fn parse_compare(&mut self) -> Result<Expr, ConditionError> {
        let lhs = self.parse_primary()?;

        let op = match self.peek() {
            Some(Token::Eq) => CompareOp::Eq,
            Some(Token::Ne) => CompareOp::Ne,
            Some(Token::Lt) => CompareOp::Lt,
            Some(Token::Le) => CompareOp::Le,
            Some(Token::Gt) => CompareOp::Gt,
            Some(Token::Ge) => CompareOp::Ge,
            Some(Token::Match) | Some(Token::NotMatch) => {
                let negated = self.peek() == Some(&Token::NotMatch);
                self.advance();
                return self.parse_match(lhs, negated);
            }
            Some(Token::In) => {
                self.advance();
                let haystack = self.parse_list()?;
                return Ok(Expr::In {
                    needle: Box::new(lhs),
                    haystack,
                });
            }
            _ => return Ok(lhs),
        };

        self.advance();
        let rhs = self.parse_primary()?;
        Ok(Expr::Compare {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn parse_match(&mut self, subject: Expr, negated: bool) -> Result<Expr, ConditionError> {
        let offset = self.offset();
        match self.advance() {
            Some((_, Token::Str(pattern))) => {
                let regex = Regex::new(&pattern).map_err(|e| ConditionError::Pattern {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                })?;
                Ok(Expr::Matches {
                    subject: Box::new(subject),
                    pattern: regex,
                    negated,
                })
            }
            _ => Err(parse_error(
                offset,
                "regular expression operand must be a string literal",
            )),
        }
    }

    fn parse_list(&mut self) -> Result<Vec<Expr>, ConditionError> {
        self.expect(Token::LParen)?;
        let mut items = vec![self.parse_primary()?];
        while self.peek() == Some(&Token::Comma) {
            self.advance();
            items.push(self.parse_primary()?);
        }
        self.expect(Token::RParen)?;
        Ok(items)
    }

    fn parse_primary(&mut self) -> Result<Expr, ConditionError> {
        let offset = self.offset();
        match self.advance() {
            Some((_, Token::Str(s))) => Ok(Expr::Literal(Value::Str(s))),
            Some((_, Token::Num(n))) => Ok(Expr::Literal(Value::Num(n))),
            Some((_, Token::True)) => Ok(Expr::Literal(Value::Bool(true))),
            Some((_, Token::False)) => Ok(Expr::Literal(Value::Bool(false))),
            Some((_, Token::Ident(name))) => ContextVariable::from_name(&name)
                .map(Expr::Variable)
                .ok_or_else(|| parse_error(offset, format!("unknown variable '{}'", name))),
            Some((_, Token::LParen)) => {
                self.descend()?;
                let inner = self.parse_or()?;
                self.expect(Token::RParen)?;
                self.depth -= 1;
                Ok(inner)
            }
            Some((_, token)) => Err(parse_error(
                offset,
                format!("expected a value, found {}", token),
            )),
            None => Err(parse_error(offset, "expected a value, found end of expression")),
        }
    }
}
