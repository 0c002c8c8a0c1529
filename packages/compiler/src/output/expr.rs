//! Render DSL Expression Parser
//!
//! A recursive-descent parser for the expression language the generator
//! emits: helper calls, literals, object and array literals, member and
//! index access, the usual binary/unary operators, ternaries, and the
//! single-return function literals used by list rendering. Parsing happens
//! once per compile, at function-construction time.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ExprError {
    #[error("unexpected end of render source at offset {0}")]
    UnexpectedEnd(usize),
    #[error("unexpected character `{ch}` at offset {at}")]
    UnexpectedChar { ch: char, at: usize },
    #[error("expected {what} at offset {at}")]
    Expected { what: &'static str, at: usize },
    #[error("invalid number literal at offset {0}")]
    BadNumber(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Str(String),
    Num(f64),
    Bool(bool),
    Null,
    Undefined,
    Ident(String),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Member {
        object: Box<Expr>,
        property: String,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Ternary {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// `function(a,b){return <expr>}` as emitted for list bodies.
    Function {
        params: Vec<String>,
        body: Box<Expr>,
    },
}

/// Parse a complete expression; trailing input is an error.
pub fn parse_expr(source: &str) -> Result<Expr, ExprError> {
    let mut parser = ExprParser {
        chars: source.chars().collect(),
        pos: 0,
    };
    parser.skip_ws();
    let expr = parser.parse_ternary()?;
    parser.skip_ws();
    match parser.peek() {
        None => Ok(expr),
        Some(ch) => Err(ExprError::UnexpectedChar {
            ch,
            at: parser.pos,
        }),
    }
}

struct ExprParser {
    chars: Vec<char>,
    pos: usize,
}

impl ExprParser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, ch: char) -> bool {
        if self.peek() == Some(ch) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consume `text` if it is next, without splitting a longer operator.
    fn eat_op(&mut self, text: &str) -> bool {
        for (i, ch) in text.chars().enumerate() {
            if self.peek_at(i) != Some(ch) {
                return false;
            }
        }
        // `==` must not claim the prefix of `===`.
        if text.ends_with('=') && self.peek_at(text.chars().count()) == Some('=') {
            return false;
        }
        self.pos += text.chars().count();
        true
    }

    fn expect_char(&mut self, ch: char, what: &'static str) -> Result<(), ExprError> {
        self.skip_ws();
        if self.eat(ch) {
            Ok(())
        } else {
            match self.peek() {
                Some(found) => Err(ExprError::UnexpectedChar {
                    ch: found,
                    at: self.pos,
                }),
                None => Err(ExprError::Expected {
                    what,
                    at: self.pos,
                }),
            }
        }
    }

    fn parse_ternary(&mut self) -> Result<Expr, ExprError> {
        let cond = self.parse_or()?;
        self.skip_ws();
        // Guard against `?.`-style input; only a bare `?` starts a ternary.
        if self.peek() == Some('?') {
            self.pos += 1;
            self.skip_ws();
            let then = self.parse_ternary()?;
            self.expect_char(':', "`:` of ternary")?;
            self.skip_ws();
            let otherwise = self.parse_ternary()?;
            return Ok(Expr::Ternary {
                cond: Box::new(cond),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            });
        }
        Ok(cond)
    }

    fn parse_or(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_and()?;
        loop {
            self.skip_ws();
            if self.peek() == Some('|') && self.peek_at(1) == Some('|') {
                self.pos += 2;
                self.skip_ws();
                let right = self.parse_and()?;
                left = binary(BinaryOp::Or, left, right);
            } else {
                return Ok(left);
            }
        }
    }

    fn parse_and(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_equality()?;
        loop {
            self.skip_ws();
            if self.peek() == Some('&') && self.peek_at(1) == Some('&') {
                self.pos += 2;
                self.skip_ws();
                let right = self.parse_equality()?;
                left = binary(BinaryOp::And, left, right);
            } else {
                return Ok(left);
            }
        }
    }

    fn parse_equality(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_relational()?;
        loop {
            self.skip_ws();
            let op = if self.eat_op("===") {
                BinaryOp::StrictEq
            } else if self.eat_op("!==") {
                BinaryOp::StrictNotEq
            } else if self.eat_op("==") {
                BinaryOp::Eq
            } else if self.eat_op("!=") {
                BinaryOp::NotEq
            } else {
                return Ok(left);
            };
            self.skip_ws();
            let right = self.parse_relational()?;
            left = binary(op, left, right);
        }
    }

    fn parse_relational(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_additive()?;
        loop {
            self.skip_ws();
            let op = if self.eat_op("<=") {
                BinaryOp::LtEq
            } else if self.eat_op(">=") {
                BinaryOp::GtEq
            } else if self.peek() == Some('<') {
                self.pos += 1;
                BinaryOp::Lt
            } else if self.peek() == Some('>') {
                self.pos += 1;
                BinaryOp::Gt
            } else {
                return Ok(left);
            };
            self.skip_ws();
            let right = self.parse_additive()?;
            left = binary(op, left, right);
        }
    }

    fn parse_additive(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            self.skip_ws();
            let op = if self.eat('+') {
                BinaryOp::Add
            } else if self.eat('-') {
                BinaryOp::Sub
            } else {
                return Ok(left);
            };
            self.skip_ws();
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_unary()?;
        loop {
            self.skip_ws();
            let op = if self.eat('*') {
                BinaryOp::Mul
            } else if self.eat('/') {
                BinaryOp::Div
            } else if self.eat('%') {
                BinaryOp::Rem
            } else {
                return Ok(left);
            };
            self.skip_ws();
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, ExprError> {
        self.skip_ws();
        if self.peek() == Some('!') && self.peek_at(1) != Some('=') {
            self.pos += 1;
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        if self.eat('-') {
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, ExprError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Some('.') => {
                    self.pos += 1;
                    let property = self.parse_ident_name()?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property,
                    };
                }
                Some('[') => {
                    self.pos += 1;
                    self.skip_ws();
                    let index = self.parse_ternary()?;
                    self.expect_char(']', "`]` of index")?;
                    expr = Expr::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                Some('(') => {
                    self.pos += 1;
                    let args = self.parse_args()?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, ExprError> {
        let mut args = Vec::new();
        self.skip_ws();
        if self.eat(')') {
            return Ok(args);
        }
        loop {
            self.skip_ws();
            args.push(self.parse_ternary()?);
            self.skip_ws();
            if self.eat(',') {
                continue;
            }
            self.expect_char(')', "`)` of call")?;
            return Ok(args);
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ExprError> {
        self.skip_ws();
        match self.peek() {
            None => Err(ExprError::UnexpectedEnd(self.pos)),
            Some('(') => {
                self.pos += 1;
                self.skip_ws();
                let expr = self.parse_ternary()?;
                self.expect_char(')', "closing `)`")?;
                Ok(expr)
            }
            Some('[') => {
                self.pos += 1;
                let mut elements = Vec::new();
                self.skip_ws();
                if self.eat(']') {
                    return Ok(Expr::Array(elements));
                }
                loop {
                    self.skip_ws();
                    elements.push(self.parse_ternary()?);
                    self.skip_ws();
                    if self.eat(',') {
                        continue;
                    }
                    self.expect_char(']', "`]` of array")?;
                    return Ok(Expr::Array(elements));
                }
            }
            Some('{') => {
                self.pos += 1;
                let mut entries = Vec::new();
                self.skip_ws();
                if self.eat('}') {
                    return Ok(Expr::Object(entries));
                }
                loop {
                    self.skip_ws();
                    let key = match self.peek() {
                        Some('"') | Some('\'') => self.parse_string()?,
                        _ => self.parse_ident_name()?,
                    };
                    self.expect_char(':', "`:` of object entry")?;
                    self.skip_ws();
                    let value = self.parse_ternary()?;
                    entries.push((key, value));
                    self.skip_ws();
                    if self.eat(',') {
                        continue;
                    }
                    self.expect_char('}', "`}` of object")?;
                    return Ok(Expr::Object(entries));
                }
            }
            Some('"') | Some('\'') => Ok(Expr::Str(self.parse_string()?)),
            Some(c) if c.is_ascii_digit() => self.parse_number(),
            Some(c) if is_ident_start(c) => {
                let name = self.parse_ident_name()?;
                match name.as_str() {
                    "true" => Ok(Expr::Bool(true)),
                    "false" => Ok(Expr::Bool(false)),
                    "null" => Ok(Expr::Null),
                    "undefined" => Ok(Expr::Undefined),
                    "function" => self.parse_function(),
                    _ => Ok(Expr::Ident(name)),
                }
            }
            Some(ch) => Err(ExprError::UnexpectedChar { ch, at: self.pos }),
        }
    }

    fn parse_function(&mut self) -> Result<Expr, ExprError> {
        self.expect_char('(', "`(` of function params")?;
        let mut params = Vec::new();
        self.skip_ws();
        if !self.eat(')') {
            loop {
                self.skip_ws();
                params.push(self.parse_ident_name()?);
                self.skip_ws();
                if self.eat(',') {
                    continue;
                }
                self.expect_char(')', "`)` of function params")?;
                break;
            }
        }
        self.expect_char('{', "`{` of function body")?;
        self.skip_ws();
        let keyword = self.parse_ident_name()?;
        if keyword != "return" {
            return Err(ExprError::Expected {
                what: "`return`",
                at: self.pos,
            });
        }
        self.skip_ws();
        let body = self.parse_ternary()?;
        self.skip_ws();
        self.eat(';');
        self.expect_char('}', "`}` of function body")?;
        Ok(Expr::Function {
            params,
            body: Box::new(body),
        })
    }

    fn parse_ident_name(&mut self) -> Result<String, ExprError> {
        self.skip_ws();
        match self.peek() {
            Some(c) if is_ident_start(c) => {}
            Some(ch) => return Err(ExprError::UnexpectedChar { ch, at: self.pos }),
            None => return Err(ExprError::UnexpectedEnd(self.pos)),
        }
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if is_ident_continue(c) {
                name.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        Ok(name)
    }

    fn parse_number(&mut self) -> Result<Expr, ExprError> {
        let start = self.pos;
        let mut text = String::new();
        let mut seen_dot = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.pos += 1;
            } else if c == '.' && !seen_dot && matches!(self.peek_at(1), Some(d) if d.is_ascii_digit())
            {
                seen_dot = true;
                text.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        text.parse::<f64>()
            .map(Expr::Num)
            .map_err(|_| ExprError::BadNumber(start))
    }

    /// Inverts the generator's literal escaping exactly; unknown escapes
    /// pass the escaped character through.
    fn parse_string(&mut self) -> Result<String, ExprError> {
        let quote = match self.bump() {
            Some(q @ ('"' | '\'')) => q,
            _ => {
                return Err(ExprError::Expected {
                    what: "string literal",
                    at: self.pos,
                })
            }
        };
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(ExprError::UnexpectedEnd(self.pos)),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => match self.bump() {
                    None => return Err(ExprError::UnexpectedEnd(self.pos)),
                    Some('n') => out.push('\n'),
                    Some('r') => out.push('\r'),
                    Some('t') => out.push('\t'),
                    Some('u') => {
                        let mut code = 0u32;
                        for _ in 0..4 {
                            let digit = self
                                .bump()
                                .and_then(|c| c.to_digit(16))
                                .ok_or(ExprError::Expected {
                                    what: "four hex digits after \\u",
                                    at: self.pos,
                                })?;
                            code = code * 16 + digit;
                        }
                        out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
                    }
                    Some(other) => out.push(other),
                },
                Some(c) => out.push(c),
            }
        }
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_helper_call() {
        let expr = parse_expr("_c(\"div\",[_v(\"hi\")])").unwrap();
        match expr {
            Expr::Call { callee, args } => {
                assert_eq!(*callee, Expr::Ident("_c".to_string()));
                assert_eq!(args.len(), 2);
                assert_eq!(args[0], Expr::Str("div".to_string()));
            }
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_string_escapes_round_trip() {
        let quoted = crate::parse_util::quote_str("a\"b\\c\nd");
        let expr = parse_expr(&quoted).unwrap();
        assert_eq!(expr, Expr::Str("a\"b\\c\nd".to_string()));
    }

    #[test]
    fn test_ternary_is_right_associative() {
        let expr = parse_expr("a?b:c?d:e").unwrap();
        match expr {
            Expr::Ternary { otherwise, .. } => {
                assert!(matches!(*otherwise, Expr::Ternary { .. }));
            }
            other => panic!("expected ternary, got {:?}", other),
        }
    }

    #[test]
    fn test_function_literal() {
        let expr = parse_expr("function(item,i){return _v(_s(item))}").unwrap();
        match expr {
            Expr::Function { params, .. } => {
                assert_eq!(params, vec!["item".to_string(), "i".to_string()]);
            }
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_member_and_index_chains() {
        let expr = parse_expr("user.names[0]").unwrap();
        assert!(matches!(expr, Expr::Index { .. }));
    }

    #[test]
    fn test_trailing_garbage_is_rejected() {
        assert!(parse_expr("_e() )").is_err());
        assert!(parse_expr("(1 + )").is_err());
    }

    #[test]
    fn test_operator_precedence() {
        // `a || b && c` parses as `a || (b && c)`.
        let expr = parse_expr("a || b && c").unwrap();
        match expr {
            Expr::Binary { op, right, .. } => {
                assert_eq!(op, BinaryOp::Or);
                assert!(matches!(
                    *right,
                    Expr::Binary {
                        op: BinaryOp::And,
                        ..
                    }
                ));
            }
            other => panic!("expected binary, got {:?}", other),
        }
    }
}
