//! Inline node-function expressions.
//!
//! A function reference whose trimmed text starts with `|` is an inline
//! expression: a closure header naming the context binding followed by a
//! single expression body, e.g. `|ctx| ctx["start"].data` or
//! `|ctx| sum(ctx.input.numbers)`. The body is parsed once at resolve
//! time into an AST and evaluated against the execution context on every
//! invocation; no code is ever compiled or loaded at runtime.

use catwalk_core::ExecutionContext;
use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Error from parsing or evaluating an inline expression.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ExprError(String);

fn err<T>(msg: impl Into<String>) -> Result<T, ExprError> {
    Err(ExprError(msg.into()))
}

/// A parsed inline expression, ready to evaluate against a context.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpr {
    body: Expr,
}

impl CompiledExpr {
    /// Parse `|binding| body`. The binding identifier denotes the whole
    /// execution context inside the body.
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        let trimmed = source.trim();
        let rest = match trimmed.strip_prefix('|') {
            Some(rest) => rest,
            None => return err("inline expression must start with '|'"),
        };
        let close = match rest.find('|') {
            Some(pos) => pos,
            None => return err("unterminated closure header, expected '|'"),
        };
        let binding = rest[..close].trim();
        if !binding.is_empty() && !is_ident(binding) {
            return err(format!("invalid context binding '{binding}'"));
        }
        let body = &rest[close + 1..];
        if body.trim().is_empty() {
            return err("inline expression has an empty body");
        }

        let tokens = lex(body)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            binding: binding.to_string(),
        };
        let body = parser.expression()?;
        parser.expect_end()?;
        Ok(Self { body })
    }

    pub fn eval(&self, ctx: &ExecutionContext) -> Result<Value, ExprError> {
        eval(&self.body, ctx)
    }
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    /// The closure binding: the whole execution context as an object.
    Ctx,
    Index(Box<Expr>, Box<Expr>),
    Field(Box<Expr>, String),
    Unary(UnOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Call(Builtin, Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Builtin {
    Sum,
    Len,
    Min,
    Max,
    Str,
}

impl Builtin {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "sum" => Some(Self::Sum),
            "len" => Some(Self::Len),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            "str" => Some(Self::Str),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
}

fn lex(source: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = source.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            '{' => {
                tokens.push(Token::LBrace);
                i += 1;
            }
            '}' => {
                tokens.push(Token::RBrace);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            ':' => {
                tokens.push(Token::Colon);
                i += 1;
            }
            '.' => {
                tokens.push(Token::Dot);
                i += 1;
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '=' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::EqEq);
                    i += 2;
                } else {
                    return err("unexpected '=', did you mean '=='?");
                }
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::NotEq);
                    i += 2;
                } else {
                    tokens.push(Token::Bang);
                    i += 1;
                }
            }
            '<' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Le);
                    i += 2;
                } else {
                    tokens.push(Token::Lt);
                    i += 1;
                }
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Ge);
                    i += 2;
                } else {
                    tokens.push(Token::Gt);
                    i += 1;
                }
            }
            '&' => {
                if chars.get(i + 1) == Some(&'&') {
                    tokens.push(Token::AndAnd);
                    i += 2;
                } else {
                    return err("unexpected '&', did you mean '&&'?");
                }
            }
            '|' => {
                if chars.get(i + 1) == Some(&'|') {
                    tokens.push(Token::OrOr);
                    i += 2;
                } else {
                    return err("unexpected '|', did you mean '||'?");
                }
            }
            '"' | '\'' => {
                let quote = c;
                let mut value = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return err("unterminated string literal"),
                        Some(&ch) if ch == quote => {
                            i += 1;
                            break;
                        }
                        Some('\\') => {
                            let escaped = match chars.get(i + 1) {
                                Some('n') => '\n',
                                Some('t') => '\t',
                                Some('\\') => '\\',
                                Some(&q) if q == quote => q,
                                _ => return err("invalid escape in string literal"),
                            };
                            value.push(escaped);
                            i += 2;
                        }
                        Some(&ch) => {
                            value.push(ch);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::Str(value));
            }
            '0'..='9' => {
                let start = i;
                while matches!(chars.get(i), Some('0'..='9')) {
                    i += 1;
                }
                let mut is_float = false;
                if chars.get(i) == Some(&'.')
                    && matches!(chars.get(i + 1), Some('0'..='9'))
                {
                    is_float = true;
                    i += 1;
                    while matches!(chars.get(i), Some('0'..='9')) {
                        i += 1;
                    }
                }
                if matches!(chars.get(i), Some('e') | Some('E')) {
                    is_float = true;
                    i += 1;
                    if matches!(chars.get(i), Some('+') | Some('-')) {
                        i += 1;
                    }
                    if !matches!(chars.get(i), Some('0'..='9')) {
                        return err("malformed number literal");
                    }
                    while matches!(chars.get(i), Some('0'..='9')) {
                        i += 1;
                    }
                }
                let text: String = chars[start..i].iter().collect();
                if is_float {
                    let value = text
                        .parse::<f64>()
                        .map_err(|_| ExprError(format!("invalid number '{text}'")))?;
                    tokens.push(Token::Float(value));
                } else {
                    let value = text
                        .parse::<i64>()
                        .map_err(|_| ExprError(format!("integer '{text}' out of range")))?;
                    tokens.push(Token::Int(value));
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while matches!(chars.get(i), Some(ch) if ch.is_ascii_alphanumeric() || *ch == '_')
                {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return err(format!("unexpected character '{other}'")),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    binding: String,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<(), ExprError> {
        if self.eat(&token) {
            Ok(())
        } else {
            err(format!("expected {what}"))
        }
    }

    fn expect_end(&self) -> Result<(), ExprError> {
        match self.peek() {
            None => Ok(()),
            Some(token) => err(format!("unexpected trailing token {token:?}")),
        }
    }

    fn expression(&mut self) -> Result<Expr, ExprError> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.and_expr()?;
        while self.eat(&Token::OrOr) {
            let right = self.and_expr()?;
            left = Expr::Binary(BinOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.comparison()?;
        while self.eat(&Token::AndAnd) {
            let right = self.comparison()?;
            left = Expr::Binary(BinOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn comparison(&mut self) -> Result<Expr, ExprError> {
        let left = self.additive()?;
        let op = match self.peek() {
            Some(Token::EqEq) => BinOp::Eq,
            Some(Token::NotEq) => BinOp::Ne,
            Some(Token::Lt) => BinOp::Lt,
            Some(Token::Le) => BinOp::Le,
            Some(Token::Gt) => BinOp::Gt,
            Some(Token::Ge) => BinOp::Ge,
            _ => return Ok(left),
        };
        self.pos += 1;
        let right = self.additive()?;
        Ok(Expr::Binary(op, Box::new(left), Box::new(right)))
    }

    fn additive(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.multiplicative()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                Some(Token::Percent) => BinOp::Rem,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        if self.eat(&Token::Minus) {
            let operand = self.unary()?;
            return Ok(Expr::Unary(UnOp::Neg, Box::new(operand)));
        }
        if self.eat(&Token::Bang) {
            let operand = self.unary()?;
            return Ok(Expr::Unary(UnOp::Not, Box::new(operand)));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, ExprError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(&Token::LBracket) {
                let index = self.expression()?;
                self.expect(Token::RBracket, "']' after index")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else if self.eat(&Token::Dot) {
                let field = match self.advance() {
                    Some(Token::Ident(name)) => name,
                    _ => return err("expected field name after '.'"),
                };
                expr = Expr::Field(Box::new(expr), field);
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        match self.advance() {
            Some(Token::Int(n)) => Ok(Expr::Int(n)),
            Some(Token::Float(f)) => Ok(Expr::Float(f)),
            Some(Token::Str(s)) => Ok(Expr::Str(s)),
            Some(Token::LParen) => {
                let inner = self.expression()?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            Some(Token::LBracket) => {
                let mut items = Vec::new();
                if !self.eat(&Token::RBracket) {
                    loop {
                        items.push(self.expression()?);
                        if self.eat(&Token::RBracket) {
                            break;
                        }
                        self.expect(Token::Comma, "',' or ']' in array")?;
                    }
                }
                Ok(Expr::Array(items))
            }
            Some(Token::LBrace) => {
                let mut pairs = Vec::new();
                if !self.eat(&Token::RBrace) {
                    loop {
                        let key = match self.advance() {
                            Some(Token::Str(s)) => s,
                            Some(Token::Ident(name)) => name,
                            _ => return err("expected object key"),
                        };
                        self.expect(Token::Colon, "':' after object key")?;
                        pairs.push((key, self.expression()?));
                        if self.eat(&Token::RBrace) {
                            break;
                        }
                        self.expect(Token::Comma, "',' or '}' in object")?;
                    }
                }
                Ok(Expr::Object(pairs))
            }
            Some(Token::Ident(name)) => match name.as_str() {
                "null" => Ok(Expr::Null),
                "true" => Ok(Expr::Bool(true)),
                "false" => Ok(Expr::Bool(false)),
                _ if name == self.binding => Ok(Expr::Ctx),
                _ => {
                    if self.eat(&Token::LParen) {
                        let builtin = Builtin::from_name(&name).ok_or_else(|| {
                            ExprError(format!("unknown function '{name}'"))
                        })?;
                        let mut args = Vec::new();
                        if !self.eat(&Token::RParen) {
                            loop {
                                args.push(self.expression()?);
                                if self.eat(&Token::RParen) {
                                    break;
                                }
                                self.expect(Token::Comma, "',' or ')' in call")?;
                            }
                        }
                        Ok(Expr::Call(builtin, args))
                    } else {
                        err(format!("unknown identifier '{name}'"))
                    }
                }
            },
            Some(token) => err(format!("unexpected token {token:?}")),
            None => err("unexpected end of expression"),
        }
    }
}

fn eval(expr: &Expr, ctx: &ExecutionContext) -> Result<Value, ExprError> {
    match expr {
        Expr::Null => Ok(Value::Null),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Int(n) => Ok(Value::Number(Number::from(*n))),
        Expr::Float(f) => Number::from_f64(*f)
            .map(Value::Number)
            .ok_or_else(|| ExprError("non-finite float literal".into())),
        Expr::Str(s) => Ok(Value::String(s.clone())),
        Expr::Array(items) => items
            .iter()
            .map(|item| eval(item, ctx))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Expr::Object(pairs) => {
            let mut map = Map::new();
            for (key, value) in pairs {
                map.insert(key.clone(), eval(value, ctx)?);
            }
            Ok(Value::Object(map))
        }
        Expr::Ctx => Ok(ctx.to_value()),
        Expr::Index(target, index) => {
            let target = eval(target, ctx)?;
            let index = eval(index, ctx)?;
            index_value(&target, &index)
        }
        Expr::Field(target, field) => {
            let target = eval(target, ctx)?;
            index_value(&target, &Value::String(field.clone()))
        }
        Expr::Unary(op, operand) => {
            let value = eval(operand, ctx)?;
            match op {
                UnOp::Neg => match value {
                    Value::Number(n) => {
                        if let Some(i) = n.as_i64().and_then(i64::checked_neg) {
                            Ok(Value::Number(Number::from(i)))
                        } else {
                            float_value(-n.as_f64().unwrap_or(f64::NAN))
                        }
                    }
                    other => err(format!("cannot negate {}", type_name(&other))),
                },
                UnOp::Not => match value {
                    Value::Bool(b) => Ok(Value::Bool(!b)),
                    other => err(format!("cannot apply '!' to {}", type_name(&other))),
                },
            }
        }
        Expr::Binary(op, left, right) => {
            // Short-circuit the logical operators before evaluating the rhs.
            if matches!(op, BinOp::And | BinOp::Or) {
                let lhs = match eval(left, ctx)? {
                    Value::Bool(b) => b,
                    other => {
                        return err(format!(
                            "logical operator needs booleans, got {}",
                            type_name(&other)
                        ))
                    }
                };
                if (*op == BinOp::And && !lhs) || (*op == BinOp::Or && lhs) {
                    return Ok(Value::Bool(lhs));
                }
                return match eval(right, ctx)? {
                    Value::Bool(b) => Ok(Value::Bool(b)),
                    other => err(format!(
                        "logical operator needs booleans, got {}",
                        type_name(&other)
                    )),
                };
            }
            let lhs = eval(left, ctx)?;
            let rhs = eval(right, ctx)?;
            binary(*op, lhs, rhs)
        }
        Expr::Call(builtin, args) => {
            let args = args
                .iter()
                .map(|arg| eval(arg, ctx))
                .collect::<Result<Vec<_>, _>>()?;
            call_builtin(*builtin, args)
        }
    }
}

fn index_value(target: &Value, index: &Value) -> Result<Value, ExprError> {
    match (target, index) {
        (Value::Object(map), Value::String(key)) => map
            .get(key)
            .cloned()
            .ok_or_else(|| ExprError(format!("no entry '{key}' in object"))),
        (Value::Array(items), Value::Number(n)) => {
            let idx = n
                .as_u64()
                .ok_or_else(|| ExprError("array index must be a non-negative integer".into()))?
                as usize;
            items
                .get(idx)
                .cloned()
                .ok_or_else(|| ExprError(format!("array index {idx} out of bounds")))
        }
        (target, index) => err(format!(
            "cannot index {} with {}",
            type_name(target),
            type_name(index)
        )),
    }
}

fn binary(op: BinOp, lhs: Value, rhs: Value) -> Result<Value, ExprError> {
    use BinOp::*;
    match op {
        Add | Sub | Mul | Div | Rem => arithmetic(op, lhs, rhs),
        Eq => Ok(Value::Bool(values_equal(&lhs, &rhs))),
        Ne => Ok(Value::Bool(!values_equal(&lhs, &rhs))),
        Lt | Le | Gt | Ge => {
            let ordering = match (&lhs, &rhs) {
                (Value::Number(a), Value::Number(b)) => a
                    .as_f64()
                    .zip(b.as_f64())
                    .and_then(|(a, b)| a.partial_cmp(&b)),
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => None,
            };
            let ordering = ordering.ok_or_else(|| {
                ExprError(format!(
                    "cannot compare {} with {}",
                    type_name(&lhs),
                    type_name(&rhs)
                ))
            })?;
            let result = match op {
                Lt => ordering.is_lt(),
                Le => ordering.is_le(),
                Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            };
            Ok(Value::Bool(result))
        }
        And | Or => unreachable!("logical operators handled in eval"),
    }
}

fn arithmetic(op: BinOp, lhs: Value, rhs: Value) -> Result<Value, ExprError> {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => numeric(op, &a, &b),
        (Value::String(a), Value::String(b)) if op == BinOp::Add => {
            Ok(Value::String(a + &b))
        }
        (Value::Array(mut a), Value::Array(b)) if op == BinOp::Add => {
            a.extend(b);
            Ok(Value::Array(a))
        }
        (lhs, rhs) => err(format!(
            "unsupported operands for arithmetic: {} and {}",
            type_name(&lhs),
            type_name(&rhs)
        )),
    }
}

/// Integer arithmetic stays integer (except division); anything else runs
/// in f64.
fn numeric(op: BinOp, a: &Number, b: &Number) -> Result<Value, ExprError> {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        let int_result = match op {
            BinOp::Add => x.checked_add(y),
            BinOp::Sub => x.checked_sub(y),
            BinOp::Mul => x.checked_mul(y),
            BinOp::Rem => {
                if y == 0 {
                    return err("modulo by zero");
                }
                x.checked_rem(y)
            }
            BinOp::Div => None,
            _ => unreachable!(),
        };
        if let Some(n) = int_result {
            return Ok(Value::Number(Number::from(n)));
        }
        if op == BinOp::Div && y == 0 {
            return err("division by zero");
        }
    }

    let x = a.as_f64().ok_or_else(|| ExprError("invalid number".into()))?;
    let y = b.as_f64().ok_or_else(|| ExprError("invalid number".into()))?;
    let result = match op {
        BinOp::Add => x + y,
        BinOp::Sub => x - y,
        BinOp::Mul => x * y,
        BinOp::Div => {
            if y == 0.0 {
                return err("division by zero");
            }
            x / y
        }
        BinOp::Rem => {
            if y == 0.0 {
                return err("modulo by zero");
            }
            x % y
        }
        _ => unreachable!(),
    };
    float_value(result)
}

fn float_value(f: f64) -> Result<Value, ExprError> {
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| ExprError("arithmetic produced a non-finite number".into()))
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        // 1 and 1.0 compare equal regardless of JSON number representation.
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        _ => a == b,
    }
}

fn call_builtin(builtin: Builtin, args: Vec<Value>) -> Result<Value, ExprError> {
    let arity_error = |expected: usize| {
        ExprError(format!(
            "builtin takes {expected} argument(s), got {}",
            args.len()
        ))
    };
    match builtin {
        Builtin::Sum => {
            let [arg] = args.as_slice() else {
                return Err(arity_error(1));
            };
            let items = arg
                .as_array()
                .ok_or_else(|| ExprError("sum() needs an array".into()))?;
            let mut acc = Value::Number(Number::from(0));
            for item in items {
                acc = arithmetic(BinOp::Add, acc, item.clone())?;
            }
            Ok(acc)
        }
        Builtin::Len => {
            let [arg] = args.as_slice() else {
                return Err(arity_error(1));
            };
            let len = match arg {
                Value::Array(items) => items.len(),
                Value::String(s) => s.chars().count(),
                Value::Object(map) => map.len(),
                other => {
                    return err(format!("len() not defined for {}", type_name(other)))
                }
            };
            Ok(Value::Number(Number::from(len as i64)))
        }
        Builtin::Min | Builtin::Max => {
            let [arg] = args.as_slice() else {
                return Err(arity_error(1));
            };
            let items = arg
                .as_array()
                .filter(|items| !items.is_empty())
                .ok_or_else(|| ExprError("min()/max() need a non-empty array".into()))?;
            let mut best: Option<(&Value, f64)> = None;
            for item in items {
                let n = item
                    .as_f64()
                    .ok_or_else(|| ExprError("min()/max() need numbers".into()))?;
                let better = match best {
                    None => true,
                    Some((_, current)) => {
                        (builtin == Builtin::Min && n < current)
                            || (builtin == Builtin::Max && n > current)
                    }
                };
                if better {
                    best = Some((item, n));
                }
            }
            Ok(best.expect("non-empty array").0.clone())
        }
        Builtin::Str => {
            let [arg] = args.as_slice() else {
                return Err(arity_error(1));
            };
            Ok(Value::String(match arg {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }))
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(pairs: &[(&str, Value)]) -> ExecutionContext {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn eval_str(source: &str, ctx: &ExecutionContext) -> Result<Value, ExprError> {
        CompiledExpr::parse(source)?.eval(ctx)
    }

    #[test]
    fn literals() {
        let empty = ExecutionContext::new();
        assert_eq!(eval_str("|ctx| 42", &empty).unwrap(), json!(42));
        assert_eq!(eval_str("|ctx| 1.5", &empty).unwrap(), json!(1.5));
        assert_eq!(eval_str("|ctx| 'hi'", &empty).unwrap(), json!("hi"));
        assert_eq!(eval_str("|ctx| true", &empty).unwrap(), json!(true));
        assert_eq!(eval_str("|ctx| null", &empty).unwrap(), json!(null));
        assert_eq!(
            eval_str("|ctx| {'data': [1, 2, 3]}", &empty).unwrap(),
            json!({"data": [1, 2, 3]})
        );
    }

    #[test]
    fn integer_arithmetic_stays_integer() {
        let empty = ExecutionContext::new();
        assert_eq!(eval_str("|ctx| 2 + 3 * 4", &empty).unwrap(), json!(14));
        assert_eq!(eval_str("|ctx| 7 % 3", &empty).unwrap(), json!(1));
        assert_eq!(eval_str("|ctx| -(2 + 3)", &empty).unwrap(), json!(-5));
        // Division always produces a float.
        assert_eq!(eval_str("|ctx| 9 / 2", &empty).unwrap(), json!(4.5));
    }

    #[test]
    fn context_lookup_by_index_and_field() {
        let c = ctx(&[("start", json!({"data": [1, 2, 3]}))]);
        assert_eq!(
            eval_str("|ctx| ctx[\"start\"].data[1]", &c).unwrap(),
            json!(2)
        );
        assert_eq!(
            eval_str("|ctx| ctx.start.data", &c).unwrap(),
            json!([1, 2, 3])
        );
    }

    #[test]
    fn binding_name_is_respected() {
        let c = ctx(&[("a", json!(10))]);
        assert_eq!(eval_str("|state| state.a + 1", &c).unwrap(), json!(11));
        assert!(eval_str("|state| ctx.a", &c).is_err());
    }

    #[test]
    fn string_concat_and_str_builtin() {
        let c = ctx(&[("process", json!(15))]);
        assert_eq!(
            eval_str("|ctx| 'Sum: ' + str(ctx.process)", &c).unwrap(),
            json!("Sum: 15")
        );
    }

    #[test]
    fn sum_len_min_max() {
        let c = ctx(&[("input", json!({"numbers": [1, 2, 3, 4, 5]}))]);
        assert_eq!(
            eval_str("|ctx| sum(ctx.input.numbers)", &c).unwrap(),
            json!(15)
        );
        assert_eq!(
            eval_str("|ctx| len(ctx.input.numbers) > 0", &c).unwrap(),
            json!(true)
        );
        assert_eq!(eval_str("|ctx| min([3, 1, 2])", &c).unwrap(), json!(1));
        assert_eq!(eval_str("|ctx| max([3, 1, 2])", &c).unwrap(), json!(3));
    }

    #[test]
    fn comparison_and_logic() {
        let empty = ExecutionContext::new();
        assert_eq!(eval_str("|ctx| 1 == 1.0", &empty).unwrap(), json!(true));
        assert_eq!(
            eval_str("|ctx| 1 < 2 && 'a' != 'b'", &empty).unwrap(),
            json!(true)
        );
        assert_eq!(
            eval_str("|ctx| false || !false", &empty).unwrap(),
            json!(true)
        );
    }

    #[test]
    fn logical_operators_short_circuit() {
        // The rhs would fail if evaluated; short-circuit must skip it.
        let empty = ExecutionContext::new();
        assert_eq!(
            eval_str("|ctx| false && ctx.missing == 1", &empty).unwrap(),
            json!(false)
        );
    }

    #[test]
    fn missing_context_entry_is_an_eval_error() {
        let empty = ExecutionContext::new();
        assert!(eval_str("|ctx| ctx[\"absent\"]", &empty).is_err());
    }

    #[test]
    fn division_by_zero_is_an_eval_error() {
        let empty = ExecutionContext::new();
        assert!(eval_str("|ctx| 1 / 0", &empty).is_err());
        assert!(eval_str("|ctx| 1 % 0", &empty).is_err());
    }

    #[test]
    fn parse_errors() {
        assert!(CompiledExpr::parse("ctx + 1").is_err());
        assert!(CompiledExpr::parse("|ctx|").is_err());
        assert!(CompiledExpr::parse("|ctx| 1 +").is_err());
        assert!(CompiledExpr::parse("|ctx| nope(1)").is_err());
        assert!(CompiledExpr::parse("|ctx| unknown_name").is_err());
        assert!(CompiledExpr::parse("|ctx| 'unterminated").is_err());
        assert!(CompiledExpr::parse("|ctx| 1 2").is_err());
    }

    #[test]
    fn empty_binding_is_allowed() {
        let empty = ExecutionContext::new();
        assert_eq!(eval_str("|| 1 + 1", &empty).unwrap(), json!(2));
    }
}
