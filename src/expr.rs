//! Arithmetic expressions for parametric productions.
//!
//! Conditions such as `l > 1 and w < 10` and successor parameters such as
//! `l*0.6` are compiled once into a small AST and evaluated against a
//! [`Scope`] each time a production is tried. The grammar is closed: numbers,
//! identifiers, arithmetic, comparisons, boolean connectives and a fixed set
//! of math functions. Nothing else can be executed.
//!
//! ```text
//! expr    := or
//! or      := and (("or" | "||") and)*
//! and     := not (("and" | "&&") not)*
//! not     := ("not" | "!") not | compare
//! compare := sum (("<" | "<=" | ">" | ">=" | "==" | "!=") sum)?
//! sum     := product (("+" | "-") product)*
//! product := unary (("*" | "/" | "%") unary)*
//! unary   := ("-" | "+") unary | power
//! power   := atom ("**" unary)?
//! atom    := number | ident | ident "(" args ")" | "(" expr ")"
//! ```
//!
//! Booleans are represented as `1.0` / `0.0`; any non-zero value is truthy.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("unexpected character `{0}` at offset {1}")]
    UnexpectedChar(char, usize),

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unexpected token `{0}`")]
    UnexpectedToken(String),

    #[error("invalid number `{0}`")]
    InvalidNumber(String),

    #[error("unknown identifier `{0}`")]
    UnknownIdentifier(String),

    #[error("unknown function `{0}`")]
    UnknownFunction(String),

    #[error("function `{name}` expects {expected} argument(s), got {got}")]
    Arity {
        name: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("`{0}` produced a non-finite result")]
    Domain(&'static str),
}

/// Variable lookup used during evaluation.
pub trait Scope {
    fn lookup(&self, name: &str) -> Option<f64>;
}

impl Scope for () {
    fn lookup(&self, _name: &str) -> Option<f64> {
        None
    }
}

impl Scope for HashMap<String, f64> {
    fn lookup(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}

impl Scope for BTreeMap<String, f64> {
    fn lookup(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}

impl Scope for [(&str, f64)] {
    fn lookup(&self, name: &str) -> Option<f64> {
        self.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
    }
}

impl<const N: usize> Scope for [(&str, f64); N] {
    fn lookup(&self, name: &str) -> Option<f64> {
        self.as_slice().lookup(name)
    }
}

/// A compiled expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    source: String,
    root: Node,
}

impl Expr {
    /// Compiles `source`. Malformed text is reported here, never at
    /// evaluation time.
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        let tokens = tokenize(source)?;
        let mut parser = Parser { tokens, pos: 0 };
        let root = parser.expr()?;
        if let Some(token) = parser.peek() {
            return Err(ExprError::UnexpectedToken(token.to_string()));
        }
        Ok(Self {
            source: source.trim().to_string(),
            root,
        })
    }

    /// A literal that always evaluates to `value`.
    pub fn constant(value: f64) -> Self {
        Self {
            source: value.to_string(),
            root: Node::Num(value),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn eval<S: Scope + ?Sized>(&self, scope: &S) -> Result<f64, ExprError> {
        self.root.eval(scope)
    }

    /// Evaluates as a condition: any non-zero result is `true`.
    pub fn eval_bool<S: Scope + ?Sized>(&self, scope: &S) -> Result<bool, ExprError> {
        self.eval(scope).map(truthy)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Parses and evaluates `source` in one step.
pub fn evaluate<S: Scope + ?Sized>(source: &str, scope: &S) -> Result<f64, ExprError> {
    Expr::parse(source)?.eval(scope)
}

fn truthy(value: f64) -> bool {
    value != 0.0
}

fn flag(value: bool) -> f64 {
    if value { 1.0 } else { 0.0 }
}

// ---------------------------------------------------------------------------
// AST
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

/// Short-circuit connectives. Kept apart from [`BinOp`] because the right
/// operand is only evaluated when needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Logic {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Func {
    Sqrt,
    Abs,
    Sin,
    Cos,
    Tan,
    Atan,
    Log,
    Exp,
    Floor,
    Ceil,
    Min,
    Max,
    Pow,
}

impl Func {
    fn lookup(name: &str) -> Option<Self> {
        Some(match name {
            "sqrt" => Func::Sqrt,
            "abs" => Func::Abs,
            "sin" => Func::Sin,
            "cos" => Func::Cos,
            "tan" => Func::Tan,
            "atan" => Func::Atan,
            "log" => Func::Log,
            "exp" => Func::Exp,
            "floor" => Func::Floor,
            "ceil" => Func::Ceil,
            "min" => Func::Min,
            "max" => Func::Max,
            "pow" => Func::Pow,
            _ => return None,
        })
    }

    fn name(self) -> &'static str {
        match self {
            Func::Sqrt => "sqrt",
            Func::Abs => "abs",
            Func::Sin => "sin",
            Func::Cos => "cos",
            Func::Tan => "tan",
            Func::Atan => "atan",
            Func::Log => "log",
            Func::Exp => "exp",
            Func::Floor => "floor",
            Func::Ceil => "ceil",
            Func::Min => "min",
            Func::Max => "max",
            Func::Pow => "pow",
        }
    }

    /// `None` means variadic with at least one argument.
    fn arity(self) -> Option<usize> {
        match self {
            Func::Min | Func::Max => None,
            Func::Pow => Some(2),
            _ => Some(1),
        }
    }

    fn apply(self, args: &[f64]) -> f64 {
        match self {
            Func::Sqrt => args[0].sqrt(),
            Func::Abs => args[0].abs(),
            Func::Sin => args[0].sin(),
            Func::Cos => args[0].cos(),
            Func::Tan => args[0].tan(),
            Func::Atan => args[0].atan(),
            Func::Log => args[0].ln(),
            Func::Exp => args[0].exp(),
            Func::Floor => args[0].floor(),
            Func::Ceil => args[0].ceil(),
            Func::Min => args.iter().copied().fold(f64::INFINITY, f64::min),
            Func::Max => args.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Func::Pow => args[0].powf(args[1]),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Num(f64),
    Var(String),
    Neg(Box<Node>),
    Not(Box<Node>),
    Binary(BinOp, Box<Node>, Box<Node>),
    Logic(Logic, Box<Node>, Box<Node>),
    Call(Func, Vec<Node>),
}

impl Node {
    fn eval<S: Scope + ?Sized>(&self, scope: &S) -> Result<f64, ExprError> {
        match self {
            Node::Num(v) => Ok(*v),
            Node::Var(name) => scope
                .lookup(name)
                .or_else(|| builtin_constant(name))
                .ok_or_else(|| ExprError::UnknownIdentifier(name.clone())),
            Node::Neg(inner) => Ok(-inner.eval(scope)?),
            Node::Not(inner) => Ok(flag(!truthy(inner.eval(scope)?))),
            Node::Logic(logic, lhs, rhs) => {
                let left = truthy(lhs.eval(scope)?);
                match (logic, left) {
                    (Logic::And, false) => Ok(0.0),
                    (Logic::Or, true) => Ok(1.0),
                    _ => Ok(flag(truthy(rhs.eval(scope)?))),
                }
            }
            Node::Binary(op, lhs, rhs) => {
                let a = lhs.eval(scope)?;
                let b = rhs.eval(scope)?;
                binary(*op, a, b)
            }
            Node::Call(func, args) => {
                let values = args
                    .iter()
                    .map(|a| a.eval(scope))
                    .collect::<Result<Vec<_>, _>>()?;
                let result = func.apply(&values);
                if result.is_finite() {
                    Ok(result)
                } else {
                    Err(ExprError::Domain(func.name()))
                }
            }
        }
    }
}

fn builtin_constant(name: &str) -> Option<f64> {
    match name {
        "pi" | "PI" => Some(std::f64::consts::PI),
        "e" => Some(std::f64::consts::E),
        _ => None,
    }
}

fn binary(op: BinOp, a: f64, b: f64) -> Result<f64, ExprError> {
    let value = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => {
            if b == 0.0 {
                return Err(ExprError::DivisionByZero);
            }
            a / b
        }
        BinOp::Rem => {
            if b == 0.0 {
                return Err(ExprError::DivisionByZero);
            }
            a.rem_euclid(b)
        }
        BinOp::Pow => {
            let v = a.powf(b);
            if !v.is_finite() {
                return Err(ExprError::Domain("**"));
            }
            v
        }
        BinOp::Lt => flag(a < b),
        BinOp::Le => flag(a <= b),
        BinOp::Gt => flag(a > b),
        BinOp::Ge => flag(a >= b),
        BinOp::Eq => flag(a == b),
        BinOp::Ne => flag(a != b),
    };
    Ok(value)
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Op(BinOp),
    Logic(Logic),
    Not,
    LParen,
    RParen,
    Comma,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Num(v) => write!(f, "{v}"),
            Token::Ident(name) => f.write_str(name),
            Token::Op(op) => f.write_str(match op {
                BinOp::Add => "+",
                BinOp::Sub => "-",
                BinOp::Mul => "*",
                BinOp::Div => "/",
                BinOp::Rem => "%",
                BinOp::Pow => "**",
                BinOp::Lt => "<",
                BinOp::Le => "<=",
                BinOp::Gt => ">",
                BinOp::Ge => ">=",
                BinOp::Eq => "==",
                BinOp::Ne => "!=",
            }),
            Token::Logic(Logic::And) => f.write_str("and"),
            Token::Logic(Logic::Or) => f.write_str("or"),
            Token::Not => f.write_str("not"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::Comma => f.write_str(","),
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>, ExprError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c.is_ascii_digit() || (c == '.' && next.is_some_and(|n| n.is_ascii_digit())) {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            // Exponent only when followed by a digit (optionally signed), so
            // `2*e` and `2e` keep `e` as the constant.
            if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                let mut j = i + 1;
                if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                    j += 1;
                }
                if j < chars.len() && chars[j].is_ascii_digit() {
                    i = j;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
            }
            let text: String = chars[start..i].iter().collect();
            let value = text
                .parse::<f64>()
                .map_err(|_| ExprError::InvalidNumber(text.clone()))?;
            tokens.push(Token::Num(value));
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            tokens.push(match word.as_str() {
                "and" => Token::Logic(Logic::And),
                "or" => Token::Logic(Logic::Or),
                "not" => Token::Not,
                _ => Token::Ident(word),
            });
            continue;
        }

        let (token, width) = match (c, next) {
            ('*', Some('*')) => (Token::Op(BinOp::Pow), 2),
            ('<', Some('=')) => (Token::Op(BinOp::Le), 2),
            ('>', Some('=')) => (Token::Op(BinOp::Ge), 2),
            ('=', Some('=')) => (Token::Op(BinOp::Eq), 2),
            ('!', Some('=')) => (Token::Op(BinOp::Ne), 2),
            ('&', Some('&')) => (Token::Logic(Logic::And), 2),
            ('|', Some('|')) => (Token::Logic(Logic::Or), 2),
            ('+', _) => (Token::Op(BinOp::Add), 1),
            ('-', _) => (Token::Op(BinOp::Sub), 1),
            ('*', _) => (Token::Op(BinOp::Mul), 1),
            ('/', _) => (Token::Op(BinOp::Div), 1),
            ('%', _) => (Token::Op(BinOp::Rem), 1),
            ('<', _) => (Token::Op(BinOp::Lt), 1),
            ('>', _) => (Token::Op(BinOp::Gt), 1),
            ('=', _) => (Token::Op(BinOp::Eq), 1),
            ('!', _) => (Token::Not, 1),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            (',', _) => (Token::Comma, 1),
            _ => return Err(ExprError::UnexpectedChar(c, i)),
        };
        tokens.push(token);
        i += width;
    }

    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat_op(&mut self, ops: &[BinOp]) -> Option<BinOp> {
        match self.peek() {
            Some(Token::Op(op)) if ops.contains(op) => {
                let op = *op;
                self.pos += 1;
                Some(op)
            }
            _ => None,
        }
    }

    fn eat_logic(&mut self, logic: Logic) -> bool {
        if self.peek() == Some(&Token::Logic(logic)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), ExprError> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(ExprError::UnexpectedToken(token.to_string())),
            None => Err(ExprError::UnexpectedEnd),
        }
    }

    fn expr(&mut self) -> Result<Node, ExprError> {
        self.or()
    }

    fn or(&mut self) -> Result<Node, ExprError> {
        let mut lhs = self.and()?;
        while self.eat_logic(Logic::Or) {
            let rhs = self.and()?;
            lhs = Node::Logic(Logic::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Node, ExprError> {
        let mut lhs = self.not()?;
        while self.eat_logic(Logic::And) {
            let rhs = self.not()?;
            lhs = Node::Logic(Logic::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn not(&mut self) -> Result<Node, ExprError> {
        if matches!(self.peek(), Some(Token::Not)) {
            self.pos += 1;
            return Ok(Node::Not(Box::new(self.not()?)));
        }
        self.compare()
    }

    fn compare(&mut self) -> Result<Node, ExprError> {
        let lhs = self.sum()?;
        let ops = [
            BinOp::Lt,
            BinOp::Le,
            BinOp::Gt,
            BinOp::Ge,
            BinOp::Eq,
            BinOp::Ne,
        ];
        if let Some(op) = self.eat_op(&ops) {
            let rhs = self.sum()?;
            return Ok(Node::Binary(op, Box::new(lhs), Box::new(rhs)));
        }
        Ok(lhs)
    }

    fn sum(&mut self) -> Result<Node, ExprError> {
        let mut lhs = self.product()?;
        while let Some(op) = self.eat_op(&[BinOp::Add, BinOp::Sub]) {
            let rhs = self.product()?;
            lhs = Node::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn product(&mut self) -> Result<Node, ExprError> {
        let mut lhs = self.unary()?;
        while let Some(op) = self.eat_op(&[BinOp::Mul, BinOp::Div, BinOp::Rem]) {
            let rhs = self.unary()?;
            lhs = Node::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Node, ExprError> {
        if self.eat_op(&[BinOp::Sub]).is_some() {
            return Ok(Node::Neg(Box::new(self.unary()?)));
        }
        if self.eat_op(&[BinOp::Add]).is_some() {
            return self.unary();
        }
        self.power()
    }

    fn power(&mut self) -> Result<Node, ExprError> {
        let base = self.atom()?;
        if self.eat_op(&[BinOp::Pow]).is_some() {
            let exponent = self.unary()?;
            return Ok(Node::Binary(BinOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Node, ExprError> {
        match self.next() {
            Some(Token::Num(v)) => Ok(Node::Num(v)),
            Some(Token::Ident(name)) => {
                if matches!(self.peek(), Some(Token::LParen)) {
                    self.pos += 1;
                    self.call(name)
                } else {
                    Ok(Node::Var(name))
                }
            }
            Some(Token::LParen) => {
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(token) => Err(ExprError::UnexpectedToken(token.to_string())),
            None => Err(ExprError::UnexpectedEnd),
        }
    }

    fn call(&mut self, name: String) -> Result<Node, ExprError> {
        let func = Func::lookup(&name).ok_or(ExprError::UnknownFunction(name))?;
        let mut args = Vec::new();
        if matches!(self.peek(), Some(Token::RParen)) {
            self.pos += 1;
        } else {
            loop {
                args.push(self.expr()?);
                match self.next() {
                    Some(Token::Comma) => continue,
                    Some(Token::RParen) => break,
                    Some(token) => return Err(ExprError::UnexpectedToken(token.to_string())),
                    None => return Err(ExprError::UnexpectedEnd),
                }
            }
        }

        match func.arity() {
            Some(expected) if expected != args.len() => Err(ExprError::Arity {
                name: func.name(),
                expected,
                got: args.len(),
            }),
            None if args.is_empty() => Err(ExprError::Arity {
                name: func.name(),
                expected: 1,
                got: 0,
            }),
            _ => Ok(Node::Call(func, args)),
        }
    }
}
