//! Expression parsing and evaluation
//!
//! Hand-rolled tokenizer + recursive descent parser for a small math
//! grammar: `+ - * / ^`, parentheses, a closed set of named functions
//! (sin, cos, exp, sqrt, ...), the constants `pi` and `e`, and one free
//! variable (`x` or `t` depending on plot mode).
//!
//! Precedence, loosest to tightest: additive, multiplicative, unary
//! minus, power (right-associative). `-x^2` is `-(x^2)`.

use std::fmt;
use thiserror::Error;

// Hard caps on expression size. Oversized input is rejected while
// tokenizing and parsing so that recursion in parse, eval and drop
// stays within stack bounds.
const MAX_TOKENS: usize = 2048;
const MAX_DEPTH: usize = 64;

/// Errors from tokenizing, parsing or evaluating an expression.
/// The Display text is user-facing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("unexpected '{0}'")]
    UnexpectedToken(String),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
    #[error("unknown symbol '{0}'")]
    UnknownSymbol(String),
    #[error("expression too long")]
    TooLong,
    #[error("expression too deeply nested")]
    TooDeep,
    #[error("division by zero")]
    DivisionByZero,
    #[error("logarithm of a non-positive number")]
    LogDomain,
    #[error("square root of a negative number")]
    SqrtDomain,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::Ident(s) => write!(f, "{}", s),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Caret => write!(f, "^"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Eof => write!(f, "end of expression"),
        }
    }
}

struct Tokenizer {
    chars: Vec<char>,
    pos: usize,
}

impl Tokenizer {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn next_token(&mut self) -> Result<Token, ExprError> {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }

        let c = match self.peek() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        match c {
            '0'..='9' | '.' => self.read_number(),
            c if c.is_alphabetic() || c == '_' => Ok(self.read_ident()),
            '+' => {
                self.pos += 1;
                Ok(Token::Plus)
            }
            '-' => {
                self.pos += 1;
                Ok(Token::Minus)
            }
            '*' => {
                self.pos += 1;
                Ok(Token::Star)
            }
            '/' => {
                self.pos += 1;
                Ok(Token::Slash)
            }
            '^' => {
                self.pos += 1;
                Ok(Token::Caret)
            }
            '(' => {
                self.pos += 1;
                Ok(Token::LParen)
            }
            ')' => {
                self.pos += 1;
                Ok(Token::RParen)
            }
            other => Err(ExprError::UnexpectedChar(other)),
        }
    }

    fn read_number(&mut self) -> Result<Token, ExprError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '.') {
            self.pos += 1;
        }

        // An 'e' suffix is an exponent only when digits follow; otherwise
        // it is left alone so "2*e" still tokenizes as the constant.
        if matches!(self.peek(), Some('e') | Some('E')) {
            let mut ahead = self.pos + 1;
            if matches!(self.chars.get(ahead), Some('+') | Some('-')) {
                ahead += 1;
            }
            if matches!(self.chars.get(ahead), Some(c) if c.is_ascii_digit()) {
                self.pos = ahead;
                while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
        }

        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| ExprError::InvalidNumber(text))
    }

    fn read_ident(&mut self) -> Token {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        Token::Ident(self.chars[start..self.pos].iter().collect())
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokenizer = Tokenizer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = tokenizer.next_token()?;
        if tokens.len() >= MAX_TOKENS {
            return Err(ExprError::TooLong);
        }
        let done = token == Token::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

/// Named functions recognized in expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Exp,
    Ln,
    Sqrt,
    Abs,
}

impl Func {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "sin" => Some(Func::Sin),
            "cos" => Some(Func::Cos),
            "tan" => Some(Func::Tan),
            "asin" => Some(Func::Asin),
            "acos" => Some(Func::Acos),
            "atan" => Some(Func::Atan),
            "sinh" => Some(Func::Sinh),
            "cosh" => Some(Func::Cosh),
            "tanh" => Some(Func::Tanh),
            "exp" => Some(Func::Exp),
            // log means natural log, same as the usual CAS convention
            "ln" | "log" => Some(Func::Ln),
            "sqrt" => Some(Func::Sqrt),
            "abs" => Some(Func::Abs),
            _ => None,
        }
    }

    fn apply(self, x: f64) -> Result<f64, ExprError> {
        match self {
            Func::Sin => Ok(x.sin()),
            Func::Cos => Ok(x.cos()),
            Func::Tan => Ok(x.tan()),
            Func::Asin => Ok(x.asin()),
            Func::Acos => Ok(x.acos()),
            Func::Atan => Ok(x.atan()),
            Func::Sinh => Ok(x.sinh()),
            Func::Cosh => Ok(x.cosh()),
            Func::Tanh => Ok(x.tanh()),
            Func::Exp => Ok(x.exp()),
            Func::Ln => {
                if x <= 0.0 {
                    Err(ExprError::LogDomain)
                } else {
                    Ok(x.ln())
                }
            }
            Func::Sqrt => {
                if x < 0.0 {
                    Err(ExprError::SqrtDomain)
                } else {
                    Ok(x.sqrt())
                }
            }
            Func::Abs => Ok(x.abs()),
        }
    }
}

/// Parsed expression tree in one free variable
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Var,
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Pow(Box<Expr>, Box<Expr>),
    Call(Func, Box<Expr>),
}

impl Expr {
    /// Parse an expression whose free variable is named `var`.
    ///
    /// Any other bare identifier (besides `pi` and `e`) is an error, as is
    /// anything left over after a complete expression. Input beyond a fixed
    /// token or nesting budget is rejected.
    pub fn parse(input: &str, var: &str) -> Result<Self, ExprError> {
        let tokens = tokenize(input)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
            var: var.to_string(),
        };
        let expr = parser.parse_expr()?;
        match parser.peek() {
            Token::Eof => Ok(expr),
            token => Err(ExprError::UnexpectedToken(token.to_string())),
        }
    }

    /// Evaluate at a single point.
    ///
    /// Division by zero, log of a non-positive value and sqrt of a
    /// negative value are errors; other IEEE results (inf, NaN) pass
    /// through and are handled by the renderer.
    pub fn eval(&self, v: f64) -> Result<f64, ExprError> {
        match self {
            Expr::Num(n) => Ok(*n),
            Expr::Var => Ok(v),
            Expr::Neg(e) => Ok(-e.eval(v)?),
            Expr::Add(a, b) => Ok(a.eval(v)? + b.eval(v)?),
            Expr::Sub(a, b) => Ok(a.eval(v)? - b.eval(v)?),
            Expr::Mul(a, b) => Ok(a.eval(v)? * b.eval(v)?),
            Expr::Div(a, b) => {
                let denom = b.eval(v)?;
                if denom == 0.0 {
                    return Err(ExprError::DivisionByZero);
                }
                Ok(a.eval(v)? / denom)
            }
            Expr::Pow(a, b) => Ok(a.eval(v)?.powf(b.eval(v)?)),
            Expr::Call(func, arg) => func.apply(arg.eval(v)?),
        }
    }

    /// Evaluate elementwise over a slice of sample points.
    ///
    /// The first failing sample aborts the whole sampling with its error.
    pub fn sample(&self, xs: &[f64]) -> Result<Vec<f64>, ExprError> {
        xs.iter().map(|&x| self.eval(x)).collect()
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    var: String,
}

impl Parser {
    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn bump(&mut self) -> Token {
        let token = self.tokens.get(self.pos).cloned().unwrap_or(Token::Eof);
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> Result<(), ExprError> {
        if self.peek() == expected {
            self.bump();
            Ok(())
        } else {
            Err(match self.peek() {
                Token::Eof => ExprError::UnexpectedEnd,
                token => ExprError::UnexpectedToken(token.to_string()),
            })
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, ExprError> {
        self.parse_additive()
    }

    fn parse_additive(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            match self.peek() {
                Token::Plus => {
                    self.bump();
                    let rhs = self.parse_multiplicative()?;
                    lhs = Expr::Add(Box::new(lhs), Box::new(rhs));
                }
                Token::Minus => {
                    self.bump();
                    let rhs = self.parse_multiplicative()?;
                    lhs = Expr::Sub(Box::new(lhs), Box::new(rhs));
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_unary()?;
        loop {
            match self.peek() {
                Token::Star => {
                    self.bump();
                    let rhs = self.parse_unary()?;
                    lhs = Expr::Mul(Box::new(lhs), Box::new(rhs));
                }
                Token::Slash => {
                    self.bump();
                    let rhs = self.parse_unary()?;
                    lhs = Expr::Div(Box::new(lhs), Box::new(rhs));
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, ExprError> {
        // Every recursive path through the grammar passes through here,
        // so a single counter bounds parse depth.
        if self.depth >= MAX_DEPTH {
            return Err(ExprError::TooDeep);
        }
        self.depth += 1;
        let result = match self.peek() {
            Token::Minus => {
                self.bump();
                self.parse_unary().map(|inner| Expr::Neg(Box::new(inner)))
            }
            Token::Plus => {
                self.bump();
                self.parse_unary()
            }
            _ => self.parse_power(),
        };
        self.depth -= 1;
        result
    }

    fn parse_power(&mut self) -> Result<Expr, ExprError> {
        let base = self.parse_primary()?;
        if self.peek() == &Token::Caret {
            self.bump();
            // Right-associative; the exponent may carry its own sign.
            let exponent = self.parse_unary()?;
            return Ok(Expr::Pow(Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<Expr, ExprError> {
        match self.bump() {
            Token::Number(n) => Ok(Expr::Num(n)),
            Token::LParen => {
                let inner = self.parse_expr()?;
                self.eat(&Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(name) => {
                if self.peek() == &Token::LParen {
                    self.bump();
                    let func = Func::from_name(&name)
                        .ok_or(ExprError::UnknownFunction(name))?;
                    let arg = self.parse_expr()?;
                    self.eat(&Token::RParen)?;
                    Ok(Expr::Call(func, Box::new(arg)))
                } else if name == self.var {
                    Ok(Expr::Var)
                } else {
                    match name.as_str() {
                        "pi" => Ok(Expr::Num(std::f64::consts::PI)),
                        "e" => Ok(Expr::Num(std::f64::consts::E)),
                        _ => Err(ExprError::UnknownSymbol(name)),
                    }
                }
            }
            Token::Eof => Err(ExprError::UnexpectedEnd),
            token => Err(ExprError::UnexpectedToken(token.to_string())),
        }
    }
}
