//! Recursive-descent parser for value expressions.
//!
//! Grammar, loosest binding first:
//! conditional `a if c else b`, `or`, `and`, `not`, comparisons (chained),
//! `+ -`, `* / // %`, unary `- +`, `**`, then postfix indexing, `.key`
//! and builtin calls.

use super::Failure;
use super::lexer::Token;
use serde_json::Value;

/// Deepest nesting of brackets, operators and accessors in one expression.
pub const MAX_NESTING: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Lit(Value),
    Name(String),
    List(Vec<Expr>),
    Dict(Vec<(Expr, Expr)>),
    Neg(Box<Expr>),
    Not(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Compare(Box<Expr>, Vec<(CmpOp, Expr)>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    IfElse {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Index(Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

pub fn parse(tokens: &[Token]) -> Result<Expr, Failure> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expression()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(Failure::Invalid(format!("unexpected {}", describe(token)))),
    }
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    /// Nesting of the expression being built; bounds the tree depth too.
    depth: usize,
}

fn describe(token: &Token) -> String {
    match token {
        Token::Int(n) => format!("number {}", n),
        Token::Float(f) => format!("number {}", f),
        Token::Str(s) => format!("string {:?}", s),
        Token::Ident(name) => format!("name {:?}", name),
        Token::Punct(p) => format!("{:?}", p),
    }
}

impl<'t> Parser<'t> {
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn eat_punct(&mut self, punct: &str) -> bool {
        if matches!(self.peek(), Some(Token::Punct(p)) if *p == punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Some(Token::Ident(name)) if name == keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, punct: &str) -> Result<(), Failure> {
        if self.eat_punct(punct) {
            return Ok(());
        }
        Err(match self.peek() {
            Some(token) => Failure::Invalid(format!("expected {:?}, found {}", punct, describe(token))),
            None => Failure::Invalid(format!("expected {:?}, found end of expression", punct)),
        })
    }

    fn enter(&mut self) -> Result<(), Failure> {
        if self.depth >= MAX_NESTING {
            return Err(Failure::TooDeep);
        }
        self.depth += 1;
        Ok(())
    }

    fn expression(&mut self) -> Result<Expr, Failure> {
        let outer = self.depth;
        self.enter()?;
        let expr = self.conditional()?;
        self.depth = outer;
        Ok(expr)
    }

    fn conditional(&mut self) -> Result<Expr, Failure> {
        let then = self.or_expr()?;
        if !self.eat_keyword("if") {
            return Ok(then);
        }
        let cond = self.or_expr()?;
        if !self.eat_keyword("else") {
            return Err(Failure::Invalid("conditional expression without else".to_string()));
        }
        let otherwise = self.expression()?;
        Ok(Expr::IfElse {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    fn or_expr(&mut self) -> Result<Expr, Failure> {
        let outer = self.depth;
        let mut left = self.and_expr()?;
        while self.eat_keyword("or") {
            self.enter()?;
            let right = self.and_expr()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        self.depth = outer;
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, Failure> {
        let outer = self.depth;
        let mut left = self.not_expr()?;
        while self.eat_keyword("and") {
            self.enter()?;
            let right = self.not_expr()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        self.depth = outer;
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<Expr, Failure> {
        if self.eat_keyword("not") {
            let outer = self.depth;
            self.enter()?;
            let inner = self.not_expr()?;
            self.depth = outer;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, Failure> {
        let first = self.sum()?;
        let mut rest = Vec::new();
        loop {
            let op = match self.peek() {
                Some(Token::Punct("==")) => CmpOp::Eq,
                Some(Token::Punct("!=")) => CmpOp::Ne,
                Some(Token::Punct("<")) => CmpOp::Lt,
                Some(Token::Punct("<=")) => CmpOp::Le,
                Some(Token::Punct(">")) => CmpOp::Gt,
                Some(Token::Punct(">=")) => CmpOp::Ge,
                _ => break,
            };
            self.pos += 1;
            rest.push((op, self.sum()?));
        }
        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Compare(Box::new(first), rest))
        }
    }

    fn sum(&mut self) -> Result<Expr, Failure> {
        let outer = self.depth;
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Punct("+")) => BinOp::Add,
                Some(Token::Punct("-")) => BinOp::Sub,
                _ => {
                    self.depth = outer;
                    return Ok(left);
                }
            };
            self.pos += 1;
            self.enter()?;
            let right = self.term()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn term(&mut self) -> Result<Expr, Failure> {
        let outer = self.depth;
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Punct("*")) => BinOp::Mul,
                Some(Token::Punct("/")) => BinOp::Div,
                Some(Token::Punct("//")) => BinOp::FloorDiv,
                Some(Token::Punct("%")) => BinOp::Mod,
                _ => {
                    self.depth = outer;
                    return Ok(left);
                }
            };
            self.pos += 1;
            self.enter()?;
            let right = self.unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn unary(&mut self) -> Result<Expr, Failure> {
        let outer = self.depth;
        let expr = if self.eat_punct("-") {
            self.enter()?;
            Expr::Neg(Box::new(self.unary()?))
        } else if self.eat_punct("+") {
            self.enter()?;
            self.unary()?
        } else {
            self.power()?
        };
        self.depth = outer;
        Ok(expr)
    }

    fn power(&mut self) -> Result<Expr, Failure> {
        let outer = self.depth;
        let base = self.postfix()?;
        if self.eat_punct("**") {
            // Right-associative and binds tighter than a unary minus on its left.
            self.enter()?;
            let exponent = self.unary()?;
            self.depth = outer;
            return Ok(Expr::Binary(BinOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn postfix(&mut self) -> Result<Expr, Failure> {
        let outer = self.depth;
        let mut expr = self.atom()?;
        loop {
            if matches!(self.peek(), Some(Token::Punct("[" | "." | "("))) {
                self.enter()?;
            }
            if self.eat_punct("[") {
                let index = self.expression()?;
                self.expect_punct("]")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else if self.eat_punct(".") {
                let key = match self.next() {
                    Some(Token::Ident(name)) => Expr::Lit(Value::String(name.clone())),
                    Some(Token::Int(idx)) => Expr::Lit(Value::from(*idx)),
                    Some(token) => {
                        return Err(Failure::Invalid(format!(
                            "expected a key after '.', found {}",
                            describe(token)
                        )));
                    }
                    None => return Err(Failure::Invalid("expression ends after '.'".to_string())),
                };
                expr = Expr::Index(Box::new(expr), Box::new(key));
            } else if matches!(self.peek(), Some(Token::Punct("("))) {
                let Expr::Name(name) = expr else {
                    return Err(Failure::Invalid(
                        "only builtin functions can be called".to_string(),
                    ));
                };
                self.pos += 1;
                let args = self.sequence(")")?;
                expr = Expr::Call(name, args);
            } else {
                self.depth = outer;
                return Ok(expr);
            }
        }
    }

    /// Comma-separated expressions up to `close` (trailing comma allowed).
    fn sequence(&mut self, close: &str) -> Result<Vec<Expr>, Failure> {
        let mut items = Vec::new();
        while !self.eat_punct(close) {
            items.push(self.expression()?);
            if !self.eat_punct(",") {
                self.expect_punct(close)?;
                break;
            }
        }
        Ok(items)
    }

    fn atom(&mut self) -> Result<Expr, Failure> {
        let token = self
            .next()
            .ok_or_else(|| Failure::Invalid("unexpected end of expression".to_string()))?;
        match token {
            Token::Int(n) => Ok(Expr::Lit(Value::from(*n))),
            Token::Float(f) => serde_json::Number::from_f64(*f)
                .map(|n| Expr::Lit(Value::Number(n)))
                .ok_or_else(|| Failure::Invalid(format!("non-finite literal {}", f))),
            Token::Str(s) => Ok(Expr::Lit(Value::String(s.clone()))),
            Token::Ident(name) => Ok(match name.as_str() {
                "True" | "true" => Expr::Lit(Value::Bool(true)),
                "False" | "false" => Expr::Lit(Value::Bool(false)),
                "None" | "null" => Expr::Lit(Value::Null),
                "and" | "or" | "not" | "if" | "else" => {
                    return Err(Failure::Invalid(format!("unexpected keyword {:?}", name)));
                }
                _ => Expr::Name(name.clone()),
            }),
            Token::Punct("(") => {
                let inner = self.expression()?;
                self.expect_punct(")")?;
                Ok(inner)
            }
            Token::Punct("[") => Ok(Expr::List(self.sequence("]")?)),
            Token::Punct("{") => {
                let mut entries = Vec::new();
                while !self.eat_punct("}") {
                    let key = self.expression()?;
                    self.expect_punct(":")?;
                    let value = self.expression()?;
                    entries.push((key, value));
                    if !self.eat_punct(",") {
                        self.expect_punct("}")?;
                        break;
                    }
                }
                Ok(Expr::Dict(entries))
            }
            other => Err(Failure::Invalid(format!("unexpected {}", describe(other)))),
        }
    }
}
