//! Expression parser and evaluator for declarative rule conditions.
//!
//! A condition is a boolean expression over the two attribute bags of a
//! request, with dot-paths rooted at `actor` or `subject`:
//!
//! - Comparisons: `==`, `!=`, `>`, `<`, `>=`, `<=`
//! - Boolean operators: `&&`, `||`, `!`
//! - Membership: `actor.team in subject.maintainers`
//! - Literals: integers, floats, `"strings"`, `true`, `false`
//! - Parentheses for grouping
//!
//! Expressions are parsed once when the rule set is compiled and evaluated
//! per request.

use serde_json::Value;

use crate::errors::PolicyError;
use crate::types::Attributes;

// ─── AST ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    /// Dot path; the first segment selects the bag (`actor` or `subject`).
    Path(Vec<String>),
    Not(Box<Expr>),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    And,
    Or,
    In,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

// ─── Tokenizer ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Dot,
    LParen,
    RParen,
    Op(BinOp),
    Not,
}

fn tokenize(source: &str) -> Result<Vec<Token>, PolicyError> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '.' => {
                chars.next();
                tokens.push(Token::Dot);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '=' => {
                chars.next();
                if chars.next_if_eq(&'=').is_none() {
                    return Err(PolicyError::InvalidCondition(
                        "expected `==` (single `=` is not an operator)".into(),
                    ));
                }
                tokens.push(Token::Op(BinOp::Eq));
            }
            '!' => {
                chars.next();
                if chars.next_if_eq(&'=').is_some() {
                    tokens.push(Token::Op(BinOp::Ne));
                } else {
                    tokens.push(Token::Not);
                }
            }
            '>' => {
                chars.next();
                let op = if chars.next_if_eq(&'=').is_some() {
                    BinOp::Ge
                } else {
                    BinOp::Gt
                };
                tokens.push(Token::Op(op));
            }
            '<' => {
                chars.next();
                let op = if chars.next_if_eq(&'=').is_some() {
                    BinOp::Le
                } else {
                    BinOp::Lt
                };
                tokens.push(Token::Op(op));
            }
            '&' => {
                chars.next();
                if chars.next_if_eq(&'&').is_none() {
                    return Err(PolicyError::InvalidCondition("expected `&&`".into()));
                }
                tokens.push(Token::Op(BinOp::And));
            }
            '|' => {
                chars.next();
                if chars.next_if_eq(&'|').is_none() {
                    return Err(PolicyError::InvalidCondition("expected `||`".into()));
                }
                tokens.push(Token::Op(BinOp::Or));
            }
            '"' => {
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(escaped) => s.push(escaped),
                            None => {
                                return Err(PolicyError::InvalidCondition(
                                    "unterminated string literal".into(),
                                ));
                            }
                        },
                        Some(ch) => s.push(ch),
                        None => {
                            return Err(PolicyError::InvalidCondition(
                                "unterminated string literal".into(),
                            ));
                        }
                    }
                }
                tokens.push(Token::Str(s));
            }
            c if c.is_ascii_digit() => {
                let mut num = String::new();
                while let Some(d) = chars.next_if(|ch| ch.is_ascii_digit()) {
                    num.push(d);
                }
                if chars.next_if_eq(&'.').is_some() {
                    num.push('.');
                    while let Some(d) = chars.next_if(|ch| ch.is_ascii_digit()) {
                        num.push(d);
                    }
                    let f: f64 = num.parse().map_err(|_| {
                        PolicyError::InvalidCondition(format!("invalid float `{num}`"))
                    })?;
                    tokens.push(Token::Float(f));
                } else {
                    let n: i64 = num.parse().map_err(|_| {
                        PolicyError::InvalidCondition(format!("invalid integer `{num}`"))
                    })?;
                    tokens.push(Token::Int(n));
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut word = String::new();
                while let Some(ch) = chars.next_if(|ch| ch.is_ascii_alphanumeric() || *ch == '_') {
                    word.push(ch);
                }
                match word.as_str() {
                    "true" => tokens.push(Token::Bool(true)),
                    "false" => tokens.push(Token::Bool(false)),
                    "in" => tokens.push(Token::Op(BinOp::In)),
                    _ => tokens.push(Token::Ident(word)),
                }
            }
            other => {
                return Err(PolicyError::InvalidCondition(format!(
                    "unexpected character `{other}`"
                )));
            }
        }
    }

    Ok(tokens)
}

// ─── Parser ─────────────────────────────────────────────────────────────

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    /// or_expr = and_expr ("||" and_expr)*
    fn or_expr(&mut self) -> Result<Expr, PolicyError> {
        let mut lhs = self.and_expr()?;
        while self.peek() == Some(&Token::Op(BinOp::Or)) {
            self.bump();
            let rhs = self.and_expr()?;
            lhs = Expr::binary(BinOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    /// and_expr = comparison ("&&" comparison)*
    fn and_expr(&mut self) -> Result<Expr, PolicyError> {
        let mut lhs = self.comparison()?;
        while self.peek() == Some(&Token::Op(BinOp::And)) {
            self.bump();
            let rhs = self.comparison()?;
            lhs = Expr::binary(BinOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    /// comparison = unary (comparison_op unary)?
    fn comparison(&mut self) -> Result<Expr, PolicyError> {
        let lhs = self.unary()?;
        let op = match self.peek() {
            Some(Token::Op(op)) if !matches!(op, BinOp::And | BinOp::Or) => *op,
            _ => return Ok(lhs),
        };
        self.bump();
        let rhs = self.unary()?;
        Ok(Expr::binary(op, lhs, rhs))
    }

    /// unary = "!" unary | primary
    fn unary(&mut self) -> Result<Expr, PolicyError> {
        if self.peek() == Some(&Token::Not) {
            self.bump();
            let inner = self.unary()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.primary()
    }

    /// primary = literal | path | "(" or_expr ")"
    fn primary(&mut self) -> Result<Expr, PolicyError> {
        match self.bump() {
            Some(Token::Int(n)) => Ok(Expr::Literal(Literal::Int(n))),
            Some(Token::Float(f)) => Ok(Expr::Literal(Literal::Float(f))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Literal::Str(s))),
            Some(Token::Bool(b)) => Ok(Expr::Literal(Literal::Bool(b))),
            Some(Token::Ident(root)) => {
                let mut path = vec![root];
                while self.peek() == Some(&Token::Dot) {
                    self.bump();
                    match self.bump() {
                        Some(Token::Ident(segment)) => path.push(segment),
                        _ => {
                            return Err(PolicyError::InvalidCondition(
                                "expected identifier after `.`".into(),
                            ));
                        }
                    }
                }
                Ok(Expr::Path(path))
            }
            Some(Token::LParen) => {
                let expr = self.or_expr()?;
                match self.bump() {
                    Some(Token::RParen) => Ok(expr),
                    _ => Err(PolicyError::InvalidCondition(
                        "expected closing parenthesis `)`".into(),
                    )),
                }
            }
            other => Err(PolicyError::InvalidCondition(format!(
                "unexpected token: {other:?}"
            ))),
        }
    }
}

/// Parse a condition expression into an AST.
pub fn parse(source: &str) -> Result<Expr, PolicyError> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(PolicyError::InvalidCondition("empty expression".into()));
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.or_expr()?;
    if let Some(trailing) = parser.peek() {
        return Err(PolicyError::InvalidCondition(format!(
            "unexpected trailing token: {trailing:?}"
        )));
    }
    Ok(expr)
}

// ─── Evaluator ──────────────────────────────────────────────────────────

/// Evaluate a parsed expression against the request's attribute bags.
/// Returns `true` if the condition is satisfied.
pub fn evaluate(expr: &Expr, actor: &Attributes, subject: &Attributes) -> Result<bool, PolicyError> {
    match eval(expr, actor, subject)? {
        Val::Bool(b) => Ok(b),
        other => Err(PolicyError::InvalidCondition(format!(
            "condition must evaluate to a boolean, got: {other:?}"
        ))),
    }
}

#[derive(Debug, Clone)]
enum Val {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    List(Vec<Val>),
    Null,
}

impl Val {
    fn numeric(&self) -> Option<f64> {
        match self {
            Val::Int(n) => Some(*n as f64),
            Val::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl PartialEq for Val {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Val::Int(a), Val::Int(b)) => a == b,
            (Val::Float(a), Val::Float(b)) => a == b,
            (Val::Int(a), Val::Float(b)) => (*a as f64) == *b,
            (Val::Float(a), Val::Int(b)) => *a == (*b as f64),
            (Val::Str(a), Val::Str(b)) => a == b,
            (Val::Bool(a), Val::Bool(b)) => a == b,
            (Val::Null, Val::Null) => true,
            _ => false,
        }
    }
}

fn eval(expr: &Expr, actor: &Attributes, subject: &Attributes) -> Result<Val, PolicyError> {
    match expr {
        Expr::Literal(lit) => Ok(match lit {
            Literal::Int(n) => Val::Int(*n),
            Literal::Float(f) => Val::Float(*f),
            Literal::Str(s) => Val::Str(s.clone()),
            Literal::Bool(b) => Val::Bool(*b),
        }),
        Expr::Path(segments) => Ok(lookup(segments, actor, subject)),
        Expr::Not(inner) => match eval(inner, actor, subject)? {
            Val::Bool(b) => Ok(Val::Bool(!b)),
            _ => Err(PolicyError::InvalidCondition(
                "`!` operator requires a boolean operand".into(),
            )),
        },
        Expr::Binary { op, lhs, rhs } => {
            let l = eval(lhs, actor, subject)?;
            let r = eval(rhs, actor, subject)?;
            apply(*op, l, r)
        }
    }
}

fn apply(op: BinOp, l: Val, r: Val) -> Result<Val, PolicyError> {
    match op {
        BinOp::And | BinOp::Or => match (&l, &r) {
            (Val::Bool(a), Val::Bool(b)) => Ok(Val::Bool(if op == BinOp::And {
                *a && *b
            } else {
                *a || *b
            })),
            _ => Err(PolicyError::InvalidCondition(
                "boolean operator requires boolean operands".into(),
            )),
        },
        BinOp::Eq => Ok(Val::Bool(l == r)),
        BinOp::Ne => Ok(Val::Bool(l != r)),
        BinOp::In => match r {
            Val::List(items) => Ok(Val::Bool(items.contains(&l))),
            _ => Err(PolicyError::InvalidCondition(
                "`in` operator requires a list on the right side".into(),
            )),
        },
        BinOp::Gt | BinOp::Lt | BinOp::Ge | BinOp::Le => {
            let a = l.numeric().ok_or_else(|| {
                PolicyError::InvalidCondition("comparison operator requires numeric operands".into())
            })?;
            let b = r.numeric().ok_or_else(|| {
                PolicyError::InvalidCondition("comparison operator requires numeric operands".into())
            })?;
            Ok(Val::Bool(match op {
                BinOp::Gt => a > b,
                BinOp::Lt => a < b,
                BinOp::Ge => a >= b,
                BinOp::Le => a <= b,
                _ => unreachable!(),
            }))
        }
    }
}

/// Resolve a dot path. The root segment selects the attribute bag; any other
/// root, and any missing attribute along the way, resolves to null.
fn lookup(segments: &[String], actor: &Attributes, subject: &Attributes) -> Val {
    let Some((root, rest)) = segments.split_first() else {
        return Val::Null;
    };
    let bag = match root.as_str() {
        "actor" => actor,
        "subject" => subject,
        _ => return Val::Null,
    };
    let Some((first, tail)) = rest.split_first() else {
        return Val::Null;
    };
    let mut current = bag.get(first).unwrap_or(&Value::Null);
    for segment in tail {
        current = current.get(segment).unwrap_or(&Value::Null);
    }
    from_json(current)
}

fn from_json(value: &Value) -> Val {
    match value {
        Value::Null => Val::Null,
        Value::Bool(b) => Val::Bool(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Val::Int(i)
            } else if let Some(f) = n.as_f64() {
                Val::Float(f)
            } else {
                Val::Null
            }
        }
        Value::String(s) => Val::Str(s.clone()),
        Value::Array(items) => Val::List(items.iter().map(from_json).collect()),
        Value::Object(_) => Val::Null, // bags are not directly comparable
    }
}
