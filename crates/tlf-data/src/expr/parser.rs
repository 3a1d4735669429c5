//! `nom` parser over the token stream, producing the expression AST.
//!
//! Precedence, loosest first: `or`, `and`, `not`, comparison and `in`,
//! `+ -`, `* /`, unary minus, primary.

use nom::branch::alt;
use nom::combinator::{cut, map, opt};
use nom::error::{ErrorKind, ParseError};
use nom::multi::{many0, separated_list1};
use nom::sequence::{pair, preceded, terminated};
use nom::{Err, IResult};
use tlf_core::Value;

use super::lexer::{Spanned, Token, tokenize};
use crate::error::DerivationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub const fn is_arithmetic(self) -> bool {
        matches!(self, Self::Add | Self::Sub | Self::Mul | Self::Div)
    }

    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::NotEq | Self::Lt | Self::Le | Self::Gt | Self::Ge
        )
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    Upper,
    Lower,
    Titlecase,
    IsNull,
    Coalesce,
    Abs,
    Round,
}

impl Func {
    fn lookup(name: &str) -> Option<Self> {
        let func = match name.to_ascii_lowercase().as_str() {
            "upper" => Self::Upper,
            "lower" => Self::Lower,
            "titlecase" => Self::Titlecase,
            "is_null" => Self::IsNull,
            "coalesce" => Self::Coalesce,
            "abs" => Self::Abs,
            "round" => Self::Round,
            _ => return None,
        };
        Some(func)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Upper => "upper",
            Self::Lower => "lower",
            Self::Titlecase => "titlecase",
            Self::IsNull => "is_null",
            Self::Coalesce => "coalesce",
            Self::Abs => "abs",
            Self::Round => "round",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Column(String),
    Neg(Box<Expr>),
    Not(Box<Expr>),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    In {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    Call {
        func: Func,
        args: Vec<Expr>,
    },
}

type Tokens<'a> = &'a [Spanned];

type PResult<'a, T> = IResult<Tokens<'a>, T, Failure<'a>>;

const OPERAND: &str = "a value, column or '('";

#[derive(Debug)]
enum Failure<'a> {
    Expected { at: Tokens<'a>, what: &'static str },
    UnknownFunction(String),
}

impl<'a> ParseError<Tokens<'a>> for Failure<'a> {
    fn from_error_kind(input: Tokens<'a>, _kind: ErrorKind) -> Self {
        Self::Expected {
            at: input,
            what: OPERAND,
        }
    }

    fn append(_input: Tokens<'a>, _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

fn expected<'a>(at: Tokens<'a>, what: &'static str) -> Err<Failure<'a>> {
    Err::Error(Failure::Expected { at, what })
}

/// Parse `source` into an [`Expr`].
pub fn parse(source: &str) -> Result<Expr, DerivationError> {
    let tokens = tokenize(source)?;
    let syntax = |at: &[Spanned], message: String| DerivationError::Parse {
        expr: source.to_string(),
        offset: at.first().map_or(source.len(), |t| t.offset),
        message,
    };

    match or_expr(&tokens) {
        Ok(([], expr)) => Ok(expr),
        Ok((rest, _)) => Err(syntax(rest, "unexpected trailing input".into())),
        Err(Err::Error(failure) | Err::Failure(failure)) => Err(match failure {
            Failure::Expected { at, what } => syntax(at, format!("expected {what}")),
            Failure::UnknownFunction(name) => DerivationError::UnknownFunction { name },
        }),
        Err(Err::Incomplete(_)) => Err(syntax(&[], "unexpected end of expression".into())),
    }
}

// ---------------------------------------------------------------------------
// Token matchers
// ---------------------------------------------------------------------------

fn token<'a>(wanted: Token, what: &'static str) -> impl Fn(Tokens<'a>) -> PResult<'a, ()> {
    move |input: Tokens<'a>| match input.split_first() {
        Some((first, rest)) if first.token == wanted => Ok((rest, ())),
        _ => Err(expected(input, what)),
    }
}

fn operator<'a>(
    accept: fn(&Token) -> Option<BinaryOp>,
) -> impl Fn(Tokens<'a>) -> PResult<'a, BinaryOp> {
    move |input: Tokens<'a>| {
        input
            .split_first()
            .and_then(|(first, rest)| accept(&first.token).map(|op| (rest, op)))
            .ok_or_else(|| expected(input, "an operator"))
    }
}

/// Left-associative chain `operand (op operand)*`.
fn chain<'a>(
    operand: fn(Tokens<'a>) -> PResult<'a, Expr>,
    accept: fn(&Token) -> Option<BinaryOp>,
) -> impl Fn(Tokens<'a>) -> PResult<'a, Expr> {
    move |input: Tokens<'a>| {
        let (input, first) = operand(input)?;
        let (input, rest) = many0(pair(operator(accept), cut(operand)))(input)?;
        let expr = rest
            .into_iter()
            .fold(first, |left, (op, right)| binary(op, left, right));
        Ok((input, expr))
    }
}

// ---------------------------------------------------------------------------
// Grammar
// ---------------------------------------------------------------------------

fn or_expr(input: Tokens<'_>) -> PResult<'_, Expr> {
    chain(and_expr, |t| (*t == Token::Or).then_some(BinaryOp::Or))(input)
}

fn and_expr(input: Tokens<'_>) -> PResult<'_, Expr> {
    chain(not_expr, |t| (*t == Token::And).then_some(BinaryOp::And))(input)
}

fn not_expr(input: Tokens<'_>) -> PResult<'_, Expr> {
    alt((
        map(preceded(token(Token::Not, "not"), cut(not_expr)), |e| {
            Expr::Not(Box::new(e))
        }),
        comparison,
    ))(input)
}

fn comparison_op(t: &Token) -> Option<BinaryOp> {
    match t {
        Token::Eq => Some(BinaryOp::Eq),
        Token::NotEq => Some(BinaryOp::NotEq),
        Token::Lt => Some(BinaryOp::Lt),
        Token::Le => Some(BinaryOp::Le),
        Token::Gt => Some(BinaryOp::Gt),
        Token::Ge => Some(BinaryOp::Ge),
        _ => None,
    }
}

/// `a op b`, `a in (..)`, `a not in (..)` or a bare additive expression.
fn comparison(input: Tokens<'_>) -> PResult<'_, Expr> {
    let (input, left) = additive(input)?;

    if let Ok((rest, op)) = operator(comparison_op)(input) {
        let (rest, right) = cut(additive)(rest)?;
        return Ok((rest, binary(op, left, right)));
    }

    let (after, membership) = opt(alt((
        map(pair(token(Token::Not, "not"), token(Token::In, "in")), |_| true),
        map(token(Token::In, "in"), |()| false),
    )))(input)?;
    let Some(negated) = membership else {
        return Ok((input, left));
    };

    let (after, list) =
        cut(preceded(token(Token::LParen, "'(' after 'in'"), arguments))(after)?;
    if list.is_empty() {
        return Err(Err::Failure(Failure::Expected {
            at: after,
            what: "a non-empty 'in' list",
        }));
    }
    Ok((
        after,
        Expr::In {
            expr: Box::new(left),
            list,
            negated,
        },
    ))
}

fn additive(input: Tokens<'_>) -> PResult<'_, Expr> {
    chain(multiplicative, |t| match t {
        Token::Plus => Some(BinaryOp::Add),
        Token::Minus => Some(BinaryOp::Sub),
        _ => None,
    })(input)
}

fn multiplicative(input: Tokens<'_>) -> PResult<'_, Expr> {
    chain(unary, |t| match t {
        Token::Star => Some(BinaryOp::Mul),
        Token::Slash => Some(BinaryOp::Div),
        _ => None,
    })(input)
}

fn unary(input: Tokens<'_>) -> PResult<'_, Expr> {
    alt((
        map(preceded(token(Token::Minus, "-"), cut(unary)), negate),
        primary,
    ))(input)
}

fn negate(expr: Expr) -> Expr {
    match expr {
        Expr::Literal(Value::Int(v)) => Expr::Literal(Value::Int(-v)),
        Expr::Literal(Value::Float(v)) => Expr::Literal(Value::Float(-v)),
        other => Expr::Neg(Box::new(other)),
    }
}

fn primary(input: Tokens<'_>) -> PResult<'_, Expr> {
    let Some((first, rest)) = input.split_first() else {
        return Err(expected(input, OPERAND));
    };

    let value = match &first.token {
        Token::Int(v) => Value::Int(*v),
        Token::Float(v) => Value::Float(*v),
        Token::Str(s) => Value::Str(s.clone()),
        Token::True => Value::Bool(true),
        Token::False => Value::Bool(false),
        Token::Null => Value::Null,
        Token::LParen => {
            return cut(terminated(or_expr, token(Token::RParen, "')'")))(rest);
        }
        Token::Ident(name) => return call_or_column(name, rest),
        _ => return Err(expected(input, OPERAND)),
    };
    Ok((rest, Expr::Literal(value)))
}

fn call_or_column<'a>(name: &str, input: Tokens<'a>) -> PResult<'a, Expr> {
    let Ok((rest, ())) = token(Token::LParen, "(")(input) else {
        return Ok((input, Expr::Column(name.to_string())));
    };
    let func = Func::lookup(name)
        .ok_or_else(|| Err::Failure(Failure::UnknownFunction(name.to_string())))?;
    let (rest, args) = cut(arguments)(rest)?;
    Ok((rest, Expr::Call { func, args }))
}

/// Comma-separated expressions up to the closing `)`. The `(` is already consumed.
fn arguments(input: Tokens<'_>) -> PResult<'_, Vec<Expr>> {
    alt((
        map(token(Token::RParen, "')'"), |()| Vec::new()),
        terminated(
            separated_list1(token(Token::Comma, "','"), or_expr),
            token(Token::RParen, "',' or ')'"),
        ),
    ))(input)
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}
