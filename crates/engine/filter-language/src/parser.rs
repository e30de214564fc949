use super::model::*;

use winnow::{
    ascii::{digit1, multispace0, Caseless},
    combinator::{alt, delimited, eof, not, opt, preceded, repeat, separated, terminated},
    error::{ContextError, ParserError, StrContext},
    prelude::*,
    stream::AsChar,
    token::{any, one_of, take_while},
    Result,
};

pub fn parse(input: &str) -> std::result::Result<Expr, String> {
    (ws(or_expr), eof.context(StrContext::Label("end")))
        .map(|(expr, _)| expr)
        .parse(input)
        .map_err(|e| e.to_string())
}

fn or_expr(input: &mut &str) -> Result<Expr> {
    let first = and_expr.parse_next(input)?;
    let rest: Vec<Expr> = repeat(0.., preceded(ws(or_op), and_expr)).parse_next(input)?;
    Ok(rest
        .into_iter()
        .fold(first, |lhs, rhs| Expr::binary(BinaryOp::Or, lhs, rhs)))
}

fn and_expr(input: &mut &str) -> Result<Expr> {
    let first = equality_expr.parse_next(input)?;
    let rest: Vec<Expr> = repeat(0.., preceded(ws(and_op), equality_expr)).parse_next(input)?;
    Ok(rest
        .into_iter()
        .fold(first, |lhs, rhs| Expr::binary(BinaryOp::And, lhs, rhs)))
}

fn or_op(input: &mut &str) -> Result<()> {
    alt(("||".void(), keyword("or"))).parse_next(input)
}

fn and_op(input: &mut &str) -> Result<()> {
    alt(("&&".void(), keyword("and"))).parse_next(input)
}

fn equality_expr(input: &mut &str) -> Result<Expr> {
    binary_chain(comparison_expr, equality_op, input)
}

fn equality_op(input: &mut &str) -> Result<BinaryOp> {
    alt((
        "==".value(BinaryOp::Equal),
        "!=".value(BinaryOp::NotEqual),
    ))
    .parse_next(input)
}

fn comparison_expr(input: &mut &str) -> Result<Expr> {
    binary_chain(additive_expr, comparison_op, input)
}

fn comparison_op(input: &mut &str) -> Result<BinaryOp> {
    alt((
        "<=".value(BinaryOp::LessOrEqual),
        ">=".value(BinaryOp::GreaterOrEqual),
        "<".value(BinaryOp::Less),
        ">".value(BinaryOp::Greater),
    ))
    .parse_next(input)
}

fn additive_expr(input: &mut &str) -> Result<Expr> {
    binary_chain(multiplicative_expr, additive_op, input)
}

fn additive_op(input: &mut &str) -> Result<BinaryOp> {
    alt(('+'.value(BinaryOp::Add), '-'.value(BinaryOp::Subtract))).parse_next(input)
}

fn multiplicative_expr(input: &mut &str) -> Result<Expr> {
    binary_chain(power_expr, multiplicative_op, input)
}

fn multiplicative_op(input: &mut &str) -> Result<BinaryOp> {
    alt((
        '*'.value(BinaryOp::Multiply),
        '/'.value(BinaryOp::Divide),
        '%'.value(BinaryOp::Modulo),
    ))
    .parse_next(input)
}

/// Left-associative fold of `operand (op operand)*`.
fn binary_chain(
    mut operand: impl FnMut(&mut &str) -> Result<Expr>,
    mut op: impl FnMut(&mut &str) -> Result<BinaryOp>,
    input: &mut &str,
) -> Result<Expr> {
    let first = operand(input)?;
    let rest: Vec<(BinaryOp, Expr)> = repeat(
        0..,
        (delimited(multispace0, |i: &mut &str| op(i), multispace0), |i: &mut &str| {
            operand(i)
        }),
    )
    .parse_next(input)?;
    Ok(rest
        .into_iter()
        .fold(first, |lhs, (op, rhs)| Expr::binary(op, lhs, rhs)))
}

// `^` is right-associative.
fn power_expr(input: &mut &str) -> Result<Expr> {
    let base = term.parse_next(input)?;
    match opt(preceded(ws('^'), power_expr)).parse_next(input)? {
        Some(rhs) => Ok(Expr::binary(BinaryOp::Power, base, rhs)),
        None => Ok(base),
    }
}

fn term(input: &mut &str) -> Result<Expr> {
    alt((
        delimited(ws('('), or_expr, ws(')').context(StrContext::Label("closing parenthesis"))),
        literal.map(Expr::Literal),
        path.map(Expr::Path),
    ))
    .context(StrContext::Label("term"))
    .parse_next(input)
}

fn literal(input: &mut &str) -> Result<Literal> {
    alt((
        keyword("true").value(Literal::Boolean(true)),
        keyword("false").value(Literal::Boolean(false)),
        keyword("null").value(Literal::Null),
        string_literal.map(Literal::String),
        number,
    ))
    .parse_next(input)
}

fn number(input: &mut &str) -> Result<Literal> {
    (opt('-'), digit1, opt(preceded('.', digit1)))
        .take()
        .try_map(|text: &str| -> std::result::Result<Literal, std::num::ParseFloatError> {
            if !text.contains('.') {
                if let Ok(value) = text.parse::<i64>() {
                    return Ok(Literal::Integer(value));
                }
            }
            text.parse::<f64>().map(Literal::Float)
        })
        .context(StrContext::Label("number"))
        .parse_next(input)
}

/// Double-quoted string with backslash escapes. Unknown escapes keep the
/// escaped character as-is.
fn string_literal(input: &mut &str) -> Result<String> {
    let _ = '"'.parse_next(input)?;
    let mut out = String::new();
    loop {
        match any.parse_next(input)? {
            '"' => return Ok(out),
            '\\' => {
                let escaped = any.parse_next(input)?;
                out.push(match escaped {
                    'n' => '\n',
                    'r' => '\r',
                    't' => '\t',
                    other => other,
                });
            }
            other => out.push(other),
        }
    }
}

/// Parses `segment1.segment2(...).segmentN`.
fn path(input: &mut &str) -> Result<Vec<Segment>> {
    separated(1.., segment, ws('.')).parse_next(input)
}

fn segment(input: &mut &str) -> Result<Segment> {
    let name = name.parse_next(input)?;
    let args: Option<Vec<Expr>> = opt(delimited(
        ws('('),
        separated(0.., ws(or_expr), ','),
        ')'.context(StrContext::Label("closing parenthesis")),
    ))
    .parse_next(input)?;
    Ok(Segment {
        name: name.to_owned(),
        args,
    })
}

/// A valid identifier: alphanumeric characters and underscores, not starting
/// with a digit.
fn name<'s>(input: &mut &'s str) -> Result<&'s str> {
    (
        one_of(|c: char| c.is_alpha() || c == '_'),
        take_while(0.., |c: char| c.is_alphanum() || c == '_'),
    )
        .take()
        .context(StrContext::Label("name"))
        .parse_next(input)
}

/// A case-insensitive word that must not run into a following identifier
/// character (so `and` never swallows the head of `android`).
fn keyword<'a>(word: &'static str) -> impl Parser<&'a str, (), ContextError> {
    terminated(
        Caseless(word),
        not(one_of(|c: char| c.is_alphanum() || c == '_')),
    )
    .void()
}

/// A combinator that takes a parser `inner` and produces a parser that also consumes both leading and
/// trailing whitespace, returning the output of `inner`.
fn ws<'a, F, O, E: ParserError<&'a str>>(inner: F) -> impl Parser<&'a str, O, E>
where
    F: Parser<&'a str, O, E>,
{
    delimited(multispace0, inner, multispace0)
}
