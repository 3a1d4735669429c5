//! Tokenizer for derivation expressions.
//!
//! Single quotes delimit strings and double quotes delimit identifiers; a
//! doubled quote inside either stands for the quote itself. Keywords are
//! case-insensitive.

use logos::Logos;

use crate::error::DerivationError;

fn unquote(slice: &str) -> String {
    let quote = &slice[..1];
    slice[1..slice.len() - 1].replace(&quote.repeat(2), quote)
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"\s+")]
pub enum Token {
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    #[regex(r#""([^"]|"")*""#, |lex| unquote(lex.slice()))]
    Ident(String),
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),
    #[regex(r"[0-9]+\.[0-9]*|\.[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),
    #[regex(r"'([^']|'')*'", |lex| unquote(lex.slice()))]
    Str(String),
    #[token("true", ignore(ascii_case))]
    True,
    #[token("false", ignore(ascii_case))]
    False,
    #[token("null", ignore(ascii_case))]
    Null,
    #[token("and", ignore(ascii_case))]
    And,
    #[token("or", ignore(ascii_case))]
    Or,
    #[token("not", ignore(ascii_case))]
    Not,
    #[token("in", ignore(ascii_case))]
    In,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("==")]
    #[token("=")]
    Eq,
    #[token("!=")]
    #[token("<>")]
    NotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
    #[token(">")]
    Gt,
    #[token(">=")]
    Ge,
}

/// A token and its byte offset in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub offset: usize,
}

pub fn tokenize(source: &str) -> Result<Vec<Spanned>, DerivationError> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);

    while let Some(result) = lexer.next() {
        let offset = lexer.span().start;
        match result {
            Ok(token) => tokens.push(Spanned { token, offset }),
            Err(()) => {
                let slice = lexer.slice();
                let message = if slice.starts_with(['\'', '"']) {
                    "unterminated quoted text".to_string()
                } else if slice.starts_with(|c: char| c.is_ascii_digit()) {
                    format!("invalid number '{slice}'")
                } else {
                    format!("unexpected input '{slice}'")
                };
                return Err(DerivationError::Parse {
                    expr: source.to_string(),
                    offset,
                    message,
                });
            }
        }
    }

    Ok(tokens)
}
