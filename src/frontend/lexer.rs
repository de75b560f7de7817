//! Tokens of the textual IR.

use crate::errors::FrontendError;
use logos::Logos;

#[derive(Logos, Clone, Debug, PartialEq)]
#[logos(skip r"([ \t\r]+|;[^\n]*)")] // Horizontal whitespace and comments
pub(crate) enum Token {
    #[token("\n")]
    Newline,

    #[regex(r"%[A-Za-z0-9_.]+", |lex| lex.slice()[1..].to_owned())]
    Local(String),
    #[regex(r"@[A-Za-z0-9_.]+", |lex| lex.slice()[1..].to_owned())]
    Global(String),
    #[regex(r"[A-Za-z_][A-Za-z0-9_.]*", |lex| lex.slice().to_owned())]
    Ident(String),
    #[regex(r"-?[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("=")]
    Equals,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
}

/// Tokenizes `text`, pairing each token with its 1-based line.
pub(crate) fn lex(text: &str) -> Result<Vec<(Token, usize)>, FrontendError> {
    let mut lexer = Token::lexer(text);
    let mut tokens = vec![];
    let mut line = 1;
    let mut pos = 0;
    while let Some(token) = lexer.next() {
        let span = lexer.span();
        line += text[pos..span.start].matches('\n').count();
        pos = span.start;
        match token {
            Ok(token) => tokens.push((token, line)),
            Err(_) => return Err(FrontendError::Lex { line }),
        }
    }
    Ok(tokens)
}
