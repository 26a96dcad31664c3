//! Tokenizer for dependency specifier strings.
//!
//! Uses logos for longest-match scanning. Whitespace is not part of the
//! grammar, so any space inside a specifier is reported as an unexpected
//! character.

use super::error::SpecifierError;
use logos::Logos;
use std::fmt;

/// Byte range of a token inside the specifier string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Specifier tokens.
#[derive(Logos, Debug, Clone, PartialEq, Eq)]
pub enum Token {
    // Keyword (must win over identifiers of the same length)
    #[token("latest")]
    Latest,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Identifier(String),

    // Kept as text; the parser converts it and reports overflow
    #[regex(r"[0-9]+", |lex| lex.slice().to_string())]
    Number(String),

    #[token("/")]
    Slash,

    #[token(".")]
    Dot,

    #[token("[")]
    LeftBracket,

    #[token("]")]
    RightBracket,

    #[token(",")]
    Comma,

    // Two-character operators win over their prefixes by longest match
    #[token("<=")]
    LessOrEqual,

    #[token("<")]
    Less,

    #[token(">=")]
    GreaterOrEqual,

    #[token(">")]
    Greater,
}

/// Data-free token type, used for "expected one of" reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Latest,
    Identifier,
    Number,
    Slash,
    Dot,
    LeftBracket,
    RightBracket,
    Comma,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl Token {
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::Latest => TokenKind::Latest,
            Token::Identifier(_) => TokenKind::Identifier,
            Token::Number(_) => TokenKind::Number,
            Token::Slash => TokenKind::Slash,
            Token::Dot => TokenKind::Dot,
            Token::LeftBracket => TokenKind::LeftBracket,
            Token::RightBracket => TokenKind::RightBracket,
            Token::Comma => TokenKind::Comma,
            Token::Less => TokenKind::Less,
            Token::LessOrEqual => TokenKind::LessOrEqual,
            Token::Greater => TokenKind::Greater,
            Token::GreaterOrEqual => TokenKind::GreaterOrEqual,
        }
    }

    /// The source text of the token
    pub fn text(&self) -> &str {
        match self {
            Token::Latest => "latest",
            Token::Identifier(s) | Token::Number(s) => s,
            Token::Slash => "/",
            Token::Dot => ".",
            Token::LeftBracket => "[",
            Token::RightBracket => "]",
            Token::Comma => ",",
            Token::Less => "<",
            Token::LessOrEqual => "<=",
            Token::Greater => ">",
            Token::GreaterOrEqual => ">=",
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.kind(), self.text())
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Latest => "LATEST",
            TokenKind::Identifier => "IDENTIFIER",
            TokenKind::Number => "NUMBER",
            TokenKind::Slash => "SLASH",
            TokenKind::Dot => "DOT",
            TokenKind::LeftBracket => "LEFT_BRACKET",
            TokenKind::RightBracket => "RIGHT_BRACKET",
            TokenKind::Comma => "COMMA",
            TokenKind::Less => "LESS",
            TokenKind::LessOrEqual => "LESS_OR_EQUAL",
            TokenKind::Greater => "GREATER",
            TokenKind::GreaterOrEqual => "GREATER_OR_EQUAL",
        };
        f.write_str(name)
    }
}

/// Split a specifier string into tokens.
///
/// Fails on the first character that starts no token.
pub fn tokenize(source: &str) -> Result<Vec<(Token, Span)>, SpecifierError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let range = lexer.span();
        match result {
            Ok(token) => tokens.push((token, Span::new(range.start, range.end))),
            Err(()) => {
                let character = source[range.start..].chars().next().unwrap_or('\0');
                return Err(SpecifierError::UnexpectedCharacter {
                    character,
                    position: range.start,
                });
            }
        }
    }

    Ok(tokens)
}
