//! Specifier syntax errors

use super::lexer::{Token, TokenKind};
use crate::semver::VersionError;
use thiserror::Error;

/// Errors raised while tokenizing or parsing a dependency specifier
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecifierError {
    /// A character that starts no token
    #[error("Unexpected character '{character}' at position {position}")]
    UnexpectedCharacter { character: char, position: usize },

    /// A token of the wrong type
    #[error("Expected {}, got {found} at position {position}", describe_expected(.expected))]
    UnexpectedToken {
        expected: Vec<TokenKind>,
        found: Token,
        position: usize,
    },

    /// Input ended while a token was still required
    #[error("Unexpected end of input, expected {}", describe_expected(.expected))]
    UnexpectedEnd { expected: Vec<TokenKind> },

    /// Tokens left over after a complete specifier
    #[error("Expected end of input, got {found} at position {position}")]
    TrailingInput { found: Token, position: usize },

    /// A numeric component that does not fit into u64
    #[error("Number '{value}' at position {position} is out of range")]
    NumberOutOfRange { value: String, position: usize },

    /// The parsed version parts were rejected by the version model
    #[error("Invalid version in specifier: {0}")]
    InvalidVersion(#[from] VersionError),
}

fn describe_expected(expected: &[TokenKind]) -> String {
    match expected {
        [single] => single.to_string(),
        _ => {
            let names: Vec<String> = expected.iter().map(|k| k.to_string()).collect();
            format!("one of [{}]", names.join(", "))
        }
    }
}
