//! Recursive descent parser for dependency specifiers
//!
//! Grammar:
//! ```text
//! spec          := (repository "/")? name version_spec?
//! version_spec  := "[" (LATEST | exact_version | bounds) "]"
//! exact_version := NUMBER "." NUMBER "." NUMBER
//! bounds        := bound ("," bound)*
//! bound         := cmp_op NUMBER ("." NUMBER ("." NUMBER)?)?
//! ```
//!
//! One token of lookahead is enough for the whole grammar. The parser checks
//! syntax only; numeric semantics belong to the version model.

use super::error::SpecifierError;
use super::lexer::{tokenize, Span, Token, TokenKind};
use super::{DependencySpecifierParts, VersionSpecBound, VersionSpecBoundOperand, VersionSpecType};
use crate::semver::{SemanticVersion, SemanticVersionWithOptionalParts};

const COMPARISON_OPERATORS: [TokenKind; 4] = [
    TokenKind::Less,
    TokenKind::LessOrEqual,
    TokenKind::Greater,
    TokenKind::GreaterOrEqual,
];

/// Parse a dependency specifier string into its parts
pub fn parse_dependency_specifier(source: &str) -> Result<DependencySpecifierParts, SpecifierError> {
    let tokens = tokenize(source)?;
    let mut cursor = TokenCursor::new(tokens);
    let parts = parse_spec(&mut cursor)?;
    cursor.expect_eof()?;
    Ok(parts)
}

/// Cursor over the token stream
struct TokenCursor {
    tokens: Vec<(Token, Span)>,
    pos: usize,
}

impl TokenCursor {
    fn new(tokens: Vec<(Token, Span)>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn current(&self) -> Option<&(Token, Span)> {
        self.tokens.get(self.pos)
    }

    fn check_any(&self, expected: &[TokenKind]) -> bool {
        self.current()
            .is_some_and(|(token, _)| expected.contains(&token.kind()))
    }

    /// Assert that the current token has one of the expected types and consume it
    fn expect_any(&mut self, expected: &[TokenKind]) -> Result<(Token, Span), SpecifierError> {
        if !self.check_any(expected) {
            return Err(self.unexpected(expected));
        }
        let entry = self.tokens[self.pos].clone();
        self.pos += 1;
        Ok(entry)
    }

    /// Build the error for a current token that matches none of `expected`
    fn unexpected(&self, expected: &[TokenKind]) -> SpecifierError {
        match self.current() {
            None => SpecifierError::UnexpectedEnd {
                expected: expected.to_vec(),
            },
            Some((token, span)) => SpecifierError::UnexpectedToken {
                expected: expected.to_vec(),
                found: token.clone(),
                position: span.start,
            },
        }
    }

    fn expect(&mut self, expected: TokenKind) -> Result<(Token, Span), SpecifierError> {
        self.expect_any(&[expected])
    }

    /// Consume the current token if it has the given type
    fn consume_if(&mut self, expected: TokenKind) -> bool {
        if self.check_any(&[expected]) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_eof(&self) -> Result<(), SpecifierError> {
        match self.current() {
            None => Ok(()),
            Some((token, span)) => Err(SpecifierError::TrailingInput {
                found: token.clone(),
                position: span.start,
            }),
        }
    }
}

fn parse_spec(cursor: &mut TokenCursor) -> Result<DependencySpecifierParts, SpecifierError> {
    let (repository, name) = parse_repository_and_name(cursor)?;
    let version_spec = parse_version_spec(cursor)?;
    Ok(DependencySpecifierParts {
        repository,
        name,
        version_spec,
    })
}

fn parse_repository_and_name(
    cursor: &mut TokenCursor,
) -> Result<(Option<String>, String), SpecifierError> {
    let repo_or_name = expect_identifier(cursor)?;
    if cursor.consume_if(TokenKind::Slash) {
        let name = expect_identifier(cursor)?;
        return Ok((Some(repo_or_name), name));
    }
    Ok((None, repo_or_name))
}

fn parse_version_spec(cursor: &mut TokenCursor) -> Result<VersionSpecType, SpecifierError> {
    if !cursor.consume_if(TokenKind::LeftBracket) {
        return Ok(VersionSpecType::Latest);
    }

    let version_spec = if cursor.consume_if(TokenKind::Latest) {
        VersionSpecType::Latest
    } else if cursor.check_any(&[TokenKind::Number]) {
        VersionSpecType::Exact(parse_exact_version(cursor)?)
    } else if cursor.check_any(&COMPARISON_OPERATORS) {
        VersionSpecType::Bounds(parse_bounds(cursor)?)
    } else {
        let mut expected = vec![TokenKind::Latest, TokenKind::Number];
        expected.extend_from_slice(&COMPARISON_OPERATORS);
        return Err(cursor.unexpected(&expected));
    };

    cursor.expect(TokenKind::RightBracket)?;
    Ok(version_spec)
}

fn parse_exact_version(cursor: &mut TokenCursor) -> Result<SemanticVersion, SpecifierError> {
    let major = expect_number(cursor)?;
    cursor.expect(TokenKind::Dot)?;
    let minor = expect_number(cursor)?;
    cursor.expect(TokenKind::Dot)?;
    let patch = expect_number(cursor)?;
    Ok(SemanticVersion::new(major, minor, patch))
}

fn parse_bounds(cursor: &mut TokenCursor) -> Result<Vec<VersionSpecBound>, SpecifierError> {
    let mut bounds = Vec::new();
    loop {
        let (operator, _) = cursor.expect_any(&COMPARISON_OPERATORS)?;
        let operand = match operator {
            Token::Less => VersionSpecBoundOperand::LessThan,
            Token::LessOrEqual => VersionSpecBoundOperand::LessThanOrEqual,
            Token::Greater => VersionSpecBoundOperand::GreaterThan,
            Token::GreaterOrEqual => VersionSpecBoundOperand::GreaterThanOrEqual,
            _ => unreachable!("expect_any only yields comparison operators"),
        };
        let version = parse_version_with_optional_parts(cursor)?;
        bounds.push(VersionSpecBound { operand, version });

        if !cursor.consume_if(TokenKind::Comma) {
            break;
        }
    }
    Ok(bounds)
}

fn parse_version_with_optional_parts(
    cursor: &mut TokenCursor,
) -> Result<SemanticVersionWithOptionalParts, SpecifierError> {
    let major = expect_number(cursor)?;
    let mut minor = None;
    let mut patch = None;
    if cursor.consume_if(TokenKind::Dot) {
        minor = Some(expect_number(cursor)?);
        if cursor.consume_if(TokenKind::Dot) {
            patch = Some(expect_number(cursor)?);
        }
    }
    Ok(SemanticVersionWithOptionalParts::new(major, minor, patch)?)
}

fn expect_identifier(cursor: &mut TokenCursor) -> Result<String, SpecifierError> {
    match cursor.expect(TokenKind::Identifier)? {
        (Token::Identifier(name), _) => Ok(name),
        _ => unreachable!("expect returned a non-identifier"),
    }
}

fn expect_number(cursor: &mut TokenCursor) -> Result<u64, SpecifierError> {
    match cursor.expect(TokenKind::Number)? {
        (Token::Number(value), span) => {
            value
                .parse()
                .map_err(|_| SpecifierError::NumberOutOfRange {
                    value,
                    position: span.start,
                })
        }
        _ => unreachable!("expect returned a non-number"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bound(
        operand: VersionSpecBoundOperand,
        major: u64,
        minor: Option<u64>,
        patch: Option<u64>,
    ) -> VersionSpecBound {
        VersionSpecBound {
            operand,
            version: SemanticVersionWithOptionalParts::new(major, minor, patch).unwrap(),
        }
    }

    #[test]
    fn test_name_only() {
        let parts = parse_dependency_specifier("cpd").unwrap();
        assert_eq!(parts.repository, None);
        assert_eq!(parts.name, "cpd");
        assert_eq!(parts.version_spec, VersionSpecType::Latest);
    }

    #[test]
    fn test_repository_and_name() {
        let parts = parse_dependency_specifier("repo/cpd").unwrap();
        assert_eq!(parts.repository.as_deref(), Some("repo"));
        assert_eq!(parts.name, "cpd");
        assert_eq!(parts.version_spec, VersionSpecType::Latest);
    }

    #[test]
    fn test_explicit_latest() {
        let parts = parse_dependency_specifier("boost[latest]").unwrap();
        assert_eq!(parts.version_spec, VersionSpecType::Latest);
    }

    #[test]
    fn test_exact_version() {
        let parts = parse_dependency_specifier("cpd[1.2.3]").unwrap();
        assert_eq!(
            parts.version_spec,
            VersionSpecType::Exact(SemanticVersion::new(1, 2, 3))
        );
    }

    #[test]
    fn test_bounds() {
        let parts = parse_dependency_specifier("cpd[>1,<=2.0]").unwrap();
        assert_eq!(
            parts.version_spec,
            VersionSpecType::Bounds(vec![
                bound(VersionSpecBoundOperand::GreaterThan, 1, None, None),
                bound(VersionSpecBoundOperand::LessThanOrEqual, 2, Some(0), None),
            ])
        );
    }

    #[test]
    fn test_bound_with_full_version() {
        let parts = parse_dependency_specifier("official/boost[>=1.5.7]").unwrap();
        assert_eq!(
            parts.version_spec,
            VersionSpecType::Bounds(vec![bound(
                VersionSpecBoundOperand::GreaterThanOrEqual,
                1,
                Some(5),
                Some(7)
            )])
        );
    }

    #[test]
    fn test_error_names_expected_and_found() {
        let err = parse_dependency_specifier("cpd[1.0]").unwrap_err();
        assert_eq!(
            err,
            SpecifierError::UnexpectedToken {
                expected: vec![TokenKind::Dot],
                found: Token::RightBracket,
                position: 7,
            }
        );
    }

    #[test]
    fn test_error_at_end_of_input() {
        let err = parse_dependency_specifier("cpd[1.0.0").unwrap_err();
        assert_eq!(
            err,
            SpecifierError::UnexpectedEnd {
                expected: vec![TokenKind::RightBracket]
            }
        );
    }

    #[test]
    fn test_trailing_tokens() {
        let err = parse_dependency_specifier("repo/cpd/another").unwrap_err();
        assert!(matches!(err, SpecifierError::TrailingInput { position: 8, .. }));
    }

    #[test]
    fn test_number_out_of_range() {
        let err = parse_dependency_specifier("cpd[99999999999999999999.0.0]").unwrap_err();
        assert!(matches!(err, SpecifierError::NumberOutOfRange { position: 4, .. }));
    }

    #[test]
    fn test_empty_brackets_lists_alternatives() {
        let err = parse_dependency_specifier("cpd[]").unwrap_err();
        match err {
            SpecifierError::UnexpectedToken { expected, found, .. } => {
                assert_eq!(found, Token::RightBracket);
                assert!(expected.contains(&TokenKind::Latest));
                assert!(expected.contains(&TokenKind::Number));
                assert!(expected.contains(&TokenKind::GreaterOrEqual));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
