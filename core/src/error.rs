//! Error types for stylesheet parsing.
//!
//! Parsing never produces a partial tree: the first structural problem is
//! reported as a [`ParseError`] carrying a 1-based line and column.

use cssparser::{BasicParseErrorKind, SourceLocation, ToCss};
use thiserror::Error;

/// The structural problem found by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    /// `/*` without a matching `*/`.
    #[error("unterminated comment")]
    UnterminatedComment,
    /// A quoted string without its closing quote.
    #[error("unterminated string")]
    UnterminatedString,
    /// A `{`, `(` or `[` block that reaches end of input before it is closed.
    #[error("unterminated block")]
    UnterminatedBlock,
    /// A `}` with no open block.
    #[error("unexpected '}}'")]
    UnexpectedCloseBrace,
    /// A selector or at-rule prelude that is not followed by a block.
    #[error("expected '{{' after '{0}'")]
    MissingBlock(String),
    /// A declaration without a `:` separator.
    #[error("declaration missing ':' in '{0}'")]
    MissingColon(String),
    /// An `@` not followed by an identifier.
    #[error("missing at-rule name")]
    MissingAtRuleName,
    /// A token the tokenizer could not place.
    #[error("unexpected token {0}")]
    UnexpectedToken(String),
    #[error("unexpected end of input")]
    UnexpectedEndOfInput,
}

impl From<BasicParseErrorKind<'_>> for ParseErrorKind {
    fn from(kind: BasicParseErrorKind<'_>) -> Self {
        match kind {
            BasicParseErrorKind::EndOfInput => Self::UnexpectedEndOfInput,
            BasicParseErrorKind::UnexpectedToken(token) => {
                Self::UnexpectedToken(token.to_css_string())
            }
            other => Self::UnexpectedToken(format!("{other:?}")),
        }
    }
}

/// A parse failure with its source position.
///
/// # Examples
///
/// ```
/// use cmq_core::{ParseErrorKind, parse};
///
/// let err = parse("a { color: red;\n").unwrap_err();
/// assert_eq!(err.kind, ParseErrorKind::UnterminatedBlock);
/// assert_eq!(err.line, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at line {line}, column {column}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// 1-based line of the offending construct.
    pub line: usize,
    /// 1-based column (in UTF-16 code units) of the offending construct.
    pub column: usize,
}

impl ParseError {
    /// Builds an error at a tokenizer location (0-based line, 1-based column).
    pub(crate) fn at(kind: ParseErrorKind, location: SourceLocation) -> Self {
        Self {
            kind,
            line: location.line as usize + 1,
            column: location.column as usize,
        }
    }
}

/// Convenience alias for results with [`ParseError`].
pub type Result<T> = std::result::Result<T, ParseError>;
