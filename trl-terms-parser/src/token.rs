//! # Term Parser Tokens
//!
//! Concrete token value and token type used by the parser pipeline.
//!
//! Provides:
//! - [`TokenID`]: the syntactic kind of a token,
//! - [`Span`]: the source position where a token starts,
//! - [`Value`]: the payload carried by lexical tokens (the decoded text of
//!   identifiers, strings and numbers),
//! - [`TermToken`]: a concrete token that pairs a [`TokenID`], a [`Value`]
//!   and a [`Span`].
//!
//! These are produced by the [`TermLexer`](crate::TermLexer) and consumed by
//! the [`TermParser`](crate::TermParser).

use crate::TermParserError;
use smartstring::alias::String;
use std::fmt;

/// Token kinds of the TRL grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenID {
    /// A bare or single-quoted name.
    Ident,
    /// A double-quoted string.
    Str,
    /// A decimal number literal.
    Number,
    /// `:`
    Colon,
    /// `=>`
    Arrow,
    /// `;`
    Semicolon,
    /// `,`
    Comma,
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `<`
    LeftAngle,
    /// `>`
    RightAngle,
    /// End of input.
    End,
}

impl fmt::Display for TokenID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TokenID::Ident => "identifier",
            TokenID::Str => "string",
            TokenID::Number => "number",
            TokenID::Colon => "':'",
            TokenID::Arrow => "'=>'",
            TokenID::Semicolon => "';'",
            TokenID::Comma => "','",
            TokenID::LeftParen => "'('",
            TokenID::RightParen => "')'",
            TokenID::LeftAngle => "'<'",
            TokenID::RightAngle => "'>'",
            TokenID::End => "end of input",
        })
    }
}

/// A 1-based source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub const START: Span = Span { line: 1, column: 1 };
}

impl Default for Span {
    fn default() -> Self {
        Self::START
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Represents a generic value emitted by the lexer.
///
/// # Variants
/// - [`Value::None`]: punctuation and end of input carry nothing.
/// - [`Value::Text`]: the decoded text of an identifier, string or number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Value {
    #[default]
    None,
    Text(String),
}

impl TryFrom<Value> for String {
    type Error = TermParserError;
    fn try_from(v: Value) -> Result<Self, TermParserError> {
        match v {
            Value::Text(x) => Ok(x),
            other => Err(TermParserError::InvalidValue {
                expected: "Text",
                found: other,
            }),
        }
    }
}

/// A token produced by the [`TermLexer`](crate::TermLexer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermToken {
    /// The syntactic token kind.
    pub token_id: TokenID,
    /// The associated value (if any).
    pub value: Value,
    /// Where the token starts.
    pub span: Span,
}

impl TermToken {
    /// Creates a new [`TermToken`].
    ///
    /// # Parameters
    /// - `token_id`: Token kind.
    /// - `value`: Value attached to the token.
    /// - `span`: Source position where this token was found.
    #[must_use]
    pub fn new(token_id: TokenID, value: Value, span: Span) -> Self {
        Self {
            token_id,
            value,
            span,
        }
    }
}
