//! # Term Parser Error Type
//!
//! This module defines [`TermParserError`], a unified error enum for the
//! lexer and the parser. Lexical and syntax errors carry the [`Span`] where
//! they were detected. Errors raised by the term model while building a
//! term are wrapped with `#[from]`.

use crate::{Span, TokenID, Value};
use smartstring::alias::String;
use thiserror::Error;

/// Represents all possible errors that can occur while reading a document.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TermParserError {
    /// Tried to extract the wrong enum variant from `Value`.
    #[error("invalid value: expected {expected:?}, found {found:?}")]
    InvalidValue {
        expected: &'static str,
        found: Value,
    },

    #[error("{span}: unexpected character {found:?}")]
    UnexpectedChar { found: char, span: Span },

    #[error("{span}: unterminated {what}")]
    Unterminated { what: &'static str, span: Span },

    #[error("{span}: invalid escape sequence {sequence:?}")]
    InvalidEscape { sequence: String, span: Span },

    #[error("{span}: malformed number {text:?}")]
    MalformedNumber { text: String, span: Span },

    #[error("{span}: expected {expected}, found {found}")]
    UnexpectedToken {
        expected: &'static str,
        found: TokenID,
        span: Span,
    },

    #[error("{span}: terms nest deeper than {max} levels")]
    TooDeep { max: usize, span: Span },

    /// Term error.
    #[error("{span}: {source}")]
    Term {
        #[source]
        source: trl_terms::TermError,
        span: Span,
    },
}

impl TermParserError {
    /// Source position of the error, if it has one.
    pub fn span(&self) -> Option<Span> {
        match self {
            TermParserError::InvalidValue { .. } => None,
            TermParserError::UnexpectedChar { span, .. }
            | TermParserError::Unterminated { span, .. }
            | TermParserError::InvalidEscape { span, .. }
            | TermParserError::MalformedNumber { span, .. }
            | TermParserError::UnexpectedToken { span, .. }
            | TermParserError::TooDeep { span, .. }
            | TermParserError::Term { span, .. } => Some(*span),
        }
    }
}

/// Return an `UnexpectedToken` error for the given token.
///
/// # Example
/// ```rust, ignore
/// bail!("';'", token);
/// ```
macro_rules! bail {
    ($expected:expr, $token:expr) => {
        return Err($crate::TermParserError::UnexpectedToken {
            expected: $expected,
            found: $token.token_id,
            span: $token.span,
        })
    };
}

pub(crate) use bail;
