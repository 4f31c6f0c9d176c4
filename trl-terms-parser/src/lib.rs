//! # TRL Terms Parser
//!
//! Reads TRL documents into the owned statements of the [`trl_terms`]
//! crate.
//!
//! The pipeline has two stages: the [`TermLexer`] produces positioned
//! [`TermToken`]s and the [`TermParser`] assembles them into
//! [`Statement`](trl_terms::Statement)s. Errors of both stages are
//! collected into one [`ParseResult`] so a caller sees every problem of a
//! document at once.
//!
//! ## Example
//! ```rust
//! use trl_terms_parser::{DocumentParser, TermParser};
//!
//! let text = r#"
//!     root: (p1, p2);
//!     p1 => Person<Name, Born>("Socrates", -470);
//!     p2 => Person<Name, Born>("Plato", -423);
//! "#;
//! let result = TermParser::new().parse(text);
//! assert!(result.succeeded, "{}", result.error_message());
//! assert_eq!(result.statements.len(), 3);
//!
//! let broken = TermParser::new().parse("root: f(1 2);");
//! assert!(!broken.succeeded);
//! assert!(broken.error_message().starts_with("line 1, column 11"));
//! ```
//!
//! ## License
//!
//! Released under the terms of the GNU Lesser General Public License, version 3.0 or
//! (at your option) any later version (LGPL-3.0-or-later).

mod error;
mod lexer;
mod parser;
mod token;

pub use error::TermParserError;
pub use lexer::{LexerStats, TermLexer};
pub use parser::{DocumentParser, ParseResult, TermParser};
pub use token::{Span, TermToken, TokenID, Value};
