//! Parser for TRL documents.
//!
//! This module defines the [`TermParser`], a recursive-descent parser over
//! the tokens produced by the [`TermLexer`]. It builds owned
//! [`Statement`]s from the [`trl_terms`] crate.
//!
//! Grammar:
//!
//! ```text
//! document  := statement*
//! statement := IDENT ':' term ';'
//!            | IDENT '=>' term ';'
//!            | term ';'
//! term      := STRING | NUMBER
//!            | IDENT [ '<' [ IDENT { ',' IDENT } ] '>' '(' args ')' ]
//!            | IDENT '(' args ')'
//!            | '(' args ')'
//! args      := [ term { ',' term } ]
//! ```
//!
//! A bare `IDENT` is an identifier atom, `IDENT(...)` a named term and
//! `(...)` a list. A named term with a member list must have exactly one
//! member per argument.
//!
//! Compound terms nest at most [`MAX_TERM_DEPTH`] levels deep.
//!
//! After an error the parser skips to the next `;` and keeps going, so one
//! run reports every broken statement. A [`ParseResult`] that carries any
//! error has no statements.
//!
//! [`TermLexer`]: crate::TermLexer

use crate::error::bail;
use crate::{TermLexer, TermParserError, TermToken, TokenID};
use smartstring::alias::String;
use trl_terms::{Document, Statement, StatementKind, Term, MAX_TERM_DEPTH};

/// Outcome of parsing one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseResult {
    /// `true` iff `errors` is empty.
    pub succeeded: bool,
    /// Lexical and syntax errors in source order.
    pub errors: Vec<TermParserError>,
    /// All statements, in source order; empty unless `succeeded`.
    pub statements: Vec<Statement>,
}

impl ParseResult {
    /// All error messages joined with `"; "`.
    pub fn error_message(&self) -> std::string::String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Converts into a [`Document`], or the list of errors.
    pub fn into_document(self) -> Result<Document, Vec<TermParserError>> {
        if self.succeeded {
            Ok(Document::new(self.statements))
        } else {
            Err(self.errors)
        }
    }
}

/// Anything that turns document text into statements.
///
/// The codec is generic over this trait so that a different front end can
/// be plugged in.
pub trait DocumentParser {
    fn parse(&self, text: &str) -> ParseResult;
}

/// The TRL document parser.
///
/// # Example
/// ```rust
/// use trl_terms_parser::{DocumentParser, TermParser};
/// let result = TermParser::new().parse(r#"root: Person<Name>("Plato"); x => 1;"#);
/// assert!(result.succeeded);
/// assert_eq!(result.statements.len(), 2);
/// assert_eq!(result.statements[0].to_string(), r#"root: Person<Name>("Plato");"#);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TermParser;

impl TermParser {
    pub fn new() -> Self {
        Self
    }

    /// Parses a single term, with no trailing `;`.
    pub fn parse_term(&self, text: &str) -> Result<Term, Vec<TermParserError>> {
        let (tokens, errors) = tokenize(text);
        if !errors.is_empty() {
            return Err(errors);
        }
        let mut cursor = Cursor::new(&tokens);
        let term = cursor.term().map_err(|e| vec![e])?;
        let end = cursor.peek();
        if end.token_id != TokenID::End {
            return Err(vec![TermParserError::UnexpectedToken {
                expected: "end of input",
                found: end.token_id,
                span: end.span,
            }]);
        }
        Ok(term)
    }
}

impl DocumentParser for TermParser {
    fn parse(&self, text: &str) -> ParseResult {
        let (tokens, mut errors) = tokenize(text);
        let mut cursor = Cursor::new(&tokens);
        let mut statements = Vec::new();
        while cursor.peek().token_id != TokenID::End {
            match cursor.statement() {
                Ok(statement) => {
                    log::trace!("parsed statement {}", statement);
                    statements.push(statement);
                }
                Err(e) => {
                    log::trace!("syntax error: {}", e);
                    errors.push(e);
                    cursor.recover();
                }
            }
        }
        errors.sort_by_key(|e| e.span());
        let succeeded = errors.is_empty();
        log::debug!(
            "parsed {} statements with {} errors",
            statements.len(),
            errors.len()
        );
        if !succeeded {
            statements.clear();
        }
        ParseResult {
            succeeded,
            errors,
            statements,
        }
    }
}

/// Runs the lexer to the end, separating tokens from lexical errors.
/// The token vector always ends with [`TokenID::End`].
fn tokenize(text: &str) -> (Vec<TermToken>, Vec<TermParserError>) {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    let mut lexer = TermLexer::new(text);
    for item in &mut lexer {
        match item {
            Ok(token) => tokens.push(token),
            Err(e) => errors.push(e),
        }
    }
    log::trace!("lexer stats: {:?}", lexer.stats());
    (tokens, errors)
}

struct Cursor<'a> {
    tokens: &'a [TermToken],
    pos: usize,
    depth: usize,
}

impl<'a> Cursor<'a> {
    fn new(tokens: &'a [TermToken]) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    /// The current token. Past the end this is the final `End` token.
    fn peek(&self) -> &'a TermToken {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_second(&self) -> TokenID {
        self.tokens
            .get(self.pos + 1)
            .map_or(TokenID::End, |t| t.token_id)
    }

    fn advance(&mut self) -> &'a TermToken {
        let token = self.peek();
        if token.token_id != TokenID::End {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, token_id: TokenID, expected: &'static str) -> Result<&'a TermToken, TermParserError> {
        let token = self.peek();
        if token.token_id != token_id {
            bail!(expected, token);
        }
        Ok(self.advance())
    }

    fn text(token: &TermToken) -> Result<String, TermParserError> {
        String::try_from(token.value.clone())
    }

    /// Skips past the next `;`, or to the end.
    fn recover(&mut self) {
        loop {
            match self.advance().token_id {
                TokenID::Semicolon | TokenID::End => return,
                _ => {}
            }
        }
    }

    fn statement(&mut self) -> Result<Statement, TermParserError> {
        let token = self.peek();
        let kind = match (token.token_id, self.peek_second()) {
            (TokenID::Ident, TokenID::Colon) => Some(StatementKind::Term),
            (TokenID::Ident, TokenID::Arrow) => Some(StatementKind::Rewrite),
            _ => None,
        };
        let statement = match kind {
            Some(kind) => {
                let label = Self::text(self.advance())?;
                self.advance();
                let term = self.term()?;
                match kind {
                    StatementKind::Term => Statement::labeled(label, term),
                    StatementKind::Rewrite => Statement::rewrite(label, term),
                }
            }
            None => Statement::unlabeled(self.term()?),
        };
        self.expect(TokenID::Semicolon, "';'")?;
        Ok(statement)
    }

    fn term(&mut self) -> Result<Term, TermParserError> {
        let token = self.peek();
        match token.token_id {
            TokenID::Str => {
                self.advance();
                Ok(Term::string(Self::text(token)?))
            }
            TokenID::Number => {
                self.advance();
                Ok(Term::number(Self::text(token)?))
            }
            TokenID::LeftParen => {
                self.advance();
                Ok(Term::List(self.args()?))
            }
            TokenID::Ident => {
                self.advance();
                self.named(token)
            }
            _ => bail!("a term", token),
        }
    }

    /// An identifier atom or a named term; the name token is consumed.
    fn named(&mut self, token: &TermToken) -> Result<Term, TermParserError> {
        let name = Self::text(token)?;
        match self.peek().token_id {
            TokenID::LeftAngle => {
                self.advance();
                let members = self.members()?;
                self.expect(TokenID::LeftParen, "'('")?;
                let args = self.args()?;
                Term::non_ac_with_members(name, members, args).map_err(|source| {
                    TermParserError::Term {
                        source,
                        span: token.span,
                    }
                })
            }
            TokenID::LeftParen => {
                self.advance();
                Ok(Term::non_ac(name, self.args()?))
            }
            _ => Ok(Term::identifier(name)),
        }
    }

    /// Comma separated terms up to `)`; the `(` is consumed.
    fn args(&mut self) -> Result<Vec<Term>, TermParserError> {
        if self.depth >= MAX_TERM_DEPTH {
            return Err(TermParserError::TooDeep {
                max: MAX_TERM_DEPTH,
                span: self.peek().span,
            });
        }
        self.depth += 1;
        let args = self.args_inner();
        self.depth -= 1;
        args
    }

    fn args_inner(&mut self) -> Result<Vec<Term>, TermParserError> {
        let mut args = Vec::new();
        if self.peek().token_id == TokenID::RightParen {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.term()?);
            let token = self.peek();
            match token.token_id {
                TokenID::Comma => {}
                TokenID::RightParen => {
                    self.advance();
                    return Ok(args);
                }
                _ => bail!("',' or ')'", token),
            }
            self.advance();
        }
    }

    /// Comma separated names up to `>`; the `<` is consumed.
    fn members(&mut self) -> Result<Vec<String>, TermParserError> {
        let mut members = Vec::new();
        if self.peek().token_id == TokenID::RightAngle {
            self.advance();
            return Ok(members);
        }
        loop {
            let token = self.expect(TokenID::Ident, "a member name")?;
            members.push(Self::text(token)?);
            let token = self.peek();
            match token.token_id {
                TokenID::Comma => {}
                TokenID::RightAngle => {
                    self.advance();
                    return Ok(members);
                }
                _ => bail!("',' or '>'", token),
            }
            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn parse(s: &str) -> ParseResult {
        let _ = env_logger::builder().is_test(true).try_init();
        TermParser::new().parse(s)
    }

    fn document(s: &str) -> Document {
        parse(s).into_document().expect("parse error")
    }

    const PHILOSOPHERS: &str = r#"
        // three people from one city
        root: (p1, p2, p3);
        p1 => Person<Name, Born, Location>("Socrates", -470, athens);
        p2 => Person<Name, Born, Location>("Plato", -423, athens);
        p3 => Person<Name, Born, Location>("Aristotle", -384, stagira);
        athens => Location<City, Country>("Athens", "Greece");
        stagira => Location<City, Country>("Stagira", "Greece");
    "#;

    #[test]
    fn philosophers() {
        let doc = document(PHILOSOPHERS);
        assert_eq!(doc.len(), 6);
        let root = doc.statements_for_label("root").next().unwrap();
        assert_eq!(
            root.term,
            Term::list([
                Term::identifier("p1"),
                Term::identifier("p2"),
                Term::identifier("p3")
            ])
        );
        assert!(doc.statements[1].is_rewrite());
        assert_eq!(
            doc.statements[4].term,
            Term::non_ac_with_members(
                "Location",
                ["City", "Country"],
                [Term::string("Athens"), Term::string("Greece")]
            )
            .unwrap()
        );
    }

    #[test]
    fn shapes() {
        let doc = document(r#"a: f(); b: g<>(); c: (); d: ((1), "x"); 'odd label': x; 42;"#);
        let terms: Vec<_> = doc.statements.iter().map(|s| s.term.clone()).collect();
        assert_eq!(terms[0], Term::non_ac("f", []));
        assert_eq!(
            terms[1],
            Term::non_ac_with_members("g", Vec::<&str>::new(), []).unwrap()
        );
        assert_eq!(terms[2], Term::list([]));
        assert_eq!(
            terms[3],
            Term::list([Term::list([Term::number("1")]), Term::string("x")])
        );
        assert_eq!(doc.statements[4].label.as_deref(), Some("odd label"));
        assert_eq!(doc.statements[5].label, None);
    }

    #[test]
    fn parse_single_term() {
        let t = TermParser::new().parse_term("Div(Add(1, 2), 3)").unwrap();
        assert_eq!(t.to_string(), "Div(Add(1, 2), 3)");
        assert!(TermParser::new().parse_term("a b").is_err());
    }

    #[test]
    fn errors_are_collected_per_statement() {
        let result = parse("a: f(1 2); b: ok; c: g(;\nd: \"open");
        assert!(!result.succeeded);
        assert!(result.statements.is_empty());
        // the unterminated string also leaves `d:` without a term
        assert_eq!(result.errors.len(), 4, "{}", result.error_message());
        assert!(matches!(
            result.errors[0],
            TermParserError::UnexpectedToken {
                found: TokenID::Number,
                ..
            }
        ));
        // sorted by position
        let spans: Vec<_> = result.errors.iter().map(|e| e.span()).collect();
        let mut sorted = spans.clone();
        sorted.sort();
        assert_eq!(spans, sorted);
    }

    #[test]
    fn missing_semicolon() {
        let result = parse("root: x");
        assert!(!result.succeeded);
        assert!(result.error_message().contains("expected ';'"));
    }

    #[test]
    fn member_count_must_match() {
        let result = parse(r#"root: Person<Name, Born>("Plato");"#);
        assert!(matches!(
            result.errors[0],
            TermParserError::Term { .. }
        ));
    }

    #[test]
    fn members_need_arguments() {
        let result = parse("root: Person<Name>;");
        assert!(result.error_message().contains("expected '('"));
    }

    #[test]
    fn nesting_depth_is_limited() {
        let nested = |depth: usize| format!("root: {}1{};", "(".repeat(depth), ")".repeat(depth));
        let result = parse(&nested(MAX_TERM_DEPTH));
        assert!(result.succeeded, "{}", result.error_message());

        let result = parse(&nested(100_000));
        assert!(!result.succeeded);
        assert_eq!(result.errors.len(), 1, "{}", result.error_message());
        assert!(matches!(
            result.errors[0],
            TermParserError::TooDeep {
                max: MAX_TERM_DEPTH,
                ..
            }
        ));
    }

    #[test]
    fn empty_document() {
        let result = parse("  // nothing here\n");
        assert!(result.succeeded);
        assert!(result.statements.is_empty());
    }

    fn term_strategy() -> impl Strategy<Value = Term> {
        let leaf = prop_oneof![
            any::<std::string::String>().prop_map(Term::string),
            "-?[0-9]{1,5}(\\.[0-9]{1,3})?([eE][+-]?[0-9]{1,2})?".prop_map(Term::number),
            "[A-Za-z_][A-Za-z0-9_]{0,6}".prop_map(Term::identifier),
            any::<std::string::String>().prop_map(Term::identifier),
        ];
        leaf.prop_recursive(4, 32, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Term::list),
                ("[A-Za-z][A-Za-z0-9]{0,5}", prop::collection::vec(inner.clone(), 0..4))
                    .prop_map(|(name, args)| Term::non_ac(name, args)),
                ("[A-Z][a-z]{0,5}", prop::collection::vec(inner, 0..4)).prop_map(
                    |(name, args)| {
                        let members: Vec<_> = (0..args.len()).map(|i| format!("M{i}")).collect();
                        Term::non_ac_with_members(name, members, args).unwrap()
                    }
                ),
            ]
        })
    }

    proptest! {
        #[test]
        fn rendered_documents_parse_back(
            terms in prop::collection::vec(term_strategy(), 1..4),
            pretty in any::<bool>(),
        ) {
            let doc: Document = terms
                .into_iter()
                .enumerate()
                .map(|(i, t)| match i % 3 {
                    0 => Statement::labeled(format!("s{i}"), t),
                    1 => Statement::rewrite(format!("r{i}"), t),
                    _ => Statement::unlabeled(t),
                })
                .collect();
            let text = doc.display(pretty).to_string();
            let parsed = TermParser::new().parse(&text);
            prop_assert!(parsed.succeeded, "{}: {}", text, parsed.error_message());
            prop_assert_eq!(parsed.statements, doc.statements);
        }
    }
}
