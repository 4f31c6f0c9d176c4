//! Lexer for TRL documents.
//!
//! [`TermLexer`] turns source text into [`TermToken`]s. It yields
//! `Result` items so that one bad character does not end the scan: after
//! an error the lexer resumes at the next character and the parser decides
//! what to do with the rest.
//!
//! Lexical grammar:
//! - identifiers: `[A-Za-z_][A-Za-z0-9_]*` or single quoted `'...'`,
//! - strings: double quoted `"..."`,
//! - numbers: `-?[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?`,
//! - punctuation: `: => ; , ( ) < >`,
//! - comments: `// ...` to end of line and `/* ... */`.
//!
//! Quoted identifiers and strings accept the escapes `\\ \" \' \n \r \t \0`
//! and `\u{hex}`.

use crate::{Span, TermParserError, TermToken, TokenID, Value};
use smartstring::alias::String;
use std::iter::Peekable;
use std::str::Chars;

/// Statistics of a finished scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LexerStats {
    pub tokens: usize,
    pub lines: usize,
}

/// A streaming lexer over a `&str`.
///
/// Yields tokens up to and including a single [`TokenID::End`] token.
pub struct TermLexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
    tokens: usize,
    done: bool,
}

impl<'a> TermLexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
            column: 1,
            tokens: 0,
            done: false,
        }
    }

    pub fn stats(&self) -> LexerStats {
        LexerStats {
            tokens: self.tokens,
            lines: self.line,
        }
    }

    #[inline]
    fn span(&self) -> Span {
        Span {
            line: self.line,
            column: self.column,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    #[inline]
    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    /// Skips whitespace and comments.
    fn skip_trivia(&mut self) -> Result<(), TermParserError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') => {
                    let start = self.span();
                    let mut ahead = self.chars.clone();
                    ahead.next();
                    match ahead.next() {
                        Some('/') => {
                            while let Some(c) = self.bump() {
                                if c == '\n' {
                                    break;
                                }
                            }
                        }
                        Some('*') => {
                            self.bump();
                            self.bump();
                            let mut star = false;
                            loop {
                                match self.bump() {
                                    None => {
                                        return Err(TermParserError::Unterminated {
                                            what: "comment",
                                            span: start,
                                        });
                                    }
                                    Some('/') if star => break,
                                    Some(c) => star = c == '*',
                                }
                            }
                        }
                        _ => return Ok(()),
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn read_escape(&mut self, span: Span) -> Result<char, TermParserError> {
        let invalid = |sequence: &str| TermParserError::InvalidEscape {
            sequence: sequence.into(),
            span,
        };
        match self.bump() {
            Some('\\') => Ok('\\'),
            Some('"') => Ok('"'),
            Some('\'') => Ok('\''),
            Some('n') => Ok('\n'),
            Some('r') => Ok('\r'),
            Some('t') => Ok('\t'),
            Some('0') => Ok('\0'),
            Some('u') => {
                if self.peek() != Some('{') {
                    return Err(invalid("\\u"));
                }
                self.bump();
                let mut hex = String::new();
                while let Some(c) = self.peek() {
                    if c == '}' {
                        break;
                    }
                    if !c.is_ascii_hexdigit() || hex.len() >= 6 {
                        break;
                    }
                    hex.push(c);
                    self.bump();
                }
                let mut sequence = String::from("\\u{");
                sequence.push_str(&hex);
                if self.peek() != Some('}') {
                    return Err(invalid(&sequence));
                }
                self.bump();
                sequence.push('}');
                u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| invalid(&sequence))
            }
            Some(c) => {
                let mut sequence = String::from("\\");
                sequence.push(c);
                Err(invalid(&sequence))
            }
            None => Err(invalid("\\")),
        }
    }

    /// Reads the body of a quoted token; the opening quote is consumed.
    /// Scans up to the closing quote even after a bad escape.
    fn read_quoted(&mut self, quote: char, what: &'static str, start: Span) -> Result<String, TermParserError> {
        let mut text = String::new();
        let mut first_error = None;
        loop {
            let span = self.span();
            match self.bump() {
                None => return Err(TermParserError::Unterminated { what, span: start }),
                Some(c) if c == quote => break,
                Some('\\') => match self.read_escape(span) {
                    Ok(c) => text.push(c),
                    Err(e) => {
                        first_error.get_or_insert(e);
                    }
                },
                Some(c) => text.push(c),
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(text),
        }
    }

    fn read_digits(&mut self, text: &mut String) -> usize {
        let mut n = 0;
        while let Some(c) = self.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            text.push(c);
            self.bump();
            n += 1;
        }
        n
    }

    fn read_number(&mut self, start: Span) -> Result<String, TermParserError> {
        let mut text = String::new();
        if self.peek() == Some('-') {
            text.push('-');
            self.bump();
        }
        let malformed = |text: &String| TermParserError::MalformedNumber {
            text: text.clone(),
            span: start,
        };
        if self.read_digits(&mut text) == 0 {
            return Err(malformed(&text));
        }
        if self.peek() == Some('.') {
            text.push('.');
            self.bump();
            if self.read_digits(&mut text) == 0 {
                return Err(malformed(&text));
            }
        }
        if let Some(e @ ('e' | 'E')) = self.peek() {
            text.push(e);
            self.bump();
            if let Some(sign @ ('+' | '-')) = self.peek() {
                text.push(sign);
                self.bump();
            }
            if self.read_digits(&mut text) == 0 {
                return Err(malformed(&text));
            }
        }
        Ok(text)
    }

    fn read_bare(&mut self) -> String {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if !(c.is_ascii_alphanumeric() || c == '_') {
                break;
            }
            text.push(c);
            self.bump();
        }
        text
    }

    fn next_token(&mut self) -> Result<TermToken, TermParserError> {
        self.skip_trivia()?;
        let span = self.span();
        let punct = |token_id| Ok(TermToken::new(token_id, Value::None, span));
        let Some(c) = self.peek() else {
            self.done = true;
            return punct(TokenID::End);
        };
        match c {
            ':' | ';' | ',' | '(' | ')' | '<' | '>' => {
                self.bump();
                punct(match c {
                    ':' => TokenID::Colon,
                    ';' => TokenID::Semicolon,
                    ',' => TokenID::Comma,
                    '(' => TokenID::LeftParen,
                    ')' => TokenID::RightParen,
                    '<' => TokenID::LeftAngle,
                    _ => TokenID::RightAngle,
                })
            }
            '=' => {
                self.bump();
                if self.peek() == Some('>') {
                    self.bump();
                    punct(TokenID::Arrow)
                } else {
                    Err(TermParserError::UnexpectedChar { found: '=', span })
                }
            }
            '"' => {
                self.bump();
                let text = self.read_quoted('"', "string", span)?;
                Ok(TermToken::new(TokenID::Str, Value::Text(text), span))
            }
            '\'' => {
                self.bump();
                let text = self.read_quoted('\'', "quoted identifier", span)?;
                Ok(TermToken::new(TokenID::Ident, Value::Text(text), span))
            }
            '-' | '0'..='9' => {
                let text = self.read_number(span)?;
                Ok(TermToken::new(TokenID::Number, Value::Text(text), span))
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let text = self.read_bare();
                Ok(TermToken::new(TokenID::Ident, Value::Text(text), span))
            }
            c => {
                self.bump();
                Err(TermParserError::UnexpectedChar { found: c, span })
            }
        }
    }
}

impl Iterator for TermLexer<'_> {
    type Item = Result<TermToken, TermParserError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let token = self.next_token();
        if let Ok(token) = &token {
            self.tokens += 1;
            log::trace!("token {:?} at {}", token.token_id, token.span);
        }
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(s: &str) -> Vec<Result<TermToken, TermParserError>> {
        let _ = env_logger::builder().is_test(true).try_init();
        TermLexer::new(s).collect()
    }

    fn ids(s: &str) -> Vec<TokenID> {
        lex(s).into_iter().map(|t| t.unwrap().token_id).collect()
    }

    fn text(t: &Result<TermToken, TermParserError>) -> String {
        String::try_from(t.clone().unwrap().value).unwrap()
    }

    #[test]
    fn punctuation_and_end() {
        use TokenID::*;
        assert_eq!(
            ids("root: f<A>(x, (1)); r => y;"),
            vec![
                Ident, Colon, Ident, LeftAngle, Ident, RightAngle, LeftParen, Ident, Comma,
                LeftParen, Number, RightParen, RightParen, Semicolon, Ident, Arrow, Ident,
                Semicolon, End
            ]
        );
        assert_eq!(ids(""), vec![End]);
    }

    #[test]
    fn literals() {
        let ts = lex(r#"'two words' "a\n\"b\"" -470 3.25e-2 _x1 'it\'s'"#);
        assert_eq!(text(&ts[0]), "two words");
        assert_eq!(text(&ts[1]), "a\n\"b\"");
        assert_eq!(text(&ts[2]), "-470");
        assert_eq!(text(&ts[3]), "3.25e-2");
        assert_eq!(text(&ts[4]), "_x1");
        assert_eq!(text(&ts[5]), "it's");
    }

    #[test]
    fn unicode_escape() {
        let ts = lex(r#""\u{1F600}\u{0}""#);
        assert_eq!(text(&ts[0]), "\u{1F600}\u{0}");
    }

    #[test]
    fn comments_and_positions() {
        let ts = lex("// header\n  /* block\n */ x");
        let x = ts[0].clone().unwrap();
        assert_eq!(x.token_id, TokenID::Ident);
        assert_eq!(x.span, Span { line: 3, column: 5 });
    }

    #[test]
    fn errors_do_not_stop_the_scan() {
        let ts = lex("a # b");
        assert!(matches!(
            ts[1],
            Err(TermParserError::UnexpectedChar { found: '#', .. })
        ));
        assert_eq!(text(&ts[2]), "b");
        assert_eq!(ts.len(), 4);
    }

    #[test]
    fn bad_literals() {
        assert!(matches!(
            lex("\"abc")[0],
            Err(TermParserError::Unterminated { what: "string", .. })
        ));
        assert!(matches!(
            lex(r#""a\qb" x"#)[0],
            Err(TermParserError::InvalidEscape { .. })
        ));
        // the scan resumes after the closing quote
        assert_eq!(text(&lex(r#""a\qb" x"#)[1]), "x");
        assert!(matches!(
            lex("1.")[0],
            Err(TermParserError::MalformedNumber { .. })
        ));
        assert!(matches!(
            lex("- 1")[0],
            Err(TermParserError::MalformedNumber { .. })
        ));
        assert!(matches!(
            lex("= x")[0],
            Err(TermParserError::UnexpectedChar { found: '=', .. })
        ));
        assert!(matches!(
            lex("/* open")[0],
            Err(TermParserError::Unterminated { what: "comment", .. })
        ));
    }
}
