//! Renders terms, statements and documents as TRL text.
//!
//! [`Term`], [`Statement`] and [`Document`] implement [`fmt::Display`] in
//! the compact layout. [`Document::display`] returns a [`DocumentDisplay`]
//! that can switch to the pretty layout, which puts one statement per line
//! and breaks nested compound arguments over indented lines.
//!
//! Strings are double quoted with `\\ \" \n \r \t` escapes. Identifiers,
//! term names and member names are written bare when they match
//! `[A-Za-z_][A-Za-z0-9_]*` and single quoted otherwise. Numbers are
//! written as their literal text.

use crate::{Atom, AtomKind, Document, Statement, StatementKind, Term};
use std::fmt;

const INDENT: &str = "    ";

/// Returns `true` if `s` can be written without quotes.
pub fn is_bare_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn write_name(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    if is_bare_name(s) {
        return f.write_str(s);
    }
    f.write_str("'")?;
    for ch in s.chars() {
        match ch {
            '\\' => f.write_str("\\\\")?,
            '\'' => f.write_str("\\'")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if c.is_control() => write!(f, "\\u{{{:x}}}", c as u32)?,
            c => write!(f, "{c}")?,
        }
    }
    f.write_str("'")
}

fn write_str_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for ch in s.chars() {
        match ch {
            '\\' => f.write_str("\\\\")?,
            '"' => f.write_str("\\\"")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if c.is_control() => write!(f, "\\u{{{:x}}}", c as u32)?,
            c => write!(f, "{c}")?,
        }
    }
    f.write_str("\"")
}

fn write_atom(f: &mut fmt::Formatter<'_>, atom: &Atom) -> fmt::Result {
    match atom.kind {
        AtomKind::String => write_str_quoted(f, &atom.text),
        AtomKind::Number => f.write_str(&atom.text),
        AtomKind::Identifier => write_name(f, &atom.text),
    }
}

fn write_indent(f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        f.write_str(INDENT)?;
    }
    Ok(())
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Term], pretty: bool, depth: usize) -> fmt::Result {
    let broken = pretty && args.iter().any(|a| a.arity() > 0);
    f.write_str("(")?;
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
            if !broken {
                f.write_str(" ")?;
            }
        }
        if broken {
            f.write_str("\n")?;
            write_indent(f, depth + 1)?;
        }
        write_term(f, arg, pretty, depth + 1)?;
    }
    if broken {
        f.write_str("\n")?;
        write_indent(f, depth)?;
    }
    f.write_str(")")
}

fn write_term(f: &mut fmt::Formatter<'_>, term: &Term, pretty: bool, depth: usize) -> fmt::Result {
    match term {
        Term::Atom(atom) => write_atom(f, atom),
        Term::List(items) => write_args(f, items, pretty, depth),
        Term::NonAc(t) => {
            write_name(f, &t.name)?;
            if let Some(members) = &t.members {
                f.write_str("<")?;
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write_name(f, m)?;
                }
                f.write_str(">")?;
            }
            write_args(f, &t.args, pretty, depth)
        }
    }
}

fn write_statement(f: &mut fmt::Formatter<'_>, statement: &Statement, pretty: bool) -> fmt::Result {
    if let Some(label) = &statement.label {
        write_name(f, label)?;
        match statement.kind {
            StatementKind::Term => f.write_str(": ")?,
            StatementKind::Rewrite => f.write_str(" => ")?,
        }
    }
    write_term(f, &statement.term, pretty, 0)?;
    f.write_str(";")
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_term(f, self, false, 0)
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_statement(f, self, false)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.display(false).fmt(f)
    }
}

/// A wrapper that renders a [`Document`] in the compact or the pretty
/// layout.
///
/// ### Example
/// ```rust
/// use trl_terms::{Document, Statement, Term};
/// let doc: Document = [Statement::labeled(
///     "root",
///     Term::non_ac("pair", [Term::list([Term::number("1")]), Term::string("x")]),
/// )]
/// .into_iter()
/// .collect();
///
/// assert_eq!(doc.display(false).to_string(), r#"root: pair((1), "x");"#);
/// assert_eq!(
///     doc.display(true).to_string(),
///     "root: pair(\n    (1),\n    \"x\"\n);"
/// );
/// ```
pub struct DocumentDisplay<'a> {
    document: &'a Document,
    pretty: bool,
}

impl Document {
    /// Return a [`DocumentDisplay`] suitable for formatting with [`fmt::Display`].
    #[inline]
    pub fn display(&self, pretty: bool) -> DocumentDisplay<'_> {
        DocumentDisplay {
            document: self,
            pretty,
        }
    }
}

impl<'a> fmt::Display for DocumentDisplay<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = if self.pretty { "\n" } else { " " };
        for (i, statement) in self.document.statements.iter().enumerate() {
            if i > 0 {
                f.write_str(separator)?;
            }
            write_statement(f, statement, self.pretty)?;
        }
        Ok(())
    }
}
