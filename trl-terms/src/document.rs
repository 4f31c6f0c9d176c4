//! Statements and documents: the unit exchanged with the parser and the
//! renderer.

use crate::Term;
use smartstring::alias::String;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How a statement binds its label.
///
/// - [`StatementKind::Term`]: `label: term;` names a result.
/// - [`StatementKind::Rewrite`]: `label => term;` defines a rewrite rule,
///   every identifier atom spelled `label` is replaced by `term`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StatementKind {
    Term,
    Rewrite,
}

/// A labeled term. The label is optional for plain term statements and
/// mandatory for rewrite rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Statement {
    pub label: Option<String>,
    pub kind: StatementKind,
    pub term: Term,
    pub root: bool,
}

impl Statement {
    /// `label: term;`
    pub fn labeled(label: impl AsRef<str>, term: Term) -> Self {
        Self {
            label: Some(label.as_ref().into()),
            kind: StatementKind::Term,
            term,
            root: false,
        }
    }

    /// `label => term;`
    pub fn rewrite(label: impl AsRef<str>, term: Term) -> Self {
        Self {
            label: Some(label.as_ref().into()),
            kind: StatementKind::Rewrite,
            term,
            root: false,
        }
    }

    /// `term;`
    pub fn unlabeled(term: Term) -> Self {
        Self {
            label: None,
            kind: StatementKind::Term,
            term,
            root: false,
        }
    }

    #[inline]
    pub fn is_rewrite(&self) -> bool {
        self.kind == StatementKind::Rewrite
    }
}

/// An ordered collection of statements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Document {
    pub statements: Vec<Statement>,
}

impl Document {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }

    /// Statements bound to `label`, in document order.
    pub fn statements_for_label<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a Statement> {
        self.statements
            .iter()
            .filter(move |s| s.label.as_deref() == Some(label))
    }

    /// The statement marked as root, if any.
    pub fn root(&self) -> Option<&Statement> {
        self.statements.iter().find(|s| s.root)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

impl FromIterator<Statement> for Document {
    fn from_iter<I: IntoIterator<Item = Statement>>(iter: I) -> Self {
        Self {
            statements: iter.into_iter().collect(),
        }
    }
}
