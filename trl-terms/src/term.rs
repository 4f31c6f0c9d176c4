//! Defines the owned [`Term`] tree and its leaf type [`Atom`].
//!
//! An owned term is what the parser produces and what the store hands back
//! when a statement is materialized. Inside a [`TermStore`](crate::TermStore)
//! the same shapes are kept as nodes addressed by [`Symbol`](crate::Symbol)
//! so that subterms can be shared.

use crate::TermError;
use smartstring::alias::String;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The three kinds of leaf values.
///
/// Numbers keep their literal source text so that precision is decided
/// only when a value is decoded into a concrete numeric type. Identifiers
/// are symbolic names: either a label defined by a rewrite statement or a
/// constant known to the codec's registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AtomKind {
    String,
    Number,
    Identifier,
}

impl AtomKind {
    /// Returns a stable lowercase name for the kind.
    pub fn name(&self) -> &'static str {
        match self {
            AtomKind::String => "string",
            AtomKind::Number => "number",
            AtomKind::Identifier => "identifier",
        }
    }
}

/// A leaf term: a kind tag plus the literal text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Atom {
    pub kind: AtomKind,
    pub text: String,
}

impl Atom {
    #[inline]
    pub fn new(kind: AtomKind, text: impl AsRef<str>) -> Self {
        Self {
            kind,
            text: text.as_ref().into(),
        }
    }
}

/// A named constructor term.
///
/// `members`, when present, pairs every argument with the name of the
/// record member it was read from. Terms built from a positional
/// deconstructor carry no member list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NonAcTerm {
    pub name: String,
    pub args: Vec<Term>,
    pub members: Option<Vec<String>>,
}

/// An owned term tree.
///
/// Equality is structural: two terms are equal iff their whole subtrees
/// are equal, including atom kinds and member lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Term {
    Atom(Atom),
    List(Vec<Term>),
    NonAc(NonAcTerm),
}

impl Term {
    /// Construct a string atom.
    #[inline]
    pub fn string(s: impl AsRef<str>) -> Self {
        Term::Atom(Atom::new(AtomKind::String, s))
    }

    /// Construct a number atom from its literal text.
    #[inline]
    pub fn number(text: impl AsRef<str>) -> Self {
        Term::Atom(Atom::new(AtomKind::Number, text))
    }

    /// Construct an identifier atom.
    #[inline]
    pub fn identifier(name: impl AsRef<str>) -> Self {
        Term::Atom(Atom::new(AtomKind::Identifier, name))
    }

    /// Construct a list from an iterator of terms.
    #[inline]
    pub fn list(items: impl IntoIterator<Item = Term>) -> Self {
        Term::List(items.into_iter().collect())
    }

    /// Construct a positional named term (no member list).
    #[inline]
    pub fn non_ac(name: impl AsRef<str>, args: impl IntoIterator<Item = Term>) -> Self {
        Term::NonAc(NonAcTerm {
            name: name.as_ref().into(),
            args: args.into_iter().collect(),
            members: None,
        })
    }

    /// Construct a named term whose arguments are bound to record members.
    /// Errors if the number of members differs from the number of arguments.
    pub fn non_ac_with_members(
        name: impl AsRef<str>,
        members: impl IntoIterator<Item = impl AsRef<str>>,
        args: impl IntoIterator<Item = Term>,
    ) -> Result<Self, TermError> {
        let name: String = name.as_ref().into();
        let members: Vec<String> = members.into_iter().map(|m| m.as_ref().into()).collect();
        let args: Vec<Term> = args.into_iter().collect();
        if members.len() != args.len() {
            return Err(TermError::MemberArity {
                name,
                members: members.len(),
                args: args.len(),
            });
        }
        Ok(Term::NonAc(NonAcTerm {
            name,
            args,
            members: Some(members),
        }))
    }

    #[inline]
    pub fn is_atom(&self) -> bool {
        matches!(self, Term::Atom(_))
    }

    #[inline]
    pub fn is_list(&self) -> bool {
        matches!(self, Term::List(_))
    }

    #[inline]
    pub fn is_non_ac(&self) -> bool {
        matches!(self, Term::NonAc(_))
    }

    /// Returns `true` if this is an identifier atom with the given name.
    #[inline]
    pub fn is_identifier(&self, name: &str) -> bool {
        matches!(self, Term::Atom(Atom { kind: AtomKind::Identifier, text }) if text == name)
    }

    /// Returns a stable kind name: the atom kind, `"list"` or `"term"`.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Term::Atom(atom) => atom.kind.name(),
            Term::List(_) => "list",
            Term::NonAc(_) => "term",
        }
    }

    /// Number of direct children.
    pub fn arity(&self) -> usize {
        match self {
            Term::Atom(_) => 0,
            Term::List(items) => items.len(),
            Term::NonAc(t) => t.args.len(),
        }
    }
}

impl From<Atom> for Term {
    fn from(atom: Atom) -> Self {
        Term::Atom(atom)
    }
}

impl From<NonAcTerm> for Term {
    fn from(term: NonAcTerm) -> Self {
        Term::NonAc(term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atom_kinds_and_names() {
        assert_eq!(Term::string("a").kind_name(), "string");
        assert_eq!(Term::number("-1.5").kind_name(), "number");
        assert_eq!(Term::identifier("Pi").kind_name(), "identifier");
        assert_eq!(Term::list([]).kind_name(), "list");
        assert_eq!(Term::non_ac("f", []).kind_name(), "term");
    }

    #[test]
    fn equality_is_structural_and_kind_sensitive() {
        let a = Term::non_ac("f", [Term::string("x"), Term::number("1")]);
        let b = Term::non_ac("f", [Term::string("x"), Term::number("1")]);
        assert_eq!(a, b);

        // same text, different atom kind
        assert_ne!(Term::string("x"), Term::identifier("x"));

        // argument order matters
        let c = Term::non_ac("f", [Term::number("1"), Term::string("x")]);
        assert_ne!(a, c);

        // member metadata participates in equality
        let d = Term::non_ac_with_members("f", ["A", "B"], [Term::string("x"), Term::number("1")])
            .unwrap();
        assert_ne!(a, d);
    }

    #[test]
    fn member_list_must_match_arguments() {
        let err = Term::non_ac_with_members("Person", ["Name", "Born"], [Term::string("Plato")])
            .unwrap_err();
        assert_eq!(
            err,
            TermError::MemberArity {
                name: "Person".into(),
                members: 2,
                args: 1
            }
        );
    }

    #[test]
    fn predicates_and_arity() {
        let t = Term::non_ac("pair", [Term::number("1"), Term::number("2")]);
        assert!(t.is_non_ac());
        assert!(!t.is_list());
        assert_eq!(t.arity(), 2);

        let l = Term::list([Term::string("a")]);
        assert!(l.is_list());
        assert_eq!(l.arity(), 1);

        assert!(Term::identifier("null").is_identifier("null"));
        assert!(!Term::string("null").is_identifier("null"));
        assert_eq!(Term::identifier("x").arity(), 0);
    }
}
