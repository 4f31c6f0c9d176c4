//! Defines [`View`], a borrowed read-only representation of a stored term.
//!
//! Provides lightweight accessors for walking the term graph of a
//! [`TermStore`] without materializing owned trees.

use crate::store::Node;
use crate::{AtomKind, Symbol, TermError, TermStore};
use smartstring::alias::String;

/// A borrowed view into one node of a [`TermStore`].
///
/// Use [`TermStore::view`] or [`Symbol::view`] to obtain a view. No
/// allocations are performed when constructing a `View`; names and child
/// slices are borrowed from the store. Children are [`Symbol`] handles of
/// the same store and can be viewed in turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View<'a> {
    /// A leaf: its kind and literal text.
    Atom(AtomKind, &'a str),
    /// An ordered list of children.
    List(&'a [Symbol]),
    /// A named term: name, arguments and optional member names.
    NonAc(&'a str, &'a [Symbol], Option<&'a [String]>),
}

impl<'a> View<'a> {
    /// Children of a compound view; empty for atoms.
    #[inline]
    pub fn children(&self) -> &'a [Symbol] {
        match self {
            View::Atom(..) => &[],
            View::List(items) => items,
            View::NonAc(_, args, _) => args,
        }
    }

    /// Returns the text if this is an identifier atom.
    #[inline]
    pub fn identifier(&self) -> Option<&'a str> {
        match self {
            View::Atom(AtomKind::Identifier, text) => Some(text),
            _ => None,
        }
    }
}

impl TermStore {
    /// Produce a [`View`] of the node referenced by `symbol`.
    ///
    /// # Errors
    /// Returns [`TermError::InvalidSymbol`] if the symbol was issued by a
    /// different store.
    #[inline]
    pub fn view(&self, symbol: Symbol) -> Result<View<'_>, TermError> {
        Ok(match self.node(symbol)? {
            Node::Atom(atom) => View::Atom(atom.kind, &atom.text),
            Node::List(items) => View::List(items),
            Node::NonAc {
                name,
                args,
                members,
            } => View::NonAc(name, args, members.as_deref()),
        })
    }
}

impl Symbol {
    /// Produce a [`View`] of this symbol that borrows from `store`.
    #[inline]
    pub fn view<'a>(&self, store: &'a TermStore) -> Result<View<'a>, TermError> {
        store.view(*self)
    }
}
