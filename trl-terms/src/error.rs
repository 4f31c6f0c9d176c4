//! Defines [`TermError`], the unified error type for term and store operations.
//!
//! Provides descriptive error variants for foreign or stale symbols,
//! label and root bookkeeping, malformed named terms, and stores that
//! grow too large or too deep.

use crate::Symbol;
use smartstring::alias::String;
use thiserror::Error;

/// Represents all possible errors that can occur while building, storing or
/// reading terms.
///
/// [`TermError`] provides a single error surface for the term model and the
/// [`TermStore`](crate::TermStore). Higher-level crates wrap it with `#[from]`
/// so `?` works at call sites without explicit mapping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TermError {
    #[error("invalid symbol {0:?}")]
    InvalidSymbol(Symbol),

    #[error("label '{0}' is already defined")]
    DuplicateLabel(String),

    #[error("cannot mark {requested:?} as root: '{existing}' is already the root")]
    MultipleRoots { existing: String, requested: Symbol },

    #[error("cannot mark {0:?} as root: it is not bound to any statement")]
    UnlabeledRoot(Symbol),

    #[error("rewrite statement has no label")]
    UnlabeledRewrite,

    #[error("member list of '{name}' has {members} entries for {args} arguments")]
    MemberArity {
        name: String,
        members: usize,
        args: usize,
    },

    #[error("terms nest deeper than {max} levels")]
    TooDeep { max: usize },

    #[error("store is full at {nodes} nodes")]
    StoreFull { nodes: usize },

    #[error("mutation '{name}' failed: {reason}")]
    Mutation { name: String, reason: String },
}
