//! # TRL Terms
//!
//! The term model behind the TRL object codec: leaf atoms, ordered lists and
//! named terms, kept in an arena where any number of statements may share a
//! subterm.
//!
//! A TRL document is a sequence of statements:
//!
//! ```text
//! root: (p1, p2);
//! p1 => Person<Name, Born, Location>("Socrates", -470, athens);
//! p2 => Person<Name, Born, Location>("Plato", -423, athens);
//! athens => Location<City, Country>("Athens", "Greece");
//! ```
//!
//! `label: term;` names a result, `label => term;` defines a rewrite rule
//! that replaces every identifier spelled `label`. The owned tree types
//! ([`Term`], [`Statement`], [`Document`]) are what parsers produce and
//! renderers print. The [`TermStore`] holds the same shapes as nodes
//! addressed by [`Symbol`] handles and offers:
//!
//! - a write API used by translators and by the document loader,
//! - [`TermStore::execute_rewrite_rules`], which resolves rule references,
//! - [`TermStore::mutate`] with [`ExtractCommonTerms`], which does the
//!   reverse and factors repeated subterms out into rules,
//! - a read API that materializes owned statements again.
//!
//! ## Example
//! ```rust
//! # use trl_terms::{Statement, Term, TermStore, ExtractCommonTerms};
//! let athens = Term::non_ac("Location", [Term::string("Athens")]);
//! let root = Term::list([athens.clone(), athens]);
//!
//! let mut store = TermStore::new();
//! store.store_statements([Statement::labeled("root", root.clone())]).unwrap();
//!
//! store.mutate(&ExtractCommonTerms::new()).unwrap();
//! assert_eq!(store.stats().rules, 1);
//!
//! let stats = store.execute_rewrite_rules(100).unwrap();
//! assert!(stats.stabilized);
//! assert_eq!(store.read_statements_for_label("root").unwrap()[0].term, root);
//! ```
//!
//! ## License
//!
//! Released under the terms of the GNU Lesser General Public License, version 3.0 or
//! (at your option) any later version (LGPL-3.0-or-later).

mod display;
mod document;
mod error;
mod mutation;
mod rewrite;
mod store;
mod term;
mod view;

pub use display::{DocumentDisplay, is_bare_name};
pub use document::{Document, Statement, StatementKind};
pub use error::TermError;
pub use mutation::{ExtractCommonTerms, Mutation};
pub use rewrite::{DEFAULT_MAX_REWRITE_ITERATIONS, RewriteStats};
pub use store::{MAX_TERM_DEPTH, StoreID, StoreStats, Symbol, TermStore};
pub use term::{Atom, AtomKind, NonAcTerm, Term};
pub use view::View;
