//! Defines the [`TermStore`], the arena that owns the term graph of one
//! document.
//!
//! Terms are stored as nodes in a flat vector and referenced by
//! [`Symbol`] handles, so any number of statements and arguments can share
//! one subterm. Nodes are append-only: rewriting never edits a node in
//! place, it appends new nodes that point to existing ones. That keeps the
//! graph acyclic no matter which rules are applied.

use crate::{Atom, AtomKind, Document, Mutation, NonAcTerm, Statement, StatementKind, Term, TermError, View};
use indexmap::IndexMap;
use smartstring::alias::String;

/// Deepest nesting of compound terms that is read back from a store, and
/// accepted by the parser.
pub const MAX_TERM_DEPTH: usize = 512;

/// Randomly generated store identifier carried by every [`Symbol`].
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreID(pub(crate) u32);

/// An opaque, copyable handle to a term stored in a [`TermStore`].
///
/// A symbol is only meaningful for the store that issued it; passing it to
/// another store yields [`TermError::InvalidSymbol`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol {
    pub(crate) store_id: StoreID,
    pub(crate) index: u32,
}

impl Symbol {
    /// Position of the node in its store.
    #[inline]
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

/// Internal node representation. Children are symbols of the same store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Node {
    Atom(Atom),
    List(Vec<Symbol>),
    NonAc {
        name: String,
        args: Vec<Symbol>,
        members: Option<Vec<String>>,
    },
}

/// A statement as kept by the store: the term is referenced by symbol.
#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub(crate) label: Option<String>,
    pub(crate) kind: StatementKind,
    pub(crate) symbol: Symbol,
    pub(crate) root: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub nodes: usize,
    pub statements: usize,
    pub rules: usize,
}

/// The term database of one document.
///
/// A store is created for a single encode or decode call: it is filled
/// either from parsed statements ([`TermStore::store_statements`]) or by a
/// translator through the write API, rewritten in place by
/// [`TermStore::execute_rewrite_rules`] or [`TermStore::mutate`], read
/// back as a [`Document`] and dropped.
///
/// ### Labels and roots
/// Every label names exactly one statement; binding a label twice is an
/// error. At most one statement is marked as root. Reading an unknown label
/// is not an error and yields no statements.
///
/// ```
/// # use trl_terms::{AtomKind, TermStore};
/// let mut store = TermStore::new();
/// let city = store.store_atom("Athens", AtomKind::String).unwrap();
/// let country = store.store_atom("Greece", AtomKind::String).unwrap();
/// let loc = store
///     .store_non_ac_term("Location", [city, country], Some(vec!["City".into(), "Country".into()]))
///     .unwrap();
/// store.label_term(loc, "root").unwrap();
/// store.set_root_term(loc).unwrap();
///
/// let doc = store.read_current_frame().unwrap();
/// assert_eq!(doc.to_string(), r#"root: Location<City, Country>("Athens", "Greece");"#);
/// ```
#[derive(Debug, Clone)]
pub struct TermStore {
    pub(crate) store_id: StoreID,
    pub(crate) nodes: Vec<Node>,
    pub(crate) entries: Vec<Entry>,
    pub(crate) labels: IndexMap<String, usize>,
    pub(crate) root: Option<usize>,
}

impl Default for TermStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TermStore {
    /// Create a new, empty store with the given node capacity.
    pub fn with_capacity(nodes_capacity: usize) -> Self {
        Self {
            store_id: StoreID(rand::random()),
            nodes: Vec::with_capacity(nodes_capacity),
            entries: Vec::new(),
            labels: IndexMap::new(),
            root: None,
        }
    }

    /// Create a new, empty store with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Returns stats.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            nodes: self.nodes.len(),
            statements: self.entries.len(),
            rules: self
                .entries
                .iter()
                .filter(|e| e.kind == StatementKind::Rewrite)
                .count(),
        }
    }

    /// Returns an error if the symbol was issued by another store or points
    /// past the end of this one.
    #[inline]
    fn verify(&self, symbol: Symbol) -> Result<usize, TermError> {
        if symbol.store_id != self.store_id || symbol.index() >= self.nodes.len() {
            return Err(TermError::InvalidSymbol(symbol));
        }
        Ok(symbol.index())
    }

    #[inline]
    pub(crate) fn node(&self, symbol: Symbol) -> Result<&Node, TermError> {
        let index = self.verify(symbol)?;
        Ok(&self.nodes[index])
    }

    #[inline]
    pub(crate) fn push(&mut self, node: Node) -> Result<Symbol, TermError> {
        let index = next_index(self.nodes.len())?;
        self.nodes.push(node);
        Ok(Symbol {
            store_id: self.store_id,
            index,
        })
    }

    /// Store a leaf term.
    #[inline]
    pub fn store_atom(&mut self, text: impl AsRef<str>, kind: AtomKind) -> Result<Symbol, TermError> {
        self.push(Node::Atom(Atom::new(kind, text)))
    }

    /// Store an ordered list of already stored terms.
    pub fn store_term_list(
        &mut self,
        refs: impl IntoIterator<Item = Symbol>,
    ) -> Result<Symbol, TermError> {
        let items: Vec<Symbol> = refs.into_iter().collect();
        for &item in &items {
            self.verify(item)?;
        }
        self.push(Node::List(items))
    }

    /// Store a named term. `members`, when given, must have one entry per
    /// argument.
    pub fn store_non_ac_term(
        &mut self,
        name: impl AsRef<str>,
        args: impl IntoIterator<Item = Symbol>,
        members: Option<Vec<String>>,
    ) -> Result<Symbol, TermError> {
        let name: String = name.as_ref().into();
        let args: Vec<Symbol> = args.into_iter().collect();
        for &arg in &args {
            self.verify(arg)?;
        }
        if let Some(members) = &members {
            if members.len() != args.len() {
                return Err(TermError::MemberArity {
                    name,
                    members: members.len(),
                    args: args.len(),
                });
            }
        }
        self.push(Node::NonAc {
            name,
            args,
            members,
        })
    }

    /// Store an owned term tree, children first.
    pub fn store_term(&mut self, term: &Term) -> Result<Symbol, TermError> {
        match term {
            Term::Atom(atom) => self.push(Node::Atom(atom.clone())),
            Term::List(items) => {
                let items = items
                    .iter()
                    .map(|t| self.store_term(t))
                    .collect::<Result<_, _>>()?;
                self.push(Node::List(items))
            }
            Term::NonAc(t) => {
                let args = t
                    .args
                    .iter()
                    .map(|a| self.store_term(a))
                    .collect::<Result<_, _>>()?;
                self.push(Node::NonAc {
                    name: t.name.clone(),
                    args,
                    members: t.members.clone(),
                })
            }
        }
    }

    fn add_entry(
        &mut self,
        label: Option<String>,
        kind: StatementKind,
        symbol: Symbol,
    ) -> Result<usize, TermError> {
        self.verify(symbol)?;
        if kind == StatementKind::Rewrite && label.is_none() {
            return Err(TermError::UnlabeledRewrite);
        }
        let index = self.entries.len();
        if let Some(label) = &label {
            if self.labels.contains_key(label) {
                return Err(TermError::DuplicateLabel(label.clone()));
            }
            self.labels.insert(label.clone(), index);
        }
        self.entries.push(Entry {
            label,
            kind,
            symbol,
            root: false,
        });
        Ok(index)
    }

    /// Bind `label` to the term: `label: term;`.
    pub fn label_term(&mut self, symbol: Symbol, label: impl AsRef<str>) -> Result<(), TermError> {
        self.add_entry(Some(label.as_ref().into()), StatementKind::Term, symbol)
            .map(|_| ())
    }

    /// Define a rewrite rule: `label => term;`.
    pub fn define_rule(&mut self, label: impl AsRef<str>, symbol: Symbol) -> Result<(), TermError> {
        self.add_entry(Some(label.as_ref().into()), StatementKind::Rewrite, symbol)
            .map(|_| ())
    }

    /// Mark the first statement bound to `symbol` as the document root.
    pub fn set_root_term(&mut self, symbol: Symbol) -> Result<(), TermError> {
        self.verify(symbol)?;
        let Some(index) = self.entries.iter().position(|e| e.symbol == symbol) else {
            return Err(TermError::UnlabeledRoot(symbol));
        };
        self.set_root_entry(index, symbol)
    }

    fn set_root_entry(&mut self, index: usize, requested: Symbol) -> Result<(), TermError> {
        if let Some(existing) = self.root {
            let existing = self.entries[existing].label.clone().unwrap_or_default();
            return Err(TermError::MultipleRoots {
                existing,
                requested,
            });
        }
        self.entries[index].root = true;
        self.root = Some(index);
        Ok(())
    }

    /// Bulk-load statements produced by the parser, in order.
    pub fn store_statements(
        &mut self,
        statements: impl IntoIterator<Item = Statement>,
    ) -> Result<(), TermError> {
        for statement in statements {
            let symbol = self.store_term(&statement.term)?;
            let index = self.add_entry(statement.label, statement.kind, symbol)?;
            if statement.root {
                self.set_root_entry(index, symbol)?;
            }
        }
        log::trace!("stored statements: {:?}", self.stats());
        Ok(())
    }

    /// Materialize the owned tree rooted at `symbol`.
    ///
    /// # Errors
    /// Returns [`TermError::TooDeep`] if compound terms nest more than
    /// [`MAX_TERM_DEPTH`] levels.
    pub fn term(&self, symbol: Symbol) -> Result<Term, TermError> {
        // finished subterms, in order; a compound takes its children off the end
        let mut done: Vec<Term> = Vec::new();
        let mut stack = vec![(symbol, 0, false)];
        while let Some((symbol, depth, expanded)) = stack.pop() {
            let view = self.view(symbol)?;
            if let View::Atom(kind, text) = view {
                done.push(Term::Atom(Atom::new(kind, text)));
                continue;
            }
            let children = view.children();
            if !expanded {
                if depth >= MAX_TERM_DEPTH {
                    return Err(TermError::TooDeep { max: MAX_TERM_DEPTH });
                }
                stack.push((symbol, depth, true));
                stack.extend(children.iter().rev().map(|&c| (c, depth + 1, false)));
                continue;
            }
            let items = done.split_off(done.len() - children.len());
            done.push(match view {
                View::NonAc(name, _, members) => Term::NonAc(NonAcTerm {
                    name: name.into(),
                    args: items,
                    members: members.map(|m| m.to_vec()),
                }),
                _ => Term::List(items),
            });
        }
        done.pop().ok_or(TermError::InvalidSymbol(symbol))
    }

    fn statement(&self, entry: &Entry) -> Result<Statement, TermError> {
        Ok(Statement {
            label: entry.label.clone(),
            kind: entry.kind,
            term: self.term(entry.symbol)?,
            root: entry.root,
        })
    }

    /// All statements, in storage order.
    pub fn read_current_frame(&self) -> Result<Document, TermError> {
        self.entries.iter().map(|e| self.statement(e)).collect()
    }

    /// Statements bound to `label`. Unknown labels yield an empty vector.
    pub fn read_statements_for_label(&self, label: &str) -> Result<Vec<Statement>, TermError> {
        self.entries
            .iter()
            .filter(|e| e.label.as_deref() == Some(label))
            .map(|e| self.statement(e))
            .collect()
    }

    /// The statement marked as root, if any.
    pub fn read_root(&self) -> Result<Option<Statement>, TermError> {
        self.root
            .map(|index| self.statement(&self.entries[index]))
            .transpose()
    }

    /// Symbol currently bound to `label`.
    pub fn symbol_for_label(&self, label: &str) -> Option<Symbol> {
        self.labels.get(label).map(|&i| self.entries[i].symbol)
    }

    /// Apply a structural mutation to the whole graph, in place.
    pub fn mutate(&mut self, mutation: &dyn Mutation) -> Result<(), TermError> {
        log::debug!("applying mutation '{}' to {:?}", mutation.name(), self.stats());
        mutation.apply(self)?;
        log::debug!("mutation '{}' done: {:?}", mutation.name(), self.stats());
        Ok(())
    }
}

/// Index of the next node, if the store still has room for it.
fn next_index(nodes: usize) -> Result<u32, TermError> {
    u32::try_from(nodes).map_err(|_| TermError::StoreFull { nodes })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(store: &mut TermStore, name: &str, born: &str, location: Symbol) -> Symbol {
        let n = store.store_atom(name, AtomKind::String).unwrap();
        let b = store.store_atom(born, AtomKind::Number).unwrap();
        store
            .store_non_ac_term(
                "Person",
                [n, b, location],
                Some(vec!["Name".into(), "Born".into(), "Location".into()]),
            )
            .unwrap()
    }

    #[test]
    fn store_and_materialize() {
        let mut store = TermStore::new();
        let athens = store.store_atom("athens", AtomKind::Identifier).unwrap();
        let p = person(&mut store, "Plato", "-423", athens);
        assert_eq!(
            store.term(p).unwrap(),
            Term::non_ac_with_members(
                "Person",
                ["Name", "Born", "Location"],
                [
                    Term::string("Plato"),
                    Term::number("-423"),
                    Term::identifier("athens")
                ]
            )
            .unwrap()
        );
        assert_eq!(store.stats().nodes, 4);
    }

    #[test]
    fn shared_symbols_materialize_twice() {
        let mut store = TermStore::new();
        let x = store.store_atom("x", AtomKind::String).unwrap();
        let list = store.store_term_list([x, x]).unwrap();
        assert_eq!(
            store.term(list).unwrap(),
            Term::list([Term::string("x"), Term::string("x")])
        );
    }

    #[test]
    fn duplicate_label_is_rejected() {
        let mut store = TermStore::new();
        let a = store.store_atom("1", AtomKind::Number).unwrap();
        let b = store.store_atom("2", AtomKind::Number).unwrap();
        store.label_term(a, "x").unwrap();
        assert_eq!(
            store.label_term(b, "x"),
            Err(TermError::DuplicateLabel("x".into()))
        );
        assert_eq!(store.define_rule("x", b), Err(TermError::DuplicateLabel("x".into())));
        // the first binding is still in effect
        assert_eq!(store.symbol_for_label("x"), Some(a));
    }

    #[test]
    fn second_root_is_rejected() {
        let mut store = TermStore::new();
        let a = store.store_atom("1", AtomKind::Number).unwrap();
        let b = store.store_atom("2", AtomKind::Number).unwrap();
        store.label_term(a, "a").unwrap();
        store.label_term(b, "b").unwrap();
        store.set_root_term(a).unwrap();
        assert!(matches!(
            store.set_root_term(b),
            Err(TermError::MultipleRoots { .. })
        ));
        let root = store.read_root().unwrap().unwrap();
        assert_eq!(root.label.as_deref(), Some("a"));
    }

    #[test]
    fn root_requires_a_statement() {
        let mut store = TermStore::new();
        let a = store.store_atom("1", AtomKind::Number).unwrap();
        assert_eq!(store.set_root_term(a), Err(TermError::UnlabeledRoot(a)));
    }

    #[test]
    fn unknown_label_reads_empty() {
        let store = TermStore::new();
        assert!(store.read_statements_for_label("missing").unwrap().is_empty());
    }

    #[test]
    fn foreign_symbols_are_rejected() {
        let mut one = TermStore::new();
        let mut two = TermStore::new();
        // make sure the other store has a node at the same index
        two.store_atom("y", AtomKind::String).unwrap();
        let x = one.store_atom("x", AtomKind::String).unwrap();
        if one.store_id != two.store_id {
            assert_eq!(two.store_term_list([x]), Err(TermError::InvalidSymbol(x)));
        }
    }

    #[test]
    fn member_arity_is_checked() {
        let mut store = TermStore::new();
        let a = store.store_atom("1", AtomKind::Number).unwrap();
        assert!(matches!(
            store.store_non_ac_term("f", [a], Some(vec![])),
            Err(TermError::MemberArity { .. })
        ));
    }

    #[test]
    fn store_statements_keeps_order_and_kinds() {
        let mut store = TermStore::new();
        store
            .store_statements([
                Statement::labeled("root", Term::identifier("p")),
                Statement::rewrite("p", Term::number("1")),
                Statement::unlabeled(Term::string("free")),
            ])
            .unwrap();
        let doc = store.read_current_frame().unwrap();
        assert_eq!(doc.len(), 3);
        assert!(doc.statements[1].is_rewrite());
        assert_eq!(doc.statements[2].label, None);
        assert_eq!(store.stats().rules, 1);
    }

    #[test]
    fn unlabeled_rewrite_is_rejected() {
        let mut store = TermStore::new();
        let mut rule = Statement::rewrite("p", Term::number("1"));
        rule.label = None;
        assert_eq!(
            store.store_statements([rule]),
            Err(TermError::UnlabeledRewrite)
        );
    }

    #[test]
    fn materialization_depth_is_bounded() {
        let mut store = TermStore::new();
        let mut top = store.store_atom("x", AtomKind::String).unwrap();
        for _ in 0..MAX_TERM_DEPTH {
            top = store.store_term_list([top]).unwrap();
        }
        let mut term = store.term(top).unwrap();
        for _ in 0..MAX_TERM_DEPTH {
            let Term::List(mut items) = term else {
                panic!("expected a list")
            };
            term = items.remove(0);
        }
        assert_eq!(term, Term::string("x"));

        let deeper = store.store_term_list([top]).unwrap();
        assert_eq!(
            store.term(deeper),
            Err(TermError::TooDeep { max: MAX_TERM_DEPTH })
        );
    }

    #[test]
    fn node_indices_are_checked() {
        assert_eq!(next_index(0), Ok(0));
        assert_eq!(next_index(u32::MAX as usize), Ok(u32::MAX));
        assert_eq!(
            next_index(u32::MAX as usize + 1),
            Err(TermError::StoreFull {
                nodes: u32::MAX as usize + 1
            })
        );
    }
}
