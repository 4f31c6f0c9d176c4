//! Structural mutations of a whole [`TermStore`].
//!
//! A [`Mutation`] is applied through [`TermStore::mutate`] and may add
//! nodes, rebind statements and append new statements. The only mutation
//! shipped here is [`ExtractCommonTerms`], which turns repeated compound
//! subterms into rewrite rules so a document spells each of them once.

use crate::{AtomKind, Symbol, TermError, TermStore, View};
use smartstring::alias::String;
use std::collections::{HashMap, HashSet};

/// A whole-graph transformation.
pub trait Mutation {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Apply the transformation in place.
    fn apply(&self, store: &mut TermStore) -> Result<(), TermError>;
}

/// Extracts repeated compound subterms into rewrite rules.
///
/// Every structurally distinct compound term with at least one child that
/// occurs two or more times is given a fresh label (`_0`, `_1`, ... with
/// the default prefix). Each of its occurrences is replaced by an
/// identifier atom carrying the label, and a statement `label => term;` is
/// appended. Occurrences inside a shared term count once, however often
/// the shared term itself is used. Atoms and empty compounds are never
/// extracted.
///
/// Labels are assigned in document order. Fresh labels skip any name that
/// is already a label or an identifier in the store, so applying the
/// rewrite rules afterwards yields the original terms again.
///
/// ```
/// # use trl_terms::{ExtractCommonTerms, Statement, Term, TermStore};
/// let loc = Term::non_ac("Location", [Term::string("Athens")]);
/// let mut store = TermStore::new();
/// store
///     .store_statements([Statement::labeled("root", Term::list([loc.clone(), loc]))])
///     .unwrap();
/// store.mutate(&ExtractCommonTerms::new()).unwrap();
/// assert_eq!(
///     store.read_current_frame().unwrap().to_string(),
///     r#"root: (_0, _0); _0 => Location("Athens");"#
/// );
/// ```
#[derive(Debug, Clone)]
pub struct ExtractCommonTerms {
    prefix: String,
}

impl Default for ExtractCommonTerms {
    fn default() -> Self {
        Self { prefix: "_".into() }
    }
}

impl ExtractCommonTerms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `prefix` instead of `_` for generated labels.
    pub fn with_prefix(prefix: impl AsRef<str>) -> Self {
        Self {
            prefix: prefix.as_ref().into(),
        }
    }
}

type ClassID = usize;

/// Structural identity of a node, with children replaced by their classes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ClassKey {
    Atom(AtomKind, String),
    List(Vec<ClassID>),
    NonAc(String, Vec<ClassID>, Option<Vec<String>>),
}

#[derive(Debug)]
struct Class {
    representative: Symbol,
    children: Vec<ClassID>,
    height: usize,
}

impl Class {
    fn shareable(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Hash-consing of the reachable graph.
#[derive(Debug, Default)]
struct Classes {
    by_key: HashMap<ClassKey, ClassID>,
    by_symbol: HashMap<Symbol, ClassID>,
    classes: Vec<Class>,
}

impl Classes {
    fn classify(&mut self, store: &TermStore, symbol: Symbol) -> Result<ClassID, TermError> {
        if let Some(&class) = self.by_symbol.get(&symbol) {
            return Ok(class);
        }
        let key = match store.view(symbol)? {
            View::Atom(kind, text) => ClassKey::Atom(kind, text.into()),
            View::List(items) => ClassKey::List(self.classify_all(store, items)?),
            View::NonAc(name, args, members) => ClassKey::NonAc(
                name.into(),
                self.classify_all(store, args)?,
                members.map(|m| m.to_vec()),
            ),
        };
        let class = match self.by_key.get(&key) {
            Some(&class) => class,
            None => {
                let children = match &key {
                    ClassKey::Atom(..) => Vec::new(),
                    ClassKey::List(children) | ClassKey::NonAc(_, children, _) => children.clone(),
                };
                let height = children
                    .iter()
                    .map(|&c| self.classes[c].height + 1)
                    .max()
                    .unwrap_or(0);
                let class = self.classes.len();
                self.classes.push(Class {
                    representative: symbol,
                    children,
                    height,
                });
                self.by_key.insert(key, class);
                class
            }
        };
        self.by_symbol.insert(symbol, class);
        Ok(class)
    }

    fn classify_all(&mut self, store: &TermStore, symbols: &[Symbol]) -> Result<Vec<ClassID>, TermError> {
        symbols.iter().map(|&s| self.classify(store, s)).collect()
    }
}

/// Produces fresh labels that collide with nothing already in the store.
struct FreshLabels<'a> {
    prefix: &'a str,
    next: usize,
    taken: HashSet<String>,
}

impl FreshLabels<'_> {
    fn next_label(&mut self) -> String {
        loop {
            let mut label = String::from(self.prefix);
            label.push_str(&self.next.to_string());
            self.next += 1;
            if !self.taken.contains(&label) {
                self.taken.insert(label.clone());
                return label;
            }
        }
    }
}

struct Extraction<'a> {
    classes: &'a Classes,
    shared: Vec<bool>,
    labels: Vec<Option<String>>,
    references: HashMap<ClassID, Symbol>,
}

impl Extraction<'_> {
    /// Labels shared classes in preorder.
    fn assign(&mut self, class: ClassID, fresh: &mut FreshLabels, order: &mut Vec<ClassID>) {
        if self.shared[class] {
            if self.labels[class].is_some() {
                return;
            }
            self.labels[class] = Some(fresh.next_label());
            order.push(class);
        }
        for &child in &self.classes.classes[class].children {
            self.assign(child, fresh, order);
        }
    }

    /// Rebuilds a class with shared children replaced by references. With
    /// `definition` set, the class itself is rebuilt even when shared.
    fn build(&mut self, store: &mut TermStore, class: ClassID, definition: bool) -> Result<Symbol, TermError> {
        if self.shared[class] && !definition {
            if let Some(&reference) = self.references.get(&class) {
                return Ok(reference);
            }
            let label = self.labels[class].clone().unwrap_or_default();
            let reference = store.store_atom(label, AtomKind::Identifier)?;
            self.references.insert(class, reference);
            return Ok(reference);
        }
        let representative = self.classes.classes[class].representative;
        let children = self.classes.classes[class].children.clone();
        let mut rebuilt = Vec::with_capacity(children.len());
        for child in children {
            rebuilt.push(self.build(store, child, false)?);
        }
        let (name, members) = match store.view(representative)? {
            View::Atom(..) => return Ok(representative),
            View::List(items) => {
                if items == rebuilt.as_slice() {
                    return Ok(representative);
                }
                return store.store_term_list(rebuilt);
            }
            View::NonAc(name, args, members) => {
                if args == rebuilt.as_slice() {
                    return Ok(representative);
                }
                (String::from(name), members.map(|m| m.to_vec()))
            }
        };
        store.store_non_ac_term(name, rebuilt, members)
    }
}

impl Mutation for ExtractCommonTerms {
    fn name(&self) -> &str {
        "ExtractCommonTerms"
    }

    fn apply(&self, store: &mut TermStore) -> Result<(), TermError> {
        let mut classes = Classes::default();
        let symbols: Vec<Symbol> = store.entries.iter().map(|e| e.symbol).collect();
        let roots = classes.classify_all(store, &symbols)?;

        // Effective occurrence counts, parents before children. A shared
        // class contributes its children once, through its definition.
        let n = classes.classes.len();
        let mut occurrences = vec![0usize; n];
        for &root in &roots {
            occurrences[root] += 1;
        }
        let mut order: Vec<ClassID> = (0..n).collect();
        order.sort_by(|&a, &b| {
            classes.classes[b]
                .height
                .cmp(&classes.classes[a].height)
                .then(a.cmp(&b))
        });
        let mut shared = vec![false; n];
        for &class in &order {
            let c = &classes.classes[class];
            shared[class] = c.shareable() && occurrences[class] >= 2;
            let weight = if shared[class] { 1 } else { occurrences[class] };
            for &child in &c.children {
                occurrences[child] += weight;
            }
        }
        if !shared.iter().any(|&s| s) {
            log::trace!("no common terms in {} classes", n);
            return Ok(());
        }

        let mut taken: HashSet<String> = store.labels.keys().cloned().collect();
        for node in classes.classes.iter() {
            if let View::Atom(AtomKind::Identifier, text) = store.view(node.representative)? {
                taken.insert(text.into());
            }
        }
        let mut fresh = FreshLabels {
            prefix: &self.prefix,
            next: 0,
            taken,
        };
        let mut extraction = Extraction {
            classes: &classes,
            shared,
            labels: vec![None; n],
            references: HashMap::new(),
        };
        let mut labeled = Vec::new();
        for &root in &roots {
            extraction.assign(root, &mut fresh, &mut labeled);
        }

        for (i, &root) in roots.iter().enumerate() {
            let symbol = extraction.build(store, root, false)?;
            store.entries[i].symbol = symbol;
        }
        for class in labeled {
            let symbol = extraction.build(store, class, true)?;
            let label = extraction.labels[class].clone().unwrap_or_default();
            log::trace!("extracted common term '{}'", label);
            store.define_rule(label, symbol)?;
        }
        Ok(())
    }
}
