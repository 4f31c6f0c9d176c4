//! The rewrite engine.
//!
//! A rewrite statement `label => term;` makes every identifier atom spelled
//! `label` stand for `term`. [`TermStore::execute_rewrite_rules`] applies
//! all rules to all statements in passes until a pass changes nothing or
//! the iteration cap is reached.
//!
//! Rewriting is path copying: a compound node is rebuilt only when one of
//! its children changed, so untouched subgraphs stay shared. One rewrite
//! substitutes the rule's term as it was at the start of the pass and does
//! not look inside it again during that pass. Nested references are
//! resolved by the following passes.
//!
//! Rules that reach themselves through other rules, such as `a => f(a);`
//! or `a => g(b); b => h(a);`, can never be resolved. They are detected
//! before the first pass and their identifiers are left in place, so the
//! graph stops changing and [`RewriteStats::stabilized`] is `false`.

use crate::store::Node;
use crate::{Atom, AtomKind, StatementKind, Symbol, TermError, TermStore};
use indexmap::{IndexMap, IndexSet};
use smartstring::alias::String;
use std::collections::{HashMap, HashSet};

/// Iteration cap used when the caller does not pick one.
pub const DEFAULT_MAX_REWRITE_ITERATIONS: usize = 100_000;

/// Outcome of [`TermStore::execute_rewrite_rules`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewriteStats {
    /// Number of passes that changed at least one statement.
    pub iterations: usize,
    /// `false` if the cap was reached while statements were still changing,
    /// or if cyclic rules were left unexpanded.
    pub stabilized: bool,
}

impl TermStore {
    /// Apply all rewrite rules until the graph is stable or
    /// `max_iterations` changing passes have run.
    ///
    /// Neither the cap nor a cyclic rule is an error: the store keeps the
    /// state of the last pass and a warning is logged.
    ///
    /// # Errors
    /// Returns [`TermError::StoreFull`] if a rewritten node no longer fits
    /// the store.
    pub fn execute_rewrite_rules(&mut self, max_iterations: usize) -> Result<RewriteStats, TermError> {
        let cyclic = self.cyclic_rules();
        if !cyclic.is_empty() {
            log::warn!("cyclic rules are left unexpanded: {:?}", cyclic);
        }
        let mut settled = max_iterations == 0 && self.rules(&cyclic).is_empty();
        let mut iterations = 0;
        while iterations < max_iterations {
            let changed = self.rewrite_pass(&cyclic)?;
            log::trace!("rewrite pass {}: {} statements changed", iterations + 1, changed);
            if changed == 0 {
                log::debug!("rewrite stabilized after {} passes", iterations);
                settled = true;
                break;
            }
            iterations += 1;
        }
        if !settled {
            log::warn!(
                "rewrite stopped at the cap of {} iterations before stabilizing",
                max_iterations
            );
        }
        Ok(RewriteStats {
            iterations,
            stabilized: settled && cyclic.is_empty(),
        })
    }

    /// Snapshot of rule label to current rule term, without the `skip`ped
    /// labels.
    fn rules(&self, skip: &IndexSet<String>) -> IndexMap<String, Symbol> {
        self.entries
            .iter()
            .filter(|e| e.kind == StatementKind::Rewrite)
            .filter_map(|e| e.label.clone().map(|l| (l, e.symbol)))
            .filter(|(l, _)| !skip.contains(l))
            .collect()
    }

    /// Labels of the rules that reach themselves through rule references,
    /// in document order.
    fn cyclic_rules(&self) -> IndexSet<String> {
        let rules = self.rules(&IndexSet::new());
        let references: Vec<Vec<usize>> = rules
            .values()
            .map(|&body| self.rule_references(body, &rules))
            .collect();
        let mut cyclic = IndexSet::new();
        for (start, label) in rules.keys().enumerate() {
            let mut seen = vec![false; rules.len()];
            let mut stack = references[start].clone();
            while let Some(rule) = stack.pop() {
                if rule == start {
                    cyclic.insert(label.clone());
                    break;
                }
                if !std::mem::replace(&mut seen[rule], true) {
                    stack.extend(&references[rule]);
                }
            }
        }
        cyclic
    }

    /// Positions in `rules` of the rules named below `symbol`.
    fn rule_references(&self, symbol: Symbol, rules: &IndexMap<String, Symbol>) -> Vec<usize> {
        let mut found = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![symbol];
        while let Some(symbol) = stack.pop() {
            if !seen.insert(symbol) {
                continue;
            }
            match &self.nodes[symbol.index()] {
                Node::Atom(Atom {
                    kind: AtomKind::Identifier,
                    text,
                }) => found.extend(rules.get_index_of(text)),
                Node::Atom(_) => {}
                Node::List(items) | Node::NonAc { args: items, .. } => stack.extend(items),
            }
        }
        found
    }

    /// Runs one pass over all statements and returns how many changed.
    fn rewrite_pass(&mut self, cyclic: &IndexSet<String>) -> Result<usize, TermError> {
        let rules = self.rules(cyclic);
        if rules.is_empty() {
            return Ok(0);
        }
        let mut memo = HashMap::new();
        let mut changed = 0;
        for i in 0..self.entries.len() {
            let old = self.entries[i].symbol;
            let new = self.rewrite_symbol(old, &rules, &mut memo)?;
            if new != old {
                self.entries[i].symbol = new;
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Rewrites the graph below `root` children first, with an explicit
    /// stack. `memo` maps every visited symbol to its rewritten form.
    fn rewrite_symbol(
        &mut self,
        root: Symbol,
        rules: &IndexMap<String, Symbol>,
        memo: &mut HashMap<Symbol, Symbol>,
    ) -> Result<Symbol, TermError> {
        let mut stack = vec![(root, false)];
        while let Some((symbol, expanded)) = stack.pop() {
            if memo.contains_key(&symbol) {
                continue;
            }
            let node = match &self.nodes[symbol.index()] {
                Node::Atom(Atom {
                    kind: AtomKind::Identifier,
                    text,
                }) => {
                    memo.insert(symbol, rules.get(text).copied().unwrap_or(symbol));
                    continue;
                }
                Node::Atom(_) => {
                    memo.insert(symbol, symbol);
                    continue;
                }
                node => node.clone(),
            };
            let children = match &node {
                Node::List(items) | Node::NonAc { args: items, .. } => items,
                Node::Atom(_) => continue,
            };
            if !expanded {
                stack.push((symbol, true));
                stack.extend(
                    children
                        .iter()
                        .filter(|c| !memo.contains_key(*c))
                        .map(|&c| (c, false)),
                );
                continue;
            }
            let rewritten: Vec<Symbol> = children
                .iter()
                .map(|c| memo.get(c).copied().unwrap_or(*c))
                .collect();
            let rebuilt = if rewritten == *children {
                symbol
            } else {
                self.push(match node {
                    Node::NonAc { name, members, .. } => Node::NonAc {
                        name,
                        args: rewritten,
                        members,
                    },
                    _ => Node::List(rewritten),
                })?
            };
            memo.insert(symbol, rebuilt);
        }
        Ok(memo.get(&root).copied().unwrap_or(root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Statement, Term, MAX_TERM_DEPTH};
    use proptest::prelude::*;

    fn load(statements: Vec<Statement>) -> TermStore {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut store = TermStore::new();
        store.store_statements(statements).unwrap();
        store
    }

    fn root_term(store: &TermStore) -> Term {
        store.read_statements_for_label("root").unwrap()[0].term.clone()
    }

    #[test]
    fn substitutes_nested_references() {
        let mut store = load(vec![
            Statement::labeled(
                "root",
                Term::list([Term::identifier("p1"), Term::identifier("p2")]),
            ),
            Statement::rewrite("p1", Term::non_ac("P", [Term::identifier("athens")])),
            Statement::rewrite("p2", Term::non_ac("P", [Term::identifier("athens")])),
            Statement::rewrite("athens", Term::string("Athens")),
        ]);
        let stats = store.execute_rewrite_rules(DEFAULT_MAX_REWRITE_ITERATIONS).unwrap();
        assert!(stats.stabilized);
        assert_eq!(stats.iterations, 2);
        let p = Term::non_ac("P", [Term::string("Athens")]);
        assert_eq!(root_term(&store), Term::list([p.clone(), p]));
    }

    #[test]
    fn unknown_identifiers_stay() {
        let mut store = load(vec![Statement::labeled("root", Term::identifier("Pi"))]);
        let stats = store.execute_rewrite_rules(10).unwrap();
        assert_eq!(
            stats,
            RewriteStats {
                iterations: 0,
                stabilized: true
            }
        );
        assert_eq!(root_term(&store), Term::identifier("Pi"));
    }

    #[test]
    fn rewriting_is_idempotent() {
        let mut store = load(vec![
            Statement::labeled("root", Term::identifier("x")),
            Statement::rewrite("x", Term::list([Term::identifier("y")])),
            Statement::rewrite("y", Term::number("1")),
        ]);
        assert!(store.execute_rewrite_rules(100).unwrap().stabilized);
        let once = store.read_current_frame().unwrap();
        let nodes = store.stats().nodes;
        let again = store.execute_rewrite_rules(100).unwrap();
        assert_eq!(again.iterations, 0);
        assert_eq!(store.read_current_frame().unwrap(), once);
        assert_eq!(store.stats().nodes, nodes);
    }

    #[test]
    fn self_alias_is_left_in_place() {
        let mut store = load(vec![
            Statement::labeled("root", Term::identifier("a")),
            Statement::rewrite("a", Term::identifier("a")),
        ]);
        let stats = store.execute_rewrite_rules(10).unwrap();
        assert!(!stats.stabilized);
        assert_eq!(root_term(&store), Term::identifier("a"));
    }

    #[test]
    fn growing_rule_does_not_grow() {
        let mut store = load(vec![
            Statement::labeled("root", Term::identifier("a")),
            Statement::rewrite("a", Term::non_ac("f", [Term::identifier("a")])),
        ]);
        let nodes = store.stats().nodes;
        let stats = store.execute_rewrite_rules(DEFAULT_MAX_REWRITE_ITERATIONS).unwrap();
        assert_eq!(
            stats,
            RewriteStats {
                iterations: 0,
                stabilized: false
            }
        );
        assert_eq!(store.stats().nodes, nodes);
        // the store is still readable
        assert_eq!(root_term(&store), Term::identifier("a"));
        let rule = store.read_statements_for_label("a").unwrap();
        assert_eq!(rule[0].term, Term::non_ac("f", [Term::identifier("a")]));
    }

    #[test]
    fn mutual_cycle_keeps_other_rules_working() {
        let mut store = load(vec![
            Statement::labeled(
                "root",
                Term::list([Term::identifier("a"), Term::identifier("n")]),
            ),
            Statement::rewrite("a", Term::non_ac("f", [Term::identifier("b"), Term::identifier("n")])),
            Statement::rewrite("b", Term::non_ac("g", [Term::identifier("a")])),
            Statement::rewrite("n", Term::number("1")),
        ]);
        let stats = store.execute_rewrite_rules(1000).unwrap();
        assert!(!stats.stabilized);
        assert!(stats.iterations < 1000);
        assert_eq!(
            root_term(&store),
            Term::list([Term::identifier("a"), Term::number("1")])
        );
        let a = store.read_statements_for_label("a").unwrap();
        assert_eq!(
            a[0].term,
            Term::non_ac("f", [Term::identifier("b"), Term::number("1")])
        );
    }

    #[test]
    fn cap_without_cycles_reports_unstable() {
        let mut store = load(vec![
            Statement::labeled("root", Term::identifier("x")),
            Statement::rewrite("x", Term::list([Term::identifier("y")])),
            Statement::rewrite("y", Term::list([Term::identifier("z")])),
            Statement::rewrite("z", Term::number("1")),
        ]);
        let stats = store.execute_rewrite_rules(1).unwrap();
        assert_eq!(
            stats,
            RewriteStats {
                iterations: 1,
                stabilized: false
            }
        );
        assert_eq!(root_term(&store), Term::list([Term::identifier("y")]));
    }

    #[test]
    fn long_rule_chains_stay_off_the_call_stack() {
        let depth = MAX_TERM_DEPTH + 1;
        let mut statements = vec![Statement::labeled("root", Term::identifier("r0"))];
        for i in 0..depth {
            let next = if i + 1 == depth {
                Term::string("end")
            } else {
                Term::identifier(format!("r{}", i + 1))
            };
            statements.push(Statement::rewrite(format!("r{i}"), Term::list([next])));
        }
        let mut store = load(statements);
        let stats = store.execute_rewrite_rules(DEFAULT_MAX_REWRITE_ITERATIONS).unwrap();
        assert!(stats.stabilized);
        // fully expanded, root nests one list per rule
        assert_eq!(
            store.read_statements_for_label("root"),
            Err(TermError::TooDeep { max: MAX_TERM_DEPTH })
        );
        let last = store.read_statements_for_label(&format!("r{}", depth - 1)).unwrap();
        assert_eq!(last[0].term, Term::list([Term::string("end")]));
    }

    #[test]
    fn untouched_subgraphs_are_shared() {
        let mut store = load(vec![
            Statement::labeled(
                "root",
                Term::non_ac("f", [Term::string("big"), Term::identifier("x")]),
            ),
            Statement::rewrite("x", Term::string("small")),
        ]);
        let before = store.stats().nodes;
        // root is rebuilt, its first argument and the rule term are reused
        store.execute_rewrite_rules(1).unwrap();
        assert_eq!(store.stats().nodes, before + 1);
    }

    fn arb_term() -> impl Strategy<Value = Term> {
        let leaf = prop_oneof![
            "[a-z]{0,4}".prop_map(Term::string),
            "-?[0-9]{1,3}".prop_map(Term::number),
            prop::sample::select(vec!["a", "b", "c", "free"]).prop_map(Term::identifier),
        ];
        leaf.prop_recursive(3, 24, 3, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..3).prop_map(Term::list),
                ("[fgh]", prop::collection::vec(inner, 0..3))
                    .prop_map(|(name, args)| Term::non_ac(name, args)),
            ]
        })
    }

    fn mentions_rule(term: &Term) -> bool {
        match term {
            Term::Atom(_) => ["a", "b", "c"].iter().any(|l| term.is_identifier(l)),
            Term::List(items) => items.iter().any(mentions_rule),
            Term::NonAc(t) => t.args.iter().any(mentions_rule),
        }
    }

    proptest! {
        #[test]
        fn acyclic_rules_stabilize_once(root in arb_term()) {
            let mut store = load(vec![
                Statement::labeled("root", root),
                Statement::rewrite("a", Term::non_ac("f", [Term::number("1")])),
                Statement::rewrite("b", Term::list([Term::identifier("a"), Term::string("s")])),
                Statement::rewrite("c", Term::non_ac("g", [Term::identifier("b"), Term::identifier("a")])),
            ]);
            prop_assert!(store.execute_rewrite_rules(DEFAULT_MAX_REWRITE_ITERATIONS).unwrap().stabilized);
            prop_assert!(!mentions_rule(&root_term(&store)));

            let once = store.read_current_frame().unwrap();
            let again = store.execute_rewrite_rules(DEFAULT_MAX_REWRITE_ITERATIONS).unwrap();
            prop_assert_eq!(again.iterations, 0);
            prop_assert_eq!(store.read_current_frame().unwrap(), once);
        }
    }
}
