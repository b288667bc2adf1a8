//! Pattern matching against the real graph.
//!
//! Matching is top-down and recursive: the candidate output's producer is
//! checked against the pattern node's constraints, then each expected input
//! pattern is matched against the corresponding real input's producer. A
//! wildcard consumes its producer without recursing. Matching either
//! succeeds with a complete binding map or fails with no observable effect -
//! bindings accumulated along a failed branch are rolled back before the
//! next alternative or candidate is tried.

use smallvec::SmallVec;

use crate::graph::{Graph, NodeId, OutputRef};
use crate::pattern::{CompiledPattern, KindConstraint, LabelTable, Pattern};

/// Single binding entry: (interned label index, matched output).
pub type BindingStore = SmallVec<[(u8, OutputRef); 4]>;

/// Bindings produced by one successful match attempt.
#[derive(Debug)]
pub struct MatchBindings<'p> {
    labels: &'p LabelTable,
    entries: BindingStore,
}

impl<'p> MatchBindings<'p> {
    fn new(labels: &'p LabelTable) -> Self {
        Self { labels, entries: BindingStore::new() }
    }

    /// Output bound under `label`, if the matched branch bound it.
    pub fn get(&self, label: &str) -> Option<OutputRef> {
        let index = self.labels.index_of(label)?;
        self.entries.iter().find(|(bound, _)| *bound == index).map(|(_, output)| *output)
    }

    /// Producer node bound under `label`.
    pub fn node(&self, label: &str) -> Option<NodeId> {
        self.get(label).map(|output| output.node)
    }

    fn set(&mut self, index: u8, output: OutputRef) {
        for (bound, existing) in self.entries.iter_mut() {
            if *bound == index {
                *existing = output;
                return;
            }
        }
        self.entries.push((index, output));
    }

    fn mark(&self) -> usize {
        self.entries.len()
    }

    fn rollback(&mut self, mark: usize) {
        self.entries.truncate(mark);
    }
}

/// Attempt to match `pattern` rooted at `root`.
///
/// Returns the binding map on success, `None` on any predicate failure.
/// Failure is the expected, frequent outcome and has zero side effects.
pub fn match_pattern<'p>(graph: &Graph, pattern: &'p CompiledPattern, root: OutputRef) -> Option<MatchBindings<'p>> {
    let mut bindings = MatchBindings::new(pattern.labels());
    match_at(graph, pattern.pattern(), pattern.labels(), root, &mut bindings).then_some(bindings)
}

fn match_at(graph: &Graph, pattern: &Pattern, labels: &LabelTable, output: OutputRef, bindings: &mut MatchBindings) -> bool {
    match pattern {
        Pattern::AnyOf { alternatives, label } => {
            let mark = bindings.mark();
            for alternative in alternatives {
                if match_at(graph, alternative, labels, output, bindings) {
                    if let Some(label) = label {
                        bindings.set(interned(labels, label), output);
                    }
                    return true;
                }
                bindings.rollback(mark);
            }
            false
        }
        Pattern::Node { kind, inputs, rank, shape_pred, consumers, label } => {
            let node = graph.node(output.node);
            if let KindConstraint::OneOf(tags) = kind {
                if !tags.contains(&node.kind.tag()) {
                    return false;
                }
            }
            let desc = node.output(output.slot);
            if rank.is_some_and(|expected| desc.shape.len() != expected) {
                return false;
            }
            if shape_pred.is_some_and(|pred| !pred(&desc.shape)) {
                return false;
            }
            if consumers.is_some_and(|expected| desc.consumers().len() != expected) {
                return false;
            }
            if let Some(expected) = inputs {
                if node.inputs().len() != expected.len() {
                    return false;
                }
                let sources: SmallVec<[OutputRef; 4]> = node.inputs().iter().copied().collect();
                let mark = bindings.mark();
                for (child, source) in expected.iter().zip(sources) {
                    if !match_at(graph, child, labels, source, bindings) {
                        bindings.rollback(mark);
                        return false;
                    }
                }
            }
            if let Some(label) = label {
                bindings.set(interned(labels, label), output);
            }
            true
        }
    }
}

fn interned(labels: &LabelTable, label: &str) -> u8 {
    labels.index_of(label).expect("label interned at compile time")
}
