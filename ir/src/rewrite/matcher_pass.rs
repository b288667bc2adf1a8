//! Pattern-driven single-match passes.

use smallvec::SmallVec;
use tracing::trace;

use crate::error::Result;
use crate::graph::{Graph, OutputRef};
use crate::op::OpTag;
use crate::pattern::{CompiledPattern, MatchBindings, Pattern, match_pattern};
use crate::rewrite::Pass;

/// Rewrite callback invoked on every successful match.
///
/// Returns `true` when it modified the graph; declining a structurally
/// matched candidate (a failed algebraic check) returns `false` and is not
/// an error.
pub type MatcherCallback = Box<dyn Fn(&mut Graph, &MatchBindings) -> bool>;

/// A pass that attempts one pattern rooted at every node and applies a
/// callback on each match.
///
/// Matching is rooted at output 0 of each candidate, walking a snapshot of
/// the topological order taken when the pass starts; nodes created by the
/// callback are not revisited within the same run. Candidates whose kind
/// can never satisfy the root constraint are skipped without invoking the
/// matcher.
pub struct MatcherPass {
    name: String,
    pattern: CompiledPattern,
    root_tags: Option<SmallVec<[OpTag; 4]>>,
    callback: MatcherCallback,
}

impl MatcherPass {
    /// Build a matcher pass. Malformed patterns fail here, before any graph
    /// is processed.
    pub fn new(name: impl Into<String>, pattern: Pattern, callback: MatcherCallback) -> Result<Self> {
        let pattern = pattern.compile()?;
        let root_tags = pattern.root_tags();
        Ok(Self { name: name.into(), pattern, root_tags, callback })
    }
}

impl Pass for MatcherPass {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, graph: &mut Graph) -> bool {
        let mut modified = false;
        for id in graph.ordered_nodes() {
            if !graph.is_alive(id) {
                continue;
            }
            let node = graph.node(id);
            if node.outputs().is_empty() {
                continue;
            }
            if let Some(tags) = &self.root_tags {
                if !tags.contains(&node.kind.tag()) {
                    continue;
                }
            }
            let root = OutputRef { node: id, slot: 0 };
            let Some(bindings) = match_pattern(graph, &self.pattern, root) else {
                continue;
            };
            trace!(pass = self.name.as_str(), root = %id, "pattern matched");
            modified |= (self.callback)(graph, &bindings);
        }
        modified
    }
}
