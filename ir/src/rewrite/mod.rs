//! Pass contract and rewrite drivers.
//!
//! A pass is anything that can transform a [`Graph`] and report whether it
//! did. Two driver styles cover the pipeline:
//!
//! - [`MatcherPass`] - pattern + callback, attempted at every candidate
//!   node (fusion-style single-match transforms)
//! - hand-written whole-graph passes implementing [`Pass`] directly
//!   (legalization-style full traversals)
//!
//! [`PassManager`] orders and runs passes, aggregates modification flags,
//! and optionally validates graph invariants after each modifying pass.

pub mod manager;
pub mod matcher_pass;

use crate::graph::Graph;

pub use manager::PassManager;
pub use matcher_pass::MatcherPass;

/// A graph transformation.
pub trait Pass {
    /// Identifying name for diagnostics.
    fn name(&self) -> &str;

    /// Run over the current graph state. Returns `true` when the graph was
    /// modified. A pass that finds nothing to do returns `false`; that is
    /// the common case, not an error.
    fn run(&self, graph: &mut Graph) -> bool;
}
