//! Graph intermediate representation for the riffle pass pipeline.
//!
//! This crate defines the dataflow graph that passes transform, plus the
//! pattern-matching and rewrite infrastructure the passes are built on.
//!
//! # Module Organization
//!
//! - [`graph`] - Arena-owned nodes, output slots, consumer bookkeeping,
//!   topological ordering and the redirection primitives
//! - [`op`] - Operator kinds and constant payloads
//! - [`shape`] - Shapes with per-dimension static/dynamic state
//! - [`rtinfo`] - Per-node runtime-info side tables
//! - [`pattern`] - Declarative subgraph patterns and the matcher
//! - [`rewrite`] - Pass contract, matcher-driven passes, pass manager
//! - [`error`] - Error types and result handling

pub mod error;
pub mod graph;
pub mod op;
pub mod pattern;
pub mod prelude;
pub mod rewrite;
pub mod rtinfo;
pub mod shape;

#[cfg(test)]
pub mod test;

// Re-exports for the common working set.
pub use error::{Error, Result};
pub use graph::{Graph, InputRef, Node, NodeId, OutputDesc, OutputRef};
pub use op::{ConstValue, OpKind, OpTag};
pub use pattern::{CompiledPattern, MatchBindings, Pattern, match_pattern};
pub use rewrite::{MatcherPass, Pass, PassManager};
pub use rtinfo::{RtInfo, RtValue};
pub use shape::{Dim, Shape};

// Re-export external types for convenience.
pub use riffle_dtype::ElementType;
