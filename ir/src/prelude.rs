//! Common imports for working with riffle graphs.
//!
//! ```rust,ignore
//! use riffle_ir::prelude::*;
//! ```

pub use crate::graph::{Graph, InputRef, Node, NodeId, OutputDesc, OutputRef};
pub use crate::op::{ConstValue, OpKind, OpTag};
pub use crate::pattern::{CompiledPattern, MatchBindings, Pattern, match_pattern};
pub use crate::rewrite::{MatcherPass, Pass, PassManager};
pub use crate::rtinfo::{RtInfo, RtValue};
pub use crate::shape::{Dim, Shape, static_shape};

// Re-exports from dependencies
pub use riffle_dtype::ElementType;
