//! Operator kinds and constant payloads.
//!
//! [`OpKind`] is the closed set of operator kinds the passes understand.
//! Per-kind attributes live directly in the variant; operand edges live on
//! the owning [`Node`](crate::graph::Node), not here.
//!
//! Design choices:
//! - Kind comparisons in patterns use the derived [`OpTag`] discriminant,
//!   evaluated once per candidate node rather than per predicate
//! - Shape and permutation arguments are ordinary `Constant` nodes wired as
//!   inputs, mirroring how loaders deliver them
//! - Classification queries (`is_memory`, `is_aliasing_producer`) are
//!   methods here so every pass shares one definition of each category

use strum::EnumDiscriminants;

/// Payload of a `Constant` node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstValue {
    /// Integer vector - reshape targets, transpose permutations.
    Ints(Vec<i64>),
    /// Single integer.
    Scalar(i64),
}

impl ConstValue {
    pub fn as_ints(&self) -> Option<&[i64]> {
        match self {
            Self::Ints(values) => Some(values),
            Self::Scalar(_) => None,
        }
    }
}

/// Operator kind with per-kind attributes.
#[derive(Debug, Clone, PartialEq, Eq, EnumDiscriminants)]
#[strum_discriminants(name(OpTag), derive(Hash, PartialOrd, Ord, strum::AsRefStr))]
pub enum OpKind {
    /// Graph entry point.
    Parameter,
    /// Graph exit point; consumes exactly one output and produces none.
    Result,
    Constant(ConstValue),
    Reshape,
    Squeeze,
    Unsqueeze,
    Transpose,
    Concat { axis: i64 },
    Split { axis: i64, num_splits: usize },
    StridedSlice,
    /// Stateful read of a memory cell.
    ReadValue { variable_id: String },
    /// Stateful write to a memory cell.
    Assign { variable_id: String },
    /// Explicit buffer copy inserted by legalization.
    Copy,
    ShuffleChannels { axis: i64, group: i64 },
    Add,
    Relu,
    MatMul,
}

impl OpKind {
    pub fn tag(&self) -> OpTag {
        OpTag::from(self)
    }

    /// Kinds that only re-describe their input's layout and are walked
    /// through when classifying fan-out consumers.
    ///
    /// `Transpose` is handled separately: it is passthrough only when its
    /// permutation is provably identity for the concrete input shape.
    pub fn is_layout_only(&self) -> bool {
        matches!(self, Self::Reshape | Self::Squeeze | Self::Unsqueeze)
    }

    /// Stateful read/write cells, the highest-priority consumer category
    /// for copy insertion.
    pub fn is_memory(&self) -> bool {
        matches!(self, Self::ReadValue { .. } | Self::Assign { .. })
    }

    /// Kinds whose outputs alias a region of their input buffer, so feeding
    /// them directly into a concat or memory cell needs an explicit copy.
    pub fn is_aliasing_producer(&self) -> bool {
        matches!(self, Self::Split { .. } | Self::StridedSlice)
    }

    /// Kinds whose execution is observable even with no consumers; they
    /// anchor reachability during reclamation.
    pub fn has_side_effect(&self) -> bool {
        matches!(self, Self::Assign { .. })
    }
}
