//! Declarative subgraph patterns.
//!
//! A [`Pattern`] is a small DAG describing the subgraph a pass wants to
//! find: per-node kind constraints (single kind, fixed alternative set, or
//! wildcard), optional rank/shape/consumer-count predicates, expected input
//! producers, and ordered alternation. Patterns are plain values built with
//! constructor methods:
//!
//! ```ignore
//! // Reshape(any rank-4 input, constant), with exactly one consumer
//! let pattern = Pattern::kind(OpTag::Reshape)
//!     .with_inputs(vec![
//!         Pattern::any().with_rank(4).bind("data"),
//!         Pattern::kind(OpTag::Constant).bind("target_shape"),
//!     ])
//!     .with_consumers(1);
//! ```
//!
//! [`Pattern::compile`] validates the pattern (no empty alternations, no
//! empty kind sets) and interns binding labels; malformed patterns fail
//! there, at pass-construction time, before any graph is processed.

pub mod matcher;

use smallvec::SmallVec;
use snafu::ensure;

use crate::error::{EmptyAlternationSnafu, EmptyKindSetSnafu, Result};
use crate::op::OpTag;
use crate::shape::Shape;

pub use matcher::{BindingStore, MatchBindings, match_pattern};

/// Kind constraint on one pattern node.
#[derive(Debug, Clone)]
pub enum KindConstraint {
    /// Wildcard: any operator kind.
    Any,
    /// One of a fixed set of kinds.
    OneOf(SmallVec<[OpTag; 2]>),
}

/// Shape predicate evaluated against the matched output's shape.
pub type ShapePred = fn(&Shape) -> bool;

/// Pattern tree node.
///
/// All constraints on a `Node` must be satisfied for the candidate output
/// to match; `None` means unconstrained. An `AnyOf` node tries its
/// alternatives in listed order and accepts the first success - there is no
/// backtracking across an accepted alternative.
#[derive(Debug, Clone)]
pub enum Pattern {
    Node {
        kind: KindConstraint,
        /// Expected producers of the candidate node's inputs, matched
        /// positionally. `None` matches regardless of inputs; a count
        /// mismatch is a no-match.
        inputs: Option<Vec<Pattern>>,
        rank: Option<usize>,
        shape_pred: Option<ShapePred>,
        /// Exact consumer count of the matched output in the real graph.
        consumers: Option<usize>,
        label: Option<String>,
    },
    AnyOf {
        alternatives: Vec<Pattern>,
        label: Option<String>,
    },
}

impl Pattern {
    /// Wildcard: matches any producer without recursing into its inputs.
    pub fn any() -> Self {
        Self::Node { kind: KindConstraint::Any, inputs: None, rank: None, shape_pred: None, consumers: None, label: None }
    }

    /// Match a single operator kind.
    pub fn kind(tag: OpTag) -> Self {
        Self::kinds([tag])
    }

    /// Match any kind from a fixed set.
    pub fn kinds(tags: impl IntoIterator<Item = OpTag>) -> Self {
        Self::Node {
            kind: KindConstraint::OneOf(tags.into_iter().collect()),
            inputs: None,
            rank: None,
            shape_pred: None,
            consumers: None,
            label: None,
        }
    }

    /// Ordered alternation: the first alternative that matches wins.
    pub fn any_of(alternatives: Vec<Pattern>) -> Self {
        Self::AnyOf { alternatives, label: None }
    }

    /// Constrain the producers of the candidate node's inputs.
    pub fn with_inputs(self, expected: Vec<Pattern>) -> Self {
        match self {
            Self::Node { kind, rank, shape_pred, consumers, label, .. } => {
                Self::Node { kind, inputs: Some(expected), rank, shape_pred, consumers, label }
            }
            Self::AnyOf { .. } => panic!("alternation carries no structural constraints; constrain its alternatives"),
        }
    }

    /// Require the matched output's rank.
    pub fn with_rank(self, rank: usize) -> Self {
        match self {
            Self::Node { kind, inputs, shape_pred, consumers, label, .. } => {
                Self::Node { kind, inputs, rank: Some(rank), shape_pred, consumers, label }
            }
            Self::AnyOf { .. } => panic!("alternation carries no structural constraints; constrain its alternatives"),
        }
    }

    /// Require a predicate on the matched output's shape.
    pub fn with_shape_pred(self, pred: ShapePred) -> Self {
        match self {
            Self::Node { kind, inputs, rank, consumers, label, .. } => {
                Self::Node { kind, inputs, rank, shape_pred: Some(pred), consumers, label }
            }
            Self::AnyOf { .. } => panic!("alternation carries no structural constraints; constrain its alternatives"),
        }
    }

    /// Require the matched output's exact consumer count in the real graph.
    ///
    /// Rewrites that detach a matched edge assume exclusive ownership of it;
    /// a higher consumer count would silently drop other users, so the match
    /// must fail instead.
    pub fn with_consumers(self, count: usize) -> Self {
        match self {
            Self::Node { kind, inputs, rank, shape_pred, label, .. } => {
                Self::Node { kind, inputs, rank, shape_pred, consumers: Some(count), label }
            }
            Self::AnyOf { .. } => panic!("alternation carries no structural constraints; constrain its alternatives"),
        }
    }

    /// Record the matched output under `label` in the binding map.
    pub fn bind(self, label: impl Into<String>) -> Self {
        match self {
            Self::Node { kind, inputs, rank, shape_pred, consumers, .. } => {
                Self::Node { kind, inputs, rank, shape_pred, consumers, label: Some(label.into()) }
            }
            Self::AnyOf { alternatives, .. } => Self::AnyOf { alternatives, label: Some(label.into()) },
        }
    }

    /// Validate the pattern and intern its binding labels.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyAlternation`](crate::Error::EmptyAlternation) for an
    /// alternation with zero alternatives,
    /// [`Error::EmptyKindSet`](crate::Error::EmptyKindSet) for a kind
    /// constraint with an empty set.
    pub fn compile(self) -> Result<CompiledPattern> {
        let mut labels = LabelTable::default();
        validate(&self, &mut labels)?;
        Ok(CompiledPattern { pattern: self, labels })
    }
}

fn validate(pattern: &Pattern, labels: &mut LabelTable) -> Result<()> {
    match pattern {
        Pattern::Node { kind, inputs, label, .. } => {
            if let KindConstraint::OneOf(tags) = kind {
                ensure!(!tags.is_empty(), EmptyKindSetSnafu);
            }
            if let Some(label) = label {
                labels.get_or_insert(label);
            }
            if let Some(children) = inputs {
                for child in children {
                    validate(child, labels)?;
                }
            }
            Ok(())
        }
        Pattern::AnyOf { alternatives, label } => {
            ensure!(!alternatives.is_empty(), EmptyAlternationSnafu);
            if let Some(label) = label {
                labels.get_or_insert(label);
            }
            for alternative in alternatives {
                validate(alternative, labels)?;
            }
            Ok(())
        }
    }
}

/// A validated pattern with interned binding labels, ready for matching.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pattern: Pattern,
    labels: LabelTable,
}

impl CompiledPattern {
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    /// Kinds the pattern root can match, or `None` when the root admits any
    /// kind. Used by pass drivers to skip candidate nodes cheaply.
    pub fn root_tags(&self) -> Option<SmallVec<[OpTag; 4]>> {
        let mut tags = SmallVec::new();
        collect_root_tags(&self.pattern, &mut tags).then_some(tags)
    }
}

fn collect_root_tags(pattern: &Pattern, tags: &mut SmallVec<[OpTag; 4]>) -> bool {
    match pattern {
        Pattern::Node { kind: KindConstraint::Any, .. } => false,
        Pattern::Node { kind: KindConstraint::OneOf(own), .. } => {
            for tag in own {
                if !tags.contains(tag) {
                    tags.push(*tag);
                }
            }
            true
        }
        Pattern::AnyOf { alternatives, .. } => {
            alternatives.iter().all(|alternative| collect_root_tags(alternative, tags))
        }
    }
}

/// Binding label interning table.
///
/// Maps label strings to compact `u8` indices so the binding store stays a
/// flat, stack-allocated list during matching.
#[derive(Debug, Clone, Default)]
pub struct LabelTable {
    names: Vec<String>,
}

impl LabelTable {
    fn get_or_insert(&mut self, name: &str) -> u8 {
        if let Some(index) = self.index_of(name) {
            return index;
        }
        assert!(self.names.len() < u8::MAX as usize, "pattern has too many binding labels");
        self.names.push(name.to_string());
        (self.names.len() - 1) as u8
    }

    pub fn index_of(&self, name: &str) -> Option<u8> {
        self.names.iter().position(|known| known == name).map(|index| index as u8)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
