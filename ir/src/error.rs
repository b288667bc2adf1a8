use snafu::Snafu;

use crate::graph::NodeId;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Recoverable errors: malformed pattern construction and graph validation
/// findings.
///
/// Structural misuse of the graph primitives (redirecting to a nonexistent
/// slot, detaching a node that is still referenced) is a defect in a pass,
/// not a data error, and panics instead of surfacing here.
#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Alternation pattern constructed with no alternatives.
    #[snafu(display("alternation pattern has no alternatives"))]
    EmptyAlternation,

    /// Kind constraint constructed with an empty kind set.
    #[snafu(display("kind constraint has an empty kind set"))]
    EmptyKindSet,

    /// Topological ordering could not place every live node.
    #[snafu(display("graph contains a cycle: {unplaced} live node(s) cannot be placed in topological order"))]
    CycleDetected { unplaced: usize },

    /// An input edge references a node that has been detached.
    #[snafu(display("node {consumer} input {slot} references detached node {producer}"))]
    DanglingInput { consumer: NodeId, producer: NodeId, slot: usize },

    /// An input edge references an output slot beyond the producer's arity.
    #[snafu(display(
        "node {consumer} input {slot} references output {output_slot} of node {producer}, which has {arity} output(s)"
    ))]
    InputSlotOutOfRange { consumer: NodeId, producer: NodeId, slot: usize, output_slot: usize, arity: usize },

    /// A consumer-list entry is not mirrored by the consumer's input edge.
    #[snafu(display(
        "consumer list of node {producer} output {slot} names node {consumer} input {input_slot}, \
         but that input is bound elsewhere"
    ))]
    InconsistentConsumerList { producer: NodeId, slot: usize, consumer: NodeId, input_slot: usize },

    /// A designated parameter or result node has been detached.
    #[snafu(display("designated entry/exit node {node} has been detached"))]
    DetachedInterfaceNode { node: NodeId },
}
