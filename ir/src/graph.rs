//! Arena-owned dataflow graph.
//!
//! Nodes live in a growable arena addressed by [`NodeId`]. An edge is a
//! non-owning (producer, slot) reference stored on the consumer, mirrored by
//! an explicit consumer list on the producer's output descriptor. Every
//! rebinding primitive keeps the two views in sync; passes never touch
//! consumer lists directly.
//!
//! Structural misuse - redirecting to a nonexistent slot, detaching a node
//! that is still referenced - signals a defective pass, not bad input data,
//! and panics. Recoverable diagnostics are available through
//! [`Graph::validate`], which the pass manager runs after every modifying
//! pass when validation is enabled.
//!
//! Acyclicity is preserved by construction: a pass must never make a node
//! depend on one of its own consumers. This is a caller invariant; checking
//! it on every redirection would be prohibitively expensive, so violations
//! surface as [`Error::CycleDetected`] from post-pass validation.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;

use smallvec::SmallVec;
use tracing::trace;

use riffle_dtype::ElementType;

use crate::error::{Error, Result};
use crate::op::{ConstValue, OpKind};
use crate::rtinfo::RtInfo;
use crate::shape::{Shape, static_shape};

/// Arena handle for one node. Never reused within a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// A producer endpoint: output `slot` of `node`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputRef {
    pub node: NodeId,
    pub slot: usize,
}

/// A consumer endpoint: input `slot` of `node`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputRef {
    pub node: NodeId,
    pub slot: usize,
}

/// One typed, shaped result of a node.
#[derive(Debug, Clone)]
pub struct OutputDesc {
    pub shape: Shape,
    pub dtype: ElementType,
    /// Consumers currently bound to this output. Maintained by the graph.
    consumers: Vec<InputRef>,
}

impl OutputDesc {
    pub fn new(shape: Shape, dtype: ElementType) -> Self {
        Self { shape, dtype, consumers: Vec::new() }
    }

    pub fn consumers(&self) -> &[InputRef] {
        &self.consumers
    }
}

/// One operator instance.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: OpKind,
    name: String,
    inputs: SmallVec<[OutputRef; 2]>,
    outputs: SmallVec<[OutputDesc; 1]>,
    pub rt_info: RtInfo,
    alive: bool,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn inputs(&self) -> &[OutputRef] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[OutputDesc] {
        &self.outputs
    }

    /// Output descriptor at `slot`. Panics on out-of-range slot.
    pub fn output(&self, slot: usize) -> &OutputDesc {
        &self.outputs[slot]
    }
}

/// The graph: owns all nodes and tracks designated entry and exit nodes.
///
/// Output-slot arity of a node is fixed at construction. Detached nodes keep
/// their arena slot (ids stay stable) but drop out of iteration, ordering
/// and validation.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    parameters: Vec<NodeId>,
    results: Vec<NodeId>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Construction
    // =========================================================================

    /// Add a node. Each input must reference a live node and an in-range
    /// output slot; the new node is registered as a consumer on each.
    pub fn add_node(
        &mut self,
        kind: OpKind,
        name: impl Into<String>,
        inputs: impl IntoIterator<Item = OutputRef>,
        outputs: impl IntoIterator<Item = OutputDesc>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let inputs: SmallVec<[OutputRef; 2]> = inputs.into_iter().collect();
        for input in &inputs {
            self.assert_output(*input);
        }
        self.nodes.push(Node {
            kind,
            name: name.into(),
            inputs: inputs.clone(),
            outputs: outputs.into_iter().collect(),
            rt_info: RtInfo::new(),
            alive: true,
        });
        for (slot, input) in inputs.iter().enumerate() {
            self.output_mut(*input).consumers.push(InputRef { node: id, slot });
        }
        id
    }

    /// Add a graph entry point with one output of the given shape and type.
    pub fn add_parameter(&mut self, name: impl Into<String>, shape: Shape, dtype: ElementType) -> NodeId {
        let id = self.add_node(OpKind::Parameter, name, [], [OutputDesc::new(shape, dtype)]);
        self.parameters.push(id);
        id
    }

    /// Add a graph exit point consuming `input`. Result nodes produce no
    /// outputs of their own.
    pub fn add_result(&mut self, name: impl Into<String>, input: OutputRef) -> NodeId {
        let id = self.add_node(OpKind::Result, name, [input], []);
        self.results.push(id);
        id
    }

    /// Add an integer-vector constant, shaped `[len]` with `I64` elements.
    pub fn add_constant(&mut self, name: impl Into<String>, values: Vec<i64>) -> NodeId {
        let shape = static_shape(&[values.len()]);
        self.add_node(
            OpKind::Constant(ConstValue::Ints(values)),
            name,
            [],
            [OutputDesc::new(shape, ElementType::I64)],
        )
    }

    // =========================================================================
    // Access
    // =========================================================================

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn is_alive(&self, id: NodeId) -> bool {
        self.nodes.get(id.index()).is_some_and(|node| node.alive)
    }

    pub fn parameters(&self) -> &[NodeId] {
        &self.parameters
    }

    pub fn results(&self) -> &[NodeId] {
        &self.results
    }

    /// The producer currently bound to `consumer`'s input `slot`.
    pub fn input_source(&self, consumer: NodeId, slot: usize) -> OutputRef {
        self.node(consumer).inputs[slot]
    }

    /// Consumers of one output. Panics if the output does not exist.
    pub fn consumers(&self, output: OutputRef) -> &[InputRef] {
        self.assert_output(output);
        self.node(output.node).output(output.slot).consumers()
    }

    /// Live nodes in arena order.
    pub fn iter_live(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().filter(|(_, node)| node.alive).map(|(index, node)| (NodeId(index as u32), node))
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|node| node.alive).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // =========================================================================
    // Topological ordering
    // =========================================================================

    /// Live nodes in a valid topological order.
    ///
    /// Ties are broken by ascending id, so the order is stable across calls
    /// on an unchanged graph - passes that iterate a snapshot of this order
    /// behave deterministically.
    ///
    /// On a cyclic (corrupted) graph the returned order is incomplete;
    /// [`Graph::validate`] reports that case as an error.
    pub fn ordered_nodes(&self) -> Vec<NodeId> {
        let mut indegree = vec![0usize; self.nodes.len()];
        let mut ready = BinaryHeap::new();
        for (id, node) in self.iter_live() {
            indegree[id.index()] = node.inputs.iter().filter(|input| self.is_alive(input.node)).count();
            if indegree[id.index()] == 0 {
                ready.push(Reverse(id));
            }
        }

        let mut order = Vec::with_capacity(self.len());
        while let Some(Reverse(id)) = ready.pop() {
            order.push(id);
            for output in self.node(id).outputs() {
                for consumer in output.consumers() {
                    let index = consumer.node.index();
                    indegree[index] -= 1;
                    if indegree[index] == 0 {
                        ready.push(Reverse(consumer.node));
                    }
                }
            }
        }
        order
    }

    // =========================================================================
    // Redirection primitives
    // =========================================================================

    /// Rebind every consumer of `old` to `new`.
    ///
    /// Element-type and shape-class compatibility of `new` is the caller's
    /// contract to verify beforehand; this primitive only asserts structural
    /// validity (live nodes, in-range slots) and panics on violation.
    pub fn redirect_output(&mut self, old: OutputRef, new: OutputRef) {
        self.assert_output(old);
        self.assert_output(new);
        if old == new {
            return;
        }
        let moved: Vec<InputRef> = std::mem::take(&mut self.output_mut(old).consumers);
        for consumer in &moved {
            self.nodes[consumer.node.index()].inputs[consumer.slot] = new;
        }
        self.output_mut(new).consumers.extend(moved);
    }

    /// Rebind a single consumer input to `new`, preserving its input index.
    pub fn set_input_source(&mut self, consumer: InputRef, new: OutputRef) {
        assert!(
            self.is_alive(consumer.node) && consumer.slot < self.node(consumer.node).inputs.len(),
            "set_input_source: input {}.{} does not exist",
            consumer.node,
            consumer.slot,
        );
        self.assert_output(new);
        let old = self.node(consumer.node).inputs[consumer.slot];
        if old == new {
            return;
        }
        let old_consumers = &mut self.output_mut(old).consumers;
        let position = old_consumers
            .iter()
            .position(|entry| *entry == consumer)
            .expect("consumer list out of sync with input edge");
        old_consumers.swap_remove(position);
        self.nodes[consumer.node.index()].inputs[consumer.slot] = new;
        self.output_mut(new).consumers.push(consumer);
    }

    /// Redirect every output slot of `old` to the correspondingly-indexed
    /// slot of `new`, then detach `old`. The two nodes must have identical
    /// output arity.
    pub fn replace_node(&mut self, old: NodeId, new: NodeId) {
        assert!(self.is_alive(old) && self.is_alive(new), "replace_node: {old} -> {new} involves a detached node");
        let arity = self.node(old).outputs.len();
        assert_eq!(
            arity,
            self.node(new).outputs.len(),
            "replace_node: {old} and {new} have different output arity",
        );
        for slot in 0..arity {
            self.redirect_output(OutputRef { node: old, slot }, OutputRef { node: new, slot });
        }
        self.detach(old);
    }

    /// Detach a node from the graph.
    ///
    /// Fatal if the node is a designated parameter/result or any of its
    /// outputs still has consumers - that would silently drop users.
    pub fn detach(&mut self, id: NodeId) {
        assert!(self.is_alive(id), "detach: {id} is already detached");
        assert!(
            !self.parameters.contains(&id) && !self.results.contains(&id),
            "detach: {id} is a designated entry/exit node",
        );
        assert!(
            self.node(id).outputs.iter().all(|output| output.consumers.is_empty()),
            "detach: {id} still has consumers",
        );
        let inputs: SmallVec<[OutputRef; 2]> = self.node(id).inputs.clone();
        for (slot, input) in inputs.iter().enumerate() {
            let consumers = &mut self.output_mut(*input).consumers;
            consumers.retain(|entry| *entry != InputRef { node: id, slot });
        }
        self.nodes[id.index()].alive = false;
        trace!(node = %id, "detached");
    }

    /// Reclaim nodes unreachable from every designated exit point.
    ///
    /// Reachability walks backwards from result nodes and side-effecting
    /// nodes (memory writes); parameter nodes are kept as designated
    /// entries even when nothing consumes them. Returns the number of nodes
    /// reclaimed.
    pub fn prune(&mut self) -> usize {
        let mut keep = vec![false; self.nodes.len()];
        let mut stack: Vec<NodeId> = Vec::new();
        for (id, node) in self.iter_live() {
            if node.kind.has_side_effect() {
                stack.push(id);
            }
        }
        stack.extend(self.results.iter().copied().filter(|id| self.is_alive(*id)));
        for id in self.parameters.iter().copied() {
            if self.is_alive(id) {
                keep[id.index()] = true;
            }
        }
        while let Some(id) = stack.pop() {
            if keep[id.index()] {
                continue;
            }
            keep[id.index()] = true;
            stack.extend(self.node(id).inputs.iter().map(|input| input.node));
        }

        let mut reclaimed = 0;
        for index in 0..self.nodes.len() {
            if !self.nodes[index].alive || keep[index] {
                continue;
            }
            let id = NodeId(index as u32);
            let inputs: SmallVec<[OutputRef; 2]> = self.nodes[index].inputs.clone();
            for (slot, input) in inputs.iter().enumerate() {
                if keep[input.node.index()] {
                    let consumers = &mut self.output_mut(*input).consumers;
                    consumers.retain(|entry| *entry != InputRef { node: id, slot });
                }
            }
            for output in &mut self.nodes[index].outputs {
                output.consumers.clear();
            }
            self.nodes[index].alive = false;
            reclaimed += 1;
            trace!(node = %id, "reclaimed unreachable node");
        }
        reclaimed
    }

    // =========================================================================
    // Metadata propagation
    // =========================================================================

    /// Merge runtime info from `sources` (in order) onto `target`.
    ///
    /// First writer wins per key: earlier sources take precedence over later
    /// ones, and keys already present on the target are left alone.
    pub fn copy_rt_info(&mut self, sources: &[NodeId], target: NodeId) {
        for source in sources {
            let entries: Vec<(String, crate::rtinfo::RtValue)> =
                self.node(*source).rt_info.iter().map(|(key, value)| (key.clone(), value.clone())).collect();
            let target_info = &mut self.node_mut(target).rt_info;
            for (key, value) in entries {
                target_info.entry(key).or_insert(value);
            }
        }
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Recompute structural invariants and report the first violation.
    ///
    /// Checks that designated entry/exit nodes are live, that every input
    /// edge resolves to a live node and in-range slot, that consumer lists
    /// mirror input edges exactly, and that a topological order covers every
    /// live node (no cycles).
    pub fn validate(&self) -> Result<()> {
        for id in self.parameters.iter().chain(&self.results) {
            if !self.is_alive(*id) {
                return Err(Error::DetachedInterfaceNode { node: *id });
            }
        }

        for (id, node) in self.iter_live() {
            for (slot, input) in node.inputs().iter().enumerate() {
                if !self.is_alive(input.node) {
                    return Err(Error::DanglingInput { consumer: id, producer: input.node, slot });
                }
                let arity = self.node(input.node).outputs.len();
                if input.slot >= arity {
                    return Err(Error::InputSlotOutOfRange {
                        consumer: id,
                        producer: input.node,
                        slot,
                        output_slot: input.slot,
                        arity,
                    });
                }
                let mirrored = self
                    .node(input.node)
                    .output(input.slot)
                    .consumers()
                    .contains(&InputRef { node: id, slot });
                if !mirrored {
                    return Err(Error::InconsistentConsumerList {
                        producer: input.node,
                        slot: input.slot,
                        consumer: id,
                        input_slot: slot,
                    });
                }
            }
            for (slot, output) in node.outputs().iter().enumerate() {
                for consumer in output.consumers() {
                    let bound = self.is_alive(consumer.node)
                        && consumer.slot < self.node(consumer.node).inputs.len()
                        && self.node(consumer.node).inputs[consumer.slot] == OutputRef { node: id, slot };
                    if !bound {
                        return Err(Error::InconsistentConsumerList {
                            producer: id,
                            slot,
                            consumer: consumer.node,
                            input_slot: consumer.slot,
                        });
                    }
                }
            }
        }

        let placed = self.ordered_nodes().len();
        let live = self.len();
        if placed != live {
            return Err(Error::CycleDetected { unplaced: live - placed });
        }
        Ok(())
    }

    // =========================================================================
    // Internal
    // =========================================================================

    fn output_mut(&mut self, output: OutputRef) -> &mut OutputDesc {
        &mut self.nodes[output.node.index()].outputs[output.slot]
    }

    fn assert_output(&self, output: OutputRef) {
        assert!(
            self.is_alive(output.node) && output.slot < self.node(output.node).outputs.len(),
            "output {}.{} does not exist",
            output.node,
            output.slot,
        );
    }
}
