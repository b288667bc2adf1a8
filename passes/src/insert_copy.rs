//! Copy-insertion legalization.
//!
//! The downstream hardware cannot alias one buffer across several concat
//! inputs or memory cells: each such consumer needs its own physical
//! buffer. These passes find the offending fan-out and break the aliasing
//! with explicit `Copy` operators.
//!
//! [`IsolateFanOut`] walks the whole graph once. For every output with two
//! or more consumers it classifies each consumer by walking forward through
//! layout-only nodes (reshape, squeeze, unsqueeze, and transposes that are
//! provably identity for their concrete input shape) until it reaches a
//! functionally significant node, sorting the edge into the *memory*
//! (read/write cell) or *concat* category; anything else is left untouched.
//! At most one constrained edge may stay a direct alias - memory consumers
//! claim it before concat consumers - and every other constrained edge gets
//! a copy spliced in adjacent to the real producer, preserving the
//! consumer's input index. A parameter producer keeps no direct alias at
//! all. The pass is idempotent: inserted copies are functionally
//! significant and belong to neither category.
//!
//! The narrow companions catch the common direct cases cheaply when the
//! general walk is not wanted: duplicate inputs of one concat, and concat
//! or memory inputs fed straight from aliasing producers (split, strided
//! slice).

use tracing::trace;

use riffle_ir::prelude::*;
use riffle_ir::shape::permutation_is_trivial;

enum Category {
    Memory,
    Concat,
}

/// Splice a copy between `src` and the single consumer edge `dst`,
/// propagating the producer's runtime info onto the new node.
fn insert_copy_between(graph: &mut Graph, src: OutputRef, dst: InputRef) -> NodeId {
    let (shape, dtype) = {
        let desc = graph.node(src.node).output(src.slot);
        (desc.shape.clone(), desc.dtype)
    };
    let name = format!("{}/copy:{}.{}", graph.node(src.node).name(), graph.node(dst.node).name(), dst.slot);
    let copy = graph.add_node(OpKind::Copy, name, [src], [OutputDesc::new(shape, dtype)]);
    graph.copy_rt_info(&[src.node], copy);
    graph.set_input_source(dst, OutputRef { node: copy, slot: 0 });
    trace!(copy = %copy, producer = %src.node, consumer = %dst.node, "inserted copy");
    copy
}

/// True for nodes the consumer classification walks through: they only
/// re-describe their input's layout.
fn is_passthrough(graph: &Graph, id: NodeId) -> bool {
    let node = graph.node(id);
    if node.kind.is_layout_only() {
        return true;
    }
    if !matches!(node.kind, OpKind::Transpose) {
        return false;
    }
    if node.inputs().len() != 2 {
        return false;
    }
    let perm_source = node.inputs()[1];
    let OpKind::Constant(value) = &graph.node(perm_source.node).kind else {
        return false;
    };
    let Some(ints) = value.as_ints() else {
        return false;
    };
    let Some(perm) = ints.iter().map(|&axis| usize::try_from(axis).ok()).collect::<Option<Vec<usize>>>() else {
        return false;
    };
    let data_source = node.inputs()[0];
    let shape = &graph.node(data_source.node).output(data_source.slot).shape;
    permutation_is_trivial(&perm, shape)
}

/// Walk forward from `edge` through passthrough chains to the functionally
/// significant consumer and classify it.
///
/// A passthrough with several consumers is followed through its first; a
/// passthrough feeding nothing ends the walk unclassified.
fn classify(graph: &Graph, edge: InputRef) -> Option<Category> {
    let mut current = edge.node;
    loop {
        let node = graph.node(current);
        if node.kind.is_memory() {
            return Some(Category::Memory);
        }
        if matches!(node.kind, OpKind::Concat { .. }) {
            return Some(Category::Concat);
        }
        if !is_passthrough(graph, current) || node.outputs().len() != 1 {
            return None;
        }
        current = node.output(0).consumers().first()?.node;
    }
}

/// Whole-graph fan-out legalization: isolate multi-consumer aliasing into
/// memory cells and concats by inserting copies.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsolateFanOut;

impl Pass for IsolateFanOut {
    fn name(&self) -> &str {
        "isolate_fan_out"
    }

    fn run(&self, graph: &mut Graph) -> bool {
        let mut modified = false;
        for id in graph.ordered_nodes() {
            if !graph.is_alive(id) {
                continue;
            }
            for slot in 0..graph.node(id).outputs().len() {
                let output = OutputRef { node: id, slot };
                let consumers: Vec<InputRef> = graph.consumers(output).to_vec();
                if consumers.len() < 2 {
                    continue;
                }

                let mut memory_edges = Vec::new();
                let mut concat_edges = Vec::new();
                for edge in consumers {
                    match classify(graph, edge) {
                        Some(Category::Memory) => memory_edges.push(edge),
                        Some(Category::Concat) => concat_edges.push(edge),
                        None => {}
                    }
                }
                if memory_edges.is_empty() && concat_edges.is_empty() {
                    continue;
                }

                // One constrained edge may stay a direct alias, claimed by
                // the memory category first; an entry node's buffer is
                // never aliased directly.
                let is_entry = matches!(graph.node(id).kind, OpKind::Parameter);
                let allowed_direct = if is_entry { 0 } else { 1 };
                for edge in memory_edges.into_iter().chain(concat_edges).skip(allowed_direct) {
                    insert_copy_between(graph, output, edge);
                    modified = true;
                }
            }
        }
        modified
    }
}

/// Narrow companion: the same producer output wired to several input slots
/// of one concat keeps the first slot and gets copies on the rest.
pub fn copy_before_duplicate_concat_inputs() -> MatcherPass {
    MatcherPass::new(
        "copy_before_duplicate_concat_inputs",
        Pattern::kind(OpTag::Concat).bind("concat"),
        Box::new(|graph, bindings| {
            let Some(concat) = bindings.node("concat") else {
                return false;
            };
            let inputs: Vec<OutputRef> = graph.node(concat).inputs().to_vec();
            let mut seen: Vec<OutputRef> = Vec::new();
            let mut modified = false;
            for (slot, source) in inputs.into_iter().enumerate() {
                if seen.contains(&source) {
                    insert_copy_between(graph, source, InputRef { node: concat, slot });
                    modified = true;
                } else {
                    seen.push(source);
                }
            }
            modified
        }),
    )
    .expect("concat pattern is statically well-formed")
}

/// Narrow companion: concat inputs fed directly by aliasing producers
/// (split, strided slice) get a copy.
pub fn copy_before_concat_aliases() -> MatcherPass {
    MatcherPass::new(
        "copy_before_concat_aliases",
        Pattern::kind(OpTag::Concat).bind("concat"),
        Box::new(|graph, bindings| {
            let Some(concat) = bindings.node("concat") else {
                return false;
            };
            let inputs: Vec<OutputRef> = graph.node(concat).inputs().to_vec();
            let mut modified = false;
            for (slot, source) in inputs.into_iter().enumerate() {
                if graph.node(source.node).kind.is_aliasing_producer() {
                    insert_copy_between(graph, source, InputRef { node: concat, slot });
                    modified = true;
                }
            }
            modified
        }),
    )
    .expect("concat pattern is statically well-formed")
}

/// Narrow companion: a memory cell fed directly by an aliasing producer
/// gets a copy on its input edge.
pub fn copy_before_memory_aliases() -> MatcherPass {
    let aliasing = Pattern::kinds([OpTag::Split, OpTag::StridedSlice]);
    let read = Pattern::kind(OpTag::ReadValue).with_inputs(vec![aliasing.clone()]);
    let assign = Pattern::kind(OpTag::Assign).with_inputs(vec![aliasing]);
    MatcherPass::new(
        "copy_before_memory_aliases",
        Pattern::any_of(vec![read, assign]).bind("memory"),
        Box::new(|graph, bindings| {
            let Some(memory) = bindings.node("memory") else {
                return false;
            };
            let source = graph.input_source(memory, 0);
            insert_copy_between(graph, source, InputRef { node: memory, slot: 0 });
            true
        }),
    )
    .expect("memory pattern is statically well-formed")
}
