//! Shared fixtures for pass tests.


use riffle_ir::prelude::*;

pub fn out(node: NodeId, slot: usize) -> OutputRef {
    OutputRef { node, slot }
}

pub fn f32_desc(extents: &[usize]) -> OutputDesc {
    OutputDesc::new(static_shape(extents), ElementType::F32)
}

pub fn count_kind(graph: &Graph, tag: OpTag) -> usize {
    graph.iter_live().filter(|(_, node)| node.kind.tag() == tag).count()
}

pub struct ShuffleFixture {
    pub graph: Graph,
    pub param: NodeId,
    pub reshape_before: NodeId,
    pub transpose: NodeId,
    pub reshape_after: NodeId,
    pub before_target: NodeId,
    pub after_target: NodeId,
}

fn shape_to_targets(shape: &Shape) -> Vec<i64> {
    shape.iter().map(|dim| dim.as_static().map_or(-1, |extent| extent as i64)).collect()
}

/// param -> reshape -> transpose -> reshape -> result, with the given
/// shapes and permutation wired through constant inputs.
pub fn shuffle_like(input: Shape, before: Shape, perm: Vec<i64>, after: Shape) -> ShuffleFixture {
    let mut graph = Graph::new();
    let param = graph.add_parameter("data", input, ElementType::F32);

    let before_target = graph.add_constant("before_target", shape_to_targets(&before));
    let reshape_before = graph.add_node(
        OpKind::Reshape,
        "reshape_before",
        [out(param, 0), out(before_target, 0)],
        [OutputDesc::new(before.clone(), ElementType::F32)],
    );

    let perm_valid = perm.len() == before.len() && perm.iter().all(|&axis| axis >= 0 && (axis as usize) < before.len());
    let transposed: Shape =
        if perm_valid { perm.iter().map(|&axis| before[axis as usize]).collect() } else { before.clone() };
    let perm_const = graph.add_constant("perm", perm);
    let transpose = graph.add_node(
        OpKind::Transpose,
        "transpose",
        [out(reshape_before, 0), out(perm_const, 0)],
        [OutputDesc::new(transposed, ElementType::F32)],
    );

    let after_target = graph.add_constant("after_target", shape_to_targets(&after));
    let reshape_after = graph.add_node(
        OpKind::Reshape,
        "shuffle_out",
        [out(transpose, 0), out(after_target, 0)],
        [OutputDesc::new(after, ElementType::F32)],
    );
    graph.add_result("result", out(reshape_after, 0));

    ShuffleFixture { graph, param, reshape_before, transpose, reshape_after, before_target, after_target }
}

/// A well-formed channel shuffle over `[n, c, h, w]` with the given group.
pub fn channel_shuffle_graph(n: usize, c: usize, h: usize, w: usize, group: usize, five_d: bool) -> ShuffleFixture {
    let input = static_shape(&[n, c, h, w]);
    let (before, perm) = if five_d {
        (static_shape(&[n, group, c / group, h, w]), vec![0, 2, 1, 3, 4])
    } else {
        (static_shape(&[n, group, c / group, h * w]), vec![0, 2, 1, 3])
    };
    shuffle_like(input.clone(), before, perm, input)
}

/// One producer fanned out to `memory` assign cells and `concats` concat
/// nodes (each concat paired with an independent second input).
pub fn fan_out_graph(memory: usize, concats: usize, param_producer: bool) -> (Graph, NodeId) {
    let mut graph = Graph::new();
    let producer = if param_producer {
        graph.add_parameter("source", static_shape(&[1, 8]), ElementType::F32)
    } else {
        let param = graph.add_parameter("data", static_shape(&[1, 8]), ElementType::F32);
        graph.add_node(OpKind::Relu, "source", [out(param, 0)], [f32_desc(&[1, 8])])
    };
    for index in 0..memory {
        graph.add_node(
            OpKind::Assign { variable_id: format!("cell{index}") },
            format!("assign{index}"),
            [out(producer, 0)],
            [f32_desc(&[1, 8])],
        );
    }
    for index in 0..concats {
        let other = graph.add_parameter(format!("other{index}"), static_shape(&[1, 8]), ElementType::F32);
        let concat = graph.add_node(
            OpKind::Concat { axis: 0 },
            format!("concat{index}"),
            [out(producer, 0), out(other, 0)],
            [f32_desc(&[2, 8])],
        );
        graph.add_result(format!("result{index}"), out(concat, 0));
    }
    (graph, producer)
}
