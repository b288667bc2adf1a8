//! Channel-shuffle fusion.
//!
//! Recognizes the reshape/transpose/reshape triple implementing a channel
//! shuffle and replaces it with one `ShuffleChannels` operator:
//!
//! ```text
//! x:   [N, C, H, W]
//! x'  = reshape(x, [N, g, C/g, H*W])   or  [N, g, C/g, H, W]
//! x'' = transpose(x', [0, 2, 1, 3])    or  [0, 2, 1, 3, 4]
//! y   = reshape(x'', [N, C, H, W])
//! ```
//!
//! The structural pattern requires exactly one consumer on both
//! intermediates - the rewrite detaches those edges and must own them
//! exclusively. The shape algebra runs in the callback and rejects by
//! declining the match, never by erroring: legitimate graphs routinely fail
//! fusion preconditions.

use smallvec::smallvec;
use tracing::trace;

use riffle_ir::prelude::*;
use riffle_ir::shape::shapes_match_expected;

/// Shape algebra for one candidate triple.
///
/// Returns the shuffle group size when the triple is a channel shuffle of
/// `input`, `None` otherwise. Expected shapes are compared with the
/// dynamic-tolerant-batch rule, so a dynamic batch dimension never blocks
/// fusion on its own.
fn check_shapes(input: &Shape, before: &Shape, perm: &[i64], after: &Shape) -> Option<i64> {
    // x: [N, C, H, W], everything but the batch statically known
    if input.len() != 4 {
        return None;
    }
    if input[1..].iter().any(|dim| !dim.is_static()) {
        return None;
    }
    let channels = input[1].as_static()?;
    let height = input[2].as_static()?;
    let width = input[3].as_static()?;

    // x' = reshape(x, [N, g, C/g, H*W]) or reshape(x, [N, g, C/g, H, W])
    if before.len() != 4 && before.len() != 5 {
        return None;
    }
    let group = before[1].as_static()?;
    if group == 0 {
        return None;
    }
    let expected_before: Shape = if before.len() == 4 {
        smallvec![input[0], Dim::Static(group), Dim::Static(channels / group), Dim::Static(height * width)]
    } else {
        smallvec![input[0], Dim::Static(group), Dim::Static(channels / group), input[2], input[3]]
    };
    if !shapes_match_expected(&expected_before, before) {
        return None;
    }

    // x'' = transpose(x', [0, 2, 1, 3]) or transpose(x', [0, 2, 1, 3, 4])
    if perm.len() != 4 && perm.len() != 5 {
        return None;
    }
    let mut expected_perm = vec![0i64, 2, 1, 3];
    if perm.len() == 5 {
        expected_perm.push(4);
    }
    if perm != expected_perm.as_slice() {
        return None;
    }

    // y = reshape(x'', [N, C, H, W])
    if !shapes_match_expected(input, after) {
        return None;
    }

    Some(group as i64)
}

/// Integer payload of a bound constant node.
fn constant_ints(graph: &Graph, bindings: &MatchBindings, label: &str) -> Option<Vec<i64>> {
    let node = bindings.node(label)?;
    let OpKind::Constant(value) = &graph.node(node).kind else {
        return None;
    };
    value.as_ints().map(<[i64]>::to_vec)
}

fn apply(graph: &mut Graph, bindings: &MatchBindings, strict_reshape_constants: bool) -> bool {
    let (Some(data), Some(reshape_before), Some(transpose), Some(reshape_after)) = (
        bindings.get("data"),
        bindings.node("reshape_before"),
        bindings.node("transpose"),
        bindings.node("reshape_after"),
    ) else {
        return false;
    };

    if strict_reshape_constants {
        // a -1 target leaves the group size to shape inference, which the
        // fused operator cannot reproduce
        for label in ["before_target", "after_target"] {
            match constant_ints(graph, bindings, label) {
                Some(targets) if !targets.contains(&-1) => {}
                _ => return false,
            }
        }
    }

    let Some(perm) = constant_ints(graph, bindings, "perm") else {
        return false;
    };
    let input_shape = graph.node(data.node).output(data.slot).shape.clone();
    let before_shape = graph.node(reshape_before).output(0).shape.clone();
    let after_shape = graph.node(reshape_after).output(0).shape.clone();

    let Some(group) = check_shapes(&input_shape, &before_shape, &perm, &after_shape) else {
        return false;
    };

    let name = graph.node(reshape_after).name().to_string();
    let dtype = graph.node(data.node).output(data.slot).dtype;
    let fused =
        graph.add_node(OpKind::ShuffleChannels { axis: 1, group }, name, [data], [OutputDesc::new(input_shape, dtype)]);
    graph.copy_rt_info(&[reshape_before, transpose, reshape_after], fused);
    graph.replace_node(reshape_after, fused);
    trace!(fused = %fused, group, "fused channel shuffle");
    true
}

/// Build the channel-shuffle fusion pass.
///
/// With `strict_reshape_constants`, either reshape target containing the
/// infer-this-dimension placeholder (-1) rejects the match.
pub fn shuffle_channels_fusion(strict_reshape_constants: bool) -> MatcherPass {
    let data = Pattern::any().with_rank(4).bind("data");
    let before_target = Pattern::kind(OpTag::Constant).bind("before_target");
    let reshape_before = Pattern::kind(OpTag::Reshape)
        .with_inputs(vec![data, before_target])
        .with_consumers(1)
        .bind("reshape_before");
    let perm = Pattern::kind(OpTag::Constant).bind("perm");
    let transpose =
        Pattern::kind(OpTag::Transpose).with_inputs(vec![reshape_before, perm]).with_consumers(1).bind("transpose");
    let after_target = Pattern::kind(OpTag::Constant).bind("after_target");
    let reshape_after =
        Pattern::kind(OpTag::Reshape).with_inputs(vec![transpose, after_target]).bind("reshape_after");

    MatcherPass::new(
        "shuffle_channels_fusion",
        reshape_after,
        Box::new(move |graph, bindings| apply(graph, bindings, strict_reshape_constants)),
    )
    .expect("fusion pattern is statically well-formed")
}
