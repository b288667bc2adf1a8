//! MatcherPass and PassManager tests.

use std::cell::Cell;
use std::rc::Rc;

use riffle_dtype::ElementType;

use crate::error::Error;
use crate::graph::{Graph, NodeId, OutputDesc, OutputRef};
use crate::op::{OpKind, OpTag};
use crate::pattern::Pattern;
use crate::rewrite::{MatcherPass, Pass, PassManager};
use crate::shape::static_shape;

fn out(node: NodeId, slot: usize) -> OutputRef {
    OutputRef { node, slot }
}

fn desc() -> OutputDesc {
    OutputDesc::new(static_shape(&[1, 8]), ElementType::F32)
}

fn relu_chain(len: usize) -> Graph {
    let mut graph = Graph::new();
    let param = graph.add_parameter("data", static_shape(&[1, 8]), ElementType::F32);
    let mut tail = out(param, 0);
    for index in 0..len {
        let relu = graph.add_node(OpKind::Relu, format!("relu{index}"), [tail], [desc()]);
        tail = out(relu, 0);
    }
    graph.add_result("result", tail);
    graph
}

#[test]
fn malformed_pattern_fails_at_pass_construction() {
    let result = MatcherPass::new("broken", Pattern::any_of(vec![]), Box::new(|_, _| false));
    assert!(matches!(result, Err(Error::EmptyAlternation)));
}

#[test]
fn matcher_pass_visits_every_candidate_once() {
    let mut graph = relu_chain(3);
    let matches = Rc::new(Cell::new(0));
    let seen = matches.clone();
    let pass = MatcherPass::new(
        "count_relus",
        Pattern::kind(OpTag::Relu),
        Box::new(move |_, _| {
            seen.set(seen.get() + 1);
            false
        }),
    )
    .unwrap();

    let modified = pass.run(&mut graph);

    assert_eq!(matches.get(), 3);
    assert!(!modified, "declining callbacks must not report modification");
}

#[test]
fn matcher_pass_replaces_through_bindings() {
    let mut graph = relu_chain(1);
    let pass = MatcherPass::new(
        "relu_to_copy",
        Pattern::kind(OpTag::Relu).with_inputs(vec![Pattern::any().bind("src")]).bind("relu"),
        Box::new(|graph, bindings| {
            let (Some(relu), Some(src)) = (bindings.node("relu"), bindings.get("src")) else {
                return false;
            };
            let name = graph.node(relu).name().to_string();
            let copy = graph.add_node(OpKind::Copy, name, [src], [desc()]);
            graph.replace_node(relu, copy);
            true
        }),
    )
    .unwrap();

    assert!(pass.run(&mut graph));
    graph.prune();
    assert!(graph.validate().is_ok());
    assert_eq!(graph.iter_live().filter(|(_, node)| matches!(node.kind, OpKind::Relu)).count(), 0);
    assert_eq!(graph.iter_live().filter(|(_, node)| matches!(node.kind, OpKind::Copy)).count(), 1);
}

struct FlagPass {
    name: &'static str,
    modifies: bool,
}

impl Pass for FlagPass {
    fn name(&self) -> &str {
        self.name
    }

    fn run(&self, _graph: &mut Graph) -> bool {
        self.modifies
    }
}

#[test]
fn pass_manager_ors_modification_flags() {
    let mut graph = relu_chain(1);

    let mut manager = PassManager::new();
    manager.add_pass(FlagPass { name: "noop", modifies: false });
    assert!(!manager.run(&mut graph));

    manager.add_pass(FlagPass { name: "mutator", modifies: true });
    assert!(manager.run(&mut graph));
}

#[test]
fn pass_manager_validates_after_modifying_passes() {
    let mut graph = relu_chain(2);
    let mut manager = PassManager::new().with_validation(true);
    manager.add_pass(FlagPass { name: "honest", modifies: true });
    assert!(manager.run(&mut graph));
    assert!(graph.validate().is_ok());
}
