//! Pass ordering and execution.

use tracing::debug;

use crate::graph::Graph;
use crate::rewrite::Pass;

/// Runs an ordered list of passes over a graph, once each per invocation.
///
/// Fusion-style passes are single-pass-safe because their output pattern
/// cannot re-match their own input pattern. Legalization passes must be
/// re-run by the caller whenever an earlier pass in the same run
/// reintroduces multi-consumer fan-out; the manager itself never loops.
#[derive(Default)]
pub struct PassManager {
    passes: Vec<Box<dyn Pass>>,
    validate: bool,
}

impl PassManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate graph invariants after every modifying pass. A validation
    /// failure is a defect in a pass, not in input data, and aborts.
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    pub fn add_pass(&mut self, pass: impl Pass + 'static) -> &mut Self {
        self.passes.push(Box::new(pass));
        self
    }

    /// Run every pass in order. Returns `true` when any pass modified the
    /// graph. Unreachable nodes are reclaimed after each modifying pass.
    pub fn run(&self, graph: &mut Graph) -> bool {
        let mut any_modified = false;
        for pass in &self.passes {
            let modified = pass.run(graph);
            debug!(pass = pass.name(), modified, "pass finished");
            if modified {
                graph.prune();
                if self.validate {
                    if let Err(violation) = graph.validate() {
                        panic!("pass {} corrupted the graph: {violation}", pass.name());
                    }
                }
            }
            any_modified |= modified;
        }
        any_modified
    }
}
