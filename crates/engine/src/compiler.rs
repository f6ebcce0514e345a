// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Preflight Contributors

//! Compile (C1): providers → an ordered, cycle-free step graph.
//!
//! The graph is an arena of [`StepNode`]s addressed by index — dependency
//! edges are slices of indices rather than a `Rc<RefCell<_>>` structure, so
//! the graph is plain data the executor can walk without interior
//! mutability.

use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;

use preflight_core::{CompileContext, Provider, Step, StepId};

use crate::error::CompileError;

/// One step in the compiled graph.
pub struct StepNode {
    pub id: StepId,
    pub step: Arc<dyn Step>,
    /// Indices of this step's dependencies within the same [`StepGraph`].
    pub deps: Vec<usize>,
    /// BFS layer from the graph's roots; independent steps share a layer,
    /// which the executor uses to size its Apply-phase wavefronts.
    pub layer: usize,
}

/// Compiled, topologically ordered step graph.
pub struct StepGraph {
    pub nodes: Vec<StepNode>,
    /// Indices into `nodes`, topologically sorted with ties broken by
    /// ascending step id — deterministic given the same provider set.
    pub topo_order: Vec<usize>,
}

impl StepGraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn index_of(&self, id: &StepId) -> Option<usize> {
        self.nodes.iter().position(|n| &n.id == id)
    }
}

/// Compile every provider's output into one [`StepGraph`].
///
/// Fails fast on the first provider error, a duplicated step identity, a
/// dependency naming an unknown step, or a cyclic dependency relation.
pub async fn compile(
    providers: &[Box<dyn Provider>],
    ctx: &dyn CompileContext,
) -> Result<StepGraph, CompileError> {
    let mut steps: Vec<Box<dyn Step>> = Vec::new();
    for provider in providers {
        let compiled = provider
            .compile(ctx)
            .await
            .map_err(|e| CompileError::ProviderFailed {
                provider: provider.name().to_string(),
                cause: e.to_string(),
            })?;
        steps.extend(compiled);
    }

    let mut index_of: HashMap<StepId, usize> = HashMap::with_capacity(steps.len());
    for (idx, step) in steps.iter().enumerate() {
        if index_of.insert(step.id().clone(), idx).is_some() {
            return Err(CompileError::DuplicateStepId(step.id().clone()));
        }
    }

    let mut nodes: Vec<StepNode> = Vec::with_capacity(steps.len());
    for step in steps {
        let id = step.id().clone();
        let mut deps = Vec::with_capacity(step.depends_on().len());
        for dep_id in step.depends_on() {
            let dep_idx = index_of
                .get(dep_id)
                .copied()
                .ok_or_else(|| CompileError::UnknownDependency {
                    step: id.clone(),
                    dependency: dep_id.clone(),
                })?;
            deps.push(dep_idx);
        }
        nodes.push(StepNode {
            id,
            step: Arc::from(step),
            deps,
            layer: 0,
        });
    }

    let topo_order = layered_topo_sort(&mut nodes)?;

    Ok(StepGraph { nodes, topo_order })
}

/// Kahn's algorithm, processed in BFS rounds so independent steps land in
/// the same layer; each round's ready set is drained smallest-id-first so
/// the resulting order is a stable function of step ids.
/// When the order comes up short, at least one remaining node must still
/// have nonzero indegree — that's what "short" means here.
#[allow(clippy::expect_used)]
fn layered_topo_sort(nodes: &mut [StepNode]) -> Result<Vec<usize>, CompileError> {
    let n = nodes.len();
    let mut indegree = vec![0usize; n];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (idx, node) in nodes.iter().enumerate() {
        indegree[idx] = node.deps.len();
        for &dep in &node.deps {
            dependents[dep].push(idx);
        }
    }

    let mut order = Vec::with_capacity(n);
    let mut layer = 0usize;
    let mut ready: BinaryHeap<std::cmp::Reverse<(StepId, usize)>> = indegree
        .iter()
        .enumerate()
        .filter(|(_, &deg)| deg == 0)
        .map(|(idx, _)| std::cmp::Reverse((nodes[idx].id.clone(), idx)))
        .collect();

    while !ready.is_empty() {
        let mut this_round = Vec::new();
        while let Some(std::cmp::Reverse((_, idx))) = ready.pop() {
            this_round.push(idx);
        }

        for idx in this_round {
            nodes[idx].layer = layer;
            order.push(idx);
            for &dependent in &dependents[idx] {
                indegree[dependent] -= 1;
                if indegree[dependent] == 0 {
                    ready.push(std::cmp::Reverse((nodes[dependent].id.clone(), dependent)));
                }
            }
        }
        layer += 1;
    }

    if order.len() != n {
        let stuck = (0..n)
            .find(|&idx| indegree[idx] > 0)
            .expect("some node must have nonzero indegree when order is incomplete");
        return Err(CompileError::Cyclic(nodes[stuck].id.clone()));
    }

    Ok(order)
}

#[cfg(test)]
#[path = "compiler_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "compiler_proptests.rs"]
mod proptests;
