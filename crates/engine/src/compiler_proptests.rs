// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Preflight Contributors

//! Property tests for the compiler's topological sort over randomly
//! generated dependency graphs: every edge must be respected in
//! `topo_order`, and compiling the same graph twice is deterministic.

use std::collections::HashMap;

use preflight_core::test_support::{FakeProvider, FakeStep, MapCompileContext};
use preflight_core::{Provider, Step};
use proptest::prelude::*;

use crate::compiler::compile;

const NODES: usize = 10;

fn step_id(n: usize) -> String {
    format!("test:kind:s{n}")
}

/// One DAG over `NODES` nodes, as a lower-triangular adjacency matrix
/// flattened into a bit per candidate edge `(j, i)` with `j < i` — acyclic
/// by construction since every edge points from a lower index to a higher
/// one.
fn arb_dag() -> impl Strategy<Value = Vec<Vec<usize>>> {
    let edge_count = NODES * NODES.saturating_sub(1) / 2;
    proptest::collection::vec(any::<bool>(), edge_count).prop_map(|bits| {
        let mut deps_by_node = vec![Vec::new(); NODES];
        let mut bit_idx = 0;
        for i in 0..NODES {
            for j in 0..i {
                if bits[bit_idx] {
                    deps_by_node[i].push(j);
                }
                bit_idx += 1;
            }
        }
        deps_by_node
    })
}

fn build_steps(deps_by_node: &[Vec<usize>]) -> Vec<Box<dyn Step>> {
    deps_by_node
        .iter()
        .enumerate()
        .map(|(i, deps)| {
            let dep_ids: Vec<String> = deps.iter().map(|&d| step_id(d)).collect();
            let dep_refs: Vec<&str> = dep_ids.iter().map(String::as_str).collect();
            Box::new(FakeStep::new(&step_id(i)).depends_on(&dep_refs)) as Box<dyn Step>
        })
        .collect()
}

fn compile_sync(deps_by_node: &[Vec<usize>]) -> crate::compiler::StepGraph {
    let providers: Vec<Box<dyn Provider>> = vec![Box::new(FakeProvider::new("test", build_steps(deps_by_node)))];
    let ctx = MapCompileContext::new();
    tokio::runtime::Runtime::new()
        .expect("build a current-thread runtime")
        .block_on(compile(&providers, &ctx))
        .expect("a DAG built from a lower-triangular adjacency matrix never cycles")
}

proptest! {
    #[test]
    fn topo_order_respects_every_dependency_edge(deps_by_node in arb_dag()) {
        let graph = compile_sync(&deps_by_node);

        let position: HashMap<usize, usize> = graph
            .topo_order
            .iter()
            .enumerate()
            .map(|(pos, &idx)| (idx, pos))
            .collect();

        for (idx, node) in graph.nodes.iter().enumerate() {
            for &dep in &node.deps {
                prop_assert!(position[&dep] < position[&idx]);
            }
        }
    }

    #[test]
    fn compiling_the_same_graph_twice_yields_the_same_order(deps_by_node in arb_dag()) {
        let graph_a = compile_sync(&deps_by_node);
        let graph_b = compile_sync(&deps_by_node);

        let ids_a: Vec<_> = graph_a.topo_order.iter().map(|&i| graph_a.nodes[i].id.clone()).collect();
        let ids_b: Vec<_> = graph_b.topo_order.iter().map(|&i| graph_b.nodes[i].id.clone()).collect();
        prop_assert_eq!(ids_a, ids_b);
    }
}
