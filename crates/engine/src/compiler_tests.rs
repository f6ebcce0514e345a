// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Preflight Contributors

use preflight_core::test_support::{FakeProvider, FakeStep, MapCompileContext};
use preflight_core::Provider;

use super::*;

fn providers(steps: Vec<Box<dyn preflight_core::Step>>) -> Vec<Box<dyn Provider>> {
    vec![Box::new(FakeProvider::new("test", steps))]
}

#[tokio::test]
async fn empty_provider_set_compiles_to_empty_graph() {
    let graph = compile(&providers(vec![]), &MapCompileContext::new()).await.unwrap();
    assert!(graph.is_empty());
}

#[tokio::test]
async fn compiles_independent_steps_into_one_layer() {
    let steps: Vec<Box<dyn preflight_core::Step>> = vec![
        Box::new(FakeStep::new("p:kind:a")),
        Box::new(FakeStep::new("p:kind:b")),
    ];
    let graph = compile(&providers(steps), &MapCompileContext::new()).await.unwrap();
    assert_eq!(graph.len(), 2);
    assert!(graph.nodes.iter().all(|n| n.layer == 0));
}

#[tokio::test]
async fn topo_order_respects_dependencies_and_breaks_ties_by_id() {
    let steps: Vec<Box<dyn preflight_core::Step>> = vec![
        Box::new(FakeStep::new("p:kind:b").depends_on(&["p:kind:a"])),
        Box::new(FakeStep::new("p:kind:a")),
        Box::new(FakeStep::new("p:kind:c").depends_on(&["p:kind:a"])),
    ];
    let graph = compile(&providers(steps), &MapCompileContext::new()).await.unwrap();

    let ordered_ids: Vec<_> = graph
        .topo_order
        .iter()
        .map(|&idx| graph.nodes[idx].id.as_str().to_string())
        .collect();
    assert_eq!(ordered_ids[0], "p:kind:a");
    // b and c are both ready once a completes; ties break lexicographically.
    assert_eq!(ordered_ids[1], "p:kind:b");
    assert_eq!(ordered_ids[2], "p:kind:c");

    let a_idx = graph.index_of(&preflight_core::StepId::parse("p:kind:a").unwrap()).unwrap();
    assert_eq!(graph.nodes[a_idx].layer, 0);
    let b_idx = graph.index_of(&preflight_core::StepId::parse("p:kind:b").unwrap()).unwrap();
    assert_eq!(graph.nodes[b_idx].layer, 1);
}

#[tokio::test]
async fn duplicate_step_id_is_a_compile_error() {
    let steps: Vec<Box<dyn preflight_core::Step>> = vec![
        Box::new(FakeStep::new("p:kind:a")),
        Box::new(FakeStep::new("p:kind:a")),
    ];
    let err = compile(&providers(steps), &MapCompileContext::new()).await.unwrap_err();
    assert!(matches!(err, CompileError::DuplicateStepId(_)));
}

#[tokio::test]
async fn unknown_dependency_is_a_compile_error() {
    let steps: Vec<Box<dyn preflight_core::Step>> =
        vec![Box::new(FakeStep::new("p:kind:a").depends_on(&["p:kind:missing"]))];
    let err = compile(&providers(steps), &MapCompileContext::new()).await.unwrap_err();
    assert!(matches!(err, CompileError::UnknownDependency { .. }));
}

#[tokio::test]
async fn cyclic_dependency_is_a_compile_error() {
    let steps: Vec<Box<dyn preflight_core::Step>> = vec![
        Box::new(FakeStep::new("p:kind:a").depends_on(&["p:kind:b"])),
        Box::new(FakeStep::new("p:kind:b").depends_on(&["p:kind:a"])),
    ];
    let err = compile(&providers(steps), &MapCompileContext::new()).await.unwrap_err();
    assert!(matches!(err, CompileError::Cyclic(_)));
}

#[tokio::test]
async fn provider_failure_is_a_compile_error() {
    let provider: Vec<Box<dyn Provider>> = vec![Box::new(FakeProvider::failing("bad", "boom"))];
    let err = compile(&provider, &MapCompileContext::new()).await.unwrap_err();
    assert!(matches!(err, CompileError::ProviderFailed { .. }));
}
