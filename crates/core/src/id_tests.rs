// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Preflight Contributors

use super::*;

#[test]
fn sequential_id_gen_increments() {
    let gen = SequentialIdGen::new("apr");
    assert_eq!(gen.next(), "apr-1");
    assert_eq!(gen.next(), "apr-2");
    assert_eq!(gen.next(), "apr-3");
}

#[test]
fn uuid_id_gen_produces_distinct_ids() {
    let gen = UuidIdGen;
    assert_ne!(gen.next(), gen.next());
}
