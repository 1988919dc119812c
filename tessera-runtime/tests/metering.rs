// Copyright 2024-2026, Tessera Labs, Inc.
// For licensing, see https://github.com/tessera-lang/tessera-rs/blob/main/licenses/COPYRIGHT.md

//! Memory metering: typed usage reaches the host gauge, bound methods
//! charge per invocation, and an exceeded gauge bound unwinds as
//! `LimitExceeded`.

mod common;

use std::rc::Rc;

use common::*;
use tessera_runtime::ast::Declaration;
use tessera_runtime::tessera_core::{ErrorKind, MemoryKind};
use tessera_runtime::{CompositeKind, Type};
use tessera_test::TestHostBuilder;

#[test]
fn test_composite_construction_charges_gauge() {
    let scenario = fun(
        "scenario",
        vec![],
        Type::Void,
        vec![
            var_move("x", create(call(ident("R"), vec![]))),
            destroy(ident("x")),
        ],
    );
    let (mut interpreter, host) = setup(vec![
        resource_decl("R"),
        Declaration::Function(scenario),
    ]);

    interpreter.invoke("scenario", vec![]).unwrap();
    assert!(host.memory_used(MemoryKind::Composite) >= 1);
    // The resource uuid field is a fixed-width number.
    assert!(host.memory_used(MemoryKind::Number) >= 8);
    assert!(host.memory_used(MemoryKind::Activation) >= 1);
}

#[test]
fn test_function_declarations_charge_once_at_import() {
    let f = fun("f", vec![], Type::Void, vec![]);
    let g = fun("g", vec![], Type::Void, vec![]);
    let (_interpreter, host) = setup(vec![
        Declaration::Function(f),
        Declaration::Function(g),
    ]);
    assert_eq!(host.memory_used(MemoryKind::InterpretedFunction), 2);
}

#[test]
fn test_bound_methods_charge_per_invocation() {
    let mut s = composite(CompositeKind::Struct, "S");
    s.functions = vec![fun("m", vec![], Type::Void, vec![])];
    let scenario = fun(
        "scenario",
        vec![],
        Type::Void,
        vec![
            var_copy("s", call(ident("S"), vec![])),
            expr_stmt(method(ident("s"), "m", vec![])),
            expr_stmt(method(ident("s"), "m", vec![])),
            expr_stmt(method(ident("s"), "m", vec![])),
        ],
    );
    let (mut interpreter, host) = setup(vec![
        Declaration::Composite(Rc::new(s)),
        Declaration::Function(scenario),
    ]);

    interpreter.invoke("scenario", vec![]).unwrap();
    assert_eq!(host.memory_used(MemoryKind::BoundFunction), 3);
}

#[test]
fn test_exceeding_the_gauge_bound_raises() {
    let scenario = fun(
        "scenario",
        vec![],
        Type::Void,
        vec![var_copy(
            "s",
            string_lit("a string comfortably larger than the configured bound"),
        )],
    );
    let host = TestHostBuilder::new().memory_limit(16).build();
    let mut interpreter =
        try_setup_with(host.clone(), vec![Declaration::Function(scenario)]).unwrap();

    let error = interpreter.invoke("scenario", vec![]).unwrap_err();
    assert!(matches!(error.kind, ErrorKind::LimitExceeded { limit: 16, .. }));
    // The rejected usage was never recorded.
    assert!(host.total_memory_used() <= 16);
}
