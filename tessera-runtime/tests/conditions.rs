// Copyright 2024-2026, Tessera Labs, Inc.
// For licensing, see https://github.com/tessera-lang/tessera-rs/blob/main/licenses/COPYRIGHT.md

//! The invocation protocol: condition ordering, `before(...)` captures,
//! `result` binding, failure messages, and interface condition wrapping.

mod common;

use std::rc::Rc;

use common::*;
use pretty_assertions::assert_eq;
use tessera_runtime::ast::{
    BinaryOp, Block, Declaration, FunctionDeclaration, InterfaceDeclaration,
};
use tessera_runtime::tessera_core::{ConditionKind, ErrorKind};
use tessera_runtime::{CompositeKind, NumberKind, Type, Value};

fn trace_event() -> Declaration {
    event_decl("Trace", vec![("step", Type::String)])
}

fn trace(step: &str) -> tessera_runtime::ast::Expression {
    call(ident("Trace"), vec![string_lit(step)])
}

fn traced_steps(host: &tessera_test::TestHost) -> Vec<String> {
    host.emitted_events()
        .iter()
        .map(|event| event.field("step").unwrap_or_default().trim_matches('"').to_owned())
        .collect()
}

#[test]
fn test_pre_failure_suppresses_body_and_post() {
    let mut f = FunctionDeclaration::plain(
        "f",
        vec![],
        Type::Void,
        Block::new(vec![emit(trace("body"))]),
    );
    f.pre_conditions = vec![cond_test(bool_lit(false))];
    f.post_conditions = vec![cond_emit(trace("post"))];
    let (mut interpreter, host) = setup(vec![trace_event(), Declaration::Function(Rc::new(f))]);

    let error = interpreter.invoke("f", vec![]).unwrap_err();
    assert!(matches!(
        error.kind,
        ErrorKind::Condition {
            kind: ConditionKind::Pre,
            ..
        }
    ));
    assert!(host.emitted_events().is_empty());
}

#[test]
fn test_post_failure_happens_after_body() {
    let mut f = FunctionDeclaration::plain(
        "f",
        vec![],
        Type::Void,
        Block::new(vec![emit(trace("body"))]),
    );
    f.post_conditions = vec![
        cond_emit(trace("post-emit")),
        cond_test(bool_lit(false)),
        cond_emit(trace("after-failure")),
    ];
    let (mut interpreter, host) = setup(vec![trace_event(), Declaration::Function(Rc::new(f))]);

    let error = interpreter.invoke("f", vec![]).unwrap_err();
    assert!(matches!(
        error.kind,
        ErrorKind::Condition {
            kind: ConditionKind::Post,
            ..
        }
    ));
    // The body ran, the first post item emitted, and the failure stopped
    // everything after it.
    assert_eq!(traced_steps(&host), ["body", "post-emit"]);
}

#[test]
fn test_failure_message_is_evaluated_lazily() {
    let mut f = FunctionDeclaration::plain("f", vec![], Type::Void, Block::empty());
    f.pre_conditions = vec![
        cond_test_message(bool_lit(true), string_lit("unused")),
        cond_test_message(bool_lit(false), string_lit("amount must be positive")),
    ];
    let (mut interpreter, _host) = setup(vec![Declaration::Function(Rc::new(f))]);

    let error = interpreter.invoke("f", vec![]).unwrap_err();
    match error.kind {
        ErrorKind::Condition { kind, message } => {
            assert_eq!(kind, ConditionKind::Pre);
            assert_eq!(message.as_deref(), Some("amount must be positive"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_before_capture_and_result() {
    let int = Type::Number(NumberKind::Int);
    let mut bump = FunctionDeclaration::plain(
        "bump",
        vec![param("x", int.clone())],
        int,
        Block::new(vec![ret(binary(BinaryOp::Add, ident("x"), int_lit(1)))]),
    );
    bump.before_captures = vec![ident("x")];
    bump.post_conditions = vec![cond_test(equals(
        ident("result"),
        binary(BinaryOp::Add, before(0), int_lit(1)),
    ))];
    let (mut interpreter, _host) = setup(vec![Declaration::Function(Rc::new(bump))]);

    let result = interpreter.invoke("bump", vec![Value::int(41)]).unwrap();
    assert!(matches!(result, Value::Number(_)));
}

#[test]
fn test_result_for_resource_return_is_a_reference() {
    // Post-conditions on resource-returning functions see `result` as a
    // reference and can inspect without consuming.
    let mut make = FunctionDeclaration::plain(
        "make",
        vec![],
        composite_type("R"),
        Block::new(vec![ret(create(call(ident("R"), vec![])))]),
    );
    make.post_conditions = vec![cond_test(binary(
        BinaryOp::NotEqual,
        member(ident("result"), "uuid"),
        nil_lit(),
    ))];
    let scenario = fun(
        "scenario",
        vec![],
        Type::Void,
        vec![
            var_move("r", call(ident("make"), vec![])),
            destroy(ident("r")),
        ],
    );
    let (mut interpreter, _host) = setup(vec![
        resource_decl("R"),
        Declaration::Function(Rc::new(make)),
        Declaration::Function(scenario),
    ]);
    interpreter.invoke("scenario", vec![]).unwrap();
}

#[test]
fn test_interface_conditions_wrap_implementation() {
    // Interface requirement conditions run outside the implementation's:
    // pre before, post after.
    let mut requirement = FunctionDeclaration::plain("ping", vec![], Type::Void, Block::empty());
    requirement.body = None;
    requirement.pre_conditions = vec![cond_emit(trace("iface-pre"))];
    requirement.post_conditions = vec![cond_emit(trace("iface-post"))];
    let interface = InterfaceDeclaration {
        kind: CompositeKind::Struct,
        identifier: qid("Pingable"),
        functions: vec![Rc::new(requirement)],
        range: r(),
    };

    let mut ping = FunctionDeclaration::plain(
        "ping",
        vec![],
        Type::Void,
        Block::new(vec![emit(trace("body"))]),
    );
    ping.pre_conditions = vec![cond_emit(trace("impl-pre"))];
    ping.post_conditions = vec![cond_emit(trace("impl-post"))];
    let mut implementation = composite(CompositeKind::Struct, "S");
    implementation.conformances = vec![qid("Pingable")];
    implementation.functions = vec![Rc::new(ping)];

    let scenario = fun(
        "scenario",
        vec![],
        Type::Void,
        vec![
            var_copy("s", call(ident("S"), vec![])),
            expr_stmt(method(ident("s"), "ping", vec![])),
        ],
    );
    let (mut interpreter, host) = setup(vec![
        trace_event(),
        Declaration::Interface(Rc::new(interface)),
        Declaration::Composite(Rc::new(implementation)),
        Declaration::Function(scenario),
    ]);

    interpreter.invoke("scenario", vec![]).unwrap();
    assert_eq!(
        traced_steps(&host),
        ["iface-pre", "impl-pre", "body", "impl-post", "iface-post"],
    );
}

#[test]
fn test_fatal_event_sink_error_is_not_reclassified() {
    let f = fun(
        "f",
        vec![],
        Type::Void,
        vec![emit(call(ident("Trace"), vec![string_lit("x")]))],
    );
    let host = tessera_test::TestHostBuilder::new()
        .failing_event_sink("sink unavailable")
        .build();
    let mut interpreter =
        try_setup_with(host, vec![trace_event(), Declaration::Function(f)]).unwrap();

    let error = interpreter.invoke("f", vec![]).unwrap_err();
    assert!(error.is_fatal_host_error());
}
