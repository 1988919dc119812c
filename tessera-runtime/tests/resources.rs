// Copyright 2024-2026, Tessera Labs, Inc.
// For licensing, see https://github.com/tessera-lang/tessera-rs/blob/main/licenses/COPYRIGHT.md

//! The runtime resource discipline: moves invalidate their source, dropped
//! resources are losses, destroyed resources poison references, and the
//! attachment interlocks hold.

mod common;

use std::rc::Rc;

use common::*;
use tessera_runtime::ast::{Declaration, Expression, Parameter};
use tessera_runtime::tessera_core::ErrorKind;
use tessera_runtime::{CompositeKind, Type, Value};

fn reference_to(name: &str) -> Expression {
    Expression::Reference {
        target: Box::new(ident(name)),
        ty: Type::reference(false, composite_type("R")),
        range: r(),
    }
}

#[test]
fn test_second_move_raises() {
    let scenario = fun(
        "scenario",
        vec![],
        Type::Void,
        vec![
            var_move("a", create(call(ident("R"), vec![]))),
            var_move("b", ident("a")),
            var_move("c", ident("a")),
            destroy(ident("b")),
            destroy(ident("c")),
        ],
    );
    let (mut interpreter, _host) = setup(vec![
        resource_decl("R"),
        Declaration::Function(scenario),
    ]);
    let error = interpreter.invoke("scenario", vec![]).unwrap_err();
    assert_eq!(error.kind, ErrorKind::InvalidatedResource);
}

#[test]
fn test_discarded_resource_is_a_loss() {
    let scenario = fun(
        "scenario",
        vec![],
        Type::Void,
        vec![expr_stmt(create(call(ident("R"), vec![])))],
    );
    let (mut interpreter, _host) = setup(vec![
        resource_decl("R"),
        Declaration::Function(scenario),
    ]);
    let error = interpreter.invoke("scenario", vec![]).unwrap_err();
    assert!(matches!(error.kind, ErrorKind::ResourceLoss { .. }));
}

#[test]
fn test_reference_after_destroy_is_invalidated() {
    let scenario = fun(
        "scenario",
        vec![],
        Type::Void,
        vec![
            var_move("x", create(call(ident("R"), vec![]))),
            var_copy("reference", reference_to("x")),
            destroy(ident("x")),
            var_copy("after", member(ident("reference"), "uuid")),
        ],
    );
    let (mut interpreter, _host) = setup(vec![
        resource_decl("R"),
        Declaration::Function(scenario),
    ]);
    let error = interpreter.invoke("scenario", vec![]).unwrap_err();
    assert_eq!(error.kind, ErrorKind::InvalidatedResource);
}

#[test]
fn test_reference_before_destroy_reads_through() {
    let scenario = fun(
        "scenario",
        vec![],
        Type::Bool,
        vec![
            var_move("x", create(call(ident("R"), vec![]))),
            var_copy("reference", reference_to("x")),
            var_copy("uuid", member(ident("reference"), "uuid")),
            destroy(ident("x")),
            ret(equals(ident("uuid"), typed_int(tessera_runtime::NumberKind::UInt64, 1))),
        ],
    );
    let (mut interpreter, _host) = setup(vec![
        resource_decl("R"),
        Declaration::Function(scenario),
    ]);
    let result = interpreter.invoke("scenario", vec![]).unwrap();
    assert!(matches!(result, Value::Bool(true)));
}

fn plain_attachment(name: &str, base: &str) -> Declaration {
    let mut declaration = composite(CompositeKind::Attachment, name);
    declaration.base_type = Some(composite_type(base));
    Declaration::Composite(Rc::new(declaration))
}

#[test]
fn test_duplicate_attachment_raises() {
    let scenario = fun(
        "scenario",
        vec![],
        Type::Void,
        vec![
            var_copy(
                "s",
                attach(call(ident("A"), vec![]), call(ident("S"), vec![])),
            ),
            var_copy(
                "s2",
                attach(call(ident("A"), vec![]), ident("s")),
            ),
        ],
    );
    let (mut interpreter, _host) = setup(vec![
        Declaration::Composite(Rc::new(composite(CompositeKind::Struct, "S"))),
        plain_attachment("A", "S"),
        Declaration::Function(scenario),
    ]);
    let error = interpreter.invoke("scenario", vec![]).unwrap_err();
    assert!(matches!(error.kind, ErrorKind::DuplicateAttachment { .. }));
}

#[test]
fn test_attach_during_iteration_raises() {
    // Attaching to the carrier inside its own forEachAttachment raises.
    let mutate = closure(
        vec![Parameter::new("attachment", Type::Any)],
        vec![var_copy(
            "oops",
            attach(call(ident("B"), vec![]), ident("s")),
        )],
    );
    let scenario = fun(
        "scenario",
        vec![],
        Type::Void,
        vec![
            var_copy(
                "s",
                attach(call(ident("A"), vec![]), call(ident("S"), vec![])),
            ),
            expr_stmt(method(ident("s"), "forEachAttachment", vec![mutate])),
        ],
    );
    let (mut interpreter, _host) = setup(vec![
        Declaration::Composite(Rc::new(composite(CompositeKind::Struct, "S"))),
        plain_attachment("A", "S"),
        plain_attachment("B", "S"),
        Declaration::Function(scenario),
    ]);
    let error = interpreter.invoke("scenario", vec![]).unwrap_err();
    assert_eq!(error.kind, ErrorKind::AttachmentIterationMutation);
}

#[test]
fn test_attach_to_distinct_carrier_during_iteration_is_allowed() {
    let mutate = closure(
        vec![Parameter::new("attachment", Type::Any)],
        vec![assign(
            ident("other"),
            attach(call(ident("B"), vec![]), ident("other")),
        )],
    );
    let scenario = fun(
        "scenario",
        vec![],
        Type::Void,
        vec![
            var_copy(
                "s",
                attach(call(ident("A"), vec![]), call(ident("S"), vec![])),
            ),
            var_copy("other", call(ident("S"), vec![])),
            expr_stmt(method(ident("s"), "forEachAttachment", vec![mutate])),
        ],
    );
    let (mut interpreter, _host) = setup(vec![
        Declaration::Composite(Rc::new(composite(CompositeKind::Struct, "S"))),
        plain_attachment("A", "S"),
        plain_attachment("B", "S"),
        Declaration::Function(scenario),
    ]);
    interpreter.invoke("scenario", vec![]).unwrap();
}

#[test]
fn test_remove_absent_attachment_is_noop_and_subscript_nil() {
    let scenario = fun(
        "scenario",
        vec![],
        Type::Bool,
        vec![
            var_copy("s", call(ident("S"), vec![])),
            remove_attachment("A", ident("s")),
            ret(equals(attachment_subscript(ident("s"), "A"), nil_lit())),
        ],
    );
    let (mut interpreter, _host) = setup(vec![
        Declaration::Composite(Rc::new(composite(CompositeKind::Struct, "S"))),
        plain_attachment("A", "S"),
        Declaration::Function(scenario),
    ]);
    let result = interpreter.invoke("scenario", vec![]).unwrap();
    assert!(matches!(result, Value::Bool(true)));
}

#[test]
fn test_contract_values_cannot_be_saved() {
    // Contract singletons are non-transferable.
    let scenario = fun(
        "scenario",
        vec![param("account", Type::AuthAccount)],
        Type::Void,
        vec![expr_stmt(method(
            ident("account"),
            "save",
            vec![ident("C"), path_lit("/storage/c")],
        ))],
    );
    let (mut interpreter, _host) = setup(vec![
        Declaration::Composite(Rc::new(composite(CompositeKind::Contract, "C"))),
        Declaration::Function(scenario),
    ]);
    let error = interpreter
        .invoke("scenario", vec![auth_account()])
        .unwrap_err();
    assert!(matches!(error.kind, ErrorKind::NonTransferableValue { .. }));
}
