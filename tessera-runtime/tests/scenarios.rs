// Copyright 2024-2026, Tessera Labs, Inc.
// For licensing, see https://github.com/tessera-lang/tessera-rs/blob/main/licenses/COPYRIGHT.md

//! End-to-end scenarios driving the interpreter through checked programs:
//! storage overwrites, link chains across replacement, attachment ordering,
//! destructor ordering, saturating arithmetic, and condition-driven event
//! emission.

mod common;

use std::rc::Rc;

use common::*;
use pretty_assertions::assert_eq;
use tessera_runtime::ast::{Block, Declaration, FieldDeclaration, FunctionDeclaration};
use tessera_runtime::tessera_core::{ConditionKind, ErrorKind};
use tessera_runtime::{CompositeKind, NumberKind, Type, Value};

fn save_resource(constructor: &str, path: &str) -> tessera_runtime::ast::Statement {
    expr_stmt(method(
        ident("account"),
        "save",
        vec![create(call(ident(constructor), vec![])), path_lit(path)],
    ))
}

#[test]
fn test_save_then_overwrite_raises() {
    let scenario = fun(
        "scenario",
        vec![param("account", Type::AuthAccount)],
        Type::Void,
        vec![
            save_resource("R", "/storage/r"),
            save_resource("R", "/storage/r"),
        ],
    );
    let (mut interpreter, _host) = setup(vec![
        resource_decl("R"),
        Declaration::Function(scenario),
    ]);

    let error = interpreter
        .invoke("scenario", vec![auth_account()])
        .unwrap_err();
    assert!(matches!(error.kind, ErrorKind::Overwrite { .. }));
}

#[test]
fn test_link_and_borrow_across_replace_yields_nil() {
    // save S1 at /storage/s; link <&S1> at /public/c; load S1 back out;
    // save S2 at /storage/s; borrowing the capability must yield nil.
    let s1_reference = Type::reference(false, composite_type("S1"));
    let scenario = fun(
        "scenario",
        vec![param("account", Type::AuthAccount)],
        Type::Bool,
        vec![
            save_resource("S1", "/storage/s"),
            expr_stmt(method_typed(
                ident("account"),
                "link",
                vec![s1_reference.clone()],
                vec![path_lit("/public/c"), path_lit("/storage/s")],
            )),
            var_move(
                "loaded",
                method_typed(
                    ident("account"),
                    "load",
                    vec![composite_type("S1")],
                    vec![path_lit("/storage/s")],
                ),
            ),
            destroy(ident("loaded")),
            save_resource("S2", "/storage/s"),
            var_copy(
                "capability",
                method_typed(
                    ident("account"),
                    "getCapability",
                    vec![s1_reference],
                    vec![path_lit("/public/c")],
                ),
            ),
            var_copy(
                "borrowed",
                method(ident("capability"), "borrow", vec![]),
            ),
            ret(equals(ident("borrowed"), nil_lit())),
        ],
    );
    let (mut interpreter, _host) = setup(vec![
        resource_decl("S1"),
        resource_decl("S2"),
        Declaration::Function(scenario),
    ]);

    let result = interpreter.invoke("scenario", vec![auth_account()]).unwrap();
    assert!(matches!(result, Value::Bool(true)));
}

fn attachment_decl(
    name: &str,
    base: &str,
    fields: Vec<(&str, Type)>,
    initializer: Option<Rc<FunctionDeclaration>>,
    destructor: Option<Rc<FunctionDeclaration>>,
) -> Declaration {
    let mut declaration = composite(CompositeKind::Attachment, name);
    declaration.base_type = Some(composite_type(base));
    declaration.fields = fields
        .into_iter()
        .map(|(name, ty)| FieldDeclaration::new(name, ty))
        .collect();
    declaration.initializer = initializer;
    declaration.destructor = destructor;
    Declaration::Composite(Rc::new(declaration))
}

#[test]
fn test_attachment_initializer_sees_previously_attached() {
    // B sets x = 3; A's initializer reads base[B]!.x. Attach order makes B
    // visible while A initializes.
    let int = Type::Number(NumberKind::Int);
    let b_init = fun(
        "init",
        vec![],
        Type::Void,
        vec![assign(member(ident("self"), "x"), int_lit(3))],
    );
    let a_init = fun(
        "init",
        vec![],
        Type::Void,
        vec![assign(
            member(ident("self"), "x"),
            member(force(attachment_subscript(ident("base"), "B")), "x"),
        )],
    );
    let scenario = fun(
        "scenario",
        vec![],
        Type::Bool,
        vec![
            var_copy(
                "s",
                attach(
                    call(ident("A"), vec![]),
                    attach(call(ident("B"), vec![]), call(ident("S"), vec![])),
                ),
            ),
            ret(equals(
                member(force(attachment_subscript(ident("s"), "A")), "x"),
                int_lit(3),
            )),
        ],
    );
    let (mut interpreter, _host) = setup(vec![
        Declaration::Composite(Rc::new(composite(CompositeKind::Struct, "S"))),
        attachment_decl("B", "S", vec![("x", int.clone())], Some(b_init), None),
        attachment_decl("A", "S", vec![("x", int)], Some(a_init), None),
        Declaration::Function(scenario),
    ]);

    let result = interpreter.invoke("scenario", vec![]).unwrap();
    assert!(matches!(result, Value::Bool(true)));
}

#[test]
fn test_destructor_order_attachments_first_base_last() {
    // destroy runs attachment destructors in reverse attach order, the
    // carrier's destructor last.
    let emit_destroyed = |name: &str| {
        fun(
            "destroy",
            vec![],
            Type::Void,
            vec![emit(call(ident("Destroyed"), vec![string_lit(name)]))],
        )
    };
    let mut carrier = composite(CompositeKind::Resource, "R");
    carrier.destructor = Some(emit_destroyed("R"));
    let scenario = fun(
        "scenario",
        vec![],
        Type::Void,
        vec![
            var_move(
                "r2",
                attach(
                    call(ident("A"), vec![]),
                    attach(
                        call(ident("B"), vec![]),
                        attach(call(ident("C"), vec![]), create(call(ident("R"), vec![]))),
                    ),
                ),
            ),
            destroy(ident("r2")),
        ],
    );
    let (mut interpreter, host) = setup(vec![
        event_decl("Destroyed", vec![("name", Type::String)]),
        Declaration::Composite(Rc::new(carrier)),
        attachment_decl("A", "R", vec![], None, Some(emit_destroyed("A"))),
        attachment_decl("B", "R", vec![], None, Some(emit_destroyed("B"))),
        attachment_decl("C", "R", vec![], None, Some(emit_destroyed("C"))),
        Declaration::Function(scenario),
    ]);

    interpreter.invoke("scenario", vec![]).unwrap();

    let names: Vec<String> = host
        .emitted_events()
        .iter()
        .map(|event| event.field("name").unwrap_or_default().to_owned())
        .collect();
    assert_eq!(names, ["\"A\"", "\"B\"", "\"C\"", "\"R\""]);
}

#[test]
fn test_saturating_arithmetic_at_boundaries() {
    let check = |value: tessera_runtime::ast::Expression,
                 expected: tessera_runtime::ast::Expression| {
        equals(value, expected)
    };
    let scenario = fun(
        "scenario",
        vec![],
        Type::Bool,
        vec![ret(binary(
            tessera_runtime::ast::BinaryOp::And,
            check(
                method(
                    typed_int(NumberKind::Int8, 127),
                    "saturatingAdd",
                    vec![typed_int(NumberKind::Int8, 2)],
                ),
                typed_int(NumberKind::Int8, 127),
            ),
            binary(
                tessera_runtime::ast::BinaryOp::And,
                check(
                    method(
                        typed_int(NumberKind::UInt, 0),
                        "saturatingSubtract",
                        vec![typed_int(NumberKind::UInt, 2)],
                    ),
                    typed_int(NumberKind::UInt, 0),
                ),
                check(
                    method(
                        typed_int(NumberKind::Int8, -128),
                        "saturatingDivide",
                        vec![typed_int(NumberKind::Int8, -1)],
                    ),
                    typed_int(NumberKind::Int8, 127),
                ),
            ),
        ))],
    );
    let (mut interpreter, _host) = setup(vec![Declaration::Function(scenario)]);
    let result = interpreter.invoke("scenario", vec![]).unwrap();
    assert!(matches!(result, Value::Bool(true)));
}

fn condition_event_program() -> Vec<Declaration> {
    let int = Type::Number(NumberKind::Int);
    let mut check = FunctionDeclaration::plain(
        "check",
        vec![param("x", int.clone())],
        int,
        Block::new(vec![ret(ident("x"))]),
    );
    check.pre_conditions = vec![
        cond_test(binary(
            tessera_runtime::ast::BinaryOp::Greater,
            ident("x"),
            int_lit(0),
        )),
        cond_emit(call(ident("InterX"), vec![ident("x")])),
    ];
    check.post_conditions = vec![cond_test(binary(
        tessera_runtime::ast::BinaryOp::Greater,
        ident("result"),
        int_lit(0),
    ))];
    vec![
        event_decl("InterX", vec![("x", Type::Number(NumberKind::Int))]),
        Declaration::Function(Rc::new(check)),
    ]
}

#[test]
fn test_condition_emission_on_success() {
    let (mut interpreter, host) = setup(condition_event_program());
    let result = interpreter.invoke("check", vec![Value::int(1)]).unwrap();
    assert!(matches!(result, Value::Number(_)));

    let events = host.emitted_events();
    assert_eq!(events.len(), 1);
    assert!(events[0].type_id.ends_with("InterX"));
    assert_eq!(events[0].field("x"), Some("1"));
}

#[test]
fn test_condition_failure_suppresses_emission() {
    let (mut interpreter, host) = setup(condition_event_program());
    let error = interpreter.invoke("check", vec![Value::int(0)]).unwrap_err();
    assert!(matches!(
        error.kind,
        ErrorKind::Condition {
            kind: ConditionKind::Pre,
            ..
        }
    ));
    assert!(host.emitted_events().is_empty());
}
