// Copyright 2024-2026, Tessera Labs, Inc.
// For licensing, see https://github.com/tessera-lang/tessera-rs/blob/main/licenses/COPYRIGHT.md

//! Shared scaffolding for the end-to-end scenario tests: checked-AST
//! builders (the external checker's job in production) and interpreter
//! setup against a [`TestHost`].

#![allow(dead_code)]

use std::rc::Rc;

use tessera_runtime::ast::*;
use tessera_runtime::tessera_core::{Location, QualifiedId, SourceRange};
use tessera_runtime::values::AccountHandle;
use tessera_runtime::{CompositeKind, Elaboration, Interpreter, NumberKind, Type, Value};
use tessera_test::{TestHost, DEFAULT_ACCOUNT};

pub const LOCATION_NAME: &str = "harness";

pub fn r() -> SourceRange {
    SourceRange::NONE
}

pub fn qid(name: &str) -> QualifiedId {
    QualifiedId::new(Location::test(LOCATION_NAME), name)
}

pub fn composite_type(name: &str) -> Type {
    Type::Composite(qid(name))
}

// --- expressions ---

pub fn int_lit(value: i64) -> Expression {
    typed_int(NumberKind::Int, value)
}

pub fn typed_int(kind: NumberKind, value: i64) -> Expression {
    Expression::IntegerLiteral {
        value: value.into(),
        kind,
        range: r(),
    }
}

pub fn string_lit(value: &str) -> Expression {
    Expression::StringLiteral {
        value: value.to_owned(),
        range: r(),
    }
}

pub fn bool_lit(value: bool) -> Expression {
    Expression::BoolLiteral { value, range: r() }
}

pub fn nil_lit() -> Expression {
    Expression::NilLiteral { range: r() }
}

pub fn path_lit(text: &str) -> Expression {
    Expression::PathLiteral {
        value: text.parse().expect("valid path literal"),
        range: r(),
    }
}

pub fn ident(name: &str) -> Expression {
    Expression::Identifier {
        name: name.to_owned(),
        range: r(),
    }
}

pub fn member(target: Expression, name: &str) -> Expression {
    Expression::Member {
        target: Box::new(target),
        name: name.to_owned(),
        optional_chaining: false,
        range: r(),
    }
}

pub fn call(function: Expression, arguments: Vec<Expression>) -> Expression {
    call_typed(function, vec![], arguments)
}

pub fn call_typed(
    function: Expression,
    type_arguments: Vec<Type>,
    arguments: Vec<Expression>,
) -> Expression {
    Expression::Invocation {
        function: Box::new(function),
        type_arguments,
        arguments: arguments.into_iter().map(Argument::unlabeled).collect(),
        range: r(),
    }
}

pub fn method(target: Expression, name: &str, arguments: Vec<Expression>) -> Expression {
    call(member(target, name), arguments)
}

pub fn method_typed(
    target: Expression,
    name: &str,
    type_arguments: Vec<Type>,
    arguments: Vec<Expression>,
) -> Expression {
    call_typed(member(target, name), type_arguments, arguments)
}

pub fn create(invocation: Expression) -> Expression {
    Expression::Create {
        invocation: Box::new(invocation),
        range: r(),
    }
}

pub fn attach(attachment: Expression, base: Expression) -> Expression {
    Expression::Attach {
        attachment: Box::new(attachment),
        base: Box::new(base),
        range: r(),
    }
}

pub fn attachment_subscript(target: Expression, attachment: &str) -> Expression {
    Expression::AttachmentAccess {
        target: Box::new(target),
        attachment: qid(attachment),
        range: r(),
    }
}

pub fn force(target: Expression) -> Expression {
    Expression::Force {
        target: Box::new(target),
        range: r(),
    }
}

pub fn binary(op: BinaryOp, left: Expression, right: Expression) -> Expression {
    Expression::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
        range: r(),
    }
}

pub fn equals(left: Expression, right: Expression) -> Expression {
    binary(BinaryOp::Equal, left, right)
}

pub fn before(index: usize) -> Expression {
    Expression::Before { index, range: r() }
}

pub fn closure(parameters: Vec<Parameter>, body: Vec<Statement>) -> Expression {
    Expression::Closure {
        function: Rc::new(FunctionDeclaration::plain(
            "",
            parameters,
            Type::Void,
            Block::new(body),
        )),
        range: r(),
    }
}

// --- statements ---

pub fn var_move(name: &str, value: Expression) -> Statement {
    Statement::VariableDeclaration {
        name: name.to_owned(),
        transfer: Transfer::Move,
        value,
        range: r(),
    }
}

pub fn var_copy(name: &str, value: Expression) -> Statement {
    Statement::VariableDeclaration {
        name: name.to_owned(),
        transfer: Transfer::Copy,
        value,
        range: r(),
    }
}

pub fn assign(target: Expression, value: Expression) -> Statement {
    Statement::Assignment {
        target,
        transfer: Transfer::Copy,
        value,
        range: r(),
    }
}

pub fn expr_stmt(expression: Expression) -> Statement {
    Statement::Expression {
        expression,
        range: r(),
    }
}

pub fn ret(value: Expression) -> Statement {
    Statement::Return {
        value: Some(value),
        range: r(),
    }
}

pub fn destroy(expression: Expression) -> Statement {
    Statement::Destroy {
        expression,
        range: r(),
    }
}

pub fn emit(event: Expression) -> Statement {
    Statement::Emit { event, range: r() }
}

pub fn remove_attachment(attachment: &str, target: Expression) -> Statement {
    Statement::RemoveAttachment {
        attachment: qid(attachment),
        target,
        range: r(),
    }
}

// --- conditions ---

pub fn cond_test(expression: Expression) -> Condition {
    Condition::Test {
        expression,
        message: None,
        range: r(),
    }
}

pub fn cond_test_message(expression: Expression, message: Expression) -> Condition {
    Condition::Test {
        expression,
        message: Some(message),
        range: r(),
    }
}

pub fn cond_emit(event: Expression) -> Condition {
    Condition::Emit { event, range: r() }
}

// --- declarations ---

pub fn fun(
    name: &str,
    parameters: Vec<Parameter>,
    return_type: Type,
    body: Vec<Statement>,
) -> Rc<FunctionDeclaration> {
    Rc::new(FunctionDeclaration::plain(
        name,
        parameters,
        return_type,
        Block::new(body),
    ))
}

pub fn param(name: &str, ty: Type) -> Parameter {
    Parameter::new(name, ty)
}

pub fn composite(kind: CompositeKind, name: &str) -> CompositeDeclaration {
    CompositeDeclaration::new(kind, qid(name))
}

/// An event with positionally assigned fields and no initializer.
pub fn event_decl(name: &str, fields: Vec<(&str, Type)>) -> Declaration {
    let mut declaration = composite(CompositeKind::Event, name);
    declaration.fields = fields
        .into_iter()
        .map(|(name, ty)| FieldDeclaration::new(name, ty))
        .collect();
    Declaration::Composite(Rc::new(declaration))
}

pub fn resource_decl(name: &str) -> Declaration {
    Declaration::Composite(Rc::new(composite(CompositeKind::Resource, name)))
}

// --- setup ---

pub fn setup(declarations: Vec<Declaration>) -> (Interpreter, TestHost) {
    let host = TestHost::new();
    let interpreter = try_setup_with(host.clone(), declarations).expect("program imports cleanly");
    (interpreter, host)
}

pub fn try_setup_with(
    host: TestHost,
    declarations: Vec<Declaration>,
) -> Result<Interpreter, tessera_runtime::tessera_core::RuntimeError> {
    let program = Program {
        location: Location::test(LOCATION_NAME),
        declarations,
    };
    let elaboration = Elaboration::from_program(&program);
    Interpreter::new(program, elaboration, Rc::new(host))
}

pub fn auth_account() -> Value {
    Value::Account(AccountHandle {
        address: DEFAULT_ACCOUNT,
        authorized: true,
    })
}

pub fn public_account() -> Value {
    Value::Account(AccountHandle {
        address: DEFAULT_ACCOUNT,
        authorized: false,
    })
}
