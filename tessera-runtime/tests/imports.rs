// Copyright 2024-2026, Tessera Labs, Inc.
// For licensing, see https://github.com/tessera-lang/tessera-rs/blob/main/licenses/COPYRIGHT.md

//! Cross-location imports: declarations from an imported program are
//! usable from the main program, keeping their own locations.

mod common;

use std::rc::Rc;

use common::*;
use tessera_runtime::ast::{CompositeDeclaration, Declaration, FieldDeclaration, Program};
use tessera_runtime::tessera_core::{AccountAddress, Location, QualifiedId};
use tessera_runtime::{CompositeKind, Elaboration, Interpreter, NumberKind, Type, Value};
use tessera_test::TestHost;

#[test]
fn test_cross_location_import() {
    let int = Type::Number(NumberKind::Int);
    let library_location = Location::Contract(AccountAddress::from_u64(7), "Lib".to_owned());
    let mut pair = CompositeDeclaration::new(
        CompositeKind::Struct,
        QualifiedId::new(library_location.clone(), "Pair"),
    );
    pair.fields = vec![
        FieldDeclaration::new("x", int.clone()),
        FieldDeclaration::new("y", int.clone()),
    ];
    let library = Program {
        location: library_location,
        declarations: vec![Declaration::Composite(Rc::new(pair))],
    };
    let library_elaboration = Elaboration::from_program(&library);

    let scenario = fun(
        "scenario",
        vec![],
        Type::Bool,
        vec![
            var_copy("p", call(ident("Pair"), vec![int_lit(1), int_lit(2)])),
            ret(equals(member(ident("p"), "y"), int_lit(2))),
        ],
    );
    let main = Program {
        location: Location::test(LOCATION_NAME),
        declarations: vec![Declaration::Function(scenario)],
    };
    let main_elaboration = Elaboration::from_program(&main);

    let host = TestHost::new();
    let mut interpreter = Interpreter::new_with_imports(
        main,
        main_elaboration,
        vec![(library, library_elaboration)],
        Rc::new(host),
    )
    .unwrap();

    let result = interpreter.invoke("scenario", vec![]).unwrap();
    assert!(matches!(result, Value::Bool(true)));
}
