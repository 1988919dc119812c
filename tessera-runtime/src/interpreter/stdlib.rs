// Copyright 2024-2026, Tessera Labs, Inc.
// For licensing, see https://github.com/tessera-lang/tessera-rs/blob/main/licenses/COPYRIGHT.md

//! Predeclared values installed into the base activation: `panic`,
//! `assert`, `log`, the account constructors, and the numeric conversion
//! constructors. Predeclared functions are exempt from function-declaration
//! metering.

use std::rc::Rc;

use tessera_core::{ErrorKind, RuntimeError};
use tracing::info;

use super::members::expect_address;
use super::Interpreter;
use crate::env::Activation;
use crate::types::NumberKind;
use crate::values::{render, AccountHandle, FunctionValue, HostFunction, Value};

const NUMBER_KINDS: [NumberKind; 22] = [
    NumberKind::Int8,
    NumberKind::Int16,
    NumberKind::Int32,
    NumberKind::Int64,
    NumberKind::Int128,
    NumberKind::Int256,
    NumberKind::Int,
    NumberKind::UInt8,
    NumberKind::UInt16,
    NumberKind::UInt32,
    NumberKind::UInt64,
    NumberKind::UInt128,
    NumberKind::UInt256,
    NumberKind::UInt,
    NumberKind::Word8,
    NumberKind::Word16,
    NumberKind::Word32,
    NumberKind::Word64,
    NumberKind::Word128,
    NumberKind::Word256,
    NumberKind::Fix64,
    NumberKind::UFix64,
];

fn define_host(
    base: &Rc<Activation>,
    name: &'static str,
    view: bool,
    body: impl Fn(
            tessera_core::SourceRange,
            &mut Interpreter,
            Vec<Value>,
        ) -> Result<Value, RuntimeError>
        + 'static,
) {
    base.define(
        name,
        Value::Function(FunctionValue::Host(HostFunction::new(name, view, body))),
    );
}

fn rendered_message(interpreter: &Interpreter, value: Option<&Value>) -> String {
    value
        .map(|value| render(value, &interpreter.heap).trim_matches('"').to_owned())
        .unwrap_or_default()
}

pub(crate) fn install(interpreter: &mut Interpreter) {
    let base = Rc::clone(interpreter.base_activation());

    define_host(&base, "panic", true, |range, interpreter, arguments| {
        let message = rendered_message(interpreter, arguments.first());
        Err(RuntimeError::at(
            ErrorKind::Unexpected {
                message: format!("panic: {message}"),
            },
            range,
        ))
    });

    define_host(&base, "assert", true, |range, interpreter, arguments| {
        let condition = arguments
            .first()
            .ok_or_else(|| {
                RuntimeError::at(
                    ErrorKind::Unexpected {
                        message: "assert requires a condition".into(),
                    },
                    range,
                )
            })?
            .as_bool(range)?;
        if !condition {
            let message = rendered_message(interpreter, arguments.get(1));
            return Err(RuntimeError::at(
                ErrorKind::Unexpected {
                    message: format!("assertion failed: {message}"),
                },
                range,
            ));
        }
        Ok(Value::Void)
    });

    define_host(&base, "log", true, |_range, interpreter, arguments| {
        for argument in &arguments {
            info!(target: "tessera::log", "{}", render(argument, &interpreter.heap));
        }
        Ok(Value::Void)
    });

    define_host(&base, "getAccount", true, |range, _interpreter, arguments| {
        let address = expect_address(arguments.first().unwrap_or(&Value::Nil), range)?;
        Ok(Value::Account(AccountHandle {
            address,
            authorized: false,
        }))
    });

    define_host(
        &base,
        "getAuthAccount",
        true,
        |range, _interpreter, arguments| {
            let address = expect_address(arguments.first().unwrap_or(&Value::Nil), range)?;
            Ok(Value::Account(AccountHandle {
                address,
                authorized: true,
            }))
        },
    );

    for kind in NUMBER_KINDS {
        define_host(&base, kind.as_str(), true, move |range, interpreter, arguments| {
            let Some(Value::Number(number)) = arguments.first() else {
                return Err(RuntimeError::at(
                    ErrorKind::Unexpected {
                        message: format!("{kind} requires a number argument"),
                    },
                    range,
                ));
            };
            let Some(exact) = number.to_bigint() else {
                return Err(RuntimeError::at(
                    ErrorKind::Unexpected {
                        message: format!("cannot convert {} to {kind}", number.kind()),
                    },
                    range,
                ));
            };
            let converted = crate::values::NumberValue::from_bigint(kind, exact)
                .map_err(|error| error.with_range(range))?;
            interpreter.meter(converted.memory_usage())?;
            Ok(Value::Number(converted))
        });
    }
}
