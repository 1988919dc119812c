// Copyright 2024-2026, Tessera Labs, Inc.
// For licensing, see https://github.com/tessera-lang/tessera-rs/blob/main/licenses/COPYRIGHT.md

//! The Tessera runtime kernel.
//!
//! Given a checked program (AST plus elaboration), the runtime evaluates
//! declarations, enforces the linear resource discipline dynamically,
//! manages values inside on-chain accounts through typed paths and
//! capabilities, and evaluates pre- and post-conditions. The lexer, parser,
//! static checker, transaction harness, and wire codec are external
//! collaborators; the runtime's only outward I/O is the host trait family
//! defined in [`tessera_core`].

pub use tessera_core;

pub mod ast;
pub mod elaboration;
pub mod env;
pub mod heap;
pub mod interpreter;
pub mod storage;
pub mod types;
pub mod values;

pub use elaboration::{CompositeTypeInfo, Elaboration, ProgramIndex};
pub use interpreter::{ContractValueHandler, Interpreter};
pub use types::{CompositeKind, NumberKind, Type};
pub use values::{NumberValue, Value};
