// Copyright 2024-2026, Tessera Labs, Inc.
// For licensing, see https://github.com/tessera-lang/tessera-rs/blob/main/licenses/COPYRIGHT.md

//! The checked program representation the interpreter consumes.
//!
//! This is not surface syntax: the external checker has already resolved
//! names, numeric literal kinds, cast targets, and `before(...)` captures
//! (which are hoisted into [`FunctionDeclaration::before_captures`] and
//! referenced back by index). Every node carries the source range of the
//! code it came from so runtime errors can cite their origin.

use std::rc::Rc;

use num_bigint::BigInt;
use tessera_core::{AccountAddress, Location, QualifiedId, SourceRange, StoragePath};

use crate::types::{CompositeKind, NumberKind, Type};

/// A checked program: the unit the interpreter imports.
#[derive(Clone, Debug)]
pub struct Program {
    pub location: Location,
    pub declarations: Vec<Declaration>,
}

#[derive(Clone, Debug)]
pub enum Declaration {
    Function(Rc<FunctionDeclaration>),
    Composite(Rc<CompositeDeclaration>),
    Interface(Rc<InterfaceDeclaration>),
}

/// A function declaration, also used for initializers, destructors, and
/// closure literals. Interface requirements have no body.
#[derive(Clone, Debug)]
pub struct FunctionDeclaration {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub return_type: Type,
    pub pre_conditions: Vec<Condition>,
    pub post_conditions: Vec<Condition>,
    /// Expressions evaluated at function entry for `before(...)` uses in
    /// post-conditions; `Expression::Before` reads them back by index.
    pub before_captures: Vec<Expression>,
    pub body: Option<Block>,
    pub view: bool,
    pub range: SourceRange,
}

impl FunctionDeclaration {
    /// A bodied function with no conditions, the common case in tests and
    /// synthesized declarations.
    pub fn plain(
        name: impl Into<String>,
        parameters: Vec<Parameter>,
        return_type: Type,
        body: Block,
    ) -> Self {
        Self {
            name: name.into(),
            parameters,
            return_type,
            pre_conditions: Vec::new(),
            post_conditions: Vec::new(),
            before_captures: Vec::new(),
            body: Some(body),
            view: false,
            range: SourceRange::NONE,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Parameter {
    /// The external argument label, if distinct from the name.
    pub label: Option<String>,
    pub name: String,
    pub ty: Type,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            label: None,
            name: name.into(),
            ty,
        }
    }

    pub fn labeled(label: impl Into<String>, name: impl Into<String>, ty: Type) -> Self {
        Self {
            label: Some(label.into()),
            name: name.into(),
            ty,
        }
    }
}

/// A single pre- or post-condition list item.
#[derive(Clone, Debug)]
pub enum Condition {
    /// A boolean test; on failure the optional message expression is
    /// evaluated and a `Condition` error is raised.
    Test {
        expression: Expression,
        message: Option<Expression>,
        range: SourceRange,
    },
    /// An `emit E(...)` item: performs the emission and never fails the
    /// condition list by itself.
    Emit { event: Expression, range: SourceRange },
}

impl Condition {
    pub fn range(&self) -> SourceRange {
        match self {
            Condition::Test { range, .. } | Condition::Emit { range, .. } => *range,
        }
    }
}

#[derive(Clone, Debug)]
pub struct FieldDeclaration {
    pub name: String,
    pub ty: Type,
    pub range: SourceRange,
}

impl FieldDeclaration {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            range: SourceRange::NONE,
        }
    }
}

/// A composite declaration: struct, resource, contract, event, enum, or
/// attachment. Contracts may nest further composite declarations.
#[derive(Clone, Debug)]
pub struct CompositeDeclaration {
    pub kind: CompositeKind,
    pub identifier: QualifiedId,
    pub conformances: Vec<QualifiedId>,
    /// For attachments: the composite type this attachment requires of its
    /// carrier.
    pub base_type: Option<Type>,
    pub fields: Vec<FieldDeclaration>,
    pub initializer: Option<Rc<FunctionDeclaration>>,
    pub destructor: Option<Rc<FunctionDeclaration>>,
    pub functions: Vec<Rc<FunctionDeclaration>>,
    pub nested_composites: Vec<Rc<CompositeDeclaration>>,
    /// For enums: the raw-value kind and the declared cases in order.
    pub enum_raw_type: Option<NumberKind>,
    pub enum_cases: Vec<String>,
    pub range: SourceRange,
}

impl CompositeDeclaration {
    pub fn new(kind: CompositeKind, identifier: QualifiedId) -> Self {
        Self {
            kind,
            identifier,
            conformances: Vec::new(),
            base_type: None,
            fields: Vec::new(),
            initializer: None,
            destructor: None,
            functions: Vec::new(),
            nested_composites: Vec::new(),
            enum_raw_type: None,
            enum_cases: Vec::new(),
            range: SourceRange::NONE,
        }
    }

    pub fn function(&self, name: &str) -> Option<&Rc<FunctionDeclaration>> {
        self.functions.iter().find(|f| f.name == name)
    }
}

/// An interface declaration. Functions may carry conditions and no body;
/// conforming composites run those conditions outside their own.
#[derive(Clone, Debug)]
pub struct InterfaceDeclaration {
    pub kind: CompositeKind,
    pub identifier: QualifiedId,
    pub functions: Vec<Rc<FunctionDeclaration>>,
    pub range: SourceRange,
}

#[derive(Clone, Debug)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub range: SourceRange,
}

impl Block {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self {
            statements,
            range: SourceRange::NONE,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

/// How a value crosses a binding or assignment: non-resource copy, or the
/// resource move arrow `<-`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transfer {
    Copy,
    Move,
}

#[derive(Clone, Debug)]
pub enum Statement {
    VariableDeclaration {
        name: String,
        transfer: Transfer,
        value: Expression,
        range: SourceRange,
    },
    Assignment {
        target: Expression,
        transfer: Transfer,
        value: Expression,
        range: SourceRange,
    },
    Swap {
        left: Expression,
        right: Expression,
        range: SourceRange,
    },
    If {
        condition: Expression,
        then_block: Block,
        else_block: Option<Block>,
        range: SourceRange,
    },
    While {
        condition: Expression,
        block: Block,
        range: SourceRange,
    },
    Return {
        value: Option<Expression>,
        range: SourceRange,
    },
    Break {
        range: SourceRange,
    },
    Continue {
        range: SourceRange,
    },
    Expression {
        expression: Expression,
        range: SourceRange,
    },
    Destroy {
        expression: Expression,
        range: SourceRange,
    },
    Emit {
        event: Expression,
        range: SourceRange,
    },
    /// `remove A from target`.
    RemoveAttachment {
        attachment: QualifiedId,
        target: Expression,
        range: SourceRange,
    },
}

impl Statement {
    pub fn range(&self) -> SourceRange {
        match self {
            Statement::VariableDeclaration { range, .. }
            | Statement::Assignment { range, .. }
            | Statement::Swap { range, .. }
            | Statement::If { range, .. }
            | Statement::While { range, .. }
            | Statement::Return { range, .. }
            | Statement::Break { range }
            | Statement::Continue { range }
            | Statement::Expression { range, .. }
            | Statement::Destroy { range, .. }
            | Statement::Emit { range, .. }
            | Statement::RemoveAttachment { range, .. } => *range,
        }
    }
}

/// How a cast behaves on failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CastKind {
    /// `as`: widening or identity, checked statically; never fails.
    Static,
    /// `as?`: yields `nil` on failure.
    Conditional,
    /// `as!`: raises `ForceCastTypeMismatch` on failure.
    Force,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    ShiftLeft,
    ShiftRight,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
    /// Short-circuiting boolean and / or.
    And,
    Or,
    /// `??`.
    NilCoalesce,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
}

#[derive(Clone, Debug)]
pub struct Argument {
    pub label: Option<String>,
    pub value: Expression,
}

impl Argument {
    pub fn unlabeled(value: Expression) -> Self {
        Self { label: None, value }
    }

    pub fn labeled(label: impl Into<String>, value: Expression) -> Self {
        Self {
            label: Some(label.into()),
            value,
        }
    }
}

#[derive(Clone, Debug)]
pub enum Expression {
    BoolLiteral {
        value: bool,
        range: SourceRange,
    },
    /// Integer literal with its checker-resolved numeric kind.
    IntegerLiteral {
        value: BigInt,
        kind: NumberKind,
        range: SourceRange,
    },
    /// Fixed-point literal, already scaled by 10^8.
    FixedPointLiteral {
        raw: i128,
        kind: NumberKind,
        range: SourceRange,
    },
    StringLiteral {
        value: String,
        range: SourceRange,
    },
    NilLiteral {
        range: SourceRange,
    },
    AddressLiteral {
        value: AccountAddress,
        range: SourceRange,
    },
    PathLiteral {
        value: StoragePath,
        range: SourceRange,
    },
    ArrayLiteral {
        elements: Vec<Expression>,
        element_type: Type,
        range: SourceRange,
    },
    DictionaryLiteral {
        entries: Vec<(Expression, Expression)>,
        key_type: Type,
        value_type: Type,
        range: SourceRange,
    },
    Identifier {
        name: String,
        range: SourceRange,
    },
    Member {
        target: Box<Expression>,
        name: String,
        /// `?.` chaining: a nil target yields nil instead of failing.
        optional_chaining: bool,
        range: SourceRange,
    },
    Index {
        target: Box<Expression>,
        index: Box<Expression>,
        range: SourceRange,
    },
    /// Attachment subscript `v[A]`.
    AttachmentAccess {
        target: Box<Expression>,
        attachment: QualifiedId,
        range: SourceRange,
    },
    Invocation {
        function: Box<Expression>,
        type_arguments: Vec<Type>,
        arguments: Vec<Argument>,
        range: SourceRange,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
        range: SourceRange,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
        range: SourceRange,
    },
    Cast {
        target: Box<Expression>,
        ty: Type,
        kind: CastKind,
        range: SourceRange,
    },
    /// Force-unwrap `v!`.
    Force {
        target: Box<Expression>,
        range: SourceRange,
    },
    /// `&v as &T`; `ty` is the full reference type.
    Reference {
        target: Box<Expression>,
        ty: Type,
        range: SourceRange,
    },
    /// `create R(...)`; the inner expression is the constructor invocation.
    Create {
        invocation: Box<Expression>,
        range: SourceRange,
    },
    /// `attach A(...) to base`.
    Attach {
        attachment: Box<Expression>,
        base: Box<Expression>,
        range: SourceRange,
    },
    Conditional {
        condition: Box<Expression>,
        then_expression: Box<Expression>,
        else_expression: Box<Expression>,
        range: SourceRange,
    },
    /// A closure literal.
    Closure {
        function: Rc<FunctionDeclaration>,
        range: SourceRange,
    },
    /// `before(e)` inside a post-condition; reads the entry-time capture.
    Before {
        index: usize,
        range: SourceRange,
    },
}

impl Expression {
    pub fn range(&self) -> SourceRange {
        match self {
            Expression::BoolLiteral { range, .. }
            | Expression::IntegerLiteral { range, .. }
            | Expression::FixedPointLiteral { range, .. }
            | Expression::StringLiteral { range, .. }
            | Expression::NilLiteral { range }
            | Expression::AddressLiteral { range, .. }
            | Expression::PathLiteral { range, .. }
            | Expression::ArrayLiteral { range, .. }
            | Expression::DictionaryLiteral { range, .. }
            | Expression::Identifier { range, .. }
            | Expression::Member { range, .. }
            | Expression::Index { range, .. }
            | Expression::AttachmentAccess { range, .. }
            | Expression::Invocation { range, .. }
            | Expression::Binary { range, .. }
            | Expression::Unary { range, .. }
            | Expression::Cast { range, .. }
            | Expression::Force { range, .. }
            | Expression::Reference { range, .. }
            | Expression::Create { range, .. }
            | Expression::Attach { range, .. }
            | Expression::Conditional { range, .. }
            | Expression::Closure { range, .. }
            | Expression::Before { range, .. } => *range,
        }
    }
}
