// Copyright 2024-2026, Tessera Labs, Inc.
// For licensing, see https://github.com/tessera-lang/tessera-rs/blob/main/licenses/COPYRIGHT.md

//! Elaboration: the checker-produced side tables the evaluator consumes.
//!
//! The elaboration answers conformance and kind questions during dynamic
//! subtype checks, and carries per-type information (field types, enum raw
//! kinds, attachment base types). Method dispatch tables are precomputed
//! when a program is imported, not re-walked per call.

use std::collections::HashMap;
use std::rc::Rc;

use tessera_core::QualifiedId;

use crate::ast::{CompositeDeclaration, Declaration, InterfaceDeclaration, Program};
use crate::types::{CompositeKind, ConformanceResolver, NumberKind, Type};

/// Checker-resolved facts about one composite type.
#[derive(Clone, Debug)]
pub struct CompositeTypeInfo {
    pub qualified_id: QualifiedId,
    pub kind: CompositeKind,
    pub fields: Vec<(String, Type)>,
    pub conformances: Vec<QualifiedId>,
    /// For attachments: the required carrier type.
    pub base_type: Option<Type>,
    pub enum_raw_type: Option<NumberKind>,
}

impl CompositeTypeInfo {
    pub fn from_declaration(declaration: &CompositeDeclaration) -> Self {
        Self {
            qualified_id: declaration.identifier.clone(),
            kind: declaration.kind,
            fields: declaration
                .fields
                .iter()
                .map(|field| (field.name.clone(), field.ty.clone()))
                .collect(),
            conformances: declaration.conformances.clone(),
            base_type: declaration.base_type.clone(),
            enum_raw_type: declaration.enum_raw_type,
        }
    }
}

/// The type information for a checked program.
#[derive(Debug, Default)]
pub struct Elaboration {
    composites: HashMap<QualifiedId, Rc<CompositeTypeInfo>>,
    interfaces: HashMap<QualifiedId, Rc<InterfaceDeclaration>>,
}

impl Elaboration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derives an elaboration directly from a program's declarations.
    /// Production embedders receive this from the checker; tests and simple
    /// hosts can reconstruct it, since every fact is derivable here.
    pub fn from_program(program: &Program) -> Self {
        let mut elaboration = Self::new();
        for declaration in &program.declarations {
            elaboration.add_declaration(declaration);
        }
        elaboration
    }

    fn add_declaration(&mut self, declaration: &Declaration) {
        match declaration {
            Declaration::Composite(composite) => self.add_composite(composite),
            Declaration::Interface(interface) => {
                self.declare_interface(Rc::clone(interface));
            }
            Declaration::Function(_) => {}
        }
    }

    fn add_composite(&mut self, composite: &Rc<CompositeDeclaration>) {
        self.declare_composite(CompositeTypeInfo::from_declaration(composite));
        for nested in &composite.nested_composites {
            self.add_composite(nested);
        }
    }

    pub fn declare_composite(&mut self, info: CompositeTypeInfo) {
        self.composites.insert(info.qualified_id.clone(), Rc::new(info));
    }

    /// Folds another program's elaboration into this one, e.g. when an
    /// import resolver supplies a cross-location dependency.
    pub fn merge(&mut self, other: Elaboration) {
        self.composites.extend(other.composites);
        self.interfaces.extend(other.interfaces);
    }

    pub fn declare_interface(&mut self, interface: Rc<InterfaceDeclaration>) {
        self.interfaces.insert(interface.identifier.clone(), interface);
    }

    pub fn composite(&self, id: &QualifiedId) -> Option<&Rc<CompositeTypeInfo>> {
        self.composites.get(id)
    }

    pub fn interface(&self, id: &QualifiedId) -> Option<&Rc<InterfaceDeclaration>> {
        self.interfaces.get(id)
    }
}

impl ConformanceResolver for Elaboration {
    fn conforms_to(&self, composite: &QualifiedId, interface: &QualifiedId) -> bool {
        self.composites
            .get(composite)
            .is_some_and(|info| info.conformances.iter().any(|c| c == interface))
    }

    fn composite_kind(&self, id: &QualifiedId) -> Option<CompositeKind> {
        self.composites.get(id).map(|info| info.kind)
    }
}

/// A program plus everything the evaluator pre-resolves at import time:
/// flattened composite declarations, per-type method dispatch tables, and
/// the interface condition wrappers for each method.
#[derive(Debug)]
pub struct ProgramIndex {
    pub program: Program,
    pub composites: HashMap<QualifiedId, Rc<CompositeDeclaration>>,
    pub interfaces: HashMap<QualifiedId, Rc<InterfaceDeclaration>>,
    /// Per composite type: method name to declaration.
    dispatch: HashMap<QualifiedId, HashMap<String, Rc<crate::ast::FunctionDeclaration>>>,
    /// Per composite type: method name to the interface requirements whose
    /// conditions wrap it, in conformance-declaration order.
    condition_wrappers:
        HashMap<QualifiedId, HashMap<String, Vec<Rc<crate::ast::FunctionDeclaration>>>>,
}

impl ProgramIndex {
    pub fn build(program: Program, elaboration: &Elaboration) -> Self {
        let mut composites = HashMap::new();
        let mut interfaces = HashMap::new();
        for declaration in &program.declarations {
            collect(declaration, &mut composites, &mut interfaces);
        }

        let mut dispatch = HashMap::new();
        let mut condition_wrappers = HashMap::new();
        for (id, composite) in &composites {
            let mut methods = HashMap::new();
            for function in &composite.functions {
                methods.insert(function.name.clone(), Rc::clone(function));
            }

            let mut wrappers: HashMap<String, Vec<Rc<crate::ast::FunctionDeclaration>>> =
                HashMap::new();
            for conformance in &composite.conformances {
                let Some(interface) = elaboration
                    .interface(conformance)
                    .cloned()
                    .or_else(|| interfaces.get(conformance).cloned())
                else {
                    continue;
                };
                for requirement in &interface.functions {
                    if requirement.pre_conditions.is_empty()
                        && requirement.post_conditions.is_empty()
                    {
                        continue;
                    }
                    wrappers
                        .entry(requirement.name.clone())
                        .or_default()
                        .push(Rc::clone(requirement));
                }
            }

            dispatch.insert(id.clone(), methods);
            condition_wrappers.insert(id.clone(), wrappers);
        }

        Self {
            program,
            composites,
            interfaces,
            dispatch,
            condition_wrappers,
        }
    }

    pub fn composite(&self, id: &QualifiedId) -> Option<&Rc<CompositeDeclaration>> {
        self.composites.get(id)
    }

    /// A composite declaration looked up by its simple name at the
    /// program's own location.
    pub fn composite_by_name(&self, name: &str) -> Option<&Rc<CompositeDeclaration>> {
        self.composites
            .values()
            .find(|composite| composite.identifier.simple_name() == name)
    }

    pub fn method(
        &self,
        id: &QualifiedId,
        name: &str,
    ) -> Option<&Rc<crate::ast::FunctionDeclaration>> {
        self.dispatch.get(id)?.get(name)
    }

    /// The interface requirements wrapping invocations of a method, in
    /// conformance-declaration order.
    pub fn method_condition_wrappers(
        &self,
        id: &QualifiedId,
        name: &str,
    ) -> &[Rc<crate::ast::FunctionDeclaration>] {
        self.condition_wrappers
            .get(id)
            .and_then(|methods| methods.get(name))
            .map(|wrappers| wrappers.as_slice())
            .unwrap_or(&[])
    }
}

fn collect(
    declaration: &Declaration,
    composites: &mut HashMap<QualifiedId, Rc<CompositeDeclaration>>,
    interfaces: &mut HashMap<QualifiedId, Rc<InterfaceDeclaration>>,
) {
    match declaration {
        Declaration::Composite(composite) => {
            collect_composite(composite, composites);
        }
        Declaration::Interface(interface) => {
            interfaces.insert(interface.identifier.clone(), Rc::clone(interface));
        }
        Declaration::Function(_) => {}
    }
}

fn collect_composite(
    composite: &Rc<CompositeDeclaration>,
    composites: &mut HashMap<QualifiedId, Rc<CompositeDeclaration>>,
) {
    composites.insert(composite.identifier.clone(), Rc::clone(composite));
    for nested in &composite.nested_composites {
        collect_composite(nested, composites);
    }
}
