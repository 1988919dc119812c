// Copyright 2024-2026, Tessera Labs, Inc.
// For licensing, see https://github.com/tessera-lang/tessera-rs/blob/main/licenses/COPYRIGHT.md

//! The tree-walking evaluator.
//!
//! A single interpreter executes one checked program synchronously on one
//! thread. Statement and expression nodes return values directly;
//! `return`/`break`/`continue` are structured non-local exits carried by
//! [`Control`], never errors. Runtime errors unwind through `Result` to the
//! host call boundary.

mod attachments;
mod expression;
mod members;
mod statement;
mod stdlib;

use std::collections::HashMap;
use std::rc::Rc;

use tessera_core::{
    ConditionKind, ErrorKind, EventAccess, EventData, Host, KeyValidationAccess, MemoryGauge,
    MemoryKind, MemoryUsage, QualifiedId, RuntimeError, SourceRange, UuidAccess,
};
use tracing::debug;

use crate::ast::{Condition, CompositeDeclaration, FunctionDeclaration, Program};
use crate::elaboration::{Elaboration, ProgramIndex};
use crate::env::Activation;
use crate::heap::{CompositeSlab, Heap, SlabPayload};
use crate::storage::AccountStorage;
use crate::types::{CompositeKind, Type};
use crate::values::{
    render, EphemeralReference, EphemeralTarget, FunctionValue, InterpretedFunction,
    ReferenceValue, Value,
};

/// Structured non-local exits from statement execution.
#[derive(Debug)]
pub(crate) enum Control {
    Normal,
    Return(Value),
    Break,
    Continue,
}

/// Supplies contract singleton values on first reference. The default
/// handler constructs the contract's declaration with no arguments.
pub type ContractValueHandler =
    Box<dyn Fn(&mut Interpreter, &QualifiedId) -> Result<Value, RuntimeError>>;

/// The synthesized binding name of the `i`-th `before(...)` capture.
fn before_name(index: usize) -> String {
    format!("$before{index}")
}

pub struct Interpreter {
    program: Rc<ProgramIndex>,
    elaboration: Rc<Elaboration>,
    pub heap: Heap,
    pub storage: AccountStorage,
    host: Rc<dyn Host>,
    base_activation: Rc<Activation>,
    globals: Rc<Activation>,
    contracts: HashMap<QualifiedId, Value>,
    contract_handler: Option<ContractValueHandler>,
}

impl Interpreter {
    /// Imports a checked program and prepares it for invocation. Charges
    /// one `InterpretedFunction` unit per user function declaration.
    pub fn new(
        program: Program,
        elaboration: Elaboration,
        host: Rc<dyn Host>,
    ) -> Result<Self, RuntimeError> {
        let elaboration = Rc::new(elaboration);
        let index = Rc::new(ProgramIndex::build(program, &elaboration));
        let base_activation = Activation::base();
        let globals = Activation::child(&base_activation);
        let mut interpreter = Self {
            program: index,
            elaboration,
            heap: Heap::new(),
            storage: AccountStorage::new(),
            host,
            base_activation,
            globals,
            contracts: HashMap::new(),
            contract_handler: None,
        };
        stdlib::install(&mut interpreter);
        interpreter.import_declarations()?;
        Ok(interpreter)
    }

    /// Imports a program together with its cross-location dependencies, as
    /// supplied by the embedder's import resolver. Declarations keep their
    /// own locations through their qualified identifiers.
    pub fn new_with_imports(
        main: Program,
        mut elaboration: Elaboration,
        imports: Vec<(Program, Elaboration)>,
        host: Rc<dyn Host>,
    ) -> Result<Self, RuntimeError> {
        let mut declarations = main.declarations;
        for (imported, imported_elaboration) in imports {
            declarations.extend(imported.declarations);
            elaboration.merge(imported_elaboration);
        }
        Self::new(
            Program {
                location: main.location,
                declarations,
            },
            elaboration,
            host,
        )
    }

    pub fn set_contract_handler(&mut self, handler: ContractValueHandler) {
        self.contract_handler = Some(handler);
    }

    pub(crate) fn program(&self) -> &Rc<ProgramIndex> {
        &self.program
    }

    pub(crate) fn elaboration(&self) -> Rc<Elaboration> {
        Rc::clone(&self.elaboration)
    }

    pub(crate) fn globals(&self) -> Rc<Activation> {
        Rc::clone(&self.globals)
    }

    /// The base activation holding predeclared values. Embedders inject
    /// additional host functions here before invoking.
    pub fn base_activation(&self) -> &Rc<Activation> {
        &self.base_activation
    }

    pub(crate) fn meter(&self, usage: MemoryUsage) -> Result<(), RuntimeError> {
        self.host.meter_memory(usage).map_err(RuntimeError::from)
    }

    fn import_declarations(&mut self) -> Result<(), RuntimeError> {
        let index = Rc::clone(&self.program);
        for declaration in &index.program.declarations {
            match declaration {
                crate::ast::Declaration::Function(function) => {
                    self.meter(MemoryUsage::new(MemoryKind::InterpretedFunction, 1))?;
                    let value = Value::Function(FunctionValue::Interpreted(Rc::new(
                        InterpretedFunction {
                            declaration: Rc::clone(function),
                            activation: self.globals(),
                            interfaces: Vec::new(),
                        },
                    )));
                    self.globals.define(&function.name, value);
                }
                crate::ast::Declaration::Composite(composite) => {
                    self.charge_composite_functions(composite)?;
                    self.bind_composite(composite);
                }
                crate::ast::Declaration::Interface(_) => {}
            }
        }
        Ok(())
    }

    fn charge_composite_functions(
        &self,
        composite: &Rc<CompositeDeclaration>,
    ) -> Result<(), RuntimeError> {
        let declared = composite
            .initializer
            .iter()
            .chain(composite.destructor.iter())
            .chain(composite.functions.iter())
            .count();
        if declared > 0 {
            self.meter(MemoryUsage::new(
                MemoryKind::InterpretedFunction,
                declared as u64,
            ))?;
        }
        for nested in &composite.nested_composites {
            self.charge_composite_functions(nested)?;
        }
        Ok(())
    }

    fn bind_composite(&mut self, composite: &Rc<CompositeDeclaration>) {
        let name = composite.identifier.simple_name().to_owned();
        match composite.kind {
            // Contract names resolve lazily to the singleton.
            CompositeKind::Contract => {}
            // Enum names are type values; cases are members on them.
            CompositeKind::Enum => {
                self.globals.define(
                    name,
                    Value::Type(Box::new(Type::Composite(composite.identifier.clone()))),
                );
            }
            _ => {
                self.globals.define(
                    name,
                    Value::Function(FunctionValue::Constructor(Rc::clone(composite))),
                );
            }
        }
    }

    /// Invokes a top-level function of the imported program.
    pub fn invoke(&mut self, name: &str, arguments: Vec<Value>) -> Result<Value, RuntimeError> {
        debug!(name, "invoke");
        match self.globals.get(name) {
            Some(Value::Function(function)) => {
                self.call_function(function, arguments, SourceRange::NONE)
            }
            _ => Err(ErrorKind::Unexpected {
                message: format!("`{name}` is not an invocable function"),
            }
            .into()),
        }
    }

    pub(crate) fn call_function(
        &mut self,
        function: FunctionValue,
        arguments: Vec<Value>,
        range: SourceRange,
    ) -> Result<Value, RuntimeError> {
        match function {
            FunctionValue::Host(host_function) => {
                let body = Rc::clone(&host_function.body);
                body(range, self, arguments)
            }
            FunctionValue::Constructor(declaration) => {
                if declaration.kind == CompositeKind::Attachment {
                    return Err(RuntimeError::at(
                        ErrorKind::Unexpected {
                            message: format!(
                                "attachment `{}` can only be created with `attach`",
                                declaration.identifier
                            ),
                        },
                        range,
                    ));
                }
                self.construct_composite(&declaration, arguments, None, range)
            }
            FunctionValue::Interpreted(function) => {
                self.call_interpreted(&function, None, None, arguments, range)
            }
            FunctionValue::Bound(bound) => {
                // A bound-method value charges one unit per invocation.
                self.meter(MemoryUsage::new(MemoryKind::BoundFunction, 1))?;
                let receiver = bound.receiver.clone();
                let base = bound.base.clone();
                match &bound.function {
                    FunctionValue::Interpreted(function) => {
                        self.call_interpreted(function, Some(receiver), base, arguments, range)
                    }
                    FunctionValue::Host(host_function) => {
                        let body = Rc::clone(&host_function.body);
                        let mut args = Vec::with_capacity(arguments.len() + 1);
                        args.push(receiver);
                        args.extend(arguments);
                        body(range, self, args)
                    }
                    other => Err(RuntimeError::at(
                        ErrorKind::Unexpected {
                            message: format!("cannot bind {other:?}"),
                        },
                        range,
                    )),
                }
            }
        }
    }

    /// The full invocation protocol: activation, `before` captures,
    /// pre-conditions (interfaces outside the implementation), body,
    /// `result` binding, post-conditions.
    pub(crate) fn call_interpreted(
        &mut self,
        function: &Rc<InterpretedFunction>,
        self_value: Option<Value>,
        base_value: Option<Value>,
        arguments: Vec<Value>,
        range: SourceRange,
    ) -> Result<Value, RuntimeError> {
        let declaration = Rc::clone(&function.declaration);
        if arguments.len() != declaration.parameters.len() {
            return Err(RuntimeError::at(
                ErrorKind::Unexpected {
                    message: format!(
                        "`{}` expects {} argument(s), got {}",
                        declaration.name,
                        declaration.parameters.len(),
                        arguments.len()
                    ),
                },
                range,
            ));
        }

        self.meter(MemoryUsage::new(MemoryKind::Activation, 1))?;
        let frame = Activation::child(&function.activation);
        if let Some(self_value) = self_value {
            frame.define("self", self_value);
        }
        if let Some(base_value) = base_value {
            frame.define("base", base_value);
        }
        for (parameter, argument) in declaration.parameters.iter().zip(arguments) {
            frame.define(&parameter.name, argument);
        }

        // One condition frame per condition-carrying declaration: the
        // wrapping interface requirements first, the implementation last.
        // `before(...)` captures are evaluated at entry into each frame.
        let mut condition_frames: Vec<(Rc<FunctionDeclaration>, Rc<Activation>)> =
            Vec::with_capacity(function.interfaces.len() + 1);
        for declaration in function
            .interfaces
            .iter()
            .chain(std::iter::once(&declaration))
        {
            let condition_frame = Activation::child(&frame);
            for (index, capture) in declaration.before_captures.iter().enumerate() {
                let value = self.evaluate(capture, &condition_frame)?;
                condition_frame.define(before_name(index), value);
            }
            condition_frames.push((Rc::clone(declaration), condition_frame));
        }

        for (declaration, condition_frame) in &condition_frames {
            self.run_conditions(
                &declaration.pre_conditions,
                condition_frame,
                ConditionKind::Pre,
            )?;
        }

        let body_frame = Activation::child(&frame);
        let mut return_value = Value::Void;
        if let Some(body) = &declaration.body {
            match self.execute_block(body, &body_frame)? {
                Control::Return(value) => return_value = value,
                Control::Normal => {}
                Control::Break | Control::Continue => {
                    return Err(RuntimeError::at(
                        ErrorKind::Unexpected {
                            message: "break or continue outside a loop".into(),
                        },
                        declaration.range,
                    ));
                }
            }
        }

        let has_post_conditions = condition_frames
            .iter()
            .any(|(declaration, _)| !declaration.post_conditions.is_empty());
        if has_post_conditions {
            let result_binding = self.result_binding(&return_value, &declaration.return_type)?;
            frame.define("result", result_binding);
        }

        // Post-conditions unwind outward: the implementation's first, then
        // the interface requirements in declaration order.
        let (own, interfaces) = condition_frames
            .split_last()
            .expect("the implementation frame is always present");
        self.run_conditions(&own.0.post_conditions, &own.1, ConditionKind::Post)?;
        for (declaration, condition_frame) in interfaces {
            self.run_conditions(
                &declaration.post_conditions,
                condition_frame,
                ConditionKind::Post,
            )?;
        }

        Ok(return_value)
    }

    /// What `result` names in post-conditions: the value itself, or a
    /// reference for resource-returning functions so conditions can inspect
    /// but not consume it.
    fn result_binding(
        &mut self,
        return_value: &Value,
        return_type: &Type,
    ) -> Result<Value, RuntimeError> {
        let elaboration = self.elaboration();
        if !return_type.is_resource_kinded(&*elaboration) {
            return Ok(return_value.clone());
        }
        let Some(id) = return_value.slab_id() else {
            return Ok(return_value.clone());
        };
        self.meter(MemoryUsage::new(MemoryKind::Reference, 1))?;
        Ok(Value::Reference(Rc::new(ReferenceValue::Ephemeral(
            EphemeralReference {
                authorized: false,
                borrowed_type: return_type.clone(),
                target: EphemeralTarget::Slab(id),
                lineage: self.heap.lineage(id),
            },
        ))))
    }

    pub(crate) fn run_conditions(
        &mut self,
        conditions: &[Condition],
        frame: &Rc<Activation>,
        kind: ConditionKind,
    ) -> Result<(), RuntimeError> {
        for condition in conditions {
            match condition {
                Condition::Test {
                    expression,
                    message,
                    range,
                } => {
                    let value = self.evaluate(expression, frame)?;
                    if !value.as_bool(*range)? {
                        // The message expression is evaluated only on
                        // failure.
                        let message = match message {
                            Some(message) => {
                                let value = self.evaluate(message, frame)?;
                                Some(render(&value, &self.heap).trim_matches('"').to_owned())
                            }
                            None => None,
                        };
                        return Err(RuntimeError::at(
                            ErrorKind::Condition { kind, message },
                            *range,
                        ));
                    }
                }
                // An emit item performs the emission and yields true.
                Condition::Emit { event, range } => {
                    self.emit_event_expression(event, frame, *range)?;
                }
            }
        }
        Ok(())
    }

    /// Evaluates an event constructor invocation and delivers the result to
    /// the host sink.
    pub(crate) fn emit_event_expression(
        &mut self,
        event: &crate::ast::Expression,
        frame: &Rc<Activation>,
        range: SourceRange,
    ) -> Result<(), RuntimeError> {
        let value = self.evaluate(event, frame)?;
        self.deliver_event(&value, range)
    }

    pub(crate) fn deliver_event(
        &mut self,
        value: &Value,
        range: SourceRange,
    ) -> Result<(), RuntimeError> {
        let Some(slab) = value.slab_id().and_then(|id| self.heap.try_get(id)) else {
            return Err(RuntimeError::at(
                ErrorKind::Unexpected {
                    message: "emit requires an event value".into(),
                },
                range,
            ));
        };
        let Some(composite) = slab.payload.as_composite() else {
            return Err(RuntimeError::at(
                ErrorKind::Unexpected {
                    message: "emit requires an event value".into(),
                },
                range,
            ));
        };
        if composite.kind != CompositeKind::Event {
            return Err(RuntimeError::at(
                ErrorKind::Unexpected {
                    message: format!("cannot emit non-event `{}`", composite.qualified_id),
                },
                range,
            ));
        }
        let fields: Vec<(String, String)> = composite
            .fields
            .iter()
            .map(|(name, field)| (name.clone(), render(field, &self.heap)))
            .collect();
        let event = EventData::new(composite.qualified_id.to_string(), fields);
        debug!(%event, "emit");
        self.host
            .emit_event(event)
            .map_err(|error| RuntimeError::at(ErrorKind::Host(error), range))
    }

    /// Constructs a composite: allocates the slab, assigns a uuid for
    /// resources, and runs the initializer (or assigns fields positionally
    /// when there is none, the common shape for events).
    pub(crate) fn construct_composite(
        &mut self,
        declaration: &Rc<CompositeDeclaration>,
        arguments: Vec<Value>,
        base_value: Option<Value>,
        range: SourceRange,
    ) -> Result<Value, RuntimeError> {
        self.meter(MemoryUsage::new(MemoryKind::Composite, 1))?;
        let mut slab = CompositeSlab::new(declaration.identifier.clone(), declaration.kind);
        if declaration.kind.is_resource() {
            let uuid = self.host.generate_uuid()?;
            self.meter(MemoryUsage::number(8))?;
            slab.uuid = Some(uuid);
            slab.fields.insert("uuid".to_owned(), Value::uint64(uuid));
        }
        let id = self.heap.allocate(None, SlabPayload::Composite(slab));
        let value = Value::Composite(id);

        if let Some(initializer) = &declaration.initializer {
            let function = Rc::new(InterpretedFunction {
                declaration: Rc::clone(initializer),
                activation: self.globals(),
                interfaces: Vec::new(),
            });
            self.call_interpreted(&function, Some(value.clone()), base_value, arguments, range)?;
        } else {
            if arguments.len() != declaration.fields.len() {
                return Err(RuntimeError::at(
                    ErrorKind::Unexpected {
                        message: format!(
                            "`{}` takes {} field value(s), got {}",
                            declaration.identifier,
                            declaration.fields.len(),
                            arguments.len()
                        ),
                    },
                    range,
                ));
            }
            let slab = self
                .heap
                .get_mut(id)?
                .payload
                .as_composite_mut()
                .expect("freshly allocated composite");
            for (field, argument) in declaration.fields.iter().zip(arguments) {
                slab.fields.insert(field.name.clone(), argument);
            }
        }

        if declaration.identifier.simple_name() == "PublicKey" {
            self.validate_public_key(id, range)?;
        }

        Ok(value)
    }

    /// Runs the host validation hook over a freshly constructed
    /// `PublicKey` composite.
    fn validate_public_key(
        &mut self,
        id: crate::heap::SlabId,
        range: SourceRange,
    ) -> Result<(), RuntimeError> {
        let bytes = {
            let slab = self.heap.get(id)?;
            let composite = slab
                .payload
                .as_composite()
                .expect("public key is a composite");
            let mut bytes = Vec::new();
            if let Some(Value::Array(elements)) = composite.fields.get("publicKey") {
                if let Some(array) = self.heap.try_get(*elements).and_then(|s| s.payload.as_array())
                {
                    for element in &array.elements {
                        if let Value::Number(crate::values::NumberValue::UInt8(byte)) = element {
                            bytes.push(*byte);
                        }
                    }
                }
            }
            bytes
        };
        let valid = self.host.validate_public_key(&bytes)?;
        if !valid {
            return Err(RuntimeError::at(
                ErrorKind::Unexpected {
                    message: "invalid public key".into(),
                },
                range,
            ));
        }
        Ok(())
    }

    /// The contract singleton for a qualified id, materialised on first
    /// use through the registered handler (default: construct the contract
    /// declaration with no arguments).
    pub fn contract_value(&mut self, id: &QualifiedId) -> Result<Value, RuntimeError> {
        if let Some(value) = self.contracts.get(id) {
            return Ok(value.clone());
        }
        let value = if let Some(handler) = self.contract_handler.take() {
            let result = handler(self, id);
            self.contract_handler = Some(handler);
            result?
        } else {
            let Some(declaration) = self.program.composite(id).cloned() else {
                return Err(ErrorKind::Unexpected {
                    message: format!("unknown contract `{id}`"),
                }
                .into());
            };
            self.construct_composite(&declaration, Vec::new(), None, SourceRange::NONE)?
        };
        self.contracts.insert(id.clone(), value.clone());
        Ok(value)
    }
}
