// Copyright 2024-2026, Tessera Labs, Inc.
// For licensing, see https://github.com/tessera-lang/tessera-rs/blob/main/licenses/COPYRIGHT.md

//! Expression evaluation.
//!
//! Evaluation is strict and left-to-right: invocation receivers before
//! arguments, arguments in source order, dictionary keys before values.
//! Place expressions (identifier, member, index) can additionally be
//! resolved to assignable [`Place`]s, and resources read through them with
//! move semantics leave `Value::Invalid` tombstones behind.

use std::rc::Rc;

use tessera_core::{ErrorKind, MemoryKind, MemoryUsage, RuntimeError, SourceRange};

use super::{before_name, Interpreter};
use crate::ast::{Argument, BinaryOp, CastKind, Expression, Transfer, UnaryOp};
use crate::env::{Activation, VariableCell};
use crate::heap::{ArraySlab, DictionarySlab, SlabId, SlabPayload};
use crate::types::{CompositeKind, NumberKind, Type};
use crate::values::{
    dynamic_type, structural_equal, EphemeralReference, EphemeralTarget, FunctionValue,
    HashableValue, InterpretedFunction, NumberValue, ReferenceValue, Value,
};

/// An assignable location.
pub(crate) enum Place {
    Var(VariableCell),
    Field { slab: SlabId, name: String },
    ArrayElement { slab: SlabId, index: usize },
    DictionaryKey { slab: SlabId, key: HashableValue },
}

fn unbound(name: &str, range: SourceRange) -> RuntimeError {
    RuntimeError::at(
        ErrorKind::Unexpected {
            message: format!("`{name}` is not bound"),
        },
        range,
    )
}

impl Interpreter {
    pub(crate) fn evaluate(
        &mut self,
        expression: &Expression,
        frame: &Rc<Activation>,
    ) -> Result<Value, RuntimeError> {
        match expression {
            Expression::BoolLiteral { value, .. } => Ok(Value::Bool(*value)),
            Expression::IntegerLiteral { value, kind, range } => {
                let number = NumberValue::from_bigint(*kind, value.clone())
                    .map_err(|error| error.with_range(*range))?;
                self.meter(number.memory_usage())?;
                Ok(Value::Number(number))
            }
            Expression::FixedPointLiteral { raw, kind, range } => {
                let number = match kind {
                    NumberKind::Fix64 => i64::try_from(*raw).map(NumberValue::Fix64).map_err(|_| {
                        RuntimeError::at(ErrorKind::Overflow, *range)
                    })?,
                    NumberKind::UFix64 => {
                        u64::try_from(*raw).map(NumberValue::UFix64).map_err(|_| {
                            RuntimeError::at(ErrorKind::Overflow, *range)
                        })?
                    }
                    other => {
                        return Err(RuntimeError::at(
                            ErrorKind::Unexpected {
                                message: format!("`{other}` is not a fixed-point kind"),
                            },
                            *range,
                        ));
                    }
                };
                self.meter(number.memory_usage())?;
                Ok(Value::Number(number))
            }
            Expression::StringLiteral { value, .. } => {
                self.meter(MemoryUsage::string(value.len() as u64))?;
                Ok(Value::string(value.as_str()))
            }
            Expression::NilLiteral { .. } => Ok(Value::Nil),
            Expression::AddressLiteral { value, .. } => {
                self.meter(MemoryUsage::new(MemoryKind::Address, 1))?;
                Ok(Value::Address(*value))
            }
            Expression::PathLiteral { value, .. } => {
                self.meter(MemoryUsage::new(MemoryKind::Path, 1))?;
                Ok(Value::Path(value.clone()))
            }
            Expression::ArrayLiteral {
                elements,
                element_type,
                ..
            } => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.evaluate_argument(element, frame)?);
                }
                self.meter(MemoryUsage::new(
                    MemoryKind::Array,
                    values.len() as u64 + 1,
                ))?;
                let id = self.heap.allocate(
                    None,
                    SlabPayload::Array(ArraySlab {
                        element_type: element_type.clone(),
                        constant_size: None,
                        elements: values,
                    }),
                );
                Ok(Value::Array(id))
            }
            Expression::DictionaryLiteral {
                entries,
                key_type,
                value_type,
                ..
            } => {
                let mut map = indexmap::IndexMap::with_capacity(entries.len());
                for (key_expression, value_expression) in entries {
                    let key_value = self.evaluate(key_expression, frame)?;
                    let key = HashableValue::from_value(&key_value, &self.heap)
                        .map_err(|error| error.with_range(key_expression.range()))?;
                    let value = self.evaluate_argument(value_expression, frame)?;
                    // A duplicate key replaces the prior entry but keeps the
                    // surviving key's insertion position.
                    map.insert(key, value);
                }
                self.meter(MemoryUsage::new(
                    MemoryKind::Dictionary,
                    map.len() as u64 + 1,
                ))?;
                let id = self.heap.allocate(
                    None,
                    SlabPayload::Dictionary(DictionarySlab {
                        key_type: key_type.clone(),
                        value_type: value_type.clone(),
                        entries: map,
                    }),
                );
                Ok(Value::Dictionary(id))
            }
            Expression::Identifier { name, range } => match frame.get(name) {
                Some(Value::Invalid) => {
                    Err(RuntimeError::at(ErrorKind::InvalidatedResource, *range))
                }
                Some(value) => Ok(value),
                None => self.resolve_contract_identifier(name, *range),
            },
            Expression::Member {
                target,
                name,
                optional_chaining,
                range,
            } => {
                let receiver = self.evaluate(target, frame)?;
                if *optional_chaining {
                    match receiver {
                        Value::Nil => Ok(Value::Nil),
                        Value::Some(inner) => {
                            let member = self.member_of(*inner, name, *range)?;
                            self.meter(MemoryUsage::new(MemoryKind::Optional, 1))?;
                            Ok(Value::some(member))
                        }
                        other => self.member_of(other, name, *range),
                    }
                } else {
                    self.member_of(receiver, name, *range)
                }
            }
            Expression::Index {
                target,
                index,
                range,
            } => {
                let receiver = self.evaluate(target, frame)?;
                let receiver = self.deref_if_reference(receiver, *range)?;
                let index_value = self.evaluate(index, frame)?;
                self.index_read(&receiver, &index_value, *range)
            }
            Expression::AttachmentAccess {
                target,
                attachment,
                range,
            } => {
                let receiver = self.evaluate(target, frame)?;
                let receiver = self.deref_if_reference(receiver, *range)?;
                self.attachment_access(&receiver, attachment, *range)
            }
            Expression::Invocation {
                function,
                type_arguments,
                arguments,
                range,
            } => self.evaluate_invocation(function, type_arguments, arguments, *range, frame),
            Expression::Binary {
                op,
                left,
                right,
                range,
            } => self.evaluate_binary(*op, left, right, *range, frame),
            Expression::Unary { op, operand, range } => {
                let value = self.evaluate(operand, frame)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!value.as_bool(*range)?)),
                    UnaryOp::Negate => {
                        let number = value.as_number(*range)?;
                        let negated = number
                            .checked_negate()
                            .map_err(|error| error.with_range(*range))?;
                        self.meter(negated.memory_usage())?;
                        Ok(Value::Number(negated))
                    }
                }
            }
            Expression::Cast {
                target,
                ty,
                kind,
                range,
            } => {
                let value = self.evaluate_argument(target, frame)?;
                self.evaluate_cast(value, ty, *kind, *range)
            }
            Expression::Force { target, range } => {
                let value = self.evaluate(target, frame)?;
                match value {
                    Value::Some(inner) => Ok(*inner),
                    Value::Nil => Err(RuntimeError::at(
                        ErrorKind::Unexpected {
                            message: "unexpectedly found nil while force-unwrapping".into(),
                        },
                        *range,
                    )),
                    other => Ok(other),
                }
            }
            Expression::Reference { target, ty, range } => {
                let value = self.evaluate(target, frame)?;
                self.make_ephemeral_reference(value, ty, *range)
            }
            Expression::Create { invocation, .. } => self.evaluate(invocation, frame),
            Expression::Attach {
                attachment,
                base,
                range,
            } => self.evaluate_attach(attachment, base, *range, frame),
            Expression::Conditional {
                condition,
                then_expression,
                else_expression,
                range,
            } => {
                let condition = self.evaluate(condition, frame)?.as_bool(*range)?;
                if condition {
                    self.evaluate(then_expression, frame)
                } else {
                    self.evaluate(else_expression, frame)
                }
            }
            Expression::Closure { function, .. } => {
                self.meter(MemoryUsage::new(MemoryKind::InterpretedFunction, 1))?;
                Ok(Value::Function(FunctionValue::Interpreted(Rc::new(
                    InterpretedFunction {
                        declaration: Rc::clone(function),
                        activation: Rc::clone(frame),
                        interfaces: Vec::new(),
                    },
                ))))
            }
            Expression::Before { index, range } => frame
                .get(&before_name(*index))
                .ok_or_else(|| unbound("before(...)", *range)),
        }
    }

    fn resolve_contract_identifier(
        &mut self,
        name: &str,
        range: SourceRange,
    ) -> Result<Value, RuntimeError> {
        let declaration = self
            .program()
            .composite_by_name(name)
            .filter(|composite| composite.kind == CompositeKind::Contract)
            .cloned();
        match declaration {
            Some(declaration) => self.contract_value(&declaration.identifier),
            None => Err(unbound(name, range)),
        }
    }

    /// Evaluates an expression in argument or element position: resources
    /// read out of a place are moved, leaving the place invalidated.
    pub(crate) fn evaluate_argument(
        &mut self,
        expression: &Expression,
        frame: &Rc<Activation>,
    ) -> Result<Value, RuntimeError> {
        self.evaluate_transfer(expression, frame, Transfer::Move)
    }

    pub(crate) fn evaluate_transfer(
        &mut self,
        expression: &Expression,
        frame: &Rc<Activation>,
        transfer: Transfer,
    ) -> Result<Value, RuntimeError> {
        let is_place = matches!(
            expression,
            Expression::Identifier { .. } | Expression::Member { .. } | Expression::Index { .. }
        );
        if transfer == Transfer::Copy || !is_place {
            return self.evaluate(expression, frame);
        }
        let value = self.evaluate(expression, frame)?;
        if !self.is_resource_value(&value) {
            return Ok(value);
        }
        // A resource read out of a place is a move: invalidate the source
        // slot and the lineage of any ephemeral references to it.
        let place = self.resolve_place(expression, frame)?;
        self.invalidate_place(place, expression.range())?;
        if let Some(id) = value.slab_id() {
            self.heap.bump_lineage(id);
        }
        Ok(value)
    }

    pub(crate) fn is_resource_value(&self, value: &Value) -> bool {
        let elaboration = self.elaboration();
        dynamic_type(value, &self.heap).is_resource_kinded(&*elaboration)
    }

    fn invalidate_place(&mut self, place: Place, range: SourceRange) -> Result<(), RuntimeError> {
        match place {
            Place::Var(cell) => {
                *cell.borrow_mut() = Value::Invalid;
                Ok(())
            }
            Place::Field { slab, name } => {
                let composite = self
                    .heap
                    .get_mut(slab)?
                    .payload
                    .as_composite_mut()
                    .ok_or_else(|| {
                        RuntimeError::at(
                            ErrorKind::Unexpected {
                                message: "field access on a non-composite".into(),
                            },
                            range,
                        )
                    })?;
                composite.fields.insert(name, Value::Invalid);
                Ok(())
            }
            Place::ArrayElement { slab, index } => {
                if let Some(array) = self.heap.get_mut(slab)?.payload.as_array_mut() {
                    if let Some(element) = array.elements.get_mut(index) {
                        *element = Value::Invalid;
                    }
                }
                Ok(())
            }
            Place::DictionaryKey { slab, key } => {
                if let Some(dictionary) = self.heap.get_mut(slab)?.payload.as_dictionary_mut() {
                    dictionary.entries.shift_remove(&key);
                }
                Ok(())
            }
        }
    }

    /// Resolves a place expression to an assignable location, dereferencing
    /// references along the way.
    pub(crate) fn resolve_place(
        &mut self,
        expression: &Expression,
        frame: &Rc<Activation>,
    ) -> Result<Place, RuntimeError> {
        match expression {
            Expression::Identifier { name, range } => frame
                .lookup(name)
                .map(Place::Var)
                .ok_or_else(|| unbound(name, *range)),
            Expression::Member { target, name, range, .. } => {
                let receiver = self.evaluate(target, frame)?;
                let receiver = self.deref_if_reference(receiver, *range)?;
                let Some(slab) = receiver.slab_id() else {
                    return Err(RuntimeError::at(
                        ErrorKind::MemberAccessType {
                            expected: "a composite".into(),
                            actual: receiver.category().into(),
                        },
                        *range,
                    ));
                };
                Ok(Place::Field {
                    slab,
                    name: name.clone(),
                })
            }
            Expression::Index { target, index, range } => {
                let receiver = self.evaluate(target, frame)?;
                let receiver = self.deref_if_reference(receiver, *range)?;
                let index_value = self.evaluate(index, frame)?;
                match receiver {
                    Value::Array(slab) => {
                        let length = self
                            .heap
                            .get(slab)?
                            .payload
                            .as_array()
                            .map(|array| array.elements.len())
                            .unwrap_or(0);
                        let index = array_index(&index_value, length, *range)?;
                        Ok(Place::ArrayElement { slab, index })
                    }
                    Value::Dictionary(slab) => {
                        let key = HashableValue::from_value(&index_value, &self.heap)
                            .map_err(|error| error.with_range(*range))?;
                        Ok(Place::DictionaryKey { slab, key })
                    }
                    other => Err(RuntimeError::at(
                        ErrorKind::MemberAccessType {
                            expected: "an array or dictionary".into(),
                            actual: other.category().into(),
                        },
                        *range,
                    )),
                }
            }
            other => Err(RuntimeError::at(
                ErrorKind::Unexpected {
                    message: "expression is not assignable".into(),
                },
                other.range(),
            )),
        }
    }

    pub(crate) fn read_place(&self, place: &Place, range: SourceRange) -> Result<Value, RuntimeError> {
        match place {
            Place::Var(cell) => Ok(cell.borrow().clone()),
            Place::Field { slab, name } => self
                .heap
                .get(*slab)?
                .payload
                .as_composite()
                .and_then(|composite| composite.fields.get(name).cloned())
                .ok_or_else(|| {
                    RuntimeError::at(
                        ErrorKind::MissingMemberValue { name: name.clone() },
                        range,
                    )
                }),
            Place::ArrayElement { slab, index } => self
                .heap
                .get(*slab)?
                .payload
                .as_array()
                .and_then(|array| array.elements.get(*index).cloned())
                .ok_or_else(|| {
                    RuntimeError::at(
                        ErrorKind::IndexOutOfBounds {
                            index: *index as i64,
                            size: 0,
                        },
                        range,
                    )
                }),
            Place::DictionaryKey { slab, key } => Ok(self
                .heap
                .get(*slab)?
                .payload
                .as_dictionary()
                .and_then(|dictionary| dictionary.entries.get(key).cloned())
                .map(Value::some)
                .unwrap_or(Value::Nil)),
        }
    }

    pub(crate) fn write_place(
        &mut self,
        place: Place,
        value: Value,
        range: SourceRange,
    ) -> Result<(), RuntimeError> {
        match place {
            Place::Var(cell) => {
                *cell.borrow_mut() = value;
                Ok(())
            }
            Place::Field { slab, name } => {
                let composite = self
                    .heap
                    .get_mut(slab)?
                    .payload
                    .as_composite_mut()
                    .ok_or_else(|| {
                        RuntimeError::at(
                            ErrorKind::MemberAccessType {
                                expected: "a composite".into(),
                                actual: "a non-composite slab".into(),
                            },
                            range,
                        )
                    })?;
                composite.fields.insert(name, value);
                Ok(())
            }
            Place::ArrayElement { slab, index } => {
                let array = self
                    .heap
                    .get_mut(slab)?
                    .payload
                    .as_array_mut()
                    .ok_or_else(|| {
                        RuntimeError::at(
                            ErrorKind::Unexpected {
                                message: "index assignment on a non-array slab".into(),
                            },
                            range,
                        )
                    })?;
                match array.elements.get_mut(index) {
                    Some(element) => {
                        *element = value;
                        Ok(())
                    }
                    None => Err(RuntimeError::at(
                        ErrorKind::IndexOutOfBounds {
                            index: index as i64,
                            size: array.elements.len(),
                        },
                        range,
                    )),
                }
            }
            Place::DictionaryKey { slab, key } => {
                let dictionary = self
                    .heap
                    .get_mut(slab)?
                    .payload
                    .as_dictionary_mut()
                    .ok_or_else(|| {
                        RuntimeError::at(
                            ErrorKind::Unexpected {
                                message: "key assignment on a non-dictionary slab".into(),
                            },
                            range,
                        )
                    })?;
                // Assigning nil removes the entry; anything else inserts.
                match value {
                    Value::Nil => {
                        dictionary.entries.shift_remove(&key);
                    }
                    Value::Some(inner) => {
                        dictionary.entries.insert(key, *inner);
                    }
                    other => {
                        dictionary.entries.insert(key, other);
                    }
                }
                Ok(())
            }
        }
    }

    /// Dereferences reference values for member/index access; everything
    /// else passes through.
    pub(crate) fn deref_if_reference(
        &mut self,
        value: Value,
        range: SourceRange,
    ) -> Result<Value, RuntimeError> {
        match value {
            Value::Reference(reference) => self.deref_reference(&reference, range),
            other => Ok(other),
        }
    }

    pub(crate) fn deref_reference(
        &mut self,
        reference: &ReferenceValue,
        range: SourceRange,
    ) -> Result<Value, RuntimeError> {
        match reference {
            ReferenceValue::Ephemeral(reference) => match &reference.target {
                EphemeralTarget::Inline(value) => Ok((**value).clone()),
                EphemeralTarget::Slab(id) => {
                    let slab = self.heap.get(*id).map_err(|error| error.with_range(range))?;
                    if let Some(composite) = slab.payload.as_composite() {
                        if composite.burned {
                            return Err(RuntimeError::at(
                                ErrorKind::InvalidatedResource,
                                range,
                            ));
                        }
                    }
                    if slab.lineage != reference.lineage {
                        return Err(RuntimeError::at(
                            ErrorKind::Dereference {
                                reason: "referenced value was moved out of its slot".into(),
                            },
                            range,
                        ));
                    }
                    Ok(match &slab.payload {
                        SlabPayload::Array(_) => Value::Array(*id),
                        SlabPayload::Dictionary(_) => Value::Dictionary(*id),
                        SlabPayload::Composite(_) => Value::Composite(*id),
                    })
                }
            },
            ReferenceValue::Storage(reference) => {
                let elaboration = self.elaboration();
                self.storage
                    .dereference(&self.heap, &*elaboration, reference, range)
            }
        }
    }

    pub(crate) fn make_ephemeral_reference(
        &mut self,
        value: Value,
        ty: &Type,
        range: SourceRange,
    ) -> Result<Value, RuntimeError> {
        self.meter(MemoryUsage::new(MemoryKind::Reference, 1))?;
        let (authorized, borrowed_type) = match ty {
            Type::Reference {
                authorized,
                referenced,
            } => (*authorized, (**referenced).clone()),
            other => (false, other.clone()),
        };
        let reference = match value.slab_id() {
            Some(id) => {
                if let Some(composite) = self
                    .heap
                    .try_get(id)
                    .and_then(|slab| slab.payload.as_composite())
                {
                    if composite.burned {
                        return Err(RuntimeError::at(ErrorKind::InvalidatedResource, range));
                    }
                }
                EphemeralReference {
                    authorized,
                    borrowed_type,
                    target: EphemeralTarget::Slab(id),
                    lineage: self.heap.lineage(id),
                }
            }
            None => EphemeralReference {
                authorized,
                borrowed_type,
                target: EphemeralTarget::Inline(Box::new(value)),
                lineage: 0,
            },
        };
        Ok(Value::Reference(Rc::new(ReferenceValue::Ephemeral(
            reference,
        ))))
    }

    fn evaluate_cast(
        &mut self,
        value: Value,
        ty: &Type,
        kind: CastKind,
        range: SourceRange,
    ) -> Result<Value, RuntimeError> {
        let elaboration = self.elaboration();
        match kind {
            CastKind::Static => {
                // `as` is widening or identity; the only runtime effect is
                // boxing into an optional target.
                if matches!(ty, Type::Optional(_))
                    && !matches!(value, Value::Some(_) | Value::Nil)
                {
                    self.meter(MemoryUsage::new(MemoryKind::Optional, 1))?;
                    return Ok(Value::some(value));
                }
                Ok(value)
            }
            CastKind::Conditional | CastKind::Force => {
                let actual = dynamic_type(&value, &self.heap);
                if actual.is_subtype_of(ty, &*elaboration) {
                    match kind {
                        CastKind::Conditional => {
                            self.meter(MemoryUsage::new(MemoryKind::Optional, 1))?;
                            Ok(Value::some(value))
                        }
                        _ => Ok(value),
                    }
                } else if kind == CastKind::Conditional {
                    // The failed target is dropped; a failed resource
                    // downcast would otherwise leak, so reject it.
                    if self.is_resource_value(&value) {
                        return Err(RuntimeError::at(
                            ErrorKind::ResourceLoss {
                                ty: actual.to_string(),
                            },
                            range,
                        ));
                    }
                    Ok(Value::Nil)
                } else {
                    Err(RuntimeError::at(
                        ErrorKind::ForceCastTypeMismatch {
                            expected: ty.to_string(),
                            actual: actual.to_string(),
                        },
                        range,
                    ))
                }
            }
        }
    }

    fn evaluate_invocation(
        &mut self,
        function: &Expression,
        type_arguments: &[Type],
        arguments: &[Argument],
        range: SourceRange,
        frame: &Rc<Activation>,
    ) -> Result<Value, RuntimeError> {
        if let Expression::Member {
            target,
            name,
            optional_chaining,
            ..
        } = function
        {
            let receiver = self.evaluate(target, frame)?;
            let receiver = if *optional_chaining {
                match receiver {
                    Value::Nil => return Ok(Value::Nil),
                    Value::Some(inner) => *inner,
                    other => other,
                }
            } else {
                receiver
            };
            let mut values = Vec::with_capacity(arguments.len());
            for argument in arguments {
                values.push(self.evaluate_argument(&argument.value, frame)?);
            }
            return self.invoke_member(receiver, name, type_arguments, values, range);
        }

        let callee = self.evaluate(function, frame)?;
        let mut values = Vec::with_capacity(arguments.len());
        for argument in arguments {
            values.push(self.evaluate_argument(&argument.value, frame)?);
        }
        match callee {
            Value::Function(function) => self.call_function(function, values, range),
            other => Err(RuntimeError::at(
                ErrorKind::Unexpected {
                    message: format!("cannot call {}", other.category()),
                },
                range,
            )),
        }
    }

    fn evaluate_binary(
        &mut self,
        op: BinaryOp,
        left: &Expression,
        right: &Expression,
        range: SourceRange,
        frame: &Rc<Activation>,
    ) -> Result<Value, RuntimeError> {
        // Short-circuiting forms evaluate the right operand lazily.
        match op {
            BinaryOp::And => {
                let left = self.evaluate(left, frame)?.as_bool(range)?;
                if !left {
                    return Ok(Value::Bool(false));
                }
                let right = self.evaluate(right, frame)?.as_bool(range)?;
                return Ok(Value::Bool(right));
            }
            BinaryOp::Or => {
                let left = self.evaluate(left, frame)?.as_bool(range)?;
                if left {
                    return Ok(Value::Bool(true));
                }
                let right = self.evaluate(right, frame)?.as_bool(range)?;
                return Ok(Value::Bool(right));
            }
            BinaryOp::NilCoalesce => {
                let left = self.evaluate(left, frame)?;
                return match left {
                    Value::Some(inner) => Ok(*inner),
                    Value::Nil => self.evaluate_argument(right, frame),
                    other => Ok(other),
                };
            }
            _ => {}
        }

        let left_value = self.evaluate(left, frame)?;
        let right_value = self.evaluate(right, frame)?;

        match op {
            BinaryOp::Equal => Ok(Value::Bool(structural_equal(
                &left_value,
                &right_value,
                &self.heap,
            ))),
            BinaryOp::NotEqual => Ok(Value::Bool(!structural_equal(
                &left_value,
                &right_value,
                &self.heap,
            ))),
            BinaryOp::Less
            | BinaryOp::LessEqual
            | BinaryOp::Greater
            | BinaryOp::GreaterEqual => {
                let ordering = left_value
                    .as_number(range)?
                    .compare(right_value.as_number(range)?)
                    .map_err(|error| error.with_range(range))?;
                let result = match op {
                    BinaryOp::Less => ordering.is_lt(),
                    BinaryOp::LessEqual => ordering.is_le(),
                    BinaryOp::Greater => ordering.is_gt(),
                    _ => ordering.is_ge(),
                };
                Ok(Value::Bool(result))
            }
            _ => {
                let left_number = left_value.as_number(range)?;
                let right_number = right_value.as_number(range)?;
                let result = match op {
                    BinaryOp::Add => left_number.checked_add(right_number),
                    BinaryOp::Subtract => left_number.checked_subtract(right_number),
                    BinaryOp::Multiply => left_number.checked_multiply(right_number),
                    BinaryOp::Divide => left_number.checked_divide(right_number),
                    BinaryOp::Remainder => left_number.checked_remainder(right_number),
                    BinaryOp::BitwiseAnd => left_number.bitwise_and(right_number),
                    BinaryOp::BitwiseOr => left_number.bitwise_or(right_number),
                    BinaryOp::BitwiseXor => left_number.bitwise_xor(right_number),
                    BinaryOp::ShiftLeft => left_number.shift_left(right_number),
                    BinaryOp::ShiftRight => left_number.shift_right(right_number),
                    _ => unreachable!("handled above"),
                }
                .map_err(|error| error.with_range(range))?;
                self.meter(result.memory_usage())?;
                Ok(Value::Number(result))
            }
        }
    }

    fn index_read(
        &mut self,
        receiver: &Value,
        index: &Value,
        range: SourceRange,
    ) -> Result<Value, RuntimeError> {
        match receiver {
            Value::Array(slab) => {
                let array = self
                    .heap
                    .get(*slab)?
                    .payload
                    .as_array()
                    .ok_or_else(|| missing_payload(range))?;
                let position = array_index(index, array.elements.len(), range)?;
                let value = array.elements[position].clone();
                if matches!(value, Value::Invalid) {
                    return Err(RuntimeError::at(ErrorKind::InvalidatedResource, range));
                }
                Ok(value)
            }
            Value::Dictionary(slab) => {
                let key = HashableValue::from_value(index, &self.heap)
                    .map_err(|error| error.with_range(range))?;
                let dictionary = self
                    .heap
                    .get(*slab)?
                    .payload
                    .as_dictionary()
                    .ok_or_else(|| missing_payload(range))?;
                match dictionary.entries.get(&key) {
                    Some(value) => {
                        self.meter(MemoryUsage::new(MemoryKind::Optional, 1))?;
                        Ok(Value::some(value.clone()))
                    }
                    None => Ok(Value::Nil),
                }
            }
            other => Err(RuntimeError::at(
                ErrorKind::MemberAccessType {
                    expected: "an array or dictionary".into(),
                    actual: other.category().into(),
                },
                range,
            )),
        }
    }
}

fn missing_payload(range: SourceRange) -> RuntimeError {
    RuntimeError::at(
        ErrorKind::Unexpected {
            message: "slab payload does not match its handle".into(),
        },
        range,
    )
}

/// Converts an index value to a bounds-checked array position.
pub(crate) fn array_index(
    index: &Value,
    length: usize,
    range: SourceRange,
) -> Result<usize, RuntimeError> {
    let number = index.as_number(range)?;
    let position = number
        .to_bigint()
        .and_then(|value| num_traits::ToPrimitive::to_i64(&value))
        .ok_or_else(|| {
            RuntimeError::at(
                ErrorKind::Unexpected {
                    message: "array index must be an integer".into(),
                },
                range,
            )
        })?;
    if position < 0 || position as usize >= length {
        return Err(RuntimeError::at(
            ErrorKind::IndexOutOfBounds {
                index: position,
                size: length,
            },
            range,
        ));
    }
    Ok(position as usize)
}
