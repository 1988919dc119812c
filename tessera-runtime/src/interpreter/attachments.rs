// Copyright 2024-2026, Tessera Labs, Inc.
// For licensing, see https://github.com/tessera-lang/tessera-rs/blob/main/licenses/COPYRIGHT.md

//! Attachments and destruction.
//!
//! Attachments share their carrier's ownership and lifetime. The carrier's
//! attachment map carries a recursion counter: `forEachAttachment`
//! increments it on entry, and any attach or remove while it is non-zero
//! raises. Destruction runs attachments in reverse attach order, then the
//! carrier's destructor, then any still-live resource fields, and finally
//! burns the slab so stale references raise `InvalidatedResource`.

use std::rc::Rc;

use tessera_core::{ErrorKind, MemoryKind, MemoryUsage, QualifiedId, RuntimeError, SourceRange};

use super::Interpreter;
use crate::ast::Expression;
use crate::env::Activation;
use crate::heap::SlabId;
use crate::types::{CompositeKind, Type};
use crate::values::{
    dynamic_type, EphemeralReference, EphemeralTarget, FunctionValue, InterpretedFunction,
    ReferenceValue, Value,
};

impl Interpreter {
    /// `attach A(...) to base`: evaluates the base (moving a resource
    /// carrier), constructs the attachment with `base` in scope, and
    /// attaches it. Previously attached attachments are visible during the
    /// new attachment's initializer; the new one is attached only after its
    /// initializer returns.
    pub(crate) fn evaluate_attach(
        &mut self,
        attachment: &Expression,
        base: &Expression,
        range: SourceRange,
        frame: &Rc<Activation>,
    ) -> Result<Value, RuntimeError> {
        let carrier = self.evaluate_argument(base, frame)?;
        let Some(carrier_id) = carrier.slab_id() else {
            return Err(RuntimeError::at(
                ErrorKind::MemberAccessType {
                    expected: "a composite".into(),
                    actual: carrier.category().into(),
                },
                range,
            ));
        };
        self.check_attachment_mutation(carrier_id, range)?;

        let Expression::Invocation {
            function,
            arguments,
            ..
        } = attachment
        else {
            return Err(RuntimeError::at(
                ErrorKind::Unexpected {
                    message: "attach requires an attachment constructor invocation".into(),
                },
                range,
            ));
        };
        let callee = self.evaluate(function, frame)?;
        let Value::Function(FunctionValue::Constructor(declaration)) = callee else {
            return Err(RuntimeError::at(
                ErrorKind::Unexpected {
                    message: "attach requires an attachment constructor".into(),
                },
                range,
            ));
        };
        if declaration.kind != CompositeKind::Attachment {
            return Err(RuntimeError::at(
                ErrorKind::Unexpected {
                    message: format!("`{}` is not an attachment", declaration.identifier),
                },
                range,
            ));
        }

        let carrier_type = dynamic_type(&carrier, &self.heap);
        if let Some(base_type) = &declaration.base_type {
            let elaboration = self.elaboration();
            if !carrier_type.is_subtype_of(base_type, &*elaboration) {
                return Err(RuntimeError::at(
                    ErrorKind::MemberAccessType {
                        expected: base_type.to_string(),
                        actual: carrier_type.to_string(),
                    },
                    range,
                ));
            }
        }
        {
            let composite = self
                .heap
                .get(carrier_id)?
                .payload
                .as_composite()
                .ok_or_else(|| {
                    RuntimeError::at(
                        ErrorKind::MemberAccessType {
                            expected: "a composite".into(),
                            actual: "a container".into(),
                        },
                        range,
                    )
                })?;
            if composite.burned {
                return Err(RuntimeError::at(ErrorKind::InvalidatedResource, range));
            }
            if composite.attachments.contains_key(&declaration.identifier) {
                return Err(RuntimeError::at(
                    ErrorKind::DuplicateAttachment {
                        attachment: declaration.identifier.to_string(),
                    },
                    range,
                ));
            }
        }

        let mut argument_values = Vec::with_capacity(arguments.len());
        for argument in arguments {
            argument_values.push(self.evaluate_argument(&argument.value, frame)?);
        }

        let base_reference = self.make_ephemeral_reference(
            carrier.clone(),
            &Type::reference(false, carrier_type),
            range,
        )?;
        let attachment_value =
            self.construct_composite(&declaration, argument_values, Some(base_reference), range)?;

        if let Some(attachment_id) = attachment_value.slab_id() {
            if let Some(slab) = self
                .heap
                .get_mut(attachment_id)?
                .payload
                .as_composite_mut()
            {
                slab.attached_to = Some(carrier_id);
            }
        }
        let composite = self
            .heap
            .get_mut(carrier_id)?
            .payload
            .as_composite_mut()
            .expect("checked above");
        composite
            .attachments
            .insert(declaration.identifier.clone(), attachment_value);

        Ok(carrier)
    }

    /// `v[A]`: a reference to the attachment of type `A`, or nil.
    pub(crate) fn attachment_access(
        &mut self,
        receiver: &Value,
        attachment: &QualifiedId,
        range: SourceRange,
    ) -> Result<Value, RuntimeError> {
        let composite = self.expect_composite(receiver, range)?;
        let Some(value) = composite.attachments.get(attachment).cloned() else {
            return Ok(Value::Nil);
        };
        let reference = self.make_ephemeral_reference(
            value,
            &Type::reference(false, Type::Composite(attachment.clone())),
            range,
        )?;
        self.meter(MemoryUsage::new(MemoryKind::Optional, 1))?;
        Ok(Value::some(reference))
    }

    /// `remove A from v`: detaches and destroys the attachment. Removing an
    /// attachment that is not present is a no-op.
    pub(crate) fn remove_attachment(
        &mut self,
        receiver: &Value,
        attachment: &QualifiedId,
        range: SourceRange,
    ) -> Result<(), RuntimeError> {
        let Some(carrier_id) = receiver.slab_id() else {
            return Err(RuntimeError::at(
                ErrorKind::MemberAccessType {
                    expected: "a composite".into(),
                    actual: receiver.category().into(),
                },
                range,
            ));
        };
        self.check_attachment_mutation(carrier_id, range)?;
        let removed = {
            let composite = self
                .heap
                .get_mut(carrier_id)?
                .payload
                .as_composite_mut()
                .ok_or_else(|| missing_composite(range))?;
            composite.attachments.shift_remove(attachment)
        };
        if let Some(removed) = removed {
            self.destroy_value(removed, range)?;
        }
        Ok(())
    }

    /// `v.forEachAttachment(fn)`: iterates in attach order. Iteration locks
    /// the carrier's attachment map; attach/remove on it raise until the
    /// iteration completes. Nested iteration over the same carrier is
    /// rejected the same way.
    pub(crate) fn for_each_attachment(
        &mut self,
        receiver: &Value,
        function: FunctionValue,
        range: SourceRange,
    ) -> Result<(), RuntimeError> {
        let Some(carrier_id) = receiver.slab_id() else {
            return Err(RuntimeError::at(
                ErrorKind::MemberAccessType {
                    expected: "a composite".into(),
                    actual: receiver.category().into(),
                },
                range,
            ));
        };
        let attachments: Vec<(QualifiedId, Value)> = {
            let composite = self
                .heap
                .get_mut(carrier_id)?
                .payload
                .as_composite_mut()
                .ok_or_else(|| missing_composite(range))?;
            if composite.iteration_depth > 0 {
                return Err(RuntimeError::at(
                    ErrorKind::AttachmentIterationMutation,
                    range,
                ));
            }
            composite.iteration_depth += 1;
            composite
                .attachments
                .iter()
                .map(|(id, value)| (id.clone(), value.clone()))
                .collect()
        };

        let result = (|| {
            for (type_id, attachment) in attachments {
                let reference = self.make_ephemeral_reference(
                    attachment,
                    &Type::reference(false, Type::Composite(type_id)),
                    range,
                )?;
                self.call_function(function.clone(), vec![reference], range)?;
            }
            Ok(())
        })();

        if let Ok(slab) = self.heap.get_mut(carrier_id) {
            if let Some(composite) = slab.payload.as_composite_mut() {
                composite.iteration_depth = composite.iteration_depth.saturating_sub(1);
            }
        }
        result
    }

    fn check_attachment_mutation(
        &self,
        carrier_id: SlabId,
        range: SourceRange,
    ) -> Result<(), RuntimeError> {
        let locked = self
            .heap
            .try_get(carrier_id)
            .and_then(|slab| slab.payload.as_composite())
            .is_some_and(|composite| composite.iteration_depth > 0);
        if locked {
            return Err(RuntimeError::at(
                ErrorKind::AttachmentIterationMutation,
                range,
            ));
        }
        Ok(())
    }

    fn expect_composite(
        &self,
        value: &Value,
        range: SourceRange,
    ) -> Result<crate::heap::CompositeSlab, RuntimeError> {
        let Some(id) = value.slab_id() else {
            return Err(RuntimeError::at(
                ErrorKind::MemberAccessType {
                    expected: "a composite".into(),
                    actual: value.category().into(),
                },
                range,
            ));
        };
        let composite = self
            .heap
            .get(id)?
            .payload
            .as_composite()
            .ok_or_else(|| missing_composite(range))?
            .clone();
        if composite.burned {
            return Err(RuntimeError::at(ErrorKind::InvalidatedResource, range));
        }
        Ok(composite)
    }

    /// `destroy v`. Optionals destroy their inner value, containers destroy
    /// their elements and free their slab, composites run the destruction
    /// protocol.
    pub(crate) fn destroy_value(
        &mut self,
        value: Value,
        range: SourceRange,
    ) -> Result<(), RuntimeError> {
        match value {
            Value::Nil | Value::Void => Ok(()),
            Value::Some(inner) => self.destroy_value(*inner, range),
            Value::Invalid => Err(RuntimeError::at(ErrorKind::InvalidatedResource, range)),
            Value::Array(id) => {
                let elements = self
                    .heap
                    .get(id)?
                    .payload
                    .as_array()
                    .map(|array| array.elements.clone())
                    .unwrap_or_default();
                for element in elements {
                    if !matches!(element, Value::Invalid) {
                        self.destroy_value(element, range)?;
                    }
                }
                self.heap.remove(id)?;
                Ok(())
            }
            Value::Dictionary(id) => {
                let values: Vec<Value> = self
                    .heap
                    .get(id)?
                    .payload
                    .as_dictionary()
                    .map(|dictionary| dictionary.entries.values().cloned().collect())
                    .unwrap_or_default();
                for value in values {
                    if !matches!(value, Value::Invalid) {
                        self.destroy_value(value, range)?;
                    }
                }
                self.heap.remove(id)?;
                Ok(())
            }
            Value::Composite(id) => self.destroy_composite(id, range),
            other => Err(RuntimeError::at(
                ErrorKind::Unexpected {
                    message: format!("cannot destroy {}", other.category()),
                },
                range,
            )),
        }
    }

    /// Destruction order: attachments in reverse attach order, then the
    /// carrier's own destructor, then any resource fields the destructor
    /// left live, then the burn.
    fn destroy_composite(&mut self, id: SlabId, range: SourceRange) -> Result<(), RuntimeError> {
        let (qualified_id, attachments) = {
            let composite = self
                .heap
                .get(id)?
                .payload
                .as_composite()
                .ok_or_else(|| missing_composite(range))?;
            if composite.burned {
                return Err(RuntimeError::at(ErrorKind::InvalidatedResource, range));
            }
            if composite.iteration_depth > 0 {
                return Err(RuntimeError::at(
                    ErrorKind::AttachmentIterationMutation,
                    range,
                ));
            }
            (
                composite.qualified_id.clone(),
                composite
                    .attachments
                    .iter()
                    .map(|(_, value)| value.clone())
                    .collect::<Vec<_>>(),
            )
        };

        for attachment in attachments.into_iter().rev() {
            self.destroy_value(attachment, range)?;
        }
        if let Some(composite) = self.heap.get_mut(id)?.payload.as_composite_mut() {
            composite.attachments.clear();
        }

        let declaration = self.program().composite(&qualified_id).cloned();
        if let Some(destructor) = declaration.as_ref().and_then(|d| d.destructor.clone()) {
            let base_value = self.attachment_base_reference(id, range)?;
            let function = Rc::new(InterpretedFunction {
                declaration: destructor,
                activation: self.globals(),
                interfaces: Vec::new(),
            });
            self.call_interpreted(
                &function,
                Some(Value::Composite(id)),
                base_value,
                Vec::new(),
                range,
            )?;
        }

        let fields: Vec<Value> = self
            .heap
            .get(id)?
            .payload
            .as_composite()
            .map(|composite| composite.fields.values().cloned().collect())
            .unwrap_or_default();
        for field in fields {
            if matches!(field, Value::Invalid) {
                continue;
            }
            if self.is_resource_value(&field) && !self.is_burned(&field) {
                self.destroy_value(field, range)?;
            }
        }

        if let Some(composite) = self.heap.get_mut(id)?.payload.as_composite_mut() {
            composite.burned = true;
        }
        Ok(())
    }

    /// The `base` binding for attachment methods and destructors, derived
    /// from the attachment's back-pointer.
    pub(crate) fn attachment_base_reference(
        &mut self,
        id: SlabId,
        range: SourceRange,
    ) -> Result<Option<Value>, RuntimeError> {
        let carrier = {
            let composite = self
                .heap
                .get(id)?
                .payload
                .as_composite()
                .ok_or_else(|| missing_composite(range))?;
            if composite.kind != CompositeKind::Attachment {
                return Ok(None);
            }
            composite.attached_to
        };
        let Some(carrier_id) = carrier else {
            return Ok(None);
        };
        self.meter(MemoryUsage::new(MemoryKind::Reference, 1))?;
        let carrier_type = dynamic_type(&Value::Composite(carrier_id), &self.heap);
        Ok(Some(Value::Reference(Rc::new(ReferenceValue::Ephemeral(
            EphemeralReference {
                authorized: false,
                borrowed_type: carrier_type,
                target: EphemeralTarget::Slab(carrier_id),
                lineage: self.heap.lineage(carrier_id),
            },
        )))))
    }
}

fn missing_composite(range: SourceRange) -> RuntimeError {
    RuntimeError::at(
        ErrorKind::Unexpected {
            message: "composite handle does not point at a composite".into(),
        },
        range,
    )
}
