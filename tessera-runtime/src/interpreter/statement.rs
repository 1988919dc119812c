// Copyright 2024-2026, Tessera Labs, Inc.
// For licensing, see https://github.com/tessera-lang/tessera-rs/blob/main/licenses/COPYRIGHT.md

//! Statement execution.

use std::rc::Rc;

use tessera_core::{ErrorKind, RuntimeError, SourceRange};

use super::{Control, Interpreter};
use crate::ast::{Block, Statement};
use crate::env::Activation;
use crate::values::{dynamic_type, Value};

impl Interpreter {
    pub(crate) fn execute_block(
        &mut self,
        block: &Block,
        frame: &Rc<Activation>,
    ) -> Result<Control, RuntimeError> {
        for statement in &block.statements {
            match self.execute_statement(statement, frame)? {
                Control::Normal => {}
                exit => return Ok(exit),
            }
        }
        Ok(Control::Normal)
    }

    fn execute_statement(
        &mut self,
        statement: &Statement,
        frame: &Rc<Activation>,
    ) -> Result<Control, RuntimeError> {
        match statement {
            Statement::VariableDeclaration {
                name,
                transfer,
                value,
                range,
            } => {
                let value = self.evaluate_transfer(value, frame, *transfer)?;
                if matches!(value, Value::Invalid) {
                    return Err(RuntimeError::at(ErrorKind::InvalidatedResource, *range));
                }
                frame.define(name, value);
                Ok(Control::Normal)
            }
            Statement::Assignment {
                target,
                transfer,
                value,
                range,
            } => {
                let value = self.evaluate_transfer(value, frame, *transfer)?;
                let place = self.resolve_place(target, frame)?;
                // Overwriting a live resource would silently lose it.
                if let Ok(old) = self.read_place(&place, *range) {
                    self.ensure_no_resource_overwrite(&old, *range)?;
                }
                self.write_place(place, value, *range)?;
                Ok(Control::Normal)
            }
            Statement::Swap { left, right, range } => {
                let left_place = self.resolve_place(left, frame)?;
                let right_place = self.resolve_place(right, frame)?;
                let left_value = self.read_place(&left_place, *range)?;
                let right_value = self.read_place(&right_place, *range)?;
                if matches!(left_value, Value::Invalid) || matches!(right_value, Value::Invalid) {
                    return Err(RuntimeError::at(ErrorKind::InvalidatedResource, *range));
                }
                for value in [&left_value, &right_value] {
                    if let Some(id) = value.slab_id() {
                        if self.is_resource_value(value) {
                            self.heap.bump_lineage(id);
                        }
                    }
                }
                self.write_place(left_place, right_value, *range)?;
                self.write_place(right_place, left_value, *range)?;
                Ok(Control::Normal)
            }
            Statement::If {
                condition,
                then_block,
                else_block,
                range,
            } => {
                let condition = self.evaluate(condition, frame)?.as_bool(*range)?;
                if condition {
                    let block_frame = Activation::child(frame);
                    self.execute_block(then_block, &block_frame)
                } else if let Some(else_block) = else_block {
                    let block_frame = Activation::child(frame);
                    self.execute_block(else_block, &block_frame)
                } else {
                    Ok(Control::Normal)
                }
            }
            Statement::While {
                condition,
                block,
                range,
            } => {
                loop {
                    if !self.evaluate(condition, frame)?.as_bool(*range)? {
                        break;
                    }
                    let block_frame = Activation::child(frame);
                    match self.execute_block(block, &block_frame)? {
                        Control::Normal | Control::Continue => {}
                        Control::Break => break,
                        control @ Control::Return(_) => return Ok(control),
                    }
                }
                Ok(Control::Normal)
            }
            Statement::Return { value, .. } => {
                let value = match value {
                    Some(expression) => self.evaluate_argument(expression, frame)?,
                    None => Value::Void,
                };
                Ok(Control::Return(value))
            }
            Statement::Break { .. } => Ok(Control::Break),
            Statement::Continue { .. } => Ok(Control::Continue),
            Statement::Expression { expression, range } => {
                let value = self.evaluate(expression, frame)?;
                // A resource produced and immediately discarded is lost.
                if self.is_resource_value(&value) && !self.is_burned(&value) {
                    return Err(RuntimeError::at(
                        ErrorKind::ResourceLoss {
                            ty: dynamic_type(&value, &self.heap).to_string(),
                        },
                        *range,
                    ));
                }
                Ok(Control::Normal)
            }
            Statement::Destroy { expression, range } => {
                let value = self.evaluate_argument(expression, frame)?;
                self.destroy_value(value, *range)?;
                Ok(Control::Normal)
            }
            Statement::Emit { event, range } => {
                self.emit_event_expression(event, frame, *range)?;
                Ok(Control::Normal)
            }
            Statement::RemoveAttachment {
                attachment,
                target,
                range,
            } => {
                let receiver = self.evaluate(target, frame)?;
                let receiver = self.deref_if_reference(receiver, *range)?;
                self.remove_attachment(&receiver, attachment, *range)?;
                Ok(Control::Normal)
            }
        }
    }

    pub(crate) fn ensure_no_resource_overwrite(
        &self,
        old: &Value,
        range: SourceRange,
    ) -> Result<(), RuntimeError> {
        let old = match old {
            Value::Some(inner) => inner,
            other => other,
        };
        if self.is_resource_value(old) && !self.is_burned(old) {
            return Err(RuntimeError::at(
                ErrorKind::ResourceLoss {
                    ty: dynamic_type(old, &self.heap).to_string(),
                },
                range,
            ));
        }
        Ok(())
    }

    pub(crate) fn is_burned(&self, value: &Value) -> bool {
        value
            .slab_id()
            .and_then(|id| self.heap.try_get(id))
            .and_then(|slab| slab.payload.as_composite())
            .is_some_and(|composite| composite.burned)
    }
}
