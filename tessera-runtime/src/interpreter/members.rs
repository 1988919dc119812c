// Copyright 2024-2026, Tessera Labs, Inc.
// For licensing, see https://github.com/tessera-lang/tessera-rs/blob/main/licenses/COPYRIGHT.md

//! Member access and built-in member functions.
//!
//! Property reads go through [`Interpreter::member_of`]; member calls go
//! through [`Interpreter::invoke_member`], which handles the built-in
//! members of strings, arrays, dictionaries, numbers, capabilities, and
//! accounts, and falls back to user-declared methods bound to their
//! receiver. References auto-dereference for both paths.

use std::rc::Rc;

use num_bigint::BigInt;
use tessera_core::{ErrorKind, MemoryKind, MemoryUsage, RuntimeError, SourceRange, StoragePath};

use super::Interpreter;
use crate::heap::{ArraySlab, CompositeSlab, SlabId, SlabPayload};
use crate::types::{CompositeKind, NumberKind, Type};
use crate::values::{
    dynamic_type, render, structural_equal, AccountHandle, BoundFunction, FunctionValue,
    HashableValue, InterpretedFunction, NumberValue, Value,
};

fn missing_member(name: &str, range: SourceRange) -> RuntimeError {
    RuntimeError::at(
        ErrorKind::MissingMemberValue {
            name: name.to_owned(),
        },
        range,
    )
}

fn wrong_argument(expected: &str, actual: &Value, range: SourceRange) -> RuntimeError {
    RuntimeError::at(
        ErrorKind::MemberAccessType {
            expected: expected.to_owned(),
            actual: actual.category().to_owned(),
        },
        range,
    )
}

fn expect_path(value: &Value, range: SourceRange) -> Result<StoragePath, RuntimeError> {
    match value {
        Value::Path(path) => Ok(path.clone()),
        other => Err(wrong_argument("a path", other, range)),
    }
}

pub(crate) fn expect_address(
    value: &Value,
    range: SourceRange,
) -> Result<tessera_core::AccountAddress, RuntimeError> {
    match value {
        Value::Address(address) => Ok(*address),
        other => Err(wrong_argument("an address", other, range)),
    }
}

impl Interpreter {
    /// Reads a member as a value: fields, properties, bound user methods,
    /// enum cases on type values.
    pub(crate) fn member_of(
        &mut self,
        receiver: Value,
        name: &str,
        range: SourceRange,
    ) -> Result<Value, RuntimeError> {
        match receiver {
            Value::Reference(reference) => {
                let target = self.deref_reference(&reference, range)?;
                self.member_of(target, name, range)
            }
            Value::Composite(id) => self.composite_member(id, name, range),
            Value::Account(handle) => match name {
                "address" => Ok(Value::Address(handle.address)),
                _ => Err(missing_member(name, range)),
            },
            Value::String(text) => match name {
                "length" => Ok(Value::int(text.chars().count() as i64)),
                "utf8" => {
                    let bytes: Vec<Value> = text
                        .as_bytes()
                        .iter()
                        .map(|byte| Value::Number(NumberValue::UInt8(*byte)))
                        .collect();
                    self.meter(MemoryUsage::new(MemoryKind::Array, bytes.len() as u64 + 1))?;
                    let id = self.heap.allocate(
                        None,
                        SlabPayload::Array(ArraySlab {
                            element_type: Type::Number(NumberKind::UInt8),
                            constant_size: None,
                            elements: bytes,
                        }),
                    );
                    Ok(Value::Array(id))
                }
                _ => Err(missing_member(name, range)),
            },
            Value::Array(id) => match name {
                "length" => {
                    let length = self
                        .heap
                        .get(id)?
                        .payload
                        .as_array()
                        .map(|array| array.elements.len())
                        .unwrap_or(0);
                    Ok(Value::int(length as i64))
                }
                _ => Err(missing_member(name, range)),
            },
            Value::Dictionary(id) => match name {
                "length" => {
                    let length = self
                        .heap
                        .get(id)?
                        .payload
                        .as_dictionary()
                        .map(|dictionary| dictionary.entries.len())
                        .unwrap_or(0);
                    Ok(Value::int(length as i64))
                }
                "keys" => {
                    let (key_type, keys) = {
                        let dictionary = self
                            .heap
                            .get(id)?
                            .payload
                            .as_dictionary()
                            .ok_or_else(|| missing_member(name, range))?;
                        (
                            dictionary.key_type.clone(),
                            dictionary
                                .entries
                                .keys()
                                .map(HashableValue::to_value)
                                .collect::<Vec<_>>(),
                        )
                    };
                    self.meter(MemoryUsage::new(MemoryKind::Array, keys.len() as u64 + 1))?;
                    let array = self.heap.allocate(
                        None,
                        SlabPayload::Array(ArraySlab {
                            element_type: key_type,
                            constant_size: None,
                            elements: keys,
                        }),
                    );
                    Ok(Value::Array(array))
                }
                "values" => {
                    let (value_type, values) = {
                        let dictionary = self
                            .heap
                            .get(id)?
                            .payload
                            .as_dictionary()
                            .ok_or_else(|| missing_member(name, range))?;
                        (
                            dictionary.value_type.clone(),
                            dictionary.entries.values().cloned().collect::<Vec<_>>(),
                        )
                    };
                    self.meter(MemoryUsage::new(MemoryKind::Array, values.len() as u64 + 1))?;
                    let array = self.heap.allocate(
                        None,
                        SlabPayload::Array(ArraySlab {
                            element_type: value_type,
                            constant_size: None,
                            elements: values,
                        }),
                    );
                    Ok(Value::Array(array))
                }
                _ => Err(missing_member(name, range)),
            },
            Value::Capability(capability) => match name {
                "address" => Ok(Value::Address(capability.address)),
                "path" => Ok(Value::Path(capability.path.clone())),
                _ => Err(missing_member(name, range)),
            },
            Value::Type(ty) => self.type_member(&ty, name, range),
            other => Err(missing_member(name, range).caused_by(
                RuntimeError::new(ErrorKind::MemberAccessType {
                    expected: "a value with members".into(),
                    actual: other.category().into(),
                }),
            )),
        }
    }

    fn composite_member(
        &mut self,
        id: SlabId,
        name: &str,
        range: SourceRange,
    ) -> Result<Value, RuntimeError> {
        let (qualified_id, kind, field, owner, attached_to, burned) = {
            let composite = self
                .heap
                .get(id)?
                .payload
                .as_composite()
                .ok_or_else(|| missing_member(name, range))?;
            (
                composite.qualified_id.clone(),
                composite.kind,
                composite.fields.get(name).cloned(),
                self.heap.owner_of(id),
                composite.attached_to,
                composite.burned,
            )
        };
        if burned {
            return Err(RuntimeError::at(ErrorKind::InvalidatedResource, range));
        }
        if let Some(value) = field {
            if matches!(value, Value::Invalid) {
                return Err(RuntimeError::at(ErrorKind::InvalidatedResource, range));
            }
            return Ok(value);
        }
        if name == "owner" {
            return Ok(match owner {
                Some(address) => Value::some(Value::Account(AccountHandle {
                    address,
                    authorized: false,
                })),
                None => Value::Nil,
            });
        }

        if let Some(method) = self.program().method(&qualified_id, name).cloned() {
            let interfaces = self
                .program()
                .method_condition_wrappers(&qualified_id, name)
                .to_vec();
            let base = if kind == CompositeKind::Attachment && attached_to.is_some() {
                self.attachment_base_reference(id, range)?
            } else {
                None
            };
            return Ok(Value::Function(FunctionValue::Bound(Rc::new(
                BoundFunction {
                    receiver: Value::Composite(id),
                    base,
                    function: FunctionValue::Interpreted(Rc::new(InterpretedFunction {
                        declaration: method,
                        activation: self.globals(),
                        interfaces,
                    })),
                },
            ))));
        }

        // Contract members include nested type constructors.
        if kind == CompositeKind::Contract {
            if let Some(declaration) = self.program().composite(&qualified_id).cloned() {
                if let Some(nested) = declaration
                    .nested_composites
                    .iter()
                    .find(|nested| nested.identifier.simple_name() == name)
                {
                    return Ok(match nested.kind {
                        CompositeKind::Enum => {
                            Value::Type(Box::new(Type::Composite(nested.identifier.clone())))
                        }
                        _ => Value::Function(FunctionValue::Constructor(Rc::clone(nested))),
                    });
                }
            }
        }

        Err(missing_member(name, range))
    }

    /// Members on type values: enum cases and the type identifier.
    fn type_member(
        &mut self,
        ty: &Type,
        name: &str,
        range: SourceRange,
    ) -> Result<Value, RuntimeError> {
        if name == "identifier" {
            self.meter(MemoryUsage::string(ty.to_string().len() as u64))?;
            return Ok(Value::string(ty.to_string()));
        }
        let Type::Composite(qualified_id) = ty else {
            return Err(missing_member(name, range));
        };
        let Some(declaration) = self.program().composite(qualified_id).cloned() else {
            return Err(missing_member(name, range));
        };
        let Some(case_index) = declaration.enum_cases.iter().position(|case| case == name) else {
            return Err(missing_member(name, range));
        };
        let raw_kind = declaration.enum_raw_type.unwrap_or(NumberKind::UInt8);
        let raw = NumberValue::from_bigint(raw_kind, BigInt::from(case_index))
            .map_err(|error| error.with_range(range))?;
        self.meter(MemoryUsage::new(MemoryKind::Composite, 1))?;
        let mut slab = CompositeSlab::new(declaration.identifier.clone(), CompositeKind::Enum);
        slab.fields.insert("rawValue".to_owned(), Value::Number(raw));
        let id = self.heap.allocate(None, SlabPayload::Composite(slab));
        Ok(Value::Composite(id))
    }

    /// Invokes a member: built-ins first, then user methods.
    pub(crate) fn invoke_member(
        &mut self,
        receiver: Value,
        name: &str,
        type_arguments: &[Type],
        arguments: Vec<Value>,
        range: SourceRange,
    ) -> Result<Value, RuntimeError> {
        // Universal members, valid on every value.
        match name {
            "getType" => {
                self.meter(MemoryUsage::new(MemoryKind::TypeValue, 1))?;
                return Ok(Value::Type(Box::new(dynamic_type(&receiver, &self.heap))));
            }
            "isInstance" => {
                let Some(Value::Type(ty)) = arguments.first() else {
                    return Err(wrong_argument(
                        "a type value",
                        arguments.first().unwrap_or(&Value::Nil),
                        range,
                    ));
                };
                let elaboration = self.elaboration();
                let actual = dynamic_type(&receiver, &self.heap);
                return Ok(Value::Bool(actual.is_subtype_of(ty, &*elaboration)));
            }
            _ => {}
        }

        match receiver {
            Value::Reference(reference) => {
                let target = self.deref_reference(&reference, range)?;
                self.invoke_member(target, name, type_arguments, arguments, range)
            }
            Value::Number(number) => self.number_method(&number, name, arguments, range),
            Value::String(text) => self.string_method(&text, name, arguments, range),
            Value::Array(id) => self.array_method(id, name, arguments, range),
            Value::Dictionary(id) => self.dictionary_method(id, name, arguments, range),
            Value::Capability(capability) => {
                let elaboration = self.elaboration();
                let requested = type_arguments.first();
                match name {
                    "borrow" => {
                        match self.storage.borrow_capability(
                            &self.heap,
                            &*elaboration,
                            &capability,
                            requested,
                        )? {
                            Some(reference) => {
                                self.meter(MemoryUsage::new(MemoryKind::Reference, 1))?;
                                self.meter(MemoryUsage::new(MemoryKind::Optional, 1))?;
                                Ok(Value::some(reference))
                            }
                            None => Ok(Value::Nil),
                        }
                    }
                    "check" => {
                        let valid = self.storage.check_capability(
                            &self.heap,
                            &*elaboration,
                            &capability,
                            requested,
                        )?;
                        Ok(Value::Bool(valid))
                    }
                    _ => Err(missing_member(name, range)),
                }
            }
            Value::Account(handle) => {
                self.account_method(handle, name, type_arguments, arguments, range)
            }
            Value::Composite(id) => match name {
                "forEachAttachment" => {
                    let Some(Value::Function(function)) = arguments.into_iter().next() else {
                        return Err(wrong_argument("a function", &Value::Nil, range));
                    };
                    self.for_each_attachment(&Value::Composite(id), function, range)?;
                    Ok(Value::Void)
                }
                _ => {
                    let member = self.composite_member(id, name, range)?;
                    match member {
                        Value::Function(function) => self.call_function(function, arguments, range),
                        other => Err(wrong_argument("a function", &other, range)),
                    }
                }
            },
            Value::Bool(_) | Value::Address(_) | Value::Path(_) if name == "toString" => {
                let rendered = render(&receiver, &self.heap);
                self.meter(MemoryUsage::string(rendered.len() as u64))?;
                Ok(Value::string(rendered))
            }
            _ => Err(missing_member(name, range)),
        }
    }

    fn number_method(
        &mut self,
        number: &NumberValue,
        name: &str,
        arguments: Vec<Value>,
        range: SourceRange,
    ) -> Result<Value, RuntimeError> {
        if name == "toString" {
            let rendered = number.to_string();
            self.meter(MemoryUsage::string(rendered.len() as u64))?;
            return Ok(Value::string(rendered));
        }
        let Some(Value::Number(other)) = arguments.first() else {
            return Err(wrong_argument(
                "a number",
                arguments.first().unwrap_or(&Value::Nil),
                range,
            ));
        };
        let result = match name {
            "saturatingAdd" => number.saturating_add(other),
            "saturatingSubtract" => number.saturating_subtract(other),
            "saturatingMultiply" => number.saturating_multiply(other),
            "saturatingDivide" => number.saturating_divide(other),
            _ => return Err(missing_member(name, range)),
        }
        .map_err(|error| error.with_range(range))?;
        self.meter(result.memory_usage())?;
        Ok(Value::Number(result))
    }

    fn string_method(
        &mut self,
        text: &Rc<str>,
        name: &str,
        arguments: Vec<Value>,
        range: SourceRange,
    ) -> Result<Value, RuntimeError> {
        match name {
            "concat" => {
                let Some(Value::String(other)) = arguments.first() else {
                    return Err(wrong_argument(
                        "a string",
                        arguments.first().unwrap_or(&Value::Nil),
                        range,
                    ));
                };
                let mut combined = String::with_capacity(text.len() + other.len());
                combined.push_str(text);
                combined.push_str(other);
                self.meter(MemoryUsage::string(combined.len() as u64))?;
                Ok(Value::string(combined))
            }
            "slice" => {
                let (Some(Value::Number(from)), Some(Value::Number(up_to))) =
                    (arguments.first(), arguments.get(1))
                else {
                    return Err(wrong_argument(
                        "two integer bounds",
                        arguments.first().unwrap_or(&Value::Nil),
                        range,
                    ));
                };
                let characters: Vec<char> = text.chars().collect();
                let from = integer_index(from, range)?;
                let up_to = integer_index(up_to, range)?;
                if from > up_to || up_to > characters.len() {
                    return Err(RuntimeError::at(
                        ErrorKind::IndexOutOfBounds {
                            index: up_to as i64,
                            size: characters.len(),
                        },
                        range,
                    ));
                }
                let sliced: String = characters[from..up_to].iter().collect();
                self.meter(MemoryUsage::string(sliced.len() as u64))?;
                Ok(Value::string(sliced))
            }
            "toString" => Ok(Value::String(Rc::clone(text))),
            _ => Err(missing_member(name, range)),
        }
    }

    fn array_method(
        &mut self,
        id: SlabId,
        name: &str,
        mut arguments: Vec<Value>,
        range: SourceRange,
    ) -> Result<Value, RuntimeError> {
        match name {
            "append" => {
                let value = take_argument(&mut arguments, range)?;
                self.meter(MemoryUsage::new(MemoryKind::Array, 1))?;
                let array = self.mutable_array(id, range)?;
                array.elements.push(value);
                Ok(Value::Void)
            }
            "appendAll" => {
                let other = take_argument(&mut arguments, range)?;
                let Some(other_id) = other.slab_id() else {
                    return Err(wrong_argument("an array", &other, range));
                };
                let mut moved = {
                    let other_array = self.mutable_array(other_id, range)?;
                    std::mem::take(&mut other_array.elements)
                };
                self.meter(MemoryUsage::new(MemoryKind::Array, moved.len() as u64))?;
                let array = self.mutable_array(id, range)?;
                array.elements.append(&mut moved);
                Ok(Value::Void)
            }
            "contains" => {
                let needle = take_argument(&mut arguments, range)?;
                let elements = self.array_elements(id, range)?;
                let found = elements
                    .iter()
                    .any(|element| structural_equal(element, &needle, &self.heap));
                Ok(Value::Bool(found))
            }
            "firstIndexOf" => {
                let needle = take_argument(&mut arguments, range)?;
                let elements = self.array_elements(id, range)?;
                let position = elements
                    .iter()
                    .position(|element| structural_equal(element, &needle, &self.heap));
                Ok(match position {
                    Some(position) => {
                        self.meter(MemoryUsage::new(MemoryKind::Optional, 1))?;
                        Value::some(Value::int(position as i64))
                    }
                    None => Value::Nil,
                })
            }
            "insert" => {
                let position = take_argument(&mut arguments, range)?;
                let value = take_argument(&mut arguments, range)?;
                let length = self.array_elements(id, range)?.len();
                let position = match &position {
                    Value::Number(number) => integer_index(number, range)?,
                    other => return Err(wrong_argument("an integer", other, range)),
                };
                if position > length {
                    return Err(RuntimeError::at(
                        ErrorKind::IndexOutOfBounds {
                            index: position as i64,
                            size: length,
                        },
                        range,
                    ));
                }
                self.meter(MemoryUsage::new(MemoryKind::Array, 1))?;
                let array = self.mutable_array(id, range)?;
                array.elements.insert(position, value);
                Ok(Value::Void)
            }
            "remove" => {
                let position = take_argument(&mut arguments, range)?;
                let length = self.array_elements(id, range)?.len();
                let position = match &position {
                    Value::Number(number) => integer_index(number, range)?,
                    other => return Err(wrong_argument("an integer", other, range)),
                };
                if position >= length {
                    return Err(RuntimeError::at(
                        ErrorKind::IndexOutOfBounds {
                            index: position as i64,
                            size: length,
                        },
                        range,
                    ));
                }
                let array = self.mutable_array(id, range)?;
                Ok(array.elements.remove(position))
            }
            "removeFirst" => {
                let array = self.mutable_array(id, range)?;
                if array.elements.is_empty() {
                    return Err(RuntimeError::at(
                        ErrorKind::IndexOutOfBounds { index: 0, size: 0 },
                        range,
                    ));
                }
                Ok(array.elements.remove(0))
            }
            "removeLast" => {
                let array = self.mutable_array(id, range)?;
                array.elements.pop().ok_or_else(|| {
                    RuntimeError::at(ErrorKind::IndexOutOfBounds { index: 0, size: 0 }, range)
                })
            }
            _ => Err(missing_member(name, range)),
        }
    }

    fn dictionary_method(
        &mut self,
        id: SlabId,
        name: &str,
        mut arguments: Vec<Value>,
        range: SourceRange,
    ) -> Result<Value, RuntimeError> {
        match name {
            "insert" => {
                let key_value = take_argument(&mut arguments, range)?;
                let value = take_argument(&mut arguments, range)?;
                let key = HashableValue::from_value(&key_value, &self.heap)
                    .map_err(|error| error.with_range(range))?;
                self.meter(MemoryUsage::new(MemoryKind::Dictionary, 1))?;
                let dictionary = self.mutable_dictionary(id, range)?;
                let previous = dictionary.entries.insert(key, value);
                Ok(match previous {
                    Some(previous) => {
                        self.meter(MemoryUsage::new(MemoryKind::Optional, 1))?;
                        Value::some(previous)
                    }
                    None => Value::Nil,
                })
            }
            "remove" => {
                let key_value = take_argument(&mut arguments, range)?;
                let key = HashableValue::from_value(&key_value, &self.heap)
                    .map_err(|error| error.with_range(range))?;
                let dictionary = self.mutable_dictionary(id, range)?;
                let removed = dictionary.entries.shift_remove(&key);
                Ok(match removed {
                    Some(removed) => {
                        self.meter(MemoryUsage::new(MemoryKind::Optional, 1))?;
                        Value::some(removed)
                    }
                    None => Value::Nil,
                })
            }
            "containsKey" => {
                let key_value = take_argument(&mut arguments, range)?;
                let key = HashableValue::from_value(&key_value, &self.heap)
                    .map_err(|error| error.with_range(range))?;
                let dictionary = self
                    .heap
                    .get(id)?
                    .payload
                    .as_dictionary()
                    .ok_or_else(|| missing_member(name, range))?;
                Ok(Value::Bool(dictionary.entries.contains_key(&key)))
            }
            "forEachKey" => {
                let Some(Value::Function(function)) = arguments.into_iter().next() else {
                    return Err(wrong_argument("a function", &Value::Nil, range));
                };
                let keys: Vec<Value> = self
                    .heap
                    .get(id)?
                    .payload
                    .as_dictionary()
                    .map(|dictionary| {
                        dictionary.entries.keys().map(HashableValue::to_value).collect()
                    })
                    .unwrap_or_default();
                for key in keys {
                    let keep_going = self.call_function(function.clone(), vec![key], range)?;
                    if matches!(keep_going, Value::Bool(false)) {
                        break;
                    }
                }
                Ok(Value::Void)
            }
            _ => Err(missing_member(name, range)),
        }
    }

    fn account_method(
        &mut self,
        handle: AccountHandle,
        name: &str,
        type_arguments: &[Type],
        mut arguments: Vec<Value>,
        range: SourceRange,
    ) -> Result<Value, RuntimeError> {
        let address = handle.address;
        let elaboration = self.elaboration();

        match name {
            "getCapability" => {
                let path = expect_path(&take_argument(&mut arguments, range)?, range)?;
                self.meter(MemoryUsage::new(MemoryKind::Capability, 1))?;
                let capability =
                    self.storage
                        .get_capability(address, &path, type_arguments.first().cloned());
                return Ok(Value::Capability(capability));
            }
            "getLinkTarget" => {
                let path = expect_path(&take_argument(&mut arguments, range)?, range)?;
                return Ok(match self.storage.get_link_target(address, &path) {
                    Some(target) => {
                        self.meter(MemoryUsage::new(MemoryKind::Optional, 1))?;
                        Value::some(Value::Path(target))
                    }
                    None => Value::Nil,
                });
            }
            _ => {}
        }

        if !handle.authorized {
            return Err(RuntimeError::at(
                ErrorKind::MissingMemberValue {
                    name: format!("PublicAccount.{name}"),
                },
                range,
            ));
        }

        match name {
            "save" => {
                let value = take_argument(&mut arguments, range)?;
                let path = expect_path(&take_argument(&mut arguments, range)?, range)?;
                self.storage
                    .save(&mut self.heap, address, &path, value, range)?;
                Ok(Value::Void)
            }
            "load" => {
                let ty = required_type_argument(type_arguments, range)?;
                let path = expect_path(&take_argument(&mut arguments, range)?, range)?;
                let loaded = self.storage.load(
                    &mut self.heap,
                    &*elaboration,
                    address,
                    &path,
                    &ty,
                    range,
                )?;
                Ok(match loaded {
                    Some(value) => {
                        self.meter(MemoryUsage::new(MemoryKind::Optional, 1))?;
                        Value::some(value)
                    }
                    None => Value::Nil,
                })
            }
            "copy" => {
                let ty = required_type_argument(type_arguments, range)?;
                let path = expect_path(&take_argument(&mut arguments, range)?, range)?;
                let copied = self.storage.copy_stored(
                    &mut self.heap,
                    &*elaboration,
                    address,
                    &path,
                    &ty,
                    range,
                )?;
                Ok(match copied {
                    Some(value) => {
                        self.meter(MemoryUsage::new(MemoryKind::Optional, 1))?;
                        Value::some(value)
                    }
                    None => Value::Nil,
                })
            }
            "borrow" => {
                let ty = required_type_argument(type_arguments, range)?;
                let path = expect_path(&take_argument(&mut arguments, range)?, range)?;
                let borrowed = self.storage.borrow_stored(
                    &self.heap,
                    &*elaboration,
                    address,
                    &path,
                    &ty,
                    range,
                )?;
                Ok(match borrowed {
                    Some(reference) => {
                        self.meter(MemoryUsage::new(MemoryKind::Reference, 1))?;
                        self.meter(MemoryUsage::new(MemoryKind::Optional, 1))?;
                        Value::some(reference)
                    }
                    None => Value::Nil,
                })
            }
            "type" => {
                let path = expect_path(&take_argument(&mut arguments, range)?, range)?;
                Ok(match self.storage.stored_type(&self.heap, address, &path) {
                    Some(ty) => {
                        self.meter(MemoryUsage::new(MemoryKind::TypeValue, 1))?;
                        self.meter(MemoryUsage::new(MemoryKind::Optional, 1))?;
                        Value::some(Value::Type(Box::new(ty)))
                    }
                    None => Value::Nil,
                })
            }
            "link" => {
                let ty = required_type_argument(type_arguments, range)?;
                let path = expect_path(&take_argument(&mut arguments, range)?, range)?;
                let target = expect_path(&take_argument(&mut arguments, range)?, range)?;
                let capability = self.storage.link(address, &path, target, ty, range)?;
                Ok(match capability {
                    Some(capability) => {
                        self.meter(MemoryUsage::new(MemoryKind::Capability, 1))?;
                        self.meter(MemoryUsage::new(MemoryKind::Optional, 1))?;
                        Value::some(Value::Capability(capability))
                    }
                    None => Value::Nil,
                })
            }
            "unlink" => {
                let path = expect_path(&take_argument(&mut arguments, range)?, range)?;
                self.storage.unlink(address, &path);
                Ok(Value::Void)
            }
            _ => Err(missing_member(name, range)),
        }
    }

    fn mutable_array(
        &mut self,
        id: SlabId,
        range: SourceRange,
    ) -> Result<&mut ArraySlab, RuntimeError> {
        self.heap
            .get_mut(id)?
            .payload
            .as_array_mut()
            .ok_or_else(|| {
                RuntimeError::at(
                    ErrorKind::Unexpected {
                        message: "array handle does not point at an array".into(),
                    },
                    range,
                )
            })
    }

    fn array_elements(&self, id: SlabId, range: SourceRange) -> Result<Vec<Value>, RuntimeError> {
        self.heap
            .get(id)?
            .payload
            .as_array()
            .map(|array| array.elements.clone())
            .ok_or_else(|| {
                RuntimeError::at(
                    ErrorKind::Unexpected {
                        message: "array handle does not point at an array".into(),
                    },
                    range,
                )
            })
    }

    fn mutable_dictionary(
        &mut self,
        id: SlabId,
        range: SourceRange,
    ) -> Result<&mut crate::heap::DictionarySlab, RuntimeError> {
        self.heap
            .get_mut(id)?
            .payload
            .as_dictionary_mut()
            .ok_or_else(|| {
                RuntimeError::at(
                    ErrorKind::Unexpected {
                        message: "dictionary handle does not point at a dictionary".into(),
                    },
                    range,
                )
            })
    }
}

fn take_argument(arguments: &mut Vec<Value>, range: SourceRange) -> Result<Value, RuntimeError> {
    if arguments.is_empty() {
        return Err(RuntimeError::at(
            ErrorKind::Unexpected {
                message: "missing argument".into(),
            },
            range,
        ));
    }
    Ok(arguments.remove(0))
}

fn required_type_argument(
    type_arguments: &[Type],
    range: SourceRange,
) -> Result<Type, RuntimeError> {
    type_arguments.first().cloned().ok_or_else(|| {
        RuntimeError::at(
            ErrorKind::Unexpected {
                message: "missing type argument".into(),
            },
            range,
        )
    })
}

fn integer_index(number: &NumberValue, range: SourceRange) -> Result<usize, RuntimeError> {
    number
        .to_bigint()
        .and_then(|value| num_traits::ToPrimitive::to_usize(&value))
        .ok_or_else(|| {
            RuntimeError::at(
                ErrorKind::Unexpected {
                    message: "expected a non-negative integer index".into(),
                },
                range,
            )
        })
}
