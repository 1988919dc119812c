// Copyright 2024-2026, Tessera Labs, Inc.
// For licensing, see https://github.com/tessera-lang/tessera-rs/blob/main/licenses/COPYRIGHT.md

//! The runtime value universe.
//!
//! Values are a closed tagged variant. Small values carry their payload
//! inline; arrays, dictionaries, and composites are [`SlabId`] handles into
//! the [`Heap`](crate::heap::Heap), so moving a large value moves a handle.
//! A resource move leaves [`Value::Invalid`] behind in the vacated slot.

use core::fmt;
use std::rc::Rc;

use tessera_core::{AccountAddress, ErrorKind, RuntimeError, SourceRange, StoragePath};

use crate::ast::{CompositeDeclaration, FunctionDeclaration};
use crate::env::Activation;
use crate::heap::{Heap, SlabId};
use crate::interpreter::Interpreter;
use crate::types::{NumberKind, Type};

pub mod number;

pub use number::{NumberValue, FIXED_POINT_SCALE};

/// A runtime value.
#[derive(Clone, Debug)]
pub enum Value {
    Void,
    Nil,
    Bool(bool),
    Number(NumberValue),
    String(Rc<str>),
    Address(AccountAddress),
    Path(StoragePath),
    /// The present case of an optional.
    Some(Box<Value>),
    Array(SlabId),
    Dictionary(SlabId),
    Composite(SlabId),
    Reference(Rc<ReferenceValue>),
    Capability(CapabilityValue),
    Function(FunctionValue),
    Type(Box<Type>),
    /// An account handle produced by `getAccount` / `getAuthAccount`.
    Account(AccountHandle),
    /// The tombstone a resource move leaves behind.
    Invalid,
}

impl Value {
    pub fn string(text: impl Into<Rc<str>>) -> Value {
        Value::String(text.into())
    }

    pub fn some(inner: Value) -> Value {
        Value::Some(Box::new(inner))
    }

    pub fn number(value: NumberValue) -> Value {
        Value::Number(value)
    }

    pub fn uint64(value: u64) -> Value {
        Value::Number(NumberValue::UInt64(value))
    }

    pub fn int(value: i64) -> Value {
        Value::Number(NumberValue::Int(value.into()))
    }

    pub fn as_bool(&self, range: SourceRange) -> Result<bool, RuntimeError> {
        match self {
            Value::Bool(value) => Ok(*value),
            other => Err(RuntimeError::at(
                ErrorKind::Unexpected {
                    message: format!("expected Bool, got {}", other.category()),
                },
                range,
            )),
        }
    }

    pub fn as_number(&self, range: SourceRange) -> Result<&NumberValue, RuntimeError> {
        match self {
            Value::Number(value) => Ok(value),
            other => Err(RuntimeError::at(
                ErrorKind::Unexpected {
                    message: format!("expected a number, got {}", other.category()),
                },
                range,
            )),
        }
    }

    /// A short human-readable category name, for diagnostics only.
    pub fn category(&self) -> &'static str {
        match self {
            Value::Void => "Void",
            Value::Nil => "nil",
            Value::Bool(_) => "Bool",
            Value::Number(_) => "a number",
            Value::String(_) => "String",
            Value::Address(_) => "Address",
            Value::Path(_) => "Path",
            Value::Some(_) => "an optional",
            Value::Array(_) => "an array",
            Value::Dictionary(_) => "a dictionary",
            Value::Composite(_) => "a composite",
            Value::Reference(_) => "a reference",
            Value::Capability(_) => "a capability",
            Value::Function(_) => "a function",
            Value::Type(_) => "a type",
            Value::Account(_) => "an account",
            Value::Invalid => "an invalidated value",
        }
    }

    /// The slab handle, if this value is heap-indirected.
    pub fn slab_id(&self) -> Option<SlabId> {
        match self {
            Value::Array(id) | Value::Dictionary(id) | Value::Composite(id) => Some(*id),
            _ => None,
        }
    }
}

/// An account handle value: `AuthAccount` when authorized, `PublicAccount`
/// otherwise.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccountHandle {
    pub address: AccountAddress,
    pub authorized: bool,
}

/// A capability: a serialisable handle that resolves through the link
/// registry to a storage path and can then be borrowed into a reference.
#[derive(Clone, Debug, PartialEq)]
pub struct CapabilityValue {
    pub address: AccountAddress,
    pub path: StoragePath,
    pub borrow_type: Option<Type>,
}

/// A reference value. Ephemeral references target in-memory value identity;
/// storage references re-resolve `(address, path)` on every access.
#[derive(Clone, Debug)]
pub enum ReferenceValue {
    Ephemeral(EphemeralReference),
    Storage(StorageReference),
}

impl ReferenceValue {
    pub fn authorized(&self) -> bool {
        match self {
            ReferenceValue::Ephemeral(reference) => reference.authorized,
            ReferenceValue::Storage(reference) => reference.authorized,
        }
    }

    pub fn borrowed_type(&self) -> &Type {
        match self {
            ReferenceValue::Ephemeral(reference) => &reference.borrowed_type,
            ReferenceValue::Storage(reference) => &reference.borrowed_type,
        }
    }
}

/// What an ephemeral reference points at: a heap slab, or an immutable
/// snapshot of an inline value (references to primitives read through a
/// copy; the checker rejects writes through them).
#[derive(Clone, Debug)]
pub enum EphemeralTarget {
    Slab(SlabId),
    Inline(Box<Value>),
}

#[derive(Clone, Debug)]
pub struct EphemeralReference {
    pub authorized: bool,
    pub borrowed_type: Type,
    pub target: EphemeralTarget,
    /// The target slab's lineage at mint time; a later move of the target
    /// out of its slot bumps the lineage and invalidates this reference.
    pub lineage: u64,
}

#[derive(Clone, Debug)]
pub struct StorageReference {
    pub authorized: bool,
    pub borrowed_type: Type,
    pub address: AccountAddress,
    pub path: StoragePath,
    /// The path's storage epoch at mint time; any later save or load at
    /// the path bumps the epoch and invalidates this reference.
    pub epoch: u64,
}

/// A callable value.
#[derive(Clone)]
pub enum FunctionValue {
    /// A closure over its defining activation.
    Interpreted(Rc<InterpretedFunction>),
    /// A composite constructor.
    Constructor(Rc<CompositeDeclaration>),
    /// A host-implemented function.
    Host(Rc<HostFunction>),
    /// A method bound to its receiver (and, for attachments, its base).
    Bound(Rc<BoundFunction>),
}

impl fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionValue::Interpreted(function) => {
                write!(f, "fun {}", function.declaration.name)
            }
            FunctionValue::Constructor(declaration) => {
                write!(f, "constructor {}", declaration.identifier)
            }
            FunctionValue::Host(function) => write!(f, "host fun {}", function.name),
            FunctionValue::Bound(bound) => write!(f, "bound {:?}", bound.function),
        }
    }
}

#[derive(Debug)]
pub struct InterpretedFunction {
    pub declaration: Rc<FunctionDeclaration>,
    /// The defining activation captured by the closure.
    pub activation: Rc<Activation>,
    /// Interface requirements whose conditions wrap every invocation, in
    /// conformance-declaration order.
    pub interfaces: Vec<Rc<FunctionDeclaration>>,
}

pub struct BoundFunction {
    pub receiver: Value,
    /// The carrier composite, for attachment methods.
    pub base: Option<Value>,
    pub function: FunctionValue,
}

impl fmt::Debug for BoundFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bound {:?}", self.function)
    }
}

/// The host function signature: source range of the call site, the
/// interpreter, and the evaluated arguments.
pub type HostFunctionBody =
    Rc<dyn Fn(SourceRange, &mut Interpreter, Vec<Value>) -> Result<Value, RuntimeError>>;

pub struct HostFunction {
    pub name: String,
    /// `view` functions promise not to mutate state or emit events.
    pub view: bool,
    pub body: HostFunctionBody,
}

impl HostFunction {
    pub fn new(
        name: impl Into<String>,
        view: bool,
        body: impl Fn(SourceRange, &mut Interpreter, Vec<Value>) -> Result<Value, RuntimeError>
            + 'static,
    ) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            view,
            body: Rc::new(body),
        })
    }
}

impl fmt::Debug for HostFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "host fun {}", self.name)
    }
}

/// A dictionary key. Only the hashable subset of the value universe may
/// appear here: numerics, booleans, strings, addresses, paths, and enum
/// composites (compared by type and raw value).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum HashableValue {
    Bool(bool),
    Number(NumberValue),
    String(Rc<str>),
    Address(AccountAddress),
    Path(StoragePath),
    Enum {
        type_id: String,
        raw: NumberValue,
    },
}

impl HashableValue {
    /// Converts a value into a key, reading enum composites out of the
    /// heap. Non-hashable values are rejected.
    pub fn from_value(value: &Value, heap: &Heap) -> Result<HashableValue, RuntimeError> {
        match value {
            Value::Bool(v) => Ok(HashableValue::Bool(*v)),
            Value::Number(v) => Ok(HashableValue::Number(v.clone())),
            Value::String(v) => Ok(HashableValue::String(v.clone())),
            Value::Address(v) => Ok(HashableValue::Address(*v)),
            Value::Path(v) => Ok(HashableValue::Path(v.clone())),
            Value::Composite(id) => {
                let slab = heap.get(*id)?;
                let composite = slab.payload.as_composite().ok_or_else(|| {
                    RuntimeError::new(ErrorKind::Unexpected {
                        message: "composite handle does not point at a composite".into(),
                    })
                })?;
                if !composite.kind.is_enum() {
                    return Err(ErrorKind::Unexpected {
                        message: format!("{} is not a hashable type", composite.qualified_id),
                    }
                    .into());
                }
                match composite.fields.get("rawValue") {
                    Some(Value::Number(raw)) => Ok(HashableValue::Enum {
                        type_id: composite.qualified_id.to_string(),
                        raw: raw.clone(),
                    }),
                    _ => Err(ErrorKind::MissingMemberValue {
                        name: "rawValue".into(),
                    }
                    .into()),
                }
            }
            other => Err(ErrorKind::Unexpected {
                message: format!("{} is not hashable", other.category()),
            }
            .into()),
        }
    }

    /// The key back as a value. Enum keys are rebuilt as fresh enum
    /// composites by the caller, which owns the heap; here they surface as
    /// their raw value.
    pub fn to_value(&self) -> Value {
        match self {
            HashableValue::Bool(v) => Value::Bool(*v),
            HashableValue::Number(v) => Value::Number(v.clone()),
            HashableValue::String(v) => Value::String(v.clone()),
            HashableValue::Address(v) => Value::Address(*v),
            HashableValue::Path(v) => Value::Path(v.clone()),
            HashableValue::Enum { raw, .. } => Value::Number(raw.clone()),
        }
    }
}

/// Structural equality. Heap-indirected values compare by contents, not by
/// handle; function values never compare equal to anything.
pub fn structural_equal(a: &Value, b: &Value, heap: &Heap) -> bool {
    match (a, b) {
        (Value::Void, Value::Void) | (Value::Nil, Value::Nil) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Address(x), Value::Address(y)) => x == y,
        (Value::Path(x), Value::Path(y)) => x == y,
        (Value::Some(x), Value::Some(y)) => structural_equal(x, y, heap),
        (Value::Capability(x), Value::Capability(y)) => x == y,
        (Value::Type(x), Value::Type(y)) => x == y,
        (Value::Account(x), Value::Account(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            let (Some(xs), Some(ys)) = (array_elements(heap, *x), array_elements(heap, *y)) else {
                return false;
            };
            xs.len() == ys.len()
                && xs
                    .iter()
                    .zip(ys.iter())
                    .all(|(x, y)| structural_equal(x, y, heap))
        }
        (Value::Dictionary(x), Value::Dictionary(y)) => {
            let (Some(xs), Some(ys)) = (heap.try_get(*x), heap.try_get(*y)) else {
                return false;
            };
            let (Some(xs), Some(ys)) = (xs.payload.as_dictionary(), ys.payload.as_dictionary())
            else {
                return false;
            };
            xs.entries.len() == ys.entries.len()
                && xs.entries.iter().all(|(key, value)| {
                    ys.entries
                        .get(key)
                        .is_some_and(|other| structural_equal(value, other, heap))
                })
        }
        (Value::Composite(x), Value::Composite(y)) => {
            let (Some(xs), Some(ys)) = (heap.try_get(*x), heap.try_get(*y)) else {
                return false;
            };
            let (Some(xs), Some(ys)) = (xs.payload.as_composite(), ys.payload.as_composite())
            else {
                return false;
            };
            xs.qualified_id == ys.qualified_id
                && xs.fields.len() == ys.fields.len()
                && xs.fields.iter().all(|(name, value)| {
                    ys.fields
                        .get(name)
                        .is_some_and(|other| structural_equal(value, other, heap))
                })
        }
        (Value::Reference(x), Value::Reference(y)) => match (x.as_ref(), y.as_ref()) {
            (ReferenceValue::Storage(x), ReferenceValue::Storage(y)) => {
                x.address == y.address && x.path == y.path
            }
            (ReferenceValue::Ephemeral(x), ReferenceValue::Ephemeral(y)) => {
                match (&x.target, &y.target) {
                    (EphemeralTarget::Slab(x), EphemeralTarget::Slab(y)) => x == y,
                    _ => false,
                }
            }
            _ => false,
        },
        _ => false,
    }
}

fn array_elements(heap: &Heap, id: SlabId) -> Option<&[Value]> {
    heap.try_get(id)
        .and_then(|slab| slab.payload.as_array())
        .map(|array| array.elements.as_slice())
}

/// Renders a value for event payloads and logging.
pub fn render(value: &Value, heap: &Heap) -> String {
    match value {
        Value::Void => "()".into(),
        Value::Nil => "nil".into(),
        Value::Bool(v) => v.to_string(),
        Value::Number(v) => v.to_string(),
        Value::String(v) => format!("{v:?}"),
        Value::Address(v) => v.to_string(),
        Value::Path(v) => v.to_string(),
        Value::Some(inner) => render(inner, heap),
        Value::Array(id) => match array_elements(heap, *id) {
            Some(elements) => {
                let rendered: Vec<String> = elements.iter().map(|e| render(e, heap)).collect();
                format!("[{}]", rendered.join(", "))
            }
            None => "[...]".into(),
        },
        Value::Dictionary(id) => match heap.try_get(*id).and_then(|s| s.payload.as_dictionary()) {
            Some(dictionary) => {
                let rendered: Vec<String> = dictionary
                    .entries
                    .iter()
                    .map(|(key, value)| {
                        format!("{}: {}", render(&key.to_value(), heap), render(value, heap))
                    })
                    .collect();
                format!("{{{}}}", rendered.join(", "))
            }
            None => "{...}".into(),
        },
        Value::Composite(id) => match heap.try_get(*id).and_then(|s| s.payload.as_composite()) {
            Some(composite) => {
                let rendered: Vec<String> = composite
                    .fields
                    .iter()
                    .filter(|(name, _)| *name != "uuid")
                    .map(|(name, value)| format!("{name}: {}", render(value, heap)))
                    .collect();
                format!("{}({})", composite.qualified_id, rendered.join(", "))
            }
            None => "<missing composite>".into(),
        },
        Value::Reference(_) => "<reference>".into(),
        Value::Capability(capability) => format!(
            "Capability(address: {}, path: {})",
            capability.address, capability.path
        ),
        Value::Function(function) => format!("{function:?}"),
        Value::Type(ty) => format!("Type<{ty}>"),
        Value::Account(handle) => format!("Account({})", handle.address),
        Value::Invalid => "<invalid>".into(),
    }
}

/// The runtime type tag of a value.
pub fn dynamic_type(value: &Value, heap: &Heap) -> Type {
    match value {
        Value::Void => Type::Void,
        Value::Nil => Type::optional(Type::Never),
        Value::Bool(_) => Type::Bool,
        Value::Number(v) => Type::Number(v.kind()),
        Value::String(_) => Type::String,
        Value::Address(_) => Type::Address,
        Value::Path(path) => Type::Path(Some(path.domain)),
        Value::Some(inner) => Type::optional(dynamic_type(inner, heap)),
        Value::Array(id) => heap
            .try_get(*id)
            .and_then(|slab| slab.payload.as_array())
            .map(|array| match array.constant_size {
                Some(size) => Type::ConstArray(Box::new(array.element_type.clone()), size),
                None => Type::VarArray(Box::new(array.element_type.clone())),
            })
            .unwrap_or(Type::Never),
        Value::Dictionary(id) => heap
            .try_get(*id)
            .and_then(|slab| slab.payload.as_dictionary())
            .map(|dictionary| {
                Type::dictionary(dictionary.key_type.clone(), dictionary.value_type.clone())
            })
            .unwrap_or(Type::Never),
        Value::Composite(id) => heap
            .try_get(*id)
            .and_then(|slab| slab.payload.as_composite())
            .map(|composite| Type::Composite(composite.qualified_id.clone()))
            .unwrap_or(Type::Never),
        Value::Reference(reference) => Type::Reference {
            authorized: reference.authorized(),
            referenced: Box::new(reference.borrowed_type().clone()),
        },
        Value::Capability(capability) => Type::Capability(capability.borrow_type.clone().map(Box::new)),
        Value::Function(function) => match function {
            FunctionValue::Interpreted(f) => Type::Function {
                parameters: f.declaration.parameters.iter().map(|p| p.ty.clone()).collect(),
                return_type: Box::new(f.declaration.return_type.clone()),
            },
            FunctionValue::Bound(bound) => {
                dynamic_type(&Value::Function(bound.function.clone()), heap)
            }
            _ => Type::Function {
                parameters: Vec::new(),
                return_type: Box::new(Type::Any),
            },
        },
        Value::Type(_) => Type::MetaType,
        Value::Account(handle) => {
            if handle.authorized {
                Type::AuthAccount
            } else {
                Type::PublicAccount
            }
        }
        Value::Invalid => Type::Never,
    }
}

/// Creates a value of `kind` from a big integer, range-checked. Convenience
/// used by literal evaluation and the numeric conversion constructors.
pub fn number_from_bigint(
    kind: NumberKind,
    value: num_bigint::BigInt,
) -> Result<Value, RuntimeError> {
    NumberValue::from_bigint(kind, value).map(Value::Number)
}
