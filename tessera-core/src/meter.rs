// Copyright 2024-2026, Tessera Labs, Inc.
// For licensing, see https://github.com/tessera-lang/tessera-rs/blob/main/licenses/COPYRIGHT.md

//! The memory-metering vocabulary.
//!
//! Every value construction and arithmetic result in the runtime reports a
//! typed [`MemoryUsage`] to a host-supplied [`MemoryGauge`]. The runtime only
//! ever reports; it never reads totals back. A gauge that wants to bound
//! execution returns a fatal [`HostError`], which the interpreter surfaces
//! as a `LimitExceeded` runtime error.

use crate::error::{ErrorKind, RuntimeError};

/// The kind tags usage is recorded under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MemoryKind {
    Bool,
    String,
    Address,
    Path,
    /// Fixed-width numeric values and results.
    Number,
    /// Arbitrary-precision numeric values and results.
    BigInt,
    Optional,
    Array,
    Dictionary,
    Composite,
    Reference,
    Capability,
    TypeValue,
    InterpretedFunction,
    HostFunction,
    BoundFunction,
    Activation,
    Slab,
}

impl MemoryKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            MemoryKind::Bool => "Bool",
            MemoryKind::String => "String",
            MemoryKind::Address => "Address",
            MemoryKind::Path => "Path",
            MemoryKind::Number => "Number",
            MemoryKind::BigInt => "BigInt",
            MemoryKind::Optional => "Optional",
            MemoryKind::Array => "Array",
            MemoryKind::Dictionary => "Dictionary",
            MemoryKind::Composite => "Composite",
            MemoryKind::Reference => "Reference",
            MemoryKind::Capability => "Capability",
            MemoryKind::TypeValue => "TypeValue",
            MemoryKind::InterpretedFunction => "InterpretedFunction",
            MemoryKind::HostFunction => "HostFunction",
            MemoryKind::BoundFunction => "BoundFunction",
            MemoryKind::Activation => "Activation",
            MemoryKind::Slab => "Slab",
        }
    }
}

/// A single usage report: `amount` units of `kind`. For numbers the amount
/// is the byte width of the result's representation; for containers it is
/// the element count at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryUsage {
    pub kind: MemoryKind,
    pub amount: u64,
}

impl MemoryUsage {
    pub const fn new(kind: MemoryKind, amount: u64) -> Self {
        Self { kind, amount }
    }

    /// Usage for a fixed-width numeric value of the given byte width.
    pub const fn number(bytes: u64) -> Self {
        Self::new(MemoryKind::Number, bytes)
    }

    /// Usage for an arbitrary-precision value currently occupying `bytes`.
    pub const fn big_int(bytes: u64) -> Self {
        Self::new(MemoryKind::BigInt, bytes)
    }

    pub const fn string(bytes: u64) -> Self {
        Self::new(MemoryKind::String, bytes)
    }
}

/// Returned by a gauge whose bound was exceeded. Surfaces to programs as a
/// fatal `LimitExceeded` runtime error that unwinds to the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryLimitError {
    pub kind: MemoryKind,
    pub limit: u64,
}

impl From<MemoryLimitError> for RuntimeError {
    fn from(error: MemoryLimitError) -> Self {
        RuntimeError::new(ErrorKind::LimitExceeded {
            kind: error.kind.as_str().to_owned(),
            limit: error.limit,
        })
    }
}

/// Host-supplied gauge the runtime reports typed usage into.
pub trait MemoryGauge {
    fn meter_memory(&self, usage: MemoryUsage) -> Result<(), MemoryLimitError>;
}

/// A gauge that accepts everything. Useful for embedders that meter
/// elsewhere, and as the default in tests that are not about metering.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnlimitedGauge;

impl MemoryGauge for UnlimitedGauge {
    fn meter_memory(&self, _usage: MemoryUsage) -> Result<(), MemoryLimitError> {
        Ok(())
    }
}
