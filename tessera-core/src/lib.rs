// Copyright 2024-2026, Tessera Labs, Inc.
// For licensing, see https://github.com/tessera-lang/tessera-rs/blob/main/licenses/COPYRIGHT.md

//! Core definitions of Tessera runtime traits and types that are used by
//! multiple crates in the workspace: account addresses, typed storage paths,
//! source locations, the runtime error taxonomy, the memory-metering
//! vocabulary, and the host trait family the interpreter is parameterized
//! over.

pub mod address;
pub mod error;
pub mod host;
pub mod location;
pub mod meter;
pub mod path;

pub use address::AccountAddress;
pub use error::{ConditionKind, ErrorKind, HostError, RuntimeError};
pub use host::{EventAccess, EventData, EventField, Host, KeyValidationAccess, UuidAccess};
pub use location::{Location, QualifiedId, SourcePosition, SourceRange};
pub use meter::{MemoryGauge, MemoryKind, MemoryLimitError, MemoryUsage, UnlimitedGauge};
pub use path::{PathDomain, StoragePath};
