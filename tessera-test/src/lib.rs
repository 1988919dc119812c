// Copyright 2024-2026, Tessera Labs, Inc.
// For licensing, see https://github.com/tessera-lang/tessera-rs/blob/main/licenses/COPYRIGHT.md

//! Testing utilities for the Tessera runtime.
//!
//! [`TestHost`] is a mock implementation of the host trait family in
//! [`tessera_core::host`] with inspectable interior state: generated uuids,
//! captured events, per-kind memory totals, and configurable failure modes
//! for the event sink, key validation, and the memory gauge.

mod builder;
mod constants;
mod host;
mod state;

pub use builder::TestHostBuilder;
pub use constants::{DEFAULT_ACCOUNT, DEFAULT_FIRST_UUID};
pub use host::TestHost;
pub use state::HostState;
