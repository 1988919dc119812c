// Copyright 2024-2026, Tessera Labs, Inc.
// For licensing, see https://github.com/tessera-lang/tessera-rs/blob/main/licenses/COPYRIGHT.md

//! Default values used by the test host.

use tessera_core::AccountAddress;

/// The account most tests store into.
pub const DEFAULT_ACCOUNT: AccountAddress = AccountAddress::new([0, 0, 0, 0, 0, 0, 0, 1]);

/// The first uuid handed out by a fresh [`crate::TestHost`].
pub const DEFAULT_FIRST_UUID: u64 = 1;
