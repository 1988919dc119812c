// Copyright 2024-2026, Tessera Labs, Inc.
// For licensing, see https://github.com/tessera-lang/tessera-rs/blob/main/licenses/COPYRIGHT.md

//! A builder for preconfigured test hosts.

use crate::host::TestHost;
use crate::state::HostState;

/// Builds a [`TestHost`] with preconfigured state.
///
/// ```
/// use tessera_test::TestHostBuilder;
///
/// let host = TestHostBuilder::new()
///     .first_uuid(100)
///     .memory_limit(1 << 20)
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct TestHostBuilder {
    state: HostState,
}

impl TestHostBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn first_uuid(mut self, uuid: u64) -> Self {
        self.state.next_uuid = uuid;
        self
    }

    pub fn memory_limit(mut self, limit: u64) -> Self {
        self.state.memory_limit = Some(limit);
        self
    }

    pub fn valid_public_keys(mut self, keys: Vec<Vec<u8>>) -> Self {
        self.state.valid_public_keys = Some(keys);
        self
    }

    pub fn failing_event_sink(mut self, message: impl Into<String>) -> Self {
        self.state.event_sink_failure = Some(message.into());
        self
    }

    pub fn build(self) -> TestHost {
        TestHost::from(self.state)
    }
}
