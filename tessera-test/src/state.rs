// Copyright 2024-2026, Tessera Labs, Inc.
// For licensing, see https://github.com/tessera-lang/tessera-rs/blob/main/licenses/COPYRIGHT.md

//! The internal state of the test host.

use std::collections::HashMap;

use tessera_core::{EventData, MemoryKind};

use crate::constants::DEFAULT_FIRST_UUID;

/// The interior state of a [`crate::TestHost`]: everything a test can
/// configure up front or inspect afterwards, in plain data structures.
#[derive(Clone, Debug)]
pub struct HostState {
    /// The next uuid `generate_uuid` hands out.
    pub next_uuid: u64,
    /// Every event delivered to the sink, in emission order.
    pub emitted_events: Vec<EventData>,
    /// Accumulated memory usage by kind.
    pub memory: HashMap<MemoryKind, u64>,
    /// Total accumulated memory usage across all kinds.
    pub total_memory: u64,
    /// When set, the gauge rejects any usage that would push
    /// `total_memory` past this bound.
    pub memory_limit: Option<u64>,
    /// When set, only these public keys validate; otherwise every key does.
    pub valid_public_keys: Option<Vec<Vec<u8>>>,
    /// When set, the event sink fails fatally with this message.
    pub event_sink_failure: Option<String>,
}

impl Default for HostState {
    fn default() -> Self {
        Self {
            next_uuid: DEFAULT_FIRST_UUID,
            emitted_events: Vec::new(),
            memory: HashMap::new(),
            total_memory: 0,
            memory_limit: None,
            valid_public_keys: None,
            event_sink_failure: None,
        }
    }
}
