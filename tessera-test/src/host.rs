// Copyright 2024-2026, Tessera Labs, Inc.
// For licensing, see https://github.com/tessera-lang/tessera-rs/blob/main/licenses/COPYRIGHT.md

//! A mock host for unit-testing the runtime.
//!
//! ```
//! use tessera_test::TestHost;
//!
//! let host = TestHost::new();
//! host.set_memory_limit(1024 * 1024);
//!
//! // ... run an interpreter against `host` ...
//!
//! assert!(host.emitted_events().is_empty());
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use tessera_core::{
    EventAccess, EventData, HostError, KeyValidationAccess, MemoryGauge, MemoryKind,
    MemoryLimitError, MemoryUsage, UuidAccess,
};

use crate::state::HostState;

/// A mock implementation of the host trait family with inspectable state.
/// Cloning shares the interior state, so a test can keep a handle while the
/// interpreter holds another.
#[derive(Clone, Default)]
pub struct TestHost {
    state: Rc<RefCell<HostState>>,
}

impl From<HostState> for TestHost {
    fn from(state: HostState) -> Self {
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }
}

impl TestHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cloned snapshot of the interior state for inspection.
    pub fn snapshot(&self) -> HostState {
        self.state.borrow().clone()
    }

    /// Every event delivered so far, in emission order.
    pub fn emitted_events(&self) -> Vec<EventData> {
        self.state.borrow().emitted_events.clone()
    }

    pub fn set_next_uuid(&self, next: u64) {
        self.state.borrow_mut().next_uuid = next;
    }

    /// Bounds total metered memory; the gauge fails once the bound would
    /// be exceeded.
    pub fn set_memory_limit(&self, limit: u64) {
        self.state.borrow_mut().memory_limit = Some(limit);
    }

    /// Accumulated usage for one kind.
    pub fn memory_used(&self, kind: MemoryKind) -> u64 {
        self.state.borrow().memory.get(&kind).copied().unwrap_or(0)
    }

    pub fn total_memory_used(&self) -> u64 {
        self.state.borrow().total_memory
    }

    /// Restricts key validation to the given keys.
    pub fn set_valid_public_keys(&self, keys: Vec<Vec<u8>>) {
        self.state.borrow_mut().valid_public_keys = Some(keys);
    }

    /// Makes the event sink fail fatally with `message`.
    pub fn fail_events_with(&self, message: impl Into<String>) {
        self.state.borrow_mut().event_sink_failure = Some(message.into());
    }
}

impl UuidAccess for TestHost {
    fn generate_uuid(&self) -> Result<u64, HostError> {
        let mut state = self.state.borrow_mut();
        let uuid = state.next_uuid;
        state.next_uuid += 1;
        Ok(uuid)
    }
}

impl EventAccess for TestHost {
    fn emit_event(&self, event: EventData) -> Result<(), HostError> {
        let mut state = self.state.borrow_mut();
        if let Some(message) = &state.event_sink_failure {
            return Err(HostError::fatal(message.clone()));
        }
        state.emitted_events.push(event);
        Ok(())
    }
}

impl KeyValidationAccess for TestHost {
    fn validate_public_key(&self, public_key: &[u8]) -> Result<bool, HostError> {
        let state = self.state.borrow();
        Ok(match &state.valid_public_keys {
            Some(keys) => keys.iter().any(|key| key == public_key),
            None => true,
        })
    }
}

impl MemoryGauge for TestHost {
    fn meter_memory(&self, usage: MemoryUsage) -> Result<(), MemoryLimitError> {
        let mut state = self.state.borrow_mut();
        let next_total = state.total_memory.saturating_add(usage.amount);
        if let Some(limit) = state.memory_limit {
            if next_total > limit {
                return Err(MemoryLimitError {
                    kind: usage.kind,
                    limit,
                });
            }
        }
        state.total_memory = next_total;
        *state.memory.entry(usage.kind).or_insert(0) += usage.amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DEFAULT_FIRST_UUID;

    #[test]
    fn test_uuids_are_monotonic() {
        let host = TestHost::new();
        assert_eq!(host.generate_uuid().unwrap(), DEFAULT_FIRST_UUID);
        assert_eq!(host.generate_uuid().unwrap(), DEFAULT_FIRST_UUID + 1);
    }

    #[test]
    fn test_event_capture_and_failure() {
        let host = TestHost::new();
        host.emit_event(EventData::new("t.x.E", vec![])).unwrap();
        assert_eq!(host.emitted_events().len(), 1);

        host.fail_events_with("sink unavailable");
        let error = host.emit_event(EventData::new("t.x.E", vec![])).unwrap_err();
        assert!(error.fatal);
        // The failed emission is not recorded.
        assert_eq!(host.emitted_events().len(), 1);
    }

    #[test]
    fn test_memory_limit() {
        let host = TestHost::new();
        host.set_memory_limit(10);
        host.meter_memory(MemoryUsage::number(8)).unwrap();
        let error = host.meter_memory(MemoryUsage::number(8)).unwrap_err();
        assert_eq!(error.limit, 10);
        assert_eq!(host.memory_used(MemoryKind::Number), 8);
    }

    #[test]
    fn test_key_validation() {
        let host = TestHost::new();
        assert!(host.validate_public_key(&[1, 2, 3]).unwrap());
        host.set_valid_public_keys(vec![vec![9, 9]]);
        assert!(host.validate_public_key(&[9, 9]).unwrap());
        assert!(!host.validate_public_key(&[1, 2, 3]).unwrap());
    }
}
