// Copyright 2024-2026, Tessera Labs, Inc.
// For licensing, see https://github.com/tessera-lang/tessera-rs/blob/main/licenses/COPYRIGHT.md

//! Defines host environment methods the Tessera runtime has access to.
//!
//! The host trait is a composition of small single-purpose traits, so
//! embedders and tests can implement exactly the surface they care about and
//! the interpreter can hold one `Rc<dyn Host>`. Callbacks are synchronous;
//! they are the runtime's only outward I/O.

use core::fmt;

use crate::error::HostError;
use crate::meter::MemoryGauge;

/// A single rendered field of an emitted event, in declaration order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventField {
    pub name: String,
    pub value: String,
}

/// An event delivered to the host: the qualified identifier of the event
/// type and its fields rendered in declaration order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventData {
    pub type_id: String,
    pub fields: Vec<EventField>,
}

impl EventData {
    pub fn new(type_id: impl Into<String>, fields: Vec<(String, String)>) -> Self {
        Self {
            type_id: type_id.into(),
            fields: fields
                .into_iter()
                .map(|(name, value)| EventField { name, value })
                .collect(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }
}

impl fmt::Display for EventData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.type_id)?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", field.name, field.value)?;
        }
        f.write_str(")")
    }
}

/// Monotonic resource id generation.
pub trait UuidAccess {
    fn generate_uuid(&self) -> Result<u64, HostError>;
}

/// The event sink. Emissions are delivered synchronously, in source order.
/// A fatal error aborts the emitting frame and is surfaced unreclassified.
pub trait EventAccess {
    fn emit_event(&self, event: EventData) -> Result<(), HostError>;
}

/// Validation hook invoked when a `PublicKey` composite is constructed.
pub trait KeyValidationAccess {
    fn validate_public_key(&self, public_key: &[u8]) -> Result<bool, HostError>;
}

/// The host trait defines the methods the runtime can use to interact with
/// its embedder. It is a composition of traits with different access to host
/// facilities.
pub trait Host: UuidAccess + EventAccess + KeyValidationAccess + MemoryGauge {}

impl<T> Host for T where T: UuidAccess + EventAccess + KeyValidationAccess + MemoryGauge {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_rendering() {
        let event = EventData::new(
            "t.test.InterX",
            vec![("x".to_owned(), "1".to_owned())],
        );
        assert_eq!(event.to_string(), "t.test.InterX(x: 1)");
        assert_eq!(event.field("x"), Some("1"));
        assert_eq!(event.field("y"), None);
    }
}
