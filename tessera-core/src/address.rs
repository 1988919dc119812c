// Copyright 2024-2026, Tessera Labs, Inc.
// For licensing, see https://github.com/tessera-lang/tessera-rs/blob/main/licenses/COPYRIGHT.md

use alloy_primitives::FixedBytes;
use core::fmt;

/// An on-chain account address. Addresses are 8 bytes and are rendered in
/// hex with a `0x` prefix, with leading zero bytes trimmed.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountAddress(FixedBytes<8>);

impl AccountAddress {
    /// The number of bytes in an address.
    pub const LENGTH: usize = 8;

    /// The all-zero address. Transient values that have not been persisted
    /// into an account allocate their slabs under this address.
    pub const ZERO: Self = Self(FixedBytes::ZERO);

    pub const fn new(bytes: [u8; 8]) -> Self {
        Self(FixedBytes::new(bytes))
    }

    pub fn from_u64(value: u64) -> Self {
        Self(FixedBytes::new(value.to_be_bytes()))
    }

    pub fn to_u64(self) -> u64 {
        u64::from_be_bytes(self.0 .0)
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0 .0
    }
}

impl From<u64> for AccountAddress {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl From<[u8; 8]> for AccountAddress {
    fn from(bytes: [u8; 8]) -> Self {
        Self::new(bytes)
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.as_bytes();
        let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
        write!(f, "0x{}", hex::encode(&bytes[first..]))
    }
}

impl fmt::Debug for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let address = AccountAddress::from_u64(0x42);
        assert_eq!(address.to_u64(), 0x42);
        assert_eq!(AccountAddress::new(*address.as_bytes()), address);
    }

    #[test]
    fn test_display_trims_leading_zeros() {
        assert_eq!(AccountAddress::from_u64(1).to_string(), "0x01");
        assert_eq!(AccountAddress::ZERO.to_string(), "0x00");
        assert_eq!(
            AccountAddress::new([0xca, 0xfe, 0, 0, 0, 0, 0, 0x01]).to_string(),
            "0xcafe000000000001",
        );
    }
}
