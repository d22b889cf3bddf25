//! Solana addresses.
//!
//! An address is a 32-byte value: either an Ed25519 public key or a
//! program-derived address that is guaranteed to lie off the curve. The text
//! form is the Base58 encoding of the raw bytes (standard Bitcoin alphabet,
//! as implemented by the `bs58` crate). No hashing is applied.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::SolError;

/// Length in bytes of every Solana address.
pub const ADDRESS_LEN: usize = 32;

/// A 32-byte Solana account address.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// Wrap raw bytes. Usable in `const` context for program IDs.
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Build an address from a byte slice, which must be exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, SolError> {
        let arr: [u8; ADDRESS_LEN] = bytes.try_into().map_err(|_| {
            SolError::InvalidAddress(format!("expected 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    pub fn to_bytes(self) -> [u8; ADDRESS_LEN] {
        self.0
    }

    /// Whether these bytes decompress to a valid Ed25519 point.
    ///
    /// Public keys are always on the curve; program-derived addresses never
    /// are, which is what guarantees nobody holds a private key for them.
    pub fn is_on_curve(&self) -> bool {
        is_on_curve(&self.0)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; ADDRESS_LEN]> for Address {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

impl From<Address> for [u8; ADDRESS_LEN] {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl FromStr for Address {
    type Err = SolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        address_to_bytes(s).map(Self)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bytes_to_address(&self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Validate a Solana address string.
///
/// A valid address is a Base58 string that decodes to exactly 32 bytes.
pub fn validate_address(address: &str) -> Result<bool, SolError> {
    address_to_bytes(address).map(|_| true)
}

/// Decode a Solana address string to its 32-byte representation.
pub fn address_to_bytes(address: &str) -> Result<[u8; ADDRESS_LEN], SolError> {
    let bytes = bs58::decode(address)
        .into_vec()
        .map_err(|e| SolError::InvalidAddress(format!("base58 decode failed: {e}")))?;

    let arr: [u8; ADDRESS_LEN] = bytes.try_into().map_err(|v: Vec<u8>| {
        SolError::InvalidAddress(format!("expected 32 bytes, got {}", v.len()))
    })?;

    Ok(arr)
}

/// Encode 32 bytes as a Solana address (Base58 string).
pub fn bytes_to_address(bytes: &[u8; ADDRESS_LEN]) -> String {
    bs58::encode(bytes).into_string()
}

/// Check if 32 bytes represent a valid Ed25519 curve point.
///
/// Uses `curve25519-dalek` to attempt decompression. If it succeeds, the
/// point is on the curve.
pub fn is_on_curve(bytes: &[u8; ADDRESS_LEN]) -> bool {
    curve25519_dalek::edwards::CompressedEdwardsY(*bytes)
        .decompress()
        .is_some()
}
