//! Derive and verify tickets.
//!
//! A ticket value is `SHA-256(seed || staker || virtual_staker_index)` where the index is encoded
//! as a big-endian `u64`. Values are compared as big-endian 256-bit integers.

use crate::{Address, Seed, ADDRESS_LENGTH, SEED_LENGTH};
use bytes::BufMut;
use commonware_utils::hex;
use sha2::{Digest as _, Sha256};
use std::{
    fmt::{Debug, Display},
    mem::size_of,
};

/// Size of a ticket [Value] in bytes.
pub const VALUE_LENGTH: usize = 32;

/// A 256-bit ticket value.
///
/// The derived ordering of the big-endian byte array matches numeric order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Value([u8; VALUE_LENGTH]);

impl From<[u8; VALUE_LENGTH]> for Value {
    fn from(value: [u8; VALUE_LENGTH]) -> Self {
        Self(value)
    }
}

/// Interpret a number as a big-endian 256-bit value.
impl From<u64> for Value {
    fn from(value: u64) -> Self {
        let mut raw = [0u8; VALUE_LENGTH];
        raw[VALUE_LENGTH - 8..].copy_from_slice(&value.to_be_bytes());
        Self(raw)
    }
}

impl AsRef<[u8]> for Value {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex(&self.0))
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex(&self.0))
    }
}

/// A submitted ticket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Ticket {
    pub value: Value,
    pub virtual_staker_index: u64,
    pub submitter: Address,
}

/// Create the hashed payload of a ticket.
fn payload(seed: &Seed, staker: &Address, index: u64) -> Vec<u8> {
    let mut payload = Vec::with_capacity(SEED_LENGTH + ADDRESS_LENGTH + size_of::<u64>());
    payload.extend_from_slice(seed.as_ref());
    payload.extend_from_slice(staker.as_ref());
    payload.put_u64(index);
    payload
}

/// Compute the ticket value of `staker` for virtual staker `index`.
pub fn value(seed: &Seed, staker: &Address, index: u64) -> Value {
    Value(Sha256::digest(payload(seed, staker, index)).into())
}

/// Returns true if `value` is the ticket of `staker` for virtual staker `index`.
pub fn verify(seed: &Seed, staker: &Address, index: u64, value: &Value) -> bool {
    self::value(seed, staker, index) == *value
}

/// Generate all tickets of a staker with `weight` virtual stakers, in index order.
pub fn generate(seed: &Seed, staker: &Address, weight: u64) -> Vec<Ticket> {
    (1..=weight)
        .map(|index| Ticket {
            value: value(seed, staker, index),
            virtual_staker_index: index,
            submitter: *staker,
        })
        .collect()
}
