//! Select a stake-weighted group of beacon operators from submitted tickets.
//!
//! # Overview
//!
//! Every selection round is seeded by the most recent beacon output. Each staker derives one
//! ticket per virtual staker (a unit of `minimum_stake`) by hashing the seed with its address and
//! a 1-based virtual staker index. Tickets are submitted during a fixed window of blocks and the
//! [Selector] keeps the `group_size` lowest in ascending order. Once the window closes, the
//! submitters of the retained tickets (in rank order) form the selected group.
//!
//! # Details
//!
//! * Tickets are ordered by value only. Tickets of equal value keep their submission order.
//! * When the set is full, a new ticket is only accepted if it is strictly lower than the current
//!   maximum (which it evicts). Otherwise it is rejected with [Error::NotCompetitive].
//! * Every failed submission leaves the [Selector] unchanged.
//!
//! # Example
//!
//! ```rust
//! use beacon_selection::{ticket, Address, Config, Seed, Selector, Stakes};
//!
//! let mut stakes = Stakes::default();
//! let staker = Address::from([1u8; 20]);
//! stakes.deposit(staker, 3_000);
//!
//! let cfg = Config {
//!     group_size: 2,
//!     minimum_stake: 1_000,
//!     max_virtual_stakers: 10,
//!     ticket_submission_timeout: 5,
//! };
//! let seed = Seed::from(42);
//! let mut selector = Selector::new(cfg, seed, 0);
//! for t in ticket::generate(&seed, &staker, 3) {
//!     let _ = selector.submit_ticket(&stakes, &staker, t.value, t.virtual_staker_index, 1);
//! }
//! assert_eq!(selector.ordered_tickets().len(), 2);
//! assert_eq!(selector.selected_participants(5).unwrap(), vec![staker, staker]);
//! ```

use commonware_utils::hex;
use sha2::{Digest as _, Sha256};
use std::fmt::{Debug, Display};
use thiserror::Error;

mod ordered;
pub use ordered::{Insertion, Ordered};
mod selector;
pub use selector::{Config, Selector};
mod staking;
pub use staking::{virtual_stakers, Staking, Stakes};
pub mod ticket;
pub use ticket::{Ticket, Value};
mod window;
pub use window::Window;

/// Block height, the logical clock of every round.
pub type Height = u64;

/// Errors that can occur while collecting tickets.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("ticket submission window closed")]
    SubmissionWindowClosed,
    #[error("stake below minimum")]
    NotEligibleStaker,
    #[error("invalid virtual staker index: {0}")]
    InvalidVirtualIndex(u64),
    #[error("ticket value does not match staker and index")]
    InvalidTicket,
    #[error("duplicate ticket")]
    DuplicateTicket,
    #[error("ticket not lower than current maximum")]
    NotCompetitive,
    #[error("ticket submission in progress")]
    SubmissionInProgress,
    #[error("no tickets submitted")]
    NoTickets,
}

/// Size of an [Address] in bytes.
pub const ADDRESS_LENGTH: usize = 20;

/// Identity of a staker.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// Derive an address from the trailing bytes of the SHA-256 digest of a public key.
    pub fn from_public_key(public_key: &[u8]) -> Self {
        let digest = Sha256::digest(public_key);
        let mut raw = [0u8; ADDRESS_LENGTH];
        raw.copy_from_slice(&digest[digest.len() - ADDRESS_LENGTH..]);
        Self(raw)
    }
}

impl From<[u8; ADDRESS_LENGTH]> for Address {
    fn from(value: [u8; ADDRESS_LENGTH]) -> Self {
        Self(value)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Debug for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex(&self.0))
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex(&self.0))
    }
}

/// Size of a [Seed] in bytes.
pub const SEED_LENGTH: usize = 32;

/// Randomness (usually the previous beacon output) that seeds a selection round.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Seed([u8; SEED_LENGTH]);

impl Seed {
    /// Derive a seed from an arbitrary beacon output.
    pub fn hash(entry: &[u8]) -> Self {
        Self(Sha256::digest(entry).into())
    }
}

impl From<[u8; SEED_LENGTH]> for Seed {
    fn from(value: [u8; SEED_LENGTH]) -> Self {
        Self(value)
    }
}

/// Interpret a number as a big-endian 256-bit seed.
impl From<u64> for Seed {
    fn from(value: u64) -> Self {
        let mut raw = [0u8; SEED_LENGTH];
        raw[SEED_LENGTH - 8..].copy_from_slice(&value.to_be_bytes());
        Self(raw)
    }
}

impl AsRef<[u8]> for Seed {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Debug for Seed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex(&self.0))
    }
}

impl Display for Seed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex(&self.0))
    }
}
