//! Run group selection and DKG result publication rounds of a threshold random beacon.
//!
//! # Overview
//!
//! The [Engine] owns every round and processes commands from its [Mailbox] one at a time, so
//! no locking is required. Block height is a logical clock moved forward with
//! [Mailbox::advance].
//!
//! A round flows through:
//!
//! 1. A relay entry (beacon output) arrives. The registry selects the active group that should
//!    sign the next entry and, if no round is in progress, a new selection round is seeded with
//!    the entry.
//! 2. Stakers submit tickets until the submission window closes.
//! 3. The selected participants run an off-chain DKG and publish the result, either first valid
//!    submission wins ([Policy::FirstValid]) or every rank votes ([Policy::Vote]).
//! 4. The accepted result is registered as a new group (without misbehaved members).
//!
//! Rounds that time out without a result are marked as failed so that the next relay entry can
//! start a fresh selection. Completed rounds are retained and can be inspected with
//! [Mailbox::round].
//!
//! # Atomicity
//!
//! Every command either applies fully or returns an [Error] and leaves all state untouched.

pub mod config;
pub use config::{Config, Policy};
mod engine;
pub use engine::Engine;
mod ingress;
pub use ingress::{Mailbox, Message};
mod metrics;
mod state;
pub use state::{Event, RelayOutcome, State, Status, Summary};

use thiserror::Error;

/// Errors that can occur while processing an operator command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("selection: {0}")]
    Selection(#[from] beacon_selection::Error),
    #[error("dkg: {0}")]
    Dkg(#[from] beacon_dkg::Error),
    #[error("no round")]
    NoRound,
    #[error("round in progress")]
    RoundInProgress,
    #[error("command not supported by result policy")]
    WrongPolicy,
}
