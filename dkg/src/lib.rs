//! Coordinate publication of distributed key generation (DKG) results by a selected group.
//!
//! # Overview
//!
//! Once a [beacon_selection::Selector] has closed, its selected participants run an off-chain DKG
//! and one of them publishes the outcome: the group public key together with bitmaps of the
//! members that were disqualified or inactive. Publication is gated by rank:
//!
//! ```txt
//! eligible_block(rank) = publication_start + (rank - 1) * result_publication_step
//! publication_start    = selection_closed_at + time_dkg
//! timeout              = publication_start + participants * result_publication_step
//! ```
//!
//! Earlier ranks get the first opportunity and later ranks act as a fallback. A participant may
//! only publish under a rank it holds.
//!
//! # Policies
//!
//! * [Coordinator] accepts the first valid result (supported by at least `signature_threshold`
//!   [signatures::Support]s from distinct members) and rejects every later submission.
//! * [Tally] lets every rank vote once and resolves the result with the most votes once all
//!   ranks voted or the round timed out. Ties go to the result that was submitted first.
//!
//! Accepted results are handed to the [groups::Registry], which tracks the active groups that
//! may be asked for a relay entry.
//!
//! # Atomicity
//!
//! Every operation validates before it mutates: a call that returns an error leaves the state
//! exactly as it was.

use thiserror::Error;

pub mod bitmap;
pub use bitmap::Bitmap;
mod config;
pub use config::Config;
mod coordinator;
pub use coordinator::{Coordinator, State};
mod eligibility;
pub use eligibility::Schedule;
pub mod groups;
pub mod mocks;
mod result;
pub use result::{Accepted, Digest, DkgResult};
pub mod signatures;
mod tally;
pub use tally::Tally;

/// Errors that can occur while publishing a DKG result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("round not started")]
    NotStarted,
    #[error("round already started")]
    AlreadyStarted,
    #[error("no participants")]
    NoParticipants,
    #[error("result already accepted")]
    AlreadyAccepted,
    #[error("result publication timed out")]
    TimedOut,
    #[error("result publication not timed out")]
    NotTimedOut,
    #[error("invalid rank: {0}")]
    InvalidRank(u32),
    #[error("submitter does not hold rank")]
    WrongRank,
    #[error("not yet eligible (eligible at {0})")]
    NotYetEligible(u64),
    #[error("malformed group public key")]
    MalformedGroupPublicKey,
    #[error("malformed bitmap")]
    MalformedBitmap,
    #[error("too many misbehaved members")]
    TooManyMisbehaved,
    #[error("too few signatures")]
    TooFewSignatures,
    #[error("too many signatures")]
    TooManySignatures,
    #[error("invalid member index: {0}")]
    InvalidMemberIndex(u32),
    #[error("duplicate member index: {0}")]
    DuplicateMemberIndex(u32),
    #[error("signer is not the member")]
    SignerMismatch,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("already voted")]
    AlreadyVoted,
    #[error("result not ready")]
    NotReady,
    #[error("no submissions")]
    NoSubmissions,
    #[error("duplicate group")]
    DuplicateGroup,
    #[error("group does not exist")]
    GroupNotFound,
    #[error("no active groups")]
    NoActiveGroups,
}
