use crate::{Bitmap, Config, Error};
use beacon_selection::{Address, Height};
use bytes::{BufMut, Bytes};
use commonware_utils::hex;
use sha2::{Digest as _, Sha256};
use std::fmt::{Debug, Display};

/// Size of a [Digest] in bytes.
pub const DIGEST_LENGTH: usize = 32;

/// SHA-256 digest of an encoded [DkgResult].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Digest([u8; DIGEST_LENGTH]);

impl From<[u8; DIGEST_LENGTH]> for Digest {
    fn from(value: [u8; DIGEST_LENGTH]) -> Self {
        Self(value)
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Debug for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex(&self.0))
    }
}

impl Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex(&self.0))
    }
}

/// Outcome of a DKG as published by a participant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DkgResult {
    pub success: bool,
    pub group_public_key: Bytes,
    pub disqualified: Bitmap,
    pub inactive: Bitmap,
}

impl DkgResult {
    /// Encode the result as `success || len(key) || key || flags(disqualified) || flags(inactive)`
    /// where lengths are big-endian `u32` and flags are one byte per member.
    pub fn encode(&self) -> Vec<u8> {
        let disqualified = self.disqualified.to_flags();
        let inactive = self.inactive.to_flags();
        let mut payload = Vec::with_capacity(
            1 + 4 + self.group_public_key.len() + 4 + disqualified.len() + 4 + inactive.len(),
        );
        payload.put_u8(u8::from(self.success));
        payload.put_u32(self.group_public_key.len() as u32);
        payload.extend_from_slice(&self.group_public_key);
        payload.put_u32(disqualified.len() as u32);
        payload.extend_from_slice(&disqualified);
        payload.put_u32(inactive.len() as u32);
        payload.extend_from_slice(&inactive);
        payload
    }

    /// Hash of the encoded result.
    pub fn digest(&self) -> Digest {
        Digest(Sha256::digest(self.encode()).into())
    }

    /// Members marked as either disqualified or inactive.
    ///
    /// Returns `None` if the bitmaps cover a different number of members.
    pub fn misbehaved(&self) -> Option<Bitmap> {
        self.disqualified.union(&self.inactive)
    }

    /// Participants that remain group members, in rank order.
    pub fn members(&self, participants: &[Address]) -> Vec<Address> {
        participants
            .iter()
            .enumerate()
            .filter(|(i, _)| {
                let rank = *i as u32 + 1;
                !self.disqualified.contains(rank) && !self.inactive.contains(rank)
            })
            .map(|(_, p)| *p)
            .collect()
    }

    /// Check the format of the result for a group of `participants` members.
    pub fn validate(&self, cfg: &Config, participants: usize) -> Result<(), Error> {
        if self.group_public_key.len() != cfg.group_public_key_size {
            return Err(Error::MalformedGroupPublicKey);
        }
        if self.disqualified.size() != participants || self.inactive.size() != participants {
            return Err(Error::MalformedBitmap);
        }
        let misbehaved = self.misbehaved().ok_or(Error::MalformedBitmap)?;
        let allowed = participants.saturating_sub(cfg.signature_threshold);
        if misbehaved.count() > allowed {
            return Err(Error::TooManyMisbehaved);
        }
        Ok(())
    }
}

/// A result accepted for a round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Accepted {
    pub result: DkgResult,
    pub digest: Digest,
    pub submitter: Address,
    pub rank: u32,
    pub height: Height,
}
