//! Deterministic members for tests and simulations.

use crate::{
    signatures::{self, Support},
    Digest,
};
use beacon_selection::Address;
use bytes::Bytes;
use ed25519_consensus::SigningKey;
use rand::{rngs::StdRng, SeedableRng};

/// A staker holding a signing key.
#[derive(Clone)]
pub struct Signer {
    pub key: SigningKey,
    pub address: Address,
}

impl Signer {
    /// Derive a signer from a seed.
    pub fn new(seed: u64) -> Self {
        let key = SigningKey::new(StdRng::seed_from_u64(seed));
        let address = Address::from_public_key(&key.verification_key().to_bytes());
        Self { key, address }
    }

    /// Sign `digest` as the member holding `rank`.
    pub fn sign(&self, rank: u32, digest: &Digest) -> Support {
        signatures::sign(&self.key, rank, digest)
    }
}

/// Create `n` signers from seeds `0..n`.
pub fn signers(n: u64) -> Vec<Signer> {
    (0..n).map(Signer::new).collect()
}

/// Sign `digest` for each of `ranks` with the signer holding it in `participants`.
///
/// Ranks held by unknown participants are skipped.
pub fn sign_ranks(
    signers: &[Signer],
    participants: &[Address],
    digest: &Digest,
    ranks: impl IntoIterator<Item = u32>,
) -> Vec<Support> {
    ranks
        .into_iter()
        .filter_map(|rank| {
            let holder = participants.get((rank as usize).checked_sub(1)?)?;
            let signer = signers.iter().find(|s| s.address == *holder)?;
            Some(signer.sign(rank, digest))
        })
        .collect()
}

/// A group public key of `size` bytes filled with `fill`.
pub fn group_public_key(size: usize, fill: u8) -> Bytes {
    Bytes::from(vec![fill; size])
}
