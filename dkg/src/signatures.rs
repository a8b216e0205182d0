//! Signatures of group members supporting a published result.

use crate::{Digest, Error};
use beacon_selection::Address;
use commonware_utils::union_unique;
use ed25519_consensus::{Signature, SigningKey, VerificationKey};
use std::collections::HashSet;

/// Namespace of result support signatures.
pub const RESULT_NAMESPACE: &[u8] = b"_BEACON_DKG_RESULT_";

/// A member's signature over a result [Digest].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Support {
    /// Rank of the signing member (1-based).
    pub member: u32,
    pub public_key: [u8; 32],
    pub signature: [u8; 64],
}

/// Sign `digest` as `member`.
pub fn sign(key: &SigningKey, member: u32, digest: &Digest) -> Support {
    let signature = key.sign(&union_unique(RESULT_NAMESPACE, digest.as_ref()));
    Support {
        member,
        public_key: key.verification_key().to_bytes(),
        signature: signature.to_bytes(),
    }
}

/// Verify that at least `threshold` distinct members signed `digest`.
///
/// Each signer's public key must derive the [Address] of the participant holding its rank.
pub fn verify(
    participants: &[Address],
    digest: &Digest,
    supports: &[Support],
    threshold: usize,
) -> Result<(), Error> {
    if supports.len() > participants.len() {
        return Err(Error::TooManySignatures);
    }
    if supports.len() < threshold {
        return Err(Error::TooFewSignatures);
    }
    let message = union_unique(RESULT_NAMESPACE, digest.as_ref());
    let mut seen = HashSet::new();
    for support in supports {
        let participant = (support.member as usize)
            .checked_sub(1)
            .and_then(|index| participants.get(index))
            .ok_or(Error::InvalidMemberIndex(support.member))?;
        if !seen.insert(support.member) {
            return Err(Error::DuplicateMemberIndex(support.member));
        }
        if Address::from_public_key(&support.public_key) != *participant {
            return Err(Error::SignerMismatch);
        }
        let key =
            VerificationKey::try_from(support.public_key).map_err(|_| Error::InvalidSignature)?;
        key.verify(&Signature::from(support.signature), &message)
            .map_err(|_| Error::InvalidSignature)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn members(n: usize) -> (Vec<SigningKey>, Vec<Address>) {
        let mut rng = StdRng::seed_from_u64(0);
        let keys: Vec<SigningKey> = (0..n).map(|_| SigningKey::new(&mut rng)).collect();
        let addresses = keys
            .iter()
            .map(|k| Address::from_public_key(&k.verification_key().to_bytes()))
            .collect();
        (keys, addresses)
    }

    #[test]
    fn test_verify() {
        let (keys, participants) = members(5);
        let digest = Digest::from([7u8; 32]);
        let supports: Vec<Support> = keys
            .iter()
            .take(3)
            .enumerate()
            .map(|(i, k)| sign(k, i as u32 + 1, &digest))
            .collect();
        assert_eq!(verify(&participants, &digest, &supports, 3), Ok(()));
        assert_eq!(
            verify(&participants, &digest, &supports, 4),
            Err(Error::TooFewSignatures)
        );

        // Wrong digest
        assert_eq!(
            verify(&participants, &Digest::from([8u8; 32]), &supports, 3),
            Err(Error::InvalidSignature)
        );
    }

    #[test]
    fn test_member_checks() {
        let (keys, participants) = members(3);
        let digest = Digest::from([1u8; 32]);

        let duplicate = vec![sign(&keys[0], 1, &digest), sign(&keys[0], 1, &digest)];
        assert_eq!(
            verify(&participants, &digest, &duplicate, 2),
            Err(Error::DuplicateMemberIndex(1))
        );

        let out_of_range = vec![sign(&keys[0], 4, &digest)];
        assert_eq!(
            verify(&participants, &digest, &out_of_range, 1),
            Err(Error::InvalidMemberIndex(4))
        );
        let zero = vec![sign(&keys[0], 0, &digest)];
        assert_eq!(
            verify(&participants, &digest, &zero, 1),
            Err(Error::InvalidMemberIndex(0))
        );

        let mismatch = vec![sign(&keys[1], 1, &digest)];
        assert_eq!(
            verify(&participants, &digest, &mismatch, 1),
            Err(Error::SignerMismatch)
        );

        let too_many: Vec<Support> = (0..4).map(|i| sign(&keys[i % 3], 1, &digest)).collect();
        assert_eq!(
            verify(&participants, &digest, &too_many, 1),
            Err(Error::TooManySignatures)
        );
    }

    #[test]
    fn test_tampered_signature() {
        let (keys, participants) = members(1);
        let digest = Digest::from([1u8; 32]);
        let mut support = sign(&keys[0], 1, &digest);
        support.signature[0] ^= 1;
        assert_eq!(
            verify(&participants, &digest, &[support], 1),
            Err(Error::InvalidSignature)
        );
    }
}
