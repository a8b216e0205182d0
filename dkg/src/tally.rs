use crate::{Bitmap, Config, Digest, DkgResult, Error, Schedule};
use beacon_selection::{Address, Height};
use std::collections::HashMap;

/// Collects one vote per rank and resolves the result with the most votes.
pub struct Tally {
    cfg: Config,
    participants: Vec<Address>,
    schedule: Schedule,

    /// Vote counts in order of first submission.
    votes: Vec<(Digest, u32)>,
    results: HashMap<Digest, DkgResult>,
    voted: Bitmap,
}

impl Tally {
    /// Open voting for `participants` (in rank order) once selection closed at
    /// `selection_closed_at`.
    pub fn new(
        cfg: Config,
        participants: Vec<Address>,
        selection_closed_at: Height,
    ) -> Result<Self, Error> {
        if participants.is_empty() {
            return Err(Error::NoParticipants);
        }
        let schedule = Schedule::new(
            selection_closed_at.saturating_add(cfg.time_dkg),
            cfg.result_publication_step,
            participants.len(),
        );
        let voted = Bitmap::new(participants.len());
        Ok(Self {
            cfg,
            participants,
            schedule,
            votes: Vec::new(),
            results: HashMap::new(),
            voted,
        })
    }

    /// First height at which `rank` may vote.
    pub fn eligible_block(&self, rank: u32) -> Result<Height, Error> {
        self.schedule.eligible_block(rank)
    }

    /// Vote for `result` as the participant holding `rank`.
    ///
    /// Returns the digest of the result voted for.
    pub fn vote(
        &mut self,
        submitter: &Address,
        rank: u32,
        result: DkgResult,
        now: Height,
    ) -> Result<Digest, Error> {
        let holder = (rank as usize)
            .checked_sub(1)
            .and_then(|index| self.participants.get(index))
            .ok_or(Error::InvalidRank(rank))?;
        if holder != submitter {
            return Err(Error::WrongRank);
        }
        if self.voted.contains(rank) {
            return Err(Error::AlreadyVoted);
        }
        let eligible = self.schedule.eligible_block(rank)?;
        if now < eligible {
            return Err(Error::NotYetEligible(eligible));
        }
        if now >= self.schedule.timeout() {
            return Err(Error::TimedOut);
        }
        result.validate(&self.cfg, self.participants.len())?;

        let digest = result.digest();
        match self.votes.iter_mut().find(|(d, _)| *d == digest) {
            Some((_, count)) => *count += 1,
            None => {
                self.votes.push((digest, 1));
                self.results.insert(digest, result);
            }
        }
        self.voted.insert(rank);
        Ok(digest)
    }

    /// Returns true if `rank` already voted.
    pub fn has_voted(&self, rank: u32) -> bool {
        self.voted.contains(rank)
    }

    /// Vote counts per result digest, in order of first submission.
    pub fn submissions(&self) -> &[(Digest, u32)] {
        &self.votes
    }

    /// Returns true once every rank voted.
    pub fn is_complete(&self) -> bool {
        self.voted.count() == self.participants.len()
    }

    /// Returns true if the result can be resolved at `now`.
    pub fn is_final(&self, now: Height) -> bool {
        self.is_complete() || now >= self.schedule.timeout()
    }

    /// The result with the most votes, ties going to the earliest submitted.
    ///
    /// Only available once every rank voted or voting timed out.
    pub fn final_result(&self, now: Height) -> Result<(Digest, &DkgResult), Error> {
        if !self.is_final(now) {
            return Err(Error::NotReady);
        }
        let mut best: Option<(Digest, u32)> = None;
        for (digest, count) in &self.votes {
            if best.map_or(true, |(_, top)| *count > top) {
                best = Some((*digest, *count));
            }
        }
        let (digest, _) = best.ok_or(Error::NoSubmissions)?;
        let result = self.results.get(&digest).ok_or(Error::NoSubmissions)?;
        Ok((digest, result))
    }

    /// Members of the resolved group (participants not marked as misbehaved).
    pub fn group_members(&self, now: Height) -> Result<Vec<Address>, Error> {
        let (_, result) = self.final_result(now)?;
        Ok(result.members(&self.participants))
    }

    pub fn participants(&self) -> &[Address] {
        &self.participants
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks;
    use commonware_macros::test_traced;

    const KEY_SIZE: usize = 128;

    fn config() -> Config {
        Config {
            signature_threshold: 3,
            group_public_key_size: KEY_SIZE,
            result_publication_step: 2,
            time_dkg: 0,
        }
    }

    fn result(size: usize, fill: u8) -> DkgResult {
        DkgResult {
            success: true,
            group_public_key: mocks::group_public_key(KEY_SIZE, fill),
            disqualified: Bitmap::new(size),
            inactive: Bitmap::new(size),
        }
    }

    fn participants(n: u64) -> Vec<Address> {
        mocks::signers(n).into_iter().map(|s| s.address).collect()
    }

    #[test_traced]
    fn test_unanimous() {
        let participants = participants(5);
        let mut tally = Tally::new(config(), participants.clone(), 0).unwrap();
        let dkg = result(5, 1);
        for (i, p) in participants.iter().enumerate() {
            let rank = i as u32 + 1;
            let now = tally.eligible_block(rank).unwrap();
            assert_eq!(tally.final_result(now), Err(Error::NotReady));
            tally.vote(p, rank, dkg.clone(), now).unwrap();
            assert!(tally.has_voted(rank));
        }
        assert!(tally.is_complete());
        assert_eq!(tally.submissions(), &[(dkg.digest(), 5)]);
        let (digest, resolved) = tally.final_result(8).unwrap();
        assert_eq!(digest, dkg.digest());
        assert_eq!(resolved.group_public_key, dkg.group_public_key);
        assert_eq!(tally.group_members(8).unwrap(), participants);
    }

    #[test]
    fn test_vote_once_per_rank() {
        let participants = participants(3);
        let mut tally = Tally::new(config(), participants.clone(), 0).unwrap();
        tally.vote(&participants[0], 1, result(3, 1), 0).unwrap();
        assert_eq!(
            tally.vote(&participants[0], 1, result(3, 2), 0),
            Err(Error::AlreadyVoted)
        );
        assert_eq!(
            tally.vote(&participants[0], 2, result(3, 2), 2),
            Err(Error::WrongRank)
        );
        assert_eq!(
            tally.vote(&participants[1], 2, result(3, 2), 1),
            Err(Error::NotYetEligible(2))
        );
        assert_eq!(
            tally.vote(&participants[2], 3, result(3, 2), 6),
            Err(Error::TimedOut)
        );
        assert_eq!(tally.submissions().len(), 1);
    }

    #[test]
    fn test_most_votes_wins() {
        let participants = participants(5);
        let mut tally = Tally::new(config(), participants.clone(), 0).unwrap();
        let a = result(5, 1);
        let b = result(5, 2);
        tally.vote(&participants[0], 1, a.clone(), 8).unwrap();
        tally.vote(&participants[1], 2, b.clone(), 8).unwrap();
        tally.vote(&participants[2], 3, b.clone(), 8).unwrap();
        tally.vote(&participants[3], 4, a.clone(), 8).unwrap();
        tally.vote(&participants[4], 5, b.clone(), 8).unwrap();
        assert_eq!(
            tally.submissions(),
            &[(a.digest(), 2), (b.digest(), 3)]
        );
        assert_eq!(tally.final_result(9).unwrap().0, b.digest());
    }

    #[test]
    fn test_tie_goes_to_earliest() {
        let participants = participants(4);
        let mut tally = Tally::new(config(), participants.clone(), 0).unwrap();
        let a = result(4, 1);
        let b = result(4, 2);
        tally.vote(&participants[0], 1, b.clone(), 6).unwrap();
        tally.vote(&participants[1], 2, a.clone(), 6).unwrap();
        tally.vote(&participants[2], 3, a.clone(), 6).unwrap();

        // Not every rank voted yet
        assert_eq!(tally.final_result(7), Err(Error::NotReady));
        tally.vote(&participants[3], 4, b.clone(), 7).unwrap();
        assert_eq!(tally.final_result(7).unwrap().0, b.digest());
    }

    #[test]
    fn test_timeout_resolves_partial_votes() {
        let participants = participants(3);
        let mut tally = Tally::new(config(), participants.clone(), 10).unwrap();
        let dkg = result(3, 9);
        tally.vote(&participants[0], 1, dkg.clone(), 10).unwrap();
        assert_eq!(tally.final_result(15), Err(Error::NotReady));
        assert_eq!(tally.final_result(16).unwrap().0, dkg.digest());
    }

    #[test]
    fn test_no_votes() {
        let participants = participants(2);
        let tally = Tally::new(config(), participants, 0).unwrap();
        assert_eq!(tally.final_result(4), Err(Error::NoSubmissions));
        assert!(Tally::new(config(), Vec::new(), 0).is_err());
    }
}
