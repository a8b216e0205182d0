use crate::Error;
use beacon_selection::Height;

/// Rank-ordered publication schedule of a round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Schedule {
    /// First height at which rank 1 may publish.
    pub start: Height,

    /// Blocks between consecutive ranks.
    pub step: u64,

    /// Number of ranks.
    pub participants: usize,
}

impl Schedule {
    pub fn new(start: Height, step: u64, participants: usize) -> Self {
        Self {
            start,
            step,
            participants,
        }
    }

    /// First height at which `rank` (1-based) may publish.
    pub fn eligible_block(&self, rank: u32) -> Result<Height, Error> {
        if rank == 0 || rank as usize > self.participants {
            return Err(Error::InvalidRank(rank));
        }
        Ok(self
            .start
            .saturating_add(u64::from(rank - 1).saturating_mul(self.step)))
    }

    /// Returns true if `rank` may publish at `now`.
    pub fn is_eligible(&self, rank: u32, now: Height) -> Result<bool, Error> {
        Ok(now >= self.eligible_block(rank)?)
    }

    /// First height at which no rank may publish.
    pub fn timeout(&self) -> Height {
        self.start
            .saturating_add((self.participants as u64).saturating_mul(self.step))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eligible_block() {
        let schedule = Schedule::new(100, 2, 20);
        assert_eq!(schedule.eligible_block(1), Ok(100));
        assert_eq!(schedule.eligible_block(2), Ok(102));
        assert_eq!(schedule.eligible_block(20), Ok(138));
        assert_eq!(schedule.eligible_block(0), Err(Error::InvalidRank(0)));
        assert_eq!(schedule.eligible_block(21), Err(Error::InvalidRank(21)));
        assert_eq!(schedule.timeout(), 140);
    }

    #[test]
    fn test_is_eligible() {
        let schedule = Schedule::new(10, 3, 4);
        assert_eq!(schedule.is_eligible(1, 9), Ok(false));
        assert_eq!(schedule.is_eligible(1, 10), Ok(true));
        assert_eq!(schedule.is_eligible(3, 15), Ok(false));
        assert_eq!(schedule.is_eligible(3, 16), Ok(true));
    }

    #[test]
    fn test_monotonic() {
        let schedule = Schedule::new(0, 5, 10);
        for rank in 1..10 {
            let a = schedule.eligible_block(rank).unwrap();
            let b = schedule.eligible_block(rank + 1).unwrap();
            assert_eq!(b - a, 5);
            assert!(b < schedule.timeout());
        }
    }
}
