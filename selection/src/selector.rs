use crate::{
    staking::{virtual_stakers, Staking},
    ticket, Address, Error, Height, Insertion, Ordered, Seed, Ticket, Value, Window,
};
use std::collections::HashSet;

/// Configuration for a [Selector].
#[derive(Clone, Debug)]
pub struct Config {
    /// Number of tickets (and therefore participants) to select.
    pub group_size: usize,

    /// Stake backing a single virtual staker.
    pub minimum_stake: u128,

    /// Maximum number of virtual stakers (tickets) per staker.
    pub max_virtual_stakers: u64,

    /// Number of blocks during which tickets are accepted.
    pub ticket_submission_timeout: u64,
}

/// Collects tickets for a single selection round.
pub struct Selector {
    cfg: Config,
    seed: Seed,
    window: Window,
    tickets: Ordered,

    /// `(submitter, virtual_staker_index)` of every accepted ticket, including evicted ones.
    used: HashSet<(Address, u64)>,
}

impl Selector {
    /// Start a selection round seeded by `seed` at height `start`.
    pub fn new(cfg: Config, seed: Seed, start: Height) -> Self {
        let window = Window::new(start, cfg.ticket_submission_timeout);
        let tickets = Ordered::new(cfg.group_size);
        Self {
            cfg,
            seed,
            window,
            tickets,
            used: HashSet::new(),
        }
    }

    /// Submit a ticket on behalf of `submitter`.
    ///
    /// Checks are applied in order (window, stake, index, value, replay, competitiveness) and
    /// the selector is only modified if all of them pass.
    pub fn submit_ticket(
        &mut self,
        staking: &impl Staking,
        submitter: &Address,
        value: Value,
        virtual_staker_index: u64,
        now: Height,
    ) -> Result<Insertion, Error> {
        if !self.window.is_open(now) {
            return Err(Error::SubmissionWindowClosed);
        }
        let stake = staking.stake(submitter);
        if stake < self.cfg.minimum_stake || self.cfg.minimum_stake == 0 {
            return Err(Error::NotEligibleStaker);
        }
        let weight = virtual_stakers(stake, self.cfg.minimum_stake, self.cfg.max_virtual_stakers);
        if virtual_staker_index == 0 || virtual_staker_index > weight {
            return Err(Error::InvalidVirtualIndex(virtual_staker_index));
        }
        if !ticket::verify(&self.seed, submitter, virtual_staker_index, &value) {
            return Err(Error::InvalidTicket);
        }
        let key = (*submitter, virtual_staker_index);
        if self.used.contains(&key) {
            return Err(Error::DuplicateTicket);
        }
        let insertion = self.tickets.insert(Ticket {
            value,
            virtual_staker_index,
            submitter: *submitter,
        })?;
        self.used.insert(key);
        Ok(insertion)
    }

    /// Retained tickets in ascending order.
    pub fn ordered_tickets(&self) -> &[Ticket] {
        self.tickets.tickets()
    }

    /// Number of tickets accepted during the round (including evicted ones).
    pub fn submitted_count(&self) -> usize {
        self.used.len()
    }

    /// Submitters of the retained tickets in rank order.
    ///
    /// Only available once the submission window has closed.
    pub fn selected_participants(&self, now: Height) -> Result<Vec<Address>, Error> {
        if self.window.is_open(now) {
            return Err(Error::SubmissionInProgress);
        }
        if self.tickets.is_empty() {
            return Err(Error::NoTickets);
        }
        Ok(self.tickets.tickets().iter().map(|t| t.submitter).collect())
    }

    pub fn seed(&self) -> &Seed {
        &self.seed
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Returns true if the retained tickets are sorted and within capacity.
    pub fn is_consistent(&self) -> bool {
        self.tickets.is_consistent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Stakes;
    use commonware_macros::test_traced;
    use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

    const MINIMUM_STAKE: u128 = 1_000;

    fn config(group_size: usize) -> Config {
        Config {
            group_size,
            minimum_stake: MINIMUM_STAKE,
            max_virtual_stakers: 20,
            ticket_submission_timeout: 12,
        }
    }

    fn staker(i: u8) -> Address {
        Address::from([i; 20])
    }

    fn stakes(weights: &[(u8, u64)]) -> Stakes {
        let mut stakes = Stakes::default();
        for (i, weight) in weights {
            stakes.deposit(staker(*i), MINIMUM_STAKE * *weight as u128);
        }
        stakes
    }

    #[test_traced]
    fn test_fill_group_from_three_stakers() {
        let stakes = stakes(&[(1, 10), (2, 7), (3, 3)]);
        let seed = Seed::from(31415);
        let mut selector = Selector::new(config(20), seed, 100);
        for (i, weight) in [(1u8, 10u64), (2, 7), (3, 3)] {
            for t in ticket::generate(&seed, &staker(i), weight) {
                selector
                    .submit_ticket(&stakes, &t.submitter, t.value, t.virtual_staker_index, 101)
                    .unwrap();
                assert!(selector.is_consistent());
            }
        }
        assert_eq!(selector.ordered_tickets().len(), 20);
        assert_eq!(selector.submitted_count(), 20);

        // Participants are only available once the window is closed
        assert_eq!(
            selector.selected_participants(111),
            Err(Error::SubmissionInProgress)
        );
        let participants = selector.selected_participants(112).unwrap();
        assert_eq!(participants.len(), 20);
        for (i, expected) in [(1u8, 10usize), (2, 7), (3, 3)] {
            let count = participants.iter().filter(|p| **p == staker(i)).count();
            assert_eq!(count, expected);
        }
    }

    #[test]
    fn test_window_closed() {
        let stakes = stakes(&[(1, 2)]);
        let seed = Seed::from(1);
        let mut selector = Selector::new(config(5), seed, 10);
        let value = ticket::value(&seed, &staker(1), 1);
        assert_eq!(
            selector.submit_ticket(&stakes, &staker(1), value, 1, 22),
            Err(Error::SubmissionWindowClosed)
        );
        assert!(selector.submit_ticket(&stakes, &staker(1), value, 1, 21).is_ok());
    }

    #[test]
    fn test_rejections_leave_state_untouched() {
        let stakes = stakes(&[(1, 2), (2, 0)]);
        let seed = Seed::from(9);
        let mut selector = Selector::new(config(5), seed, 0);

        // Stake below minimum
        let value = ticket::value(&seed, &staker(2), 1);
        assert_eq!(
            selector.submit_ticket(&stakes, &staker(2), value, 1, 0),
            Err(Error::NotEligibleStaker)
        );

        // Index out of range
        let value = ticket::value(&seed, &staker(1), 3);
        assert_eq!(
            selector.submit_ticket(&stakes, &staker(1), value, 3, 0),
            Err(Error::InvalidVirtualIndex(3))
        );
        let value = ticket::value(&seed, &staker(1), 0);
        assert_eq!(
            selector.submit_ticket(&stakes, &staker(1), value, 0, 0),
            Err(Error::InvalidVirtualIndex(0))
        );

        // Value of another index
        let value = ticket::value(&seed, &staker(1), 2);
        assert_eq!(
            selector.submit_ticket(&stakes, &staker(1), value, 1, 0),
            Err(Error::InvalidTicket)
        );

        assert!(selector.ordered_tickets().is_empty());
        assert_eq!(selector.submitted_count(), 0);

        // Replay
        let value = ticket::value(&seed, &staker(1), 1);
        selector
            .submit_ticket(&stakes, &staker(1), value, 1, 0)
            .unwrap();
        assert_eq!(
            selector.submit_ticket(&stakes, &staker(1), value, 1, 0),
            Err(Error::DuplicateTicket)
        );
        assert_eq!(selector.ordered_tickets().len(), 1);
        assert_eq!(selector.submitted_count(), 1);
    }

    #[test]
    fn test_evicted_ticket_cannot_be_replayed() {
        let stakes = stakes(&[(1, 20)]);
        let seed = Seed::from(77);
        let mut selector = Selector::new(config(3), seed, 0);
        let mut tickets = ticket::generate(&seed, &staker(1), 20);
        tickets.sort_by_key(|t| std::cmp::Reverse(t.value));

        // Submit in descending order so every new ticket evicts the maximum
        let mut evicted = Vec::new();
        for t in &tickets {
            if let Insertion::Replaced { evicted: e, .. } = selector
                .submit_ticket(&stakes, &t.submitter, t.value, t.virtual_staker_index, 0)
                .unwrap()
            {
                evicted.push(e);
            }
        }
        assert_eq!(evicted.len(), 17);
        for e in evicted {
            assert_eq!(
                selector.submit_ticket(&stakes, &e.submitter, e.value, e.virtual_staker_index, 0),
                Err(Error::DuplicateTicket)
            );
        }
        let lowest: Vec<Value> = tickets.iter().rev().take(3).map(|t| t.value).collect();
        let retained: Vec<Value> = selector.ordered_tickets().iter().map(|t| t.value).collect();
        assert_eq!(retained, lowest);
    }

    #[test]
    fn test_not_competitive_is_not_recorded() {
        let stakes = stakes(&[(1, 20)]);
        let seed = Seed::from(5);
        let mut selector = Selector::new(config(1), seed, 0);
        let mut tickets = ticket::generate(&seed, &staker(1), 2);
        tickets.sort_by_key(|t| t.value);
        let (low, high) = (tickets[0], tickets[1]);
        let submitter = staker(1);
        selector
            .submit_ticket(&stakes, &submitter, low.value, low.virtual_staker_index, 0)
            .unwrap();
        let index = high.virtual_staker_index;
        assert_eq!(
            selector.submit_ticket(&stakes, &submitter, high.value, index, 0),
            Err(Error::NotCompetitive)
        );
        assert_eq!(selector.submitted_count(), 1);
    }

    #[test]
    fn test_no_tickets() {
        let selector = Selector::new(config(3), Seed::from(1), 0);
        assert_eq!(selector.selected_participants(12), Err(Error::NoTickets));
    }

    #[test]
    fn test_random_order_selects_lowest() {
        let mut rng = StdRng::seed_from_u64(42);
        let weights = [(1u8, 20u64), (2, 13), (3, 7), (4, 1)];
        let stakes = stakes(&weights);
        for round in 0..10u64 {
            let seed = Seed::from(round);
            let mut all: Vec<Ticket> = weights
                .iter()
                .flat_map(|(i, w)| ticket::generate(&seed, &staker(*i), *w))
                .collect();
            all.shuffle(&mut rng);

            let mut selector = Selector::new(config(10), seed, 0);
            for t in &all {
                let index = t.virtual_staker_index;
                let _ = selector.submit_ticket(&stakes, &t.submitter, t.value, index, 0);
                assert!(selector.is_consistent());
            }

            let mut expected: Vec<Value> = all.iter().map(|t| t.value).collect();
            expected.sort();
            expected.truncate(10);
            let retained: Vec<Value> =
                selector.ordered_tickets().iter().map(|t| t.value).collect();
            assert_eq!(retained, expected);
        }
    }
}
