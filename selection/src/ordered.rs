use crate::{Error, Ticket};

/// Outcome of a successful [Ordered::insert].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Insertion {
    /// The ticket was inserted at `rank` (1-based).
    Inserted { rank: usize },

    /// The ticket was inserted at `rank` (1-based) and `evicted` (the previous maximum) was
    /// removed.
    Replaced { rank: usize, evicted: Ticket },
}

impl Insertion {
    /// The 1-based rank of the inserted ticket at the time of insertion.
    pub fn rank(&self) -> usize {
        match self {
            Insertion::Inserted { rank } | Insertion::Replaced { rank, .. } => *rank,
        }
    }
}

/// Bounded set of tickets in ascending order of value.
///
/// Tickets with equal values keep the order in which they were inserted.
#[derive(Clone, Debug)]
pub struct Ordered {
    capacity: usize,
    tickets: Vec<Ticket>,
}

impl Ordered {
    /// Create an empty set holding at most `capacity` tickets.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            tickets: Vec::with_capacity(capacity),
        }
    }

    /// Insert a ticket.
    ///
    /// If the set is full, the ticket must be strictly lower than the current maximum, which is
    /// evicted to make room.
    pub fn insert(&mut self, ticket: Ticket) -> Result<Insertion, Error> {
        let full = self.tickets.len() >= self.capacity;
        if full {
            match self.tickets.last() {
                Some(max) if ticket.value < max.value => {}
                _ => return Err(Error::NotCompetitive),
            }
        }

        // Insert after all tickets with a lower or equal value
        let position = self.tickets.partition_point(|t| t.value <= ticket.value);
        let evicted = if full { self.tickets.pop() } else { None };
        self.tickets.insert(position, ticket);
        let rank = position + 1;
        Ok(match evicted {
            Some(evicted) => Insertion::Replaced { rank, evicted },
            None => Insertion::Inserted { rank },
        })
    }

    /// Tickets in ascending order.
    pub fn tickets(&self) -> &[Ticket] {
        &self.tickets
    }

    /// The highest retained ticket.
    pub fn max(&self) -> Option<&Ticket> {
        self.tickets.last()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.tickets.len() >= self.capacity
    }

    /// Returns true if the set is within capacity and sorted in non-decreasing order.
    pub fn is_consistent(&self) -> bool {
        self.tickets.len() <= self.capacity
            && self.tickets.windows(2).all(|w| w[0].value <= w[1].value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Address, Value};
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn ticket(value: u64, index: u64) -> Ticket {
        Ticket {
            value: Value::from(value),
            virtual_staker_index: index,
            submitter: Address::from([index as u8; 20]),
        }
    }

    fn values(ordered: &Ordered) -> Vec<Value> {
        ordered.tickets().iter().map(|t| t.value).collect()
    }

    #[test]
    fn test_insert_sorted() {
        let mut ordered = Ordered::new(4);
        assert_eq!(ordered.insert(ticket(5, 1)), Ok(Insertion::Inserted { rank: 1 }));
        assert_eq!(ordered.insert(ticket(2, 2)), Ok(Insertion::Inserted { rank: 1 }));
        assert_eq!(ordered.insert(ticket(9, 3)), Ok(Insertion::Inserted { rank: 3 }));
        assert_eq!(ordered.insert(ticket(7, 4)), Ok(Insertion::Inserted { rank: 3 }));
        assert_eq!(
            values(&ordered),
            vec![Value::from(2), Value::from(5), Value::from(7), Value::from(9)]
        );
        assert!(ordered.is_full());
        assert!(ordered.is_consistent());
    }

    #[test]
    fn test_eviction() {
        let mut ordered = Ordered::new(3);
        for (i, v) in [10, 20, 30].into_iter().enumerate() {
            ordered.insert(ticket(v, i as u64 + 1)).unwrap();
        }
        let result = ordered.insert(ticket(15, 4)).unwrap();
        assert_eq!(
            result,
            Insertion::Replaced {
                rank: 2,
                evicted: ticket(30, 3)
            }
        );
        assert_eq!(
            values(&ordered),
            vec![Value::from(10), Value::from(15), Value::from(20)]
        );
    }

    #[test]
    fn test_not_competitive() {
        let mut ordered = Ordered::new(2);
        ordered.insert(ticket(10, 1)).unwrap();
        ordered.insert(ticket(20, 2)).unwrap();
        assert_eq!(ordered.insert(ticket(25, 3)), Err(Error::NotCompetitive));
        // Equal to the maximum is not strictly lower
        assert_eq!(ordered.insert(ticket(20, 4)), Err(Error::NotCompetitive));
        assert_eq!(values(&ordered), vec![Value::from(10), Value::from(20)]);
    }

    #[test]
    fn test_equal_values_keep_submission_order() {
        let mut ordered = Ordered::new(4);
        ordered.insert(ticket(5, 1)).unwrap();
        ordered.insert(ticket(5, 2)).unwrap();
        ordered.insert(ticket(3, 3)).unwrap();
        ordered.insert(ticket(5, 4)).unwrap();
        let indices: Vec<u64> = ordered
            .tickets()
            .iter()
            .map(|t| t.virtual_staker_index)
            .collect();
        assert_eq!(indices, vec![3, 1, 2, 4]);
    }

    #[test]
    fn test_zero_capacity() {
        let mut ordered = Ordered::new(0);
        assert_eq!(ordered.insert(ticket(1, 1)), Err(Error::NotCompetitive));
        assert!(ordered.is_empty());
    }

    #[test]
    fn test_random_insertions_keep_lowest() {
        let mut rng = StdRng::seed_from_u64(0);
        for capacity in [1, 5, 16] {
            let mut ordered = Ordered::new(capacity);
            let mut all = Vec::new();
            for index in 1..=200u64 {
                let value = rng.gen_range(0..1_000u64);
                all.push(value);
                let before = ordered.max().map(|t| t.value);
                let result = ordered.insert(ticket(value, index));
                match (before, result) {
                    (Some(max), Err(Error::NotCompetitive)) => {
                        assert!(Value::from(value) >= max);
                        assert!(ordered.is_full());
                    }
                    (_, Ok(_)) => {}
                    (_, Err(err)) => panic!("unexpected error: {err}"),
                }
                assert!(ordered.is_consistent());
            }

            // The retained set is exactly the lowest values
            all.sort();
            all.truncate(capacity);
            let expected: Vec<Value> = all.into_iter().map(Value::from).collect();
            assert_eq!(values(&ordered), expected);
        }
    }
}
