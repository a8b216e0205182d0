use crate::Address;
use std::collections::BTreeMap;

/// Read-only view of staked balances.
pub trait Staking {
    /// Returns the stake of `staker` (zero if unknown).
    fn stake(&self, staker: &Address) -> u128;
}

/// In-memory [Staking] implementation.
#[derive(Clone, Debug, Default)]
pub struct Stakes {
    balances: BTreeMap<Address, u128>,
}

impl Stakes {
    /// Add `amount` to the stake of `staker`.
    pub fn deposit(&mut self, staker: Address, amount: u128) {
        let balance = self.balances.entry(staker).or_default();
        *balance = balance.saturating_add(amount);
    }

    /// Remove up to `amount` from the stake of `staker`.
    pub fn withdraw(&mut self, staker: &Address, amount: u128) {
        if let Some(balance) = self.balances.get_mut(staker) {
            *balance = balance.saturating_sub(amount);
        }
    }

    /// Iterate over all known stakers.
    pub fn stakers(&self) -> impl Iterator<Item = (&Address, &u128)> {
        self.balances.iter()
    }
}

impl Staking for Stakes {
    fn stake(&self, staker: &Address) -> u128 {
        self.balances.get(staker).copied().unwrap_or_default()
    }
}

/// Number of virtual stakers (tickets) backed by `stake`.
///
/// Returns zero if `minimum_stake` is zero.
pub fn virtual_stakers(stake: u128, minimum_stake: u128, max_virtual_stakers: u64) -> u64 {
    if minimum_stake == 0 {
        return 0;
    }
    let count = stake / minimum_stake;
    u64::try_from(count).map_or(max_virtual_stakers, |count| count.min(max_virtual_stakers))
}
