//! Registry of groups created by accepted DKG results.
//!
//! Groups are kept in registration order. Selecting a group for a relay entry first expires old
//! groups (oldest first) as long as more than `active_groups_threshold` remain active:
//!
//! ```txt
//! registered_at + group_active_time < now  =>  expired
//! ```
//!
//! An expired group may still be producing a relay entry it was selected for, so it only becomes
//! stale once `relay_entry_timeout` more blocks have passed.
//!
//! A group can also be terminated at any time (for example after failing to produce a relay
//! entry). Terminated groups are never selected and do not count as active.

use crate::Error;
use beacon_selection::{Address, Height, Seed};
use bytes::Bytes;
use commonware_utils::modulo;
use std::collections::{BTreeSet, HashMap};

/// Configuration for the [Registry].
#[derive(Clone, Debug)]
pub struct Config {
    /// Number of blocks after registration during which a group is active.
    pub group_active_time: u64,

    /// Minimum number of active groups that are never expired.
    pub active_groups_threshold: usize,

    /// Number of blocks a selected group has to produce a relay entry.
    pub relay_entry_timeout: u64,
}

/// A registered group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Group {
    pub public_key: Bytes,
    pub members: Vec<Address>,
    pub registered_at: Height,
}

/// Registered groups in order of registration.
pub struct Registry {
    cfg: Config,
    groups: Vec<Group>,
    indices: HashMap<Bytes, usize>,

    /// Groups below this index are expired.
    expired_offset: usize,
    terminated: BTreeSet<usize>,
}

impl Registry {
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            groups: Vec::new(),
            indices: HashMap::new(),
            expired_offset: 0,
            terminated: BTreeSet::new(),
        }
    }

    /// Register a group at height `now`, returning its index.
    pub fn register(
        &mut self,
        public_key: Bytes,
        members: Vec<Address>,
        now: Height,
    ) -> Result<usize, Error> {
        if self.indices.contains_key(&public_key) {
            return Err(Error::DuplicateGroup);
        }
        let index = self.groups.len();
        self.indices.insert(public_key.clone(), index);
        self.groups.push(Group {
            public_key,
            members,
            registered_at: now,
        });
        Ok(index)
    }

    /// Expire old groups and select the index of the active group that should produce the next
    /// relay entry.
    pub fn select_group(&mut self, seed: &Seed, now: Height) -> Result<usize, Error> {
        self.expire(now);
        let active = self.number_of_groups();
        if active == 0 {
            return Err(Error::NoActiveGroups);
        }
        let mut remaining = modulo(seed.as_ref(), active as u64) as usize;

        // Skip terminated groups when walking from the oldest active group
        for index in self.expired_offset..self.groups.len() {
            if self.terminated.contains(&index) {
                continue;
            }
            if remaining == 0 {
                return Ok(index);
            }
            remaining -= 1;
        }
        Err(Error::NoActiveGroups)
    }

    /// Terminate the group at `index` so it is no longer selected.
    pub fn terminate(&mut self, index: usize) -> Result<(), Error> {
        if index >= self.groups.len() {
            return Err(Error::GroupNotFound);
        }
        self.terminated.insert(index);
        Ok(())
    }

    /// Returns true if the group at `index` was terminated.
    pub fn is_terminated(&self, index: usize) -> bool {
        self.terminated.contains(&index)
    }

    /// Index of the group registered with `public_key`.
    pub fn index(&self, public_key: &[u8]) -> Option<usize> {
        self.indices.get(public_key).copied()
    }

    fn expire(&mut self, now: Height) {
        while self.expired_offset < self.groups.len()
            && self.number_of_groups() > self.cfg.active_groups_threshold
        {
            let group = &self.groups[self.expired_offset];
            if group.registered_at.saturating_add(self.cfg.group_active_time) >= now {
                break;
            }
            self.expired_offset += 1;
        }
    }

    /// Number of active (neither expired nor terminated) groups.
    pub fn number_of_groups(&self) -> usize {
        let terminated = self.terminated.range(self.expired_offset..).count();
        self.groups.len() - self.expired_offset - terminated
    }

    /// Number of groups ever registered.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn is_registered(&self, public_key: &[u8]) -> bool {
        self.indices.contains_key(public_key)
    }

    pub fn group(&self, index: usize) -> Option<&Group> {
        self.groups.get(index)
    }

    pub fn members(&self, public_key: &[u8]) -> Option<&[Address]> {
        let index = self.indices.get(public_key)?;
        Some(&self.groups[*index].members)
    }

    /// Returns true if the group was expired and can no longer be producing a relay entry.
    pub fn is_stale(&self, public_key: &[u8], now: Height) -> Result<bool, Error> {
        let index = *self.indices.get(public_key).ok_or(Error::GroupNotFound)?;
        if index >= self.expired_offset {
            return Ok(false);
        }
        let group = &self.groups[index];
        let stale_at = group
            .registered_at
            .saturating_add(self.cfg.group_active_time)
            .saturating_add(self.cfg.relay_entry_timeout);
        Ok(stale_at < now)
    }
}
