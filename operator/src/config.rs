use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading a [Config].
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

/// How a published DKG result is accepted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// The first valid result supported by enough signatures is accepted.
    #[default]
    FirstValid,

    /// Every rank votes once and the result with the most votes is accepted.
    Vote,
}

/// Configuration for the [Engine](crate::Engine).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Number of participants selected per round.
    pub group_size: usize,

    /// Stake backing a single ticket.
    pub minimum_stake: u64,

    /// Maximum number of tickets per staker.
    pub max_virtual_stakers: u64,

    /// Number of blocks during which tickets are accepted.
    pub ticket_submission_timeout: u64,

    /// Number of blocks reserved for the off-chain DKG.
    pub time_dkg: u64,

    /// Number of blocks between the eligibility of consecutive ranks.
    pub result_publication_step: u64,

    /// Minimum number of member signatures supporting a result.
    pub signature_threshold: usize,

    /// Expected size of a group public key in bytes.
    #[serde(default = "default_group_public_key_size")]
    pub group_public_key_size: usize,

    /// Number of blocks after registration during which a group is active.
    pub group_active_time: u64,

    /// Minimum number of active groups that are never expired.
    pub active_groups_threshold: usize,

    /// Number of blocks a selected group has to produce a relay entry.
    pub relay_entry_timeout: u64,

    /// How published results are accepted.
    #[serde(default)]
    pub policy: Policy,

    /// The maximum size of the mailbox backlog.
    #[serde(default = "default_mailbox_size")]
    pub mailbox_size: usize,
}

fn default_group_public_key_size() -> usize {
    beacon_dkg::Config::DEFAULT_GROUP_PUBLIC_KEY_SIZE
}

fn default_mailbox_size() -> usize {
    1024
}

impl Config {
    /// Load a JSON config from `path` and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    /// Parse a JSON config and validate it.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let config: Config = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.group_size == 0 {
            return Err(Error::Invalid("group_size must be positive"));
        }
        if self.minimum_stake == 0 {
            return Err(Error::Invalid("minimum_stake must be positive"));
        }
        if self.max_virtual_stakers == 0 {
            return Err(Error::Invalid("max_virtual_stakers must be positive"));
        }
        if self.signature_threshold > self.group_size {
            return Err(Error::Invalid(
                "signature_threshold must not exceed group_size",
            ));
        }
        if self.mailbox_size == 0 {
            return Err(Error::Invalid("mailbox_size must be positive"));
        }
        Ok(())
    }

    pub fn selection(&self) -> beacon_selection::Config {
        beacon_selection::Config {
            group_size: self.group_size,
            minimum_stake: u128::from(self.minimum_stake),
            max_virtual_stakers: self.max_virtual_stakers,
            ticket_submission_timeout: self.ticket_submission_timeout,
        }
    }

    pub fn dkg(&self) -> beacon_dkg::Config {
        beacon_dkg::Config {
            signature_threshold: self.signature_threshold,
            group_public_key_size: self.group_public_key_size,
            result_publication_step: self.result_publication_step,
            time_dkg: self.time_dkg,
        }
    }

    pub fn groups(&self) -> beacon_dkg::groups::Config {
        beacon_dkg::groups::Config {
            group_active_time: self.group_active_time,
            active_groups_threshold: self.active_groups_threshold,
            relay_entry_timeout: self.relay_entry_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &str = r#"{
        "group_size": 20,
        "minimum_stake": 1000,
        "max_virtual_stakers": 20,
        "ticket_submission_timeout": 12,
        "time_dkg": 10,
        "result_publication_step": 2,
        "signature_threshold": 11,
        "group_active_time": 300,
        "active_groups_threshold": 5,
        "relay_entry_timeout": 24
    }"#;

    #[test]
    fn test_parse_defaults() {
        let config = Config::parse(RAW).unwrap();
        assert_eq!(config.group_size, 20);
        assert_eq!(config.group_public_key_size, 128);
        assert_eq!(config.policy, Policy::FirstValid);
        assert_eq!(config.mailbox_size, 1024);
        assert_eq!(config.selection().minimum_stake, 1000);
        assert_eq!(config.dkg().signature_threshold, 11);
        assert_eq!(config.groups().relay_entry_timeout, 24);
    }

    #[test]
    fn test_parse_policy() {
        let raw = RAW.replace(
            "\"relay_entry_timeout\": 24",
            "\"relay_entry_timeout\": 24, \"policy\": \"vote\"",
        );
        assert_eq!(Config::parse(&raw).unwrap().policy, Policy::Vote);
    }

    #[test]
    fn test_invalid() {
        let raw = RAW.replace(
            "\"signature_threshold\": 11",
            "\"signature_threshold\": 21",
        );
        assert!(matches!(Config::parse(&raw), Err(Error::Invalid(_))));
        let raw = RAW.replace("\"group_size\": 20", "\"group_size\": 0");
        assert!(matches!(Config::parse(&raw), Err(Error::Invalid(_))));
        assert!(matches!(Config::parse("{"), Err(Error::Json(_))));
        assert!(matches!(
            Config::load("/nonexistent/operator.json"),
            Err(Error::Io(_))
        ));
    }
}
