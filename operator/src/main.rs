//! Simulate beacon rounds: stakers submit tickets, the selected group publishes a DKG result and
//! the registered group is selected to produce the next relay entry.
//!
//! # Usage
//!
//! ```sh
//! cargo run --release --bin beacon-operator -- --stakers 8 --rounds 3
//! ```
//!
//! A JSON config (see [beacon_operator::Config]) can be supplied with `--config`.

use beacon_dkg::{mocks, Bitmap, DkgResult};
use beacon_operator::{Config, Engine, Mailbox, Policy};
use beacon_selection::{ticket, virtual_stakers, Stakes, Staking};
use bytes::Bytes;
use clap::{Parser, ValueEnum};
use commonware_runtime::{deterministic, Metrics, Runner};
use commonware_utils::hex;
use rand::{rngs::StdRng, RngCore, SeedableRng};
use std::path::PathBuf;
use tracing::{info, warn, Level};

/// Result policy selectable from the command line.
#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    FirstValid,
    Vote,
}

/// Beacon operator simulation CLI.
#[derive(Parser)]
pub struct App {
    /// The log level for traces. opts: (error, debug, info, warn, trace)
    #[arg(long, default_value_t = Level::INFO)]
    log_level: Level,

    /// The path to a JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Result policy (ignored if a config file is provided).
    #[arg(long, value_enum, default_value_t = PolicyArg::FirstValid)]
    policy: PolicyArg,

    /// The number of stakers.
    #[arg(long, default_value_t = 8)]
    stakers: u64,

    /// The number of rounds to simulate.
    #[arg(long, default_value_t = 3)]
    rounds: u64,

    /// The seed of the simulation.
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn default_config(policy: Policy) -> Config {
    Config {
        group_size: 16,
        minimum_stake: 1_000,
        max_virtual_stakers: 8,
        ticket_submission_timeout: 12,
        time_dkg: 10,
        result_publication_step: 3,
        signature_threshold: 9,
        group_public_key_size: beacon_dkg::Config::DEFAULT_GROUP_PUBLIC_KEY_SIZE,
        group_active_time: 200,
        active_groups_threshold: 2,
        relay_entry_timeout: 24,
        policy,
        mailbox_size: 1024,
    }
}

fn main() {
    let app = App::parse();
    tracing_subscriber::fmt().with_max_level(app.log_level).init();

    let config = match &app.config {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(err) => {
                warn!(?err, ?path, "unable to load config");
                return;
            }
        },
        None => {
            let policy = match app.policy {
                PolicyArg::FirstValid => Policy::FirstValid,
                PolicyArg::Vote => Policy::Vote,
            };
            default_config(policy)
        }
    };
    info!(?config, "loaded config");

    let executor = deterministic::Runner::seeded(app.seed);
    executor.start(|context| async move {
        // Fund stakers with varying weight
        let mut rng = StdRng::seed_from_u64(app.seed);
        let signers = mocks::signers(app.stakers);
        let mut stakes = Stakes::default();
        for (i, signer) in signers.iter().enumerate() {
            let weight = (i as u64 % config.max_virtual_stakers) + 1;
            stakes.deposit(signer.address, stake(config.minimum_stake, weight));
            info!(staker = %signer.address, weight, "funded staker");
        }

        let (engine, mut mailbox) =
            Engine::new(context.with_label("operator"), config.clone(), stakes.clone());
        engine.start();

        let mut entry = Bytes::from_static(b"genesis");
        for _ in 0..app.rounds {
            let outcome = mailbox.relay_entry(entry.clone()).await;
            let Some(round) = outcome.round else {
                warn!("round still in progress");
                break;
            };

            // Submit every ticket of every staker
            for signer in &signers {
                let weight = virtual_stakers(
                    stakes.stake(&signer.address),
                    u128::from(config.minimum_stake),
                    config.max_virtual_stakers,
                );
                for t in ticket::generate(&outcome.seed, &signer.address, weight) {
                    let _ = mailbox
                        .submit_ticket(t.submitter, t.value, t.virtual_staker_index)
                        .await;
                }
            }
            mailbox.advance(config.ticket_submission_timeout).await;
            let participants = match mailbox.selected_participants().await {
                Ok(participants) => participants,
                Err(err) => {
                    warn!(round, ?err, "selection failed");
                    break;
                }
            };

            // Run the DKG off-chain
            mailbox.advance(config.time_dkg).await;
            let mut key = vec![0u8; config.group_public_key_size];
            rng.fill_bytes(&mut key);
            let result = DkgResult {
                success: true,
                group_public_key: Bytes::from(key),
                disqualified: Bitmap::new(participants.len()),
                inactive: Bitmap::new(participants.len()),
            };
            if !publish(&mut mailbox, config.policy, &signers, &participants, &result).await {
                warn!(round, "publication failed");
                break;
            }
            let members = mailbox
                .group_members(result.group_public_key.clone())
                .await
                .unwrap_or_default();
            info!(
                round,
                public_key = hex(&result.group_public_key),
                members = members.len(),
                "registered group"
            );

            // Derive the next relay entry
            let mut next = vec![0u8; 32];
            rng.fill_bytes(&mut next);
            entry = Bytes::from(next);
        }

        let groups = mailbox.number_of_groups().await;
        info!(groups, "simulation complete");
    });
}

/// Stake backing `weight` virtual stakers (computed in u128 to avoid overflow).
fn stake(minimum_stake: u64, weight: u64) -> u128 {
    u128::from(minimum_stake) * u128::from(weight)
}

/// Publish `result` according to `policy`, returning true if a group was registered.
async fn publish(
    mailbox: &mut Mailbox,
    policy: Policy,
    signers: &[mocks::Signer],
    participants: &[beacon_selection::Address],
    result: &DkgResult,
) -> bool {
    let digest = result.digest();
    match policy {
        Policy::FirstValid => {
            let ranks = 1..=participants.len() as u32;
            let supports = mocks::sign_ranks(signers, participants, &digest, ranks);
            if let Err(err) = mailbox
                .submit_result(participants[0], 1, result.clone(), supports)
                .await
            {
                warn!(?err, "result rejected");
                return false;
            }
        }
        Policy::Vote => {
            for (i, participant) in participants.iter().enumerate() {
                let rank = i as u32 + 1;
                let Ok(eligible) = mailbox.eligible_block(rank).await else {
                    return false;
                };
                let height = mailbox.advance(0).await;
                mailbox.advance(eligible.saturating_sub(height)).await;
                if let Err(err) = mailbox.submit_vote(*participant, rank, result.clone()).await {
                    warn!(rank, ?err, "vote rejected");
                }
            }
        }
    }
    mailbox
        .is_group_registered(result.group_public_key.clone())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stake_does_not_overflow() {
        assert_eq!(stake(1_000, 8), 8_000);
        assert_eq!(stake(u64::MAX, 2), u128::from(u64::MAX) * 2);
        assert_eq!(
            virtual_stakers(stake(u64::MAX, 8), u128::from(u64::MAX), 8),
            8
        );
    }
}
