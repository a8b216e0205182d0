use crate::{Config, Error, Policy};
use beacon_dkg::{groups::Registry, signatures::Support, Coordinator, Digest, DkgResult, Tally};
use beacon_selection::{Address, Height, Insertion, Seed, Selector, Staking, Ticket, Value};
use bytes::Bytes;

/// Status of a round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// Tickets are being collected.
    Selecting,

    /// Participants are known and may publish a DKG result.
    Publishing,

    /// A result was accepted and its group registered.
    Registered,

    /// No group was created.
    Failed,
}

impl Status {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Registered | Status::Failed)
    }
}

/// Notable transitions, drained by the [Engine](crate::Engine) after each command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    RoundStarted {
        round: u64,
        seed: Seed,
    },
    PublicationOpened {
        round: u64,
        participants: usize,
        timeout: Height,
    },
    GroupRegistered {
        round: u64,
        index: usize,
        public_key: Bytes,
        members: usize,
    },
    RoundFailed {
        round: u64,
    },
}

/// Outcome of processing a relay entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayOutcome {
    /// Seed derived from the entry.
    pub seed: Seed,

    /// Index of the group selected to produce the next entry (if any group is active).
    pub signing_group: Option<usize>,

    /// Round started with the entry (if no round was in progress).
    pub round: Option<u64>,
}

/// Read-only view of a round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Summary {
    pub number: u64,
    pub seed: Seed,
    pub started_at: Height,
    pub status: Status,
    pub tickets: usize,
    pub participants: Vec<Address>,
    pub group_public_key: Option<Bytes>,
}

enum Publication {
    FirstValid(Coordinator),

    /// Created once selection closes.
    Vote(Option<Tally>),
}

struct Round {
    number: u64,
    seed: Seed,
    started_at: Height,
    selector: Selector,
    publication: Publication,
    status: Status,
    group: Option<Bytes>,
}

impl Round {
    fn participants(&self) -> &[Address] {
        match &self.publication {
            Publication::FirstValid(coordinator) => coordinator.participants(),
            Publication::Vote(Some(tally)) => tally.participants(),
            Publication::Vote(None) => &[],
        }
    }

    fn summary(&self) -> Summary {
        Summary {
            number: self.number,
            seed: self.seed,
            started_at: self.started_at,
            status: self.status,
            tickets: self.selector.ordered_tickets().len(),
            participants: self.participants().to_vec(),
            group_public_key: self.group.clone(),
        }
    }
}

/// All state owned by an operator.
///
/// Rounds are kept in an arena indexed by `number - 1`. Only the last round may be in progress.
pub struct State<S: Staking> {
    cfg: Config,
    staking: S,
    height: Height,
    rounds: Vec<Round>,
    registry: Registry,
    entry: Option<Bytes>,
    events: Vec<Event>,
}

impl<S: Staking> State<S> {
    pub fn new(cfg: Config, staking: S) -> Self {
        let registry = Registry::new(cfg.groups());
        Self {
            cfg,
            staking,
            height: 0,
            rounds: Vec::new(),
            registry,
            entry: None,
            events: Vec::new(),
        }
    }

    pub fn height(&self) -> Height {
        self.height
    }

    /// The most recent relay entry.
    pub fn entry(&self) -> Option<&Bytes> {
        self.entry.as_ref()
    }

    /// Take all events emitted since the last call.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Move the block height forward by `blocks`.
    pub fn advance(&mut self, blocks: u64) -> Height {
        self.height = self.height.saturating_add(blocks);
        self.progress();
        self.height
    }

    /// Record a relay entry, select the group to sign the next one and start a new round if
    /// none is in progress.
    pub fn relay_entry(&mut self, entry: Bytes) -> RelayOutcome {
        let seed = Seed::hash(&entry);
        let signing_group = self.registry.select_group(&seed, self.height).ok();
        let round = if self.in_progress() {
            None
        } else {
            Some(self.start(seed))
        };
        self.entry = Some(entry);
        RelayOutcome {
            seed,
            signing_group,
            round,
        }
    }

    /// Start a new round seeded with `seed`.
    pub fn start_selection(&mut self, seed: Seed) -> Result<u64, Error> {
        if self.in_progress() {
            return Err(Error::RoundInProgress);
        }
        Ok(self.start(seed))
    }

    fn start(&mut self, seed: Seed) -> u64 {
        let number = self.rounds.len() as u64 + 1;
        let publication = match self.cfg.policy {
            Policy::FirstValid => Publication::FirstValid(Coordinator::new(self.cfg.dkg())),
            Policy::Vote => Publication::Vote(None),
        };
        self.rounds.push(Round {
            number,
            seed,
            started_at: self.height,
            selector: Selector::new(self.cfg.selection(), seed, self.height),
            publication,
            status: Status::Selecting,
            group: None,
        });
        self.events.push(Event::RoundStarted {
            round: number,
            seed,
        });
        self.progress();
        number
    }

    /// Returns true if the last round has not reached a terminal status.
    pub fn in_progress(&self) -> bool {
        self.rounds
            .last()
            .is_some_and(|round| !round.status.is_terminal())
    }

    fn current(&self) -> Result<&Round, Error> {
        self.rounds.last().ok_or(Error::NoRound)
    }

    /// Apply transitions that only depend on height.
    fn progress(&mut self) {
        let height = self.height;
        let Some(round) = self.rounds.last_mut() else {
            return;
        };

        // Close selection
        if round.status == Status::Selecting && !round.selector.window().is_open(height) {
            match round.selector.selected_participants(height) {
                Ok(participants) => {
                    let closed_at = round.selector.window().closes_at();
                    let count = participants.len();
                    let timeout = match &mut round.publication {
                        Publication::FirstValid(coordinator) => coordinator
                            .begin(participants, closed_at)
                            .ok()
                            .and_then(|_| coordinator.schedule().map(|s| s.timeout())),
                        Publication::Vote(tally) => {
                            Tally::new(self.cfg.dkg(), participants, closed_at)
                                .ok()
                                .map(|created| {
                                    let timeout = created.schedule().timeout();
                                    *tally = Some(created);
                                    timeout
                                })
                        }
                    };
                    match timeout {
                        Some(timeout) => {
                            round.status = Status::Publishing;
                            self.events.push(Event::PublicationOpened {
                                round: round.number,
                                participants: count,
                                timeout,
                            });
                        }
                        None => {
                            round.status = Status::Failed;
                            self.events.push(Event::RoundFailed {
                                round: round.number,
                            });
                        }
                    }
                }
                Err(_) => {
                    round.status = Status::Failed;
                    self.events.push(Event::RoundFailed {
                        round: round.number,
                    });
                }
            }
        }

        // Resolve votes
        if round.status != Status::Publishing {
            return;
        }
        let Publication::Vote(Some(tally)) = &round.publication else {
            return;
        };
        if !tally.is_final(height) {
            return;
        }
        let resolved = tally
            .final_result(height)
            .ok()
            .map(|(_, result)| (result.clone(), result.members(tally.participants())));
        match resolved {
            Some((result, members)) => {
                register(
                    &mut self.registry,
                    &mut self.events,
                    round,
                    result,
                    members,
                    height,
                );
            }
            None => {
                round.status = Status::Failed;
                self.events.push(Event::RoundFailed {
                    round: round.number,
                });
            }
        }
    }

    pub fn submit_ticket(
        &mut self,
        submitter: &Address,
        value: Value,
        virtual_staker_index: u64,
    ) -> Result<Insertion, Error> {
        let height = self.height;
        let round = self.rounds.last_mut().ok_or(Error::NoRound)?;
        Ok(round.selector.submit_ticket(
            &self.staking,
            submitter,
            value,
            virtual_staker_index,
            height,
        )?)
    }

    pub fn ordered_tickets(&self) -> Result<Vec<Ticket>, Error> {
        Ok(self.current()?.selector.ordered_tickets().to_vec())
    }

    pub fn submitted_tickets_count(&self) -> Result<usize, Error> {
        Ok(self.current()?.selector.submitted_count())
    }

    pub fn selected_participants(&self) -> Result<Vec<Address>, Error> {
        Ok(self
            .current()?
            .selector
            .selected_participants(self.height)?)
    }

    pub fn eligible_block(&self, rank: u32) -> Result<Height, Error> {
        match &self.current()?.publication {
            Publication::FirstValid(coordinator) => Ok(coordinator.eligible_block(rank)?),
            Publication::Vote(Some(tally)) => Ok(tally.eligible_block(rank)?),
            Publication::Vote(None) => Err(beacon_dkg::Error::NotStarted.into()),
        }
    }

    /// Publish a result (first valid submission wins) and register its group.
    pub fn submit_result(
        &mut self,
        submitter: &Address,
        rank: u32,
        result: DkgResult,
        supports: &[Support],
    ) -> Result<Digest, Error> {
        let height = self.height;
        let round = self.rounds.last_mut().ok_or(Error::NoRound)?;
        let Publication::FirstValid(coordinator) = &mut round.publication else {
            return Err(Error::WrongPolicy);
        };

        // A resolved round reports its own error before the registry is consulted
        if coordinator.state() == beacon_dkg::State::AwaitingSubmission
            && self.registry.is_registered(&result.group_public_key)
        {
            return Err(beacon_dkg::Error::DuplicateGroup.into());
        }
        let digest = coordinator.receive_submission(submitter, rank, result, supports, height)?;
        let members = coordinator.group_members().unwrap_or_default();
        let accepted = coordinator.accepted().map(|accepted| accepted.result.clone());
        if let Some(result) = accepted {
            register(
                &mut self.registry,
                &mut self.events,
                round,
                result,
                members,
                height,
            );
        }
        Ok(digest)
    }

    /// Vote for a result as the participant holding `rank`.
    pub fn submit_vote(
        &mut self,
        submitter: &Address,
        rank: u32,
        result: DkgResult,
    ) -> Result<Digest, Error> {
        let height = self.height;
        let round = self.rounds.last_mut().ok_or(Error::NoRound)?;
        let tally = match &mut round.publication {
            Publication::Vote(Some(tally)) => tally,
            Publication::Vote(None) => return Err(beacon_dkg::Error::NotStarted.into()),
            Publication::FirstValid(_) => return Err(Error::WrongPolicy),
        };
        if round.status == Status::Publishing
            && self.registry.is_registered(&result.group_public_key)
        {
            return Err(beacon_dkg::Error::DuplicateGroup.into());
        }
        let digest = tally.vote(submitter, rank, result, height)?;
        self.progress();
        Ok(digest)
    }

    /// Vote counts per result digest, in order of first submission.
    pub fn dkg_result_submissions(&self) -> Result<Vec<(Digest, u32)>, Error> {
        match &self.current()?.publication {
            Publication::Vote(Some(tally)) => Ok(tally.submissions().to_vec()),
            Publication::Vote(None) => Err(beacon_dkg::Error::NotStarted.into()),
            Publication::FirstValid(_) => Err(Error::WrongPolicy),
        }
    }

    /// The resolved result of the current round.
    pub fn final_result(&self) -> Result<(Digest, DkgResult), Error> {
        match &self.current()?.publication {
            Publication::FirstValid(coordinator) => coordinator
                .accepted()
                .map(|accepted| (accepted.digest, accepted.result.clone()))
                .ok_or_else(|| beacon_dkg::Error::NotReady.into()),
            Publication::Vote(Some(tally)) => {
                let (digest, result) = tally.final_result(self.height)?;
                Ok((digest, result.clone()))
            }
            Publication::Vote(None) => Err(beacon_dkg::Error::NotStarted.into()),
        }
    }

    /// Fail the current round if no result was accepted before the publication timeout.
    pub fn report_timeout(&mut self) -> Result<(), Error> {
        let height = self.height;
        let round = self.rounds.last_mut().ok_or(Error::NoRound)?;
        let Publication::FirstValid(coordinator) = &mut round.publication else {
            return Err(Error::WrongPolicy);
        };
        coordinator.report_timeout(height)?;
        if round.status != Status::Failed {
            round.status = Status::Failed;
            self.events.push(Event::RoundFailed {
                round: round.number,
            });
        }
        Ok(())
    }

    pub fn group_members(&self, public_key: &[u8]) -> Option<Vec<Address>> {
        self.registry.members(public_key).map(|members| members.to_vec())
    }

    pub fn is_group_registered(&self, public_key: &[u8]) -> bool {
        self.registry.is_registered(public_key)
    }

    pub fn number_of_groups(&self) -> usize {
        self.registry.number_of_groups()
    }

    pub fn is_stale_group(&self, public_key: &[u8]) -> Result<bool, Error> {
        Ok(self.registry.is_stale(public_key, self.height)?)
    }

    /// Terminate the group registered with `public_key`; it is never selected again.
    pub fn terminate_group(&mut self, public_key: &[u8]) -> Result<(), Error> {
        let index = self
            .registry
            .index(public_key)
            .ok_or(beacon_dkg::Error::GroupNotFound)?;
        Ok(self.registry.terminate(index)?)
    }

    /// Summary of round `number` (1-based).
    pub fn round(&self, number: u64) -> Option<Summary> {
        let index = usize::try_from(number).ok()?.checked_sub(1)?;
        self.rounds.get(index).map(Round::summary)
    }

    /// Summary of the most recent round.
    pub fn current_round(&self) -> Option<Summary> {
        self.rounds.last().map(Round::summary)
    }
}

/// Register the group of an accepted result, or fail the round if the DKG did not succeed.
fn register(
    registry: &mut Registry,
    events: &mut Vec<Event>,
    round: &mut Round,
    result: DkgResult,
    members: Vec<Address>,
    height: Height,
) {
    if !result.success {
        round.status = Status::Failed;
        events.push(Event::RoundFailed {
            round: round.number,
        });
        return;
    }
    let count = members.len();
    match registry.register(result.group_public_key.clone(), members, height) {
        Ok(index) => {
            round.status = Status::Registered;
            round.group = Some(result.group_public_key.clone());
            events.push(Event::GroupRegistered {
                round: round.number,
                index,
                public_key: result.group_public_key,
                members: count,
            });
        }
        Err(_) => {
            round.status = Status::Failed;
            events.push(Event::RoundFailed {
                round: round.number,
            });
        }
    }
}
