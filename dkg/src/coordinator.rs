use crate::{
    signatures::{self, Support},
    Accepted, Config, Digest, DkgResult, Error, Schedule,
};
use beacon_selection::{Address, Height};

/// Lifecycle of a round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    /// Waiting for ticket selection to close.
    AwaitingSelection,

    /// Participants are known and may publish a result.
    AwaitingSubmission,

    /// A result was accepted (terminal).
    Accepted,

    /// No result was accepted before the timeout (terminal).
    Failed,
}

/// Accepts the first valid DKG result published by an eligible participant.
pub struct Coordinator {
    cfg: Config,
    state: State,
    participants: Vec<Address>,
    schedule: Option<Schedule>,
    accepted: Option<Accepted>,
}

impl Coordinator {
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            state: State::AwaitingSelection,
            participants: Vec::new(),
            schedule: None,
            accepted: None,
        }
    }

    /// Open publication for `participants` (in rank order) once selection closed at
    /// `selection_closed_at`.
    pub fn begin(
        &mut self,
        participants: Vec<Address>,
        selection_closed_at: Height,
    ) -> Result<(), Error> {
        if self.state != State::AwaitingSelection {
            return Err(Error::AlreadyStarted);
        }
        if participants.is_empty() {
            return Err(Error::NoParticipants);
        }
        let start = selection_closed_at.saturating_add(self.cfg.time_dkg);
        self.schedule = Some(Schedule::new(
            start,
            self.cfg.result_publication_step,
            participants.len(),
        ));
        self.participants = participants;
        self.state = State::AwaitingSubmission;
        Ok(())
    }

    /// First height at which `rank` may publish.
    pub fn eligible_block(&self, rank: u32) -> Result<Height, Error> {
        self.schedule.ok_or(Error::NotStarted)?.eligible_block(rank)
    }

    /// Publish a result as the participant holding `rank`.
    ///
    /// Returns the digest of the accepted result.
    pub fn receive_submission(
        &mut self,
        submitter: &Address,
        rank: u32,
        result: DkgResult,
        supports: &[Support],
        now: Height,
    ) -> Result<Digest, Error> {
        match self.state {
            State::AwaitingSelection => return Err(Error::NotStarted),
            State::Accepted => return Err(Error::AlreadyAccepted),
            State::Failed => return Err(Error::TimedOut),
            State::AwaitingSubmission => {}
        }
        let schedule = self.schedule.ok_or(Error::NotStarted)?;

        // Rank binding
        let holder = (rank as usize)
            .checked_sub(1)
            .and_then(|index| self.participants.get(index))
            .ok_or(Error::InvalidRank(rank))?;
        if holder != submitter {
            return Err(Error::WrongRank);
        }

        // Timing
        let eligible = schedule.eligible_block(rank)?;
        if now < eligible {
            return Err(Error::NotYetEligible(eligible));
        }
        if now >= schedule.timeout() {
            return Err(Error::TimedOut);
        }

        // Content
        result.validate(&self.cfg, self.participants.len())?;
        let digest = result.digest();
        signatures::verify(
            &self.participants,
            &digest,
            supports,
            self.cfg.signature_threshold,
        )?;

        self.accepted = Some(Accepted {
            result,
            digest,
            submitter: *submitter,
            rank,
            height: now,
        });
        self.state = State::Accepted;
        Ok(digest)
    }

    /// Mark the round as failed if no result was accepted before the timeout.
    pub fn report_timeout(&mut self, now: Height) -> Result<(), Error> {
        match self.state {
            State::AwaitingSelection => return Err(Error::NotStarted),
            State::Accepted => return Err(Error::AlreadyAccepted),
            State::Failed => return Ok(()),
            State::AwaitingSubmission => {}
        }
        let schedule = self.schedule.ok_or(Error::NotStarted)?;
        if now < schedule.timeout() {
            return Err(Error::NotTimedOut);
        }
        self.state = State::Failed;
        Ok(())
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn participants(&self) -> &[Address] {
        &self.participants
    }

    pub fn schedule(&self) -> Option<&Schedule> {
        self.schedule.as_ref()
    }

    pub fn accepted(&self) -> Option<&Accepted> {
        self.accepted.as_ref()
    }

    /// Members of the accepted group (participants not marked as misbehaved).
    pub fn group_members(&self) -> Option<Vec<Address>> {
        self.accepted
            .as_ref()
            .map(|accepted| accepted.result.members(&self.participants))
    }
}
