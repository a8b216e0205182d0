use crate::{
    ingress::{Mailbox, Message},
    metrics, Config, Event, State,
};
use beacon_selection::Staking;
use commonware_runtime::{Handle, Metrics, Spawner};
use commonware_utils::hex;
use futures::{channel::mpsc, StreamExt};
use tracing::{debug, info, warn};

/// Owns all rounds of an operator and serializes commands received over its [Mailbox].
pub struct Engine<E: Spawner + Metrics, S: Staking + Send + 'static> {
    context: E,
    state: State<S>,
    mailbox: mpsc::Receiver<Message>,
    metrics: metrics::Metrics,
}

impl<E: Spawner + Metrics, S: Staking + Send + 'static> Engine<E, S> {
    /// Create a new engine reading stake from `staking`.
    ///
    /// Returns the engine and a mailbox for sending commands to it.
    pub fn new(context: E, cfg: Config, staking: S) -> (Self, Mailbox) {
        let (sender, receiver) = mpsc::channel(cfg.mailbox_size);
        let metrics = metrics::Metrics::init(context.clone());
        let engine = Self {
            context,
            state: State::new(cfg, staking),
            mailbox: receiver,
            metrics,
        };
        (engine, Mailbox::new(sender))
    }

    /// Start the engine.
    pub fn start(self) -> Handle<()> {
        self.context.clone().spawn(move |_| self.run())
    }

    /// Inner run loop called by `start`.
    async fn run(mut self) {
        while let Some(message) = self.mailbox.next().await {
            self.handle(message);
            for event in self.state.drain_events() {
                self.observe(event);
            }
            self.metrics.groups.set(self.state.number_of_groups() as i64);
            self.metrics.height.set(self.state.height() as i64);
        }
        debug!("mailbox closed, shutting down");
    }

    fn handle(&mut self, message: Message) {
        match message {
            Message::Advance { blocks, responder } => {
                let height = self.state.advance(blocks);
                debug!(height, "advanced");
                let _ = responder.send(height);
            }
            Message::RelayEntry { entry, responder } => {
                let outcome = self.state.relay_entry(entry);
                info!(
                    seed = %outcome.seed,
                    signing_group = ?outcome.signing_group,
                    round = ?outcome.round,
                    "relay entry"
                );
                let _ = responder.send(outcome);
            }
            Message::StartSelection { seed, responder } => {
                let result = self.state.start_selection(seed);
                if let Err(err) = &result {
                    warn!(?err, "unable to start selection");
                }
                let _ = responder.send(result);
            }
            Message::SubmitTicket {
                submitter,
                value,
                virtual_staker_index,
                responder,
            } => {
                let result = self
                    .state
                    .submit_ticket(&submitter, value, virtual_staker_index);
                match &result {
                    Ok(insertion) => {
                        self.metrics.tickets_accepted.inc();
                        debug!(
                            %submitter,
                            index = virtual_staker_index,
                            rank = insertion.rank(),
                            "ticket accepted"
                        );
                    }
                    Err(err) => {
                        self.metrics.tickets_rejected.inc();
                        debug!(%submitter, index = virtual_staker_index, ?err, "ticket rejected");
                    }
                }
                let _ = responder.send(result);
            }
            Message::OrderedTickets { responder } => {
                let _ = responder.send(self.state.ordered_tickets());
            }
            Message::SubmittedTicketsCount { responder } => {
                let _ = responder.send(self.state.submitted_tickets_count());
            }
            Message::SelectedParticipants { responder } => {
                let _ = responder.send(self.state.selected_participants());
            }
            Message::EligibleBlock { rank, responder } => {
                let _ = responder.send(self.state.eligible_block(rank));
            }
            Message::SubmitResult {
                submitter,
                rank,
                result,
                supports,
                responder,
            } => {
                let signatures = supports.len();
                let result = self
                    .state
                    .submit_result(&submitter, rank, result, &supports);
                match &result {
                    Ok(digest) => {
                        self.metrics.results_accepted.inc();
                        info!(%submitter, rank, signatures, %digest, "result accepted");
                    }
                    Err(err) => {
                        self.metrics.results_rejected.inc();
                        debug!(%submitter, rank, ?err, "result rejected");
                    }
                }
                let _ = responder.send(result);
            }
            Message::SubmitVote {
                submitter,
                rank,
                result,
                responder,
            } => {
                let result = self.state.submit_vote(&submitter, rank, result);
                match &result {
                    Ok(digest) => {
                        self.metrics.results_accepted.inc();
                        debug!(%submitter, rank, %digest, "vote accepted");
                    }
                    Err(err) => {
                        self.metrics.results_rejected.inc();
                        debug!(%submitter, rank, ?err, "vote rejected");
                    }
                }
                let _ = responder.send(result);
            }
            Message::DkgResultSubmissions { responder } => {
                let _ = responder.send(self.state.dkg_result_submissions());
            }
            Message::FinalResult { responder } => {
                let _ = responder.send(self.state.final_result());
            }
            Message::ReportTimeout { responder } => {
                let result = self.state.report_timeout();
                if let Err(err) = &result {
                    debug!(?err, "timeout rejected");
                }
                let _ = responder.send(result);
            }
            Message::GroupMembers {
                public_key,
                responder,
            } => {
                let _ = responder.send(self.state.group_members(&public_key));
            }
            Message::IsGroupRegistered {
                public_key,
                responder,
            } => {
                let _ = responder.send(self.state.is_group_registered(&public_key));
            }
            Message::NumberOfGroups { responder } => {
                let _ = responder.send(self.state.number_of_groups());
            }
            Message::IsStaleGroup {
                public_key,
                responder,
            } => {
                let _ = responder.send(self.state.is_stale_group(&public_key));
            }
            Message::TerminateGroup {
                public_key,
                responder,
            } => {
                let result = self.state.terminate_group(&public_key);
                if result.is_ok() {
                    info!(public_key = hex(&public_key), "terminated group");
                }
                let _ = responder.send(result);
            }
            Message::Round { number, responder } => {
                let summary = match number {
                    Some(number) => self.state.round(number),
                    None => self.state.current_round(),
                };
                let _ = responder.send(summary);
            }
        }
    }

    fn observe(&mut self, event: Event) {
        match event {
            Event::RoundStarted { round, seed } => {
                self.metrics.rounds_started.inc();
                info!(round, %seed, "round started");
            }
            Event::PublicationOpened {
                round,
                participants,
                timeout,
            } => {
                info!(round, participants, timeout, "selection closed");
            }
            Event::GroupRegistered {
                round,
                index,
                public_key,
                members,
            } => {
                info!(
                    round,
                    index,
                    public_key = hex(&public_key),
                    members,
                    "group registered"
                );
            }
            Event::RoundFailed { round } => {
                self.metrics.rounds_failed.inc();
                warn!(round, "round failed");
            }
        }
    }
}
