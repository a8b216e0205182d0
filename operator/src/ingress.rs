use crate::{Error, RelayOutcome, Summary};
use beacon_dkg::{signatures::Support, Digest, DkgResult};
use beacon_selection::{Address, Height, Insertion, Seed, Ticket, Value};
use bytes::Bytes;
use futures::{
    channel::{mpsc, oneshot},
    SinkExt,
};

/// Message types that can be sent to the `Mailbox`
pub enum Message {
    /// Move the block height forward.
    Advance {
        blocks: u64,
        responder: oneshot::Sender<Height>,
    },

    /// Process a new beacon output.
    RelayEntry {
        entry: Bytes,
        responder: oneshot::Sender<RelayOutcome>,
    },

    /// Start a selection round with an explicit seed.
    StartSelection {
        seed: Seed,
        responder: oneshot::Sender<Result<u64, Error>>,
    },

    SubmitTicket {
        submitter: Address,
        value: Value,
        virtual_staker_index: u64,
        responder: oneshot::Sender<Result<Insertion, Error>>,
    },
    OrderedTickets {
        responder: oneshot::Sender<Result<Vec<Ticket>, Error>>,
    },
    SubmittedTicketsCount {
        responder: oneshot::Sender<Result<usize, Error>>,
    },
    SelectedParticipants {
        responder: oneshot::Sender<Result<Vec<Address>, Error>>,
    },

    EligibleBlock {
        rank: u32,
        responder: oneshot::Sender<Result<Height, Error>>,
    },
    SubmitResult {
        submitter: Address,
        rank: u32,
        result: DkgResult,
        supports: Vec<Support>,
        responder: oneshot::Sender<Result<Digest, Error>>,
    },
    SubmitVote {
        submitter: Address,
        rank: u32,
        result: DkgResult,
        responder: oneshot::Sender<Result<Digest, Error>>,
    },
    DkgResultSubmissions {
        responder: oneshot::Sender<Result<Vec<(Digest, u32)>, Error>>,
    },
    FinalResult {
        responder: oneshot::Sender<Result<(Digest, DkgResult), Error>>,
    },
    ReportTimeout {
        responder: oneshot::Sender<Result<(), Error>>,
    },

    GroupMembers {
        public_key: Bytes,
        responder: oneshot::Sender<Option<Vec<Address>>>,
    },
    IsGroupRegistered {
        public_key: Bytes,
        responder: oneshot::Sender<bool>,
    },
    NumberOfGroups {
        responder: oneshot::Sender<usize>,
    },
    IsStaleGroup {
        public_key: Bytes,
        responder: oneshot::Sender<Result<bool, Error>>,
    },
    TerminateGroup {
        public_key: Bytes,
        responder: oneshot::Sender<Result<(), Error>>,
    },

    /// Summary of a round (1-based), or of the latest round if `None`.
    Round {
        number: Option<u64>,
        responder: oneshot::Sender<Option<Summary>>,
    },
}

/// Ingress mailbox for [`Engine`](super::Engine).
#[derive(Clone)]
pub struct Mailbox {
    sender: mpsc::Sender<Message>,
}

impl Mailbox {
    pub(super) fn new(sender: mpsc::Sender<Message>) -> Self {
        Self { sender }
    }

    async fn request<T>(&mut self, message: impl FnOnce(oneshot::Sender<T>) -> Message) -> T {
        let (sender, receiver) = oneshot::channel();
        self.sender
            .send(message(sender))
            .await
            .expect("mailbox closed");
        receiver.await.expect("engine dropped responder")
    }

    /// Move the block height forward by `blocks`, returning the new height.
    pub async fn advance(&mut self, blocks: u64) -> Height {
        self.request(|responder| Message::Advance { blocks, responder })
            .await
    }

    /// Process a new beacon output.
    pub async fn relay_entry(&mut self, entry: Bytes) -> RelayOutcome {
        self.request(|responder| Message::RelayEntry { entry, responder })
            .await
    }

    /// Start a selection round seeded with `seed`.
    pub async fn start_selection(&mut self, seed: Seed) -> Result<u64, Error> {
        self.request(|responder| Message::StartSelection { seed, responder })
            .await
    }

    pub async fn submit_ticket(
        &mut self,
        submitter: Address,
        value: Value,
        virtual_staker_index: u64,
    ) -> Result<Insertion, Error> {
        self.request(|responder| Message::SubmitTicket {
            submitter,
            value,
            virtual_staker_index,
            responder,
        })
        .await
    }

    pub async fn ordered_tickets(&mut self) -> Result<Vec<Ticket>, Error> {
        self.request(|responder| Message::OrderedTickets { responder })
            .await
    }

    pub async fn submitted_tickets_count(&mut self) -> Result<usize, Error> {
        self.request(|responder| Message::SubmittedTicketsCount { responder })
            .await
    }

    pub async fn selected_participants(&mut self) -> Result<Vec<Address>, Error> {
        self.request(|responder| Message::SelectedParticipants { responder })
            .await
    }

    pub async fn eligible_block(&mut self, rank: u32) -> Result<Height, Error> {
        self.request(|responder| Message::EligibleBlock { rank, responder })
            .await
    }

    /// Publish a result supported by member signatures (first valid submission wins).
    pub async fn submit_result(
        &mut self,
        submitter: Address,
        rank: u32,
        result: DkgResult,
        supports: Vec<Support>,
    ) -> Result<Digest, Error> {
        self.request(|responder| Message::SubmitResult {
            submitter,
            rank,
            result,
            supports,
            responder,
        })
        .await
    }

    /// Vote for a result as the participant holding `rank`.
    pub async fn submit_vote(
        &mut self,
        submitter: Address,
        rank: u32,
        result: DkgResult,
    ) -> Result<Digest, Error> {
        self.request(|responder| Message::SubmitVote {
            submitter,
            rank,
            result,
            responder,
        })
        .await
    }

    pub async fn dkg_result_submissions(&mut self) -> Result<Vec<(Digest, u32)>, Error> {
        self.request(|responder| Message::DkgResultSubmissions { responder })
            .await
    }

    pub async fn final_result(&mut self) -> Result<(Digest, DkgResult), Error> {
        self.request(|responder| Message::FinalResult { responder })
            .await
    }

    pub async fn report_timeout(&mut self) -> Result<(), Error> {
        self.request(|responder| Message::ReportTimeout { responder })
            .await
    }

    pub async fn group_members(&mut self, public_key: Bytes) -> Option<Vec<Address>> {
        self.request(|responder| Message::GroupMembers {
            public_key,
            responder,
        })
        .await
    }

    pub async fn is_group_registered(&mut self, public_key: Bytes) -> bool {
        self.request(|responder| Message::IsGroupRegistered {
            public_key,
            responder,
        })
        .await
    }

    pub async fn number_of_groups(&mut self) -> usize {
        self.request(|responder| Message::NumberOfGroups { responder })
            .await
    }

    pub async fn is_stale_group(&mut self, public_key: Bytes) -> Result<bool, Error> {
        self.request(|responder| Message::IsStaleGroup {
            public_key,
            responder,
        })
        .await
    }

    /// Stop selecting the group registered with `public_key`.
    pub async fn terminate_group(&mut self, public_key: Bytes) -> Result<(), Error> {
        self.request(|responder| Message::TerminateGroup {
            public_key,
            responder,
        })
        .await
    }

    /// Summary of round `number` (1-based), or of the latest round if `None`.
    pub async fn round(&mut self, number: Option<u64>) -> Option<Summary> {
        self.request(|responder| Message::Round { number, responder })
            .await
    }
}
