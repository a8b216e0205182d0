/// Configuration for the [Coordinator](crate::Coordinator) and [Tally](crate::Tally).
#[derive(Clone, Debug)]
pub struct Config {
    /// Minimum number of members that must sign a published result.
    ///
    /// At most `participants - signature_threshold` members may be marked as misbehaved.
    pub signature_threshold: usize,

    /// Expected size of the group public key in bytes.
    pub group_public_key_size: usize,

    /// Number of blocks between the eligibility of consecutive ranks.
    pub result_publication_step: u64,

    /// Number of blocks reserved for the off-chain DKG after selection closes.
    pub time_dkg: u64,
}

impl Config {
    /// Size of an uncompressed alt_bn128 G2 point.
    pub const DEFAULT_GROUP_PUBLIC_KEY_SIZE: usize = 128;
}
