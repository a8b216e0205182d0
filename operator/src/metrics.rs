use commonware_runtime::Metrics as RuntimeMetrics;
use prometheus_client::metrics::{counter::Counter, gauge::Gauge};

/// Metrics for the [Engine](super::Engine)
#[derive(Default)]
pub struct Metrics {
    /// Number of tickets accepted
    pub tickets_accepted: Counter,
    /// Number of tickets rejected
    pub tickets_rejected: Counter,
    /// Number of DKG results accepted (including votes)
    pub results_accepted: Counter,
    /// Number of DKG results rejected (including votes)
    pub results_rejected: Counter,
    /// Number of rounds started
    pub rounds_started: Counter,
    /// Number of rounds that did not create a group
    pub rounds_failed: Counter,
    /// Number of active groups
    pub groups: Gauge,
    /// Current block height
    pub height: Gauge,
}

impl Metrics {
    /// Create and return a new set of metrics, registered with the given context.
    pub fn init<E: RuntimeMetrics>(context: E) -> Self {
        let metrics = Metrics::default();
        context.register(
            "tickets_accepted",
            "Number of tickets accepted",
            metrics.tickets_accepted.clone(),
        );
        context.register(
            "tickets_rejected",
            "Number of tickets rejected",
            metrics.tickets_rejected.clone(),
        );
        context.register(
            "results_accepted",
            "Number of DKG results accepted (including votes)",
            metrics.results_accepted.clone(),
        );
        context.register(
            "results_rejected",
            "Number of DKG results rejected (including votes)",
            metrics.results_rejected.clone(),
        );
        context.register(
            "rounds_started",
            "Number of rounds started",
            metrics.rounds_started.clone(),
        );
        context.register(
            "rounds_failed",
            "Number of rounds that did not create a group",
            metrics.rounds_failed.clone(),
        );
        context.register("groups", "Number of active groups", metrics.groups.clone());
        context.register("height", "Current block height", metrics.height.clone());
        metrics
    }
}
