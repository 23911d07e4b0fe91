use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub orders_created_total: IntCounter,
    pub order_transitions_total: IntCounterVec,
    pub ratings_submitted_total: IntCounterVec,
    pub location_broadcasts_total: IntCounter,
    pub realtime_clients: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let orders_created_total =
            IntCounter::new("orders_created_total", "Total orders created")
                .expect("valid orders_created_total metric");

        let order_transitions_total = IntCounterVec::new(
            Opts::new(
                "order_transitions_total",
                "Order status transitions by outcome",
            ),
            &["outcome"],
        )
        .expect("valid order_transitions_total metric");

        let ratings_submitted_total = IntCounterVec::new(
            Opts::new(
                "ratings_submitted_total",
                "Ratings applied to aggregates by target",
            ),
            &["target"],
        )
        .expect("valid ratings_submitted_total metric");

        let location_broadcasts_total = IntCounter::new(
            "location_broadcasts_total",
            "Rider location updates fanned out over the realtime channel",
        )
        .expect("valid location_broadcasts_total metric");

        let realtime_clients =
            IntGauge::new("realtime_clients", "Currently connected websocket clients")
                .expect("valid realtime_clients metric");

        registry
            .register(Box::new(orders_created_total.clone()))
            .expect("register orders_created_total");
        registry
            .register(Box::new(order_transitions_total.clone()))
            .expect("register order_transitions_total");
        registry
            .register(Box::new(ratings_submitted_total.clone()))
            .expect("register ratings_submitted_total");
        registry
            .register(Box::new(location_broadcasts_total.clone()))
            .expect("register location_broadcasts_total");
        registry
            .register(Box::new(realtime_clients.clone()))
            .expect("register realtime_clients");

        Self {
            registry,
            orders_created_total,
            order_transitions_total,
            ratings_submitted_total,
            location_broadcasts_total,
            realtime_clients,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
