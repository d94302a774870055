//! Periodic per-model record counts published on the stats channel.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};

use super::ChannelHub;
use crate::model::ModelRegistry;

pub const STATS_CHANNEL: &str = "dashboard-stats";

/// `{"<table_name>": count, ...}`. Models whose fetch fails or times out report null.
pub async fn collect_stats(registry: &ModelRegistry, fetch_timeout: Duration) -> Value {
    let mut counts = Map::new();
    for model in registry.iter() {
        let count = match timeout(fetch_timeout, model.accessor.list()).await {
            Ok(Ok(records)) => Value::from(records.len()),
            Ok(Err(e)) => {
                tracing::warn!(model = %model.table_name, error = %e, "stats fetch failed");
                Value::Null
            }
            Err(_) => {
                tracing::warn!(model = %model.table_name, "stats fetch timed out");
                Value::Null
            }
        };
        counts.insert(model.table_name.clone(), count);
    }
    Value::Object(counts)
}

/// Spawn the ticker. Ticks with no subscriber on the stats channel do no data access.
pub fn spawn_stats_ticker(
    hub: Arc<ChannelHub>,
    registry: Arc<ModelRegistry>,
    every: Duration,
    fetch_timeout: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if hub.subscriber_count(STATS_CHANNEL) == 0 {
                continue;
            }
            let stats = collect_stats(&registry, fetch_timeout).await;
            let delivered = hub.publish(STATS_CHANNEL, stats);
            tracing::debug!(delivered, "published stats");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{InMemoryAccessor, ModelDescriptor, Record};
    use serde_json::json;

    fn registry() -> ModelRegistry {
        let mut registry = ModelRegistry::new();
        let users = InMemoryAccessor::new("id", vec![Record::new().with("id", 1), Record::new().with("id", 2)]);
        registry
            .register(ModelDescriptor::new("Users", "users", Arc::new(users)))
            .unwrap();
        registry
            .register(ModelDescriptor::new("Loans", "loans", Arc::new(InMemoryAccessor::new("id", vec![]))))
            .unwrap();
        registry
    }

    #[tokio::test]
    async fn counts_records_per_table() {
        let stats = collect_stats(&registry(), Duration::from_secs(1)).await;
        assert_eq!(stats, json!({"users": 2, "loans": 0}));
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_publishes_to_subscribers() {
        let hub = Arc::new(ChannelHub::new(8));
        let (conn, mut rx) = hub.connect();
        hub.subscribe(conn.id(), STATS_CHANNEL);
        let handle = spawn_stats_ticker(
            Arc::clone(&hub),
            Arc::new(registry()),
            Duration::from_secs(5),
            Duration::from_secs(1),
        );
        let msg: Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(msg["channel"], STATS_CHANNEL);
        assert_eq!(msg["data"]["users"], 2);
        handle.abort();
    }
}
