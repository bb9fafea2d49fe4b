use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use cqrs_es::{Aggregate, AggregateContext, AggregateError, EventEnvelope, EventStore};
use tokio::sync::RwLock;

/// In-memory event store with an optimistic concurrency check: a commit is
/// rejected when the stream grew after the aggregate was loaded, so racing
/// commands serialize instead of clobbering each other.
pub struct MemoryEventStore<A: Aggregate> {
    events: Arc<RwLock<HashMap<String, Vec<EventEnvelope<A>>>>>,
}

impl<A: Aggregate> Default for MemoryEventStore<A> {
    fn default() -> Self {
        Self {
            events: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<A: Aggregate> Clone for MemoryEventStore<A> {
    fn clone(&self) -> Self {
        Self {
            events: Arc::clone(&self.events),
        }
    }
}

impl<A: Aggregate> MemoryEventStore<A> {
    async fn committed_events(&self, aggregate_id: &str) -> Vec<EventEnvelope<A>> {
        self.events
            .read()
            .await
            .get(aggregate_id)
            .cloned()
            .unwrap_or_default()
    }

    fn wrap_events(
        aggregate_id: &str,
        current_sequence: usize,
        events: Vec<A::Event>,
        metadata: HashMap<String, String>,
    ) -> Vec<EventEnvelope<A>> {
        events
            .into_iter()
            .enumerate()
            .map(|(offset, payload)| EventEnvelope {
                aggregate_id: aggregate_id.to_string(),
                sequence: current_sequence + offset + 1,
                payload,
                metadata: metadata.clone(),
            })
            .collect()
    }
}

/// Aggregate state together with the stream position it was loaded at.
pub struct MemoryAggregateContext<A: Aggregate> {
    aggregate_id: String,
    aggregate: A,
    current_sequence: usize,
}

impl<A: Aggregate> AggregateContext<A> for MemoryAggregateContext<A> {
    fn aggregate(&self) -> &A {
        &self.aggregate
    }
}

#[async_trait]
impl<A: Aggregate> EventStore<A> for MemoryEventStore<A> {
    type AC = MemoryAggregateContext<A>;

    async fn load_events(
        &self,
        aggregate_id: &str,
    ) -> Result<Vec<EventEnvelope<A>>, AggregateError<A::Error>> {
        Ok(self.committed_events(aggregate_id).await)
    }

    async fn load_aggregate(
        &self,
        aggregate_id: &str,
    ) -> Result<Self::AC, AggregateError<A::Error>> {
        let committed = self.committed_events(aggregate_id).await;
        let mut aggregate = A::default();
        let mut current_sequence = 0;
        for envelope in committed {
            current_sequence = envelope.sequence;
            aggregate.apply(envelope.payload);
        }

        Ok(MemoryAggregateContext {
            aggregate_id: aggregate_id.to_string(),
            aggregate,
            current_sequence,
        })
    }

    async fn commit(
        &self,
        events: Vec<A::Event>,
        context: Self::AC,
        metadata: HashMap<String, String>,
    ) -> Result<Vec<EventEnvelope<A>>, AggregateError<A::Error>> {
        let wrapped =
            Self::wrap_events(&context.aggregate_id, context.current_sequence, events, metadata);

        let mut streams = self.events.write().await;
        let stream = streams.entry(context.aggregate_id).or_default();
        if stream.len() != context.current_sequence {
            return Err(AggregateError::AggregateConflict);
        }
        stream.extend(wrapped.iter().cloned());

        Ok(wrapped)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use domain::products::{Event, Product};

    use super::*;

    fn created() -> Event {
        Event::Created {
            id: "prod-1".to_string(),
            name: "Paracetamol 500mg".to_string(),
            price_cents: 499,
            stock_quantity: 5,
            prescription_required: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn commit_assigns_sequences_from_the_loaded_position() {
        let store = MemoryEventStore::<Product>::default();
        let context = store.load_aggregate("prod-1").await.unwrap();
        let committed = store
            .commit(vec![created()], context, HashMap::new())
            .await
            .unwrap();
        assert_eq!(committed[0].sequence, 1);

        let events = store.load_events("prod-1").await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].aggregate_id, "prod-1");
    }

    #[tokio::test]
    async fn stale_commit_is_rejected() {
        let store = MemoryEventStore::<Product>::default();
        let first = store.load_aggregate("prod-1").await.unwrap();
        let second = store.load_aggregate("prod-1").await.unwrap();

        store
            .commit(vec![created()], first, HashMap::new())
            .await
            .unwrap();
        let err = store
            .commit(vec![created()], second, HashMap::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AggregateError::AggregateConflict));
    }

    #[tokio::test]
    async fn load_aggregate_replays_committed_events() {
        let store = MemoryEventStore::<Product>::default();
        let context = store.load_aggregate("prod-1").await.unwrap();
        store
            .commit(vec![created()], context, HashMap::new())
            .await
            .unwrap();

        let context = store.load_aggregate("prod-1").await.unwrap();
        assert_eq!(context.aggregate().stock_quantity, 5);
        assert_eq!(context.current_sequence, 1);
    }
}
