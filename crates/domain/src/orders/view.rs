use std::sync::Arc;
use async_trait::async_trait;
use cqrs_es::{
    persist::{PersistenceError, ViewContext, ViewRepository},
    Aggregate, EventEnvelope, View as CqrsView,
};
use serde::{Deserialize, Serialize};
use super::{Order, AGGREGATE_TYPE};

#[derive(Clone, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct View {
    pub aggregate_type: String,
    pub command_id: String,
    pub id: String,
    pub order: Order,
}

impl CqrsView<Order> for View {
    fn update(&mut self, event: &EventEnvelope<Order>) {
        self.id.clone_from(&event.aggregate_id);
        self.aggregate_type = AGGREGATE_TYPE.to_string();
        self.command_id = event
            .metadata
            .get("command_id")
            .unwrap_or(&"".to_string())
            .to_string();
        self.order.apply(event.payload.clone());
    }
}

pub struct Query {
    repo: Arc<Box<dyn ViewRepository<View, Order>>>,
}

impl Query {
    pub fn new(repo: Arc<Box<dyn ViewRepository<View, Order>>>) -> Self {
        Self { repo }
    }

    async fn update(
        &self,
        order_id: &str,
        events: &[EventEnvelope<Order>],
    ) -> Result<(), PersistenceError> {
        let (mut view, view_context) = match self.repo.load_with_context(order_id).await? {
            None => {
                let view_context = ViewContext::new(order_id.to_string(), 0);
                (Default::default(), view_context)
            }
            Some((view, context)) => (view, context),
        };

        for event in events {
            view.update(event);
        }

        self.repo.update_view(view, view_context).await
    }
}

#[async_trait]
impl cqrs_es::Query<Order> for Query {
    async fn dispatch(&self, order_id: &str, events: &[EventEnvelope<Order>]) {
        if let Err(err) = self.update(order_id, events).await {
            eprintln!("OrderQuery error for {}: {}", order_id, err);
        }
    }
}
