use std::sync::Arc;
use async_trait::async_trait;
use cqrs_es::{
    persist::{PersistenceError, ViewContext, ViewRepository},
    Aggregate, EventEnvelope, View as CqrsView,
};
use serde::{Deserialize, Serialize};
use super::{Product, AGGREGATE_TYPE};

#[derive(Clone, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct View {
    pub aggregate_type: String,
    pub command_id: String,
    pub id: String,
    pub product: Product,
}

impl CqrsView<Product> for View {
    fn update(&mut self, event: &EventEnvelope<Product>) {
        self.id.clone_from(&event.aggregate_id);
        self.aggregate_type = AGGREGATE_TYPE.to_string();
        self.command_id = event
            .metadata
            .get("command_id")
            .unwrap_or(&"".to_string())
            .to_string();
        self.product.apply(event.payload.clone());
    }
}

pub struct Query {
    repo: Arc<Box<dyn ViewRepository<View, Product>>>,
}

impl Query {
    pub fn new(repo: Arc<Box<dyn ViewRepository<View, Product>>>) -> Self {
        Self { repo }
    }

    async fn update(
        &self,
        product_id: &str,
        events: &[EventEnvelope<Product>],
    ) -> Result<(), PersistenceError> {
        let (mut view, view_context) = match self.repo.load_with_context(product_id).await? {
            None => {
                let view_context = ViewContext::new(product_id.to_string(), 0);
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
impl cqrs_es::Query<Product> for Query {
    async fn dispatch(&self, product_id: &str, events: &[EventEnvelope<Product>]) {
        if let Err(err) = self.update(product_id, events).await {
            eprintln!("ProductQuery error for {}: {}", product_id, err);
        }
    }
}
