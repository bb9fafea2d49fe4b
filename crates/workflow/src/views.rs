use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use cqrs_es::persist::{PersistenceError, ViewContext, ViewRepository};
use cqrs_es::{Aggregate, View};
use tokio::sync::RwLock;

/// In-memory view repository. Clones share the same storage, so one instance
/// can back the projector while another serves reads.
pub struct MemoryViewRepository<V, A> {
    views: Arc<RwLock<HashMap<String, (V, i64)>>>,
    _aggregate: PhantomData<A>,
}

impl<V, A> Default for MemoryViewRepository<V, A> {
    fn default() -> Self {
        Self {
            views: Arc::new(RwLock::new(HashMap::new())),
            _aggregate: PhantomData,
        }
    }
}

impl<V, A> Clone for MemoryViewRepository<V, A> {
    fn clone(&self) -> Self {
        Self {
            views: Arc::clone(&self.views),
            _aggregate: PhantomData,
        }
    }
}

impl<V, A> MemoryViewRepository<V, A>
where
    V: View<A> + Clone,
    A: Aggregate,
{
    /// All views matching the predicate, ordered by view id. Ids are ulids,
    /// so the order follows creation time.
    pub async fn select<F>(&self, predicate: F) -> Vec<V>
    where
        F: Fn(&V) -> bool,
    {
        let guard = self.views.read().await;
        let mut entries: Vec<(&String, &(V, i64))> = guard.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
            .into_iter()
            .filter(|(_, (view, _))| predicate(view))
            .map(|(_, (view, _))| view.clone())
            .collect()
    }
}

#[async_trait]
impl<V, A> ViewRepository<V, A> for MemoryViewRepository<V, A>
where
    V: View<A> + Clone,
    A: Aggregate,
{
    async fn load(&self, view_id: &str) -> Result<Option<V>, PersistenceError> {
        Ok(self
            .views
            .read()
            .await
            .get(view_id)
            .map(|(view, _)| view.clone()))
    }

    async fn load_with_context(
        &self,
        view_id: &str,
    ) -> Result<Option<(V, ViewContext)>, PersistenceError> {
        Ok(self.views.read().await.get(view_id).map(|(view, version)| {
            (view.clone(), ViewContext::new(view_id.to_string(), *version))
        }))
    }

    async fn update_view(&self, view: V, context: ViewContext) -> Result<(), PersistenceError> {
        self.views
            .write()
            .await
            .insert(context.view_instance_id, (view, context.version + 1));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use cqrs_es::persist::ViewContext;
    use domain::products::{Product, View};

    use super::*;

    fn view(id: &str, stock_quantity: u32) -> View {
        View {
            aggregate_type: "Product".to_string(),
            command_id: "cmd-1".to_string(),
            id: id.to_string(),
            product: Product {
                id: id.to_string(),
                stock_quantity,
                ..Product::default()
            },
        }
    }

    #[tokio::test]
    async fn update_then_load_round_trips() {
        let repo = MemoryViewRepository::<View, Product>::default();
        repo.update_view(view("prod-1", 5), ViewContext::new("prod-1".to_string(), 0))
            .await
            .unwrap();

        let loaded = repo.load("prod-1").await.unwrap().unwrap();
        assert_eq!(loaded.product.stock_quantity, 5);

        let (_, context) = repo.load_with_context("prod-1").await.unwrap().unwrap();
        assert_eq!(context.version, 1);
    }

    #[tokio::test]
    async fn clones_share_storage() {
        let repo = MemoryViewRepository::<View, Product>::default();
        let other = repo.clone();
        repo.update_view(view("prod-1", 5), ViewContext::new("prod-1".to_string(), 0))
            .await
            .unwrap();

        assert!(other.load("prod-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn select_filters_and_orders_by_id() {
        let repo = MemoryViewRepository::<View, Product>::default();
        repo.update_view(view("b", 2), ViewContext::new("b".to_string(), 0))
            .await
            .unwrap();
        repo.update_view(view("a", 9), ViewContext::new("a".to_string(), 0))
            .await
            .unwrap();
        repo.update_view(view("c", 1), ViewContext::new("c".to_string(), 0))
            .await
            .unwrap();

        let low = repo.select(|v| v.product.stock_quantity <= 2).await;
        let ids: Vec<&str> = low.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }
}
