use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use ulid::Ulid;

use domain::Error;

/// Classifies a notification for client-side grouping.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationCategory {
    OrderUpdate,
    PaymentUpdate,
    PrescriptionUpdate,
    SupportUpdate,
}

/// A user-facing notification. Immutable once delivered, except for the
/// read flag.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub body: String,
    pub category: NotificationCategory,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Delivery target for notifications. Best effort: emitters log and drop
/// failures, and never fail the command that triggered them.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn create(
        &self,
        user_id: &str,
        title: &str,
        body: &str,
        category: NotificationCategory,
    ) -> anyhow::Result<()>;
}

/// In-memory sink doubling as the notification read model.
#[derive(Default)]
pub struct MemoryNotificationSink {
    notifications: RwLock<Vec<Notification>>,
}

impl MemoryNotificationSink {
    /// All notifications for a user, oldest first.
    pub async fn for_user(&self, user_id: &str) -> Vec<Notification> {
        self.notifications
            .read()
            .await
            .iter()
            .filter(|notification| notification.user_id == user_id)
            .cloned()
            .collect()
    }

    pub async fn unread(&self, user_id: &str) -> Vec<Notification> {
        self.notifications
            .read()
            .await
            .iter()
            .filter(|notification| notification.user_id == user_id && !notification.read)
            .cloned()
            .collect()
    }

    pub async fn mark_read(&self, notification_id: &str) -> Result<Notification, Error> {
        let mut guard = self.notifications.write().await;
        match guard
            .iter_mut()
            .find(|notification| notification.id == notification_id)
        {
            Some(notification) => {
                notification.read = true;
                Ok(notification.clone())
            }
            None => Err(Error::NotFound {
                entity: "Notification".to_string(),
            }),
        }
    }
}

#[async_trait]
impl NotificationSink for MemoryNotificationSink {
    async fn create(
        &self,
        user_id: &str,
        title: &str,
        body: &str,
        category: NotificationCategory,
    ) -> anyhow::Result<()> {
        let notification = Notification {
            id: Ulid::new().to_string(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            category,
            read: false,
            created_at: Utc::now(),
        };
        self.notifications.write().await.push(notification);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unread_shrinks_as_notifications_are_read() {
        let sink = MemoryNotificationSink::default();
        sink.create("cust-1", "Order Placed", "Order #1", NotificationCategory::OrderUpdate)
            .await
            .unwrap();
        sink.create("cust-1", "Order Shipped", "Order #1", NotificationCategory::OrderUpdate)
            .await
            .unwrap();
        sink.create("cust-2", "Order Placed", "Order #2", NotificationCategory::OrderUpdate)
            .await
            .unwrap();

        assert_eq!(sink.for_user("cust-1").await.len(), 2);
        assert_eq!(sink.unread("cust-1").await.len(), 2);

        let first = sink.for_user("cust-1").await.remove(0);
        let marked = sink.mark_read(&first.id).await.unwrap();
        assert!(marked.read);
        assert_eq!(sink.unread("cust-1").await.len(), 1);
        assert_eq!(sink.for_user("cust-1").await.len(), 2);
    }

    #[tokio::test]
    async fn marking_an_unknown_notification_fails() {
        let sink = MemoryNotificationSink::default();
        let err = sink.mark_read("missing").await.unwrap_err();
        assert_eq!(err.to_string(), "Notification not found");
    }
}
