use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use derive_new::new;
use tokio::sync::RwLock;
use ulid::Ulid;

use domain::identity::{Identity, Role, STAFF};
use domain::tickets::{self, TicketPriority, TicketStatus};
use domain::Error;

use crate::cqrs::{self, TicketCqrs, TicketViews};

/// Round-robin staff picker. New tickets rotate through the enrolled staff
/// instead of always landing on whoever sorts first.
#[derive(Default)]
pub struct StaffRoster {
    by_role: RwLock<HashMap<Role, VecDeque<String>>>,
}

impl StaffRoster {
    /// Enroll a staff member in the assignment rotation.
    pub async fn register(&self, user_id: &str, role: Role) {
        let mut guard = self.by_role.write().await;
        let queue = guard.entry(role).or_default();
        if !queue.iter().any(|existing| existing == user_id) {
            queue.push_back(user_id.to_string());
        }
    }

    /// Next assignee for the role; the pick moves to the back of the queue.
    pub async fn next(&self, role: Role) -> Option<String> {
        let mut guard = self.by_role.write().await;
        let queue = guard.get_mut(&role)?;
        let user_id = queue.pop_front()?;
        queue.push_back(user_id.clone());
        Some(user_id)
    }

    /// A pharmacist if any is enrolled, otherwise an admin.
    pub async fn next_support_assignee(&self) -> Option<String> {
        match self.next(Role::Pharmacist).await {
            Some(user_id) => Some(user_id),
            None => self.next(Role::Admin).await,
        }
    }
}

/// Customer support tickets. The status model is deliberately permissive;
/// assignment and responses are staff-gated.
#[derive(new)]
pub struct SupportWorkflow {
    tickets: TicketCqrs,
    views: TicketViews,
    roster: Arc<StaffRoster>,
}

impl SupportWorkflow {
    /// Open a ticket and hand it to the next staff member in rotation. The
    /// ticket is created even when nobody is enrolled to take it.
    pub async fn open(
        &self,
        identity: &Identity,
        subject: &str,
        description: &str,
        priority: Option<TicketPriority>,
    ) -> Result<tickets::View, Error> {
        let ticket_id = Ulid::new().to_string();
        let command = tickets::Command::Open {
            id: ticket_id.clone(),
            customer_id: identity.user_id.clone(),
            subject: subject.to_string(),
            description: description.to_string(),
            priority: priority.unwrap_or_default(),
        };
        cqrs::execute(&self.tickets, &ticket_id, command).await?;
        tracing::info!(ticket_id, customer_id = %identity.user_id, "support ticket opened");

        if let Some(staff_id) = self.roster.next_support_assignee().await {
            let assign = tickets::Command::Assign {
                staff_id: staff_id.clone(),
            };
            match cqrs::execute(&self.tickets, &ticket_id, assign).await {
                Ok(()) => tracing::info!(ticket_id, staff_id, "ticket assigned"),
                Err(err) => tracing::error!(ticket_id, staff_id, %err, "failed to assign ticket"),
            }
        } else {
            tracing::warn!(ticket_id, "no staff enrolled for ticket assignment");
        }

        cqrs::require_view(&self.views, &ticket_id).await
    }

    /// Move a ticket to any status. Staff only; same-status moves are no-ops.
    pub async fn set_status(
        &self,
        identity: &Identity,
        ticket_id: &str,
        status: TicketStatus,
    ) -> Result<tickets::View, Error> {
        identity.require_role(STAFF, "update support tickets")?;

        let command = tickets::Command::SetStatus { status };
        cqrs::execute(&self.tickets, ticket_id, command).await?;
        tracing::info!(ticket_id, %status, "ticket status set");

        cqrs::require_view(&self.views, ticket_id).await
    }

    /// Record a staff reply on the ticket.
    pub async fn add_response(
        &self,
        identity: &Identity,
        ticket_id: &str,
        response: &str,
    ) -> Result<tickets::View, Error> {
        identity.require_role(STAFF, "respond to support tickets")?;

        let command = tickets::Command::AddResponse {
            staff_id: identity.user_id.clone(),
            response: response.to_string(),
        };
        cqrs::execute(&self.tickets, ticket_id, command).await?;
        tracing::info!(ticket_id, staff_id = %identity.user_id, "ticket response added");

        cqrs::require_view(&self.views, ticket_id).await
    }

    pub async fn get(&self, ticket_id: &str) -> Result<tickets::View, Error> {
        cqrs::require_view(&self.views, ticket_id).await
    }

    pub async fn for_user(&self, user_id: &str) -> Vec<tickets::View> {
        self.views
            .select(|view| view.ticket.customer_id == user_id)
            .await
    }

    pub async fn assigned_to(&self, staff_id: &str) -> Vec<tickets::View> {
        self.views
            .select(|view| view.ticket.assigned_to.as_deref() == Some(staff_id))
            .await
    }

    pub async fn all(&self) -> Vec<tickets::View> {
        self.views.select(|_| true).await
    }
}

#[cfg(test)]
mod tests {
    use domain::identity::Role;

    use super::StaffRoster;

    #[tokio::test]
    async fn roster_rotates_through_staff() {
        let roster = StaffRoster::default();
        roster.register("pharm-1", Role::Pharmacist).await;
        roster.register("pharm-2", Role::Pharmacist).await;

        assert_eq!(roster.next(Role::Pharmacist).await.as_deref(), Some("pharm-1"));
        assert_eq!(roster.next(Role::Pharmacist).await.as_deref(), Some("pharm-2"));
        assert_eq!(roster.next(Role::Pharmacist).await.as_deref(), Some("pharm-1"));
    }

    #[tokio::test]
    async fn duplicate_registration_is_ignored() {
        let roster = StaffRoster::default();
        roster.register("pharm-1", Role::Pharmacist).await;
        roster.register("pharm-1", Role::Pharmacist).await;

        assert_eq!(roster.next(Role::Pharmacist).await.as_deref(), Some("pharm-1"));
        assert_eq!(roster.next(Role::Pharmacist).await.as_deref(), Some("pharm-1"));
    }

    #[tokio::test]
    async fn support_assignment_falls_back_to_admins() {
        let roster = StaffRoster::default();
        assert_eq!(roster.next_support_assignee().await, None);

        roster.register("admin-1", Role::Admin).await;
        assert_eq!(roster.next_support_assignee().await.as_deref(), Some("admin-1"));

        roster.register("pharm-1", Role::Pharmacist).await;
        assert_eq!(roster.next_support_assignee().await.as_deref(), Some("pharm-1"));
    }
}
