use std::sync::Arc;

use cqrs_es::persist::ViewRepository;

use domain::orders::{self, Order, PrescriptionDirectory};
use domain::payments::{self, MockPaymentGateway, Payment, PaymentGateway};
use domain::prescriptions::{self, Prescription};
use domain::products::{self, Product};
use domain::tickets::{self, SupportTicket};

use crate::cqrs::{
    self, OrderViews, PaymentViews, PrescriptionViews, ProductViews, TicketViews,
};
use crate::inventory::InventoryLedger;
use crate::notifications::{MemoryNotificationSink, NotificationSink};
use crate::notifiers::{OrderNotifier, PaymentNotifier, PrescriptionNotifier, TicketNotifier};
use crate::orders::OrderWorkflow;
use crate::payments::PaymentWorkflow;
use crate::prescriptions::{PrescriptionWorkflow, ViewPrescriptionDirectory};
use crate::tickets::{StaffRoster, SupportWorkflow};

/// The whole workflow engine wired over in-memory infrastructure: one event
/// store and one view store per aggregate, notifiers fanning out behind the
/// commits, and the services that orchestrate across aggregates.
pub struct App {
    pub inventory: InventoryLedger,
    pub prescriptions: PrescriptionWorkflow,
    pub orders: OrderWorkflow,
    pub payments: PaymentWorkflow,
    pub support: SupportWorkflow,
    pub notifications: Arc<MemoryNotificationSink>,
    pub roster: Arc<StaffRoster>,
}

impl App {
    /// Default wiring with the stand-in gateway.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MockPaymentGateway))
    }

    pub fn new(gateway: Arc<dyn PaymentGateway>) -> Self {
        let notifications = Arc::new(MemoryNotificationSink::default());
        let sink: Arc<dyn NotificationSink> = notifications.clone();

        let product_views = ProductViews::default();
        let product_repo: Arc<Box<dyn ViewRepository<products::View, Product>>> =
            Arc::new(Box::new(product_views.clone()));
        let product_cqrs = cqrs::init(
            vec![Box::new(products::Query::new(product_repo))],
            products::Services::default(),
        );

        let prescription_views = PrescriptionViews::default();
        let prescription_repo: Arc<Box<dyn ViewRepository<prescriptions::View, Prescription>>> =
            Arc::new(Box::new(prescription_views.clone()));
        let prescription_cqrs = cqrs::init(
            vec![
                Box::new(prescriptions::Query::new(prescription_repo)),
                Box::new(PrescriptionNotifier::new(sink.clone())),
            ],
            prescriptions::Services::default(),
        );

        let directory: Arc<dyn PrescriptionDirectory> =
            Arc::new(ViewPrescriptionDirectory::new(prescription_views.clone()));

        let order_views = OrderViews::default();
        let order_repo: Arc<Box<dyn ViewRepository<orders::View, Order>>> =
            Arc::new(Box::new(order_views.clone()));
        let order_cqrs = cqrs::init(
            vec![
                Box::new(orders::Query::new(order_repo)),
                Box::new(OrderNotifier::new(sink.clone())),
            ],
            orders::Services::new(directory.clone()),
        );

        let payment_views = PaymentViews::default();
        let payment_repo: Arc<Box<dyn ViewRepository<payments::View, Payment>>> =
            Arc::new(Box::new(payment_views.clone()));
        let payment_cqrs = cqrs::init(
            vec![
                Box::new(payments::Query::new(payment_repo)),
                Box::new(PaymentNotifier::new(sink.clone())),
            ],
            payments::Services::new(gateway),
        );

        let ticket_views = TicketViews::default();
        let ticket_repo: Arc<Box<dyn ViewRepository<tickets::View, SupportTicket>>> =
            Arc::new(Box::new(ticket_views.clone()));
        let ticket_cqrs = cqrs::init(
            vec![
                Box::new(tickets::Query::new(ticket_repo)),
                Box::new(TicketNotifier::new(sink)),
            ],
            tickets::Services::default(),
        );

        let roster = Arc::new(StaffRoster::default());

        Self {
            inventory: InventoryLedger::new(product_cqrs.clone(), product_views.clone()),
            prescriptions: PrescriptionWorkflow::new(
                prescription_cqrs,
                prescription_views,
            ),
            orders: OrderWorkflow::new(
                order_cqrs.clone(),
                order_views.clone(),
                product_cqrs,
                product_views,
                payment_cqrs.clone(),
                directory,
            ),
            payments: PaymentWorkflow::new(payment_cqrs, payment_views, order_cqrs, order_views),
            support: SupportWorkflow::new(ticket_cqrs, ticket_views, roster.clone()),
            notifications,
            roster,
        }
    }
}
