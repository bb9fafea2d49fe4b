use std::collections::HashMap;
use std::sync::Arc;

use cqrs_es::persist::PersistenceError;
use cqrs_es::{Aggregate, AggregateError, CqrsFramework, Query, View};
use ulid::Ulid;

use domain::Error;

use crate::store::MemoryEventStore;
use crate::views::MemoryViewRepository;

pub type Cqrs<A> = Arc<CqrsFramework<A, MemoryEventStore<A>>>;

pub type OrderCqrs = Cqrs<domain::orders::Order>;
pub type OrderViews = MemoryViewRepository<domain::orders::View, domain::orders::Order>;

pub type PaymentCqrs = Cqrs<domain::payments::Payment>;
pub type PaymentViews = MemoryViewRepository<domain::payments::View, domain::payments::Payment>;

pub type PrescriptionCqrs = Cqrs<domain::prescriptions::Prescription>;
pub type PrescriptionViews =
    MemoryViewRepository<domain::prescriptions::View, domain::prescriptions::Prescription>;

pub type ProductCqrs = Cqrs<domain::products::Product>;
pub type ProductViews = MemoryViewRepository<domain::products::View, domain::products::Product>;

pub type TicketCqrs = Cqrs<domain::tickets::SupportTicket>;
pub type TicketViews = MemoryViewRepository<domain::tickets::View, domain::tickets::SupportTicket>;

pub fn init<A: Aggregate>(queries: Vec<Box<dyn Query<A>>>, services: A::Services) -> Cqrs<A> {
    Arc::new(CqrsFramework::new(
        MemoryEventStore::default(),
        queries,
        services,
    ))
}

/// Execute a command with a fresh command id in its metadata, translating
/// framework failures into domain errors. An optimistic-concurrency clash
/// surfaces as `Error::Conflict`.
pub(crate) async fn execute<A>(
    cqrs: &Cqrs<A>,
    aggregate_id: &str,
    command: A::Command,
) -> Result<(), Error>
where
    A: Aggregate<Error = Error>,
{
    let mut metadata = HashMap::new();
    metadata.insert("command_id".to_string(), Ulid::new().to_string());

    cqrs.execute_with_metadata(aggregate_id, command, metadata)
        .await
        .map_err(|err| convert(A::aggregate_type(), err))
}

fn convert(entity: String, err: AggregateError<Error>) -> Error {
    match err {
        AggregateError::UserError(err) => err,
        AggregateError::AggregateConflict => Error::Conflict { entity },
        AggregateError::DatabaseConnectionError(err)
        | AggregateError::DeserializationError(err)
        | AggregateError::UnexpectedError(err) => Error::Storage {
            message: err.to_string(),
        },
    }
}

/// Load a view or report the entity as missing.
pub(crate) async fn require_view<V, A>(
    views: &MemoryViewRepository<V, A>,
    id: &str,
) -> Result<V, Error>
where
    V: View<A> + Clone,
    A: Aggregate,
{
    use cqrs_es::persist::ViewRepository;

    match views.load(id).await {
        Ok(Some(view)) => Ok(view),
        Ok(None) => Err(Error::NotFound {
            entity: A::aggregate_type(),
        }),
        Err(err) => Err(storage(err)),
    }
}

fn storage(err: PersistenceError) -> Error {
    Error::Storage {
        message: err.to_string(),
    }
}
