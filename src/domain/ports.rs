use super::payment::{AckUpdate, Acknowledgement, ProviderStatus, SendRequest};
use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use uuid::Uuid;

/// A domain object with a stable identity, storable in a [`Repository`].
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection name, e.g. a column family or table.
    const KIND: &'static str;

    fn id(&self) -> Uuid;
}

/// Audit-trail storage for one entity kind.
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    async fn save(&self, entity: T) -> Result<Uuid>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<T>>;
}

pub type RepositoryBox<T> = Arc<dyn Repository<T>>;

/// The remote payment provider, as seen by the send and acknowledgement stages.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Submits a payment. An outright refusal is a `BusinessRejection`.
    async fn send_payment(&self, request: &SendRequest) -> Result<Acknowledgement>;

    /// Latest known status of a conversation.
    async fn poll_status(&self, acknowledgement: &Acknowledgement) -> Result<AckUpdate>;

    /// Reference and fee for a conversation that reached a terminal status.
    async fn payment_status(&self, acknowledgement: &Acknowledgement) -> Result<ProviderStatus>;
}

pub type PaymentProviderBox = Arc<dyn PaymentProvider>;
