use crate::patient::{NewPatient, Patient};
use crate::store::error::StoreError;

pub(crate) mod client;
pub use client::StoreClient;
pub mod error;

#[cfg(test)]
use mockall::{automock, predicate::*};

/// The remote relational backend holding patient and visit records. The
/// dashboard issues exactly four operations against it: three reads and one
/// insert.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    /// The most recent patients, ordered by creation time descending (id
    /// descending as the tie-break), capped at `limit`.
    async fn list_recent_patients(&self, limit: u32) -> Result<Vec<Patient>, StoreError>;

    /// Exact count of all patient records.
    async fn count_patients(&self) -> Result<u64, StoreError>;

    /// Exact count of all visit records.
    async fn count_visits(&self) -> Result<u64, StoreError>;

    /// Inserts a new patient. The store assigns `id` and `created_at`.
    async fn insert_patient(&self, patient: NewPatient) -> Result<(), StoreError>;
}
