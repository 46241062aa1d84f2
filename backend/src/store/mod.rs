//! Persistence for imported targets.
//!
//! The pipeline only needs two things from a store: the current set of
//! e-mails (to build the existing-record index) and an all-or-nothing bulk
//! create. [`TargetStore`] is that seam; [`sqlite::SqliteTargetStore`] is the
//! implementation the service runs on.

pub mod sqlite;

use common::model::target::TargetRecord;
use thiserror::Error;

pub use sqlite::SqliteTargetStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("constraint violated: {0}")]
    Conflict(String),
}

pub trait TargetStore: Send + Sync {
    /// Every persisted e-mail, as stored.
    fn existing_emails(&self) -> Result<Vec<String>, StoreError>;

    /// Inserts all `records` in a single transaction and returns them.
    /// On error nothing has been written.
    fn create_many(&self, records: &[TargetRecord]) -> Result<Vec<TargetRecord>, StoreError>;
}

impl<S: TargetStore + ?Sized> TargetStore for std::sync::Arc<S> {
    fn existing_emails(&self) -> Result<Vec<String>, StoreError> {
        (**self).existing_emails()
    }

    fn create_many(&self, records: &[TargetRecord]) -> Result<Vec<TargetRecord>, StoreError> {
        (**self).create_many(records)
    }
}
