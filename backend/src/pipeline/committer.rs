use crate::store::TargetStore;
use common::model::import::CommitOutcome;
use common::model::target::TargetRecord;
use log::{error, info};

/// Writes a validated batch through a [`TargetStore`] as one operation.
///
/// The batch either lands whole or not at all. A store failure is reported
/// verbatim in `failure_reason` and is never retried here: resubmitting the
/// same records is the caller's decision.
pub struct BulkCommitter<'a, S: TargetStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: TargetStore + ?Sized> BulkCommitter<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn commit(&self, records: &[TargetRecord]) -> CommitOutcome {
        if records.is_empty() {
            return CommitOutcome::failed("refusing to commit an empty batch");
        }

        match self.store.create_many(records) {
            Ok(committed) => {
                info!("Committed {} targets", committed.len());
                CommitOutcome::committed(committed)
            }
            Err(e) => {
                error!("Bulk commit of {} targets failed: {}", records.len(), e);
                CommitOutcome::failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingStore {
        calls: AtomicUsize,
        fail: bool,
    }

    impl TargetStore for CountingStore {
        fn existing_emails(&self) -> Result<Vec<String>, StoreError> {
            Ok(Vec::new())
        }

        fn create_many(&self, records: &[TargetRecord]) -> Result<Vec<TargetRecord>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(StoreError::Conflict("UNIQUE constraint failed: targets.email".into()))
            } else {
                Ok(records.to_vec())
            }
        }
    }

    fn counting_store(fail: bool) -> CountingStore {
        CountingStore {
            calls: AtomicUsize::new(0),
            fail,
        }
    }

    fn records() -> Vec<TargetRecord> {
        vec![TargetRecord {
            name: "A".into(),
            email: "a@x.com".into(),
            department: "Eng".into(),
        }]
    }

    #[test]
    fn success_returns_all_records() {
        let store = counting_store(false);
        let outcome = BulkCommitter::new(&store).commit(&records());

        assert!(outcome.is_success());
        assert_eq!(outcome.committed_records, records());
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failure_is_verbatim_and_not_retried() {
        let store = counting_store(true);
        let outcome = BulkCommitter::new(&store).commit(&records());

        assert!(outcome.committed_records.is_empty());
        assert_eq!(
            outcome.failure_reason.as_deref(),
            Some("constraint violated: UNIQUE constraint failed: targets.email")
        );
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_batch_never_reaches_the_store() {
        let store = counting_store(false);
        let outcome = BulkCommitter::new(&store).commit(&[]);

        assert!(!outcome.is_success());
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }
}
