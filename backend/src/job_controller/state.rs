//! Tracks import runs executing in the background.
//!
//! - `JobsState`: clonable handle to every known job and its cancel token.
//!   Injected into the Actix application in `main.rs`.
//! - `JobUpdate`: a status change sent by a running import.
//! - `start_job_updater`: the single task that applies `JobUpdate`s to the
//!   shared map, so workers never need the write lock themselves.

use crate::pipeline::orchestrator::CancelToken;
use common::jobs::{ImportJob, JobStatus};
use log::debug;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{mpsc, RwLock};

#[derive(Clone)]
pub struct JobsState {
    /// Job id -> latest known job. Read by the status endpoint, written by
    /// `register` and the updater task.
    pub jobs: Arc<RwLock<HashMap<String, ImportJob>>>,

    /// Cancel tokens of jobs that have not finished yet.
    pub cancellations: Arc<RwLock<HashMap<String, CancelToken>>>,

    /// Workers push their progress here; `start_job_updater` drains it.
    pub tx: mpsc::Sender<JobUpdate>,
}

impl JobsState {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<JobUpdate>) {
        let (tx, rx) = mpsc::channel(capacity);
        let state = Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            cancellations: Arc::new(RwLock::new(HashMap::new())),
            tx,
        };
        (state, rx)
    }

    pub async fn register(&self, job: ImportJob, cancel: CancelToken) {
        self.cancellations
            .write()
            .await
            .insert(job.job_id.clone(), cancel);
        self.jobs.write().await.insert(job.job_id.clone(), job);
    }

    pub async fn get(&self, job_id: &str) -> Option<ImportJob> {
        self.jobs.read().await.get(job_id).cloned()
    }

    /// Requests cancellation. Returns `false` if the job is unknown or
    /// already finished.
    pub async fn cancel(&self, job_id: &str) -> bool {
        match self.cancellations.read().await.get(job_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}

#[derive(Debug)]
pub struct JobUpdate {
    pub job_id: String,
    pub status: JobStatus,
}

/// Applies updates until every sender is gone. Spawn once at startup.
pub async fn start_job_updater(state: JobsState, mut rx: mpsc::Receiver<JobUpdate>) {
    while let Some(update) = rx.recv().await {
        debug!("Job {} -> {:?}", update.job_id, update.status);
        if matches!(update.status, JobStatus::Finished(_)) {
            state.cancellations.write().await.remove(&update.job_id);
        }
        let mut jobs = state.jobs.write().await;
        if let Some(job) = jobs.get_mut(&update.job_id) {
            job.status = update.status;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::model::import::{ImportOutcome, ImportState};

    fn job(id: &str) -> ImportJob {
        ImportJob {
            job_id: id.to_string(),
            file_name: "targets.csv".to_string(),
            file_md5: "d41d8cd98f00b204e9800998ecf8427e".to_string(),
            status: JobStatus::Pending,
        }
    }

    #[tokio::test]
    async fn updates_are_applied_and_finished_jobs_lose_their_token() {
        let (state, rx) = JobsState::new(8);
        let token = CancelToken::default();
        state.register(job("j1"), token.clone()).await;

        let tx = state.tx.clone();
        tx.send(JobUpdate {
            job_id: "j1".into(),
            status: JobStatus::InProgress(ImportState::Validating),
        })
        .await
        .unwrap();
        tx.send(JobUpdate {
            job_id: "j1".into(),
            status: JobStatus::Finished(ImportOutcome::Abandoned {
                at: ImportState::Parsing,
            }),
        })
        .await
        .unwrap();

        let handle = tokio::spawn(start_job_updater(state.clone(), rx));
        tokio::time::timeout(std::time::Duration::from_secs(2), async {
            loop {
                if matches!(
                    state.get("j1").await.map(|j| j.status),
                    Some(JobStatus::Finished(_))
                ) {
                    break;
                }
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        assert!(!state.cancel("j1").await);
        assert!(!token.is_cancelled());
        handle.abort();
    }

    #[tokio::test]
    async fn cancel_sets_the_token_of_a_running_job() {
        let (state, _rx) = JobsState::new(8);
        let token = CancelToken::default();
        state.register(job("j2"), token.clone()).await;

        assert!(state.cancel("j2").await);
        assert!(token.is_cancelled());
        assert!(!state.cancel("missing").await);
    }
}
