use crate::model::import::{ImportOutcome, ImportState};
use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
pub enum JobStatus {
    Pending,
    InProgress(ImportState),
    Finished(ImportOutcome),
}

/// A background import run as seen by pollers.
#[derive(Clone, Debug, Serialize)]
pub struct ImportJob {
    pub job_id: String,
    pub file_name: String,
    /// MD5 of the uploaded bytes, hex encoded.
    pub file_md5: String,
    pub status: JobStatus,
}
