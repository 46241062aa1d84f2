//! Receives an import file and starts a background run over it.
//!
//! The multipart body is read part by part. An optional `meta` part carries
//! an `ImportUploadMeta` JSON document; the `file` part must have a `.csv`
//! name. The file is buffered in memory (it is bounded by
//! `import.max_file_size_bytes`) and hashed with MD5 as it arrives. The run
//! itself executes on Tokio's blocking pool and reports each state change to
//! the job updater.

use crate::job_controller::state::{JobUpdate, JobsState};
use crate::pipeline::orchestrator::CancelToken;
use crate::pipeline::UploadedFile;
use crate::services::ImportContext;
use actix_multipart::{Multipart, MultipartError};
use actix_web::{web, HttpResponse, Responder};
use common::jobs::{ImportJob, JobStatus};
use common::model::import::{ImportOutcome, ImportResult};
use common::requests::ImportUploadMeta;
use futures_util::StreamExt;
use log::{info, warn};
use md5::Context;
use serde_json::from_slice;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("The file must end with .csv")]
    NotCsv,
    #[error("Missing file")]
    MissingFile,
    #[error("File exceeds the limit of {0} bytes")]
    TooLarge(u64),
    #[error("Invalid meta part: {0}")]
    Meta(#[from] serde_json::Error),
    #[error("Malformed upload: {0}")]
    Multipart(#[from] MultipartError),
}

struct ReceivedFile {
    file: UploadedFile,
    md5: String,
}

/// `200 OK` with `{"job_id": ...}` once the run is scheduled, `413` for an
/// oversized file, `400` for anything else wrong with the upload.
pub(crate) async fn process(
    payload: Multipart,
    jobs_state: web::Data<JobsState>,
    context: web::Data<ImportContext>,
) -> impl Responder {
    match receive_upload(payload, context.max_file_size_bytes).await {
        Ok(received) => {
            let job_id = schedule_import_job(jobs_state, context, received).await;
            HttpResponse::Ok().json(serde_json::json!({ "job_id": job_id }))
        }
        Err(e @ UploadError::TooLarge(_)) => {
            warn!("Upload refused: {}", e);
            HttpResponse::PayloadTooLarge().body(format!("Error: {}", e))
        }
        Err(e) => {
            warn!("Upload refused: {}", e);
            HttpResponse::BadRequest().body(format!("Error: {}", e))
        }
    }
}

async fn receive_upload(
    mut payload: Multipart,
    max_bytes: u64,
) -> Result<ReceivedFile, UploadError> {
    let mut meta = ImportUploadMeta::default();
    let mut received: Option<(String, Vec<u8>, String)> = None;

    while let Some(item) = payload.next().await {
        let mut field = item?;
        let part_name = field
            .content_disposition()
            .and_then(|cd| cd.get_name().map(|n| n.to_string()));

        match part_name.as_deref() {
            Some("file") => {
                let filename = field
                    .content_disposition()
                    .and_then(|cd| cd.get_filename().map(|f| f.to_string()))
                    .unwrap_or_default();
                if !filename.to_lowercase().ends_with(".csv") {
                    return Err(UploadError::NotCsv);
                }

                let mut md5_hasher = Context::new();
                let mut bytes = Vec::new();
                while let Some(chunk) = field.next().await {
                    let chunk = chunk?;
                    if (bytes.len() + chunk.len()) as u64 > max_bytes {
                        return Err(UploadError::TooLarge(max_bytes));
                    }
                    md5_hasher.consume(&chunk);
                    bytes.extend_from_slice(&chunk);
                }
                let md5 = format!("{:x}", md5_hasher.finalize());
                received = Some((filename, bytes, md5));
            }

            Some("meta") => {
                let mut bytes = Vec::new();
                while let Some(chunk) = field.next().await {
                    bytes.extend_from_slice(&chunk?);
                }
                meta = from_slice(&bytes)?;
            }

            _ => {}
        }
    }

    let (name, bytes, md5) = received.ok_or(UploadError::MissingFile)?;
    let declared_size = meta.declared_size.unwrap_or(bytes.len() as u64);
    Ok(ReceivedFile {
        file: UploadedFile {
            name,
            declared_size,
            bytes,
        },
        md5,
    })
}

/// Registers the job as `Pending`, then runs it in the background. Returns
/// the job id immediately.
async fn schedule_import_job(
    jobs_state: web::Data<JobsState>,
    context: web::Data<ImportContext>,
    received: ReceivedFile,
) -> String {
    let job_id = Uuid::new_v4().to_string();
    let cancel = CancelToken::default();
    let ReceivedFile { file, md5 } = received;

    info!(
        "Import job {} scheduled for '{}' ({} bytes, md5 {})",
        job_id,
        file.name,
        file.bytes.len(),
        md5
    );
    jobs_state
        .register(
            ImportJob {
                job_id: job_id.clone(),
                file_name: file.name.clone(),
                file_md5: md5,
                status: JobStatus::Pending,
            },
            cancel.clone(),
        )
        .await;

    let tx = jobs_state.tx.clone();
    let value = job_id.clone();
    let context = context.into_inner();

    tokio::spawn(async move {
        let tx_block = tx.clone();
        let job_id_for_blocking = value.clone();

        let handle = tokio::task::spawn_blocking(move || {
            context
                .orchestrator
                .submit_with(&file, &cancel, |state| {
                    let _ = tx_block.blocking_send(JobUpdate {
                        job_id: job_id_for_blocking.clone(),
                        status: JobStatus::InProgress(state),
                    });
                })
        });

        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(join_err) => ImportOutcome::Failed {
                reason: format!("join error: {}", join_err),
                result: ImportResult::default(),
            },
        };
        info!("Import job {} finished as {:?}", value, outcome.state());
        let _ = tx
            .send(JobUpdate {
                job_id: value,
                status: JobStatus::Finished(outcome),
            })
            .await;
    });

    job_id
}
