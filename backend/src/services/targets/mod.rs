//! HTTP API for target lists.
//!
//! Routes under `/api/targets`:
//! - `GET /api/targets[?department=Eng]`: persisted targets, optionally for one
//!   department.
//! - `POST /api/targets/import/upload`: multipart upload of a CSV file. An
//!   optional `meta` JSON part (`{"declared_size": 123}`) may precede the `file`
//!   part. Starts a background import run and answers `{"job_id": "..."}`.
//! - `GET /api/targets/import/status/{job_id}`: the run's `ImportJob`, with its
//!   state while running and the full outcome (valid records, errors,
//!   warnings) once finished.
//! - `POST /api/targets/import/cancel/{job_id}`: abandons a run at its next
//!   stage boundary. Runs already committing finish regardless.
//! - `GET /api/targets/import/template`: a CSV holding only the header row.

use actix_web::web::{get, scope};
use actix_web::Scope;

pub mod import;
mod list;

const API_PATH: &str = "/api/targets";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .service(import::configure_routes())
        .route("", get().to(list::process))
}
