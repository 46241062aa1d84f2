//! Bulk import of target records from uploaded CSV files.
//!
//! - `pipeline`: parsing, validation, classification and commit of one upload.
//! - `store`: the SQLite system of record the pipeline reads from and writes to.
//! - `job_controller`: bookkeeping for runs executing in the background.
//! - `services`: the HTTP endpoints in front of all of the above.
//! - `config`: settings loaded from file and environment.

pub mod config;
pub mod job_controller;
pub mod pipeline;
pub mod services;
pub mod store;
