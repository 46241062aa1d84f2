//! The tabular import pipeline.
//!
//! One upload flows through these stages, strictly in order:
//!
//! 1. [`parser`] turns the raw bytes into [`parser::RawRow`]s, failing the whole
//!    run on structural damage or missing columns.
//! 2. [`validator`] checks every row against the [`schema`] and against the
//!    [`index`] of values already persisted, producing one verdict per row.
//! 3. [`aggregator`] folds the verdicts into an `ImportResult`.
//! 4. [`committer`] writes the valid rows in one store transaction.
//!
//! [`orchestrator`] sequences the stages and drives the run's state machine.

pub mod aggregator;
pub mod committer;
pub mod index;
pub mod orchestrator;
pub mod parser;
pub mod schema;
pub mod validator;

/// A file handed over by the caller.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    /// Size the caller claims the file has; checked against `bytes`.
    pub declared_size: u64,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            declared_size: bytes.len() as u64,
            bytes,
        }
    }
}
