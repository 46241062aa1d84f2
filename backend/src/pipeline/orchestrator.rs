//! Runs one upload through the pipeline and tracks where it is.

use crate::pipeline::aggregator::aggregate;
use crate::pipeline::committer::BulkCommitter;
use crate::pipeline::index::ExistingRecordIndex;
use crate::pipeline::parser::{ParseOptions, RawRow, RowParser};
use crate::pipeline::schema::SchemaRegistry;
use crate::pipeline::validator::RowValidator;
use crate::pipeline::UploadedFile;
use crate::store::TargetStore;
use common::model::diagnostic::{Diagnostic, DiagnosticCode};
use common::model::field::UniquenessScope;
use common::model::import::{ImportOutcome, ImportResult, ImportState};
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

const INDEXED_FIELD: &str = "email";

/// Shared flag a caller sets to abandon a run.
///
/// Checked only between stages, and never once committing has begun.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("illegal import transition {from:?} -> {to:?}")]
pub struct TransitionError {
    pub from: ImportState,
    pub to: ImportState,
}

/// State machine of a single run. Every accepted transition is passed to the
/// observer.
pub struct ImportRun<F: FnMut(ImportState)> {
    state: ImportState,
    observer: F,
}

impl<F: FnMut(ImportState)> ImportRun<F> {
    pub fn new(observer: F) -> Self {
        Self {
            state: ImportState::Idle,
            observer,
        }
    }

    pub fn state(&self) -> ImportState {
        self.state
    }

    pub fn advance(&mut self, next: ImportState) -> Result<(), TransitionError> {
        if !self.state.can_transition_to(next) {
            return Err(TransitionError {
                from: self.state,
                to: next,
            });
        }
        debug!("Import run {:?} -> {:?}", self.state, next);
        self.state = next;
        (self.observer)(next);
        Ok(())
    }
}

/// Entry point of the pipeline.
///
/// Holds nothing that changes between runs; every [`submit`](Self::submit)
/// parses, fetches a fresh existing-record index, validates and commits on
/// its own.
pub struct ImportOrchestrator<S: TargetStore> {
    schema: Arc<SchemaRegistry>,
    store: S,
    options: ParseOptions,
}

impl<S: TargetStore> ImportOrchestrator<S> {
    pub fn new(schema: Arc<SchemaRegistry>, store: S, options: ParseOptions) -> Self {
        Self {
            schema,
            store,
            options,
        }
    }

    pub fn schema(&self) -> &SchemaRegistry {
        &self.schema
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn submit(&self, file: &UploadedFile) -> ImportOutcome {
        self.submit_with(file, &CancelToken::default(), |_| {})
    }

    /// Like [`submit`](Self::submit), reporting every state change to
    /// `on_transition` and honouring `cancel` between stages.
    pub fn submit_with<F>(
        &self,
        file: &UploadedFile,
        cancel: &CancelToken,
        on_transition: F,
    ) -> ImportOutcome
    where
        F: FnMut(ImportState),
    {
        let mut run = ImportRun::new(on_transition);
        match self.run_stages(&mut run, file, cancel) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Import of '{}' aborted: {}", file.name, e);
                ImportOutcome::Failed {
                    reason: e.to_string(),
                    result: ImportResult::default(),
                }
            }
        }
    }

    fn run_stages<F: FnMut(ImportState)>(
        &self,
        run: &mut ImportRun<F>,
        file: &UploadedFile,
        cancel: &CancelToken,
    ) -> Result<ImportOutcome, TransitionError> {
        if let Some(outcome) = abandon_if_cancelled(run, cancel)? {
            return Ok(outcome);
        }

        run.advance(ImportState::Parsing)?;
        let rows = match self.parse(file) {
            Ok(rows) => rows,
            Err(diagnostic) => {
                warn!("Import of '{}' rejected: {}", file.name, diagnostic.message());
                run.advance(ImportState::Failed)?;
                return Ok(ImportOutcome::Failed {
                    reason: diagnostic.message().to_string(),
                    result: ImportResult::fatal(diagnostic),
                });
            }
        };
        info!("Parsed {} rows from '{}'", rows.len(), file.name);

        if let Some(outcome) = abandon_if_cancelled(run, cancel)? {
            return Ok(outcome);
        }

        let index = match self.fetch_index() {
            Ok(index) => index,
            Err(reason) => {
                error!("Could not load existing records: {}", reason);
                run.advance(ImportState::Failed)?;
                return Ok(ImportOutcome::Failed {
                    reason,
                    result: ImportResult::default(),
                });
            }
        };

        run.advance(ImportState::Validating)?;
        let verdicts = RowValidator::new(&self.schema, &index).validate_all(&rows);
        let result = aggregate(&verdicts);
        info!(
            "Validated '{}': {} valid ({} with warnings), {} rejected",
            file.name,
            result.summary.valid_rows,
            result.summary.warned_rows,
            result.summary.rejected_rows
        );

        run.advance(ImportState::ReadyToCommit)?;
        if result.valid.is_empty() {
            run.advance(ImportState::Done)?;
            return Ok(ImportOutcome::Done {
                result,
                committed: Vec::new(),
            });
        }

        if let Some(outcome) = abandon_if_cancelled(run, cancel)? {
            return Ok(outcome);
        }

        // No cancellation checks from here until the store answers.
        run.advance(ImportState::Committing)?;
        let outcome = BulkCommitter::new(&self.store).commit(&result.valid);
        match outcome.failure_reason {
            Some(reason) => {
                run.advance(ImportState::Failed)?;
                Ok(ImportOutcome::Failed { reason, result })
            }
            None => {
                run.advance(ImportState::Done)?;
                Ok(ImportOutcome::Done {
                    result,
                    committed: outcome.committed_records,
                })
            }
        }
    }

    fn parse(&self, file: &UploadedFile) -> Result<Vec<RawRow>, Diagnostic> {
        let received = file.bytes.len() as u64;
        if file.declared_size != received {
            return Err(Diagnostic::new(
                DiagnosticCode::ParseError,
                format!(
                    "declared size {} bytes but received {} bytes",
                    file.declared_size, received
                ),
            ));
        }

        let parser = RowParser::open(&file.bytes, self.options)?;
        let missing = parser.missing_headers(&self.schema.column_names());
        if !missing.is_empty() {
            return Err(Diagnostic::new(
                DiagnosticCode::SchemaError,
                format!("missing required column(s): {}", missing.join(", ")),
            ));
        }

        parser.rows().collect()
    }

    /// The store only exposes persisted e-mails, so a globally unique field
    /// other than `email` cannot be checked and fails the run.
    fn fetch_index(&self) -> Result<ExistingRecordIndex, String> {
        let Some(field) = self
            .schema
            .fields()
            .iter()
            .find(|f| f.uniqueness == UniquenessScope::Global)
        else {
            return Ok(ExistingRecordIndex::default());
        };
        if field.name != INDEXED_FIELD {
            return Err(format!(
                "no existing-record lookup for field '{}', only '{}' is indexed",
                field.name, INDEXED_FIELD
            ));
        }
        let keys = self.store.existing_emails().map_err(|e| e.to_string())?;
        Ok(ExistingRecordIndex::from_keys(INDEXED_FIELD, keys))
    }
}

fn abandon_if_cancelled<F: FnMut(ImportState)>(
    run: &mut ImportRun<F>,
    cancel: &CancelToken,
) -> Result<Option<ImportOutcome>, TransitionError> {
    if !cancel.is_cancelled() {
        return Ok(None);
    }
    let at = run.state();
    info!("Import run abandoned at {:?}", at);
    run.advance(ImportState::Abandoned)?;
    Ok(Some(ImportOutcome::Abandoned { at }))
}
