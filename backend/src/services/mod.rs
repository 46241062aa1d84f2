pub mod targets;

use crate::config::Settings;
use crate::pipeline::orchestrator::ImportOrchestrator;
use crate::pipeline::parser::ParseOptions;
use crate::pipeline::schema::SchemaRegistry;
use crate::store::SqliteTargetStore;
use std::sync::Arc;

/// Everything the HTTP handlers share besides job bookkeeping.
pub struct ImportContext {
    pub orchestrator: ImportOrchestrator<SqliteTargetStore>,
    pub max_file_size_bytes: u64,
    pub delimiter: u8,
}

impl ImportContext {
    pub fn from_settings(settings: &Settings) -> Result<Self, Box<dyn std::error::Error>> {
        let delimiter = settings.import.delimiter_byte()?;
        let schema = SchemaRegistry::targets(&settings.import.default_department)?;
        let store = SqliteTargetStore::open(&settings.storage.database_path)?;
        let options = ParseOptions {
            delimiter,
            max_bytes: Some(settings.import.max_file_size_bytes),
        };

        Ok(Self {
            orchestrator: ImportOrchestrator::new(Arc::new(schema), store, options),
            max_file_size_bytes: settings.import.max_file_size_bytes,
            delimiter,
        })
    }

    pub fn store(&self) -> &SqliteTargetStore {
        self.orchestrator.store()
    }
}
