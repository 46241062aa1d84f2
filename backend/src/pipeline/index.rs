use std::collections::HashSet;

/// Snapshot of one uniqueness-constrained field's persisted values.
///
/// Taken once when a run starts and never refreshed, so a row inserted by
/// someone else while the run is validating will not be seen here. The
/// store's own unique constraint remains the final word.
#[derive(Debug, Clone, Default)]
pub struct ExistingRecordIndex {
    field: String,
    keys: HashSet<String>,
}

impl ExistingRecordIndex {
    /// Builds the index over `field`. Keys are trimmed and lower-cased;
    /// blank keys are dropped.
    pub fn from_keys<I, S>(field: impl Into<String>, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keys = keys
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self {
            field: field.into(),
            keys,
        }
    }

    /// The field the keys were taken from.
    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(&key.trim().to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
