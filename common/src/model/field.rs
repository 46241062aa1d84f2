use serde::{Deserialize, Serialize};

/// The shape a column's values must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    Text,
    Email,
}

/// How far a field's values must be unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UniquenessScope {
    /// Repeated values are fine.
    None,
    /// Repeats inside one uploaded file are reported.
    IntraFile,
    /// Repeats inside the file are reported, and values already persisted are rejected.
    Global,
}

/// Declaration of one column of an importable record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    pub required: bool,
    pub kind: FieldKind,
    pub uniqueness: UniquenessScope,
}

impl FieldSchema {
    pub fn required(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            required: true,
            kind,
            uniqueness: UniquenessScope::None,
        }
    }

    pub fn optional(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            required: false,
            kind,
            uniqueness: UniquenessScope::None,
        }
    }

    pub fn with_uniqueness(mut self, uniqueness: UniquenessScope) -> Self {
        self.uniqueness = uniqueness;
        self
    }
}
