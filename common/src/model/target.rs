use serde::{Deserialize, Serialize};

/// A target that passed validation, with values normalized
/// (trimmed, e-mail lower-cased, empty department replaced by the default).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRecord {
    pub name: String,
    pub email: String,
    pub department: String,
}

/// A target as it lives in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTarget {
    pub id: String, // UUID
    #[serde(flatten)]
    pub record: TargetRecord,
    pub created_at: String,
}
