use serde::{Deserialize, Serialize};

/// Stable codes for everything the import pipeline can report.
///
/// `ParseError` and `SchemaError` end a run before any row is looked at.
/// `MissingField`, `InvalidFormat` and `AlreadyExists` reject a single row.
/// `DuplicateInFile` and `EmptyOptionalField` are warnings: the row is still imported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    ParseError,
    SchemaError,
    MissingField,
    InvalidFormat,
    AlreadyExists,
    DuplicateInFile,
    EmptyOptionalField,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    /// The whole run is aborted.
    Fatal,
    /// The row is excluded from the commit set.
    Error,
    /// Reported only.
    Warning,
}

impl DiagnosticCode {
    pub fn severity(&self) -> Severity {
        match self {
            DiagnosticCode::ParseError | DiagnosticCode::SchemaError => Severity::Fatal,
            DiagnosticCode::MissingField
            | DiagnosticCode::InvalidFormat
            | DiagnosticCode::AlreadyExists => Severity::Error,
            DiagnosticCode::DuplicateInFile | DiagnosticCode::EmptyOptionalField => {
                Severity::Warning
            }
        }
    }

    pub fn is_warning(&self) -> bool {
        self.severity() == Severity::Warning
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::ParseError => "PARSE_ERROR",
            DiagnosticCode::SchemaError => "SCHEMA_ERROR",
            DiagnosticCode::MissingField => "MISSING_FIELD",
            DiagnosticCode::InvalidFormat => "INVALID_FORMAT",
            DiagnosticCode::AlreadyExists => "ALREADY_EXISTS",
            DiagnosticCode::DuplicateInFile => "DUPLICATE_IN_FILE",
            DiagnosticCode::EmptyOptionalField => "EMPTY_OPTIONAL_FIELD",
        }
    }
}

/// A structured error or warning produced while importing a file.
///
/// Diagnostics are never mutated once built. Attaching a source line
/// (see [`Diagnostic::at_line`]) yields a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    code: DiagnosticCode,
    message: String,
    field: Option<String>,
    line: Option<usize>,
}

impl Diagnostic {
    pub fn new(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
            line: None,
        }
    }

    pub fn for_field(
        code: DiagnosticCode,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            field: Some(field.into()),
            line: None,
        }
    }

    /// Returns a copy tied to `line` whose message starts with `Row {line}: `.
    pub fn at_line(&self, line: usize) -> Self {
        Self {
            code: self.code,
            message: format!("Row {}: {}", line, self.message),
            field: self.field.clone(),
            line: Some(line),
        }
    }

    pub fn code(&self) -> DiagnosticCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub fn line(&self) -> Option<usize> {
        self.line
    }
}
