//! Field declarations and per-field rules for importable records.

use common::model::diagnostic::{Diagnostic, DiagnosticCode};
use common::model::field::{FieldKind, FieldSchema, UniquenessScope};
use regex::Regex;
use std::collections::HashSet;
use thiserror::Error;

pub const DEFAULT_DEPARTMENT: &str = "Unassigned";

// local@domain.tld, no whitespace, exactly one '@'.
const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

#[derive(Debug, Error)]
pub enum SchemaDefinitionError {
    #[error("field '{0}' is declared more than once")]
    DuplicateField(String),
    #[error("field name must not be empty")]
    EmptyFieldName,
    #[error("invalid email pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// The rules one record type is validated against.
///
/// Immutable after construction and safe to share between concurrent runs.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    fields: Vec<FieldSchema>,
    email_re: Regex,
    optional_default: String,
}

impl SchemaRegistry {
    /// Builds a registry. Field names are trimmed and lower-cased so they
    /// compare equal to normalized CSV headers, and must be unique.
    pub fn new(
        fields: Vec<FieldSchema>,
        optional_default: impl Into<String>,
    ) -> Result<Self, SchemaDefinitionError> {
        let mut seen = HashSet::new();
        let mut normalized = Vec::with_capacity(fields.len());
        for mut field in fields {
            field.name = field.name.trim().to_lowercase();
            if field.name.is_empty() {
                return Err(SchemaDefinitionError::EmptyFieldName);
            }
            if !seen.insert(field.name.clone()) {
                return Err(SchemaDefinitionError::DuplicateField(field.name));
            }
            normalized.push(field);
        }

        Ok(Self {
            fields: normalized,
            email_re: Regex::new(EMAIL_PATTERN)?,
            optional_default: optional_default.into(),
        })
    }

    /// The target-list schema: `name`, `email` (globally unique), `department`.
    pub fn targets(default_department: &str) -> Result<Self, SchemaDefinitionError> {
        Self::new(
            vec![
                FieldSchema::required("name", FieldKind::Text),
                FieldSchema::required("email", FieldKind::Email)
                    .with_uniqueness(UniquenessScope::Global),
                FieldSchema::optional("department", FieldKind::Text),
            ],
            default_department,
        )
    }

    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn required_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Every declared column, in declaration order. A file must carry all of
    /// them as headers, even the optional ones.
    pub fn column_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn optional_default(&self) -> &str {
        &self.optional_default
    }

    /// Checks a single raw value: presence first, then shape.
    pub fn validate(&self, field_name: &str, raw_value: &str) -> Option<Diagnostic> {
        let field = self.field(field_name)?;
        self.check_presence(field, Some(raw_value))
            .or_else(|| self.check_format(field, raw_value))
    }

    /// `MissingField` for an empty required value, `EmptyOptionalField` for an
    /// empty optional one.
    pub fn check_presence(&self, field: &FieldSchema, raw: Option<&str>) -> Option<Diagnostic> {
        if raw.map(str::trim).is_some_and(|v| !v.is_empty()) {
            return None;
        }
        if field.required {
            Some(Diagnostic::for_field(
                DiagnosticCode::MissingField,
                &field.name,
                format!("{} is required", field.name),
            ))
        } else {
            Some(Diagnostic::for_field(
                DiagnosticCode::EmptyOptionalField,
                &field.name,
                format!("{} is empty, using '{}'", field.name, self.optional_default),
            ))
        }
    }

    /// `InvalidFormat` when a non-empty value does not fit the field's kind.
    pub fn check_format(&self, field: &FieldSchema, raw: &str) -> Option<Diagnostic> {
        let value = raw.trim();
        if value.is_empty() {
            return None;
        }
        match field.kind {
            FieldKind::Text => None,
            FieldKind::Email if self.email_re.is_match(value) => None,
            FieldKind::Email => Some(Diagnostic::for_field(
                DiagnosticCode::InvalidFormat,
                &field.name,
                format!("'{}' is not a valid email address", value),
            )),
        }
    }

    /// The stored form of a value: trimmed, e-mails lower-cased, empty
    /// optional values replaced by the default.
    pub fn normalize(&self, field: &FieldSchema, raw: Option<&str>) -> String {
        let value = raw.map(str::trim).unwrap_or_default();
        if value.is_empty() && !field.required {
            return self.optional_default.clone();
        }
        match field.kind {
            FieldKind::Email => value.to_lowercase(),
            FieldKind::Text => value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> SchemaRegistry {
        SchemaRegistry::targets(DEFAULT_DEPARTMENT).unwrap()
    }

    #[test]
    fn required_fields_in_declaration_order() {
        assert_eq!(schema().required_fields(), vec!["name", "email"]);
        assert_eq!(schema().column_names(), vec!["name", "email", "department"]);
    }

    #[test]
    fn duplicate_field_names_are_rejected() {
        let result = SchemaRegistry::new(
            vec![
                FieldSchema::required("email", FieldKind::Email),
                FieldSchema::optional(" Email ", FieldKind::Text),
            ],
            DEFAULT_DEPARTMENT,
        );
        assert!(matches!(
            result,
            Err(SchemaDefinitionError::DuplicateField(name)) if name == "email"
        ));
    }

    #[test]
    fn empty_required_value_is_missing() {
        let diagnostic = schema().validate("name", "   ").unwrap();
        assert_eq!(diagnostic.code(), DiagnosticCode::MissingField);
        assert_eq!(diagnostic.field(), Some("name"));
    }

    #[test]
    fn email_shapes() {
        let schema = schema();
        for ok in ["john@x.com", "a.b+c@sub.domain.org", "  JOHN@X.COM "] {
            assert!(schema.validate("email", ok).is_none(), "{ok}");
        }
        for bad in ["john", "john@x", "@x.com", "john@@x.com", "jo hn@x.com"] {
            let diagnostic = schema.validate("email", bad).unwrap();
            assert_eq!(diagnostic.code(), DiagnosticCode::InvalidFormat, "{bad}");
        }
    }

    #[test]
    fn empty_optional_value_is_a_warning_and_defaults() {
        let schema = schema();
        let department = schema.field("department").unwrap();

        let diagnostic = schema.validate("department", "").unwrap();
        assert_eq!(diagnostic.code(), DiagnosticCode::EmptyOptionalField);
        assert_eq!(schema.normalize(department, Some("")), "Unassigned");
        assert_eq!(schema.normalize(department, None), "Unassigned");
        assert_eq!(schema.normalize(department, Some(" Eng ")), "Eng");
    }

    #[test]
    fn unknown_field_has_no_rules() {
        assert!(schema().validate("phone", "").is_none());
    }

    #[test]
    fn email_normalizes_to_lower_case() {
        let schema = schema();
        let email = schema.field("email").unwrap();
        assert_eq!(schema.normalize(email, Some(" JOHN@X.com ")), "john@x.com");
    }
}
