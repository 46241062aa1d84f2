//! Per-row verdicts.
//!
//! Diagnostics inside one verdict always come in this order:
//! missing required fields, malformed values, repeats inside the file,
//! values already persisted, empty optional fields.

use crate::pipeline::index::ExistingRecordIndex;
use crate::pipeline::parser::RawRow;
use crate::pipeline::schema::SchemaRegistry;
use common::model::diagnostic::{Diagnostic, DiagnosticCode};
use common::model::field::{FieldSchema, UniquenessScope};
use common::model::target::TargetRecord;
use rayon::prelude::*;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowVerdict {
    row: RawRow,
    errors: Vec<Diagnostic>,
    warnings: Vec<Diagnostic>,
    normalized: Option<TargetRecord>,
}

impl RowVerdict {
    pub fn row(&self) -> &RawRow {
        &self.row
    }

    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }

    /// Present exactly when `errors` is empty.
    pub fn normalized_record(&self) -> Option<&TargetRecord> {
        self.normalized.as_ref()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Lines each (field, lower-cased value) pair occurs on.
struct Occurrences<'r> {
    lines: HashMap<(&'r str, String), Vec<usize>>,
}

impl<'r> Occurrences<'r> {
    fn build(fields: &'r [FieldSchema], rows: &[RawRow]) -> Self {
        let mut lines: HashMap<(&str, String), Vec<usize>> = HashMap::new();
        for field in fields.iter().filter(|f| f.uniqueness != UniquenessScope::None) {
            for row in rows {
                if let Some(key) = unique_key(row, field) {
                    lines
                        .entry((field.name.as_str(), key))
                        .or_default()
                        .push(row.source_line());
                }
            }
        }
        Self { lines }
    }

    fn others(&self, field: &str, key: &str, own_line: usize) -> Vec<usize> {
        self.lines
            .get(&(field, key.to_string()))
            .map(|lines| lines.iter().copied().filter(|&l| l != own_line).collect())
            .unwrap_or_default()
    }
}

fn unique_key(row: &RawRow, field: &FieldSchema) -> Option<String> {
    row.get(&field.name)
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}

pub struct RowValidator<'a> {
    schema: &'a SchemaRegistry,
    index: &'a ExistingRecordIndex,
}

impl<'a> RowValidator<'a> {
    pub fn new(schema: &'a SchemaRegistry, index: &'a ExistingRecordIndex) -> Self {
        Self { schema, index }
    }

    /// One verdict per row, in input order.
    pub fn validate_all(&self, rows: &[RawRow]) -> Vec<RowVerdict> {
        let occurrences = Occurrences::build(self.schema.fields(), rows);
        rows.par_iter()
            .map(|row| self.validate_row(row, &occurrences))
            .collect()
    }

    fn validate_row(&self, row: &RawRow, occurrences: &Occurrences<'_>) -> RowVerdict {
        let fields = self.schema.fields();
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        for field in fields.iter().filter(|f| f.required) {
            if let Some(d) = self.schema.check_presence(field, row.get(&field.name)) {
                errors.push(d);
            }
        }

        for field in fields {
            if let Some(d) = row
                .get(&field.name)
                .and_then(|v| self.schema.check_format(field, v))
            {
                errors.push(d);
            }
        }

        for field in fields.iter().filter(|f| f.uniqueness != UniquenessScope::None) {
            let Some(key) = unique_key(row, field) else {
                continue;
            };
            let others = occurrences.others(&field.name, &key, row.source_line());
            if !others.is_empty() {
                warnings.push(duplicate_in_file(field, &key, &others));
            }
        }

        for field in fields
            .iter()
            .filter(|f| f.uniqueness == UniquenessScope::Global && f.name == self.index.field())
        {
            let Some(key) = unique_key(row, field) else {
                continue;
            };
            if self.index.contains(&key) {
                errors.push(Diagnostic::for_field(
                    DiagnosticCode::AlreadyExists,
                    &field.name,
                    format!("{} '{}' already exists", field.name, key),
                ));
            }
        }

        for field in fields.iter().filter(|f| !f.required) {
            if let Some(d) = self.schema.check_presence(field, row.get(&field.name)) {
                warnings.push(d);
            }
        }

        let normalized = errors.is_empty().then(|| self.normalize(row));
        RowVerdict {
            row: row.clone(),
            errors,
            warnings,
            normalized,
        }
    }

    fn normalize(&self, row: &RawRow) -> TargetRecord {
        let value = |name: &str| match self.schema.field(name) {
            Some(field) => self.schema.normalize(field, row.get(name)),
            None => String::new(),
        };
        TargetRecord {
            name: value("name"),
            email: value("email"),
            department: value("department"),
        }
    }
}

fn duplicate_in_file(field: &FieldSchema, key: &str, others: &[usize]) -> Diagnostic {
    let lines = others
        .iter()
        .map(|l| l.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let noun = if others.len() == 1 { "line" } else { "lines" };
    Diagnostic::for_field(
        DiagnosticCode::DuplicateInFile,
        &field.name,
        format!("{} '{}' also appears on {} {}", field.name, key, noun, lines),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::schema::DEFAULT_DEPARTMENT;

    fn row(line: usize, name: &str, email: &str, department: &str) -> RawRow {
        RawRow::new(
            line,
            vec![
                ("name".to_string(), name.to_string()),
                ("email".to_string(), email.to_string()),
                ("department".to_string(), department.to_string()),
            ],
        )
    }

    fn validate(rows: &[RawRow], existing: &[&str]) -> Vec<RowVerdict> {
        let schema = SchemaRegistry::targets(DEFAULT_DEPARTMENT).unwrap();
        let index = ExistingRecordIndex::from_keys("email", existing.iter().copied());
        RowValidator::new(&schema, &index).validate_all(rows)
    }

    fn codes(diagnostics: &[Diagnostic]) -> Vec<DiagnosticCode> {
        diagnostics.iter().map(|d| d.code()).collect()
    }

    #[test]
    fn clean_row_is_normalized() {
        let verdicts = validate(&[row(2, " John Doe ", " JOHN@x.com ", " Eng ")], &[]);
        let verdict = &verdicts[0];

        assert!(verdict.is_valid());
        assert!(verdict.warnings().is_empty());
        assert_eq!(
            verdict.normalized_record(),
            Some(&TargetRecord {
                name: "John Doe".to_string(),
                email: "john@x.com".to_string(),
                department: "Eng".to_string(),
            })
        );
    }

    #[test]
    fn missing_name_rejects_row() {
        let verdicts = validate(&[row(2, "", "bad@x.com", "Eng")], &[]);
        assert_eq!(codes(verdicts[0].errors()), vec![DiagnosticCode::MissingField]);
        assert_eq!(verdicts[0].errors()[0].field(), Some("name"));
        assert!(verdicts[0].normalized_record().is_none());
    }

    #[test]
    fn invalid_email_yields_exactly_one_format_error() {
        let verdicts = validate(&[row(2, "A", "not-an-email", "Eng")], &[]);
        assert_eq!(codes(verdicts[0].errors()), vec![DiagnosticCode::InvalidFormat]);
        assert!(verdicts[0].normalized_record().is_none());
    }

    #[test]
    fn existing_email_is_rejected_case_insensitively() {
        let verdicts = validate(&[row(2, "John", "John@X.com", "Eng")], &["john@x.com"]);
        assert_eq!(codes(verdicts[0].errors()), vec![DiagnosticCode::AlreadyExists]);
        assert!(verdicts[0].normalized_record().is_none());
    }

    #[test]
    fn duplicates_in_file_warn_both_rows_and_keep_them() {
        let verdicts = validate(
            &[row(2, "A", "same@x.com", "Eng"), row(3, "B", "SAME@x.com", "Ops")],
            &[],
        );

        for (verdict, other) in verdicts.iter().zip([3, 2]) {
            assert!(verdict.is_valid());
            assert_eq!(codes(verdict.warnings()), vec![DiagnosticCode::DuplicateInFile]);
            assert!(verdict.warnings()[0]
                .message()
                .ends_with(&format!("line {}", other)));
        }
    }

    #[test]
    fn three_way_duplicate_gives_one_warning_per_row() {
        let verdicts = validate(
            &[
                row(2, "A", "d@x.com", "Eng"),
                row(3, "B", "d@x.com", "Eng"),
                row(4, "C", "d@x.com", "Eng"),
            ],
            &[],
        );
        assert_eq!(verdicts[0].warnings().len(), 1);
        assert!(verdicts[0].warnings()[0].message().ends_with("lines 3, 4"));
        assert!(verdicts[2].warnings()[0].message().ends_with("lines 2, 3"));
    }

    #[test]
    fn diagnostics_follow_fixed_order() {
        // Duplicate inside the file, already persisted, and no department.
        let verdicts = validate(
            &[row(2, "", "dup@x.com", ""), row(3, "B", "dup@x.com", "Eng")],
            &["dup@x.com"],
        );
        let first = &verdicts[0];

        assert_eq!(
            codes(first.errors()),
            vec![DiagnosticCode::MissingField, DiagnosticCode::AlreadyExists]
        );
        assert_eq!(
            codes(first.warnings()),
            vec![
                DiagnosticCode::DuplicateInFile,
                DiagnosticCode::EmptyOptionalField
            ]
        );
    }

    #[test]
    fn missing_and_malformed_are_both_reported_in_order() {
        let verdicts = validate(&[row(2, "", "nope", "Eng")], &[]);
        assert_eq!(
            codes(verdicts[0].errors()),
            vec![DiagnosticCode::MissingField, DiagnosticCode::InvalidFormat]
        );
    }

    #[test]
    fn empty_department_warns_and_defaults() {
        let verdicts = validate(&[row(2, "Jane Roe", "jane@x.com", "")], &[]);
        let verdict = &verdicts[0];

        assert_eq!(codes(verdict.warnings()), vec![DiagnosticCode::EmptyOptionalField]);
        assert_eq!(verdict.normalized_record().unwrap().department, "Unassigned");
    }

    #[test]
    fn verdicts_keep_input_order() {
        let rows: Vec<RawRow> = (0..500)
            .map(|i| row(i + 2, "N", &format!("u{}@x.com", i), "Eng"))
            .collect();
        let verdicts = validate(&rows, &[]);
        let lines: Vec<usize> = verdicts.iter().map(|v| v.row().source_line()).collect();
        assert_eq!(lines, (2..502).collect::<Vec<_>>());
    }
}
