use crate::pipeline::validator::RowVerdict;
use common::model::import::ImportResult;

/// Folds verdicts into one result. Every diagnostic is re-issued with its
/// row's source line; records of valid rows are kept in file order.
///
/// Pure: the same verdicts always give an identical result.
pub fn aggregate(verdicts: &[RowVerdict]) -> ImportResult {
    verdicts
        .iter()
        .fold(ImportResult::default(), |mut result, verdict| {
            let line = verdict.row().source_line();
            result
                .errors
                .extend(verdict.errors().iter().map(|d| d.at_line(line)));
            result
                .warnings
                .extend(verdict.warnings().iter().map(|d| d.at_line(line)));

            let summary = &mut result.summary;
            summary.total_rows += 1;
            match verdict.normalized_record() {
                Some(record) => {
                    summary.valid_rows += 1;
                    if !verdict.warnings().is_empty() {
                        summary.warned_rows += 1;
                    }
                    result.valid.push(record.clone());
                }
                None => summary.rejected_rows += 1,
            }
            result
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::index::ExistingRecordIndex;
    use crate::pipeline::parser::{ParseOptions, RawRow, RowParser};
    use crate::pipeline::schema::{SchemaRegistry, DEFAULT_DEPARTMENT};
    use crate::pipeline::validator::RowValidator;
    use common::model::diagnostic::DiagnosticCode;

    fn verdicts(csv: &str, existing: &[&str]) -> Vec<RowVerdict> {
        let schema = SchemaRegistry::targets(DEFAULT_DEPARTMENT).unwrap();
        let index = ExistingRecordIndex::from_keys("email", existing.iter().copied());
        let parser = RowParser::open(csv.as_bytes(), ParseOptions::default()).unwrap();
        let rows: Vec<RawRow> = parser.rows().collect::<Result<_, _>>().unwrap();
        RowValidator::new(&schema, &index).validate_all(&rows)
    }

    const MIXED: &str = "name,email,department\n\
        John Doe,JOHN@x.com,Eng\n\
        Jane Roe,jane@x.com,\n\
        ,bad@x.com,Eng\n\
        Old Timer,old@x.com,Ops\n\
        Broken,broken,Ops\n";

    #[test]
    fn every_row_is_either_valid_or_rejected() {
        let result = aggregate(&verdicts(MIXED, &["old@x.com"]));

        assert_eq!(result.summary.total_rows, 5);
        assert_eq!(result.valid.len(), 2);
        assert_eq!(result.summary.rejected_rows, 3);
        assert_eq!(
            result.valid.len() + result.summary.rejected_rows,
            result.summary.total_rows
        );
        assert_eq!(result.summary.warned_rows, 1);
    }

    #[test]
    fn diagnostics_are_prefixed_with_their_row() {
        let result = aggregate(&verdicts(MIXED, &["old@x.com"]));

        let messages: Vec<&str> = result.errors.iter().map(|d| d.message()).collect();
        assert_eq!(messages.len(), 3);
        assert!(messages[0].starts_with("Row 4: "));
        assert!(messages[1].starts_with("Row 5: "));
        assert!(messages[2].starts_with("Row 6: "));
        assert_eq!(result.errors[1].code(), DiagnosticCode::AlreadyExists);

        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].line(), Some(3));
        assert_eq!(result.warnings[0].code(), DiagnosticCode::EmptyOptionalField);
    }

    #[test]
    fn aggregating_twice_is_identical() {
        let verdicts = verdicts(MIXED, &["old@x.com"]);
        assert_eq!(aggregate(&verdicts), aggregate(&verdicts));
    }

    #[test]
    fn no_rows_gives_empty_result() {
        let result = aggregate(&[]);
        assert!(result.valid.is_empty());
        assert_eq!(result.summary.total_rows, 0);
    }
}
