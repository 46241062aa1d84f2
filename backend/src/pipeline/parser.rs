//! Turns uploaded bytes into header-keyed rows.
//!
//! The dialect is fixed: one configurable single-byte delimiter, `"` quoting
//! with `""` as the escape, header names on line 1. Anything structurally
//! off fails the run; there is no partial row set.

use common::model::diagnostic::{Diagnostic, DiagnosticCode};
use std::fmt;

/// One parsed, not yet validated record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    line: usize,
    cells: Vec<(String, String)>,
}

impl RawRow {
    pub fn new(line: usize, cells: Vec<(String, String)>) -> Self {
        Self { line, cells }
    }

    /// 1-based line the record starts on; the header is line 1.
    pub fn source_line(&self) -> usize {
        self.line
    }

    /// Value under a normalized header. With repeated headers the first
    /// column wins.
    pub fn get(&self, header: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v.as_str())
    }

    pub fn cells(&self) -> &[(String, String)] {
        &self.cells
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    pub delimiter: u8,
    /// Inputs above this many bytes are refused.
    pub max_bytes: Option<u64>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            max_bytes: None,
        }
    }
}

pub fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}').trim().to_lowercase()
}

pub fn normalize_value(raw: &str) -> String {
    raw.replace('\u{00A0}', " ").trim().to_string()
}

/// A structurally checked file whose rows can be read any number of times.
pub struct RowParser<'a> {
    bytes: &'a [u8],
    options: ParseOptions,
    headers: Vec<String>,
}

impl<'a> RowParser<'a> {
    /// Checks size and quoting, then reads the header line.
    pub fn open(bytes: &'a [u8], options: ParseOptions) -> Result<Self, Diagnostic> {
        if let Some(max) = options.max_bytes {
            if bytes.len() as u64 > max {
                return Err(parse_error(format!(
                    "file is {} bytes, the limit is {} bytes",
                    bytes.len(),
                    max
                )));
            }
        }

        if let Some(fault) = find_quoting_fault(bytes, options.delimiter) {
            return Err(parse_error(fault.to_string()));
        }

        let mut reader = build_reader(bytes, &options);
        let headers = reader
            .headers()
            .map_err(|e| parse_error(format!("unreadable header line: {}", e)))?
            .iter()
            .map(normalize_header)
            .collect();

        Ok(Self {
            bytes,
            options,
            headers,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// The subset of `expected` (already normalized) absent from the header line.
    pub fn missing_headers(&self, expected: &[&str]) -> Vec<String> {
        expected
            .iter()
            .filter(|name| !self.headers.iter().any(|h| h == *name))
            .map(|name| name.to_string())
            .collect()
    }

    /// A fresh pass over the data rows. Empty and whitespace-only lines are
    /// skipped.
    pub fn rows(&self) -> RawRows<'a> {
        RawRows {
            bytes: self.bytes,
            headers: self.headers.clone(),
            records: build_reader(self.bytes, &self.options).into_records(),
        }
    }
}

pub struct RawRows<'a> {
    bytes: &'a [u8],
    headers: Vec<String>,
    records: csv::StringRecordsIntoIter<&'a [u8]>,
}

impl RawRows<'_> {
    fn line_of(&self, position: Option<&csv::Position>) -> Option<usize> {
        position.map(|p| first_content_line(self.bytes, p.byte() as usize, p.line() as usize))
    }
}

impl Iterator for RawRows<'_> {
    type Item = Result<RawRow, Diagnostic>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.records.next()? {
                Ok(record) => record,
                Err(e) => {
                    let diagnostic = parse_error(format!("malformed record: {}", e));
                    return Some(Err(match self.line_of(e.position()) {
                        Some(line) => diagnostic.at_line(line),
                        None => diagnostic,
                    }));
                }
            };
            if record.iter().all(|v| normalize_value(v).is_empty()) {
                continue;
            }

            let line = self.line_of(record.position()).unwrap_or(0);
            if record.len() != self.headers.len() {
                return Some(Err(parse_error(format!(
                    "expected {} fields, found {}",
                    self.headers.len(),
                    record.len()
                ))
                .at_line(line)));
            }

            let cells = self
                .headers
                .iter()
                .zip(record.iter())
                .map(|(h, v)| (h.clone(), normalize_value(v)))
                .collect();
            return Some(Ok(RawRow::new(line, cells)));
        }
    }
}

/// Field counts are checked per record so that whitespace-only lines can be
/// skipped instead of failing as ragged.
fn build_reader<'a>(bytes: &'a [u8], options: &ParseOptions) -> csv::Reader<&'a [u8]> {
    csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .quote(b'"')
        .double_quote(true)
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes)
}

/// The reader reports a record at the end of the previous one, before any
/// blank lines it skipped. Walk past those to the line the record really
/// starts on.
fn first_content_line(bytes: &[u8], offset: usize, line: usize) -> usize {
    let skipped = bytes
        .get(offset..)
        .unwrap_or_default()
        .iter()
        .take_while(|b| matches!(b, b'\r' | b'\n'))
        .filter(|&&b| b == b'\n')
        .count();
    line + skipped
}

fn parse_error(message: String) -> Diagnostic {
    Diagnostic::new(DiagnosticCode::ParseError, message)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteFault {
    Unterminated(usize),
    StrayQuote(usize),
    TextAfterClosingQuote(usize),
}

impl fmt::Display for QuoteFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuoteFault::Unterminated(line) => {
                write!(f, "unterminated quoted field starting on line {}", line)
            }
            QuoteFault::StrayQuote(line) => {
                write!(f, "quote inside an unquoted field on line {}", line)
            }
            QuoteFault::TextAfterClosingQuote(line) => {
                write!(f, "unexpected text after a closing quote on line {}", line)
            }
        }
    }
}

#[derive(Clone, Copy)]
enum ScanState {
    FieldStart,
    Unquoted,
    Quoted { opened_on: usize },
    /// A quote seen inside a quoted field: either a `""` escape or the close.
    QuoteInQuoted { opened_on: usize },
}

/// Checks quoting strictly. A quote may only open a field, `""` is the
/// escape inside a quoted field, and a closing quote must be followed by the
/// delimiter, a line break or the end of input.
fn find_quoting_fault(bytes: &[u8], delimiter: u8) -> Option<QuoteFault> {
    let mut line = 1;
    let mut state = ScanState::FieldStart;

    for &b in bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes) {
        state = match (state, b) {
            (ScanState::Quoted { opened_on }, b'"') => ScanState::QuoteInQuoted { opened_on },
            (ScanState::QuoteInQuoted { opened_on }, b'"') => ScanState::Quoted { opened_on },
            (ScanState::Quoted { opened_on }, _) => ScanState::Quoted { opened_on },
            (ScanState::FieldStart, b'"') => ScanState::Quoted { opened_on: line },
            (ScanState::Unquoted, b'"') => return Some(QuoteFault::StrayQuote(line)),
            (_, b'\r') => ScanState::FieldStart,
            (_, b'\n') => ScanState::FieldStart,
            (_, b) if b == delimiter => ScanState::FieldStart,
            (ScanState::QuoteInQuoted { .. }, _) => {
                return Some(QuoteFault::TextAfterClosingQuote(line));
            }
            (ScanState::FieldStart | ScanState::Unquoted, _) => ScanState::Unquoted,
        };
        if b == b'\n' {
            line += 1;
        }
    }

    match state {
        ScanState::Quoted { opened_on } => Some(QuoteFault::Unterminated(opened_on)),
        _ => None,
    }
}
