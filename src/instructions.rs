//! Watermark instruction parsing
//!
//! Instructions arrive as comma-separated text with a header row:
//!
//! ```text
//! page,watermark_text
//! 1,CONFIDENTIAL
//! 3,DRAFT
//! ```
//!
//! The header must have at least two columns but its names are not checked.
//! Every data row maps a 1-indexed page number to the text stamped on that
//! page. Columns past the second are ignored and fields are trimmed.

use std::collections::btree_map::{self, BTreeMap, Entry};
use std::io::Read;
use std::str::FromStr;

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::debug;

use crate::error::{Error, Result};

/// Validated mapping of page number to watermark text
///
/// Keys are unique and at least 1; values are trimmed and non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstructionSet {
    pages: BTreeMap<usize, String>,
}

impl InstructionSet {
    /// Create an empty instruction set
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `text` for `page`, refusing to overwrite an existing entry
    ///
    /// Returns `false` when the page is already present.
    pub(crate) fn insert(&mut self, page: usize, text: impl Into<String>) -> bool {
        match self.pages.entry(page) {
            Entry::Vacant(slot) => {
                slot.insert(text.into());
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Watermark text for a page, if one was requested
    pub fn get(&self, page: usize) -> Option<&str> {
        self.pages.get(&page).map(String::as_str)
    }

    /// Number of stamped pages
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Iterate `(page, text)` pairs in ascending page order
    pub fn iter(&self) -> Iter<'_> {
        Iter { inner: self.pages.iter() }
    }
}

/// Iterator over the entries of an [`InstructionSet`]
pub struct Iter<'a> {
    inner: btree_map::Iter<'a, usize, String>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (usize, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(page, text)| (*page, text.as_str()))
    }
}

impl<'a> IntoIterator for &'a InstructionSet {
    type Item = (usize, &'a str);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromStr for InstructionSet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_instructions(s.as_bytes())
    }
}

/// Parse watermark instructions from comma-separated text
///
/// Rows are checked in order and the first failing row aborts the parse:
/// too few columns, a non-integer page, a page below 1, empty text, and
/// finally a page that was already listed.
pub fn parse_instructions<R: Read>(reader: R) -> Result<InstructionSet> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut records = csv_reader.records();

    let header = match records.next() {
        None => return Err(Error::EmptyInput),
        Some(result) => result.map_err(|e| csv_error(e, 1, "reading header"))?,
    };
    if header.len() < 2 {
        return Err(Error::MalformedRow {
            line: record_line(&header, 1),
            reason: format!("header must have at least 2 columns, got {}", header.len()),
        });
    }

    let mut instructions = InstructionSet::new();

    for (index, result) in records.enumerate() {
        let fallback_line = index as u64 + 2;
        let record = result.map_err(|e| csv_error(e, fallback_line, "reading row"))?;
        let line = record_line(&record, fallback_line);

        let (page, text) = parse_row(&record, line)?;

        if !instructions.insert(page, text) {
            return Err(Error::DuplicatePage { line, page });
        }
    }

    debug!(pages = instructions.len(), "parsed watermark instructions");
    Ok(instructions)
}

/// Validate a single data row, returning its page number and text
fn parse_row(record: &StringRecord, line: u64) -> Result<(usize, &str)> {
    if record.len() < 2 {
        return Err(Error::MalformedRow {
            line,
            reason: format!("expected at least 2 fields, got {}", record.len()),
        });
    }

    let page_field = record[0].trim();
    let page: i64 = page_field.parse().map_err(|_| Error::MalformedRow {
        line,
        reason: format!("invalid page number {:?}", page_field),
    })?;

    if page < 1 {
        return Err(Error::InvalidPageNumber { line, page });
    }

    let page = usize::try_from(page).map_err(|_| Error::MalformedRow {
        line,
        reason: format!("page number {} is too large", page),
    })?;

    let text = record[1].trim();
    if text.is_empty() {
        return Err(Error::MalformedRow {
            line,
            reason: "watermark text is empty".to_string(),
        });
    }

    Ok((page, text))
}

/// Line number the CSV reader recorded for a row
fn record_line(record: &StringRecord, fallback: u64) -> u64 {
    record.position().map(|pos| pos.line()).unwrap_or(fallback)
}

fn csv_error(err: csv::Error, fallback_line: u64, context: &str) -> Error {
    let line = err.position().map(|pos| pos.line()).unwrap_or(fallback_line);
    Error::MalformedRow {
        line,
        reason: format!("{}: {}", context, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn parse(lines: &[&str]) -> Result<InstructionSet> {
        parse_instructions(lines.join("\n").as_bytes())
    }

    #[test]
    fn test_parse_valid_rows() {
        let set = parse(&[
            "page,watermark_text",
            "1,CONFIDENTIAL",
            "3,DRAFT",
            "5,INTERNAL USE ONLY",
        ])
        .unwrap();

        assert_eq!(set.len(), 3);
        assert_eq!(set.get(1), Some("CONFIDENTIAL"));
        assert_eq!(set.get(3), Some("DRAFT"));
        assert_eq!(set.get(5), Some("INTERNAL USE ONLY"));
        assert_eq!(set.get(2), None);
    }

    #[test]
    fn test_header_only_is_empty_set() {
        let set = parse(&["page,watermark_text"]).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_empty_input() {
        let err = parse_instructions("".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::EmptyInput));
    }

    #[test]
    fn test_header_with_one_column() {
        let err = parse(&["page"]).unwrap_err();
        assert!(matches!(err, Error::MalformedRow { line: 1, .. }));
    }

    #[test]
    fn test_header_names_are_not_checked() {
        let set = parse(&["foo,bar", "2,X"]).unwrap();
        assert_eq!(set.get(2), Some("X"));
    }

    #[test]
    fn test_duplicate_page_rejected() {
        let err = parse(&["page,watermark_text", "1,CONFIDENTIAL", "1,DRAFT"]).unwrap_err();
        assert!(matches!(err, Error::DuplicatePage { line: 3, page: 1 }));

        let err = parse(&["page,watermark_text", "4,SAME", "4,SAME"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicatePage);
    }

    #[test]
    fn test_non_integer_page() {
        let err = parse(&["page,watermark_text", "abc,CONFIDENTIAL"]).unwrap_err();
        match err {
            Error::MalformedRow { line, reason } => {
                assert_eq!(line, 2);
                assert!(reason.contains("abc"));
            }
            other => panic!("expected MalformedRow, got {:?}", other),
        }

        let err = parse(&["page,watermark_text", "1.5,X"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedRow);
    }

    #[test]
    fn test_zero_and_negative_pages() {
        let err = parse(&["page,watermark_text", "0,CONFIDENTIAL"]).unwrap_err();
        assert!(matches!(err, Error::InvalidPageNumber { line: 2, page: 0 }));

        let err = parse(&["page,watermark_text", "-1,CONFIDENTIAL"]).unwrap_err();
        assert!(matches!(err, Error::InvalidPageNumber { page: -1, .. }));
    }

    #[test]
    fn test_missing_text_column() {
        let err = parse(&["page,watermark_text", "1"]).unwrap_err();
        assert!(matches!(err, Error::MalformedRow { line: 2, .. }));
    }

    #[test]
    fn test_empty_watermark_text() {
        let err = parse(&["page,watermark_text", "1,"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedRow);

        let err = parse(&["page,watermark_text", "1,   "]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedRow);
    }

    #[test]
    fn test_row_checks_run_in_order() {
        // Invalid page wins over empty text on the same row
        let err = parse(&["page,watermark_text", "0,"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPageNumber);

        // Empty text wins over the duplicate check
        let err = parse(&["page,watermark_text", "1,A", "1,"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedRow);
    }

    #[test]
    fn test_extra_columns_ignored() {
        let set = parse(&["page,watermark_text,extra", "1,CONFIDENTIAL,ignored"]).unwrap();
        assert_eq!(set.get(1), Some("CONFIDENTIAL"));
    }

    #[test]
    fn test_whitespace_trimmed() {
        let set = parse(&["page, watermark_text", " 2 , DRAFT "]).unwrap();
        assert_eq!(set.get(2), Some("DRAFT"));
    }

    #[test]
    fn test_quoted_text_with_comma() {
        let set = parse(&["page,watermark_text", "7,\"DRAFT, DO NOT SHIP\""]).unwrap();
        assert_eq!(set.get(7), Some("DRAFT, DO NOT SHIP"));
    }

    #[test]
    fn test_from_str_and_iteration_order() {
        let set: InstructionSet = "page,text\n9,C\n2,A\n5,B".parse().unwrap();
        let pages: Vec<usize> = set.iter().map(|(page, _)| page).collect();
        assert_eq!(pages, vec![2, 5, 9]);
    }

    #[test]
    fn test_insert_does_not_overwrite() {
        let mut set = InstructionSet::new();
        assert!(set.insert(1, "FIRST"));
        assert!(!set.insert(1, "SECOND"));
        assert_eq!(set.get(1), Some("FIRST"));
    }
}
