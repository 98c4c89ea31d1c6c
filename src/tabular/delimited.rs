// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/iprmark

//! Streaming reader and writer for RFC 4180 delimited text.
//!
//! - single-byte delimiter, `"` as the only quote character
//! - quoted fields may contain delimiters, doubled quotes and line breaks
//! - records end with LF or CRLF; the writer always emits LF
//! - lines that are completely empty are skipped, except in single-column
//!   tables where they hold one empty cell
//!
//! Cell text is kept verbatim. The writer quotes only fields that need it,
//! so a table written by this module reads back to the same cells.

use std::io::{BufRead, Write};

use crate::engine::error::{MarkError, Result};

/// One parsed record.
pub type Record = Vec<String>;

/// Pull-based record reader over any buffered source.
pub struct RecordReader<R> {
    inner: R,
    delimiter: u8,
    buf: Vec<u8>,
    records: u64,
    single_column: bool,
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(inner: R, delimiter: u8) -> Self {
        Self { inner, delimiter, buf: Vec::with_capacity(256), records: 0, single_column: false }
    }

    /// Number of records returned so far.
    pub fn records_read(&self) -> u64 {
        self.records
    }

    /// Next record, or `None` at end of input.
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        loop {
            self.buf.clear();
            if self.inner.read_until(b'\n', &mut self.buf)? == 0 {
                return Ok(None);
            }
            if is_blank_line(&self.buf) {
                if self.single_column {
                    self.records += 1;
                    return Ok(Some(vec![String::new()]));
                }
                continue;
            }
            loop {
                if let Some(record) = parse_record(&self.buf, self.delimiter)? {
                    if self.records == 0 {
                        self.single_column = record.len() == 1;
                    }
                    self.records += 1;
                    return Ok(Some(record));
                }
                // Open quote: the record continues on the next line.
                if self.inner.read_until(b'\n', &mut self.buf)? == 0 {
                    return Err(MarkError::UnsupportedFormat(format!(
                        "unterminated quoted field in record {}",
                        self.records + 1
                    )));
                }
            }
        }
    }
}

fn is_blank_line(line: &[u8]) -> bool {
    matches!(line, b"\n" | b"\r\n" | b"\r" | b"")
}

fn field_to_string(field: Vec<u8>, record: &[u8]) -> Result<String> {
    String::from_utf8(field).map_err(|_| {
        MarkError::UnsupportedFormat(format!(
            "table cell is not valid UTF-8 near {:?}",
            String::from_utf8_lossy(&record[..record.len().min(40)])
        ))
    })
}

/// Parse one record from `line`. Returns `Ok(None)` when a quoted field is
/// still open at the end of the input.
fn parse_record(line: &[u8], delimiter: u8) -> Result<Option<Record>> {
    let mut fields = Vec::new();
    let mut field: Vec<u8> = Vec::new();
    let mut in_quotes = false;
    let mut was_quoted = false;
    let mut i = 0;

    while i < line.len() {
        let b = line[i];
        if in_quotes {
            if b == b'"' {
                if line.get(i + 1) == Some(&b'"') {
                    field.push(b'"');
                    i += 2;
                    continue;
                }
                in_quotes = false;
            } else {
                field.push(b);
            }
            i += 1;
            continue;
        }
        match b {
            b'"' if field.is_empty() && !was_quoted => {
                in_quotes = true;
                was_quoted = true;
            }
            b'\n' => break,
            b'\r' if matches!(line.get(i + 1), None | Some(b'\n')) => break,
            d if d == delimiter => {
                fields.push(field_to_string(std::mem::take(&mut field), line)?);
                was_quoted = false;
            }
            _ => field.push(b),
        }
        i += 1;
    }

    if in_quotes {
        return Ok(None);
    }
    fields.push(field_to_string(field, line)?);
    Ok(Some(fields))
}

fn needs_quotes(field: &str, delimiter: u8) -> bool {
    field.bytes().any(|b| b == delimiter || b == b'"' || b == b'\n' || b == b'\r')
}

/// Write one record followed by `\n`. A record made of one empty field is
/// written as `""` so it does not read back as a blank line.
pub fn write_record<W: Write, S: AsRef<str>>(out: &mut W, fields: &[S], delimiter: u8) -> Result<()> {
    if let [only] = fields {
        if only.as_ref().is_empty() {
            out.write_all(b"\"\"\n")?;
            return Ok(());
        }
    }
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.write_all(&[delimiter])?;
        }
        let field = field.as_ref();
        if needs_quotes(field, delimiter) {
            out.write_all(b"\"")?;
            out.write_all(field.replace('"', "\"\"").as_bytes())?;
            out.write_all(b"\"")?;
        } else {
            out.write_all(field.as_bytes())?;
        }
    }
    out.write_all(b"\n")?;
    Ok(())
}

/// Read a whole table from memory: header plus data records.
pub fn read_table(bytes: &[u8], delimiter: u8) -> Result<Option<(Record, Vec<Record>)>> {
    let mut reader = RecordReader::new(bytes, delimiter);
    let header = match reader.next_record()? {
        Some(h) => h,
        None => return Ok(None),
    };
    let mut rows = Vec::new();
    while let Some(row) = reader.next_record()? {
        check_width(&row, header.len(), reader.records_read())?;
        rows.push(row);
    }
    Ok(Some((header, rows)))
}

/// Reject records whose field count differs from the header.
pub fn check_width(row: &Record, expected: usize, record_no: u64) -> Result<()> {
    if row.len() != expected {
        return Err(MarkError::UnsupportedFormat(format!(
            "record {record_no} has {} fields, header has {expected}",
            row.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_all(text: &str) -> Vec<Record> {
        let mut r = RecordReader::new(text.as_bytes(), b',');
        let mut out = Vec::new();
        while let Some(rec) = r.next_record().unwrap() {
            out.push(rec);
        }
        out
    }

    #[test]
    fn plain_records() {
        let recs = parse_all("a,b,c\n1,2,3\n");
        assert_eq!(recs, vec![vec!["a", "b", "c"], vec!["1", "2", "3"]]);
    }

    #[test]
    fn crlf_and_missing_final_newline() {
        let recs = parse_all("a,b\r\n1,2");
        assert_eq!(recs, vec![vec!["a", "b"], vec!["1", "2"]]);
    }

    #[test]
    fn quoted_fields() {
        let recs = parse_all("name,note\n\"Smith, J\",\"say \"\"hi\"\"\"\n");
        assert_eq!(recs[1], vec!["Smith, J", "say \"hi\""]);
    }

    #[test]
    fn quoted_newline_spans_lines() {
        let recs = parse_all("a,b\n\"line1\nline2\",x\n");
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[1][0], "line1\nline2");
        assert_eq!(recs[1][1], "x");
    }

    #[test]
    fn empty_fields_kept() {
        let recs = parse_all("a,b,c\n,,\n");
        assert_eq!(recs[1], vec!["", "", ""]);
    }

    #[test]
    fn blank_lines_skipped() {
        let recs = parse_all("a,b\n\n1,2\n\r\n3,4\n");
        assert_eq!(recs, vec![vec!["a", "b"], vec!["1", "2"], vec!["3", "4"]]);
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        let mut r = RecordReader::new("a\n\"open\n".as_bytes(), b',');
        r.next_record().unwrap();
        assert!(matches!(r.next_record(), Err(MarkError::UnsupportedFormat(_))));
    }

    #[test]
    fn other_delimiter() {
        let mut r = RecordReader::new("a;b\n1,5;2\n".as_bytes(), b';');
        r.next_record().unwrap();
        assert_eq!(r.next_record().unwrap().unwrap(), vec!["1,5", "2"]);
    }

    #[test]
    fn writer_quotes_only_when_needed() {
        let mut out = Vec::new();
        write_record(&mut out, &["plain", "a,b", "q\"x", "multi\nline"], b',').unwrap();
        assert_eq!(
            String::from_utf8(out.clone()).unwrap(),
            "plain,\"a,b\",\"q\"\"x\",\"multi\nline\"\n"
        );
        let back = parse_all(std::str::from_utf8(&out).unwrap());
        assert_eq!(back[0], vec!["plain", "a,b", "q\"x", "multi\nline"]);
    }

    #[test]
    fn single_column_empty_cells_survive() {
        let recs = parse_all("name\nalpha\n\nbeta\n");
        assert_eq!(recs, vec![vec!["name"], vec!["alpha"], vec![""], vec!["beta"]]);

        let mut out = Vec::new();
        for rec in &recs {
            write_record(&mut out, rec, b',').unwrap();
        }
        assert_eq!(String::from_utf8(out.clone()).unwrap(), "name\nalpha\n\"\"\nbeta\n");
        assert_eq!(parse_all(std::str::from_utf8(&out).unwrap()), recs);
    }

    #[test]
    fn blank_lines_before_header_skipped() {
        assert_eq!(parse_all("\nname\nx\n"), vec![vec!["name"], vec!["x"]]);
    }

    #[test]
    fn ragged_rows_rejected() {
        assert!(read_table(b"a,b\n1,2\n3\n", b',').is_err());
        assert!(read_table(b"", b',').unwrap().is_none());
    }
}
