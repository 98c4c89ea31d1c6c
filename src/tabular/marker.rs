// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/iprmark

//! Fictitious-row marking.
//!
//! Embed inserts `k = round(R * density)` synthetic rows into a table of `R`
//! data rows. Insertion slots are drawn with `next_int(R + 1)`, resampling on
//! collision, then sorted; entry `j` of the sorted list goes in front of
//! original row `p_j` and therefore lands at index `p_j + j` of the output.
//!
//! All slot draws happen before any value draws. Values are drawn entry by
//! entry, column by column:
//!
//! | kind    | value                                                    |
//! |---------|----------------------------------------------------------|
//! | Integer | `min + next_int(max - min + 1)`                          |
//! | Float   | `min + next_float * (max - min)`, rounded to `decimals`   |
//! | Text    | `max(3, min_len + next_int(max_len - min_len + 1))` chars `a..z` |
//!
//! Columns with no observed values stay empty and consume no draws.
//!
//! Detect recomputes the plan from the key and the original context and
//! looks for each entry at its exact index first, then within `±min(k,
//! max_window)` rows, so deleted or inserted rows degrade the agreement
//! instead of breaking detection.

use std::collections::HashSet;
use std::io::{self, BufReader, BufWriter, Cursor, Read, Seek, SeekFrom, Write};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::engine::context::{AssetContext, TableContext};
use crate::engine::error::{MarkError, Result};
use crate::engine::outcome::{DetectPayload, DetectResult, EmbedReport, EmbedResult, Verdict};
use crate::engine::params::TabularParams;
use crate::engine::{Asset, AssetKind, Marker};
use crate::keystream::{KeyStream, SecretKey};
use crate::tabular::delimited::{check_width, read_table, write_record, Record, RecordReader};
use crate::tabular::profile::{profile_rows, ColumnKind, ColumnProfile, TableProfiler};

/// Minimum length of a synthesized text token.
const MIN_TOKEN_LEN: usize = 3;

/// A synthetic row and where it goes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FictitiousEntry {
    /// Original row index the entry is inserted before (`R` means appended).
    pub position: usize,
    /// Row index in the watermarked table.
    pub final_index: usize,
    pub values: Vec<String>,
}

/// Number of fictitious rows for `rows` data rows.
pub fn entry_count(rows: u64, density: f64) -> usize {
    (rows as f64 * density).round() as usize
}

fn synthesize(stream: &mut KeyStream, col: &ColumnProfile) -> String {
    if col.observed == 0 {
        return String::new();
    }
    match col.kind {
        ColumnKind::Integer => {
            let lo = col.min as i64;
            let hi = col.max as i64;
            let span = (hi as i128 - lo as i128 + 1).clamp(1, u64::MAX as i128) as u64;
            (lo as i128 + stream.next_int(span) as i128).to_string()
        }
        ColumnKind::Float => {
            let v = col.min + stream.next_float() * (col.max - col.min);
            format!("{:.*}", col.decimals as usize, v)
        }
        ColumnKind::Text => {
            let spread = col.max_len.saturating_sub(col.min_len) as u64 + 1;
            let len = (col.min_len + stream.next_int(spread) as usize).max(MIN_TOKEN_LEN);
            (0..len).map(|_| (b'a' + stream.next_int(26) as u8) as char).collect()
        }
    }
}

/// Recompute the fictitious rows for a table context.
pub fn plan_entries(stream: &mut KeyStream, ctx: &TableContext, density: f64) -> Vec<FictitiousEntry> {
    let rows = ctx.row_count as usize;
    let k = entry_count(ctx.row_count, density);
    let mut positions = stream.distinct_indices(rows + 1, k);
    positions.sort_unstable();

    positions
        .into_iter()
        .enumerate()
        .map(|(j, position)| FictitiousEntry {
            position,
            final_index: position + j,
            values: ctx.columns.iter().map(|col| synthesize(stream, col)).collect(),
        })
        .collect()
}

/// Result of a streaming embed.
#[derive(Debug, Clone)]
pub struct StreamOutcome {
    /// `None` when the input had no header row.
    pub context: Option<TableContext>,
    pub entries: Vec<FictitiousEntry>,
    pub degenerate: bool,
}

/// Embed fictitious rows while streaming `input` to `output`.
///
/// Makes two passes over `input`: one to profile the columns, one to copy
/// rows through. Apart from one record at a time, memory holds only the `k`
/// planned entries. Empty tables are copied through unchanged.
pub fn embed_stream<R: Read + Seek, W: Write>(
    mut input: R,
    output: W,
    key: &SecretKey,
    params: &TabularParams,
) -> Result<StreamOutcome> {
    params.validate()?;
    let delimiter = params.delimiter;
    let start = input.stream_position()?;

    let context = {
        let mut reader = RecordReader::new(BufReader::new(&mut input), delimiter);
        match reader.next_record()? {
            None => None,
            Some(header) => {
                let width = header.len();
                let mut profiler = TableProfiler::new(header);
                while let Some(row) = reader.next_record()? {
                    check_width(&row, width, reader.records_read())?;
                    profiler.observe(&row);
                }
                Some(profiler.finish(delimiter))
            }
        }
    };
    input.seek(SeekFrom::Start(start))?;

    let context = match context {
        Some(ctx) if ctx.row_count > 0 => ctx,
        context => {
            debug!("tabular embed: empty table, passing through");
            let mut output = output;
            io::copy(&mut input, &mut output)?;
            output.flush()?;
            return Ok(StreamOutcome { context, entries: Vec::new(), degenerate: true });
        }
    };

    let mut stream = KeyStream::derive(key, &AssetContext::Tabular(context.clone()));
    let entries = plan_entries(&mut stream, &context, params.density);
    debug!(rows = context.row_count, columns = context.columns.len(), entries = entries.len(), "tabular embed");

    let mut out = BufWriter::new(output);
    let mut reader = RecordReader::new(BufReader::new(&mut input), delimiter);
    let header: Record = reader
        .next_record()?
        .ok_or_else(|| MarkError::UnsupportedFormat("table changed between passes".into()))?;
    write_record(&mut out, &header, delimiter)?;

    let mut pending = entries.iter().peekable();
    let mut row_index = 0usize;
    while let Some(row) = reader.next_record()? {
        while let Some(entry) = pending.next_if(|e| e.position == row_index) {
            trace!(at = entry.final_index, "fictitious row");
            write_record(&mut out, &entry.values, delimiter)?;
        }
        write_record(&mut out, &row, delimiter)?;
        row_index += 1;
    }
    for entry in pending {
        write_record(&mut out, &entry.values, delimiter)?;
    }
    out.flush()?;

    Ok(StreamOutcome { context: Some(context), entries, degenerate: false })
}

fn cell_matches(col: &ColumnProfile, cell: &str, expected: &str, tolerance: Option<f64>) -> bool {
    if col.observed == 0 {
        return cell.is_empty();
    }
    match col.kind {
        ColumnKind::Integer | ColumnKind::Float => {
            match (cell.trim().parse::<f64>(), expected.parse::<f64>()) {
                (Ok(a), Ok(b)) => (a - b).abs() <= tolerance.unwrap_or_else(|| col.default_tolerance()),
                _ => false,
            }
        }
        ColumnKind::Text => cell == expected,
    }
}

fn row_matches(row: &Record, entry: &FictitiousEntry, ctx: &TableContext, tolerance: Option<f64>) -> bool {
    row.len() == ctx.columns.len()
        && ctx
            .columns
            .iter()
            .zip(row)
            .zip(&entry.values)
            .all(|((col, cell), expected)| cell_matches(col, cell, expected, tolerance))
}

fn resolve_context(
    context: Option<&AssetContext>,
    original: Option<&[u8]>,
    params: &TabularParams,
) -> Result<TableContext> {
    match (context, original) {
        (Some(AssetContext::Tabular(t)), _) => Ok(t.clone()),
        (Some(other), _) => Err(MarkError::ContextMismatch(format!(
            "expected a tabular context, got {}",
            other.modality()
        ))),
        (None, Some(bytes)) => match read_table(bytes, params.delimiter)? {
            Some((header, rows)) => Ok(profile_rows(&header, &rows, params.delimiter)),
            None => Ok(TableContext { row_count: 0, delimiter: params.delimiter, columns: Vec::new() }),
        },
        (None, None) => Err(MarkError::OriginalRequired),
    }
}

/// Fictitious-row marker for delimited tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct TabularMarker;

impl Marker for TabularMarker {
    type Params = TabularParams;

    fn embed(&self, bytes: &[u8], key: &SecretKey, params: &TabularParams) -> Result<EmbedResult> {
        let mut out = Vec::with_capacity(bytes.len() + bytes.len() / 8);
        let outcome = embed_stream(Cursor::new(bytes), &mut out, key, params)?;
        Ok(EmbedResult {
            asset: Asset::new(AssetKind::Tabular, out),
            context: outcome.context.map(AssetContext::Tabular),
            report: EmbedReport::Tabular { entries: outcome.entries },
            degenerate: outcome.degenerate,
        })
    }

    fn detect(
        &self,
        bytes: &[u8],
        key: &SecretKey,
        context: Option<&AssetContext>,
        original: Option<&[u8]>,
        params: &TabularParams,
    ) -> Result<DetectResult> {
        let ctx = resolve_context(context, original, params)?;
        let (header, rows) = read_table(bytes, ctx.delimiter)?.unwrap_or_default();

        let expected_names: Vec<&str> = ctx.columns.iter().map(|c| c.name.as_str()).collect();
        if header != expected_names {
            return Err(MarkError::ContextMismatch(format!(
                "header {header:?} does not match the original columns {expected_names:?}"
            )));
        }
        if (rows.len() as u64) < ctx.row_count {
            return Err(MarkError::ContextMismatch(format!(
                "table has {} rows, the original had {}",
                rows.len(),
                ctx.row_count
            )));
        }

        let mut stream = KeyStream::derive(key, &AssetContext::Tabular(ctx.clone()));
        let entries = plan_entries(&mut stream, &ctx, params.density);
        let k = entries.len();
        let window = k.min(params.max_window);

        let mut used = HashSet::with_capacity(k);
        let mut found = Vec::with_capacity(k);
        for entry in &entries {
            let target = entry.final_index;
            let candidates = std::iter::once(Some(target))
                .chain((1..=window).flat_map(|d| [target.checked_sub(d), target.checked_add(d)]))
                .flatten();
            for idx in candidates {
                if idx >= rows.len() || used.contains(&idx) {
                    continue;
                }
                if row_matches(&rows[idx], entry, &ctx, params.tolerance) {
                    trace!(expected = target, found = idx, "fictitious row matched");
                    used.insert(idx);
                    found.push(idx);
                    break;
                }
            }
        }
        found.sort_unstable();

        let agreement = if k == 0 { 0.0 } else { found.len() as f64 / k as f64 };
        let verdict = Verdict::from_agreement(agreement, k, params.present_threshold, params.absent_threshold);
        debug!(expected = k, matched = found.len(), ?verdict, "tabular detect");
        Ok(DetectResult { verdict, agreement, payload: DetectPayload::Rows(found) })
    }
}
