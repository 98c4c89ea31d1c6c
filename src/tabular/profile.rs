// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/iprmark

//! Column profiling.
//!
//! A single pass over the data infers each column's kind and observed range.
//! Fictitious values are synthesized inside these ranges so they blend in.

use serde::{Deserialize, Serialize};

use crate::engine::context::TableContext;
use crate::tabular::delimited::Record;

/// Inferred column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
}

impl ColumnKind {
    /// Stable tag used in seed material.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Text => "text",
        }
    }
}

/// Observed statistics of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    pub kind: ColumnKind,
    /// Numeric range; zero for text columns.
    pub min: f64,
    pub max: f64,
    /// Maximum number of decimal places seen.
    pub decimals: u32,
    /// Text length range in characters.
    pub min_len: usize,
    pub max_len: usize,
    /// Number of non-empty cells.
    pub observed: u64,
}

impl ColumnProfile {
    /// Half a unit in the last decimal place.
    pub fn default_tolerance(&self) -> f64 {
        0.5 / 10f64.powi(self.decimals as i32)
    }
}

/// Decimal places written in a numeric literal (`"3.140"` → 3, `"2e5"` → 0).
pub fn decimal_places(cell: &str) -> u32 {
    let mantissa = cell.split(|c| c == 'e' || c == 'E').next().unwrap_or("");
    match mantissa.split_once('.') {
        Some((_, frac)) => frac.len() as u32,
        None => 0,
    }
}

#[derive(Debug, Clone)]
struct Accumulator {
    all_int: bool,
    all_float: bool,
    min: f64,
    max: f64,
    decimals: u32,
    min_len: usize,
    max_len: usize,
    observed: u64,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            all_int: true,
            all_float: true,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            decimals: 0,
            min_len: usize::MAX,
            max_len: 0,
            observed: 0,
        }
    }

    fn observe(&mut self, cell: &str) {
        if cell.is_empty() {
            return;
        }
        self.observed += 1;
        let len = cell.chars().count();
        self.min_len = self.min_len.min(len);
        self.max_len = self.max_len.max(len);

        if self.all_int && cell.parse::<i64>().is_err() {
            self.all_int = false;
        }
        if self.all_float {
            match cell.parse::<f64>() {
                Ok(v) if v.is_finite() => {
                    self.min = self.min.min(v);
                    self.max = self.max.max(v);
                    self.decimals = self.decimals.max(decimal_places(cell));
                }
                _ => self.all_float = false,
            }
        }
    }

    fn finish(self, name: String) -> ColumnProfile {
        let kind = if self.observed == 0 {
            ColumnKind::Text
        } else if self.all_int {
            ColumnKind::Integer
        } else if self.all_float {
            ColumnKind::Float
        } else {
            ColumnKind::Text
        };
        let numeric = matches!(kind, ColumnKind::Integer | ColumnKind::Float);
        ColumnProfile {
            name,
            kind,
            min: if numeric { self.min } else { 0.0 },
            max: if numeric { self.max } else { 0.0 },
            decimals: if kind == ColumnKind::Float { self.decimals.min(15) } else { 0 },
            min_len: if self.observed == 0 { 0 } else { self.min_len },
            max_len: self.max_len,
            observed: self.observed,
        }
    }
}

/// Incremental profiler fed one record at a time.
#[derive(Debug, Clone)]
pub struct TableProfiler {
    header: Record,
    columns: Vec<Accumulator>,
    rows: u64,
}

impl TableProfiler {
    pub fn new(header: Record) -> Self {
        let columns = vec![Accumulator::new(); header.len()];
        Self { header, columns, rows: 0 }
    }

    pub fn observe(&mut self, row: &Record) {
        for (acc, cell) in self.columns.iter_mut().zip(row) {
            acc.observe(cell);
        }
        self.rows += 1;
    }

    pub fn finish(self, delimiter: u8) -> TableContext {
        let columns = self
            .columns
            .into_iter()
            .zip(self.header)
            .map(|(acc, name)| acc.finish(name))
            .collect();
        TableContext { row_count: self.rows, delimiter, columns }
    }
}

/// Profile an in-memory table.
pub fn profile_rows(header: &Record, rows: &[Record], delimiter: u8) -> TableContext {
    let mut profiler = TableProfiler::new(header.clone());
    for row in rows {
        profiler.observe(row);
    }
    profiler.finish(delimiter)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(cells: &[&str]) -> Record {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn kinds_inferred() {
        let header = rec(&["id", "price", "name", "mixed", "blank"]);
        let rows = vec![
            rec(&["1", "2.50", "alpha", "7", ""]),
            rec(&["42", "10.125", "be", "x", ""]),
            rec(&["-3", "7", "gamma ray", "", ""]),
        ];
        let ctx = profile_rows(&header, &rows, b',');
        assert_eq!(ctx.row_count, 3);
        let kinds: Vec<_> = ctx.columns.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![ColumnKind::Integer, ColumnKind::Float, ColumnKind::Text, ColumnKind::Text, ColumnKind::Text]
        );
        assert_eq!(ctx.columns[0].min, -3.0);
        assert_eq!(ctx.columns[0].max, 42.0);
        assert_eq!(ctx.columns[1].decimals, 3);
        assert_eq!(ctx.columns[2].min_len, 2);
        assert_eq!(ctx.columns[2].max_len, 9);
        assert_eq!(ctx.columns[4].observed, 0);
    }

    #[test]
    fn decimal_places_handles_exponents() {
        assert_eq!(decimal_places("3.140"), 3);
        assert_eq!(decimal_places("12"), 0);
        assert_eq!(decimal_places("1.5e3"), 1);
        assert_eq!(decimal_places("-0.25"), 2);
    }

    #[test]
    fn tolerance_from_decimals() {
        let mut col = profile_rows(&rec(&["v"]), &[rec(&["1.25"])], b',').columns.remove(0);
        assert!((col.default_tolerance() - 0.005).abs() < 1e-12);
        col.decimals = 0;
        assert_eq!(col.default_tolerance(), 0.5);
    }
}
