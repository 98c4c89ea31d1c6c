// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/iprmark

//! Tabular assets: delimited text tables marked with fictitious rows.
//!
//! - [`delimited`]: streaming RFC 4180 record reader and writer
//! - [`profile`]: column kind and range inference
//! - [`marker`]: fictitious-row planning, embedding and detection

pub mod delimited;
pub mod marker;
pub mod profile;

pub use marker::{embed_stream, plan_entries, FictitiousEntry, StreamOutcome, TabularMarker};
pub use profile::{ColumnKind, ColumnProfile};
