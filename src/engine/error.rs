// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/iprmark

//! Error types for the watermarking engine.
//!
//! [`MarkError`] covers every failure an embed or detect call can report.
//! Two outcomes are deliberately not errors: empty assets come back
//! unchanged with `degenerate = true`, and a failed integrity check on a
//! hidden message is reported as verdict `Absent`.

use thiserror::Error;

use crate::engine::AssetKind;

/// Errors that can occur during embedding or detection.
#[derive(Error, Debug)]
pub enum MarkError {
    /// The asset bytes cannot be decoded as the declared kind.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    /// The detect-time context does not describe the presented asset.
    #[error("context mismatch: {0}")]
    ContextMismatch(String),
    /// The requested mark does not fit into the asset. Raised before any
    /// mutation.
    #[error("capacity exceeded: need {needed} sites, {available} available")]
    CapacityExceeded { needed: usize, available: usize },
    /// A parameter is out of its documented range.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    /// Detection for this kind needs the original, un-watermarked asset.
    #[error("detection requires the original asset")]
    OriginalRequired,
    /// The asset kind has no detection phase.
    #[error("detection is not supported for {0:?} assets")]
    DetectionUnsupported(AssetKind),
    /// The visible overlay could not be rendered.
    #[error("overlay rendering failed: {0}")]
    Render(String),
    /// Reading or writing the asset stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<image::ImageError> for MarkError {
    fn from(e: image::ImageError) -> Self {
        Self::UnsupportedFormat(e.to_string())
    }
}

impl From<serde_json::Error> for MarkError {
    fn from(e: serde_json::Error) -> Self {
        Self::UnsupportedFormat(e.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MarkError>;
