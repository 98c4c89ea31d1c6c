// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/iprmark

//! Raster image watermarking: a keyed hidden message carried by block-mean
//! QIM, and a visible overlay.
//!
//! Both markers decode into the native [`Raster`] sample buffer and write
//! back in the input's container format.

pub mod capacity;
pub mod frame;
pub mod hidden;
pub mod permute;
pub mod pixels;
pub mod qim;
pub mod repetition;
pub mod visible;

pub use capacity::capacity_bytes;
pub use hidden::HiddenMarker;
pub use pixels::Raster;
pub use visible::{OverlayConfig, VisibleMarker};
