// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/iprmark

//! Per-call lifecycle.
//!
//! ```text
//! New ──► Embedding ──► Embedded        (terminal, success)
//!                   └─► Failed          (terminal, error)
//! Embedded ──► Detecting ──► Present | Absent | Inconclusive   (terminal)
//! ```
//!
//! A detect call starts from `Embedded`: the candidate asset is treated as
//! a possibly-watermarked asset. `Failed` is also reachable from
//! `Detecting` when the call errors out.

use crate::engine::outcome::Verdict;

/// Phase of one embed or detect call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    New,
    Embedding,
    Embedded,
    Failed,
    Detecting,
    Present,
    Absent,
    Inconclusive,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Failed | Self::Present | Self::Absent | Self::Inconclusive)
    }

    /// Whether `self -> next` is an allowed transition.
    pub fn can_advance(self, next: Phase) -> bool {
        use Phase::*;
        matches!(
            (self, next),
            (New, Embedding)
                | (Embedding, Embedded)
                | (Embedding, Failed)
                | (Embedded, Detecting)
                | (Detecting, Present)
                | (Detecting, Absent)
                | (Detecting, Inconclusive)
                | (Detecting, Failed)
        )
    }
}

impl From<Verdict> for Phase {
    fn from(v: Verdict) -> Self {
        match v {
            Verdict::Present => Self::Present,
            Verdict::Absent => Self::Absent,
            Verdict::Inconclusive => Self::Inconclusive,
        }
    }
}

/// Checked phase tracker owned by a single call.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    phase: Phase,
    history: Vec<Phase>,
}

impl Lifecycle {
    /// Start of an embed call.
    pub fn embedding() -> Self {
        Self::starting_at(Phase::New)
    }

    /// Start of a detect call.
    pub fn detecting() -> Self {
        Self::starting_at(Phase::Embedded)
    }

    fn starting_at(phase: Phase) -> Self {
        Self { phase, history: vec![phase] }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn history(&self) -> &[Phase] {
        &self.history
    }

    /// Move to `next`. Returns false and stays put on an illegal transition.
    pub fn advance(&mut self, next: Phase) -> bool {
        if !self.phase.can_advance(next) {
            tracing::warn!(from = ?self.phase, to = ?next, "illegal phase transition");
            return false;
        }
        self.phase = next;
        self.history.push(next);
        true
    }
}
