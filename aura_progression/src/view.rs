// SPDX-License-Identifier: MIT OR Apache-2.0
//! Client-side projection of a progression snapshot.
//!
//! A [`ProgressionView`] shows tentative XP immediately after a user acts and
//! replaces everything with the server snapshot once it arrives. It is never
//! authoritative: the server snapshot always wins.

use crate::curve::{LevelCurve, LevelProgress};
use crate::engine::ProgressionSnapshot;

/// Display state built from the last confirmed snapshot plus pending deltas.
#[derive(Debug, Clone)]
pub struct ProgressionView {
    curve: LevelCurve,
    confirmed: ProgressionSnapshot,
    pending: Vec<i64>,
}

impl ProgressionView {
    /// Starts from a confirmed snapshot.
    #[must_use]
    pub fn from_snapshot(curve: LevelCurve, snapshot: ProgressionSnapshot) -> Self {
        Self {
            curve,
            confirmed: snapshot,
            pending: Vec::new(),
        }
    }

    /// Last snapshot received from the server.
    #[must_use]
    pub const fn confirmed(&self) -> &ProgressionSnapshot {
        &self.confirmed
    }

    /// Whether tentative deltas are being displayed.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// XP shown to the user, including tentative deltas.
    #[must_use]
    pub fn displayed_total(&self) -> u64 {
        let pending: i64 = self.pending.iter().sum();
        let base = self.confirmed.progression.total_xp;
        if pending >= 0 {
            base.saturating_add(pending.unsigned_abs())
        } else {
            base.saturating_sub(pending.unsigned_abs())
        }
    }

    /// Progress shown to the user.
    #[must_use]
    pub fn displayed_progress(&self) -> LevelProgress {
        self.curve.progress(self.displayed_total())
    }

    /// Records a tentative XP delta and returns the progress to display.
    pub fn apply_optimistic(&mut self, xp_delta: i64) -> LevelProgress {
        if xp_delta != 0 {
            self.pending.push(xp_delta);
        }
        self.displayed_progress()
    }

    /// Replaces all state with a server snapshot and clears pending deltas.
    pub fn reconcile(&mut self, snapshot: ProgressionSnapshot) -> LevelProgress {
        self.confirmed = snapshot;
        self.pending.clear();
        self.displayed_progress()
    }

    /// Drops tentative deltas after a failed request.
    pub fn discard_pending(&mut self) -> LevelProgress {
        self.pending.clear();
        self.displayed_progress()
    }
}
