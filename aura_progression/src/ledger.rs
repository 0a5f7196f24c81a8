// SPDX-License-Identifier: MIT OR Apache-2.0
//! Append-only XP ledger.
//!
//! Every XP change is recorded as an [`XpEvent`]. The sum of a user's events
//! is the authoritative XP total; the figure on [`UserProgression`] is a
//! snapshot reconciled against it.
//!
//! [`UserProgression`]: crate::model::UserProgression

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ProgressionError, Result};
use crate::model::UserId;
use crate::store::ProgressionStore;

/// Why XP was granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XpReason {
    /// An ethics scan finished.
    ScanCompleted,
    /// A feed post was published.
    PostCreated,
    /// The user joined a guild.
    GuildJoined,
    /// First activity of the day.
    DailyLogin,
    /// Reward from a claimed quest.
    QuestReward,
    /// Reward from an unlocked achievement.
    AchievementReward,
    /// Operator correction; the only reason that may be negative.
    Adjustment,
}

impl XpReason {
    /// Stable label used in logs and storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ScanCompleted => "scan_completed",
            Self::PostCreated => "post_created",
            Self::GuildJoined => "guild_joined",
            Self::DailyLogin => "daily_login",
            Self::QuestReward => "quest_reward",
            Self::AchievementReward => "achievement_reward",
            Self::Adjustment => "adjustment",
        }
    }

    /// Whether the streak multiplier applies to grants with this reason.
    #[must_use]
    pub const fn is_streak_eligible(&self) -> bool {
        matches!(self, Self::ScanCompleted | Self::PostCreated | Self::DailyLogin)
    }

    /// Whether a negative amount is acceptable.
    #[must_use]
    pub const fn allows_negative(&self) -> bool {
        matches!(self, Self::Adjustment)
    }
}

impl fmt::Display for XpReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpEvent {
    /// Event id.
    pub id: Uuid,
    /// Owner.
    pub user_id: UserId,
    /// Signed XP delta.
    pub amount: i64,
    /// Why the XP changed.
    pub reason: XpReason,
    /// When the event was recorded.
    pub created_at: DateTime<Utc>,
}

impl XpEvent {
    /// Creates a new event with a fresh id.
    #[must_use]
    pub fn new(user_id: UserId, amount: i64, reason: XpReason, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            amount,
            reason,
            created_at,
        }
    }
}

/// Largest XP total a user can hold. Keeps every ledger sum within `i64`.
pub const MAX_TOTAL_XP: u64 = i64::MAX.unsigned_abs();

/// Checks a grant against the current total and returns the new total.
pub fn apply_amount(current_total: u64, amount: i64, reason: XpReason) -> Result<u64> {
    if amount == 0 {
        return Err(ProgressionError::InvalidAmount(format!(
            "zero XP grant ({reason})"
        )));
    }
    if amount > 0 {
        return current_total
            .checked_add(amount.unsigned_abs())
            .filter(|total| *total <= MAX_TOTAL_XP)
            .ok_or_else(|| {
                ProgressionError::InvalidAmount(format!(
                    "grant of {amount} would exceed the XP limit of {MAX_TOTAL_XP}"
                ))
            });
    }
    if !reason.allows_negative() {
        return Err(ProgressionError::InvalidAmount(format!(
            "negative XP grant of {amount} requires reason {}",
            XpReason::Adjustment
        )));
    }
    current_total
        .checked_sub(amount.unsigned_abs())
        .ok_or_else(|| {
            ProgressionError::InvalidAmount(format!(
                "adjustment of {amount} exceeds total XP {current_total}"
            ))
        })
}

/// Sum of a sequence of events, saturating at the `i64` bounds.
#[must_use]
pub fn ledger_sum(events: &[XpEvent]) -> i64 {
    events
        .iter()
        .fold(0_i64, |total, e| total.saturating_add(e.amount))
}

/// XP ledger backed by the storage collaborator.
#[derive(Clone)]
pub struct XpLedger {
    store: Arc<dyn ProgressionStore>,
}

impl XpLedger {
    /// Creates a ledger over a store.
    #[must_use]
    pub fn new(store: Arc<dyn ProgressionStore>) -> Self {
        Self { store }
    }

    /// Validates and appends a grant.
    ///
    /// Returns the appended event and the total it produces. The caller is
    /// responsible for persisting the updated snapshot.
    pub async fn grant(
        &self,
        user_id: &UserId,
        current_total: u64,
        amount: i64,
        reason: XpReason,
        at: DateTime<Utc>,
    ) -> Result<(XpEvent, u64)> {
        let new_total = apply_amount(current_total, amount, reason)?;
        let event = XpEvent::new(user_id.clone(), amount, reason, at);
        self.store.append_xp_event(&event).await?;
        tracing::debug!(
            user_id = %user_id,
            amount,
            reason = %reason,
            new_total,
            "XP event appended"
        );
        Ok((event, new_total))
    }

    /// Appends an adjustment that cancels an earlier grant of `amount`.
    ///
    /// Used when the snapshot for that grant could not be persisted. Skips
    /// [`apply_amount`] because the snapshot never saw the original grant.
    pub async fn compensate(
        &self,
        user_id: &UserId,
        amount: i64,
        at: DateTime<Utc>,
    ) -> Result<XpEvent> {
        let event = XpEvent::new(
            user_id.clone(),
            amount.saturating_neg(),
            XpReason::Adjustment,
            at,
        );
        self.store.append_xp_event(&event).await?;
        tracing::warn!(
            user_id = %user_id,
            amount = event.amount,
            "compensating XP event appended"
        );
        Ok(event)
    }

    /// Authoritative XP total for a user.
    pub async fn total_for(&self, user_id: &UserId) -> Result<i64> {
        Ok(self.store.ledger_total(user_id).await?)
    }

    /// All events for a user in append order.
    pub async fn history(&self, user_id: &UserId) -> Result<Vec<XpEvent>> {
        Ok(self.store.xp_events(user_id).await?)
    }
}
