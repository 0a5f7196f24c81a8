// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-user progression record.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::achievement::AchievementTrigger;
use crate::ledger::XpReason;
use crate::streak::StreakState;

/// Opaque identifier of an externally owned user account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wraps an external user identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Activity counters feeding achievement triggers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityStats {
    /// Ethics scans completed.
    pub scans_completed: u64,
    /// Feed posts created.
    pub posts_created: u64,
    /// Guilds joined.
    pub guilds_joined: u64,
    /// Quest rewards claimed.
    pub quests_claimed: u64,
    /// Achievements unlocked.
    pub achievements_unlocked: u64,
}

impl ActivityStats {
    /// Counts an XP-granting action.
    ///
    /// Returns the trigger whose counter moved, if any.
    pub fn record(&mut self, reason: XpReason) -> Option<AchievementTrigger> {
        match reason {
            XpReason::ScanCompleted => {
                self.scans_completed += 1;
                Some(AchievementTrigger::ScansCompleted)
            },
            XpReason::PostCreated => {
                self.posts_created += 1;
                Some(AchievementTrigger::PostsCreated)
            },
            XpReason::GuildJoined => {
                self.guilds_joined += 1;
                Some(AchievementTrigger::GuildsJoined)
            },
            XpReason::DailyLogin
            | XpReason::QuestReward
            | XpReason::AchievementReward
            | XpReason::Adjustment => None,
        }
    }
}

/// A user's progression state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProgression {
    /// Owner.
    pub user_id: UserId,
    /// Total XP; always reconcilable against the ledger sum.
    pub total_xp: u64,
    /// Cached level derived from `total_xp`.
    pub level: u32,
    /// Reputation score, independent of XP.
    pub karma: i64,
    /// Consecutive-day activity.
    #[serde(flatten)]
    pub streak: StreakState,
    /// Activity counters.
    pub stats: ActivityStats,
    /// Account creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

impl UserProgression {
    /// Creates a fresh record at level 1 with no XP.
    #[must_use]
    pub fn new(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            total_xp: 0,
            level: 1,
            karma: 0,
            streak: StreakState::default(),
            stats: ActivityStats::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Current value of the counter behind an achievement trigger.
    #[must_use]
    pub fn counter_for(&self, trigger: AchievementTrigger) -> u64 {
        match trigger {
            AchievementTrigger::ScansCompleted => self.stats.scans_completed,
            AchievementTrigger::PostsCreated => self.stats.posts_created,
            AchievementTrigger::GuildsJoined => self.stats.guilds_joined,
            AchievementTrigger::QuestsClaimed => self.stats.quests_claimed,
            AchievementTrigger::LevelReached => u64::from(self.level),
            AchievementTrigger::StreakDays => u64::from(self.streak.streak_days),
            AchievementTrigger::Manual => 0,
        }
    }
}
