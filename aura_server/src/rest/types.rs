// SPDX-License-Identifier: MIT OR Apache-2.0
//! REST API request and response types.

use aura_progression::{
    AchievementEntry, LevelProgress, Quest, QuestCadence, QuestCategory, QuestDifficulty,
    UnlockedAchievement, XpEvent, XpReason,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Request to grant (or, for adjustments, deduct) XP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantXpRequest {
    /// Signed amount before multipliers.
    pub amount: i64,
    /// Ledger reason.
    pub reason: XpReason,
}

/// Request to change karma.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KarmaRequest {
    /// Signed, non-zero change.
    pub delta: i64,
}

/// Request to assign a quest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignQuestRequest {
    /// Daily, weekly or seasonal.
    pub cadence: QuestCadence,
    /// Quest category.
    pub category: QuestCategory,
    /// Difficulty, which selects the base rewards.
    pub difficulty: QuestDifficulty,
    /// Number of actions needed to complete.
    pub target: u32,
    /// Deadline; defaults to the cadence's standard length from now.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<DateTime<Utc>>,
}

/// Request to record quest actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestProgressRequest {
    /// Number of actions performed.
    #[serde(default = "default_delta")]
    pub delta: u32,
}

fn default_delta() -> u32 {
    1
}

/// Request to evaluate an achievement against observed progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateRequest {
    /// Progress value measured by the caller.
    pub progress: u64,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Highest reachable level.
    pub level_ceiling: u32,
    /// Templates in the achievement catalogue.
    pub achievements: usize,
}

/// Level lookup for a raw XP total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelLookupResponse {
    /// Level breakdown.
    #[serde(flatten)]
    pub progress: LevelProgress,
    /// Display title for the level.
    pub title: String,
}

/// A user's XP ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XpHistoryResponse {
    /// Events in append order.
    pub events: Vec<XpEvent>,
    /// Sum of all event amounts.
    pub ledger_total: i64,
}

/// A user's quests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestListResponse {
    /// Quests with expiry applied.
    pub quests: Vec<Quest>,
}

/// Achievement catalogue listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AchievementListResponse {
    /// Catalogue entries.
    pub achievements: Vec<AchievementEntry>,
    /// Entries already unlocked.
    pub unlocked: usize,
}

/// Achievements unlocked by a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnlockResponse {
    /// Newly unlocked achievements, including cascaded level badges.
    pub unlocked: Vec<UnlockedAchievement>,
}
