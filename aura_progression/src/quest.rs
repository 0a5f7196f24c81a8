// SPDX-License-Identifier: MIT OR Apache-2.0
//! Quest tracking.
//!
//! # Lifecycle
//!
//! | Status | Meaning | Transitions |
//! |--------|---------|-------------|
//! | Active | Accepting progress | Completed, Expired |
//! | Completed | Target reached, reward pending | Claimed |
//! | Claimed | Reward applied once | (terminal) |
//! | Expired | Ran out of time unrewarded | (terminal) |
//!
//! Expiry is evaluated lazily whenever a quest is read. Claiming goes
//! through a conditional store write so a reward can only be released once.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::QuestRewardTable;
use crate::error::{ProgressionError, Result};
use crate::model::UserId;
use crate::store::ProgressionStore;

/// Quest identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestId(Uuid);

impl QuestId {
    /// Generates a fresh random id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }
}

impl Default for QuestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for QuestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for QuestId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// How often a quest is handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestCadence {
    /// Resets every day.
    Daily,
    /// Resets every week.
    Weekly,
    /// Runs for a seasonal campaign.
    Seasonal,
}

impl QuestCadence {
    /// Multiplier applied to the base reward table.
    #[must_use]
    pub const fn reward_scale(&self) -> u32 {
        match self {
            Self::Daily => 1,
            Self::Weekly => 3,
            Self::Seasonal => 10,
        }
    }

    /// Lifetime of a quest when no deadline is given.
    #[must_use]
    pub fn default_duration(&self) -> Duration {
        match self {
            Self::Daily => Duration::days(1),
            Self::Weekly => Duration::weeks(1),
            Self::Seasonal => Duration::days(90),
        }
    }
}

/// What kind of activity a quest asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestCategory {
    /// Run ethics scans.
    Analysis,
    /// Post and interact on the feed.
    Social,
    /// Guild participation.
    Guild,
    /// Try out features.
    Exploration,
}

/// Quest difficulty, selecting the base reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestDifficulty {
    /// Easy.
    Easy,
    /// Medium.
    Medium,
    /// Hard.
    Hard,
    /// Legendary.
    Legendary,
}

/// Quest status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestStatus {
    /// Accepting progress.
    Active,
    /// Target reached; reward not yet claimed.
    Completed,
    /// Reward applied.
    Claimed,
    /// Ran out of time.
    Expired,
}

impl QuestStatus {
    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Claimed | Self::Expired)
    }
}

/// Reward released on claim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestRewards {
    /// XP granted.
    pub xp: u32,
    /// Karma granted.
    pub karma: i64,
}

impl QuestRewards {
    /// Creates a reward pair.
    #[must_use]
    pub const fn new(xp: u32, karma: i64) -> Self {
        Self { xp, karma }
    }

    /// Scales both rewards.
    #[must_use]
    pub const fn scaled(self, factor: u32) -> Self {
        Self {
            xp: self.xp.saturating_mul(factor),
            karma: self.karma.saturating_mul(factor as i64),
        }
    }
}

/// Parameters for handing out a quest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestAssignment {
    /// Reset cadence.
    pub cadence: QuestCadence,
    /// Activity kind.
    pub category: QuestCategory,
    /// Difficulty.
    pub difficulty: QuestDifficulty,
    /// Progress needed to complete.
    pub target: u32,
    /// Deadline. Defaults to assignment time plus the cadence's length.
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
}

/// A quest assigned to one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quest {
    /// Quest id.
    pub id: QuestId,
    /// Owner.
    pub user_id: UserId,
    /// Reset cadence.
    pub cadence: QuestCadence,
    /// Activity kind.
    pub category: QuestCategory,
    /// Difficulty.
    pub difficulty: QuestDifficulty,
    /// Progress needed to complete (> 0).
    pub target: u32,
    /// Progress so far (0..=target).
    pub progress: u32,
    /// Lifecycle status.
    pub status: QuestStatus,
    /// Reward released on claim.
    pub rewards: QuestRewards,
    /// Assignment time.
    pub starts_at: DateTime<Utc>,
    /// Deadline.
    pub ends_at: DateTime<Utc>,
    /// When the target was reached.
    pub completed_at: Option<DateTime<Utc>>,
    /// When the reward was claimed.
    pub claimed_at: Option<DateTime<Utc>>,
}

impl Quest {
    /// Creates an active quest.
    pub fn new(
        user_id: UserId,
        assignment: &QuestAssignment,
        rewards: QuestRewards,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        if assignment.target == 0 {
            return Err(ProgressionError::InvalidQuest(
                "target must be positive".into(),
            ));
        }
        let ends_at = assignment
            .ends_at
            .unwrap_or_else(|| now + assignment.cadence.default_duration());
        if ends_at <= now {
            return Err(ProgressionError::InvalidQuest(format!(
                "quest would end in the past ({ends_at})"
            )));
        }
        Ok(Self {
            id: QuestId::new(),
            user_id,
            cadence: assignment.cadence,
            category: assignment.category,
            difficulty: assignment.difficulty,
            target: assignment.target,
            progress: 0,
            status: QuestStatus::Active,
            rewards,
            starts_at: now,
            ends_at,
            completed_at: None,
            claimed_at: None,
        })
    }

    /// Whether an active quest has run out of time.
    #[must_use]
    pub fn is_past_due(&self, now: DateTime<Utc>) -> bool {
        self.status == QuestStatus::Active && now > self.ends_at
    }

    /// Progress as a percentage.
    #[must_use]
    pub fn percent(&self) -> f64 {
        if self.target == 0 {
            return 100.0;
        }
        ((f64::from(self.progress) / f64::from(self.target)) * 100.0).min(100.0)
    }

    /// Adds progress, clamped to the target.
    ///
    /// Returns true when this call completed the quest. Non-active quests
    /// are left untouched.
    pub fn advance(&mut self, delta: u32, now: DateTime<Utc>) -> bool {
        if self.status != QuestStatus::Active {
            return false;
        }
        self.progress = self.progress.saturating_add(delta).min(self.target);
        if self.progress == self.target {
            self.status = QuestStatus::Completed;
            self.completed_at = Some(now);
            return true;
        }
        false
    }
}

/// Result of recording quest progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestProgress {
    /// Quest after the update.
    pub quest: Quest,
    /// Whether this update completed the quest.
    pub newly_completed: bool,
}

/// Quest operations over the storage collaborator.
#[derive(Clone)]
pub struct QuestTracker {
    store: Arc<dyn ProgressionStore>,
}

impl QuestTracker {
    /// Creates a tracker over a store.
    #[must_use]
    pub fn new(store: Arc<dyn ProgressionStore>) -> Self {
        Self { store }
    }

    /// Creates and stores an active quest with rewards from the table.
    pub async fn assign(
        &self,
        user_id: &UserId,
        assignment: &QuestAssignment,
        rewards: &QuestRewardTable,
        now: DateTime<Utc>,
    ) -> Result<Quest> {
        let reward = rewards
            .for_difficulty(assignment.difficulty)
            .scaled(assignment.cadence.reward_scale());
        let quest = Quest::new(user_id.clone(), assignment, reward, now)?;
        self.store.write_quest(&quest).await?;
        tracing::debug!(
            user_id = %user_id,
            quest_id = %quest.id,
            target = quest.target,
            "quest assigned"
        );
        Ok(quest)
    }

    /// Loads a quest owned by `user_id`, applying lazy expiry.
    pub async fn load(
        &self,
        user_id: &UserId,
        quest_id: QuestId,
        now: DateTime<Utc>,
    ) -> Result<Quest> {
        let quest = self
            .store
            .read_quest(quest_id)
            .await?
            .filter(|q| &q.user_id == user_id)
            .ok_or(ProgressionError::QuestNotFound(quest_id))?;
        self.expire_if_due(quest, now).await
    }

    async fn expire_if_due(&self, quest: Quest, now: DateTime<Utc>) -> Result<Quest> {
        if !quest.is_past_due(now) {
            return Ok(quest);
        }
        let mut expired = quest.clone();
        expired.status = QuestStatus::Expired;
        if self
            .store
            .transition_quest(&expired, QuestStatus::Active)
            .await?
        {
            tracing::debug!(quest_id = %expired.id, "quest expired");
            return Ok(expired);
        }
        // Someone else moved it first; report what is stored now.
        self.store
            .read_quest(quest.id)
            .await?
            .ok_or(ProgressionError::QuestNotFound(quest.id))
    }

    /// All quests of a user, with lazy expiry applied.
    pub async fn list(&self, user_id: &UserId, now: DateTime<Utc>) -> Result<Vec<Quest>> {
        let quests = self.store.list_quests(user_id).await?;
        let mut current = Vec::with_capacity(quests.len());
        for quest in quests {
            current.push(self.expire_if_due(quest, now).await?);
        }
        Ok(current)
    }

    /// Adds progress to an active quest. Non-active quests are a no-op.
    pub async fn record_progress(
        &self,
        user_id: &UserId,
        quest_id: QuestId,
        delta: u32,
        now: DateTime<Utc>,
    ) -> Result<QuestProgress> {
        let quest = self.load(user_id, quest_id, now).await?;
        if quest.status != QuestStatus::Active || delta == 0 {
            return Ok(QuestProgress {
                quest,
                newly_completed: false,
            });
        }

        let mut updated = quest.clone();
        let newly_completed = updated.advance(delta, now);
        if !self
            .store
            .transition_quest(&updated, QuestStatus::Active)
            .await?
        {
            let current = self.load(user_id, quest_id, now).await?;
            return Ok(QuestProgress {
                quest: current,
                newly_completed: false,
            });
        }

        if newly_completed {
            tracing::info!(user_id = %user_id, quest_id = %quest_id, "quest completed");
        }
        Ok(QuestProgress {
            quest: updated,
            newly_completed,
        })
    }

    /// Moves a completed quest to claimed.
    ///
    /// The returned quest carries the rewards the caller must apply. Only
    /// one caller can win the `completed -> claimed` transition.
    pub async fn claim(
        &self,
        user_id: &UserId,
        quest_id: QuestId,
        now: DateTime<Utc>,
    ) -> Result<Quest> {
        let quest = self.load(user_id, quest_id, now).await?;
        Self::check_claimable(&quest)?;

        let mut claimed = quest;
        claimed.status = QuestStatus::Claimed;
        claimed.claimed_at = Some(now);
        if self
            .store
            .transition_quest(&claimed, QuestStatus::Completed)
            .await?
        {
            return Ok(claimed);
        }

        let current = self.load(user_id, quest_id, now).await?;
        Self::check_claimable(&current)?;
        // Stored status is Completed again but the write lost; treat as a concurrent claim.
        Err(ProgressionError::AlreadyClaimed(quest_id))
    }

    fn check_claimable(quest: &Quest) -> Result<()> {
        match quest.status {
            QuestStatus::Completed => Ok(()),
            QuestStatus::Claimed => Err(ProgressionError::AlreadyClaimed(quest.id)),
            QuestStatus::Active | QuestStatus::Expired => {
                Err(ProgressionError::QuestNotCompleted(quest.id))
            },
        }
    }

    /// Undoes a claim whose reward could not be applied.
    pub async fn revert_claim(&self, claimed: &Quest) -> Result<bool> {
        let mut restored = claimed.clone();
        restored.status = QuestStatus::Completed;
        restored.claimed_at = None;
        Ok(self
            .store
            .transition_quest(&restored, QuestStatus::Claimed)
            .await?)
    }
}
