// SPDX-License-Identifier: MIT OR Apache-2.0
//! Storage collaborator interface.
//!
//! The engine keeps no durable state of its own. Every read and write goes
//! through [`ProgressionStore`], which a deployment backs with its database
//! and tests back with [`MemoryStore`](crate::memory::MemoryStore).

use async_trait::async_trait;
use thiserror::Error;

use crate::achievement::AchievementUnlock;
use crate::ledger::XpEvent;
use crate::model::{UserId, UserProgression};
use crate::quest::{Quest, QuestId, QuestStatus};

/// Storage backend failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreError {
    /// The backend could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The backend rejected or failed the operation.
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Durable state of the progression engine.
///
/// Implementations must make [`transition_quest`](Self::transition_quest)
/// and [`write_achievement_unlock`](Self::write_achievement_unlock) atomic;
/// the engine relies on them for exactly-once rewards.
#[async_trait]
pub trait ProgressionStore: Send + Sync {
    /// Reads a user's progression snapshot.
    async fn read_progression(&self, user_id: &UserId) -> StoreResult<Option<UserProgression>>;

    /// Inserts a snapshot if none exists. Returns false if one already did.
    async fn insert_progression(&self, progression: &UserProgression) -> StoreResult<bool>;

    /// Overwrites a user's snapshot.
    async fn write_progression(&self, progression: &UserProgression) -> StoreResult<()>;

    /// Appends an immutable XP event.
    async fn append_xp_event(&self, event: &XpEvent) -> StoreResult<()>;

    /// All XP events of a user in append order.
    async fn xp_events(&self, user_id: &UserId) -> StoreResult<Vec<XpEvent>>;

    /// Sum of a user's XP events.
    async fn ledger_total(&self, user_id: &UserId) -> StoreResult<i64> {
        Ok(crate::ledger::ledger_sum(&self.xp_events(user_id).await?))
    }

    /// Reads a quest by id.
    async fn read_quest(&self, quest_id: QuestId) -> StoreResult<Option<Quest>>;

    /// Inserts or overwrites a quest.
    async fn write_quest(&self, quest: &Quest) -> StoreResult<()>;

    /// Writes `quest` only if the stored status equals `expected`.
    ///
    /// Returns false, leaving storage untouched, when the quest is missing
    /// or its status differs.
    async fn transition_quest(&self, quest: &Quest, expected: QuestStatus) -> StoreResult<bool>;

    /// All quests of a user.
    async fn list_quests(&self, user_id: &UserId) -> StoreResult<Vec<Quest>>;

    /// Reads one unlock record.
    async fn read_achievement_unlock(
        &self,
        user_id: &UserId,
        achievement_id: &str,
    ) -> StoreResult<Option<AchievementUnlock>>;

    /// Inserts an unlock if absent. Returns false if one already existed.
    async fn write_achievement_unlock(&self, unlock: &AchievementUnlock) -> StoreResult<bool>;

    /// Removes an unlock. Returns false if none existed.
    async fn delete_achievement_unlock(
        &self,
        user_id: &UserId,
        achievement_id: &str,
    ) -> StoreResult<bool>;

    /// All unlocks of a user.
    async fn list_achievement_unlocks(
        &self,
        user_id: &UserId,
    ) -> StoreResult<Vec<AchievementUnlock>>;
}
