// SPDX-License-Identifier: MIT OR Apache-2.0
//! In-memory [`ProgressionStore`].
//!
//! Backs tests and single-node deployments. Failure injection lets tests
//! exercise the ledger reconciliation path.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::achievement::AchievementUnlock;
use crate::ledger::XpEvent;
use crate::model::{UserId, UserProgression};
use crate::quest::{Quest, QuestId, QuestStatus};
use crate::store::{ProgressionStore, StoreError, StoreResult};

/// Progression store held in concurrent hash maps.
#[derive(Debug, Default)]
pub struct MemoryStore {
    progressions: DashMap<UserId, UserProgression>,
    events: DashMap<UserId, Vec<XpEvent>>,
    quests: DashMap<QuestId, Quest>,
    unlocks: DashMap<(UserId, String), AchievementUnlock>,
    failing_progression_writes: AtomicU32,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` snapshot writes fail.
    pub fn fail_next_progression_writes(&self, count: u32) {
        self.failing_progression_writes
            .store(count, Ordering::SeqCst);
    }

    /// Number of users with a snapshot.
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.progressions.len()
    }

    fn take_injected_failure(&self) -> bool {
        self.failing_progression_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl ProgressionStore for MemoryStore {
    async fn read_progression(&self, user_id: &UserId) -> StoreResult<Option<UserProgression>> {
        Ok(self.progressions.get(user_id).map(|p| p.clone()))
    }

    async fn insert_progression(&self, progression: &UserProgression) -> StoreResult<bool> {
        match self.progressions.entry(progression.user_id.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(progression.clone());
                Ok(true)
            },
        }
    }

    async fn write_progression(&self, progression: &UserProgression) -> StoreResult<()> {
        if self.take_injected_failure() {
            tracing::debug!(user_id = %progression.user_id, "injected snapshot write failure");
            return Err(StoreError::Unavailable(
                "injected progression write failure".into(),
            ));
        }
        self.progressions
            .insert(progression.user_id.clone(), progression.clone());
        Ok(())
    }

    async fn append_xp_event(&self, event: &XpEvent) -> StoreResult<()> {
        self.events
            .entry(event.user_id.clone())
            .or_default()
            .push(event.clone());
        Ok(())
    }

    async fn xp_events(&self, user_id: &UserId) -> StoreResult<Vec<XpEvent>> {
        Ok(self
            .events
            .get(user_id)
            .map(|events| events.clone())
            .unwrap_or_default())
    }

    async fn read_quest(&self, quest_id: QuestId) -> StoreResult<Option<Quest>> {
        Ok(self.quests.get(&quest_id).map(|q| q.clone()))
    }

    async fn write_quest(&self, quest: &Quest) -> StoreResult<()> {
        self.quests.insert(quest.id, quest.clone());
        Ok(())
    }

    async fn transition_quest(&self, quest: &Quest, expected: QuestStatus) -> StoreResult<bool> {
        // The shard lock held by get_mut makes check-and-write atomic.
        match self.quests.get_mut(&quest.id) {
            Some(mut stored) if stored.status == expected => {
                *stored = quest.clone();
                Ok(true)
            },
            _ => Ok(false),
        }
    }

    async fn list_quests(&self, user_id: &UserId) -> StoreResult<Vec<Quest>> {
        let mut quests: Vec<Quest> = self
            .quests
            .iter()
            .filter(|q| &q.user_id == user_id)
            .map(|q| q.clone())
            .collect();
        quests.sort_by_key(|q| q.starts_at);
        Ok(quests)
    }

    async fn read_achievement_unlock(
        &self,
        user_id: &UserId,
        achievement_id: &str,
    ) -> StoreResult<Option<AchievementUnlock>> {
        Ok(self
            .unlocks
            .get(&(user_id.clone(), achievement_id.to_string()))
            .map(|u| u.clone()))
    }

    async fn write_achievement_unlock(&self, unlock: &AchievementUnlock) -> StoreResult<bool> {
        match self
            .unlocks
            .entry((unlock.user_id.clone(), unlock.achievement_id.clone()))
        {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(unlock.clone());
                Ok(true)
            },
        }
    }

    async fn delete_achievement_unlock(
        &self,
        user_id: &UserId,
        achievement_id: &str,
    ) -> StoreResult<bool> {
        Ok(self
            .unlocks
            .remove(&(user_id.clone(), achievement_id.to_string()))
            .is_some())
    }

    async fn list_achievement_unlocks(
        &self,
        user_id: &UserId,
    ) -> StoreResult<Vec<AchievementUnlock>> {
        let mut unlocks: Vec<AchievementUnlock> = self
            .unlocks
            .iter()
            .filter(|u| &u.user_id == user_id)
            .map(|u| u.clone())
            .collect();
        unlocks.sort_by_key(|u| u.unlocked_at);
        Ok(unlocks)
    }
}
